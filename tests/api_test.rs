//! End-to-end tests against the real router on an ephemeral port.
//!
//! Tests cover:
//! - Sign-in, sign-up and logout cookie handling
//! - The authentication gate on protected routes
//! - Posting, liking, and the at-most-once like guarantee
//! - Error status mapping

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use social_network::config::Config;
use social_network::db::{self, SqliteRepository};
use social_network::routes;
use social_network::state::AppState;

struct TestApp {
    _dir: TempDir,
    base: String,
    client: Client,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("api.db"), Duration::from_secs(5)).unwrap();
        db::run_migrations(&pool).unwrap();

        let config = Config::default();
        let repo = SqliteRepository::new(pool, config.store_timeout());
        let app = routes::app(AppState::new(Arc::new(repo), config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            _dir: dir,
            base: format!("http://{}", addr),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("session={}", token));
        }
        req.send().await.unwrap()
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("session={}", token));
        }
        req.send().await.unwrap()
    }

    async fn sign_up(&self, name: &str, password: &str) -> String {
        let resp = self
            .post_json(
                "/profile",
                json!({ "name": name, "password": password, "avatar": "" }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        session_from(&resp).expect("sign-up should set a session cookie")
    }

    async fn create_post(&self, token: &str, content: &str) -> Value {
        let resp = self
            .post_json("/posts", json!({ "content": content }), Some(token))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }
}

fn session_from(resp: &Response) -> Option<String> {
    resp.cookies()
        .find(|c| c.name() == "session")
        .map(|c| c.value().to_string())
}

#[tokio::test]
async fn sign_up_sign_in_and_like_scenario() {
    let app = TestApp::spawn().await;

    // No such user yet
    let resp = app
        .post_json(
            "/sign-in",
            json!({ "username": "alice", "password": "secret" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.text().await.unwrap(), "Invalid username or password");

    let first_token = app.sign_up("alice", "secret").await;

    let resp = app
        .post_json(
            "/sign-in",
            json!({ "username": "alice", "password": "secret" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie_header = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie_header.contains("Expires="));
    let token = session_from(&resp).unwrap();
    assert_ne!(token, first_token);

    // The session from sign-up stays valid alongside the new one
    let resp = app.get("/profile", Some(&first_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["name"], "alice");
    assert!(profile.get("password").is_none());
    let alice_id = profile["id"].as_str().unwrap().to_string();

    let post = app.create_post(&token, "first post").await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["likesCount"], 0);
    assert_eq!(post["author"], alice_id.as_str());

    let like_path = format!("/posts/{}/like", post_id);
    let resp = app.post_json(&like_path, json!({}), Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let notification: Value = resp.json().await.unwrap();
    assert_eq!(notification["type"], "like");
    assert_eq!(notification["postId"], post_id.as_str());
    assert_eq!(notification["likedBy"], alice_id.as_str());

    // Liking again is refused and changes nothing
    let resp = app.post_json(&like_path, json!({}), Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let posts: Value = app.get("/posts", Some(&token)).await.json().await.unwrap();
    assert_eq!(posts[0]["likesCount"], 1);

    let notifications: Value = app
        .get("/notifications", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["id"], notification["id"]);

    let liked: Value = app
        .get("/posts/liked", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(liked.as_array().unwrap().len(), 1);
    assert_eq!(liked[0]["id"], post_id.as_str());

    let profile: Value = app.get("/profile", Some(&token)).await.json().await.unwrap();
    assert_eq!(profile["likedPosts"], json!([post_id]));
    assert_eq!(profile["posts"], json!([post_id]));
    assert_eq!(profile["notifications"], json!([notification["id"]]));
}

#[tokio::test]
async fn protected_routes_reject_missing_and_unknown_sessions_alike() {
    let app = TestApp::spawn().await;

    for path in ["/profile", "/posts", "/posts/liked", "/notifications"] {
        let missing = app.get(path, None).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED, "{}", path);
        let missing_body = missing.text().await.unwrap();

        let unknown = app.get(path, Some("0123456789abcdef")).await;
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(unknown.text().await.unwrap(), missing_body);
    }
}

#[tokio::test]
async fn logout_clears_cookie_and_ends_session() {
    let app = TestApp::spawn().await;
    let token = app.sign_up("bob", "pw").await;

    let resp = app.post_json("/logout", json!({}), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.post_json("/logout", json!({}), Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(session_from(&resp).as_deref(), Some(""));

    let resp = app.get("/profile", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_profile_is_conflict() {
    let app = TestApp::spawn().await;
    app.sign_up("carol", "pw").await;

    let resp = app
        .post_json(
            "/profile",
            json!({ "name": "carol", "password": "other", "avatar": "" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let session = session_from(&resp);
    assert_eq!(resp.text().await.unwrap(), "User already exists");
    assert!(session.is_none());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/sign-in"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post_json("/profile", json!({ "name": "dave" }), None)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn like_with_bad_or_unknown_post_id() {
    let app = TestApp::spawn().await;
    let token = app.sign_up("erin", "pw").await;

    let resp = app
        .post_json("/posts/not-a-uuid/like", json!({}), Some(&token))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Invalid post ID");

    let missing = uuid::Uuid::now_v7();
    let resp = app
        .post_json(&format!("/posts/{}/like", missing), json!({}), Some(&token))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let notifications: Value = app
        .get("/notifications", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert!(notifications.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn likes_from_several_users_add_up() {
    let app = TestApp::spawn().await;
    let author = app.sign_up("author", "pw").await;
    let post = app.create_post(&author, "popular").await;
    let like_path = format!("/posts/{}/like", post["id"].as_str().unwrap());

    let mut tokens = Vec::new();
    for i in 0..5 {
        tokens.push(app.sign_up(&format!("fan{}", i), "pw").await);
    }

    let responses = futures_join(&app, &like_path, &tokens).await;
    assert!(responses.iter().all(|s| *s == StatusCode::OK));

    let posts: Value = app.get("/posts", Some(&author)).await.json().await.unwrap();
    assert_eq!(posts[0]["likesCount"], tokens.len());
}

async fn futures_join(app: &TestApp, path: &str, tokens: &[String]) -> Vec<StatusCode> {
    let mut handles = Vec::new();
    for token in tokens {
        let client = app.client.clone();
        let url = app.url(path);
        let cookie = format!("session={}", token);
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .header(header::COOKIE, cookie)
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    let mut statuses = Vec::new();
    for h in handles {
        statuses.push(h.await.unwrap());
    }
    statuses
}

#[tokio::test]
async fn profile_update_rules() {
    let app = TestApp::spawn().await;
    let token = app.sign_up("frank", "pw").await;
    app.sign_up("grace", "pw").await;

    let patch = |body: Value| {
        app.client
            .patch(app.url("/profile"))
            .header(header::COOKIE, format!("session={}", token))
            .json(&body)
            .send()
    };

    let resp = patch(json!({ "name": "", "avatar": "" })).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "No update fields provided");

    let resp = patch(json!({ "name": "grace" })).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = patch(json!({ "avatar": "frank.png" })).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let profile: Value = app.get("/profile", Some(&token)).await.json().await.unwrap();
    assert_eq!(profile["avatar"], "frank.png");
    assert_eq!(profile["name"], "frank");
}
