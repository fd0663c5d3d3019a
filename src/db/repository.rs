// Repository pattern - isolates all document store side effects
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::models::{Notification, NotificationKind, Post, User};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Blocking task failed: {0}")]
    Task(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

/// Set-valued fields on a user document. Adding to one is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSet {
    Posts,
    LikedPosts,
    Notifications,
}

impl UserSet {
    fn insert_sql(&self) -> &'static str {
        match self {
            UserSet::Posts => "INSERT OR IGNORE INTO user_posts (user_id, post_id) VALUES (?1, ?2)",
            UserSet::LikedPosts => {
                "INSERT OR IGNORE INTO user_liked_posts (user_id, post_id) VALUES (?1, ?2)"
            }
            UserSet::Notifications => {
                "INSERT OR IGNORE INTO user_notifications (user_id, notification_id) VALUES (?1, ?2)"
            }
        }
    }
}

/// Fields a user may change on their own profile. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none()
    }
}

/// Document store operations over the `users`, `posts` and `notifications`
/// collections. Lookups of a single document return `NotFound` when nothing
/// matches.
#[async_trait]
pub trait SocialRepository: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<User, RepositoryError>;

    async fn find_user_by_name(&self, name: &str) -> Result<User, RepositoryError>;

    /// Fails with `Conflict` when the name is taken.
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), RepositoryError>;

    /// Returns true when the value was not already in the set.
    async fn add_to_user_set(
        &self,
        user_id: &str,
        set: UserSet,
        value: &str,
    ) -> Result<bool, RepositoryError>;

    async fn insert_post(&self, post: &Post) -> Result<(), RepositoryError>;

    async fn find_post(&self, id: &str) -> Result<Post, RepositoryError>;

    async fn find_posts_by_author(&self, author: &str) -> Result<Vec<Post>, RepositoryError>;

    /// Posts in the user's liked set, in the order they were liked.
    async fn find_liked_posts(&self, user_id: &str) -> Result<Vec<Post>, RepositoryError>;

    /// Arithmetic increment of `likesCount`, never read-modify-write.
    async fn increment_likes(&self, post_id: &str) -> Result<(), RepositoryError>;

    /// Reset `likesCount` to the number of users whose liked set holds the
    /// post. Returns true when the stored counter was wrong.
    async fn reconcile_likes(&self, post_id: &str) -> Result<bool, RepositoryError>;

    /// Reconcile every post. Returns how many counters were corrected.
    async fn reconcile_all_likes(&self) -> Result<u64, RepositoryError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), RepositoryError>;

    async fn find_notifications_by_liker(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, RepositoryError>;
}

/// SQLite implementation. Each call runs on the blocking pool and is bounded
/// by `timeout`.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
    timeout: Duration,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            op(&*conn)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(RepositoryError::Task(e.to_string())),
            Err(_) => Err(RepositoryError::Timeout(self.timeout)),
        }
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn load_set(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
    rows.collect()
}

fn load_user(conn: &Connection, column: &str, value: &str) -> Result<User, RepositoryError> {
    let sql = format!(
        "SELECT id, name, password, avatar FROM users WHERE {} = ?1",
        column
    );
    let row = conn
        .query_row(&sql, params![value], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .optional()?;

    let (id, name, password, avatar) =
        row.ok_or_else(|| RepositoryError::NotFound(format!("user {}", value)))?;

    let posts = load_set(
        conn,
        "SELECT post_id FROM user_posts WHERE user_id = ?1 ORDER BY rowid",
        &id,
    )?;
    let liked_posts = load_set(
        conn,
        "SELECT post_id FROM user_liked_posts WHERE user_id = ?1 ORDER BY rowid",
        &id,
    )?;
    let notifications = load_set(
        conn,
        "SELECT notification_id FROM user_notifications WHERE user_id = ?1 ORDER BY rowid",
        &id,
    )?;

    Ok(User {
        id,
        name,
        password,
        avatar,
        posts,
        liked_posts,
        notifications,
    })
}

fn post_from_row(row: &rusqlite::Row<'_>) -> Result<Post, rusqlite::Error> {
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        author: row.get(2)?,
        likes_count: row.get(3)?,
    })
}

#[async_trait]
impl SocialRepository for SqliteRepository {
    async fn find_user_by_id(&self, id: &str) -> Result<User, RepositoryError> {
        let id = id.to_string();
        self.run(move |conn| load_user(conn, "id", &id)).await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<User, RepositoryError> {
        let name = name.to_string();
        self.run(move |conn| load_user(conn, "name", &name)).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        let user = user.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (id, name, password, avatar) VALUES (?1, ?2, ?3, ?4)",
                params![user.id, user.name, user.password, user.avatar],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    RepositoryError::Conflict(format!("user {} already exists", user.name))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), RepositoryError> {
        let id = id.to_string();
        let update = update.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET name = COALESCE(?2, name), avatar = COALESCE(?3, avatar)
                     WHERE id = ?1",
                    params![id, update.name, update.avatar],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        RepositoryError::Conflict("name is already taken".into())
                    } else {
                        e.into()
                    }
                })?;
            if changed == 0 {
                return Err(RepositoryError::NotFound(format!("user {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn add_to_user_set(
        &self,
        user_id: &str,
        set: UserSet,
        value: &str,
    ) -> Result<bool, RepositoryError> {
        let user_id = user_id.to_string();
        let value = value.to_string();
        self.run(move |conn| {
            let inserted = conn.execute(set.insert_sql(), params![user_id, value])?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn insert_post(&self, post: &Post) -> Result<(), RepositoryError> {
        let post = post.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO posts (id, content, author, likes_count) VALUES (?1, ?2, ?3, ?4)",
                params![post.id, post.content, post.author, post.likes_count],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_post(&self, id: &str) -> Result<Post, RepositoryError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, content, author, likes_count FROM posts WHERE id = ?1",
                params![id],
                post_from_row,
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("post {}", id)))
        })
        .await
    }

    async fn find_posts_by_author(&self, author: &str) -> Result<Vec<Post>, RepositoryError> {
        let author = author.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, author, likes_count FROM posts
                 WHERE author = ?1 ORDER BY rowid",
            )?;
            let posts = stmt
                .query_map(params![author], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
        .await
    }

    async fn find_liked_posts(&self, user_id: &str) -> Result<Vec<Post>, RepositoryError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.content, p.author, p.likes_count FROM posts p
                 JOIN user_liked_posts l ON l.post_id = p.id
                 WHERE l.user_id = ?1 ORDER BY l.rowid",
            )?;
            let posts = stmt
                .query_map(params![user_id], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
        .await
    }

    async fn increment_likes(&self, post_id: &str) -> Result<(), RepositoryError> {
        let post_id = post_id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                params![post_id],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound(format!("post {}", post_id)));
            }
            Ok(())
        })
        .await
    }

    async fn reconcile_likes(&self, post_id: &str) -> Result<bool, RepositoryError> {
        let post_id = post_id.to_string();
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
                params![post_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(RepositoryError::NotFound(format!("post {}", post_id)));
            }
            let changed = conn.execute(
                "UPDATE posts
                 SET likes_count = (SELECT COUNT(*) FROM user_liked_posts l WHERE l.post_id = posts.id)
                 WHERE id = ?1
                   AND likes_count != (SELECT COUNT(*) FROM user_liked_posts l WHERE l.post_id = posts.id)",
                params![post_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn reconcile_all_likes(&self) -> Result<u64, RepositoryError> {
        self.run(|conn| {
            let changed = conn.execute(
                "UPDATE posts
                 SET likes_count = (SELECT COUNT(*) FROM user_liked_posts l WHERE l.post_id = posts.id)
                 WHERE likes_count != (SELECT COUNT(*) FROM user_liked_posts l WHERE l.post_id = posts.id)",
                [],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let n = notification.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO notifications (id, kind, post_id, liked_by) VALUES (?1, ?2, ?3, ?4)",
                params![n.id, n.kind.as_str(), n.post_id, n.liked_by],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_notifications_by_liker(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, post_id, liked_by FROM notifications
                 WHERE liked_by = ?1 ORDER BY rowid",
            )?;
            let notifications = stmt
                .query_map(params![user_id], |row| {
                    let kind: String = row.get(1)?;
                    let kind = NotificationKind::parse(&kind).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            format!("unknown notification kind {}", kind).into(),
                        )
                    })?;
                    Ok(Notification {
                        id: row.get(0)?,
                        kind,
                        post_id: row.get(2)?,
                        liked_by: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(notifications)
        })
        .await
    }
}
