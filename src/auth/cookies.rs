use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

/// A `Cookie` header that is not valid visible ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Malformed cookie header")]
pub struct MalformedCookie;

const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Format an instant as an HTTP date (RFC 7231 IMF-fixdate).
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value carrying a session token until `expires_at`.
pub fn session_cookie(name: &str, token: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Expires={}",
        name,
        token,
        http_date(expires_at)
    )
}

/// `Set-Cookie` value that empties the session cookie with an already-past expiry.
pub fn clear_session_cookie(name: &str) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Expires={}; Max-Age=0",
        name,
        EPOCH_HTTP_DATE
    )
}

/// Find a cookie by name across every `Cookie` header.
pub fn cookie_value<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> Result<Option<&'a str>, MalformedCookie> {
    for value in headers.get_all(header::COOKIE).iter() {
        let value = value.to_str().map_err(|_| MalformedCookie)?;
        let found = value.split(';').map(|s| s.trim()).find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        });
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}
