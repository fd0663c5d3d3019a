pub mod cookies;
pub mod handlers;
pub mod issuer;
pub mod session;

pub use issuer::CredentialIssuer;
pub use session::{
    IssuedSession, Session, SessionError, SessionStore, MAX_SESSION_TTL_SECS, SESSION_TTL_SECS,
};
