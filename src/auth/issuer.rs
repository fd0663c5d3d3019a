use crate::auth::session::{IssuedSession, SessionStore};
use crate::db::models::User;
use crate::db::{RepositoryError, SocialRepository};
use crate::error::AppError;

/// Checks credentials against stored users and mints sessions for them.
pub struct CredentialIssuer<'a> {
    repo: &'a dyn SocialRepository,
    sessions: &'a SessionStore,
}

impl<'a> CredentialIssuer<'a> {
    pub fn new(repo: &'a dyn SocialRepository, sessions: &'a SessionStore) -> Self {
        Self { repo, sessions }
    }

    /// Verify a username/password pair and open a session.
    /// Unknown users and wrong passwords both fail with `InvalidCredentials`.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<IssuedSession, AppError> {
        let username = username.trim();
        let user = match self.repo.find_user_by_name(username).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound(_)) => {
                tracing::warn!("Sign-in failed for {}", username);
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !constant_time_eq(user.password.as_bytes(), password.as_bytes()) {
            tracing::warn!("Sign-in failed for {}", username);
            return Err(AppError::InvalidCredentials);
        }

        let issued = self.issue(&user).await?;
        tracing::info!("User {} signed in", user.name);
        Ok(issued)
    }

    /// Create a profile and open a session for it.
    /// The name is stored trimmed, so names differing only in surrounding
    /// whitespace collide.
    pub async fn sign_up(&self, mut user: User) -> Result<IssuedSession, AppError> {
        user.name = user.name.trim().to_string();
        if user.name.is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }

        // Fast path for the common case; the UNIQUE constraint settles races
        match self.repo.find_user_by_name(&user.name).await {
            Ok(_) => return Err(AppError::Conflict("User already exists".into())),
            Err(RepositoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.repo.insert_user(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::Conflict("User already exists".into()),
            other => other.into(),
        })?;

        let issued = self.issue(&user).await?;
        tracing::info!("Created profile for {}", user.name);
        Ok(issued)
    }

    async fn issue(&self, user: &User) -> Result<IssuedSession, AppError> {
        Ok(self.sessions.create(&user.name, &user.id).await?)
    }

    /// Drop the session behind `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len_match = a.len() == b.len();
    let max_len = a.len().max(b.len());

    let mut result = 0u8;
    for i in 0..max_len {
        let byte_a = a.get(i).copied().unwrap_or(0);
        let byte_b = b.get(i).copied().unwrap_or(0);
        result |= byte_a ^ byte_b;
    }

    len_match && result == 0
}
