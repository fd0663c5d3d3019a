use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::db::SocialRepository;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SocialRepository>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<dyn SocialRepository>, config: Config) -> Self {
        let sessions = Arc::new(SessionStore::with_ttl(config.session_ttl()));
        Self {
            repo,
            sessions,
            config,
        }
    }
}
