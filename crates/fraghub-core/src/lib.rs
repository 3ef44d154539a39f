pub mod announcements;
pub mod auth;
pub mod error;
pub mod events;
pub mod forum;
pub mod gallery;
pub mod materials;
pub mod observability;
pub mod permissions;
pub mod portfolio;
pub mod posts;
pub mod site;
pub mod survey_sessions;
pub mod surveys;
pub mod user;
pub mod votes;

use fraghub_db::DbPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    /// Multi-page survey answers keyed by (session id, survey id).
    pub survey_sessions: survey_sessions::SurveySessions,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let survey_sessions = survey_sessions::SurveySessions::new(Duration::from_secs(
            config.survey_session_idle_seconds,
        ));
        Self {
            db,
            config,
            survey_sessions,
            started_at: Arc::new(Instant::now()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub registration_enabled: bool,
    pub survey_session_idle_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiry_seconds: 7 * 24 * 3600,
            registration_enabled: true,
            survey_session_idle_seconds: 3600,
        }
    }
}
