use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use crate::auth::{AccessGuard, AllowAll, TokenGuard};
use crate::config::Config;
use crate::db::SqliteCourseRepository;
use crate::pagination::DefaultLimit;
use crate::services::{CourseEndpoints, CourseService, UpdateDatePolicy};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub courses: Arc<CourseEndpoints>,
    pub guard: Arc<dyn AccessGuard>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        default_limit: DefaultLimit,
        date_policy: UpdateDatePolicy,
        guard: Arc<dyn AccessGuard>,
    ) -> Self {
        let repo = Arc::new(SqliteCourseRepository::new(db.clone()));
        let service = CourseService::new(repo, date_policy);

        Self {
            db,
            courses: Arc::new(CourseEndpoints::new(service, default_limit)),
            guard,
        }
    }

    pub fn from_config(db: SqlitePool, config: &Config) -> Self {
        let guard: Arc<dyn AccessGuard> = match &config.api_token {
            Some(token) => Arc::new(TokenGuard::new(token.clone())),
            None => {
                warn!("API_TOKEN is not set; course routes are open to every caller");
                Arc::new(AllowAll)
            }
        };

        Self::new(db, config.default_limit, config.date_policy, guard)
    }
}
