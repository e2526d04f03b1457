use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::email::SystemMailer;
use crate::process::engine::DocumentEngine;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub directory: Arc<dyn UserDirectory>,
    pub engine: Arc<dyn DocumentEngine>,
    pub system_mailer: Option<Arc<SystemMailer>>,
    pub login_limiter: LoginRateLimiter,
}
