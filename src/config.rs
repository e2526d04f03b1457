use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_size: usize,
    pub app_mode: AppMode,
    pub engine_command: String,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// Deployment flavor. The desktop shell runs the service locally and manages
/// accounts directly instead of via invitation mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Web,
    Desktop,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Web => "web",
            AppMode::Desktop => "desktop",
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("PAPERFLOW_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PAPERFLOW_HOST: {e}"))?;

        let port: u16 = env_or("PAPERFLOW_PORT", "3001")
            .parse()
            .map_err(|e| format!("Invalid PAPERFLOW_PORT: {e}"))?;

        let base_url = env_or("PAPERFLOW_BASE_URL", &format!("http://{host}:{port}"));

        let allowed_origins: Vec<String> = env_or("PAPERFLOW_ALLOWED_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size: usize = env_or("PAPERFLOW_MAX_UPLOAD_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid PAPERFLOW_MAX_UPLOAD_SIZE: {e}"))?;

        let app_mode = match env_or("PAPERFLOW_APP_MODE", "web").to_lowercase().as_str() {
            "desktop" => AppMode::Desktop,
            _ => AppMode::Web,
        };

        let engine_command = env_or("PAPERFLOW_ENGINE_COMMAND", "paperflow-engine");

        let log_level = env_or("PAPERFLOW_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("PAPERFLOW_SMTP_HOST").ok(),
            std::env::var("PAPERFLOW_SMTP_PORT").ok(),
            std::env::var("PAPERFLOW_SMTP_USER").ok(),
            std::env::var("PAPERFLOW_SMTP_PASS").ok(),
            std::env::var("PAPERFLOW_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid PAPERFLOW_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            allowed_origins,
            max_upload_size,
            app_mode,
            engine_command,
            log_level,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
