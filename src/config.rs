use tracing::warn;

/// Fallback signing secret for local development only.
const DEV_SESSION_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:intranet.db?mode=rwc".into());

        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!(
                    "SESSION_SECRET not set; falling back to the built-in development \
                     secret, which is unsafe for production"
                );
                DEV_SESSION_SECRET.into()
            }
        };

        let session = SessionConfig {
            secret,
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(480),
        };

        Ok(Self {
            database_url,
            session,
        })
    }
}
