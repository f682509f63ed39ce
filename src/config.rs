use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

impl JwtConfig {
    /// Longest accepted token lifetime, ten years in minutes.
    pub const MAX_TTL_MINUTES: i64 = 525_600 * 10;

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.access_secret != self.refresh_secret,
            "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ"
        );
        for (key, minutes) in [
            ("ACCESS_TOKEN_TTL_MINUTES", self.ttl_minutes),
            ("REFRESH_TOKEN_TTL_MINUTES", self.refresh_ttl_minutes),
        ] {
            anyhow::ensure!(
                (1..=Self::MAX_TTL_MINUTES).contains(&minutes),
                "{key} must be between 1 and {}, got {minutes}",
                Self::MAX_TTL_MINUTES
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET is not set")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .context("REFRESH_TOKEN_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "todo-api".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "todo-api-users".into()),
            ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 60),
            refresh_ttl_minutes: parse_or("REFRESH_TOKEN_TTL_MINUTES", 60 * 24 * 14),
        };
        jwt.validate()?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("PORT", 8000),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            jwt,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
