//! Environment-driven API configuration.

use std::env;

use tessera_application::{DEFAULT_TOKEN_LIFETIME_MINUTES, JWT_SECRET_MIN_LENGTH, JwtConfig};
use tessera_core::{AppError, AppResult};

/// Configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Token signing configuration.
    pub jwt: JwtConfig,
    /// Listener host.
    pub api_host: String,
    /// Listener port.
    pub api_port: u16,
}

impl ApiConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;

        let jwt_secret = required_env("JWT_SECRET")?;
        if jwt_secret.len() < JWT_SECRET_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "JWT_SECRET must be at least {JWT_SECRET_MIN_LENGTH} characters"
            )));
        }

        let lifetime_minutes = match env::var("JWT_EXPIRES_MINUTES") {
            Ok(value) => value.parse::<i64>().map_err(|error| {
                AppError::Validation(format!("invalid JWT_EXPIRES_MINUTES: {error}"))
            })?,
            Err(_) => DEFAULT_TOKEN_LIFETIME_MINUTES,
        };
        if lifetime_minutes <= 0 {
            return Err(AppError::Validation(
                "JWT_EXPIRES_MINUTES must be positive".to_owned(),
            ));
        }

        let jwt = JwtConfig::new(jwt_secret)
            .with_lifetime_minutes(lifetime_minutes)
            .with_issuer(optional_env("JWT_ISSUER"))
            .with_audience(optional_env("JWT_AUDIENCE"));

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        Ok(Self {
            database_url,
            jwt,
            api_host,
            api_port,
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
