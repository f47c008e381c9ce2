use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Maximum size of the PostgreSQL connection pool.
    pub db_pool_size: usize,
    /// The secret used to sign JWTs.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The lifetime of issued JWTs in days.
    pub token_duration_days: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            db_pool_size: env::var("DB_POOL_SIZE")
                .unwrap_or_else(|_| "32".to_string())
                .parse()
                .context("Invalid DB_POOL_SIZE")?,
            jwt_secret: Zeroizing::new(jwt_secret.into_bytes()),
            token_duration_days: env::var("TOKEN_DURATION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid TOKEN_DURATION_DAYS")?,
        })
    }
}
