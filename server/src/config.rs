//! Configuration management for the server.

use std::env;
use std::path::PathBuf;

use crate::local::DEFAULT_MAX_OPEN;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Shared secret; when set, requests must carry a bearer token
    pub auth_secret: Option<String>,
    /// Directory holding local tallies, one subdirectory per client
    pub data_dir: PathBuf,
    /// Most local tallies held in memory at once
    pub max_open_tallies: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let max_open_tallies = match env::var("MAX_OPEN_TALLIES") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidMaxOpenTallies)?,
            Err(_) => DEFAULT_MAX_OPEN,
        };

        Ok(Self {
            host,
            port,
            database_url,
            auth_secret,
            data_dir,
            max_open_tallies,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid MAX_OPEN_TALLIES value")]
    InvalidMaxOpenTallies,
}
