//! Configuration module for the directory admin backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Default delete-with-undo window.
pub const DEFAULT_UNDO_WINDOW_MS: u64 = 5000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service key accepted as an admin identity (optional)
    pub service_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How long a requested delete can still be undone
    pub undo_window: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let service_key = env::var("DIRADMIN_SERVICE_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let db_path = env::var("DIRADMIN_DB_PATH")
            .unwrap_or_else(|_| "./data/directory.sqlite".to_string())
            .into();

        let bind_addr = env::var("DIRADMIN_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid DIRADMIN_BIND_ADDR: {}", e)))?;

        let log_level = env::var("DIRADMIN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let undo_window_ms = match env::var("DIRADMIN_UNDO_WINDOW_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::Internal(format!("Invalid DIRADMIN_UNDO_WINDOW_MS: {}", e))
            })?,
            Err(_) => DEFAULT_UNDO_WINDOW_MS,
        };

        Ok(Self {
            service_key,
            db_path,
            bind_addr,
            log_level,
            undo_window: Duration::from_millis(undo_window_ms),
        })
    }
}
