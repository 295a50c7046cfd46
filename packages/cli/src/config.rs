use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
    pub database_path: Option<PathBuf>,
    /// Recipient used when a notification's natural recipient has no email
    /// on file.
    pub fallback_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "4020".to_string());

        let port = port_str.parse::<u16>()?;

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let database_path = env::var("GUICHET_DB").ok().map(PathBuf::from);

        let fallback_email = env::var("FALLBACK_NOTIFICATION_EMAIL")
            .unwrap_or_else(|_| "support@guichet.local".to_string());

        Ok(Config {
            port,
            cors_origin,
            database_path,
            fallback_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Careful: env vars are process-wide; only assert on the defaults we
        // know the test runner does not set.
        let config = Config::from_env().unwrap();
        assert!(config.port > 0);
        assert!(!config.fallback_email.is_empty());
    }
}
