// ABOUTME: Environment-based server configuration
// ABOUTME: Port, CORS origin, database path, and lending policy knobs

use std::env;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
    pub database_path: String,
    /// Seconds between overdue sweeps.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "4001".to_string())
            .parse::<u16>()?;
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "labstock.db".to_string());

        let sweep_interval_secs = parse_u64("SWEEP_INTERVAL_SECS", 300)?;

        Ok(Config {
            port,
            cors_origin,
            database_path,
            sweep_interval_secs,
        })
    }
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue(name, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Env-dependent keys are not set under `cargo test`
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 4001);
        assert_eq!(config.database_path, "labstock.db");
        assert_eq!(config.sweep_interval_secs, 300);
    }

    #[test]
    fn test_parse_u64_rejects_garbage() {
        std::env::set_var("TEST_SWEEP_GARBAGE", "not-a-number");
        let err = parse_u64("TEST_SWEEP_GARBAGE", 60).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("TEST_SWEEP_GARBAGE", _)));
        std::env::remove_var("TEST_SWEEP_GARBAGE");
    }
}
