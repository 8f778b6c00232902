//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use std::env;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Operational API server configuration
    pub api: ApiConfig,

    /// Accrual system base address
    pub accrual_address: String,

    /// Interval between reconciliation cycles
    pub poll_interval: Duration,

    /// PostgreSQL DSN; in-memory store when unset
    pub database_url: Option<String>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let accrual_address = env::var("TALLY_ACCRUAL_ADDRESS")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());
        let poll_interval = Self::load_poll_interval()?;
        let database_url = env::var("DATABASE_URL").ok();

        Ok(Self {
            api,
            accrual_address,
            poll_interval,
            database_url,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            accrual_address: "http://127.0.0.1:8081".to_string(),
            poll_interval: Duration::from_millis(10),
            database_url: None,
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("TALLY_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid TALLY_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("TALLY_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("TALLY_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid TALLY_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_poll_interval() -> DaemonResult<Duration> {
        let secs_str = env::var("TALLY_POLL_INTERVAL_SECS").unwrap_or_else(|_| "1".to_string());

        let secs = secs_str.parse::<u64>().map_err(|_| {
            DaemonError::Config(format!("Invalid TALLY_POLL_INTERVAL_SECS: {}", secs_str))
        })?;
        if secs == 0 {
            return Err(DaemonError::Config(
                "TALLY_POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Duration::from_secs(secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            accrual_address: "http://localhost:8081".to_string(),
            poll_interval: Duration::from_secs(1),
            database_url: None,
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.environment, Environment::Development);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
