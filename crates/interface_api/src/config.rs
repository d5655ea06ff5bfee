//! API configuration

use std::path::PathBuf;

use serde::Deserialize;

use domain_claims::EngineConfig;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

/// Where reviews, audit events and ledger updates are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON-lines files under `data_dir`, single process
    File,
    /// PostgreSQL at `database_url`
    Postgres,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage_backend: StorageBackend,
    /// Root of the file backend
    pub data_dir: PathBuf,
    /// Database URL
    pub database_url: String,
    /// Fraud threshold used when a request does not carry one
    pub fraud_threshold: f64,
    /// Decisions below this confidence go to human review
    pub review_confidence_threshold: f64,
    /// How often undelivered audit events are retried
    pub audit_retry_secs: u64,
    /// Undelivered audit events held in memory before the oldest is dropped
    pub audit_backlog_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
            storage_backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
            database_url: "postgres://localhost/claims".to_string(),
            fraud_threshold: 0.5,
            review_confidence_threshold: 50.0,
            audit_retry_secs: 30,
            audit_backlog_capacity: 10_000,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", "plain")?
            .set_default("storage_backend", "file")?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("database_url", defaults.database_url)?
            .set_default("fraud_threshold", defaults.fraud_threshold)?
            .set_default("review_confidence_threshold", defaults.review_confidence_threshold)?
            .set_default("audit_retry_secs", defaults.audit_retry_secs as i64)?
            .set_default("audit_backlog_capacity", defaults.audit_backlog_capacity as i64)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine tunables with this deployment's thresholds applied
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        engine.default_fraud_threshold = self.fraud_threshold;
        engine.escalation.confidence_threshold = self.review_confidence_threshold;
        engine.audit_backlog_capacity = self.audit_backlog_capacity;
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_reach_engine_config() {
        let engine = ApiConfig::default().engine_config();
        assert_eq!(engine, EngineConfig::default());
        assert!(engine.validate().is_ok());
    }

    #[test]
    fn test_overridden_thresholds_are_applied() {
        let config = ApiConfig {
            fraud_threshold: 0.65,
            review_confidence_threshold: 70.0,
            audit_backlog_capacity: 250,
            ..ApiConfig::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.default_fraud_threshold, 0.65);
        assert_eq!(engine.escalation.confidence_threshold, 70.0);
        assert_eq!(engine.audit_backlog_capacity, 250);
    }

    #[test]
    fn test_out_of_range_threshold_fails_validation() {
        let config = ApiConfig {
            fraud_threshold: 1.5,
            ..ApiConfig::default()
        };
        assert!(config.engine_config().validate().is_err());
    }

    #[test]
    fn test_server_addr() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..ApiConfig::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }
}
