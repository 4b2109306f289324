//! Service configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development. Every value is validated at load time; the service refuses
//! to start on nonsensical settings rather than failing later mid-job.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level configuration for the document processing service.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    /// Number of pool workers; also sizes the concurrency semaphore.
    pub worker_count: usize,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
    /// MIME types the ingest layer accepts.
    pub allowed_types: Vec<String>,
    /// Redis URL for the job-status cache. Unset means the in-memory cache
    /// (single-node only).
    pub redis_url: Option<String>,
    /// Postgres URL for the durable store. Unset means the in-memory store
    /// (development only).
    pub database_url: Option<String>,
    /// Trace collector endpoint, recognized for deployments that wire an
    /// exporter into the tracing subscriber.
    pub trace_endpoint: Option<String>,
    /// Downstream analysis service endpoint for the fire-and-forget
    /// completion trigger. Unset disables the trigger.
    pub analysis_endpoint: Option<String>,
    pub ocr: OcrConfig,
}

/// Defaults applied when a job's [`ProcessingOptions`](crate::models::ProcessingOptions)
/// leave OCR settings unspecified.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language codes tried in order, joined with `+`.
    pub languages: Vec<String>,
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: vec!["por".to_string(), "eng".to_string()],
            dpi: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "docproc".to_string(),
            worker_count: default_worker_count(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            redis_url: None,
            database_url: None,
            trace_endpoint: None,
            analysis_endpoint: None,
            ocr: OcrConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            service_name: env_or("SERVICE_NAME", "docproc"),
            worker_count: parse_env("WORKER_COUNT", default_worker_count())?,
            max_file_size: parse_env("MAX_FILE_SIZE", default_max_file_size())?,
            allowed_types: match std::env::var("ALLOWED_TYPES") {
                Ok(v) => v.split(',').map(|s| s.trim().to_string()).collect(),
                Err(_) => default_allowed_types(),
            },
            redis_url: env_opt("REDIS_URL"),
            database_url: env_opt("DATABASE_URL"),
            trace_endpoint: env_opt("TRACE_COLLECTOR_URL"),
            analysis_endpoint: env_opt("ANALYSIS_SERVICE_URL"),
            ocr: OcrConfig {
                languages: env_or("OCR_LANGUAGES", "por,eng")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                dpi: parse_env("OCR_DPI", 300)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Validation(
                "worker_count must be greater than 0".into(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "max_file_size must be greater than 0".into(),
            ));
        }
        if self.allowed_types.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_types must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_worker_count() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_allowed_types() -> Vec<String> {
    [
        "application/pdf",
        "image/png",
        "image/jpeg",
        "image/tiff",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.max_file_size, 52_428_800);
        assert_eq!(config.allowed_types.len(), 4);
        assert_eq!(config.ocr.languages, vec!["por", "eng"]);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = Config {
            worker_count: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }
}
