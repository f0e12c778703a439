//! Import configuration
//!
//! Values come from built-in defaults, then the environment (a `.env` file is
//! loaded by the binary), then command-line flags applied with the `with_*`
//! builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pbs_common::PbsError;

/// Default base URL of the PBS data API.
pub const DEFAULT_API_BASE_URL: &str = "https://data-api.health.gov.au/pbs/api/v3";

/// Public subscription key published for the PBS data API.
pub const DEFAULT_SUBSCRIPTION_KEY: &str = "2384af7c667342ceb5a736fe29f1dc6b";

/// Default delay between API requests in seconds.
///
/// The published limit is one request per 20 seconds; throttling in practice
/// is at least that strict.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 20;

/// Default HTTP timeout in seconds (some tables are tens of megabytes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default directory for generated databases.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Configuration for the API import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub subscription_key: String,
    /// Minimum time between the starts of consecutive requests
    pub request_delay_secs: u64,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            subscription_key: DEFAULT_SUBSCRIPTION_KEY.to_string(),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("PBS_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            subscription_key: std::env::var("PBS_API_SUBSCRIPTION_KEY")
                .unwrap_or_else(|_| DEFAULT_SUBSCRIPTION_KEY.to_string()),
            request_delay_secs: std::env::var("PBS_API_REQUEST_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
            timeout_secs: std::env::var("PBS_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            output_dir: std::env::var("PBS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_subscription_key(mut self, key: impl Into<String>) -> Self {
        self.subscription_key = key.into();
        self
    }

    pub fn with_request_delay(mut self, delay_secs: u64) -> Self {
        self.request_delay_secs = delay_secs;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of one endpoint, without query parameters
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// Output database path for a schedule's effective date
    pub fn database_path(&self, effective_date: &str) -> PathBuf {
        self.output_dir.join(format!("pbs-{}.sqlite3", effective_date))
    }

    pub fn validate(&self) -> Result<(), PbsError> {
        if self.base_url.trim().is_empty() {
            return Err(PbsError::config("API base URL cannot be empty"));
        }
        if self.subscription_key.trim().is_empty() {
            return Err(PbsError::config("API subscription key cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(PbsError::config("API timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Configuration for the text extract import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Zip archive of text extracts
    pub archive: PathBuf,
    /// Schema script run on the fresh database; the bundled one when `None`
    pub schema_script: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl TextConfig {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            schema_script: None,
            output_dir: std::env::var("PBS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    pub fn with_schema_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_script = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Output database path for a date suffix
    pub fn database_path(&self, date_suffix: &str) -> PathBuf {
        self.output_dir.join(format!("pbs-{}.sqlite3", date_suffix))
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    pub fn validate(&self) -> Result<(), PbsError> {
        if !self.archive.is_file() {
            return Err(PbsError::config(format!(
                "Archive not found: {}",
                self.archive.display()
            )));
        }
        if let Some(script) = &self.schema_script {
            if !script.is_file() {
                return Err(PbsError::config(format!(
                    "Schema script not found: {}",
                    script.display()
                )));
            }
        }
        Ok(())
    }
}
