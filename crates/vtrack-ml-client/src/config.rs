//! Inference service client configuration.

use std::time::Duration;

use crate::error::{MlClientError, MlClientResult};

/// Default detection model.
pub const DEFAULT_DETECTION_MODEL_ID: &str = "basketball-player-detection-3-ycjdo/4";

#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Inference service base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Model identifier sent with detection requests
    pub detection_model_id: String,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            timeout: Duration::from_secs(60),
            detection_model_id: DEFAULT_DETECTION_MODEL_ID.to_string(),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ML_SERVICE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("ML_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            detection_model_id: std::env::var("DETECTION_MODEL_ID")
                .unwrap_or(defaults.detection_model_id),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the shared HTTP client.
    pub fn http_client(&self) -> MlClientResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| MlClientError::Config(format!("failed to build HTTP client: {}", e)))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
