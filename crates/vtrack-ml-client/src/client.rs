//! Shared HTTP plumbing and client construction.

use std::sync::Arc;

use tracing::info;

use crate::config::MlClientConfig;
use crate::detector::HttpDetector;
use crate::error::{MlClientError, MlClientResult};
use crate::segmenter::HttpSegmentationModel;

/// Both inference clients, sharing one connection pool.
pub struct MlClient {
    pub detector: Arc<HttpDetector>,
    pub segmenter: Arc<HttpSegmentationModel>,
}

impl MlClient {
    pub fn new(config: MlClientConfig) -> MlClientResult<Self> {
        let http = config.http_client()?;
        info!(url = %config.base_url, model = %config.detection_model_id, "Inference client configured");
        Ok(Self {
            detector: Arc::new(HttpDetector::new(http.clone(), config.clone())),
            segmenter: Arc::new(HttpSegmentationModel::new(http, config)),
        })
    }

    pub fn from_env() -> MlClientResult<Self> {
        Self::new(MlClientConfig::from_env())
    }
}

/// Turn a non-success response into `MlClientError::Status` with its body.
pub(crate) async fn check_status(response: reqwest::Response) -> MlClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MlClientError::Status {
        status: status.as_u16(),
        body,
    })
}
