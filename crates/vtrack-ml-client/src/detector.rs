//! HTTP object detector.

use async_trait::async_trait;
use tracing::debug;
use vtrack_media::RgbImage;
use vtrack_models::BoundingBox;
use vtrack_tracking::{Detector, RawDetection, TrackingResult};

use crate::client::check_status;
use crate::config::MlClientConfig;
use crate::error::MlClientResult;
use crate::wire::{encode_frame, DetectRequest, DetectResponse};

/// Detector backed by the inference service's `/v1/detect` endpoint.
#[derive(Clone)]
pub struct HttpDetector {
    client: reqwest::Client,
    config: MlClientConfig,
}

impl HttpDetector {
    pub fn new(client: reqwest::Client, config: MlClientConfig) -> Self {
        Self { client, config }
    }

    async fn detect(
        &self,
        image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> MlClientResult<Vec<RawDetection>> {
        let request = DetectRequest {
            image: encode_frame(image)?,
            confidence,
            iou_threshold,
            model_id: &self.config.detection_model_id,
        };

        let response = self
            .client
            .post(self.config.url("/v1/detect"))
            .json(&request)
            .send()
            .await?;
        let body: DetectResponse = check_status(response).await?.json().await?;

        debug!(
            model = %self.config.detection_model_id,
            predictions = body.predictions.len(),
            "Detection response"
        );

        Ok(body
            .predictions
            .into_iter()
            .map(|p| RawDetection::new(p.class_id, BoundingBox::new(p.x1, p.y1, p.x2, p.y2), p.confidence))
            .collect())
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn infer(
        &self,
        image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> TrackingResult<Vec<RawDetection>> {
        Ok(self.detect(image, confidence, iou_threshold).await?)
    }

    fn name(&self) -> &str {
        &self.config.detection_model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detector(server: &MockServer) -> HttpDetector {
        let config = MlClientConfig::default().with_base_url(server.uri());
        HttpDetector::new(reqwest::Client::new(), config)
    }

    #[tokio::test]
    async fn test_infer_preserves_prediction_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/detect"))
            .and(body_partial_json(json!({
                "confidence": 0.4,
                "model_id": "basketball-player-detection-3-ycjdo/4"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    {"class_id": 4, "x1": 50.0, "y1": 5.0, "x2": 70.0, "y2": 45.0, "confidence": 0.7},
                    {"class_id": 3, "x1": 10.0, "y1": 8.0, "x2": 30.0, "y2": 48.0, "confidence": 0.9}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let detections = detector(&server)
            .infer(&RgbImage::new(8, 8), 0.4, 0.9)
            .await
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, 4);
        assert_eq!(detections[0].bbox, BoundingBox::new(50.0, 5.0, 70.0, 45.0));
        assert_eq!(detections[1].confidence, 0.9);
    }

    #[tokio::test]
    async fn test_infer_maps_http_error_to_inference_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/detect"))
            .respond_with(ResponseTemplate::new(500).set_body_string("cuda oom"))
            .mount(&server)
            .await;

        let err = detector(&server)
            .infer(&RgbImage::new(8, 8), 0.4, 0.9)
            .await
            .unwrap_err();

        assert!(err.is_model_failure());
        assert!(err.to_string().contains("cuda oom"));
    }
}
