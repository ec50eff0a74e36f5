//! HTTP segmentation tracker.
//!
//! Each `TrackerContext` maps to one server-side session created with
//! `POST /v1/sessions` and removed with `DELETE /v1/sessions/{id}`.

use async_trait::async_trait;
use tracing::{debug, warn};
use vtrack_media::RgbImage;
use vtrack_models::{BoundingBox, TrackId};
use vtrack_tracking::{MaskField, SegmentationModel, TrackerContext, TrackingResult};

use crate::client::check_status;
use crate::config::MlClientConfig;
use crate::error::{MlClientError, MlClientResult};
use crate::wire::{encode_frame, FrameRequest, PromptRequest, SessionResponse, TrackResponse};

/// Segmentation model served by the inference service.
#[derive(Clone)]
pub struct HttpSegmentationModel {
    client: reqwest::Client,
    config: MlClientConfig,
}

impl HttpSegmentationModel {
    pub fn new(client: reqwest::Client, config: MlClientConfig) -> Self {
        Self { client, config }
    }

    async fn create_session(&self) -> MlClientResult<HttpTrackerContext> {
        let response = self
            .client
            .post(self.config.url("/v1/sessions"))
            .send()
            .await?;
        let body: SessionResponse = check_status(response).await?.json().await?;
        debug!(session_id = %body.session_id, "Tracker session opened");

        Ok(HttpTrackerContext {
            client: self.client.clone(),
            base: self.config.url(&format!("/v1/sessions/{}", body.session_id)),
            session_id: Some(body.session_id),
        })
    }
}

#[async_trait]
impl SegmentationModel for HttpSegmentationModel {
    async fn open_context(&self) -> TrackingResult<Box<dyn TrackerContext>> {
        Ok(Box::new(self.create_session().await?))
    }

    fn name(&self) -> &str {
        "http-segmenter"
    }
}

/// One server-side tracking session.
pub struct HttpTrackerContext {
    client: reqwest::Client,
    base: String,
    session_id: Option<String>,
}

impl HttpTrackerContext {
    fn ensure_open(&self) -> MlClientResult<()> {
        match self.session_id {
            Some(_) => Ok(()),
            None => Err(MlClientError::SessionClosed),
        }
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> MlClientResult<reqwest::Response> {
        self.ensure_open()?;
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn track(&self, image: &RgbImage) -> MlClientResult<Vec<MaskField>> {
        let request = FrameRequest {
            image: encode_frame(image)?,
        };
        let body: TrackResponse = self.post_json("/track", &request).await?.json().await?;

        body.objects
            .iter()
            .map(|o| Ok(MaskField::new(TrackId(o.obj_id), o.decode_logits()?)))
            .collect()
    }

    async fn delete(&mut self) -> MlClientResult<()> {
        if self.session_id.take().is_none() {
            return Ok(());
        }
        let response = self.client.delete(&self.base).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TrackerContext for HttpTrackerContext {
    async fn load_first_frame(&mut self, image: &RgbImage) -> TrackingResult<()> {
        let request = FrameRequest {
            image: encode_frame(image).map_err(MlClientError::from)?,
        };
        self.post_json("/first-frame", &request).await?;
        Ok(())
    }

    async fn add_prompt(
        &mut self,
        frame_index: u64,
        track_id: TrackId,
        bbox: BoundingBox,
    ) -> TrackingResult<()> {
        let request = PromptRequest {
            frame_idx: frame_index,
            obj_id: track_id.get(),
            bbox: [bbox.x1, bbox.y1, bbox.x2, bbox.y2],
        };
        self.post_json("/prompts", &request).await?;
        Ok(())
    }

    async fn advance(&mut self, image: &RgbImage) -> TrackingResult<Vec<MaskField>> {
        Ok(self.track(image).await?)
    }

    async fn close(&mut self) -> TrackingResult<()> {
        Ok(self.delete().await?)
    }
}

impl Drop for HttpTrackerContext {
    fn drop(&mut self) {
        let Some(session_id) = self.session_id.take() else {
            return;
        };
        // Session abandoned on an error path; release it in the background.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = self.client.clone();
                let url = self.base.clone();
                handle.spawn(async move {
                    if let Err(e) = client.delete(&url).send().await {
                        warn!(session_id = %session_id, error = %e, "Failed to release tracker session");
                    }
                });
            }
            Err(_) => {
                warn!(session_id = %session_id, "Tracker session dropped outside a runtime");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::encode_logits;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_session(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"session_id": "s-1"})))
            .expect(1)
            .mount(server)
            .await;
    }

    fn model(server: &MockServer) -> HttpSegmentationModel {
        let config = MlClientConfig::default().with_base_url(server.uri());
        HttpSegmentationModel::new(reqwest::Client::new(), config)
    }

    #[tokio::test]
    async fn test_context_prompts_and_tracks() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/s-1/first-frame"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/s-1/prompts"))
            .and(body_json(json!({"frame_idx": 0, "obj_id": 2, "bbox": [1.0, 2.0, 3.0, 4.0]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/s-1/track"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "objects": [
                    {"obj_id": 2, "height": 1, "width": 2, "logits": encode_logits(&[-1.0, 3.5])}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sessions/s-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut context = model(&server).open_context().await.unwrap();
        let image = RgbImage::new(2, 1);
        context.load_first_frame(&image).await.unwrap();
        context
            .add_prompt(0, TrackId(2), BoundingBox::new(1.0, 2.0, 3.0, 4.0))
            .await
            .unwrap();
        let fields = context.advance(&image).await.unwrap();
        context.close().await.unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].track_id, TrackId(2));
        assert_eq!(fields[0].logits[[0, 1]], 3.5);
    }

    #[tokio::test]
    async fn test_closed_context_rejects_calls() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sessions/s-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut context = model(&server).open_context().await.unwrap();
        context.close().await.unwrap();
        // A second close is a no-op.
        context.close().await.unwrap();

        let err = context.advance(&RgbImage::new(2, 2)).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn test_track_error_is_model_failure() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/s-1/track"))
            .respond_with(ResponseTemplate::new(409).set_body_string("not prompted"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sessions/s-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut context = model(&server).open_context().await.unwrap();
        let err = context.advance(&RgbImage::new(2, 2)).await.unwrap_err();
        assert!(err.is_model_failure());
        context.close().await.unwrap();
    }
}
