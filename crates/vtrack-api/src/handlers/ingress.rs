//! Push ingress: one message tracks one video.
//!
//! The body is a push envelope whose `message.data` carries base64-encoded
//! JSON `{"video_path": "...", "video_id": "..."}`. Malformed envelopes are
//! rejected with 400 before any model is touched.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use tracing::{info, warn};
use vtrack_models::{TrackVideoRequest, VideoId};
use vtrack_worker::ProcessingSummary;

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_ingress_rejected;
use crate::state::AppState;

/// Push delivery envelope.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Message carried by a push envelope.
#[derive(Debug, Deserialize)]
pub struct PushMessage {
    pub data: String,
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TriggerPayload {
    #[serde(default)]
    video_path: Option<String>,
    #[serde(default)]
    video_id: Option<String>,
}

/// Decode a push envelope body into a tracking request.
pub fn decode_envelope(body: &[u8]) -> ApiResult<(PushEnvelope, TrackVideoRequest)> {
    if body.is_empty() {
        return Err(ApiError::bad_request("No push message received"));
    }

    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid message format: {}", e)))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(envelope.message.data.trim())
        .map_err(|e| ApiError::bad_request(format!("message.data is not base64: {}", e)))?;

    let payload: TriggerPayload = serde_json::from_slice(&data)
        .map_err(|e| ApiError::bad_request(format!("message.data is not a JSON object: {}", e)))?;

    let video_path = payload
        .video_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("video_path is required"))?;

    let video_id = match payload.video_id {
        Some(id) => VideoId::parse(id).map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => VideoId::new(),
    };

    Ok((envelope, TrackVideoRequest { video_path, video_id }))
}

/// `POST /`: track the referenced video and publish its crop batches.
pub async fn track_video(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ProcessingSummary>> {
    let (envelope, request) = decode_envelope(&body).inspect_err(|e| {
        record_ingress_rejected();
        warn!(error = %e, "Rejected push envelope");
    })?;

    info!(
        video_id = %request.video_id,
        video_path = %request.video_path,
        message_id = envelope.message.message_id.as_deref().unwrap_or("-"),
        subscription = envelope.subscription.as_deref().unwrap_or("-"),
        attributes = envelope.message.attributes.len(),
        "Processing video"
    );

    let summary = state.processor.process(&request).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(payload: &str) -> Vec<u8> {
        let data = base64::engine::general_purpose::STANDARD.encode(payload);
        serde_json::json!({
            "message": {"data": data, "messageId": "42"},
            "subscription": "projects/p/subscriptions/track"
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_decodes_valid_envelope() {
        let body = envelope(r#"{"video_path": "source/game1.mp4", "video_id": "game1"}"#);
        let (envelope, request) = decode_envelope(&body).unwrap();

        assert_eq!(request.video_path, "source/game1.mp4");
        assert_eq!(request.video_id.as_str(), "game1");
        assert_eq!(envelope.message.message_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_missing_video_id_is_generated() {
        let body = envelope(r#"{"video_path": "source/game1.mp4"}"#);
        let (_, request) = decode_envelope(&body).unwrap();

        assert!(VideoId::parse(request.video_id.as_str()).is_ok());
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        let bodies: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"not json".to_vec(),
            br#"{"subscription": "s"}"#.to_vec(),
            br#"{"message": {"data": "%%%"}}"#.to_vec(),
            envelope("[1, 2]"),
            envelope(r#"{"video_id": "game1"}"#),
            envelope(r#"{"video_path": "  "}"#),
            envelope(r#"{"video_path": "source/a.mp4", "video_id": "../etc"}"#),
        ];

        for body in bodies {
            let err = decode_envelope(&body).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{:?}", err);
        }
    }
}
