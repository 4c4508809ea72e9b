//! HTTP source: forwards posted JSON onto the telemetry topic
//!
//! The last forwarded payload and its key are remembered so they can be
//! inspected and re-sent.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::kafka::{OutboundMessage, Publisher};

/// Payload most recently forwarded by the HTTP source
#[derive(Debug, Clone, PartialEq)]
pub struct LastPayload {
    pub key: Option<String>,
    pub data: Value,
}

/// Shared state of the ingest routes
#[derive(Clone)]
pub struct IngestState {
    publisher: Arc<dyn Publisher>,
    topic: String,
    last: Arc<RwLock<Option<LastPayload>>>,
}

impl IngestState {
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            last: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn last(&self) -> Option<LastPayload> {
        self.last.read().await.clone()
    }

    async fn forward(&self, key: Option<String>, data: Value) -> Result<()> {
        tracing::debug!(key = ?key, payload = %data, "Forwarding HTTP payload");

        *self.last.write().await = Some(LastPayload {
            key: key.clone(),
            data: data.clone(),
        });

        self.publisher
            .publish(&OutboundMessage::new(self.topic.as_str(), key, data))
            .await
    }
}

/// Nothing worth re-sending: no payload, `null` or an empty object
fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// `POST /data/`
pub async fn post_data(
    State(state): State<IngestState>,
    Json(data): Json<Value>,
) -> Result<Json<Value>> {
    state.forward(None, data).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Data received and processed"
    })))
}

/// `POST /data/:key`
pub async fn post_data_with_key(
    State(state): State<IngestState>,
    Path(key): Path<String>,
    Json(data): Json<Value>,
) -> Result<Json<Value>> {
    state.forward(Some(key.clone()), data).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Data with key '{}' received and processed", key)
    })))
}

/// `GET /data/last`
pub async fn get_last(State(state): State<IngestState>) -> Json<Value> {
    match state.last().await {
        Some(LastPayload {
            key: Some(key),
            data,
        }) => Json(json!({"status": "success", "key": key, "data": data})),
        Some(LastPayload { key: None, data }) => Json(json!({"status": "success", "data": data})),
        None => Json(json!({"status": "success", "data": {}})),
    }
}

/// `POST /data/resend`
///
/// With nothing stored this still answers 200, with `"status": "error"`.
pub async fn resend_last(State(state): State<IngestState>) -> Result<Json<Value>> {
    let Some(last) = state.last().await.filter(|last| !is_blank(&last.data)) else {
        tracing::debug!("Resend requested with no stored payload");
        return Ok(Json(json!({"status": "error", "message": "No last data to resend"})));
    };

    state
        .publisher
        .publish(&OutboundMessage::new(
            state.topic.as_str(),
            last.key.clone(),
            last.data,
        ))
        .await?;

    let message = match last.key {
        Some(key) => format!("Data with key '{}' resent successfully", key),
        None => "Data resent successfully".to_string(),
    };
    Ok(Json(json!({"status": "success", "message": message})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::MockPublisher;

    fn state(publisher: &MockPublisher) -> IngestState {
        IngestState::new(Arc::new(publisher.clone()), "solar-data")
    }

    #[tokio::test]
    async fn test_post_with_key_publishes_and_remembers() {
        let publisher = MockPublisher::new();
        let state = state(&publisher);

        let Json(body) = post_data_with_key(
            State(state.clone()),
            Path("site-1".to_string()),
            Json(json!({"data": {"panel_id": "p1"}})),
        )
        .await
        .unwrap();

        assert_eq!(body["status"], "success");
        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "solar-data");
        assert_eq!(sent[0].key.as_deref(), Some("site-1"));

        let last = state.last().await.unwrap();
        assert_eq!(last.key.as_deref(), Some("site-1"));
    }

    #[tokio::test]
    async fn test_get_last_before_any_post() {
        let publisher = MockPublisher::new();
        let Json(body) = get_last(State(state(&publisher))).await;
        assert_eq!(body, json!({"status": "success", "data": {}}));
    }

    #[tokio::test]
    async fn test_post_without_key_clears_previous_key() {
        let publisher = MockPublisher::new();
        let state = state(&publisher);

        post_data_with_key(State(state.clone()), Path("k".to_string()), Json(json!({"a": 1})))
            .await
            .unwrap();
        post_data(State(state.clone()), Json(json!({"b": 2}))).await.unwrap();

        let Json(body) = get_last(State(state)).await;
        assert_eq!(body, json!({"status": "success", "data": {"b": 2}}));
    }

    #[tokio::test]
    async fn test_resend_uses_original_key() {
        let publisher = MockPublisher::new();
        let state = state(&publisher);

        post_data_with_key(State(state.clone()), Path("k".to_string()), Json(json!({"a": 1})))
            .await
            .unwrap();
        let Json(body) = resend_last(State(state)).await.unwrap();

        assert_eq!(body["message"], "Data with key 'k' resent successfully");
        let sent = publisher.messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], sent[0]);
    }

    #[tokio::test]
    async fn test_resend_without_data_reports_error_status() {
        let publisher = MockPublisher::new();
        let state = state(&publisher);
        let expected = json!({"status": "error", "message": "No last data to resend"});

        let Json(body) = resend_last(State(state.clone())).await.unwrap();
        assert_eq!(body, expected);

        post_data(State(state.clone()), Json(json!({}))).await.unwrap();
        let Json(body) = resend_last(State(state)).await.unwrap();
        assert_eq!(body, expected);
        assert_eq!(publisher.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let publisher = MockPublisher::failing();
        let result = post_data(State(state(&publisher)), Json(json!({"a": 1}))).await;
        assert!(matches!(result, Err(Error::Kafka(_))));
    }
}
