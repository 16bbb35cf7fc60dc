//! HTTP send API: enqueue messages on a named queue.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::errors::SqsWorkerError;
use crate::queue::QueueClient;

/// Queues the API is allowed to send to, by name.
#[derive(Clone, Default)]
pub struct QueueRegistry {
    queues: HashMap<String, Arc<dyn QueueClient>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(mut self, name: impl Into<String>, queue: Arc<dyn QueueClient>) -> Self {
        self.queues.insert(name.into(), queue);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn QueueClient>> {
        self.queues.get(name).cloned()
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub queue_name: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessagesRequest {
    pub queue_name: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessagesResponse {
    pub success: bool,
    pub success_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failure of a whole request, rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    UnknownQueue(String),
    Queue(SqsWorkerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::UnknownQueue(name) => {
                (StatusCode::NOT_FOUND, format!("unknown queue: {}", name))
            }
            ApiError::Queue(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        let body = serde_json::json!({ "success": false, "error": error });
        (status, Json(body)).into_response()
    }
}

/// Create the send API routes
pub fn routes(registry: QueueRegistry) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sqs/send-message", post(send_message))
        .route("/sqs/send-messages", post(send_messages))
        .with_state(Arc::new(registry))
}

async fn health() -> &'static str {
    "ok"
}

fn lookup(registry: &QueueRegistry, queue_name: &str) -> Result<Arc<dyn QueueClient>, ApiError> {
    if queue_name.trim().is_empty() {
        return Err(ApiError::BadRequest("queue_name is required".to_string()));
    }
    registry
        .get(queue_name)
        .ok_or_else(|| ApiError::UnknownQueue(queue_name.to_string()))
}

/// POST /sqs/send-message - Send a single message
pub async fn send_message(
    State(registry): State<Arc<QueueRegistry>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let queue = lookup(&registry, &req.queue_name)?;
    if req.message.is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let message_id = queue.send(&req.message).await.map_err(|e| {
        tracing::error!(queue = %req.queue_name, error = %e, "Failed to send message");
        ApiError::Queue(e)
    })?;

    tracing::info!(queue = %req.queue_name, %message_id, "Sent message");
    Ok(Json(SendMessageResponse {
        success: true,
        message_id: Some(message_id),
    }))
}

/// POST /sqs/send-messages - Send a batch, one message at a time
///
/// Individual failures are collected in `failed_messages`; the request
/// itself still succeeds with a partial count.
pub async fn send_messages(
    State(registry): State<Arc<QueueRegistry>>,
    Json(req): Json<SendMessagesRequest>,
) -> Result<Json<SendMessagesResponse>, ApiError> {
    let queue = lookup(&registry, &req.queue_name)?;
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest("no messages provided".to_string()));
    }

    let mut failed_messages = Vec::new();
    for (index, message) in req.messages.iter().enumerate() {
        if let Err(e) = queue.send(message).await {
            tracing::error!(queue = %req.queue_name, index, error = %e, "Failed to send message");
            failed_messages.push(message.clone());
        }
    }

    let success_count = req.messages.len() - failed_messages.len();
    let error = if failed_messages.is_empty() {
        tracing::info!(queue = %req.queue_name, count = success_count, "Sent all messages");
        None
    } else {
        tracing::warn!(
            queue = %req.queue_name,
            failed = failed_messages.len(),
            succeeded = success_count,
            "Partially failed to send messages"
        );
        Some(format!(
            "failed to send {} out of {} messages",
            failed_messages.len(),
            req.messages.len()
        ))
    };

    Ok(Json(SendMessagesResponse {
        success: failed_messages.is_empty(),
        success_count,
        failed_messages,
        error,
    }))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::queue::{InMemoryQueue, Message};

    /// Rejects any body containing "bad".
    struct PickyQueue {
        inner: InMemoryQueue,
    }

    #[async_trait]
    impl QueueClient for PickyQueue {
        async fn send(&self, body: &str) -> Result<String, SqsWorkerError> {
            if body.contains("bad") {
                return Err(SqsWorkerError::QueueError("rejected".to_string()));
            }
            self.inner.send(body).await
        }

        async fn receive(
            &self,
            wait_time_seconds: i32,
            visibility_timeout_seconds: i32,
        ) -> Result<Option<Message>, SqsWorkerError> {
            self.inner
                .receive(wait_time_seconds, visibility_timeout_seconds)
                .await
        }

        async fn delete(&self, receipt_handle: &str) -> Result<(), SqsWorkerError> {
            self.inner.delete(receipt_handle).await
        }
    }

    fn setup_test_app() -> (Router, Arc<InMemoryQueue>) {
        let jobs = Arc::new(InMemoryQueue::new());
        let picky = Arc::new(PickyQueue {
            inner: InMemoryQueue::new(),
        });
        let registry = QueueRegistry::new()
            .with_queue("jobs", jobs.clone())
            .with_queue("picky", picky);
        (routes(registry), jobs)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_send_message() {
        let (app, jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-message",
                serde_json::json!({ "queue_name": "jobs", "message": "hello" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message_id"], "msg-1");
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_send_message_unknown_queue() {
        let (app, _jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-message",
                serde_json::json!({ "queue_name": "nope", "message": "hello" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_send_message_backend_failure() {
        let (app, _jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-message",
                serde_json::json!({ "queue_name": "picky", "message": "bad" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_send_messages_reports_partial_success() {
        let (app, _jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-messages",
                serde_json::json!({ "queue_name": "picky", "messages": ["one", "bad one", "two"] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["success_count"], 2);
        assert_eq!(json["failed_messages"], serde_json::json!(["bad one"]));
        assert_eq!(json["error"], "failed to send 1 out of 3 messages");
    }

    #[tokio::test]
    async fn test_send_messages_all_succeed() {
        let (app, jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-messages",
                serde_json::json!({ "queue_name": "jobs", "messages": ["a", "b"] }),
            ))
            .await
            .unwrap();

        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["success_count"], 2);
        assert!(json.get("failed_messages").is_none());
        assert_eq!(jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_send_messages_empty_batch() {
        let (app, _jobs) = setup_test_app();

        let response = app
            .oneshot(post_json(
                "/sqs/send-messages",
                serde_json::json!({ "queue_name": "jobs", "messages": [] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _jobs) = setup_test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
