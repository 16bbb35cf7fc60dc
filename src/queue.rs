use async_trait::async_trait;

use crate::errors::SqsWorkerError;

mod memory;
mod sqs;

pub use memory::InMemoryQueue;
pub use sqs::SqsQueueClient;

/// Upper bound SQS accepts for a visibility timeout (12 hours), minus a
/// five second margin.
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: i32 = 43_200 - 5;

/// One delivery of a queued message.
///
/// The body is opaque to the worker. `receipt_handle` identifies this
/// particular delivery and is what [`QueueClient::delete`] needs; a
/// redelivery of the same message carries a different handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    pub receipt_handle: String,
    pub message_id: Option<String>,
}

impl Message {
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Message {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            message_id: None,
        }
    }
}

/// The messaging backend as seen by the worker pool and the send API.
///
/// Implementations are shared between worker loops and must tolerate
/// concurrent calls. Keeping two loops from holding the same delivery at once
/// is the backend's job, through the visibility timeout.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enqueues one message and returns the id the backend assigned to it.
    async fn send(&self, body: &str) -> Result<String, SqsWorkerError>;

    /// Long-polls for at most one message.
    ///
    /// Waits up to `wait_time_seconds` for a message to become visible.
    /// `Ok(None)` means the queue was empty, which is not an error. The
    /// requested visibility timeout is clamped to
    /// [`MAX_VISIBILITY_TIMEOUT_SECONDS`].
    async fn receive(
        &self,
        wait_time_seconds: i32,
        visibility_timeout_seconds: i32,
    ) -> Result<Option<Message>, SqsWorkerError>;

    /// Acknowledges the delivery identified by `receipt_handle`.
    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsWorkerError>;
}

/// Clamps a requested visibility timeout into the range the backend accepts.
pub fn clamp_visibility_timeout(seconds: i32) -> i32 {
    seconds.clamp(0, MAX_VISIBILITY_TIMEOUT_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_timeout_is_clamped_to_backend_maximum() {
        assert_eq!(clamp_visibility_timeout(300), 300);
        assert_eq!(clamp_visibility_timeout(43_195), 43_195);
        assert_eq!(clamp_visibility_timeout(86_400), MAX_VISIBILITY_TIMEOUT_SECONDS);
        assert_eq!(clamp_visibility_timeout(-1), 0);
    }
}
