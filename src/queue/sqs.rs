use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::{debug, warn};

use super::{Message, QueueClient, clamp_visibility_timeout};
use crate::client::resolve_queue_url;
use crate::errors::SqsWorkerError;

/// [`QueueClient`] backed by an AWS SQS queue.
///
/// The client is bound to a single queue URL at construction. The underlying
/// `aws_sdk_sqs::Client` is cheap to clone and safe to share between tasks.
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    sqs_client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueueClient {
    /// Binds `sqs_client` to the queue named `queue_name`, resolving its URL.
    ///
    /// # Errors
    ///
    /// Returns [`SqsWorkerError::InitializationError`] if the URL cannot be
    /// resolved.
    pub async fn new(
        sqs_client: aws_sdk_sqs::Client,
        queue_name: &str,
    ) -> Result<Self, SqsWorkerError> {
        let queue_url = resolve_queue_url(&sqs_client, queue_name).await?;
        debug!(queue = queue_name, %queue_url, "resolved queue url");
        Ok(Self::with_queue_url(sqs_client, queue_url))
    }

    /// Binds `sqs_client` to an already known queue URL.
    pub fn with_queue_url(sqs_client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        SqsQueueClient {
            sqs_client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn send(&self, body: &str) -> Result<String, SqsWorkerError> {
        let output = self
            .sqs_client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| SqsWorkerError::QueueError(DisplayErrorContext(&e).to_string()))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }

    async fn receive(
        &self,
        wait_time_seconds: i32,
        visibility_timeout_seconds: i32,
    ) -> Result<Option<Message>, SqsWorkerError> {
        let output = self
            .sqs_client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_time_seconds)
            .visibility_timeout(clamp_visibility_timeout(visibility_timeout_seconds))
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| SqsWorkerError::QueueError(DisplayErrorContext(&e).to_string()))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        let Some(receipt_handle) = message.receipt_handle() else {
            // Nothing can acknowledge this delivery; let it expire and come back.
            warn!(message_id = ?message.message_id(), "received a message without a receipt handle");
            return Ok(None);
        };

        Ok(Some(Message {
            body: message.body().unwrap_or_default().to_string(),
            receipt_handle: receipt_handle.to_string(),
            message_id: message.message_id().map(str::to_string),
        }))
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsWorkerError> {
        self.sqs_client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| SqsWorkerError::QueueError(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
