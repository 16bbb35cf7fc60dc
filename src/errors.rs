use thiserror::Error;

/// Error types for SQS worker and gateway operations.
///
/// Only `InitializationError` and `ConfigurationError` are ever returned to
/// the caller of the worker pool. Queue and processing errors raised inside a
/// worker loop are logged and absorbed by the loop.
#[derive(Debug, Error)]
pub enum SqsWorkerError {
    /// Error that occurs during AWS SQS client initialization.
    ///
    /// This error typically happens when there are issues with AWS credentials,
    /// region configuration, or when the queue URL cannot be resolved from the
    /// queue name.
    #[error("failed to initialize AWS SQS client: {0}")]
    InitializationError(String),

    /// Invalid worker pool or gateway configuration.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    /// A send, receive or delete call against the queue backend failed.
    #[error("queue operation failed: {0}")]
    QueueError(String),

    /// A message processor reported that a message was not processed.
    #[error("failed to process message: {0}")]
    ProcessingError(String),
}

impl SqsWorkerError {
    /// Shorthand used by processors to signal a failed attempt.
    pub fn processing(message: impl Into<String>) -> Self {
        SqsWorkerError::ProcessingError(message.into())
    }
}
