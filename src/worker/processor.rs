use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::SqsWorkerError;
use crate::queue::Message;

/// Business logic applied to each received message.
///
/// The worker pool calls `process_message` from several loops at once, each
/// with a different message, so implementations must be `Send + Sync`.
///
/// Returning `Ok(())` tells the pool the message is fully handled and may be
/// deleted. Any error leaves the decision to the retry policy; a message that
/// keeps failing is not deleted and will be redelivered by the queue. Since
/// a successful run can still be redelivered (for example when the delete
/// call fails), processing should be idempotent.
///
/// `shutdown` fires when the pool is stopped or the caller's token is
/// cancelled. The pool never aborts a running call, so long work should watch
/// the token and return an error once it fires; the message is then left on
/// the queue for redelivery.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process_message(
        &self,
        message: &Message,
        shutdown: &CancellationToken,
    ) -> Result<(), SqsWorkerError>;
}

/// Processor that only logs the message body.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProcessor;

#[async_trait]
impl MessageProcessor for LoggingProcessor {
    async fn process_message(
        &self,
        message: &Message,
        _shutdown: &CancellationToken,
    ) -> Result<(), SqsWorkerError> {
        info!(message_id = ?message.message_id, body = %message.body, "processing message");
        Ok(())
    }
}

/// Adapts an async function and a shared resource into a [`MessageProcessor`].
///
/// The shared resource is cloned into every call, which makes it a natural
/// place for connection pools, HTTP clients and counters. The handler also
/// gets a clone of the pool's shutdown token.
///
/// # Type Parameters
///
/// * `RFn` - The message handler function type
/// * `Fut` - The future returned by the handler function
/// * `TShared` - The type of shared resources passed to the handler
///
/// # Example
///
/// ```rust
/// use rs_sqs_worker::errors::SqsWorkerError;
/// use rs_sqs_worker::queue::Message;
/// use rs_sqs_worker::worker::ProcessorFn;
/// use tokio_util::sync::CancellationToken;
///
/// let processor = ProcessorFn::new(
///     |message: Message, prefix: String, _shutdown: CancellationToken| async move {
///         println!("{}: {}", prefix, message.body);
///         Ok::<(), SqsWorkerError>(())
///     },
///     "orders".to_string(),
/// );
/// ```
pub struct ProcessorFn<RFn, Fut, TShared>
where
    RFn: Fn(Message, TShared, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsWorkerError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    rv_fn: RFn,
    shared_resources: TShared,
}

impl<RFn, Fut, TShared> ProcessorFn<RFn, Fut, TShared>
where
    RFn: Fn(Message, TShared, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsWorkerError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    pub fn new(rv_fn: RFn, shared_resources: TShared) -> Self {
        ProcessorFn {
            rv_fn,
            shared_resources,
        }
    }
}

#[async_trait]
impl<RFn, Fut, TShared> MessageProcessor for ProcessorFn<RFn, Fut, TShared>
where
    RFn: Fn(Message, TShared, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsWorkerError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    async fn process_message(
        &self,
        message: &Message,
        shutdown: &CancellationToken,
    ) -> Result<(), SqsWorkerError> {
        (self.rv_fn)(
            message.clone(),
            self.shared_resources.clone(),
            shutdown.clone(),
        )
        .await
    }
}
