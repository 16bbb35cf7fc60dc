use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::SqsWorkerError;
use crate::queue::{Message, QueueClient, SqsQueueClient};

mod config;
mod processor;
mod retry;

pub use config::{
    DEFAULT_BACKOFF_UNIT, DEFAULT_IDLE_INTERVAL, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL,
    DEFAULT_WORKER_COUNT, RECEIVE_WAIT_TIME_SECONDS, VISIBILITY_TIMEOUT_SECONDS, WorkerPoolConfig,
};
pub use processor::{LoggingProcessor, MessageProcessor, ProcessorFn};
pub use retry::{LinearBackoff, RetryOutcome};

use config::PoolSettings;
use retry::process_with_retries;

/// A pool of concurrent poll loops consuming one queue.
///
/// Each loop receives one message at a time, hands it to the configured
/// [`MessageProcessor`] with linear retry backoff, and deletes it only after
/// the processor succeeded. A message whose attempts are exhausted is left
/// alone; the queue makes it visible again once its visibility timeout
/// expires, so delivery is at-least-once.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use rs_sqs_worker::client::create_sqs_client_from_env;
/// use rs_sqs_worker::worker::{LoggingProcessor, WorkerPool, WorkerPoolConfig};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = create_sqs_client_from_env().await;
///     let config = WorkerPoolConfig::new("orders", Arc::new(LoggingProcessor)).with_worker_count(4);
///
///     let pool = WorkerPool::connect(config, client).await?;
///     pool.start(CancellationToken::new()).await;
///
///     tokio::signal::ctrl_c().await?;
///     pool.stop().await;
///     Ok(())
/// }
/// ```
pub struct WorkerPool {
    queue: Arc<dyn QueueClient>,
    settings: Arc<PoolSettings>,
    running: RwLock<bool>,
    workers: Mutex<Option<RunningWorkers>>,
}

struct RunningWorkers {
    stop: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Creates a pool consuming `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`SqsWorkerError::ConfigurationError`] when the queue name or
    /// processor is missing, or when the retry backoff cannot complete within
    /// the visibility timeout.
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<dyn QueueClient>,
    ) -> Result<Self, SqsWorkerError> {
        let settings = config.validate()?;
        Ok(WorkerPool {
            queue,
            settings: Arc::new(settings),
            running: RwLock::new(false),
            workers: Mutex::new(None),
        })
    }

    /// Creates a pool bound to the SQS queue named in `config`.
    ///
    /// The configuration is validated before the queue URL is resolved.
    pub async fn connect(
        config: WorkerPoolConfig,
        sqs_client: aws_sdk_sqs::Client,
    ) -> Result<Self, SqsWorkerError> {
        let settings = config.validate()?;
        let queue = SqsQueueClient::new(sqs_client, &settings.queue_name).await?;
        Ok(WorkerPool {
            queue: Arc::new(queue),
            settings: Arc::new(settings),
            running: RwLock::new(false),
            workers: Mutex::new(None),
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.settings.queue_name
    }

    pub fn worker_count(&self) -> usize {
        self.settings.worker_count
    }

    /// Spawns the poll loops and returns without waiting for them.
    ///
    /// Cancelling `cancel` makes every loop exit at its next check, just like
    /// [`stop`](Self::stop), but without waiting for them. Calling `start` on a
    /// running pool logs a warning and does nothing.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut workers = self.workers.lock().await;
        if workers.is_some() {
            warn!(queue = %self.settings.queue_name, "worker pool is already running");
            return;
        }

        info!(
            queue = %self.settings.queue_name,
            worker_count = self.settings.worker_count,
            "starting worker pool"
        );

        let stop = cancel.child_token();
        let handles = (0..self.settings.worker_count)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    queue: Arc::clone(&self.queue),
                    settings: Arc::clone(&self.settings),
                    shutdown: stop.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        *workers = Some(RunningWorkers { stop, handles });
        self.set_running(true);
    }

    /// Signals every loop to stop and waits until all of them have exited.
    ///
    /// A processor call in progress is never aborted; it sees the shutdown
    /// token it was given fire and the message is then deleted or abandoned
    /// as usual. Waits for a long poll, an idle pause or a backoff are cut
    /// short. Does nothing if the pool is not running.
    pub async fn stop(&self) {
        let mut workers = self.workers.lock().await;
        let Some(running) = workers.take() else {
            return;
        };

        info!(queue = %self.settings.queue_name, "stopping worker pool");
        running.stop.cancel();

        for result in futures::future::join_all(running.handles).await {
            if let Err(e) = result {
                error!(queue = %self.settings.queue_name, error = %e, "worker exited abnormally");
            }
        }

        self.set_running(false);
        info!(queue = %self.settings.queue_name, "worker pool stopped");
    }

    /// Whether the pool is between [`start`](Self::start) and the end of
    /// [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        *self.running.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of poll loops that have not exited yet.
    pub async fn active_workers(&self) -> usize {
        self.workers.lock().await.as_ref().map_or(0, |running| {
            running.handles.iter().filter(|handle| !handle.is_finished()).count()
        })
    }

    fn set_running(&self, value: bool) {
        *self.running.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// One poll loop of a pool.
struct Worker {
    id: usize,
    queue: Arc<dyn QueueClient>,
    settings: Arc<PoolSettings>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(self) {
        info!(worker_id = self.id, queue = %self.settings.queue_name, "worker started");

        while !self.shutdown.is_cancelled() {
            self.poll_once().await;
        }

        info!(worker_id = self.id, queue = %self.settings.queue_name, "worker stopped");
    }

    async fn poll_once(&self) {
        let received = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            received = self.queue.receive(
                self.settings.wait_time_seconds,
                self.settings.visibility_timeout_seconds,
            ) => received,
        };

        match received {
            Err(e) => {
                error!(
                    worker_id = self.id,
                    queue = %self.settings.queue_name,
                    error = %e,
                    "failed to receive message"
                );
                self.pause(self.settings.poll_interval).await;
            }
            Ok(None) => self.pause(self.settings.idle_interval).await,
            Ok(Some(message)) => self.handle(message).await,
        }
    }

    async fn handle(&self, message: Message) {
        info!(
            worker_id = self.id,
            queue = %self.settings.queue_name,
            message_id = ?message.message_id,
            "received message"
        );

        let outcome = process_with_retries(
            self.settings.processor.as_ref(),
            &message,
            self.settings.backoff,
            &self.shutdown,
            self.id,
        )
        .await;

        match outcome {
            RetryOutcome::Processed { attempts } => {
                match self.queue.delete(&message.receipt_handle).await {
                    Ok(()) => info!(
                        worker_id = self.id,
                        queue = %self.settings.queue_name,
                        message_id = ?message.message_id,
                        attempts,
                        "processed and deleted message"
                    ),
                    // The message comes back after its visibility timeout and
                    // is processed again.
                    Err(e) => error!(
                        worker_id = self.id,
                        queue = %self.settings.queue_name,
                        message_id = ?message.message_id,
                        error = %e,
                        "failed to delete processed message"
                    ),
                }
            }
            RetryOutcome::Exhausted => error!(
                worker_id = self.id,
                queue = %self.settings.queue_name,
                message_id = ?message.message_id,
                max_retries = self.settings.backoff.max_attempts(),
                "giving up on message, leaving it for redelivery"
            ),
            RetryOutcome::Interrupted { attempts } => warn!(
                worker_id = self.id,
                queue = %self.settings.queue_name,
                message_id = ?message.message_id,
                attempts,
                "stopped while retrying message, leaving it for redelivery"
            ),
        }
    }

    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}
