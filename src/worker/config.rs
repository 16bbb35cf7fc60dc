use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::processor::MessageProcessor;
use super::retry::LinearBackoff;
use crate::errors::SqsWorkerError;
use crate::queue::clamp_visibility_timeout;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Long poll wait of every receive call. 20 seconds is the SQS maximum.
pub const RECEIVE_WAIT_TIME_SECONDS: i32 = 20;

/// Lease requested for every received message. It has to outlast the whole
/// retry sequence of one delivery, otherwise a second worker could pick the
/// message up while the first one is still retrying it.
pub const VISIBILITY_TIMEOUT_SECONDS: i32 = 300;

pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Configuration for a [`WorkerPool`](super::WorkerPool).
///
/// # Fields
/// - `queue_name`: Name of the queue the pool consumes. Required.
/// - `processor`: Logic applied to every message. Required.
/// - `poll_interval`: Pause after a failed receive call.
/// - `max_retries`: Processing attempts per delivery before giving up on it.
/// - `worker_count`: Number of concurrent poll loops.
///
/// Zero values for the last three are replaced by their defaults (5 s, 3
/// and 1). The remaining fields tune the loop itself and rarely need to
/// change outside of tests.
#[derive(Clone)]
pub struct WorkerPoolConfig {
    pub queue_name: String,
    pub processor: Option<Arc<dyn MessageProcessor>>,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub worker_count: usize,

    /// Long poll wait passed to every receive call, in seconds.
    pub wait_time_seconds: i32,

    /// Visibility timeout requested on every receive call, in seconds.
    pub visibility_timeout_seconds: i32,

    /// Pause after a receive call that returned no message.
    pub idle_interval: Duration,

    /// Unit of the linear backoff between processing attempts.
    pub backoff_unit: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        WorkerPoolConfig {
            queue_name: String::new(),
            processor: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            worker_count: DEFAULT_WORKER_COUNT,
            wait_time_seconds: RECEIVE_WAIT_TIME_SECONDS,
            visibility_timeout_seconds: VISIBILITY_TIMEOUT_SECONDS,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl fmt::Debug for WorkerPoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolConfig")
            .field("queue_name", &self.queue_name)
            .field("processor", &self.processor.as_ref().map(|_| "dyn MessageProcessor"))
            .field("poll_interval", &self.poll_interval)
            .field("max_retries", &self.max_retries)
            .field("worker_count", &self.worker_count)
            .field("wait_time_seconds", &self.wait_time_seconds)
            .field("visibility_timeout_seconds", &self.visibility_timeout_seconds)
            .field("idle_interval", &self.idle_interval)
            .field("backoff_unit", &self.backoff_unit)
            .finish()
    }
}

impl WorkerPoolConfig {
    pub fn new(queue_name: impl Into<String>, processor: Arc<dyn MessageProcessor>) -> Self {
        WorkerPoolConfig {
            queue_name: queue_name.into(),
            processor: Some(processor),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = seconds;
        self
    }

    pub fn with_visibility_timeout_seconds(mut self, seconds: i32) -> Self {
        self.visibility_timeout_seconds = seconds;
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Checks required fields, substitutes defaults and verifies that the
    /// worst-case retry sequence fits inside the visibility timeout.
    pub(crate) fn validate(self) -> Result<PoolSettings, SqsWorkerError> {
        if self.queue_name.trim().is_empty() {
            return Err(SqsWorkerError::ConfigurationError(
                "queue name is required".to_string(),
            ));
        }
        let processor = self.processor.ok_or_else(|| {
            SqsWorkerError::ConfigurationError("message processor is required".to_string())
        })?;

        let poll_interval = if self.poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.poll_interval
        };
        let max_retries = if self.max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            self.max_retries
        };
        let worker_count = if self.worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            self.worker_count
        };

        let wait_time_seconds = self.wait_time_seconds.clamp(0, RECEIVE_WAIT_TIME_SECONDS);
        let visibility_timeout_seconds = clamp_visibility_timeout(self.visibility_timeout_seconds);
        let backoff = LinearBackoff::new(self.backoff_unit, max_retries);

        let visibility = Duration::from_secs(visibility_timeout_seconds as u64);
        let worst_case = backoff.worst_case_total();
        if worst_case >= visibility {
            return Err(SqsWorkerError::ConfigurationError(format!(
                "worst-case retry backoff of {:?} for {} attempts does not fit in the {}s visibility timeout",
                worst_case,
                max_retries,
                visibility_timeout_seconds
            )));
        }

        Ok(PoolSettings {
            queue_name: self.queue_name,
            processor,
            poll_interval,
            worker_count,
            wait_time_seconds,
            visibility_timeout_seconds,
            idle_interval: self.idle_interval,
            backoff,
        })
    }
}

/// Validated, defaulted configuration shared by all loops of a pool.
pub(crate) struct PoolSettings {
    pub(crate) queue_name: String,
    pub(crate) processor: Arc<dyn MessageProcessor>,
    pub(crate) poll_interval: Duration,
    pub(crate) worker_count: usize,
    pub(crate) wait_time_seconds: i32,
    pub(crate) visibility_timeout_seconds: i32,
    pub(crate) idle_interval: Duration,
    pub(crate) backoff: LinearBackoff,
}
