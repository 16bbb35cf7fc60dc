use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SqsWorkerError;
use crate::worker::{
    DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_WORKER_COUNT, MessageProcessor,
    WorkerPoolConfig,
};

/// Queue name used when the gateway runs against the in-memory queue.
pub const LOCAL_QUEUE_NAME: &str = "local";

/// Configuration of the `sqs-gateway` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// HTTP listen port
    pub port: u16,
    /// SQS queue consumed by the worker pool and exposed by the send API
    pub queue_name: String,
    /// Region of the queue; the AWS default chain decides when unset
    pub region: Option<String>,
    pub worker_count: usize,
    pub max_retries: u32,
    pub poll_interval: Duration,
    /// Use an in-process queue instead of SQS
    pub local: bool,
}

impl GatewayConfig {
    /// Create configuration from environment variables
    ///
    /// - `PORT` (default 8080)
    /// - `AWS_SQS_QUEUE_NAME` (required unless `SQS_LOCAL` is set)
    /// - `AWS_SQS_REGION`
    /// - `WORKER_COUNT` (default 1)
    /// - `WORKER_MAX_RETRIES` (default 3)
    /// - `WORKER_POLL_INTERVAL_SECS` (default 5)
    /// - `SQS_LOCAL` (`1` or `true`)
    pub fn from_env() -> Result<Self, SqsWorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SqsWorkerError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let local = var("SQS_LOCAL")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let queue_name = match var("AWS_SQS_QUEUE_NAME") {
            Some(name) => name,
            None if local => LOCAL_QUEUE_NAME.to_string(),
            None => {
                return Err(SqsWorkerError::ConfigurationError(
                    "AWS_SQS_QUEUE_NAME must be set".to_string(),
                ));
            }
        };

        Ok(GatewayConfig {
            port: parse(&var, "PORT")?.unwrap_or(8080),
            queue_name,
            region: var("AWS_SQS_REGION"),
            worker_count: parse(&var, "WORKER_COUNT")?.unwrap_or(DEFAULT_WORKER_COUNT),
            max_retries: parse(&var, "WORKER_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES),
            poll_interval: parse(&var, "WORKER_POLL_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            local,
        })
    }

    /// Worker pool configuration for the configured queue.
    pub fn worker_pool_config(&self, processor: Arc<dyn MessageProcessor>) -> WorkerPoolConfig {
        WorkerPoolConfig::new(self.queue_name.clone(), processor)
            .with_worker_count(self.worker_count)
            .with_max_retries(self.max_retries)
            .with_poll_interval(self.poll_interval)
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, SqsWorkerError> {
    var(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| {
                SqsWorkerError::ConfigurationError(format!("{} has an invalid value: {}", key, value))
            })
        })
        .transpose()
}
