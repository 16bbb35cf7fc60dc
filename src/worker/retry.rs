use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::processor::MessageProcessor;
use crate::errors::SqsWorkerError;
use crate::queue::Message;

/// Linear backoff between processing attempts of one delivery.
///
/// After failed attempt `n` the worker waits `n * unit` before attempt
/// `n + 1`; there is no wait after the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    unit: Duration,
    max_attempts: u32,
}

impl LinearBackoff {
    pub fn new(unit: Duration, max_attempts: u32) -> Self {
        LinearBackoff {
            unit,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt)
    }

    /// Sum of all waits when every attempt fails: `unit * N * (N - 1) / 2`.
    /// Saturates at `Duration::MAX`.
    pub fn worst_case_total(&self) -> Duration {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let n = u128::from(self.max_attempts);
        let Some(total) = self.unit.as_nanos().checked_mul(n * (n - 1) / 2) else {
            return Duration::MAX;
        };
        match u64::try_from(total / NANOS_PER_SEC) {
            Ok(secs) => Duration::new(secs, (total % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        }
    }
}

/// How a delivery left the retry procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The processor succeeded on attempt `attempts`.
    Processed { attempts: u32 },
    /// Every attempt failed.
    Exhausted,
    /// Stop was requested while waiting between attempts.
    Interrupted { attempts: u32 },
}

/// Runs `processor` on `message` until it succeeds or the attempts run out.
///
/// A panicking processor counts as a failed attempt. A running attempt is
/// never aborted: `shutdown` is handed to the processor so it can return
/// early, and it cuts the waits between attempts.
pub(crate) async fn process_with_retries(
    processor: &dyn MessageProcessor,
    message: &Message,
    backoff: LinearBackoff,
    shutdown: &CancellationToken,
    worker_id: usize,
) -> RetryOutcome {
    let max_attempts = backoff.max_attempts();

    for attempt in 1..=max_attempts {
        let result = AssertUnwindSafe(processor.process_message(message, shutdown))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SqsWorkerError::processing("message processor panicked")));

        let error = match result {
            Ok(()) => return RetryOutcome::Processed { attempts: attempt },
            Err(error) => error,
        };

        warn!(
            worker_id,
            attempt,
            max_attempts,
            message_id = ?message.message_id,
            error = %error,
            "failed to process message"
        );

        if attempt == max_attempts {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => return RetryOutcome::Interrupted { attempts: attempt },
            _ = tokio::time::sleep(backoff.delay(attempt)) => {}
        }
    }

    RetryOutcome::Exhausted
}
