use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{Message, QueueClient, clamp_visibility_timeout};
use crate::errors::SqsWorkerError;

/// An in-process queue with SQS delivery semantics.
///
/// Received messages are leased for the visibility timeout and receive a new
/// receipt handle on every delivery. A message whose lease runs out without a
/// delete becomes visible again. Used for local runs of the gateway and as the
/// backend in tests.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    arrivals: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    next_message_id: u64,
    next_receipt: u64,
    deliveries: u64,
    failing_receives: usize,
}

#[derive(Debug)]
struct Entry {
    message_id: String,
    body: String,
    receipt_handle: Option<String>,
    visible_at: Instant,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages not yet deleted, leased or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages currently hidden behind an unexpired lease.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.visible_at > now)
            .count()
    }

    /// Total number of deliveries handed out by `receive`.
    pub fn deliveries(&self) -> u64 {
        self.lock().deliveries
    }

    /// Makes the next `count` calls to `receive` fail with a queue error.
    pub fn fail_next_receives(&self, count: usize) {
        self.lock().failing_receives = count;
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leases the first visible message, or reports when the next lease expires.
    fn try_lease(&self, visibility: Duration) -> Result<Message, Option<Instant>> {
        let now = Instant::now();
        let mut state = self.lock();

        let Some(index) = state.entries.iter().position(|entry| entry.visible_at <= now) else {
            return Err(state.entries.iter().map(|entry| entry.visible_at).min());
        };

        state.next_receipt += 1;
        state.deliveries += 1;
        let receipt_handle = format!("receipt-{}", state.next_receipt);

        let entry = &mut state.entries[index];
        entry.receipt_handle = Some(receipt_handle.clone());
        entry.visible_at = now + visibility;

        Ok(Message {
            body: entry.body.clone(),
            receipt_handle,
            message_id: Some(entry.message_id.clone()),
        })
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn send(&self, body: &str) -> Result<String, SqsWorkerError> {
        let message_id = {
            let mut state = self.lock();
            state.next_message_id += 1;
            let message_id = format!("msg-{}", state.next_message_id);
            state.entries.push_back(Entry {
                message_id: message_id.clone(),
                body: body.to_string(),
                receipt_handle: None,
                visible_at: Instant::now(),
            });
            message_id
        };
        self.arrivals.notify_waiters();
        Ok(message_id)
    }

    async fn receive(
        &self,
        wait_time_seconds: i32,
        visibility_timeout_seconds: i32,
    ) -> Result<Option<Message>, SqsWorkerError> {
        {
            let mut state = self.lock();
            if state.failing_receives > 0 {
                state.failing_receives -= 1;
                return Err(SqsWorkerError::QueueError(
                    "injected receive failure".to_string(),
                ));
            }
        }

        let visibility = Duration::from_secs(clamp_visibility_timeout(visibility_timeout_seconds) as u64);
        let deadline = Instant::now() + Duration::from_secs(wait_time_seconds.max(0) as u64);

        loop {
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let next_expiry = match self.try_lease(visibility) {
                Ok(message) => return Ok(Some(message)),
                Err(next_expiry) => next_expiry,
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let wake_at = next_expiry.map_or(deadline, |expiry| expiry.min(deadline));
            tokio::select! {
                _ = &mut arrival => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsWorkerError> {
        let mut state = self.lock();
        let index = state
            .entries
            .iter()
            .position(|entry| entry.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| {
                SqsWorkerError::QueueError(format!("receipt handle {} is not current", receipt_handle))
            })?;
        state.entries.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn empty_queue_waits_then_returns_none() {
        let queue = InMemoryQueue::new();
        let started = Instant::now();

        let received = queue.receive(20, 300).await.unwrap();

        assert!(received.is_none());
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_wakes_on_send() {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            producer.send("late").await.unwrap();
        });

        let started = Instant::now();
        let message = queue.receive(20, 300).await.unwrap().unwrap();

        assert_eq!(message.body, "late");
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn leased_message_is_hidden_until_visibility_timeout_expires() {
        let queue = InMemoryQueue::new();
        queue.send("hello").await.unwrap();

        let first = queue.receive(0, 30).await.unwrap().unwrap();
        assert!(queue.receive(0, 30).await.unwrap().is_none());
        assert_eq!(queue.in_flight(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;

        let second = queue.receive(0, 30).await.unwrap().unwrap();
        assert_eq!(second.body, "hello");
        assert_eq!(second.message_id, first.message_id);
        assert_ne!(second.receipt_handle, first.receipt_handle);
        assert_eq!(queue.deliveries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_receipt_handle_cannot_delete() {
        let queue = InMemoryQueue::new();
        queue.send("hello").await.unwrap();

        let first = queue.receive(0, 10).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        let second = queue.receive(0, 10).await.unwrap().unwrap();

        assert!(matches!(
            queue.delete(&first.receipt_handle).await,
            Err(SqsWorkerError::QueueError(_))
        ));
        queue.delete(&second.receipt_handle).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn injected_receive_failures_are_consumed() {
        let queue = InMemoryQueue::new();
        queue.send("hello").await.unwrap();
        queue.fail_next_receives(1);

        assert!(queue.receive(0, 30).await.is_err());
        assert!(queue.receive(0, 30).await.unwrap().is_some());
    }
}
