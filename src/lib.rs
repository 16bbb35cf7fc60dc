//! # AWS SQS Worker
//!
//! An asynchronous AWS SQS worker pool that polls a queue, hands each message
//! to a pluggable processor with bounded retries, and acknowledges (deletes)
//! a message only after it was processed successfully.
//!
//! ## Features
//!
//! - Configurable number of concurrent poll loops per queue, built on tokio
//! - Trait-based processors, plus a closure adapter with shared resources
//! - Linear retry backoff, checked against the visibility timeout up front
//! - At-least-once delivery: failed messages are left for redelivery
//! - Graceful start/stop with a full drain of in-flight messages
//! - An axum HTTP API for sending messages, and an in-memory queue for local
//!   runs and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rs_sqs_worker::{
//!     client::create_sqs_client_from_env,
//!     errors::SqsWorkerError,
//!     queue::Message,
//!     worker::{ProcessorFn, WorkerPool, WorkerPoolConfig},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_sqs_client_from_env().await;
//!     let processor = ProcessorFn::new(
//!         |message: Message, shared: String, _shutdown: CancellationToken| async move {
//!             println!("Processing message: {} with shared: {}", message.body, shared);
//!             Ok::<(), SqsWorkerError>(())
//!         },
//!         "shared state".to_string(),
//!     );
//!
//!     let config = WorkerPoolConfig::new("queue-name", Arc::new(processor));
//!     let pool = WorkerPool::connect(config, client).await?;
//!     pool.start(CancellationToken::new()).await;
//!
//!     tokio::signal::ctrl_c().await?;
//!     pool.stop().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod queue;
pub mod worker;
