use std::sync::Arc;

use rs_sqs_worker::{
    api::{self, QueueRegistry},
    client::{create_sqs_client_for_region, create_sqs_client_from_env},
    config::GatewayConfig,
    queue::{InMemoryQueue, QueueClient, SqsQueueClient},
    worker::{LoggingProcessor, WorkerPool},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rs_sqs_worker=info,sqs_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(queue = %config.queue_name, local = config.local, "sqs-gateway starting...");

    let queue: Arc<dyn QueueClient> = if config.local {
        tracing::warn!("SQS_LOCAL is set, messages live in memory only");
        Arc::new(InMemoryQueue::new())
    } else {
        let sqs_client = match &config.region {
            Some(region) => create_sqs_client_for_region(region).await,
            None => create_sqs_client_from_env().await,
        };
        Arc::new(SqsQueueClient::new(sqs_client, &config.queue_name).await?)
    };

    let pool = WorkerPool::new(
        config.worker_pool_config(Arc::new(LoggingProcessor)),
        Arc::clone(&queue),
    )?;
    let shutdown = CancellationToken::new();
    pool.start(shutdown.clone()).await;

    let app = api::routes(QueueRegistry::new().with_queue(config.queue_name.clone(), queue));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "HTTP server listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            signal.cancel();
        })
        .await?;

    pool.stop().await;
    tracing::info!("sqs-gateway shutdown complete");
    Ok(())
}
