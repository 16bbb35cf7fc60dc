use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::config::SharedCredentialsProvider;
use aws_sdk_sqs::error::DisplayErrorContext;

use crate::errors::SqsWorkerError;

/// Creates an AWS SQS client using credentials and configuration from the environment.
///
/// This function loads AWS configuration from environment variables such as:
/// - `AWS_ACCESS_KEY_ID`
/// - `AWS_SECRET_ACCESS_KEY`
/// - `AWS_REGION`
/// - `AWS_PROFILE`
///
/// # Example
///
/// ```rust,no_run
/// use rs_sqs_worker::client::create_sqs_client_from_env;
///
/// #[tokio::main]
/// async fn main() {
///     let client = create_sqs_client_from_env().await;
///     // Hand the client to SqsQueueClient::new or WorkerPool::connect...
/// }
/// ```
pub async fn create_sqs_client_from_env() -> aws_sdk_sqs::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_sqs::Client::new(&config)
}

/// Creates an AWS SQS client from the default credential chain, pinned to `region`.
///
/// Used when the queue lives in a different region than the one the
/// environment points at (`AWS_SQS_REGION` in the gateway configuration).
pub async fn create_sqs_client_for_region(region: &str) -> aws_sdk_sqs::Client {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;
    aws_sdk_sqs::Client::new(&config)
}

/// Creates an AWS SQS client with explicitly provided credentials and region.
///
/// # Arguments
///
/// * `access_key_id` - The AWS access key ID
/// * `secret_access_key` - The AWS secret access key
/// * `region` - The AWS region (e.g., "us-east-1", "eu-west-1")
pub fn create_sqs_client_with_credentials(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
) -> aws_sdk_sqs::Client {
    let credentials =
        aws_sdk_sqs::config::Credentials::new(access_key_id, secret_access_key, None, None, "static");

    let config = aws_sdk_sqs::config::Builder::new()
        .behavior_version(aws_sdk_sqs::config::BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(SharedCredentialsProvider::new(credentials))
        .build();

    aws_sdk_sqs::Client::from_conf(config)
}

/// Resolves the URL of the queue called `queue_name`.
///
/// Fails with [`SqsWorkerError::InitializationError`] when the queue does not
/// exist or the credentials cannot see it.
pub async fn resolve_queue_url(
    client: &aws_sdk_sqs::Client,
    queue_name: &str,
) -> Result<String, SqsWorkerError> {
    let output = client
        .get_queue_url()
        .queue_name(queue_name)
        .send()
        .await
        .map_err(|e| {
            SqsWorkerError::InitializationError(format!(
                "cannot resolve url of queue {}: {}",
                queue_name,
                DisplayErrorContext(&e)
            ))
        })?;

    output.queue_url().map(str::to_string).ok_or_else(|| {
        SqsWorkerError::InitializationError(format!("queue {} has no url", queue_name))
    })
}
