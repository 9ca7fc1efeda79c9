use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use mod_index_lambda::adapters::s3::S3BlobStore;
use mod_index_lambda::config::CleanupConfig;
use mod_index_lambda::handlers::cleanup::{handle_cleanup, CleanupSummary};
use mod_index_lambda::logging::init_logging;
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<CleanupSummary, Error> {
    let config = CleanupConfig::from_env().map_err(|error| Error::from(error.to_string()))?;

    // Stop between pages once the invocation deadline minus the margin passes.
    let deadline_ms = i64::try_from(event.context.deadline).unwrap_or(i64::MAX);
    let stop_at_ms = deadline_ms.saturating_sub(config.deadline_margin_ms);

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3BlobStore::new(aws_sdk_s3::Client::new(&aws_config), config.bucket.clone());

    handle_cleanup(&store, &config, Utc::now(), || {
        Utc::now().timestamp_millis() >= stop_at_ms
    })
    .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
