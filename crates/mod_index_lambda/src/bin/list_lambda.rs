use lambda_runtime::{service_fn, Error, LambdaEvent};
use mod_index_lambda::adapters::display_names::KvDisplayNameLookup;
use mod_index_lambda::adapters::s3::S3KvStore;
use mod_index_lambda::config::ListConfig;
use mod_index_lambda::handlers::list::{handle_list_event, ApiGatewayResponse};
use mod_index_lambda::logging::init_logging;
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = ListConfig::from_env().map_err(|error| Error::from(error.to_string()))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let kv = S3KvStore::new(
        aws_sdk_s3::Client::new(&aws_config),
        config.bucket,
        &config.prefix,
    );
    let names = KvDisplayNameLookup::new(&kv);

    Ok(handle_list_event(event.payload, config.scope, &kv, &names))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();
    lambda_runtime::run(service_fn(handle_request)).await
}
