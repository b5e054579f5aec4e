use crate::services::storage::S3StorageService;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage() -> Arc<S3StorageService> {
    let bucket = env::var("S3_BUCKET").expect("S3_BUCKET must be set");
    let region = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    info!("☁️  S3 Storage: bucket={} region={}", bucket, region);

    let mut loader = aws_config::from_env().region(Region::new(region.clone()));

    // Optional endpoint override for MinIO/localstack setups
    if let Ok(endpoint_url) = env::var("S3_ENDPOINT") {
        info!("☁️  S3 endpoint override: {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(env::var("S3_FORCE_PATH_STYLE").is_ok())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageService::new(s3_client, bucket, region))
}
