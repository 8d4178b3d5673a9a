//! capwatch-aws — AWS-backed collaborators for the table monitor.
//!
//! - `CloudWatchMetrics` implements `MetricsSource` with
//!   `GetMetricStatistics` (namespace `AWS/DynamoDB`, statistic `Sum`).
//! - `DynamoCapacity` implements `CapacityDescriptor` with `DescribeTable`.
//!
//! Both wrap SDK clients that are cheap to clone and safe to share between
//! the read and write evaluators.

pub mod cloudwatch;
pub mod dynamodb;

pub use cloudwatch::CloudWatchMetrics;
pub use dynamodb::DynamoCapacity;

use aws_config::BehaviorVersion;
use tracing::info;

/// Load shared AWS configuration, optionally pinned to a region and endpoint.
pub async fn load_sdk_config(region: &str, endpoint_url: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let config = loader.load().await;
    info!(region, endpoint = ?endpoint_url, "AWS configuration loaded");
    config
}
