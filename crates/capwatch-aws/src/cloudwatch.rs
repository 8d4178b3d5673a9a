//! CloudWatch metric sums for DynamoDB tables.

use async_trait::async_trait;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, Statistic};
use aws_sdk_cloudwatch::Client;
use tracing::debug;

use capwatch_core::{
    EvaluationWindow, SourceError, SourceResult, DYNAMODB_NAMESPACE, TABLE_NAME_DIMENSION,
};
use capwatch_monitor::MetricsSource;

const OPERATION: &str = "GetMetricStatistics";

/// `MetricsSource` backed by CloudWatch `GetMetricStatistics`.
#[derive(Debug, Clone)]
pub struct CloudWatchMetrics {
    client: Client,
}

impl CloudWatchMetrics {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl MetricsSource for CloudWatchMetrics {
    async fn sum(
        &self,
        metric: &str,
        table: &str,
        window: &EvaluationWindow,
    ) -> SourceResult<f64> {
        let period = window.period_secs()?;

        let out = self
            .client
            .get_metric_statistics()
            .namespace(DYNAMODB_NAMESPACE)
            .metric_name(metric)
            .dimensions(
                Dimension::builder()
                    .name(TABLE_NAME_DIMENSION)
                    .value(table)
                    .build(),
            )
            .start_time(DateTime::from(window.start))
            .end_time(DateTime::from(window.end()))
            .period(period)
            .statistics(Statistic::Sum)
            .send()
            .await
            .map_err(|e| SourceError::remote(OPERATION, DisplayErrorContext(&e)))?;

        let value = sum_datapoints(out.datapoints());
        debug!(
            metric,
            table,
            datapoints = out.datapoints().len(),
            value,
            "metric sum fetched"
        );
        Ok(value)
    }
}

/// Add up the `Sum` statistic of every datapoint.
///
/// The period equals the window, so CloudWatch normally returns at most one
/// datapoint. No datapoints means no activity: 0.
fn sum_datapoints(datapoints: &[Datapoint]) -> f64 {
    datapoints.iter().filter_map(Datapoint::sum).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(sum: f64) -> Datapoint {
        Datapoint::builder().sum(sum).build()
    }

    #[test]
    fn no_datapoints_is_zero() {
        assert_eq!(sum_datapoints(&[]), 0.0);
    }

    #[test]
    fn single_datapoint_is_its_sum() {
        assert_eq!(sum_datapoints(&[point(950.0)]), 950.0);
    }

    #[test]
    fn datapoints_without_sum_are_skipped() {
        let bare = Datapoint::builder().maximum(12.0).build();
        assert_eq!(sum_datapoints(&[bare, point(3.0), point(4.5)]), 7.5);
    }
}
