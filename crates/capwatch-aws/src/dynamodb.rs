//! DynamoDB provisioned capacity lookup.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::TableDescription;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use capwatch_core::{ProvisionedCapacity, SourceError, SourceResult};
use capwatch_monitor::CapacityDescriptor;

const OPERATION: &str = "DescribeTable";

/// `CapacityDescriptor` backed by DynamoDB `DescribeTable`.
#[derive(Debug, Clone)]
pub struct DynamoCapacity {
    client: Client,
}

impl DynamoCapacity {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl CapacityDescriptor for DynamoCapacity {
    async fn describe(&self, table: &str) -> SourceResult<ProvisionedCapacity> {
        let out = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| SourceError::remote(OPERATION, DisplayErrorContext(&e)))?;

        let capacity = provisioned_capacity(out.table())?;
        debug!(
            table,
            read = capacity.read,
            write = capacity.write,
            "provisioned capacity fetched"
        );
        Ok(capacity)
    }
}

fn provisioned_capacity(table: Option<&TableDescription>) -> SourceResult<ProvisionedCapacity> {
    let throughput = table
        .ok_or(SourceError::MissingField {
            operation: OPERATION,
            field: "Table",
        })?
        .provisioned_throughput()
        .ok_or(SourceError::MissingField {
            operation: OPERATION,
            field: "ProvisionedThroughput",
        })?;

    let read = throughput
        .read_capacity_units()
        .ok_or(SourceError::MissingField {
            operation: OPERATION,
            field: "ReadCapacityUnits",
        })?;
    let write = throughput
        .write_capacity_units()
        .ok_or(SourceError::MissingField {
            operation: OPERATION,
            field: "WriteCapacityUnits",
        })?;

    Ok(ProvisionedCapacity { read, write })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::ProvisionedThroughputDescription;

    fn table(read: Option<i64>, write: Option<i64>) -> TableDescription {
        TableDescription::builder()
            .table_name("orders")
            .provisioned_throughput(
                ProvisionedThroughputDescription::builder()
                    .set_read_capacity_units(read)
                    .set_write_capacity_units(write)
                    .build(),
            )
            .build()
    }

    #[test]
    fn reads_both_directions() {
        let t = table(Some(1000), Some(250));
        assert_eq!(
            provisioned_capacity(Some(&t)).unwrap(),
            ProvisionedCapacity {
                read: 1000,
                write: 250
            }
        );
    }

    #[test]
    fn missing_table_is_an_error() {
        let err = provisioned_capacity(None).unwrap_err();
        assert!(matches!(err, SourceError::MissingField { field: "Table", .. }));
    }

    #[test]
    fn missing_throughput_is_an_error() {
        let t = TableDescription::builder().table_name("orders").build();
        let err = provisioned_capacity(Some(&t)).unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingField {
                field: "ProvisionedThroughput",
                ..
            }
        ));
    }

    #[test]
    fn missing_units_name_the_field() {
        let t = table(Some(5), None);
        let err = provisioned_capacity(Some(&t)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "DescribeTable: response is missing WriteCapacityUnits"
        );
    }
}
