//! CloudWatch service seams and their AWS SDK implementations.

use crate::unit::MetricUnit;
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StatisticSet};
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use stratus_aws::{AwsConnectionParams, AwsError, load_sdk_config};

/// Aggregated statistics of a metric point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticValues {
    pub sample_count: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub sum: f64,
}

/// One metric datum to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// `(name, value)` pairs.
    pub dimensions: Vec<(String, String)>,
    pub unit: MetricUnit,
    pub value: Option<f64>,
    pub statistics: Option<StatisticValues>,
}

/// One log event to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub message: String,
}

/// CloudWatch metrics calls.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    async fn put_metric_data(&self, namespace: &str, points: Vec<MetricPoint>)
    -> Result<(), AwsError>;
}

/// Builds a [`MetricsApi`] bound to a resolved connection.
#[async_trait]
pub trait MetricsConnector: Send + Sync {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn MetricsApi>, AwsError>;
}

/// CloudWatch Logs calls.
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Fails with [`AwsError::AlreadyExists`] when the group exists.
    async fn create_log_group(&self, group: &str) -> Result<(), AwsError>;

    /// Fails with [`AwsError::AlreadyExists`] when the stream exists.
    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), AwsError>;

    /// Upload sequence token of the first stream matching `stream_prefix`.
    async fn describe_upload_token(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> Result<Option<String>, AwsError>;

    /// Publish events, returning the next sequence token.
    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, AwsError>;
}

/// Builds a [`LogsApi`] bound to a resolved connection.
#[async_trait]
pub trait LogsConnector: Send + Sync {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn LogsApi>, AwsError>;
}

// ============================================================================
// Metrics over the SDK
// ============================================================================

/// [`MetricsApi`] over the AWS SDK.
pub struct SdkMetricsApi {
    client: aws_sdk_cloudwatch::Client,
}

impl SdkMetricsApi {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

fn to_datum(point: MetricPoint) -> MetricDatum {
    let dimensions = point
        .dimensions
        .into_iter()
        .map(|(name, value)| Dimension::builder().name(name).value(value).build())
        .collect();

    let statistics = point.statistics.map(|s| {
        StatisticSet::builder()
            .sample_count(s.sample_count)
            .maximum(s.maximum)
            .minimum(s.minimum)
            .sum(s.sum)
            .build()
    });

    MetricDatum::builder()
        .metric_name(point.name)
        .timestamp(aws_sdk_cloudwatch::primitives::DateTime::from_millis(
            point.timestamp.timestamp_millis(),
        ))
        .set_dimensions(Some(dimensions))
        .unit(point.unit.into())
        .set_value(point.value)
        .set_statistic_values(statistics)
        .build()
}

#[async_trait]
impl MetricsApi for SdkMetricsApi {
    async fn put_metric_data(
        &self,
        namespace: &str,
        points: Vec<MetricPoint>,
    ) -> Result<(), AwsError> {
        self.client
            .put_metric_data()
            .namespace(namespace)
            .set_metric_data(Some(points.into_iter().map(to_datum).collect()))
            .send()
            .await
            .map_err(|e| AwsError::service(aws_sdk_cloudwatch::error::DisplayErrorContext(&e)))?;
        Ok(())
    }
}

/// Default connector creating CloudWatch SDK clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdkMetricsConnector;

#[async_trait]
impl MetricsConnector for SdkMetricsConnector {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn MetricsApi>, AwsError> {
        let sdk_config = load_sdk_config(connection, connect_timeout).await;
        Ok(Arc::new(SdkMetricsApi::new(aws_sdk_cloudwatch::Client::new(
            &sdk_config,
        ))))
    }
}

// ============================================================================
// Logs over the SDK
// ============================================================================

/// [`LogsApi`] over the AWS SDK.
pub struct SdkLogsApi {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl SdkLogsApi {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogsApi for SdkLogsApi {
    async fn create_log_group(&self, group: &str) -> Result<(), AwsError> {
        match self.client.create_log_group().log_group_name(group).send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_already_exists_exception()) =>
            {
                Err(AwsError::AlreadyExists(group.to_string()))
            }
            Err(e) => Err(AwsError::service(
                aws_sdk_cloudwatchlogs::error::DisplayErrorContext(&e),
            )),
        }
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), AwsError> {
        match self
            .client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_already_exists_exception()) =>
            {
                Err(AwsError::AlreadyExists(format!("{}/{}", group, stream)))
            }
            Err(e) => Err(AwsError::service(
                aws_sdk_cloudwatchlogs::error::DisplayErrorContext(&e),
            )),
        }
    }

    async fn describe_upload_token(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> Result<Option<String>, AwsError> {
        let output = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(stream_prefix)
            .send()
            .await
            .map_err(|e| AwsError::service(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(&e)))?;

        Ok(output
            .log_streams()
            .first()
            .and_then(|stream| stream.upload_sequence_token())
            .map(String::from))
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
        sequence_token: Option<String>,
    ) -> Result<Option<String>, AwsError> {
        let events = events
            .into_iter()
            .map(|event| {
                InputLogEvent::builder()
                    .timestamp(event.timestamp_ms)
                    .message(event.message)
                    .build()
                    .map_err(|e| AwsError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_log_events(Some(events))
            .set_sequence_token(sequence_token)
            .send()
            .await
            .map_err(|e| AwsError::service(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(&e)))?;

        Ok(output.next_sequence_token().map(String::from))
    }
}

/// Default connector creating CloudWatch Logs SDK clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdkLogsConnector;

#[async_trait]
impl LogsConnector for SdkLogsConnector {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn LogsApi>, AwsError> {
        let sdk_config = load_sdk_config(connection, connect_timeout).await;
        Ok(Arc::new(SdkLogsApi::new(aws_sdk_cloudwatchlogs::Client::new(
            &sdk_config,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_conversion() {
        let timestamp = Utc::now();
        let datum = to_datum(MetricPoint {
            name: "orders.get.exec_time".to_string(),
            timestamp,
            dimensions: vec![("InstanceID".to_string(), "i-1".to_string())],
            unit: MetricUnit::Milliseconds,
            value: None,
            statistics: Some(StatisticValues {
                sample_count: 2.0,
                maximum: 30.0,
                minimum: 10.0,
                sum: 40.0,
            }),
        });

        assert_eq!(datum.metric_name(), Some("orders.get.exec_time"));
        assert_eq!(datum.dimensions()[0].value(), Some("i-1"));
        assert_eq!(
            datum.unit(),
            Some(&aws_sdk_cloudwatch::types::StandardUnit::Milliseconds)
        );
        assert_eq!(datum.value(), None);
        assert_eq!(datum.statistic_values().and_then(|s| s.sum()), Some(40.0));
        assert_eq!(
            datum.timestamp().map(|t| t.to_millis().ok()),
            Some(Some(timestamp.timestamp_millis()))
        );
    }
}
