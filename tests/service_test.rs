//! End-to-end test of a Lambda service instrumented with CloudWatch counters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use stratus::prelude::*;
use stratus::stratus_aws::AwsError;
use stratus::stratus_cloudwatch::{MetricPoint, MetricUnit, MetricsApi, MetricsConnector};

#[derive(Default)]
struct RecordingMetrics {
    points: Mutex<Vec<(String, MetricPoint)>>,
}

#[async_trait]
impl MetricsApi for RecordingMetrics {
    async fn put_metric_data(
        &self,
        namespace: &str,
        points: Vec<MetricPoint>,
    ) -> Result<(), AwsError> {
        let mut recorded = self.points.lock();
        recorded.extend(points.into_iter().map(|p| (namespace.to_string(), p)));
        Ok(())
    }
}

struct Connector(Arc<RecordingMetrics>);

#[async_trait]
impl MetricsConnector for Connector {
    async fn connect(
        &self,
        _connection: &AwsConnectionParams,
        _connect_timeout: Duration,
    ) -> Result<Arc<dyn MetricsApi>, AwsError> {
        Ok(self.0.clone())
    }
}

struct Greeter;

impl Commandable for Greeter {
    fn command_set(&self) -> CommandSet {
        CommandSet::new().with_command(Command::new("greet", None, |_, args| async move {
            let name = args["name"].as_str().unwrap_or("world").to_string();
            Ok(json!(format!("Hello, {}!", name)))
        }))
    }
}

#[tokio::test]
async fn test_function_publishes_counters_on_shutdown() {
    let metrics = Arc::new(RecordingMetrics::default());
    let counters = Arc::new(CloudWatchCounters::with_connector(Arc::new(Connector(
        metrics.clone(),
    ))));

    let function = Arc::new(
        CommandableLambdaFunction::new("greeter", Some("Greeting service"))
            .with_controller(Arc::new(Greeter))
            .map(|f| {
                f.with_config(ConfigParams::from_tuples(&[
                    ("counters.source", "greeter-metrics"),
                    ("counters.connection.region", "us-east-1"),
                    ("counters.credential.access_id", "id"),
                    ("counters.credential.access_key", "key"),
                ]))
                .with_counters("counters", counters.clone())
            })
            .into_inner(),
    );

    let result = function
        .handle(json!({ "cmd": "greet", "correlation_id": "c1", "name": "Ada" }))
        .await
        .unwrap();
    assert_eq!(result, json!("Hello, Ada!"));
    assert!(counters.is_open());

    let timing = counters.get("greeter.greet.exec_time").unwrap();
    assert_eq!(timing.count, Some(1));

    LambdaRuntime::from_shared(function.clone())
        .shutdown()
        .await
        .unwrap();
    assert!(!counters.is_open());

    let points = metrics.points.lock();
    let (namespace, point) = points
        .iter()
        .find(|(_, p)| p.name == "greeter.greet.exec_time")
        .unwrap();
    assert_eq!(namespace, "greeter-metrics");
    assert_eq!(point.unit, MetricUnit::Milliseconds);
    assert_eq!(point.dimensions[0].1, function.info().context_id);
}
