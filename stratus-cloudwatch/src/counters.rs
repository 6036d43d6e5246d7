//! Performance counters published to CloudWatch metrics.

use crate::api::{MetricPoint, MetricsApi, MetricsConnector, SdkMetricsConnector, StatisticValues};
use crate::timer::{FlushTimer, TransportState};
use crate::unit::MetricUnit;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use stratus_aws::AwsConnectionResolver;
use stratus_core::{
    ApplicationError, CachedCounters, ConfigParams, Configurable, Counter, CounterType, Counters,
    Openable, References, Referenceable, Result,
};
use tracing::{debug, error};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Namespace used when neither `source` nor a context name is known.
pub const DEFAULT_NAMESPACE: &str = "stratus";

/// Most metric data accepted by one `PutMetricData` call.
pub const MAX_BATCH_SIZE: usize = 20;

/// Name of the dimension carrying the instance id.
pub const INSTANCE_DIMENSION: &str = "InstanceID";

struct Inner {
    cache: CachedCounters,
    connector: Arc<dyn MetricsConnector>,
    resolver: AwsConnectionResolver,
    connect_timeout: RwLock<Duration>,
    source: RwLock<Option<String>>,
    instance: RwLock<Option<String>>,
    state: RwLock<TransportState>,
    api: RwLock<Option<Arc<dyn MetricsApi>>>,
}

impl Inner {
    fn namespace(&self) -> String {
        self.source
            .read()
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    fn dimensions(&self) -> Vec<(String, String)> {
        self.instance
            .read()
            .iter()
            .map(|id| (INSTANCE_DIMENSION.to_string(), id.clone()))
            .collect()
    }

    async fn dump(&self) {
        let api = self.api.read().clone();
        let Some(api) = api else {
            return;
        };
        let counters = self.cache.drain();
        self.save(api.as_ref(), counters).await;
    }

    async fn save(&self, api: &dyn MetricsApi, counters: Vec<Counter>) {
        if counters.is_empty() {
            return;
        }

        let namespace = self.namespace();
        let dimensions = self.dimensions();
        let points: Vec<MetricPoint> = counters
            .iter()
            .map(|c| to_metric_point(c, &dimensions))
            .collect();

        for batch in points.chunks(MAX_BATCH_SIZE) {
            if let Err(err) = api.put_metric_data(&namespace, batch.to_vec()).await {
                error!(
                    namespace = %namespace,
                    error = %err,
                    "cloudwatch_counters: putMetricData error"
                );
            }
        }
    }
}

/// Convert an aggregated counter into a metric datum.
pub fn to_metric_point(counter: &Counter, dimensions: &[(String, String)]) -> MetricPoint {
    let mut point = MetricPoint {
        name: counter.name.clone(),
        timestamp: counter.time,
        dimensions: dimensions.to_vec(),
        unit: MetricUnit::None,
        value: None,
        statistics: None,
    };

    match counter.counter_type {
        CounterType::Increment => {
            point.value = Some(counter.count.unwrap_or(0) as f64);
            point.unit = MetricUnit::Count;
        }
        CounterType::Interval => {
            point.unit = MetricUnit::Milliseconds;
            point.statistics = Some(statistics(counter));
        }
        CounterType::Statistics => {
            point.statistics = Some(statistics(counter));
        }
        CounterType::LastValue => {
            point.value = counter.last;
        }
        CounterType::Timestamp => {
            point.value = Some(counter.time.timestamp_millis() as f64);
        }
    }

    point
}

fn statistics(counter: &Counter) -> StatisticValues {
    let count = counter.count.unwrap_or(0) as f64;
    StatisticValues {
        sample_count: count,
        maximum: counter.max.unwrap_or(0.0),
        minimum: counter.min.unwrap_or(0.0),
        sum: count * counter.average.unwrap_or(0.0),
    }
}

/// Counters that aggregate in memory and periodically publish to
/// CloudWatch.
///
/// Configuration:
///
/// | key | meaning |
/// |-----|---------|
/// | `connection.*` / `credential.*` | AWS connection, see [`AwsConnectionResolver`] |
/// | `source` | metric namespace, defaults to the context name |
/// | `group` | `InstanceID` dimension, defaults to the context id |
/// | `options.interval` | publish period in ms, default 300000 |
/// | `options.connect_timeout` | connect timeout in ms, default 30000 |
pub struct CloudWatchCounters {
    inner: Arc<Inner>,
    timer: Mutex<Option<FlushTimer>>,
    open_lock: tokio::sync::Mutex<()>,
}

impl Default for CloudWatchCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudWatchCounters {
    /// Create counters using the AWS SDK.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(SdkMetricsConnector))
    }

    /// Create counters with a custom transport.
    pub fn with_connector(connector: Arc<dyn MetricsConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: CachedCounters::new(),
                connector,
                resolver: AwsConnectionResolver::new(),
                connect_timeout: RwLock::new(DEFAULT_CONNECT_TIMEOUT),
                source: RwLock::new(None),
                instance: RwLock::new(None),
                state: RwLock::new(TransportState::Closed),
                api: RwLock::new(None),
            }),
            timer: Mutex::new(None),
            open_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> TransportState {
        *self.inner.state.read()
    }

    pub fn namespace(&self) -> String {
        self.inner.namespace()
    }

    pub fn instance(&self) -> Option<String> {
        self.inner.instance.read().clone()
    }

    pub fn connect_timeout(&self) -> Duration {
        *self.inner.connect_timeout.read()
    }

    pub fn interval(&self) -> Duration {
        self.inner.cache.interval()
    }

    /// Copy of a buffered counter.
    pub fn get(&self, name: &str) -> Option<Counter> {
        self.inner.cache.get(name)
    }

    /// Publish buffered counters now. Does nothing while closed.
    pub async fn dump(&self) {
        self.inner.dump().await;
    }

    /// Publish the given counters in batches. Failures are logged.
    pub async fn save(&self, counters: Vec<Counter>) {
        let api = self.inner.api.read().clone();
        if let Some(api) = api {
            self.inner.save(api.as_ref(), counters).await;
        }
    }
}

impl Counters for CloudWatchCounters {
    fn end_timing(&self, name: &str, elapsed_ms: f64) {
        self.inner.cache.end_timing(name, elapsed_ms);
    }

    fn stats(&self, name: &str, value: f64) {
        self.inner.cache.stats(name, value);
    }

    fn last(&self, name: &str, value: f64) {
        self.inner.cache.last(name, value);
    }

    fn timestamp(&self, name: &str, value: DateTime<Utc>) {
        self.inner.cache.timestamp(name, value);
    }

    fn increment(&self, name: &str, value: i64) {
        self.inner.cache.increment(name, value);
    }
}

impl Configurable for CloudWatchCounters {
    fn configure(&self, config: &ConfigParams) {
        self.inner.cache.configure(config);
        self.inner.resolver.configure(config);

        if let Some(source) = config.get_as_nullable_string("source") {
            *self.inner.source.write() = Some(source);
        }
        if let Some(group) = config.get_as_nullable_string("group") {
            *self.inner.instance.write() = Some(group);
        }
        let timeout =
            config.get_as_duration_with_default("options.connect_timeout", self.connect_timeout());
        *self.inner.connect_timeout.write() = timeout;
    }
}

impl Referenceable for CloudWatchCounters {
    fn set_references(&self, references: &References) -> Result<()> {
        self.inner.resolver.set_references(references)?;

        if let Some(info) = references.context_info() {
            self.inner.source.write().get_or_insert(info.name);
            self.inner.instance.write().get_or_insert(info.context_id);
        }
        Ok(())
    }
}

impl CloudWatchCounters {
    async fn connect(&self, correlation_id: Option<&str>) -> Result<Arc<dyn MetricsApi>> {
        let connection = self.inner.resolver.resolve(correlation_id).await?;
        self.inner
            .connector
            .connect(&connection, self.connect_timeout())
            .await
            .map_err(|e| ApplicationError::from(e).with_correlation_id(correlation_id))
    }
}

#[async_trait]
impl Openable for CloudWatchCounters {
    fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    async fn open(&self, correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if self.is_open() {
            return Ok(());
        }
        *self.inner.state.write() = TransportState::Opening;

        let api = match self.connect(correlation_id).await {
            Ok(api) => api,
            Err(err) => {
                *self.inner.state.write() = TransportState::Closed;
                return Err(err);
            }
        };
        *self.inner.api.write() = Some(api);

        let inner = self.inner.clone();
        *self.timer.lock() = Some(FlushTimer::start(self.interval(), move || {
            let inner = inner.clone();
            async move { inner.dump().await }
        }));

        *self.inner.state.write() = TransportState::Open;
        debug!(
            correlation_id = correlation_id.unwrap_or("---"),
            namespace = %self.namespace(),
            "CloudWatch counters opened"
        );
        Ok(())
    }

    async fn close(&self, _correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if !self.is_open() {
            return Ok(());
        }

        self.inner.dump().await;
        if let Some(timer) = self.timer.lock().take() {
            timer.stop();
        }
        *self.inner.api.write() = None;
        *self.inner.state.write() = TransportState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_of(counters: &CachedCounters, name: &str) -> Counter {
        counters.get(name).unwrap()
    }

    #[test]
    fn test_increment_point() {
        let cache = CachedCounters::new();
        cache.increment("orders.created", 3);

        let dims = vec![(INSTANCE_DIMENSION.to_string(), "i-1".to_string())];
        let point = to_metric_point(&counter_of(&cache, "orders.created"), &dims);

        assert_eq!(point.unit, MetricUnit::Count);
        assert_eq!(point.value, Some(3.0));
        assert_eq!(point.statistics, None);
        assert_eq!(point.dimensions, dims);
    }

    #[test]
    fn test_interval_and_statistics_points() {
        let cache = CachedCounters::new();
        cache.end_timing("call.exec_time", 10.0);
        cache.end_timing("call.exec_time", 30.0);
        cache.stats("payload.size", 5.0);

        let point = to_metric_point(&counter_of(&cache, "call.exec_time"), &[]);
        assert_eq!(point.unit, MetricUnit::Milliseconds);
        assert_eq!(point.value, None);
        assert_eq!(
            point.statistics,
            Some(StatisticValues {
                sample_count: 2.0,
                maximum: 30.0,
                minimum: 10.0,
                sum: 40.0,
            })
        );

        let point = to_metric_point(&counter_of(&cache, "payload.size"), &[]);
        assert_eq!(point.unit, MetricUnit::None);
        assert_eq!(point.statistics.map(|s| s.sum), Some(5.0));
    }

    #[test]
    fn test_last_and_timestamp_points() {
        let cache = CachedCounters::new();
        cache.last("queue.depth", 7.5);
        let at = Utc::now();
        cache.timestamp("started", at);

        let point = to_metric_point(&counter_of(&cache, "queue.depth"), &[]);
        assert_eq!(point.value, Some(7.5));
        assert_eq!(point.unit, MetricUnit::None);

        let point = to_metric_point(&counter_of(&cache, "started"), &[]);
        assert_eq!(point.value, Some(at.timestamp_millis() as f64));
    }

    #[test]
    fn test_configure() {
        let counters = CloudWatchCounters::new();
        assert_eq!(counters.namespace(), DEFAULT_NAMESPACE);

        counters.configure(&ConfigParams::from_tuples(&[
            ("source", "orders"),
            ("group", "i-42"),
            ("options.interval", "1000"),
            ("options.connect_timeout", "5000"),
        ]));

        assert_eq!(counters.namespace(), "orders");
        assert_eq!(counters.instance().as_deref(), Some("i-42"));
        assert_eq!(counters.interval(), Duration::from_secs(1));
        assert_eq!(counters.connect_timeout(), Duration::from_secs(5));
        assert_eq!(counters.state(), TransportState::Closed);
    }
}
