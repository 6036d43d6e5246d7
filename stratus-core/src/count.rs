//! Performance counters.
//!
//! [`CachedCounters`] aggregates measurements in memory until a transport
//! drains them; [`CompositeCounters`] fans measurements out to every counters
//! component found in the references; [`Timing`] is a start/stop span.

use crate::{ConfigParams, References};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Kind of aggregated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterType {
    /// Elapsed time statistics in milliseconds.
    Interval,
    /// Last recorded value.
    LastValue,
    /// Min/max/average statistics.
    Statistics,
    /// Point in time.
    Timestamp,
    /// Monotonic count.
    Increment,
}

/// An aggregated counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub counter_type: CounterType,
    pub last: Option<f64>,
    pub count: Option<i64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub time: DateTime<Utc>,
}

impl Counter {
    /// Create an empty counter.
    pub fn new(name: impl Into<String>, counter_type: CounterType) -> Self {
        Self {
            name: name.into(),
            counter_type,
            last: None,
            count: None,
            min: None,
            max: None,
            average: None,
            time: Utc::now(),
        }
    }

    fn record_stats(&mut self, value: f64) {
        let count = self.count.unwrap_or(0).saturating_add(1);
        let average = self.average.unwrap_or(0.0);

        self.last = Some(value);
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.average = Some((average * (count - 1) as f64 + value) / count as f64);
        self.count = Some(count);
    }
}

/// Sink for measurements.
pub trait Counters: Send + Sync {
    /// Record the end of a timing span.
    fn end_timing(&self, name: &str, elapsed_ms: f64);

    /// Record a value into statistics.
    fn stats(&self, name: &str, value: f64);

    /// Record the last value.
    fn last(&self, name: &str, value: f64);

    /// Record a timestamp.
    fn timestamp(&self, name: &str, value: DateTime<Utc>);

    /// Increment a counter.
    fn increment(&self, name: &str, value: i64);

    /// Record the current time.
    fn timestamp_now(&self, name: &str) {
        self.timestamp(name, Utc::now());
    }

    /// Increment a counter by one.
    fn increment_one(&self, name: &str) {
        self.increment(name, 1);
    }
}

/// A running timing span.
#[must_use = "a timing span records nothing until end_timing is called"]
pub struct Timing {
    name: String,
    start: Instant,
    counters: Option<Arc<dyn Counters>>,
}

impl Timing {
    /// Start a span reporting into `counters`.
    pub fn new(name: impl Into<String>, counters: Arc<dyn Counters>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            counters: Some(counters),
        }
    }

    /// Start a span that reports nowhere.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            counters: None,
        }
    }

    /// Span name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// End the span and return the elapsed milliseconds.
    pub fn end_timing(self) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64() * 1000.0;
        if let Some(counters) = &self.counters {
            counters.end_timing(&self.name, elapsed);
        }
        elapsed
    }
}

/// In-memory counter aggregation.
pub struct CachedCounters {
    cache: Mutex<HashMap<String, Counter>>,
    interval: RwLock<Duration>,
    last_dump: Mutex<Instant>,
}

impl Default for CachedCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CachedCounters {
    /// Default flush interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            interval: RwLock::new(Self::DEFAULT_INTERVAL),
            last_dump: Mutex::new(Instant::now()),
        }
    }

    /// Read `options.interval` (milliseconds).
    pub fn configure(&self, config: &ConfigParams) {
        let current = *self.interval.read();
        *self.interval.write() = config.get_as_duration_with_default("options.interval", current);
    }

    /// Flush interval.
    pub fn interval(&self) -> Duration {
        *self.interval.read()
    }

    /// Check whether the flush interval has elapsed since the last drain.
    pub fn is_dump_due(&self) -> bool {
        self.last_dump.lock().elapsed() >= self.interval()
    }

    /// Get a copy of a counter.
    pub fn get(&self, name: &str) -> Option<Counter> {
        self.cache.lock().get(name).cloned()
    }

    /// Get copies of all counters.
    pub fn get_all(&self) -> Vec<Counter> {
        self.cache.lock().values().cloned().collect()
    }

    /// Take all counters out of the cache, leaving it empty.
    pub fn drain(&self) -> Vec<Counter> {
        let drained = std::mem::take(&mut *self.cache.lock());
        *self.last_dump.lock() = Instant::now();
        let mut counters: Vec<Counter> = drained.into_values().collect();
        counters.sort_by(|a, b| a.name.cmp(&b.name));
        counters
    }

    /// Drop all counters.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn update(&self, name: &str, counter_type: CounterType, f: impl FnOnce(&mut Counter)) {
        let mut cache = self.cache.lock();
        let counter = cache
            .entry(name.to_string())
            .or_insert_with(|| Counter::new(name, counter_type));
        if counter.counter_type != counter_type {
            *counter = Counter::new(name, counter_type);
        }
        f(counter);
        counter.time = Utc::now();
    }
}

impl Counters for CachedCounters {
    fn end_timing(&self, name: &str, elapsed_ms: f64) {
        self.update(name, CounterType::Interval, |c| c.record_stats(elapsed_ms));
    }

    fn stats(&self, name: &str, value: f64) {
        self.update(name, CounterType::Statistics, |c| c.record_stats(value));
    }

    fn last(&self, name: &str, value: f64) {
        self.update(name, CounterType::LastValue, |c| c.last = Some(value));
    }

    fn timestamp(&self, name: &str, value: DateTime<Utc>) {
        let mut cache = self.cache.lock();
        let counter = cache
            .entry(name.to_string())
            .or_insert_with(|| Counter::new(name, CounterType::Timestamp));
        counter.counter_type = CounterType::Timestamp;
        counter.time = value;
    }

    fn increment(&self, name: &str, value: i64) {
        self.update(name, CounterType::Increment, |c| {
            c.count = Some(c.count.unwrap_or(0).saturating_add(value))
        });
    }
}

/// Fans measurements out to a set of counters.
#[derive(Default)]
pub struct CompositeCounters {
    counters: RwLock<Vec<Arc<dyn Counters>>>,
}

impl CompositeCounters {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a counters sink.
    pub fn add(&self, counters: Arc<dyn Counters>) {
        self.counters.write().push(counters);
    }

    /// Collect every `Arc<dyn Counters>` found in the references.
    pub fn set_references(&self, references: &References) {
        let found = references.get_all::<Arc<dyn Counters>>();
        let mut counters = self.counters.write();
        for candidate in found {
            if !counters.iter().any(|c| Arc::ptr_eq(c, &candidate)) {
                counters.push(candidate);
            }
        }
    }

    /// Number of attached sinks.
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    /// Check if no sinks are attached.
    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }

    /// Start a timing span.
    pub fn begin_timing(self: &Arc<Self>, name: &str) -> Timing {
        Timing::new(name, self.clone() as Arc<dyn Counters>)
    }

    /// Trace the start of an operation and open an `<name>.exec_time` span.
    pub fn instrument(self: &Arc<Self>, correlation_id: Option<&str>, name: &str) -> Timing {
        trace!(correlation_id = correlation_id.unwrap_or("---"), "Executing {} method", name);
        self.begin_timing(&format!("{}.exec_time", name))
    }

    fn each(&self, f: impl Fn(&dyn Counters)) {
        for counters in self.counters.read().iter() {
            f(counters.as_ref());
        }
    }
}

impl Counters for CompositeCounters {
    fn end_timing(&self, name: &str, elapsed_ms: f64) {
        self.each(|c| c.end_timing(name, elapsed_ms));
    }

    fn stats(&self, name: &str, value: f64) {
        self.each(|c| c.stats(name, value));
    }

    fn last(&self, name: &str, value: f64) {
        self.each(|c| c.last(name, value));
    }

    fn timestamp(&self, name: &str, value: DateTime<Utc>) {
        self.each(|c| c.timestamp(name, value));
    }

    fn increment(&self, name: &str, value: i64) {
        self.each(|c| c.increment(name, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let counters = CachedCounters::new();
        counters.stats("load", 1.0);
        counters.stats("load", 3.0);

        let counter = counters.get("load").unwrap();
        assert_eq!(counter.counter_type, CounterType::Statistics);
        assert_eq!(counter.count, Some(2));
        assert_eq!(counter.min, Some(1.0));
        assert_eq!(counter.max, Some(3.0));
        assert_eq!(counter.average, Some(2.0));
    }

    #[test]
    fn test_increment_and_last() {
        let counters = CachedCounters::new();
        counters.increment_one("calls");
        counters.increment("calls", 4);
        counters.last("queue", 12.0);

        assert_eq!(counters.get("calls").unwrap().count, Some(5));
        assert_eq!(counters.get("queue").unwrap().last, Some(12.0));
    }

    #[test]
    fn test_increment_saturates() {
        let counters = CachedCounters::new();
        counters.increment("big", i64::MAX);
        counters.increment("big", 1);
        assert_eq!(counters.get("big").unwrap().count, Some(i64::MAX));
    }

    #[test]
    fn test_drain_empties_cache() {
        let counters = CachedCounters::new();
        counters.increment_one("b");
        counters.increment_one("a");

        let drained = counters.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "a");
        assert!(counters.get_all().is_empty());
        assert!(!counters.is_dump_due());
    }

    #[test]
    fn test_instrument_records_interval() {
        let cached = Arc::new(CachedCounters::new());
        let composite = Arc::new(CompositeCounters::new());

        let mut refs = References::new();
        refs.put("counters", cached.clone() as Arc<dyn Counters>);
        composite.set_references(&refs);
        composite.set_references(&refs);
        assert_eq!(composite.len(), 1);

        let timing = composite.instrument(Some("123"), "svc.get_data");
        timing.end_timing();

        let counter = cached.get("svc.get_data.exec_time").unwrap();
        assert_eq!(counter.counter_type, CounterType::Interval);
        assert_eq!(counter.count, Some(1));
    }
}
