//! # Stratus CloudWatch
//!
//! Telemetry transports for Stratus services:
//!
//! - [`CloudWatchCounters`] - aggregates counters and publishes them with
//!   `PutMetricData` in batches of at most 20
//! - [`CloudWatchLogger`] - buffers log messages and ships them with
//!   `PutLogEvents`, creating the log group and stream on open
//! - [`CloudWatchLayer`] - feeds `tracing` events into a logger
//! - [`DefaultCloudWatchFactory`] - creates both by type name
//!
//! Flushes run on a background timer and once more on close. Write failures
//! are logged and never surface to the code being measured.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratus_cloudwatch::CloudWatchLogger;
//! use stratus_core::{ConfigParams, Configurable, Openable};
//!
//! let logger = Arc::new(CloudWatchLogger::new());
//! logger.configure(&ConfigParams::from_tuples(&[
//!     ("group", "orders"),
//!     ("stream", "orders-1"),
//!     ("connection.region", "us-east-1"),
//!     ("credential.access_id", "AKIA..."),
//!     ("credential.access_key", "..."),
//! ]));
//! logger.open(None).await?;
//! logger.info(Some("c1"), "Order created");
//! logger.close(None).await?;
//! ```

pub mod api;
pub mod counters;
pub mod factory;
pub mod layer;
pub mod logger;
mod timer;
pub mod unit;

pub use api::{
    LogEvent, LogsApi, LogsConnector, MetricPoint, MetricsApi, MetricsConnector, SdkLogsConnector,
    SdkMetricsConnector, StatisticValues,
};
pub use counters::CloudWatchCounters;
pub use factory::{COUNTERS_TYPE, CloudWatchComponent, DefaultCloudWatchFactory, LOGGER_TYPE};
pub use layer::CloudWatchLayer;
pub use logger::{CloudWatchLogger, format_message};
pub use timer::TransportState;
pub use unit::MetricUnit;
