//! Creates CloudWatch components by type name.

use crate::counters::CloudWatchCounters;
use crate::logger::CloudWatchLogger;
use std::sync::Arc;
use stratus_core::{Component, Counters, References};

/// Type name of [`CloudWatchLogger`].
pub const LOGGER_TYPE: &str = "logger";

/// Type name of [`CloudWatchCounters`].
pub const COUNTERS_TYPE: &str = "counters";

/// A component created by [`DefaultCloudWatchFactory`].
#[derive(Clone)]
pub enum CloudWatchComponent {
    Logger(Arc<CloudWatchLogger>),
    Counters(Arc<CloudWatchCounters>),
}

impl CloudWatchComponent {
    /// Type name the component was created from.
    pub fn type_name(&self) -> &'static str {
        match self {
            CloudWatchComponent::Logger(_) => LOGGER_TYPE,
            CloudWatchComponent::Counters(_) => COUNTERS_TYPE,
        }
    }

    /// The component as a lifecycle-managed trait object.
    pub fn as_component(&self) -> Arc<dyn Component> {
        match self {
            CloudWatchComponent::Logger(logger) => logger.clone(),
            CloudWatchComponent::Counters(counters) => counters.clone(),
        }
    }

    /// Register the component under `name`.
    ///
    /// Counters are also registered as `Arc<dyn Counters>` so instrumented
    /// components pick them up.
    pub fn register(&self, references: &mut References, name: &str) {
        match self {
            CloudWatchComponent::Logger(logger) => references.put(name, logger.clone()),
            CloudWatchComponent::Counters(counters) => {
                references.put(name, counters.clone());
                references.put(name, counters.clone() as Arc<dyn Counters>);
            }
        }
    }
}

/// Factory for the CloudWatch logger and counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCloudWatchFactory;

impl DefaultCloudWatchFactory {
    pub fn new() -> Self {
        Self
    }

    /// Check if `type_name` names a known component.
    pub fn can_create(&self, type_name: &str) -> bool {
        matches!(type_name, LOGGER_TYPE | COUNTERS_TYPE)
    }

    /// Create a fresh component, or `None` for an unknown type.
    pub fn create(&self, type_name: &str) -> Option<CloudWatchComponent> {
        match type_name {
            LOGGER_TYPE => Some(CloudWatchComponent::Logger(Arc::new(CloudWatchLogger::new()))),
            COUNTERS_TYPE => Some(CloudWatchComponent::Counters(Arc::new(
                CloudWatchCounters::new(),
            ))),
            _ => None,
        }
    }
}
