//! Bridge from `tracing` events into a [`CloudWatchLogger`].

use crate::logger::CloudWatchLogger;
use std::fmt;
use std::sync::Arc;
use stratus_core::{ErrorDescription, LogLevel};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// A tracing layer buffering events in a [`CloudWatchLogger`].
///
/// The `message` field becomes the log text, `correlation_id` and `error`
/// fields are carried over and other fields are appended as `key=value`.
/// Events emitted by this crate are skipped so flush failures do not feed
/// back into the buffer.
///
/// ```rust,ignore
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let logger = Arc::new(CloudWatchLogger::new());
/// let subscriber = tracing_subscriber::registry().with(CloudWatchLayer::new(logger.clone()));
/// tracing::subscriber::set_global_default(subscriber)?;
/// ```
pub struct CloudWatchLayer {
    logger: Arc<CloudWatchLogger>,
}

impl CloudWatchLayer {
    pub fn new(logger: Arc<CloudWatchLogger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<CloudWatchLogger> {
        &self.logger
    }
}

fn to_log_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    correlation_id: Option<String>,
    error: Option<String>,
    fields: Vec<String>,
}

impl EventVisitor {
    fn into_message(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "correlation_id" => self.correlation_id = Some(value.to_string()),
            "error" => self.error = Some(value.to_string()),
            name => self.fields.push(format!("{}={}", name, value)),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "correlation_id" => self.correlation_id = Some(format!("{:?}", value)),
            "error" => self.error = Some(format!("{:?}", value)),
            name => self.fields.push(format!("{}={:?}", name, value)),
        }
    }
}

impl<S: Subscriber> Layer<S> for CloudWatchLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let level = to_log_level(metadata.level());
        if level > self.logger.level() {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let correlation_id = visitor.correlation_id.take();
        let error = visitor.error.take().map(|message| ErrorDescription {
            message,
            stack_trace: None,
        });
        self.logger.write(
            level,
            correlation_id.as_deref(),
            error,
            visitor.into_message(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::{ConfigParams, Configurable};
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_are_buffered() {
        let logger = Arc::new(CloudWatchLogger::new());
        logger.configure(&ConfigParams::from_tuples(&[("level", "debug")]));
        let subscriber = tracing_subscriber::registry().with(CloudWatchLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(correlation_id = "c1", order = 42, "Order created");
            tracing::error!(error = "timeout", "Payment failed");
            tracing::trace!("too verbose");
        });

        assert_eq!(logger.buffered(), 2);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(to_log_level(&Level::ERROR), LogLevel::Error);
        assert_eq!(to_log_level(&Level::WARN), LogLevel::Warn);
        assert_eq!(to_log_level(&Level::TRACE), LogLevel::Trace);
    }

    #[test]
    fn test_visitor_fields() {
        let mut visitor = EventVisitor {
            message: "Order created".to_string(),
            ..Default::default()
        };
        visitor.fields.push("order=42".to_string());
        assert_eq!(visitor.into_message(), "Order created order=42");
    }
}
