//! Log messages published to a CloudWatch Logs stream.

use crate::api::{LogEvent, LogsApi, LogsConnector, SdkLogsConnector};
use crate::timer::{FlushTimer, TransportState};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use stratus_aws::AwsConnectionResolver;
use stratus_core::{
    ApplicationError, CachedLogger, ConfigParams, Configurable, ErrorDescription, LogLevel,
    LogMessage, Openable, References, Referenceable, Result,
};
use tracing::{debug, error};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default flush period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Group and stream name used when nothing else is configured.
pub const UNDEFINED: &str = "undefined";

struct Inner {
    cache: CachedLogger,
    connector: Arc<dyn LogsConnector>,
    resolver: AwsConnectionResolver,
    connect_timeout: RwLock<Duration>,
    interval: RwLock<Duration>,
    group: RwLock<String>,
    stream: RwLock<Option<String>>,
    state: RwLock<TransportState>,
    api: RwLock<Option<Arc<dyn LogsApi>>>,
    // Held across put_log_events so tokens chain in order
    last_token: tokio::sync::Mutex<Option<String>>,
}

impl Inner {
    fn group(&self) -> String {
        self.group.read().clone()
    }

    fn stream(&self) -> String {
        self.stream
            .read()
            .clone()
            .unwrap_or_else(|| UNDEFINED.to_string())
    }

    async fn dump(&self) {
        let messages = self.cache.drain();
        if let Err(err) = self.save(messages).await {
            error!(error = %err, "cloudwatch_logger: failed to flush log messages");
        }
    }

    async fn save(&self, messages: Vec<LogMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let api = self.api.read().clone();
        let Some(api) = api else {
            return Err(ApplicationError::configuration(
                None,
                "NOT_OPENED",
                "CloudWatchLogger is not opened",
            ));
        };

        let events = messages
            .iter()
            .map(|m| LogEvent {
                timestamp_ms: m.time.timestamp_millis(),
                message: format_message(m),
            })
            .collect();

        let group = self.group();
        let stream = self.stream();
        let mut last_token = self.last_token.lock().await;
        match api
            .put_log_events(&group, &stream, events, last_token.clone())
            .await
        {
            Ok(next) => *last_token = next,
            Err(err) => {
                error!(
                    group = %group,
                    stream = %stream,
                    error = %err,
                    "cloudwatch_logger: putLogEvents error"
                );
            }
        }
        Ok(())
    }
}

/// Render a message as `[source:correlation_id:LEVEL] text`.
pub fn format_message(message: &LogMessage) -> String {
    let mut result = format!(
        "[{}:{}:{}] {}",
        message.source.as_deref().unwrap_or("---"),
        message.correlation_id.as_deref().unwrap_or("---"),
        message.level,
        message.message
    );

    if let Some(err) = &message.error {
        if message.message.is_empty() {
            result.push_str("Error: ");
        } else {
            result.push_str(": ");
        }
        result.push_str(&err.message);
        if let Some(trace) = &err.stack_trace {
            result.push_str(" StackTrace: ");
            result.push_str(trace);
        }
    }

    result
}

/// Logger that buffers messages and periodically ships them to CloudWatch
/// Logs.
///
/// Opening creates the log group and stream when they do not exist yet.
/// Configuration:
///
/// | key | meaning |
/// |-----|---------|
/// | `connection.*` / `credential.*` | AWS connection, see [`AwsConnectionResolver`] |
/// | `group` | log group, default `undefined` |
/// | `stream` | log stream, defaults to the context name |
/// | `level` | most verbose level kept, default `info` |
/// | `source` | message source, defaults to the context name |
/// | `options.interval` | flush period in ms, default 10000 |
/// | `options.max_cache_size` | buffered messages before the oldest are dropped, default 100 |
/// | `options.connect_timeout` | connect timeout in ms, default 30000 |
pub struct CloudWatchLogger {
    inner: Arc<Inner>,
    timer: Mutex<Option<FlushTimer>>,
    open_lock: tokio::sync::Mutex<()>,
}

impl Default for CloudWatchLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudWatchLogger {
    /// Create a logger using the AWS SDK.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(SdkLogsConnector))
    }

    /// Create a logger with a custom transport.
    pub fn with_connector(connector: Arc<dyn LogsConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: CachedLogger::new(),
                connector,
                resolver: AwsConnectionResolver::new(),
                connect_timeout: RwLock::new(DEFAULT_CONNECT_TIMEOUT),
                interval: RwLock::new(DEFAULT_INTERVAL),
                group: RwLock::new(UNDEFINED.to_string()),
                stream: RwLock::new(None),
                state: RwLock::new(TransportState::Closed),
                api: RwLock::new(None),
                last_token: tokio::sync::Mutex::new(None),
            }),
            timer: Mutex::new(None),
            open_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> TransportState {
        *self.inner.state.read()
    }

    pub fn group(&self) -> String {
        self.inner.group()
    }

    pub fn stream(&self) -> String {
        self.inner.stream()
    }

    pub fn interval(&self) -> Duration {
        *self.inner.interval.read()
    }

    pub fn connect_timeout(&self) -> Duration {
        *self.inner.connect_timeout.read()
    }

    pub fn level(&self) -> LogLevel {
        self.inner.cache.level()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.inner.cache.set_level(level);
    }

    /// Number of buffered messages.
    pub fn buffered(&self) -> usize {
        self.inner.cache.len()
    }

    /// Sequence token for the next write.
    pub async fn last_token(&self) -> Option<String> {
        self.inner.last_token.lock().await.clone()
    }

    /// Buffer a message if its level passes the filter.
    pub fn write(
        &self,
        level: LogLevel,
        correlation_id: Option<&str>,
        error: Option<ErrorDescription>,
        message: impl Into<String>,
    ) {
        self.inner.cache.write(level, correlation_id, error, message);
    }

    pub fn fatal(
        &self,
        correlation_id: Option<&str>,
        error: Option<ErrorDescription>,
        message: impl Into<String>,
    ) {
        self.write(LogLevel::Fatal, correlation_id, error, message);
    }

    pub fn error(
        &self,
        correlation_id: Option<&str>,
        error: Option<ErrorDescription>,
        message: impl Into<String>,
    ) {
        self.write(LogLevel::Error, correlation_id, error, message);
    }

    pub fn warn(&self, correlation_id: Option<&str>, message: impl Into<String>) {
        self.write(LogLevel::Warn, correlation_id, None, message);
    }

    pub fn info(&self, correlation_id: Option<&str>, message: impl Into<String>) {
        self.write(LogLevel::Info, correlation_id, None, message);
    }

    pub fn debug(&self, correlation_id: Option<&str>, message: impl Into<String>) {
        self.write(LogLevel::Debug, correlation_id, None, message);
    }

    pub fn trace(&self, correlation_id: Option<&str>, message: impl Into<String>) {
        self.write(LogLevel::Trace, correlation_id, None, message);
    }

    /// Ship buffered messages now. Failures are logged.
    pub async fn dump(&self) {
        self.inner.dump().await;
    }

    /// Ship the given messages in one `PutLogEvents` call.
    ///
    /// An empty batch always succeeds. Otherwise the logger must be open;
    /// transport failures are logged, not returned.
    pub async fn save(&self, messages: Vec<LogMessage>) -> Result<()> {
        self.inner.save(messages).await
    }
}

impl Configurable for CloudWatchLogger {
    fn configure(&self, config: &ConfigParams) {
        self.inner.cache.configure(config);
        self.inner.resolver.configure(config);

        if let Some(group) = config.get_as_nullable_string("group") {
            *self.inner.group.write() = group;
        }
        if let Some(stream) = config.get_as_nullable_string("stream") {
            *self.inner.stream.write() = Some(stream);
        }
        let interval = config.get_as_duration_with_default("options.interval", self.interval());
        *self.inner.interval.write() = interval;
        let timeout =
            config.get_as_duration_with_default("options.connect_timeout", self.connect_timeout());
        *self.inner.connect_timeout.write() = timeout;
    }
}

impl Referenceable for CloudWatchLogger {
    fn set_references(&self, references: &References) -> Result<()> {
        self.inner.resolver.set_references(references)?;

        if let Some(info) = references.context_info() {
            self.inner.cache.default_source(&info.name);
            self.inner.stream.write().get_or_insert(info.name);
        }
        Ok(())
    }
}

impl CloudWatchLogger {
    async fn provision(&self, correlation_id: Option<&str>) -> Result<Arc<dyn LogsApi>> {
        let connection = self.inner.resolver.resolve(correlation_id).await?;
        let to_app_error = |e: stratus_aws::AwsError| {
            ApplicationError::from(e).with_correlation_id(correlation_id)
        };

        let api = self
            .inner
            .connector
            .connect(&connection, self.connect_timeout())
            .await
            .map_err(to_app_error)?;

        let group = self.group();
        let stream = self.stream();

        match api.create_log_group(&group).await {
            Err(e) if !e.is_already_exists() => return Err(to_app_error(e)),
            _ => {}
        }

        let token = match api.create_log_stream(&group, &stream).await {
            Ok(()) => None,
            Err(e) if e.is_already_exists() => api
                .describe_upload_token(&group, &stream)
                .await
                .map_err(to_app_error)?,
            Err(e) => return Err(to_app_error(e)),
        };
        *self.inner.last_token.lock().await = token;

        Ok(api)
    }
}

#[async_trait]
impl Openable for CloudWatchLogger {
    fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    async fn open(&self, correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if self.is_open() {
            return Ok(());
        }
        *self.inner.state.write() = TransportState::Opening;

        let api = match self.provision(correlation_id).await {
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
            group = %self.group(),
            stream = %self.stream(),
            "CloudWatch logger opened"
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
