//! Action-dispatch container for Lambda functions.

use crate::function::registry::ActionRegistry;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stratus_config::{EnvLoader, config_path, read_config};
use stratus_core::{
    ApplicationError, CONTEXT_INFO, Component, CompositeCounters, ConfigParams, ContextInfo,
    Counters, Openable, References, Result, Schema, Timing,
};
use tracing::{debug, error, info};

/// Lifecycle state of a [`LambdaFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    /// Constructed, no actions registered yet.
    Created,
    /// Actions registered, components not opened.
    Registered,
    /// Ready to dispatch events.
    Open,
    /// Components closed.
    Closed,
}

/// Registration hook supplying the actions of a function.
///
/// Called exactly once per function, when references are first attached or
/// on the first open.
pub trait FunctionService: Send + Sync {
    fn register(&self, registrar: &mut ActionRegistrar<'_>) -> Result<()>;
}

/// Handle given to [`FunctionService::register`].
pub struct ActionRegistrar<'a> {
    info: &'a ContextInfo,
    references: &'a References,
    counters: &'a Arc<CompositeCounters>,
    registry: &'a mut ActionRegistry,
}

impl<'a> ActionRegistrar<'a> {
    /// Container info.
    pub fn info(&self) -> &ContextInfo {
        self.info
    }

    /// References attached to the container.
    pub fn references(&self) -> &References {
        self.references
    }

    /// Counters for instrumenting actions.
    pub fn counters(&self) -> Arc<CompositeCounters> {
        self.counters.clone()
    }

    /// Register an action. See [`ActionRegistry::register_action`].
    pub fn register_action<F, Fut>(
        &mut self,
        name: &str,
        schema: Option<Arc<dyn Schema>>,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.registry.register_action(name, schema, handler)
    }
}

/// Container that turns Lambda invocation events into calls on registered
/// actions.
///
/// Events are JSON objects carrying a `cmd` field naming the action and an
/// optional `correlation_id`; the whole event is passed to the action as its
/// parameters. The first event opens the container when it is not open yet:
/// configuration is read from `CONFIG_PATH` (or the configured path) with the
/// process environment as template parameters, then components are
/// configured, wired and opened in registration order.
///
/// ```no_run
/// use stratus_lambda::{ActionRegistrar, FunctionService, LambdaFunction};
/// use stratus_core::Result;
/// use serde_json::json;
///
/// struct Greeter;
///
/// impl FunctionService for Greeter {
///     fn register(&self, registrar: &mut ActionRegistrar<'_>) -> Result<()> {
///         registrar.register_action("greet", None, |params| async move {
///             Ok(json!({ "greeting": format!("Hello, {}", params["name"]) }))
///         })
///     }
/// }
///
/// # async fn run() -> Result<()> {
/// let function = LambdaFunction::new("greeter", None, Greeter);
/// let result = function.act(json!({ "cmd": "greet", "name": "world" })).await?;
/// # Ok(())
/// # }
/// ```
pub struct LambdaFunction {
    info: ContextInfo,
    service: Arc<dyn FunctionService>,
    config_path: String,
    config: RwLock<Option<ConfigParams>>,
    references: RwLock<References>,
    components: RwLock<Vec<(String, Arc<dyn Component>)>>,
    counters: Arc<CompositeCounters>,
    actions: RwLock<Arc<ActionRegistry>>,
    registered: AtomicBool,
    state: RwLock<FunctionState>,
    open_lock: tokio::sync::Mutex<()>,
}

impl LambdaFunction {
    /// Create a function container.
    pub fn new(
        name: impl Into<String>,
        description: Option<&str>,
        service: impl FunctionService + 'static,
    ) -> Self {
        let info = ContextInfo::new(name, description.map(String::from));

        let mut references = References::new();
        references.put(CONTEXT_INFO, info.clone());

        Self {
            info,
            service: Arc::new(service),
            config_path: stratus_config::DEFAULT_CONFIG_PATH.to_string(),
            config: RwLock::new(None),
            references: RwLock::new(references),
            components: RwLock::new(Vec::new()),
            counters: Arc::new(CompositeCounters::new()),
            actions: RwLock::new(Arc::new(ActionRegistry::new())),
            registered: AtomicBool::new(false),
            state: RwLock::new(FunctionState::Created),
            open_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Read configuration from `path` unless `CONFIG_PATH` is set.
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Use `config` instead of reading a configuration file.
    pub fn with_config(self, config: ConfigParams) -> Self {
        *self.config.write() = Some(config);
        self
    }

    /// Add a component. It is referenced under `name`, configured from the
    /// `name` section of the configuration and opened with the container.
    pub fn with_component<T: Component + 'static>(self, name: &str, component: Arc<T>) -> Self {
        self.references.write().put(name, component.clone());
        self.components
            .write()
            .push((name.to_string(), component as Arc<dyn Component>));
        self
    }

    /// Add a counters component. Besides the [`with_component`] wiring it is
    /// registered as `Arc<dyn Counters>`, so instrumented actions report to it.
    ///
    /// [`with_component`]: LambdaFunction::with_component
    pub fn with_counters<T: Component + Counters + 'static>(
        self,
        name: &str,
        counters: Arc<T>,
    ) -> Self {
        self.references
            .write()
            .put(name, counters.clone() as Arc<dyn Counters>);
        self.with_component(name, counters)
    }

    /// Add a plain reference, e.g. a controller or a counters sink.
    pub fn with_reference<T: Any + Send + Sync>(self, name: &str, value: T) -> Self {
        self.references.write().put(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    pub fn state(&self) -> FunctionState {
        *self.state.read()
    }

    pub fn counters(&self) -> &Arc<CompositeCounters> {
        &self.counters
    }

    /// Snapshot of the action table.
    pub fn actions(&self) -> Arc<ActionRegistry> {
        self.actions.read().clone()
    }

    /// Attach external references and run the registration hook.
    pub fn set_references(&self, references: &References) -> Result<()> {
        self.references.write().append(references);
        let references = self.references.read().clone();
        self.counters.set_references(&references);
        self.register_once(&references)
    }

    fn register_once(&self, references: &References) -> Result<()> {
        if self.registered.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut registry = ActionRegistry::new();
        let mut registrar = ActionRegistrar {
            info: &self.info,
            references,
            counters: &self.counters,
            registry: &mut registry,
        };
        self.service.register(&mut registrar)?;

        debug!(function = %self.info.name, actions = ?registry.names(), "Actions registered");

        *self.actions.write() = Arc::new(registry);
        self.registered.store(true, Ordering::SeqCst);

        let mut state = self.state.write();
        if *state == FunctionState::Created {
            *state = FunctionState::Registered;
        }
        Ok(())
    }

    fn load_config(&self, correlation_id: Option<&str>) -> Result<ConfigParams> {
        if let Some(config) = self.config.read().clone() {
            return Ok(config);
        }

        let path = config_path(Some(&self.config_path));
        let parameters = EnvLoader::default().load();
        let config = read_config(correlation_id, &path, &parameters)
            .map_err(|e| ApplicationError::from(e).with_correlation_id(correlation_id))?;
        Ok(config)
    }

    /// Start a timing span named `<name>.exec_time`.
    pub fn instrument(&self, correlation_id: Option<&str>, name: &str) -> Timing {
        self.counters.instrument(correlation_id, name)
    }

    /// Handle one invocation event, opening the container first if needed.
    pub async fn handle(&self, event: Value) -> Result<Value> {
        if !self.is_open() {
            let correlation_id = event
                .get("correlation_id")
                .and_then(Value::as_str)
                .unwrap_or(&self.info.name)
                .to_string();
            self.open(Some(&correlation_id)).await?;
        }

        self.execute(event).await
    }

    /// Dispatch an event to the action named by its `cmd` field.
    pub async fn execute(&self, event: Value) -> Result<Value> {
        let correlation_id = event
            .get("correlation_id")
            .and_then(Value::as_str)
            .map(String::from);

        let cmd = match event.get("cmd") {
            None | Some(Value::Null) => {
                return Err(ApplicationError::bad_request(
                    correlation_id.as_deref(),
                    "NO_COMMAND",
                    "Cmd parameter is missing",
                ));
            }
            Some(cmd) => cmd.clone(),
        };

        let actions = self.actions();
        let Some(action) = cmd.as_str().and_then(|name| actions.get(name)) else {
            let name = match &cmd {
                Value::String(name) => name.clone(),
                other => other.to_string(),
            };
            return Err(ApplicationError::bad_request(
                correlation_id.as_deref(),
                "NO_ACTION",
                format!("Action {} was not found", name),
            )
            .with_details("command", cmd));
        };

        action.invoke(event).await
    }

    /// Handle an event directly; intended for tests.
    pub async fn act(&self, params: Value) -> Result<Value> {
        self.handle(params).await
    }
}

#[async_trait]
impl Openable for LambdaFunction {
    fn is_open(&self) -> bool {
        self.state() == FunctionState::Open
    }

    async fn open(&self, correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let config = self.load_config(correlation_id)?;
        let references = self.references.read().clone();
        self.counters.set_references(&references);
        self.register_once(&references)?;

        let components = self.components.read().clone();
        for (name, component) in &components {
            component.configure(&config.get_section(name));
        }
        for (_, component) in &components {
            component.set_references(&references)?;
        }
        for (name, component) in &components {
            component.open(correlation_id).await?;
            debug!(
                correlation_id = correlation_id.unwrap_or("---"),
                component = %name,
                "Component opened"
            );
        }

        *self.state.write() = FunctionState::Open;
        info!(
            correlation_id = correlation_id.unwrap_or("---"),
            function = %self.info.name,
            "Function opened"
        );
        Ok(())
    }

    async fn close(&self, correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if !self.is_open() {
            return Ok(());
        }

        let mut first_error = None;
        let components = self.components.read().clone();
        for (name, component) in components.iter().rev() {
            if let Err(err) = component.close(correlation_id).await {
                error!(
                    correlation_id = correlation_id.unwrap_or("---"),
                    component = %name,
                    error = %err,
                    "Failed to close component"
                );
                first_error.get_or_insert(err);
            }
        }

        *self.state.write() = FunctionState::Closed;
        info!(
            correlation_id = correlation_id.unwrap_or("---"),
            function = %self.info.name,
            "Function closed"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use stratus_core::{Configurable, ObjectSchema, Referenceable, TypeCode};

    struct Echo {
        registrations: Arc<AtomicUsize>,
    }

    impl FunctionService for Echo {
        fn register(&self, registrar: &mut ActionRegistrar<'_>) -> Result<()> {
            self.registrations.fetch_add(1, Ordering::SeqCst);

            let schema = ObjectSchema::new().with_required_property("id", TypeCode::String);
            registrar.register_action("echo", Some(Arc::new(schema)), |params| async move {
                Ok(params)
            })?;
            registrar.register_action("fail", None, |_| async move {
                Err(ApplicationError::invocation(None, "BOOM", "failed"))
            })
        }
    }

    #[derive(Default)]
    struct Probe {
        events: parking_lot::Mutex<Vec<String>>,
        fail_open: bool,
    }

    impl Configurable for Probe {
        fn configure(&self, config: &ConfigParams) {
            let value = config.get_as_string_with_default("value", "-");
            self.events.lock().push(format!("configure:{}", value));
        }
    }

    impl Referenceable for Probe {
        fn set_references(&self, _references: &References) -> Result<()> {
            self.events.lock().push("references".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl Openable for Probe {
        fn is_open(&self) -> bool {
            false
        }

        async fn open(&self, _correlation_id: Option<&str>) -> Result<()> {
            if self.fail_open {
                return Err(ApplicationError::configuration(None, "OPEN_FAILED", "cannot open"));
            }
            self.events.lock().push("open".to_string());
            Ok(())
        }

        async fn close(&self, _correlation_id: Option<&str>) -> Result<()> {
            self.events.lock().push("close".to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Tally {
        timings: parking_lot::Mutex<Vec<String>>,
        open: AtomicBool,
    }

    impl Counters for Tally {
        fn end_timing(&self, name: &str, _elapsed_ms: f64) {
            self.timings.lock().push(name.to_string());
        }

        fn stats(&self, _name: &str, _value: f64) {}

        fn last(&self, _name: &str, _value: f64) {}

        fn timestamp(&self, _name: &str, _value: chrono::DateTime<chrono::Utc>) {}

        fn increment(&self, _name: &str, _value: i64) {}
    }

    impl Configurable for Tally {
        fn configure(&self, _config: &ConfigParams) {}
    }

    impl Referenceable for Tally {
        fn set_references(&self, _references: &References) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Openable for Tally {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        async fn open(&self, _correlation_id: Option<&str>) -> Result<()> {
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self, _correlation_id: Option<&str>) -> Result<()> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn echo_function() -> (LambdaFunction, Arc<AtomicUsize>) {
        let registrations = Arc::new(AtomicUsize::new(0));
        let function = LambdaFunction::new(
            "test",
            Some("test function"),
            Echo {
                registrations: registrations.clone(),
            },
        )
        .with_config(ConfigParams::new());
        (function, registrations)
    }

    #[tokio::test]
    async fn test_lazy_open_and_dispatch() {
        let (function, registrations) = echo_function();
        assert_eq!(function.state(), FunctionState::Created);

        let result = function
            .act(json!({ "cmd": "echo", "correlation_id": "c1", "id": "1" }))
            .await
            .unwrap();

        assert_eq!(result["id"], "1");
        assert_eq!(result["cmd"], "echo");
        assert!(function.is_open());
        assert_eq!(registrations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_command() {
        let (function, _) = echo_function();
        let err = function.act(json!({ "correlation_id": "c2" })).await.unwrap_err();

        assert_eq!(err.code, "NO_COMMAND");
        assert_eq!(err.status, 400);
        assert_eq!(err.correlation_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let (function, _) = echo_function();
        let err = function.act(json!({ "cmd": "nope" })).await.unwrap_err();

        assert_eq!(err.code, "NO_ACTION");
        assert_eq!(err.detail("command"), Some(&json!("nope")));
    }

    #[tokio::test]
    async fn test_null_command_is_missing() {
        let (function, _) = echo_function();
        let err = function.act(json!({ "cmd": null })).await.unwrap_err();
        assert_eq!(err.code, "NO_COMMAND");
    }

    #[tokio::test]
    async fn test_non_string_command_is_unknown_action() {
        let (function, _) = echo_function();

        let err = function.act(json!({ "cmd": 5 })).await.unwrap_err();
        assert_eq!(err.code, "NO_ACTION");
        assert_eq!(err.detail("command"), Some(&json!(5)));

        let err = function.act(json!({ "cmd": { "name": "echo" } })).await.unwrap_err();
        assert_eq!(err.code, "NO_ACTION");
        assert_eq!(err.detail("command"), Some(&json!({ "name": "echo" })));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let (function, _) = echo_function();
        let err = function.act(json!({ "cmd": "fail" })).await.unwrap_err();
        assert_eq!(err.code, "BOOM");
    }

    #[tokio::test]
    async fn test_register_runs_once() {
        let (function, registrations) = echo_function();
        function.set_references(&References::new()).unwrap();
        assert_eq!(function.state(), FunctionState::Registered);

        function.open(None).await.unwrap();
        function.close(None).await.unwrap();
        function.open(None).await.unwrap();

        assert_eq!(registrations.load(Ordering::SeqCst), 1);
        assert_eq!(function.actions().names(), vec!["echo", "fail"]);
    }

    #[tokio::test]
    async fn test_component_lifecycle_order() {
        let (function, _) = echo_function();
        let probe = Arc::new(Probe::default());
        let function = function
            .with_config(ConfigParams::from_tuples(&[("probe.value", "42")]))
            .with_component("probe", probe.clone());

        function.open(Some("c3")).await.unwrap();
        function.close(Some("c3")).await.unwrap();

        assert_eq!(
            *probe.events.lock(),
            vec!["configure:42", "references", "open", "close"]
        );
        assert_eq!(function.state(), FunctionState::Closed);
    }

    #[tokio::test]
    async fn test_startup_failure_is_invocation_error() {
        let (function, _) = echo_function();
        let probe = Arc::new(Probe {
            fail_open: true,
            ..Default::default()
        });
        let function = function.with_component("probe", probe);

        let err = function.act(json!({ "cmd": "echo", "id": "1" })).await.unwrap_err();
        assert_eq!(err.code, "OPEN_FAILED");
        assert!(!function.is_open());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let function = LambdaFunction::new("test", None, Echo { registrations })
            .with_config_path("./does-not-exist/config.yml");

        // CONFIG_PATH is not set in the test environment
        if std::env::var(stratus_config::CONFIG_PATH_ENV).is_err() {
            let err = function.open(Some("c4")).await.unwrap_err();
            assert_eq!(err.code, "FILE_NOT_FOUND");
            assert_eq!(err.correlation_id.as_deref(), Some("c4"));
        }
    }

    #[tokio::test]
    async fn test_with_counters_receives_timings() {
        let (function, _) = echo_function();
        let tally = Arc::new(Tally::default());
        let function = function.with_counters("tally", tally.clone());

        function.open(None).await.unwrap();
        assert!(tally.is_open());
        assert_eq!(function.counters().len(), 1);

        function.instrument(Some("c5"), "test.echo").end_timing();
        assert_eq!(*tally.timings.lock(), vec!["test.echo.exec_time"]);

        function.close(None).await.unwrap();
        assert!(!tally.is_open());
    }
}
