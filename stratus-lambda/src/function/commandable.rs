//! Lambda function exposing a controller's command set.

use crate::function::{ActionRegistrar, FunctionService, LambdaFunction};
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use stratus_core::{Commandable, Result};

/// Reference name of the controller whose commands become actions.
pub const CONTROLLER_REFERENCE: &str = "controller";

struct CommandRegistration;

impl FunctionService for CommandRegistration {
    fn register(&self, registrar: &mut ActionRegistrar<'_>) -> Result<()> {
        let controller = registrar
            .references()
            .get_one_required::<Arc<dyn Commandable>>(CONTROLLER_REFERENCE)?;
        let container_name = registrar.info().name.clone();
        let counters = registrar.counters();

        for command in controller.command_set().commands() {
            let name = command.name().to_string();
            let command = command.clone();
            let counters = counters.clone();
            let span = format!("{}.{}", container_name, name);

            // Commands validate their own arguments
            registrar.register_action(&name, None, move |params: Value| {
                let command = command.clone();
                let counters = counters.clone();
                let span = span.clone();
                async move {
                    let correlation_id = params
                        .get("correlation_id")
                        .and_then(Value::as_str)
                        .map(String::from);
                    let timing = counters.instrument(correlation_id.as_deref(), &span);
                    let result = command.execute(correlation_id.as_deref(), params).await;
                    timing.end_timing();
                    result
                }
            })?;
        }

        Ok(())
    }
}

/// A [`LambdaFunction`] with one action per command of the `controller`
/// reference, named after the command.
///
/// The controller is registered as `Arc<dyn Commandable>`. Every call is
/// timed under `<function-name>.<command-name>`.
///
/// ```no_run
/// use std::sync::Arc;
/// use stratus_core::{Command, CommandSet, Commandable};
/// use stratus_lambda::CommandableLambdaFunction;
/// use serde_json::json;
///
/// struct Controller;
///
/// impl Commandable for Controller {
///     fn command_set(&self) -> CommandSet {
///         CommandSet::new().with_command(Command::new("ping", None, |_, _| async move {
///             Ok(json!("pong"))
///         }))
///     }
/// }
///
/// let function = CommandableLambdaFunction::new("pinger", None)
///     .with_controller(Arc::new(Controller));
/// ```
pub struct CommandableLambdaFunction {
    function: LambdaFunction,
}

impl CommandableLambdaFunction {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            function: LambdaFunction::new(name, description, CommandRegistration),
        }
    }

    /// Register the controller reference.
    pub fn with_controller(self, controller: Arc<dyn Commandable>) -> Self {
        self.map(|function| function.with_reference(CONTROLLER_REFERENCE, controller))
    }

    /// Apply a [`LambdaFunction`] builder step.
    pub fn map(self, f: impl FnOnce(LambdaFunction) -> LambdaFunction) -> Self {
        Self {
            function: f(self.function),
        }
    }

    /// Unwrap the inner function, e.g. to hand it to a runtime.
    pub fn into_inner(self) -> LambdaFunction {
        self.function
    }
}

impl Deref for CommandableLambdaFunction {
    type Target = LambdaFunction;

    fn deref(&self) -> &LambdaFunction {
        &self.function
    }
}
