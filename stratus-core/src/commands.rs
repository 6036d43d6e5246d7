//! Commands and command sets exposed by controllers.

use crate::{ApplicationError, Result, Schema};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by command functions.
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

type CommandFunction = Arc<dyn Fn(Option<String>, Value) -> CommandFuture + Send + Sync>;

/// A named, executable operation.
#[derive(Clone)]
pub struct Command {
    name: String,
    schema: Option<Arc<dyn Schema>>,
    function: CommandFunction,
}

impl Command {
    /// Create a command.
    ///
    /// ```
    /// use stratus_core::Command;
    /// use serde_json::json;
    ///
    /// let command = Command::new("get_data", None, |_correlation_id, args| async move {
    ///     Ok(json!({ "id": args["id"] }))
    /// });
    /// assert_eq!(command.name(), "get_data");
    /// ```
    pub fn new<F, Fut>(name: impl Into<String>, schema: Option<Arc<dyn Schema>>, function: F) -> Self
    where
        F: Fn(Option<String>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            schema,
            function: Arc::new(move |correlation_id, args| Box::pin(function(correlation_id, args))),
        }
    }

    /// Get the command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the argument schema.
    pub fn schema(&self) -> Option<&Arc<dyn Schema>> {
        self.schema.as_ref()
    }

    /// Validate arguments and execute the command.
    pub async fn execute(&self, correlation_id: Option<&str>, args: Value) -> Result<Value> {
        if let Some(schema) = &self.schema {
            schema.validate(correlation_id, &args)?;
        }
        (self.function)(correlation_id.map(String::from), args).await
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}

/// Ordered collection of commands.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    /// Create an empty command set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. A command with the same name replaces the earlier one
    /// in place.
    pub fn add_command(&mut self, command: Command) {
        match self.commands.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => *existing = command,
            None => self.commands.push(command),
        }
    }

    /// Add all commands of another set.
    pub fn add_command_set(&mut self, other: &CommandSet) {
        for command in &other.commands {
            self.add_command(command.clone());
        }
    }

    /// Builder-style add.
    pub fn with_command(mut self, command: Command) -> Self {
        self.add_command(command);
        self
    }

    /// Commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Find a command by name.
    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Execute a command by name.
    pub async fn execute(&self, correlation_id: Option<&str>, name: &str, args: Value) -> Result<Value> {
        let command = self.find_command(name).ok_or_else(|| {
            ApplicationError::bad_request(
                correlation_id,
                "CMD_NOT_FOUND",
                format!("Requested command does not exist: {}", name),
            )
            .with_details("command", name)
        })?;
        command.execute(correlation_id, args).await
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A component exposing its operations as a command set.
pub trait Commandable: Send + Sync {
    /// Get the command set.
    fn command_set(&self) -> CommandSet;
}
