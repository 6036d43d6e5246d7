//! Action table keyed by command name.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use stratus_core::{ApplicationError, Result, Schema};

/// Boxed future returned by action handlers.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

type ActionHandler = Arc<dyn Fn(Value) -> ActionFuture + Send + Sync>;

/// A registered action: an optional parameter schema and its handler.
#[derive(Clone)]
pub struct Action {
    name: String,
    schema: Option<Arc<dyn Schema>>,
    handler: ActionHandler,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&Arc<dyn Schema>> {
        self.schema.as_ref()
    }

    /// Validate the parameters against the schema, then run the handler.
    ///
    /// A validation failure is returned without calling the handler.
    pub async fn invoke(&self, params: Value) -> Result<Value> {
        if let Some(schema) = &self.schema {
            let correlation_id = params.get("correlation_id").and_then(Value::as_str);
            schema.validate(correlation_id, &params)?;
        }
        (self.handler)(params).await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}

/// Mapping from command name to action.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `name`.
    ///
    /// An empty name fails with `NO_COMMAND` and leaves the table unchanged.
    /// Registering an existing name replaces the previous action.
    ///
    /// ```
    /// use stratus_lambda::ActionRegistry;
    /// use serde_json::json;
    ///
    /// let mut registry = ActionRegistry::new();
    /// registry
    ///     .register_action("ping", None, |_params| async move { Ok(json!("pong")) })
    ///     .unwrap();
    /// assert!(registry.get("ping").is_some());
    /// ```
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
        if name.is_empty() {
            return Err(ApplicationError::unknown(None, "NO_COMMAND", "Missing command"));
        }

        let action = Action {
            name: name.to_string(),
            schema,
            handler: Arc::new(move |params| Box::pin(handler(params))),
        };
        self.actions.insert(name.to_string(), action);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
