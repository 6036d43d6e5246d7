//! Lambda runtime for Stratus functions.

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use serde_json::Value;
use std::sync::Arc;
use stratus_core::Openable;
use tracing::{debug, error, info};

use crate::error::to_runtime_error;
use crate::{LambdaFunction, Result};

/// Lambda runtime configuration.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    /// Enable event logging.
    pub log_events: bool,
    /// Enable response logging.
    pub log_responses: bool,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            log_events: true,
            log_responses: false,
        }
    }
}

impl LambdaConfig {
    /// Enable event logging.
    pub fn log_events(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// Enable response logging.
    pub fn log_responses(mut self, enabled: bool) -> Self {
        self.log_responses = enabled;
        self
    }
}

/// Lambda runtime for Stratus functions.
///
/// Feeds every invocation event to [`LambdaFunction::handle`]. Errors of a
/// single invocation are returned to its invoker; a failure of the runtime
/// itself is logged once at the top level. The host's shutdown callback
/// should call [`LambdaRuntime::shutdown`] to close the function.
pub struct LambdaRuntime {
    function: Arc<LambdaFunction>,
    config: LambdaConfig,
}

impl LambdaRuntime {
    /// Create a new Lambda runtime.
    pub fn new(function: LambdaFunction) -> Self {
        Self::from_shared(Arc::new(function))
    }

    /// Create a runtime for a function shared with other owners.
    pub fn from_shared(function: Arc<LambdaFunction>) -> Self {
        Self {
            function,
            config: LambdaConfig::default(),
        }
    }

    /// Set the runtime configuration.
    pub fn with_config(mut self, config: LambdaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn function(&self) -> &Arc<LambdaFunction> {
        &self.function
    }

    /// Run the Lambda runtime.
    ///
    /// This function never returns under normal operation.
    pub async fn run(&self) -> Result<()> {
        info!(function = %self.function.name(), "Starting Stratus Lambda runtime");

        let function = self.function.clone();
        let config = self.config.clone();

        let result = run(service_fn(move |event: LambdaEvent<Value>| {
            let function = function.clone();
            let config = config.clone();
            async move { handle_event(function, config, event).await }
        }))
        .await;

        if let Err(err) = &result {
            error!(function = %self.function.name(), error = %err, "Process is terminated");
        }
        result.map_err(Into::into)
    }

    /// Close the function. Call from the host's shutdown hook.
    pub async fn shutdown(&self) -> Result<()> {
        let correlation_id = self.function.name().to_string();
        self.function.close(Some(&correlation_id)).await?;
        info!(function = %self.function.name(), "Goodbye!");
        Ok(())
    }
}

/// Handle one Lambda event.
async fn handle_event(
    function: Arc<LambdaFunction>,
    config: LambdaConfig,
    event: LambdaEvent<Value>,
) -> std::result::Result<Value, Error> {
    let LambdaEvent { payload, context } = event;

    if config.log_events {
        debug!(
            request_id = %context.request_id,
            cmd = ?payload.get("cmd"),
            correlation_id = ?payload.get("correlation_id"),
            "Handling Lambda event"
        );
    }

    match function.handle(payload).await {
        Ok(result) => {
            if config.log_responses {
                debug!(request_id = %context.request_id, "Lambda response");
            }
            Ok(result)
        }
        Err(err) => {
            debug!(
                request_id = %context.request_id,
                code = %err.code,
                error = %err,
                "Lambda invocation failed"
            );
            Err(to_runtime_error(&err))
        }
    }
}
