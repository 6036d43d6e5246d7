//! # Stratus Lambda
//!
//! Runs Stratus services as AWS Lambda functions and calls them remotely.
//!
//! A [`LambdaFunction`] routes invocation events `{ "cmd": ..., "correlation_id": ..., ... }`
//! to registered actions. [`CommandableLambdaFunction`] registers one action
//! per command of a controller. [`LambdaClient`] and
//! [`CommandableLambdaClient`] invoke such functions from other services.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratus_lambda::{CommandableLambdaFunction, LambdaRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stratus_lambda::LambdaError> {
//!     // Initialize tracing for CloudWatch
//!     stratus_lambda::init_tracing();
//!
//!     let function = CommandableLambdaFunction::new("orders", Some("Orders service"))
//!         .with_controller(Arc::new(OrdersController::new()))
//!         .into_inner();
//!
//!     let runtime = LambdaRuntime::new(function);
//!     let result = runtime.run().await;
//!     runtime.shutdown().await?;
//!     result
//! }
//! ```
//!
//! ## Calling a Function
//!
//! ```rust,ignore
//! use stratus_lambda::CommandableLambdaClient;
//! use stratus_core::{ConfigParams, Configurable, Openable};
//! use serde_json::json;
//!
//! let client = CommandableLambdaClient::new("orders");
//! client.configure(&ConfigParams::from_tuples(&[
//!     ("connection.arn", "arn:aws:lambda:us-east-1:123456789012:function:orders"),
//!     ("credential.access_id", "AKIA..."),
//!     ("credential.access_key", "..."),
//! ]));
//! client.open(None).await?;
//!
//! let order = client.call_command("get_order", None, json!({ "id": "1" })).await?;
//! ```
//!
//! ## Deployment
//!
//! Build for Lambda with:
//!
//! ```bash
//! # Install cargo-lambda
//! cargo install cargo-lambda
//!
//! # Build for Lambda
//! cargo lambda build --release
//!
//! # Deploy
//! cargo lambda deploy
//! ```

pub mod client;
mod error;
pub mod function;
mod runtime;

pub use client::{
    CommandableLambdaClient, InvocationType, InvokeOutput, LambdaApi, LambdaClient,
    LambdaConnector, RawPayload, SdkLambdaConnector,
};
pub use error::{LambdaError, Result};
pub use function::{
    Action, ActionRegistrar, ActionRegistry, CommandableLambdaFunction, FunctionService,
    FunctionState, LambdaFunction,
};
pub use runtime::{LambdaConfig, LambdaRuntime};

// Re-export lambda types
pub use lambda_runtime;

/// Initialize tracing for Lambda/CloudWatch.
///
/// This sets up structured JSON logging suitable for CloudWatch Logs.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    install_subscriber(filter);
}

/// Initialize tracing with a custom log level.
pub fn init_tracing_with_level(level: &str) {
    install_subscriber(tracing_subscriber::EnvFilter::new(level));
}

fn install_subscriber(filter: tracing_subscriber::EnvFilter) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // A subscriber may already be installed, e.g. by tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .try_init();
}
