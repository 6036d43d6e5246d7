//! Lambda client calling commands of a commandable function.

use crate::client::LambdaClient;
use crate::client::api::LambdaConnector;
use async_trait::async_trait;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use stratus_core::{ConfigParams, Configurable, Openable, References, Referenceable, Result};

/// [`LambdaClient`] calling commands by name with per-command timing.
///
/// Each call is timed under `<client-name>.<cmd>`.
pub struct CommandableLambdaClient {
    name: String,
    client: LambdaClient,
}

impl CommandableLambdaClient {
    /// Create a client using the AWS SDK.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: LambdaClient::new(),
        }
    }

    /// Create a client with a custom transport.
    pub fn with_connector(name: impl Into<String>, connector: Arc<dyn LambdaConnector>) -> Self {
        Self {
            name: name.into(),
            client: LambdaClient::with_connector(connector),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call a command of the remote function and wait for its result.
    pub async fn call_command(
        &self,
        cmd: &str,
        correlation_id: Option<&str>,
        params: Value,
    ) -> Result<Value> {
        let timing = self
            .client
            .instrument(correlation_id, &format!("{}.{}", self.name, cmd));
        let result = self.client.call(cmd, correlation_id, params).await;
        timing.end_timing();
        result
    }
}

impl Deref for CommandableLambdaClient {
    type Target = LambdaClient;

    fn deref(&self) -> &LambdaClient {
        &self.client
    }
}

impl Configurable for CommandableLambdaClient {
    fn configure(&self, config: &ConfigParams) {
        self.client.configure(config);
    }
}

impl Referenceable for CommandableLambdaClient {
    fn set_references(&self, references: &References) -> Result<()> {
        self.client.set_references(references)
    }
}

#[async_trait]
impl Openable for CommandableLambdaClient {
    fn is_open(&self) -> bool {
        self.client.is_open()
    }

    async fn open(&self, correlation_id: Option<&str>) -> Result<()> {
        self.client.open(correlation_id).await
    }

    async fn close(&self, correlation_id: Option<&str>) -> Result<()> {
        self.client.close(correlation_id).await
    }
}
