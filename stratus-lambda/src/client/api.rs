//! Remote invocation seam and its AWS SDK implementation.

use async_trait::async_trait;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::types::LogType;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use stratus_aws::{AwsConnectionParams, AwsError, load_sdk_config};

/// How the remote function is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationType {
    /// Wait for the function result.
    RequestResponse,
    /// Queue the event and return immediately.
    Event,
}

impl InvocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationType::RequestResponse => "RequestResponse",
            InvocationType::Event => "Event",
        }
    }
}

impl From<InvocationType> for aws_sdk_lambda::types::InvocationType {
    fn from(value: InvocationType) -> Self {
        match value {
            InvocationType::RequestResponse => Self::RequestResponse,
            InvocationType::Event => Self::Event,
        }
    }
}

/// Result payload as returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Serialized text, parsed by the client.
    Text(String),
    /// Already structured data, passed through unchanged.
    Json(Value),
    /// Raw bytes; must be UTF-8 encoded JSON.
    Bytes(Vec<u8>),
}

/// Outcome of one remote invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeOutput {
    pub status_code: i32,
    /// Set when the function itself failed (`Handled` / `Unhandled`).
    pub function_error: Option<String>,
    pub payload: Option<RawPayload>,
}

/// Remote function invocation.
#[async_trait]
pub trait LambdaApi: Send + Sync {
    async fn invoke(
        &self,
        function_name: &str,
        invocation_type: InvocationType,
        payload: Vec<u8>,
    ) -> Result<InvokeOutput, AwsError>;
}

/// Builds a [`LambdaApi`] bound to a resolved connection.
#[async_trait]
pub trait LambdaConnector: Send + Sync {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn LambdaApi>, AwsError>;
}

/// [`LambdaApi`] over the AWS SDK.
pub struct SdkLambdaApi {
    client: aws_sdk_lambda::Client,
}

impl SdkLambdaApi {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LambdaApi for SdkLambdaApi {
    async fn invoke(
        &self,
        function_name: &str,
        invocation_type: InvocationType,
        payload: Vec<u8>,
    ) -> Result<InvokeOutput, AwsError> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(invocation_type.into())
            .log_type(LogType::None)
            .set_payload(Some(payload.into()))
            .send()
            .await
            .map_err(|e| AwsError::service(DisplayErrorContext(&e)))?;

        let payload = output
            .payload()
            .map(|blob| RawPayload::Bytes(blob.as_ref().to_vec()));

        Ok(InvokeOutput {
            status_code: output.status_code(),
            function_error: output.function_error().map(String::from),
            payload,
        })
    }
}

/// Default connector creating SDK clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdkLambdaConnector;

#[async_trait]
impl LambdaConnector for SdkLambdaConnector {
    async fn connect(
        &self,
        connection: &AwsConnectionParams,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn LambdaApi>, AwsError> {
        let sdk_config = load_sdk_config(connection, connect_timeout).await;
        Ok(Arc::new(SdkLambdaApi::new(aws_sdk_lambda::Client::new(&sdk_config))))
    }
}
