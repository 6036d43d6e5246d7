//! Client invoking remote Lambda functions.

use crate::client::api::{
    InvocationType, InvokeOutput, LambdaApi, LambdaConnector, RawPayload, SdkLambdaConnector,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use stratus_aws::{AwsConnectionParams, AwsConnectionResolver};
use stratus_core::{
    ApplicationError, CompositeCounters, ConfigParams, Configurable, IdGenerator, Openable,
    References, Referenceable, Result, Timing,
};
use tracing::{debug, error};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

struct Connected {
    connection: AwsConnectionParams,
    api: Arc<dyn LambdaApi>,
}

/// Calls a remote Lambda function with `{ cmd, correlation_id, ...args }`
/// events.
///
/// The function is the resource of the resolved AWS connection. Configuration:
///
/// | key | meaning |
/// |-----|---------|
/// | `connection.*` / `credential.*` | see [`AwsConnectionResolver`] |
/// | `options.connect_timeout` | connect timeout in ms, default 10000 |
pub struct LambdaClient {
    connector: Arc<dyn LambdaConnector>,
    resolver: AwsConnectionResolver,
    counters: Arc<CompositeCounters>,
    connect_timeout: RwLock<Duration>,
    connected: RwLock<Option<Arc<Connected>>>,
    open_lock: tokio::sync::Mutex<()>,
}

impl Default for LambdaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LambdaClient {
    /// Create a client using the AWS SDK.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(SdkLambdaConnector))
    }

    /// Create a client with a custom transport.
    pub fn with_connector(connector: Arc<dyn LambdaConnector>) -> Self {
        Self {
            connector,
            resolver: AwsConnectionResolver::new(),
            counters: Arc::new(CompositeCounters::new()),
            connect_timeout: RwLock::new(DEFAULT_CONNECT_TIMEOUT),
            connected: RwLock::new(None),
            open_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        *self.connect_timeout.read()
    }

    /// Resolved connection, when open.
    pub fn connection(&self) -> Option<AwsConnectionParams> {
        self.connected.read().as_ref().map(|c| c.connection.clone())
    }

    /// Start a timing span named `<name>.exec_time`.
    pub fn instrument(&self, correlation_id: Option<&str>, name: &str) -> Timing {
        self.counters.instrument(correlation_id, name)
    }

    /// Invoke the remote function.
    ///
    /// `args` must be a JSON object or null; `cmd` and `correlation_id` are
    /// added to a copy of it. A missing correlation id is generated.
    pub async fn invoke(
        &self,
        invocation_type: InvocationType,
        cmd: Option<&str>,
        correlation_id: Option<&str>,
        args: Value,
    ) -> Result<Value> {
        let Some(cmd) = cmd else {
            let err = ApplicationError::unknown(correlation_id, "NO_COMMAND", "Missing command");
            error!(
                correlation_id = correlation_id.unwrap_or("---"),
                error = %err,
                "Failed to call a lambda function without a command"
            );
            return Err(err);
        };

        let connected = self.connected.read().clone().ok_or_else(|| {
            ApplicationError::invalid_state(
                correlation_id,
                "NOT_OPENED",
                "Lambda client is not opened",
            )
        })?;

        let mut event = match args {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ApplicationError::unknown(
                    correlation_id,
                    "INVALID_ARGS",
                    format!("Invocation arguments must be an object, got {}", other),
                ));
            }
        };
        let correlation_id = correlation_id
            .map(String::from)
            .unwrap_or_else(IdGenerator::next_short);
        event.insert("cmd".to_string(), Value::from(cmd));
        event.insert("correlation_id".to_string(), Value::from(correlation_id.clone()));

        let payload = serde_json::to_vec(&Value::Object(event)).map_err(|e| {
            ApplicationError::invocation(
                Some(&correlation_id),
                "CALL_FAILED",
                "Failed to serialize invocation event",
            )
            .with_cause(e)
        })?;

        let function_name = connected.connection.arn();
        debug!(
            correlation_id = %correlation_id,
            function = %function_name,
            cmd = %cmd,
            invocation_type = invocation_type.as_str(),
            "Invoking lambda function"
        );

        let output = connected
            .api
            .invoke(&function_name, invocation_type, payload)
            .await
            .map_err(|e| {
                ApplicationError::invocation(
                    Some(&correlation_id),
                    "CALL_FAILED",
                    "Failed to invoke lambda function",
                )
                .with_cause(e)
            })?;

        decode_output(&correlation_id, output)
    }

    /// Invoke and wait for the result.
    pub async fn call(&self, cmd: &str, correlation_id: Option<&str>, args: Value) -> Result<Value> {
        self.invoke(InvocationType::RequestResponse, Some(cmd), correlation_id, args)
            .await
    }

    /// Invoke without waiting for the function to run. Failures are logged
    /// and returned.
    pub async fn call_one_way(
        &self,
        cmd: &str,
        correlation_id: Option<&str>,
        args: Value,
    ) -> Result<()> {
        match self
            .invoke(InvocationType::Event, Some(cmd), correlation_id, args)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(
                    correlation_id = correlation_id.unwrap_or("---"),
                    cmd = %cmd,
                    error = %err,
                    "Failed to invoke lambda function"
                );
                Err(err)
            }
        }
    }
}

fn decode_output(correlation_id: &str, output: InvokeOutput) -> Result<Value> {
    if let Some(function_error) = output.function_error {
        let mut err = ApplicationError::invocation(
            Some(correlation_id),
            "CALL_FAILED",
            "Lambda function returned an error",
        )
        .with_details("function_error", function_error);

        let text = match &output.payload {
            Some(RawPayload::Text(text)) => Some(text.as_str()),
            Some(RawPayload::Bytes(bytes)) => std::str::from_utf8(bytes).ok(),
            _ => None,
        };
        if let Some(text) = text {
            let detail = serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::from(text));
            err = err.with_details("payload", detail);
        }
        return Err(err);
    }

    match output.payload {
        None => Ok(Value::Null),
        Some(RawPayload::Json(value)) => Ok(value),
        Some(RawPayload::Text(text)) => parse_text(correlation_id, &text),
        Some(RawPayload::Bytes(bytes)) => {
            let text =
                String::from_utf8(bytes).map_err(|e| deserialization_failed(correlation_id, e))?;
            parse_text(correlation_id, &text)
        }
    }
}

fn parse_text(correlation_id: &str, text: &str) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| deserialization_failed(correlation_id, e))
}

fn deserialization_failed(correlation_id: &str, cause: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::invocation(
        Some(correlation_id),
        "DESERIALIZATION_FAILED",
        "Failed to deserialize result",
    )
    .with_cause(cause)
}

impl Configurable for LambdaClient {
    fn configure(&self, config: &ConfigParams) {
        self.resolver.configure(config);
        let timeout =
            config.get_as_duration_with_default("options.connect_timeout", self.connect_timeout());
        *self.connect_timeout.write() = timeout;
    }
}

impl Referenceable for LambdaClient {
    fn set_references(&self, references: &References) -> Result<()> {
        self.counters.set_references(references);
        self.resolver.set_references(references)
    }
}

#[async_trait]
impl Openable for LambdaClient {
    fn is_open(&self) -> bool {
        self.connected.read().is_some()
    }

    async fn open(&self, correlation_id: Option<&str>) -> Result<()> {
        let _guard = self.open_lock.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let connection = self.resolver.resolve(correlation_id).await?;
        let api = self
            .connector
            .connect(&connection, self.connect_timeout())
            .await
            .map_err(|e| ApplicationError::from(e).with_correlation_id(correlation_id))?;

        debug!(
            correlation_id = correlation_id.unwrap_or("---"),
            arn = %connection.arn(),
            "Lambda client connected"
        );

        *self.connected.write() = Some(Arc::new(Connected { connection, api }));
        Ok(())
    }

    async fn close(&self, _correlation_id: Option<&str>) -> Result<()> {
        *self.connected.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratus_aws::AwsError;

    struct FixedApi(InvokeOutput);

    #[async_trait]
    impl LambdaApi for FixedApi {
        async fn invoke(
            &self,
            _function_name: &str,
            _invocation_type: InvocationType,
            _payload: Vec<u8>,
        ) -> std::result::Result<InvokeOutput, AwsError> {
            Ok(self.0.clone())
        }
    }

    struct FixedConnector(InvokeOutput);

    #[async_trait]
    impl LambdaConnector for FixedConnector {
        async fn connect(
            &self,
            _connection: &AwsConnectionParams,
            _connect_timeout: Duration,
        ) -> std::result::Result<Arc<dyn LambdaApi>, AwsError> {
            Ok(Arc::new(FixedApi(self.0.clone())))
        }
    }

    async fn open_client(output: InvokeOutput) -> LambdaClient {
        let client = LambdaClient::with_connector(Arc::new(FixedConnector(output)));
        client.configure(&ConfigParams::from_tuples(&[
            ("connection.arn", "arn:aws:lambda:us-east-1:123:function:fn"),
            ("credential.access_id", "id"),
            ("credential.access_key", "key"),
            ("options.connect_timeout", "2500"),
        ]));
        client.open(None).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_not_opened() {
        let client = LambdaClient::new();
        let err = client.call("get", Some("c1"), json!({})).await.unwrap_err();

        assert_eq!(err.code, "NOT_OPENED");
        assert_eq!(client.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_missing_command() {
        let client = open_client(InvokeOutput::default()).await;
        let err = client
            .invoke(InvocationType::RequestResponse, None, None, json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.code, "NO_COMMAND");
        assert_eq!(client.connect_timeout(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_bad_payload() {
        let client = open_client(InvokeOutput {
            status_code: 200,
            function_error: None,
            payload: Some(RawPayload::Text("not json".to_string())),
        })
        .await;

        let err = client.call("get", Some("c1"), Value::Null).await.unwrap_err();
        assert_eq!(err.code, "DESERIALIZATION_FAILED");
        assert_eq!(err.correlation_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_payload() {
        let client = open_client(InvokeOutput {
            status_code: 200,
            function_error: None,
            payload: Some(RawPayload::Bytes(vec![b'"', 0xff, 0xfe, b'"'])),
        })
        .await;

        let err = client.call("get", Some("c1"), Value::Null).await.unwrap_err();
        assert_eq!(err.code, "DESERIALIZATION_FAILED");
    }

    #[tokio::test]
    async fn test_byte_payload() {
        let client = open_client(InvokeOutput {
            status_code: 200,
            function_error: None,
            payload: Some(RawPayload::Bytes(br#"{"id":"7"}"#.to_vec())),
        })
        .await;

        let result = client.call("get", Some("c1"), Value::Null).await.unwrap();
        assert_eq!(result, json!({ "id": "7" }));
    }

    #[tokio::test]
    async fn test_structured_payload_passes_through() {
        let client = open_client(InvokeOutput {
            status_code: 200,
            function_error: None,
            payload: Some(RawPayload::Json(json!([1, 2]))),
        })
        .await;

        assert_eq!(client.call("get", None, json!({})).await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_function_error() {
        let client = open_client(InvokeOutput {
            status_code: 200,
            function_error: Some("Unhandled".to_string()),
            payload: Some(RawPayload::Text(r#"{"errorMessage":"boom"}"#.to_string())),
        })
        .await;

        let err = client.call("get", None, json!({})).await.unwrap_err();
        assert_eq!(err.code, "CALL_FAILED");
        assert_eq!(err.detail("function_error"), Some(&json!("Unhandled")));
        assert_eq!(err.detail("payload"), Some(&json!({ "errorMessage": "boom" })));
    }

    #[tokio::test]
    async fn test_invalid_args_and_close() {
        let client = open_client(InvokeOutput::default()).await;
        let err = client.call("get", None, json!([1])).await.unwrap_err();
        assert_eq!(err.code, "INVALID_ARGS");

        client.close(None).await.unwrap();
        client.close(None).await.unwrap();
        assert!(!client.is_open());
        assert!(client.connection().is_none());
    }
}
