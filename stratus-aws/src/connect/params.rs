//! AWS connection parameters and ARN composition.

use crate::connect::{ConnectionParams, CredentialParams};
use std::fmt;
use stratus_core::{ApplicationError, ConfigParams, Result};

/// The ARN composed from a parameter set with no resource information.
pub const EMPTY_ARN: &str = "arn:aws::::";

/// Default ARN partition.
pub const DEFAULT_PARTITION: &str = "aws";

/// Minimum number of `:`-separated tokens in an ARN.
const MIN_ARN_TOKENS: usize = 6;

/// Address of one AWS resource plus the credentials to reach it.
///
/// Values are kept in a flat parameter map so connection and credential
/// records from any source can be merged into one set. The literal `arn`, when
/// present, wins over the discrete fields; [`set_arn`](Self::set_arn) keeps
/// both in sync.
///
/// ```
/// use stratus_aws::AwsConnectionParams;
///
/// let mut connection = AwsConnectionParams::new();
/// connection.set_arn("arn:aws:lambda:us-east-1:123456789:function:myFn").unwrap();
///
/// assert_eq!(connection.resource_type().as_deref(), Some("function"));
/// assert_eq!(connection.resource().as_deref(), Some("myFn"));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AwsConnectionParams {
    params: ConfigParams,
}

impl AwsConnectionParams {
    /// Create empty connection parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing parameters.
    pub fn from_params(params: ConfigParams) -> Self {
        Self { params }
    }

    /// Parse a `key1=value1;key2=value2` string.
    pub fn from_string(line: &str) -> Self {
        Self::from_params(ConfigParams::from_string(line))
    }

    /// Build from a component configuration: every credential section, then
    /// every connection section, later entries overriding earlier ones.
    pub fn from_config(config: &ConfigParams) -> Self {
        let mut result = Self::new();

        for credential in CredentialParams::many_from_config(config) {
            result.append(credential.params());
        }
        for connection in ConnectionParams::many_from_config(config) {
            result.append(connection.params());
        }

        result
    }

    /// Merge parameter sets in order; later sets override earlier ones.
    pub fn merge_configs(configs: &[&ConfigParams]) -> Self {
        Self::from_params(ConfigParams::merge_configs(configs))
    }

    /// Copy all values from `params`, overriding existing keys.
    pub fn append(&mut self, params: &ConfigParams) {
        self.params.append(params);
    }

    /// Underlying parameters.
    pub fn params(&self) -> &ConfigParams {
        &self.params
    }

    fn get(&self, key: &str) -> Option<String> {
        self.params.get_as_nullable_string(key)
    }

    /// ARN partition, `aws` unless set.
    pub fn partition(&self) -> String {
        self.get("partition")
            .unwrap_or_else(|| DEFAULT_PARTITION.to_string())
    }

    pub fn set_partition(&mut self, value: impl Into<String>) {
        self.params.put("partition", value);
    }

    /// Service name, falling back to the legacy `protocol` key.
    pub fn service(&self) -> Option<String> {
        self.get("service").or_else(|| self.get("protocol"))
    }

    pub fn set_service(&mut self, value: impl Into<String>) {
        self.params.put("service", value);
    }

    pub fn region(&self) -> Option<String> {
        self.get("region")
    }

    pub fn set_region(&mut self, value: impl Into<String>) {
        self.params.put("region", value);
    }

    pub fn account(&self) -> Option<String> {
        self.get("account")
    }

    pub fn set_account(&mut self, value: impl Into<String>) {
        self.params.put("account", value);
    }

    pub fn resource_type(&self) -> Option<String> {
        self.get("resource_type")
    }

    pub fn set_resource_type(&mut self, value: impl Into<String>) {
        self.params.put("resource_type", value);
    }

    /// Remove the resource type.
    pub fn clear_resource_type(&mut self) {
        self.params.remove("resource_type");
    }

    pub fn resource(&self) -> Option<String> {
        self.get("resource")
    }

    pub fn set_resource(&mut self, value: impl Into<String>) {
        self.params.put("resource", value);
    }

    /// Access id, falling back to the legacy `client_id` key.
    pub fn access_id(&self) -> Option<String> {
        self.get("access_id").or_else(|| self.get("client_id"))
    }

    pub fn set_access_id(&mut self, value: impl Into<String>) {
        self.params.put("access_id", value);
    }

    /// Access key, falling back to the legacy `client_key` key.
    pub fn access_key(&self) -> Option<String> {
        self.get("access_key").or_else(|| self.get("client_key"))
    }

    pub fn set_access_key(&mut self, value: impl Into<String>) {
        self.params.put("access_key", value);
    }

    /// The literal ARN if one is stored, otherwise the ARN composed as
    /// `arn:<partition>:<service>:<region>:<account>[:<resource_type>]:<resource>`
    /// with missing fields left empty.
    pub fn arn(&self) -> String {
        if let Some(arn) = self.get("arn") {
            return arn;
        }

        let mut arn = format!(
            "arn:{}:{}:{}:{}",
            self.partition(),
            self.service().unwrap_or_default(),
            self.region().unwrap_or_default(),
            self.account().unwrap_or_default(),
        );
        if let Some(resource_type) = self.resource_type() {
            arn.push(':');
            arn.push_str(&resource_type);
        }
        arn.push(':');
        arn.push_str(&self.resource().unwrap_or_default());

        arn
    }

    /// Store a literal ARN and decompose it into the discrete fields.
    ///
    /// With seven or more tokens the sixth is the resource type and the
    /// seventh the resource. With exactly six, the sixth token is split on
    /// its first `/` into type and resource, or taken whole as the resource.
    /// Shorter ARNs are rejected with `INVALID_ARN` and leave the parameters
    /// untouched.
    pub fn set_arn(&mut self, value: &str) -> Result<()> {
        let tokens: Vec<&str> = value.split(':').collect();
        if tokens.len() < MIN_ARN_TOKENS {
            return Err(ApplicationError::configuration(
                None,
                "INVALID_ARN",
                format!("ARN '{}' must have at least {} segments", value, MIN_ARN_TOKENS),
            )
            .with_details("arn", value));
        }

        self.params.put("arn", value);
        self.set_partition(tokens[1]);
        self.set_service(tokens[2]);
        self.set_region(tokens[3]);
        self.set_account(tokens[4]);

        if tokens.len() > MIN_ARN_TOKENS {
            self.set_resource_type(tokens[5]);
            self.set_resource(tokens[6]);
        } else {
            match tokens[5].find('/') {
                Some(pos) if pos > 0 => {
                    self.set_resource_type(&tokens[5][..pos]);
                    self.set_resource(&tokens[5][pos + 1..]);
                }
                _ => {
                    self.clear_resource_type();
                    self.set_resource(tokens[5]);
                }
            }
        }

        Ok(())
    }

    /// Check that a resource and credentials are present.
    pub fn validate(&self, correlation_id: Option<&str>) -> Result<()> {
        if self.arn() == EMPTY_ARN {
            return Err(ApplicationError::configuration(
                correlation_id,
                "NO_AWS_CONNECTION",
                "AWS connection is not set",
            ));
        }

        if self.access_id().is_none() {
            return Err(ApplicationError::configuration(
                correlation_id,
                "NO_ACCESS_ID",
                "No access_id is configured in AWS credential",
            ));
        }

        if self.access_key().is_none() {
            return Err(ApplicationError::configuration(
                correlation_id,
                "NO_ACCESS_KEY",
                "No access_key is configured in AWS credential",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for AwsConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConnectionParams")
            .field("arn", &self.arn())
            .field("access_id", &self.access_id())
            .field("access_key", &self.access_key().map(|_| "***"))
            .finish()
    }
}
