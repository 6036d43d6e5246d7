//! AWS SDK configuration from resolved connection parameters.

use crate::connect::AwsConnectionParams;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_types::SdkConfig;
use std::time::Duration;
use tracing::debug;

/// Credential provider name reported to the SDK.
const PROVIDER_NAME: &str = "stratus";

/// Build an SDK configuration with static credentials, the connection region
/// and a connect timeout.
pub async fn load_sdk_config(connection: &AwsConnectionParams, connect_timeout: Duration) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = connection.region() {
        loader = loader.region(Region::new(region));
    }

    if let (Some(access_id), Some(access_key)) = (connection.access_id(), connection.access_key()) {
        let credentials = Credentials::new(access_id, access_key, None, None, PROVIDER_NAME);
        loader = loader.credentials_provider(credentials);
    }

    loader = loader.timeout_config(
        TimeoutConfig::builder()
            .connect_timeout(connect_timeout)
            .build(),
    );

    debug!(
        region = ?connection.region(),
        connect_timeout_ms = connect_timeout.as_millis() as u64,
        "AWS SDK configuration loaded"
    );

    loader.load().await
}
