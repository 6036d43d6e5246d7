//! Integration tests for AWS connection resolution.

use std::sync::Arc;

use async_trait::async_trait;
use stratus_aws::{
    AwsConnectionParams, AwsConnectionResolver, CredentialParams, CredentialStore,
};
use stratus_core::{ConfigParams, Configurable, References, Referenceable, Result};

struct VaultStore;

#[async_trait]
impl CredentialStore for VaultStore {
    async fn lookup(
        &self,
        _correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Option<CredentialParams>> {
        if key != "orders" {
            return Ok(None);
        }
        Ok(Some(CredentialParams::new(ConfigParams::from_tuples(&[
            ("access_id", "vault-id"),
            ("access_key", "vault-key"),
        ]))))
    }
}

#[test]
fn test_arn_round_trip_with_six_tokens() {
    let arn = "arn:aws:sqs:us-east-1:123:queue/orders";

    let mut params = AwsConnectionParams::new();
    params.set_arn(arn).unwrap();
    assert_eq!(params.arn(), arn);

    // Recompose from the discrete fields alone
    let rebuilt = AwsConnectionParams::from_params(ConfigParams::from_tuples(&[
        ("service", "sqs"),
        ("region", "us-east-1"),
        ("account", "123"),
        ("resource_type", "queue"),
        ("resource", "orders"),
    ]));
    assert_eq!(rebuilt.arn(), "arn:aws:sqs:us-east-1:123:queue:orders");
}

#[test]
fn test_merge_configs_later_wins() {
    let defaults = ConfigParams::from_tuples(&[("region", "us-east-1"), ("account", "1")]);
    let overrides = ConfigParams::from_tuples(&[("region", "eu-west-1")]);

    let merged = AwsConnectionParams::merge_configs(&[&defaults, &overrides]);
    assert_eq!(merged.region().as_deref(), Some("eu-west-1"));
    assert_eq!(merged.account().as_deref(), Some("1"));
}

#[tokio::test]
async fn test_resolve_credentials_from_store() {
    let resolver = AwsConnectionResolver::new();
    resolver.configure(&ConfigParams::from_tuples(&[
        ("connection.arn", "arn:aws:lambda:us-east-1:123:function:orders"),
        ("credential.store_key", "orders"),
    ]));

    let mut references = References::new();
    references.put("vault", Arc::new(VaultStore) as Arc<dyn CredentialStore>);
    resolver.set_references(&references).unwrap();

    let connection = resolver.resolve(Some("it-1")).await.unwrap();
    assert_eq!(connection.access_id().as_deref(), Some("vault-id"));
    assert_eq!(connection.resource_type().as_deref(), Some("function"));
}

#[tokio::test]
async fn test_resolve_empty_config() {
    let resolver = AwsConnectionResolver::new();
    resolver.configure(&ConfigParams::new());

    let err = resolver.resolve(None).await.unwrap_err();
    assert_eq!(err.code, "NO_AWS_CONNECTION");
}
