//! Resolution of complete AWS connection parameters.

use crate::connect::{AwsConnectionParams, ConnectionResolver, CredentialResolver};
use stratus_core::{ConfigParams, Configurable, References, Referenceable, Result};

/// Combines a connection and a credential into validated
/// [`AwsConnectionParams`].
///
/// Resolution runs connection lookup, then credential lookup, then
/// normalizes the ARN and validates. Any failure short-circuits; no
/// partially resolved parameters are returned.
#[derive(Default)]
pub struct AwsConnectionResolver {
    connection_resolver: ConnectionResolver,
    credential_resolver: CredentialResolver,
}

impl AwsConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_resolver(&self) -> &ConnectionResolver {
        &self.connection_resolver
    }

    pub fn credential_resolver(&self) -> &CredentialResolver {
        &self.credential_resolver
    }

    /// Resolve and validate connection parameters.
    pub async fn resolve(&self, correlation_id: Option<&str>) -> Result<AwsConnectionParams> {
        let mut connection = AwsConnectionParams::new();

        if let Some(resolved) = self.connection_resolver.resolve(correlation_id).await? {
            connection.append(resolved.params());
        }

        if let Some(credential) = self.credential_resolver.lookup(correlation_id).await? {
            connection.append(credential.params());
        }

        // Normalize the literal and discrete ARN fields
        let arn = connection.arn();
        connection.set_arn(&arn).map_err(|e| e.with_correlation_id(correlation_id))?;

        connection.validate(correlation_id)?;
        Ok(connection)
    }
}

impl Configurable for AwsConnectionResolver {
    fn configure(&self, config: &ConfigParams) {
        self.connection_resolver.configure(config);
        self.credential_resolver.configure(config);
    }
}

impl Referenceable for AwsConnectionResolver {
    fn set_references(&self, references: &References) -> Result<()> {
        self.connection_resolver.set_references(references);
        self.credential_resolver.set_references(references);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_from_arn() {
        let resolver = AwsConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[
            ("connection.arn", "arn:aws:lambda:us-east-1:123456789:function:myFn"),
            ("credential.access_id", "id"),
            ("credential.access_key", "key"),
        ]));

        let connection = resolver.resolve(Some("c1")).await.unwrap();
        assert_eq!(connection.resource().as_deref(), Some("myFn"));
        assert_eq!(connection.region().as_deref(), Some("us-east-1"));
        assert_eq!(connection.access_id().as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn test_resolve_from_fields() {
        let resolver = AwsConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[
            ("connection.service", "s3"),
            ("connection.region", "us-east-1"),
            ("connection.account", "123"),
            ("connection.resource", "mybucket"),
            ("credential.access_id", "id"),
            ("credential.access_key", "key"),
        ]));

        let connection = resolver.resolve(None).await.unwrap();
        assert_eq!(connection.arn(), "arn:aws:s3:us-east-1:123:mybucket");
    }

    #[tokio::test]
    async fn test_resolve_without_connection() {
        let resolver = AwsConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[
            ("credential.access_id", "id"),
            ("credential.access_key", "key"),
        ]));

        let err = resolver.resolve(Some("c2")).await.unwrap_err();
        assert_eq!(err.code, "NO_AWS_CONNECTION");
        assert_eq!(err.correlation_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_resolve_without_credentials() {
        let resolver = AwsConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[(
            "connection.arn",
            "arn:aws:lambda:us-east-1:1:function:f",
        )]));

        assert_eq!(resolver.resolve(None).await.unwrap_err().code, "NO_ACCESS_ID");
    }
}
