//! Connection and credential records and their resolvers.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use stratus_core::{ApplicationError, ConfigParams, References, Result};
use tracing::debug;

/// Read one record from `<single>` or every record from `<plural>.*`.
fn sections_from_config(config: &ConfigParams, single: &str, plural: &str) -> Vec<ConfigParams> {
    let many = config.get_section(plural);
    if !many.is_empty() {
        return many
            .section_names()
            .iter()
            .map(|name| many.get_section(name))
            .filter(|section| !section.is_empty())
            .collect();
    }

    let one = config.get_section(single);
    if one.is_empty() { Vec::new() } else { vec![one] }
}

// ============================================================================
// Connection Parameters
// ============================================================================

/// Where a service lives: a static address or a discovery key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    params: ConfigParams,
}

impl ConnectionParams {
    pub fn new(params: ConfigParams) -> Self {
        Self { params }
    }

    /// Read the `connection` section or every `connections.*` section.
    pub fn many_from_config(config: &ConfigParams) -> Vec<Self> {
        sections_from_config(config, "connection", "connections")
            .into_iter()
            .map(Self::new)
            .collect()
    }

    /// Key to look the connection up in a discovery service.
    pub fn discovery_key(&self) -> Option<String> {
        self.params.get_as_nullable_string("discovery_key")
    }

    pub fn use_discovery(&self) -> bool {
        self.discovery_key().is_some()
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }
}

// ============================================================================
// Credential Parameters
// ============================================================================

/// Access credentials: static values or a credential store key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialParams {
    params: ConfigParams,
}

impl CredentialParams {
    pub fn new(params: ConfigParams) -> Self {
        Self { params }
    }

    /// Read the `credential` section or every `credentials.*` section.
    pub fn many_from_config(config: &ConfigParams) -> Vec<Self> {
        sections_from_config(config, "credential", "credentials")
            .into_iter()
            .map(Self::new)
            .collect()
    }

    /// Key to look the credential up in a credential store.
    pub fn store_key(&self) -> Option<String> {
        self.params.get_as_nullable_string("store_key")
    }

    pub fn use_store(&self) -> bool {
        self.store_key().is_some()
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }
}

impl std::fmt::Debug for CredentialParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialParams")
            .field("store_key", &self.store_key())
            .field("keys", &self.params.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Lookup Services
// ============================================================================

/// Service that resolves connection records by key.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve_one(
        &self,
        correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Option<ConnectionParams>>;
}

/// Service that stores credential records by key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn lookup(
        &self,
        correlation_id: Option<&str>,
        key: &str,
    ) -> Result<Option<CredentialParams>>;
}

fn cannot_resolve(correlation_id: Option<&str>, what: &str, key: &str) -> ApplicationError {
    ApplicationError::configuration(
        correlation_id,
        "CANNOT_RESOLVE",
        format!("{} '{}' requires a lookup service, but none is referenced", what, key),
    )
    .with_details("key", key)
}

// ============================================================================
// Resolvers
// ============================================================================

/// Picks a connection from configuration, consulting discovery services for
/// records that carry a `discovery_key`.
///
/// Discovery services are taken from references registered as
/// `Arc<dyn Discovery>`.
#[derive(Default)]
pub struct ConnectionResolver {
    connections: RwLock<Vec<ConnectionParams>>,
    discoveries: RwLock<Vec<Arc<dyn Discovery>>>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&self, config: &ConfigParams) {
        *self.connections.write() = ConnectionParams::many_from_config(config);
    }

    pub fn set_references(&self, references: &References) {
        *self.discoveries.write() = references.get_all::<Arc<dyn Discovery>>();
    }

    pub fn add(&self, connection: ConnectionParams) {
        self.connections.write().push(connection);
    }

    pub fn connections(&self) -> Vec<ConnectionParams> {
        self.connections.read().clone()
    }

    /// First static connection, or the first one discovery resolves.
    pub async fn resolve(&self, correlation_id: Option<&str>) -> Result<Option<ConnectionParams>> {
        let connections = self.connections();
        if connections.is_empty() {
            return Ok(None);
        }

        if let Some(connection) = connections.iter().find(|c| !c.use_discovery()) {
            return Ok(Some(connection.clone()));
        }

        let discoveries = self.discoveries.read().clone();
        for connection in &connections {
            let Some(key) = connection.discovery_key() else {
                continue;
            };
            if discoveries.is_empty() {
                return Err(cannot_resolve(correlation_id, "Connection", &key));
            }
            for discovery in &discoveries {
                if let Some(found) = discovery.resolve_one(correlation_id, &key).await? {
                    debug!(
                        correlation_id = correlation_id.unwrap_or("---"),
                        key = %key,
                        "Resolved connection through discovery"
                    );
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }
}

/// Picks credentials from configuration, consulting credential stores for
/// records that carry a `store_key`.
///
/// Stores are taken from references registered as `Arc<dyn CredentialStore>`.
#[derive(Default)]
pub struct CredentialResolver {
    credentials: RwLock<Vec<CredentialParams>>,
    stores: RwLock<Vec<Arc<dyn CredentialStore>>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&self, config: &ConfigParams) {
        *self.credentials.write() = CredentialParams::many_from_config(config);
    }

    pub fn set_references(&self, references: &References) {
        *self.stores.write() = references.get_all::<Arc<dyn CredentialStore>>();
    }

    pub fn add(&self, credential: CredentialParams) {
        self.credentials.write().push(credential);
    }

    /// First static credential, or the first one a store returns.
    pub async fn lookup(&self, correlation_id: Option<&str>) -> Result<Option<CredentialParams>> {
        let credentials = self.credentials.read().clone();
        if credentials.is_empty() {
            return Ok(None);
        }

        if let Some(credential) = credentials.iter().find(|c| !c.use_store()) {
            return Ok(Some(credential.clone()));
        }

        let stores = self.stores.read().clone();
        for credential in &credentials {
            let Some(key) = credential.store_key() else {
                continue;
            };
            if stores.is_empty() {
                return Err(cannot_resolve(correlation_id, "Credential", &key));
            }
            for store in &stores {
                if let Some(found) = store.lookup(correlation_id, &key).await? {
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticDiscovery;

    #[async_trait]
    impl Discovery for StaticDiscovery {
        async fn resolve_one(
            &self,
            _correlation_id: Option<&str>,
            key: &str,
        ) -> Result<Option<ConnectionParams>> {
            Ok((key == "q1").then(|| {
                ConnectionParams::new(ConfigParams::from_tuples(&[("region", "eu-west-1")]))
            }))
        }
    }

    #[test]
    fn test_many_from_config() {
        let config = ConfigParams::from_tuples(&[
            ("connections.a.region", "us-east-1"),
            ("connections.b.region", "us-west-2"),
            ("connection.region", "ignored"),
        ]);
        let connections = ConnectionParams::many_from_config(&config);
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[1].params().get("region"), Some("us-west-2"));

        let config = ConfigParams::from_tuples(&[("credential.access_id", "id")]);
        assert_eq!(CredentialParams::many_from_config(&config).len(), 1);

        let regions: Vec<String> = (0..12).map(|i| format!("region-{}", i)).collect();
        let mut config = ConfigParams::new();
        for (i, region) in regions.iter().enumerate() {
            config.put(format!("connections.{}.region", i), region.as_str());
        }
        let connections = ConnectionParams::many_from_config(&config);
        let found: Vec<&str> = connections
            .iter()
            .filter_map(|c| c.params().get("region"))
            .collect();
        assert_eq!(found, regions.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(CredentialParams::many_from_config(&ConfigParams::new()).is_empty());
    }

    #[tokio::test]
    async fn test_static_connection_wins() {
        let resolver = ConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[
            ("connections.a.discovery_key", "q1"),
            ("connections.b.region", "us-east-1"),
        ]));

        let connection = resolver.resolve(None).await.unwrap().unwrap();
        assert_eq!(connection.params().get("region"), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_discovery_lookup() {
        let resolver = ConnectionResolver::new();
        resolver.configure(&ConfigParams::from_tuples(&[("connection.discovery_key", "q1")]));

        let err = resolver.resolve(Some("c1")).await.unwrap_err();
        assert_eq!(err.code, "CANNOT_RESOLVE");

        let mut references = References::new();
        references.put("discovery", Arc::new(StaticDiscovery) as Arc<dyn Discovery>);
        resolver.set_references(&references);

        let connection = resolver.resolve(None).await.unwrap().unwrap();
        assert_eq!(connection.params().get("region"), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn test_credential_store_missing() {
        let resolver = CredentialResolver::new();
        assert!(resolver.lookup(None).await.unwrap().is_none());

        resolver.configure(&ConfigParams::from_tuples(&[("credential.store_key", "k")]));
        assert_eq!(resolver.lookup(None).await.unwrap_err().code, "CANNOT_RESOLVE");
    }
}
