//! Connection, credential and ARN handling.

mod connection;
mod params;
mod resolver;

pub use connection::{
    ConnectionParams, ConnectionResolver, CredentialParams, CredentialResolver, CredentialStore,
    Discovery,
};
pub use params::{AwsConnectionParams, DEFAULT_PARTITION, EMPTY_ARN};
pub use resolver::AwsConnectionResolver;
