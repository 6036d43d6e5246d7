//! # Stratus AWS
//!
//! AWS connection handling shared by the Lambda and CloudWatch components.
//!
//! - [`AwsConnectionParams`] - ARN composition and decomposition
//! - [`ConnectionResolver`] / [`CredentialResolver`] - configured or looked-up records
//! - [`AwsConnectionResolver`] - validated connection for one component
//! - [`load_sdk_config`] - SDK configuration with static credentials
//!
//! ## Configuration
//!
//! ```yaml
//! connection:
//!   arn: arn:aws:lambda:us-east-1:123456789012:function:orders
//! credential:
//!   access_id: AKIA...
//!   access_key: ...
//! ```
//!
//! ## Example
//!
//! ```
//! use stratus_aws::AwsConnectionResolver;
//! use stratus_core::{ConfigParams, Configurable};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let resolver = AwsConnectionResolver::new();
//! resolver.configure(&ConfigParams::from_tuples(&[
//!     ("connection.service", "s3"),
//!     ("connection.region", "us-east-1"),
//!     ("connection.account", "123"),
//!     ("connection.resource", "mybucket"),
//!     ("credential.access_id", "id"),
//!     ("credential.access_key", "key"),
//! ]));
//!
//! let connection = resolver.resolve(None).await.unwrap();
//! assert_eq!(connection.arn(), "arn:aws:s3:us-east-1:123:mybucket");
//! # });
//! ```

pub mod connect;
mod error;
mod sdk;

pub use connect::{
    AwsConnectionParams, AwsConnectionResolver, ConnectionParams, ConnectionResolver,
    CredentialParams, CredentialResolver, CredentialStore, DEFAULT_PARTITION, Discovery, EMPTY_ARN,
};
pub use error::{AwsError, Result};
pub use sdk::load_sdk_config;
