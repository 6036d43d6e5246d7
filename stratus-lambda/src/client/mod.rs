//! Invocation clients for remote Lambda functions.

mod api;
mod commandable;
mod lambda;

pub use api::{
    InvocationType, InvokeOutput, LambdaApi, LambdaConnector, RawPayload, SdkLambdaApi,
    SdkLambdaConnector,
};
pub use commandable::CommandableLambdaClient;
pub use lambda::{DEFAULT_CONNECT_TIMEOUT, LambdaClient};
