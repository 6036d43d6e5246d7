// Stratus - serverless microservice toolkit for AWS
//
// Runs command-driven services as Lambda functions, calls them remotely and
// ships their logs and counters to CloudWatch.

// Re-export core functionality
pub use stratus_core::*;

pub use stratus_config;

// Re-export optional crates
#[cfg(feature = "aws")]
pub use stratus_aws;

#[cfg(feature = "lambda")]
pub use stratus_lambda;

#[cfg(feature = "cloudwatch")]
pub use stratus_cloudwatch;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ApplicationError,
        Command,
        CommandSet,
        Commandable,
        ConfigParams,
        Configurable,
        Counters,
        ErrorCategory,
        LogLevel,
        Openable,
        References,
        Referenceable,
    };

    #[cfg(feature = "aws")]
    pub use stratus_aws::{AwsConnectionParams, AwsConnectionResolver};

    #[cfg(feature = "lambda")]
    pub use stratus_lambda::{
        CommandableLambdaClient, CommandableLambdaFunction, LambdaClient, LambdaFunction,
        LambdaRuntime,
    };

    #[cfg(feature = "cloudwatch")]
    pub use stratus_cloudwatch::{CloudWatchCounters, CloudWatchLayer, CloudWatchLogger};
}
