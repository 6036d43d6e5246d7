//! Action-dispatch container.

mod commandable;
mod container;
mod registry;

pub use commandable::{CONTROLLER_REFERENCE, CommandableLambdaFunction};
pub use container::{ActionRegistrar, FunctionService, FunctionState, LambdaFunction};
pub use registry::{Action, ActionFuture, ActionRegistry};
