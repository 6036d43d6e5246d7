//! Component lifecycle traits.
//!
//! Components are configured from [`ConfigParams`], wired to each other
//! through [`References`] and then opened. Closing must be safe to repeat.

use crate::{ConfigParams, References, Result};
use async_trait::async_trait;

/// A component that reads its settings from configuration.
pub trait Configurable: Send + Sync {
    /// Apply configuration.
    fn configure(&self, config: &ConfigParams);
}

/// A component that locates its dependencies in a reference registry.
pub trait Referenceable: Send + Sync {
    /// Attach references.
    fn set_references(&self, references: &References) -> Result<()>;
}

/// A component with an open/close lifecycle.
#[async_trait]
pub trait Openable: Send + Sync {
    /// Check if the component is open.
    fn is_open(&self) -> bool;

    /// Open the component. Opening an open component is a no-op.
    async fn open(&self, correlation_id: Option<&str>) -> Result<()>;

    /// Close the component. Closing a closed component is a no-op.
    async fn close(&self, correlation_id: Option<&str>) -> Result<()>;
}

/// A full component managed by a container.
pub trait Component: Configurable + Referenceable + Openable {}

impl<T: Configurable + Referenceable + Openable> Component for T {}
