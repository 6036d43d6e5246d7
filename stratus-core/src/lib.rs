//! # Stratus Core
//!
//! Building blocks shared by every Stratus component:
//!
//! - [`ApplicationError`] - structured, serializable errors
//! - [`ConfigParams`] - flat dotted-key configuration
//! - [`References`] - name-keyed component registry
//! - [`Configurable`], [`Referenceable`], [`Openable`] - component lifecycle
//! - [`Command`], [`CommandSet`], [`Commandable`] - controller operations
//! - [`Schema`], [`ObjectSchema`] - parameter validation
//! - [`CachedCounters`], [`CompositeCounters`], [`Timing`] - measurements
//! - [`CachedLogger`], [`LogMessage`] - buffered log records
//!
//! ## Example
//!
//! ```
//! use stratus_core::{Command, CommandSet};
//! use serde_json::json;
//!
//! let commands = CommandSet::new().with_command(Command::new(
//!     "ping",
//!     None,
//!     |_correlation_id, _args| async move { Ok(json!("pong")) },
//! ));
//! assert_eq!(commands.len(), 1);
//! ```

pub mod commands;
pub mod config;
pub mod count;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod log;
pub mod refer;
pub mod schema;

pub use commands::{Command, CommandFuture, CommandSet, Commandable};
pub use config::ConfigParams;
pub use count::{CachedCounters, CompositeCounters, Counter, CounterType, Counters, Timing};
pub use error::{ApplicationError, ErrorCategory, Result};
pub use id::IdGenerator;
pub use lifecycle::{Component, Configurable, Openable, Referenceable};
pub use log::{CachedLogger, ErrorDescription, LogLevel, LogMessage};
pub use refer::{CONTEXT_INFO, ContextInfo, References};
pub use schema::{ObjectSchema, Schema, TypeCode, ValidationResult};
