// Component references

use crate::{ApplicationError, Result};
use std::any::Any;
use std::sync::Arc;

/// Reference name under which [`ContextInfo`] is stored.
pub const CONTEXT_INFO: &str = "context-info";

/// Information about the running container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfo {
    /// Container name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Unique id of this container instance.
    pub context_id: String,
}

impl ContextInfo {
    /// Create context info with a generated context id.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            context_id: crate::IdGenerator::next_long(),
        }
    }
}

/// Name-keyed registry of shared components.
///
/// Several components may share a name; lookups downcast each entry and skip
/// the ones of a different type.
#[derive(Clone, Default)]
pub struct References {
    entries: Vec<(String, Arc<dyn Any + Send + Sync>)>,
}

impl References {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under a name.
    pub fn put<T: Any + Send + Sync>(&mut self, name: impl Into<String>, component: T) {
        self.entries.push((name.into(), Arc::new(component)));
    }

    /// Add every entry of `other` after the existing ones.
    pub fn append(&mut self, other: &References) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Remove all components registered under a name.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Get the first component of type `T` registered under `name`.
    pub fn get_optional<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .find_map(|(_, c)| c.downcast_ref::<T>().cloned())
    }

    /// Get a required component, failing when it is missing.
    pub fn get_one_required<T: Any + Clone>(&self, name: &str) -> Result<T> {
        self.get_optional(name).ok_or_else(|| {
            ApplicationError::configuration(
                None,
                "REF_NOT_FOUND",
                format!("Required reference '{}' is not found", name),
            )
            .with_details("reference", name)
        })
    }

    /// Get all components of type `T`, regardless of name.
    pub fn get_all<T: Any + Clone>(&self) -> Vec<T> {
        self.entries
            .iter()
            .filter_map(|(_, c)| c.downcast_ref::<T>().cloned())
            .collect()
    }

    /// Get the container context info, if registered.
    pub fn context_info(&self) -> Option<ContextInfo> {
        self.get_optional::<ContextInfo>(CONTEXT_INFO)
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for References {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("References")
            .field(
                "names",
                &self.entries.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> String;
    }

    #[derive(Debug)]
    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_trait_object_lookup() {
        let mut refs = References::new();
        refs.put("greeter", Arc::new(English) as Arc<dyn Greeter>);

        let greeter: Arc<dyn Greeter> = refs.get_one_required("greeter").unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn test_missing_required_reference() {
        let refs = References::new();
        let err = refs.get_one_required::<Arc<dyn Greeter>>("controller").unwrap_err();

        assert_eq!(err.code, "REF_NOT_FOUND");
    }

    #[test]
    fn test_get_all_skips_other_types() {
        let mut refs = References::new();
        refs.put("a", 1u32);
        refs.put("b", "text".to_string());
        refs.put("c", 2u32);

        assert_eq!(refs.get_all::<u32>(), vec![1, 2]);
    }

    #[test]
    fn test_context_info() {
        let mut refs = References::new();
        refs.put(CONTEXT_INFO, ContextInfo::new("svc", None));

        let info = refs.context_info().unwrap();
        assert_eq!(info.name, "svc");
        assert_eq!(info.context_id.len(), 32);
    }
}
