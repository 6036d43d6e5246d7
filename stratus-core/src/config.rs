//! Flat key/value configuration parameters.
//!
//! Keys are dotted paths (`connection.region`, `options.connect_timeout`),
//! values are strings. Nested JSON documents are flattened on construction.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Flat, ordered configuration map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigParams {
    values: BTreeMap<String, String>,
}

impl ConfigParams {
    /// Create empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from key/value pairs.
    ///
    /// ```
    /// use stratus_core::ConfigParams;
    ///
    /// let config = ConfigParams::from_tuples(&[
    ///     ("connection.region", "us-east-1"),
    ///     ("credential.access_id", "XXX"),
    /// ]);
    /// assert_eq!(config.get("connection.region"), Some("us-east-1"));
    /// ```
    pub fn from_tuples(tuples: &[(&str, &str)]) -> Self {
        let mut result = Self::new();
        for (key, value) in tuples {
            result.put(*key, *value);
        }
        result
    }

    /// Create from a JSON value, flattening nested objects and arrays.
    pub fn from_value(value: &Value) -> Self {
        let mut result = Self::new();
        flatten_into(&mut result.values, "", value);
        result
    }

    /// Parse a `key1=value1;key2=value2` string.
    pub fn from_string(line: &str) -> Self {
        let mut result = Self::new();
        for pair in line.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) => result.put(key.trim(), value.trim()),
                None => result.put(pair, ""),
            }
        }
        result
    }

    /// Merge several parameter sets; later sets override earlier ones.
    pub fn merge_configs(configs: &[&ConfigParams]) -> Self {
        let mut result = Self::new();
        for config in configs {
            result.append(config);
        }
        result
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a value, treating empty strings as absent.
    pub fn get_as_nullable_string(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).map(String::from)
    }

    /// Get a string value with a default.
    pub fn get_as_string_with_default(&self, key: &str, default: &str) -> String {
        self.get_as_nullable_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get an integer value.
    pub fn get_as_nullable_integer(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?.trim();
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))
    }

    /// Get an integer value with a default.
    pub fn get_as_integer_with_default(&self, key: &str, default: i64) -> i64 {
        self.get_as_nullable_integer(key).unwrap_or(default)
    }

    /// Get a boolean value with a default.
    pub fn get_as_boolean_with_default(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => true,
            Some(v) if v == "false" || v == "0" || v == "no" => false,
            _ => default,
        }
    }

    /// Get a millisecond value as a duration, with a default.
    pub fn get_as_duration_with_default(&self, key: &str, default: Duration) -> Duration {
        self.get_as_nullable_integer(key)
            .filter(|ms| *ms >= 0)
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(default)
    }

    /// Set a value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy all entries from `other`, overriding existing keys.
    pub fn append(&mut self, other: &ConfigParams) {
        for (key, value) in other.iter() {
            self.put(key, value);
        }
    }

    /// Get the entries under `section.` with the prefix stripped.
    pub fn get_section(&self, section: &str) -> ConfigParams {
        let prefix = format!("{}.", section);
        let mut result = ConfigParams::new();
        for (key, value) in self.iter() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                result.put(rest, value);
            }
        }
        result
    }

    /// Get distinct first-level section names.
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for key in self.values.keys() {
            if let Some((name, _)) = key.split_once('.') {
                names.push(name.to_string());
            }
        }
        // keys are sorted, so equal prefixes are adjacent
        names.dedup();

        // list sections flatten to `0`, `1`, ... and must keep list order
        let indexes: Option<Vec<usize>> = names.iter().map(|n| n.parse().ok()).collect();
        if let Some(indexes) = indexes {
            let mut ordered: Vec<(usize, String)> = indexes.into_iter().zip(names).collect();
            ordered.sort_by_key(|(index, _)| *index);
            names = ordered.into_iter().map(|(_, name)| name).collect();
        }
        names
    }

    /// Add all entries of `params` under `section.`.
    pub fn add_section(&mut self, section: &str, params: &ConfigParams) {
        for (key, value) in params.iter() {
            self.put(format!("{}.{}", section, key), value);
        }
    }
}

impl fmt::Display for ConfigParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl From<BTreeMap<String, String>> for ConfigParams {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

fn flatten_into(target: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    let key_for = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };

    match value {
        Value::Object(map) => {
            for (name, nested) in map {
                flatten_into(target, &key_for(name), nested);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(target, &key_for(&index.to_string()), nested);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            if !prefix.is_empty() {
                target.insert(prefix.to_string(), s.clone());
            }
        }
        other => {
            if !prefix.is_empty() {
                target.insert(prefix.to_string(), other.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_flattens() {
        let config = ConfigParams::from_value(&json!({
            "connection": { "region": "us-east-1", "port": 443 },
            "options": { "debug": true },
            "list": ["a", "b"]
        }));

        assert_eq!(config.get("connection.region"), Some("us-east-1"));
        assert_eq!(config.get("connection.port"), Some("443"));
        assert_eq!(config.get("options.debug"), Some("true"));
        assert_eq!(config.get("list.1"), Some("b"));
    }

    #[test]
    fn test_sections() {
        let config = ConfigParams::from_tuples(&[
            ("connection.region", "us-east-1"),
            ("credential.access_id", "id"),
            ("credential.access_key", "key"),
        ]);

        let credential = config.get_section("credential");
        assert_eq!(credential.len(), 2);
        assert_eq!(credential.get("access_key"), Some("key"));
        assert_eq!(config.section_names(), vec!["connection", "credential"]);
    }

    #[test]
    fn test_list_section_names_keep_index_order() {
        let mut config = ConfigParams::new();
        for i in [10, 2, 0, 1] {
            config.put(format!("{}.region", i), "r");
        }
        assert_eq!(config.section_names(), vec!["0", "1", "2", "10"]);
    }

    #[test]
    fn test_typed_getters() {
        let config = ConfigParams::from_tuples(&[
            ("options.connect_timeout", "2500"),
            ("enabled", "yes"),
            ("empty", ""),
        ]);

        assert_eq!(
            config.get_as_duration_with_default("options.connect_timeout", Duration::from_secs(10)),
            Duration::from_millis(2500)
        );
        assert_eq!(config.get_as_integer_with_default("missing", 7), 7);
        assert!(config.get_as_boolean_with_default("enabled", false));
        assert_eq!(config.get_as_nullable_string("empty"), None);
        assert_eq!(config.get_as_string_with_default("empty", "dflt"), "dflt");
    }

    #[test]
    fn test_string_roundtrip_and_merge() {
        let first = ConfigParams::from_string("a=1;b=2");
        let second = ConfigParams::from_string("b=3;c=4");
        let merged = ConfigParams::merge_configs(&[&first, &second]);

        assert_eq!(merged.to_string(), "a=1;b=3;c=4");
    }
}
