//! Flat key/value settings consumed by service handlers.
//!
//! The `[services]` table of the config file is flattened into dotted keys,
//! so
//!
//! ```toml
//! [services.github]
//! username = "octocat"
//! ```
//!
//! is read back as `store.str("github.username")`. Lookups never fail: an
//! absent key or a value of the wrong type reads as the zero value, which
//! handlers treat as "feature disabled".

use std::collections::HashMap;

use toml::Value;

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    values: HashMap<String, Value>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a TOML table into dotted keys
    pub fn from_table(table: &toml::Table) -> Self {
        let mut store = Self::new();
        store.flatten_into("", table);
        store
    }

    fn flatten_into(&mut self, prefix: &str, table: &toml::Table) {
        for (key, value) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            match value {
                Value::Table(nested) => self.flatten_into(&full_key, nested),
                other => {
                    self.values.insert(full_key, other.clone());
                }
            }
        }
    }

    /// Builder-style insert, mostly useful in tests
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// String value for `key`, or `""` when absent or not a string
    pub fn str(&self, key: &str) -> &str {
        match self.values.get(key) {
            Some(Value::String(value)) => value,
            _ => "",
        }
    }

    /// Integer value for `key`, or `0` when absent or not an integer
    pub fn int(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(Value::Integer(value)) => *value,
            _ => 0,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String value for `key`, falling back to `default` when unset or empty
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.str(key) {
            "" => default,
            value => value,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
