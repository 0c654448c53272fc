use std::collections::HashMap;

use crate::error::{ExtractError, SourceLocation};

/// Registry id of the default namespace of a compiled unit
pub const DEFAULT_NAMESPACE_ID: &str = "defaultNS";

/// Namespace declared by a `translate(...)` call or an `<I18n ns>` component
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceEntry {
    pub id: String,
    pub namespace: String,
    pub location: SourceLocation,
}

/// Result of splitting a raw key into namespace and bare key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub namespace: String,
    pub key: Option<String>,
}

/// Namespaces declared in one compiled unit
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    entries: HashMap<String, NamespaceEntry>,
    /// Used while no default namespace has been declared
    fallback: String,
}

impl NamespaceRegistry {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Upsert an entry; the last registration of an id wins
    pub fn register(
        &mut self,
        id: impl Into<String>,
        namespace: impl Into<String>,
        location: SourceLocation,
    ) {
        let id = id.into();
        self.entries.insert(
            id.clone(),
            NamespaceEntry {
                id,
                namespace: namespace.into(),
                location,
            },
        );
    }

    /// Namespace that un-prefixed keys belong to
    pub fn default_namespace(&self) -> &str {
        self.entries
            .get(DEFAULT_NAMESPACE_ID)
            .map(|entry| entry.namespace.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Distinct declared namespace names, sorted
    #[cfg(test)]
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .values()
            .map(|entry| entry.namespace.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Split `raw_key` on `separator` into (namespace, bare key).
    ///
    /// `location` is only used for the error raised when the prefix was never
    /// registered in this unit.
    pub fn decode(
        &self,
        raw_key: Option<&str>,
        separator: &str,
        location: &SourceLocation,
    ) -> Result<DecodedKey, ExtractError> {
        let raw_key = match raw_key {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Ok(DecodedKey {
                    namespace: self.default_namespace().to_string(),
                    key: None,
                })
            }
        };

        let split = if separator.is_empty() {
            None
        } else {
            raw_key.split_once(separator)
        };

        match split {
            None => Ok(DecodedKey {
                namespace: self.default_namespace().to_string(),
                key: Some(raw_key.to_string()),
            }),
            Some((prefix, rest)) => {
                let entry = self.entries.get(prefix).ok_or_else(|| {
                    ExtractError::UnregisteredNamespacePrefix {
                        key: raw_key.to_string(),
                        prefix: prefix.to_string(),
                        location: location.clone(),
                    }
                })?;
                Ok(DecodedKey {
                    namespace: entry.namespace.clone(),
                    key: Some(rest.to_string()),
                })
            }
        }
    }
}
