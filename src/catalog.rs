use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::descriptor::{MessageTable, VariantRules};
use crate::error::ExtractError;
use crate::fs::FileSystem;
use crate::namespace::NamespaceRegistry;

/// Represents a conflict when inserting a key into a namespace tree.
/// Conflicts occur when the key path collides with an entry inserted earlier.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyConflict {
    /// Attempted to create a nested structure at a path that already has a scalar value.
    /// Example: trying to add "button.submit" when "button" already exists as a string.
    ValueIsNotObject {
        namespace: String,
        key_path: String,
        existing_value: String,
    },
    /// Attempted to set a scalar value at a path that already has nested children.
    /// Example: trying to add "button" as a string when "button.submit" already exists.
    ObjectIsValue { namespace: String, key_path: String },
}

impl std::fmt::Display for KeyConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyConflict::ValueIsNotObject {
                namespace,
                key_path,
                existing_value,
            } => {
                write!(
                    f,
                    "Cannot create nested key at '{}' in namespace '{}': existing value is {} (not an object)",
                    key_path, namespace, existing_value
                )
            }
            KeyConflict::ObjectIsValue {
                namespace,
                key_path,
            } => {
                write!(
                    f,
                    "Cannot set scalar value at '{}' in namespace '{}': path contains nested objects",
                    key_path, namespace
                )
            }
        }
    }
}

/// Freshly extracted messages of one compiled unit, per namespace
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    namespaces: BTreeMap<String, Map<String, Value>>,
    conflicts: Vec<KeyConflict>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every stored descriptor into its key variants and place them in
    /// the namespace trees.
    pub fn build(
        table: &MessageTable,
        registry: &NamespaceRegistry,
        config: &Config,
    ) -> Result<Self, ExtractError> {
        let rules = VariantRules {
            context_separator: config.context_separator.clone(),
            plural_suffix: config.plural_key_suffix(),
        };
        let mut catalog = Catalog::new();

        for descriptor in table.iter() {
            let decoded = registry.decode(
                descriptor.key.as_deref(),
                &config.ns_separator,
                &descriptor.location,
            )?;

            match &decoded.key {
                Some(bare) => {
                    for key in descriptor.key_variants(bare, &rules) {
                        catalog.insert(
                            &decoded.namespace,
                            &split_key(&key, &config.key_separator),
                            &descriptor.default_value,
                        );
                    }
                }
                None => {
                    // Key-less messages are keyed by their own text
                    for key in descriptor.key_variants(&descriptor.default_value, &rules) {
                        catalog.insert(&decoded.namespace, &[key.as_str()], &descriptor.default_value);
                    }
                }
            }

            for (_, fallback) in descriptor.fallback_entries() {
                let decoded =
                    registry.decode(Some(fallback), &config.ns_separator, &descriptor.location)?;
                if let Some(bare) = &decoded.key {
                    catalog.insert(
                        &decoded.namespace,
                        &split_key(bare, &config.key_separator),
                        &descriptor.default_value,
                    );
                }
            }
        }

        Ok(catalog)
    }

    /// Set `value` at `path` in `namespace`. The first entry at a path wins.
    pub fn insert(&mut self, namespace: &str, path: &[&str], value: &str) {
        let tree = self.namespaces.entry(namespace.to_string()).or_default();
        if let InsertResult::Conflict(conflict) = insert_nested_key(tree, namespace, path, value) {
            self.conflicts.push(conflict);
        }
    }

    pub fn namespace(&self, namespace: &str) -> Option<&Map<String, Value>> {
        self.namespaces.get(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&String, &Map<String, Value>)> {
        self.namespaces.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Structural collisions met while building
    pub fn conflicts(&self) -> &[KeyConflict] {
        &self.conflicts
    }
}

fn split_key<'k>(key: &'k str, separator: &str) -> Vec<&'k str> {
    if separator.is_empty() {
        vec![key]
    } else {
        key.split(separator).collect()
    }
}

/// Result of inserting a nested key
enum InsertResult {
    Added,
    Existed,
    Conflict(KeyConflict),
}

/// Insert a nested key path, creating intermediate objects as needed.
///
/// Iterative so deeply nested keys cannot overflow the stack.
fn insert_nested_key(
    obj: &mut Map<String, Value>,
    namespace: &str,
    path: &[&str],
    value: &str,
) -> InsertResult {
    let Some((leaf, parents)) = path.split_last() else {
        return InsertResult::Existed;
    };

    let mut current = obj;
    for (i, key) in parents.iter().enumerate() {
        let entry = current
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        match entry {
            Value::Object(nested) => current = nested,
            other => {
                return InsertResult::Conflict(KeyConflict::ValueIsNotObject {
                    namespace: namespace.to_string(),
                    key_path: path[..=i].join("."),
                    existing_value: other.to_string(),
                });
            }
        }
    }

    match current.get(*leaf) {
        Some(existing) if existing.is_object() => InsertResult::Conflict(KeyConflict::ObjectIsValue {
            namespace: namespace.to_string(),
            key_path: path.join("."),
        }),
        Some(_) => InsertResult::Existed,
        None => {
            current.insert((*leaf).to_string(), Value::String(value.to_string()));
            InsertResult::Added
        }
    }
}

/// Deep-merge `fresh` into `existing`; existing values win at every leaf.
/// Returns the dotted paths of the entries that were added.
pub fn merge_prefer_existing(existing: &mut Map<String, Value>, fresh: &Map<String, Value>) -> Vec<String> {
    let mut added = Vec::new();
    merge_into(existing, fresh, "", &mut added);
    added
}

fn merge_into(
    existing: &mut Map<String, Value>,
    fresh: &Map<String, Value>,
    prefix: &str,
    added: &mut Vec<String>,
) {
    for (key, value) in fresh {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match (existing.get_mut(key), value) {
            (None, _) => {
                collect_leaf_paths(value, &path, added);
                existing.insert(key.clone(), value.clone());
            }
            (Some(Value::Object(current)), Value::Object(nested)) => {
                merge_into(current, nested, &path, added);
            }
            // Human-provided content stays, whatever its shape
            (Some(_), _) => {}
        }
    }
}

fn collect_leaf_paths(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                collect_leaf_paths(nested, &format!("{}.{}", path, key), out);
            }
        }
        _ => out.push(path.to_string()),
    }
}

/// Parse an existing catalog file. Blank content is an empty tree.
pub fn parse_catalog(content: &str, path: &Path) -> Result<Map<String, Value>, ExtractError> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExtractError::MalformedExistingCatalog {
            path: path.to_path_buf(),
            detail: "top-level value is not an object".to_string(),
        }),
        Err(e) => Err(ExtractError::MalformedExistingCatalog {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Serialize a namespace tree: 2-space indentation, sorted keys, trailing newline
pub fn render_catalog(map: &Map<String, Value>) -> Result<String> {
    let mut out = serde_json::to_string_pretty(map).context("Failed to serialize catalog")?;
    out.push('\n');
    Ok(out)
}

/// Outcome of merging one namespace into one locale file
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogWrite {
    pub locale: String,
    pub namespace: String,
    pub path: PathBuf,
    pub added_keys: Vec<String>,
    /// Whether the file content changed (or would change, in a dry run)
    pub changed: bool,
}

/// Merge `catalog` into `<output_dir>/<locale>/<namespace>.json` for every locale.
///
/// Each file is locked for its whole read-merge-write cycle. A dry run reads
/// existing files but creates and writes nothing.
pub fn write_catalogs<F: FileSystem>(
    catalog: &Catalog,
    locales: &[String],
    output_dir: &Path,
    fs: &F,
    dry_run: bool,
) -> Result<Vec<CatalogWrite>> {
    let mut writes = Vec::new();
    if catalog.is_empty() {
        return Ok(writes);
    }

    for locale in locales {
        let locale_dir = output_dir.join(locale);
        if !dry_run {
            fs.create_dir_all(&locale_dir)
                .with_context(|| format!("Failed to create directory: {}", locale_dir.display()))?;
        }

        for (namespace, fresh) in catalog.namespaces() {
            let path = locale_dir.join(format!("{}.json", namespace));
            let write = merge_file(fs, &path, fresh, dry_run)?;
            writes.push(CatalogWrite {
                locale: locale.clone(),
                namespace: namespace.clone(),
                path,
                added_keys: write.0,
                changed: write.1,
            });
        }
    }

    Ok(writes)
}

fn merge_file<F: FileSystem>(
    fs: &F,
    path: &Path,
    fresh: &Map<String, Value>,
    dry_run: bool,
) -> Result<(Vec<String>, bool)> {
    let _lock = if dry_run {
        None
    } else {
        Some(fs.lock(path)?)
    };

    let current = if fs.exists(path) {
        fs.read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?
    } else {
        String::new()
    };

    let mut merged = parse_catalog(&current, path)?;
    let added = merge_prefer_existing(&mut merged, fresh);
    let rendered = render_catalog(&merged)?;
    let changed = rendered != current;

    if changed && !dry_run {
        fs.write(path, &rendered)
            .with_context(|| format!("Failed to write catalog file: {}", path.display()))?;
    }

    Ok((added, changed))
}
