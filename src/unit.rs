//! Per-unit extraction state.
//!
//! A [`UnitContext`] is created when a compiled unit starts (`pre`), receives
//! every lowered node during traversal (`visit`) and turns its tables into
//! catalog writes when the unit ends (`post`). Nothing outlives the unit
//! except the files on disk.

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::{write_catalogs, Catalog, CatalogWrite, KeyConflict};
use crate::config::Config;
use crate::descriptor::{DescriptorBuilder, MessageTable, StaticEvaluator};
use crate::error::ExtractError;
use crate::fs::FileSystem;
use crate::matcher::{ImportResolver, Match, Matcher};
use crate::namespace::NamespaceRegistry;
use crate::node::{Node, NodeId};

/// Summary of one finished unit
#[derive(Debug, Clone, Default)]
pub struct UnitReport {
    /// Unit path relative to the working directory
    pub file: String,
    pub message_count: usize,
    pub namespaces: Vec<String>,
    pub writes: Vec<CatalogWrite>,
    pub conflicts: Vec<KeyConflict>,
}

impl UnitReport {
    /// Keys added across all locales and namespaces
    pub fn added_key_count(&self) -> usize {
        self.writes.iter().map(|w| w.added_keys.len()).sum()
    }
}

/// Message and namespace tables of one compiled unit
pub struct UnitContext<'c> {
    config: &'c Config,
    file: String,
    matcher: Matcher<'c>,
    messages: MessageTable,
    namespaces: NamespaceRegistry,
    visited: HashSet<NodeId>,
}

impl<'c> UnitContext<'c> {
    /// Start a unit with empty tables
    pub fn pre(config: &'c Config, file: impl Into<String>) -> Self {
        Self {
            config,
            file: file.into(),
            matcher: Matcher::new(&config.module_source_name, &config.functions),
            messages: MessageTable::new(),
            namespaces: NamespaceRegistry::new(config.default_namespace.clone()),
            visited: HashSet::new(),
        }
    }

    /// Classify `node` and record what it declares.
    ///
    /// Returns the classification, or `None` for inert and already-visited nodes.
    pub fn visit(
        &mut self,
        node: &Node,
        imports: &dyn ImportResolver,
        evaluator: &dyn StaticEvaluator,
    ) -> Result<Option<Match>, ExtractError> {
        if let Some(id) = node.id() {
            if self.visited.contains(&id) {
                return Ok(None);
            }
        }

        let Some(kind) = self.matcher.classify(node, imports) else {
            return Ok(None);
        };
        if let Some(id) = node.id() {
            self.visited.insert(id);
        }

        let builder = DescriptorBuilder::new(evaluator);
        let default_namespace = self.config.default_namespace.as_str();

        match (kind, node) {
            (Match::TextComponent, Node::ComponentOpen(component)) => {
                if let Some(descriptor) = builder.from_component(component)? {
                    self.messages.store(descriptor)?;
                }
            }
            (Match::NamespaceComponent, Node::ComponentOpen(component)) => {
                for (id, namespace) in
                    builder.namespaces_from_component(component, default_namespace)?
                {
                    self.namespaces
                        .register(id, namespace, component.location.clone());
                }
            }
            (Match::TranslateCall, Node::Call(call)) => {
                if let Some(descriptor) = builder.from_call(call)? {
                    self.messages.store(descriptor)?;
                }
            }
            (Match::NamespaceCall { first_only }, Node::Call(call)) => {
                for (id, namespace) in
                    builder.namespaces_from_call(call, default_namespace, first_only)?
                {
                    self.namespaces.register(id, namespace, call.location.clone());
                }
            }
            _ => {}
        }

        Ok(Some(kind))
    }

    pub fn matcher(&self) -> &Matcher<'c> {
        &self.matcher
    }

    pub fn messages(&self) -> &MessageTable {
        &self.messages
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Reshape the tables into per-namespace trees
    pub fn build_catalog(&self) -> Result<Catalog, ExtractError> {
        Catalog::build(&self.messages, &self.namespaces, self.config)
    }

    /// Finish the unit: merge its catalog into every locale under `output_dir`
    pub fn post<F: FileSystem>(self, fs: &F, output_dir: &Path, dry_run: bool) -> Result<UnitReport> {
        let catalog = self.build_catalog()?;
        let writes = write_catalogs(&catalog, &self.config.locales, output_dir, fs, dry_run)?;

        Ok(UnitReport {
            file: self.file,
            message_count: self.messages.len(),
            namespaces: catalog.namespaces().map(|(name, _)| name.clone()).collect(),
            writes,
            conflicts: catalog.conflicts().to_vec(),
        })
    }
}
