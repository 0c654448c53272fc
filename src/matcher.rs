use crate::node::{Name, Node};

/// Components whose body is a translatable message
pub const TEXT_COMPONENTS: &[&str] = &["Trans", "Interpolate"];
/// Render-props component declaring the namespaces of its subtree
pub const NAMESPACE_COMPONENT: &str = "I18n";
/// Higher-order translate call from older react-i18next versions
pub const TRANSLATE_HOC: &str = "translate";
/// Namespace-declaring functions whose second argument is an options object
pub const NAMESPACE_HOOKS: &[&str] = &["withTranslation", "useTranslation"];
/// Translate function name
pub const TRANSLATE_FUNCTION: &str = "t";

/// Capability of the tree front end: does `name` resolve to the export
/// `imported` of `module`?
pub trait ImportResolver {
    fn references_import(&self, name: &Name, module: &str, imported: &str) -> bool;
}

/// Classification of a visited node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// `<Trans>` / `<Interpolate>`
    TextComponent,
    /// `<I18n ns={...}>`
    NamespaceComponent,
    /// `t(...)`
    TranslateCall,
    /// `translate(...)` and friends; `first_only` when later arguments are options
    NamespaceCall { first_only: bool },
}

/// Decides which visited nodes denote translatable content
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    module_source: &'a str,
    /// Heuristic callee names, matched without import resolution
    functions: &'a [String],
}

impl<'a> Matcher<'a> {
    pub fn new(module_source: &'a str, functions: &'a [String]) -> Self {
        Self {
            module_source,
            functions,
        }
    }

    /// Classify a node. Non-matches return `None`.
    pub fn classify(&self, node: &Node, imports: &dyn ImportResolver) -> Option<Match> {
        match node {
            Node::ComponentOpen(component) => self.component_kind(&component.name, imports),
            Node::Call(call) => self.call_kind(&call.callee, imports),
            _ => None,
        }
    }

    /// Classify a component tag by its name
    pub fn component_kind(&self, name: &Name, imports: &dyn ImportResolver) -> Option<Match> {
        if TEXT_COMPONENTS
            .iter()
            .any(|export| imports.references_import(name, self.module_source, export))
        {
            return Some(Match::TextComponent);
        }
        if imports.references_import(name, self.module_source, NAMESPACE_COMPONENT) {
            return Some(Match::NamespaceComponent);
        }
        None
    }

    /// Classify a call by its callee
    pub fn call_kind(&self, callee: &Name, imports: &dyn ImportResolver) -> Option<Match> {
        if imports.references_import(callee, self.module_source, TRANSLATE_HOC) {
            return Some(Match::NamespaceCall { first_only: false });
        }
        if NAMESPACE_HOOKS
            .iter()
            .any(|export| imports.references_import(callee, self.module_source, export))
        {
            return Some(Match::NamespaceCall { first_only: true });
        }
        if imports.references_import(callee, self.module_source, TRANSLATE_FUNCTION) {
            return Some(Match::TranslateCall);
        }

        // Heuristic fallback: `t` handed in through props or a hook
        let dotted = callee.dotted()?;
        if self.functions.iter().any(|f| *f == dotted) {
            return Some(Match::TranslateCall);
        }
        None
    }
}
