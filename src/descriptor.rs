use std::borrow::Cow;
use std::collections::HashMap;
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use crate::error::{ExtractError, SourceLocation};
use crate::markup;
use crate::namespace::DEFAULT_NAMESPACE_ID;
use crate::node::{Call, Component, Expr, Value};

/// Component attribute holding the message key
pub const KEY_ATTR: &str = "i18nKey";
/// Component attribute and option property holding the context
pub const CONTEXT_PROP: &str = "context";
/// Component attribute and option property holding the default value
pub const DEFAULT_VALUE_PROP: &str = "defaultValue";
/// Alternative default value attribute used by `<Trans defaults="...">`
pub const DEFAULTS_ATTR: &str = "defaults";
/// Presence marks the message as plural
pub const COUNT_PROP: &str = "count";
/// Namespace list attribute of the namespace-scope component
pub const NAMESPACE_ATTR: &str = "ns";

/// Normalize a string to NFC form for consistent key handling.
/// This ensures that keys like "が" (NFD: か+゛) and "が" (NFC) are treated as identical.
fn normalize_key(key: &str) -> Cow<'_, str> {
    match is_nfc_quick(key.chars()) {
        IsNormalized::Yes => Cow::Borrowed(key),
        _ => Cow::Owned(key.nfc().collect()),
    }
}

/// Capability of reducing an expression to a constant.
///
/// `None` means the evaluator is not confident about the value.
pub trait StaticEvaluator {
    fn try_evaluate(&self, expr: &Expr) -> Option<Value>;
}

/// One extracted message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    /// Raw key, possibly prefixed with a namespace id
    pub key: Option<String>,
    pub default_value: String,
    pub context: Option<String>,
    pub plural: bool,
    /// Keys after the first one in `t(['a', 'b', 'c'])`
    pub fallbacks: Vec<String>,
    pub location: SourceLocation,
}

impl MessageDescriptor {
    /// Deduplication identity: the explicit key, else the default value
    pub fn identity(&self) -> &str {
        match &self.key {
            Some(key) => key,
            None => &self.default_value,
        }
    }

    /// Catalog keys derived from `base`: `base`, `base_context` and the plural
    /// form of the most specific of the two.
    pub fn key_variants(&self, base: &str, rules: &VariantRules) -> Vec<String> {
        let mut keys = vec![base.to_string()];
        let mut specific = base.to_string();

        if let Some(context) = &self.context {
            specific = format!("{}{}{}", base, rules.context_separator, context);
            keys.push(specific.clone());
        }

        if self.plural {
            keys.push(format!("{}{}", specific, rules.plural_suffix));
        }

        keys
    }

    /// Labels of the fallback keys: `fallback-1`, `fallback-2`, ...
    pub fn fallback_entries(&self) -> impl Iterator<Item = (String, &str)> {
        self.fallbacks
            .iter()
            .enumerate()
            .map(|(idx, key)| (format!("fallback-{}", idx + 1), key.as_str()))
    }

    fn same_shape(&self, other: &MessageDescriptor) -> bool {
        self.key == other.key
            && self.context == other.context
            && self.plural == other.plural
            && self.fallbacks == other.fallbacks
    }
}

/// Separators used to build context and plural keys
#[derive(Debug, Clone)]
pub struct VariantRules {
    pub context_separator: String,
    /// Includes its separator, e.g. "_plural"
    pub plural_suffix: String,
}

impl Default for VariantRules {
    fn default() -> Self {
        Self {
            context_separator: "_".to_string(),
            plural_suffix: "_plural".to_string(),
        }
    }
}

/// Messages of one compiled unit, grouped by identity
#[derive(Debug, Default)]
pub struct MessageTable {
    entries: Vec<MessageDescriptor>,
    by_identity: HashMap<String, Vec<usize>>,
}

impl MessageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a descriptor.
    ///
    /// Fails when another descriptor with the same identity carries a
    /// different default value. Exact duplicates are dropped; same identity
    /// with a different context or plurality is kept alongside.
    pub fn store(&mut self, descriptor: MessageDescriptor) -> Result<(), ExtractError> {
        let identity = descriptor.identity().to_string();

        if let Some(indices) = self.by_identity.get(&identity) {
            let first = &self.entries[indices[0]];
            if first.default_value != descriptor.default_value {
                return Err(ExtractError::ConflictingDefaultValue {
                    identity,
                    previous: first.default_value.clone(),
                    previous_location: first.location.clone(),
                    current: descriptor.default_value,
                    location: descriptor.location,
                });
            }
            if indices
                .iter()
                .any(|&idx| self.entries[idx].same_shape(&descriptor))
            {
                return Ok(());
            }
        }

        self.by_identity
            .entry(identity)
            .or_default()
            .push(self.entries.len());
        self.entries.push(descriptor);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct identities
    #[cfg(test)]
    pub fn identity_count(&self) -> usize {
        self.by_identity.len()
    }
}

/// Builds descriptors and namespace lists from matched nodes
pub struct DescriptorBuilder<'a> {
    evaluator: &'a dyn StaticEvaluator,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(evaluator: &'a dyn StaticEvaluator) -> Self {
        Self { evaluator }
    }

    fn evaluate(
        &self,
        expr: &Expr,
        location: &SourceLocation,
        what: &str,
    ) -> Result<Value, ExtractError> {
        self.evaluator
            .try_evaluate(expr)
            .ok_or_else(|| ExtractError::non_static(location, what))
    }

    fn evaluate_text(
        &self,
        expr: &Expr,
        location: &SourceLocation,
        what: &str,
    ) -> Result<String, ExtractError> {
        self.evaluate(expr, location, what)?
            .to_text()
            .ok_or_else(|| ExtractError::non_static(location, format!("{} must be a string", what)))
    }

    /// `<Trans i18nKey="..." context="..." count={n}>body</Trans>`
    ///
    /// Returns `None` for a component with neither key nor content.
    pub fn from_component(
        &self,
        component: &Component,
    ) -> Result<Option<MessageDescriptor>, ExtractError> {
        let location = &component.location;
        let mut key = None;
        let mut context = None;
        let mut attr_default = None;
        let mut plural = false;

        for attr in &component.attributes {
            let name = attr.name.as_str();
            if name == COUNT_PROP {
                plural = true;
                continue;
            }
            if ![KEY_ATTR, CONTEXT_PROP, DEFAULT_VALUE_PROP, DEFAULTS_ATTR].contains(&name) {
                continue;
            }
            let value = match &attr.value {
                Some(expr) => self
                    .evaluate_text(expr, location, &format!("attribute '{}'", name))?
                    .trim()
                    .to_string(),
                None => {
                    return Err(ExtractError::non_static(
                        location,
                        format!("attribute '{}' needs a value", name),
                    ))
                }
            };
            match name {
                KEY_ATTR => key = Some(normalize_key(&value).into_owned()),
                CONTEXT_PROP => context = Some(value),
                _ => attr_default = Some(value),
            }
        }

        let rendered = markup::render_message(&component.children);
        let default_value = if rendered.is_empty() {
            attr_default.unwrap_or_default()
        } else {
            rendered
        };

        let key = key.filter(|k| !k.is_empty());
        if key.is_none() && default_value.is_empty() {
            return Ok(None);
        }

        Ok(Some(MessageDescriptor {
            key,
            default_value,
            context: context.filter(|c| !c.is_empty()),
            plural,
            fallbacks: Vec::new(),
            location: location.clone(),
        }))
    }

    /// `t(key, options, context)`
    ///
    /// Returns `None` for a call without arguments, or one with neither a key
    /// nor a default value.
    pub fn from_call(&self, call: &Call) -> Result<Option<MessageDescriptor>, ExtractError> {
        let location = &call.location;
        let Some(key_arg) = call.args.first() else {
            return Ok(None);
        };

        let (key, fallbacks) = match self.evaluate(key_arg, location, "translation key")? {
            Value::Array(items) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    let text = item.to_text().ok_or_else(|| {
                        ExtractError::non_static(location, "translation keys must be strings")
                    })?;
                    keys.push(normalize_key(&text).into_owned());
                }
                if keys.is_empty() {
                    return Err(ExtractError::non_static(
                        location,
                        "translation key array must not be empty",
                    ));
                }
                let first = keys.remove(0);
                (first, keys)
            }
            other => {
                let text = other.to_text().ok_or_else(|| {
                    ExtractError::non_static(location, "translation key must be a string")
                })?;
                (normalize_key(&text).into_owned(), Vec::new())
            }
        };

        let mut descriptor = MessageDescriptor {
            key: Some(key).filter(|k| !k.is_empty()),
            default_value: String::new(),
            context: None,
            plural: false,
            fallbacks,
            location: location.clone(),
        };

        if let Some(options) = call.args.get(1) {
            match options {
                Expr::Object(props) => {
                    for prop in props {
                        match prop.name.as_deref() {
                            Some(COUNT_PROP) => descriptor.plural = true,
                            Some(DEFAULT_VALUE_PROP) => {
                                descriptor.default_value = self
                                    .evaluate_text(&prop.value, location, "option 'defaultValue'")?
                                    .trim()
                                    .to_string();
                            }
                            Some(CONTEXT_PROP) => {
                                let context = self
                                    .evaluate_text(&prop.value, location, "option 'context'")?
                                    .trim()
                                    .to_string();
                                descriptor.context = Some(context).filter(|c| !c.is_empty());
                            }
                            _ => {}
                        }
                    }
                }
                Expr::Str(_) | Expr::Concat(..) | Expr::Template { .. } => {
                    descriptor.default_value =
                        self.evaluate_text(options, location, "default value")?;
                }
                // Options passed through a variable are not inspected
                _ => {}
            }
        }

        if let Some(context) = call.args.get(2) {
            let context = self.evaluate_text(context, location, "context")?;
            descriptor.context = Some(context).filter(|c| !c.is_empty());
        }

        if descriptor.key.is_none() && descriptor.default_value.is_empty() {
            return Ok(None);
        }

        Ok(Some(descriptor))
    }

    /// Namespace entries `(id, namespace)` declared by a
    /// `translate(...)`-style call. With `first_only`, arguments after the
    /// first are options and ignored.
    pub fn namespaces_from_call(
        &self,
        call: &Call,
        default_namespace: &str,
        first_only: bool,
    ) -> Result<Vec<(String, String)>, ExtractError> {
        let args = if first_only {
            &call.args[..call.args.len().min(1)]
        } else {
            &call.args[..]
        };
        self.namespace_entries(args.iter(), default_namespace, &call.location)
    }

    /// Namespace entries declared by `<I18n ns={...}>`
    pub fn namespaces_from_component(
        &self,
        component: &Component,
        default_namespace: &str,
    ) -> Result<Vec<(String, String)>, ExtractError> {
        let ns = component
            .attribute(NAMESPACE_ATTR)
            .and_then(|attr| attr.value.as_ref());
        self.namespace_entries(ns.into_iter(), default_namespace, &component.location)
    }

    fn namespace_entries<'e>(
        &self,
        args: impl Iterator<Item = &'e Expr>,
        default_namespace: &str,
        location: &SourceLocation,
    ) -> Result<Vec<(String, String)>, ExtractError> {
        let mut names = Vec::new();
        for arg in args {
            if arg.is_function() {
                return Err(ExtractError::UnsupportedDynamicNamespaceList {
                    location: location.clone(),
                });
            }
            match self.evaluate(arg, location, "namespace")? {
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::Str(name) => names.push(name),
                            _ => {
                                return Err(ExtractError::non_static(
                                    location,
                                    "namespaces must be strings",
                                ))
                            }
                        }
                    }
                }
                Value::Str(name) => names.push(name),
                _ => {
                    return Err(ExtractError::non_static(
                        location,
                        "namespace must be a string or an array of strings",
                    ))
                }
            }
        }

        let mut names = names.into_iter();
        let Some(first) = names.next() else {
            return Ok(vec![(
                DEFAULT_NAMESPACE_ID.to_string(),
                default_namespace.to_string(),
            )]);
        };

        let mut entries = vec![
            (DEFAULT_NAMESPACE_ID.to_string(), first.clone()),
            (first.clone(), first),
        ];
        entries.extend(names.map(|name| (name.clone(), name)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Attribute, Name, Node, NodeId, Property};

    /// Evaluates literals only
    struct LiteralEvaluator;

    impl StaticEvaluator for LiteralEvaluator {
        fn try_evaluate(&self, expr: &Expr) -> Option<Value> {
            match expr {
                Expr::Str(s) => Some(Value::Str(s.clone())),
                Expr::Num(n) => Some(Value::Num(*n)),
                Expr::Array(items) => items
                    .iter()
                    .map(|item| self.try_evaluate(item))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array),
                Expr::Concat(left, right) => {
                    let left = self.try_evaluate(left)?.to_text()?;
                    let right = self.try_evaluate(right)?.to_text()?;
                    Some(Value::Str(format!("{}{}", left, right)))
                }
                _ => None,
            }
        }
    }

    fn loc() -> SourceLocation {
        SourceLocation::new("test.js", 3, 5)
    }

    fn call(args: Vec<Expr>) -> Call {
        Call {
            id: NodeId::new(0, 1),
            callee: Name::ident("t"),
            args,
            location: loc(),
        }
    }

    fn component(attributes: Vec<Attribute>, children: Vec<Node>) -> Component {
        Component {
            id: NodeId::new(0, 1),
            name: Name::ident("Trans"),
            attributes,
            children,
            location: loc(),
        }
    }

    fn descriptor(key: Option<&str>, default_value: &str) -> MessageDescriptor {
        MessageDescriptor {
            key: key.map(str::to_string),
            default_value: default_value.to_string(),
            context: None,
            plural: false,
            fallbacks: Vec::new(),
            location: loc(),
        }
    }

    #[test]
    fn test_call_with_string_default() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![Expr::str("second"), Expr::str("a default.")]))
            .unwrap()
            .unwrap();
        assert_eq!(d.key.as_deref(), Some("second"));
        assert_eq!(d.default_value, "a default.");
        assert!(!d.plural);
    }

    #[test]
    fn test_call_with_options_object() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![
                Expr::str("ninth"),
                Expr::Object(vec![
                    Property::new("name", Expr::Ident("name".to_string())),
                    Property::new("defaultValue", Expr::str("My name is {{name}}.")),
                    Property::new("context", Expr::str("formal")),
                    Property::shorthand("count"),
                ]),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(d.default_value, "My name is {{name}}.");
        assert_eq!(d.context.as_deref(), Some("formal"));
        assert!(d.plural);
    }

    #[test]
    fn test_call_third_argument_is_context() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![
                Expr::str("third"),
                Expr::str("default message"),
                Expr::str("contextA"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(d.context.as_deref(), Some("contextA"));
    }

    #[test]
    fn test_call_concatenated_key() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![Expr::Concat(
                Box::new(Expr::str("six")),
                Box::new(Expr::str("th")),
            )]))
            .unwrap()
            .unwrap();
        assert_eq!(d.key.as_deref(), Some("sixth"));
        assert_eq!(d.default_value, "");
    }

    #[test]
    fn test_call_array_key_has_fallbacks() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![Expr::Array(vec![
                Expr::str("seventh.first"),
                Expr::str("seventh.fallbackA"),
                Expr::str("seventh.fallbackB"),
            ])]))
            .unwrap()
            .unwrap();
        assert_eq!(d.key.as_deref(), Some("seventh.first"));
        let labels: Vec<(String, &str)> = d.fallback_entries().collect();
        assert_eq!(
            labels,
            vec![
                ("fallback-1".to_string(), "seventh.fallbackA"),
                ("fallback-2".to_string(), "seventh.fallbackB"),
            ]
        );
    }

    #[test]
    fn test_call_dynamic_key_is_an_error() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let err = builder
            .from_call(&call(vec![Expr::Ident("someKey".to_string())]))
            .unwrap_err();
        assert!(matches!(err, ExtractError::NonStaticExpression { .. }));
        assert!(err.to_string().starts_with("test.js:3:5"));
    }

    #[test]
    fn test_call_without_arguments_is_inert() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        assert!(builder.from_call(&call(vec![])).unwrap().is_none());
    }

    #[test]
    fn test_call_with_empty_key_and_no_default_is_inert() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        assert!(builder.from_call(&call(vec![Expr::str("")])).unwrap().is_none());
        assert!(builder
            .from_call(&call(vec![Expr::str(""), Expr::str("")]))
            .unwrap()
            .is_none());

        let d = builder
            .from_call(&call(vec![Expr::str(""), Expr::str("Hello world")]))
            .unwrap()
            .unwrap();
        assert_eq!(d.key, None);
        assert_eq!(d.default_value, "Hello world");
    }

    #[test]
    fn test_options_variable_is_ignored() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![Expr::str("k"), Expr::Ident("opts".to_string())]))
            .unwrap()
            .unwrap();
        assert_eq!(d.default_value, "");
    }

    #[test]
    fn test_component_attributes_and_body() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let c = component(
            vec![
                Attribute::new("i18nKey", Some(Expr::str("  welcome  "))),
                Attribute::new("count", Some(Expr::Ident("n".to_string()))),
                Attribute::new("className", Some(Expr::Ident("cls".to_string()))),
            ],
            vec![Node::Text("Hello ".to_string()), Node::Element(vec![])],
        );
        let d = builder.from_component(&c).unwrap().unwrap();
        assert_eq!(d.key.as_deref(), Some("welcome"));
        assert_eq!(d.default_value, "Hello <1></1>");
        assert!(d.plural);
    }

    #[test]
    fn test_component_bare_count_attribute() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let c = component(
            vec![Attribute::new("count", None)],
            vec![Node::Text("items".to_string())],
        );
        let d = builder.from_component(&c).unwrap().unwrap();
        assert!(d.plural);
        assert_eq!(d.identity(), "items");
    }

    #[test]
    fn test_component_default_value_attribute_used_without_body() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let c = component(
            vec![
                Attribute::new("i18nKey", Some(Expr::str("k"))),
                Attribute::new("defaults", Some(Expr::str("Fallback text"))),
            ],
            vec![],
        );
        let d = builder.from_component(&c).unwrap().unwrap();
        assert_eq!(d.default_value, "Fallback text");
    }

    #[test]
    fn test_empty_component_is_inert() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        assert!(builder
            .from_component(&component(vec![], vec![]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_key_is_nfc_normalized() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let d = builder
            .from_call(&call(vec![Expr::str("\u{304b}\u{3099}")]))
            .unwrap()
            .unwrap();
        assert_eq!(d.key.as_deref(), Some("\u{304c}"));
    }

    #[test]
    fn test_namespaces_from_array_and_strings() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let entries = builder
            .namespaces_from_call(
                &call(vec![
                    Expr::Array(vec![Expr::str("react"), Expr::str("anotherNS")]),
                    Expr::str("third"),
                ]),
                "translation",
                false,
            )
            .unwrap();
        assert_eq!(
            entries,
            vec![
                (DEFAULT_NAMESPACE_ID.to_string(), "react".to_string()),
                ("react".to_string(), "react".to_string()),
                ("anotherNS".to_string(), "anotherNS".to_string()),
                ("third".to_string(), "third".to_string()),
            ]
        );
    }

    #[test]
    fn test_namespaces_without_arguments_use_configured_default() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let entries = builder
            .namespaces_from_call(&call(vec![]), "app", false)
            .unwrap();
        assert_eq!(
            entries,
            vec![(DEFAULT_NAMESPACE_ID.to_string(), "app".to_string())]
        );
    }

    #[test]
    fn test_namespaces_first_only_ignores_options() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let entries = builder
            .namespaces_from_call(
                &call(vec![Expr::str("common"), Expr::Object(vec![])]),
                "app",
                true,
            )
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "common");
    }

    #[test]
    fn test_function_namespace_list_is_rejected() {
        let builder = DescriptorBuilder::new(&LiteralEvaluator);
        let err = builder
            .namespaces_from_call(&call(vec![Expr::Function]), "app", false)
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::UnsupportedDynamicNamespaceList { .. }
        ));
    }

    #[test]
    fn test_key_variants() {
        let rules = VariantRules::default();
        let mut d = descriptor(Some("item"), "Item");
        assert_eq!(d.key_variants("item", &rules), vec!["item"]);

        d.plural = true;
        assert_eq!(d.key_variants("item", &rules), vec!["item", "item_plural"]);

        d.context = Some("male".to_string());
        assert_eq!(
            d.key_variants("item", &rules),
            vec!["item", "item_male", "item_male_plural"]
        );

        d.plural = false;
        assert_eq!(d.key_variants("item", &rules), vec!["item", "item_male"]);
    }

    #[test]
    fn test_table_rejects_conflicting_default_values() {
        let mut table = MessageTable::new();
        table.store(descriptor(Some("greeting"), "Hello")).unwrap();
        let err = table.store(descriptor(Some("greeting"), "Hi")).unwrap_err();
        assert!(matches!(err, ExtractError::ConflictingDefaultValue { .. }));
    }

    #[test]
    fn test_table_deduplicates_equal_descriptors() {
        let mut table = MessageTable::new();
        table.store(descriptor(Some("greeting"), "Hello")).unwrap();
        table.store(descriptor(Some("greeting"), "Hello")).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_keeps_context_variants_of_one_identity() {
        let mut table = MessageTable::new();
        let mut male = descriptor(Some("friend"), "");
        male.context = Some("male".to_string());
        let mut female = descriptor(Some("friend"), "");
        female.context = Some("female".to_string());

        table.store(male).unwrap();
        table.store(female).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.identity_count(), 1);
    }

    #[test]
    fn test_keyless_identity_is_default_value() {
        let mut table = MessageTable::new();
        table.store(descriptor(None, "Hello world")).unwrap();
        table.store(descriptor(Some("Hello world"), "Hello world")).unwrap();
        assert_eq!(table.identity_count(), 1);
        assert_eq!(table.len(), 2);
    }
}
