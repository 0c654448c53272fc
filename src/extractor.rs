use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use swc_common::comments::SingleThreadedComments;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap, Span, Spanned};
use swc_ecma_ast as ast;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};

use crate::config::Config;
use crate::descriptor::StaticEvaluator;
use crate::error::{ExtractError, SourceLocation};
use crate::fs::FileSystem;
use crate::logging;
use crate::matcher::ImportResolver;
use crate::node::{number_to_text, Attribute, Call, Component, Expr, Name, Node, NodeId, Property, Value};
use crate::unit::{UnitContext, UnitReport};

/// Limit on chained `const` lookups while evaluating one expression
const MAX_EVAL_DEPTH: usize = 32;

/// Error encountered during extraction
#[derive(Debug, Clone)]
pub struct ExtractionError {
    pub file_path: String,
    pub message: String,
}

/// Result of extraction from multiple files
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// Reports of units that declared at least one message, sorted by path
    pub units: Vec<UnitReport>,
    /// Skipped files plus key conflicts
    pub warning_count: usize,
    pub errors: Vec<ExtractionError>,
}

impl ExtractionResult {
    pub fn message_count(&self) -> usize {
        self.units.iter().map(|unit| unit.message_count).sum()
    }
}

/// Where a run reads from and writes to
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory holding `<locale>/<namespace>.json`
    pub output_dir: PathBuf,
    /// Relative input patterns and reported file names are based here
    pub base_dir: PathBuf,
    /// Compute everything but write nothing
    pub dry_run: bool,
}

impl ExtractOptions {
    pub fn new(config: &Config, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            output_dir: base_dir.join(&config.output),
            base_dir,
            dry_run: false,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = self.base_dir.join(output_dir.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Path as shown in locations and reports
    pub fn label(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

// =============================================================================
// Lowering from the SWC AST into the node model
// =============================================================================

fn str_value(s: &ast::Str) -> Option<String> {
    s.value.as_str().map(|s| s.to_string())
}

fn lower_expr(expr: &ast::Expr) -> Expr {
    match expr {
        ast::Expr::Lit(ast::Lit::Str(s)) => str_value(s).map(Expr::Str).unwrap_or(Expr::Opaque),
        ast::Expr::Lit(ast::Lit::Num(n)) => Expr::Num(n.value),
        ast::Expr::Lit(ast::Lit::Bool(b)) => Expr::Bool(b.value),
        ast::Expr::Lit(ast::Lit::Null(_)) => Expr::Null,
        ast::Expr::Ident(ident) => Expr::Ident(ident.sym.to_string()),
        ast::Expr::Array(array) => Expr::Array(
            array
                .elems
                .iter()
                .map(|elem| match elem {
                    Some(ast::ExprOrSpread { spread: None, expr }) => lower_expr(expr),
                    _ => Expr::Opaque,
                })
                .collect(),
        ),
        ast::Expr::Object(object) => Expr::Object(object.props.iter().map(lower_prop).collect()),
        ast::Expr::Bin(bin) if bin.op == ast::BinaryOp::Add => Expr::Concat(
            Box::new(lower_expr(&bin.left)),
            Box::new(lower_expr(&bin.right)),
        ),
        ast::Expr::Tpl(tpl) => Expr::Template {
            quasis: tpl.quasis.iter().map(quasi_text).collect(),
            exprs: tpl.exprs.iter().map(|expr| lower_expr(expr)).collect(),
        },
        ast::Expr::Paren(paren) => lower_expr(&paren.expr),
        ast::Expr::TsAs(expr) => lower_expr(&expr.expr),
        ast::Expr::TsSatisfies(expr) => lower_expr(&expr.expr),
        ast::Expr::TsConstAssertion(expr) => lower_expr(&expr.expr),
        ast::Expr::TsNonNull(expr) => lower_expr(&expr.expr),
        ast::Expr::Unary(unary) if unary.op == ast::UnaryOp::Minus => match lower_expr(&unary.arg) {
            Expr::Num(n) => Expr::Num(-n),
            _ => Expr::Opaque,
        },
        ast::Expr::Fn(_) | ast::Expr::Arrow(_) => Expr::Function,
        _ => Expr::Opaque,
    }
}

fn quasi_text(quasi: &ast::TplElement) -> String {
    quasi
        .cooked
        .as_ref()
        .and_then(|cooked| cooked.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| quasi.raw.to_string())
}

fn lower_prop(prop: &ast::PropOrSpread) -> Property {
    let ast::PropOrSpread::Prop(prop) = prop else {
        return Property {
            name: None,
            value: Expr::Opaque,
        };
    };
    match prop.as_ref() {
        ast::Prop::KeyValue(kv) => Property {
            name: prop_name(&kv.key),
            value: lower_expr(&kv.value),
        },
        ast::Prop::Shorthand(ident) => Property::shorthand(ident.sym.to_string()),
        ast::Prop::Method(method) => Property {
            name: prop_name(&method.key),
            value: Expr::Function,
        },
        _ => Property {
            name: None,
            value: Expr::Opaque,
        },
    }
}

fn prop_name(key: &ast::PropName) -> Option<String> {
    match key {
        ast::PropName::Ident(ident) => Some(ident.sym.to_string()),
        ast::PropName::Str(s) => str_value(s),
        ast::PropName::Num(n) => Some(number_to_text(n.value)),
        _ => None,
    }
}

fn expr_name(expr: &ast::Expr) -> Name {
    match expr {
        ast::Expr::Ident(ident) => Name::Ident(ident.sym.to_string()),
        ast::Expr::Member(member) => match (member.obj.as_ref(), &member.prop) {
            (ast::Expr::Ident(object), ast::MemberProp::Ident(property)) => Name::Member {
                object: object.sym.to_string(),
                property: property.sym.to_string(),
            },
            _ => Name::Other,
        },
        ast::Expr::Paren(paren) => expr_name(&paren.expr),
        _ => Name::Other,
    }
}

fn callee_name(callee: &ast::Callee) -> Name {
    match callee {
        ast::Callee::Expr(expr) => expr_name(expr),
        _ => Name::Other,
    }
}

fn jsx_name(name: &ast::JSXElementName) -> Name {
    match name {
        ast::JSXElementName::Ident(ident) => Name::Ident(ident.sym.to_string()),
        ast::JSXElementName::JSXMemberExpr(member) => match &member.obj {
            ast::JSXObject::Ident(object) => Name::Member {
                object: object.sym.to_string(),
                property: member.prop.sym.to_string(),
            },
            _ => Name::Other,
        },
        _ => Name::Other,
    }
}

fn lower_jsx_expr(expr: &ast::JSXExpr) -> Option<Expr> {
    match expr {
        ast::JSXExpr::Expr(expr) => Some(lower_expr(expr)),
        ast::JSXExpr::JSXEmptyExpr(_) => None,
    }
}

fn lower_attributes(attrs: &[ast::JSXAttrOrSpread]) -> Vec<Attribute> {
    attrs
        .iter()
        .filter_map(|attr| {
            let ast::JSXAttrOrSpread::JSXAttr(attr) = attr else {
                return None;
            };
            let ast::JSXAttrName::Ident(name) = &attr.name else {
                return None;
            };
            let value = attr.value.as_ref().map(|value| match value {
                ast::JSXAttrValue::Str(s) => str_value(s).map(Expr::Str).unwrap_or(Expr::Opaque),
                ast::JSXAttrValue::JSXExprContainer(container) => {
                    lower_jsx_expr(&container.expr).unwrap_or(Expr::Opaque)
                }
                _ => Expr::Opaque,
            });
            Some(Attribute::new(name.sym.to_string(), value))
        })
        .collect()
}

fn lower_children(children: &[ast::JSXElementChild]) -> Vec<Node> {
    children
        .iter()
        .map(|child| match child {
            ast::JSXElementChild::JSXText(text) => Node::Text(text.value.to_string()),
            ast::JSXElementChild::JSXExprContainer(container) => {
                Node::ExprContainer(lower_jsx_expr(&container.expr))
            }
            ast::JSXElementChild::JSXElement(element) => {
                Node::Element(lower_children(&element.children))
            }
            ast::JSXElementChild::JSXFragment(fragment) => {
                Node::Element(lower_children(&fragment.children))
            }
            ast::JSXElementChild::JSXSpreadChild(_) => Node::ExprContainer(Some(Expr::Opaque)),
        })
        .collect()
}

fn node_id(span: Span) -> NodeId {
    NodeId::new(span.lo.0, span.hi.0)
}

// =============================================================================
// Module scope: imports and constants
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum ImportBinding {
    /// `import { imported as local } from 'module'`
    Named { module: String, imported: String },
    /// `import * as local from 'module'`
    Namespace { module: String },
}

/// Import bindings and `const` initializers of one module.
///
/// Names bound more than once, or bound with `let`/`var`, are never treated
/// as constants.
#[derive(Debug, Default)]
pub struct ModuleScope {
    imports: HashMap<String, ImportBinding>,
    constants: HashMap<String, Option<Expr>>,
}

impl ModuleScope {
    pub fn collect(module: &ast::Module) -> Self {
        let mut scope = Self::default();
        module.visit_with(&mut scope);
        scope
    }

    fn bind(&mut self, name: String, init: Option<Expr>) {
        if self.constants.contains_key(&name) {
            self.constants.insert(name, None);
        } else {
            self.constants.insert(name, init);
        }
    }

    fn evaluate(&self, expr: &Expr, depth: usize) -> Option<Value> {
        if depth > MAX_EVAL_DEPTH {
            return None;
        }
        match expr {
            Expr::Str(s) => Some(Value::Str(s.clone())),
            Expr::Num(n) => Some(Value::Num(*n)),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Null => Some(Value::Null),
            Expr::Ident(name) => match self.constants.get(name) {
                Some(Some(init)) => self.evaluate(init, depth + 1),
                _ => None,
            },
            Expr::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(props) => props
                .iter()
                .map(|prop| Some((prop.name.clone()?, self.evaluate(&prop.value, depth + 1)?)))
                .collect::<Option<Vec<_>>>()
                .map(Value::Object),
            Expr::Concat(left, right) => {
                let left = self.evaluate(left, depth + 1)?;
                let right = self.evaluate(right, depth + 1)?;
                match (&left, &right) {
                    (Value::Num(a), Value::Num(b)) => Some(Value::Num(a + b)),
                    (Value::Str(_), _) | (_, Value::Str(_)) => {
                        Some(Value::Str(format!("{}{}", left.to_text()?, right.to_text()?)))
                    }
                    _ => None,
                }
            }
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (idx, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(idx) {
                        out.push_str(&self.evaluate(expr, depth + 1)?.to_text()?);
                    }
                }
                Some(Value::Str(out))
            }
            Expr::Function | Expr::Opaque => None,
        }
    }
}

impl Visit for ModuleScope {
    fn visit_import_decl(&mut self, import: &ast::ImportDecl) {
        if import.type_only {
            return;
        }
        let Some(module) = str_value(&import.src) else {
            return;
        };

        for specifier in &import.specifiers {
            match specifier {
                ast::ImportSpecifier::Named(named) if !named.is_type_only => {
                    let imported = match &named.imported {
                        Some(ast::ModuleExportName::Ident(ident)) => Some(ident.sym.to_string()),
                        Some(ast::ModuleExportName::Str(s)) => str_value(s),
                        None => Some(named.local.sym.to_string()),
                    };
                    if let Some(imported) = imported {
                        self.imports.insert(
                            named.local.sym.to_string(),
                            ImportBinding::Named {
                                module: module.clone(),
                                imported,
                            },
                        );
                    }
                }
                ast::ImportSpecifier::Namespace(namespace) => {
                    self.imports.insert(
                        namespace.local.sym.to_string(),
                        ImportBinding::Namespace {
                            module: module.clone(),
                        },
                    );
                }
                _ => {}
            }
        }
    }

    fn visit_var_decl(&mut self, decl: &ast::VarDecl) {
        let is_const = decl.kind == ast::VarDeclKind::Const;
        for declarator in &decl.decls {
            if let ast::Pat::Ident(binding) = &declarator.name {
                let init = if is_const {
                    declarator.init.as_ref().map(|init| lower_expr(init))
                } else {
                    None
                };
                self.bind(binding.id.sym.to_string(), init);
            }
        }
        decl.visit_children_with(self);
    }
}

impl ImportResolver for ModuleScope {
    fn references_import(&self, name: &Name, module: &str, imported: &str) -> bool {
        match name {
            Name::Ident(local) => matches!(
                self.imports.get(local),
                Some(ImportBinding::Named { module: m, imported: i }) if m == module && i == imported
            ),
            Name::Member { object, property } => {
                property == imported
                    && matches!(
                        self.imports.get(object),
                        Some(ImportBinding::Namespace { module: m }) if m == module
                    )
            }
            Name::Other => false,
        }
    }
}

impl StaticEvaluator for ModuleScope {
    fn try_evaluate(&self, expr: &Expr) -> Option<Value> {
        self.evaluate(expr, 0)
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Hands matching calls and components to the unit context.
/// Stops at the first fatal error.
struct ExtractVisitor<'a, 'c> {
    unit: &'a mut UnitContext<'c>,
    scope: &'a ModuleScope,
    source_map: &'a SourceMap,
    error: Option<ExtractError>,
}

impl ExtractVisitor<'_, '_> {
    fn location(&self, span: Span) -> SourceLocation {
        let loc = self.source_map.lookup_char_pos(span.lo);
        SourceLocation::new(self.unit.file(), loc.line, loc.col_display + 1)
    }

    fn record(&mut self, node: Node) {
        if let Err(err) = self.unit.visit(&node, self.scope, self.scope) {
            self.error = Some(err);
        }
    }
}

impl Visit for ExtractVisitor<'_, '_> {
    fn visit_call_expr(&mut self, call: &ast::CallExpr) {
        if self.error.is_some() {
            return;
        }

        let callee = callee_name(&call.callee);
        if self.unit.matcher().call_kind(&callee, self.scope).is_some() {
            let args = call
                .args
                .iter()
                .map(|arg| match arg.spread {
                    Some(_) => Expr::Opaque,
                    None => lower_expr(&arg.expr),
                })
                .collect();
            let node = Node::Call(Call {
                id: node_id(call.span),
                callee,
                args,
                location: self.location(call.span),
            });
            self.record(node);
            if self.error.is_some() {
                return;
            }
        }

        call.visit_children_with(self);
    }

    fn visit_jsx_element(&mut self, element: &ast::JSXElement) {
        if self.error.is_some() {
            return;
        }

        let opening = &element.opening;
        let name = jsx_name(&opening.name);
        if self.unit.matcher().component_kind(&name, self.scope).is_some() {
            let node = Node::ComponentOpen(Component {
                id: node_id(opening.span),
                name,
                attributes: lower_attributes(&opening.attrs),
                children: lower_children(&element.children),
                location: self.location(opening.span),
            });
            self.record(node);
            if self.error.is_some() {
                return;
            }
        }

        element.visit_children_with(self);
    }
}

// =============================================================================
// Drivers
// =============================================================================

fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") | Some("mts") | Some("cts") => Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: true,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        // JSX is commonly written in plain .js files
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            decorators: true,
            ..Default::default()
        }),
    }
}

/// Parse a module, or log a warning and return `None` on a syntax error
fn parse_module(source: &str, path: &Path, label: &str) -> Option<(Lrc<SourceMap>, ast::Module)> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Real(path.to_path_buf()).into(),
        source.to_string(),
    );

    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        syntax_for(path),
        Default::default(),
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    match parser.parse_module() {
        Ok(module) => Some((cm, module)),
        Err(e) => {
            let loc = cm.lookup_char_pos(e.span().lo);
            logging::warn(&format!(
                "Parse error in {}:{}:{}: {:?}",
                label,
                loc.line,
                loc.col_display + 1,
                e.kind()
            ));
            None
        }
    }
}

/// Run the pre phase and the traversal of one unit.
///
/// Returns `None` when the source does not parse.
pub fn collect_from_source<'c>(
    source: &str,
    path: &Path,
    label: &str,
    config: &'c Config,
) -> Result<Option<UnitContext<'c>>> {
    let Some((cm, module)) = parse_module(source, path, label) else {
        return Ok(None);
    };

    let scope = ModuleScope::collect(&module);
    let mut unit = UnitContext::pre(config, label);
    let mut visitor = ExtractVisitor {
        unit: &mut unit,
        scope: &scope,
        source_map: &cm,
        error: None,
    };
    module.visit_with(&mut visitor);

    if let Some(err) = visitor.error {
        return Err(err.into());
    }
    logging::debug(&format!(
        "{}: {} message(s), default namespace '{}'",
        label,
        unit.messages().len(),
        unit.namespaces().default_namespace()
    ));
    Ok(Some(unit))
}

/// Extract one unit from source text and merge it into the catalogs
pub fn extract_from_source<F: FileSystem>(
    source: &str,
    path: &Path,
    config: &Config,
    fs: &F,
    options: &ExtractOptions,
) -> Result<Option<UnitReport>> {
    let label = options.label(path);
    match collect_from_source(source, path, &label, config)? {
        Some(unit) => Ok(Some(unit.post(fs, &options.output_dir, options.dry_run)?)),
        None => Ok(None),
    }
}

/// Extract one unit from a file and merge it into the catalogs
pub fn extract_from_file<F: FileSystem>(
    path: &Path,
    config: &Config,
    fs: &F,
    options: &ExtractOptions,
) -> Result<Option<UnitReport>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    extract_from_source(&source, path, config, fs, options)
}

/// Expand `{a,b}` alternatives, which the glob crate does not support.
/// Groups may nest: `{a,{b,c}}` yields `a`, `b` and `c`.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut start = open + 1;
    let mut alternatives = Vec::new();
    let mut close = None;
    for (idx, ch) in pattern[open..].char_indices().map(|(i, c)| (open + i, c)) {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    alternatives.push(&pattern[start..idx]);
                    close = Some(idx);
                    break;
                }
            }
            ',' if depth == 1 => {
                alternatives.push(&pattern[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    alternatives
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{}{}{}", prefix, alt, suffix)))
        .collect()
}

/// Compile `input` or `ignore` globs after brace expansion
pub(crate) fn compile_patterns(patterns: &[String], kind: &str) -> Result<Vec<Pattern>> {
    let mut compiled = Vec::new();
    for pattern in patterns.iter().flat_map(|p| expand_braces(p)) {
        let matcher = Pattern::new(&pattern)
            .with_context(|| format!("Invalid {} glob pattern: {}", kind, pattern))?;
        compiled.push(matcher);
    }
    Ok(compiled)
}

/// Whether `path` matches one of `patterns`, as given or relative to the base
pub(crate) fn matches_any(path: &Path, patterns: &[Pattern], options: &ExtractOptions) -> bool {
    let label = options.label(path);
    patterns
        .iter()
        .any(|p| p.matches_path(path) || p.matches(&label))
}

/// Resolve input patterns into a sorted, de-duplicated file list
fn collect_input_paths(
    patterns: &[String],
    ignore: &[Pattern],
    options: &ExtractOptions,
) -> (Vec<PathBuf>, Vec<ExtractionError>) {
    let mut paths = BTreeSet::new();
    let mut errors = Vec::new();
    let base = Pattern::escape(&options.base_dir.display().to_string());

    for pattern in patterns.iter().flat_map(|p| expand_braces(p)) {
        let full_pattern = if Path::new(&pattern).is_absolute() || base.is_empty() {
            pattern.clone()
        } else {
            format!("{}/{}", base, pattern)
        };

        let entries = match glob::glob(&full_pattern) {
            Ok(entries) => entries,
            Err(e) => {
                errors.push(ExtractionError {
                    file_path: pattern,
                    message: format!("Invalid glob pattern: {}", e),
                });
                continue;
            }
        };

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if !matches_any(&path, ignore, options) {
                        paths.insert(path);
                    }
                }
                Ok(_) => {}
                Err(e) => errors.push(ExtractionError {
                    file_path: pattern.clone(),
                    message: format!("Glob error: {}", e),
                }),
            }
        }
    }

    (paths.into_iter().collect(), errors)
}

/// Extract every unit matched by the configured input patterns.
///
/// Units are processed in parallel; a failing unit is reported in
/// `errors` and does not stop the others.
pub fn extract_from_glob<F: FileSystem>(
    config: &Config,
    fs: &F,
    options: &ExtractOptions,
) -> Result<ExtractionResult> {
    use rayon::prelude::*;

    let ignore = compile_patterns(&config.ignore, "ignore")?;
    let (paths, mut errors) = collect_input_paths(&config.input, &ignore, options);
    logging::debug(&format!("Matched {} source file(s)", paths.len()));

    let outcomes: Vec<(PathBuf, Result<Option<UnitReport>>)> = paths
        .into_par_iter()
        .map(|path| {
            let outcome = extract_from_file(&path, config, fs, options);
            (path, outcome)
        })
        .collect();

    let mut units = Vec::new();
    let mut warning_count = 0;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(Some(report)) => {
                warning_count += report.conflicts.len();
                if report.message_count > 0 {
                    units.push(report);
                }
            }
            // Parse error, already logged
            Ok(None) => warning_count += 1,
            Err(e) => errors.push(ExtractionError {
                file_path: options.label(&path),
                message: format!("{:#}", e),
            }),
        }
    }

    Ok(ExtractionResult {
        units,
        warning_count,
        errors,
    })
}
