//! Node model read by the extraction engine.
//!
//! The front end lowers only the parts of the syntax tree the engine looks at:
//! call expressions, component opening tags with their bodies, and the
//! expressions appearing as arguments, attribute values and children.
//! Everything else becomes [`Expr::Opaque`].

use crate::error::SourceLocation;

/// Stable identity of a visited node within one compiled unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub lo: u32,
    pub hi: u32,
}

impl NodeId {
    pub fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }
}

/// Callee of a call or name of a component tag
#[derive(Debug, Clone, PartialEq)]
pub enum Name {
    /// `t`, `Trans`
    Ident(String),
    /// `i18n.t`, `ReactI18next.Trans`
    Member { object: String, property: String },
    /// Anything more complex (`this.props.t`, `f()()`)
    Other,
}

impl Name {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Dotted form used for heuristic function matching
    pub fn dotted(&self) -> Option<String> {
        match self {
            Name::Ident(name) => Some(name.clone()),
            Name::Member { object, property } => Some(format!("{}.{}", object, property)),
            Name::Other => None,
        }
    }
}

/// Expression sub-tree, kept unevaluated until a builder asks for its value
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<Property>),
    /// Binary `+`
    Concat(Box<Expr>, Box<Expr>),
    /// Template literal; `quasis.len() == exprs.len() + 1`
    Template { quasis: Vec<String>, exprs: Vec<Expr> },
    Function,
    Opaque,
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Expr::Function)
    }
}

/// Object literal property. `name` is `None` for computed keys and spreads.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: Option<String>,
    pub value: Expr,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }

    /// `{ count }`
    pub fn shorthand(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: Expr::Ident(name.clone()),
            name: Some(name),
        }
    }
}

/// Constant produced by static evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// String form used for keys, contexts and default values.
    /// Numbers and booleans follow JavaScript's `String(value)`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Num(n) => Some(number_to_text(*n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Script-style number text: `3`, `1.5`, `10000000000000000000`, `Infinity`
pub(crate) fn number_to_text(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", n)
    }
}

/// JSX attribute; `value` is `None` for bare attributes like `<Trans count />`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<Expr>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Option<Expr>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Component opening tag together with the body of its element
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: NodeId,
    pub name: Name,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub location: SourceLocation,
}

impl Component {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Call expression
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub id: NodeId,
    pub callee: Name,
    pub args: Vec<Expr>,
    pub location: SourceLocation,
}

/// Node kinds relevant to extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw JSX text
    Text(String),
    /// Nested element inside a component body; only its children matter
    Element(Vec<Node>),
    /// `{...}` child; `None` for an empty container such as `{/* note */}`
    ExprContainer(Option<Expr>),
    Call(Call),
    ComponentOpen(Component),
}

impl Node {
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Node::Call(call) => Some(call.id),
            Node::ComponentOpen(component) => Some(component.id),
            _ => None,
        }
    }
}
