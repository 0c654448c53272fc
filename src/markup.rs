//! Renders a translation component body into an i18next default value.
//!
//! Nested elements and object-literal expressions become numbered tags based
//! on their position among the non-empty children:
//! `Hello <strong>world</strong>{{ name, format }}` renders to
//! `Hello <1>world</1><2>{{name}}</2>`.

use regex::Regex;
use std::sync::OnceLock;

use crate::node::{Expr, Node};

/// Property ignored when choosing the interpolation name
const FORMAT_PROP: &str = "format";

/// Strips one leading and one trailing line break together with the
/// whitespace around it. Text spanning several lines is left untouched.
static JSX_TEXT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_jsx_text_regex() -> &'static Regex {
    JSX_TEXT_REGEX.get_or_init(|| {
        Regex::new(r"^(?:\s*(\n|\r)\s*)?(.*)(?:\s*(\n|\r)\s*)?$")
            .expect("JSX_TEXT_REGEX pattern is invalid - this is a bug")
    })
}

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Tag(Vec<Segment>),
    Interpolation(String),
    /// Keeps its position but renders nothing
    Unknown,
}

/// Render component children into a default value string
pub fn render_message(children: &[Node]) -> String {
    format_segments(&parse_segments(children))
}

/// Trim JSX text the way the message renderer does
pub fn clean_jsx_text(text: &str) -> String {
    get_jsx_text_regex().replace(text, "${2}").into_owned()
}

fn parse_segments(children: &[Node]) -> Vec<Segment> {
    children
        .iter()
        .filter_map(|child| match child {
            Node::Text(text) => Some(Segment::Text(clean_jsx_text(text))),
            Node::Element(children) => Some(Segment::Tag(parse_segments(children))),
            Node::ExprContainer(None) => None,
            Node::ExprContainer(Some(Expr::Object(props))) => {
                let name = props
                    .iter()
                    .filter_map(|prop| prop.name.as_deref())
                    .find(|name| *name != FORMAT_PROP);
                Some(Segment::Interpolation(
                    name.map(|name| format!("{{{{{}}}}}", name))
                        .unwrap_or_default(),
                ))
            }
            Node::ExprContainer(Some(_)) => Some(Segment::Unknown),
            Node::Call(_) | Node::ComponentOpen(_) => Some(Segment::Unknown),
        })
        .filter(|segment| !matches!(segment, Segment::Text(content) if content.is_empty()))
        .collect()
}

fn format_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Text(content) => out.push_str(content),
            Segment::Interpolation(content) => {
                out.push_str(&format!("<{}>{}</{}>", index, content, index));
            }
            Segment::Tag(children) => {
                out.push_str(&format!(
                    "<{}>{}</{}>",
                    index,
                    format_segments(children),
                    index
                ));
            }
            Segment::Unknown => {}
        }
    }
    out
}
