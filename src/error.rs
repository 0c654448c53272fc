use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Position of an extracted node, with the file relative to the working directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Fatal conditions that abort the current compiled unit
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{location}: value must be statically determinable for extraction ({detail})")]
    NonStaticExpression {
        location: SourceLocation,
        detail: String,
    },

    #[error("{location}: a function cannot be used as a namespace list; namespaces must be static strings")]
    UnsupportedDynamicNamespaceList { location: SourceLocation },

    #[error(
        "{location}: message '{identity}' has default value {current:?}, but {previous_location} declared {previous:?}"
    )]
    ConflictingDefaultValue {
        identity: String,
        previous: String,
        previous_location: SourceLocation,
        current: String,
        location: SourceLocation,
    },

    #[error("{location}: key '{key}' uses namespace prefix '{prefix}' that is not declared in this file")]
    UnregisteredNamespacePrefix {
        key: String,
        prefix: String,
        location: SourceLocation,
    },

    #[error("Malformed catalog file {}: {detail}", path.display())]
    MalformedExistingCatalog { path: PathBuf, detail: String },
}

impl ExtractError {
    pub(crate) fn non_static(location: &SourceLocation, detail: impl Into<String>) -> Self {
        Self::NonStaticExpression {
            location: location.clone(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::new("src/App.js", 12, 7);
        assert_eq!(loc.to_string(), "src/App.js:12:7");
    }

    #[test]
    fn test_conflict_message_names_both_locations() {
        let err = ExtractError::ConflictingDefaultValue {
            identity: "greeting".to_string(),
            previous: "Hello".to_string(),
            previous_location: SourceLocation::new("a.js", 1, 1),
            current: "Hi".to_string(),
            location: SourceLocation::new("a.js", 5, 3),
        };
        let message = err.to_string();
        assert!(message.starts_with("a.js:5:3"));
        assert!(message.contains("a.js:1:1"));
        assert!(message.contains("\"Hello\""));
        assert!(message.contains("\"Hi\""));
    }
}
