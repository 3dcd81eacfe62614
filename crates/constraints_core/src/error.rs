//! Error types for constraint rules.
//!
//! Rule failures fall into three families that callers must keep apart:
//! declaration errors (the rule itself is malformed), evaluation errors (an
//! expression could not be evaluated or produced the wrong type) and
//! resource errors (a data source or query collaborator failed). None of
//! them is ever reported as an ordinary "invalid" result.

use std::fmt;
use thiserror::Error;

/// Boxed error used as the cause of declaration and resource errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Main error type for rule initialization and evaluation.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule declaration is malformed or cannot be applied
    #[error("{message}")]
    Declaration {
        /// Description of the declaration problem
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// An expression failed to evaluate
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// A data source, connection or query collaborator failed
    #[error("{message}")]
    Resource {
        /// Description of the failing operation
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },
}

impl RuleError {
    /// Creates a declaration error without a cause.
    pub fn declaration(message: impl Into<String>) -> Self {
        Self::Declaration {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a declaration error caused by another error.
    pub fn declaration_caused_by(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Declaration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a resource error caused by another error.
    pub fn resource(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Resource {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true for declaration errors.
    pub fn is_declaration(&self) -> bool {
        matches!(self, Self::Declaration { .. })
    }

    /// Returns true for resource errors.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }

    /// Returns the evaluation error, if this is one.
    pub fn as_evaluation(&self) -> Option<&EvaluationError> {
        match self {
            Self::Evaluation(err) => Some(err),
            _ => None,
        }
    }
}

/// Category of an expression evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    /// Expression text could not be parsed
    Syntax,
    /// A free identifier did not resolve to the target or an import
    UnresolvedName,
    /// A property or map key does not exist on the value
    PropertyNotFound,
    /// An import does not name a known package, class or member
    UnresolvedImport,
    /// An operand or argument had the wrong type
    Type,
    /// Overflow, division by zero and similar arithmetic failures
    Arithmetic,
    /// A function raised an error
    Function,
    /// The result of a boolean expression was not a boolean
    NotBoolean,
}

impl fmt::Display for EvaluationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax error",
            Self::UnresolvedName => "unresolved name",
            Self::PropertyNotFound => "property not found",
            Self::UnresolvedImport => "unresolved import",
            Self::Type => "type error",
            Self::Arithmetic => "arithmetic error",
            Self::Function => "function error",
            Self::NotBoolean => "not a boolean",
        };
        f.write_str(name)
    }
}

/// An expression evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EvaluationError {
    kind: EvaluationErrorKind,
    message: String,
}

impl EvaluationError {
    /// Creates a new evaluation error.
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Syntax, message)
    }

    /// Creates an unresolved name error.
    pub fn unresolved_name(name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::UnresolvedName,
            format!("identifier '{name}' cannot be resolved"),
        )
    }

    /// Creates a property not found error.
    pub fn property_not_found(property: &str, type_name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::PropertyNotFound,
            format!("property '{property}' not found on type {type_name}"),
        )
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Type, message)
    }

    /// Creates an arithmetic error.
    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Arithmetic, message)
    }

    /// Creates a "does not evaluate to Boolean" error for an expression.
    pub fn not_boolean(expression: &str) -> Self {
        Self::new(
            EvaluationErrorKind::NotBoolean,
            format!("Expression `{expression}` does not evaluate to Boolean"),
        )
    }

    /// Returns the error category.
    pub fn kind(&self) -> EvaluationErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_boolean_names_expression() {
        let err = EvaluationError::not_boolean("'a string'");
        assert_eq!(err.kind(), EvaluationErrorKind::NotBoolean);
        assert!(err.to_string().contains("'a string'"));
    }

    #[test]
    fn test_rule_error_keeps_cause() {
        let cause = EvaluationError::unresolved_name("other");
        let err = RuleError::declaration_caused_by("bad parameter", cause);
        assert!(err.is_declaration());
        let source = std::error::Error::source(&err).expect("cause should be kept");
        assert!(source.to_string().contains("other"));
    }

    #[test]
    fn test_evaluation_error_is_transparent() {
        let err = RuleError::from(EvaluationError::arithmetic("division by zero"));
        assert_eq!(err.to_string(), "arithmetic error: division by zero");
        assert!(err.as_evaluation().is_some());
    }
}
