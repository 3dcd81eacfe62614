//! Rule declaration types.
//!
//! A declaration is the immutable description of one constraint instance.
//! Declarations are plain configuration objects: they are built with the
//! builders in [`crate::builder`] or deserialized from a rule set file, and
//! are never mutated once a validator has been initialized from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name under which the validated value is bound in expressions.
pub const DEFAULT_TARGET_NAME: &str = "self";

/// Default message of expression rules.
pub const DEFAULT_EXPRESSION_MESSAGE: &str = "expression `{value}` didn't evaluate to true";

/// Default message of query rules.
pub const DEFAULT_QUERY_MESSAGE: &str = "statement `{value}` did not return any results";

/// Default message of date/time rules.
pub const DEFAULT_DATE_TIME_MESSAGE: &str = "value does not match any of the patterns {patterns}";

fn default_target_name() -> String {
    DEFAULT_TARGET_NAME.to_string()
}

fn default_expression_message() -> String {
    DEFAULT_EXPRESSION_MESSAGE.to_string()
}

fn default_query_message() -> String {
    DEFAULT_QUERY_MESSAGE.to_string()
}

fn default_date_time_message() -> String {
    DEFAULT_DATE_TIME_MESSAGE.to_string()
}

/// Symbols imported into an expression namespace.
///
/// Identifiers are dotted names. A package import makes every class of the
/// package available by its simple name, a class import makes one class
/// available by its simple name, and a static import makes one member of a
/// class callable without qualification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Imports {
    /// Imported packages, e.g. `core.math`
    pub packages: BTreeSet<String>,
    /// Imported classes, e.g. `core.math.Math`
    pub classes: BTreeSet<String>,
    /// Imported static members, e.g. `core.math.Math.max`
    pub statics: BTreeSet<String>,
}

impl Imports {
    /// Returns true if nothing is imported.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.classes.is_empty() && self.statics.is_empty()
    }
}

/// A rule evaluating a boolean expression against the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRule {
    /// Expression that must evaluate to `true`
    pub value: String,

    /// Guard expression; the rule only applies when it evaluates to `true`
    #[serde(default)]
    pub when: String,

    /// Name the target is bound to in expressions
    #[serde(default = "default_target_name")]
    pub target_name: String,

    /// Node names forming the violation path, in order
    #[serde(default)]
    pub node: Vec<String>,

    /// Violation message template
    #[serde(default = "default_expression_message")]
    pub message: String,

    /// Symbols imported into the expression namespace
    #[serde(default)]
    pub imports: Imports,

    /// Result substituted when evaluating `value` raises an error
    #[serde(default)]
    pub exceptional_value: Option<bool>,
}

/// Parsing engine used by date/time rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserType {
    /// Calendar-style parser with a lenient/non-lenient switch
    #[default]
    Legacy,
    /// Resolving parser governed by a [`ResolverStyle`]
    Structured,
}

/// How parsed date/time components are resolved by the structured parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStyle {
    /// Reject any invalid or ambiguous combination
    Strict,
    /// Clamp day-of-month to the month length, reject other invalid values
    #[default]
    Smart,
    /// Roll out-of-range components over
    Lenient,
}

/// A rule requiring text values to parse with at least one date/time pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeRule {
    /// Accepted patterns, tried in order
    pub patterns: Vec<String>,

    /// Parser family
    #[serde(default)]
    pub parser_type: ParserType,

    /// Whether the legacy parser rolls out-of-range values over
    #[serde(default)]
    pub lenient: bool,

    /// Resolver style of the structured parser
    #[serde(default)]
    pub resolver_style: ResolverStyle,

    /// Violation message template
    #[serde(default = "default_date_time_message")]
    pub message: String,
}

/// A rule executing a read-only query that must return at least one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRule {
    /// Query text with positional `?` parameter markers
    pub value: String,

    /// Expressions deriving the parameter values, in marker order
    #[serde(default)]
    pub parameters: Vec<String>,

    /// Guard expression; the query only runs when it evaluates to `true`
    #[serde(default)]
    pub when: String,

    /// Name the target is bound to in expressions
    #[serde(default = "default_target_name")]
    pub target_name: String,

    /// Data source name; empty selects the default data source
    #[serde(default)]
    pub data_source: String,

    /// Node names forming the violation path, in order
    #[serde(default)]
    pub node: Vec<String>,

    /// Violation message template
    #[serde(default = "default_query_message")]
    pub message: String,
}

/// Any rule declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDeclaration {
    /// Boolean expression rule
    Expression(ExpressionRule),
    /// Date/time pattern rule
    DateTime(DateTimeRule),
    /// Query rule
    Query(QueryRule),
}

impl RuleDeclaration {
    /// Returns the declaration kind as used in rule set files.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleDeclaration::Expression(_) => "expression",
            RuleDeclaration::DateTime(_) => "date_time",
            RuleDeclaration::Query(_) => "query",
        }
    }
}

impl From<ExpressionRule> for RuleDeclaration {
    fn from(rule: ExpressionRule) -> Self {
        RuleDeclaration::Expression(rule)
    }
}

impl From<DateTimeRule> for RuleDeclaration {
    fn from(rule: DateTimeRule) -> Self {
        RuleDeclaration::DateTime(rule)
    }
}

impl From<QueryRule> for RuleDeclaration {
    fn from(rule: QueryRule) -> Self {
        RuleDeclaration::Query(rule)
    }
}

/// A declaration together with the part of the target it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBinding {
    /// Property of the target the rule validates; the whole target if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Validate every element of a list field separately
    #[serde(default)]
    pub each: bool,

    /// The rule itself
    #[serde(flatten)]
    pub rule: RuleDeclaration,
}

impl RuleBinding {
    /// Binds a rule to the whole target.
    pub fn target(rule: impl Into<RuleDeclaration>) -> Self {
        Self {
            field: None,
            each: false,
            rule: rule.into(),
        }
    }

    /// Binds a rule to one property of the target.
    pub fn field(field: impl Into<String>, rule: impl Into<RuleDeclaration>) -> Self {
        Self {
            field: Some(field.into()),
            each: false,
            rule: rule.into(),
        }
    }

    /// Binds a rule to every element of a list property.
    pub fn each(field: impl Into<String>, rule: impl Into<RuleDeclaration>) -> Self {
        Self {
            field: Some(field.into()),
            each: true,
            rule: rule.into(),
        }
    }
}

/// A named collection of rule bindings, typically loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rule set name
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rules, evaluated in order
    #[serde(default)]
    pub rules: Vec<RuleBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expression_rule_defaults() {
        let rule: ExpressionRule = serde_json::from_str(r#"{"value": "true"}"#).unwrap();

        assert_eq!(rule.target_name, "self");
        assert_eq!(rule.when, "");
        assert!(rule.node.is_empty());
        assert!(rule.imports.is_empty());
        assert_eq!(rule.exceptional_value, None);
        assert_eq!(rule.message, DEFAULT_EXPRESSION_MESSAGE);
    }

    #[test]
    fn test_date_time_rule_defaults() {
        let rule: DateTimeRule =
            serde_json::from_str(r#"{"patterns": ["yyyy-MM-dd"]}"#).unwrap();

        assert_eq!(rule.parser_type, ParserType::Legacy);
        assert!(!rule.lenient);
        assert_eq!(rule.resolver_style, ResolverStyle::Smart);
    }

    #[test]
    fn test_binding_flattens_tagged_rule() {
        let binding: RuleBinding = serde_json::from_str(
            r#"{"field": "checkin", "kind": "date_time", "patterns": ["uuuu-MM-dd"],
                "parser_type": "structured", "resolver_style": "strict"}"#,
        )
        .unwrap();

        assert_eq!(binding.field.as_deref(), Some("checkin"));
        assert!(!binding.each);
        match binding.rule {
            RuleDeclaration::DateTime(rule) => {
                assert_eq!(rule.parser_type, ParserType::Structured);
                assert_eq!(rule.resolver_style, ResolverStyle::Strict);
            }
            other => panic!("unexpected rule kind {}", other.kind()),
        }
    }
}
