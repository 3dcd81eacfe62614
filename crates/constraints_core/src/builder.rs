//! Builder pattern for creating rule declarations.
//!
//! This module provides ergonomic builders for constructing declarations
//! with a fluent API. Every builder starts from the same defaults a rule set
//! file would get.

use crate::{
    DateTimeRule, ExpressionRule, Imports, ParserType, QueryRule, ResolverStyle, RuleBinding,
    RuleSet, DEFAULT_DATE_TIME_MESSAGE, DEFAULT_EXPRESSION_MESSAGE, DEFAULT_QUERY_MESSAGE,
    DEFAULT_TARGET_NAME,
};

/// Builder for creating an `ExpressionRule`.
///
/// # Example
///
/// ```rust
/// use constraints_core::ExpressionRuleBuilder;
///
/// let rule = ExpressionRuleBuilder::new("self.checkin < self.checkout")
///     .when("self.checkin != null")
///     .node("checkout")
///     .message("checkout must follow checkin")
///     .build();
///
/// assert_eq!(rule.node, vec!["checkout".to_string()]);
/// ```
#[derive(Debug)]
pub struct ExpressionRuleBuilder {
    rule: ExpressionRule,
}

impl ExpressionRuleBuilder {
    /// Creates a builder for the given value expression.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            rule: ExpressionRule {
                value: value.into(),
                when: String::new(),
                target_name: DEFAULT_TARGET_NAME.to_string(),
                node: Vec::new(),
                message: DEFAULT_EXPRESSION_MESSAGE.to_string(),
                imports: Imports::default(),
                exceptional_value: None,
            },
        }
    }

    /// Sets the guard expression.
    pub fn when(mut self, when: impl Into<String>) -> Self {
        self.rule.when = when.into();
        self
    }

    /// Sets the name the target is bound to.
    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.rule.target_name = name.into();
        self
    }

    /// Appends a node to the violation path.
    pub fn node(mut self, name: impl Into<String>) -> Self {
        self.rule.node.push(name.into());
        self
    }

    /// Sets the violation message template.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.rule.message = message.into();
        self
    }

    /// Imports every class of a package.
    pub fn import_package(mut self, package: impl Into<String>) -> Self {
        self.rule.imports.packages.insert(package.into());
        self
    }

    /// Imports a class by its qualified name.
    pub fn import_class(mut self, class: impl Into<String>) -> Self {
        self.rule.imports.classes.insert(class.into());
        self
    }

    /// Imports a static member by its qualified name.
    pub fn import_static(mut self, member: impl Into<String>) -> Self {
        self.rule.imports.statics.insert(member.into());
        self
    }

    /// Sets the result used when the value expression raises an error.
    pub fn exceptional_value(mut self, value: bool) -> Self {
        self.rule.exceptional_value = Some(value);
        self
    }

    /// Builds the declaration.
    pub fn build(self) -> ExpressionRule {
        self.rule
    }
}

/// Builder for creating a `DateTimeRule`.
///
/// # Example
///
/// ```rust
/// use constraints_core::{DateTimeRuleBuilder, ParserType, ResolverStyle};
///
/// let rule = DateTimeRuleBuilder::new()
///     .pattern("uuuu-MM-dd")
///     .parser_type(ParserType::Structured)
///     .resolver_style(ResolverStyle::Strict)
///     .build();
///
/// assert_eq!(rule.patterns.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DateTimeRuleBuilder {
    patterns: Vec<String>,
    parser_type: ParserType,
    lenient: bool,
    resolver_style: ResolverStyle,
    message: Option<String>,
}

impl DateTimeRuleBuilder {
    /// Creates a builder without patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an accepted pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Sets the parser family.
    pub fn parser_type(mut self, parser_type: ParserType) -> Self {
        self.parser_type = parser_type;
        self
    }

    /// Sets legacy leniency.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Sets the structured resolver style.
    pub fn resolver_style(mut self, style: ResolverStyle) -> Self {
        self.resolver_style = style;
        self
    }

    /// Sets the violation message template.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builds the declaration.
    ///
    /// An empty pattern list is accepted here and rejected when a validator
    /// is initialized from the declaration.
    pub fn build(self) -> DateTimeRule {
        DateTimeRule {
            patterns: self.patterns,
            parser_type: self.parser_type,
            lenient: self.lenient,
            resolver_style: self.resolver_style,
            message: self
                .message
                .unwrap_or_else(|| DEFAULT_DATE_TIME_MESSAGE.to_string()),
        }
    }
}

/// Builder for creating a `QueryRule`.
///
/// # Example
///
/// ```rust
/// use constraints_core::QueryRuleBuilder;
///
/// let rule = QueryRuleBuilder::new("SELECT 1 FROM rooms WHERE id = ?")
///     .parameter("self.room_id")
///     .data_source("inventory")
///     .node("room_id")
///     .build();
///
/// assert_eq!(rule.parameters, vec!["self.room_id".to_string()]);
/// ```
#[derive(Debug)]
pub struct QueryRuleBuilder {
    rule: QueryRule,
}

impl QueryRuleBuilder {
    /// Creates a builder for the given query text.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            rule: QueryRule {
                value: value.into(),
                parameters: Vec::new(),
                when: String::new(),
                target_name: DEFAULT_TARGET_NAME.to_string(),
                data_source: String::new(),
                node: Vec::new(),
                message: DEFAULT_QUERY_MESSAGE.to_string(),
            },
        }
    }

    /// Appends a parameter expression for the next marker.
    pub fn parameter(mut self, expression: impl Into<String>) -> Self {
        self.rule.parameters.push(expression.into());
        self
    }

    /// Sets the guard expression.
    pub fn when(mut self, when: impl Into<String>) -> Self {
        self.rule.when = when.into();
        self
    }

    /// Sets the name the target is bound to.
    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.rule.target_name = name.into();
        self
    }

    /// Sets the data source name.
    pub fn data_source(mut self, name: impl Into<String>) -> Self {
        self.rule.data_source = name.into();
        self
    }

    /// Appends a node to the violation path.
    pub fn node(mut self, name: impl Into<String>) -> Self {
        self.rule.node.push(name.into());
        self
    }

    /// Sets the violation message template.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.rule.message = message.into();
        self
    }

    /// Builds the declaration.
    pub fn build(self) -> QueryRule {
        self.rule
    }
}

/// Builder for creating a `RuleSet`.
#[derive(Debug)]
pub struct RuleSetBuilder {
    name: String,
    description: Option<String>,
    rules: Vec<RuleBinding>,
}

impl RuleSetBuilder {
    /// Creates a builder for an empty rule set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rules: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a rule binding.
    pub fn rule(mut self, binding: RuleBinding) -> Self {
        self.rules.push(binding);
        self
    }

    /// Builds the rule set.
    pub fn build(self) -> RuleSet {
        RuleSet {
            name: self.name,
            description: self.description,
            rules: self.rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuleDeclaration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expression_builder_minimal() {
        let rule = ExpressionRuleBuilder::new("true").build();

        assert_eq!(rule.value, "true");
        assert_eq!(rule.target_name, "self");
        assert_eq!(rule.message, DEFAULT_EXPRESSION_MESSAGE);
        assert!(rule.node.is_empty());
        assert_eq!(rule.exceptional_value, None);
    }

    #[test]
    fn test_expression_builder_full() {
        let rule = ExpressionRuleBuilder::new("max(self.a, self.b) > 0")
            .when("self.a != null")
            .target_name("booking")
            .node("a")
            .node("b")
            .import_package("core.text")
            .import_class("core.math.Math")
            .import_static("core.math.Math.max")
            .exceptional_value(false)
            .build();

        assert_eq!(rule.target_name, "booking");
        assert_eq!(rule.node, vec!["a".to_string(), "b".to_string()]);
        assert!(rule.imports.packages.contains("core.text"));
        assert!(rule.imports.classes.contains("core.math.Math"));
        assert!(rule.imports.statics.contains("core.math.Math.max"));
        assert_eq!(rule.exceptional_value, Some(false));
    }

    #[test]
    fn test_query_builder_keeps_parameter_order() {
        let rule = QueryRuleBuilder::new("SELECT 1 FROM t WHERE a = ? AND b = ?")
            .parameter("self.a")
            .parameter("self.b")
            .build();

        assert_eq!(rule.parameters, vec!["self.a", "self.b"]);
        assert_eq!(rule.data_source, "");
        assert_eq!(rule.message, DEFAULT_QUERY_MESSAGE);
    }

    #[test]
    fn test_rule_set_builder() {
        let set = RuleSetBuilder::new("bookings")
            .description("Booking rules")
            .rule(RuleBinding::field(
                "checkin",
                DateTimeRuleBuilder::new().pattern("yyyy-MM-dd").build(),
            ))
            .build();

        assert_eq!(set.rules.len(), 1);
        assert!(matches!(set.rules[0].rule, RuleDeclaration::DateTime(_)));
    }
}
