//! Date/time pattern rules.
//!
//! A text value is valid when at least one of the declared patterns parses
//! it. Two parser families are available, selected per rule:
//!
//! | Family       | Strictness knob                    | Input consumption      |
//! |--------------|------------------------------------|------------------------|
//! | `legacy`     | `lenient` flag                     | trailing text ignored  |
//! | `structured` | `strict` / `smart` / `lenient`     | whole input required   |

mod legacy;
mod pattern;
mod structured;

pub use pattern::{CompiledPattern, PatternError};

use constraints_core::{
    ConstraintContext, ConstraintValidator, DateTimeRule, ParserType, Result, RuleError, Value,
    format_list, interpolate,
};
use tracing::{debug, trace};

/// Initialized date/time rule holding its compiled patterns.
///
/// # Example
///
/// ```rust
/// use constraints_core::{ConstraintValidator, DateTimeRuleBuilder, Value};
/// use constraints_validator::DateTimeValidator;
///
/// let rule = DateTimeRuleBuilder::new()
///     .pattern("yyyy-MM-dd")
///     .pattern("dd/MM/yyyy")
///     .build();
/// let validator = DateTimeValidator::initialize(rule).unwrap();
///
/// assert!(validator.validate(&Value::from("24/12/2018")).unwrap().is_empty());
/// assert_eq!(validator.validate(&Value::from("Christmas")).unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct DateTimeValidator {
    rule: DateTimeRule,
    patterns: Vec<CompiledPattern>,
    message: String,
}

impl DateTimeValidator {
    /// Compiles every pattern of the rule.
    ///
    /// Fails on an empty pattern list or on the first pattern that does not
    /// compile.
    pub fn initialize(rule: DateTimeRule) -> Result<Self> {
        if rule.patterns.is_empty() {
            return Err(RuleError::declaration(
                "At least one DateFormat pattern must be provided.",
            ));
        }

        let patterns = rule
            .patterns
            .iter()
            .map(|pattern| {
                compile(pattern, &rule).map_err(|e| {
                    RuleError::declaration_caused_by(
                        format!("Invalid format pattern `{pattern}`"),
                        e,
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let listed = format_list(&rule.patterns);
        let message = interpolate(&rule.message, &[("patterns", listed.as_str())]);

        debug!(
            patterns = %listed,
            parser_type = ?rule.parser_type,
            "Initialized date/time rule"
        );

        Ok(Self {
            rule,
            patterns,
            message,
        })
    }

    /// Returns the declaration this validator was built from.
    pub fn rule(&self) -> &DateTimeRule {
        &self.rule
    }

    /// Compiled patterns in the order they are tried.
    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }
}

fn compile(
    pattern: &str,
    rule: &DateTimeRule,
) -> std::result::Result<CompiledPattern, PatternError> {
    match rule.parser_type {
        ParserType::Legacy => CompiledPattern::legacy(pattern, rule.lenient),
        ParserType::Structured => CompiledPattern::structured(pattern, rule.resolver_style),
    }
}

impl ConstraintValidator for DateTimeValidator {
    fn message(&self) -> &str {
        &self.message
    }

    fn is_valid(&self, value: &Value, _context: &mut ConstraintContext) -> Result<bool> {
        let text = match value {
            Value::Null => return Ok(true),
            Value::String(text) => text,
            other => {
                return Err(RuleError::declaration(format!(
                    "Date/time rule cannot be applied to a value of type {}",
                    other.type_name()
                )));
            }
        };

        if text.is_empty() {
            return Ok(true);
        }

        for pattern in &self.patterns {
            let matched = pattern.matches(text);
            trace!(pattern = %pattern, matched, "Tried date/time pattern");
            if matched {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constraints_core::{DateTimeRuleBuilder, ResolverStyle};
    use pretty_assertions::assert_eq;

    fn legacy(patterns: &[&str], lenient: bool) -> DateTimeValidator {
        let mut builder = DateTimeRuleBuilder::new().lenient(lenient);
        for pattern in patterns {
            builder = builder.pattern(*pattern);
        }
        DateTimeValidator::initialize(builder.build()).unwrap()
    }

    fn structured(patterns: &[&str], style: ResolverStyle) -> DateTimeValidator {
        let mut builder = DateTimeRuleBuilder::new()
            .parser_type(ParserType::Structured)
            .resolver_style(style);
        for pattern in patterns {
            builder = builder.pattern(*pattern);
        }
        DateTimeValidator::initialize(builder.build()).unwrap()
    }

    fn accepts(validator: &DateTimeValidator, text: &str) -> bool {
        validator.validate(&Value::from(text)).unwrap().is_empty()
    }

    #[test]
    fn test_zero_patterns() {
        let err = DateTimeValidator::initialize(DateTimeRuleBuilder::new().build()).unwrap_err();
        assert!(err.is_declaration());
        assert!(err.to_string().contains("At least one DateFormat pattern"));
    }

    #[test]
    fn test_invalid_pattern_is_named() {
        for parser_type in [ParserType::Legacy, ParserType::Structured] {
            let rule = DateTimeRuleBuilder::new()
                .pattern("yyyy-MM-dd")
                .pattern(" NOT A VALID DATE PATTERN ")
                .parser_type(parser_type)
                .build();
            let err = DateTimeValidator::initialize(rule).unwrap_err();
            assert!(err.is_declaration());
            assert_eq!(
                err.to_string(),
                "Invalid format pattern ` NOT A VALID DATE PATTERN `"
            );
        }
    }

    #[test]
    fn test_null_and_empty_are_valid() {
        let validator = legacy(&["yyyy-MM-dd"], false);
        assert!(validator.validate(&Value::Null).unwrap().is_empty());
        assert!(accepts(&validator, ""));
    }

    #[test]
    fn test_non_text_target_is_declaration_error() {
        let validator = legacy(&["yyyy-MM-dd"], false);
        let err = validator.validate(&Value::Int(20180101)).unwrap_err();
        assert!(err.is_declaration());
    }

    #[test]
    fn test_legacy_leniency() {
        assert!(!accepts(&legacy(&["yyyy-MM-dd"], false), "2018-02-29"));
        assert!(accepts(&legacy(&["yyyy-MM-dd"], true), "2018-02-29"));
        assert!(accepts(&legacy(&["yyyy-MM-dd"], false), "2016-02-29"));
    }

    #[test]
    fn test_structured_year_of_era_asymmetry() {
        assert!(accepts(&structured(&["yyyy-MM-dd"], ResolverStyle::Strict), "2018-02-29"));
        assert!(!accepts(&structured(&["uuuu-MM-dd"], ResolverStyle::Strict), "2018-02-29"));
        assert!(accepts(&structured(&["uuuu-MM-dd"], ResolverStyle::Smart), "2018-02-29"));
        assert!(!accepts(&structured(&["uuuu-MM-dd"], ResolverStyle::Smart), "2018-02-32"));
        assert!(accepts(&structured(&["uuuu-MM-dd"], ResolverStyle::Lenient), "2018-02-32"));
    }

    #[test]
    fn test_any_pattern_matches() {
        let validator = legacy(&["dd.MM.yyyy", "yyyy-MM-dd"], false);
        assert!(accepts(&validator, "2018-03-01"));
        assert!(accepts(&validator, "01.03.2018"));
        assert!(!accepts(&validator, "2018/03/01"));
    }

    #[test]
    fn test_message_lists_patterns() {
        let validator = legacy(&["yyyy", "MM"], false);
        let violations = validator.validate(&Value::from("never")).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "value does not match any of the patterns [yyyy, MM]"
        );
    }

    #[test]
    fn test_patterns_keep_declared_order() {
        let validator = structured(&["uuuu", "HH:mm"], ResolverStyle::Smart);
        let sources: Vec<&str> = validator.patterns().iter().map(|p| p.pattern()).collect();
        assert_eq!(sources, vec!["uuuu", "HH:mm"]);
    }
}
