//! Expression rules: a boolean expression evaluated against the target.

use crate::boolean::{evaluate_boolean, evaluate_guard};
use crate::cel_engine::CelEngine;
use crate::context::{EvaluationContext, ExpressionEngine};
use crate::path::report_violation;
use constraints_core::{
    ConstraintContext, ConstraintValidator, ExpressionRule, Result, RuleError, Value, format_list,
    interpolate,
};
use std::sync::Arc;
use tracing::debug;

/// Initialized expression rule.
///
/// # Example
///
/// ```rust
/// use constraints_core::{ConstraintValidator, ExpressionRuleBuilder, Value};
/// use constraints_validator::ExpressionValidator;
///
/// let rule = ExpressionRuleBuilder::new("self.checkIn < self.checkOut")
///     .node("checkOut")
///     .message("check-out must follow check-in")
///     .build();
/// let validator = ExpressionValidator::initialize(rule).unwrap();
///
/// let stay: Value = [("checkIn", Value::Int(5)), ("checkOut", Value::Int(3))]
///     .into_iter()
///     .collect();
/// let violations = validator.validate(&stay).unwrap();
///
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].path_string(), "checkOut");
/// ```
pub struct ExpressionValidator {
    rule: ExpressionRule,
    engine: Arc<dyn ExpressionEngine>,
    message: String,
}

impl ExpressionValidator {
    /// Initializes the rule with the built-in [`CelEngine`].
    pub fn initialize(rule: ExpressionRule) -> Result<Self> {
        Self::initialize_with(rule, Arc::new(CelEngine::new()))
    }

    /// Initializes the rule with a specific expression engine.
    ///
    /// Fails if the value expression is empty or an import does not resolve.
    pub fn initialize_with(
        rule: ExpressionRule,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Result<Self> {
        if rule.value.trim().is_empty() {
            return Err(RuleError::declaration(
                "Expression rule requires a non-empty value expression",
            ));
        }

        engine.check_imports(&rule.imports).map_err(|e| {
            RuleError::declaration_caused_by(
                format!("Invalid imports for expression `{}`", rule.value),
                e,
            )
        })?;

        let node = format_list(&rule.node);
        let message = interpolate(
            &rule.message,
            &[
                ("value", rule.value.as_str()),
                ("when", rule.when.as_str()),
                ("node", node.as_str()),
                ("targetName", rule.target_name.as_str()),
            ],
        );

        debug!(
            expression = %rule.value,
            when = %rule.when,
            target_name = %rule.target_name,
            "Initialized expression rule"
        );

        Ok(Self {
            rule,
            engine,
            message,
        })
    }

    /// Returns the declaration this validator was built from.
    pub fn rule(&self) -> &ExpressionRule {
        &self.rule
    }
}

impl ConstraintValidator for ExpressionValidator {
    fn message(&self) -> &str {
        &self.message
    }

    fn is_valid(&self, value: &Value, context: &mut ConstraintContext) -> Result<bool> {
        let evaluation =
            EvaluationContext::for_target(&self.rule.target_name, value, &self.rule.imports);

        if !evaluate_guard(self.engine.as_ref(), &self.rule.when, &evaluation)? {
            debug!(when = %self.rule.when, "Guard is false, skipping expression rule");
            return Ok(true);
        }

        let valid = evaluate_boolean(
            self.engine.as_ref(),
            &self.rule.value,
            &evaluation,
            self.rule.exceptional_value,
        )?;

        if !valid {
            report_violation(context, &self.message, &self.rule.node);
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constraints_core::{EvaluationErrorKind, ExpressionRuleBuilder, PathNode};
    use pretty_assertions::assert_eq;

    fn reservation(nights: i64) -> Value {
        [("nights", Value::Int(nights)), ("guest", Value::from("Ada"))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_literal_expressions() {
        let valid = ExpressionValidator::initialize(ExpressionRuleBuilder::new("true").build())
            .unwrap();
        assert!(valid.validate(&Value::Null).unwrap().is_empty());

        let invalid = ExpressionValidator::initialize(ExpressionRuleBuilder::new("false").build())
            .unwrap();
        let violations = invalid.validate(&Value::Null).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "expression `false` didn't evaluate to true");
        assert!(violations[0].path.is_empty());
    }

    #[test]
    fn test_string_literal_is_not_boolean() {
        let validator =
            ExpressionValidator::initialize(ExpressionRuleBuilder::new("'abc'").build()).unwrap();
        let err = validator.validate(&Value::Null).unwrap_err();

        assert_eq!(
            err.as_evaluation().map(|e| e.kind()),
            Some(EvaluationErrorKind::NotBoolean)
        );
        assert!(err.to_string().contains("'abc'"));
    }

    #[test]
    fn test_guard_false_skips_value() {
        let rule = ExpressionRuleBuilder::new("self.unknown > 0")
            .when("self.nights > 10")
            .build();
        let validator = ExpressionValidator::initialize(rule).unwrap();
        assert!(validator.validate(&reservation(2)).unwrap().is_empty());
        assert!(validator.validate(&reservation(12)).is_err());
    }

    #[test]
    fn test_exceptional_value() {
        let target = reservation(2);
        let build = |fallback: Option<bool>| {
            let mut builder = ExpressionRuleBuilder::new("self.unknown > 0");
            if let Some(fallback) = fallback {
                builder = builder.exceptional_value(fallback);
            }
            ExpressionValidator::initialize(builder.build()).unwrap()
        };

        assert!(build(Some(true)).validate(&target).unwrap().is_empty());
        assert_eq!(build(Some(false)).validate(&target).unwrap().len(), 1);

        let err = build(None).validate(&target).unwrap_err();
        assert_eq!(
            err.as_evaluation().map(|e| e.kind()),
            Some(EvaluationErrorKind::PropertyNotFound)
        );
    }

    #[test]
    fn test_custom_target_name() {
        let rule = ExpressionRuleBuilder::new("booking.nights >= 1")
            .target_name("booking")
            .build();
        let validator = ExpressionValidator::initialize(rule).unwrap();
        assert!(validator.validate(&reservation(1)).unwrap().is_empty());

        let rule = ExpressionRuleBuilder::new("self.nights >= 1")
            .target_name("booking")
            .build();
        let err = ExpressionValidator::initialize(rule)
            .unwrap()
            .validate(&reservation(1))
            .unwrap_err();
        assert_eq!(
            err.as_evaluation().map(|e| e.kind()),
            Some(EvaluationErrorKind::UnresolvedName)
        );
    }

    #[test]
    fn test_node_path() {
        let rule = ExpressionRuleBuilder::new("self.nights < 7")
            .node("a")
            .node("b")
            .message("{value} failed at {node}")
            .build();
        let validator = ExpressionValidator::initialize(rule).unwrap();

        let violations = validator.validate(&reservation(9)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "self.nights < 7 failed at [a, b]");
        assert_eq!(
            violations[0].path,
            vec![PathNode::property("a"), PathNode::property("b")]
        );
    }

    #[test]
    fn test_declaration_errors() {
        let err = ExpressionValidator::initialize(ExpressionRuleBuilder::new(" ").build())
            .err()
            .unwrap();
        assert!(err.is_declaration());

        let rule = ExpressionRuleBuilder::new("true")
            .import_package("core.missing")
            .build();
        let err = ExpressionValidator::initialize(rule).err().unwrap();
        assert!(err.is_declaration());
        assert!(err.to_string().contains("Invalid imports"));
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let rule = ExpressionRuleBuilder::new("self.nights < 7").node("nights").build();
        let validator = ExpressionValidator::initialize(rule).unwrap();
        let target = reservation(8);

        let first = validator.validate(&target).unwrap();
        let second = validator.validate(&target).unwrap();
        assert_eq!(first, second);
    }
}
