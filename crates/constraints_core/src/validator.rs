//! Validation traits and report types.
//!
//! This module defines the trait every rule kind implements once it has been
//! initialized from its declaration, and the report produced when a whole
//! rule set is evaluated against a target.

use crate::{ConstraintContext, Result, Value, Violation};

/// Core trait for initialized rule validators.
///
/// A validator is built once from an immutable declaration and may then be
/// shared between threads and evaluated any number of times.
///
/// # Example
///
/// ```rust
/// use constraints_core::{ConstraintContext, ConstraintValidator, Result, Value};
///
/// struct NotNull;
///
/// impl ConstraintValidator for NotNull {
///     fn message(&self) -> &str {
///         "must not be null"
///     }
///
///     fn is_valid(&self, value: &Value, _context: &mut ConstraintContext) -> Result<bool> {
///         Ok(!value.is_null())
///     }
/// }
///
/// let violations = NotNull.validate(&Value::Null).unwrap();
/// assert_eq!(violations[0].message, "must not be null");
/// ```
pub trait ConstraintValidator: Send + Sync {
    /// Returns the interpolated violation message of this rule.
    fn message(&self) -> &str;

    /// Decides whether `value` satisfies the rule.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the rule holds or does not apply, `Ok(false)` if it is
    /// violated, or a `RuleError` if it could not be evaluated. Custom
    /// violations are reported through `context`.
    fn is_valid(&self, value: &Value, context: &mut ConstraintContext) -> Result<bool>;

    /// Evaluates the rule against a root value and collects its violations.
    ///
    /// Default implementation creates a fresh context carrying
    /// [`message`](Self::message) as the default violation.
    fn validate(&self, value: &Value) -> Result<Vec<Violation>> {
        let mut context = ConstraintContext::new(self.message());
        let valid = self.is_valid(value, &mut context)?;
        Ok(context.into_violations(valid))
    }
}

/// Report of a rule set evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Whether every rule held
    pub passed: bool,

    /// Violations in rule order
    pub violations: Vec<Violation>,

    /// Evaluation statistics
    pub stats: ValidationStats,
}

/// Statistics about a rule set evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationStats {
    /// Number of rules evaluated
    pub rules_evaluated: usize,

    /// Number of values checked; `each` rules count every element
    pub elements_checked: usize,

    /// Number of violations reported
    pub violations: usize,

    /// Evaluation duration in milliseconds
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Creates an empty, passing report.
    pub fn success() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
            stats: ValidationStats::default(),
        }
    }

    /// Adds violations to the report.
    pub fn add_violations(&mut self, violations: impl IntoIterator<Item = Violation>) {
        let before = self.violations.len();
        self.violations.extend(violations);
        let added = self.violations.len() - before;
        if added > 0 {
            self.passed = false;
            self.stats.violations += added;
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathNode;
    use pretty_assertions::assert_eq;

    struct NodeReporting;

    impl ConstraintValidator for NodeReporting {
        fn message(&self) -> &str {
            "custom"
        }

        fn is_valid(&self, _value: &Value, context: &mut ConstraintContext) -> Result<bool> {
            context.disable_default_violation();
            context
                .build_violation(self.message())
                .add_property_node("field")
                .finish();
            Ok(false)
        }
    }

    #[test]
    fn test_validate_collects_custom_violations() {
        let violations = NodeReporting.validate(&Value::Null).unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, vec![PathNode::property("field")]);
    }

    #[test]
    fn test_report_add_violations() {
        let mut report = ValidationReport::success();
        report.add_violations(Vec::new());
        assert!(report.passed);

        report.add_violations(vec![Violation {
            message: "bad".to_string(),
            path: Vec::new(),
        }]);
        assert!(!report.passed);
        assert_eq!(report.stats.violations, 1);
    }
}
