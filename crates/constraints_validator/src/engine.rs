//! Rule set engine.
//!
//! This module provides the `RuleEngine` that initializes every rule of a
//! [`RuleSet`] once and evaluates the whole set against targets, producing a
//! [`ValidationReport`].

use crate::cel_engine::CelEngine;
use crate::context::ExpressionEngine;
use crate::query::{DataSourceRegistry, DataSources};
use crate::{DateTimeValidator, ExpressionValidator, QueryValidator};
use constraints_core::{
    ConstraintContext, ConstraintValidator, PathNode, Result, RuleDeclaration, RuleError, RuleSet,
    ValidationReport, ValidationStats, Value, Violation,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

static NULL: Value = Value::Null;

/// Collaborators shared by every rule of an engine.
#[derive(Clone)]
pub struct Services {
    /// Engine evaluating guards, expressions and query parameters
    pub engine: Arc<dyn ExpressionEngine>,

    /// Registry query rules resolve their data source from
    pub registry: Arc<dyn DataSourceRegistry>,
}

impl Services {
    /// Creates services with the built-in [`CelEngine`] and no data sources.
    pub fn new() -> Self {
        Self {
            engine: Arc::new(CelEngine::new()),
            registry: Arc::new(DataSources::new()),
        }
    }

    /// Replaces the expression engine.
    pub fn with_engine(mut self, engine: Arc<dyn ExpressionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Replaces the data-source registry.
    pub fn with_registry(mut self, registry: Arc<dyn DataSourceRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Initializes a single declaration into its validator.
pub fn initialize_rule(
    declaration: &RuleDeclaration,
    services: &Services,
) -> Result<Box<dyn ConstraintValidator>> {
    Ok(match declaration {
        RuleDeclaration::Expression(rule) => Box::new(ExpressionValidator::initialize_with(
            rule.clone(),
            services.engine.clone(),
        )?),
        RuleDeclaration::DateTime(rule) => Box::new(DateTimeValidator::initialize(rule.clone())?),
        RuleDeclaration::Query(rule) => Box::new(QueryValidator::initialize_with(
            rule.clone(),
            services.engine.clone(),
            services.registry.as_ref(),
        )?),
    })
}

struct CompiledRule {
    field: Option<String>,
    each: bool,
    kind: &'static str,
    validator: Box<dyn ConstraintValidator>,
}

/// An initialized rule set.
///
/// # Example
///
/// ```rust
/// use constraints_core::{DateTimeRuleBuilder, RuleBinding, RuleSetBuilder, Value};
/// use constraints_validator::{RuleEngine, Services};
///
/// let rules = RuleSetBuilder::new("guests")
///     .rule(RuleBinding::field(
///         "birthday",
///         DateTimeRuleBuilder::new().pattern("yyyy-MM-dd").build(),
///     ))
///     .build();
/// let engine = RuleEngine::compile(&rules, &Services::new()).unwrap();
///
/// let guest: Value = [("birthday", Value::from("1990-13-01"))].into_iter().collect();
/// let report = engine.validate(&guest).unwrap();
///
/// assert!(!report.passed);
/// assert_eq!(report.violations[0].path_string(), "birthday");
/// ```
pub struct RuleEngine {
    name: String,
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Initializes every rule of `rule_set`.
    ///
    /// Stops at the first rule that cannot be initialized; the error names its
    /// position in the set.
    pub fn compile(rule_set: &RuleSet, services: &Services) -> Result<Self> {
        let rules = rule_set
            .rules
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                let kind = binding.rule.kind();
                let validator = initialize_rule(&binding.rule, services)
                    .map_err(|e| at_rule(&rule_set.name, index + 1, kind, e))?;
                Ok(CompiledRule {
                    field: binding.field.clone(),
                    each: binding.each,
                    kind,
                    validator,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(rule_set = %rule_set.name, rules = rules.len(), "Compiled rule set");

        Ok(Self {
            name: rule_set.name.clone(),
            rules,
        })
    }

    /// Returns the rule set name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validates `target` against every rule.
    ///
    /// Rule violations are collected into the report. Evaluation and resource
    /// errors abort the pass.
    pub fn validate(&self, target: &Value) -> Result<ValidationReport> {
        let start = Instant::now();
        let mut violations = Vec::new();
        let mut elements_checked = 0;

        for (index, rule) in self.rules.iter().enumerate() {
            let value = match (&rule.field, target) {
                (Some(field), Value::Map(entries)) => entries.get(field).unwrap_or(&NULL),
                (Some(_), Value::Null) => &NULL,
                (Some(field), other) => {
                    return Err(RuleError::declaration(format!(
                        "Rule #{} ({}) binds field '{field}' but the target is {}",
                        index + 1,
                        rule.kind,
                        other.type_name()
                    )));
                }
                (None, _) => target,
            };

            match (&rule.field, rule.each) {
                (Some(field), true) => {
                    let items = match value {
                        Value::Null => &[][..],
                        Value::List(items) => items.as_slice(),
                        other => {
                            return Err(RuleError::declaration(format!(
                                "Rule #{} ({}) expects a list in field '{field}', found {}",
                                index + 1,
                                rule.kind,
                                other.type_name()
                            )));
                        }
                    };
                    for (position, item) in items.iter().enumerate() {
                        let base = vec![PathNode::container_element(field, position)];
                        violations.extend(check(rule, item, base)?);
                    }
                    elements_checked += items.len();
                }
                (Some(field), false) => {
                    violations.extend(check(rule, value, vec![PathNode::property(field)])?);
                    elements_checked += 1;
                }
                (None, _) => {
                    violations.extend(check(rule, value, Vec::new())?);
                    elements_checked += 1;
                }
            }
        }

        Ok(self.build_report(violations, elements_checked, start))
    }

    /// Builds a validation report from collected violations.
    fn build_report(
        &self,
        violations: Vec<Violation>,
        elements_checked: usize,
        start: Instant,
    ) -> ValidationReport {
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            rule_set = %self.name,
            violations = violations.len(),
            duration_ms,
            "Validated rule set"
        );

        ValidationReport {
            passed: violations.is_empty(),
            stats: ValidationStats {
                rules_evaluated: self.rules.len(),
                elements_checked,
                violations: violations.len(),
                duration_ms,
            },
            violations,
        }
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish()
    }
}

fn check(rule: &CompiledRule, value: &Value, base_path: Vec<PathNode>) -> Result<Vec<Violation>> {
    let mut context = ConstraintContext::new(rule.validator.message()).with_base_path(base_path);
    let valid = rule.validator.is_valid(value, &mut context)?;
    Ok(context.into_violations(valid))
}

fn at_rule(rule_set: &str, position: usize, kind: &str, error: RuleError) -> RuleError {
    let context = format!("Rule #{position} ({kind}) of '{rule_set}'");
    match error {
        RuleError::Declaration { .. } => {
            RuleError::declaration_caused_by(format!("{context}: {error}"), error)
        }
        RuleError::Resource { .. } => RuleError::resource(format!("{context}: {error}"), error),
        evaluation @ RuleError::Evaluation(_) => evaluation,
    }
}
