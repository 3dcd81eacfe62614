//! Query rules: a parameterized query that must return at least one row.

mod datafusion_source;
mod source;

pub use datafusion_source::DataFusionSource;
pub use source::{
    Connection, DEFAULT_DATA_SOURCE, DataSource, DataSourceRegistry, DataSources, PreparedQuery,
    ResultCursor,
};

use crate::boolean::evaluate_guard;
use crate::cel_engine::CelEngine;
use crate::context::{EvaluationContext, ExpressionEngine};
use crate::path::report_violation;
use constraints_core::{
    ConstraintContext, ConstraintValidator, QueryRule, Result, RuleError, Value, format_list,
    interpolate,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Initialized query rule bound to its data source.
///
/// Parameter expressions are evaluated against the target in declaration
/// order and bound to markers `1..n`. The target is valid when the query
/// yields a row.
pub struct QueryValidator {
    rule: QueryRule,
    engine: Arc<dyn ExpressionEngine>,
    source: Arc<dyn DataSource>,
    source_name: String,
    message: String,
}

impl QueryValidator {
    /// Initializes the rule with the built-in [`CelEngine`].
    pub fn initialize(rule: QueryRule, registry: &dyn DataSourceRegistry) -> Result<Self> {
        Self::initialize_with(rule, Arc::new(CelEngine::new()), registry)
    }

    /// Initializes the rule with a specific expression engine.
    ///
    /// Fails if the statement is empty or the data source cannot be resolved.
    pub fn initialize_with(
        rule: QueryRule,
        engine: Arc<dyn ExpressionEngine>,
        registry: &dyn DataSourceRegistry,
    ) -> Result<Self> {
        if rule.value.trim().is_empty() {
            return Err(RuleError::declaration(
                "Query rule requires a non-empty SQL statement",
            ));
        }

        let source_name = if rule.data_source.is_empty() {
            DEFAULT_DATA_SOURCE.to_string()
        } else {
            rule.data_source.clone()
        };
        let source = registry.lookup(&source_name).map_err(|e| {
            RuleError::resource(format!("DataSource not found: `{source_name}`"), e)
        })?;

        let node = format_list(&rule.node);
        let parameters = format_list(&rule.parameters);
        let message = interpolate(
            &rule.message,
            &[
                ("value", rule.value.as_str()),
                ("parameters", parameters.as_str()),
                ("when", rule.when.as_str()),
                ("node", node.as_str()),
                ("targetName", rule.target_name.as_str()),
                ("dataSource", source_name.as_str()),
            ],
        );

        debug!(
            sql = %rule.value,
            data_source = %source_name,
            parameters = rule.parameters.len(),
            "Initialized query rule"
        );

        Ok(Self {
            rule,
            engine,
            source,
            source_name,
            message,
        })
    }

    /// Returns the declaration this validator was built from.
    pub fn rule(&self) -> &QueryRule {
        &self.rule
    }

    /// Name of the data source the rule was resolved against.
    pub fn data_source(&self) -> &str {
        &self.source_name
    }

    fn has_rows(
        &self,
        connection: &mut (dyn Connection + '_),
        evaluation: &EvaluationContext<'_>,
    ) -> Result<bool> {
        let sql = &self.rule.value;
        let mut query = connection
            .prepare(sql)
            .map_err(|e| RuleError::resource(format!("Failed to prepare query `{sql}`"), e))?;

        for (position, expression) in self.rule.parameters.iter().enumerate() {
            let marker = position + 1;
            let parameter = self.engine.evaluate(expression, evaluation).map_err(|e| {
                RuleError::declaration_caused_by(
                    format!(
                        "Expression `{expression}` for marker #{marker} could not be evaluated"
                    ),
                    e,
                )
            })?;

            query.bind(marker, &parameter).map_err(|e| {
                if e.is_bind_error() {
                    RuleError::declaration_caused_by(
                        format!(
                            "Expression `{expression}` does not evaluate to a valid query \
                             parameter for marker #{marker}"
                        ),
                        e,
                    )
                } else {
                    RuleError::resource(format!("Failed to bind marker #{marker}"), e)
                }
            })?;
        }

        let mut cursor = query
            .execute_query()
            .map_err(|e| RuleError::resource(format!("Failed to execute query `{sql}`"), e))?;
        let found = cursor
            .has_next()
            .map_err(|e| RuleError::resource(format!("Failed to read result of `{sql}`"), e))?;

        debug!(sql = %sql, found, "Executed query rule");
        Ok(found)
    }
}

impl ConstraintValidator for QueryValidator {
    fn message(&self) -> &str {
        &self.message
    }

    fn is_valid(&self, value: &Value, context: &mut ConstraintContext) -> Result<bool> {
        let mut evaluation = EvaluationContext::new();
        evaluation.bind_name(self.rule.target_name.as_str(), value);

        if !evaluate_guard(self.engine.as_ref(), &self.rule.when, &evaluation)? {
            debug!(when = %self.rule.when, "Guard is false, skipping query rule");
            return Ok(true);
        }

        let mut connection = self.source.connection().map_err(|e| {
            RuleError::resource(
                format!("Failed to acquire a connection from `{}`", self.source_name),
                e,
            )
        })?;
        trace!(data_source = %self.source_name, "Acquired connection");

        let found = self.has_rows(connection.as_mut(), &evaluation);
        drop(connection);
        trace!(data_source = %self.source_name, "Released connection");

        let valid = found?;
        if !valid {
            report_violation(context, &self.message, &self.rule.node);
        }
        Ok(valid)
    }
}
