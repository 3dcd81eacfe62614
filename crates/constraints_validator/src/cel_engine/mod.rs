//! Default expression engine.
//!
//! Expressions are [CEL](https://github.com/google/cel-spec) evaluated with
//! the `cel` interpreter. Bound names become CEL variables, and a library of
//! static classes is reachable through imports:
//!
//! | class | members |
//! |---|---|
//! | `core.lang.Objects` | `isNull`, `nonNull`, `coalesce` |
//! | `core.math.Math` | `abs`, `max`, `min`, `floor`, `ceil`, `round`, `sqrt`, `pow`, `PI`, `E` |
//! | `core.text.Strings` | `isBlank`, `length`, `upper`, `lower`, `trim` |
//! | `core.time.Dates` | `now`, `parse`, `plusDays`, `daysBetween` |
//!
//! A bound name hides a class of the same simple name.

mod convert;
mod library;

use crate::context::{EvaluationContext, ExpressionEngine};
use cel::{Context, Program};
use constraints_core::{EvaluationError, Imports, Value};
use convert::{evaluation_error, from_cel, to_cel};

/// The built-in expression engine.
///
/// # Example
///
/// ```rust
/// use constraints_core::{Imports, Value};
/// use constraints_validator::{CelEngine, EvaluationContext, ExpressionEngine};
///
/// let order: Value = [("total", Value::Int(120)), ("limit", Value::Int(100))]
///     .into_iter()
///     .collect();
/// let imports = Imports::default();
/// let context = EvaluationContext::for_target("self", &order, &imports);
///
/// let engine = CelEngine::new();
/// let result = engine.evaluate("self.total <= self.limit", &context).unwrap();
/// assert_eq!(result, Value::Bool(false));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CelEngine;

impl CelEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for CelEngine {
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let program =
            Program::compile(expression).map_err(|e| EvaluationError::syntax(e.to_string()))?;

        let mut namespace = Context::default();
        library::install(&mut namespace, context.imports());
        for (name, value) in context.bindings() {
            namespace.add_variable_from_value(name, to_cel(value));
        }

        let result = program.execute(&namespace).map_err(evaluation_error)?;
        from_cel(&result)
    }

    fn check_imports(&self, imports: &Imports) -> Result<(), EvaluationError> {
        library::check_imports(imports)
    }
}
