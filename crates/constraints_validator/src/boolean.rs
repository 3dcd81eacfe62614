//! Guarded boolean evaluation shared by expression and query rules.

use crate::context::{EvaluationContext, ExpressionEngine};
use constraints_core::{EvaluationError, Value};
use tracing::debug;

/// Evaluates `expression` and requires a boolean result.
///
/// An empty expression holds. If evaluation fails and `fallback` is set, the
/// fallback is the result; otherwise the error propagates. A result that is
/// not a boolean is always an error, even when a fallback is configured.
pub fn evaluate_boolean(
    engine: &dyn ExpressionEngine,
    expression: &str,
    context: &EvaluationContext<'_>,
    fallback: Option<bool>,
) -> Result<bool, EvaluationError> {
    if expression.is_empty() {
        return Ok(true);
    }

    let value = match engine.evaluate(expression, context) {
        Ok(value) => value,
        Err(e) => match fallback {
            Some(fallback) => {
                debug!(
                    expression,
                    error = %e,
                    fallback,
                    "Expression failed, using exceptional value"
                );
                return Ok(fallback);
            }
            None => return Err(e),
        },
    };

    match value {
        Value::Bool(result) => Ok(result),
        _ => Err(EvaluationError::not_boolean(expression)),
    }
}

/// Decides whether a rule applies. A blank guard always applies; any other
/// guard is evaluated without fallback.
pub fn evaluate_guard(
    engine: &dyn ExpressionEngine,
    when: &str,
    context: &EvaluationContext<'_>,
) -> Result<bool, EvaluationError> {
    if when.trim().is_empty() {
        return Ok(true);
    }
    evaluate_boolean(engine, when, context, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CelEngine;
    use constraints_core::{EvaluationErrorKind, Imports};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts evaluations and answers with a fixed result.
    struct Scripted {
        calls: AtomicUsize,
        result: Result<Value, EvaluationError>,
    }

    impl Scripted {
        fn new(result: Result<Value, EvaluationError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
            }
        }
    }

    impl ExpressionEngine for Scripted {
        fn evaluate(
            &self,
            _expression: &str,
            _context: &EvaluationContext<'_>,
        ) -> Result<Value, EvaluationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[test]
    fn test_boolean_literals() {
        let engine = CelEngine::new();
        let context = EvaluationContext::new();
        assert!(evaluate_boolean(&engine, "true", &context, None).unwrap());
        assert!(!evaluate_boolean(&engine, "false", &context, None).unwrap());
    }

    #[test]
    fn test_non_boolean_names_expression() {
        let engine = CelEngine::new();
        let context = EvaluationContext::new();

        let err = evaluate_boolean(&engine, "'abc'", &context, Some(true)).unwrap_err();
        assert_eq!(err.kind(), EvaluationErrorKind::NotBoolean);
        assert!(err.to_string().contains("'abc'"));
    }

    #[test]
    fn test_fallback_absorbs_errors() {
        let engine = CelEngine::new();
        let target = Value::Null;
        let imports = Imports::default();
        let context = EvaluationContext::for_target("self", &target, &imports);

        assert!(evaluate_boolean(&engine, "unknown > 1", &context, Some(true)).unwrap());
        assert!(!evaluate_boolean(&engine, "unknown > 1", &context, Some(false)).unwrap());

        let err = evaluate_boolean(&engine, "unknown > 1", &context, None).unwrap_err();
        assert_eq!(err.kind(), EvaluationErrorKind::UnresolvedName);
    }

    #[test]
    fn test_blank_guard_is_not_evaluated() {
        let engine = Scripted::new(Ok(Value::Bool(false)));
        let context = EvaluationContext::new();

        assert!(evaluate_guard(&engine, "", &context).unwrap());
        assert!(evaluate_guard(&engine, "  ", &context).unwrap());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);

        assert!(!evaluate_guard(&engine, "anything", &context).unwrap());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_errors_propagate() {
        let engine = Scripted::new(Err(EvaluationError::unresolved_name("x")));
        let context = EvaluationContext::new();
        assert!(evaluate_guard(&engine, "x", &context).is_err());

        let engine = Scripted::new(Ok(Value::Int(1)));
        let err = evaluate_guard(&engine, "1", &context).unwrap_err();
        assert_eq!(err.kind(), EvaluationErrorKind::NotBoolean);
    }
}
