//! Conversions between rule values and CEL values.

use cel::objects::{Key, Map};
use cel::{ExecutionError, Value as CelValue};
use chrono::Utc;
use constraints_core::{EvaluationError, EvaluationErrorKind, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub(crate) fn key(name: &str) -> Key {
    Key::String(Arc::new(name.to_string()))
}

pub(crate) fn to_cel(value: &Value) -> CelValue {
    match value {
        Value::Null => CelValue::Null,
        Value::Bool(b) => CelValue::Bool(*b),
        Value::Int(i) => CelValue::Int(*i),
        Value::Float(x) => CelValue::Float(*x),
        Value::String(s) => CelValue::String(Arc::new(s.clone())),
        Value::Timestamp(ts) => CelValue::Timestamp(ts.fixed_offset()),
        Value::List(items) => CelValue::List(Arc::new(items.iter().map(to_cel).collect())),
        Value::Map(entries) => {
            let map: HashMap<Key, CelValue> = entries
                .iter()
                .map(|(name, value)| (key(name), to_cel(value)))
                .collect();
            CelValue::Map(Map { map: Arc::new(map) })
        }
    }
}

pub(crate) fn from_cel(value: &CelValue) -> Result<Value, EvaluationError> {
    let value = match value {
        CelValue::Null => Value::Null,
        CelValue::Bool(b) => Value::Bool(*b),
        CelValue::Int(i) => Value::Int(*i),
        CelValue::UInt(u) => i64::try_from(*u).map(Value::Int).map_err(|_| {
            EvaluationError::arithmetic(format!("{u} does not fit a signed integer"))
        })?,
        CelValue::Float(x) => Value::Float(*x),
        CelValue::String(s) => Value::String(s.to_string()),
        CelValue::Timestamp(ts) => Value::Timestamp(ts.with_timezone(&Utc)),
        CelValue::List(items) => {
            Value::List(items.iter().map(from_cel).collect::<Result<_, _>>()?)
        }
        CelValue::Map(object) => {
            let mut entries = BTreeMap::new();
            for (name, value) in object.map.iter() {
                let name = match name {
                    Key::String(s) => s.to_string(),
                    Key::Int(i) => i.to_string(),
                    Key::Bool(b) => b.to_string(),
                    other => format!("{other:?}"),
                };
                entries.insert(name, from_cel(value)?);
            }
            Value::Map(entries)
        }
        other => {
            return Err(EvaluationError::type_error(format!(
                "expression produced an unsupported value: {other:?}"
            )));
        }
    };
    Ok(value)
}

/// Maps a CEL runtime error onto the evaluation error taxonomy.
pub(crate) fn evaluation_error(err: ExecutionError) -> EvaluationError {
    let kind = match &err {
        ExecutionError::UndeclaredReference { .. } => EvaluationErrorKind::UnresolvedName,
        ExecutionError::NoSuchKey { .. } => EvaluationErrorKind::PropertyNotFound,
        ExecutionError::DivisionByZero { .. }
        | ExecutionError::RemainderByZero { .. }
        | ExecutionError::Overflow { .. } => EvaluationErrorKind::Arithmetic,
        ExecutionError::FunctionError { .. } => EvaluationErrorKind::Function,
        _ => EvaluationErrorKind::Type,
    };
    EvaluationError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_values_survive_conversion() {
        let stay: Value = [
            ("guest", Value::from("Ada")),
            ("nights", Value::Int(3)),
            ("rate", Value::Float(99.5)),
            ("notes", Value::Null),
            ("rooms", Value::List(vec![Value::from("101"), Value::Bool(true)])),
            (
                "arrival",
                Value::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap()),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(from_cel(&to_cel(&stay)).unwrap(), stay);
    }

    #[test]
    fn test_non_string_keys_become_text() {
        let map: HashMap<Key, CelValue> = [
            (Key::Int(1), CelValue::Bool(true)),
            (Key::Bool(false), CelValue::Null),
        ]
        .into_iter()
        .collect();

        let value = from_cel(&CelValue::Map(Map { map: Arc::new(map) })).unwrap();
        assert_eq!(value.property("1").unwrap(), &Value::Bool(true));
        assert_eq!(value.property("false").unwrap(), &Value::Null);
    }

    #[test]
    fn test_large_unsigned_is_arithmetic_error() {
        let err = from_cel(&CelValue::UInt(u64::MAX)).unwrap_err();
        assert_eq!(err.kind(), EvaluationErrorKind::Arithmetic);
        assert_eq!(from_cel(&CelValue::UInt(7)).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_error_kinds() {
        let unresolved = ExecutionError::UndeclaredReference(Arc::new("guest".to_string()));
        assert_eq!(
            evaluation_error(unresolved).kind(),
            EvaluationErrorKind::UnresolvedName
        );

        let missing = ExecutionError::NoSuchKey(Arc::new("children".to_string()));
        assert_eq!(
            evaluation_error(missing).kind(),
            EvaluationErrorKind::PropertyNotFound
        );
    }
}
