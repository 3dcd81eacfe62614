//! Symbol library available to expressions through imports.
//!
//! Classes live in packages and expose static functions and constants.
//! `core.lang` is always imported; everything else must be imported by
//! package, class or static member before its simple name resolves. Fully
//! qualified names always resolve.
//!
//! In the CEL namespace a class is a map of its constants plus a `$class`
//! entry naming it, so `Math.PI` is a field read and `Math.max(a, b)` a call
//! with the class as receiver. Each function is registered once under its
//! member name and dispatches on that receiver.

use super::convert::{from_cel, key, to_cel};
use cel::extractors::Arguments;
use cel::objects::{Key, Map};
use cel::{Context, ExecutionError, FunctionContext, Value as CelValue};
use chrono::{DateTime, Duration, Utc};
use constraints_core::{EvaluationError, EvaluationErrorKind, Imports, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Package whose classes are imported into every namespace.
pub(crate) const IMPLICIT_PACKAGE: &str = "core.lang";

type NativeFn = fn(&[Value]) -> Result<Value, EvaluationError>;

pub(crate) struct Function {
    name: &'static str,
    min_args: usize,
    max_args: usize,
    call: NativeFn,
}

pub(crate) struct Constant {
    name: &'static str,
    value: fn() -> Value,
}

/// A class of static members.
pub(crate) struct Class {
    package: &'static str,
    name: &'static str,
    functions: &'static [Function],
    constants: &'static [Constant],
}

impl Class {
    pub(crate) fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    fn is(&self, qualified: &str) -> bool {
        qualified
            .strip_prefix(self.package)
            .and_then(|rest| rest.strip_prefix('.'))
            == Some(self.name)
    }

    fn has_member(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
            || self.constants.iter().any(|c| c.name == name)
    }

    /// Returns the value of a constant.
    pub(crate) fn constant(&self, name: &str) -> Option<Value> {
        self.constants
            .iter()
            .find(|c| c.name == name)
            .map(|c| (c.value)())
    }

    /// Calls a static function.
    pub(crate) fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvaluationError> {
        let function = self
            .functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                EvaluationError::new(
                    EvaluationErrorKind::UnresolvedName,
                    format!("function '{name}' not found on class {}", self.qualified_name()),
                )
            })?;

        if args.len() < function.min_args || args.len() > function.max_args {
            return Err(EvaluationError::new(
                EvaluationErrorKind::Function,
                format!(
                    "{}.{name} expects {} argument(s), got {}",
                    self.name,
                    arity(function),
                    args.len()
                ),
            ));
        }

        (function.call)(args)
    }
}

fn arity(function: &Function) -> String {
    if function.min_args == function.max_args {
        function.min_args.to_string()
    } else {
        format!("{} to {}", function.min_args, function.max_args)
    }
}

static CLASSES: &[Class] = &[
    Class {
        package: "core.lang",
        name: "Objects",
        functions: &[
            Function { name: "isNull", min_args: 1, max_args: 1, call: objects_is_null },
            Function { name: "nonNull", min_args: 1, max_args: 1, call: objects_non_null },
            Function { name: "coalesce", min_args: 1, max_args: 8, call: objects_coalesce },
        ],
        constants: &[],
    },
    Class {
        package: "core.math",
        name: "Math",
        functions: &[
            Function { name: "abs", min_args: 1, max_args: 1, call: math_abs },
            Function { name: "max", min_args: 2, max_args: 2, call: math_max },
            Function { name: "min", min_args: 2, max_args: 2, call: math_min },
            Function { name: "floor", min_args: 1, max_args: 1, call: math_floor },
            Function { name: "ceil", min_args: 1, max_args: 1, call: math_ceil },
            Function { name: "round", min_args: 1, max_args: 1, call: math_round },
            Function { name: "sqrt", min_args: 1, max_args: 1, call: math_sqrt },
            Function { name: "pow", min_args: 2, max_args: 2, call: math_pow },
        ],
        constants: &[
            Constant { name: "PI", value: math_pi },
            Constant { name: "E", value: math_e },
        ],
    },
    Class {
        package: "core.text",
        name: "Strings",
        functions: &[
            Function { name: "isBlank", min_args: 1, max_args: 1, call: strings_is_blank },
            Function { name: "length", min_args: 1, max_args: 1, call: strings_length },
            Function { name: "upper", min_args: 1, max_args: 1, call: strings_upper },
            Function { name: "lower", min_args: 1, max_args: 1, call: strings_lower },
            Function { name: "trim", min_args: 1, max_args: 1, call: strings_trim },
        ],
        constants: &[],
    },
    Class {
        package: "core.time",
        name: "Dates",
        functions: &[
            Function { name: "now", min_args: 0, max_args: 0, call: dates_now },
            Function { name: "parse", min_args: 1, max_args: 1, call: dates_parse },
            Function { name: "plusDays", min_args: 2, max_args: 2, call: dates_plus_days },
            Function { name: "daysBetween", min_args: 2, max_args: 2, call: dates_days_between },
        ],
        constants: &[],
    },
];

/// Looks up a class by its fully qualified name.
pub(crate) fn class_by_qualified_name(qualified: &str) -> Option<&'static Class> {
    CLASSES.iter().find(|class| class.is(qualified))
}

/// Resolves a class by simple name through the imports.
pub(crate) fn class_by_simple_name(imports: &Imports, name: &str) -> Option<&'static Class> {
    let imported_class = imports
        .classes
        .iter()
        .filter_map(|qualified| class_by_qualified_name(qualified))
        .find(|class| class.name == name);

    imported_class.or_else(|| {
        CLASSES.iter().find(|class| {
            class.name == name
                && (class.package == IMPLICIT_PACKAGE || imports.packages.contains(class.package))
        })
    })
}

/// Checks that every import names a known package, class or member.
pub(crate) fn check_imports(imports: &Imports) -> Result<(), EvaluationError> {
    let unresolved = |kind: &str, identifier: &str| {
        EvaluationError::new(
            EvaluationErrorKind::UnresolvedImport,
            format!("{kind} import '{identifier}' cannot be resolved"),
        )
    };

    for package in &imports.packages {
        if !CLASSES.iter().any(|class| class.package == package) {
            return Err(unresolved("package", package));
        }
    }

    for class in &imports.classes {
        if class_by_qualified_name(class).is_none() {
            return Err(unresolved("class", class));
        }
    }

    for member in &imports.statics {
        let resolved = member.rsplit_once('.').and_then(|(class, name)| {
            class_by_qualified_name(class).filter(|class| class.has_member(name))
        });
        if resolved.is_none() {
            return Err(unresolved("static", member));
        }
    }

    Ok(())
}

/// Entry of a class object naming its class.
const CLASS_KEY: &str = "$class";

/// A library function reachable under its simple name.
#[derive(Clone, Copy)]
struct Member {
    class: &'static Class,
    name: &'static str,
    imported: bool,
}

/// Package segments nested down to the classes they contain.
#[derive(Default)]
struct Namespace {
    packages: BTreeMap<&'static str, Namespace>,
    classes: Vec<&'static Class>,
}

impl Namespace {
    fn insert(&mut self, mut path: impl Iterator<Item = &'static str>, class: &'static Class) {
        match path.next() {
            Some(segment) => self.packages.entry(segment).or_default().insert(path, class),
            None => self.classes.push(class),
        }
    }

    fn into_value(self) -> CelValue {
        let mut members: HashMap<Key, CelValue> = self
            .packages
            .into_iter()
            .map(|(segment, namespace)| (key(segment), namespace.into_value()))
            .collect();
        members.extend(
            self.classes
                .into_iter()
                .map(|class| (key(class.name), class_object(class))),
        );
        CelValue::Map(Map {
            map: Arc::new(members),
        })
    }
}

fn class_object(class: &Class) -> CelValue {
    let mut members: HashMap<Key, CelValue> = class
        .constants
        .iter()
        .map(|constant| (key(constant.name), to_cel(&(constant.value)())))
        .collect();
    members.insert(
        key(CLASS_KEY),
        CelValue::String(Arc::new(class.qualified_name())),
    );
    CelValue::Map(Map {
        map: Arc::new(members),
    })
}

fn class_of(value: &CelValue) -> Option<&str> {
    match value {
        CelValue::Map(object) => match object.map.get(&key(CLASS_KEY)) {
            Some(CelValue::String(name)) => Some(name.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Makes the library visible in a CEL context.
///
/// Binds the package roots for qualified names, every class whose simple
/// name resolves under `imports`, the statically imported constants, and
/// one function per member name.
pub(crate) fn install(context: &mut Context, imports: &Imports) {
    let mut root = Namespace::default();
    for class in CLASSES {
        root.insert(class.package.split('.'), class);
    }
    for (segment, namespace) in root.packages {
        context.add_variable_from_value(segment, namespace.into_value());
    }

    for class in CLASSES {
        if let Some(visible) = class_by_simple_name(imports, class.name) {
            context.add_variable_from_value(class.name, class_object(visible));
        }
    }

    for member in &imports.statics {
        let constant = member.rsplit_once('.').and_then(|(class, name)| {
            class_by_qualified_name(class)
                .and_then(|class| class.constant(name))
                .map(|value| (name, value))
        });
        if let Some((name, value)) = constant {
            context.add_variable_from_value(name, to_cel(&value));
        }
    }

    let mut members: BTreeMap<&'static str, Vec<Member>> = BTreeMap::new();
    for class in CLASSES {
        let qualified = class.qualified_name();
        for function in class.functions {
            let imported = imports
                .statics
                .contains(&format!("{qualified}.{}", function.name));
            members.entry(function.name).or_default().push(Member {
                class,
                name: function.name,
                imported,
            });
        }
    }
    for (name, candidates) in members {
        context.add_function(
            name,
            move |ftx: &FunctionContext, Arguments(args): Arguments| {
                dispatch(name, &candidates, ftx, &args)
            },
        );
    }
}

/// Calls the member selected by the receiver class, or by a static import
/// when the function is called without receiver.
fn dispatch(
    name: &str,
    candidates: &[Member],
    ftx: &FunctionContext,
    args: &[CelValue],
) -> Result<CelValue, ExecutionError> {
    let member = match &ftx.this {
        Some(receiver) => {
            let class = class_of(receiver).ok_or_else(|| {
                ftx.error(format!("'{name}' is a class function and has no value receiver"))
            })?;
            candidates.iter().find(|member| member.class.is(class))
        }
        None => candidates.iter().find(|member| member.imported),
    };
    let member =
        member.ok_or_else(|| ExecutionError::UndeclaredReference(Arc::new(name.to_string())))?;

    let args = args
        .iter()
        .map(from_cel)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ftx.error(e.message()))?;
    member
        .class
        .call(member.name, &args)
        .map(|result| to_cel(&result))
        .map_err(|e| ftx.error(e.message()))
}

fn len_as_int(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn argument_error(function: &str, args: &[Value]) -> EvaluationError {
    let types: Vec<_> = args.iter().map(Value::type_name).collect();
    EvaluationError::type_error(format!(
        "{function} cannot be applied to ({})",
        types.join(", ")
    ))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        other => other.as_float(),
    }
}

fn text(value: &Value) -> Option<&str> {
    match value {
        Value::Null => Some(""),
        other => other.as_str(),
    }
}

fn objects_is_null(args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Bool(args[0].is_null()))
}

fn objects_non_null(args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Bool(!args[0].is_null()))
}

fn objects_coalesce(args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(args
        .iter()
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or_default())
}

fn math_abs(args: &[Value]) -> Result<Value, EvaluationError> {
    match &args[0] {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvaluationError::arithmetic("integer overflow in Math.abs")),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        _ => Err(argument_error("Math.abs", args)),
    }
}

fn math_pi() -> Value {
    Value::Float(std::f64::consts::PI)
}

fn math_e() -> Value {
    Value::Float(std::f64::consts::E)
}

/// Picks the argument that orders as `prefer` against the other one.
fn math_extreme(name: &str, args: &[Value], prefer: Ordering) -> Result<Value, EvaluationError> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => {
            Ok(Value::Int(if a.cmp(b) == prefer { *a } else { *b }))
        }
        (a, b) => match (number(a), number(b)) {
            (Some(x), Some(y)) => {
                Ok(Value::Float(if x.partial_cmp(&y) == Some(prefer) { x } else { y }))
            }
            _ => Err(argument_error(name, args)),
        },
    }
}

fn math_max(args: &[Value]) -> Result<Value, EvaluationError> {
    math_extreme("Math.max", args, Ordering::Greater)
}

fn math_min(args: &[Value]) -> Result<Value, EvaluationError> {
    math_extreme("Math.min", args, Ordering::Less)
}

fn math_float(
    name: &str,
    args: &[Value],
    op: fn(f64) -> f64,
) -> Result<Value, EvaluationError> {
    number(&args[0])
        .map(|x| Value::Float(op(x)))
        .ok_or_else(|| argument_error(name, args))
}

fn math_floor(args: &[Value]) -> Result<Value, EvaluationError> {
    math_float("Math.floor", args, f64::floor)
}

fn math_ceil(args: &[Value]) -> Result<Value, EvaluationError> {
    math_float("Math.ceil", args, f64::ceil)
}

fn math_sqrt(args: &[Value]) -> Result<Value, EvaluationError> {
    math_float("Math.sqrt", args, f64::sqrt)
}

fn math_round(args: &[Value]) -> Result<Value, EvaluationError> {
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(x) => {
            let rounded = (x + 0.5).floor();
            if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                Ok(Value::Int(rounded as i64))
            } else {
                Err(EvaluationError::arithmetic(format!("{x} cannot be rounded to an integer")))
            }
        }
        _ => Err(argument_error("Math.round", args)),
    }
}

fn math_pow(args: &[Value]) -> Result<Value, EvaluationError> {
    match (number(&args[0]), number(&args[1])) {
        (Some(base), Some(exponent)) => Ok(Value::Float(base.powf(exponent))),
        _ => Err(argument_error("Math.pow", args)),
    }
}

fn strings_is_blank(args: &[Value]) -> Result<Value, EvaluationError> {
    text(&args[0])
        .map(|s| Value::Bool(s.trim().is_empty()))
        .ok_or_else(|| argument_error("Strings.isBlank", args))
}

fn strings_length(args: &[Value]) -> Result<Value, EvaluationError> {
    text(&args[0])
        .map(|s| Value::Int(len_as_int(s.chars().count())))
        .ok_or_else(|| argument_error("Strings.length", args))
}

fn strings_map(
    name: &str,
    args: &[Value],
    op: fn(&str) -> String,
) -> Result<Value, EvaluationError> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(op(s))),
        _ => Err(argument_error(name, args)),
    }
}

fn strings_upper(args: &[Value]) -> Result<Value, EvaluationError> {
    strings_map("Strings.upper", args, str::to_uppercase)
}

fn strings_lower(args: &[Value]) -> Result<Value, EvaluationError> {
    strings_map("Strings.lower", args, str::to_lowercase)
}

fn strings_trim(args: &[Value]) -> Result<Value, EvaluationError> {
    strings_map("Strings.trim", args, |s| s.trim().to_string())
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    }
}

fn dates_now(_args: &[Value]) -> Result<Value, EvaluationError> {
    Ok(Value::Timestamp(Utc::now()))
}

fn dates_parse(args: &[Value]) -> Result<Value, EvaluationError> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| {
                EvaluationError::new(
                    EvaluationErrorKind::Function,
                    format!("'{s}' is not an RFC 3339 timestamp: {e}"),
                )
            }),
        Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
        _ => Err(argument_error("Dates.parse", args)),
    }
}

fn dates_plus_days(args: &[Value]) -> Result<Value, EvaluationError> {
    match (timestamp(&args[0]), args[1].as_int()) {
        (Some(ts), Some(days)) => Duration::try_days(days)
            .and_then(|delta| ts.checked_add_signed(delta))
            .map(Value::Timestamp)
            .ok_or_else(|| EvaluationError::arithmetic("timestamp out of range")),
        _ => Err(argument_error("Dates.plusDays", args)),
    }
}

fn dates_days_between(args: &[Value]) -> Result<Value, EvaluationError> {
    match (timestamp(&args[0]), timestamp(&args[1])) {
        (Some(from), Some(to)) => Ok(Value::Int((to - from).num_days())),
        _ => Err(argument_error("Dates.daysBetween", args)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn imports(packages: &[&str], classes: &[&str], statics: &[&str]) -> Imports {
        Imports {
            packages: packages.iter().map(|s| s.to_string()).collect(),
            classes: classes.iter().map(|s| s.to_string()).collect(),
            statics: statics.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_simple_names_need_imports() {
        let none = Imports::default();
        assert!(class_by_simple_name(&none, "Math").is_none());
        assert!(class_by_simple_name(&none, "Objects").is_some());

        let by_package = imports(&["core.math"], &[], &[]);
        assert!(class_by_simple_name(&by_package, "Math").is_some());

        let by_class = imports(&[], &["core.math.Math"], &[]);
        assert!(class_by_simple_name(&by_class, "Math").is_some());
        assert!(class_by_simple_name(&by_class, "Strings").is_none());
    }

    #[test]
    fn test_check_imports() {
        assert!(check_imports(&imports(&["core.time"], &["core.lang.Objects"], &[])).is_ok());

        for bad in [
            imports(&["core.nothing"], &[], &[]),
            imports(&[], &["core.math.Maths"], &[]),
            imports(&[], &[], &["core.math.Math.tan"]),
            imports(&[], &[], &["max"]),
        ] {
            let err = check_imports(&bad).unwrap_err();
            assert_eq!(err.kind(), EvaluationErrorKind::UnresolvedImport);
        }
    }

    #[test]
    fn test_math_functions() {
        let math = class_by_qualified_name("core.math.Math").unwrap();
        assert_eq!(math.call("max", &[Value::Int(3), Value::Int(7)]).unwrap(), Value::Int(7));
        let min = math.call("min", &[Value::Int(3), Value::Float(1.5)]).unwrap();
        assert_eq!(min, Value::Float(1.5));
        assert_eq!(math.call("round", &[Value::Float(2.5)]).unwrap(), Value::Int(3));
        assert_eq!(math.call("abs", &[Value::Int(-4)]).unwrap(), Value::Int(4));
        assert!(math.call("abs", &[Value::Int(i64::MIN)]).is_err());
        assert!(math.call("max", &[Value::Int(1)]).is_err());
        assert!(math.call("max", &[Value::from("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_class_object_names_its_class() {
        let math = class_by_qualified_name("core.math.Math").unwrap();
        let object = class_object(math);

        assert_eq!(class_of(&object), Some("core.math.Math"));
        assert_eq!(class_of(&CelValue::Int(1)), None);
        match object {
            CelValue::Map(members) => {
                assert_eq!(
                    members.map.get(&key("PI")),
                    Some(&CelValue::Float(std::f64::consts::PI))
                );
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn test_dates() {
        let dates = class_by_qualified_name("core.time.Dates").unwrap();
        let from = Value::from("2018-02-27T00:00:00Z");
        let to = dates.call("plusDays", &[from.clone(), Value::Int(2)]).unwrap();
        assert_eq!(dates.call("daysBetween", &[from, to]).unwrap(), Value::Int(2));
        assert!(dates.call("parse", &[Value::from("yesterday")]).is_err());
    }
}
