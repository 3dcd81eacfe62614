//! Expression evaluation context and the expression engine seam.
//!
//! An [`EvaluationContext`] is the namespace one evaluation runs in: the
//! target bound under its configured name plus the symbols imported by the
//! rule. Contexts borrow the target, are built per call and are never shared
//! between evaluations.

use constraints_core::{EvaluationError, Imports, Value};
use std::borrow::Cow;
use std::fmt;

/// Kind of an imported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Every class of a package
    Package,
    /// One class
    Class,
    /// One static member of a class
    Static,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Package => f.write_str("package"),
            ImportKind::Class => f.write_str("class"),
            ImportKind::Static => f.write_str("static"),
        }
    }
}

/// Transient namespace for one expression evaluation.
#[derive(Debug, Default, Clone)]
pub struct EvaluationContext<'a> {
    bindings: Vec<(String, &'a Value)>,
    imports: Cow<'a, Imports>,
}

impl<'a> EvaluationContext<'a> {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the context a rule evaluates in: `target` bound under
    /// `target_name` and the rule's imports.
    ///
    /// # Example
    ///
    /// ```rust
    /// use constraints_core::{Imports, Value};
    /// use constraints_validator::EvaluationContext;
    ///
    /// let target = Value::from(42);
    /// let imports = Imports::default();
    /// let context = EvaluationContext::for_target("self", &target, &imports);
    ///
    /// assert_eq!(context.resolve("self"), Some(&Value::Int(42)));
    /// assert_eq!(context.resolve("se"), None);
    /// ```
    pub fn for_target(target_name: &str, target: &'a Value, imports: &'a Imports) -> Self {
        let mut context = Self {
            bindings: Vec::with_capacity(1),
            imports: Cow::Borrowed(imports),
        };
        context.bind_name(target_name, target);
        context
    }

    /// Binds `value` under `name`, replacing any previous binding of the
    /// same name.
    pub fn bind_name(&mut self, name: impl Into<String>, value: &'a Value) {
        let name = name.into();
        match self.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((name, value)),
        }
    }

    /// Imports a package, class or static member by its qualified name.
    pub fn import(&mut self, kind: ImportKind, identifier: impl Into<String>) {
        let imports = self.imports.to_mut();
        let identifier = identifier.into();
        match kind {
            ImportKind::Package => imports.packages.insert(identifier),
            ImportKind::Class => imports.classes.insert(identifier),
            ImportKind::Static => imports.statics.insert(identifier),
        };
    }

    /// Resolves a bound name. Only exact matches resolve.
    pub fn resolve(&self, name: &str) -> Option<&'a Value> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| *value)
    }

    /// Iterates over the bound names in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &'a Value)> + '_ {
        self.bindings.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the imported symbols.
    pub fn imports(&self) -> &Imports {
        &self.imports
    }
}

/// A pluggable expression evaluation service.
///
/// The crate ships [`CelEngine`](crate::CelEngine); rules may be initialized
/// with any other implementation.
pub trait ExpressionEngine: Send + Sync {
    /// Evaluates `expression` in `context`.
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext<'_>,
    ) -> Result<Value, EvaluationError>;

    /// Checks that every import names a known symbol.
    ///
    /// Default implementation accepts everything.
    fn check_imports(&self, imports: &Imports) -> Result<(), EvaluationError> {
        let _ = imports;
        Ok(())
    }
}
