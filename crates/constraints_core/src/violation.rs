//! Violation reporting.
//!
//! A [`ConstraintContext`] is handed to a validator for one evaluation. It
//! starts with a default violation located at the position the caller is
//! validating; a validator may disable it and build custom violations with a
//! [`ViolationBuilder`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a violation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathNode {
    /// A named property
    Property {
        /// Property name
        name: String,
    },
    /// An element of a named container
    ContainerElement {
        /// Container property name
        name: String,
        /// Element position
        index: usize,
    },
}

impl PathNode {
    /// Creates a property node.
    pub fn property(name: impl Into<String>) -> Self {
        PathNode::Property { name: name.into() }
    }

    /// Creates a container element node.
    pub fn container_element(name: impl Into<String>, index: usize) -> Self {
        PathNode::ContainerElement {
            name: name.into(),
            index,
        }
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        match self {
            PathNode::Property { name } | PathNode::ContainerElement { name, .. } => name,
        }
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathNode::Property { name } => f.write_str(name),
            PathNode::ContainerElement { name, index } => write!(f, "{name}[{index}]"),
        }
    }
}

/// A reported constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Interpolated violation message
    pub message: String,
    /// Location of the violation within the target
    pub path: Vec<PathNode>,
}

impl Violation {
    /// Renders the path in dotted form, e.g. `guests[1].email`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

/// Reporting context for a single rule evaluation.
#[derive(Debug, Clone)]
pub struct ConstraintContext {
    default_message: String,
    base_path: Vec<PathNode>,
    default_enabled: bool,
    violations: Vec<Violation>,
}

impl ConstraintContext {
    /// Creates a context whose default violation carries `default_message`
    /// and sits at the root of the target.
    pub fn new(default_message: impl Into<String>) -> Self {
        Self {
            default_message: default_message.into(),
            base_path: Vec::new(),
            default_enabled: true,
            violations: Vec::new(),
        }
    }

    /// Sets the position being validated. Every violation path starts with
    /// these nodes.
    pub fn with_base_path(mut self, base_path: Vec<PathNode>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Returns the position being validated.
    pub fn base_path(&self) -> &[PathNode] {
        &self.base_path
    }

    /// Suppresses the default violation.
    pub fn disable_default_violation(&mut self) {
        self.default_enabled = false;
    }

    /// Returns whether the default violation is still enabled.
    pub fn is_default_violation_enabled(&self) -> bool {
        self.default_enabled
    }

    /// Starts a custom violation with the given message.
    pub fn build_violation(&mut self, message: impl Into<String>) -> ViolationBuilder<'_> {
        let path = self.base_path.clone();
        ViolationBuilder {
            context: self,
            message: message.into(),
            path,
        }
    }

    /// Returns custom violations built so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes the context and returns the violations for an evaluation
    /// that produced `valid`. A valid result reports nothing.
    pub fn into_violations(self, valid: bool) -> Vec<Violation> {
        if valid {
            return Vec::new();
        }

        let mut violations = Vec::with_capacity(self.violations.len() + 1);
        if self.default_enabled {
            violations.push(Violation {
                message: self.default_message,
                path: self.base_path,
            });
        }
        violations.extend(self.violations);
        violations
    }
}

/// Builds the path of one custom violation.
#[derive(Debug)]
#[must_use = "a violation is only recorded when `finish` is called"]
pub struct ViolationBuilder<'a> {
    context: &'a mut ConstraintContext,
    message: String,
    path: Vec<PathNode>,
}

impl ViolationBuilder<'_> {
    /// Appends a property node.
    pub fn add_property_node(mut self, name: impl Into<String>) -> Self {
        self.path.push(PathNode::property(name));
        self
    }

    /// Appends a container element node.
    pub fn add_container_element_node(mut self, name: impl Into<String>, index: usize) -> Self {
        self.path.push(PathNode::container_element(name, index));
        self
    }

    /// Records the violation in the context.
    pub fn finish(self) {
        self.context.violations.push(Violation {
            message: self.message,
            path: self.path,
        });
    }
}
