//! # Constraints Validator
//!
//! Evaluation engine for declarative constraint rules. This crate turns rule
//! declarations from `constraints_core` into validators:
//!
//! - Expression rules, evaluated by a pluggable [`ExpressionEngine`] (the
//!   built-in [`CelEngine`] by default)
//! - Date/time pattern rules with legacy and structured parser families
//! - Query rules executed against a named [`DataSource`], such as the
//!   in-process [`DataFusionSource`]
//! - [`RuleEngine`], which evaluates a whole rule set and reports violations
//!
//! ## Example
//!
//! ```rust
//! use constraints_core::{ExpressionRuleBuilder, RuleBinding, RuleSetBuilder, Value};
//! use constraints_validator::{RuleEngine, Services};
//!
//! let rules = RuleSetBuilder::new("bookings")
//!     .rule(RuleBinding::target(
//!         ExpressionRuleBuilder::new("self.nights > 0")
//!             .node("nights")
//!             .message("a booking lasts at least one night")
//!             .build(),
//!     ))
//!     .build();
//! let engine = RuleEngine::compile(&rules, &Services::new()).unwrap();
//!
//! let booking: Value = [("nights", Value::Int(0))].into_iter().collect();
//! let report = engine.validate(&booking).unwrap();
//!
//! if report.passed {
//!     println!("Validation passed!");
//! } else {
//!     for violation in &report.violations {
//!         println!("Violation: {violation}");
//!     }
//! }
//! ```

mod boolean;
mod cel_engine;
mod context;
mod datetime;
mod engine;
mod error;
mod expression;
mod path;
mod query;

pub use boolean::*;
pub use cel_engine::*;
pub use context::*;
pub use datetime::*;
pub use engine::*;
pub use error::*;
pub use expression::*;
pub use path::*;
pub use query::*;
