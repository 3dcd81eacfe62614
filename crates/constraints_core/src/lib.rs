//! # Constraints Core
//!
//! Core data structures and types for declarative constraint rules.
//!
//! This crate provides the building blocks shared by every rule kind: the
//! immutable rule declarations, the value model rules are evaluated against,
//! violation reporting and the error taxonomy.
//!
//! ## Key Concepts
//!
//! - **Declaration**: immutable description of one rule (expression, date/time or query)
//! - **Guard**: optional boolean expression deciding whether a rule applies
//! - **Violation**: a message plus the path locating the failing value
//! - **Validator**: a declaration initialized into something that can be evaluated
//!
//! ## Example
//!
//! ```rust
//! use constraints_core::{ExpressionRuleBuilder, RuleBinding, RuleSetBuilder};
//!
//! let rules = RuleSetBuilder::new("bookings")
//!     .rule(RuleBinding::target(
//!         ExpressionRuleBuilder::new("self.nights > 0")
//!             .node("nights")
//!             .message("a booking lasts at least one night")
//!             .build(),
//!     ))
//!     .build();
//!
//! assert_eq!(rules.rules.len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod message;
pub mod rule;
pub mod validator;
pub mod value;
pub mod violation;

pub use builder::*;
pub use error::*;
pub use message::*;
pub use rule::*;
pub use validator::*;
pub use value::*;
pub use violation::*;
