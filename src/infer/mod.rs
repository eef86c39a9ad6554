//! Rule-based inference and validation.
//!
//! - [`rules`]: rule model, the rule text format and JSON loading
//! - [`engine`]: forward chaining to a fixed point
//! - [`validate`]: violation rules evaluated over the closed graph

pub mod engine;
pub mod rules;
pub mod validate;

pub use engine::{DerivedStatement, InferenceOutcome, RuleEngine, RuleEngineConfig};
pub use rules::{InferenceRule, ResourceSpec, RuleKind, RuleSet, RuleTerm, TriplePattern};
pub use validate::{ValidationEntry, ValidationReport, Validator, ViolationResource};
