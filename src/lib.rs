// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontograph
//!
//! Atomic, invertible change sets over an ontology-typed RDF graph, with
//! forward-chaining inference and rule-based validation.
//!
//! ## Architecture
//!
//! - **Statements** (`graph`): IRIs, typed literals, entities and an in-memory index
//! - **Store** (`store`): scoped transactions over oxigraph, plus a redb journal
//! - **Changes** (`change`): change sets and transformations that invert exactly
//! - **Ontology** (`ontology`): type hierarchy and predicate table from TOML
//! - **Inference** (`infer`): rule text, fixed-point derivation, validation reports
//! - **Service** (`service`): the facade tying them together
//!
//! ## Library usage
//!
//! ```no_run
//! use ontograph::iri::Iri;
//! use ontograph::service::{Service, ServiceConfig};
//!
//! let service = Service::open(&ServiceConfig::default()).unwrap();
//! let alice = service
//!     .new_entity("Person", Iri::new("http://example.org/alice").unwrap())
//!     .unwrap();
//! let t = service.create_transformation(&[alice]).unwrap();
//! let applied = service.apply(&t).unwrap();
//! assert_eq!(applied.stats.created, 1);
//! ```

pub mod change;
pub mod error;
pub mod graph;
pub mod infer;
pub mod iri;
pub mod ontology;
pub mod query;
pub mod service;
pub mod store;
