//! Graph store: the transactional boundary of the system.
//!
//! - [`GraphStore`]: the contract every backend implements: scoped read/write
//!   transactions, point lookups by subject, whole-entity writes and queries
//! - [`OxiStore`]: oxigraph-backed implementation (in-memory or on-disk)
//! - [`journal::Journal`]: redb-backed log of applied transformations
//!
//! Scope state machine: `Closed → Read → Closed`, or
//! `Closed → Write → {commit, abort} → Closed`. Only a closed store may begin a
//! scope and only a write scope may mutate.

pub mod journal;
pub mod oxi;

use crate::error::StoreError;
use crate::graph::sparql::QueryRow;
use crate::graph::{Entity, Statement};
use crate::iri::Iri;

pub use oxi::OxiStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The scope a store currently has open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeState {
    Closed,
    Read,
    Write,
}

impl std::fmt::Display for ScopeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeState::Closed => write!(f, "closed"),
            ScopeState::Read => write!(f, "read"),
            ScopeState::Write => write!(f, "write"),
        }
    }
}

/// Transactional statement container.
///
/// The store knows nothing about change sets: it mutates by entity snapshot.
/// Every mutating method fails with [`StoreError::NoWriteScope`] before
/// touching any data when no write scope is open.
pub trait GraphStore {
    /// Open a read scope.
    fn begin_read(&self) -> StoreResult<()>;

    /// Open a write scope.
    fn begin_write(&self) -> StoreResult<()>;

    /// Close the open scope, making a write scope's changes durable.
    fn commit(&self) -> StoreResult<()>;

    /// Close the open scope, discarding a write scope's changes.
    fn abort(&self) -> StoreResult<()>;

    /// The currently open scope.
    fn scope(&self) -> ScopeState;

    /// All statements about `iri`, or `None` if it has none.
    fn get(&self, iri: &Iri) -> StoreResult<Option<Entity>>;

    /// Write the statements of a subject that has none yet.
    fn create(&self, entity: &Entity) -> StoreResult<()>;

    /// Replace the statements of an existing subject. An empty entity deletes.
    fn update(&self, entity: &Entity) -> StoreResult<()>;

    /// Remove every statement about the entity's subject.
    fn delete(&self, entity: &Entity) -> StoreResult<()>;

    /// Execute a SPARQL query, preserving the declared row order.
    fn query(&self, sparql: &str) -> StoreResult<Vec<QueryRow>>;

    /// Every statement in the store, sorted.
    fn statements(&self) -> StoreResult<Vec<Statement>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_state_display() {
        assert_eq!(ScopeState::Closed.to_string(), "closed");
        assert_eq!(ScopeState::Read.to_string(), "read");
        assert_eq!(ScopeState::Write.to_string(), "write");
    }
}
