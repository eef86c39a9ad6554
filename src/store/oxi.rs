//! Oxigraph-backed graph store.
//!
//! A write scope buffers the target state of every subject it touches.
//! Lookups by subject inside the scope see the buffer; SPARQL queries and
//! `statements()` see committed data only. `commit()` diffs the buffer
//! against the committed store and flushes the quads in a single oxigraph
//! transaction, so a scope is either fully durable or absent. `abort()`
//! drops the buffer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use oxigraph::model::Quad;
use oxigraph::store::Store;

use crate::error::StoreError;
use crate::graph::sparql::{self, QueryRow};
use crate::graph::{Entity, Statement};
use crate::iri::Iri;

use super::{GraphStore, ScopeState, StoreResult};

/// Internal scope state; the write variant carries the pending writes.
#[derive(Debug)]
enum Scope {
    Closed,
    Read,
    Write {
        /// Subject → statements it will have once the scope commits.
        pending: BTreeMap<Iri, Option<Entity>>,
    },
}

impl Scope {
    fn state(&self) -> ScopeState {
        match self {
            Scope::Closed => ScopeState::Closed,
            Scope::Read => ScopeState::Read,
            Scope::Write { .. } => ScopeState::Write,
        }
    }
}

/// Persistent or in-memory SPARQL-capable graph store.
pub struct OxiStore {
    store: Store,
    scope: Mutex<Scope>,
    path: Option<PathBuf>,
}

impl OxiStore {
    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Backend {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            store,
            scope: Mutex::new(Scope::Closed),
            path: None,
        })
    }

    /// Open or create a persistent store at the given directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Io { source: e })?;
        let store = Store::open(path).map_err(|e| StoreError::Backend {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "opened oxigraph store");
        Ok(Self {
            store,
            scope: Mutex::new(Scope::Closed),
            path: Some(path.to_path_buf()),
        })
    }

    /// Where the store lives on disk, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of committed statements.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| StoreError::Backend {
            message: format!("len failed: {e}"),
        })
    }

    /// Whether the store holds no committed statements.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    fn lock(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Committed statements about `iri`.
    fn read_entity(&self, iri: &Iri) -> StoreResult<Option<Entity>> {
        let rows = sparql::run_query(
            &self.store,
            &format!("SELECT ?p ?o WHERE {{ {iri} ?p ?o }} ORDER BY ?p ?o"),
        )?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut entity = Entity::new(iri.clone());
        for row in rows {
            match (row.iri("p"), row.get("o")) {
                (Some(p), Some(o)) => {
                    entity.add(p.clone(), o.clone());
                }
                _ => {
                    return Err(StoreError::Sparql {
                        message: format!("incomplete statement row for {iri}"),
                    });
                }
            }
        }
        Ok(Some(entity))
    }

    /// Check for a write scope and return the subject's statements as the
    /// scope currently sees them, together with the pending-write buffer.
    fn prepare_write<'a>(
        &self,
        scope: &'a mut Scope,
        operation: &str,
        iri: &Iri,
    ) -> StoreResult<(Option<Entity>, &'a mut BTreeMap<Iri, Option<Entity>>)> {
        let Scope::Write { pending } = scope else {
            return Err(StoreError::NoWriteScope {
                operation: operation.to_string(),
            });
        };
        let current = match pending.get(iri) {
            Some(buffered) => buffered.clone(),
            None => self.read_entity(iri)?,
        };
        Ok((current, pending))
    }

    /// Quads to remove and insert to move every pending subject from its
    /// committed state to its target state.
    fn diff(&self, pending: &BTreeMap<Iri, Option<Entity>>) -> StoreResult<(Vec<Quad>, Vec<Quad>)> {
        let mut removals = Vec::new();
        let mut inserts = Vec::new();
        for (iri, target) in pending {
            let before: BTreeSet<Statement> = self
                .read_entity(iri)?
                .as_ref()
                .map(Entity::statement_set)
                .unwrap_or_default();
            let after: BTreeSet<Statement> =
                target.as_ref().map(Entity::statement_set).unwrap_or_default();
            for st in before.difference(&after) {
                removals.push(sparql::to_quad(st)?);
            }
            for st in after.difference(&before) {
                inserts.push(sparql::to_quad(st)?);
            }
        }
        Ok((removals, inserts))
    }

    fn flush(&self, pending: &BTreeMap<Iri, Option<Entity>>) -> StoreResult<()> {
        let (removals, inserts) = self.diff(pending)?;
        if removals.is_empty() && inserts.is_empty() {
            return Ok(());
        }
        let backend = |e: oxigraph::store::StorageError| StoreError::Backend {
            message: format!("commit failed: {e}"),
        };
        let mut transaction = self.store.start_transaction().map_err(backend)?;
        for quad in &removals {
            transaction.remove(quad);
        }
        transaction.extend(&inserts);
        transaction.commit().map_err(backend)?;
        tracing::trace!(
            removed = removals.len(),
            inserted = inserts.len(),
            "flushed write scope"
        );
        Ok(())
    }
}

impl GraphStore for OxiStore {
    fn begin_read(&self) -> StoreResult<()> {
        let mut scope = self.lock();
        if !matches!(*scope, Scope::Closed) {
            return Err(StoreError::ScopeAlreadyOpen {
                current: scope.state().to_string(),
            });
        }
        *scope = Scope::Read;
        Ok(())
    }

    fn begin_write(&self) -> StoreResult<()> {
        let mut scope = self.lock();
        if !matches!(*scope, Scope::Closed) {
            return Err(StoreError::ScopeAlreadyOpen {
                current: scope.state().to_string(),
            });
        }
        *scope = Scope::Write {
            pending: BTreeMap::new(),
        };
        tracing::debug!("write scope opened");
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut scope = self.lock();
        match std::mem::replace(&mut *scope, Scope::Closed) {
            Scope::Closed => Err(StoreError::NoOpenScope {
                operation: "commit".into(),
            }),
            Scope::Read => Ok(()),
            Scope::Write { pending } => {
                self.flush(&pending)?;
                tracing::debug!(subjects = pending.len(), "write scope committed");
                Ok(())
            }
        }
    }

    fn abort(&self) -> StoreResult<()> {
        let mut scope = self.lock();
        match std::mem::replace(&mut *scope, Scope::Closed) {
            Scope::Closed => Err(StoreError::NoOpenScope {
                operation: "abort".into(),
            }),
            Scope::Read => Ok(()),
            Scope::Write { pending } => {
                tracing::debug!(subjects = pending.len(), "write scope aborted");
                Ok(())
            }
        }
    }

    fn scope(&self) -> ScopeState {
        self.lock().state()
    }

    fn get(&self, iri: &Iri) -> StoreResult<Option<Entity>> {
        if let Scope::Write { pending } = &*self.lock() {
            if let Some(buffered) = pending.get(iri) {
                return Ok(buffered.clone());
            }
        }
        self.read_entity(iri)
    }

    fn create(&self, entity: &Entity) -> StoreResult<()> {
        let mut scope = self.lock();
        let (current, pending) = self.prepare_write(&mut scope, "create", entity.id())?;
        if current.is_some() {
            return Err(StoreError::EntityExists {
                iri: entity.id().as_str().to_string(),
            });
        }
        let target = (!entity.is_empty()).then(|| entity.clone());
        pending.insert(entity.id().clone(), target);
        Ok(())
    }

    fn update(&self, entity: &Entity) -> StoreResult<()> {
        let mut scope = self.lock();
        let (current, pending) = self.prepare_write(&mut scope, "update", entity.id())?;
        if current.is_none() {
            return Err(StoreError::EntityMissing {
                iri: entity.id().as_str().to_string(),
            });
        }
        let target = (!entity.is_empty()).then(|| entity.clone());
        pending.insert(entity.id().clone(), target);
        Ok(())
    }

    fn delete(&self, entity: &Entity) -> StoreResult<()> {
        let mut scope = self.lock();
        let (_, pending) = self.prepare_write(&mut scope, "delete", entity.id())?;
        pending.insert(entity.id().clone(), None);
        Ok(())
    }

    fn query(&self, sparql: &str) -> StoreResult<Vec<QueryRow>> {
        sparql::run_query(&self.store, sparql)
    }

    fn statements(&self) -> StoreResult<Vec<Statement>> {
        let rows = sparql::run_query(&self.store, "SELECT ?s ?p ?o WHERE { ?s ?p ?o }")?;
        let mut statements = sparql::rows_to_statements(&rows).map_err(|e| StoreError::Sparql {
            message: e.to_string(),
        })?;
        statements.sort();
        Ok(statements)
    }
}

impl std::fmt::Debug for OxiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxiStore")
            .field("path", &self.path)
            .field("scope", &self.scope())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    fn alice() -> Entity {
        Entity::new(iri("alice"))
            .with(iri("name"), Literal::string("Alice"))
            .with(iri("knows"), iri("bob"))
    }

    #[test]
    fn get_absent_is_none() {
        let store = OxiStore::in_memory().unwrap();
        assert_eq!(store.get(&iri("nobody")).unwrap(), None);
    }

    #[test]
    fn create_commit_get() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        store.commit().unwrap();

        assert_eq!(store.get(&iri("alice")).unwrap(), Some(alice()));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.scope(), ScopeState::Closed);
    }

    #[test]
    fn mutation_without_write_scope_is_rejected() {
        let store = OxiStore::in_memory().unwrap();
        assert!(matches!(
            store.create(&alice()),
            Err(StoreError::NoWriteScope { .. })
        ));

        store.begin_read().unwrap();
        assert!(matches!(
            store.update(&alice()),
            Err(StoreError::NoWriteScope { .. })
        ));
        store.commit().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn commit_or_abort_without_scope_is_rejected() {
        let store = OxiStore::in_memory().unwrap();
        assert!(matches!(store.commit(), Err(StoreError::NoOpenScope { .. })));
        assert!(matches!(store.abort(), Err(StoreError::NoOpenScope { .. })));
    }

    #[test]
    fn nested_scope_is_rejected() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_read().unwrap();
        assert!(matches!(
            store.begin_write(),
            Err(StoreError::ScopeAlreadyOpen { .. })
        ));
        store.abort().unwrap();
        store.begin_write().unwrap();
        assert_eq!(store.scope(), ScopeState::Write);
        store.commit().unwrap();
    }

    #[test]
    fn abort_restores_prior_state() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        store.commit().unwrap();

        store.begin_write().unwrap();
        let mut changed = alice();
        changed.replace(iri("name"), Literal::string("Alicia"));
        store.update(&changed).unwrap();
        store
            .create(&Entity::new(iri("carol")).with(iri("name"), Literal::string("Carol")))
            .unwrap();
        // Lookups inside the scope see its writes.
        assert_eq!(store.get(&iri("alice")).unwrap(), Some(changed));
        store.abort().unwrap();

        assert_eq!(store.get(&iri("alice")).unwrap(), Some(alice()));
        assert_eq!(store.get(&iri("carol")).unwrap(), None);
    }

    #[test]
    fn create_existing_and_update_missing_fail() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        assert!(matches!(
            store.create(&alice()),
            Err(StoreError::EntityExists { .. })
        ));
        assert!(matches!(
            store.update(&Entity::new(iri("ghost")).with(iri("p"), iri("x"))),
            Err(StoreError::EntityMissing { .. })
        ));
        store.commit().unwrap();
    }

    #[test]
    fn update_with_empty_entity_deletes() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        store.update(&Entity::new(iri("alice"))).unwrap();
        store.commit().unwrap();
        assert_eq!(store.get(&iri("alice")).unwrap(), None);
    }

    #[test]
    fn delete_removes_all_statements() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        store.delete(&Entity::new(iri("alice"))).unwrap();
        // Deleting an absent subject is a no-op.
        store.delete(&Entity::new(iri("nobody"))).unwrap();
        store.commit().unwrap();
        assert!(store.statements().unwrap().is_empty());
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = OxiStore::open(dir.path()).unwrap();
            store.begin_write().unwrap();
            store.create(&alice()).unwrap();
            store.commit().unwrap();
        }
        let store = OxiStore::open(dir.path()).unwrap();
        assert_eq!(store.get(&iri("alice")).unwrap(), Some(alice()));
    }

    #[test]
    fn scope_writes_reach_the_store_only_on_commit() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        assert_eq!(store.get(&iri("alice")).unwrap(), Some(alice()));
        assert!(store.statements().unwrap().is_empty());
        assert!(store.query("SELECT ?s WHERE { ?s ?p ?o }").unwrap().is_empty());
        store.commit().unwrap();
        assert_eq!(store.statements().unwrap().len(), 2);
    }

    #[test]
    fn repeated_writes_to_one_subject_commit_the_last_state() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        store.create(&alice()).unwrap();
        let renamed = Entity::new(iri("alice")).with(iri("name"), Literal::string("Alicia"));
        store.update(&renamed).unwrap();
        store.delete(&Entity::new(iri("alice"))).unwrap();
        store.create(&renamed).unwrap();
        store.commit().unwrap();
        assert_eq!(store.get(&iri("alice")).unwrap(), Some(renamed));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn uncommitted_scope_leaves_nothing_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = OxiStore::open(dir.path()).unwrap();
            store.begin_write().unwrap();
            store.create(&alice()).unwrap();
            store.commit().unwrap();

            store.begin_write().unwrap();
            store.delete(&alice()).unwrap();
            store
                .create(&Entity::new(iri("carol")).with(iri("name"), Literal::string("Carol")))
                .unwrap();
            // Dropped with the scope still open.
        }
        let store = OxiStore::open(dir.path()).unwrap();
        assert_eq!(store.scope(), ScopeState::Closed);
        assert_eq!(store.get(&iri("alice")).unwrap(), Some(alice()));
        assert_eq!(store.get(&iri("carol")).unwrap(), None);
    }
}
