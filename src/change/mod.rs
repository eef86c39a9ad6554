//! Change sets: atomic, invertible batches of statement edits.
//!
//! A [`ChangeSet`] is an ordered list of [`ChangeOp`]s. Applying it groups the
//! operations per subject, removes before it adds, and writes each touched
//! subject back to the store as a whole entity. A [`Transformation`] chains
//! change sets inside one write scope.

pub mod transformation;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::{Entity, Statement, Term};
use crate::iri::Iri;
use crate::store::{GraphStore, ScopeState, StoreResult};

pub use transformation::Transformation;

/// Whether an operation adds or removes its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
}

impl ChangeKind {
    /// The opposite kind.
    pub fn flipped(self) -> Self {
        match self {
            ChangeKind::Add => ChangeKind::Remove,
            ChangeKind::Remove => ChangeKind::Add,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "+"),
            ChangeKind::Remove => write!(f, "-"),
        }
    }
}

/// One requested mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeOp {
    pub kind: ChangeKind,
    pub statement: Statement,
}

impl ChangeOp {
    pub fn add(statement: Statement) -> Self {
        Self {
            kind: ChangeKind::Add,
            statement,
        }
    }

    pub fn remove(statement: Statement) -> Self {
        Self {
            kind: ChangeKind::Remove,
            statement,
        }
    }

    /// The same statement with the opposite kind.
    pub fn inverted(&self) -> Self {
        Self {
            kind: self.kind.flipped(),
            statement: self.statement.clone(),
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.statement)
    }
}

/// Per-subject outcome counts of an apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ApplyStats {
    /// Subjects that were written.
    pub fn written(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

impl std::ops::AddAssign for ApplyStats {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.deleted += rhs.deleted;
        self.unchanged += rhs.unchanged;
    }
}

impl std::fmt::Display for ApplyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged",
            self.created, self.updated, self.deleted, self.unchanged
        )
    }
}

/// An ordered batch of statement edits applied as one unit.
///
/// Within a change set every removal happens before every addition, so
/// `[add x, remove x]` leaves `x` present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    operations: Vec<ChangeOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_operations(operations: Vec<ChangeOp>) -> Self {
        Self { operations }
    }

    /// Request that `statement` be present.
    pub fn add(&mut self, statement: Statement) -> &mut Self {
        self.operations.push(ChangeOp::add(statement));
        self
    }

    /// Request that `statement` be absent.
    pub fn remove(&mut self, statement: Statement) -> &mut Self {
        self.operations.push(ChangeOp::remove(statement));
        self
    }

    /// Swap one value of `predicate` for another.
    pub fn replace(
        &mut self,
        subject: Iri,
        predicate: Iri,
        old: impl Into<Term>,
        new: impl Into<Term>,
    ) -> &mut Self {
        self.remove(Statement::new(subject.clone(), predicate.clone(), old));
        self.add(Statement::new(subject, predicate, new))
    }

    pub fn operations(&self) -> &[ChangeOp] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Distinct subjects touched, in IRI order.
    pub fn subjects(&self) -> BTreeSet<Iri> {
        self.operations
            .iter()
            .map(|op| op.statement.subject.clone())
            .collect()
    }

    /// Reverse the operation list and flip every kind.
    pub fn invert(&self) -> Self {
        Self {
            operations: self.operations.iter().rev().map(ChangeOp::inverted).collect(),
        }
    }

    /// Apply to `store`, which must have a write scope open.
    pub fn apply<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<ApplyStats> {
        if store.scope() != ScopeState::Write {
            return Err(StoreError::NoWriteScope {
                operation: "apply change set".into(),
            });
        }

        let mut stats = ApplyStats::default();
        for (subject, (removes, adds)) in self.group_by_subject() {
            let current = store.get(&subject)?;
            let mut target = current.clone().unwrap_or_else(|| Entity::new(subject.clone()));
            for st in removes {
                target.remove(&st.predicate, &st.object);
            }
            for st in adds {
                target.add(st.predicate.clone(), st.object.clone());
            }

            match current {
                None if target.is_empty() => stats.unchanged += 1,
                None => {
                    store.create(&target)?;
                    stats.created += 1;
                }
                Some(before) if before == target => stats.unchanged += 1,
                Some(_) if target.is_empty() => {
                    store.delete(&target)?;
                    stats.deleted += 1;
                }
                Some(_) => {
                    store.update(&target)?;
                    stats.updated += 1;
                }
            }
        }
        tracing::debug!(operations = self.len(), %stats, "change set applied");
        Ok(stats)
    }

    /// Only the operations that would change `store`, deduplicated.
    ///
    /// Each touched statement's end state is computed with the
    /// removes-before-adds rule; a statement whose end state matches its
    /// current presence yields no operation.
    pub fn effective_against<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<ChangeSet> {
        let mut entities: BTreeMap<Iri, Option<Entity>> = BTreeMap::new();
        for subject in self.subjects() {
            let entity = store.get(&subject)?;
            entities.insert(subject, entity);
        }

        let removed: BTreeSet<&Statement> = self
            .operations
            .iter()
            .filter(|op| op.kind == ChangeKind::Remove)
            .map(|op| &op.statement)
            .collect();
        let added: BTreeSet<&Statement> = self
            .operations
            .iter()
            .filter(|op| op.kind == ChangeKind::Add)
            .map(|op| &op.statement)
            .collect();

        let mut seen = BTreeSet::new();
        let mut effective = ChangeSet::new();
        for op in &self.operations {
            let st = &op.statement;
            if !seen.insert(st) {
                continue;
            }
            let before = entities
                .get(&st.subject)
                .and_then(Option::as_ref)
                .is_some_and(|e| e.contains(&st.predicate, &st.object));
            let after = added.contains(st) || (before && !removed.contains(st));
            match (before, after) {
                (true, false) => {
                    effective.remove(st.clone());
                }
                (false, true) => {
                    effective.add(st.clone());
                }
                _ => {}
            }
        }
        Ok(effective)
    }

    fn group_by_subject(&self) -> BTreeMap<Iri, (Vec<&Statement>, Vec<&Statement>)> {
        let mut groups: BTreeMap<Iri, (Vec<&Statement>, Vec<&Statement>)> = BTreeMap::new();
        for op in &self.operations {
            let entry = groups.entry(op.statement.subject.clone()).or_default();
            match op.kind {
                ChangeKind::Remove => entry.0.push(&op.statement),
                ChangeKind::Add => entry.1.push(&op.statement),
            }
        }
        groups
    }
}

impl FromIterator<ChangeOp> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeOp>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for op in &self.operations {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;
    use crate::store::OxiStore;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    fn st(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(iri(s), iri(p), iri(o))
    }

    fn seeded() -> OxiStore {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        let mut seed = ChangeSet::new();
        seed.add(st("a", "p", "b")).add(st("a", "q", "c"));
        seed.apply(&store).unwrap();
        store.commit().unwrap();
        store
    }

    #[test]
    fn invert_reverses_and_flips() {
        let mut cs = ChangeSet::new();
        cs.add(st("a", "p", "b")).remove(st("c", "p", "d"));
        let inv = cs.invert();
        assert_eq!(
            inv.operations(),
            &[ChangeOp::add(st("c", "p", "d")), ChangeOp::remove(st("a", "p", "b"))]
        );
        assert_eq!(inv.invert(), cs);
    }

    #[test]
    fn apply_requires_write_scope() {
        let store = seeded();
        let before = store.statements().unwrap();
        let mut cs = ChangeSet::new();
        cs.add(st("x", "p", "y"));
        assert!(matches!(
            cs.apply(&store),
            Err(StoreError::NoWriteScope { .. })
        ));
        assert_eq!(store.statements().unwrap(), before);
    }

    #[test]
    fn removes_happen_before_adds() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        let mut cs = ChangeSet::new();
        cs.add(st("a", "p", "b")).remove(st("a", "p", "b"));
        cs.apply(&store).unwrap();
        store.commit().unwrap();
        assert_eq!(store.statements().unwrap(), vec![st("a", "p", "b")]);
    }

    #[test]
    fn stats_count_subject_outcomes() {
        let store = seeded();
        store.begin_write().unwrap();
        let mut cs = ChangeSet::new();
        cs.remove(st("a", "p", "b"))
            .remove(st("a", "q", "c"))
            .add(st("n", "p", "b"))
            .add(st("n", "p", "b"));
        let stats = cs.apply(&store).unwrap();
        store.commit().unwrap();
        assert_eq!(
            stats,
            ApplyStats {
                created: 1,
                updated: 0,
                deleted: 1,
                unchanged: 0
            }
        );
        assert_eq!(store.statements().unwrap(), vec![st("n", "p", "b")]);
    }

    #[test]
    fn adding_present_and_removing_absent_are_noops() {
        let store = seeded();
        let before = store.statements().unwrap();
        store.begin_write().unwrap();
        let mut cs = ChangeSet::new();
        cs.add(st("a", "p", "b")).remove(st("z", "p", "b"));
        let stats = cs.apply(&store).unwrap();
        store.commit().unwrap();
        assert_eq!(stats.written(), 0);
        assert_eq!(stats.unchanged, 2);
        assert_eq!(store.statements().unwrap(), before);
    }

    #[test]
    fn replace_swaps_a_value() {
        let store = OxiStore::in_memory().unwrap();
        store.begin_write().unwrap();
        let mut seed = ChangeSet::new();
        seed.add(Statement::new(iri("a"), iri("name"), Literal::string("old")));
        seed.apply(&store).unwrap();

        let mut cs = ChangeSet::new();
        cs.replace(iri("a"), iri("name"), Literal::string("old"), Literal::string("new"));
        let stats = cs.apply(&store).unwrap();
        store.commit().unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(
            store.statements().unwrap(),
            vec![Statement::new(iri("a"), iri("name"), Literal::string("new"))]
        );
    }

    #[test]
    fn effective_drops_noops_and_duplicates() {
        let store = seeded();
        let mut cs = ChangeSet::new();
        cs.add(st("a", "p", "b"))
            .add(st("a", "r", "d"))
            .add(st("a", "r", "d"))
            .remove(st("a", "q", "c"))
            .remove(st("z", "q", "c"));
        let effective = cs.effective_against(&store).unwrap();
        assert_eq!(
            effective.operations(),
            &[ChangeOp::add(st("a", "r", "d")), ChangeOp::remove(st("a", "q", "c"))]
        );
    }

    #[test]
    fn effective_respects_remove_then_add() {
        let store = seeded();
        let mut cs = ChangeSet::new();
        cs.remove(st("a", "p", "b")).add(st("a", "p", "b"));
        assert!(cs.effective_against(&store).unwrap().is_empty());
    }

    #[test]
    fn subjects_are_distinct() {
        let mut cs = ChangeSet::new();
        cs.add(st("b", "p", "x")).add(st("a", "p", "x")).remove(st("b", "q", "y"));
        let subjects: Vec<_> = cs.subjects().into_iter().collect();
        assert_eq!(subjects, vec![iri("a"), iri("b")]);
        assert_eq!(cs.len(), 3);
    }

    #[test]
    fn serde_json_shape() {
        let mut cs = ChangeSet::new();
        cs.add(st("a", "p", "b"));
        let json = serde_json::to_string(&cs).unwrap();
        assert!(json.contains("\"kind\":\"add\""));
        let back: ChangeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cs);
    }
}
