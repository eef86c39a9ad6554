//! In-memory statement index.
//!
//! Uses `DashMap` secondary indexes for fast lookups by subject or predicate.
//! This is the working graph of the rule engine: selection results are loaded
//! here, rules match against it, and derived statements are inserted back.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::{DashMap, DashSet};

use crate::iri::Iri;

use super::{Statement, Term};

/// Indexed, deduplicated statement set.
pub struct StatementIndex {
    /// Membership set.
    statements: DashSet<Statement>,
    /// Predicate index: predicate → statements using it.
    by_predicate: DashMap<Iri, Vec<Statement>>,
    /// Subject index: subject → statements about it.
    by_subject: DashMap<Iri, Vec<Statement>>,
    count: AtomicUsize,
}

impl StatementIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            statements: DashSet::new(),
            by_predicate: DashMap::new(),
            by_subject: DashMap::new(),
            count: AtomicUsize::new(0),
        }
    }

    /// Build an index from statements, dropping duplicates.
    pub fn from_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        let index = Self::new();
        for st in statements {
            index.insert(st);
        }
        index
    }

    /// Insert a statement. Returns `false` if it was already present.
    pub fn insert(&self, statement: Statement) -> bool {
        if !self.statements.insert(statement.clone()) {
            return false;
        }
        self.by_predicate
            .entry(statement.predicate.clone())
            .or_default()
            .push(statement.clone());
        self.by_subject
            .entry(statement.subject.clone())
            .or_default()
            .push(statement);
        self.count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Whether the exact statement is present.
    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains(statement)
    }

    /// All statements with the given predicate.
    pub fn with_predicate(&self, predicate: &Iri) -> Vec<Statement> {
        self.by_predicate
            .get(predicate)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// All statements with the given subject.
    pub fn with_subject(&self, subject: &Iri) -> Vec<Statement> {
        self.by_subject
            .get(subject)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Statements matching a pattern; `None` positions are wildcards.
    ///
    /// Picks the narrowest available index: subject, then predicate, then a
    /// full scan.
    pub fn matching(
        &self,
        subject: Option<&Iri>,
        predicate: Option<&Iri>,
        object: Option<&Term>,
    ) -> Vec<Statement> {
        if let (Some(s), Some(p), Some(o)) = (subject, predicate, object) {
            let candidate = Statement::new(s.clone(), p.clone(), o.clone());
            return if self.contains(&candidate) { vec![candidate] } else { vec![] };
        }
        let candidates = match (subject, predicate) {
            (Some(s), _) => self.with_subject(s),
            (None, Some(p)) => self.with_predicate(p),
            (None, None) => self.all(),
        };
        candidates
            .into_iter()
            .filter(|st| predicate.is_none_or(|p| &st.predicate == p))
            .filter(|st| object.is_none_or(|o| &st.object == o))
            .collect()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All statements, sorted.
    pub fn all(&self) -> Vec<Statement> {
        let mut all: Vec<Statement> = self.statements.iter().map(|s| s.key().clone()).collect();
        all.sort();
        all
    }
}

impl Default for StatementIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatementIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementIndex")
            .field("statements", &self.len())
            .field("subjects", &self.by_subject.len())
            .field("predicates", &self.by_predicate.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    fn st(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(iri(s), iri(p), iri(o))
    }

    #[test]
    fn insert_deduplicates() {
        let index = StatementIndex::new();
        assert!(index.insert(st("a", "p", "b")));
        assert!(!index.insert(st("a", "p", "b")));
        assert_eq!(index.len(), 1);
        assert_eq!(index.with_predicate(&iri("p")).len(), 1);
    }

    #[test]
    fn matching_uses_wildcards() {
        let index = StatementIndex::from_statements(vec![
            st("a", "p", "b"),
            st("a", "q", "c"),
            st("b", "p", "c"),
        ]);
        assert_eq!(index.matching(Some(&iri("a")), None, None).len(), 2);
        assert_eq!(index.matching(None, Some(&iri("p")), None).len(), 2);
        assert_eq!(
            index
                .matching(None, Some(&iri("p")), Some(&Term::Iri(iri("c"))))
                .len(),
            1
        );
        assert_eq!(index.matching(None, None, None).len(), 3);
        assert_eq!(
            index
                .matching(Some(&iri("a")), Some(&iri("p")), Some(&Term::Iri(iri("b"))))
                .len(),
            1
        );
    }

    #[test]
    fn all_is_sorted() {
        let index = StatementIndex::from_statements(vec![st("b", "p", "c"), st("a", "p", "b")]);
        let all = index.all();
        assert_eq!(all[0], st("a", "p", "b"));
        assert_eq!(all[1], st("b", "p", "c"));
    }

    #[test]
    fn empty_queries() {
        let index = StatementIndex::new();
        assert!(index.is_empty());
        assert!(index.with_subject(&iri("a")).is_empty());
        assert!(index.matching(None, Some(&iri("p")), None).is_empty());
    }
}
