//! Entities: host-side views of all statements sharing one subject.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::iri::Iri;

use super::{Statement, Term};

/// A mutable, identity-bearing bag of statements sharing one subject IRI.
///
/// Values are kept in ordered sets, so duplicates collapse and two entities
/// with the same statements compare equal regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    id: Iri,
    #[serde(default)]
    properties: BTreeMap<Iri, BTreeSet<Term>>,
}

impl Entity {
    /// An entity with no statements.
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    /// Build an entity from statements, all of which must have `id` as subject.
    ///
    /// Returns the first statement about another subject as the error.
    pub fn from_statements(
        id: Iri,
        statements: impl IntoIterator<Item = Statement>,
    ) -> Result<Self, Statement> {
        let mut entity = Self::new(id);
        for st in statements {
            if st.subject != entity.id {
                return Err(st);
            }
            entity.add(st.predicate, st.object);
        }
        Ok(entity)
    }

    /// The subject IRI.
    pub fn id(&self) -> &Iri {
        &self.id
    }

    /// Add a value. Returns `false` if it was already present.
    pub fn add(&mut self, predicate: Iri, object: impl Into<Term>) -> bool {
        self.properties
            .entry(predicate)
            .or_default()
            .insert(object.into())
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, predicate: Iri, object: impl Into<Term>) -> Self {
        self.add(predicate, object);
        self
    }

    /// Remove a value. Returns `false` if it was absent.
    pub fn remove(&mut self, predicate: &Iri, object: &Term) -> bool {
        let Some(values) = self.properties.get_mut(predicate) else {
            return false;
        };
        let removed = values.remove(object);
        if values.is_empty() {
            self.properties.remove(predicate);
        }
        removed
    }

    /// Replace every value of `predicate` with a single new value.
    pub fn replace(&mut self, predicate: Iri, object: impl Into<Term>) {
        let mut values = BTreeSet::new();
        values.insert(object.into());
        self.properties.insert(predicate, values);
    }

    /// Drop all values of `predicate`, returning them.
    pub fn clear_predicate(&mut self, predicate: &Iri) -> BTreeSet<Term> {
        self.properties.remove(predicate).unwrap_or_default()
    }

    /// All values of `predicate`, in term order.
    pub fn values(&self, predicate: &Iri) -> impl Iterator<Item = &Term> {
        self.properties.get(predicate).into_iter().flatten()
    }

    /// The smallest value of `predicate`, if any.
    pub fn first_value(&self, predicate: &Iri) -> Option<&Term> {
        self.properties.get(predicate).and_then(|v| v.first())
    }

    /// Whether the exact statement is present.
    pub fn contains(&self, predicate: &Iri, object: &Term) -> bool {
        self.properties
            .get(predicate)
            .is_some_and(|values| values.contains(object))
    }

    /// Predicates with at least one value.
    pub fn predicates(&self) -> impl Iterator<Item = &Iri> {
        self.properties.keys()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.properties.values().map(BTreeSet::len).sum()
    }

    /// Whether the entity has no statements.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All statements, ordered by predicate then object.
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.properties.iter().flat_map(move |(predicate, values)| {
            values
                .iter()
                .map(move |object| Statement::new(self.id.clone(), predicate.clone(), object.clone()))
        })
    }

    /// Statements as a set, for diffing.
    pub fn statement_set(&self) -> BTreeSet<Statement> {
        self.statements().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    #[test]
    fn duplicates_collapse() {
        let mut e = Entity::new(iri("alice"));
        assert!(e.add(iri("name"), Literal::string("Alice")));
        assert!(!e.add(iri("name"), Literal::string("Alice")));
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn insertion_order_irrelevant() {
        let a = Entity::new(iri("x"))
            .with(iri("p"), iri("1"))
            .with(iri("p"), iri("2"));
        let b = Entity::new(iri("x"))
            .with(iri("p"), iri("2"))
            .with(iri("p"), iri("1"));
        assert_eq!(a, b);
    }

    #[test]
    fn remove_drops_empty_predicate() {
        let mut e = Entity::new(iri("x")).with(iri("p"), iri("1"));
        assert!(e.remove(&iri("p"), &Term::Iri(iri("1"))));
        assert!(e.is_empty());
        assert_eq!(e.predicates().count(), 0);
        assert!(!e.remove(&iri("p"), &Term::Iri(iri("1"))));
    }

    #[test]
    fn replace_keeps_single_value() {
        let mut e = Entity::new(iri("x"))
            .with(iri("p"), iri("1"))
            .with(iri("p"), iri("2"));
        e.replace(iri("p"), iri("3"));
        let values: Vec<_> = e.values(&iri("p")).collect();
        assert_eq!(values, vec![&Term::Iri(iri("3"))]);
    }

    #[test]
    fn from_statements_rejects_foreign_subject() {
        let own = Statement::new(iri("x"), iri("p"), iri("1"));
        let foreign = Statement::new(iri("y"), iri("p"), iri("1"));
        assert!(Entity::from_statements(iri("x"), vec![own.clone()]).is_ok());
        let err = Entity::from_statements(iri("x"), vec![own, foreign.clone()]).unwrap_err();
        assert_eq!(err, foreign);
    }

    #[test]
    fn statements_carry_subject() {
        let e = Entity::new(iri("x"))
            .with(iri("p"), iri("1"))
            .with(iri("q"), Literal::integer(3));
        let sts: Vec<_> = e.statements().collect();
        assert_eq!(sts.len(), 2);
        assert!(sts.iter().all(|s| s.subject == iri("x")));
    }
}
