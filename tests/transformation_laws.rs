//! Algebraic laws of change sets and transformations against a real store.

use ontograph::change::{ChangeSet, Transformation};
use ontograph::error::StoreError;
use ontograph::graph::{Entity, Literal, Statement};
use ontograph::iri::Iri;
use ontograph::store::{GraphStore, OxiStore, ScopeState};

fn iri(s: &str) -> Iri {
    Iri::new(format!("http://example.org/{s}")).unwrap()
}

fn st(s: &str, p: &str, o: &str) -> Statement {
    Statement::new(iri(s), iri(p), iri(o))
}

/// A store holding a few subjects with overlapping predicates.
fn seeded_store() -> OxiStore {
    let store = OxiStore::in_memory().unwrap();
    let mut seed = ChangeSet::new();
    seed.add(st("a", "knows", "b"))
        .add(st("a", "knows", "c"))
        .add(st("b", "knows", "c"))
        .add(Statement::new(iri("a"), iri("name"), Literal::string("Ann")))
        .add(Statement::new(iri("c"), iri("age"), Literal::integer(41)));
    Transformation::single(seed).apply_atomically(&store).unwrap();
    store
}

fn apply_effective(store: &OxiStore, t: &Transformation) -> Transformation {
    store.begin_write().unwrap();
    let (effective, _) = t.apply_effective(store).unwrap();
    store.commit().unwrap();
    effective
}

fn mixed_change_set() -> ChangeSet {
    let mut cs = ChangeSet::new();
    cs.remove(st("a", "knows", "c"))
        .remove(st("b", "knows", "c"))
        .add(st("b", "knows", "d"))
        .add(st("d", "knows", "a"))
        .replace(iri("a"), iri("name"), Literal::string("Ann"), Literal::string("Anna"));
    cs
}

#[test]
fn inverse_restores_store() {
    let store = seeded_store();
    let before = store.statements().unwrap();

    let t = Transformation::single(mixed_change_set());
    t.apply_atomically(&store).unwrap();
    assert_ne!(store.statements().unwrap(), before);

    t.invert().apply_atomically(&store).unwrap();
    assert_eq!(store.statements().unwrap(), before);
}

#[test]
fn inverse_of_effective_restores_with_redundant_operations() {
    let store = seeded_store();
    let before = store.statements().unwrap();

    // Adds an existing statement and removes an absent one; neither may be undone.
    let mut cs = ChangeSet::new();
    cs.add(st("a", "knows", "b"))
        .remove(st("z", "knows", "a"))
        .add(st("a", "knows", "z"))
        .remove(st("b", "knows", "c"));
    let effective = apply_effective(&store, &Transformation::single(cs));
    assert_eq!(effective.operation_count(), 2);

    effective.invert().apply_atomically(&store).unwrap();
    assert_eq!(store.statements().unwrap(), before);
}

#[test]
fn add_and_remove_are_idempotent() {
    let once = seeded_store();
    let twice = seeded_store();

    let mut add = ChangeSet::new();
    add.add(st("x", "knows", "y"));
    let add = Transformation::single(add);
    add.apply_atomically(&once).unwrap();
    add.apply_atomically(&twice).unwrap();
    add.apply_atomically(&twice).unwrap();
    assert_eq!(once.statements().unwrap(), twice.statements().unwrap());

    let mut remove = ChangeSet::new();
    remove.remove(st("a", "knows", "b"));
    let remove = Transformation::single(remove);
    remove.apply_atomically(&once).unwrap();
    remove.apply_atomically(&twice).unwrap();
    remove.apply_atomically(&twice).unwrap();
    assert_eq!(once.statements().unwrap(), twice.statements().unwrap());
}

#[test]
fn and_then_is_associative() {
    let mut c1 = ChangeSet::new();
    c1.add(st("x", "knows", "y")).remove(st("a", "knows", "b"));
    let mut c2 = ChangeSet::new();
    c2.remove(st("x", "knows", "y")).add(st("y", "knows", "x"));
    let mut c3 = ChangeSet::new();
    c3.add(st("a", "knows", "b")).remove(st("c", "age", "nothing"));
    let (t1, t2, t3) = (
        Transformation::single(c1),
        Transformation::single(c2),
        Transformation::single(c3),
    );

    let left = seeded_store();
    t1.clone()
        .and_then(t2.clone())
        .and_then(t3.clone())
        .apply_atomically(&left)
        .unwrap();

    let right = seeded_store();
    t1.and_then(t2.and_then(t3)).apply_atomically(&right).unwrap();

    assert_eq!(left.statements().unwrap(), right.statements().unwrap());
}

#[test]
fn later_change_sets_see_earlier_ones() {
    let store = seeded_store();
    let mut first = ChangeSet::new();
    first.add(st("n", "knows", "m"));
    let mut second = ChangeSet::new();
    second.remove(st("n", "knows", "m"));

    Transformation::from_change_sets(vec![first, second])
        .apply_atomically(&store)
        .unwrap();
    assert_eq!(store.get(&iri("n")).unwrap(), None);
}

#[test]
fn apply_without_scope_leaves_store_unchanged() {
    let store = seeded_store();
    let before = store.statements().unwrap();

    let err = mixed_change_set().apply(&store).unwrap_err();
    assert!(matches!(err, StoreError::NoWriteScope { .. }));
    store.begin_read().unwrap();
    assert!(matches!(
        mixed_change_set().apply(&store),
        Err(StoreError::NoWriteScope { .. })
    ));
    store.commit().unwrap();

    assert_eq!(store.statements().unwrap(), before);
}

#[test]
fn abort_discards_applied_changes() {
    let store = seeded_store();
    let before = store.statements().unwrap();

    store.begin_write().unwrap();
    mixed_change_set().apply(&store).unwrap();
    store
        .create(&Entity::new(iri("fresh")).with(iri("knows"), iri("a")))
        .unwrap();
    store.abort().unwrap();

    assert_eq!(store.scope(), ScopeState::Closed);
    assert_eq!(store.statements().unwrap(), before);
}

#[test]
fn failed_atomic_apply_rolls_back() {
    let store = seeded_store();
    let before = store.statements().unwrap();

    // A read scope is already open, so the write scope cannot begin.
    store.begin_read().unwrap();
    let result = Transformation::single(mixed_change_set()).apply_atomically(&store);
    assert!(matches!(result, Err(StoreError::ScopeAlreadyOpen { .. })));
    store.commit().unwrap();

    assert_eq!(store.statements().unwrap(), before);
}
