//! Forward-chaining rule engine with pattern matching.
//!
//! Derive rules run to a closed fixed point over an in-memory
//! [`StatementIndex`]. Every round matches all rules against the same snapshot
//! in parallel, then merges what they produced; the loop ends at the first
//! round that adds nothing new.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::change::{ChangeOp, ChangeSet, Transformation};
use crate::error::{OntoResult, RuleError};
use crate::graph::index::StatementIndex;
use crate::graph::sparql::rows_to_statements;
use crate::graph::{Statement, Term};
use crate::store::{GraphStore, OxiStore, StoreResult};

use super::rules::{InferenceRule, RuleSet, RuleTerm, TriplePattern};

/// Variable name → bound value.
pub type Bindings = BTreeMap<String, Term>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the forward-chaining rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Maximum rounds, including the final round that derives nothing (default: 64).
    pub max_iterations: usize,
    /// Hard cap on total derived statements (default: 100 000).
    pub max_new_statements: usize,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            max_new_statements: 100_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A derived statement with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStatement {
    pub statement: Statement,
    pub rule_name: String,
    /// Round in which it was first derived, starting at 1.
    pub round: usize,
    /// The statements matched by the rule's `match:` patterns.
    pub antecedents: Vec<Statement>,
}

/// Derived statements and the number of rounds run.
#[derive(Debug, Clone, Default)]
pub struct Saturation {
    pub derived: Vec<DerivedStatement>,
    pub iterations: usize,
}

/// Result of [`RuleEngine::infer`].
#[derive(Debug)]
pub struct InferenceOutcome {
    /// A new in-memory store holding the selection, schema and derivations.
    pub store: OxiStore,
    pub derived: Vec<DerivedStatement>,
    pub iterations: usize,
}

// ---------------------------------------------------------------------------
// Rule engine
// ---------------------------------------------------------------------------

/// Forward-chaining rule engine.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleEngineConfig,
}

impl RuleEngine {
    pub fn new(config: RuleEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    /// Run the derive rules of `rules` over `index` until nothing new appears.
    ///
    /// Derived statements are inserted into `index`.
    pub fn saturate(&self, index: &StatementIndex, rules: &RuleSet) -> Result<Saturation, RuleError> {
        let rules: Vec<&InferenceRule> = rules.derive_rules().collect();
        let mut derived: Vec<DerivedStatement> = Vec::new();

        for round in 1..=self.config.max_iterations {
            let candidates: Vec<Vec<DerivedStatement>> = rules
                .par_iter()
                .map(|rule| derive_with(rule, index, round))
                .collect();

            let mut new_this_round = 0;
            for candidate in candidates.into_iter().flatten() {
                if !index.insert(candidate.statement.clone()) {
                    continue;
                }
                derived.push(candidate);
                new_this_round += 1;
                if derived.len() > self.config.max_new_statements {
                    return Err(RuleError::TooManyDerivations {
                        limit: self.config.max_new_statements,
                    });
                }
            }
            tracing::debug!(round, new = new_this_round, total = index.len(), "inference round");

            if new_this_round == 0 {
                return Ok(Saturation {
                    derived,
                    iterations: round,
                });
            }
        }

        Err(RuleError::MaxIterations {
            max_iterations: self.config.max_iterations,
        })
    }

    /// Select a subgraph from `store`, add `schema`, and saturate it.
    ///
    /// The source store is only read; results land in a fresh in-memory store.
    pub fn infer<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        selection: &str,
        rules: &RuleSet,
        schema: &[Statement],
    ) -> OntoResult<InferenceOutcome> {
        let index = load_index(store, selection, schema)?;
        let selected = index.len();
        let saturation = self.saturate(&index, rules)?;
        let out = materialize(index.all())?;

        tracing::info!(
            selected,
            derived = saturation.derived.len(),
            iterations = saturation.iterations,
            "inference complete"
        );
        Ok(InferenceOutcome {
            store: out,
            derived: saturation.derived,
            iterations: saturation.iterations,
        })
    }
}

/// Run a selection query (CONSTRUCT, or SELECT binding `?s ?p ?o`) and index
/// its statements together with `schema`.
pub fn load_index<S: GraphStore + ?Sized>(
    store: &S,
    selection: &str,
    schema: &[Statement],
) -> OntoResult<StatementIndex> {
    let rows = store.query(selection)?;
    let statements = rows_to_statements(&rows)?;
    let index = StatementIndex::from_statements(statements);
    for st in schema {
        index.insert(st.clone());
    }
    Ok(index)
}

/// Write statements into a new in-memory store.
pub fn materialize(statements: Vec<Statement>) -> StoreResult<OxiStore> {
    let store = OxiStore::in_memory()?;
    let change_set: ChangeSet = statements.into_iter().map(ChangeOp::add).collect();
    Transformation::single(change_set).apply_atomically(&store)?;
    Ok(store)
}

fn derive_with(rule: &InferenceRule, index: &StatementIndex, round: usize) -> Vec<DerivedStatement> {
    let mut out = Vec::new();
    for (bindings, matched) in match_patterns(index, &rule.antecedents, Bindings::new()) {
        for consequent in &rule.consequents {
            let Some(statement) = instantiate(consequent, &bindings) else {
                continue;
            };
            if index.contains(&statement) {
                continue;
            }
            out.push(DerivedStatement {
                statement,
                rule_name: rule.name.clone(),
                round,
                antecedents: matched.clone(),
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Pattern matching
// ---------------------------------------------------------------------------

/// Join `patterns` against `index`, extending `initial`.
///
/// Returns every (bindings, matched statements) combination.
pub(crate) fn match_patterns(
    index: &StatementIndex,
    patterns: &[TriplePattern],
    initial: Bindings,
) -> Vec<(Bindings, Vec<Statement>)> {
    let mut results = vec![(initial, Vec::new())];
    for pattern in patterns {
        let mut next = Vec::new();
        for (bindings, matched) in &results {
            for (extended, statement) in match_pattern(index, pattern, bindings) {
                let mut statements = matched.clone();
                statements.push(statement);
                next.push((extended, statements));
            }
        }
        results = next;
        if results.is_empty() {
            break;
        }
    }
    results
}

/// Match one pattern given existing bindings.
fn match_pattern(
    index: &StatementIndex,
    pattern: &TriplePattern,
    bindings: &Bindings,
) -> Vec<(Bindings, Statement)> {
    let subject = resolve(&pattern.subject, bindings);
    let predicate = resolve(&pattern.predicate, bindings);
    let object = resolve(&pattern.object, bindings);

    // A literal bound into subject or predicate position can never match.
    let subject_iri = match subject {
        Some(term) => match term.as_iri() {
            Some(iri) => Some(iri),
            None => return Vec::new(),
        },
        None => None,
    };
    let predicate_iri = match predicate {
        Some(term) => match term.as_iri() {
            Some(iri) => Some(iri),
            None => return Vec::new(),
        },
        None => None,
    };

    let mut results = Vec::new();
    for statement in index.matching(subject_iri, predicate_iri, object) {
        let mut extended = bindings.clone();
        let matched = bind(&pattern.subject, Term::Iri(statement.subject.clone()), &mut extended)
            && bind(&pattern.predicate, Term::Iri(statement.predicate.clone()), &mut extended)
            && bind(&pattern.object, statement.object.clone(), &mut extended);
        if matched {
            results.push((extended, statement));
        }
    }
    results
}

fn resolve<'a>(term: &'a RuleTerm, bindings: &'a Bindings) -> Option<&'a Term> {
    match term {
        RuleTerm::Variable(name) => bindings.get(name),
        RuleTerm::Value(value) => Some(value),
    }
}

/// Bind or check one position. Handles a variable repeated in one pattern.
fn bind(term: &RuleTerm, value: Term, bindings: &mut Bindings) -> bool {
    match term {
        RuleTerm::Value(expected) => *expected == value,
        RuleTerm::Variable(name) => match bindings.get(name) {
            Some(existing) => *existing == value,
            None => {
                bindings.insert(name.clone(), value);
                true
            }
        },
    }
}

/// Fill a pattern from bindings. `None` if a variable is unbound or a literal
/// lands in subject or predicate position.
pub(crate) fn instantiate(pattern: &TriplePattern, bindings: &Bindings) -> Option<Statement> {
    let subject = resolve(&pattern.subject, bindings)?.as_iri()?.clone();
    let predicate = resolve(&pattern.predicate, bindings)?.as_iri()?.clone();
    let object = resolve(&pattern.object, bindings)?.clone();
    Some(Statement::new(subject, predicate, object))
}
