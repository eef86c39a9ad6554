//! SPARQL plumbing over oxigraph.
//!
//! Converts statements to and from oxigraph quads (always in the default
//! graph) and runs queries, turning solutions into [`QueryRow`]s that keep the
//! query's declared order.

use oxigraph::model::{GraphName, Literal as OxLiteral, NamedNode, Quad, Term as OxTerm};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::{QueryError, StoreError};
use crate::iri::Iri;
use crate::store::StoreResult;

use super::{Literal, Statement, Term};

/// One result row: variable name → bound term, in projection order.
///
/// Variables left unbound by `OPTIONAL` clauses are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRow {
    bindings: Vec<(String, Term)>,
}

impl QueryRow {
    /// Build a row from (variable, term) pairs.
    pub fn new(bindings: Vec<(String, Term)>) -> Self {
        Self { bindings }
    }

    /// The term bound to `var` (without the leading `?`).
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, term)| term)
    }

    /// The IRI bound to `var`, if it is bound to an IRI.
    pub fn iri(&self, var: &str) -> Option<&Iri> {
        self.get(var).and_then(Term::as_iri)
    }

    /// Iterate bindings in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(name, term)| (name.as_str(), term))
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Read the row as a statement from its `s`, `p` and `o` bindings.
    pub fn to_statement(&self) -> Result<Statement, QueryError> {
        let subject = self.iri("s").ok_or_else(|| QueryError::NotStatements {
            message: "?s is unbound or not an IRI".into(),
        })?;
        let predicate = self.iri("p").ok_or_else(|| QueryError::NotStatements {
            message: "?p is unbound or not an IRI".into(),
        })?;
        let object = self.get("o").ok_or_else(|| QueryError::NotStatements {
            message: "?o is unbound".into(),
        })?;
        Ok(Statement::new(subject.clone(), predicate.clone(), object.clone()))
    }
}

/// Convert one of our terms to an oxigraph term.
pub(crate) fn term_to_oxigraph(term: &Term) -> StoreResult<OxTerm> {
    Ok(match term {
        Term::Iri(iri) => OxTerm::NamedNode(iri.to_named_node()),
        Term::Literal(lit) => OxTerm::Literal(literal_to_oxigraph(lit)?),
    })
}

fn literal_to_oxigraph(lit: &Literal) -> StoreResult<OxLiteral> {
    match &lit.language {
        Some(lang) => OxLiteral::new_language_tagged_literal(lit.lexical.as_str(), lang.as_str())
            .map_err(|e| StoreError::UnsupportedTerm {
                term: format!("{lit} ({e})"),
            }),
        None => Ok(OxLiteral::new_typed_literal(
            lit.lexical.as_str(),
            lit.datatype.to_named_node(),
        )),
    }
}

/// Convert an oxigraph term back. Blank nodes and quoted triples are rejected.
pub(crate) fn term_from_oxigraph(term: &OxTerm) -> StoreResult<Term> {
    match term {
        OxTerm::NamedNode(node) => Ok(Term::Iri(Iri::from_named_node(node))),
        OxTerm::Literal(lit) => {
            let datatype = NamedNode::from(lit.datatype());
            Ok(Term::Literal(Literal {
                lexical: lit.value().to_string(),
                datatype: Iri::from_named_node(&datatype),
                language: lit.language().map(str::to_string),
            }))
        }
        #[allow(unreachable_patterns)]
        other => Err(StoreError::UnsupportedTerm {
            term: other.to_string(),
        }),
    }
}

/// Convert a statement into a default-graph quad.
pub(crate) fn to_quad(statement: &Statement) -> StoreResult<Quad> {
    Ok(Quad::new(
        statement.subject.to_named_node(),
        statement.predicate.to_named_node(),
        term_to_oxigraph(&statement.object)?,
        GraphName::DefaultGraph,
    ))
}

/// Execute a SPARQL query against an oxigraph store.
///
/// SELECT rows keep projection order; ASK yields a single `result` row with a
/// boolean literal; CONSTRUCT/DESCRIBE yields one `s`/`p`/`o` row per triple.
#[allow(deprecated)]
pub(crate) fn run_query(store: &Store, sparql: &str) -> StoreResult<Vec<QueryRow>> {
    let results = store.query(sparql).map_err(|e| StoreError::Sparql {
        message: format!("query failed: {e}"),
    })?;

    match results {
        QueryResults::Solutions(solutions) => {
            let mut rows = Vec::new();
            for solution in solutions {
                let solution = solution.map_err(|e| StoreError::Sparql {
                    message: format!("solution error: {e}"),
                })?;
                let mut bindings = Vec::new();
                for (var, term) in solution.iter() {
                    bindings.push((var.as_str().to_string(), term_from_oxigraph(term)?));
                }
                rows.push(QueryRow::new(bindings));
            }
            Ok(rows)
        }
        QueryResults::Boolean(b) => Ok(vec![QueryRow::new(vec![(
            "result".to_string(),
            Term::Literal(Literal::boolean(b)),
        )])]),
        QueryResults::Graph(triples) => {
            let mut rows = Vec::new();
            for triple in triples {
                let triple = triple.map_err(|e| StoreError::Sparql {
                    message: format!("triple error: {e}"),
                })?;
                let subject = OxTerm::from(triple.subject);
                let predicate = OxTerm::NamedNode(triple.predicate);
                rows.push(QueryRow::new(vec![
                    ("s".to_string(), term_from_oxigraph(&subject)?),
                    ("p".to_string(), term_from_oxigraph(&predicate)?),
                    ("o".to_string(), term_from_oxigraph(&triple.object)?),
                ]));
            }
            Ok(rows)
        }
    }
}

/// Read rows produced by a selection query as statements.
pub fn rows_to_statements(rows: &[QueryRow]) -> Result<Vec<Statement>, QueryError> {
    rows.iter().map(QueryRow::to_statement).collect()
}
