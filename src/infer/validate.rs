//! Constraint validation over a saturated graph.
//!
//! The validator first closes the selected subgraph under the derive rules
//! (in memory only), then evaluates every violation rule once. Negated
//! `absent:` patterns are checked against the closed graph, so derived
//! statements can satisfy them. Violations are data: they come back as a
//! sorted [`ValidationReport`], never as an error.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OntoResult, RuleError};
use crate::graph::index::StatementIndex;
use crate::graph::{Statement, Term};
use crate::iri::Iri;
use crate::store::GraphStore;

use super::engine::{Bindings, RuleEngine, RuleEngineConfig, load_index, match_patterns};
use super::rules::{InferenceRule, ResourceSpec, RuleSet};

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// The resource a violation implicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationResource {
    Iri(Iri),
    /// The violation concerns no single resource.
    Wildcard,
}

impl std::fmt::Display for ViolationResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationResource::Iri(iri) => write!(f, "{iri}"),
            ViolationResource::Wildcard => write!(f, "*"),
        }
    }
}

/// One violation. Field order is the report's sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub violation_type: String,
    pub resource: ViolationResource,
    pub description: String,
    pub rule_name: String,
}

impl std::fmt::Display for ValidationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.violation_type, self.resource, self.description, self.rule_name
        )
    }
}

/// Sorted violations plus statistics of the derivation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub entries: Vec<ValidationEntry>,
    /// Statements derived before the violation rules ran.
    pub derived: usize,
    pub iterations: usize,
}

impl ValidationReport {
    /// Whether no violation was found.
    pub fn is_valid(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter()
    }

    /// Entries of one violation type.
    pub fn of_type<'a>(&'a self, violation_type: &'a str) -> impl Iterator<Item = &'a ValidationEntry> {
        self.entries
            .iter()
            .filter(move |e| e.violation_type == violation_type)
    }
}

/// Evaluates violation rules.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    engine: RuleEngine,
}

impl Validator {
    pub fn new(config: RuleEngineConfig) -> Self {
        Self {
            engine: RuleEngine::new(config),
        }
    }

    /// Validate a subgraph of `store` selected by `selection`, plus `schema`.
    pub fn validate<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        selection: &str,
        rules: &RuleSet,
        schema: &[Statement],
    ) -> OntoResult<ValidationReport> {
        let index = load_index(store, selection, schema)?;
        let report = self.validate_index(&index, rules)?;
        tracing::info!(
            violations = report.len(),
            derived = report.derived,
            "validation complete"
        );
        Ok(report)
    }

    /// Saturate `index` with the derive rules, then evaluate the violation rules.
    pub fn validate_index(
        &self,
        index: &StatementIndex,
        rules: &RuleSet,
    ) -> Result<ValidationReport, RuleError> {
        let saturation = self.engine.saturate(index, rules)?;
        let violation_rules: Vec<&InferenceRule> = rules.violation_rules().collect();

        let mut entries: Vec<ValidationEntry> = violation_rules
            .par_iter()
            .flat_map_iter(|rule| evaluate(rule, index))
            .collect();
        entries.sort();

        Ok(ValidationReport {
            entries,
            derived: saturation.derived.len(),
            iterations: saturation.iterations,
        })
    }
}

/// One entry per distinct binding of the rule body.
fn evaluate(rule: &InferenceRule, index: &StatementIndex) -> Vec<ValidationEntry> {
    let Some(violation_type) = rule.violation_type() else {
        return Vec::new();
    };

    let bindings: BTreeSet<Bindings> = match_patterns(index, &rule.antecedents, Bindings::new())
        .into_iter()
        .map(|(bindings, _)| bindings)
        .filter(|b| pairwise_distinct(&rule.distinct, b))
        .filter(|b| {
            rule.absent.is_empty() || match_patterns(index, &rule.absent, b.clone()).is_empty()
        })
        .collect();

    bindings
        .into_iter()
        .map(|b| ValidationEntry {
            violation_type: violation_type.to_string(),
            resource: resource_for(&rule.resource, &b),
            description: describe(rule, &b),
            rule_name: rule.name.clone(),
        })
        .collect()
}

fn pairwise_distinct(variables: &[String], bindings: &Bindings) -> bool {
    let values: Vec<Option<&Term>> = variables.iter().map(|v| bindings.get(v)).collect();
    values
        .iter()
        .enumerate()
        .all(|(i, a)| values[i + 1..].iter().all(|b| a != b))
}

fn resource_for(spec: &ResourceSpec, bindings: &Bindings) -> ViolationResource {
    match spec {
        ResourceSpec::Iri(iri) => ViolationResource::Iri(iri.clone()),
        ResourceSpec::Variable(name) => bindings
            .get(name)
            .and_then(Term::as_iri)
            .map(|iri| ViolationResource::Iri(iri.clone()))
            .unwrap_or(ViolationResource::Wildcard),
        ResourceSpec::Wildcard => ViolationResource::Wildcard,
    }
}

/// Interpolate `?var` references; IRIs render bracketed, literals as their
/// lexical form. Unknown variables stay as written.
fn describe(rule: &InferenceRule, bindings: &Bindings) -> String {
    let Some(template) = &rule.message else {
        return format!("rule {} matched", rule.name);
    };
    VARIABLE
        .replace_all(template, |cap: &regex::Captures<'_>| match bindings.get(&cap[1]) {
            Some(Term::Iri(iri)) => iri.to_string(),
            Some(Term::Literal(lit)) => lit.lexical.clone(),
            None => cap[0].to_string(),
        })
        .into_owned()
}
