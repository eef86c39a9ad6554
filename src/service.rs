//! Service facade: the top-level API of ontograph.
//!
//! A [`Service`] owns a graph store, the ontology registry, the rule engine
//! configuration and an optional transformation journal. Callers hand it
//! desired entity states; it diffs them into transformations, applies them
//! atomically, journals them for undo, and runs inference and validation over
//! selected subgraphs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::change::{ApplyStats, ChangeSet, Transformation};
use crate::error::{ConfigError, LookupError, OntoResult, StoreError};
use crate::graph::sparql::QueryRow;
use crate::graph::{Entity, Statement, escape_literal};
use crate::infer::{
    InferenceOutcome, RuleEngine, RuleEngineConfig, RuleSet, ValidationReport, Validator,
};
use crate::iri::Iri;
use crate::ontology::OntologyRegistry;
use crate::query::PatternQuery;
use crate::store::journal::{Journal, JournalEntry};
use crate::store::{GraphStore, OxiStore};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`Service`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Data directory for the store and journal. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Ontology table to load instead of the bundled core ontology.
    pub ontology_file: Option<PathBuf>,
    /// Overrides the ontology's name predicate (`prefix:local`, `<iri>` or absolute IRI).
    pub name_predicate: Option<String>,
    /// Whether applied transformations are journaled (needs `data_dir`).
    pub journal: bool,
    pub rule_engine: RuleEngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            ontology_file: None,
            name_predicate: None,
            journal: true,
            rule_engine: RuleEngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// A config persisting under `data_dir` (other fields default).
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rule_engine.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                message: "rule_engine.max_iterations must be > 0".into(),
            });
        }
        if self.rule_engine.max_new_statements == 0 {
            return Err(ConfigError::Invalid {
                message: "rule_engine.max_new_statements must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Result of [`Service::apply`] and [`Service::undo_last`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The effective transformation that reached the store.
    pub transformation: Transformation,
    pub stats: ApplyStats,
    /// Journal sequence number, when journaled.
    pub journal_seq: Option<u64>,
}

/// Orchestrates store, registry, rule engine and journal.
pub struct Service<S: GraphStore = OxiStore> {
    store: S,
    registry: Arc<OntologyRegistry>,
    engine_config: RuleEngineConfig,
    journal: Option<Journal>,
    name_predicate: Iri,
}

impl Service<OxiStore> {
    /// Open a service as described by `config`.
    ///
    /// The store lives in `<data_dir>/store`, the journal in
    /// `<data_dir>/journal.redb`.
    pub fn open(config: &ServiceConfig) -> OntoResult<Self> {
        config.validate()?;
        let registry = match &config.ontology_file {
            Some(path) => OntologyRegistry::load(path)?,
            None => OntologyRegistry::core()?,
        };
        let store = match &config.data_dir {
            Some(dir) => OxiStore::open(&dir.join("store"))?,
            None => OxiStore::in_memory()?,
        };
        let journal = match (&config.data_dir, config.journal) {
            (Some(dir), true) => Some(Journal::open(dir)?),
            _ => None,
        };

        tracing::info!(
            data_dir = ?config.data_dir,
            ontology = registry.name(),
            journal = journal.is_some(),
            "opening ontograph service"
        );

        let mut service = Service::new(store, Arc::new(registry))
            .with_engine_config(config.rule_engine.clone());
        service.journal = journal;
        if let Some(text) = &config.name_predicate {
            service.name_predicate = resolve_name_predicate(&service.registry, text)?;
        }
        Ok(service)
    }
}

impl<S: GraphStore> Service<S> {
    /// A service over `store` with no journal and default engine limits.
    pub fn new(store: S, registry: Arc<OntologyRegistry>) -> Self {
        let name_predicate = registry.name_predicate().clone();
        Self {
            store,
            registry,
            engine_config: RuleEngineConfig::default(),
            journal: None,
            name_predicate,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_engine_config(mut self, config: RuleEngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    pub fn with_name_predicate(mut self, predicate: Iri) -> Self {
        self.name_predicate = predicate;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Arc<OntologyRegistry> {
        &self.registry
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub fn name_predicate(&self) -> &Iri {
        &self.name_predicate
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Run `f` inside a read scope; commit on success, abort on failure.
    pub fn run_in_transaction<T>(&self, f: impl FnOnce(&S) -> OntoResult<T>) -> OntoResult<T> {
        self.store.begin_read()?;
        self.finish_scope(f(&self.store))
    }

    /// Run `f` inside a write scope; commit on success, abort on failure.
    pub fn run_in_write_transaction<T>(
        &self,
        f: impl FnOnce(&S) -> OntoResult<T>,
    ) -> OntoResult<T> {
        self.store.begin_write()?;
        self.finish_scope(f(&self.store))
    }

    fn finish_scope<T>(&self, result: OntoResult<T>) -> OntoResult<T> {
        match result {
            Ok(value) => {
                self.store.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.store.abort() {
                    return Err(StoreError::Rollback {
                        cause: err.to_string(),
                        message: rollback.to_string(),
                    }
                    .into());
                }
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Change sets
    // -----------------------------------------------------------------------

    /// Diff desired entity states against the store.
    ///
    /// Statements the store has but an entity lacks become removals; statements
    /// an entity has but the store lacks become additions. When several
    /// entities share a subject, the last one wins.
    pub fn create_transformation(&self, entities: &[Entity]) -> OntoResult<Transformation> {
        let last_index: BTreeMap<&Iri, usize> =
            entities.iter().enumerate().map(|(i, e)| (e.id(), i)).collect();
        let mut change_set = ChangeSet::new();
        for (i, entity) in entities.iter().enumerate() {
            if last_index.get(entity.id()) != Some(&i) {
                continue;
            }
            let desired = entity.statement_set();
            let current = self
                .store
                .get(entity.id())?
                .map(|e| e.statement_set())
                .unwrap_or_default();
            for st in current.difference(&desired) {
                change_set.remove(st.clone());
            }
            for st in desired.difference(&current) {
                change_set.add(st.clone());
            }
        }
        tracing::debug!(
            entities = entities.len(),
            operations = change_set.len(),
            "transformation created"
        );
        Ok(Transformation::single(change_set))
    }

    /// Apply `transformation` in one write transaction and journal what changed.
    pub fn apply(&self, transformation: &Transformation) -> OntoResult<Applied> {
        self.apply_labeled(transformation, None)
    }

    /// [`apply`](Self::apply) with a journal label.
    pub fn apply_labeled(
        &self,
        transformation: &Transformation,
        label: Option<&str>,
    ) -> OntoResult<Applied> {
        self.store.begin_write()?;
        let (effective, stats, journal_seq) =
            match self.apply_and_journal(transformation, label) {
                Ok(staged) => staged,
                Err(err) => return self.finish_scope(Err(err)),
            };
        if let Err(err) = self.store.commit() {
            // The journal must not outlive a store commit that did not happen.
            if let (Some(journal), Some(seq)) = (&self.journal, journal_seq) {
                journal.remove(seq)?;
            }
            return Err(err.into());
        }

        tracing::info!(
            operations = effective.operation_count(),
            %stats,
            journal_seq = ?journal_seq,
            "transformation applied"
        );
        Ok(Applied {
            transformation: effective,
            stats,
            journal_seq,
        })
    }

    /// Apply inside the open write scope, then journal what changed.
    fn apply_and_journal(
        &self,
        transformation: &Transformation,
        label: Option<&str>,
    ) -> OntoResult<(Transformation, ApplyStats, Option<u64>)> {
        let (effective, stats) = transformation.apply_effective(&self.store)?;
        let journal_seq = match &self.journal {
            Some(journal) if !effective.is_empty() => Some(journal.append(&effective, label)?),
            _ => None,
        };
        Ok((effective, stats, journal_seq))
    }

    /// Undo the newest journaled transformation.
    pub fn undo_last(&self) -> OntoResult<Applied> {
        let journal = self.journal.as_ref().ok_or_else(|| ConfigError::Invalid {
            message: "undo needs a journal; enable `journal` and set `data_dir`".into(),
        })?;
        let entry = journal.pop_last()?;
        let inverse = entry.transformation.invert();
        let stats = match self.run_in_write_transaction(|store| Ok(inverse.apply(store)?)) {
            Ok(stats) => stats,
            Err(err) => {
                journal.restore(&entry)?;
                tracing::warn!(seq = entry.seq, error = %err, "undo aborted, journal entry kept");
                return Err(err);
            }
        };

        tracing::info!(seq = entry.seq, %stats, "transformation undone");
        Ok(Applied {
            transformation: inverse,
            stats,
            journal_seq: Some(entry.seq),
        })
    }

    /// Journaled transformations, oldest first. Empty without a journal.
    pub fn history(&self) -> OntoResult<Vec<JournalEntry>> {
        match &self.journal {
            Some(journal) => Ok(journal.entries()?),
            None => Ok(Vec::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Lookup and queries
    // -----------------------------------------------------------------------

    pub fn get(&self, iri: &Iri) -> OntoResult<Option<Entity>> {
        Ok(self.store.get(iri)?)
    }

    /// The one entity whose name is `name`.
    pub fn find_by_entity_name(&self, name: &str) -> OntoResult<Entity> {
        let sparql = format!(
            "SELECT DISTINCT ?s WHERE {{ ?s {} ?name . FILTER(STR(?name) = \"{}\") }} ORDER BY ?s",
            self.name_predicate,
            escape_literal(name)
        );
        let rows = self.store.query(&sparql)?;
        let matches: Vec<Iri> = rows.iter().filter_map(|r| r.iri("s").cloned()).collect();

        match matches.as_slice() {
            [] => Err(LookupError::NotFound {
                name: name.to_string(),
            }
            .into()),
            [iri] => self.store.get(iri)?.ok_or_else(|| {
                LookupError::NotFound {
                    name: name.to_string(),
                }
                .into()
            }),
            many => Err(LookupError::Ambiguous {
                name: name.to_string(),
                count: many.len(),
                matches: many.iter().map(|i| i.as_str().to_string()).collect(),
            }
            .into()),
        }
    }

    /// Look up several names, in input order. Fails on the first bad name.
    pub fn find_by_entity_names(&self, names: &[&str]) -> OntoResult<Vec<Entity>> {
        names.iter().map(|name| self.find_by_entity_name(name)).collect()
    }

    /// Run a raw SPARQL query.
    pub fn query(&self, sparql: &str) -> OntoResult<Vec<QueryRow>> {
        Ok(self.store.query(sparql)?)
    }

    /// Render a pattern query with the registry's prefixes and run it.
    pub fn query_template(&self, query: &PatternQuery) -> OntoResult<Vec<QueryRow>> {
        let sparql = query.render_with(self.registry.prefixes())?;
        tracing::debug!(%sparql, "running pattern query");
        self.query(&sparql)
    }

    // -----------------------------------------------------------------------
    // Inference and validation
    // -----------------------------------------------------------------------

    /// Parse rule text with the registry's prefixes available.
    pub fn parse_rules(&self, text: &str, source: &str) -> OntoResult<RuleSet> {
        Ok(RuleSet::parse_with_prefixes(
            text,
            source,
            self.registry.prefixes(),
        )?)
    }

    /// Saturate the subgraph selected by `selection` under `rules`.
    pub fn apply_inference_rules(
        &self,
        selection: &str,
        rules: &RuleSet,
        include_schema: bool,
    ) -> OntoResult<InferenceOutcome> {
        let schema = self.schema(include_schema);
        RuleEngine::new(self.engine_config.clone()).infer(&self.store, selection, rules, &schema)
    }

    /// Validate the subgraph selected by `selection` against `rules`.
    pub fn validate(
        &self,
        selection: &str,
        rules: &RuleSet,
        include_schema: bool,
    ) -> OntoResult<ValidationReport> {
        let schema = self.schema(include_schema);
        Validator::new(self.engine_config.clone()).validate(&self.store, selection, rules, &schema)
    }

    fn schema(&self, include: bool) -> Vec<Statement> {
        if include {
            self.registry.schema_statements()
        } else {
            Vec::new()
        }
    }

    /// A fresh entity typed through the registry.
    pub fn new_entity(&self, type_name: &str, iri: Iri) -> OntoResult<Entity> {
        Ok(self.registry.new_entity(type_name, iri)?)
    }
}

impl<S: GraphStore> std::fmt::Debug for Service<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("registry", &self.registry)
            .field("journal", &self.journal.is_some())
            .field("name_predicate", &self.name_predicate)
            .finish()
    }
}

fn resolve_name_predicate(registry: &OntologyRegistry, text: &str) -> OntoResult<Iri> {
    if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Iri::new(inner)?);
    }
    if let Some(expanded) = registry.prefixes().expand(text) {
        return Ok(expanded?);
    }
    if let Ok(predicate) = registry.predicate(text) {
        return Ok(predicate);
    }
    Ok(Iri::new(text)?)
}
