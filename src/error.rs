//! Rich diagnostic error types for ontograph.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`OntoError`] wraps them all so callers
//! of the service layer deal with a single type.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Iri(#[from] IriError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// IRI errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IriError {
    #[error("malformed IRI '{iri}': {message}")]
    #[diagnostic(
        code(ontograph::iri::malformed),
        help(
            "IRIs must be absolute (scheme + path), e.g. `http://example.org/thing`. \
             Check for spaces, angle brackets or a missing scheme."
        )
    )]
    Malformed { iri: String, message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("{operation} requires an open write scope")]
    #[diagnostic(
        code(ontograph::store::no_write_scope),
        help("Call `begin_write()` before mutating, and close the scope with `commit()` or `abort()`.")
    )]
    NoWriteScope { operation: String },

    #[error("cannot begin a new scope: a {current} scope is already open")]
    #[diagnostic(
        code(ontograph::store::scope_open),
        help("Only a closed store may begin a scope. Commit or abort the open scope first.")
    )]
    ScopeAlreadyOpen { current: String },

    #[error("{operation} called with no open scope")]
    #[diagnostic(
        code(ontograph::store::no_scope),
        help("Every `commit()`/`abort()` must be paired with a preceding `begin_read()`/`begin_write()`.")
    )]
    NoOpenScope { operation: String },

    #[error("entity {iri} already has statements")]
    #[diagnostic(
        code(ontograph::store::entity_exists),
        help("Use `update()` to replace the statements of an existing subject.")
    )]
    EntityExists { iri: String },

    #[error("entity {iri} has no statements to update")]
    #[diagnostic(
        code(ontograph::store::entity_missing),
        help("Use `create()` for a subject that has no statements yet.")
    )]
    EntityMissing { iri: String },

    #[error("SPARQL error: {message}")]
    #[diagnostic(
        code(ontograph::store::sparql),
        help("The query failed to parse or evaluate. Check the query syntax and prefixes.")
    )]
    Sparql { message: String },

    #[error("unsupported term in result: {term}")]
    #[diagnostic(
        code(ontograph::store::unsupported_term),
        help("Only IRIs and literals can be represented. Blank nodes and quoted triples are not supported.")
    )]
    UnsupportedTerm { term: String },

    #[error("graph backend error: {message}")]
    #[diagnostic(
        code(ontograph::store::backend),
        help(
            "The underlying oxigraph store reported an error. \
             For on-disk stores check the data directory and available disk space."
        )
    )]
    Backend { message: String },

    #[error("rollback failed after '{cause}': {message}")]
    #[diagnostic(
        code(ontograph::store::rollback),
        help(
            "A failed write scope could not be fully restored. \
             The store may hold partial changes; restore from the journal or a backup."
        )
    )]
    Rollback { cause: String, message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ontograph::store::io),
        help("A filesystem operation failed. Check that the data directory exists and is writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error("no entity is named '{name}'")]
    #[diagnostic(
        code(ontograph::lookup::not_found),
        help("Check the spelling. Names are matched exactly against the configured name predicate.")
    )]
    NotFound { name: String },

    #[error("name '{name}' is ambiguous: {count} entities match")]
    #[diagnostic(
        code(ontograph::lookup::ambiguous),
        help("Several subjects carry this name. Look the entity up by IRI instead.")
    )]
    Ambiguous {
        name: String,
        count: usize,
        matches: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("query parameter ${name} has no bound value")]
    #[diagnostic(
        code(ontograph::query::unbound),
        help("Call `bind(\"{name}\", value)` before rendering the query.")
    )]
    Unbound { name: String },

    #[error("query template has no parameter ${name}")]
    #[diagnostic(
        code(ontograph::query::unknown_parameter),
        help("The template does not mention this parameter. Check the name for typos.")
    )]
    UnknownParameter { name: String },

    #[error("selection query does not yield statements: {message}")]
    #[diagnostic(
        code(ontograph::query::not_statements),
        help("Selection queries must be CONSTRUCT queries or SELECT queries binding ?s, ?p and ?o.")
    )]
    NotStatements { message: String },
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("rule parse error at line {line} (rule '{rule_name}'): {message}")]
    #[diagnostic(
        code(ontograph::rule::parse),
        help(
            "Rules start with `@rule <name> derive` or `@rule <name> violation <Type>`, \
             followed by indented `match:`, `produce:`, `absent:`, `distinct:`, \
             `message:` and `resource:` lines."
        )
    )]
    Parse {
        rule_name: String,
        line: usize,
        message: String,
    },

    #[error("unknown prefix '{prefix}' in rule '{rule_name}'")]
    #[diagnostic(
        code(ontograph::rule::unknown_prefix),
        help("Declare it with `@prefix {prefix}: <namespace>` or use a full `<iri>`.")
    )]
    UnknownPrefix { rule_name: String, prefix: String },

    #[error("variable ?{variable} in rule '{rule_name}' is not bound by any match pattern")]
    #[diagnostic(
        code(ontograph::rule::unbound_variable),
        help("Every variable used in `produce:`, `distinct:` or `resource:` must appear in a `match:` pattern.")
    )]
    UnboundHeadVariable { rule_name: String, variable: String },

    #[error("rule evaluation did not reach a fixed point within {max_iterations} rounds")]
    #[diagnostic(
        code(ontograph::rule::max_iterations),
        help("Increase `max_iterations` in the rule engine configuration, or review rules that generate fresh values.")
    )]
    MaxIterations { max_iterations: usize },

    #[error("rule evaluation derived more than {limit} statements")]
    #[diagnostic(
        code(ontograph::rule::too_many),
        help("Increase `max_new_statements`, or narrow the selection query.")
    )]
    TooManyDerivations { limit: usize },
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("ontology parse error in {source_name}: {message}")]
    #[diagnostic(
        code(ontograph::ontology::parse),
        help("The ontology table must be TOML with [prefixes], [[types]] and [[predicates]] sections.")
    )]
    Parse { source_name: String, message: String },

    #[error("unknown ontology type '{name}'")]
    #[diagnostic(
        code(ontograph::ontology::unknown_type),
        help("List the registered types with `ontograph types`.")
    )]
    UnknownType { name: String },

    #[error("unknown ontology predicate '{name}'")]
    #[diagnostic(
        code(ontograph::ontology::unknown_predicate),
        help("Add the predicate to the [[predicates]] table of the ontology file.")
    )]
    UnknownPredicate { name: String },

    #[error("type '{name}' names unknown supertype '{supertype}'")]
    #[diagnostic(
        code(ontograph::ontology::unknown_supertype),
        help("Every supertype must itself be declared in the [[types]] table.")
    )]
    UnknownSupertype { name: String, supertype: String },

    #[error("type hierarchy contains a cycle through '{name}'")]
    #[diagnostic(
        code(ontograph::ontology::cycle),
        help("Supertype chains must form a directed acyclic graph.")
    )]
    CyclicHierarchy { name: String },

    #[error("'{name}' is declared more than once")]
    #[diagnostic(
        code(ontograph::ontology::duplicate),
        help("Type and predicate names must be unique within the ontology table.")
    )]
    DuplicateName { name: String },
}

// ---------------------------------------------------------------------------
// Journal errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum JournalError {
    #[error("redb journal error: {message}")]
    #[diagnostic(
        code(ontograph::journal::redb),
        help(
            "The journal database encountered a transaction error. \
             Check the data directory permissions, or move the journal file aside to start fresh."
        )
    )]
    Redb { message: String },

    #[error("journal serialization error: {message}")]
    #[diagnostic(
        code(ontograph::journal::serde),
        help("A journal record could not be encoded or decoded. The journal may come from an incompatible version.")
    )]
    Serialization { message: String },

    #[error("the journal is empty: nothing to undo")]
    #[diagnostic(
        code(ontograph::journal::empty),
        help("Only transformations applied through the service with a journal enabled can be undone.")
    )]
    Empty,
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(
        code(ontograph::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    #[diagnostic(
        code(ontograph::config::write),
        help("Check that the directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(
        code(ontograph::config::parse),
        help("The configuration file must be valid TOML matching the ServiceConfig fields.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(ontograph::config::invalid), help("Check the configuration values. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning ontograph results.
pub type OntoResult<T> = std::result::Result<T, OntoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_onto_error() {
        let err = StoreError::NoWriteScope {
            operation: "update".into(),
        };
        let onto: OntoError = err.into();
        assert!(matches!(onto, OntoError::Store(StoreError::NoWriteScope { .. })));
    }

    #[test]
    fn lookup_error_converts_to_onto_error() {
        let err = LookupError::Ambiguous {
            name: "Alice".into(),
            count: 2,
            matches: vec![],
        };
        let onto: OntoError = err.into();
        assert!(matches!(onto, OntoError::Lookup(LookupError::Ambiguous { count: 2, .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = RuleError::Parse {
            rule_name: "r1".into(),
            line: 7,
            message: "bad pattern".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 7"));
        assert!(msg.contains("r1"));
        assert!(msg.contains("bad pattern"));
    }
}
