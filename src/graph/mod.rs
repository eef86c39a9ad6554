//! Statement model: the atomic facts of the graph.
//!
//! A [`Statement`] is an immutable (subject, predicate, object) fact whose
//! object is either an IRI or a typed [`Literal`]. Statements sharing a subject
//! are grouped host-side into an [`Entity`].
//!
//! - [`index::StatementIndex`]: in-memory indexed statement set used as the
//!   rule engine's working graph
//! - [`sparql`]: conversions to and from oxigraph terms and SPARQL execution

pub mod entity;
pub mod index;
pub mod sparql;

use serde::{Deserialize, Serialize};

use crate::error::IriError;
use crate::iri::{ns, Iri};

pub use entity::Entity;

/// A typed literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    /// The lexical form.
    pub lexical: String,
    /// Datatype IRI (`xsd:string` for plain strings).
    pub datatype: Iri,
    /// Language tag, only for `rdf:langString` literals. Always serialized,
    /// since journal records are bincode and bincode is not self-describing.
    #[serde(default)]
    pub language: Option<String>,
}

impl Literal {
    /// A literal with an explicit datatype.
    pub fn typed(lexical: impl Into<String>, datatype: Iri) -> Self {
        Self {
            lexical: lexical.into(),
            datatype,
            language: None,
        }
    }

    /// An `xsd:string` literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(value, xsd("string"))
    }

    /// An `xsd:dateTime` literal. The lexical form is not checked here.
    pub fn date_time(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, xsd("dateTime"))
    }

    /// An `xsd:integer` literal.
    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd("integer"))
    }

    /// An `xsd:boolean` literal.
    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), xsd("boolean"))
    }

    /// A language-tagged string.
    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: value.into(),
            datatype: Iri::vocab(ns::RDF, "langString"),
            language: Some(language.into().to_ascii_lowercase()),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.lexical))?;
        match &self.language {
            Some(lang) => write!(f, "@{lang}"),
            None => write!(f, "^^{}", self.datatype),
        }
    }
}

/// Escape a lexical form for use inside a double-quoted SPARQL/N-Triples string.
pub(crate) fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn xsd(local: &str) -> Iri {
    Iri::vocab(ns::XSD, local)
}

/// The object position of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Iri(Iri),
    Literal(Literal),
}

impl Term {
    /// Parse an IRI term.
    pub fn iri(iri: impl AsRef<str>) -> Result<Self, IriError> {
        Ok(Self::Iri(Iri::new(iri)?))
    }

    /// A plain string literal term.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::string(value))
    }

    /// The IRI, if this term is one.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal(_) => None,
        }
    }

    /// The literal, if this term is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            Self::Iri(_) => None,
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iri(iri) => iri.fmt(f),
            Self::Literal(lit) => lit.fmt(f),
        }
    }
}

/// One (subject, predicate, object) fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
}

impl Statement {
    /// Create a statement.
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    #[test]
    fn literal_helpers_set_datatypes() {
        assert_eq!(
            Literal::string("x").datatype.as_str(),
            "http://www.w3.org/2001/XMLSchema#string"
        );
        assert_eq!(Literal::integer(42).lexical, "42");
        assert_eq!(Literal::boolean(true).datatype.local_name(), "boolean");
        assert_eq!(Literal::date_time("2020-01-01T00:00:00Z").datatype.local_name(), "dateTime");
        let tagged = Literal::lang_string("hallo", "DE");
        assert_eq!(tagged.language.as_deref(), Some("de"));
        assert_eq!(tagged.datatype.local_name(), "langString");
    }

    #[test]
    fn statement_display_is_ntriples_like() {
        let st = Statement::new(iri("a"), iri("p"), Literal::string("say \"hi\""));
        assert_eq!(
            st.to_string(),
            "<http://example.org/a> <http://example.org/p> \"say \\\"hi\\\"\"^^<http://www.w3.org/2001/XMLSchema#string> ."
        );
    }

    #[test]
    fn terms_are_ordered() {
        let a = Term::Iri(iri("a"));
        let b = Term::Iri(iri("b"));
        assert!(a < b);
        // IRIs sort before literals.
        assert!(b < Term::string("a"));
    }
}
