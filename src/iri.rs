//! Validated IRIs.
//!
//! An [`Iri`] is a cheaply clonable, validated absolute IRI. Equality, hashing
//! and ordering use the full string. The namespace/local-name split is derived
//! on demand, it is not part of identity.

use std::collections::BTreeMap;
use std::sync::Arc;

use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};

use crate::error::IriError;

/// Well-known vocabulary namespaces.
pub mod ns {
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
}

/// A globally unique identifier for a subject, predicate or class.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri(Arc<str>);

impl Iri {
    /// Parse and validate an absolute IRI.
    pub fn new(iri: impl AsRef<str>) -> Result<Self, IriError> {
        let iri = iri.as_ref();
        NamedNode::new(iri).map_err(|e| IriError::Malformed {
            iri: iri.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self(Arc::from(iri)))
    }

    /// Join a namespace base and a local name.
    pub fn from_parts(namespace: &str, local: &str) -> Result<Self, IriError> {
        Self::new(format!("{namespace}{local}"))
    }

    /// Wrap an oxigraph node, which is already validated.
    pub(crate) fn from_named_node(node: &NamedNode) -> Self {
        Self(Arc::from(node.as_str()))
    }

    /// Build a well-known vocabulary IRI. Callers pass constant namespaces and
    /// ASCII local names only.
    pub(crate) fn vocab(namespace: &str, local: &str) -> Self {
        Self(Arc::from(format!("{namespace}{local}")))
    }

    /// The full IRI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything up to and including the last `#` or `/`.
    pub fn namespace(&self) -> &str {
        &self.0[..self.split_point()]
    }

    /// The part after the namespace. Empty when the IRI ends in `#` or `/`.
    pub fn local_name(&self) -> &str {
        &self.0[self.split_point()..]
    }

    fn split_point(&self) -> usize {
        self.0
            .rfind(['#', '/'])
            .map(|i| i + 1)
            .unwrap_or(self.0.len())
    }

    pub(crate) fn to_named_node(&self) -> NamedNode {
        NamedNode::new_unchecked(self.0.as_ref())
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl std::fmt::Debug for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Iri({})", self.0)
    }
}

impl TryFrom<String> for Iri {
    type Error = IriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Iri {
    type Error = IriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.0.to_string()
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefix → namespace table for expanding `prefix:local` names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap(BTreeMap<String, String>);

impl PrefixMap {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding `rdf`, `rdfs`, `xsd` and `owl`.
    pub fn with_builtins() -> Self {
        let mut map = Self::new();
        map.insert("rdf", ns::RDF);
        map.insert("rdfs", ns::RDFS);
        map.insert("xsd", ns::XSD);
        map.insert("owl", ns::OWL);
        map
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.0.insert(prefix.into(), namespace.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    /// Add every entry of `other`, overriding clashes.
    pub fn extend(&mut self, other: &PrefixMap) {
        for (prefix, namespace) in &other.0 {
            self.0.insert(prefix.clone(), namespace.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expand `prefix:local`. `None` when there is no colon or the prefix is
    /// not in the table.
    pub fn expand(&self, curie: &str) -> Option<Result<Iri, IriError>> {
        let (prefix, local) = curie.split_once(':')?;
        let namespace = self.get(prefix)?;
        Some(Iri::from_parts(namespace, local))
    }

    /// Shorten an IRI to `prefix:local` when a namespace matches exactly.
    pub fn compact(&self, iri: &Iri) -> String {
        let namespace = iri.namespace();
        self.0
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(prefix, _)| format!("{prefix}:{}", iri.local_name()))
            .unwrap_or_else(|| iri.to_string())
    }

    /// `PREFIX` declarations for a SPARQL query header.
    pub fn to_sparql(&self) -> String {
        self.0
            .iter()
            .map(|(prefix, namespace)| format!("PREFIX {prefix}: <{namespace}>\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_iri_parses() {
        let iri = Iri::new("http://example.org/people#alice").unwrap();
        assert_eq!(iri.as_str(), "http://example.org/people#alice");
        assert_eq!(iri.namespace(), "http://example.org/people#");
        assert_eq!(iri.local_name(), "alice");
    }

    #[test]
    fn slash_namespace_split() {
        let iri = Iri::new("http://example.org/things/widget").unwrap();
        assert_eq!(iri.namespace(), "http://example.org/things/");
        assert_eq!(iri.local_name(), "widget");
    }

    #[test]
    fn malformed_iri_rejected() {
        assert!(Iri::new("not an iri").is_err());
        assert!(Iri::new("http://example.org/with space").is_err());
        assert!(matches!(
            Iri::new("relative/path"),
            Err(IriError::Malformed { .. })
        ));
    }

    #[test]
    fn equality_uses_full_string() {
        let a = Iri::from_parts("http://example.org/", "x").unwrap();
        let b = Iri::new("http://example.org/x").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Iri::new("http://example.org/y").unwrap());
    }

    #[test]
    fn serde_validates() {
        let iri = Iri::new("http://example.org/x").unwrap();
        let json = serde_json::to_string(&iri).unwrap();
        assert_eq!(json, "\"http://example.org/x\"");
        let back: Iri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, iri);
        assert!(serde_json::from_str::<Iri>("\"bad iri\"").is_err());
    }

    #[test]
    fn prefix_expansion() {
        let prefixes = PrefixMap::with_builtins();
        let label = prefixes.expand("rdfs:label").unwrap().unwrap();
        assert_eq!(label.as_str(), "http://www.w3.org/2000/01/rdf-schema#label");
        assert!(prefixes.expand("nope:x").is_none());
        assert!(prefixes.expand("plain").is_none());
        assert_eq!(prefixes.compact(&label), "rdfs:label");

        let other = Iri::new("http://example.org/x").unwrap();
        assert_eq!(prefixes.compact(&other), "<http://example.org/x>");
    }

    #[test]
    fn sparql_header_lists_every_prefix() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        assert_eq!(prefixes.to_sparql(), "PREFIX ex: <http://example.org/>\n");
    }
}
