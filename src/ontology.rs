//! Ontology registry: the type table of the upper ontology.
//!
//! The registry is loaded from a TOML table (prefixes, types with their
//! supertypes, predicates) instead of being compiled in. It answers three
//! questions for the rest of the system:
//!
//! - what IRI does a type or predicate name stand for ([`OntologyRegistry::type_named`],
//!   [`OntologyRegistry::predicate`])
//! - is an entity usable as some type, honoring supertype chains
//!   ([`OntologyRegistry::view_as`])
//! - which schema statements describe the hierarchy, for inference
//!   ([`OntologyRegistry::schema_statements`])
//!
//! The class hierarchy is a petgraph DAG with edges from subtype to supertype;
//! cycles are rejected at load time.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};

use crate::error::OntologyError;
use crate::graph::{Entity, Statement, Term};
use crate::iri::{Iri, PrefixMap, ns};

/// The bundled core ontology.
pub const CORE_ONTOLOGY: &str = include_str!("../data/ontology/core.toml");

/// Predicate used for entity names when the table does not choose one.
fn default_name_predicate() -> Iri {
    Iri::vocab(ns::RDFS, "label")
}

fn rdf_type() -> Iri {
    Iri::vocab(ns::RDF, "type")
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Serialize)]
struct OntologyFile {
    #[serde(default)]
    ontology: OntologyHeader,
    #[serde(default)]
    prefixes: BTreeMap<String, String>,
    #[serde(default)]
    types: Vec<TypeDef>,
    #[serde(default)]
    predicates: Vec<PredicateDef>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct OntologyHeader {
    #[serde(default)]
    name: Option<String>,
    /// Name of the entry in `predicates` used for entity names.
    #[serde(default)]
    name_predicate: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TypeDef {
    name: String,
    iri: String,
    #[serde(default)]
    supertypes: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct PredicateDef {
    name: String,
    iri: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    range: Option<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyType {
    pub name: String,
    pub iri: Iri,
    /// Direct supertypes, by name.
    pub supertypes: Vec<String>,
    /// This type and every transitive supertype, nearest first.
    pub ancestors: Vec<String>,
}

impl OntologyType {
    /// Whether this type is `name` or has it as a transitive supertype.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors.iter().any(|a| a == name)
    }
}

/// One registered predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyPredicate {
    pub name: String,
    pub iri: Iri,
    pub domain: Option<String>,
    pub range: Option<String>,
}

/// The loaded type table. Shared read-only behind an `Arc`.
pub struct OntologyRegistry {
    name: String,
    prefixes: PrefixMap,
    types: DashMap<String, Arc<OntologyType>>,
    types_by_iri: DashMap<Iri, String>,
    predicates: DashMap<String, Arc<OntologyPredicate>>,
    name_predicate: Iri,
    /// Subtype → supertype edges.
    hierarchy: DiGraph<String, ()>,
}

impl OntologyRegistry {
    /// Load the bundled core ontology.
    pub fn core() -> Result<Self, OntologyError> {
        Self::from_toml_str(CORE_ONTOLOGY, "core.toml")
    }

    /// Load an ontology table from a file.
    pub fn load(path: &Path) -> Result<Self, OntologyError> {
        let text = std::fs::read_to_string(path).map_err(|e| OntologyError::Parse {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Parse an ontology table. `source_name` appears in error messages.
    pub fn from_toml_str(text: &str, source_name: &str) -> Result<Self, OntologyError> {
        let file: OntologyFile = toml::from_str(text).map_err(|e| OntologyError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Self::build(file, source_name)
    }

    fn build(file: OntologyFile, source_name: &str) -> Result<Self, OntologyError> {
        let mut prefixes = PrefixMap::with_builtins();
        for (prefix, namespace) in &file.prefixes {
            prefixes.insert(prefix.clone(), namespace.clone());
        }
        let resolve = |text: &str| resolve_iri(&prefixes, text, source_name);

        // Nodes first, so supertypes may be declared after their subtypes.
        let mut hierarchy = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut iris: HashMap<String, Iri> = HashMap::new();
        for def in &file.types {
            if nodes.contains_key(&def.name) {
                return Err(OntologyError::DuplicateName {
                    name: def.name.clone(),
                });
            }
            nodes.insert(def.name.clone(), hierarchy.add_node(def.name.clone()));
            iris.insert(def.name.clone(), resolve(&def.iri)?);
        }
        for def in &file.types {
            let sub = nodes[&def.name];
            for supertype in &def.supertypes {
                let sup = nodes.get(supertype).ok_or_else(|| OntologyError::UnknownSupertype {
                    name: def.name.clone(),
                    supertype: supertype.clone(),
                })?;
                hierarchy.add_edge(sub, *sup, ());
            }
        }
        petgraph::algo::toposort(&hierarchy, None).map_err(|cycle| {
            OntologyError::CyclicHierarchy {
                name: hierarchy[cycle.node_id()].clone(),
            }
        })?;

        let types = DashMap::new();
        let types_by_iri = DashMap::new();
        for def in &file.types {
            let mut ancestors = Vec::new();
            let mut bfs = Bfs::new(&hierarchy, nodes[&def.name]);
            while let Some(node) = bfs.next(&hierarchy) {
                ancestors.push(hierarchy[node].clone());
            }
            let iri = iris[&def.name].clone();
            types_by_iri.insert(iri.clone(), def.name.clone());
            types.insert(
                def.name.clone(),
                Arc::new(OntologyType {
                    name: def.name.clone(),
                    iri,
                    supertypes: def.supertypes.clone(),
                    ancestors,
                }),
            );
        }

        let predicates = DashMap::new();
        for def in &file.predicates {
            for ty in def.domain.iter().chain(def.range.iter()) {
                if !nodes.contains_key(ty) {
                    return Err(OntologyError::UnknownType { name: ty.clone() });
                }
            }
            let predicate = Arc::new(OntologyPredicate {
                name: def.name.clone(),
                iri: resolve(&def.iri)?,
                domain: def.domain.clone(),
                range: def.range.clone(),
            });
            if predicates.insert(def.name.clone(), predicate).is_some() {
                return Err(OntologyError::DuplicateName {
                    name: def.name.clone(),
                });
            }
        }

        let name_predicate = match &file.ontology.name_predicate {
            Some(name) => predicates
                .get(name)
                .map(|p| p.iri.clone())
                .ok_or_else(|| OntologyError::UnknownPredicate { name: name.clone() })?,
            None => default_name_predicate(),
        };

        let name = file
            .ontology
            .name
            .clone()
            .unwrap_or_else(|| source_name.to_string());
        tracing::debug!(
            ontology = %name,
            types = types.len(),
            predicates = predicates.len(),
            "ontology loaded"
        );

        Ok(Self {
            name,
            prefixes,
            types,
            types_by_iri,
            predicates,
            name_predicate,
            hierarchy,
        })
    }

    /// The ontology's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared prefixes plus the built-in vocabularies.
    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// The predicate holding entity names.
    pub fn name_predicate(&self) -> &Iri {
        &self.name_predicate
    }

    /// Look up a type by name.
    pub fn type_named(&self, name: &str) -> Result<Arc<OntologyType>, OntologyError> {
        self.types
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| OntologyError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Look up a type by its IRI.
    pub fn type_of_iri(&self, iri: &Iri) -> Option<Arc<OntologyType>> {
        let name = self.types_by_iri.get(iri)?;
        self.types.get(name.value()).map(|t| Arc::clone(t.value()))
    }

    /// Look up a predicate IRI by name.
    pub fn predicate(&self, name: &str) -> Result<Iri, OntologyError> {
        self.predicate_info(name).map(|p| p.iri.clone())
    }

    pub fn predicate_info(&self, name: &str) -> Result<Arc<OntologyPredicate>, OntologyError> {
        self.predicates
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| OntologyError::UnknownPredicate {
                name: name.to_string(),
            })
    }

    /// Every type, supertypes before subtypes.
    pub fn types(&self) -> Vec<Arc<OntologyType>> {
        // The hierarchy was checked acyclic at load.
        let order = petgraph::algo::toposort(&self.hierarchy, None).unwrap_or_default();
        order
            .into_iter()
            .rev()
            .filter_map(|node| self.types.get(&self.hierarchy[node]).map(|t| Arc::clone(t.value())))
            .collect()
    }

    /// Every predicate, by name.
    pub fn predicates(&self) -> Vec<Arc<OntologyPredicate>> {
        let mut all: Vec<_> = self.predicates.iter().map(|p| Arc::clone(p.value())).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Whether `sub` is `sup` or a transitive subtype of it.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.types.get(sub).is_some_and(|t| t.is_a(sup))
    }

    /// A fresh entity typed as `type_name`.
    pub fn new_entity(&self, type_name: &str, iri: Iri) -> Result<Entity, OntologyError> {
        let ty = self.type_named(type_name)?;
        Ok(Entity::new(iri).with(rdf_type(), ty.iri.clone()))
    }

    /// Registered types the entity asserts through `rdf:type`, by name.
    pub fn types_of(&self, entity: &Entity) -> Vec<Arc<OntologyType>> {
        let mut found: Vec<_> = entity
            .values(&rdf_type())
            .filter_map(Term::as_iri)
            .filter_map(|iri| self.type_of_iri(iri))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// View the entity as `type_name` if one of its asserted types is that
    /// type or a subtype of it.
    pub fn view_as<'a>(&'a self, entity: &'a Entity, type_name: &str) -> Option<TypedView<'a>> {
        let target = self.type_named(type_name).ok()?;
        self.types_of(entity)
            .iter()
            .any(|t| t.is_a(type_name))
            .then_some(TypedView {
                registry: self,
                entity,
                ty: target,
            })
    }

    /// Statements describing the hierarchy and predicate signatures.
    ///
    /// Types become `owl:Class` with `rdfs:subClassOf` edges; predicates
    /// become `rdf:Property` with optional `rdfs:domain` and `rdfs:range`.
    pub fn schema_statements(&self) -> Vec<Statement> {
        let class = Iri::vocab(ns::OWL, "Class");
        let property = Iri::vocab(ns::RDF, "Property");
        let sub_class_of = Iri::vocab(ns::RDFS, "subClassOf");
        let domain = Iri::vocab(ns::RDFS, "domain");
        let range = Iri::vocab(ns::RDFS, "range");

        let mut out = Vec::new();
        for ty in self.types() {
            out.push(Statement::new(ty.iri.clone(), rdf_type(), class.clone()));
            for sup in &ty.supertypes {
                if let Some(sup) = self.types.get(sup) {
                    out.push(Statement::new(ty.iri.clone(), sub_class_of.clone(), sup.iri.clone()));
                }
            }
        }
        for p in self.predicates() {
            out.push(Statement::new(p.iri.clone(), rdf_type(), property.clone()));
            let signature = [(&domain, &p.domain), (&range, &p.range)];
            for (key, ty) in signature {
                if let Some(ty) = ty.as_ref().and_then(|t| self.types.get(t)) {
                    out.push(Statement::new(p.iri.clone(), key.clone(), ty.iri.clone()));
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

impl std::fmt::Debug for OntologyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyRegistry")
            .field("name", &self.name)
            .field("types", &self.types.len())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

/// Resolve `<iri>`, `prefix:local` or an absolute IRI.
fn resolve_iri(prefixes: &PrefixMap, text: &str, source_name: &str) -> Result<Iri, OntologyError> {
    let parse_err = |message: String| OntologyError::Parse {
        source_name: source_name.to_string(),
        message,
    };
    if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Iri::new(inner).map_err(|e| parse_err(e.to_string()));
    }
    if let Some(expanded) = prefixes.expand(text) {
        return expanded.map_err(|e| parse_err(e.to_string()));
    }
    if text.contains("://") {
        return Iri::new(text).map_err(|e| parse_err(e.to_string()));
    }
    Err(parse_err(format!("'{text}' uses an undeclared prefix")))
}

/// An entity seen through one ontology type.
#[derive(Debug, Clone)]
pub struct TypedView<'a> {
    registry: &'a OntologyRegistry,
    entity: &'a Entity,
    ty: Arc<OntologyType>,
}

impl<'a> TypedView<'a> {
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// The type this view was requested as.
    pub fn ontology_type(&self) -> &OntologyType {
        &self.ty
    }

    pub fn id(&self) -> &'a Iri {
        self.entity.id()
    }

    /// The entity's name, if it is a plain literal.
    pub fn name(&self) -> Option<&'a str> {
        self.entity
            .first_value(self.registry.name_predicate())
            .and_then(Term::as_literal)
            .map(|l| l.lexical.as_str())
    }

    /// Values of a registered predicate.
    pub fn values(&self, predicate: &str) -> Result<Vec<&'a Term>, OntologyError> {
        let iri = self.registry.predicate(predicate)?;
        Ok(self.entity.values(&iri).collect())
    }
}
