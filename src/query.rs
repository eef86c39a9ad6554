//! Typed pattern-query builder.
//!
//! A [`PatternQuery`] is SPARQL text with named `$parameters`. Each parameter
//! is bound once and substituted at every place it appears, so a template that
//! needs the same individual in three patterns names it once.
//!
//! ```
//! use ontograph::iri::Iri;
//! use ontograph::query::PatternQuery;
//!
//! let q = PatternQuery::new("SELECT ?p WHERE { ?p <http://example.org/knows> $who . $who ?x ?y }")
//!     .bind("who", Iri::new("http://example.org/alice").unwrap())
//!     .unwrap();
//! assert_eq!(q.render().unwrap().matches("<http://example.org/alice>").count(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::QueryError;
use crate::graph::Term;
use crate::iri::PrefixMap;

/// A string literal (no group) or a `$name` parameter (group 1).
static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)"""(?:.*?)"""|'''(?:.*?)'''|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|\$([A-Za-z_][A-Za-z0-9_]*)"#,
    )
    .unwrap()
});

/// SPARQL template with named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternQuery {
    template: String,
    /// Parameter names in order of first appearance.
    parameters: Vec<String>,
    bindings: BTreeMap<String, Term>,
}

impl PatternQuery {
    /// Parse a template, collecting its `$name` parameters.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut parameters: Vec<String> = Vec::new();
        for cap in PARAMETER.captures_iter(&template) {
            let Some(name) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !parameters.iter().any(|p| p == name) {
                parameters.push(name.to_string());
            }
        }
        Self {
            template,
            parameters,
            bindings: BTreeMap::new(),
        }
    }

    /// The template's parameter names, in order of first appearance.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Bind a parameter. Rebinding replaces the previous value.
    pub fn bind(mut self, name: &str, value: impl Into<Term>) -> Result<Self, QueryError> {
        if !self.parameters.iter().any(|p| p == name) {
            return Err(QueryError::UnknownParameter {
                name: name.to_string(),
            });
        }
        self.bindings.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// Whether every parameter has a value.
    pub fn is_complete(&self) -> bool {
        self.parameters.iter().all(|p| self.bindings.contains_key(p))
    }

    /// Substitute every parameter.
    pub fn render(&self) -> Result<String, QueryError> {
        if let Some(missing) = self
            .parameters
            .iter()
            .find(|p| !self.bindings.contains_key(*p))
        {
            return Err(QueryError::Unbound {
                name: missing.clone(),
            });
        }
        let rendered = PARAMETER.replace_all(&self.template, |cap: &regex::Captures<'_>| {
            match cap.get(1) {
                Some(name) => self
                    .bindings
                    .get(name.as_str())
                    .map(Term::to_string)
                    .unwrap_or_default(),
                None => cap[0].to_string(),
            }
        });
        Ok(rendered.into_owned())
    }

    /// Render with a `PREFIX` header for every entry of `prefixes`.
    pub fn render_with(&self, prefixes: &PrefixMap) -> Result<String, QueryError> {
        Ok(format!("{}{}", prefixes.to_sparql(), self.render()?))
    }
}

impl std::fmt::Display for PatternQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;
    use crate::iri::Iri;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{s}")).unwrap()
    }

    #[test]
    fn parameters_are_collected_once() {
        let q = PatternQuery::new("SELECT ?x WHERE { $a ?p $b . $b ?q $a }");
        assert_eq!(q.parameters(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn bind_substitutes_every_use() {
        let q = PatternQuery::new("SELECT ?x WHERE { $a ?p ?x . ?x ?q $a . ?x ?r $name }")
            .bind("a", iri("alice"))
            .unwrap()
            .bind("name", Literal::string("Bob"))
            .unwrap();
        assert!(q.is_complete());
        let text = q.render().unwrap();
        assert_eq!(text.matches("<http://example.org/alice>").count(), 2);
        assert!(text.contains("\"Bob\""));
        assert!(!text.contains('$'));
    }

    #[test]
    fn unbound_parameter_fails() {
        let q = PatternQuery::new("SELECT ?x WHERE { $a ?p ?x }");
        assert!(matches!(q.render(), Err(QueryError::Unbound { name }) if name == "a"));
    }

    #[test]
    fn unknown_parameter_fails() {
        let q = PatternQuery::new("SELECT ?x WHERE { $a ?p ?x }");
        assert!(matches!(
            q.bind("b", iri("x")),
            Err(QueryError::UnknownParameter { name }) if name == "b"
        ));
    }

    #[test]
    fn prefix_header() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        let q = PatternQuery::new("SELECT ?x WHERE { ?x a ex:Thing }");
        let text = q.render_with(&prefixes).unwrap();
        assert!(text.starts_with("PREFIX ex: <http://example.org/>\n"));
        assert!(text.ends_with("ex:Thing }"));
    }

    #[test]
    fn dollar_inside_string_literals_is_text() {
        let q = PatternQuery::new(
            r#"SELECT ?x WHERE { ?x ?p "costs $5" . ?x ?q ?tag FILTER(?tag = "$tag" || ?tag = 'it\'s $x') . ?x ?r $owner }"#,
        );
        assert_eq!(q.parameters(), &["owner".to_string()]);
        let text = q.bind("owner", iri("ann")).unwrap().render().unwrap();
        assert!(text.contains(r#""costs $5""#));
        assert!(text.contains(r#""$tag""#));
        assert!(text.contains(r"'it\'s $x'"));
        assert!(text.ends_with("<http://example.org/ann> }"));
    }

    #[test]
    fn escaped_quotes_and_long_strings_stay_literal() {
        let q = PatternQuery::new(
            r#"SELECT ?x WHERE { ?x ?p "say \"$hi\"" . ?x ?d """two "$lines"
here""" . ?x ?q $v }"#,
        );
        assert_eq!(q.parameters(), &["v".to_string()]);
    }
}
