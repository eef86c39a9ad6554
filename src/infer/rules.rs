//! Data-driven inference and validation rules.
//!
//! Rules are data, not code: they are loaded from JSON or from the rule text
//! format, or built programmatically.
//!
//! ```text
//! @prefix ex: <http://example.org/>
//!
//! @rule part-of-transitive derive
//!   match: (?x ex:partOf ?y), (?y ex:partOf ?z)
//!   produce: (?x ex:partOf ?z)
//!
//! @rule person-needs-label violation MissingLabel
//!   match: (?p rdf:type ex:Person)
//!   absent: (?p rdfs:label ?l)
//!   message: "person ?p has no label"
//!   resource: ?p
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::graph::{Literal, Term};
use crate::iri::{Iri, PrefixMap, ns};

// ---------------------------------------------------------------------------
// Rule term
// ---------------------------------------------------------------------------

/// A position in a rule pattern: a variable or a fixed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTerm {
    /// A variable, stored without the leading `?`.
    Variable(String),
    Value(Term),
}

impl RuleTerm {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn iri(iri: Iri) -> Self {
        Self::Value(Term::Iri(iri))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Value(_) => None,
        }
    }
}

impl std::fmt::Display for RuleTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "?{name}"),
            Self::Value(term) => write!(f, "{term}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Triple pattern
// ---------------------------------------------------------------------------

/// A statement pattern. Subject and predicate are never literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: RuleTerm,
    pub predicate: RuleTerm,
    pub object: RuleTerm,
}

impl TriplePattern {
    pub fn new(subject: RuleTerm, predicate: RuleTerm, object: RuleTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Variables in subject, predicate, object order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(RuleTerm::variable)
    }
}

impl std::fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

// ---------------------------------------------------------------------------
// Rule kinds
// ---------------------------------------------------------------------------

/// What a rule does with its matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Add the `produce:` statements for every match.
    Derive,
    /// Report one violation of this type for every match.
    Violation { violation_type: String },
}

/// Which resource a violation implicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSpec {
    Variable(String),
    Iri(Iri),
    #[default]
    Wildcard,
}

// ---------------------------------------------------------------------------
// Inference rule
// ---------------------------------------------------------------------------

/// A single rule: match antecedents, then derive or report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRule {
    pub name: String,
    pub kind: RuleKind,
    /// `match:` patterns, joined.
    pub antecedents: Vec<TriplePattern>,
    /// `produce:` patterns (derive rules only).
    #[serde(default)]
    pub consequents: Vec<TriplePattern>,
    /// `absent:` patterns that must not jointly match (violation rules only).
    #[serde(default)]
    pub absent: Vec<TriplePattern>,
    /// Variables that must be bound to pairwise different values.
    #[serde(default)]
    pub distinct: Vec<String>,
    /// Description template; `?var` references are interpolated.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub resource: ResourceSpec,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl InferenceRule {
    /// A derive rule with no patterns yet.
    pub fn derive(name: impl Into<String>) -> Self {
        Self::with_kind(name, RuleKind::Derive)
    }

    /// A violation rule with no patterns yet.
    pub fn violation(name: impl Into<String>, violation_type: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            RuleKind::Violation {
                violation_type: violation_type.into(),
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            antecedents: Vec::new(),
            consequents: Vec::new(),
            absent: Vec::new(),
            distinct: Vec::new(),
            message: None,
            resource: ResourceSpec::Wildcard,
            enabled: true,
        }
    }

    pub fn with_antecedents(mut self, antecedents: Vec<TriplePattern>) -> Self {
        self.antecedents = antecedents;
        self
    }

    pub fn with_consequents(mut self, consequents: Vec<TriplePattern>) -> Self {
        self.consequents = consequents;
        self
    }

    pub fn with_absent(mut self, absent: Vec<TriplePattern>) -> Self {
        self.absent = absent;
        self
    }

    pub fn with_distinct(mut self, variables: Vec<String>) -> Self {
        self.distinct = variables;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceSpec) -> Self {
        self.resource = resource;
        self
    }

    pub fn is_derive(&self) -> bool {
        self.kind == RuleKind::Derive
    }

    /// The violation type label, for violation rules.
    pub fn violation_type(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Violation { violation_type } => Some(violation_type),
            RuleKind::Derive => None,
        }
    }

    /// Variables bound by the `match:` patterns.
    pub fn bound_variables(&self) -> BTreeSet<&str> {
        self.antecedents
            .iter()
            .flat_map(TriplePattern::variables)
            .collect()
    }

    /// Check the structural requirements of the rule's kind.
    pub fn validate(&self) -> Result<(), RuleError> {
        let fail = |message: &str| RuleError::Parse {
            rule_name: self.name.clone(),
            line: 0,
            message: message.to_string(),
        };
        if self.antecedents.is_empty() {
            return Err(fail("rule needs at least one `match:` pattern"));
        }
        let bound = self.bound_variables();
        let unbound = |variable: &str| RuleError::UnboundHeadVariable {
            rule_name: self.name.clone(),
            variable: variable.to_string(),
        };

        match &self.kind {
            RuleKind::Derive => {
                if self.consequents.is_empty() {
                    return Err(fail("derive rule needs at least one `produce:` pattern"));
                }
                if !self.absent.is_empty() || !self.distinct.is_empty() {
                    return Err(fail("`absent:` and `distinct:` are only allowed in violation rules"));
                }
                if self.message.is_some() || self.resource != ResourceSpec::Wildcard {
                    return Err(fail("`message:` and `resource:` are only allowed in violation rules"));
                }
                for variable in self.consequents.iter().flat_map(TriplePattern::variables) {
                    if !bound.contains(variable) {
                        return Err(unbound(variable));
                    }
                }
            }
            RuleKind::Violation { violation_type } => {
                if violation_type.is_empty() {
                    return Err(fail("violation rule needs a type label"));
                }
                if !self.consequents.is_empty() {
                    return Err(fail("violation rules cannot `produce:` statements"));
                }
                for variable in &self.distinct {
                    if !bound.contains(variable.as_str()) {
                        return Err(unbound(variable));
                    }
                }
                if let ResourceSpec::Variable(variable) = &self.resource {
                    if !bound.contains(variable.as_str()) {
                        return Err(unbound(variable));
                    }
                }
            }
        }

        let positions = self
            .antecedents
            .iter()
            .chain(&self.consequents)
            .chain(&self.absent);
        for pattern in positions {
            let literal_at = |t: &RuleTerm| matches!(t, RuleTerm::Value(Term::Literal(_)));
            if literal_at(&pattern.subject) || literal_at(&pattern.predicate) {
                return Err(fail(&format!(
                    "literal in subject or predicate position: {pattern}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// A named collection of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<InferenceRule>,
    #[serde(default)]
    pub source: String,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<InferenceRule>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            rules,
        }
    }

    /// Enabled derive rules.
    pub fn derive_rules(&self) -> impl Iterator<Item = &InferenceRule> {
        self.rules.iter().filter(|r| r.enabled && r.is_derive())
    }

    /// Enabled violation rules.
    pub fn violation_rules(&self) -> impl Iterator<Item = &InferenceRule> {
        self.rules.iter().filter(|r| r.enabled && !r.is_derive())
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }

    /// Append another set's rules.
    pub fn merge(mut self, other: RuleSet) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// Parse a JSON array of rules.
    pub fn from_json(json: &str, source: &str) -> Result<Self, RuleError> {
        let rules: Vec<InferenceRule> =
            serde_json::from_str(json).map_err(|e| RuleError::Parse {
                rule_name: String::new(),
                line: e.line(),
                message: format!("JSON parse error: {e}"),
            })?;
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self {
            name: source.to_string(),
            rules,
            source: source.to_string(),
        })
    }

    /// The rules as a JSON array.
    pub fn to_json(&self) -> Result<String, RuleError> {
        serde_json::to_string_pretty(&self.rules).map_err(|e| RuleError::Parse {
            rule_name: self.name.clone(),
            line: 0,
            message: format!("JSON encode error: {e}"),
        })
    }

    /// Parse the rule text format with only the built-in prefixes.
    pub fn parse_from_text(text: &str, source: &str) -> Result<Self, RuleError> {
        Self::parse_with_prefixes(text, source, &PrefixMap::with_builtins())
    }

    /// Parse the rule text format. `prefixes` seeds the prefix table; `@prefix`
    /// lines add to it.
    pub fn parse_with_prefixes(
        text: &str,
        source: &str,
        prefixes: &PrefixMap,
    ) -> Result<Self, RuleError> {
        let mut parser = TextParser {
            prefixes: prefixes.clone(),
            rules: Vec::new(),
            current: None,
        };
        for (index, line) in text.lines().enumerate() {
            parser.line(index + 1, line)?;
        }
        parser.finish_rule()?;
        Ok(Self {
            name: source.to_string(),
            rules: parser.rules,
            source: source.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Text format
// ---------------------------------------------------------------------------

struct TextParser {
    prefixes: PrefixMap,
    rules: Vec<InferenceRule>,
    /// Rule being read, with the line of its header.
    current: Option<(InferenceRule, usize)>,
}

impl TextParser {
    fn line(&mut self, line_no: usize, line: &str) -> Result<(), RuleError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        if let Some(rest) = trimmed.strip_prefix("@prefix") {
            self.finish_rule()?;
            return self.prefix(line_no, rest);
        }
        if let Some(rest) = trimmed.strip_prefix("@rule") {
            self.finish_rule()?;
            let rule = parse_header(line_no, rest)?;
            self.current = Some((rule, line_no));
            return Ok(());
        }

        let Some((rule, _)) = self.current.as_mut() else {
            return Err(RuleError::Parse {
                rule_name: String::new(),
                line: line_no,
                message: format!("expected `@prefix` or `@rule`, found '{trimmed}'"),
            });
        };
        let (key, value) = trimmed.split_once(':').ok_or_else(|| RuleError::Parse {
            rule_name: rule.name.clone(),
            line: line_no,
            message: format!("expected `key: value`, found '{trimmed}'"),
        })?;
        let value = value.trim();
        let name = rule.name.clone();
        let err = |message: String| RuleError::Parse {
            rule_name: name.clone(),
            line: line_no,
            message,
        };

        match key.trim() {
            "match" => {
                let patterns = parse_patterns(value, &self.prefixes, &name, line_no)?;
                rule.antecedents.extend(patterns);
            }
            "produce" => {
                let patterns = parse_patterns(value, &self.prefixes, &name, line_no)?;
                rule.consequents.extend(patterns);
            }
            "absent" => {
                let patterns = parse_patterns(value, &self.prefixes, &name, line_no)?;
                rule.absent.extend(patterns);
            }
            "distinct" => {
                for token in value.split_whitespace() {
                    let variable = token
                        .strip_prefix('?')
                        .filter(|v| is_variable_name(v))
                        .ok_or_else(|| err(format!("`distinct:` takes variables, found '{token}'")))?;
                    rule.distinct.push(variable.to_string());
                }
            }
            "message" => {
                rule.message = Some(unquote(value).map_err(err)?);
            }
            "resource" => {
                rule.resource = match value {
                    "*" => ResourceSpec::Wildcard,
                    v if v.starts_with('?') => ResourceSpec::Variable(v[1..].to_string()),
                    v => match parse_term(v, &self.prefixes, &name, line_no)? {
                        RuleTerm::Value(Term::Iri(iri)) => ResourceSpec::Iri(iri),
                        _ => return Err(err(format!("`resource:` must be ?var, an IRI or *, found '{v}'"))),
                    },
                };
            }
            other => return Err(err(format!("unknown key '{other}'"))),
        }
        Ok(())
    }

    fn prefix(&mut self, line_no: usize, rest: &str) -> Result<(), RuleError> {
        let rest = rest.trim().trim_end_matches('.').trim();
        let parsed = rest.split_once(':').and_then(|(prefix, ns)| {
            let ns = ns.trim().strip_prefix('<')?.strip_suffix('>')?;
            Some((prefix.trim(), ns))
        });
        let Some((prefix, namespace)) = parsed else {
            return Err(RuleError::Parse {
                rule_name: String::new(),
                line: line_no,
                message: format!("expected `@prefix name: <namespace>`, found '{rest}'"),
            });
        };
        self.prefixes.insert(prefix, namespace);
        Ok(())
    }

    fn finish_rule(&mut self) -> Result<(), RuleError> {
        if let Some((rule, line)) = self.current.take() {
            rule.validate().map_err(|e| match e {
                RuleError::Parse {
                    rule_name, message, ..
                } => RuleError::Parse {
                    rule_name,
                    line,
                    message,
                },
                other => other,
            })?;
            self.rules.push(rule);
        }
        Ok(())
    }
}

fn parse_header(line_no: usize, rest: &str) -> Result<InferenceRule, RuleError> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let err = |message: &str| RuleError::Parse {
        rule_name: parts.first().copied().unwrap_or_default().to_string(),
        line: line_no,
        message: message.to_string(),
    };
    match parts.as_slice() {
        [name, "derive"] => Ok(InferenceRule::derive(*name)),
        [name, "violation", violation_type] => Ok(InferenceRule::violation(*name, *violation_type)),
        [_, "violation"] => Err(err("violation rule needs a type label")),
        [_, kind, ..] => Err(err(&format!(
            "unknown rule kind '{kind}', expected `derive` or `violation <Type>`"
        ))),
        _ => Err(err("@rule requires a name and a kind")),
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a comma-separated list of `(...)` patterns, ignoring parentheses
/// inside quoted literals. Only commas and whitespace may sit between groups.
fn split_patterns(s: &str) -> Result<Vec<&str>, String> {
    let s = s.trim();
    let mut results = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_quote {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quote = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' if depth == 0 => {
                return Err(format!("unbalanced ')' at column {}", i + 1));
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    results.push(&s[start..=i]);
                }
            }
            '"' if depth > 0 => in_quote = true,
            _ if depth > 0 => {}
            ',' => {}
            c if c.is_whitespace() => {}
            _ => {
                return Err(format!(
                    "unexpected text outside a pattern at column {}: '{}'",
                    i + 1,
                    &s[i..]
                ));
            }
        }
    }

    if in_quote {
        return Err("unterminated string literal".to_string());
    }
    if depth > 0 {
        return Err(format!("unclosed '(' at column {}", start + 1));
    }
    Ok(results)
}

fn parse_patterns(
    s: &str,
    prefixes: &PrefixMap,
    rule_name: &str,
    line: usize,
) -> Result<Vec<TriplePattern>, RuleError> {
    split_patterns(s)
        .map_err(|message| RuleError::Parse {
            rule_name: rule_name.to_string(),
            line,
            message,
        })?
        .into_iter()
        .map(|p| parse_pattern(p, prefixes, rule_name, line))
        .collect()
}

/// Parse `(s p o)`.
fn parse_pattern(
    s: &str,
    prefixes: &PrefixMap,
    rule_name: &str,
    line: usize,
) -> Result<TriplePattern, RuleError> {
    let err = |message: String| RuleError::Parse {
        rule_name: rule_name.to_string(),
        line,
        message,
    };
    let inner = s
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| err(format!("pattern must be parenthesized: '{s}'")))?;
    let tokens = tokenize(inner).map_err(&err)?;
    let [subject, predicate, object] = tokens.as_slice() else {
        return Err(err(format!(
            "triple pattern must have exactly 3 terms, got {}: '{s}'",
            tokens.len()
        )));
    };
    Ok(TriplePattern {
        subject: parse_term(subject, prefixes, rule_name, line)?,
        predicate: parse_term(predicate, prefixes, rule_name, line)?,
        object: parse_term(object, prefixes, rule_name, line)?,
    })
}

/// Split on whitespace outside quoted literals.
fn tokenize(s: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;

    for ch in s.chars() {
        if in_quote {
            current.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quote = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => {
                in_quote = true;
                current.push(ch);
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quote {
        return Err(format!("unterminated string literal in '{s}'"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Strip quotes from `"..."` and resolve `\"`, `\\`, `\n` and `\t`.
fn unquote(s: &str) -> Result<String, String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("expected a quoted string, found '{s}'"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => return Err(format!("dangling escape in '{s}'")),
        }
    }
    Ok(out)
}

fn parse_term(
    token: &str,
    prefixes: &PrefixMap,
    rule_name: &str,
    line: usize,
) -> Result<RuleTerm, RuleError> {
    let err = |message: String| RuleError::Parse {
        rule_name: rule_name.to_string(),
        line,
        message,
    };

    if let Some(var) = token.strip_prefix('?') {
        if !is_variable_name(var) {
            return Err(err(format!("invalid variable name '{token}'")));
        }
        return Ok(RuleTerm::Variable(var.to_string()));
    }
    if token == "a" {
        return Ok(RuleTerm::iri(Iri::vocab(ns::RDF, "type")));
    }
    if token.starts_with('"') {
        return parse_literal(token, prefixes, rule_name, line).map(|l| RuleTerm::Value(l.into()));
    }
    if token.parse::<i64>().is_ok() {
        return Ok(RuleTerm::Value(Literal::typed(token, Iri::vocab(ns::XSD, "integer")).into()));
    }
    parse_iri(token, prefixes, rule_name, line).map(RuleTerm::iri)
}

fn parse_iri(token: &str, prefixes: &PrefixMap, rule_name: &str, line: usize) -> Result<Iri, RuleError> {
    if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Iri::new(inner).map_err(|e| RuleError::Parse {
            rule_name: rule_name.to_string(),
            line,
            message: e.to_string(),
        });
    }
    let Some((prefix, _)) = token.split_once(':') else {
        return Err(RuleError::Parse {
            rule_name: rule_name.to_string(),
            line,
            message: format!("unrecognized term '{token}'"),
        });
    };
    match prefixes.expand(token) {
        Some(iri) => iri.map_err(|e| RuleError::Parse {
            rule_name: rule_name.to_string(),
            line,
            message: e.to_string(),
        }),
        None => Err(RuleError::UnknownPrefix {
            rule_name: rule_name.to_string(),
            prefix: prefix.to_string(),
        }),
    }
}

/// `"lex"`, `"lex"^^type` or `"lex"@lang`.
fn parse_literal(
    token: &str,
    prefixes: &PrefixMap,
    rule_name: &str,
    line: usize,
) -> Result<Literal, RuleError> {
    let err = |message: String| RuleError::Parse {
        rule_name: rule_name.to_string(),
        line,
        message,
    };
    let close = closing_quote(token).ok_or_else(|| err(format!("unterminated literal '{token}'")))?;
    let lexical = unquote(&token[..=close]).map_err(&err)?;
    let suffix = &token[close + 1..];

    if suffix.is_empty() {
        Ok(Literal::string(lexical))
    } else if let Some(datatype) = suffix.strip_prefix("^^") {
        let datatype = parse_iri(datatype, prefixes, rule_name, line)?;
        Ok(Literal::typed(lexical, datatype))
    } else if let Some(lang) = suffix.strip_prefix('@') {
        if lang.is_empty() {
            return Err(err(format!("empty language tag in '{token}'")));
        }
        Ok(Literal::lang_string(lexical, lang))
    } else {
        Err(err(format!("unexpected text after literal in '{token}'")))
    }
}

/// Byte index of the quote closing the literal that opens `token`.
fn closing_quote(token: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in token.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}
