// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RDF term values consumed and produced by expressions
//!
//! This is the minimal slice of the RDF data model the evaluator needs: IRIs
//! with namespace stripping, blank nodes and literals that expose their
//! declared datatype for numeric classification.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

use super::vocab::{rdf, xsd};

/// An absolute IRI
///
/// Cheap to clone; the text is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(Arc<str>);

impl Iri {
    /// Create an IRI from its text
    pub fn new(iri: impl AsRef<str>) -> Self {
        Self(Arc::from(iri.as_ref()))
    }

    /// The IRI text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local part of the IRI if it starts with `namespace`
    pub fn strip_namespace(&self, namespace: &str) -> Option<&str> {
        self.0.strip_prefix(namespace)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// An RDF literal
///
/// A literal carries either a language tag or a datatype, never both. A
/// literal with neither is a simple literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    lexical: String,
    language: Option<String>,
    datatype: Option<Iri>,
}

impl Literal {
    /// Create a simple literal
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            language: None,
            datatype: None,
        }
    }

    /// Create a literal with a datatype
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        Self {
            lexical: lexical.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Create a language-tagged literal
    pub fn lang_tagged(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            language: Some(language.into().to_ascii_lowercase()),
            datatype: None,
        }
    }

    /// The lexical form
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// The language tag, if any
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The declared datatype, if any
    pub fn declared_datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    /// Datatype IRI text including the implicit ones of simple and tagged literals
    pub fn datatype(&self) -> &str {
        match (&self.datatype, &self.language) {
            (Some(dt), _) => dt.as_str(),
            (None, Some(_)) => rdf::LANG_STRING,
            (None, None) => xsd::STRING,
        }
    }

    /// Simple literal, xsd:string literal or language-tagged literal
    pub fn is_string_literal(&self) -> bool {
        match &self.datatype {
            None => true,
            Some(dt) => dt.as_str() == xsd::STRING,
        }
    }

    /// Simple literal or xsd:string literal
    pub fn is_plain_string(&self) -> bool {
        self.language.is_none() && self.is_string_literal()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical.replace('\\', "\\\\").replace('"', "\\\""))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")
        } else {
            Ok(())
        }
    }
}

/// An RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// IRI reference
    Iri(Iri),
    /// Blank node with its label
    BlankNode(String),
    /// Literal
    Literal(Literal),
}

impl Term {
    /// IRI term
    pub fn iri(iri: impl Into<Iri>) -> Self {
        Term::Iri(iri.into())
    }

    /// Blank node term
    pub fn blank_node(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Simple literal term
    pub fn string(value: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(value))
    }

    /// Typed literal term
    pub fn typed(lexical: impl Into<String>, datatype: &str) -> Self {
        Term::Literal(Literal::typed(lexical, datatype))
    }

    /// xsd:boolean literal
    pub fn boolean(value: bool) -> Self {
        Self::typed(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    /// xsd:integer literal
    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    /// xsd:decimal literal
    pub fn decimal(value: Decimal) -> Self {
        Self::typed(value.normalize().to_string(), xsd::DECIMAL)
    }

    /// xsd:float literal
    pub fn float(value: f32) -> Self {
        let lexical = if value.is_finite() {
            value.to_string()
        } else {
            format_floating(value as f64)
        };
        Self::typed(lexical, xsd::FLOAT)
    }

    /// xsd:double literal
    pub fn double(value: f64) -> Self {
        Self::typed(format_floating(value), xsd::DOUBLE)
    }

    /// xsd:dateTime literal
    pub fn date_time(value: DateTime<FixedOffset>) -> Self {
        Self::typed(value.to_rfc3339_opts(SecondsFormat::AutoSi, true), xsd::DATE_TIME)
    }

    /// The literal, if this term is one
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// The IRI, if this term is one
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Whether the term is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Short description of the term kind for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Iri(_) => "IRI",
            Term::BlankNode(_) => "blank node",
            Term::Literal(_) => "literal",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::BlankNode(label) => write!(f, "_:{label}"),
            Term::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

impl From<Iri> for Term {
    fn from(value: Iri) -> Self {
        Term::Iri(value)
    }
}

/// Lexical form of a float or double following XML Schema spelling
pub(crate) fn format_floating(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_namespace() {
        let iri = Iri::new("http://www.w3.org/ns/sparql#abs");
        assert_eq!(iri.strip_namespace("http://www.w3.org/ns/sparql#"), Some("abs"));
        assert_eq!(iri.strip_namespace("http://example.org/"), None);
    }

    #[test]
    fn test_literal_datatypes() {
        assert_eq!(Literal::simple("a").datatype(), xsd::STRING);
        assert_eq!(Literal::lang_tagged("a", "EN").datatype(), rdf::LANG_STRING);
        assert_eq!(Literal::lang_tagged("a", "EN").language(), Some("en"));
        assert!(Literal::typed("a", xsd::STRING).is_plain_string());
        assert!(!Literal::typed("1", xsd::INTEGER).is_string_literal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::integer(3).to_string(), format!("\"3\"^^<{}>", xsd::INTEGER));
        assert_eq!(Term::string("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Term::blank_node("b0").to_string(), "_:b0");
        assert_eq!(Term::double(f64::INFINITY).as_literal().unwrap().lexical(), "INF");
    }
}
