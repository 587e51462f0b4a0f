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

//! Shared helpers for function evaluation
//!
//! Effective boolean value, string argument rules, term comparison,
//! date-time parsing and the compiled regex cache.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use sha2::Digest;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::num::NonZeroUsize;

use crate::error::{EvaluationError, EvaluationResult};
use crate::model::vocab::xsd;
use crate::model::{Literal, NumericType, NumericValue, Term};
use crate::registry::DEFAULT_REGEX_CACHE_SIZE;

// Patterns are usually constant across a query, so each evaluation thread
// keeps the ones it compiled recently.
thread_local! {
    static REGEX_CACHE: RefCell<LruCache<(String, String), Regex>> = RefCell::new(LruCache::new(
        NonZeroUsize::new(DEFAULT_REGEX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
    ));
}

/// Build a regex with XPath flags, using the thread-local cache
///
/// Supported flags: i (case-insensitive), m (multiline), s (dot-all),
/// x (ignore whitespace), q (literal pattern). Unknown flags are an error.
/// A `capacity` of zero disables caching.
pub fn compile_regex(pattern: &str, flags: &str, capacity: usize) -> EvaluationResult<Regex> {
    let key = (pattern.to_string(), flags.to_string());
    if capacity > 0 {
        let cached = REGEX_CACHE.with(|cache| cache.borrow_mut().get(&key).cloned());
        if let Some(re) = cached {
            return Ok(re);
        }
    }

    let literal = flags.contains('q');
    let source = if literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    let mut builder = RegexBuilder::new(&source);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(!literal);
            }
            'q' => {}
            c => {
                return Err(EvaluationError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: format!("unknown flag '{c}'"),
                });
            }
        }
    }
    let re = builder.build().map_err(|e| EvaluationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    if capacity > 0 {
        REGEX_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            if cache.cap().get() != capacity {
                cache.resize(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN));
            }
            cache.put(key, re.clone());
        });
    }
    Ok(re)
}

/// Translate an XPath replacement string to the regex crate's syntax
pub fn xpath_replacement(replacement: &str) -> EvaluationResult<String> {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => out.push_str("$$"),
                Some('\\') => out.push('\\'),
                _ => {
                    return Err(EvaluationError::domain(
                        "replace",
                        "invalid escape in replacement string",
                    ));
                }
            },
            '$' => {
                let mut group = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    group.push(d);
                }
                if group.is_empty() {
                    return Err(EvaluationError::domain(
                        "replace",
                        "'$' must be followed by a group number",
                    ));
                }
                out.push_str(&format!("${{{group}}}"));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Lowercase hex digest of a UTF-8 string
pub fn digest_hex<D: Digest>(input: &str) -> String {
    hex::encode(D::digest(input.as_bytes()))
}

/// Boolean lexical forms
pub fn parse_boolean(lexical: &str) -> Option<bool> {
    match lexical.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Effective boolean value of a term
pub fn effective_boolean_value(term: &Term) -> EvaluationResult<bool> {
    let Some(literal) = term.as_literal() else {
        return Err(EvaluationError::type_error("a literal with a boolean value", term));
    };
    if literal.datatype() == xsd::BOOLEAN {
        return Ok(parse_boolean(literal.lexical()).unwrap_or(false));
    }
    if literal.language().is_some() || literal.is_string_literal() {
        return Ok(!literal.lexical().is_empty());
    }
    if NumericType::classify(literal).is_numeric() {
        // Invalid numeric lexical forms have an EBV of false
        return Ok(NumericValue::from_term(term, "EBV").is_ok_and(|n| n.is_truthy()));
    }
    Err(EvaluationError::type_error("a literal with a boolean value", term))
}

/// The argument as a string literal (simple, xsd:string or language-tagged)
pub fn string_literal<'a>(term: &'a Term, function: &str) -> EvaluationResult<&'a Literal> {
    match term.as_literal() {
        Some(literal) if literal.is_string_literal() => Ok(literal),
        _ => Err(EvaluationError::type_error(
            format!("a string literal argument for {function}"),
            term,
        )),
    }
}

/// The lexical form of a simple or xsd:string literal
pub fn simple_string<'a>(term: &'a Term, function: &str) -> EvaluationResult<&'a str> {
    match term.as_literal() {
        Some(literal) if literal.is_plain_string() => Ok(literal.lexical()),
        _ => Err(EvaluationError::type_error(
            format!("a simple literal argument for {function}"),
            term,
        )),
    }
}

/// Check that two string arguments are compatible
///
/// Both plain, both tagged with the same language, or a tagged first argument
/// with a plain second one.
pub fn check_compatible(arg1: &Literal, arg2: &Literal, function: &str) -> EvaluationResult<()> {
    match (arg1.language(), arg2.language()) {
        (_, None) => Ok(()),
        (Some(a), Some(b)) if a == b => Ok(()),
        _ => Err(EvaluationError::type_error(
            format!("compatible string arguments for {function}"),
            format!("{arg1} and {arg2}"),
        )),
    }
}

/// A string result carrying the language tag or xsd:string type of `template`
pub fn string_like(value: impl Into<String>, template: &Literal) -> Term {
    match (template.language(), template.declared_datatype()) {
        (Some(lang), _) => Term::Literal(Literal::lang_tagged(value, lang)),
        (None, Some(dt)) if dt.as_str() == xsd::STRING => Term::typed(value, xsd::STRING),
        _ => Term::string(value),
    }
}

/// Lexical form of an IRI or literal, as produced by STR
pub fn lexical_form(term: &Term, function: &str) -> EvaluationResult<String> {
    match term {
        Term::Iri(iri) => Ok(iri.as_str().to_string()),
        Term::Literal(literal) => Ok(literal.lexical().to_string()),
        Term::BlankNode(_) => Err(EvaluationError::type_error(
            format!("an IRI or literal argument for {function}"),
            term,
        )),
    }
}

/// Integer argument, e.g. a length or precision
pub fn integer_arg(term: &Term, function: &str) -> EvaluationResult<i64> {
    match NumericValue::from_term(term, function)? {
        NumericValue::Integer(i) => Ok(i),
        other => Err(EvaluationError::type_error(
            format!("an integer argument for {function}"),
            other,
        )),
    }
}

/// An xsd:dateTime value with its optional timezone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTimeValue {
    /// Local date and time as written
    pub local: NaiveDateTime,
    /// Timezone offset, if the lexical form had one
    pub offset: Option<FixedOffset>,
}

impl DateTimeValue {
    /// Parse an xsd:dateTime lexical form
    pub fn parse(lexical: &str) -> Option<Self> {
        let lexical = lexical.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(lexical) {
            return Some(Self {
                local: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }
        NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|local| Self {
                local,
                offset: None,
            })
    }

    /// The value as a point in time; values without a timezone are taken as UTC
    pub fn instant(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.local - offset,
            None => self.local,
        }
    }
}

/// An xsd:dateTime argument
pub fn date_time_arg(term: &Term, function: &str) -> EvaluationResult<DateTimeValue> {
    match term.as_literal() {
        Some(literal) if literal.datatype() == xsd::DATE_TIME => DateTimeValue::parse(literal.lexical())
            .ok_or_else(|| EvaluationError::InvalidLexicalForm {
                lexical: literal.lexical().to_string(),
                datatype: xsd::DATE_TIME.to_string(),
            }),
        _ => Err(EvaluationError::type_error(
            format!("an xsd:dateTime argument for {function}"),
            term,
        )),
    }
}

/// Comparable projection of a literal
enum Comparable<'a> {
    Numeric(NumericValue),
    String(&'a str),
    LangString(&'a str, &'a str),
    Boolean(bool),
    DateTime(DateTimeValue),
    Other,
}

fn comparable<'a>(literal: &'a Literal, term: &Term) -> EvaluationResult<Comparable<'a>> {
    if let Some(lang) = literal.language() {
        return Ok(Comparable::LangString(literal.lexical(), lang));
    }
    if literal.is_string_literal() {
        return Ok(Comparable::String(literal.lexical()));
    }
    if NumericType::classify(literal).is_numeric() {
        return NumericValue::from_term(term, "comparison").map(Comparable::Numeric);
    }
    Ok(match literal.datatype() {
        xsd::BOOLEAN => parse_boolean(literal.lexical()).map_or(Comparable::Other, Comparable::Boolean),
        xsd::DATE_TIME => DateTimeValue::parse(literal.lexical()).map_or(Comparable::Other, Comparable::DateTime),
        _ => Comparable::Other,
    })
}

/// Value comparison used by `<`, `>`, `<=`, `>=`
///
/// Numbers, plain strings, booleans and date-times compare within their own
/// kind. `None` means the values are unordered (NaN involved).
pub fn compare_terms(lhs: &Term, rhs: &Term) -> EvaluationResult<Option<Ordering>> {
    let incomparable = || EvaluationError::type_error("comparable operands", format!("{lhs} and {rhs}"));
    let (Some(a), Some(b)) = (lhs.as_literal(), rhs.as_literal()) else {
        return Err(incomparable());
    };
    match (comparable(a, lhs)?, comparable(b, rhs)?) {
        (Comparable::Numeric(x), Comparable::Numeric(y)) => x.compare(y),
        (Comparable::String(x), Comparable::String(y)) => Ok(Some(x.cmp(y))),
        (Comparable::LangString(x, lx), Comparable::LangString(y, ly)) if lx == ly => Ok(Some(x.cmp(y))),
        (Comparable::Boolean(x), Comparable::Boolean(y)) => Ok(Some(x.cmp(&y))),
        (Comparable::DateTime(x), Comparable::DateTime(y)) => Ok(Some(x.instant().cmp(&y.instant()))),
        _ => Err(incomparable()),
    }
}

/// Value equality used by `=`, `!=`, IN and NOT IN
pub fn terms_equal(lhs: &Term, rhs: &Term) -> EvaluationResult<bool> {
    if lhs == rhs {
        // NaN is the only literal not equal to itself
        return match NumericValue::from_term(lhs, "=") {
            Ok(n) => Ok(n.compare(n)?.is_some()),
            Err(_) => Ok(true),
        };
    }
    let (Some(a), Some(b)) = (lhs.as_literal(), rhs.as_literal()) else {
        return Ok(false);
    };
    match (comparable(a, lhs)?, comparable(b, rhs)?) {
        (Comparable::Numeric(x), Comparable::Numeric(y)) => Ok(x.compare(y)? == Some(Ordering::Equal)),
        (Comparable::String(x), Comparable::String(y)) => Ok(x == y),
        (Comparable::Boolean(x), Comparable::Boolean(y)) => Ok(x == y),
        (Comparable::DateTime(x), Comparable::DateTime(y)) => Ok(x.instant() == y.instant()),
        // Literals of unknown datatypes may still denote the same value
        (Comparable::Other, _) | (_, Comparable::Other) => Err(EvaluationError::type_error(
            "literals with comparable datatypes",
            format!("{lhs} and {rhs}"),
        )),
        _ => Ok(false),
    }
}

/// Total order over terms for MIN and MAX
///
/// Comparable values use [`compare_terms`]; anything else is ordered blank
/// nodes, then IRIs, then literals, then by text.
pub fn total_order(lhs: &Term, rhs: &Term) -> Ordering {
    if let Ok(Some(ordering)) = compare_terms(lhs, rhs) {
        return ordering;
    }
    let rank = |term: &Term| match term {
        Term::BlankNode(_) => 0,
        Term::Iri(_) => 1,
        Term::Literal(_) => 2,
    };
    rank(lhs)
        .cmp(&rank(rhs))
        .then_with(|| lhs.to_string().cmp(&rhs.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Term::boolean(true), true)]
    #[case(Term::typed("0", xsd::BOOLEAN), false)]
    #[case(Term::string(""), false)]
    #[case(Term::string("x"), true)]
    #[case(Term::integer(0), false)]
    #[case(Term::double(f64::NAN), false)]
    #[case(Term::typed("abc", xsd::INTEGER), false)]
    #[case(Term::typed("2.5", xsd::DECIMAL), true)]
    fn test_effective_boolean_value(#[case] term: Term, #[case] expected: bool) {
        assert_eq!(effective_boolean_value(&term), Ok(expected));
    }

    #[test]
    fn test_effective_boolean_value_type_error() {
        assert!(effective_boolean_value(&Term::iri("http://example.org/")).is_err());
        assert!(effective_boolean_value(&Term::typed("2020-01-01T00:00:00Z", xsd::DATE_TIME)).is_err());
    }

    #[test]
    fn test_regex_flags() {
        let re = compile_regex("^ab", "i", 4).unwrap();
        assert!(re.is_match("ABc"));
        let re = compile_regex("a.b", "q", 4).unwrap();
        assert!(re.is_match("xa.b"));
        assert!(!re.is_match("axb"));
        assert!(matches!(
            compile_regex("a", "z", 4),
            Err(EvaluationError::InvalidPattern { .. })
        ));
        assert!(matches!(
            compile_regex("(", "", 0),
            Err(EvaluationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_xpath_replacement() {
        assert_eq!(xpath_replacement("$1-$2x").unwrap(), "${1}-${2}x");
        assert_eq!(xpath_replacement("\\$").unwrap(), "$$");
        assert!(xpath_replacement("$").is_err());
    }

    #[test]
    fn test_compatibility() {
        let en = Literal::lang_tagged("abc", "en");
        let fr = Literal::lang_tagged("b", "fr");
        let plain = Literal::simple("b");
        assert!(check_compatible(&en, &plain, "f").is_ok());
        assert!(check_compatible(&plain, &en, "f").is_err());
        assert!(check_compatible(&en, &fr, "f").is_err());
    }

    #[test]
    fn test_compare_and_equal() {
        assert_eq!(
            compare_terms(&Term::integer(1), &Term::double(1.5)),
            Ok(Some(Ordering::Less))
        );
        assert_eq!(terms_equal(&Term::integer(1), &Term::typed("1.0", xsd::DECIMAL)), Ok(true));
        assert_eq!(terms_equal(&Term::string("a"), &Term::integer(1)), Ok(false));
        assert_eq!(terms_equal(&Term::double(f64::NAN), &Term::double(f64::NAN)), Ok(false));
        assert!(compare_terms(&Term::string("a"), &Term::integer(1)).is_err());
        assert!(terms_equal(&Term::typed("x", "http://example.org/dt"), &Term::integer(1)).is_err());
    }

    #[test]
    fn test_date_time_parse() {
        let with_tz = DateTimeValue::parse("2011-01-10T14:45:13.815-05:00").unwrap();
        assert!(with_tz.offset.is_some());
        let without_tz = DateTimeValue::parse("2011-01-10T14:45:13").unwrap();
        assert!(without_tz.offset.is_none());
        assert!(DateTimeValue::parse("2011-01-10").is_none());
    }
}
