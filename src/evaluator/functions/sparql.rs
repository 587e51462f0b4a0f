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

//! Core SPARQL built-in functions
//!
//! String, date-time and hashing helpers here are shared with the XPath
//! functions that have the same semantics.

use chrono::{Datelike, FixedOffset, Timelike};
use md5::Md5;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rust_decimal::Decimal;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use url::Url;

use super::CallArgs;
use crate::ast::SparqlFunction;
use crate::error::{EvaluationError, EvaluationResult};
use crate::evaluator::helpers::{
    DateTimeValue, check_compatible, compile_regex, date_time_arg, digest_hex,
    effective_boolean_value, lexical_form, simple_string, string_like, string_literal,
};
use crate::model::vocab::xsd;
use crate::model::{Literal, NumericType, NumericValue, Term};

/// Characters ENCODE_FOR_URI leaves alone: the RFC 3986 unreserved set
const URI_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(super) fn evaluate(function: SparqlFunction, args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let name = args.name();
    match function {
        SparqlFunction::Abs => Ok(args.numeric(0)?.abs()?.into_term()),
        SparqlFunction::Ceil => Ok(args.numeric(0)?.ceil().into_term()),
        SparqlFunction::Floor => Ok(args.numeric(0)?.floor().into_term()),
        SparqlFunction::Round => Ok(args.numeric(0)?.round().into_term()),
        SparqlFunction::Bound => bound(args),
        SparqlFunction::Coalesce => coalesce(args),
        SparqlFunction::Concat => concat(&args.terms()?, name),
        SparqlFunction::Contains => string_test(args, |s, p| s.contains(p)),
        SparqlFunction::StrStarts => string_test(args, |s, p| s.starts_with(p)),
        SparqlFunction::StrEnds => string_test(args, |s, p| s.ends_with(p)),
        SparqlFunction::Datatype => match args.term(0)? {
            Term::Literal(literal) => Ok(Term::iri(literal.datatype())),
            other => Err(EvaluationError::type_error("a literal argument for DATATYPE", other)),
        },
        SparqlFunction::Year => date_part(args, |dt| dt.local.year() as i64),
        SparqlFunction::Month => date_part(args, |dt| dt.local.month() as i64),
        SparqlFunction::Day => date_part(args, |dt| dt.local.day() as i64),
        SparqlFunction::Hours => date_part(args, |dt| dt.local.hour() as i64),
        SparqlFunction::Minutes => date_part(args, |dt| dt.local.minute() as i64),
        SparqlFunction::Seconds => seconds(args),
        SparqlFunction::Timezone => timezone(args),
        SparqlFunction::Tz => tz(args),
        SparqlFunction::EncodeForUri => encode_for_uri(args),
        SparqlFunction::If => {
            let condition = effective_boolean_value(&args.term(0)?)?;
            args.term(if condition { 1 } else { 2 })
        }
        SparqlFunction::Iri => iri(args),
        SparqlFunction::IsBlank => Ok(Term::boolean(matches!(args.term(0)?, Term::BlankNode(_)))),
        SparqlFunction::IsIri => Ok(Term::boolean(matches!(args.term(0)?, Term::Iri(_)))),
        SparqlFunction::IsLiteral => Ok(Term::boolean(args.term(0)?.is_literal())),
        SparqlFunction::IsNumeric => {
            let term = args.term(0)?;
            Ok(Term::boolean(
                NumericType::of_term(&term).is_numeric() && NumericValue::from_term(&term, name).is_ok(),
            ))
        }
        SparqlFunction::Lang => match args.term(0)? {
            Term::Literal(literal) => Ok(Term::string(literal.language().unwrap_or_default())),
            other => Err(EvaluationError::type_error("a literal argument for LANG", other)),
        },
        SparqlFunction::LangMatches => lang_matches(args),
        SparqlFunction::LCase => map_string(args, str::to_lowercase),
        SparqlFunction::UCase => map_string(args, str::to_uppercase),
        SparqlFunction::Md5 => hash::<Md5>(args),
        SparqlFunction::Sha1 => hash::<Sha1>(args),
        SparqlFunction::Sha256 => hash::<Sha256>(args),
        SparqlFunction::Sha384 => hash::<Sha384>(args),
        SparqlFunction::Sha512 => hash::<Sha512>(args),
        SparqlFunction::Now => Ok(Term::date_time(args.ctx().now())),
        SparqlFunction::Regex => regex(args),
        SparqlFunction::SameTerm => Ok(Term::boolean(args.term(0)? == args.term(1)?)),
        SparqlFunction::Str => Ok(Term::string(lexical_form(&args.term(0)?, name)?)),
        SparqlFunction::StrDt => {
            let lexical = args.term(0)?;
            match args.term(1)? {
                Term::Iri(datatype) => Ok(Term::Literal(Literal::typed(
                    simple_string(&lexical, name)?,
                    datatype,
                ))),
                other => Err(EvaluationError::type_error("a datatype IRI for STRDT", other)),
            }
        }
        SparqlFunction::StrLang => {
            let (lexical, tag) = (args.term(0)?, args.term(1)?);
            let tag = simple_string(&tag, name)?;
            if tag.is_empty() {
                return Err(EvaluationError::domain(name, "language tag must not be empty"));
            }
            Ok(Term::Literal(Literal::lang_tagged(simple_string(&lexical, name)?, tag)))
        }
        SparqlFunction::StrLen => string_length(args),
        SparqlFunction::Substr => substring(args),
    }
}

fn bound(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    match args.node(0)?.as_variable() {
        Some(variable) => Ok(Term::boolean(args.ctx().value(variable, args.binding()).is_some())),
        None => Err(EvaluationError::type_error("a variable argument for BOUND", args.node(0)?)),
    }
}

fn coalesce(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let mut last_error = None;
    for index in 0..args.len() {
        match args.term(index) {
            Ok(term) => return Ok(term),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| EvaluationError::domain("COALESCE", "no arguments")))
}

/// Concatenation keeping a common language tag or xsd:string datatype
pub(super) fn concat(terms: &[Term], name: &str) -> EvaluationResult<Term> {
    let mut out = String::new();
    let mut language: Option<Option<&str>> = None;
    let mut all_typed = !terms.is_empty();
    for term in terms {
        let literal = string_literal(term, name)?;
        out.push_str(literal.lexical());
        all_typed &= literal.declared_datatype().is_some();
        language = Some(match language {
            None => literal.language(),
            Some(previous) if previous == literal.language() => previous,
            Some(_) => None,
        });
    }
    Ok(match language.flatten() {
        Some(tag) => Term::Literal(Literal::lang_tagged(out, tag)),
        None if all_typed => Term::typed(out, xsd::STRING),
        None => Term::string(out),
    })
}

/// Boolean test between two compatible string arguments
pub(super) fn string_test(args: &CallArgs<'_>, test: fn(&str, &str) -> bool) -> EvaluationResult<Term> {
    let (a, b) = (args.term(0)?, args.term(1)?);
    let (text, needle) = (string_literal(&a, args.name())?, string_literal(&b, args.name())?);
    check_compatible(text, needle, args.name())?;
    Ok(Term::boolean(test(text.lexical(), needle.lexical())))
}

/// String transformation preserving the argument's tag or type
pub(super) fn map_string(args: &CallArgs<'_>, transform: fn(&str) -> String) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let literal = string_literal(&term, args.name())?;
    Ok(string_like(transform(literal.lexical()), literal))
}

pub(super) fn string_length(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let literal = string_literal(&term, args.name())?;
    Ok(Term::integer(literal.lexical().chars().count() as i64))
}

fn xpath_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// One-based substring with XPath rounding of start and length
pub(super) fn substring(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let source = string_literal(&term, args.name())?;
    let start = xpath_round(args.double(1)?);
    let end = match args.optional(2)? {
        Some(length) => start + xpath_round(NumericValue::from_term(&length, args.name())?.as_f64()),
        None => f64::INFINITY,
    };
    let result: String = source
        .lexical()
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (*index + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(string_like(result, source))
}

pub(super) fn encode_for_uri(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let literal = string_literal(&term, args.name())?;
    Ok(Term::string(
        utf8_percent_encode(literal.lexical(), URI_UNRESERVED).to_string(),
    ))
}

fn hash<D: Digest>(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    Ok(Term::string(digest_hex::<D>(simple_string(&term, args.name())?)))
}

fn lang_matches(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let (tag, range) = (args.term(0)?, args.term(1)?);
    let tag = simple_string(&tag, args.name())?.to_ascii_lowercase();
    let range = simple_string(&range, args.name())?.to_ascii_lowercase();
    let matches = if range == "*" {
        !tag.is_empty()
    } else {
        tag == range
            || tag
                .strip_prefix(range.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    };
    Ok(Term::boolean(matches))
}

fn regex(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let name = args.name();
    let (text, pattern) = (args.term(0)?, args.term(1)?);
    let flags = args.optional(2)?;
    let text = string_literal(&text, name)?;
    let flags = match &flags {
        Some(flags) => simple_string(flags, name)?,
        None => "",
    };
    let re = compile_regex(simple_string(&pattern, name)?, flags, args.ctx().regex_cache_size())?;
    Ok(Term::boolean(re.is_match(text.lexical())))
}

fn iri(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let text = match &term {
        Term::Iri(_) => return Ok(term),
        Term::Literal(literal) if literal.is_plain_string() => literal.lexical(),
        other => return Err(EvaluationError::type_error("an IRI or simple literal for IRI", other)),
    };
    let resolved = match args.ctx().base_iri() {
        Some(base) => Url::parse(base.as_str())
            .and_then(|base| base.join(text))
            .map(String::from),
        None => Url::parse(text).map(|_| text.to_string()),
    };
    resolved
        .map(Term::iri)
        .map_err(|e| EvaluationError::domain(args.name(), format!("cannot build an IRI from '{text}': {e}")))
}

/// Integer component of an xsd:dateTime argument
pub(super) fn date_part(args: &CallArgs<'_>, part: fn(&DateTimeValue) -> i64) -> EvaluationResult<Term> {
    let value = date_time_arg(&args.term(0)?, args.name())?;
    Ok(Term::integer(part(&value)))
}

/// Seconds including the fractional part, as a decimal
pub(super) fn seconds(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let value = date_time_arg(&args.term(0)?, args.name())?;
    let nanos = value.local.second() as i64 * 1_000_000_000 + value.local.nanosecond() as i64;
    Ok(Term::decimal(Decimal::new(nanos, 9)))
}

/// Timezone of an xsd:dateTime argument as an xsd:dayTimeDuration
pub(super) fn timezone(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let value = date_time_arg(&args.term(0)?, args.name())?;
    match value.offset {
        Some(offset) => Ok(Term::typed(day_time_duration(offset), xsd::DAY_TIME_DURATION)),
        None => Err(EvaluationError::domain(args.name(), "the value has no timezone")),
    }
}

fn tz(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let value = date_time_arg(&term, args.name())?;
    let lexical = term.as_literal().map(Literal::lexical).unwrap_or_default().trim();
    Ok(Term::string(match value.offset {
        None => String::new(),
        Some(_) if lexical.ends_with(['Z', 'z']) => "Z".to_string(),
        Some(offset) => offset.to_string(),
    }))
}

fn day_time_duration(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "PT0S".to_string();
    }
    let sign = if seconds < 0 { "-" } else { "" };
    let (hours, minutes) = (seconds.abs() / 3600, seconds.abs() % 3600 / 60);
    let mut out = format!("{sign}PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    out
}
