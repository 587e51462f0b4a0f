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

//! Primitive casts (XPath constructor functions)

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::ast::CastTarget;
use crate::error::{EvaluationError, EvaluationResult};
use crate::evaluator::helpers::{DateTimeValue, parse_boolean};
use crate::model::numeric::{parse_decimal, parse_floating, parse_integer};
use crate::model::vocab::xsd;
use crate::model::{Literal, NumericType, NumericValue, Term};

/// Source category of a cast operand
enum Source<'a> {
    Numeric(NumericValue),
    Boolean(bool),
    String(&'a str),
    DateTime(&'a str),
}

pub(super) fn evaluate(target: CastTarget, value: &Term) -> EvaluationResult<Term> {
    if target == CastTarget::String {
        return match value {
            Term::Iri(iri) => Ok(Term::typed(iri.as_str(), xsd::STRING)),
            Term::Literal(literal) => Ok(Term::typed(literal.lexical(), xsd::STRING)),
            Term::BlankNode(_) => Err(cast_error(target, value)),
        };
    }
    let Some(literal) = value.as_literal() else {
        return Err(cast_error(target, value));
    };
    let source = classify(literal, value)?;
    match target {
        CastTarget::Boolean => to_boolean(source, literal),
        CastTarget::Integer => to_integer(source, literal),
        CastTarget::Decimal => to_decimal(source, literal),
        CastTarget::Float => to_floating(source, literal).map(|f| Term::float(f as f32)),
        CastTarget::Double => to_floating(source, literal).map(Term::double),
        CastTarget::DateTime => match source {
            Source::DateTime(lexical) | Source::String(lexical) => {
                DateTimeValue::parse(lexical)
                    .map(|_| Term::typed(lexical.trim(), xsd::DATE_TIME))
                    .ok_or_else(|| invalid(literal, xsd::DATE_TIME))
            }
            _ => Err(cast_error(target, value)),
        },
        CastTarget::String => Err(cast_error(target, value)),
    }
}

fn classify<'a>(literal: &'a Literal, term: &Term) -> EvaluationResult<Source<'a>> {
    if literal.is_plain_string() {
        return Ok(Source::String(literal.lexical()));
    }
    let datatype = literal.datatype();
    if datatype == xsd::BOOLEAN {
        return parse_boolean(literal.lexical())
            .map(Source::Boolean)
            .ok_or_else(|| invalid(literal, xsd::BOOLEAN));
    }
    if datatype == xsd::DATE_TIME {
        return Ok(Source::DateTime(literal.lexical()));
    }
    if NumericType::classify(literal).is_numeric() {
        return NumericValue::from_term(term, "cast").map(Source::Numeric);
    }
    Err(EvaluationError::type_error(
        "a string, boolean, numeric or dateTime literal to cast",
        term,
    ))
}

fn to_boolean(source: Source<'_>, literal: &Literal) -> EvaluationResult<Term> {
    match source {
        Source::Boolean(b) => Ok(Term::boolean(b)),
        Source::Numeric(n) => Ok(Term::boolean(n.is_truthy())),
        Source::String(s) => parse_boolean(s)
            .map(Term::boolean)
            .ok_or_else(|| invalid(literal, xsd::BOOLEAN)),
        Source::DateTime(_) => Err(cast_error(CastTarget::Boolean, literal)),
    }
}

fn to_integer(source: Source<'_>, literal: &Literal) -> EvaluationResult<Term> {
    let value = match source {
        Source::Boolean(b) => Some(i64::from(b)),
        Source::Numeric(NumericValue::Integer(i)) => Some(i),
        Source::Numeric(NumericValue::Decimal(d)) => d.trunc().to_i64(),
        Source::Numeric(n) => {
            let f = n.as_f64().trunc();
            // Casting keeps the truncated value only when it fits
            (f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
        }
        Source::String(s) => parse_integer(s.trim()),
        Source::DateTime(_) => return Err(cast_error(CastTarget::Integer, literal)),
    };
    value.map(Term::integer).ok_or_else(|| invalid(literal, xsd::INTEGER))
}

fn to_decimal(source: Source<'_>, literal: &Literal) -> EvaluationResult<Term> {
    let value = match source {
        Source::Boolean(b) => Some(Decimal::from(u8::from(b))),
        Source::Numeric(NumericValue::Integer(i)) => Some(Decimal::from(i)),
        Source::Numeric(NumericValue::Decimal(d)) => Some(d),
        Source::Numeric(n) => Decimal::from_f64(n.as_f64()),
        Source::String(s) => parse_decimal(s.trim()),
        Source::DateTime(_) => return Err(cast_error(CastTarget::Decimal, literal)),
    };
    value.map(Term::decimal).ok_or_else(|| invalid(literal, xsd::DECIMAL))
}

fn to_floating(source: Source<'_>, literal: &Literal) -> EvaluationResult<f64> {
    match source {
        Source::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        Source::Numeric(n) => Ok(n.as_f64()),
        Source::String(s) => parse_floating(s.trim()).ok_or_else(|| invalid(literal, xsd::DOUBLE)),
        Source::DateTime(_) => Err(cast_error(CastTarget::Double, literal)),
    }
}

fn invalid(literal: &Literal, datatype: &str) -> EvaluationError {
    EvaluationError::InvalidLexicalForm {
        lexical: literal.lexical().to_string(),
        datatype: datatype.to_string(),
    }
}

fn cast_error(target: CastTarget, value: impl std::fmt::Display) -> EvaluationError {
    EvaluationError::type_error(format!("a value castable to <{}>", target.datatype()), value)
}
