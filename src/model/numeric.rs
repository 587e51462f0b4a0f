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

//! Numeric type lattice and numeric values
//!
//! Every arithmetic operator, numeric function and numeric aggregate combines
//! its operands through [`NumericType::promote`], so mixing an integer with a
//! decimal always yields a decimal and mixing a decimal with a double always
//! yields a double, whichever vocabulary the function came from.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::term::{Literal, Term};
use super::vocab::xsd;
use crate::error::{EvaluationError, EvaluationResult};

/// Numeric category of a literal
///
/// Ordered `Integer < Decimal < Float < Double`. `NaN` is not a number: it
/// marks a literal whose datatype is not numeric at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumericType {
    /// Not a recognised numeric datatype
    NaN,
    /// xsd:integer and its derived types
    Integer,
    /// xsd:decimal
    Decimal,
    /// xsd:float
    Float,
    /// xsd:double
    Double,
}

impl NumericType {
    /// Classify a datatype IRI
    pub fn from_datatype(datatype: &str) -> Self {
        match datatype {
            xsd::DOUBLE => NumericType::Double,
            xsd::FLOAT => NumericType::Float,
            xsd::DECIMAL => NumericType::Decimal,
            dt if xsd::INTEGER_TYPES.contains(&dt) => NumericType::Integer,
            _ => NumericType::NaN,
        }
    }

    /// Classify a literal by its declared datatype
    pub fn classify(literal: &Literal) -> Self {
        literal
            .declared_datatype()
            .map_or(NumericType::NaN, |dt| Self::from_datatype(dt.as_str()))
    }

    /// Classify any term; non-literals are never numeric
    pub fn of_term(term: &Term) -> Self {
        term.as_literal().map_or(NumericType::NaN, Self::classify)
    }

    /// Result type of combining two operands
    pub fn promote(a: NumericType, b: NumericType) -> EvaluationResult<NumericType> {
        if a == NumericType::NaN || b == NumericType::NaN {
            return Err(EvaluationError::type_error(
                "two numeric operands",
                format!("{a} and {b}"),
            ));
        }
        Ok(a.max(b))
    }

    /// Whether this is a real numeric category
    pub fn is_numeric(self) -> bool {
        self != NumericType::NaN
    }

    /// Canonical datatype IRI of the category
    pub fn datatype(self) -> Option<&'static str> {
        match self {
            NumericType::NaN => None,
            NumericType::Integer => Some(xsd::INTEGER),
            NumericType::Decimal => Some(xsd::DECIMAL),
            NumericType::Float => Some(xsd::FLOAT),
            NumericType::Double => Some(xsd::DOUBLE),
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericType::NaN => "NaN",
            NumericType::Integer => "Integer",
            NumericType::Decimal => "Decimal",
            NumericType::Float => "Float",
            NumericType::Double => "Double",
        };
        f.write_str(name)
    }
}

/// A parsed numeric literal value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    /// Integer value
    Integer(i64),
    /// Exact decimal value
    Decimal(Decimal),
    /// Single precision value
    Float(f32),
    /// Double precision value
    Double(f64),
}

impl NumericValue {
    /// Parse a term as a number, naming `function` in the error if it is not one
    pub fn from_term(term: &Term, function: &str) -> EvaluationResult<Self> {
        let Some(literal) = term.as_literal() else {
            return Err(EvaluationError::not_numeric(function, term));
        };
        let lexical = literal.lexical().trim();
        let invalid = || EvaluationError::InvalidLexicalForm {
            lexical: literal.lexical().to_string(),
            datatype: literal.datatype().to_string(),
        };
        match NumericType::classify(literal) {
            NumericType::NaN => Err(EvaluationError::not_numeric(function, term)),
            NumericType::Integer => parse_integer(lexical).map(NumericValue::Integer).ok_or_else(invalid),
            NumericType::Decimal => parse_decimal(lexical).map(NumericValue::Decimal).ok_or_else(invalid),
            NumericType::Float => parse_floating(lexical)
                .map(|v| NumericValue::Float(v as f32))
                .ok_or_else(invalid),
            NumericType::Double => parse_floating(lexical).map(NumericValue::Double).ok_or_else(invalid),
        }
    }

    /// Numeric category of the value
    pub fn numeric_type(&self) -> NumericType {
        match self {
            NumericValue::Integer(_) => NumericType::Integer,
            NumericValue::Decimal(_) => NumericType::Decimal,
            NumericValue::Float(_) => NumericType::Float,
            NumericValue::Double(_) => NumericType::Double,
        }
    }

    /// Widen the value to `target`
    ///
    /// Only widening along the lattice is allowed; narrowing is a cast and
    /// lives with the cast functions.
    pub fn promote_to(self, target: NumericType) -> EvaluationResult<Self> {
        if target < self.numeric_type() || target == NumericType::NaN {
            return Err(EvaluationError::type_error(target.to_string(), self.numeric_type()));
        }
        Ok(match (self, target) {
            (value, t) if value.numeric_type() == t => value,
            (NumericValue::Integer(i), NumericType::Decimal) => NumericValue::Decimal(Decimal::from(i)),
            (value, NumericType::Float) => NumericValue::Float(value.as_f64() as f32),
            (value, _) => NumericValue::Double(value.as_f64()),
        })
    }

    /// Value as a double
    pub fn as_f64(&self) -> f64 {
        match self {
            NumericValue::Integer(i) => *i as f64,
            NumericValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            NumericValue::Float(f) => *f as f64,
            NumericValue::Double(d) => *d,
        }
    }

    /// Value as an exact decimal, if representable
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            NumericValue::Integer(i) => Some(Decimal::from(*i)),
            NumericValue::Decimal(d) => Some(*d),
            NumericValue::Float(f) => Decimal::from_f32(*f),
            NumericValue::Double(d) => Decimal::from_f64(*d),
        }
    }

    /// Literal term for the value
    pub fn into_term(self) -> Term {
        match self {
            NumericValue::Integer(i) => Term::integer(i),
            NumericValue::Decimal(d) => Term::decimal(d),
            NumericValue::Float(f) => Term::float(f),
            NumericValue::Double(d) => Term::double(d),
        }
    }

    /// Double value in the category of `self`, used by functions that compute in f64
    pub fn with_f64(self, value: f64) -> Self {
        match self {
            NumericValue::Float(_) => NumericValue::Float(value as f32),
            _ => NumericValue::Double(value),
        }
    }

    /// Effective boolean value: false for zero and NaN
    pub fn is_truthy(&self) -> bool {
        match self {
            NumericValue::Integer(i) => *i != 0,
            NumericValue::Decimal(d) => !d.is_zero(),
            NumericValue::Float(f) => *f != 0.0 && !f.is_nan(),
            NumericValue::Double(d) => *d != 0.0 && !d.is_nan(),
        }
    }

    fn coerce(lhs: Self, rhs: Self) -> EvaluationResult<(Self, Self)> {
        let target = NumericType::promote(lhs.numeric_type(), rhs.numeric_type())?;
        Ok((lhs.promote_to(target)?, rhs.promote_to(target)?))
    }

    /// Addition
    pub fn add(self, rhs: Self) -> EvaluationResult<Self> {
        Self::arithmetic(self, rhs, i64::checked_add, Decimal::checked_add, |a, b| a + b)
    }

    /// Subtraction
    pub fn sub(self, rhs: Self) -> EvaluationResult<Self> {
        Self::arithmetic(self, rhs, i64::checked_sub, Decimal::checked_sub, |a, b| a - b)
    }

    /// Multiplication
    pub fn mul(self, rhs: Self) -> EvaluationResult<Self> {
        Self::arithmetic(self, rhs, i64::checked_mul, Decimal::checked_mul, |a, b| a * b)
    }

    /// Division; dividing two integers yields a decimal
    pub fn div(self, rhs: Self) -> EvaluationResult<Self> {
        let (lhs, rhs) = Self::coerce(self, rhs)?;
        match (lhs, rhs) {
            (NumericValue::Integer(a), NumericValue::Integer(b)) => {
                decimal_div(Decimal::from(a), Decimal::from(b))
            }
            (NumericValue::Decimal(a), NumericValue::Decimal(b)) => decimal_div(a, b),
            (NumericValue::Float(a), NumericValue::Float(b)) => Ok(NumericValue::Float(a / b)),
            (lhs, rhs) => Ok(NumericValue::Double(lhs.as_f64() / rhs.as_f64())),
        }
    }

    fn arithmetic(
        lhs: Self,
        rhs: Self,
        int_op: fn(i64, i64) -> Option<i64>,
        dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
        float_op: fn(f64, f64) -> f64,
    ) -> EvaluationResult<Self> {
        let overflow = || EvaluationError::domain("arithmetic", "numeric overflow");
        match Self::coerce(lhs, rhs)? {
            (NumericValue::Integer(a), NumericValue::Integer(b)) => match int_op(a, b) {
                Some(v) => Ok(NumericValue::Integer(v)),
                // Integers are unbounded in XML Schema; continue exactly in decimal
                None => dec_op(Decimal::from(a), Decimal::from(b))
                    .map(NumericValue::Decimal)
                    .ok_or_else(overflow),
            },
            (NumericValue::Decimal(a), NumericValue::Decimal(b)) => {
                dec_op(a, b).map(NumericValue::Decimal).ok_or_else(overflow)
            }
            (NumericValue::Float(a), NumericValue::Float(b)) => {
                Ok(NumericValue::Float(float_op(a as f64, b as f64) as f32))
            }
            (a, b) => Ok(NumericValue::Double(float_op(a.as_f64(), b.as_f64()))),
        }
    }

    /// Numeric comparison after promotion; `None` when either side is NaN
    pub fn compare(self, rhs: Self) -> EvaluationResult<Option<Ordering>> {
        let (lhs, rhs) = Self::coerce(self, rhs)?;
        Ok(match (lhs, rhs) {
            (NumericValue::Integer(a), NumericValue::Integer(b)) => Some(a.cmp(&b)),
            (NumericValue::Decimal(a), NumericValue::Decimal(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        })
    }

    /// Negation
    pub fn neg(self) -> EvaluationResult<Self> {
        match self {
            NumericValue::Integer(i) => i
                .checked_neg()
                .map(NumericValue::Integer)
                .ok_or_else(|| EvaluationError::domain("-", "numeric overflow")),
            NumericValue::Decimal(d) => Ok(NumericValue::Decimal(-d)),
            NumericValue::Float(f) => Ok(NumericValue::Float(-f)),
            NumericValue::Double(d) => Ok(NumericValue::Double(-d)),
        }
    }

    /// Absolute value
    pub fn abs(self) -> EvaluationResult<Self> {
        match self {
            NumericValue::Integer(i) => i
                .checked_abs()
                .map(NumericValue::Integer)
                .ok_or_else(|| EvaluationError::domain("abs", "numeric overflow")),
            NumericValue::Decimal(d) => Ok(NumericValue::Decimal(d.abs())),
            NumericValue::Float(f) => Ok(NumericValue::Float(f.abs())),
            NumericValue::Double(d) => Ok(NumericValue::Double(d.abs())),
        }
    }

    /// Smallest integral value not less than the value
    pub fn ceil(self) -> Self {
        match self {
            NumericValue::Integer(_) => self,
            NumericValue::Decimal(d) => NumericValue::Decimal(d.ceil()),
            NumericValue::Float(f) => NumericValue::Float(f.ceil()),
            NumericValue::Double(d) => NumericValue::Double(d.ceil()),
        }
    }

    /// Largest integral value not greater than the value
    pub fn floor(self) -> Self {
        match self {
            NumericValue::Integer(_) => self,
            NumericValue::Decimal(d) => NumericValue::Decimal(d.floor()),
            NumericValue::Float(f) => NumericValue::Float(f.floor()),
            NumericValue::Double(d) => NumericValue::Double(d.floor()),
        }
    }

    /// Nearest integral value, halves rounded towards positive infinity
    pub fn round(self) -> Self {
        match self {
            NumericValue::Integer(_) => self,
            NumericValue::Decimal(d) => {
                NumericValue::Decimal(d.round_dp_with_strategy(0, RoundingStrategy::MidpointTowardZero).max(
                    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
                ))
            }
            NumericValue::Float(f) => {
                let r = f.round();
                NumericValue::Float(if f - r == 0.5 { r + 1.0 } else { r })
            }
            NumericValue::Double(d) => {
                let r = d.round();
                NumericValue::Double(if d - r == 0.5 { r + 1.0 } else { r })
            }
        }
    }

    /// Round to `precision` decimal places, halves rounded to even
    ///
    /// A negative precision rounds to a multiple of a power of ten.
    pub fn round_half_to_even(self, precision: i64) -> Self {
        match self {
            NumericValue::Integer(_) if precision >= 0 => self,
            NumericValue::Integer(i) => match round_decimal_half_to_even(Decimal::from(i), precision) {
                Some(rounded) => NumericValue::Integer(rounded.to_i64().unwrap_or(i)),
                None => self,
            },
            NumericValue::Decimal(d) => match round_decimal_half_to_even(d, precision) {
                Some(rounded) => NumericValue::Decimal(rounded),
                None => self,
            },
            other => match other.as_decimal().and_then(|d| round_decimal_half_to_even(d, precision)) {
                Some(rounded) => other.with_f64(rounded.to_f64().unwrap_or(other.as_f64())),
                // NaN, infinities and values beyond the decimal range stay as they are
                None => other,
            },
        }
    }
}

/// Largest scale a decimal can carry
const MAX_SCALE: u32 = 28;

fn round_decimal_half_to_even(value: Decimal, precision: i64) -> Option<Decimal> {
    if precision >= 0 {
        let scale = precision.min(i64::from(MAX_SCALE)) as u32;
        return Some(value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven));
    }
    let exponent = precision.unsigned_abs().min(u64::from(MAX_SCALE)) as u32;
    let factor = Decimal::from_i128_with_scale(10i128.pow(exponent), 0);
    value
        .checked_div(factor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .checked_mul(factor)
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Integer(i) => write!(f, "{i}"),
            NumericValue::Decimal(d) => write!(f, "{d}"),
            NumericValue::Float(v) => write!(f, "{v}"),
            NumericValue::Double(v) => write!(f, "{v}"),
        }
    }
}

fn decimal_div(a: Decimal, b: Decimal) -> EvaluationResult<NumericValue> {
    if b.is_zero() {
        return Err(EvaluationError::DivisionByZero);
    }
    a.checked_div(b)
        .map(NumericValue::Decimal)
        .ok_or_else(|| EvaluationError::domain("/", "numeric overflow"))
}

pub(crate) fn parse_integer(lexical: &str) -> Option<i64> {
    let digits = lexical.strip_prefix('+').unwrap_or(lexical);
    if digits.is_empty() || digits.contains('+') {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn parse_decimal(lexical: &str) -> Option<Decimal> {
    if lexical.is_empty()
        || !lexical
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    {
        return None;
    }
    let unsigned = lexical.strip_prefix('+').unwrap_or(lexical);
    Decimal::from_str(unsigned).ok()
}

pub(crate) fn parse_floating(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust also accepts "inf" and "infinity", XML Schema does not
        _ if lexical
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')) =>
        {
            lexical.parse().ok()
        }
        _ => None,
    }
}
