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

//! Leviathan extension functions
//!
//! Most of the numeric functions work in double precision. `sq` and `cube`
//! keep the numeric type of their argument and `factorial` stays integral.

use md5::Md5;
use sha2::Sha256;

use super::CallArgs;
use crate::ast::{LeviathanFunction, Trigonometry};
use crate::error::{EvaluationError, EvaluationResult};
use crate::evaluator::helpers::{digest_hex, integer_arg, lexical_form};
use crate::model::Term;

pub(super) fn evaluate(function: LeviathanFunction, args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let value = match function {
        LeviathanFunction::Md5Hash => return hash::<Md5>(args),
        LeviathanFunction::Sha256Hash => return hash::<Sha256>(args),
        LeviathanFunction::Random => random(args)?,
        LeviathanFunction::Trigonometric(family, inverse) => trigonometric(family, inverse, args.double(0)?),
        LeviathanFunction::DegreesToRadians => args.double(0)?.to_radians(),
        LeviathanFunction::RadiansToDegrees => args.double(0)?.to_degrees(),
        LeviathanFunction::Log if args.len() > 1 => args.double(0)?.log(args.double(1)?),
        LeviathanFunction::Log => args.double(0)?.log10(),
        LeviathanFunction::Ln => args.double(0)?.ln(),
        LeviathanFunction::E => args.double(0)?.exp(),
        LeviathanFunction::Ten => 10f64.powf(args.double(0)?),
        LeviathanFunction::Power => args.double(0)?.powf(args.double(1)?),
        LeviathanFunction::Square => {
            let x = args.numeric(0)?;
            return Ok(x.mul(x)?.into_term());
        }
        LeviathanFunction::Cube => {
            let x = args.numeric(0)?;
            return Ok(x.mul(x)?.mul(x)?.into_term());
        }
        LeviathanFunction::SquareRoot => args.double(0)?.sqrt(),
        LeviathanFunction::Root => args.double(0)?.powf(1.0 / args.double(1)?),
        LeviathanFunction::Pythagoras => args.double(0)?.hypot(args.double(1)?),
        LeviathanFunction::Cartesian => cartesian(args)?,
        LeviathanFunction::Factorial => return factorial(args),
        LeviathanFunction::Reciprocal => {
            let x = args.double(0)?;
            if x == 0.0 {
                return Err(EvaluationError::domain(args.name(), "reciprocal of zero"));
            }
            1.0 / x
        }
    };
    Ok(Term::double(value))
}

fn hash<D: sha2::Digest>(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    Ok(Term::string(digest_hex::<D>(&lexical_form(&term, args.name())?)))
}

/// rnd(), rnd(max) and rnd(min, max)
fn random(args: &CallArgs<'_>) -> EvaluationResult<f64> {
    let (min, max) = match args.len() {
        0 => (0.0, 1.0),
        1 => (0.0, args.double(0)?),
        _ => (args.double(0)?, args.double(1)?),
    };
    if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() || min > max {
        return Err(EvaluationError::domain(
            args.name(),
            format!("cannot draw a random number between {min} and {max}"),
        ));
    }
    if min == max {
        return Ok(min);
    }
    Ok(rand::random_range(min..max))
}

fn trigonometric(family: Trigonometry, inverse: bool, x: f64) -> f64 {
    match (family, inverse) {
        (Trigonometry::Sine, false) => x.sin(),
        (Trigonometry::Cosine, false) => x.cos(),
        (Trigonometry::Tangent, false) => x.tan(),
        (Trigonometry::Secant, false) => 1.0 / x.cos(),
        (Trigonometry::Cosecant, false) => 1.0 / x.sin(),
        (Trigonometry::Cotangent, false) => 1.0 / x.tan(),
        (Trigonometry::Sine, true) => x.asin(),
        (Trigonometry::Cosine, true) => x.acos(),
        (Trigonometry::Tangent, true) => x.atan(),
        (Trigonometry::Secant, true) => (1.0 / x).acos(),
        (Trigonometry::Cosecant, true) => (1.0 / x).asin(),
        (Trigonometry::Cotangent, true) => (1.0 / x).atan(),
    }
}

/// Distance between (x1, y1) and (x2, y2), or (x1, y1, z1) and (x2, y2, z2)
fn cartesian(args: &CallArgs<'_>) -> EvaluationResult<f64> {
    let dimensions = match args.len() {
        4 => 2,
        6 => 3,
        n => {
            return Err(EvaluationError::domain(
                args.name(),
                format!("expected 4 or 6 coordinates, got {n}"),
            ));
        }
    };
    let mut sum = 0.0;
    for axis in 0..dimensions {
        let delta = args.double(axis + dimensions)? - args.double(axis)?;
        sum += delta * delta;
    }
    Ok(sum.sqrt())
}

fn factorial(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let n = integer_arg(&args.term(0)?, args.name())?;
    if n < 0 {
        return Err(EvaluationError::domain(args.name(), "factorial of a negative number"));
    }
    (2..=n)
        .try_fold(1i64, |acc, i| acc.checked_mul(i))
        .map(Term::integer)
        .ok_or_else(|| EvaluationError::domain(args.name(), format!("{n}! overflows xsd:integer")))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::call;
    use super::*;
    use crate::ast::Function;
    use crate::model::vocab::xsd;
    use crate::model::{Literal, NumericValue};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn leviathan(function: LeviathanFunction, args: Vec<Term>) -> EvaluationResult<Term> {
        call(Function::Leviathan(function), args)
    }

    fn as_double(term: &Term) -> f64 {
        NumericValue::from_term(term, "test").unwrap().as_f64()
    }

    #[rstest]
    #[case(LeviathanFunction::Trigonometric(Trigonometry::Sine, false), 0.0, 0.0)]
    #[case(LeviathanFunction::Trigonometric(Trigonometry::Secant, false), 0.0, 1.0)]
    #[case(LeviathanFunction::Trigonometric(Trigonometry::Cosine, true), 1.0, 0.0)]
    #[case(LeviathanFunction::Trigonometric(Trigonometry::Secant, true), 1.0, 0.0)]
    #[case(LeviathanFunction::Ten, 2.0, 100.0)]
    #[case(LeviathanFunction::Log, 1000.0, 3.0)]
    #[case(LeviathanFunction::SquareRoot, 16.0, 4.0)]
    #[case(LeviathanFunction::RadiansToDegrees, std::f64::consts::PI, 180.0)]
    fn test_unary_double_functions(
        #[case] function: LeviathanFunction,
        #[case] input: f64,
        #[case] expected: f64,
    ) {
        let result = leviathan(function, vec![Term::double(input)]).unwrap();
        assert!((as_double(&result) - expected).abs() < 1e-9, "{result}");
    }

    #[test]
    fn test_binary_functions() {
        let result = leviathan(LeviathanFunction::Log, vec![Term::integer(8), Term::integer(2)]).unwrap();
        assert!((as_double(&result) - 3.0).abs() < 1e-9);
        let result = leviathan(LeviathanFunction::Root, vec![Term::integer(27), Term::integer(3)]).unwrap();
        assert!((as_double(&result) - 3.0).abs() < 1e-9);
        assert_eq!(
            leviathan(LeviathanFunction::Pythagoras, vec![Term::integer(3), Term::integer(4)]),
            Ok(Term::double(5.0))
        );
    }

    #[test]
    fn test_square_and_cube_keep_type() {
        assert_eq!(leviathan(LeviathanFunction::Square, vec![Term::integer(-3)]), Ok(Term::integer(9)));
        let decimal = Term::typed("1.5", xsd::DECIMAL);
        assert_eq!(
            leviathan(LeviathanFunction::Cube, vec![decimal]),
            Ok(Term::decimal(Decimal::new(3375, 3)))
        );
    }

    #[test]
    fn test_cartesian() {
        let args = [0, 0, 3, 4].map(Term::integer).to_vec();
        assert_eq!(leviathan(LeviathanFunction::Cartesian, args), Ok(Term::double(5.0)));
        let args = [1, 1, 1, 3, 3, 2].map(Term::integer).to_vec();
        assert_eq!(leviathan(LeviathanFunction::Cartesian, args), Ok(Term::double(3.0)));
    }

    #[test]
    fn test_factorial() {
        assert_eq!(leviathan(LeviathanFunction::Factorial, vec![Term::integer(0)]), Ok(Term::integer(1)));
        assert_eq!(leviathan(LeviathanFunction::Factorial, vec![Term::integer(5)]), Ok(Term::integer(120)));
        assert!(leviathan(LeviathanFunction::Factorial, vec![Term::integer(-1)]).is_err());
        assert!(leviathan(LeviathanFunction::Factorial, vec![Term::integer(30)]).is_err());
    }

    #[test]
    fn test_reciprocal() {
        assert_eq!(leviathan(LeviathanFunction::Reciprocal, vec![Term::integer(4)]), Ok(Term::double(0.25)));
        assert!(matches!(
            leviathan(LeviathanFunction::Reciprocal, vec![Term::integer(0)]),
            Err(EvaluationError::DomainError { .. })
        ));
    }

    #[test]
    fn test_random_bounds() {
        for _ in 0..20 {
            let value = as_double(&leviathan(LeviathanFunction::Random, vec![]).unwrap());
            assert!((0.0..1.0).contains(&value));
            let args = vec![Term::integer(5), Term::integer(6)];
            let value = as_double(&leviathan(LeviathanFunction::Random, args).unwrap());
            assert!((5.0..6.0).contains(&value));
        }
        let args = vec![Term::integer(2), Term::integer(2)];
        assert_eq!(leviathan(LeviathanFunction::Random, args), Ok(Term::double(2.0)));
        let args = vec![Term::integer(3), Term::integer(1)];
        assert!(leviathan(LeviathanFunction::Random, args).is_err());
    }

    #[rstest]
    #[case(vec![Term::integer(0), Term::typed("INF", xsd::DOUBLE)])]
    #[case(vec![Term::typed("-INF", xsd::DOUBLE), Term::integer(0)])]
    #[case(vec![Term::typed("INF", xsd::DOUBLE)])]
    #[case(vec![Term::double(-f64::MAX), Term::double(f64::MAX)])]
    fn test_random_rejects_unbounded_ranges(#[case] args: Vec<Term>) {
        assert!(matches!(
            leviathan(LeviathanFunction::Random, args),
            Err(EvaluationError::DomainError { .. })
        ));
    }

    #[test]
    fn test_hashes() {
        assert_eq!(
            leviathan(LeviathanFunction::Md5Hash, vec![Term::string("abc")]),
            Ok(Term::string("900150983cd24fb0d6963f7d28e17f72"))
        );
        let tagged = Term::Literal(Literal::lang_tagged("abc", "en"));
        assert_eq!(
            leviathan(LeviathanFunction::Sha256Hash, vec![tagged]),
            Ok(Term::string(
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            ))
        );
    }
}
