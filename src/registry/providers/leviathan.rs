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

//! Leviathan extension functions and aggregates

use once_cell::sync::Lazy;

use crate::ast::{Aggregate, ExpressionNode, Function, LeviathanFunction, Trigonometry};
use crate::error::ResolutionResult;
use crate::model::Iri;
use crate::model::vocab::LEVIATHAN_FUNCTIONS;
use crate::registry::provider::{FunctionProvider, NamedArguments, Resolution};
use crate::registry::signature::{ArityShape, FunctionCategory, FunctionSignature, FunctionTable};

use ArityShape::{Exact, OneOf};

static TABLE: Lazy<FunctionTable> = Lazy::new(|| {
    let f = |name, arity, function| FunctionSignature::function(name, arity, Function::Leviathan(function));
    let trig = |name, family, inverse| f(name, Exact(1), LeviathanFunction::Trigonometric(family, inverse));
    FunctionTable::new(
        LEVIATHAN_FUNCTIONS,
        false,
        vec![
            f("md5hash", Exact(1), LeviathanFunction::Md5Hash),
            f("sha256hash", Exact(1), LeviathanFunction::Sha256Hash),
            f("rnd", OneOf(&[0, 1, 2]), LeviathanFunction::Random),
            trig("sin", Trigonometry::Sine, false),
            trig("cos", Trigonometry::Cosine, false),
            trig("tan", Trigonometry::Tangent, false),
            trig("sec", Trigonometry::Secant, false),
            trig("cosec", Trigonometry::Cosecant, false),
            trig("cotan", Trigonometry::Cotangent, false),
            trig("sin-1", Trigonometry::Sine, true),
            trig("cos-1", Trigonometry::Cosine, true),
            trig("tan-1", Trigonometry::Tangent, true),
            trig("sec-1", Trigonometry::Secant, true),
            trig("cosec-1", Trigonometry::Cosecant, true),
            trig("cotan-1", Trigonometry::Cotangent, true),
            f("degrees-to-radians", Exact(1), LeviathanFunction::DegreesToRadians),
            f("radians-to-degrees", Exact(1), LeviathanFunction::RadiansToDegrees),
            f("log", OneOf(&[1, 2]), LeviathanFunction::Log),
            f("ln", Exact(1), LeviathanFunction::Ln),
            f("e", Exact(1), LeviathanFunction::E),
            f("ten", Exact(1), LeviathanFunction::Ten),
            FunctionSignature::custom("pow", OneOf(&[1, 2]), pow),
            f("sq", Exact(1), LeviathanFunction::Square),
            f("cube", Exact(1), LeviathanFunction::Cube),
            f("sqrt", Exact(1), LeviathanFunction::SquareRoot),
            FunctionSignature::custom("root", OneOf(&[1, 2]), root),
            f("pythagoras", Exact(2), LeviathanFunction::Pythagoras),
            f("cartesian", OneOf(&[4, 6]), LeviathanFunction::Cartesian),
            f("factorial", Exact(1), LeviathanFunction::Factorial),
            f("reciprocal", Exact(1), LeviathanFunction::Reciprocal),
            FunctionSignature::distinct_aggregate("all", Aggregate::All),
            FunctionSignature::distinct_aggregate("any", Aggregate::Any),
            FunctionSignature::distinct_aggregate("none", Aggregate::None),
            FunctionSignature::distinct_aggregate("nmax", Aggregate::NumericMax),
            FunctionSignature::distinct_aggregate("nmin", Aggregate::NumericMin),
            FunctionSignature::distinct_aggregate("mode", Aggregate::Mode),
            FunctionSignature::distinct_aggregate("median", Aggregate::Median),
        ],
    )
});

/// One argument squares, two raise to a power
fn pow(args: &[ExpressionNode], _: &NamedArguments) -> ResolutionResult<ExpressionNode> {
    let function = if args.len() == 1 {
        LeviathanFunction::Square
    } else {
        LeviathanFunction::Power
    };
    Ok(ExpressionNode::function_call(Function::Leviathan(function), args.to_vec()))
}

/// One argument is a square root, two an arbitrary root
fn root(args: &[ExpressionNode], _: &NamedArguments) -> ResolutionResult<ExpressionNode> {
    let function = if args.len() == 1 {
        LeviathanFunction::SquareRoot
    } else {
        LeviathanFunction::Root
    };
    Ok(ExpressionNode::function_call(Function::Leviathan(function), args.to_vec()))
}

/// Provider for the Leviathan function namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct LeviathanFunctionProvider;

impl FunctionProvider for LeviathanFunctionProvider {
    fn namespace(&self) -> &str {
        LEVIATHAN_FUNCTIONS
    }

    fn resolve(&self, uri: &Iri, args: &[ExpressionNode], named_args: &NamedArguments) -> Resolution {
        TABLE.dispatch(uri, args, named_args)
    }

    fn available_functions(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(TABLE.uris(FunctionCategory::Scalar))
    }

    fn available_aggregates(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(TABLE.uris(FunctionCategory::Aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn resolve(local_name: &str, args: Vec<ExpressionNode>) -> Resolution {
        let uri = Iri::new(format!("{LEVIATHAN_FUNCTIONS}{local_name}"));
        LeviathanFunctionProvider.resolve(&uri, &args, &NamedArguments::new())
    }

    fn var(name: &str) -> ExpressionNode {
        ExpressionNode::variable(name)
    }

    fn call(function: LeviathanFunction, args: Vec<ExpressionNode>) -> Resolution {
        Resolution::Resolved(ExpressionNode::function_call(Function::Leviathan(function), args))
    }

    #[test]
    fn test_pow_and_root_shapes() {
        assert_eq!(
            resolve("pow", vec![var("a"), var("b")]),
            call(LeviathanFunction::Power, vec![var("a"), var("b")])
        );
        assert_eq!(resolve("pow", vec![var("a")]), call(LeviathanFunction::Square, vec![var("a")]));
        assert_eq!(resolve("root", vec![var("a")]), call(LeviathanFunction::SquareRoot, vec![var("a")]));
        assert!(matches!(
            resolve("pow", vec![]),
            Resolution::Failed(ResolutionError::UnsupportedArity { .. })
        ));
    }

    #[rstest]
    #[case("sin", Trigonometry::Sine, false)]
    #[case("cotan", Trigonometry::Cotangent, false)]
    #[case("sec-1", Trigonometry::Secant, true)]
    #[case("cosec-1", Trigonometry::Cosecant, true)]
    fn test_trigonometry(#[case] name: &str, #[case] family: Trigonometry, #[case] inverse: bool) {
        assert_eq!(
            resolve(name, vec![var("x")]),
            call(LeviathanFunction::Trigonometric(family, inverse), vec![var("x")])
        );
    }

    #[test]
    fn test_aggregates_with_distinct() {
        assert_eq!(
            resolve("median", vec![ExpressionNode::Distinct, var("x")]),
            Resolution::Resolved(ExpressionNode::aggregate(Aggregate::Median, true, vec![var("x")]))
        );
        assert_eq!(
            resolve("nmax", vec![var("x")]),
            Resolution::Resolved(ExpressionNode::aggregate(Aggregate::NumericMax, false, vec![var("x")]))
        );
        assert!(matches!(
            resolve("mode", vec![var("x"), var("y")]),
            Resolution::Failed(ResolutionError::UnsupportedArity { .. })
        ));
    }

    #[test]
    fn test_cartesian_dimensions() {
        let args = |n: usize| (0..n).map(|i| var(&format!("v{i}"))).collect::<Vec<_>>();
        assert!(matches!(resolve("cartesian", args(4)), Resolution::Resolved(_)));
        assert!(matches!(resolve("cartesian", args(6)), Resolution::Resolved(_)));
        assert!(matches!(
            resolve("cartesian", args(5)),
            Resolution::Failed(ResolutionError::UnsupportedArity { .. })
        ));
    }
}
