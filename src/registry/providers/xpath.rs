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

//! XPath functions and operators

use once_cell::sync::Lazy;

use crate::ast::{Aggregate, ExpressionNode, Function, SparqlFunction, UnaryOperator, XPathFunction};
use crate::error::{ResolutionError, ResolutionResult};
use crate::model::vocab::XPATH_FUNCTIONS;
use crate::model::{Iri, Term};
use crate::registry::provider::{FunctionProvider, NamedArguments, Resolution};
use crate::registry::signature::{ArityShape, FunctionCategory, FunctionSignature, FunctionTable};

use ArityShape::{AtLeast, Exact, OneOf};

static TABLE: Lazy<FunctionTable> = Lazy::new(|| {
    let f = |name, arity, function| FunctionSignature::function(name, arity, Function::XPath(function));
    FunctionTable::new(
        XPATH_FUNCTIONS,
        false,
        vec![
            FunctionSignature::custom("not", Exact(1), not),
            f("boolean", Exact(1), XPathFunction::Boolean),
            FunctionSignature::custom("true", Exact(0), |_, _| Ok(ExpressionNode::constant(Term::boolean(true)))),
            FunctionSignature::custom("false", Exact(0), |_, _| Ok(ExpressionNode::constant(Term::boolean(false)))),
            FunctionSignature::function("matches", OneOf(&[2, 3]), Function::Sparql(SparqlFunction::Regex)),
            f("contains", Exact(2), XPathFunction::Contains),
            f("starts-with", Exact(2), XPathFunction::StartsWith),
            f("ends-with", Exact(2), XPathFunction::EndsWith),
            f("string-length", Exact(1), XPathFunction::StringLength),
            f("concat", AtLeast(2), XPathFunction::Concat),
            f("substring", OneOf(&[2, 3]), XPathFunction::Substring),
            f("substring-after", Exact(2), XPathFunction::SubstringAfter),
            f("substring-before", Exact(2), XPathFunction::SubstringBefore),
            f("normalize-space", Exact(1), XPathFunction::NormalizeSpace),
            f("normalize-unicode", OneOf(&[1, 2]), XPathFunction::NormalizeUnicode),
            f("upper-case", Exact(1), XPathFunction::UpperCase),
            f("lower-case", Exact(1), XPathFunction::LowerCase),
            f("encode-for-uri", Exact(1), XPathFunction::EncodeForUri),
            f("replace", OneOf(&[3, 4]), XPathFunction::Replace),
            f("escape-html-uri", Exact(1), XPathFunction::EscapeHtmlUri),
            f("compare", Exact(2), XPathFunction::Compare),
            f("abs", Exact(1), XPathFunction::Abs),
            f("ceiling", Exact(1), XPathFunction::Ceiling),
            f("floor", Exact(1), XPathFunction::Floor),
            f("round", Exact(1), XPathFunction::Round),
            f("round-half-to-even", OneOf(&[1, 2]), XPathFunction::RoundHalfToEven),
            f("year-from-dateTime", Exact(1), XPathFunction::YearFromDateTime),
            f("month-from-dateTime", Exact(1), XPathFunction::MonthFromDateTime),
            f("day-from-dateTime", Exact(1), XPathFunction::DayFromDateTime),
            f("hours-from-dateTime", Exact(1), XPathFunction::HoursFromDateTime),
            f("minutes-from-dateTime", Exact(1), XPathFunction::MinutesFromDateTime),
            f("seconds-from-dateTime", Exact(1), XPathFunction::SecondsFromDateTime),
            f("timezone-from-dateTime", Exact(1), XPathFunction::TimezoneFromDateTime),
            FunctionSignature::aggregate("string-join", OneOf(&[1, 2]), Aggregate::StringJoin),
            FunctionSignature::unsupported("adjust-dateTime-to-timezone"),
            FunctionSignature::unsupported("translate"),
        ],
    )
});

fn not(args: &[ExpressionNode], _: &NamedArguments) -> ResolutionResult<ExpressionNode> {
    match args {
        [operand] => Ok(ExpressionNode::unary_op(UnaryOperator::Not, operand.clone())),
        _ => Err(ResolutionError::arity("not", Exact(1), args.len())),
    }
}

/// Provider for the XPath functions namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct XPathFunctionProvider;

impl FunctionProvider for XPathFunctionProvider {
    fn namespace(&self) -> &str {
        XPATH_FUNCTIONS
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
    use pretty_assertions::assert_eq;

    fn resolve(local_name: &str, args: Vec<ExpressionNode>) -> Resolution {
        let uri = Iri::new(format!("{XPATH_FUNCTIONS}{local_name}"));
        XPathFunctionProvider.resolve(&uri, &args, &NamedArguments::new())
    }

    fn x() -> ExpressionNode {
        ExpressionNode::variable("x")
    }

    #[test]
    fn test_operator_and_constant_nodes() {
        assert_eq!(
            resolve("not", vec![x()]),
            Resolution::Resolved(ExpressionNode::unary_op(UnaryOperator::Not, x()))
        );
        assert_eq!(
            resolve("true", vec![]),
            Resolution::Resolved(ExpressionNode::constant(Term::boolean(true)))
        );
        assert_eq!(
            resolve("matches", vec![x(), x()]),
            Resolution::Resolved(ExpressionNode::function_call(
                Function::Sparql(SparqlFunction::Regex),
                vec![x(), x()]
            ))
        );
    }

    #[test]
    fn test_exact_case_names() {
        assert!(matches!(resolve("year-from-dateTime", vec![x()]), Resolution::Resolved(_)));
        assert!(resolve("year-from-datetime", vec![x()]).is_declined());
        assert!(resolve("UPPER-CASE", vec![x()]).is_declined());
    }

    #[test]
    fn test_unsupported_before_arity() {
        assert!(matches!(
            resolve("translate", vec![x(), x(), x()]),
            Resolution::Failed(ResolutionError::UnsupportedFunction { .. })
        ));
        assert!(matches!(
            resolve("translate", vec![]),
            Resolution::Failed(ResolutionError::UnsupportedFunction { .. })
        ));
        let functions: Vec<String> = XPathFunctionProvider.available_functions().collect();
        assert!(!functions.contains(&format!("{XPATH_FUNCTIONS}translate")));
    }

    #[test]
    fn test_concat_needs_two() {
        assert!(matches!(
            resolve("concat", vec![x()]),
            Resolution::Failed(ResolutionError::UnsupportedArity { .. })
        ));
    }
}
