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

//! Core SPARQL built-ins
//!
//! Local names are matched case-insensitively. GROUP_CONCAT is the only entry
//! taking a named argument.

use once_cell::sync::Lazy;

use crate::ast::{Aggregate, ExpressionNode, Function, SparqlFunction};
use crate::error::{ResolutionError, ResolutionResult};
use crate::model::Iri;
use crate::model::vocab::SPARQL_FUNCTIONS;
use crate::registry::provider::{FunctionProvider, NamedArguments, Resolution};
use crate::registry::signature::{ArityShape, FunctionCategory, FunctionSignature, FunctionTable};

use ArityShape::{AtLeast, Exact, OneOf};

static TABLE: Lazy<FunctionTable> = Lazy::new(|| {
    let f = |name, arity, function| FunctionSignature::function(name, arity, Function::Sparql(function));
    let aggregate = FunctionSignature::aggregate;
    FunctionTable::new(
        SPARQL_FUNCTIONS,
        true,
        vec![
            f("abs", Exact(1), SparqlFunction::Abs),
            FunctionSignature::custom("bound", Exact(1), bound),
            f("ceil", Exact(1), SparqlFunction::Ceil),
            f("coalesce", AtLeast(1), SparqlFunction::Coalesce),
            f("concat", AtLeast(1), SparqlFunction::Concat),
            f("contains", Exact(2), SparqlFunction::Contains),
            f("datatype", Exact(1), SparqlFunction::Datatype),
            f("day", Exact(1), SparqlFunction::Day),
            f("encode_for_uri", Exact(1), SparqlFunction::EncodeForUri),
            f("floor", Exact(1), SparqlFunction::Floor),
            f("hours", Exact(1), SparqlFunction::Hours),
            f("if", Exact(3), SparqlFunction::If),
            f("iri", Exact(1), SparqlFunction::Iri),
            f("uri", Exact(1), SparqlFunction::Iri),
            f("isblank", Exact(1), SparqlFunction::IsBlank),
            f("isiri", Exact(1), SparqlFunction::IsIri),
            f("isuri", Exact(1), SparqlFunction::IsIri),
            f("isliteral", Exact(1), SparqlFunction::IsLiteral),
            f("isnumeric", Exact(1), SparqlFunction::IsNumeric),
            f("lang", Exact(1), SparqlFunction::Lang),
            f("langmatches", Exact(2), SparqlFunction::LangMatches),
            f("lcase", Exact(1), SparqlFunction::LCase),
            f("md5", Exact(1), SparqlFunction::Md5),
            f("minutes", Exact(1), SparqlFunction::Minutes),
            f("month", Exact(1), SparqlFunction::Month),
            f("now", Exact(0), SparqlFunction::Now),
            f("regex", OneOf(&[2, 3]), SparqlFunction::Regex),
            f("round", Exact(1), SparqlFunction::Round),
            f("sameterm", Exact(2), SparqlFunction::SameTerm),
            f("seconds", Exact(1), SparqlFunction::Seconds),
            f("sha1", Exact(1), SparqlFunction::Sha1),
            f("sha256", Exact(1), SparqlFunction::Sha256),
            f("sha384", Exact(1), SparqlFunction::Sha384),
            f("sha512", Exact(1), SparqlFunction::Sha512),
            f("str", Exact(1), SparqlFunction::Str),
            f("strdt", Exact(2), SparqlFunction::StrDt),
            f("strends", Exact(2), SparqlFunction::StrEnds),
            f("strlang", Exact(2), SparqlFunction::StrLang),
            f("strlen", Exact(1), SparqlFunction::StrLen),
            f("strstarts", Exact(2), SparqlFunction::StrStarts),
            f("substr", OneOf(&[2, 3]), SparqlFunction::Substr),
            f("timezone", Exact(1), SparqlFunction::Timezone),
            f("tz", Exact(1), SparqlFunction::Tz),
            f("ucase", Exact(1), SparqlFunction::UCase),
            f("year", Exact(1), SparqlFunction::Year),
            aggregate("avg", Exact(1), Aggregate::Avg),
            aggregate("count", Exact(1), Aggregate::Count),
            FunctionSignature::custom("group_concat", Exact(1), group_concat)
                .as_aggregate()
                .with_named(&[SEPARATOR]),
            aggregate("max", Exact(1), Aggregate::Max),
            aggregate("min", Exact(1), Aggregate::Min),
            aggregate("sample", Exact(1), Aggregate::Sample),
            aggregate("sum", Exact(1), Aggregate::Sum),
        ],
    )
});

const SEPARATOR: &str = "separator";

fn bound(args: &[ExpressionNode], _: &NamedArguments) -> ResolutionResult<ExpressionNode> {
    match args {
        [ExpressionNode::Variable(_)] => Ok(ExpressionNode::function_call(
            Function::Sparql(SparqlFunction::Bound),
            args.to_vec(),
        )),
        _ => Err(ResolutionError::invalid_argument("BOUND", "the argument must be a variable")),
    }
}

fn group_concat(args: &[ExpressionNode], named_args: &NamedArguments) -> ResolutionResult<ExpressionNode> {
    let mut args = args.to_vec();
    if let Some((_, separator)) = named_args
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(SEPARATOR))
    {
        args.push(separator.clone());
    }
    Ok(ExpressionNode::aggregate(Aggregate::GroupConcat, false, args))
}

/// Provider for the SPARQL built-in function namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlFunctionProvider;

impl FunctionProvider for SparqlFunctionProvider {
    fn namespace(&self) -> &str {
        SPARQL_FUNCTIONS
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
    use crate::model::Term;
    use pretty_assertions::assert_eq;

    fn resolve(local_name: &str, args: Vec<ExpressionNode>, named: &NamedArguments) -> Resolution {
        let uri = Iri::new(format!("{SPARQL_FUNCTIONS}{local_name}"));
        SparqlFunctionProvider.resolve(&uri, &args, named)
    }

    fn x() -> ExpressionNode {
        ExpressionNode::variable("x")
    }

    #[test]
    fn test_case_insensitive_names() {
        let expected = ExpressionNode::function_call(Function::Sparql(SparqlFunction::StrLen), vec![x()]);
        for name in ["strlen", "STRLEN", "StrLen"] {
            assert_eq!(
                resolve(name, vec![x()], &NamedArguments::new()),
                Resolution::Resolved(expected.clone())
            );
        }
    }

    #[test]
    fn test_bound_requires_variable() {
        let named = NamedArguments::new();
        assert!(matches!(resolve("bound", vec![x()], &named), Resolution::Resolved(_)));
        assert!(matches!(
            resolve("bound", vec![ExpressionNode::constant(Term::integer(1))], &named),
            Resolution::Failed(ResolutionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_group_concat_separator() {
        let separator = ExpressionNode::constant(Term::string(", "));
        let mut named = NamedArguments::new();
        named.insert("separator".to_string(), separator.clone());
        assert_eq!(
            resolve("group_concat", vec![x()], &named),
            Resolution::Resolved(ExpressionNode::aggregate(
                Aggregate::GroupConcat,
                false,
                vec![x(), separator.clone()]
            ))
        );

        // Only GROUP_CONCAT takes named arguments
        assert!(resolve("count", vec![x()], &named).is_declined());

        let mut named = NamedArguments::new();
        named.insert("limit".to_string(), separator.clone());
        assert!(resolve("group_concat", vec![x()], &named).is_declined());

        // The separator may be given once, whatever its case
        let mut named = NamedArguments::new();
        named.insert("separator".to_string(), separator.clone());
        named.insert("SEPARATOR".to_string(), separator);
        assert!(resolve("group_concat", vec![x()], &named).is_declined());
    }

    #[test]
    fn test_enumeration() {
        let functions: Vec<String> = SparqlFunctionProvider.available_functions().collect();
        assert!(functions.contains(&format!("{SPARQL_FUNCTIONS}encode_for_uri")));
        assert!(!functions.contains(&format!("{SPARQL_FUNCTIONS}sum")));

        let aggregates: Vec<String> = SparqlFunctionProvider.available_aggregates().collect();
        assert_eq!(aggregates.len(), 7);
        assert!(aggregates.contains(&format!("{SPARQL_FUNCTIONS}group_concat")));
    }
}
