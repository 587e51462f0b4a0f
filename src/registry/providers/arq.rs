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

//! Jena ARQ function library

use once_cell::sync::Lazy;

use crate::ast::{ArqFunction, ExpressionNode, Function};
use crate::model::Iri;
use crate::model::vocab::ARQ_FUNCTIONS;
use crate::registry::provider::{FunctionProvider, NamedArguments, Resolution};
use crate::registry::signature::{ArityShape, FunctionCategory, FunctionSignature, FunctionTable};

use ArityShape::{AtLeast, Exact, OneOf};

static TABLE: Lazy<FunctionTable> = Lazy::new(|| {
    let f = |name, arity, function| FunctionSignature::function(name, arity, Function::Arq(function));
    FunctionTable::new(
        ARQ_FUNCTIONS,
        false,
        vec![
            f("bnode", Exact(1), ArqFunction::BNode),
            f("e", Exact(0), ArqFunction::E),
            f("localname", Exact(1), ArqFunction::LocalName),
            f("namespace", Exact(1), ArqFunction::Namespace),
            f("max", Exact(2), ArqFunction::Max),
            f("min", Exact(2), ArqFunction::Min),
            f("now", Exact(0), ArqFunction::Now),
            f("pi", Exact(0), ArqFunction::Pi),
            f("sha1sum", Exact(1), ArqFunction::Sha1Sum),
            f("substr", OneOf(&[2, 3]), ArqFunction::Substring),
            f("substring", OneOf(&[2, 3]), ArqFunction::Substring),
            f("strjoin", AtLeast(2), ArqFunction::StrJoin),
        ],
    )
});

/// Provider for the ARQ function namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct ArqFunctionProvider;

impl FunctionProvider for ArqFunctionProvider {
    fn namespace(&self) -> &str {
        ARQ_FUNCTIONS
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

    fn resolve(local_name: &str, args: Vec<ExpressionNode>) -> Resolution {
        let uri = Iri::new(format!("{ARQ_FUNCTIONS}{local_name}"));
        ArqFunctionProvider.resolve(&uri, &args, &NamedArguments::new())
    }

    #[test]
    fn test_bnode_arity() {
        assert!(matches!(
            resolve("bnode", vec![]),
            Resolution::Failed(ResolutionError::UnsupportedArity { .. })
        ));
        assert!(matches!(
            resolve("bnode", vec![ExpressionNode::variable("b")]),
            Resolution::Resolved(_)
        ));
    }

    #[test]
    fn test_substr_aliases() {
        let args = vec![ExpressionNode::variable("s"), ExpressionNode::variable("i")];
        assert_eq!(resolve("substr", args.clone()), resolve("substring", args));
    }

    #[test]
    fn test_no_aggregates() {
        assert_eq!(ArqFunctionProvider.available_aggregates().count(), 0);
        assert_eq!(ArqFunctionProvider.available_functions().count(), 12);
    }
}
