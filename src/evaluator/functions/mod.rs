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

//! Function evaluation, one module per vocabulary

mod arq;
mod cast;
mod leviathan;
mod sparql;
mod xpath;

use std::borrow::Cow;

use super::context::{BindingId, EvaluationContext};
use crate::ast::{ExpressionNode, Function, FunctionCallData};
use crate::error::{EvaluationError, EvaluationResult};
use crate::model::{NumericValue, Term};

pub(super) fn evaluate(
    call: &FunctionCallData,
    ctx: &dyn EvaluationContext,
    binding: BindingId,
) -> EvaluationResult<Term> {
    let args = CallArgs {
        name: short_name(&call.function),
        nodes: &call.args,
        ctx,
        binding,
    };
    match &call.function {
        Function::Sparql(f) => sparql::evaluate(*f, &args),
        Function::XPath(f) => xpath::evaluate(*f, &args),
        Function::Arq(f) => arq::evaluate(*f, &args),
        Function::Leviathan(f) => leviathan::evaluate(*f, &args),
        Function::Cast(target) => cast::evaluate(*target, &args.term(0)?),
        Function::Unknown(iri) => Err(EvaluationError::UnknownFunction {
            uri: iri.as_str().to_string(),
        }),
    }
}

/// Name used in error messages
fn short_name(function: &Function) -> Cow<'static, str> {
    match function {
        Function::Sparql(f) => Cow::Borrowed(f.keyword()),
        Function::XPath(f) => Cow::Borrowed(f.local_name()),
        Function::Arq(f) => Cow::Borrowed(f.local_name()),
        Function::Leviathan(f) => f.local_name(),
        Function::Cast(target) => Cow::Borrowed(target.datatype()),
        Function::Unknown(_) => function.functor(),
    }
}

/// Argument access for one function call
///
/// Arguments are evaluated on demand so functions such as IF, COALESCE and
/// BOUND decide which ones run.
pub(super) struct CallArgs<'a> {
    name: Cow<'static, str>,
    nodes: &'a [ExpressionNode],
    ctx: &'a dyn EvaluationContext,
    binding: BindingId,
}

impl<'a> CallArgs<'a> {
    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn ctx(&self) -> &'a dyn EvaluationContext {
        self.ctx
    }

    pub(super) fn binding(&self) -> BindingId {
        self.binding
    }

    pub(super) fn node(&self, index: usize) -> EvaluationResult<&'a ExpressionNode> {
        self.nodes.get(index).ok_or_else(|| {
            EvaluationError::domain(self.name.as_ref(), format!("missing argument {}", index + 1))
        })
    }

    pub(super) fn term(&self, index: usize) -> EvaluationResult<Term> {
        self.node(index)?.evaluate(self.ctx, self.binding)
    }

    pub(super) fn optional(&self, index: usize) -> EvaluationResult<Option<Term>> {
        match self.nodes.get(index) {
            Some(node) => node.evaluate(self.ctx, self.binding).map(Some),
            None => Ok(None),
        }
    }

    pub(super) fn terms(&self) -> EvaluationResult<Vec<Term>> {
        self.nodes
            .iter()
            .map(|node| node.evaluate(self.ctx, self.binding))
            .collect()
    }

    pub(super) fn numeric(&self, index: usize) -> EvaluationResult<NumericValue> {
        NumericValue::from_term(&self.term(index)?, &self.name)
    }

    pub(super) fn double(&self, index: usize) -> EvaluationResult<f64> {
        Ok(self.numeric(index)?.as_f64())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ast::{ExpressionNode, Function};
    use crate::error::EvaluationResult;
    use crate::evaluator::SimpleEvaluationContext;
    use crate::model::Term;

    /// Evaluate `function` over constant arguments in an empty row
    pub(crate) fn call(function: Function, args: Vec<Term>) -> EvaluationResult<Term> {
        let mut ctx = SimpleEvaluationContext::new();
        let row = ctx.push_row(Vec::<(String, Term)>::new());
        let args = args.into_iter().map(ExpressionNode::constant).collect();
        ExpressionNode::function_call(function, args).evaluate(&ctx, row)
    }
}
