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

//! Node evaluation entry point

use super::context::{BindingId, EvaluationContext};
use super::{functions, operators};
use crate::ast::ExpressionNode;
use crate::error::{EvaluationError, EvaluationResult};
use crate::model::Term;

impl ExpressionNode {
    /// Evaluate the node for one binding
    ///
    /// Aggregate nodes ask the context for the group `binding` stands for and
    /// fail with [`EvaluationError::AggregateOutsideGroup`] when there is none.
    pub fn evaluate(&self, ctx: &dyn EvaluationContext, binding: BindingId) -> EvaluationResult<Term> {
        match self {
            ExpressionNode::Constant(term) => Ok(term.clone()),
            ExpressionNode::Variable(name) => ctx
                .value(name, binding)
                .ok_or_else(|| EvaluationError::UnboundVariable { name: name.clone() }),
            ExpressionNode::Distinct => Err(EvaluationError::type_error(
                "an expression with a value",
                "DISTINCT",
            )),
            ExpressionNode::UnaryOp(data) => operators::evaluate_unary(data, ctx, binding),
            ExpressionNode::BinaryOp(data) => operators::evaluate_binary(data, ctx, binding),
            ExpressionNode::SetOp(data) => operators::evaluate_set(data, ctx, binding),
            ExpressionNode::FunctionCall(call) => functions::evaluate(call, ctx, binding),
            ExpressionNode::Aggregate(data) => {
                let members = ctx.group(binding).ok_or_else(|| EvaluationError::AggregateOutsideGroup {
                    aggregate: data.aggregate.functor().into_owned(),
                })?;
                data.apply(ctx, &members)
            }
            ExpressionNode::Exists(data) => {
                Ok(Term::boolean(ctx.exists(&data.pattern, binding)? != data.negated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Aggregate, GraphPatternRef};
    use crate::evaluator::SimpleEvaluationContext;

    #[test]
    fn test_primary_nodes() {
        let mut ctx = SimpleEvaluationContext::new();
        let row = ctx.push_row([("name", Term::string("Alice"))]);

        assert_eq!(
            ExpressionNode::variable("?name").evaluate(&ctx, row),
            Ok(Term::string("Alice"))
        );
        assert_eq!(
            ExpressionNode::variable("age").evaluate(&ctx, row),
            Err(EvaluationError::UnboundVariable {
                name: "age".to_string()
            })
        );
        assert!(ExpressionNode::Distinct.evaluate(&ctx, row).is_err());
    }

    #[test]
    fn test_aggregate_needs_group() {
        let mut ctx = SimpleEvaluationContext::new();
        let a = ctx.push_row([("x", Term::integer(2))]);
        let b = ctx.push_row([("x", Term::integer(5))]);
        let sum = ExpressionNode::aggregate(Aggregate::Sum, false, vec![ExpressionNode::variable("x")]);

        assert!(matches!(
            sum.evaluate(&ctx, a),
            Err(EvaluationError::AggregateOutsideGroup { .. })
        ));
        ctx.set_group(a, vec![a, b]);
        assert_eq!(sum.evaluate(&ctx, a), Ok(Term::integer(7)));
    }

    #[test]
    fn test_exists() {
        let mut ctx = SimpleEvaluationContext::new();
        let row = ctx.push_row(Vec::<(String, Term)>::new());
        let pattern = GraphPatternRef {
            id: 1,
            variables: vec!["s".to_string()],
        };
        ctx.set_exists(&pattern, row, true);

        let exists = ExpressionNode::exists(pattern.clone(), false);
        let not_exists = ExpressionNode::exists(pattern, true);
        assert_eq!(exists.evaluate(&ctx, row), Ok(Term::boolean(true)));
        assert_eq!(not_exists.evaluate(&ctx, row), Ok(Term::boolean(false)));
    }
}
