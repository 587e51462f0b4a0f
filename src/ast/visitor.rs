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

//! Visitor and rewriter traits for expression trees

use super::expression::{AggregateData, ExpressionNode, FunctionCallData};

/// Trait for visiting expression nodes
pub trait ExpressionVisitor: Sized {
    /// Visit an expression node
    fn visit_expression(&mut self, expr: &ExpressionNode) {
        walk_expression(self, expr)
    }

    /// Visit a function call
    fn visit_function_call(&mut self, call: &FunctionCallData) {
        for arg in &call.args {
            self.visit_expression(arg);
        }
    }

    /// Visit an aggregate adapter
    fn visit_aggregate(&mut self, aggregate: &AggregateData) {
        for arg in &aggregate.args {
            self.visit_expression(arg);
        }
    }
}

/// Default implementation of walking an expression tree
pub fn walk_expression<V: ExpressionVisitor>(visitor: &mut V, expr: &ExpressionNode) {
    match expr {
        ExpressionNode::FunctionCall(call) => visitor.visit_function_call(call),
        ExpressionNode::Aggregate(aggregate) => visitor.visit_aggregate(aggregate),
        other => {
            for arg in other.arguments() {
                visitor.visit_expression(arg);
            }
        }
    }
}

/// Rewrites one child node at a time for [`ExpressionNode::transform`]
///
/// Returning a clone of the input marks the child as unchanged.
pub trait ExpressionTransformer {
    /// Produce the replacement for `node`
    fn transform(&mut self, node: &ExpressionNode) -> ExpressionNode;
}

impl<F> ExpressionTransformer for F
where
    F: FnMut(&ExpressionNode) -> ExpressionNode,
{
    fn transform(&mut self, node: &ExpressionNode) -> ExpressionNode {
        self(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::function::{Aggregate, Function, SparqlFunction};

    #[derive(Default)]
    struct CallCounter {
        calls: usize,
        aggregates: usize,
    }

    impl ExpressionVisitor for CallCounter {
        fn visit_function_call(&mut self, call: &FunctionCallData) {
            self.calls += 1;
            for arg in &call.args {
                self.visit_expression(arg);
            }
        }

        fn visit_aggregate(&mut self, aggregate: &AggregateData) {
            self.aggregates += 1;
            for arg in &aggregate.args {
                self.visit_expression(arg);
            }
        }
    }

    #[test]
    fn test_walk_reaches_nested_calls() {
        let inner = ExpressionNode::function_call(
            Function::Sparql(SparqlFunction::Str),
            vec![ExpressionNode::variable("x")],
        );
        let expr = ExpressionNode::aggregate(
            Aggregate::Count,
            false,
            vec![ExpressionNode::function_call(
                Function::Sparql(SparqlFunction::StrLen),
                vec![inner],
            )],
        );

        let mut counter = CallCounter::default();
        counter.visit_expression(&expr);
        assert_eq!(counter.calls, 2);
        assert_eq!(counter.aggregates, 1);
    }
}
