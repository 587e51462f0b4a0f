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

//! Operator evaluation

use std::cmp::Ordering;

use super::context::{BindingId, EvaluationContext};
use super::helpers::{compare_terms, effective_boolean_value, terms_equal};
use crate::ast::{BinaryOpData, BinaryOperator, SetOpData, UnaryOpData, UnaryOperator};
use crate::error::EvaluationResult;
use crate::model::{NumericValue, Term};

pub(super) fn evaluate_unary(
    data: &UnaryOpData,
    ctx: &dyn EvaluationContext,
    binding: BindingId,
) -> EvaluationResult<Term> {
    let operand = data.operand.evaluate(ctx, binding)?;
    match data.op {
        UnaryOperator::Not => Ok(Term::boolean(!effective_boolean_value(&operand)?)),
        UnaryOperator::Negate => Ok(NumericValue::from_term(&operand, "-")?.neg()?.into_term()),
        UnaryOperator::Plus => Ok(NumericValue::from_term(&operand, "+")?.into_term()),
    }
}

pub(super) fn evaluate_binary(
    data: &BinaryOpData,
    ctx: &dyn EvaluationContext,
    binding: BindingId,
) -> EvaluationResult<Term> {
    let [left, right] = &data.operands;
    let op = data.op;

    // An error on one side of || and && is forgiven when the other side decides
    if op.is_logical() {
        let decisive = op == BinaryOperator::Or;
        let lhs = left
            .evaluate(ctx, binding)
            .and_then(|t| effective_boolean_value(&t));
        if lhs == Ok(decisive) {
            return Ok(Term::boolean(decisive));
        }
        let rhs = right
            .evaluate(ctx, binding)
            .and_then(|t| effective_boolean_value(&t));
        return match (lhs, rhs) {
            (_, Ok(value)) if value == decisive => Ok(Term::boolean(decisive)),
            (Err(e), _) | (_, Err(e)) => Err(e),
            _ => Ok(Term::boolean(!decisive)),
        };
    }

    let lhs = left.evaluate(ctx, binding)?;
    let rhs = right.evaluate(ctx, binding)?;
    if op.is_comparison() {
        let result = match op {
            BinaryOperator::Equal => terms_equal(&lhs, &rhs)?,
            BinaryOperator::NotEqual => !terms_equal(&lhs, &rhs)?,
            _ => match compare_terms(&lhs, &rhs)? {
                // NaN is unordered
                None => false,
                Some(ordering) => match op {
                    BinaryOperator::LessThan => ordering == Ordering::Less,
                    BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                    BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                },
            },
        };
        return Ok(Term::boolean(result));
    }

    let symbol = op.symbol();
    let a = NumericValue::from_term(&lhs, symbol)?;
    let b = NumericValue::from_term(&rhs, symbol)?;
    let value = match op {
        BinaryOperator::Add => a.add(b)?,
        BinaryOperator::Subtract => a.sub(b)?,
        BinaryOperator::Multiply => a.mul(b)?,
        _ => a.div(b)?,
    };
    Ok(value.into_term())
}

pub(super) fn evaluate_set(
    data: &SetOpData,
    ctx: &dyn EvaluationContext,
    binding: BindingId,
) -> EvaluationResult<Term> {
    let Some((expr, candidates)) = data.args.split_first() else {
        return Ok(Term::boolean(data.negated));
    };
    let value = expr.evaluate(ctx, binding)?;
    let mut error = None;
    for candidate in candidates {
        match candidate
            .evaluate(ctx, binding)
            .and_then(|c| terms_equal(&value, &c))
        {
            Ok(true) => return Ok(Term::boolean(!data.negated)),
            Ok(false) => {}
            Err(e) => error = Some(e),
        }
    }
    match error {
        Some(e) => Err(e),
        None => Ok(Term::boolean(data.negated)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExpressionNode;
    use crate::error::EvaluationError;
    use crate::evaluator::SimpleEvaluationContext;
    use crate::model::vocab::xsd;
    use rust_decimal::Decimal;

    fn constant(term: Term) -> ExpressionNode {
        ExpressionNode::constant(term)
    }

    fn eval(expr: &ExpressionNode) -> EvaluationResult<Term> {
        let mut ctx = SimpleEvaluationContext::new();
        let row = ctx.push_row([("x", Term::integer(3))]);
        expr.evaluate(&ctx, row)
    }

    #[test]
    fn test_arithmetic() {
        let expr = ExpressionNode::binary_op(
            BinaryOperator::Add,
            ExpressionNode::variable("x"),
            constant(Term::typed("0.5", xsd::DECIMAL)),
        );
        assert_eq!(eval(&expr), Ok(Term::decimal(Decimal::new(35, 1))));

        let expr = ExpressionNode::binary_op(
            BinaryOperator::Divide,
            ExpressionNode::variable("x"),
            constant(Term::integer(0)),
        );
        assert_eq!(eval(&expr), Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn test_logical_error_forgiveness() {
        let unbound = ExpressionNode::variable("missing");
        let truth = constant(Term::boolean(true));
        let falsity = constant(Term::boolean(false));

        let or = ExpressionNode::binary_op(BinaryOperator::Or, unbound.clone(), truth.clone());
        assert_eq!(eval(&or), Ok(Term::boolean(true)));

        let and = ExpressionNode::binary_op(BinaryOperator::And, unbound.clone(), falsity);
        assert_eq!(eval(&and), Ok(Term::boolean(false)));

        let and = ExpressionNode::binary_op(BinaryOperator::And, unbound, truth);
        assert!(matches!(eval(&and), Err(EvaluationError::UnboundVariable { .. })));
    }

    #[test]
    fn test_comparison() {
        let expr = ExpressionNode::binary_op(
            BinaryOperator::LessThanOrEqual,
            ExpressionNode::variable("x"),
            constant(Term::double(3.0)),
        );
        assert_eq!(eval(&expr), Ok(Term::boolean(true)));

        let expr = ExpressionNode::binary_op(
            BinaryOperator::GreaterThan,
            constant(Term::double(f64::NAN)),
            constant(Term::integer(1)),
        );
        assert_eq!(eval(&expr), Ok(Term::boolean(false)));
    }

    #[test]
    fn test_unary() {
        let expr = ExpressionNode::unary_op(UnaryOperator::Negate, ExpressionNode::variable("x"));
        assert_eq!(eval(&expr), Ok(Term::integer(-3)));
        let expr = ExpressionNode::unary_op(UnaryOperator::Not, constant(Term::string("")));
        assert_eq!(eval(&expr), Ok(Term::boolean(true)));
        let expr = ExpressionNode::unary_op(UnaryOperator::Plus, constant(Term::string("1")));
        assert!(matches!(eval(&expr), Err(EvaluationError::NotNumeric { .. })));
    }

    #[test]
    fn test_in() {
        let expr = ExpressionNode::set_op(
            false,
            ExpressionNode::variable("x"),
            vec![constant(Term::string("a")), constant(Term::typed("3.0", xsd::DOUBLE))],
        );
        assert_eq!(eval(&expr), Ok(Term::boolean(true)));

        let expr = ExpressionNode::set_op(
            true,
            ExpressionNode::variable("x"),
            vec![ExpressionNode::variable("missing")],
        );
        assert!(eval(&expr).is_err());

        let expr = ExpressionNode::set_op(true, ExpressionNode::variable("x"), vec![]);
        assert_eq!(eval(&expr), Ok(Term::boolean(true)));
    }
}
