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

//! Expression node definitions
//!
//! Nodes are immutable. Composite variants keep their payload behind an
//! [`Arc`] so cloning a node, or rewriting one branch of a tree, shares every
//! untouched subtree.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::function::{Aggregate, Function};
use super::operator::{BinaryOperator, UnaryOperator};
use super::visitor::{ExpressionTransformer, ExpressionVisitor, walk_expression};
use crate::model::Term;

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// Constant term
    Constant(Term),
    /// Variable reference, name without the leading '?'
    Variable(String),
    /// DISTINCT modifier passed as the first argument of an aggregate
    Distinct,
    /// Unary operator application
    UnaryOp(Arc<UnaryOpData>),
    /// Binary operator application
    BinaryOp(Arc<BinaryOpData>),
    /// Function call with any number of arguments
    FunctionCall(Arc<FunctionCallData>),
    /// Aggregate wrapped as an expression
    Aggregate(Arc<AggregateData>),
    /// IN / NOT IN
    SetOp(Arc<SetOpData>),
    /// EXISTS / NOT EXISTS
    Exists(Arc<ExistsData>),
}

/// Structural category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    /// Constant, variable or DISTINCT marker
    Primary,
    /// Unary operator
    UnaryOperator,
    /// Binary operator
    BinaryOperator,
    /// Function call
    Function,
    /// Aggregate adapter
    Aggregate,
    /// Set membership operator
    SetOperator,
    /// Graph pattern operator
    GraphOperator,
}

/// Unary operator payload
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOpData {
    /// The operator
    pub op: UnaryOperator,
    /// The operand
    pub operand: ExpressionNode,
}

/// Binary operator payload
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left and right operands
    pub operands: [ExpressionNode; 2],
}

/// Function call payload
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallData {
    /// Function being called
    pub function: Function,
    /// Arguments in declaration order
    pub args: Vec<ExpressionNode>,
}

/// Aggregate adapter payload
///
/// For GROUP_CONCAT and string-join the optional second argument is the
/// separator expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateData {
    /// Aggregate computation
    pub aggregate: Aggregate,
    /// Whether duplicate values are removed first
    pub distinct: bool,
    /// Aggregated expression followed by any extra arguments
    pub args: Vec<ExpressionNode>,
}

/// IN / NOT IN payload; the first argument is the tested expression
#[derive(Debug, Clone, PartialEq)]
pub struct SetOpData {
    /// NOT IN when set
    pub negated: bool,
    /// Tested expression followed by the candidate set
    pub args: Vec<ExpressionNode>,
}

/// Opaque handle to a graph pattern owned by the query algebra
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphPatternRef {
    /// Identifier understood by the evaluation context
    pub id: u64,
    /// Variables the pattern mentions
    pub variables: Vec<String>,
}

/// EXISTS / NOT EXISTS payload
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsData {
    /// The pattern to test
    pub pattern: GraphPatternRef,
    /// NOT EXISTS when set
    pub negated: bool,
}

impl ExpressionNode {
    /// Create a constant expression
    pub fn constant(term: impl Into<Term>) -> Self {
        Self::Constant(term.into())
    }

    /// Create a variable expression
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix(['?', '$']) {
            Some(stripped) => Self::Variable(stripped.to_string()),
            None => Self::Variable(name),
        }
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp(Arc::new(UnaryOpData { op, operand }))
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Arc::new(BinaryOpData {
            op,
            operands: [left, right],
        }))
    }

    /// Create a function call expression
    pub fn function_call(function: Function, args: Vec<ExpressionNode>) -> Self {
        Self::FunctionCall(Arc::new(FunctionCallData { function, args }))
    }

    /// Create an aggregate expression
    pub fn aggregate(aggregate: Aggregate, distinct: bool, args: Vec<ExpressionNode>) -> Self {
        Self::Aggregate(Arc::new(AggregateData {
            aggregate,
            distinct,
            args,
        }))
    }

    /// Create an IN / NOT IN expression
    pub fn set_op(negated: bool, expr: ExpressionNode, set: Vec<ExpressionNode>) -> Self {
        let mut args = Vec::with_capacity(set.len() + 1);
        args.push(expr);
        args.extend(set);
        Self::SetOp(Arc::new(SetOpData { negated, args }))
    }

    /// Create an EXISTS / NOT EXISTS expression
    pub fn exists(pattern: GraphPatternRef, negated: bool) -> Self {
        Self::Exists(Arc::new(ExistsData { pattern, negated }))
    }

    /// Structural category
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::Distinct => ExpressionKind::Primary,
            Self::UnaryOp(_) => ExpressionKind::UnaryOperator,
            Self::BinaryOp(_) => ExpressionKind::BinaryOperator,
            Self::FunctionCall(_) => ExpressionKind::Function,
            Self::Aggregate(_) => ExpressionKind::Aggregate,
            Self::SetOp(_) => ExpressionKind::SetOperator,
            Self::Exists(_) => ExpressionKind::GraphOperator,
        }
    }

    /// Function keyword or URI, operator symbol, or empty for leaves
    pub fn functor(&self) -> Cow<'static, str> {
        match self {
            Self::Constant(_) | Self::Variable(_) => Cow::Borrowed(""),
            Self::Distinct => Cow::Borrowed("DISTINCT"),
            Self::UnaryOp(data) => Cow::Borrowed(data.op.symbol()),
            Self::BinaryOp(data) => Cow::Borrowed(data.op.symbol()),
            Self::FunctionCall(data) => data.function.functor(),
            Self::Aggregate(data) => data.aggregate.functor(),
            Self::SetOp(data) if data.negated => Cow::Borrowed("NOT IN"),
            Self::SetOp(_) => Cow::Borrowed("IN"),
            Self::Exists(data) if data.negated => Cow::Borrowed("NOT EXISTS"),
            Self::Exists(_) => Cow::Borrowed("EXISTS"),
        }
    }

    /// Child nodes in argument order
    pub fn arguments(&self) -> &[ExpressionNode] {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::Distinct | Self::Exists(_) => &[],
            Self::UnaryOp(data) => std::slice::from_ref(&data.operand),
            Self::BinaryOp(data) => &data.operands,
            Self::FunctionCall(data) => &data.args,
            Self::Aggregate(data) => &data.args,
            Self::SetOp(data) => &data.args,
        }
    }

    /// Variables referenced anywhere in the expression
    pub fn variables(&self) -> BTreeSet<String> {
        let mut collector = VariableCollector::default();
        collector.visit_expression(self);
        collector.variables
    }

    /// Whether sibling evaluations may run in parallel
    pub fn can_parallelise(&self) -> bool {
        match self {
            Self::FunctionCall(data) if !data.function.is_deterministic() => false,
            Self::Exists(_) => false,
            _ => self.arguments().iter().all(ExpressionNode::can_parallelise),
        }
    }

    /// Whether the node is a variable reference
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Apply `transformer` to each child
    ///
    /// Returns a node of the same kind with the rewritten children, or a
    /// clone sharing this node's payload when no child changed.
    pub fn transform(&self, transformer: &mut dyn ExpressionTransformer) -> ExpressionNode {
        let children = self.arguments();
        if children.is_empty() {
            return self.clone();
        }
        let rewritten: Vec<ExpressionNode> =
            children.iter().map(|child| transformer.transform(child)).collect();
        if children.iter().zip(&rewritten).all(|(old, new)| old.same_node(new)) {
            return self.clone();
        }
        self.with_arguments(rewritten)
    }

    /// Identity when both sides share a payload, structural equality for leaves
    fn same_node(&self, other: &ExpressionNode) -> bool {
        match (self, other) {
            (Self::UnaryOp(a), Self::UnaryOp(b)) => Arc::ptr_eq(a, b),
            (Self::BinaryOp(a), Self::BinaryOp(b)) => Arc::ptr_eq(a, b),
            (Self::FunctionCall(a), Self::FunctionCall(b)) => Arc::ptr_eq(a, b),
            (Self::Aggregate(a), Self::Aggregate(b)) => Arc::ptr_eq(a, b),
            (Self::SetOp(a), Self::SetOp(b)) => Arc::ptr_eq(a, b),
            (Self::Exists(a), Self::Exists(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }

    fn with_arguments(&self, mut args: Vec<ExpressionNode>) -> ExpressionNode {
        match self {
            Self::UnaryOp(data) => match args.pop() {
                Some(operand) => Self::unary_op(data.op, operand),
                None => self.clone(),
            },
            Self::BinaryOp(data) => match <[ExpressionNode; 2]>::try_from(args) {
                Ok([left, right]) => Self::binary_op(data.op, left, right),
                Err(_) => self.clone(),
            },
            Self::FunctionCall(data) => Self::function_call(data.function.clone(), args),
            Self::Aggregate(data) => Self::aggregate(data.aggregate, data.distinct, args),
            Self::SetOp(data) => Self::SetOp(Arc::new(SetOpData {
                negated: data.negated,
                args,
            })),
            Self::Constant(_) | Self::Variable(_) | Self::Distinct | Self::Exists(_) => self.clone(),
        }
    }
}

#[derive(Default)]
struct VariableCollector {
    variables: BTreeSet<String>,
}

impl ExpressionVisitor for VariableCollector {
    fn visit_expression(&mut self, expr: &ExpressionNode) {
        match expr {
            ExpressionNode::Variable(name) => {
                self.variables.insert(name.clone());
            }
            ExpressionNode::Exists(data) => {
                self.variables.extend(data.pattern.variables.iter().cloned());
            }
            _ => walk_expression(self, expr),
        }
    }
}

impl fmt::Display for GraphPatternRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ pattern#{} }}", self.id)
    }
}

/// Write an operand, bracketing binary operations that bind looser than `min_precedence`
fn write_operand(f: &mut fmt::Formatter<'_>, node: &ExpressionNode, min_precedence: u8) -> fmt::Result {
    match node {
        ExpressionNode::BinaryOp(data) if data.op.precedence() < min_precedence => write!(f, "({node})"),
        _ => write!(f, "{node}"),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, args: &[ExpressionNode]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(term) => write!(f, "{term}"),
            Self::Variable(name) => write!(f, "?{name}"),
            Self::Distinct => f.write_str("DISTINCT"),
            Self::UnaryOp(data) => {
                f.write_str(data.op.symbol())?;
                write_operand(f, &data.operand, u8::MAX)
            }
            Self::BinaryOp(data) => {
                let precedence = data.op.precedence();
                write_operand(f, &data.operands[0], precedence)?;
                write!(f, " {} ", data.op)?;
                write_operand(f, &data.operands[1], precedence + 1)
            }
            Self::FunctionCall(data) => {
                write!(f, "{}(", data.function)?;
                write_list(f, &data.args)?;
                f.write_str(")")
            }
            Self::Aggregate(data) => {
                if data.aggregate.is_keyword() {
                    write!(f, "{}(", data.aggregate.functor())?;
                } else {
                    write!(f, "<{}>(", data.aggregate.functor())?;
                }
                if data.distinct {
                    f.write_str("DISTINCT ")?;
                }
                match (data.aggregate, data.args.as_slice()) {
                    (Aggregate::GroupConcat, [expr, separator]) => {
                        write!(f, "{expr} ; SEPARATOR = {separator}")?
                    }
                    (_, args) => write_list(f, args)?,
                }
                f.write_str(")")
            }
            Self::SetOp(data) => {
                if let Some((expr, set)) = data.args.split_first() {
                    write_operand(f, expr, u8::MAX)?;
                    write!(f, " {} (", self.functor())?;
                    write_list(f, set)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Self::Exists(data) => write!(f, "{} {}", self.functor(), data.pattern),
        }
    }
}
