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

//! Function signatures and the per-namespace tables built from them

use indexmap::IndexMap;
use std::fmt;

use super::provider::{NamedArguments, Resolution};
use crate::ast::{Aggregate, ExpressionNode, Function};
use crate::error::{ResolutionError, ResolutionResult};
use crate::model::Iri;

/// Accepted argument counts of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityShape {
    /// Exactly n arguments
    Exact(usize),
    /// Any of the listed counts
    OneOf(&'static [usize]),
    /// n or more arguments
    AtLeast(usize),
}

impl ArityShape {
    /// Whether `count` arguments are accepted
    pub fn accepts(self, count: usize) -> bool {
        match self {
            ArityShape::Exact(n) => count == n,
            ArityShape::OneOf(counts) => counts.contains(&count),
            ArityShape::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for ArityShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match self {
            ArityShape::Exact(n) => write!(f, "exactly {n} {}", plural(*n)),
            ArityShape::AtLeast(n) => write!(f, "at least {n} {}", plural(*n)),
            ArityShape::OneOf(counts) => {
                let counts: Vec<String> = counts.iter().map(usize::to_string).collect();
                write!(f, "{} arguments", counts.join(" or "))
            }
        }
    }
}

/// Hand-written node builder for functions that are not a plain call
pub type BuildFn = fn(&[ExpressionNode], &NamedArguments) -> ResolutionResult<ExpressionNode>;

/// How a signature turns its arguments into a node
#[derive(Debug, Clone)]
pub enum Constructor {
    /// A call of the function over the arguments
    Function(Function),
    /// An aggregate over the arguments
    Aggregate(Aggregate),
    /// An aggregate over `x` or `DISTINCT, x`
    DistinctAggregate(Aggregate),
    /// A dedicated builder
    Custom(BuildFn),
    /// Recognised but never resolved
    Unsupported,
}

/// Whether a signature yields a scalar expression or an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    /// Evaluated per binding
    Scalar,
    /// Evaluated per group
    Aggregate,
}

/// One entry of a provider table
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Namespace prefix
    pub namespace: &'static str,
    /// Local name as the table stores it
    pub local_name: &'static str,
    /// Accepted argument counts
    pub arity: ArityShape,
    /// Scalar or aggregate
    pub category: FunctionCategory,
    /// Node builder
    pub constructor: Constructor,
    /// Named arguments the function accepts
    pub named: &'static [&'static str],
}

impl FunctionSignature {
    /// A scalar function resolving to a call of `function`
    pub fn function(local_name: &'static str, arity: ArityShape, function: Function) -> Self {
        Self::new(local_name, arity, FunctionCategory::Scalar, Constructor::Function(function))
    }

    /// An aggregate
    pub fn aggregate(local_name: &'static str, arity: ArityShape, aggregate: Aggregate) -> Self {
        Self::new(local_name, arity, FunctionCategory::Aggregate, Constructor::Aggregate(aggregate))
    }

    /// An aggregate taking `x` or `DISTINCT, x`
    pub fn distinct_aggregate(local_name: &'static str, aggregate: Aggregate) -> Self {
        Self::new(
            local_name,
            ArityShape::OneOf(&[1, 2]),
            FunctionCategory::Aggregate,
            Constructor::DistinctAggregate(aggregate),
        )
    }

    /// A scalar function with a dedicated builder
    pub fn custom(local_name: &'static str, arity: ArityShape, build: BuildFn) -> Self {
        Self::new(local_name, arity, FunctionCategory::Scalar, Constructor::Custom(build))
    }

    /// A name that is recognised but refused whatever the arguments
    pub fn unsupported(local_name: &'static str) -> Self {
        Self::new(local_name, ArityShape::AtLeast(0), FunctionCategory::Scalar, Constructor::Unsupported)
    }

    fn new(local_name: &'static str, arity: ArityShape, category: FunctionCategory, constructor: Constructor) -> Self {
        Self {
            namespace: "",
            local_name,
            arity,
            category,
            constructor,
            named: &[],
        }
    }

    /// Mark the signature as an aggregate
    pub fn as_aggregate(mut self) -> Self {
        self.category = FunctionCategory::Aggregate;
        self
    }

    /// Accept the given named arguments
    pub fn with_named(mut self, named: &'static [&'static str]) -> Self {
        self.named = named;
        self
    }

    /// Full URI of the function
    pub fn uri(&self) -> String {
        format!("{}{}", self.namespace, self.local_name)
    }

    /// Whether the signature can ever resolve
    pub fn is_supported(&self) -> bool {
        !matches!(self.constructor, Constructor::Unsupported)
    }

    /// Whether every named argument is one this function takes, each at most once
    pub fn accepts_named(&self, named_args: &NamedArguments) -> bool {
        let mut seen: Vec<&str> = Vec::with_capacity(named_args.len());
        named_args.keys().all(|key| {
            match self.named.iter().find(|name| name.eq_ignore_ascii_case(key)) {
                Some(name) if !seen.contains(name) => {
                    seen.push(name);
                    true
                }
                _ => false,
            }
        })
    }

    /// Build the node, checking support before arity
    pub fn construct(&self, args: &[ExpressionNode], named_args: &NamedArguments) -> ResolutionResult<ExpressionNode> {
        if !self.is_supported() {
            return Err(ResolutionError::unsupported(self.local_name));
        }
        if !self.arity.accepts(args.len()) {
            return Err(ResolutionError::arity(self.local_name, self.arity, args.len()));
        }
        match &self.constructor {
            Constructor::Function(function) => Ok(ExpressionNode::function_call(function.clone(), args.to_vec())),
            Constructor::Aggregate(aggregate) => Ok(ExpressionNode::aggregate(*aggregate, false, args.to_vec())),
            Constructor::DistinctAggregate(aggregate) => match args {
                [ExpressionNode::Distinct, expr] => Ok(ExpressionNode::aggregate(*aggregate, true, vec![expr.clone()])),
                [expr] if *expr != ExpressionNode::Distinct => {
                    Ok(ExpressionNode::aggregate(*aggregate, false, vec![expr.clone()]))
                }
                _ => Err(ResolutionError::arity(
                    self.local_name,
                    "an expression, optionally preceded by DISTINCT",
                    args.len(),
                )),
            },
            Constructor::Custom(build) => build(args, named_args),
            Constructor::Unsupported => Err(ResolutionError::unsupported(self.local_name)),
        }
    }
}

/// Immutable table of the signatures under one namespace
#[derive(Debug, Clone)]
pub struct FunctionTable {
    namespace: &'static str,
    case_insensitive: bool,
    entries: IndexMap<&'static str, FunctionSignature>,
}

impl FunctionTable {
    /// Build a table; with `case_insensitive` local names are stored and
    /// matched in lowercase
    pub fn new(namespace: &'static str, case_insensitive: bool, signatures: Vec<FunctionSignature>) -> Self {
        let entries = signatures
            .into_iter()
            .map(|mut signature| {
                signature.namespace = namespace;
                (signature.local_name, signature)
            })
            .collect();
        Self {
            namespace,
            case_insensitive,
            entries,
        }
    }

    /// Namespace prefix
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signature for a local name
    pub fn lookup(&self, local_name: &str) -> Option<&FunctionSignature> {
        if self.case_insensitive {
            self.entries.get(local_name.to_ascii_lowercase().as_str())
        } else {
            self.entries.get(local_name)
        }
    }

    /// Resolve a URI against the table
    pub fn dispatch(&self, uri: &Iri, args: &[ExpressionNode], named_args: &NamedArguments) -> Resolution {
        let Some(local_name) = uri.strip_namespace(self.namespace) else {
            return Resolution::Declined;
        };
        let Some(signature) = self.lookup(local_name) else {
            return Resolution::Declined;
        };
        if !signature.accepts_named(named_args) {
            return Resolution::Declined;
        }
        signature.construct(args, named_args).into()
    }

    /// URIs of the supported entries in `category`, in table order
    pub fn uris(&self, category: FunctionCategory) -> impl Iterator<Item = String> + '_ {
        self.entries
            .values()
            .filter(move |signature| signature.category == category && signature.is_supported())
            .map(FunctionSignature::uri)
    }
}
