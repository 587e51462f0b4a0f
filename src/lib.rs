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

//! SPARQL function resolution and expression evaluation
//!
//! Turns function references met while compiling a query (a URI with
//! positional and named arguments) into expression nodes, and evaluates those
//! nodes against variable bindings. Four vocabularies are built in: the core
//! SPARQL functions, XPath, Jena ARQ and Leviathan.
//!
//! ```
//! use octofhir_sparql_expr::{ExpressionNode, FunctionRegistry, Iri, NamedArguments, SimpleEvaluationContext, Term};
//!
//! let registry = FunctionRegistry::global();
//! let node = registry
//!     .resolve(
//!         &Iri::new("http://www.w3.org/ns/sparql#abs"),
//!         vec![ExpressionNode::variable("x")],
//!         &NamedArguments::new(),
//!         &[],
//!     )
//!     .unwrap();
//!
//! let mut ctx = SimpleEvaluationContext::new();
//! let row = ctx.push_row([("x", Term::integer(-4))]);
//! assert_eq!(node.evaluate(&ctx, row), Ok(Term::integer(4)));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod registry;

// Re-export main types
pub use ast::{Aggregate, ExpressionKind, ExpressionNode, Function};
pub use error::{EvaluationError, EvaluationResult, ResolutionError, ResolutionResult};
pub use evaluator::{BindingId, EvaluationContext, SimpleEvaluationContext};
pub use model::{Iri, Literal, NumericType, NumericValue, Term};
pub use registry::{FunctionProvider, FunctionRegistry, NamedArguments, RegistryConfig, Resolution};
