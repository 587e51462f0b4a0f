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

//! Function resolution for SPARQL
//!
//! Providers map function URIs of one vocabulary to expression nodes; the
//! [`FunctionRegistry`] composes them in a fixed order.

#![warn(missing_docs)]

pub mod config;
pub mod function_registry;
pub mod provider;
pub mod providers;
pub mod signature;

pub use config::{DEFAULT_REGEX_CACHE_SIZE, RegistryConfig};
pub use function_registry::FunctionRegistry;
pub use provider::{FunctionProvider, NamedArguments, Resolution};
pub use providers::{
    ArqFunctionProvider, LeviathanFunctionProvider, SparqlFunctionProvider, XPathFunctionProvider,
};
pub use signature::{ArityShape, BuildFn, Constructor, FunctionCategory, FunctionSignature, FunctionTable};
