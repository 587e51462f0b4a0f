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

//! Built-in function providers, one per vocabulary

mod arq;
mod leviathan;
mod sparql;
mod xpath;

use std::sync::Arc;

pub use arq::ArqFunctionProvider;
pub use leviathan::LeviathanFunctionProvider;
pub use sparql::SparqlFunctionProvider;
pub use xpath::XPathFunctionProvider;

use super::provider::FunctionProvider;

/// The built-in providers in resolution order: core, XPath, ARQ, Leviathan
pub fn builtin_providers() -> Vec<Arc<dyn FunctionProvider>> {
    vec![
        Arc::new(SparqlFunctionProvider),
        Arc::new(XPathFunctionProvider),
        Arc::new(ArqFunctionProvider),
        Arc::new(LeviathanFunctionProvider),
    ]
}
