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

//! Function provider contract

use indexmap::IndexMap;
use std::any::{Any, TypeId};

use crate::ast::ExpressionNode;
use crate::error::ResolutionError;
use crate::model::Iri;

/// Named arguments of a function call, in the order they were written
pub type NamedArguments = IndexMap<String, ExpressionNode>;

/// Outcome of asking one provider to resolve a function
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The provider built a node
    Resolved(ExpressionNode),
    /// The URI is not the provider's; the next one is asked
    Declined,
    /// The URI is the provider's but the call is invalid; resolution stops
    Failed(ResolutionError),
}

impl Resolution {
    /// Whether the provider declined
    pub fn is_declined(&self) -> bool {
        matches!(self, Resolution::Declined)
    }
}

impl From<Result<ExpressionNode, ResolutionError>> for Resolution {
    fn from(result: Result<ExpressionNode, ResolutionError>) -> Self {
        match result {
            Ok(node) => Resolution::Resolved(node),
            Err(error) => Resolution::Failed(error),
        }
    }
}

/// A vocabulary of functions living under one namespace
///
/// Providers are immutable once built and must not have side effects while
/// resolving. A provider declines any URI outside its namespace, any local
/// name it does not know, and any named argument it does not accept.
pub trait FunctionProvider: Any + Send + Sync {
    /// Namespace prefix this provider owns
    fn namespace(&self) -> &str;

    /// Try to build a node for `uri` applied to `args`
    fn resolve(&self, uri: &Iri, args: &[ExpressionNode], named_args: &NamedArguments) -> Resolution;

    /// URIs of the scalar functions this provider resolves
    fn available_functions(&self) -> Box<dyn Iterator<Item = String> + '_>;

    /// URIs of the aggregates this provider resolves
    fn available_aggregates(&self) -> Box<dyn Iterator<Item = String> + '_>;
}

/// Concrete type of a provider, used to register each kind only once
pub(crate) fn provider_type(provider: &(dyn FunctionProvider + 'static)) -> TypeId {
    Any::type_id(provider)
}
