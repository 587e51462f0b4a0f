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

//! Function registry
//!
//! Resolution order for a function URI:
//!
//! 1. primitive cast URIs (`xsd:integer`, `xsd:string`, ...)
//! 2. global providers in registration order
//! 3. the caller's local providers in the order given
//! 4. a placeholder node when unknown functions are allowed
//!
//! The first provider that does not decline decides the outcome.

use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::config::RegistryConfig;
use super::provider::{FunctionProvider, NamedArguments, Resolution, provider_type};
use super::providers::builtin_providers;
use super::signature::ArityShape;
use crate::ast::{CastTarget, ExpressionNode, Function};
use crate::error::{ResolutionError, ResolutionResult};
use crate::model::Iri;

/// Snapshot of the global provider list
type ProviderList = Arc<Vec<Arc<dyn FunctionProvider>>>;

static GLOBAL_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Registry composing function providers
///
/// The provider list is copy-on-write: registration swaps in an extended
/// copy, resolution iterates a snapshot without holding the lock.
pub struct FunctionRegistry {
    providers: RwLock<ProviderList>,
    allow_unknown_functions: AtomicBool,
}

impl FunctionRegistry {
    /// Registry with the built-in providers and the default configuration
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Registry with the built-in providers
    pub fn with_config(config: &RegistryConfig) -> Self {
        let registry = Self::empty(config);
        for provider in builtin_providers() {
            registry.register_provider(provider);
        }
        registry
    }

    /// Registry with no providers; only casts resolve
    pub fn empty(config: &RegistryConfig) -> Self {
        Self {
            providers: RwLock::new(Arc::new(Vec::new())),
            allow_unknown_functions: AtomicBool::new(config.allow_unknown_functions),
        }
    }

    /// Process-wide registry shared by every query
    pub fn global() -> &'static FunctionRegistry {
        &GLOBAL_REGISTRY
    }

    /// Append a provider; returns false if one of the same type is registered
    pub fn register_provider(&self, provider: Arc<dyn FunctionProvider>) -> bool {
        let mut providers = self.providers.write();
        let kind = provider_type(provider.as_ref());
        if providers.iter().any(|p| provider_type(p.as_ref()) == kind) {
            trace!("Provider for {} already registered", provider.namespace());
            return false;
        }
        debug!("Registering function provider for {}", provider.namespace());
        let mut extended = Vec::with_capacity(providers.len() + 1);
        extended.extend(providers.iter().cloned());
        extended.push(provider);
        *providers = Arc::new(extended);
        true
    }

    /// Current provider list
    pub fn providers(&self) -> ProviderList {
        Arc::clone(&self.providers.read())
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Whether unresolved URIs become placeholder nodes
    pub fn allow_unknown_functions(&self) -> bool {
        self.allow_unknown_functions.load(Ordering::Acquire)
    }

    /// Change the unknown-function policy
    pub fn set_allow_unknown_functions(&self, allow: bool) {
        self.allow_unknown_functions.store(allow, Ordering::Release);
    }

    /// Resolve a function reference into an expression node
    pub fn resolve(
        &self,
        uri: &Iri,
        args: Vec<ExpressionNode>,
        named_args: &NamedArguments,
        local_providers: &[Arc<dyn FunctionProvider>],
    ) -> ResolutionResult<ExpressionNode> {
        if let Some(target) = CastTarget::from_datatype(uri.as_str()) {
            trace!("Resolving {uri} as a cast");
            return Self::resolve_cast(target, uri, args, named_args);
        }

        let global = self.providers();
        for provider in global.iter().chain(local_providers) {
            match provider.resolve(uri, &args, named_args) {
                Resolution::Resolved(node) => {
                    debug!("Resolved {uri} with the {} provider", provider.namespace());
                    return Ok(node);
                }
                Resolution::Failed(error) => return Err(error),
                Resolution::Declined => trace!("{} provider declined {uri}", provider.namespace()),
            }
        }

        if self.allow_unknown_functions() {
            warn!("No provider resolves {uri}; evaluation will fail");
            return Ok(ExpressionNode::function_call(Function::Unknown(uri.clone()), args));
        }
        Err(ResolutionError::unresolved(uri.as_str()))
    }

    fn resolve_cast(
        target: CastTarget,
        uri: &Iri,
        args: Vec<ExpressionNode>,
        named_args: &NamedArguments,
    ) -> ResolutionResult<ExpressionNode> {
        if !named_args.is_empty() {
            return Err(ResolutionError::invalid_argument(
                uri.as_str(),
                "casts take no named arguments",
            ));
        }
        if args.len() != 1 {
            return Err(ResolutionError::arity(uri.as_str(), ArityShape::Exact(1), args.len()));
        }
        Ok(ExpressionNode::function_call(Function::Cast(target), args))
    }

    /// URIs of every scalar function the global providers resolve
    pub fn available_functions(&self) -> Vec<String> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.available_functions().collect::<Vec<_>>())
            .collect()
    }

    /// URIs of every aggregate the global providers resolve
    pub fn available_aggregates(&self) -> Vec<String> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.available_aggregates().collect::<Vec<_>>())
            .collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespaces: Vec<String> = self
            .providers()
            .iter()
            .map(|provider| provider.namespace().to_string())
            .collect();
        f.debug_struct("FunctionRegistry")
            .field("providers", &namespaces)
            .field("allow_unknown_functions", &self.allow_unknown_functions())
            .finish()
    }
}
