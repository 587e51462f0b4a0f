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

//! Registry configuration options

use serde::{Deserialize, Serialize};

/// Compiled patterns each evaluation thread keeps by default
pub const DEFAULT_REGEX_CACHE_SIZE: usize = 32;

/// Configuration for function resolution and evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Whether unresolved function URIs become placeholder nodes instead of
    /// failing the compilation
    pub allow_unknown_functions: bool,

    /// Size of the per-thread compiled regex cache, 0 disables it
    pub regex_cache_size: usize,
}

impl RegistryConfig {
    /// Create a new configuration with custom settings
    pub fn new(allow_unknown_functions: bool, regex_cache_size: usize) -> Self {
        Self {
            allow_unknown_functions,
            regex_cache_size,
        }
    }

    /// Reject every function no provider recognises
    pub fn strict() -> Self {
        Self::default()
    }

    /// Defer unknown functions to evaluation time
    pub fn permissive() -> Self {
        Self {
            allow_unknown_functions: true,
            ..Self::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_unknown_functions: false,
            regex_cache_size: DEFAULT_REGEX_CACHE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert!(!config.allow_unknown_functions);
        assert_eq!(config.regex_cache_size, DEFAULT_REGEX_CACHE_SIZE);
        assert_eq!(config, RegistryConfig::strict());
    }

    #[test]
    fn test_registry_config_presets() {
        let config = RegistryConfig::permissive();
        assert!(config.allow_unknown_functions);
        assert_eq!(config.regex_cache_size, DEFAULT_REGEX_CACHE_SIZE);

        let config = RegistryConfig::new(true, 0);
        assert_eq!(config.regex_cache_size, 0);
    }
}
