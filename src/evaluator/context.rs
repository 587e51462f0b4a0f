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

//! Evaluation context for SPARQL expressions

use chrono::{DateTime, FixedOffset, Utc};
use rustc_hash::FxHashMap;

use crate::ast::GraphPatternRef;
use crate::error::{EvaluationError, EvaluationResult};
use crate::model::{Iri, Term};
use crate::registry::{DEFAULT_REGEX_CACHE_SIZE, RegistryConfig};

/// Identifier of one candidate solution
pub type BindingId = usize;

/// Everything an expression needs from the query engine while it runs
pub trait EvaluationContext {
    /// Value of `variable` in `binding`, `None` when unbound
    fn value(&self, variable: &str, binding: BindingId) -> Option<Term>;

    /// Bindings of the group `binding` stands for, `None` outside grouping
    fn group(&self, _binding: BindingId) -> Option<Vec<BindingId>> {
        None
    }

    /// Whether `pattern` has a solution compatible with `binding`
    fn exists(&self, _pattern: &GraphPatternRef, _binding: BindingId) -> EvaluationResult<bool> {
        Err(EvaluationError::ExistsUnsupported)
    }

    /// The query's notion of "now"; must not change during one query
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }

    /// Base IRI for resolving relative IRIs
    fn base_iri(&self) -> Option<&Iri> {
        None
    }

    /// Number of compiled patterns each thread keeps
    fn regex_cache_size(&self) -> usize {
        DEFAULT_REGEX_CACHE_SIZE
    }
}

/// In-memory evaluation context
///
/// Rows of variable values addressed by their index, optional groups for
/// aggregates and precomputed answers for EXISTS patterns.
#[derive(Debug, Clone)]
pub struct SimpleEvaluationContext {
    rows: Vec<FxHashMap<String, Term>>,
    groups: FxHashMap<BindingId, Vec<BindingId>>,
    patterns: FxHashMap<(u64, BindingId), bool>,
    now: DateTime<FixedOffset>,
    base_iri: Option<Iri>,
    regex_cache_size: usize,
}

impl Default for SimpleEvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleEvaluationContext {
    /// Create an empty context with "now" fixed at creation time
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            groups: FxHashMap::default(),
            patterns: FxHashMap::default(),
            now: Utc::now().fixed_offset(),
            base_iri: None,
            regex_cache_size: DEFAULT_REGEX_CACHE_SIZE,
        }
    }

    /// Create an empty context using the evaluator settings of `config`
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            regex_cache_size: config.regex_cache_size,
            ..Self::new()
        }
    }

    /// Fix the value returned by NOW()
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }

    /// Set the base IRI
    pub fn with_base_iri(mut self, base: impl Into<Iri>) -> Self {
        self.base_iri = Some(base.into());
        self
    }

    /// Append a row and return its binding id
    pub fn push_row<I, K>(&mut self, values: I) -> BindingId
    where
        I: IntoIterator<Item = (K, Term)>,
        K: Into<String>,
    {
        let row = values
            .into_iter()
            .map(|(name, term)| (name.into(), term))
            .collect();
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the context has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Declare that aggregates evaluated at `binding` span `members`
    pub fn set_group(&mut self, binding: BindingId, members: Vec<BindingId>) {
        self.groups.insert(binding, members);
    }

    /// Declare the answer of EXISTS for `pattern` at `binding`
    pub fn set_exists(&mut self, pattern: &GraphPatternRef, binding: BindingId, answer: bool) {
        self.patterns.insert((pattern.id, binding), answer);
    }
}

impl EvaluationContext for SimpleEvaluationContext {
    fn value(&self, variable: &str, binding: BindingId) -> Option<Term> {
        self.rows.get(binding)?.get(variable).cloned()
    }

    fn group(&self, binding: BindingId) -> Option<Vec<BindingId>> {
        self.groups.get(&binding).cloned()
    }

    fn exists(&self, pattern: &GraphPatternRef, binding: BindingId) -> EvaluationResult<bool> {
        Ok(self
            .patterns
            .get(&(pattern.id, binding))
            .copied()
            .unwrap_or(false))
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    fn base_iri(&self) -> Option<&Iri> {
        self.base_iri.as_ref()
    }

    fn regex_cache_size(&self) -> usize {
        self.regex_cache_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_groups() {
        let mut ctx = SimpleEvaluationContext::new();
        let a = ctx.push_row([("x", Term::integer(1))]);
        let b = ctx.push_row([("x", Term::integer(2)), ("y", Term::string("b"))]);
        ctx.set_group(a, vec![a, b]);

        assert_eq!(ctx.value("x", b), Some(Term::integer(2)));
        assert_eq!(ctx.value("y", a), None);
        assert_eq!(ctx.value("x", 7), None);
        assert_eq!(ctx.group(a), Some(vec![a, b]));
        assert_eq!(ctx.group(b), None);
    }

    #[test]
    fn test_exists_answers() {
        let mut ctx = SimpleEvaluationContext::new();
        let row = ctx.push_row(Vec::<(String, Term)>::new());
        let pattern = GraphPatternRef {
            id: 3,
            variables: vec![],
        };
        assert_eq!(ctx.exists(&pattern, row), Ok(false));
        ctx.set_exists(&pattern, row, true);
        assert_eq!(ctx.exists(&pattern, row), Ok(true));
    }
}
