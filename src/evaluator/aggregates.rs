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

//! Aggregate computation over a group of bindings

use indexmap::{IndexMap, IndexSet};
use std::cmp::Ordering;

use super::context::{BindingId, EvaluationContext};
use super::helpers::{effective_boolean_value, lexical_form, total_order};
use crate::ast::{Aggregate, AggregateData};
use crate::error::{EvaluationError, EvaluationResult};
use crate::model::{NumericValue, Term};

impl AggregateData {
    /// Compute the aggregate over the bindings of one group
    ///
    /// The first argument is evaluated once per binding. With `distinct` set
    /// repeated values are dropped before the computation; evaluation errors
    /// are kept so each aggregate can decide how to treat them.
    pub fn apply(&self, ctx: &dyn EvaluationContext, binding_ids: &[BindingId]) -> EvaluationResult<Term> {
        let name = self.aggregate.functor();
        if self.aggregate == Aggregate::Count && self.args.is_empty() {
            return Ok(Term::integer(binding_ids.len() as i64));
        }
        let values = self.values(ctx, binding_ids)?;
        let ok_values = || values.iter().filter_map(|value| value.as_ref().ok());
        let empty = || EvaluationError::domain(name.as_ref(), "no values to aggregate");

        match self.aggregate {
            Aggregate::Count => Ok(Term::integer(ok_values().count() as i64)),
            Aggregate::Sum => Ok(sum(&values, &name)?.into_term()),
            Aggregate::Avg => {
                if values.is_empty() {
                    return Ok(Term::integer(0));
                }
                let total = sum(&values, &name)?;
                Ok(total.div(NumericValue::Integer(values.len() as i64))?.into_term())
            }
            Aggregate::Min => ok_values().min_by(|a, b| total_order(a, b)).cloned().ok_or_else(empty),
            Aggregate::Max => ok_values().max_by(|a, b| total_order(a, b)).cloned().ok_or_else(empty),
            Aggregate::Sample => ok_values().next().cloned().ok_or_else(empty),
            Aggregate::GroupConcat => self.join(&values, ctx, binding_ids, " ", &name),
            Aggregate::StringJoin => self.join(&values, ctx, binding_ids, "", &name),
            Aggregate::All => {
                let all = values
                    .iter()
                    .all(|value| matches!(value.as_ref().map(effective_boolean_value), Ok(Ok(true))));
                Ok(Term::boolean(all))
            }
            Aggregate::Any => Ok(Term::boolean(truthy_count(&values) > 0)),
            Aggregate::None => Ok(Term::boolean(truthy_count(&values) == 0)),
            Aggregate::NumericMax => numeric_extremum(&values, Ordering::Greater).ok_or_else(empty),
            Aggregate::NumericMin => numeric_extremum(&values, Ordering::Less).ok_or_else(empty),
            Aggregate::Mode => {
                let mut counts: IndexMap<&Term, usize> = IndexMap::new();
                for value in ok_values() {
                    *counts.entry(value).or_default() += 1;
                }
                // Earliest value wins a tie
                let mut best: Option<(&Term, usize)> = None;
                for (value, count) in counts {
                    if best.is_none_or(|(_, top)| count > top) {
                        best = Some((value, count));
                    }
                }
                best.map(|(value, _)| value.clone()).ok_or_else(empty)
            }
            Aggregate::Median => {
                let mut sorted: Vec<&Term> = ok_values().collect();
                sorted.sort_by(|a, b| total_order(a, b));
                sorted.get(sorted.len() / 2).map(|value| (*value).clone()).ok_or_else(empty)
            }
        }
    }

    fn values(
        &self,
        ctx: &dyn EvaluationContext,
        binding_ids: &[BindingId],
    ) -> EvaluationResult<Vec<EvaluationResult<Term>>> {
        let Some(expr) = self.args.first() else {
            return Err(EvaluationError::domain(
                self.aggregate.functor().as_ref(),
                "missing aggregated expression",
            ));
        };
        let values = binding_ids.iter().map(|&binding| expr.evaluate(ctx, binding));
        if !self.distinct {
            return Ok(values.collect());
        }
        let mut seen = IndexSet::new();
        Ok(values
            .filter(|value| match value {
                Ok(term) => seen.insert(term.clone()),
                Err(_) => true,
            })
            .collect())
    }

    /// GROUP_CONCAT and string-join; the separator is evaluated once
    fn join(
        &self,
        values: &[EvaluationResult<Term>],
        ctx: &dyn EvaluationContext,
        binding_ids: &[BindingId],
        default_separator: &str,
        name: &str,
    ) -> EvaluationResult<Term> {
        let separator = match (self.args.get(1), binding_ids.first()) {
            (Some(expr), Some(&binding)) => lexical_form(&expr.evaluate(ctx, binding)?, name)?,
            _ => default_separator.to_string(),
        };
        let parts = values
            .iter()
            .map(|value| match value {
                Ok(term) => lexical_form(term, name),
                Err(e) => Err(e.clone()),
            })
            .collect::<EvaluationResult<Vec<_>>>()?;
        Ok(Term::string(parts.join(&separator)))
    }
}

fn sum(values: &[EvaluationResult<Term>], name: &str) -> EvaluationResult<NumericValue> {
    values.iter().try_fold(NumericValue::Integer(0), |total, value| match value {
        Ok(term) => total.add(NumericValue::from_term(term, name)?),
        Err(e) => Err(e.clone()),
    })
}

fn truthy_count(values: &[EvaluationResult<Term>]) -> usize {
    values
        .iter()
        .filter(|value| matches!(value.as_ref().map(effective_boolean_value), Ok(Ok(true))))
        .count()
}

/// nmax / nmin: non-numeric values and NaN are skipped
fn numeric_extremum(values: &[EvaluationResult<Term>], wanted: Ordering) -> Option<Term> {
    let mut best: Option<NumericValue> = None;
    for value in values.iter().filter_map(|value| value.as_ref().ok()) {
        let Ok(number) = NumericValue::from_term(value, "") else {
            continue;
        };
        best = match best {
            None if number.compare(number).ok().flatten().is_some() => Some(number),
            Some(current) if number.compare(current).ok().flatten() == Some(wanted) => Some(number),
            other => other,
        };
    }
    best.map(NumericValue::into_term)
}
