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

//! Jena ARQ compatibility functions

use sha1::Sha1;
use std::cmp::Ordering;

use super::CallArgs;
use crate::ast::ArqFunction;
use crate::error::{EvaluationError, EvaluationResult};
use crate::evaluator::helpers::{digest_hex, integer_arg, lexical_form, string_like, string_literal};
use crate::model::{Iri, Term};

pub(super) fn evaluate(function: ArqFunction, args: &CallArgs<'_>) -> EvaluationResult<Term> {
    match function {
        ArqFunction::BNode => match args.term(0)? {
            Term::BlankNode(label) => Ok(Term::string(label)),
            other => Err(EvaluationError::type_error("a blank node argument for bnode", other)),
        },
        ArqFunction::E => Ok(Term::double(std::f64::consts::E)),
        ArqFunction::Pi => Ok(Term::double(std::f64::consts::PI)),
        ArqFunction::LocalName => iri_part(args, |iri, split| &iri[split..]),
        ArqFunction::Namespace => iri_part(args, |iri, split| &iri[..split]),
        ArqFunction::Max => extremum(args, Ordering::Greater),
        ArqFunction::Min => extremum(args, Ordering::Less),
        ArqFunction::Now => Ok(Term::date_time(args.ctx().now())),
        ArqFunction::Sha1Sum => {
            let term = args.term(0)?;
            Ok(Term::string(digest_hex::<Sha1>(&lexical_form(&term, args.name())?)))
        }
        ArqFunction::Substring => substring(args),
        ArqFunction::StrJoin => {
            let separator = args.term(0)?;
            let separator = string_literal(&separator, args.name())?;
            let mut parts = Vec::with_capacity(args.len().saturating_sub(1));
            for index in 1..args.len() {
                let term = args.term(index)?;
                parts.push(string_literal(&term, args.name())?.lexical().to_string());
            }
            Ok(Term::string(parts.join(separator.lexical())))
        }
    }
}

/// Split position of an IRI: just after its last '#' or '/'
fn split_point(iri: &Iri) -> usize {
    iri.as_str().rfind(['#', '/']).map_or(0, |index| index + 1)
}

fn iri_part(args: &CallArgs<'_>, part: for<'s> fn(&'s str, usize) -> &'s str) -> EvaluationResult<Term> {
    match args.term(0)? {
        Term::Iri(iri) => Ok(Term::string(part(iri.as_str(), split_point(&iri)))),
        other => Err(EvaluationError::type_error(
            format!("an IRI argument for {}", args.name()),
            other,
        )),
    }
}

fn extremum(args: &CallArgs<'_>, wanted: Ordering) -> EvaluationResult<Term> {
    let (a, b) = (args.numeric(0)?, args.numeric(1)?);
    match a.compare(b)? {
        Some(ordering) if ordering == wanted => Ok(a.into_term()),
        Some(_) => Ok(b.into_term()),
        None => Err(EvaluationError::domain(args.name(), "NaN has no order")),
    }
}

/// Zero-based start, optional exclusive end
fn substring(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let source = string_literal(&term, args.name())?;
    let chars: Vec<char> = source.lexical().chars().collect();
    let start = integer_arg(&args.term(1)?, args.name())?;
    let end = match args.optional(2)? {
        Some(end) => integer_arg(&end, args.name())?,
        None => chars.len() as i64,
    };
    if start < 0 || end < start || end > chars.len() as i64 {
        return Err(EvaluationError::domain(
            args.name(),
            format!("range {start}..{end} is outside a string of length {}", chars.len()),
        ));
    }
    let result: String = chars[start as usize..end as usize].iter().collect();
    Ok(string_like(result, source))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::call;
    use super::*;
    use crate::ast::Function;

    fn arq(function: ArqFunction, args: Vec<Term>) -> EvaluationResult<Term> {
        call(Function::Arq(function), args)
    }

    #[test]
    fn test_iri_parts() {
        let iri = Term::iri("http://example.org/ns#local");
        assert_eq!(arq(ArqFunction::LocalName, vec![iri.clone()]), Ok(Term::string("local")));
        assert_eq!(
            arq(ArqFunction::Namespace, vec![iri]),
            Ok(Term::string("http://example.org/ns#"))
        );
        let iri = Term::iri("http://example.org/path/item");
        assert_eq!(arq(ArqFunction::LocalName, vec![iri]), Ok(Term::string("item")));
        assert!(arq(ArqFunction::LocalName, vec![Term::string("x")]).is_err());
    }

    #[test]
    fn test_bnode_label() {
        assert_eq!(arq(ArqFunction::BNode, vec![Term::blank_node("b1")]), Ok(Term::string("b1")));
        assert!(arq(ArqFunction::BNode, vec![Term::iri("http://example.org/")]).is_err());
    }

    #[test]
    fn test_zero_based_substring() {
        let args = vec![Term::string("abcdef"), Term::integer(1), Term::integer(3)];
        assert_eq!(arq(ArqFunction::Substring, args), Ok(Term::string("bc")));
        let args = vec![Term::string("abcdef"), Term::integer(4)];
        assert_eq!(arq(ArqFunction::Substring, args), Ok(Term::string("ef")));
        let args = vec![Term::string("abc"), Term::integer(2), Term::integer(9)];
        assert!(arq(ArqFunction::Substring, args).is_err());
    }

    #[test]
    fn test_max_min_strjoin() {
        let args = vec![Term::integer(3), Term::double(4.5)];
        assert_eq!(arq(ArqFunction::Max, args.clone()), Ok(Term::double(4.5)));
        assert_eq!(arq(ArqFunction::Min, args), Ok(Term::integer(3)));

        let args = vec![Term::string(", "), Term::string("a"), Term::string("b")];
        assert_eq!(arq(ArqFunction::StrJoin, args), Ok(Term::string("a, b")));
    }

    #[test]
    fn test_sha1sum() {
        assert_eq!(
            arq(ArqFunction::Sha1Sum, vec![Term::string("abc")]),
            Ok(Term::string("a9993e364706816aba3e25717850c26c9cd0d89d"))
        );
    }
}
