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

//! XPath functions

use chrono::{Datelike, Timelike};
use percent_encoding::{CONTROLS, utf8_percent_encode};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

use super::CallArgs;
use super::sparql::{
    concat, date_part, encode_for_uri, map_string, seconds, string_length, string_test, substring,
    timezone,
};
use crate::ast::XPathFunction;
use crate::error::{EvaluationError, EvaluationResult};
use crate::evaluator::helpers::{
    check_compatible, compile_regex, effective_boolean_value, integer_arg, simple_string,
    string_like, string_literal, xpath_replacement,
};
use crate::model::Term;

pub(super) fn evaluate(function: XPathFunction, args: &CallArgs<'_>) -> EvaluationResult<Term> {
    match function {
        XPathFunction::Boolean => Ok(Term::boolean(effective_boolean_value(&args.term(0)?)?)),
        XPathFunction::Contains => string_test(args, |s, p| s.contains(p)),
        XPathFunction::StartsWith => string_test(args, |s, p| s.starts_with(p)),
        XPathFunction::EndsWith => string_test(args, |s, p| s.ends_with(p)),
        XPathFunction::StringLength => string_length(args),
        XPathFunction::Concat => concat(&args.terms()?, args.name()),
        XPathFunction::Substring => substring(args),
        XPathFunction::SubstringBefore => split_around(args, true),
        XPathFunction::SubstringAfter => split_around(args, false),
        XPathFunction::NormalizeSpace => map_string(args, |s| s.split_whitespace().collect::<Vec<_>>().join(" ")),
        XPathFunction::NormalizeUnicode => normalize_unicode(args),
        XPathFunction::UpperCase => map_string(args, str::to_uppercase),
        XPathFunction::LowerCase => map_string(args, str::to_lowercase),
        XPathFunction::EncodeForUri => encode_for_uri(args),
        XPathFunction::Replace => replace(args),
        XPathFunction::EscapeHtmlUri => {
            let term = args.term(0)?;
            let literal = string_literal(&term, args.name())?;
            Ok(Term::string(utf8_percent_encode(literal.lexical(), CONTROLS).to_string()))
        }
        XPathFunction::Compare => {
            let (a, b) = (args.term(0)?, args.term(1)?);
            let (a, b) = (string_literal(&a, args.name())?, string_literal(&b, args.name())?);
            let value = match a.lexical().cmp(b.lexical()) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            };
            Ok(Term::integer(value))
        }
        XPathFunction::Abs => Ok(args.numeric(0)?.abs()?.into_term()),
        XPathFunction::Ceiling => Ok(args.numeric(0)?.ceil().into_term()),
        XPathFunction::Floor => Ok(args.numeric(0)?.floor().into_term()),
        XPathFunction::Round => Ok(args.numeric(0)?.round().into_term()),
        XPathFunction::RoundHalfToEven => {
            let value = args.numeric(0)?;
            let precision = match args.optional(1)? {
                Some(precision) => integer_arg(&precision, args.name())?,
                None => 0,
            };
            Ok(value.round_half_to_even(precision).into_term())
        }
        XPathFunction::YearFromDateTime => date_part(args, |dt| dt.local.year() as i64),
        XPathFunction::MonthFromDateTime => date_part(args, |dt| dt.local.month() as i64),
        XPathFunction::DayFromDateTime => date_part(args, |dt| dt.local.day() as i64),
        XPathFunction::HoursFromDateTime => date_part(args, |dt| dt.local.hour() as i64),
        XPathFunction::MinutesFromDateTime => date_part(args, |dt| dt.local.minute() as i64),
        XPathFunction::SecondsFromDateTime => seconds(args),
        XPathFunction::TimezoneFromDateTime => timezone(args),
    }
}

/// substring-before / substring-after
fn split_around(args: &CallArgs<'_>, before: bool) -> EvaluationResult<Term> {
    let (a, b) = (args.term(0)?, args.term(1)?);
    let (text, needle) = (string_literal(&a, args.name())?, string_literal(&b, args.name())?);
    check_compatible(text, needle, args.name())?;
    let lexical = text.lexical();
    match lexical.find(needle.lexical()) {
        Some(index) if before => Ok(string_like(&lexical[..index], text)),
        Some(index) => Ok(string_like(&lexical[index + needle.lexical().len()..], text)),
        None => Ok(Term::string("")),
    }
}

fn normalize_unicode(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let term = args.term(0)?;
    let literal = string_literal(&term, args.name())?;
    let form = match args.optional(1)? {
        Some(form) => simple_string(&form, args.name())?.trim().to_ascii_uppercase(),
        None => "NFC".to_string(),
    };
    let text = literal.lexical();
    let normalized: String = match form.as_str() {
        "" => text.to_string(),
        "NFC" => text.nfc().collect(),
        "NFD" => text.nfd().collect(),
        "NFKC" => text.nfkc().collect(),
        "NFKD" => text.nfkd().collect(),
        other => {
            return Err(EvaluationError::domain(
                args.name(),
                format!("unsupported normalization form '{other}'"),
            ));
        }
    };
    Ok(string_like(normalized, literal))
}

fn replace(args: &CallArgs<'_>) -> EvaluationResult<Term> {
    let name = args.name();
    let (input, pattern, replacement) = (args.term(0)?, args.term(1)?, args.term(2)?);
    let flags = args.optional(3)?;
    let input = string_literal(&input, name)?;
    let pattern = simple_string(&pattern, name)?;
    let flags = match &flags {
        Some(flags) => simple_string(flags, name)?,
        None => "",
    };
    let re = compile_regex(pattern, flags, args.ctx().regex_cache_size())?;
    if re.is_match("") {
        return Err(EvaluationError::domain(name, "pattern matches the empty string"));
    }
    let replacement = if flags.contains('q') {
        simple_string(&replacement, name)?.replace('$', "$$")
    } else {
        xpath_replacement(simple_string(&replacement, name)?)?
    };
    Ok(string_like(
        re.replace_all(input.lexical(), replacement.as_str()).into_owned(),
        input,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::call;
    use super::*;
    use crate::ast::Function;
    use crate::model::Literal;
    use crate::model::vocab::xsd;
    use rust_decimal::Decimal;

    fn xpath(function: XPathFunction, args: Vec<Term>) -> EvaluationResult<Term> {
        call(Function::XPath(function), args)
    }

    #[test]
    fn test_substring_before_after() {
        let args = vec![Term::Literal(Literal::lang_tagged("abc", "en")), Term::string("b")];
        assert_eq!(
            xpath(XPathFunction::SubstringBefore, args.clone()),
            Ok(Term::Literal(Literal::lang_tagged("a", "en")))
        );
        assert_eq!(
            xpath(XPathFunction::SubstringAfter, args),
            Ok(Term::Literal(Literal::lang_tagged("c", "en")))
        );
        let args = vec![Term::string("abc"), Term::string("z")];
        assert_eq!(xpath(XPathFunction::SubstringAfter, args), Ok(Term::string("")));
    }

    #[test]
    fn test_replace() {
        let args = vec![
            Term::string("2024-05-06"),
            Term::string("(\\d+)-(\\d+)-(\\d+)"),
            Term::string("$3/$2/$1"),
        ];
        assert_eq!(xpath(XPathFunction::Replace, args), Ok(Term::string("06/05/2024")));

        let args = vec![Term::string("abc"), Term::string("x*"), Term::string("-")];
        assert!(matches!(
            xpath(XPathFunction::Replace, args),
            Err(EvaluationError::DomainError { .. })
        ));

        let args = vec![Term::string("AbA"), Term::string("a"), Term::string("$"), Term::string("iq")];
        assert_eq!(xpath(XPathFunction::Replace, args), Ok(Term::string("$b$")));
    }

    #[test]
    fn test_normalize() {
        let args = vec![Term::string("  a \t b\n ")];
        assert_eq!(xpath(XPathFunction::NormalizeSpace, args), Ok(Term::string("a b")));

        let decomposed = "e\u{0301}";
        let args = vec![Term::string(decomposed)];
        assert_eq!(xpath(XPathFunction::NormalizeUnicode, args), Ok(Term::string("\u{00e9}")));
        let args = vec![Term::string(decomposed), Term::string("")];
        assert_eq!(xpath(XPathFunction::NormalizeUnicode, args), Ok(Term::string(decomposed)));
        let args = vec![Term::string(decomposed), Term::string("FULLY-NORMALIZED")];
        assert!(xpath(XPathFunction::NormalizeUnicode, args).is_err());
    }

    #[test]
    fn test_compare_and_escape() {
        let args = vec![Term::string("a"), Term::string("b")];
        assert_eq!(xpath(XPathFunction::Compare, args), Ok(Term::integer(-1)));
        let args = vec![Term::string("http://example.org/caf\u{00e9} x")];
        assert_eq!(
            xpath(XPathFunction::EscapeHtmlUri, args),
            Ok(Term::string("http://example.org/caf%C3%A9 x"))
        );
    }

    #[test]
    fn test_numeric_functions() {
        let args = vec![Term::typed("2.5", xsd::DECIMAL)];
        assert_eq!(
            xpath(XPathFunction::RoundHalfToEven, args),
            Ok(Term::decimal(Decimal::new(2, 0)))
        );
        let args = vec![Term::double(3.567812), Term::integer(2)];
        assert_eq!(xpath(XPathFunction::RoundHalfToEven, args), Ok(Term::double(3.57)));
        assert_eq!(xpath(XPathFunction::Ceiling, vec![Term::double(1.1)]), Ok(Term::double(2.0)));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(xpath(XPathFunction::Boolean, vec![Term::string("x")]), Ok(Term::boolean(true)));
        assert_eq!(xpath(XPathFunction::Boolean, vec![Term::integer(0)]), Ok(Term::boolean(false)));
    }
}
