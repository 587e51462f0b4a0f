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

//! Resolve-then-evaluate tests across all vocabularies

use chrono::{FixedOffset, TimeZone};
use octofhir_sparql_expr::ast::BinaryOperator;
use octofhir_sparql_expr::model::vocab::{
    ARQ_FUNCTIONS, LEVIATHAN_FUNCTIONS, SPARQL_FUNCTIONS, XPATH_FUNCTIONS, xsd,
};
use octofhir_sparql_expr::{
    EvaluationError, EvaluationResult, ExpressionNode, FunctionRegistry, Iri, NamedArguments,
    NumericType, NumericValue, SimpleEvaluationContext, Term,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn constant(term: Term) -> ExpressionNode {
    ExpressionNode::constant(term)
}

fn resolve(uri: &str, args: Vec<ExpressionNode>) -> ExpressionNode {
    FunctionRegistry::global()
        .resolve(&Iri::new(uri), args, &NamedArguments::new(), &[])
        .unwrap()
}

fn eval(uri: &str, args: Vec<Term>) -> EvaluationResult<Term> {
    let node = resolve(uri, args.into_iter().map(constant).collect());
    let mut ctx = SimpleEvaluationContext::new();
    let row = ctx.push_row(Vec::<(String, Term)>::new());
    node.evaluate(&ctx, row)
}

fn ns(namespace: &str, local_name: &str) -> String {
    format!("{namespace}{local_name}")
}

#[rstest]
#[case(ns(SPARQL_FUNCTIONS, "strlen"), vec![Term::string("chat")], Term::integer(4))]
#[case(ns(SPARQL_FUNCTIONS, "concat"), vec![Term::string("foo"), Term::string("bar")], Term::string("foobar"))]
#[case(ns(SPARQL_FUNCTIONS, "if"), vec![Term::boolean(false), Term::integer(1), Term::integer(2)], Term::integer(2))]
#[case(ns(SPARQL_FUNCTIONS, "abs"), vec![Term::integer(-7)], Term::integer(7))]
#[case(ns(XPATH_FUNCTIONS, "upper-case"), vec![Term::string("abc")], Term::string("ABC"))]
#[case(ns(XPATH_FUNCTIONS, "boolean"), vec![Term::string("")], Term::boolean(false))]
#[case(ns(ARQ_FUNCTIONS, "localname"), vec![Term::iri("http://example.org/ns#thing")], Term::string("thing"))]
#[case(ns(ARQ_FUNCTIONS, "namespace"), vec![Term::iri("http://example.org/ns#thing")], Term::string("http://example.org/ns#"))]
#[case(ns(ARQ_FUNCTIONS, "strjoin"), vec![Term::string("-"), Term::string("a"), Term::string("b")], Term::string("a-b"))]
#[case(ns(LEVIATHAN_FUNCTIONS, "sq"), vec![Term::integer(3)], Term::integer(9))]
#[case(ns(LEVIATHAN_FUNCTIONS, "factorial"), vec![Term::integer(5)], Term::integer(120))]
#[case(xsd::INTEGER.to_string(), vec![Term::string("42")], Term::integer(42))]
#[case(xsd::BOOLEAN.to_string(), vec![Term::string("true")], Term::boolean(true))]
#[case(xsd::STRING.to_string(), vec![Term::iri("http://example.org/a")], Term::string("http://example.org/a"))]
fn test_resolve_then_evaluate(#[case] uri: String, #[case] args: Vec<Term>, #[case] expected: Term) {
    assert_eq!(eval(&uri, args), Ok(expected));
}

#[rstest]
#[case(ns(LEVIATHAN_FUNCTIONS, "factorial"), vec![Term::integer(-1)])]
#[case(ns(LEVIATHAN_FUNCTIONS, "reciprocal"), vec![Term::integer(0)])]
#[case(ns(ARQ_FUNCTIONS, "substring"), vec![Term::string("abc"), Term::integer(5)])]
fn test_domain_errors(#[case] uri: String, #[case] args: Vec<Term>) {
    assert!(matches!(eval(&uri, args), Err(EvaluationError::DomainError { .. })));
}

#[rstest]
#[case(Term::typed("1234.5", xsd::DECIMAL), Term::integer(-2), NumericValue::Decimal(1200.into()))]
#[case(Term::typed("1234.5", xsd::DOUBLE), Term::integer(-2), NumericValue::Double(1200.0))]
#[case(Term::integer(5), Term::integer(i64::MIN), NumericValue::Integer(0))]
#[case(Term::typed("2.345", xsd::DECIMAL), Term::integer(2), NumericValue::Decimal(rust_decimal::Decimal::new(234, 2)))]
fn test_round_half_to_even_precision(#[case] value: Term, #[case] precision: Term, #[case] expected: NumericValue) {
    let result = eval(&ns(XPATH_FUNCTIONS, "round-half-to-even"), vec![value, precision]).unwrap();
    assert_eq!(NumericValue::from_term(&result, "test"), Ok(expected));
}

#[rstest]
#[case(vec![Term::integer(0), Term::typed("INF", xsd::DOUBLE)])]
#[case(vec![Term::double(-f64::MAX), Term::double(f64::MAX)])]
fn test_random_over_unbounded_range_is_a_domain_error(#[case] args: Vec<Term>) {
    assert!(matches!(
        eval(&ns(LEVIATHAN_FUNCTIONS, "rnd"), args),
        Err(EvaluationError::DomainError { .. })
    ));
}

#[test]
fn test_bad_cast_is_an_evaluation_error() {
    assert!(matches!(
        eval(xsd::INTEGER, vec![Term::string("forty-two")]),
        Err(EvaluationError::InvalidLexicalForm { .. })
    ));
}

#[test]
fn test_variables_and_coalesce() {
    let node = resolve(
        &ns(SPARQL_FUNCTIONS, "coalesce"),
        vec![ExpressionNode::variable("missing"), ExpressionNode::variable("x")],
    );
    let mut ctx = SimpleEvaluationContext::new();
    let row = ctx.push_row([("x", Term::integer(3))]);
    assert_eq!(node.evaluate(&ctx, row), Ok(Term::integer(3)));

    let strlen = resolve(&ns(SPARQL_FUNCTIONS, "strlen"), vec![ExpressionNode::variable("missing")]);
    assert!(matches!(strlen.evaluate(&ctx, row), Err(EvaluationError::UnboundVariable { .. })));
}

#[test]
fn test_now_comes_from_the_context() {
    let now = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
        .unwrap();
    let mut ctx = SimpleEvaluationContext::new().with_now(now);
    let row = ctx.push_row(Vec::<(String, Term)>::new());

    let core = resolve(&ns(SPARQL_FUNCTIONS, "now"), vec![]);
    let arq = resolve(&ns(ARQ_FUNCTIONS, "now"), vec![]);
    assert_eq!(core.evaluate(&ctx, row), Ok(Term::date_time(now)));
    assert_eq!(arq.evaluate(&ctx, row), core.evaluate(&ctx, row));
}

#[test]
fn test_numeric_promotion_in_arithmetic() {
    let sum = ExpressionNode::binary_op(
        BinaryOperator::Add,
        constant(Term::integer(1)),
        constant(Term::typed("1.5", xsd::DECIMAL)),
    );
    let mut ctx = SimpleEvaluationContext::new();
    let row = ctx.push_row(Vec::<(String, Term)>::new());
    let result = sum.evaluate(&ctx, row).unwrap();
    assert_eq!(NumericType::of_term(&result), NumericType::Decimal);

    let mixed = ExpressionNode::binary_op(
        BinaryOperator::Add,
        constant(Term::integer(1)),
        constant(Term::string("one")),
    );
    assert!(mixed.evaluate(&ctx, row).is_err());
}

/// Group of three rows binding ?x to 1, 2, 2; the group is keyed on the first row
fn grouped_context() -> SimpleEvaluationContext {
    let mut ctx = SimpleEvaluationContext::new();
    let members: Vec<_> = [1, 2, 2]
        .into_iter()
        .map(|value| ctx.push_row([("x", Term::integer(value))]))
        .collect();
    ctx.set_group(members[0], members);
    ctx
}

#[rstest]
#[case(ns(SPARQL_FUNCTIONS, "count"), vec![ExpressionNode::variable("x")], Term::integer(3))]
#[case(ns(SPARQL_FUNCTIONS, "sum"), vec![ExpressionNode::variable("x")], Term::integer(5))]
#[case(ns(SPARQL_FUNCTIONS, "max"), vec![ExpressionNode::variable("x")], Term::integer(2))]
#[case(ns(LEVIATHAN_FUNCTIONS, "mode"), vec![ExpressionNode::variable("x")], Term::integer(2))]
#[case(ns(LEVIATHAN_FUNCTIONS, "nmin"), vec![ExpressionNode::variable("x")], Term::integer(1))]
#[case(
    ns(LEVIATHAN_FUNCTIONS, "median"),
    vec![ExpressionNode::Distinct, ExpressionNode::variable("x")],
    Term::integer(2)
)]
#[case(
    ns(LEVIATHAN_FUNCTIONS, "all"),
    vec![ExpressionNode::variable("x")],
    Term::boolean(true)
)]
fn test_aggregates_over_a_group(#[case] uri: String, #[case] args: Vec<ExpressionNode>, #[case] expected: Term) {
    let node = resolve(&uri, args);
    let ctx = grouped_context();
    assert_eq!(node.evaluate(&ctx, 0), Ok(expected));
}

#[test]
fn test_group_concat_with_separator() {
    let mut named = NamedArguments::new();
    named.insert("SEPARATOR".to_string(), constant(Term::string(",")));
    let node = FunctionRegistry::global()
        .resolve(
            &Iri::new(ns(SPARQL_FUNCTIONS, "group_concat")),
            vec![ExpressionNode::variable("x")],
            &named,
            &[],
        )
        .unwrap();

    let ctx = grouped_context();
    assert_eq!(node.evaluate(&ctx, 0), Ok(Term::string("1,2,2")));
}

#[test]
fn test_aggregate_outside_group() {
    let node = resolve(&ns(SPARQL_FUNCTIONS, "sum"), vec![ExpressionNode::variable("x")]);
    let mut ctx = SimpleEvaluationContext::new();
    let row = ctx.push_row([("x", Term::integer(1))]);
    assert!(matches!(
        node.evaluate(&ctx, row),
        Err(EvaluationError::AggregateOutsideGroup { .. })
    ));
}

#[test]
fn test_display_of_resolved_nodes() {
    let abs = resolve(&ns(SPARQL_FUNCTIONS, "abs"), vec![ExpressionNode::variable("x")]);
    assert_eq!(abs.to_string(), "ABS(?x)");

    let sq = resolve(&ns(LEVIATHAN_FUNCTIONS, "sq"), vec![ExpressionNode::variable("x")]);
    assert_eq!(sq.to_string(), format!("<{LEVIATHAN_FUNCTIONS}sq>(?x)"));

    let cast = resolve(xsd::DOUBLE, vec![ExpressionNode::variable("x")]);
    assert_eq!(cast.to_string(), format!("<{}>(?x)", xsd::DOUBLE));
}
