//! Selector traversal and name extraction over parsed queries.
//!
//! A selector's safety is independent of its syntactic position, so every
//! function here reaches selectors nested inside aggregations, function
//! calls, unary and binary expressions, parens, subqueries, and matrix
//! selectors uniformly. Extraction results are ordered sets, keeping
//! diagnostics deterministic for identical queries.

use std::collections::BTreeSet;

use promql_parser::label::{METRIC_NAME, MatchOp, Matcher};
use promql_parser::parser::{Expr, VectorSelector};

/// Collects every vector selector in the expression tree, depth-first.
pub fn selectors(expr: &Expr) -> Vec<&VectorSelector> {
	let mut out = Vec::new();
	collect(expr, &mut out);
	out
}

fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a VectorSelector>) {
	match expr {
		Expr::VectorSelector(vs) => out.push(vs),
		Expr::MatrixSelector(ms) => out.push(&ms.vs),
		Expr::Subquery(sq) => collect(&sq.expr, out),
		Expr::Aggregate(agg) => {
			collect(&agg.expr, out);
			if let Some(param) = &agg.param {
				collect(param, out);
			}
		}
		Expr::Binary(b) => {
			collect(&b.lhs, out);
			collect(&b.rhs, out);
		}
		Expr::Paren(p) => collect(&p.expr, out),
		Expr::Call(call) => {
			for arg in &call.args.args {
				collect(arg, out);
			}
		}
		Expr::Unary(u) => collect(&u.expr, out),
		Expr::NumberLiteral(_) | Expr::StringLiteral(_) | Expr::Extension(_) => {}
	}
}

/// Iterates every matcher on a selector, including OR branches.
pub(crate) fn matchers(vs: &VectorSelector) -> impl Iterator<Item = &Matcher> {
	vs.matchers.matchers.iter().chain(vs.matchers.or_matchers.iter().flatten())
}

/// The selector's bare metric name, when it has one.
pub(crate) fn bare_name(vs: &VectorSelector) -> Option<&str> {
	vs.name.as_deref().filter(|name| !name.is_empty())
}

/// The distinct metric names a query references.
///
/// A selector contributes its bare name when present, plus the value of any
/// equality matcher on `__name__`.
pub fn metric_names(expr: &Expr) -> BTreeSet<String> {
	let mut names = BTreeSet::new();
	for vs in selectors(expr) {
		if let Some(name) = bare_name(vs) {
			names.insert(name.to_owned());
		}
		for m in matchers(vs) {
			if m.name == METRIC_NAME && m.op == MatchOp::Equal {
				names.insert(m.value.clone());
			}
		}
	}
	names
}

/// The distinct label names a query matches on, `__name__` excluded.
pub fn label_names(expr: &Expr) -> BTreeSet<String> {
	let mut names = BTreeSet::new();
	for vs in selectors(expr) {
		for m in matchers(vs) {
			if m.name != METRIC_NAME {
				names.insert(m.name.clone());
			}
		}
	}
	names
}

/// The distinct labels matched with a regex that accepts every value.
pub fn blanket_regex_labels(expr: &Expr) -> BTreeSet<String> {
	let mut names = BTreeSet::new();
	for vs in selectors(expr) {
		for m in matchers(vs) {
			if is_blanket_regex(m) {
				names.insert(m.name.clone());
			}
		}
	}
	names
}

/// The first blanket regex matcher in the query, as label and pattern.
pub(crate) fn first_blanket_regex(expr: &Expr) -> Option<(String, String)> {
	selectors(expr)
		.into_iter()
		.flat_map(matchers)
		.find(|m| is_blanket_regex(m))
		.map(|m| (m.name.clone(), m.value.clone()))
}

/// Whether a matcher is a regex which matches any value.
pub(crate) fn is_blanket_regex(m: &Matcher) -> bool {
	matches!(m.op, MatchOp::Re(_) | MatchOp::NotRe(_)) && matches!(m.value.as_str(), ".*" | ".+")
}

/// Whether a selector filters on anything besides the metric name.
pub(crate) fn has_label_matcher(vs: &VectorSelector) -> bool {
	matchers(vs).any(|m| m.name != METRIC_NAME)
}

/// Whether a selector carries an explicit `__name__` matcher.
pub(crate) fn has_name_matcher(vs: &VectorSelector) -> bool {
	matchers(vs).any(|m| m.name == METRIC_NAME)
}

/// Renders a selector roughly the way it was written, for diagnostics.
pub(crate) fn render_selector(vs: &VectorSelector) -> String {
	let mut out = String::new();
	if let Some(name) = bare_name(vs) {
		out.push_str(name);
	}
	let list = matchers(vs)
		.map(|m| format!("{}{}\"{}\"", m.name, op_symbol(&m.op), m.value))
		.collect::<Vec<_>>();
	if !list.is_empty() || out.is_empty() {
		out.push('{');
		out.push_str(&list.join(","));
		out.push('}');
	}
	out
}

fn op_symbol(op: &MatchOp) -> &'static str {
	match op {
		MatchOp::Equal => "=",
		MatchOp::NotEqual => "!=",
		MatchOp::Re(_) => "=~",
		MatchOp::NotRe(_) => "!~",
	}
}

#[cfg(test)]
mod tests {
	use promql_parser::parser;

	use super::*;

	fn parse(query: &str) -> Expr {
		parser::parse(query).unwrap()
	}

	fn set(items: &[&str]) -> BTreeSet<String> {
		items.iter().map(|s| (*s).to_owned()).collect()
	}

	#[test]
	fn finds_selectors_under_aggregation_and_function() {
		let expr = parse(r#"sum by (job) (rate(http_requests_total{job="api"}[5m]))"#);
		assert_eq!(selectors(&expr).len(), 1);
		assert_eq!(metric_names(&expr), set(&["http_requests_total"]));
		assert_eq!(label_names(&expr), set(&["job"]));
	}

	#[test]
	fn finds_selectors_on_both_sides_of_binary_expression() {
		let expr = parse(r#"foo{job="api"} / on(instance) bar{instance="a"}"#);
		assert_eq!(selectors(&expr).len(), 2);
		assert_eq!(metric_names(&expr), set(&["bar", "foo"]));
		assert_eq!(label_names(&expr), set(&["instance", "job"]));
	}

	#[test]
	fn finds_selector_inside_subquery() {
		let expr = parse(r#"max_over_time(rate(foo{job="api"}[5m])[30m:1m])"#);
		assert_eq!(metric_names(&expr), set(&["foo"]));
	}

	#[test]
	fn finds_selector_in_aggregation_parameter() {
		let expr = parse(r#"topk(scalar(limit_setting{tier="a"}), foo{job="api"})"#);
		assert_eq!(metric_names(&expr), set(&["foo", "limit_setting"]));
	}

	#[test]
	fn literals_contribute_nothing() {
		let expr = parse("1 + 2");
		assert!(selectors(&expr).is_empty());
		assert!(metric_names(&expr).is_empty());
	}

	#[test]
	fn explicit_name_matcher_counts_as_metric_name() {
		let expr = parse(r#"{__name__="up"}"#);
		assert_eq!(metric_names(&expr), set(&["up"]));
		// The metric-name label never counts as a label
		assert!(label_names(&expr).is_empty());
		let vs = selectors(&expr)[0];
		assert!(bare_name(vs).is_none());
		assert!(has_name_matcher(vs));
		assert!(!has_label_matcher(vs));
	}

	#[test]
	fn regex_matcher_on_name_is_not_a_metric_name() {
		let expr = parse(r#"{__name__=~"up.*", job="api"}"#);
		assert!(metric_names(&expr).is_empty());
		assert_eq!(label_names(&expr), set(&["job"]));
	}

	#[test]
	fn duplicate_references_are_deduplicated() {
		let expr = parse(r#"foo{job="a"} + foo{job="b"}"#);
		assert_eq!(metric_names(&expr), set(&["foo"]));
		assert_eq!(label_names(&expr), set(&["job"]));
	}

	#[test]
	fn blanket_regex_detection() {
		let expr = parse(r#"cpu_usage{pod=~".*"}"#);
		assert_eq!(blanket_regex_labels(&expr), set(&["pod"]));
		let expr = parse(r#"cpu_usage{pod!~".+"}"#);
		assert_eq!(blanket_regex_labels(&expr), set(&["pod"]));
		let (label, pattern) = first_blanket_regex(&expr).unwrap();
		assert_eq!(label, "pod");
		assert_eq!(pattern, ".+");
	}

	#[test]
	fn prefixed_regex_is_not_blanket() {
		let expr = parse(r#"cpu_usage{pod=~"api-.*", node=".+x"}"#);
		assert!(blanket_regex_labels(&expr).is_empty());
		assert!(first_blanket_regex(&expr).is_none());
	}

	#[test]
	fn equality_matcher_with_wildcard_text_is_not_blanket() {
		// `.*` only matches everything under a regex operator
		let expr = parse(r#"cpu_usage{pod=".*"}"#);
		assert!(blanket_regex_labels(&expr).is_empty());
	}

	#[test]
	fn matrix_selector_contributes_its_inner_selector() {
		let expr = parse(r#"rate(foo{job="api"}[1m])"#);
		assert_eq!(metric_names(&expr), set(&["foo"]));
		assert_eq!(label_names(&expr), set(&["job"]));
	}

	#[test]
	fn renders_selectors_for_diagnostics() {
		let expr = parse(r#"http_requests_total{job="api"}"#);
		let vs = selectors(&expr)[0];
		assert_eq!(render_selector(vs), r#"http_requests_total{job="api"}"#);

		let expr = parse("http_requests_total");
		let vs = selectors(&expr)[0];
		assert_eq!(render_selector(vs), "http_requests_total");

		let expr = parse(r#"{__name__="up"}"#);
		let vs = selectors(&expr)[0];
		assert_eq!(render_selector(vs), r#"{__name__="up"}"#);
	}
}
