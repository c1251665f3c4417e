//! Query safety guardrails.
//!
//! [`QueryValidator::validate`] decides whether a PromQL query is safe to
//! run before any sample data is read. Checks run in a fixed order so that
//! the same query and snapshot always produce the same verdict: parse,
//! metric existence, label existence, per-selector structure, metric
//! cardinality, then blanket regexes. The first violated check rejects the
//! query and the rest are skipped.

pub mod config;
pub mod verdict;
pub mod walker;

use promql_parser::parser::{self, Expr};

use self::config::Guardrails;
use self::verdict::{Verdict, Violation};
use crate::stats::{StatsProvider, TimeRange, TsdbStats};

const TARGET: &str = "promguard::core::guard";

/// Validates queries against a guardrail configuration.
///
/// The validator holds the [`StatsProvider`] it fetches cardinality
/// snapshots from. It is cheap to share behind an `Arc` and keeps no state
/// between validations.
pub struct QueryValidator<P> {
	/// Source of cardinality snapshots
	stats: P,
}

impl<P: StatsProvider> QueryValidator<P> {
	/// Creates a validator backed by the given provider.
	pub fn new(stats: P) -> Self {
		Self {
			stats,
		}
	}

	/// Validates a query for the given time range.
	///
	/// With no guardrail configuration the query is safe by definition and
	/// neither the parser nor the provider is invoked. Otherwise a single
	/// snapshot is fetched and every enabled check runs against it. A
	/// snapshot fetch failure rejects the query, since safety cannot be
	/// verified without one.
	#[instrument(level = "trace", target = "promguard::core::guard", skip(self, guardrails))]
	pub async fn validate(
		&self,
		query: &str,
		range: TimeRange,
		guardrails: Option<&Guardrails>,
	) -> Verdict {
		let Some(rules) = guardrails else {
			trace!(target: TARGET, "No guardrails configured, skipping validation");
			return Verdict::Safe;
		};
		let expr = match parser::parse(query) {
			Ok(expr) => expr,
			Err(error) => {
				debug!(target: TARGET, "Query failed to parse: {error}");
				return Violation::BadSyntax {
					query: query.to_owned(),
					message: error.to_string(),
				}
				.into();
			}
		};
		let stats = match self.stats.fetch_stats(range).await {
			Ok(stats) => stats,
			Err(error) => {
				warn!(target: TARGET, "Snapshot fetch failed, rejecting query: {error}");
				return Violation::StatsUnavailable {
					message: error.to_string(),
				}
				.into();
			}
		};
		let verdict = match check(&expr, rules, &stats) {
			Ok(()) => Verdict::Safe,
			Err(violation) => violation.into(),
		};
		debug!(target: TARGET, verdict = %verdict, "Validation complete");
		verdict
	}
}

/// Runs every check against one snapshot, stopping at the first violation.
fn check(expr: &Expr, rules: &Guardrails, stats: &TsdbStats) -> Result<(), Violation> {
	check_metrics_exist(expr, stats)?;
	check_labels_exist(expr, stats)?;
	check_selectors(expr, rules)?;
	check_metric_cardinality(expr, rules, stats)?;
	check_blanket_regex(expr, rules, stats)?;
	Ok(())
}

/// Every referenced metric must have at least one series in the window.
fn check_metrics_exist(expr: &Expr, stats: &TsdbStats) -> Result<(), Violation> {
	for metric in walker::metric_names(expr) {
		match stats.metric_series(&metric) {
			Some(series) if series > 0 => (),
			_ => {
				return Err(Violation::UnknownMetric {
					metric,
				});
			}
		}
	}
	Ok(())
}

/// Every label matched on must be present in the window.
fn check_labels_exist(expr: &Expr, stats: &TsdbStats) -> Result<(), Violation> {
	for label in walker::label_names(expr) {
		if stats.label_values(&label).is_none() {
			return Err(Violation::UnknownLabel {
				label,
			});
		}
	}
	Ok(())
}

/// Enforces the per-selector structural rules.
fn check_selectors(expr: &Expr, rules: &Guardrails) -> Result<(), Violation> {
	for vs in walker::selectors(expr) {
		if rules.disallow_explicit_name_label
			&& walker::bare_name(vs).is_none()
			&& walker::has_name_matcher(vs)
		{
			return Err(Violation::ExplicitNameLabel {
				selector: walker::render_selector(vs),
			});
		}
		if rules.require_label_matcher && !walker::has_label_matcher(vs) {
			return Err(Violation::MissingLabelMatcher {
				selector: walker::render_selector(vs),
			});
		}
	}
	Ok(())
}

/// Rejects metrics whose series count exceeds the configured limit.
fn check_metric_cardinality(
	expr: &Expr,
	rules: &Guardrails,
	stats: &TsdbStats,
) -> Result<(), Violation> {
	let limit = rules.max_metric_cardinality;
	if limit == 0 {
		return Ok(());
	}
	for metric in walker::metric_names(expr) {
		if let Some(series) = stats.metric_series(&metric) {
			if series > limit {
				return Err(Violation::MetricCardinalityExceeded {
					metric,
					series,
					limit,
				});
			}
		}
	}
	Ok(())
}

/// Rejects match-everything regexes on labels above the cardinality limit.
///
/// With a limit of zero every blanket regex is rejected outright. A label
/// missing from the snapshot cannot exceed the limit and passes.
fn check_blanket_regex(
	expr: &Expr,
	rules: &Guardrails,
	stats: &TsdbStats,
) -> Result<(), Violation> {
	if !rules.disallow_blanket_regex {
		return Ok(());
	}
	let limit = rules.max_label_cardinality;
	if limit == 0 {
		if let Some((label, pattern)) = walker::first_blanket_regex(expr) {
			return Err(Violation::BlanketRegexDisallowed {
				label,
				pattern,
			});
		}
		return Ok(());
	}
	for label in walker::blanket_regex_labels(expr) {
		if let Some(values) = stats.label_values(&label) {
			if values > limit {
				return Err(Violation::LabelCardinalityExceeded {
					label,
					values,
					limit,
				});
			}
		}
	}
	Ok(())
}
