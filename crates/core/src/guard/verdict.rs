//! Validation outcomes and the reasons a query gets rejected.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// A reason for rejecting a query.
///
/// Every variant renders as a single actionable sentence naming the exact
/// metric, label, selector, or limit involved, so callers can surface the
/// message directly to whoever wrote the query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Violation {
	/// The query is not parseable PromQL
	#[error("Query `{query}` is not valid PromQL: {message}")]
	BadSyntax {
		query: String,
		message: String,
	},
	/// The metadata snapshot could not be fetched, so safety is unknown
	#[error(
		"Cannot verify query safety: metadata unavailable ({message}). The query was rejected rather than run unchecked"
	)]
	StatsUnavailable {
		message: String,
	},
	/// The query references a metric with no series in the window
	#[error(
		"Metric `{metric}` does not exist in the backend for the queried time range. Check the metric name or list available metrics first"
	)]
	UnknownMetric {
		metric: String,
	},
	/// The query matches on a label with no values in the window
	#[error(
		"Label `{label}` does not exist in the backend for the queried time range. Check the label name or list available labels first"
	)]
	UnknownLabel {
		label: String,
	},
	/// A selector matches on `__name__` rather than naming the metric
	#[error(
		"Selector `{selector}` matches on `__name__` instead of using a bare metric name. Write the metric name directly, e.g. `metric_name{{...}}`"
	)]
	ExplicitNameLabel {
		selector: String,
	},
	/// A selector has no label matcher at all
	#[error(
		"Selector `{selector}` has no label matcher and would read every series of the metric. Add at least one label matcher, e.g. `{{job=\"...\"}}`"
	)]
	MissingLabelMatcher {
		selector: String,
	},
	/// A referenced metric has more series than the configured limit
	#[error(
		"Metric `{metric}` has {series} series, which exceeds the limit of {limit}. Narrow the query or raise the limit"
	)]
	MetricCardinalityExceeded {
		metric: String,
		series: u64,
		limit: u64,
	},
	/// A match-everything regex was used while the feature is disabled
	#[error(
		"Matcher on label `{label}` uses the match-everything pattern `{pattern}`, which is disabled. Use a more specific pattern or an equality matcher"
	)]
	BlanketRegexDisallowed {
		label: String,
		pattern: String,
	},
	/// A match-everything regex targets a label with too many values
	#[error(
		"Label `{label}` has {values} distinct values, which exceeds the limit of {limit} for match-everything regexes. Use a more specific pattern"
	)]
	LabelCardinalityExceeded {
		label: String,
		values: u64,
		limit: u64,
	},
}

impl Violation {
	/// A stable machine-readable code for the violation kind.
	pub fn code(&self) -> &'static str {
		match self {
			Self::BadSyntax {
				..
			} => "syntax-error",
			Self::StatsUnavailable {
				..
			} => "stats-unavailable",
			Self::UnknownMetric {
				..
			} => "metric-not-found",
			Self::UnknownLabel {
				..
			} => "label-not-found",
			Self::ExplicitNameLabel {
				..
			} => "explicit-name-label",
			Self::MissingLabelMatcher {
				..
			} => "missing-label-matcher",
			Self::MetricCardinalityExceeded {
				..
			} => "metric-cardinality-exceeded",
			Self::BlanketRegexDisallowed {
				..
			} => "blanket-regex-disallowed",
			Self::LabelCardinalityExceeded {
				..
			} => "label-cardinality-exceeded",
		}
	}
}

/// The outcome of validating a query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Verdict {
	/// The query passed every enabled guardrail
	Safe,
	/// The query violated a guardrail and must not run
	Unsafe(Violation),
}

impl Verdict {
	/// Whether the query may be executed.
	pub fn is_safe(&self) -> bool {
		matches!(self, Self::Safe)
	}

	/// The human-readable rejection reason, if any.
	pub fn reason(&self) -> Option<String> {
		match self {
			Self::Safe => None,
			Self::Unsafe(violation) => Some(violation.to_string()),
		}
	}

	/// The violation behind an unsafe verdict, if any.
	pub fn violation(&self) -> Option<&Violation> {
		match self {
			Self::Safe => None,
			Self::Unsafe(violation) => Some(violation),
		}
	}
}

impl From<Violation> for Verdict {
	fn from(violation: Violation) -> Self {
		Self::Unsafe(violation)
	}
}

impl std::fmt::Display for Verdict {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Safe => write!(f, "safe"),
			Self::Unsafe(violation) => write!(f, "unsafe: {violation}"),
		}
	}
}

impl Serialize for Verdict {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self {
			Self::Safe => {
				let mut state = serializer.serialize_struct("Verdict", 1)?;
				state.serialize_field("safe", &true)?;
				state.end()
			}
			Self::Unsafe(violation) => {
				let mut state = serializer.serialize_struct("Verdict", 2)?;
				state.serialize_field("safe", &false)?;
				state.serialize_field("reason", &violation.to_string())?;
				state.end()
			}
		}
	}
}
