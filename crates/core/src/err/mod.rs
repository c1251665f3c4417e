use chrono::{DateTime, Utc};
use thiserror::Error;

/// An error raised while assembling a guardrails configuration.
///
/// Rule violations discovered during validation are not errors; they are
/// returned as data in a [`crate::guard::verdict::Verdict`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The guardrail configuration string contained an unknown rule name
	#[error(
		"Unrecognized guardrail `{0}`. Valid guardrails are: `disallow-explicit-name-label`, `require-label-matcher`, `disallow-blanket-regex`"
	)]
	InvalidGuardrail(String),

	/// A time range ended before it started
	#[error("Invalid time range: start {start} is after end {end}")]
	InvalidTimeRange {
		/// The requested start of the window
		start: DateTime<Utc>,
		/// The requested end of the window
		end: DateTime<Utc>,
	},
}
