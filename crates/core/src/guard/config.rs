//! Guardrail selection and thresholds.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cnf;
use crate::err::Error;

/// An individually toggleable safety rule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Guardrail {
	/// Reject selectors that match on `__name__` instead of a bare metric name
	DisallowExplicitNameLabel,
	/// Reject selectors that carry no label matcher at all
	RequireLabelMatcher,
	/// Reject match-everything regexes on high-cardinality labels
	DisallowBlanketRegex,
}

impl Guardrail {
	/// Every rule, in documentation order.
	pub const ALL: [Guardrail; 3] =
		[Self::DisallowExplicitNameLabel, Self::RequireLabelMatcher, Self::DisallowBlanketRegex];

	/// The rule's canonical kebab-case name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::DisallowExplicitNameLabel => "disallow-explicit-name-label",
			Self::RequireLabelMatcher => "require-label-matcher",
			Self::DisallowBlanketRegex => "disallow-blanket-regex",
		}
	}
}

impl std::fmt::Display for Guardrail {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Guardrail {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"disallow-explicit-name-label" => Ok(Self::DisallowExplicitNameLabel),
			"require-label-matcher" => Ok(Self::RequireLabelMatcher),
			"disallow-blanket-regex" => Ok(Self::DisallowBlanketRegex),
			_ => Err(Error::InvalidGuardrail(s.to_owned())),
		}
	}
}

/// The full guardrail configuration for a validation run.
///
/// Presence of a configuration is what switches validation on. Metric and
/// label existence checks run whenever a configuration is present, while
/// each structural rule below only runs when its flag is set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Guardrails {
	/// Reject selectors that match on `__name__` instead of a bare metric name
	pub disallow_explicit_name_label: bool,
	/// Reject selectors that carry no label matcher at all
	pub require_label_matcher: bool,
	/// Reject match-everything regexes on high-cardinality labels
	pub disallow_blanket_regex: bool,
	/// Maximum series a referenced metric may have, 0 disables the check
	pub max_metric_cardinality: u64,
	/// Distinct values above which a blanket regex on a label is rejected,
	/// 0 rejects every blanket regex outright
	pub max_label_cardinality: u64,
}

impl Guardrails {
	/// A configuration with every rule enabled and default thresholds.
	pub fn all() -> Self {
		let mut config = Self {
			max_metric_cardinality: *cnf::DEFAULT_MAX_METRIC_CARDINALITY,
			max_label_cardinality: *cnf::DEFAULT_MAX_LABEL_CARDINALITY,
			..Default::default()
		};
		for rule in Guardrail::ALL {
			config.enable(rule);
		}
		config
	}

	/// Parses a guardrail configuration string.
	///
	/// An empty string or `none` yields no configuration, which disables
	/// validation entirely. `all` enables every rule with default
	/// thresholds. Anything else is a comma-separated list of rule names.
	/// Thresholds are not part of the string form and are set through
	/// [`Self::with_max_metric_cardinality`] and
	/// [`Self::with_max_label_cardinality`].
	pub fn parse(input: &str) -> Result<Option<Self>, Error> {
		let input = input.trim();
		if input.is_empty() || input.eq_ignore_ascii_case("none") {
			return Ok(None);
		}
		if input.eq_ignore_ascii_case("all") {
			return Ok(Some(Self::all()));
		}
		let mut config = Self {
			max_metric_cardinality: *cnf::DEFAULT_MAX_METRIC_CARDINALITY,
			max_label_cardinality: *cnf::DEFAULT_MAX_LABEL_CARDINALITY,
			..Default::default()
		};
		for token in input.split(',').map(str::trim) {
			config.enable(token.parse()?);
		}
		Ok(Some(config))
	}

	/// Switches a rule on.
	pub fn enable(&mut self, rule: Guardrail) {
		match rule {
			Guardrail::DisallowExplicitNameLabel => self.disallow_explicit_name_label = true,
			Guardrail::RequireLabelMatcher => self.require_label_matcher = true,
			Guardrail::DisallowBlanketRegex => self.disallow_blanket_regex = true,
		}
	}

	/// Whether a rule is switched on.
	pub fn is_enabled(&self, rule: Guardrail) -> bool {
		match rule {
			Guardrail::DisallowExplicitNameLabel => self.disallow_explicit_name_label,
			Guardrail::RequireLabelMatcher => self.require_label_matcher,
			Guardrail::DisallowBlanketRegex => self.disallow_blanket_regex,
		}
	}

	/// Sets the series limit for referenced metrics.
	pub fn with_max_metric_cardinality(mut self, limit: u64) -> Self {
		self.max_metric_cardinality = limit;
		self
	}

	/// Sets the distinct-value limit for blanket regex targets.
	pub fn with_max_label_cardinality(mut self, limit: u64) -> Self {
		self.max_label_cardinality = limit;
		self
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("")]
	#[case("   ")]
	#[case("none")]
	#[case("NONE")]
	#[case(" None ")]
	fn parse_disabled_forms(#[case] input: &str) {
		assert_eq!(Guardrails::parse(input).unwrap(), None);
	}

	#[test]
	fn parse_all_enables_every_rule_with_default_thresholds() {
		let config = Guardrails::parse("all").unwrap().unwrap();
		for rule in Guardrail::ALL {
			assert!(config.is_enabled(rule), "{rule} should be enabled");
		}
		assert_eq!(config.max_metric_cardinality, *cnf::DEFAULT_MAX_METRIC_CARDINALITY);
		assert_eq!(config.max_label_cardinality, *cnf::DEFAULT_MAX_LABEL_CARDINALITY);
	}

	#[test]
	fn parse_single_rule() {
		let config = Guardrails::parse("require-label-matcher").unwrap().unwrap();
		assert!(config.is_enabled(Guardrail::RequireLabelMatcher));
		assert!(!config.is_enabled(Guardrail::DisallowExplicitNameLabel));
		assert!(!config.is_enabled(Guardrail::DisallowBlanketRegex));
	}

	#[test]
	fn parse_rule_list_tolerates_spacing_and_case() {
		let config = Guardrails::parse(" Disallow-Explicit-Name-Label , disallow-blanket-regex ")
			.unwrap()
			.unwrap();
		assert!(config.is_enabled(Guardrail::DisallowExplicitNameLabel));
		assert!(config.is_enabled(Guardrail::DisallowBlanketRegex));
		assert!(!config.is_enabled(Guardrail::RequireLabelMatcher));
	}

	#[test]
	fn parse_rejects_unknown_rule_and_names_the_valid_set() {
		let err = Guardrails::parse("require-label-matcher,frobnicate").unwrap_err();
		let message = err.to_string();
		assert!(message.contains("frobnicate"));
		for rule in Guardrail::ALL {
			assert!(message.contains(rule.as_str()));
		}
	}

	#[test]
	fn parse_rejects_empty_list_entries() {
		assert!(Guardrails::parse("require-label-matcher,").is_err());
		assert!(Guardrails::parse(",").is_err());
	}

	#[test]
	fn threshold_builders_override_defaults() {
		let config = Guardrails::all()
			.with_max_metric_cardinality(500)
			.with_max_label_cardinality(100);
		assert_eq!(config.max_metric_cardinality, 500);
		assert_eq!(config.max_label_cardinality, 100);
	}

	#[test]
	fn rule_names_round_trip() {
		for rule in Guardrail::ALL {
			assert_eq!(rule.as_str().parse::<Guardrail>().unwrap(), rule);
		}
	}

	#[test]
	fn default_has_no_rules_and_no_limits() {
		let config = Guardrails::default();
		for rule in Guardrail::ALL {
			assert!(!config.is_enabled(rule));
		}
		assert_eq!(config.max_metric_cardinality, 0);
		assert_eq!(config.max_label_cardinality, 0);
	}
}
