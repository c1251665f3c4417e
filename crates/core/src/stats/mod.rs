//! Backend cardinality snapshots and the provider boundary.
//!
//! The guardrails engine never talks to the metrics backend directly. It asks
//! a [`StatsProvider`] for one [`TsdbStats`] snapshot per validation call and
//! runs every check against that snapshot. Retries, timeouts, and connection
//! management all live behind the provider trait.

pub mod cache;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::err::Error;

/// The window of time a metadata fetch is scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
	/// Inclusive start of the window
	start: DateTime<Utc>,
	/// Inclusive end of the window
	end: DateTime<Utc>,
}

impl TimeRange {
	/// Creates a range, rejecting windows which end before they start.
	pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, Error> {
		if start > end {
			return Err(Error::InvalidTimeRange {
				start,
				end,
			});
		}
		Ok(Self {
			start,
			end,
		})
	}

	/// Creates a trailing window of the given length, ending now.
	pub fn last(duration: Duration) -> Self {
		let end = Utc::now();
		Self {
			start: end - duration,
			end,
		}
	}

	/// The start of the window.
	pub fn start(&self) -> DateTime<Utc> {
		self.start
	}

	/// The end of the window.
	pub fn end(&self) -> DateTime<Utc> {
		self.end
	}
}

impl Default for TimeRange {
	fn default() -> Self {
		Self::last(Duration::hours(1))
	}
}

/// A point-in-time cardinality snapshot of the metrics backend.
///
/// Both maps come from a single backend call. A missing key means the metric
/// or label was not observed in the window, which every check other than the
/// existence checks treats permissively.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsdbStats {
	/// Number of active series per metric name
	pub series_count_by_metric: HashMap<String, u64>,
	/// Number of distinct values per label name
	pub label_value_count_by_label: HashMap<String, u64>,
}

impl TsdbStats {
	/// Creates a snapshot from metric and label cardinality pairs.
	pub fn new<M, L, S>(metrics: M, labels: L) -> Self
	where
		M: IntoIterator<Item = (S, u64)>,
		L: IntoIterator<Item = (S, u64)>,
		S: Into<String>,
	{
		Self {
			series_count_by_metric: metrics.into_iter().map(|(k, v)| (k.into(), v)).collect(),
			label_value_count_by_label: labels.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		}
	}

	/// The series count for a metric, if it was observed.
	pub fn metric_series(&self, metric: &str) -> Option<u64> {
		self.series_count_by_metric.get(metric).copied()
	}

	/// The distinct-value count for a label, if it was observed.
	pub fn label_values(&self, label: &str) -> Option<u64> {
		self.label_value_count_by_label.get(label).copied()
	}
}

/// The outbound boundary to the metrics backend.
///
/// One call returns both cardinality maps as a single snapshot so that every
/// check within a validation sees the same state of the backend.
#[async_trait]
pub trait StatsProvider: Send + Sync {
	/// Fetches a cardinality snapshot scoped to the given time range.
	async fn fetch_stats(&self, range: TimeRange) -> Result<TsdbStats>;
}

#[async_trait]
impl<P: StatsProvider + ?Sized> StatsProvider for Arc<P> {
	async fn fetch_stats(&self, range: TimeRange) -> Result<TsdbStats> {
		(**self).fetch_stats(range).await
	}
}

/// A provider serving a fixed snapshot from memory, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStatsProvider {
	/// The snapshot returned for every fetch
	stats: TsdbStats,
}

impl MemoryStatsProvider {
	/// Creates a provider serving the given snapshot.
	pub fn new(stats: TsdbStats) -> Self {
		Self {
			stats,
		}
	}

	/// Creates a provider from metric and label cardinality pairs.
	pub fn from_counts<M, L, S>(metrics: M, labels: L) -> Self
	where
		M: IntoIterator<Item = (S, u64)>,
		L: IntoIterator<Item = (S, u64)>,
		S: Into<String>,
	{
		Self::new(TsdbStats::new(metrics, labels))
	}
}

#[async_trait]
impl StatsProvider for MemoryStatsProvider {
	#[instrument(level = "trace", target = "promguard::core::stats", skip(self))]
	async fn fetch_stats(&self, range: TimeRange) -> Result<TsdbStats> {
		Ok(self.stats.clone())
	}
}
