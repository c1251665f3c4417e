//! Snapshot caching for metadata providers.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use quick_cache::sync::Cache;

use super::{StatsProvider, TimeRange, TsdbStats};
use crate::cnf;

const TARGET: &str = "promguard::core::stats";

/// Wraps a provider with a time-bounded snapshot cache.
///
/// Entries are keyed by time range and served until the TTL elapses, so a
/// burst of validations over the same window costs one backend call. Fetch
/// failures are returned to the caller and never cached.
pub struct CachedStatsProvider<P> {
	/// The wrapped provider
	inner: P,
	/// Cached snapshots together with the instant they were fetched
	cache: Cache<TimeRange, (Instant, TsdbStats)>,
	/// How long a snapshot stays fresh
	ttl: Duration,
}

impl<P: StatsProvider> CachedStatsProvider<P> {
	/// Creates a cache with the configured default TTL and capacity.
	pub fn new(inner: P) -> Self {
		Self::with_ttl(inner, Duration::from_secs(*cnf::STATS_CACHE_TTL_SECS))
	}

	/// Creates a cache with an explicit TTL.
	pub fn with_ttl(inner: P, ttl: Duration) -> Self {
		Self {
			inner,
			cache: Cache::new(*cnf::STATS_CACHE_CAPACITY),
			ttl,
		}
	}
}

#[async_trait]
impl<P: StatsProvider> StatsProvider for CachedStatsProvider<P> {
	#[instrument(level = "trace", target = "promguard::core::stats", skip(self))]
	async fn fetch_stats(&self, range: TimeRange) -> Result<TsdbStats> {
		if let Some((at, stats)) = self.cache.get(&range) {
			if at.elapsed() < self.ttl {
				trace!(target: TARGET, "Serving cached snapshot");
				return Ok(stats);
			}
			// Stale entry, drop it before refetching
			self.cache.remove(&range);
		}
		let stats = self.inner.fetch_stats(range).await?;
		self.cache.insert(range, (Instant::now(), stats.clone()));
		Ok(stats)
	}
}
