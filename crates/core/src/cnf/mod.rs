use std::sync::LazyLock;

/// The series-count ceiling applied per metric by the `all` guardrail preset.
pub static DEFAULT_MAX_METRIC_CARDINALITY: LazyLock<u64> =
	lazy_env_parse!("PROMGUARD_MAX_METRIC_CARDINALITY", u64, 100_000);

/// The distinct-value ceiling applied to blanket regex labels by the `all` guardrail preset.
pub static DEFAULT_MAX_LABEL_CARDINALITY: LazyLock<u64> =
	lazy_env_parse!("PROMGUARD_MAX_LABEL_CARDINALITY", u64, 1_000);

/// How long a cached metadata snapshot stays fresh, in seconds.
pub static STATS_CACHE_TTL_SECS: LazyLock<u64> =
	lazy_env_parse!("PROMGUARD_STATS_CACHE_TTL_SECS", u64, 60);

/// How many time ranges the metadata snapshot cache can hold at once.
pub static STATS_CACHE_CAPACITY: LazyLock<usize> =
	lazy_env_parse!("PROMGUARD_STATS_CACHE_CAPACITY", usize, 64);
