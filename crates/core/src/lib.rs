//! # Promguard Core
//!
//! The query safety guardrails engine for PromQL. A query is parsed, its AST
//! is walked, and every vector selector is checked against a configurable
//! rule set and live backend cardinality before the query is allowed to run.
//! The outcome is always a [`guard::verdict::Verdict`] carrying an actionable
//! explanation, never a panic or an error the caller has to interpret.
//!
//! The entry point is [`guard::QueryValidator`], wired to a
//! [`stats::StatsProvider`] implementation for backend metadata.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod err;
pub mod guard;
pub mod stats;

pub use err::Error;
pub use guard::QueryValidator;
pub use guard::config::{Guardrail, Guardrails};
pub use guard::verdict::{Verdict, Violation};
pub use stats::cache::CachedStatsProvider;
pub use stats::{MemoryStatsProvider, StatsProvider, TimeRange, TsdbStats};
