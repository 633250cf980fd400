#![deny(missing_docs)]
//! Invocation metrics for the cascade platform.
//!
//! An in-process sink keeps a count-bounded rolling window of
//! invocation records per function and computes duration percentiles,
//! error rates, cold-start splits, memory stats, and rate-limit
//! tallies on read. Snapshots render as Prometheus text, OpenMetrics
//! (with `# EOF`), or JSON.
//!
//! Writes are observed in a total order per function id; readers see a
//! consistent snapshot. Bounding the window by count rather than time
//! keeps the concurrency model simple — there is no background pruner.

pub mod export;
pub mod sink;

pub use export::{ExportFormat, escape_label, render};
pub use sink::{
    ColdStartStats, DurationStats, ErrorStats, FunctionMetrics, InvocationRecord, MAX_INVOCATIONS,
    MemoryStats, MetricsSink, RateLimitStats,
};
