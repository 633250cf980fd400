//! The metrics sink — bounded rolling windows per function.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

use tier0::{DurationMs, FunctionId};

/// Window bound: the sink keeps at most this many records per
/// function. Count-bounded rather than time-bounded, so there is no
/// background pruner; percentiles recompute on read from the window.
pub const MAX_INVOCATIONS: usize = 1_000;

/// One recorded invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Which function ran.
    pub function_id: FunctionId,
    /// The runtime language of the winning handler.
    pub language: String,
    /// Wall-clock duration.
    pub duration: DurationMs,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Whether the sandbox was cold.
    pub cold_start: bool,
    /// Peak memory, when the sandbox reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    /// Error class, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// When the invocation started.
    pub timestamp: DateTime<Utc>,
}

/// Duration aggregation over the window.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationStats {
    /// Records in the window.
    pub count: usize,
    /// Shortest duration.
    pub min: DurationMs,
    /// Longest duration.
    pub max: DurationMs,
    /// Arithmetic mean in milliseconds.
    pub mean_ms: f64,
    /// Median.
    pub p50: DurationMs,
    /// 95th percentile.
    pub p95: DurationMs,
    /// 99th percentile.
    pub p99: DurationMs,
}

/// Error aggregation over the window.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Records in the window.
    pub total: usize,
    /// Failed records.
    pub failures: usize,
    /// `failures / total`, zero for an empty window.
    pub rate: f64,
    /// Failure counts per error class.
    pub by_type: BTreeMap<String, u64>,
}

/// Cold/warm split over the window.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColdStartStats {
    /// Cold invocations.
    pub cold: usize,
    /// Warm invocations.
    pub warm: usize,
    /// `cold / total`, zero for an empty window.
    pub rate: f64,
    /// Mean duration of cold invocations, in milliseconds.
    pub cold_mean_ms: f64,
    /// Mean duration of warm invocations, in milliseconds.
    pub warm_mean_ms: f64,
}

/// Memory aggregation over the samples that reported it.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Samples that supplied memory.
    pub samples: usize,
    /// Mean bytes.
    pub mean_bytes: f64,
    /// Smallest sample.
    pub min_bytes: u64,
    /// Largest sample.
    pub max_bytes: u64,
}

/// Rate-limit hits per source.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitStats {
    /// Hits per source identifier.
    pub per_source: BTreeMap<String, u64>,
    /// Distinct sources seen.
    pub unique_sources: usize,
    /// Total hits.
    pub total: u64,
}

/// A consistent snapshot of one function's aggregations.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionMetrics {
    /// The function.
    pub function_id: FunctionId,
    /// Duration stats; absent for an empty window.
    pub duration: Option<DurationStats>,
    /// Error stats.
    pub errors: ErrorStats,
    /// Cold-start stats.
    pub cold_start: ColdStartStats,
    /// Memory stats; absent when no sample supplied memory.
    pub memory: Option<MemoryStats>,
    /// Rate-limit stats.
    pub rate_limits: RateLimitStats,
}

#[derive(Debug, Default)]
struct FunctionWindow {
    records: VecDeque<InvocationRecord>,
    rate_limits: BTreeMap<String, u64>,
}

/// In-process metrics sink.
///
/// Writes are single-writer per function id (the write lock serializes
/// them FIFO); readers take a consistent snapshot. The window is
/// bounded by [`MAX_INVOCATIONS`]: the oldest record falls off when a
/// new one lands in a full window.
#[derive(Default)]
pub struct MetricsSink {
    windows: RwLock<HashMap<String, FunctionWindow>>,
}

impl MetricsSink {
    /// A sink with no recorded data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation.
    pub async fn record(&self, record: InvocationRecord) {
        let mut windows = self.windows.write().await;
        let window = windows
            .entry(record.function_id.to_string())
            .or_default();
        if window.records.len() == MAX_INVOCATIONS {
            window.records.pop_front();
        }
        debug!(function = %record.function_id, duration = %record.duration, success = record.success, "invocation recorded");
        window.records.push_back(record);
    }

    /// Record one rate-limit hit from `source`.
    pub async fn record_rate_limit(&self, function_id: &FunctionId, source: impl Into<String>) {
        let mut windows = self.windows.write().await;
        let window = windows.entry(function_id.to_string()).or_default();
        *window.rate_limits.entry(source.into()).or_insert(0) += 1;
    }

    /// Snapshot one function's aggregations.
    pub async fn snapshot(&self, function_id: &FunctionId) -> Option<FunctionMetrics> {
        let windows = self.windows.read().await;
        windows
            .get(function_id.as_str())
            .map(|window| aggregate(function_id.clone(), window))
    }

    /// Snapshot every function, ordered by function id.
    pub async fn snapshot_all(&self) -> Vec<FunctionMetrics> {
        let windows = self.windows.read().await;
        let mut ids: Vec<&String> = windows.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| aggregate(FunctionId::new(id.clone()), &windows[id]))
            .collect()
    }
}

fn aggregate(function_id: FunctionId, window: &FunctionWindow) -> FunctionMetrics {
    let records: Vec<&InvocationRecord> = window.records.iter().collect();

    FunctionMetrics {
        function_id,
        duration: duration_stats(&records),
        errors: error_stats(&records),
        cold_start: cold_start_stats(&records),
        memory: memory_stats(&records),
        rate_limits: RateLimitStats {
            per_source: window.rate_limits.clone(),
            unique_sources: window.rate_limits.len(),
            total: window.rate_limits.values().sum(),
        },
    }
}

/// Nearest-rank percentile over a window sorted by duration.
/// The sort is stable, so ties resolve by recording position.
fn percentile(sorted: &[DurationMs], p: f64) -> DurationMs {
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn duration_stats(records: &[&InvocationRecord]) -> Option<DurationStats> {
    if records.is_empty() {
        return None;
    }
    let mut sorted: Vec<DurationMs> = records.iter().map(|r| r.duration).collect();
    sorted.sort();
    let total: u64 = sorted.iter().map(DurationMs::as_millis).sum();
    Some(DurationStats {
        count: sorted.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean_ms: total as f64 / sorted.len() as f64,
        p50: percentile(&sorted, 50.0),
        p95: percentile(&sorted, 95.0),
        p99: percentile(&sorted, 99.0),
    })
}

fn error_stats(records: &[&InvocationRecord]) -> ErrorStats {
    let failures: Vec<&&InvocationRecord> = records.iter().filter(|r| !r.success).collect();
    let mut by_type = BTreeMap::new();
    for failure in &failures {
        let class = failure.error_type.clone().unwrap_or_else(|| "unknown".to_owned());
        *by_type.entry(class).or_insert(0) += 1;
    }
    ErrorStats {
        total: records.len(),
        failures: failures.len(),
        rate: if records.is_empty() {
            0.0
        } else {
            failures.len() as f64 / records.len() as f64
        },
        by_type,
    }
}

fn cold_start_stats(records: &[&InvocationRecord]) -> ColdStartStats {
    let mean = |cold: bool| {
        let durations: Vec<u64> = records
            .iter()
            .filter(|r| r.cold_start == cold)
            .map(|r| r.duration.as_millis())
            .collect();
        if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<u64>() as f64 / durations.len() as f64
        }
    };
    let cold = records.iter().filter(|r| r.cold_start).count();
    ColdStartStats {
        cold,
        warm: records.len() - cold,
        rate: if records.is_empty() {
            0.0
        } else {
            cold as f64 / records.len() as f64
        },
        cold_mean_ms: mean(true),
        warm_mean_ms: mean(false),
    }
}

fn memory_stats(records: &[&InvocationRecord]) -> Option<MemoryStats> {
    let samples: Vec<u64> = records.iter().filter_map(|r| r.memory_bytes).collect();
    if samples.is_empty() {
        return None;
    }
    Some(MemoryStats {
        samples: samples.len(),
        mean_bytes: samples.iter().sum::<u64>() as f64 / samples.len() as f64,
        min_bytes: *samples.iter().min().unwrap_or(&0),
        max_bytes: *samples.iter().max().unwrap_or(&0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(function: &str, ms: u64, success: bool, cold: bool) -> InvocationRecord {
        InvocationRecord {
            function_id: FunctionId::new(function),
            language: "js".into(),
            duration: DurationMs::from_millis(ms),
            success,
            cold_start: cold,
            memory_bytes: None,
            error_type: if success { None } else { Some("handler".into()) },
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn percentiles_over_a_known_window() {
        let sink = MetricsSink::new();
        for ms in 1..=100 {
            sink.record(record("f", ms, true, false)).await;
        }
        let stats = sink
            .snapshot(&FunctionId::new("f"))
            .await
            .unwrap()
            .duration
            .unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min.as_millis(), 1);
        assert_eq!(stats.max.as_millis(), 100);
        assert_eq!(stats.mean_ms, 50.5);
        assert_eq!(stats.p50.as_millis(), 50);
        assert_eq!(stats.p95.as_millis(), 95);
        assert_eq!(stats.p99.as_millis(), 99);
    }

    #[tokio::test]
    async fn single_record_percentiles_collapse() {
        let sink = MetricsSink::new();
        sink.record(record("f", 42, true, true)).await;
        let stats = sink
            .snapshot(&FunctionId::new("f"))
            .await
            .unwrap()
            .duration
            .unwrap();
        assert_eq!(stats.p50.as_millis(), 42);
        assert_eq!(stats.p99.as_millis(), 42);
    }

    #[tokio::test]
    async fn window_is_bounded() {
        let sink = MetricsSink::new();
        for ms in 0..(MAX_INVOCATIONS as u64 + 100) {
            sink.record(record("f", ms, true, false)).await;
        }
        let stats = sink
            .snapshot(&FunctionId::new("f"))
            .await
            .unwrap()
            .duration
            .unwrap();
        assert_eq!(stats.count, MAX_INVOCATIONS);
        // The oldest 100 records fell off.
        assert_eq!(stats.min.as_millis(), 100);
    }

    #[tokio::test]
    async fn error_rate_and_classes() {
        let sink = MetricsSink::new();
        for i in 0..10 {
            sink.record(record("f", 10, i % 4 != 0, false)).await;
        }
        let errors = sink.snapshot(&FunctionId::new("f")).await.unwrap().errors;
        assert_eq!(errors.total, 10);
        assert_eq!(errors.failures, 3);
        assert_eq!(errors.rate, 0.3);
        assert_eq!(errors.by_type.get("handler"), Some(&3));
    }

    #[tokio::test]
    async fn cold_start_split() {
        let sink = MetricsSink::new();
        sink.record(record("f", 100, true, true)).await;
        sink.record(record("f", 300, true, true)).await;
        sink.record(record("f", 10, true, false)).await;
        let stats = sink.snapshot(&FunctionId::new("f")).await.unwrap().cold_start;
        assert_eq!(stats.cold, 2);
        assert_eq!(stats.warm, 1);
        assert!((stats.rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.cold_mean_ms, 200.0);
        assert_eq!(stats.warm_mean_ms, 10.0);
    }

    #[tokio::test]
    async fn memory_only_counts_supplied_samples() {
        let sink = MetricsSink::new();
        let mut with_memory = record("f", 10, true, false);
        with_memory.memory_bytes = Some(64_000_000);
        sink.record(with_memory).await;
        sink.record(record("f", 10, true, false)).await;
        let memory = sink.snapshot(&FunctionId::new("f")).await.unwrap().memory.unwrap();
        assert_eq!(memory.samples, 1);
        assert_eq!(memory.min_bytes, 64_000_000);
    }

    #[tokio::test]
    async fn rate_limits_tally_unique_sources() {
        let sink = MetricsSink::new();
        let f = FunctionId::new("f");
        sink.record_rate_limit(&f, "10.0.0.1").await;
        sink.record_rate_limit(&f, "10.0.0.1").await;
        sink.record_rate_limit(&f, "10.0.0.2").await;
        let stats = sink.snapshot(&f).await.unwrap().rate_limits;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unique_sources, 2);
        assert_eq!(stats.per_source.get("10.0.0.1"), Some(&2));
    }

    #[tokio::test]
    async fn unknown_function_has_no_snapshot() {
        let sink = MetricsSink::new();
        assert!(sink.snapshot(&FunctionId::new("ghost")).await.is_none());
    }
}
