//! Exposition formats: Prometheus text, OpenMetrics, JSON.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::sink::FunctionMetrics;

/// Supported exposition formats.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Prometheus text exposition.
    Prometheus,
    /// OpenMetrics text, terminated by `# EOF`.
    OpenMetrics,
    /// The snapshots serialized as a JSON array.
    Json,
}

/// Escape a label value: `\` → `\\`, `"` → `\"`, newline → `\n`.
pub fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render snapshots in the requested format.
pub fn render(snapshots: &[FunctionMetrics], format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(snapshots).unwrap_or_else(|_| "[]".to_owned())
        }
        ExportFormat::Prometheus => render_text(snapshots, false),
        ExportFormat::OpenMetrics => render_text(snapshots, true),
    }
}

fn render_text(snapshots: &[FunctionMetrics], openmetrics: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# HELP cascade_invocations_total Invocations in the rolling window.");
    let _ = writeln!(out, "# TYPE cascade_invocations_total counter");
    for m in snapshots {
        let f = escape_label(m.function_id.as_str());
        let _ = writeln!(
            out,
            "cascade_invocations_total{{function_id=\"{f}\"}} {}",
            m.errors.total
        );
    }

    let _ = writeln!(out, "# HELP cascade_invocation_failures_total Failed invocations in the window.");
    let _ = writeln!(out, "# TYPE cascade_invocation_failures_total counter");
    for m in snapshots {
        let f = escape_label(m.function_id.as_str());
        let _ = writeln!(
            out,
            "cascade_invocation_failures_total{{function_id=\"{f}\"}} {}",
            m.errors.failures
        );
    }

    let _ = writeln!(out, "# HELP cascade_invocation_duration_ms Invocation duration quantiles.");
    let _ = writeln!(out, "# TYPE cascade_invocation_duration_ms summary");
    for m in snapshots {
        let Some(duration) = &m.duration else { continue };
        let f = escape_label(m.function_id.as_str());
        for (q, value) in [
            ("0.5", duration.p50),
            ("0.95", duration.p95),
            ("0.99", duration.p99),
        ] {
            let _ = writeln!(
                out,
                "cascade_invocation_duration_ms{{function_id=\"{f}\",quantile=\"{q}\"}} {}",
                value.as_millis()
            );
        }
        let _ = writeln!(
            out,
            "cascade_invocation_duration_ms_min{{function_id=\"{f}\"}} {}",
            duration.min.as_millis()
        );
        let _ = writeln!(
            out,
            "cascade_invocation_duration_ms_max{{function_id=\"{f}\"}} {}",
            duration.max.as_millis()
        );
        let _ = writeln!(
            out,
            "cascade_invocation_duration_ms_mean{{function_id=\"{f}\"}} {}",
            duration.mean_ms
        );
    }

    let _ = writeln!(out, "# HELP cascade_cold_starts_total Cold starts in the window.");
    let _ = writeln!(out, "# TYPE cascade_cold_starts_total counter");
    for m in snapshots {
        let f = escape_label(m.function_id.as_str());
        let _ = writeln!(
            out,
            "cascade_cold_starts_total{{function_id=\"{f}\"}} {}",
            m.cold_start.cold
        );
    }

    let _ = writeln!(out, "# HELP cascade_memory_bytes_mean Mean reported memory.");
    let _ = writeln!(out, "# TYPE cascade_memory_bytes_mean gauge");
    for m in snapshots {
        let Some(memory) = &m.memory else { continue };
        let f = escape_label(m.function_id.as_str());
        let _ = writeln!(
            out,
            "cascade_memory_bytes_mean{{function_id=\"{f}\"}} {}",
            memory.mean_bytes
        );
    }

    let _ = writeln!(out, "# HELP cascade_rate_limit_hits_total Rate-limit hits per source.");
    let _ = writeln!(out, "# TYPE cascade_rate_limit_hits_total counter");
    for m in snapshots {
        let f = escape_label(m.function_id.as_str());
        for (source, hits) in &m.rate_limits.per_source {
            let s = escape_label(source);
            let _ = writeln!(
                out,
                "cascade_rate_limit_hits_total{{function_id=\"{f}\",source=\"{s}\"}} {hits}"
            );
        }
    }

    if openmetrics {
        let _ = writeln!(out, "# EOF");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{InvocationRecord, MetricsSink};
    use chrono::Utc;
    use tier0::{DurationMs, FunctionId};

    async fn snapshots() -> Vec<FunctionMetrics> {
        let sink = MetricsSink::new();
        for ms in [10, 20, 30] {
            sink.record(InvocationRecord {
                function_id: FunctionId::new("fn\"weird\"\nname"),
                language: "js".into(),
                duration: DurationMs::from_millis(ms),
                success: ms != 30,
                cold_start: ms == 10,
                memory_bytes: Some(1_000_000),
                error_type: (ms == 30).then(|| "timeout".to_owned()),
                timestamp: Utc::now(),
            })
            .await;
        }
        sink.record_rate_limit(&FunctionId::new("fn\"weird\"\nname"), "edge-1")
            .await;
        sink.snapshot_all().await
    }

    #[test]
    fn label_escaping() {
        assert_eq!(escape_label(r#"a\b"#), r#"a\\b"#);
        assert_eq!(escape_label(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_label("line\nbreak"), r"line\nbreak");
    }

    #[tokio::test]
    async fn prometheus_exposition() {
        let text = render(&snapshots().await, ExportFormat::Prometheus);
        assert!(text.contains("# TYPE cascade_invocations_total counter"));
        assert!(text.contains(r#"cascade_invocations_total{function_id="fn\"weird\"\nname"} 3"#));
        assert!(text.contains(r#"quantile="0.95""#));
        assert!(text.contains(r#"cascade_rate_limit_hits_total{function_id="fn\"weird\"\nname",source="edge-1"} 1"#));
        assert!(!text.contains("# EOF"));
    }

    #[tokio::test]
    async fn openmetrics_ends_with_eof() {
        let text = render(&snapshots().await, ExportFormat::OpenMetrics);
        assert!(text.ends_with("# EOF\n"));
    }

    #[tokio::test]
    async fn json_round_trips() {
        let rendered = render(&snapshots().await, ExportFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["errors"]["failures"], 1);
        assert_eq!(parsed[0]["cold_start"]["cold"], 1);
    }
}
