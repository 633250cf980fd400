//! History entries — one sealed record per attempted tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::DurationMs;
use crate::error::ErrorInfo;
use crate::tier::Tier;

/// How a tier attempt ended.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The handler returned a result.
    Completed,
    /// The handler errored (after exhausting local retries, if any).
    Failed,
    /// The tier's timeout fired. Timeouts never retry locally.
    Timeout,
    /// The skip policy excluded the tier before it ran.
    /// Never appears in history; recorded in `skipped_tiers` instead.
    Skipped,
}

/// One entry of a cascade's execution history.
///
/// Born when the tier starts, sealed when it finishes. `duration`
/// spans the whole tier including local retries; `retries` counts
/// re-runs beyond the initial attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAttempt {
    /// Which tier ran.
    pub tier: Tier,
    /// 1-based index of the final local attempt (`retries + 1`).
    pub attempt: u32,
    /// How the tier ended.
    pub status: AttemptStatus,
    /// When the tier started.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the tier, retries included.
    pub duration: DurationMs,
    /// The failure that ended the tier, if it did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// The handler's output, present only on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Local retries consumed within this tier. The initial attempt
    /// is not counted.
    pub retries: u32,
}
