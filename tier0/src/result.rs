//! What a finished cascade hands back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::attempt::TierAttempt;
use crate::duration::DurationMs;
use crate::tier::Tier;

/// Why the skip policy excluded a tier.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No handler defined for the tier.
    Absent,
    /// The tier was in the definition's static skip list.
    Listed,
    /// A skip condition matched; carries its declared reason.
    Condition(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Absent => f.write_str("absent"),
            SkipReason::Listed => f.write_str("listed"),
            SkipReason::Condition(reason) => f.write_str(reason),
        }
    }
}

/// A tier the skip policy excluded, with its reason.
/// Skipped tiers never appear in history.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTier {
    /// The excluded tier.
    pub tier: Tier,
    /// Why it was excluded.
    pub reason: SkipReason,
}

impl SkippedTier {
    /// Create a skipped-tier record.
    pub fn new(tier: Tier, reason: SkipReason) -> Self {
        Self { tier, reason }
    }
}

/// Execution counters for one cascade run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeMetrics {
    /// Wall-clock duration of the whole execution.
    pub total_duration: DurationMs,
    /// Tier boundaries crossed: `|tiers attempted| - 1` on success.
    pub escalations: u32,
    /// Local retries summed across all attempted tiers.
    pub total_retries: u32,
    /// Wall-clock duration spent in each attempted tier.
    pub tier_durations: BTreeMap<Tier, DurationMs>,
}

/// A successful cascade execution.
///
/// `history` holds one sealed entry per attempted tier in escalation
/// order; the final entry is the completed one and names
/// `success_tier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeResult {
    /// The winning handler's output.
    pub output: serde_json::Value,
    /// The tier that produced the output.
    pub success_tier: Tier,
    /// One entry per attempted tier, in escalation order.
    pub history: Vec<TierAttempt>,
    /// Tiers the skip policy excluded, with reasons.
    pub skipped_tiers: Vec<SkippedTier>,
    /// Execution counters.
    pub metrics: CascadeMetrics,
}
