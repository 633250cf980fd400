//! Per-tier execution context.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::ErrorInfo;
use crate::tier::Tier;

/// Everything a handler may know about its place in the cascade.
///
/// Built fresh by the engine for each tier and immutable from the
/// handler's point of view. Escalation never loses information: the
/// previous tier's failure always arrives in `previous_error`, and —
/// only when the definition enables fallback — its partial result
/// arrives in `previous_result`.
///
/// The context carries the attempt's cancellation token. Handlers must
/// observe it at every suspension point; once it fires, any result they
/// go on to produce is discarded.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct TierContext {
    /// The tier currently executing.
    pub tier: Tier,
    /// The tier that ran (and failed) before this one, if any.
    pub previous_tier: Option<Tier>,
    /// The previous tier's failure, if any.
    pub previous_error: Option<ErrorInfo>,
    /// The previous tier's partial result. Populated only when the
    /// definition enables fallback.
    pub previous_result: Option<serde_json::Value>,
    /// Ordinal of this whole-cascade attempt, starting at 1. Supplied
    /// by the layer that retries exhausted cascades.
    pub cascade_attempt: u32,
    /// Absolute instant at which this tier's timeout fires.
    pub deadline: DateTime<Utc>,
    /// Cooperative cancellation for this attempt.
    pub cancellation: CancellationToken,
}

impl TierContext {
    /// A fresh context for `tier` with no carried state.
    pub fn new(tier: Tier, deadline: DateTime<Utc>) -> Self {
        Self {
            tier,
            previous_tier: None,
            previous_error: None,
            previous_result: None,
            cascade_attempt: 1,
            deadline,
            cancellation: CancellationToken::new(),
        }
    }

    /// The same context bound to a different cancellation token.
    /// The executor uses this to hand each attempt its own child token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Whether this attempt has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
