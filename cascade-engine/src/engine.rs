//! The cascade engine — tier ordering, escalation, history, metrics.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tier0::{
    AttemptStatus, CascadeDefinition, CascadeError, CascadeMetrics, CascadeResult, DurationMs,
    ErrorInfo, SkippedTier, Tier, TierContext,
};

use crate::skip;

/// Optional input gate, consulted once before any tier runs.
/// A rejected input surfaces as [`CascadeError::InputInvalid`].
pub trait InputValidator: Send + Sync {
    /// Check `input` against the declared schema. The returned string
    /// is the caller-visible rejection message.
    fn validate(&self, input: &serde_json::Value) -> Result<(), String>;
}

/// State carried from a failed tier into the next tier's context.
#[derive(Debug, Default)]
struct Carry {
    previous_tier: Option<Tier>,
    previous_error: Option<ErrorInfo>,
    previous_result: Option<serde_json::Value>,
}

/// The cascade engine.
///
/// Stateless across executions: every call to [`execute`] owns its
/// history, metrics, and cancellation scope, so concurrent executions
/// of the same definition are fully independent.
///
/// [`execute`]: CascadeEngine::execute
#[derive(Clone, Default)]
pub struct CascadeEngine {
    validator: Option<Arc<dyn InputValidator>>,
}

impl CascadeEngine {
    /// An engine with no input validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that gates every execution on `validator`.
    pub fn with_validator(validator: Arc<dyn InputValidator>) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    /// Execute one cascade with a fresh cancellation scope.
    pub async fn execute(
        &self,
        definition: &CascadeDefinition,
        input: serde_json::Value,
    ) -> Result<CascadeResult, CascadeError> {
        self.execute_with(definition, input, CancellationToken::new(), 1)
            .await
    }

    /// Execute one cascade under an externally owned cancellation
    /// scope, tagged with the whole-cascade attempt ordinal.
    ///
    /// `cascade_attempt` starts at 1 and is passed through unchanged
    /// to every tier's context; the layer that retries exhausted
    /// cascades increments it.
    ///
    /// Walks the tier order from `max(start_tier, lowest defined)`.
    /// For each tier: consult the skip policy, then run the tier under
    /// its timeout and retry budget. Completion is terminal; any other
    /// status enriches the next tier's context and escalates. When the
    /// order is exhausted the full history is raised as
    /// [`CascadeError::Exhausted`].
    pub async fn execute_with(
        &self,
        definition: &CascadeDefinition,
        input: serde_json::Value,
        scope: CancellationToken,
        cascade_attempt: u32,
    ) -> Result<CascadeResult, CascadeError> {
        if let Some(validator) = &self.validator {
            validator
                .validate(&input)
                .map_err(CascadeError::InputInvalid)?;
        }

        let started = Instant::now();
        let start_tier = match (definition.options.start_tier, definition.lowest_tier()) {
            (Some(configured), Some(lowest)) => configured.max(lowest),
            (Some(configured), None) => configured,
            (None, Some(lowest)) => lowest,
            (None, None) => Tier::Code,
        };

        let mut history = Vec::new();
        let mut skipped_tiers = Vec::new();
        let mut tier_durations = BTreeMap::new();
        let mut escalations: u32 = 0;
        let mut total_retries: u32 = 0;
        let mut carry = Carry::default();

        for tier in Tier::ORDER.into_iter().filter(|&t| t >= start_tier) {
            if scope.is_cancelled() {
                // No subsequent handler starts once the scope is gone.
                break;
            }

            if let Some(reason) = skip::evaluate(definition, tier, &input) {
                debug!(cascade = %definition.id, %tier, %reason, "tier skipped");
                skipped_tiers.push(SkippedTier::new(tier, reason));
                continue;
            }

            let timeout = definition.options.timeout_for(tier);
            let deadline =
                Utc::now() + chrono::Duration::milliseconds(timeout.as_millis() as i64);
            let mut ctx = TierContext::new(tier, deadline);
            ctx.previous_tier = carry.previous_tier;
            ctx.previous_error = carry.previous_error.clone();
            ctx.previous_result = carry.previous_result.clone();
            ctx.cascade_attempt = cascade_attempt;
            ctx.cancellation = scope.clone();

            // The handler is present: an absent tier would have been
            // skipped above.
            let Some(handler) = definition.handler(tier) else {
                continue;
            };

            let outcome = crate::executor::run_tier(
                tier,
                handler.handler(),
                &input,
                &ctx,
                definition.options.retries_for(tier),
                timeout,
            )
            .await;

            total_retries += outcome.attempt.retries;
            let spent = tier_durations
                .entry(tier)
                .or_insert(DurationMs::ZERO);
            *spent = spent.saturating_add(outcome.attempt.duration);

            if outcome.attempt.status == AttemptStatus::Completed {
                let output = outcome.attempt.result.clone().unwrap_or(serde_json::Value::Null);
                info!(
                    cascade = %definition.id,
                    %tier,
                    duration = %outcome.attempt.duration,
                    escalations,
                    "cascade completed"
                );
                history.push(outcome.attempt);
                return Ok(CascadeResult {
                    output,
                    success_tier: tier,
                    history,
                    skipped_tiers,
                    metrics: CascadeMetrics {
                        total_duration: DurationMs::from(started.elapsed()),
                        escalations,
                        total_retries,
                        tier_durations,
                    },
                });
            }

            warn!(
                cascade = %definition.id,
                %tier,
                status = ?outcome.attempt.status,
                error = outcome.attempt.error.as_ref().map(|e| e.message.as_str()),
                "tier did not complete, escalating"
            );
            carry.previous_tier = Some(tier);
            carry.previous_error = outcome.attempt.error.clone();
            if definition.options.enable_fallback {
                if let Some(partial) = outcome.partial_result {
                    carry.previous_result = Some(partial);
                }
            }
            escalations += 1;
            history.push(outcome.attempt);
        }

        let total_duration = DurationMs::from(started.elapsed());
        warn!(
            cascade = %definition.id,
            attempts = history.len(),
            %total_duration,
            "cascade exhausted"
        );
        Err(CascadeError::Exhausted {
            history,
            skipped_tiers,
            total_duration,
        })
    }
}

impl std::fmt::Debug for CascadeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeEngine")
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
