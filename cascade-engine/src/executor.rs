//! The tier executor — one tier, one timeout, one retry budget.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use tier0::{
    AttemptStatus, DurationMs, ErrorInfo, Handler, HandlerError, Tier, TierAttempt, TierContext,
};

/// How long a cancelled handler gets to observe its token and settle
/// before the executor stops waiting. Per-tier; callers cannot depend
/// on the value.
const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// What one tier execution produced.
///
/// The sealed history entry plus the failing handler's partial result,
/// which travels outside the entry so the engine can gate forwarding
/// on the fallback option.
#[derive(Debug)]
pub struct TierOutcome {
    /// The sealed history entry.
    pub attempt: TierAttempt,
    /// Partial output exposed by the failing handler, if any.
    pub partial_result: Option<serde_json::Value>,
}

/// Execute exactly one tier's handler under its timeout and local
/// retry budget.
///
/// Semantics:
/// - A budget of `n` allows up to `n + 1` total attempts; the initial
///   attempt is not counted in `retries`.
/// - Only retryable handler errors consume the budget. A non-retryable
///   error seals the entry immediately — escalation still happens one
///   layer up.
/// - Timeouts are fatal for the tier: the handler's token is
///   cancelled, the handler gets a bounded grace period to settle, any
///   late result is discarded, and the entry seals as `Timeout`.
/// - Cancellation of the execution scope behaves like a timeout except
///   the entry seals as `Failed` with a `cancelled` error.
pub async fn run_tier(
    tier: Tier,
    handler: &Arc<dyn Handler>,
    input: &serde_json::Value,
    ctx: &TierContext,
    budget: u32,
    timeout: DurationMs,
) -> TierOutcome {
    let started_at = Utc::now();
    let started = Instant::now();
    let mut retries: u32 = 0;

    loop {
        // Each attempt gets the full timeout; a timeout still seals the
        // whole tier.
        let timer = tokio::time::sleep(timeout.to_std());
        tokio::pin!(timer);

        let attempt_token = ctx.cancellation.child_token();
        let attempt_ctx = ctx.clone().with_cancellation(attempt_token.clone());
        let invocation = handler.invoke(input, &attempt_ctx);
        tokio::pin!(invocation);

        let seal = move |status, error, result| TierAttempt {
            tier,
            attempt: retries + 1,
            status,
            timestamp: started_at,
            duration: DurationMs::from(started.elapsed()),
            error,
            result,
            retries,
        };

        tokio::select! {
            result = &mut invocation => match result {
                Ok(output) => {
                    return TierOutcome {
                        attempt: seal(AttemptStatus::Completed, None, Some(output)),
                        partial_result: None,
                    };
                }
                Err(err) => {
                    if retries < budget && err.is_retryable() {
                        retries += 1;
                        debug!(%tier, retry = retries, budget, error = %err, "retrying tier");
                        continue;
                    }
                    let partial = err.partial_result().cloned();
                    return TierOutcome {
                        attempt: seal(AttemptStatus::Failed, Some(ErrorInfo::from(&err)), None),
                        partial_result: partial,
                    };
                }
            },
            _ = &mut timer => {
                let late = drain(attempt_token, invocation).await;
                return TierOutcome {
                    attempt: seal(
                        AttemptStatus::Timeout,
                        Some(ErrorInfo::timeout(tier, timeout)),
                        None,
                    ),
                    partial_result: late.as_ref().err().and_then(|e| e.partial_result().cloned()),
                };
            }
            _ = ctx.cancellation.cancelled() => {
                let _ = drain(attempt_token, invocation).await;
                return TierOutcome {
                    attempt: seal(AttemptStatus::Failed, Some(ErrorInfo::cancelled(tier)), None),
                    partial_result: None,
                };
            }
        }
    }
}

/// Cancel the attempt's token and wait out the grace period. Whatever
/// the handler returns after cancellation is discarded by the caller;
/// a late failure may still donate its partial result.
async fn drain<F>(
    token: tokio_util::sync::CancellationToken,
    invocation: std::pin::Pin<&mut F>,
) -> Result<serde_json::Value, HandlerError>
where
    F: Future<Output = Result<serde_json::Value, HandlerError>>,
{
    token.cancel();
    match tokio::time::timeout(CANCEL_GRACE, invocation).await {
        Ok(settled) => settled,
        Err(_elapsed) => Err(HandlerError::non_retryable("handler ignored cancellation")),
    }
}
