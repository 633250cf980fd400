//! End-to-end cascade scenarios across the workspace crates.
//!
//! Each scenario drives the engine through real handlers and checks
//! the observable result; `assert_invariants` re-checks the structural
//! invariants (history monotonicity, escalation count, retry
//! accounting, success placement, skip disjointness) on every outcome.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use cascade_engine::{CascadeEngine, ExhaustedWire};
use cascade_human::{HumanCoordinator, HumanHandler, MemoryTaskStore, TaskSpec};
use tier0::test_utils::{FailNTimes, PrefixHandler, SleepHandler};
use tier0::{
    AttemptStatus, CascadeDefinition, CascadeError, CascadeOptions, CascadeResult, DurationMs,
    Handler, HandlerError, QuickAction, ResponderId, SkipCondition, SkipReason, TaskUi, Tier,
    TierContext, TierHandler, Version,
};

fn def(name: &str) -> CascadeDefinition {
    CascadeDefinition::new(format!("fn-{name}"), name, Version::new(1, 0, 0))
}

fn assert_invariants(result: &CascadeResult) {
    // History entries climb the tier order.
    for pair in result.history.windows(2) {
        assert!(pair[0].tier < pair[1].tier, "history out of tier order");
        assert!(
            matches!(pair[0].status, AttemptStatus::Failed | AttemptStatus::Timeout),
            "non-terminal entry must have failed or timed out"
        );
    }
    // One escalation per crossed tier boundary.
    assert_eq!(
        result.metrics.escalations as usize,
        result.history.len().saturating_sub(1)
    );
    // Total retries is the sum over history.
    assert_eq!(
        result.metrics.total_retries,
        result.history.iter().map(|a| a.retries).sum::<u32>()
    );
    // A completed entry is always the last one.
    let last = result.history.last().expect("successful run has history");
    assert_eq!(last.status, AttemptStatus::Completed);
    assert_eq!(last.tier, result.success_tier);
    assert!(
        result.history[..result.history.len() - 1]
            .iter()
            .all(|a| a.status != AttemptStatus::Completed)
    );
    // Skipped tiers never appear in history.
    for skipped in &result.skipped_tiers {
        assert!(result.history.iter().all(|a| a.tier != skipped.tier));
    }
    // The execution spans its tiers.
    let spent: u64 = result
        .history
        .iter()
        .map(|a| a.duration.as_millis())
        .sum();
    assert!(result.metrics.total_duration.as_millis() >= spent);
}

// Code throws, generative answers.
#[tokio::test]
async fn code_failure_escalates_to_generative() {
    let definition = def("greet")
        .with_tier(TierHandler::Code(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Generative(Arc::new(PrefixHandler::new("g:"))));

    let result = CascadeEngine::new()
        .execute(&definition, json!("hello"))
        .await
        .unwrap();

    assert_eq!(result.output, json!("g:hello"));
    assert_eq!(result.success_tier, Tier::Generative);
    assert_eq!(result.history.len(), 2);
    assert_eq!(result.history[0].status, AttemptStatus::Failed);
    assert_eq!(result.metrics.escalations, 1);
    assert_invariants(&result);
}

// Code sleeps past its 100ms timeout, generative answers.
#[tokio::test(start_paused = true)]
async fn code_timeout_escalates_without_retry() {
    let definition = def("slow-code")
        .with_tier(TierHandler::Code(Arc::new(SleepHandler::millis(10_000))))
        .with_tier(TierHandler::Generative(Arc::new(PrefixHandler::new("ok"))))
        .with_options(
            CascadeOptions::new()
                .with_timeout(Tier::Code, DurationMs::parse("100ms").unwrap()),
        );

    let result = CascadeEngine::new()
        .execute(&definition, json!("x"))
        .await
        .unwrap();

    assert_eq!(result.success_tier, Tier::Generative);
    assert_eq!(result.history[0].status, AttemptStatus::Timeout);
    assert_eq!(result.history[0].retries, 0);
    assert_invariants(&result);
}

// Code retries twice then fails, generative fails, agentic answers.
#[tokio::test]
async fn local_retries_then_double_escalation() {
    let definition = def("retry-chain")
        .with_tier(TierHandler::Code(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Generative(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Agentic {
            handler: Arc::new(PrefixHandler::new("a:")),
            tools: vec!["search".into()],
        })
        .with_options(CascadeOptions::new().with_retries(Tier::Code, 2));

    let result = CascadeEngine::new()
        .execute(&definition, json!("p"))
        .await
        .unwrap();

    assert_eq!(result.output, json!("a:p"));
    assert_eq!(result.success_tier, Tier::Agentic);
    assert_eq!(result.history[0].retries, 2);
    assert_eq!(result.history[0].status, AttemptStatus::Failed);
    assert_eq!(result.history[1].status, AttemptStatus::Failed);
    assert_eq!(result.metrics.total_retries, 2);
    assert_eq!(result.metrics.escalations, 2);
    assert_invariants(&result);
}

// Every defined tier throws.
#[tokio::test]
async fn exhausted_cascade_keeps_ordered_history() {
    let definition = def("doomed")
        .with_tier(TierHandler::Code(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Generative(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Agentic {
            handler: Arc::new(FailNTimes::always()),
            tools: vec![],
        });

    let err = CascadeEngine::new()
        .execute(&definition, json!(null))
        .await
        .unwrap_err();

    let CascadeError::Exhausted { history, .. } = &err else {
        panic!("expected Exhausted, got {err:?}");
    };
    assert_eq!(
        history.iter().map(|a| a.tier).collect::<Vec<_>>(),
        vec![Tier::Code, Tier::Generative, Tier::Agentic]
    );

    // The caller-facing envelope carries the same history.
    let wire = ExhaustedWire::from_error(&err).unwrap();
    let json = serde_json::to_value(&wire).unwrap();
    assert_eq!(json["kind"], "CascadeExhausted");
    assert_eq!(json["history"].as_array().unwrap().len(), 3);
}

// A skip condition disables the generative tier for this input.
#[tokio::test]
async fn skip_condition_routes_around_generative() {
    let definition = def("routed")
        .with_tier(TierHandler::Code(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Generative(Arc::new(PrefixHandler::new("g:"))))
        .with_tier(TierHandler::Agentic {
            handler: Arc::new(DataPrefixHandler),
            tools: vec![],
        })
        .with_options(CascadeOptions::new().with_skip_condition(SkipCondition::new(
            Tier::Generative,
            "AI disabled",
            |input| !input["useAI"].as_bool().unwrap_or(false),
        )));

    let result = CascadeEngine::new()
        .execute(&definition, json!({ "useAI": false, "data": "q" }))
        .await
        .unwrap();

    assert_eq!(result.output, json!("a:q"));
    assert!(result.skipped_tiers.iter().any(|s| s.tier == Tier::Generative
        && s.reason == SkipReason::Condition("AI disabled".into())));
    assert_eq!(
        result.history.iter().map(|a| a.tier).collect::<Vec<_>>(),
        vec![Tier::Code, Tier::Agentic]
    );
    assert_invariants(&result);
}

/// Returns `"a:" + input.data`.
struct DataPrefixHandler;

#[async_trait]
impl Handler for DataPrefixHandler {
    async fn invoke(&self, input: &Value, _ctx: &TierContext) -> Result<Value, HandlerError> {
        let data = input["data"].as_str().unwrap_or_default();
        Ok(json!(format!("a:{data}")))
    }
}

// Fallback forwards the failing tier's partial result.
#[tokio::test]
async fn partial_result_forwarding() {
    struct PartialFail;
    #[async_trait]
    impl Handler for PartialFail {
        async fn invoke(&self, _input: &Value, _ctx: &TierContext) -> Result<Value, HandlerError> {
            Err(HandlerError::non_retryable("incomplete").with_partial_result(json!("P")))
        }
    }

    struct UsePrevious;
    #[async_trait]
    impl Handler for UsePrevious {
        async fn invoke(&self, _input: &Value, ctx: &TierContext) -> Result<Value, HandlerError> {
            let previous = ctx
                .previous_result
                .as_ref()
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(json!(format!("g+{previous}")))
        }
    }

    let definition = def("fallback")
        .with_tier(TierHandler::Code(Arc::new(PartialFail)))
        .with_tier(TierHandler::Generative(Arc::new(UsePrevious)))
        .with_options(CascadeOptions::new().with_fallback(true));

    let result = CascadeEngine::new()
        .execute(&definition, json!("h"))
        .await
        .unwrap();

    assert_eq!(result.output, json!("g+P"));
    assert_invariants(&result);
}

// The human tier end-to-end: code fails, the human answers through
// the coordinator, the cascade completes with the transformed value.
#[tokio::test(start_paused = true)]
async fn human_tier_completes_a_cascade() {
    let store = Arc::new(MemoryTaskStore::new());
    let fabric = Arc::new(ApprovingFabric::default());
    let coordinator = Arc::new(HumanCoordinator::new(store, fabric.clone()));

    let mut ui = TaskUi::titled("approve the request?");
    ui.quick_actions = vec![QuickAction::new(
        "approve",
        "Approve",
        json!({ "approved": true }),
    )];
    let spec = TaskSpec {
        ui,
        assignees: vec!["ops".into()],
        ..TaskSpec::default()
    };

    let definition = def("human")
        .with_tier(TierHandler::Code(Arc::new(FailNTimes::always())))
        .with_tier(TierHandler::Human {
            handler: Arc::new(HumanHandler::new(
                coordinator.clone(),
                "fn-human".into(),
                spec,
            )),
            ui: TaskUi::titled("approve the request?"),
        });

    // Play the fabric: answer the first delivered task after a beat.
    let responder = {
        let coordinator = coordinator.clone();
        let fabric = fabric.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if let Some(task_id) = fabric.first_task() {
                    let _ = coordinator
                        .on_response(&task_id, json!("approve"), ResponderId::new("alice"))
                        .await;
                    break;
                }
            }
        })
    };

    let result = CascadeEngine::new()
        .execute(&definition, json!({ "change": 7 }))
        .await
        .unwrap();
    responder.await.unwrap();

    assert_eq!(result.success_tier, Tier::Human);
    assert_eq!(result.output, json!({ "approved": true }));
    assert_eq!(result.history.len(), 2);
    assert_invariants(&result);
}

#[derive(Default)]
struct ApprovingFabric {
    tasks: std::sync::Mutex<Vec<String>>,
}

impl ApprovingFabric {
    fn first_task(&self) -> Option<tier0::TaskId> {
        self.tasks
            .lock()
            .unwrap()
            .first()
            .map(|id| tier0::TaskId::new(id.clone()))
    }
}

#[async_trait]
impl cascade_human::DeliveryFabric for ApprovingFabric {
    async fn deliver(
        &self,
        task: &cascade_human::HumanTask,
    ) -> Result<Vec<String>, cascade_human::TaskError> {
        self.tasks.lock().unwrap().push(task.id.to_string());
        Ok(vec!["msg-1".into()])
    }

    async fn recall(&self, _task_id: &tier0::TaskId) -> Result<(), cascade_human::TaskError> {
        Ok(())
    }
}

// Cancelling the outer scope settles the active tier and starts
// nothing afterwards.
#[tokio::test(start_paused = true)]
async fn outer_cancellation_settles_the_active_tier() {
    let generative = Arc::new(FailNTimes::always());
    let definition = def("p8")
        .with_tier(TierHandler::Code(Arc::new(SleepHandler::millis(60_000))))
        .with_tier(TierHandler::Generative(generative.clone()));

    let scope = CancellationToken::new();
    let engine = CascadeEngine::new();
    let run = engine.execute_with(&definition, json!(null), scope.clone(), 1);
    tokio::pin!(run);
    tokio::select! {
        _ = &mut run => panic!("cascade settled before cancellation"),
        _ = tokio::time::sleep(Duration::from_millis(10)) => scope.cancel(),
    }

    let err = run.await.unwrap_err();
    let CascadeError::Exhausted { history, .. } = err else {
        panic!("expected Exhausted");
    };
    assert_eq!(history.len(), 1);
    assert!(matches!(
        history[0].status,
        AttemptStatus::Failed | AttemptStatus::Timeout
    ));
    assert_eq!(generative.calls(), 0);
}
