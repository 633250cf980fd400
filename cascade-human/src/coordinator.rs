//! The task coordinator — create, deliver, wait, resolve, escalate.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tier0::{DurationMs, FunctionId, HandlerError, ResponderId, TaskId};

use crate::error::TaskError;
use crate::fabric::DeliveryFabric;
use crate::store::TaskStore;
use crate::task::{
    DeliveryRecord, HumanTask, ResponseRecord, SlaAction, TaskSpec, TaskStatus,
};
use crate::transform;

/// What a waiting cascade eventually receives: the transformed output
/// value, or the validation failure message.
type Verdict = Result<Value, String>;

/// Something that happens on the task's timeline while it waits.
#[derive(Debug, Clone)]
enum Boundary {
    /// Redeliver to the current assignees.
    Reminder,
    /// Reassign (if the step names assignees) and redeliver.
    Escalate(Vec<String>),
    /// The SLA breach instant.
    Sla,
}

/// Bridges the synchronous cascade call to asynchronous human
/// responses.
///
/// The coordinator owns task records (persisted through the externally
/// provided [`TaskStore`]), hands rendered tasks to the
/// [`DeliveryFabric`], and parks the waiting cascade on a per-task
/// channel until a response, a synthesized SLA answer, cancellation,
/// or the deadline settles it.
///
/// Resolution ordering:
/// - deliveries for the same task id coalesce;
/// - duplicate responses after the first are discarded;
/// - a response that arrives after cancellation is ignored (the fabric
///   has received a recall), unless the SLA action is `Notify`, in
///   which case the task outlives the cascade call and the late
///   response completes it for the fabric's records only.
pub struct HumanCoordinator {
    store: Arc<dyn TaskStore>,
    fabric: Arc<dyn DeliveryFabric>,
    waiters: Mutex<HashMap<String, oneshot::Sender<Verdict>>>,
    inboxes: Mutex<HashMap<String, oneshot::Receiver<Verdict>>>,
}

impl HumanCoordinator {
    /// Create a coordinator over the given store and fabric.
    pub fn new(store: Arc<dyn TaskStore>, fabric: Arc<dyn DeliveryFabric>) -> Self {
        Self {
            store,
            fabric,
            waiters: Mutex::new(HashMap::new()),
            inboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a new task for one human-tier invocation and register
    /// its response channel.
    pub async fn create(
        &self,
        definition_id: FunctionId,
        spec: &TaskSpec,
        input: Value,
        deadline: DateTime<Utc>,
    ) -> Result<HumanTask, TaskError> {
        let id = TaskId::new(Uuid::new_v4().to_string());
        let task = HumanTask {
            id: id.clone(),
            definition_id,
            status: TaskStatus::Pending,
            input,
            ui: spec.ui.clone(),
            assignees: spec.assignees.clone(),
            reminders: spec.reminders.clone(),
            escalation: spec.escalation.clone(),
            sla: spec.sla.clone(),
            created_at: Utc::now(),
            deadline,
            deliveries: vec![],
            responses: vec![],
            escalation_count: 0,
        };
        self.store.put(&task).await?;

        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(id.to_string(), tx);
        self.inboxes.lock().await.insert(id.to_string(), rx);

        info!(task = %id, cascade = %task.definition_id, "human task created");
        Ok(task)
    }

    /// Hand the task to the delivery fabric. Repeated calls for the
    /// same task id coalesce into the first delivery.
    pub async fn deliver(&self, task_id: &TaskId) -> Result<(), TaskError> {
        let mut task = self.load(task_id).await?;
        if task.status != TaskStatus::Pending {
            debug!(task = %task_id, "delivery coalesced");
            return Ok(());
        }
        self.hand_off(&mut task).await?;
        task.status = TaskStatus::Delivered;
        self.store.update(&task).await
    }

    /// Inbound response from the fabric.
    ///
    /// The first response settles the task: valid payloads complete it
    /// and wake the waiting cascade with the transformed value;
    /// invalid payloads are recorded as rejected and fail the waiting
    /// attempt (retryable). Responses for completed tasks are
    /// discarded as duplicates; responses for cancelled or expired
    /// tasks are ignored.
    pub async fn on_response(
        &self,
        task_id: &TaskId,
        payload: Value,
        responder: ResponderId,
    ) -> Result<(), TaskError> {
        let mut task = self.load(task_id).await?;
        match task.status {
            TaskStatus::Completed => {
                return Err(TaskError::DuplicateResponse(task_id.to_string()));
            }
            TaskStatus::Cancelled | TaskStatus::Expired => {
                debug!(task = %task_id, "response after cancellation ignored");
                return Ok(());
            }
            TaskStatus::Pending | TaskStatus::Delivered => {}
        }

        let resolved = transform::resolve(&task.ui, &payload);
        task.responses.push(ResponseRecord {
            at: Utc::now(),
            responder,
            payload,
            accepted: resolved.is_ok(),
        });

        match resolved {
            Ok(value) => {
                task.status = TaskStatus::Completed;
                self.store.update(&task).await?;
                if let Some(tx) = self.take_waiter(task_id).await {
                    let _ = tx.send(Ok(value));
                }
                Ok(())
            }
            Err(reason) => {
                self.store.update(&task).await?;
                if let Some(tx) = self.take_waiter(task_id).await {
                    let _ = tx.send(Err(reason.clone()));
                }
                Err(TaskError::InvalidResponse {
                    task_id: task_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Suspend until the task settles.
    ///
    /// Walks the task's timeline (reminders, escalation thresholds,
    /// SLA breach) while racing the response channel and the
    /// cascade's cancellation token; ends at the task deadline.
    pub async fn wait(
        &self,
        task_id: &TaskId,
        cancellation: &CancellationToken,
    ) -> Result<Value, HandlerError> {
        let mut rx = self
            .inboxes
            .lock()
            .await
            .remove(task_id.as_str())
            .ok_or_else(|| {
                HandlerError::Infrastructure(format!("no pending wait for task {task_id}"))
            })?;
        let task = self.load(task_id).await.map_err(infra)?;

        for (at, boundary) in schedule(&task) {
            tokio::select! {
                verdict = &mut rx => return finish(verdict),
                _ = cancellation.cancelled() => return self.handle_cancel(task_id).await,
                _ = sleep_until(at) => {
                    if let Some(value) = self.handle_boundary(task_id, boundary).await? {
                        return Ok(value);
                    }
                }
            }
        }

        tokio::select! {
            verdict = &mut rx => finish(verdict),
            _ = cancellation.cancelled() => self.handle_cancel(task_id).await,
            _ = sleep_until(task.deadline) => self.handle_expiry(task_id).await,
        }
    }

    async fn handle_boundary(
        &self,
        task_id: &TaskId,
        boundary: Boundary,
    ) -> Result<Option<Value>, HandlerError> {
        let mut task = self.load(task_id).await.map_err(infra)?;
        if !matches!(task.status, TaskStatus::Pending | TaskStatus::Delivered) {
            return Ok(None);
        }
        match boundary {
            Boundary::Reminder => {
                if let Err(e) = self.hand_off(&mut task).await {
                    warn!(task = %task_id, error = %e, "reminder delivery failed");
                } else {
                    self.store.update(&task).await.map_err(infra)?;
                }
                Ok(None)
            }
            Boundary::Escalate(assignees) => {
                self.escalate_once(&mut task, assignees).await.map_err(infra)?;
                Ok(None)
            }
            Boundary::Sla => match task.sla.action.clone() {
                SlaAction::Notify => {
                    warn!(task = %task_id, "sla breached");
                    Ok(None)
                }
                SlaAction::Escalate => {
                    self.escalate_once(&mut task, vec![]).await.map_err(infra)?;
                    Ok(None)
                }
                SlaAction::AutoApprove(value) => {
                    self.complete_synthesized(&mut task, value.clone(), "sla-auto-approve")
                        .await
                        .map_err(infra)?;
                    Ok(Some(value))
                }
                SlaAction::AutoReject(reason) => {
                    let value = json!({ "approved": false, "reason": reason });
                    self.complete_synthesized(&mut task, value.clone(), "sla-auto-reject")
                        .await
                        .map_err(infra)?;
                    Ok(Some(value))
                }
            },
        }
    }

    /// Cancellation from the cascade (usually its tier timeout).
    /// Under `Notify` the task stays live in the fabric and may settle
    /// later for the fabric's records; otherwise the fabric is told to
    /// recall it.
    async fn handle_cancel(&self, task_id: &TaskId) -> Result<Value, HandlerError> {
        self.take_waiter(task_id).await;
        let mut task = self.load(task_id).await.map_err(infra)?;
        if task.sla.action == SlaAction::Notify {
            warn!(task = %task_id, "cascade cancelled; task outlives the execution");
        } else if matches!(task.status, TaskStatus::Pending | TaskStatus::Delivered) {
            if let Err(e) = self.fabric.recall(task_id).await {
                warn!(task = %task_id, error = %e, "recall failed");
            }
            task.status = TaskStatus::Cancelled;
            self.store.update(&task).await.map_err(infra)?;
        }
        Err(HandlerError::non_retryable("human wait cancelled"))
    }

    async fn handle_expiry(&self, task_id: &TaskId) -> Result<Value, HandlerError> {
        self.take_waiter(task_id).await;
        let mut task = self.load(task_id).await.map_err(infra)?;
        if matches!(task.status, TaskStatus::Pending | TaskStatus::Delivered) {
            if let Err(e) = self.fabric.recall(task_id).await {
                warn!(task = %task_id, error = %e, "recall failed");
            }
            task.status = TaskStatus::Expired;
            self.store.update(&task).await.map_err(infra)?;
        }
        Err(HandlerError::non_retryable("human task deadline exceeded"))
    }

    /// Reassign (when `assignees` is non-empty) and redeliver.
    async fn escalate_once(
        &self,
        task: &mut HumanTask,
        assignees: Vec<String>,
    ) -> Result<(), TaskError> {
        if !assignees.is_empty() {
            task.assignees = assignees;
        }
        task.escalation_count += 1;
        info!(
            task = %task.id,
            escalation = task.escalation_count,
            assignees = ?task.assignees,
            "task escalated"
        );
        self.hand_off(task).await?;
        self.store.update(task).await
    }

    async fn complete_synthesized(
        &self,
        task: &mut HumanTask,
        value: Value,
        label: &str,
    ) -> Result<(), TaskError> {
        task.responses.push(ResponseRecord {
            at: Utc::now(),
            responder: ResponderId::new(label),
            payload: value,
            accepted: true,
        });
        task.status = TaskStatus::Completed;
        self.store.update(task).await?;
        self.take_waiter(&task.id).await;
        Ok(())
    }

    async fn hand_off(&self, task: &mut HumanTask) -> Result<(), TaskError> {
        let message_ids = self.fabric.deliver(task).await?;
        task.deliveries.push(DeliveryRecord {
            at: Utc::now(),
            assignees: task.assignees.clone(),
            message_ids,
        });
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> Result<HumanTask, TaskError> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    async fn take_waiter(&self, task_id: &TaskId) -> Option<oneshot::Sender<Verdict>> {
        self.waiters.lock().await.remove(task_id.as_str())
    }
}

fn infra(err: TaskError) -> HandlerError {
    HandlerError::Infrastructure(err.to_string())
}

fn finish(verdict: Result<Verdict, oneshot::error::RecvError>) -> Result<Value, HandlerError> {
    match verdict {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(reason)) => Err(HandlerError::retryable(format!("invalid response: {reason}"))),
        Err(_closed) => Err(HandlerError::Infrastructure(
            "response channel closed".to_owned(),
        )),
    }
}

/// The task's timeline, sorted, bounded by its deadline.
fn schedule(task: &HumanTask) -> Vec<(DateTime<Utc>, Boundary)> {
    let at = |offset: DurationMs| {
        task.created_at + chrono::Duration::milliseconds(offset.as_millis() as i64)
    };
    let mut boundaries: Vec<(DateTime<Utc>, Boundary)> = vec![];
    for reminder in &task.reminders {
        boundaries.push((at(*reminder), Boundary::Reminder));
    }
    for step in &task.escalation {
        boundaries.push((at(step.after), Boundary::Escalate(step.assignees.clone())));
    }
    if let Some(after) = task.sla.breach_after {
        boundaries.push((at(after), Boundary::Sla));
    }
    boundaries.retain(|(when, _)| *when < task.deadline);
    boundaries.sort_by_key(|(when, _)| *when);
    boundaries
}

async fn sleep_until(at: DateTime<Utc>) {
    let delta = (at - Utc::now()).to_std().unwrap_or_default();
    tokio::time::sleep(delta).await;
}
