//! The persistent record of a pending human-tier invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tier0::{DurationMs, FunctionId, ResponderId, TaskId, TaskUi};

/// Where a human task is in its lifecycle.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet handed to the delivery fabric.
    Pending,
    /// Live in the delivery fabric, awaiting a response.
    Delivered,
    /// A valid (or synthesized) response arrived.
    Completed,
    /// The cascade cancelled the task and the fabric was told.
    Cancelled,
    /// The task's own deadline passed without a response.
    Expired,
}

/// One hand-off to the delivery fabric.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// When the fabric accepted the delivery.
    pub at: DateTime<Utc>,
    /// Who it was addressed to.
    pub assignees: Vec<String>,
    /// The fabric's per-channel message ids.
    pub message_ids: Vec<String>,
}

/// One response received for the task, valid or not.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// When the response arrived.
    pub at: DateTime<Utc>,
    /// Who answered.
    pub responder: ResponderId,
    /// The raw platform payload.
    pub payload: serde_json::Value,
    /// Whether the response passed validation.
    pub accepted: bool,
}

/// Reassign-and-redeliver threshold inside the human tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Elapsed time after task creation at which this step fires.
    pub after: DurationMs,
    /// New assignees. Empty keeps the current ones.
    #[serde(default)]
    pub assignees: Vec<String>,
}

/// What happens when the task's SLA is breached.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaAction {
    /// Log and keep waiting. The task may outlive the cascade call.
    Notify,
    /// Reassign and redeliver, like an escalation step.
    Escalate,
    /// Synthesize the given value as the response.
    AutoApprove(serde_json::Value),
    /// Synthesize a rejection response carrying the given reason.
    AutoReject(String),
}

/// SLA declaration for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Elapsed time after task creation at which the SLA is breached.
    /// `None` means no SLA.
    pub breach_after: Option<DurationMs>,
    /// What a breach triggers.
    pub action: SlaAction,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            breach_after: None,
            action: SlaAction::Notify,
        }
    }
}

/// Deploy-time declaration of a human tier: everything about the task
/// except the per-execution input and deadline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// What the human sees and how they may answer.
    pub ui: TaskUi,
    /// Initial assignees.
    pub assignees: Vec<String>,
    /// Redelivery nudges, relative to task creation.
    #[serde(default)]
    pub reminders: Vec<DurationMs>,
    /// Reassignment thresholds, relative to task creation.
    #[serde(default)]
    pub escalation: Vec<EscalationStep>,
    /// SLA declaration.
    #[serde(default)]
    pub sla: SlaPolicy,
}

/// The durable record of one pending human-tier invocation.
///
/// Owned by the coordinator; persisted through the externally provided
/// [`crate::TaskStore`]. May outlive the cascade execution that
/// created it when the SLA action is `Notify`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanTask {
    /// Unique task id.
    pub id: TaskId,
    /// The cascade definition that spawned the task.
    pub definition_id: FunctionId,
    /// Lifecycle position.
    pub status: TaskStatus,
    /// The execution input shown to the human.
    pub input: serde_json::Value,
    /// Declared UI.
    pub ui: TaskUi,
    /// Current assignees (escalation may rewrite them).
    pub assignees: Vec<String>,
    /// Redelivery nudges, relative to creation.
    pub reminders: Vec<DurationMs>,
    /// Reassignment thresholds, relative to creation.
    pub escalation: Vec<EscalationStep>,
    /// SLA declaration.
    pub sla: SlaPolicy,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// Absolute instant after which the task expires.
    pub deadline: DateTime<Utc>,
    /// Every hand-off to the fabric, in order.
    pub deliveries: Vec<DeliveryRecord>,
    /// Every response received, in order, valid or not.
    pub responses: Vec<ResponseRecord>,
    /// How many times the task escalated inside the tier.
    pub escalation_count: u32,
}
