//! The delivery fabric boundary.
//!
//! The coordinator hands rendered tasks to an external fabric
//! (chat, email, web) and receives responses back through
//! [`crate::HumanCoordinator::on_response`]. This trait is the
//! outbound half; the fabric's wire formats are not this crate's
//! concern.

use async_trait::async_trait;

use tier0::TaskId;

use crate::error::TaskError;
use crate::task::HumanTask;

/// Outbound interface to the human delivery fabric.
#[async_trait]
pub trait DeliveryFabric: Send + Sync {
    /// Hand a task to the fabric for its current assignees.
    /// Returns the fabric's per-channel message ids.
    async fn deliver(&self, task: &HumanTask) -> Result<Vec<String>, TaskError>;

    /// Tell the fabric a task no longer accepts responses.
    async fn recall(&self, task_id: &TaskId) -> Result<(), TaskError>;
}
