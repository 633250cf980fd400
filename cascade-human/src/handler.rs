//! The human-in-the-loop adapter — a `tier0::Handler` over the
//! coordinator.

use async_trait::async_trait;
use std::sync::Arc;

use tier0::{FunctionId, Handler, HandlerError, TierContext};

use crate::coordinator::HumanCoordinator;
use crate::task::TaskSpec;

/// Implements the tier handler contract for the human tier:
/// create the task, hand it to the fabric, and suspend until a human
/// (or the SLA) answers. Cancellation from the tier executor reaches
/// the wait through the context's token.
pub struct HumanHandler {
    coordinator: Arc<HumanCoordinator>,
    definition_id: FunctionId,
    spec: TaskSpec,
}

impl HumanHandler {
    /// Create the adapter for one cascade definition.
    pub fn new(
        coordinator: Arc<HumanCoordinator>,
        definition_id: FunctionId,
        spec: TaskSpec,
    ) -> Self {
        Self {
            coordinator,
            definition_id,
            spec,
        }
    }
}

#[async_trait]
impl Handler for HumanHandler {
    async fn invoke(
        &self,
        input: &serde_json::Value,
        ctx: &TierContext,
    ) -> Result<serde_json::Value, HandlerError> {
        let task = self
            .coordinator
            .create(
                self.definition_id.clone(),
                &self.spec,
                input.clone(),
                ctx.deadline,
            )
            .await
            .map_err(|e| HandlerError::Infrastructure(e.to_string()))?;
        self.coordinator
            .deliver(&task.id)
            .await
            .map_err(|e| HandlerError::Infrastructure(e.to_string()))?;
        self.coordinator.wait(&task.id, &ctx.cancellation).await
    }
}
