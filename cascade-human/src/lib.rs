#![deny(missing_docs)]
//! Human task coordination for cascade execution.
//!
//! The human tier cannot answer synchronously: a cascade blocks on a
//! person who may take minutes or days. This crate bridges the gap.
//! [`HumanCoordinator`] persists a [`HumanTask`] per invocation
//! through an externally provided [`TaskStore`], hands it to the
//! external [`DeliveryFabric`], and suspends the cascade until one of
//! {response, SLA action, cancellation, deadline} settles it —
//! escalating and redelivering along the task's declared timeline in
//! the meantime. [`HumanHandler`] packages the whole flow as a
//! `tier0::Handler`.

pub mod coordinator;
pub mod error;
pub mod fabric;
pub mod handler;
pub mod store;
pub mod task;
pub mod transform;

pub use coordinator::HumanCoordinator;
pub use error::TaskError;
pub use fabric::DeliveryFabric;
pub use handler::HumanHandler;
pub use store::{MemoryTaskStore, TaskStore};
pub use task::{
    DeliveryRecord, EscalationStep, HumanTask, ResponseRecord, SlaAction, SlaPolicy, TaskSpec,
    TaskStatus,
};
