#![deny(missing_docs)]
//! # cascade — umbrella crate
//!
//! Provides a single import surface for the cascade platform.
//! Re-exports the protocol crate and key implementations behind
//! feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "classify")]
pub use cascade_classify;
#[cfg(feature = "core")]
pub use cascade_engine;
#[cfg(feature = "human")]
pub use cascade_human;
#[cfg(feature = "metrics")]
pub use cascade_metrics;
#[cfg(feature = "core")]
pub use tier0;

/// Happy-path imports for composing cascades.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use tier0::{
        AttemptStatus, CascadeDefinition, CascadeError, CascadeMetrics, CascadeOptions,
        CascadeResult, DurationMs, ErrorInfo, FnHandler, FunctionId, Handler, HandlerError,
        SkipCondition, SkipReason, SkippedTier, TaskId, TaskUi, Tier, TierAttempt, TierContext,
        TierHandler, Version,
    };

    #[cfg(feature = "core")]
    pub use cascade_engine::{CascadeEngine, ExhaustedWire, InputValidator};

    #[cfg(feature = "human")]
    pub use cascade_human::{
        DeliveryFabric, HumanCoordinator, HumanHandler, MemoryTaskStore, TaskSpec, TaskStore,
    };

    #[cfg(feature = "classify")]
    pub use cascade_classify::{ClassificationCache, Classifier, TierClassification};

    #[cfg(feature = "metrics")]
    pub use cascade_metrics::{ExportFormat, InvocationRecord, MetricsSink};
}
