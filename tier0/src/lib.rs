//! # tier0 — Protocol traits for tiered cascade execution
//!
//! This crate defines the vocabulary of the cascade platform: the four
//! execution tiers, the handler contract each tier satisfies, and the
//! records a cascade execution produces.
//!
//! ## The Protocol
//!
//! | Piece | Types | What it does |
//! |-------|-------|--------------|
//! | ① Tiers | [`Tier`] | The total order that drives escalation |
//! | ② Handlers | [`Handler`], [`TierHandler`] | Uniform contract over {code, generative, agentic, human} |
//! | ③ Context | [`TierContext`] | What each tier knows about the tiers before it |
//! | ④ Records | [`TierAttempt`], [`CascadeResult`] | Sealed history of one execution |
//! | ⑤ Definitions | [`CascadeDefinition`], [`CascadeOptions`] | What gets deployed, versioned by semver |
//!
//! ## Design Principle
//!
//! The handler trait is operation-defined, not mechanism-defined.
//! [`Handler::invoke`] means "cause this tier to produce an output" —
//! not "run a WASM module" or "call a model." A sandboxed user
//! function, a single-shot inference, a tool-using loop, and an
//! adapter that waits for a human all implement the same trait; the
//! engine escalates across them without knowing which is which.
//!
//! ## Dependency Notes
//!
//! Handler payloads are `serde_json::Value`. This is an intentional
//! choice: JSON is the platform's interchange format, and a concrete
//! value type keeps the handler trait object-safe. The alternative
//! (generic `T: Serialize`) would complicate trait object safety
//! without practical benefit.

#![deny(missing_docs)]

pub mod attempt;
pub mod context;
pub mod definition;
pub mod duration;
pub mod error;
pub mod handler;
pub mod human;
pub mod id;
pub mod result;
pub mod tier;
pub mod version;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use attempt::{AttemptStatus, TierAttempt};
pub use context::TierContext;
pub use definition::{CascadeDefinition, CascadeOptions, SkipCondition, default_timeout};
pub use duration::{DurationMs, DurationSpec};
pub use error::{CascadeError, DurationError, ErrorInfo, HandlerError, VersionError};
pub use handler::{FnHandler, Handler, TierHandler};
pub use human::{FieldKind, FormField, QuickAction, TaskUi};
pub use id::{ExecutionId, FunctionId, ResponderId, TaskId};
pub use result::{CascadeMetrics, CascadeResult, SkipReason, SkippedTier};
pub use tier::Tier;
pub use version::Version;
