#![deny(missing_docs)]
//! Cascade execution — attempt tiers in order, escalate on failure.
//!
//! The engine walks the tier order defined by `tier0::Tier`, consulting
//! the skip policy before each tier and running eligible tiers under
//! their timeout and local retry budget. A completed tier is terminal;
//! anything else enriches the next tier's context (previous error,
//! optional partial result) and escalates. When every eligible tier has
//! been attempted without success the full history surfaces as a single
//! `CascadeExhausted` error, serializable via [`wire::ExhaustedWire`].
//!
//! Concurrent executions share no state; cancellation propagates from
//! the execution scope through each tier to every handler.

pub mod engine;
pub mod executor;
pub mod skip;
pub mod wire;

pub use engine::{CascadeEngine, InputValidator};
pub use executor::{TierOutcome, run_tier};
pub use wire::ExhaustedWire;
