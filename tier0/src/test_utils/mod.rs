//! Shared test doubles for cascade crates.
//!
//! Gated behind the `test-utils` feature. These handlers exist so the
//! engine, coordinator, and workspace integration tests can exercise
//! every escalation path without real sandboxes, models, or humans.

mod handlers;

pub use handlers::{EchoHandler, FailNTimes, PrefixHandler, ProbeHandler, SleepHandler};
