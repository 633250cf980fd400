//! Handler doubles covering the behaviors tests need to provoke.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::context::TierContext;
use crate::error::HandlerError;
use crate::handler::Handler;

/// Returns its input unchanged.
#[derive(Debug, Default)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn invoke(&self, input: &Value, _ctx: &TierContext) -> Result<Value, HandlerError> {
        Ok(input.clone())
    }
}

/// Returns `"<prefix><input string>"`. Non-string inputs are rendered
/// with their JSON form.
#[derive(Debug)]
pub struct PrefixHandler {
    prefix: String,
}

impl PrefixHandler {
    /// Create with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Handler for PrefixHandler {
    async fn invoke(&self, input: &Value, _ctx: &TierContext) -> Result<Value, HandlerError> {
        let text = match input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(Value::String(format!("{}{}", self.prefix, text)))
    }
}

/// Fails the first `n` invocations, then echoes. `n == u32::MAX`
/// never succeeds.
#[derive(Debug)]
pub struct FailNTimes {
    n: u32,
    calls: AtomicU32,
    error: fn(u32) -> HandlerError,
}

impl FailNTimes {
    /// Fail the first `n` calls with a retryable error.
    pub fn retryable(n: u32) -> Self {
        Self {
            n,
            calls: AtomicU32::new(0),
            error: |call| HandlerError::retryable(format!("induced failure #{call}")),
        }
    }

    /// Fail the first `n` calls with a non-retryable error.
    pub fn non_retryable(n: u32) -> Self {
        Self {
            n,
            calls: AtomicU32::new(0),
            error: |call| HandlerError::non_retryable(format!("induced failure #{call}")),
        }
    }

    /// Always fail with a retryable error.
    pub fn always() -> Self {
        Self::retryable(u32::MAX)
    }

    /// How many times the handler has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for FailNTimes {
    async fn invoke(&self, input: &Value, _ctx: &TierContext) -> Result<Value, HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.n {
            Err((self.error)(call))
        } else {
            Ok(input.clone())
        }
    }
}

/// Sleeps for a fixed duration, then echoes. Observes cancellation
/// while sleeping, like a well-behaved handler must.
#[derive(Debug)]
pub struct SleepHandler {
    duration: std::time::Duration,
}

impl SleepHandler {
    /// Sleep for `millis` before answering.
    pub fn millis(millis: u64) -> Self {
        Self {
            duration: std::time::Duration::from_millis(millis),
        }
    }
}

#[async_trait]
impl Handler for SleepHandler {
    async fn invoke(&self, input: &Value, ctx: &TierContext) -> Result<Value, HandlerError> {
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(input.clone()),
            _ = ctx.cancellation.cancelled() => {
                Err(HandlerError::non_retryable("handler observed cancellation"))
            }
        }
    }
}

/// Reports the context it was invoked with, as JSON. Lets tests assert
/// what actually crossed a tier boundary.
#[derive(Debug, Default)]
pub struct ProbeHandler;

#[async_trait]
impl Handler for ProbeHandler {
    async fn invoke(&self, _input: &Value, ctx: &TierContext) -> Result<Value, HandlerError> {
        Ok(json!({
            "tier": ctx.tier.as_str(),
            "previous_tier": ctx.previous_tier.map(|t| t.as_str()),
            "previous_error": ctx.previous_error.as_ref().map(|e| e.message.clone()),
            "previous_result": ctx.previous_result.clone(),
            "cascade_attempt": ctx.cascade_attempt,
        }))
    }
}
