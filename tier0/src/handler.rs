//! The Handler protocol — what one tier does when asked to produce output.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::TierContext;
use crate::error::HandlerError;
use crate::human::TaskUi;
use crate::tier::Tier;

/// Protocol ① — The Handler
///
/// One capability: take an input, produce an output or a
/// [`HandlerError`]. The four tiers all satisfy this same signature;
/// what differs between them is behavior, not storage.
///
/// Handlers are NOT responsible for timing, retries, or context
/// enrichment — the executor owns all three. Handlers MUST observe
/// `ctx.cancellation` at every suspension point and MUST propagate it
/// into any work they spawn (tool calls, model requests, human waits).
///
/// Implementations:
/// - a sandboxed user-code invoker (code tier)
/// - a single model call wrapper (generative tier)
/// - a tool-using reasoning loop (agentic tier)
/// - a human-in-the-loop adapter that waits for an answer (human tier)
/// - a mock (for testing)
#[async_trait]
pub trait Handler: Send + Sync {
    /// Execute once against `input`.
    ///
    /// The payload type is `serde_json::Value` on both sides: JSON is
    /// the platform's interchange format, and a concrete value type
    /// keeps the trait object-safe. Failures carry retryability and an
    /// optional partial result on the error itself.
    async fn invoke(
        &self,
        input: &serde_json::Value,
        ctx: &TierContext,
    ) -> Result<serde_json::Value, HandlerError>;
}

/// The closed set of tier handler kinds.
///
/// Each variant carries only the metadata its tier needs — a tool list
/// for agentic, a task UI for human. Polymorphism is over behavior
/// (the boxed [`Handler`]), not storage.
#[non_exhaustive]
#[derive(Clone)]
pub enum TierHandler {
    /// Deterministic code. Receives a context like every other tier
    /// but is expected to ignore everything except cancellation.
    Code(Arc<dyn Handler>),
    /// One model call.
    Generative(Arc<dyn Handler>),
    /// Multi-iteration model loop with tool use.
    Agentic {
        /// The reasoning loop.
        handler: Arc<dyn Handler>,
        /// Names of the tools the loop may call.
        tools: Vec<String>,
    },
    /// Human-in-the-loop.
    Human {
        /// The adapter bridging to the task coordinator.
        handler: Arc<dyn Handler>,
        /// The UI presented to assignees.
        ui: TaskUi,
    },
}

impl TierHandler {
    /// Which tier this handler serves.
    pub fn tier(&self) -> Tier {
        match self {
            TierHandler::Code(_) => Tier::Code,
            TierHandler::Generative(_) => Tier::Generative,
            TierHandler::Agentic { .. } => Tier::Agentic,
            TierHandler::Human { .. } => Tier::Human,
        }
    }

    /// The behavior behind the variant.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        match self {
            TierHandler::Code(h) | TierHandler::Generative(h) => h,
            TierHandler::Agentic { handler, .. } | TierHandler::Human { handler, .. } => handler,
        }
    }
}

impl fmt::Debug for TierHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierHandler::Code(_) => f.write_str("TierHandler::Code"),
            TierHandler::Generative(_) => f.write_str("TierHandler::Generative"),
            TierHandler::Agentic { tools, .. } => f
                .debug_struct("TierHandler::Agentic")
                .field("tools", tools)
                .finish_non_exhaustive(),
            TierHandler::Human { ui, .. } => f
                .debug_struct("TierHandler::Human")
                .field("ui", ui)
                .finish_non_exhaustive(),
        }
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, HandlerError>> + Send>>;

/// Adapter turning a closure into a [`Handler`].
///
/// For async behavior the closure receives owned copies of the input
/// and context and returns a boxed future; [`FnHandler::from_sync`]
/// covers the common synchronous case.
pub struct FnHandler {
    f: Box<dyn Fn(serde_json::Value, TierContext) -> HandlerFuture + Send + Sync>,
}

impl FnHandler {
    /// Wrap an async closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(serde_json::Value, TierContext) -> HandlerFuture + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }

    /// Wrap a synchronous function of the input alone.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<serde_json::Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(move |input, _ctx| {
            let result = f(&input);
            Box::pin(async move { result })
        })
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn invoke(
        &self,
        input: &serde_json::Value,
        ctx: &TierContext,
    ) -> Result<serde_json::Value, HandlerError> {
        (self.f)(input.clone(), ctx.clone()).await
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}
