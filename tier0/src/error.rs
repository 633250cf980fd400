//! Error types for the cascade protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attempt::TierAttempt;
use crate::duration::DurationMs;
use crate::result::SkippedTier;
use crate::tier::Tier;

/// A handler signalled failure.
///
/// Retryability steers local retries only — every non-success escalates
/// to the next tier regardless. A failing handler may expose a partial
/// result; the engine forwards it to the next tier's context only when
/// the definition enables fallback.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler failed but retrying might succeed.
    /// The executor's local retry budget decides.
    #[error("retryable: {message}")]
    Retryable {
        /// Error message.
        message: String,
        /// Partial output produced before the failure, if any.
        partial_result: Option<serde_json::Value>,
    },

    /// The handler failed and retrying won't help.
    /// Invalid state, safety refusal, permanent rejection.
    #[error("non-retryable: {message}")]
    NonRetryable {
        /// Error message.
        message: String,
        /// Partial output produced before the failure, if any.
        partial_result: Option<serde_json::Value>,
    },

    /// The input failed the handler's declared schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An external dependency of the handler was unavailable.
    #[error("infrastructure: {0}")]
    Infrastructure(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// A retryable failure with no partial result.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable {
            message: message.into(),
            partial_result: None,
        }
    }

    /// A non-retryable failure with no partial result.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::NonRetryable {
            message: message.into(),
            partial_result: None,
        }
    }

    /// Attach a partial result to a `Retryable`/`NonRetryable` failure.
    /// No-op for the other variants, which carry no payload slot.
    pub fn with_partial_result(self, value: serde_json::Value) -> Self {
        match self {
            Self::Retryable { message, .. } => Self::Retryable {
                message,
                partial_result: Some(value),
            },
            Self::NonRetryable { message, .. } => Self::NonRetryable {
                message,
                partial_result: Some(value),
            },
            other => other,
        }
    }

    /// Whether local retry may help. Unknown failures default to
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Retryable { .. } | Self::Infrastructure(_) | Self::Other(_) => true,
            Self::NonRetryable { .. } | Self::InvalidInput(_) => false,
        }
    }

    /// The partial result exposed by the failing handler, if any.
    pub fn partial_result(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Retryable { partial_result, .. }
            | Self::NonRetryable { partial_result, .. } => partial_result.as_ref(),
            _ => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Retryable { .. } => "retryable",
            Self::NonRetryable { .. } => "non_retryable",
            Self::InvalidInput(_) => "invalid_input",
            Self::Infrastructure(_) => "infrastructure",
            Self::Other(_) => "other",
        }
    }
}

/// Serializable projection of a failure, stored in history entries and
/// carried forward in `TierContext::previous_error`.
///
/// `code` is a stable machine tag; callers must treat it as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Opaque machine tag for the failure class.
    pub code: Option<String>,
    /// Whether the failure was considered retryable.
    pub retryable: bool,
}

impl ErrorInfo {
    /// Projection of a tier timing out after `timeout`.
    pub fn timeout(tier: Tier, timeout: DurationMs) -> Self {
        Self {
            message: format!("tier {tier} timed out after {timeout}"),
            code: Some("timeout".to_owned()),
            retryable: false,
        }
    }

    /// Projection of the execution scope being cancelled mid-tier.
    pub fn cancelled(tier: Tier) -> Self {
        Self {
            message: format!("tier {tier} cancelled"),
            code: Some("cancelled".to_owned()),
            retryable: false,
        }
    }
}

impl From<&HandlerError> for ErrorInfo {
    fn from(err: &HandlerError) -> Self {
        Self {
            message: err.to_string(),
            code: Some(err.code().to_owned()),
            retryable: err.is_retryable(),
        }
    }
}

/// Terminal errors of one cascade execution.
///
/// `Exhausted` is the single failure callers see after tiers have run;
/// everything a tier produced on the way down survives in its history.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CascadeError {
    /// The input failed the declared schema; no tier ran.
    #[error("input invalid: {0}")]
    InputInvalid(String),

    /// Every eligible tier was attempted without success.
    /// Always retryable at a higher layer.
    #[error("cascade exhausted after {} tier attempt(s) in {total_duration}", history.len())]
    Exhausted {
        /// One entry per attempted tier, in escalation order.
        history: Vec<TierAttempt>,
        /// Tiers the skip policy excluded, with reasons.
        skipped_tiers: Vec<SkippedTier>,
        /// Wall-clock duration of the whole execution.
        total_duration: DurationMs,
    },

    /// An external dependency blocked the cascade from starting.
    #[error("infrastructure: {0}")]
    Infrastructure(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A duration string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// Not a recognized duration form.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
}

/// A version string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Not a `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version.
    #[error("invalid version: {0:?}")]
    Invalid(String),
}

/// A tier name failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier: {0:?}")]
pub struct TierParseError(pub String);
