//! Caller-facing error envelope.
//!
//! The only failure structure callers may depend on. Field names are
//! camelCase on the wire; `error.code` is opaque.

use serde::{Deserialize, Serialize};

use tier0::{CascadeError, ErrorInfo, Tier, TierAttempt};

/// The serialized form of an exhausted cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustedWire {
    /// Always `"CascadeExhausted"`.
    pub kind: String,
    /// Human-readable summary.
    pub message: String,
    /// Wall-clock duration of the execution in milliseconds.
    pub total_duration_ms: u64,
    /// One entry per attempted tier, in escalation order.
    pub history: Vec<AttemptWire>,
    /// Tiers the skip policy excluded.
    pub skipped_tiers: Vec<SkippedWire>,
}

/// One history entry on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptWire {
    /// Which tier ran.
    pub tier: Tier,
    /// How it ended.
    pub status: String,
    /// Tier duration in milliseconds.
    pub duration_ms: u64,
    /// The failure, absent on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorWire>,
    /// Local retries consumed.
    pub retries: u32,
}

/// A failure on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorWire {
    /// Human-readable message.
    pub message: String,
    /// Opaque machine tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Whether the failure was considered retryable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// A skipped tier on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedWire {
    /// The excluded tier.
    pub tier: Tier,
    /// Why it was excluded.
    pub reason: String,
}

impl From<&ErrorInfo> for ErrorWire {
    fn from(info: &ErrorInfo) -> Self {
        Self {
            message: info.message.clone(),
            code: info.code.clone(),
            retryable: Some(info.retryable),
        }
    }
}

impl From<&TierAttempt> for AttemptWire {
    fn from(attempt: &TierAttempt) -> Self {
        Self {
            tier: attempt.tier,
            status: format!("{:?}", attempt.status).to_lowercase(),
            duration_ms: attempt.duration.as_millis(),
            error: attempt.error.as_ref().map(ErrorWire::from),
            retries: attempt.retries,
        }
    }
}

impl ExhaustedWire {
    /// Build the envelope from an engine error. Only
    /// [`CascadeError::Exhausted`] has a wire form; every other
    /// variant returns `None`.
    pub fn from_error(err: &CascadeError) -> Option<Self> {
        match err {
            CascadeError::Exhausted {
                history,
                skipped_tiers,
                total_duration,
            } => Some(Self {
                kind: "CascadeExhausted".to_owned(),
                message: err.to_string(),
                total_duration_ms: total_duration.as_millis(),
                history: history.iter().map(AttemptWire::from).collect(),
                skipped_tiers: skipped_tiers
                    .iter()
                    .map(|s| SkippedWire {
                        tier: s.tier,
                        reason: s.reason.to_string(),
                    })
                    .collect(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tier0::{AttemptStatus, DurationMs, SkipReason, SkippedTier};

    fn exhausted() -> CascadeError {
        CascadeError::Exhausted {
            history: vec![TierAttempt {
                tier: Tier::Code,
                attempt: 1,
                status: AttemptStatus::Timeout,
                timestamp: Utc::now(),
                duration: DurationMs::from_millis(100),
                error: Some(ErrorInfo::timeout(Tier::Code, DurationMs::from_millis(100))),
                result: None,
                retries: 0,
            }],
            skipped_tiers: vec![SkippedTier::new(
                Tier::Generative,
                SkipReason::Condition("AI disabled".into()),
            )],
            total_duration: DurationMs::from_millis(105),
        }
    }

    #[test]
    fn envelope_shape() {
        let wire = ExhaustedWire::from_error(&exhausted()).unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["kind"], "CascadeExhausted");
        assert_eq!(json["totalDurationMs"], 105);
        assert_eq!(json["history"][0]["tier"], "code");
        assert_eq!(json["history"][0]["status"], "timeout");
        assert_eq!(json["history"][0]["durationMs"], 100);
        assert_eq!(json["history"][0]["retries"], 0);
        assert_eq!(json["history"][0]["error"]["code"], "timeout");
        assert_eq!(json["skippedTiers"][0]["tier"], "generative");
        assert_eq!(json["skippedTiers"][0]["reason"], "AI disabled");
    }

    #[test]
    fn only_exhausted_has_a_wire_form() {
        assert!(ExhaustedWire::from_error(&CascadeError::InputInvalid("bad".into())).is_none());
    }
}
