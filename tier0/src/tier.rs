//! The Tier enum — the total order that drives escalation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TierParseError;

/// One of the four execution paradigms, totally ordered.
///
/// The derived `Ord` is the escalation order and the only order the
/// engine ever consults: `Code < Generative < Agentic < Human`.
/// A failed, timed-out, or skipped tier escalates to the next greater
/// tier that is defined and not skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Deterministic user code. Must be pure w.r.t. platform-provided IO.
    Code,
    /// One model call, no tools.
    Generative,
    /// Multi-iteration model loop with tool use.
    Agentic,
    /// Human-in-the-loop; returns only when a human answer arrives.
    Human,
}

impl Tier {
    /// All tiers in escalation order.
    pub const ORDER: [Tier; 4] = [Tier::Code, Tier::Generative, Tier::Agentic, Tier::Human];

    /// The next tier up, or `None` from `Human`.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Code => Some(Tier::Generative),
            Tier::Generative => Some(Tier::Agentic),
            Tier::Agentic => Some(Tier::Human),
            Tier::Human => None,
        }
    }

    /// Stable lowercase name, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Code => "code",
            Tier::Generative => "generative",
            Tier::Agentic => "agentic",
            Tier::Human => "human",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Tier::Code),
            "generative" => Ok(Tier::Generative),
            "agentic" => Ok(Tier::Agentic),
            "human" => Ok(Tier::Human),
            other => Err(TierParseError(other.to_owned())),
        }
    }
}
