//! Cascade definitions — what gets deployed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::duration::DurationMs;
use crate::handler::TierHandler;
use crate::id::FunctionId;
use crate::tier::Tier;
use crate::version::Version;

/// Per-tier timeout defaults: code 5s, generative 30s, agentic 5m,
/// human 24h.
pub fn default_timeout(tier: Tier) -> DurationMs {
    match tier {
        Tier::Code => DurationMs::from_millis(5_000),
        Tier::Generative => DurationMs::from_millis(30_000),
        Tier::Agentic => DurationMs::from_millis(300_000),
        Tier::Human => DurationMs::from_millis(86_400_000),
    }
}

/// A deployed cascade: an id, a name, a semver, handlers for any
/// subset of tiers, and execution options.
///
/// Created at deploy time and immutable thereafter — a changed cascade
/// is a new version. Tiers with no handler are skipped as absent.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CascadeDefinition {
    /// Stable function id.
    pub id: FunctionId,
    /// Human-readable name.
    pub name: String,
    /// Deploy-time version.
    pub version: Version,
    /// Handlers, keyed (and therefore ordered) by tier.
    pub tiers: BTreeMap<Tier, TierHandler>,
    /// Execution options.
    pub options: CascadeOptions,
}

impl CascadeDefinition {
    /// A definition with no tiers and default options.
    pub fn new(id: impl Into<FunctionId>, name: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version,
            tiers: BTreeMap::new(),
            options: CascadeOptions::default(),
        }
    }

    /// Add a tier handler. The tier is taken from the handler variant;
    /// a second handler for the same tier replaces the first.
    pub fn with_tier(mut self, handler: TierHandler) -> Self {
        self.tiers.insert(handler.tier(), handler);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: CascadeOptions) -> Self {
        self.options = options;
        self
    }

    /// The lowest tier that has a handler, if any.
    pub fn lowest_tier(&self) -> Option<Tier> {
        self.tiers.keys().next().copied()
    }

    /// The handler for `tier`, if defined.
    pub fn handler(&self, tier: Tier) -> Option<&TierHandler> {
        self.tiers.get(&tier)
    }
}

/// Execution options recognized by the engine.
///
/// Every knob has a default: start at the lowest defined tier, the
/// per-tier timeout defaults of [`default_timeout`], zero retries,
/// nothing skipped, fallback off.
#[non_exhaustive]
#[derive(Clone, Default)]
pub struct CascadeOptions {
    /// First tier to consider. Clamped up to the lowest defined tier.
    pub start_tier: Option<Tier>,
    /// Per-tier timeout overrides.
    pub tier_timeouts: BTreeMap<Tier, DurationMs>,
    /// Per-tier local retry budgets.
    pub tier_retries: BTreeMap<Tier, u32>,
    /// Tiers excluded statically.
    pub skip_tiers: BTreeSet<Tier>,
    /// Input-dependent exclusions, evaluated in declared order.
    pub skip_conditions: Vec<SkipCondition>,
    /// Whether a failing tier's partial result is forwarded to the
    /// next tier's context.
    pub enable_fallback: bool,
}

impl CascadeOptions {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start tier.
    pub fn with_start_tier(mut self, tier: Tier) -> Self {
        self.start_tier = Some(tier);
        self
    }

    /// Override one tier's timeout.
    pub fn with_timeout(mut self, tier: Tier, timeout: DurationMs) -> Self {
        self.tier_timeouts.insert(tier, timeout);
        self
    }

    /// Set one tier's local retry budget. A budget of `n` allows up to
    /// `n + 1` total attempts.
    pub fn with_retries(mut self, tier: Tier, budget: u32) -> Self {
        self.tier_retries.insert(tier, budget);
        self
    }

    /// Statically exclude a tier.
    pub fn skip_tier(mut self, tier: Tier) -> Self {
        self.skip_tiers.insert(tier);
        self
    }

    /// Append an input-dependent exclusion.
    pub fn with_skip_condition(mut self, condition: SkipCondition) -> Self {
        self.skip_conditions.push(condition);
        self
    }

    /// Enable or disable partial-result forwarding.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    /// The effective timeout for `tier`.
    pub fn timeout_for(&self, tier: Tier) -> DurationMs {
        self.tier_timeouts
            .get(&tier)
            .copied()
            .unwrap_or_else(|| default_timeout(tier))
    }

    /// The effective local retry budget for `tier`.
    pub fn retries_for(&self, tier: Tier) -> u32 {
        self.tier_retries.get(&tier).copied().unwrap_or(0)
    }
}

impl fmt::Debug for CascadeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeOptions")
            .field("start_tier", &self.start_tier)
            .field("tier_timeouts", &self.tier_timeouts)
            .field("tier_retries", &self.tier_retries)
            .field("skip_tiers", &self.skip_tiers)
            .field("skip_conditions", &self.skip_conditions)
            .field("enable_fallback", &self.enable_fallback)
            .finish()
    }
}

/// An input-dependent tier exclusion.
///
/// The predicate sees only the execution input; the reason is what
/// surfaces in `skipped_tiers` when it matches.
#[derive(Clone)]
pub struct SkipCondition {
    /// The tier this condition may exclude.
    pub tier: Tier,
    /// Reason recorded when the condition matches.
    pub reason: String,
    predicate: Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>,
}

impl SkipCondition {
    /// Create a condition.
    pub fn new(
        tier: Tier,
        reason: impl Into<String>,
        predicate: impl Fn(&serde_json::Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            tier,
            reason: reason.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate against an input.
    pub fn matches(&self, input: &serde_json::Value) -> bool {
        (self.predicate)(input)
    }
}

impl fmt::Debug for SkipCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipCondition")
            .field("tier", &self.tier)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_match_tier() {
        let opts = CascadeOptions::new();
        assert_eq!(opts.timeout_for(Tier::Code).as_millis(), 5_000);
        assert_eq!(opts.timeout_for(Tier::Generative).as_millis(), 30_000);
        assert_eq!(opts.timeout_for(Tier::Agentic).as_millis(), 300_000);
        assert_eq!(opts.timeout_for(Tier::Human).as_millis(), 86_400_000);
    }

    #[test]
    fn timeout_override_wins() {
        let opts = CascadeOptions::new().with_timeout(Tier::Code, DurationMs::from_millis(100));
        assert_eq!(opts.timeout_for(Tier::Code).as_millis(), 100);
        assert_eq!(opts.timeout_for(Tier::Generative).as_millis(), 30_000);
    }

    #[test]
    fn retries_default_to_zero() {
        let opts = CascadeOptions::new().with_retries(Tier::Code, 2);
        assert_eq!(opts.retries_for(Tier::Code), 2);
        assert_eq!(opts.retries_for(Tier::Agentic), 0);
    }

    #[test]
    fn skip_condition_sees_input() {
        let cond = SkipCondition::new(Tier::Generative, "AI disabled", |input| {
            !input["useAI"].as_bool().unwrap_or(false)
        });
        assert!(cond.matches(&serde_json::json!({ "useAI": false })));
        assert!(!cond.matches(&serde_json::json!({ "useAI": true })));
    }
}
