//! The skip policy — decides whether a tier runs at all.

use tier0::{CascadeDefinition, SkipReason, Tier};

/// Evaluate the skip policy for `tier` against `input`.
///
/// Rules apply in declared order:
/// 1. no handler for the tier → skip(absent)
/// 2. tier in the static skip list → skip(listed)
/// 3. first matching skip condition for the tier → skip(its reason)
/// 4. otherwise run
///
/// Returns the reason when the tier is excluded. Skipped tiers are
/// recorded by the engine; they never enter history.
pub fn evaluate(
    definition: &CascadeDefinition,
    tier: Tier,
    input: &serde_json::Value,
) -> Option<SkipReason> {
    if definition.handler(tier).is_none() {
        return Some(SkipReason::Absent);
    }
    if definition.options.skip_tiers.contains(&tier) {
        return Some(SkipReason::Listed);
    }
    definition
        .options
        .skip_conditions
        .iter()
        .find(|cond| cond.tier == tier && cond.matches(input))
        .map(|cond| SkipReason::Condition(cond.reason.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tier0::test_utils::EchoHandler;
    use tier0::{CascadeOptions, SkipCondition, TierHandler, Version};

    fn definition() -> CascadeDefinition {
        CascadeDefinition::new("fn-1", "skippy", Version::new(1, 0, 0))
            .with_tier(TierHandler::Code(Arc::new(EchoHandler)))
            .with_tier(TierHandler::Generative(Arc::new(EchoHandler)))
    }

    #[test]
    fn absent_tier_skips() {
        let def = definition();
        assert_eq!(
            evaluate(&def, Tier::Agentic, &json!(null)),
            Some(SkipReason::Absent)
        );
    }

    #[test]
    fn listed_tier_skips() {
        let def = definition()
            .with_options(CascadeOptions::new().skip_tier(Tier::Generative));
        assert_eq!(
            evaluate(&def, Tier::Generative, &json!(null)),
            Some(SkipReason::Listed)
        );
    }

    #[test]
    fn static_list_beats_conditions() {
        let def = definition().with_options(
            CascadeOptions::new()
                .skip_tier(Tier::Generative)
                .with_skip_condition(SkipCondition::new(Tier::Generative, "by condition", |_| {
                    true
                })),
        );
        assert_eq!(
            evaluate(&def, Tier::Generative, &json!(null)),
            Some(SkipReason::Listed)
        );
    }

    #[test]
    fn first_matching_condition_wins() {
        let def = definition().with_options(
            CascadeOptions::new()
                .with_skip_condition(SkipCondition::new(Tier::Generative, "never", |_| false))
                .with_skip_condition(SkipCondition::new(Tier::Generative, "first", |_| true))
                .with_skip_condition(SkipCondition::new(Tier::Generative, "second", |_| true)),
        );
        assert_eq!(
            evaluate(&def, Tier::Generative, &json!(null)),
            Some(SkipReason::Condition("first".into()))
        );
    }

    #[test]
    fn conditions_only_apply_to_their_tier() {
        let def = definition().with_options(
            CascadeOptions::new()
                .with_skip_condition(SkipCondition::new(Tier::Generative, "gen only", |_| true)),
        );
        assert_eq!(evaluate(&def, Tier::Code, &json!(null)), None);
    }

    #[test]
    fn eligible_tier_runs() {
        let def = definition();
        assert_eq!(evaluate(&def, Tier::Code, &json!(null)), None);
    }
}
