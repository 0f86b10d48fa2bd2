use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reinforceable_game::{OptionId, OptionView, RuntimeNode};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub option: OptionId,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(option: OptionId, rationale: Option<String>) -> Self {
        Self { option, rationale }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick one of the presented options. `node` exposes the authored deltas
    /// so scripted learners can aim for a score.
    fn pick_option(&mut self, presented: &[OptionView], node: &RuntimeNode)
    -> Option<PolicyDecision>;
}

/// Built-in choice strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Highest delta, first presented on ties.
    Best,
    /// Lowest delta, first presented on ties.
    Worst,
    /// Whatever is shown first after shuffling.
    First,
    /// Uniform over the presented options.
    Random,
}

impl Strategy {
    pub const ALL: [Self; 4] = [Self::Best, Self::Worst, Self::First, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Worst => "worst",
            Self::First => "first",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Best => Box::new(BestPolicy),
            Self::Worst => Box::new(WorstPolicy),
            Self::First => Box::new(FirstPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "worst" => Ok(Self::Worst),
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random),
            other => bail!("Unknown strategy: {other}"),
        }
    }
}

struct BestPolicy;
struct WorstPolicy;
struct FirstPolicy;

struct RandomPolicy {
    rng: SmallRng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

fn delta_of(node: &RuntimeNode, option: OptionId) -> i32 {
    node.option(option).map_or(0, |runtime| runtime.delta)
}

impl PlayerPolicy for BestPolicy {
    fn name(&self) -> &'static str {
        "Best"
    }

    fn pick_option(
        &mut self,
        presented: &[OptionView],
        node: &RuntimeNode,
    ) -> Option<PolicyDecision> {
        // max_by_key keeps the last maximum, so scan in reverse to keep the first
        let view = presented
            .iter()
            .rev()
            .max_by_key(|view| delta_of(node, view.id))?;
        let delta = delta_of(node, view.id);
        Some(PolicyDecision::new(view.id, Some(format!("delta {delta}"))))
    }
}

impl PlayerPolicy for WorstPolicy {
    fn name(&self) -> &'static str {
        "Worst"
    }

    fn pick_option(
        &mut self,
        presented: &[OptionView],
        node: &RuntimeNode,
    ) -> Option<PolicyDecision> {
        let view = presented
            .iter()
            .min_by_key(|view| delta_of(node, view.id))?;
        let delta = delta_of(node, view.id);
        Some(PolicyDecision::new(view.id, Some(format!("delta {delta}"))))
    }
}

impl PlayerPolicy for FirstPolicy {
    fn name(&self) -> &'static str {
        "First"
    }

    fn pick_option(
        &mut self,
        presented: &[OptionView],
        _node: &RuntimeNode,
    ) -> Option<PolicyDecision> {
        presented
            .first()
            .map(|view| PolicyDecision::new(view.id, None))
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_option(
        &mut self,
        presented: &[OptionView],
        _node: &RuntimeNode,
    ) -> Option<PolicyDecision> {
        if presented.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..presented.len());
        Some(PolicyDecision::new(
            presented[idx].id,
            Some(format!("roll {idx}")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reinforceable_game::{ScenarioPool, compile};

    fn worksheet() -> RuntimeNode {
        let pool = ScenarioPool::bundled();
        let arena = compile(pool.find("independent-work").unwrap(), "Play again").unwrap();
        arena.node(arena.start).unwrap().clone()
    }

    fn presented(node: &RuntimeNode) -> Vec<OptionView> {
        node.options()
            .iter()
            .map(|option| OptionView {
                id: option.id,
                text: option.text.clone(),
            })
            .collect()
    }

    #[test]
    fn best_and_worst_follow_deltas() {
        let node = worksheet();
        let views = presented(&node);
        let best = Strategy::Best
            .create_policy(0)
            .pick_option(&views, &node)
            .unwrap();
        let worst = Strategy::Worst
            .create_policy(0)
            .pick_option(&views, &node)
            .unwrap();
        assert_eq!(node.option(best.option).unwrap().delta, 10);
        assert_eq!(node.option(worst.option).unwrap().delta, -10);
    }

    #[test]
    fn first_takes_presented_order() {
        let node = worksheet();
        let mut views = presented(&node);
        views.reverse();
        let decision = FirstPolicy.pick_option(&views, &node).unwrap();
        assert_eq!(decision.option, views[0].id);
    }

    #[test]
    fn random_is_seeded() {
        let node = worksheet();
        let views = presented(&node);
        let picks = |seed| {
            let mut policy = Strategy::Random.create_policy(seed);
            (0..16)
                .map(|_| policy.pick_option(&views, &node).unwrap().option)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(5), picks(5));
    }

    #[test]
    fn empty_options_yield_nothing() {
        let node = worksheet();
        for strategy in Strategy::ALL {
            assert!(strategy.create_policy(1).pick_option(&[], &node).is_none());
        }
    }

    #[test]
    fn strategies_parse_case_insensitively() {
        assert_eq!("BEST".parse::<Strategy>().unwrap(), Strategy::Best);
        assert_eq!("random".parse::<Strategy>().unwrap(), Strategy::Random);
        assert!("greedy".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Worst.to_string(), "worst");
    }
}
