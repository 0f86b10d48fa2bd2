//! Per-date scenario lineup offered on the home menu.
use crate::constants::DEFAULT_LINEUP;
use crate::data::{Scenario, ScenarioPool};
use crate::prng::srandom;
use crate::sampler::sample;
use serde::{Deserialize, Serialize};

/// How many scenarios to draw from one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupDraw {
    pub category: String,
    pub count: usize,
}

/// Ordered draws making up a lineup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupPlan {
    pub draws: Vec<LineupDraw>,
}

impl Default for LineupPlan {
    fn default() -> Self {
        Self {
            draws: DEFAULT_LINEUP
                .iter()
                .map(|(category, count)| LineupDraw {
                    category: (*category).to_string(),
                    count: *count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupSlot<'a> {
    pub category: String,
    pub scenarios: Vec<&'a Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineup<'a> {
    pub seed: u32,
    pub slots: Vec<LineupSlot<'a>>,
}

impl<'a> Lineup<'a> {
    /// Every drawn scenario in plan order.
    pub fn scenarios(&self) -> impl Iterator<Item = &'a Scenario> + '_ {
        self.slots.iter().flat_map(|slot| slot.scenarios.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.scenarios.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Draw a lineup from one xorshift stream, applying draws in plan order.
///
/// A category missing from the pool yields an empty slot.
#[must_use]
pub fn daily_lineup<'a>(pool: &'a ScenarioPool, plan: &LineupPlan, seed: u32) -> Lineup<'a> {
    let mut rng = srandom(seed);
    let slots = plan
        .draws
        .iter()
        .map(|draw| {
            let candidates: Vec<&Scenario> = pool.category(&draw.category).iter().collect();
            LineupSlot {
                category: draw.category.clone(),
                scenarios: sample(&candidates, draw.count, &mut rng),
            }
        })
        .collect();
    Lineup { seed, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::seed_from_date;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    #[test]
    fn default_plan_draws_from_each_category() {
        let pool = ScenarioPool::bundled();
        let seed = seed_from_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        let lineup = daily_lineup(&pool, &LineupPlan::default(), seed);
        assert_eq!(lineup.slots.len(), 3);
        assert_eq!(lineup.slots[0].category, "daily");
        assert_eq!(lineup.slots[0].scenarios.len(), 2);
        assert_eq!(lineup.slots[1].scenarios.len(), 1);
        assert_eq!(lineup.slots[2].scenarios.len(), 1);
        let ids: HashSet<&str> = lineup.scenarios().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), lineup.len());
    }

    #[test]
    fn same_seed_same_lineup() {
        let pool = ScenarioPool::bundled();
        let plan = LineupPlan::default();
        let first: Vec<&str> = daily_lineup(&pool, &plan, 77)
            .scenarios()
            .map(|s| s.id.as_str())
            .collect();
        let second: Vec<&str> = daily_lineup(&pool, &plan, 77)
            .scenarios()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_category_yields_empty_slot() {
        let pool = ScenarioPool::bundled();
        let plan = LineupPlan {
            draws: vec![LineupDraw {
                category: "weekend".to_string(),
                count: 3,
            }],
        };
        let lineup = daily_lineup(&pool, &plan, 1);
        assert_eq!(lineup.slots.len(), 1);
        assert!(lineup.is_empty());
    }
}
