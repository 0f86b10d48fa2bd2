use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUNDLED_POOL: &str = include_str!("../assets/data/missions.json");

/// A selectable response within a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending: Option<String>,
}

/// Where a choice leads once it is resolved against its scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceTarget<'a> {
    Step(&'a str),
    Ending(&'a str),
}

impl Choice {
    /// The choice's single target, or `None` when it names both or neither.
    #[must_use]
    pub fn target(&self) -> Option<ChoiceTarget<'_>> {
        match (self.next.as_deref(), self.ending.as_deref()) {
            (Some(step), None) => Some(ChoiceTarget::Step(step)),
            (None, Some(ending)) => Some(ChoiceTarget::Ending(ending)),
            _ => None,
        }
    }
}

/// One presented situation and its responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
    #[serde(default)]
    pub choices: BTreeMap<String, Choice>,
}

/// An authored terminal outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ending {
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// A complete branching scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub start: String,
    pub steps: BTreeMap<String, Step>,
    #[serde(default)]
    pub endings: BTreeMap<String, Ending>,
}

impl Scenario {
    /// Number of choices across every step.
    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.steps.values().map(|step| step.choices.len()).sum()
    }
}

/// Container for every scenario category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScenarioPool {
    pub categories: BTreeMap<String, Vec<Scenario>>,
}

impl ScenarioPool {
    /// Create an empty pool (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Load a pool from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid pool.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The demonstration pool compiled into the crate.
    ///
    /// # Panics
    ///
    /// Panics if the bundled asset is not valid pool JSON, which the crate's
    /// own tests rule out.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_POOL).expect("bundled mission pool is valid JSON")
    }

    /// Add a scenario to a category, creating the category on demand.
    pub fn insert(&mut self, category: &str, scenario: Scenario) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(scenario);
    }

    /// Scenarios in a category; empty when the category is unknown.
    #[must_use]
    pub fn category(&self, name: &str) -> &[Scenario] {
        self.categories.get(name).map_or(&[], Vec::as_slice)
    }

    /// Every scenario paired with its category name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scenario)> {
        self.categories.iter().flat_map(|(category, scenarios)| {
            scenarios
                .iter()
                .map(move |scenario| (category.as_str(), scenario))
        })
    }

    /// Look up a scenario by id across all categories.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.iter()
            .map(|(_, scenario)| scenario)
            .find(|scenario| scenario.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_from_json() {
        let json = r#"{
            "categories": {
                "daily": [
                    {
                        "id": "lineup",
                        "title": "Lining Up",
                        "start": "s1",
                        "steps": {
                            "s1": {
                                "text": "The class is lining up for lunch.",
                                "choices": {
                                    "a": { "text": "Praise the quiet line", "score": 10, "feedback": "Specific praise!", "ending": "win" },
                                    "b": { "text": "Shout over the noise", "score": -10, "next": "s1" }
                                }
                            }
                        },
                        "endings": {
                            "win": { "title": "Calm Line", "text": "Everyone walks to lunch." }
                        }
                    }
                ]
            }
        }"#;

        let pool = ScenarioPool::from_json(json).unwrap();
        assert_eq!(pool.len(), 1);
        let scenario = pool.find("lineup").unwrap();
        assert_eq!(scenario.title, "Lining Up");
        assert_eq!(scenario.choice_count(), 2);
        let praise = &scenario.steps["s1"].choices["a"];
        assert_eq!(praise.target(), Some(ChoiceTarget::Ending("win")));
        let shout = &scenario.steps["s1"].choices["b"];
        assert_eq!(shout.target(), Some(ChoiceTarget::Step("s1")));
        assert!(shout.feedback.is_empty());
    }

    #[test]
    fn target_is_none_for_both_or_neither() {
        let mut choice = Choice {
            text: "x".to_string(),
            score: 0,
            feedback: String::new(),
            next: Some("a".to_string()),
            ending: Some("b".to_string()),
        };
        assert_eq!(choice.target(), None);
        choice.next = None;
        choice.ending = None;
        assert_eq!(choice.target(), None);
    }

    #[test]
    fn unknown_category_is_empty() {
        let pool = ScenarioPool::bundled();
        assert!(pool.category("no-such-category").is_empty());
        assert!(!pool.category("daily").is_empty());
        assert!(ScenarioPool::empty().is_empty());
    }
}
