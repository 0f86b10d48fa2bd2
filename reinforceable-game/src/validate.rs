//! Load-time content checks.
//!
//! Authored content is static, so every broken reference is reported here
//! instead of surfacing as a dead click mid-mission.
use crate::constants::{CONVENTIONAL_SCORES, MAX_ABS_CHOICE_SCORE};
use crate::data::{ChoiceTarget, Scenario, ScenarioPool};
use crate::error::EngineError;
use std::collections::{BTreeSet, HashMap, VecDeque};
use thiserror::Error;

/// A single problem found in authored content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("scenario has an empty id")]
    EmptyId,
    #[error("scenario '{scenario}' starts at missing step '{start}'")]
    MissingStart { scenario: String, start: String },
    #[error("scenario '{scenario}' step '{step}' has no choices")]
    EmptyStep { scenario: String, step: String },
    #[error("scenario '{scenario}' step '{step}' choice '{choice}' points to missing step '{target}'")]
    DanglingNext {
        scenario: String,
        step: String,
        choice: String,
        target: String,
    },
    #[error(
        "scenario '{scenario}' step '{step}' choice '{choice}' points to missing ending '{target}'"
    )]
    DanglingEnding {
        scenario: String,
        step: String,
        choice: String,
        target: String,
    },
    #[error("scenario '{scenario}' step '{step}' choice '{choice}' sets both next and ending")]
    AmbiguousTarget {
        scenario: String,
        step: String,
        choice: String,
    },
    #[error("scenario '{scenario}' step '{step}' choice '{choice}' sets neither next nor ending")]
    MissingTarget {
        scenario: String,
        step: String,
        choice: String,
    },
    #[error(
        "scenario '{scenario}' step '{step}' choice '{choice}' scores {score} (allowed -{max}..={max})"
    )]
    ScoreOutOfRange {
        scenario: String,
        step: String,
        choice: String,
        score: i32,
        max: i32,
    },
    #[error("scenario id '{scenario}' appears in both '{first}' and '{second}'")]
    DuplicateId {
        scenario: String,
        first: String,
        second: String,
    },
}

/// Non-blocking observations about authored content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentWarning {
    UnreachableStep { scenario: String, step: String },
    UnreachableEnding { scenario: String, ending: String },
    UnusualScore {
        scenario: String,
        step: String,
        choice: String,
        score: i32,
    },
    EmptyCategory { category: String },
}

impl std::fmt::Display for ContentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreachableStep { scenario, step } => {
                write!(f, "scenario '{scenario}' step '{step}' is unreachable")
            }
            Self::UnreachableEnding { scenario, ending } => {
                write!(f, "scenario '{scenario}' ending '{ending}' is unreachable")
            }
            Self::UnusualScore {
                scenario,
                step,
                choice,
                score,
            } => write!(
                f,
                "scenario '{scenario}' step '{step}' choice '{choice}' scores {score} (expected -10, 0 or 10)"
            ),
            Self::EmptyCategory { category } => write!(f, "category '{category}' is empty"),
        }
    }
}

/// Everything found by a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ContentError>,
    pub warnings: Vec<ContentWarning>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Convert into a result, keeping warnings out of the error path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidContent` when any error was recorded.
    pub fn into_result(self) -> Result<Vec<ContentWarning>, EngineError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(EngineError::InvalidContent(self.errors))
        }
    }
}

/// Check one scenario's references, targets and reachability.
#[must_use]
pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let mut report = ValidationReport::default();
    let sid = scenario.id.clone();

    if scenario.id.trim().is_empty() {
        report.errors.push(ContentError::EmptyId);
    }
    if !scenario.steps.contains_key(&scenario.start) {
        report.errors.push(ContentError::MissingStart {
            scenario: sid.clone(),
            start: scenario.start.clone(),
        });
    }

    for (step_key, step) in &scenario.steps {
        if step.choices.is_empty() {
            report.errors.push(ContentError::EmptyStep {
                scenario: sid.clone(),
                step: step_key.clone(),
            });
        }
        for (choice_key, choice) in &step.choices {
            if choice.score.unsigned_abs() > MAX_ABS_CHOICE_SCORE.unsigned_abs() {
                report.errors.push(ContentError::ScoreOutOfRange {
                    scenario: sid.clone(),
                    step: step_key.clone(),
                    choice: choice_key.clone(),
                    score: choice.score,
                    max: MAX_ABS_CHOICE_SCORE,
                });
            } else if !CONVENTIONAL_SCORES.contains(&choice.score) {
                report.warnings.push(ContentWarning::UnusualScore {
                    scenario: sid.clone(),
                    step: step_key.clone(),
                    choice: choice_key.clone(),
                    score: choice.score,
                });
            }
            match choice.target() {
                Some(ChoiceTarget::Step(target)) if !scenario.steps.contains_key(target) => {
                    report.errors.push(ContentError::DanglingNext {
                        scenario: sid.clone(),
                        step: step_key.clone(),
                        choice: choice_key.clone(),
                        target: target.to_string(),
                    });
                }
                Some(ChoiceTarget::Ending(target)) if !scenario.endings.contains_key(target) => {
                    report.errors.push(ContentError::DanglingEnding {
                        scenario: sid.clone(),
                        step: step_key.clone(),
                        choice: choice_key.clone(),
                        target: target.to_string(),
                    });
                }
                Some(_) => {}
                None if choice.next.is_some() => {
                    report.errors.push(ContentError::AmbiguousTarget {
                        scenario: sid.clone(),
                        step: step_key.clone(),
                        choice: choice_key.clone(),
                    });
                }
                None => {
                    report.errors.push(ContentError::MissingTarget {
                        scenario: sid.clone(),
                        step: step_key.clone(),
                        choice: choice_key.clone(),
                    });
                }
            }
        }
    }

    if report.errors.is_empty() {
        report.warnings.extend(unreachable_warnings(scenario));
    }
    report
}

fn unreachable_warnings(scenario: &Scenario) -> Vec<ContentWarning> {
    let mut seen_steps: BTreeSet<&str> = BTreeSet::new();
    let mut seen_endings: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([scenario.start.as_str()]);

    while let Some(key) = queue.pop_front() {
        if !seen_steps.insert(key) {
            continue;
        }
        let Some(step) = scenario.steps.get(key) else {
            continue;
        };
        for choice in step.choices.values() {
            match choice.target() {
                Some(ChoiceTarget::Step(next)) => queue.push_back(next),
                Some(ChoiceTarget::Ending(ending)) => {
                    seen_endings.insert(ending);
                }
                None => {}
            }
        }
    }

    let steps = scenario
        .steps
        .keys()
        .filter(|key| !seen_steps.contains(key.as_str()))
        .map(|key| ContentWarning::UnreachableStep {
            scenario: scenario.id.clone(),
            step: key.clone(),
        });
    let endings = scenario
        .endings
        .keys()
        .filter(|key| !seen_endings.contains(key.as_str()))
        .map(|key| ContentWarning::UnreachableEnding {
            scenario: scenario.id.clone(),
            ending: key.clone(),
        });
    steps.chain(endings).collect()
}

/// Validate every scenario in a pool, plus cross-scenario id uniqueness.
#[must_use]
pub fn validate_pool(pool: &ScenarioPool) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut first_seen: HashMap<&str, &str> = HashMap::new();

    for (category, scenarios) in &pool.categories {
        if scenarios.is_empty() {
            report.warnings.push(ContentWarning::EmptyCategory {
                category: category.clone(),
            });
        }
        for scenario in scenarios {
            if let Some(first) = first_seen.insert(scenario.id.as_str(), category.as_str()) {
                report.errors.push(ContentError::DuplicateId {
                    scenario: scenario.id.clone(),
                    first: first.to_string(),
                    second: category.clone(),
                });
            }
            report.merge(validate_scenario(scenario));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Choice, Ending, Step};
    use std::collections::BTreeMap;

    fn choice(score: i32, next: Option<&str>, ending: Option<&str>) -> Choice {
        Choice {
            text: format!("choice {score}"),
            score,
            feedback: String::new(),
            next: next.map(str::to_string),
            ending: ending.map(str::to_string),
        }
    }

    fn scenario_with(choices: Vec<(&str, Choice)>) -> Scenario {
        let mut steps = BTreeMap::new();
        steps.insert(
            "s1".to_string(),
            Step {
                text: "start".to_string(),
                choices: choices
                    .into_iter()
                    .map(|(k, c)| (k.to_string(), c))
                    .collect(),
            },
        );
        let mut endings = BTreeMap::new();
        endings.insert(
            "done".to_string(),
            Ending {
                title: "Done".to_string(),
                text: String::new(),
            },
        );
        Scenario {
            id: "t".to_string(),
            title: "T".to_string(),
            start: "s1".to_string(),
            steps,
            endings,
        }
    }

    #[test]
    fn clean_scenario_passes() {
        let scenario = scenario_with(vec![("a", choice(10, None, Some("done")))]);
        let report = validate_scenario(&scenario);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn dangling_references_are_all_reported() {
        let scenario = scenario_with(vec![
            ("a", choice(10, Some("nowhere"), None)),
            ("b", choice(0, None, Some("missing"))),
            ("c", choice(0, Some("s1"), Some("done"))),
            ("d", choice(0, None, None)),
        ]);
        let report = validate_scenario(&scenario);
        assert_eq!(report.errors.len(), 4);
        assert!(matches!(report.errors[0], ContentError::DanglingNext { .. }));
        assert!(matches!(report.errors[1], ContentError::DanglingEnding { .. }));
        assert!(matches!(report.errors[2], ContentError::AmbiguousTarget { .. }));
        assert!(matches!(report.errors[3], ContentError::MissingTarget { .. }));
    }

    #[test]
    fn missing_start_and_empty_step() {
        let mut scenario = scenario_with(Vec::new());
        scenario.start = "ghost".to_string();
        let report = validate_scenario(&scenario);
        assert!(report.errors.contains(&ContentError::MissingStart {
            scenario: "t".to_string(),
            start: "ghost".to_string(),
        }));
        assert!(report.errors.contains(&ContentError::EmptyStep {
            scenario: "t".to_string(),
            step: "s1".to_string(),
        }));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn warnings_do_not_block() {
        let mut scenario = scenario_with(vec![("a", choice(7, None, Some("done")))]);
        scenario.endings.insert(
            "orphan".to_string(),
            Ending {
                title: "Orphan".to_string(),
                text: String::new(),
            },
        );
        let warnings = validate_scenario(&scenario).into_result().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| matches!(w, ContentWarning::UnusualScore { score: 7, .. })));
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ContentWarning::UnreachableEnding { ending, .. } if ending == "orphan"))
        );
    }

    #[test]
    fn scores_beyond_the_cap_are_errors() {
        let scenario = scenario_with(vec![
            ("a", choice(i32::MAX, None, Some("done"))),
            ("b", choice(-101, None, Some("done"))),
            ("c", choice(100, None, Some("done"))),
        ]);
        let report = validate_scenario(&scenario);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| matches!(e, ContentError::ScoreOutOfRange { max: 100, .. })));
        assert!(report.errors.iter().any(|e| matches!(e, ContentError::ScoreOutOfRange { score: i32::MIN..=-101, .. })));
        assert!(
            report
                .warnings
                .iter()
                .any(|w| matches!(w, ContentWarning::UnusualScore { score: 100, .. }))
        );
        assert!(crate::compiler::compile(&scenario, "Play again").is_err());
    }

    #[test]
    fn duplicate_ids_across_categories() {
        let scenario = scenario_with(vec![("a", choice(10, None, Some("done")))]);
        let mut pool = ScenarioPool::empty();
        pool.insert("daily", scenario.clone());
        pool.insert("crisis", scenario);
        pool.categories.insert("wildcard".to_string(), Vec::new());
        let report = validate_pool(&pool);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], ContentError::DuplicateId { .. }));
        assert!(
            report
                .warnings
                .contains(&ContentWarning::EmptyCategory {
                    category: "wildcard".to_string()
                })
        );
    }

    #[test]
    fn bundled_pool_is_clean() {
        let report = validate_pool(&ScenarioPool::bundled());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }
}
