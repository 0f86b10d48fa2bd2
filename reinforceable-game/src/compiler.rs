//! Flattens an authored scenario into an arena of addressable nodes.
//!
//! Each run compiles its own arena, so node ids are plain indices and can
//! never collide with a previous run's ids.
use crate::data::{ChoiceTarget, Scenario};
use crate::error::EngineError;
use crate::validate::{ContentError, validate_scenario};
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node inside one run's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of an option within its node, independent of display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub usize);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tone of an option's feedback, derived from its score delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Positive,
    Neutral,
    Negative,
}

impl FeedbackType {
    #[must_use]
    pub const fn from_delta(delta: i32) -> Self {
        if delta > 0 {
            Self::Positive
        } else if delta < 0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Where an option leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "node")]
pub enum OptionTarget {
    Node(NodeId),
    /// Leave the run and return to the lineup menu.
    Home,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOption {
    pub id: OptionId,
    pub text: String,
    pub delta: i32,
    pub feedback: String,
    pub feedback_type: FeedbackType,
    pub target: OptionTarget,
}

pub type Options = SmallVec<[RuntimeOption; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    pub id: NodeId,
    pub key: String,
    pub text: String,
    pub options: Options,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingNode {
    pub id: NodeId,
    pub key: String,
    pub title: String,
    pub text: String,
    pub options: Options,
}

/// A compiled node: either a presented step or a terminal ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RuntimeNode {
    Step(StepNode),
    Ending(EndingNode),
}

impl RuntimeNode {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        match self {
            Self::Step(step) => step.id,
            Self::Ending(ending) => ending.id,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Step(step) => &step.key,
            Self::Ending(ending) => &ending.key,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[RuntimeOption] {
        match self {
            Self::Step(step) => &step.options,
            Self::Ending(ending) => &ending.options,
        }
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&RuntimeOption> {
        self.options().iter().find(|option| option.id == id)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ending(_))
    }
}

/// The arena for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScenario {
    pub scenario_id: String,
    pub title: String,
    pub start: NodeId,
    nodes: Vec<RuntimeNode>,
    step_ids: BTreeMap<String, NodeId>,
    ending_ids: BTreeMap<String, NodeId>,
}

impl CompiledScenario {
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&RuntimeNode> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn step_id(&self, key: &str) -> Option<NodeId> {
        self.step_ids.get(key).copied()
    }

    #[must_use]
    pub fn ending_id(&self, key: &str) -> Option<NodeId> {
        self.ending_ids.get(key).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RuntimeNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Validate and flatten a scenario.
///
/// Steps get ids first in key order, then endings in key order.
///
/// # Errors
///
/// Returns `EngineError::InvalidContent` if the scenario fails validation.
pub fn compile(scenario: &Scenario, play_again_label: &str) -> Result<CompiledScenario, EngineError> {
    let warnings = validate_scenario(scenario).into_result()?;
    for warning in &warnings {
        debug!("content warning: {warning}");
    }

    let step_ids: BTreeMap<String, NodeId> = scenario
        .steps
        .keys()
        .enumerate()
        .map(|(idx, key)| (key.clone(), NodeId(idx)))
        .collect();
    let offset = step_ids.len();
    let ending_ids: BTreeMap<String, NodeId> = scenario
        .endings
        .keys()
        .enumerate()
        .map(|(idx, key)| (key.clone(), NodeId(offset + idx)))
        .collect();

    let mut nodes = Vec::with_capacity(step_ids.len() + ending_ids.len());
    for (key, step) in &scenario.steps {
        let mut options = Options::new();
        for (idx, (choice_key, choice)) in step.choices.iter().enumerate() {
            let target = match choice.target() {
                Some(ChoiceTarget::Step(next)) => step_ids.get(next),
                Some(ChoiceTarget::Ending(ending)) => ending_ids.get(ending),
                None => None,
            };
            let Some(target) = target.copied() else {
                return Err(EngineError::InvalidContent(vec![ContentError::MissingTarget {
                    scenario: scenario.id.clone(),
                    step: key.clone(),
                    choice: choice_key.clone(),
                }]));
            };
            options.push(RuntimeOption {
                id: OptionId(idx),
                text: choice.text.clone(),
                delta: choice.score,
                feedback: choice.feedback.clone(),
                feedback_type: FeedbackType::from_delta(choice.score),
                target: OptionTarget::Node(target),
            });
        }
        nodes.push(RuntimeNode::Step(StepNode {
            id: step_ids[key],
            key: key.clone(),
            text: step.text.clone(),
            options,
        }));
    }
    for (key, ending) in &scenario.endings {
        let mut options = Options::new();
        options.push(RuntimeOption {
            id: OptionId(0),
            text: play_again_label.to_string(),
            delta: 0,
            feedback: String::new(),
            feedback_type: FeedbackType::Neutral,
            target: OptionTarget::Home,
        });
        nodes.push(RuntimeNode::Ending(EndingNode {
            id: ending_ids[key],
            key: key.clone(),
            title: ending.title.clone(),
            text: ending.text.clone(),
            options,
        }));
    }

    let start = step_ids[&scenario.start];
    debug!(
        "compiled scenario '{}' into {} nodes (start {start})",
        scenario.id,
        nodes.len()
    );
    Ok(CompiledScenario {
        scenario_id: scenario.id.clone(),
        title: scenario.title.clone(),
        start,
        nodes,
        step_ids,
        ending_ids,
    })
}
