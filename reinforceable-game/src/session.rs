//! The mission runner: one explicit session context per learner.
use crate::clock::{Clock, SystemClock};
use crate::compiler::{
    CompiledScenario, FeedbackType, NodeId, OptionId, OptionTarget, RuntimeNode, compile,
};
use crate::config::MissionConfig;
use crate::constants::DISPLAY_STREAM_TAG;
use crate::data::{Scenario, ScenarioPool};
use crate::error::EngineError;
use crate::lineup::{Lineup, daily_lineup};
use crate::prng::derive_stream_seed;
use crate::report::{
    DecisionRecord, ResultPayload, ResultSink, SessionIdentity, iso_timestamp, new_session_id,
    submit_quietly,
};
use crate::result::{ResultInputs, ResultSummary, result_summary};
use crate::sampler::shuffle;
use log::debug;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Score and decision log for the mission in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub points: i32,
    pub max_possible: i32,
    pub events: Vec<DecisionRecord>,
    pub session_id: String,
    pub sent_this_run: bool,
}

impl RunState {
    fn fresh(session_id: String) -> Self {
        Self {
            points: 0,
            max_possible: 0,
            events: Vec::new(),
            session_id,
            sent_this_run: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveRun {
    arena: CompiledScenario,
    current: NodeId,
    state: RunState,
}

/// An option as shown to the learner; `id` is what gets chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub node_id: NodeId,
    pub scenario_id: String,
    pub text: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingView {
    pub node_id: NodeId,
    pub summary: ResultSummary,
    pub options: Vec<OptionView>,
}

/// What the learner should see next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Presentation {
    Step(StepView),
    Ending(EndingView),
    /// No mission is running; show the lineup menu.
    Home,
}

impl Presentation {
    #[must_use]
    pub fn options(&self) -> &[OptionView] {
        match self {
            Self::Step(view) => &view.options,
            Self::Ending(view) => &view.options,
            Self::Home => &[],
        }
    }

    #[must_use]
    pub const fn is_ending(&self) -> bool {
        matches!(self, Self::Ending(_))
    }
}

/// Result of selecting an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOutcome {
    pub choice: String,
    pub delta: i32,
    pub feedback: String,
    pub feedback_type: FeedbackType,
    /// False when the option belonged to an ending node.
    pub scored: bool,
    pub next: Presentation,
}

/// Explicit mission context: configuration, identity, result sink and the
/// optional run in progress.
pub struct MissionSession<S: ResultSink, C: Clock = SystemClock> {
    config: MissionConfig,
    identity: SessionIdentity,
    sink: S,
    clock: C,
    display_rng: SmallRng,
    id_rng: ChaCha8Rng,
    run: Option<ActiveRun>,
}

impl<S: ResultSink> MissionSession<S, SystemClock> {
    /// Session on the real clock. `daily_seed` drives option display order.
    #[must_use]
    pub fn new(config: MissionConfig, identity: SessionIdentity, sink: S, daily_seed: u32) -> Self {
        Self::with_clock(
            config,
            identity,
            sink,
            SystemClock,
            daily_seed,
            rand::random(),
        )
    }
}

impl<S: ResultSink, C: Clock> MissionSession<S, C> {
    /// Fully deterministic construction.
    #[must_use]
    pub fn with_clock(
        config: MissionConfig,
        identity: SessionIdentity,
        sink: S,
        clock: C,
        daily_seed: u32,
        id_seed: u64,
    ) -> Self {
        let display_seed = derive_stream_seed(u64::from(daily_seed), DISPLAY_STREAM_TAG);
        Self {
            config,
            identity,
            sink,
            clock,
            display_rng: SmallRng::seed_from_u64(display_seed),
            id_rng: ChaCha8Rng::seed_from_u64(id_seed),
            run: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MissionConfig {
        &self.config
    }

    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run.is_some()
    }

    #[must_use]
    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref().map(|run| &run.state)
    }

    #[must_use]
    pub fn arena(&self) -> Option<&CompiledScenario> {
        self.run.as_ref().map(|run| &run.arena)
    }

    #[must_use]
    pub fn current_node(&self) -> Option<&RuntimeNode> {
        self.run
            .as_ref()
            .and_then(|run| run.arena.node(run.current))
    }

    /// The home-menu lineup for `seed` under this session's plan.
    #[must_use]
    pub fn lineup<'a>(&self, pool: &'a ScenarioPool, seed: u32) -> Lineup<'a> {
        daily_lineup(pool, &self.config.lineup, seed)
    }

    /// Compile `scenario`, reset the run state and present its first step.
    ///
    /// Any run already in progress is discarded.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidContent` if the scenario fails validation.
    pub fn start(&mut self, scenario: &Scenario) -> Result<Presentation, EngineError> {
        let arena = compile(scenario, &self.config.play_again_label)?;
        let session_id = new_session_id(self.clock.now(), &mut self.id_rng);
        debug!(
            "starting mission '{}' as session {session_id}",
            scenario.id
        );
        self.run = Some(ActiveRun {
            current: arena.start,
            arena,
            state: RunState::fresh(session_id),
        });
        self.present()
    }

    /// Start a scenario looked up by id.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownScenario` when the pool has no such id, or
    /// any error from [`Self::start`].
    pub fn start_by_id(
        &mut self,
        pool: &ScenarioPool,
        scenario_id: &str,
    ) -> Result<Presentation, EngineError> {
        let scenario = pool
            .find(scenario_id)
            .ok_or_else(|| EngineError::UnknownScenario(scenario_id.to_string()))?;
        self.start(scenario)
    }

    /// Tear down the current run, if any.
    pub fn go_home(&mut self) {
        if let Some(run) = self.run.take() {
            debug!("leaving mission '{}'", run.arena.scenario_id);
        }
    }

    /// Render the current node with freshly shuffled options.
    ///
    /// The first time an ending node is presented in a run, its result is
    /// submitted; later presentations never resubmit.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownNode` if the run points outside its arena.
    pub fn present(&mut self) -> Result<Presentation, EngineError> {
        let Self {
            config,
            identity,
            sink,
            clock,
            display_rng,
            run,
            ..
        } = self;
        let Some(run) = run.as_mut() else {
            return Ok(Presentation::Home);
        };
        let node = run
            .arena
            .node(run.current)
            .ok_or(EngineError::UnknownNode(run.current))?;

        let views: Vec<OptionView> = node
            .options()
            .iter()
            .map(|option| OptionView {
                id: option.id,
                text: option.text.clone(),
            })
            .collect();
        let options = shuffle(&views, display_rng);

        match node {
            RuntimeNode::Step(step) => Ok(Presentation::Step(StepView {
                node_id: step.id,
                scenario_id: run.arena.scenario_id.clone(),
                text: step.text.clone(),
                options,
            })),
            RuntimeNode::Ending(ending) => {
                let summary = result_summary(
                    &ResultInputs {
                        scenario_id: &run.arena.scenario_id,
                        ending_key: &ending.key,
                        ending_title: &ending.title,
                        ending_text: &ending.text,
                        points: run.state.points,
                        max_possible: run.state.max_possible,
                        decisions: run.state.events.len(),
                    },
                    &config.tiers,
                );
                if !run.state.sent_this_run {
                    run.state.sent_this_run = true;
                    let payload = build_payload(
                        identity,
                        &run.arena.scenario_id,
                        &run.state,
                        &summary,
                        iso_timestamp(clock.now()),
                    );
                    submit_quietly(&*sink, &payload);
                }
                Ok(Presentation::Ending(EndingView {
                    node_id: ending.id,
                    summary,
                    options,
                }))
            }
        }
    }

    /// Select an option of the current node by identity.
    ///
    /// Step options add their delta to the score, grow `max_possible` by the
    /// configured step and are logged; ending options only navigate.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveRun` without a run, `UnknownOption` if the node has no
    /// such option, or `UnknownNode` if the option's target is missing. The run
    /// is left untouched on error.
    pub fn choose(&mut self, option_id: OptionId) -> Result<ChoiceOutcome, EngineError> {
        let score_step = self.config.score_step;
        let run = self.run.as_mut().ok_or(EngineError::NoActiveRun)?;
        let node = run
            .arena
            .node(run.current)
            .ok_or(EngineError::UnknownNode(run.current))?;
        let option = node
            .option(option_id)
            .cloned()
            .ok_or(EngineError::UnknownOption {
                node: run.current,
                option: option_id,
            })?;
        if let OptionTarget::Node(target) = option.target
            && run.arena.node(target).is_none()
        {
            return Err(EngineError::UnknownNode(target));
        }

        let scored = !node.is_terminal();
        if scored {
            run.state.points = run.state.points.saturating_add(option.delta);
            run.state.max_possible = run.state.max_possible.saturating_add(score_step);
            run.state.events.push(DecisionRecord {
                timestamp: iso_timestamp(self.clock.now()),
                node_id: run.current,
                delta: option.delta,
                choice: option.text.clone(),
            });
        }

        let next = match option.target {
            OptionTarget::Home => {
                self.go_home();
                Presentation::Home
            }
            OptionTarget::Node(target) => {
                debug!("node {} -> {target} via option {option_id}", run.current);
                run.current = target;
                self.present()?
            }
        };

        Ok(ChoiceOutcome {
            choice: option.text,
            delta: if scored { option.delta } else { 0 },
            feedback: option.feedback,
            feedback_type: option.feedback_type,
            scored,
            next,
        })
    }

    /// Select the current node's option whose text equals `label`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLabel` when no option matches, plus any error from
    /// [`Self::choose`].
    pub fn choose_by_label(&mut self, label: &str) -> Result<ChoiceOutcome, EngineError> {
        let node = self.current_node().ok_or(EngineError::NoActiveRun)?;
        let option_id = node
            .options()
            .iter()
            .find(|option| option.text == label)
            .map(|option| option.id)
            .ok_or_else(|| EngineError::UnknownLabel {
                node: node.id(),
                label: label.to_string(),
            })?;
        self.choose(option_id)
    }
}

fn build_payload(
    identity: &SessionIdentity,
    scenario_id: &str,
    state: &RunState,
    summary: &ResultSummary,
    timestamp: String,
) -> ResultPayload {
    ResultPayload {
        code: identity.code.clone(),
        session_id: state.session_id.clone(),
        scenario_id: scenario_id.to_string(),
        points: state.points,
        max_possible: state.max_possible,
        percent: summary.percent,
        timestamp,
        events: state.events.clone(),
        mode: identity.mode.clone(),
        student: identity.student.clone(),
    }
}
