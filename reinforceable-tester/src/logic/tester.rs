use colored::Colorize;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use reinforceable_game::{
    ContentLoader, MemorySink, MissionEngine, MissionSession, Presentation, PreparedDay,
    ReportError, ResultPayload, ResultSink, Scenario, SessionIdentity, percent,
};

use super::policy::{PlayerPolicy, Strategy};
use super::seeds::SeedInfo;

/// Upper bound on decisions in one mission before it counts as a loop.
const STEP_LIMIT: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub category: String,
    pub seed: String,
    pub strategy: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub mean_percent: f64,
    pub endings: BTreeMap<String, usize>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// What one completed mission looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionTrace {
    pub ending_key: String,
    pub deltas: Vec<i32>,
    pub percent: u8,
}

/// Records every payload locally and forwards it to an optional real sink.
#[derive(Clone)]
struct RecordingSink {
    memory: MemorySink,
    forward: Option<Rc<dyn ResultSink>>,
}

impl ResultSink for RecordingSink {
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError> {
        self.memory.submit(payload)?;
        match &self.forward {
            Some(sink) => sink.submit(payload),
            None => Ok(()),
        }
    }
}

pub struct LogicTester {
    identity: SessionIdentity,
    forward: Option<Rc<dyn ResultSink>>,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(identity: SessionIdentity, verbose: bool) -> Self {
        Self {
            identity,
            forward: None,
            verbose,
        }
    }

    /// Also hand every finished mission to `sink`.
    #[must_use]
    pub fn with_forward(mut self, sink: Rc<dyn ResultSink>) -> Self {
        self.forward = Some(sink);
        self
    }

    /// Play every scenario in the day's lineup once per strategy.
    pub fn run_day<L: ContentLoader>(
        &self,
        engine: &MissionEngine<L>,
        day: &PreparedDay,
        seed: &SeedInfo,
        strategies: &[Strategy],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let lineup = day.lineup();
        let mut results = Vec::new();

        for slot in &lineup.slots {
            for scenario in &slot.scenarios {
                for &strategy in strategies {
                    if self.verbose {
                        println!(
                            "🧪 Testing mission: {} (category: {} {} strategy: {})",
                            scenario.id.bright_white(),
                            slot.category,
                            seed.label(),
                            strategy
                        );
                    }
                    results.push(self.run_single_scenario(
                        engine,
                        day,
                        &slot.category,
                        scenario,
                        seed,
                        strategy,
                        iterations,
                    ));
                }
            }
        }

        results
    }

    #[allow(clippy::too_many_arguments)]
    fn run_single_scenario<L: ContentLoader>(
        &self,
        engine: &MissionEngine<L>,
        day: &PreparedDay,
        category: &str,
        scenario: &Scenario,
        seed: &SeedInfo,
        strategy: Strategy,
        iterations: usize,
    ) -> ScenarioResult {
        let memory = MemorySink::new();
        let sink = RecordingSink {
            memory: memory.clone(),
            forward: self.forward.clone(),
        };
        let mut session = engine.create_session(day, self.identity.clone(), sink);

        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut endings: BTreeMap<String, usize> = BTreeMap::new();
        let mut percent_total = 0_u64;

        for i in 0..iterations {
            let start_time = Instant::now();
            let policy_seed =
                u64::from(seed.seed).wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let mut policy = strategy.create_policy(policy_seed);

            match play_mission(&mut session, &memory, scenario, policy.as_mut()) {
                Ok(trace) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    percent_total += u64::from(trace.percent);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) ending:{} percent:{} decisions:{}",
                            i + 1,
                            iterations,
                            trace.ending_key,
                            trace.percent,
                            trace.deltas.len()
                        );
                    }
                    *endings.entry(trace.ending_key).or_default() += 1;
                }
                Err(err) => {
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            err.clone().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (strategy {}, {}): {err}",
                        i + 1,
                        strategy,
                        seed.label()
                    ));
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_percent = if successes == 0 {
            0.0
        } else {
            percent_total as f64 / successes as f64
        };

        ScenarioResult {
            scenario_name: scenario.id.clone(),
            category: category.to_string(),
            seed: seed.label(),
            strategy: strategy.to_string(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            mean_percent,
            endings,
            average_duration,
            performance_data,
        }
    }
}

/// Drive one mission from start to "Play again" and check the run invariants.
pub fn play_mission<S: ResultSink>(
    session: &mut MissionSession<S>,
    submitted: &MemorySink,
    scenario: &Scenario,
    policy: &mut dyn PlayerPolicy,
) -> Result<MissionTrace, String> {
    let before = submitted.len();
    let score_step = session.config().score_step;
    let mut view = session.start(scenario).map_err(|e| e.to_string())?;
    let mut deltas = Vec::new();

    for _ in 0..STEP_LIMIT {
        let Presentation::Step(step) = &view else {
            break;
        };
        let node = session
            .current_node()
            .ok_or_else(|| "run ended before an ending was shown".to_string())?;
        let decision = policy
            .pick_option(&step.options, node)
            .ok_or_else(|| format!("no option offered at node {}", step.node_id))?;
        debug!(
            "{} picked option {} at node {} ({})",
            policy.name(),
            decision.option,
            step.node_id,
            decision.rationale.as_deref().unwrap_or("-")
        );
        let outcome = session.choose(decision.option).map_err(|e| e.to_string())?;
        if !outcome.scored {
            return Err(format!("step option at node {} was not scored", step.node_id));
        }
        deltas.push(outcome.delta);
        view = outcome.next;
    }

    let Presentation::Ending(ending) = view else {
        return Err(format!("no ending within {STEP_LIMIT} decisions"));
    };
    let summary = &ending.summary;
    let expected_points: i32 = deltas.iter().sum();
    let expected_max = score_step * i32::try_from(deltas.len()).unwrap_or(i32::MAX);
    if summary.points != expected_points {
        return Err(format!(
            "points {} != sum of deltas {expected_points}",
            summary.points
        ));
    }
    if summary.max_possible != expected_max {
        return Err(format!(
            "max_possible {} != {score_step} x {} decisions",
            summary.max_possible,
            deltas.len()
        ));
    }
    let expected_tier = session.config().tiers.tier_for(summary.percent);
    if summary.tier != expected_tier {
        return Err(format!(
            "tier {} does not match {}% (expected {expected_tier})",
            summary.tier, summary.percent
        ));
    }

    for _ in 0..2 {
        session.present().map_err(|e| e.to_string())?;
    }
    let sent = submitted.len() - before;
    if sent != 1 {
        return Err(format!("expected exactly one submission, saw {sent}"));
    }
    let payloads = submitted.payloads();
    let payload = payloads
        .last()
        .ok_or_else(|| "submission buffer is empty".to_string())?;
    if payload.scenario_id != scenario.id
        || payload.points != summary.points
        || payload.max_possible != summary.max_possible
        || payload.percent != percent(summary.points, summary.max_possible)
        || payload.events.len() != deltas.len()
    {
        return Err(format!("payload disagrees with the result screen: {payload:?}"));
    }

    let play_again = ending
        .options
        .first()
        .ok_or_else(|| "ending offers no way home".to_string())?;
    let home = session.choose(play_again.id).map_err(|e| e.to_string())?;
    if home.scored || home.next != Presentation::Home || session.is_running() {
        return Err("play again did not return home".to_string());
    }

    Ok(MissionTrace {
        ending_key: summary.ending_key.clone(),
        deltas,
        percent: summary.percent,
    })
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations
            .iter()
            .map(std::time::Duration::as_millis)
            .collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
