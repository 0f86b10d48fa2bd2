//! Mission: Reinforceable engine
//!
//! Platform-agnostic core for branching behavior-plan rehearsal missions:
//! date-seeded content sampling, scenario compilation, the mission runner and
//! result reporting. No UI or transport code lives here.

pub mod clock;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod lineup;
pub mod prng;
pub mod report;
pub mod result;
pub mod sampler;
pub mod session;
pub mod validate;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use compiler::{
    CompiledScenario, FeedbackType, NodeId, OptionId, OptionTarget, RuntimeNode, RuntimeOption,
    compile,
};
pub use config::MissionConfig;
pub use data::{Choice, ChoiceTarget, Ending, Scenario, ScenarioPool, Step};
pub use error::{ConfigError, EngineError, ReportError};
pub use lineup::{Lineup, LineupDraw, LineupPlan, LineupSlot, daily_lineup};
pub use prng::{XorShift32, seed_from_date, seed_from_today, srandom};
pub use report::{
    DecisionRecord, MemorySink, NullSink, ResultPayload, ResultSink, SessionIdentity,
};
pub use result::{ResultSummary, Tier, TierConfig, WizardMood, percent};
pub use sampler::{pick, sample, shuffle};
pub use session::{ChoiceOutcome, MissionSession, OptionView, Presentation, RunState};
pub use validate::{ContentError, ContentWarning, ValidationReport, validate_pool, validate_scenario};

use chrono::NaiveDate;
use std::convert::Infallible;

/// Trait for abstracting content loading operations
/// Platform-specific implementations should provide this
pub trait ContentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the scenario pool from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be loaded.
    fn load_pool(&self) -> Result<ScenarioPool, Self::Error>;

    /// Load the deployment's mission configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<MissionConfig, Self::Error>;
}

/// Serves the pool compiled into this crate with default configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledLoader;

impl ContentLoader for BundledLoader {
    type Error = Infallible;

    fn load_pool(&self) -> Result<ScenarioPool, Self::Error> {
        Ok(ScenarioPool::bundled())
    }

    fn load_config(&self) -> Result<MissionConfig, Self::Error> {
        Ok(MissionConfig::default())
    }
}

/// Failures while preparing a day's missions.
#[derive(Debug, thiserror::Error)]
pub enum SetupError<E: std::error::Error + 'static> {
    #[error("loading content failed: {0}")]
    Load(#[source] E),
    #[error(transparent)]
    Content(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Validated content and configuration for one daily seed.
#[derive(Debug, Clone)]
pub struct PreparedDay {
    /// Calendar date the seed came from, when it came from one.
    pub date: Option<NaiveDate>,
    pub seed: u32,
    pub pool: ScenarioPool,
    pub config: MissionConfig,
    pub warnings: Vec<ContentWarning>,
}

impl PreparedDay {
    /// The home-menu lineup for this seed.
    #[must_use]
    pub fn lineup(&self) -> Lineup<'_> {
        daily_lineup(&self.pool, &self.config.lineup, self.seed)
    }
}

/// Entry point binding a content loader to mission sessions
pub struct MissionEngine<L>
where
    L: ContentLoader,
{
    loader: L,
}

impl<L> MissionEngine<L>
where
    L: ContentLoader,
{
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Load and validate content and configuration for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails, the pool has content errors, or the
    /// configuration is invalid.
    pub fn prepare_day(&self, date: NaiveDate) -> Result<PreparedDay, SetupError<L::Error>> {
        let mut day = self.prepare_seed(seed_from_date(date))?;
        day.date = Some(date);
        Ok(day)
    }

    /// Load and validate content and configuration for a raw daily seed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::prepare_day`].
    pub fn prepare_seed(&self, seed: u32) -> Result<PreparedDay, SetupError<L::Error>> {
        let pool = self.loader.load_pool().map_err(SetupError::Load)?;
        let config = self.loader.load_config().map_err(SetupError::Load)?;
        config.validate()?;
        let warnings = validate_pool(&pool).into_result()?;
        Ok(PreparedDay {
            date: None,
            seed,
            pool,
            config,
            warnings,
        })
    }

    /// Build a session for a prepared day.
    pub fn create_session<S: ResultSink>(
        &self,
        day: &PreparedDay,
        identity: SessionIdentity,
        sink: S,
    ) -> MissionSession<S> {
        MissionSession::new(day.config.clone(), identity, sink, day.seed)
    }
}
