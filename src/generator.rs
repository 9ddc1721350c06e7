//! Public API for level generation.
//!
//! `GeneratorBuilder` configures a session and places the seed room. Passes
//! are run either incrementally (`RoomGraphBuilder::step` with a host clock)
//! or to completion with a simulated clock that jumps straight to each
//! resume time.

use crate::builder::*;
use crate::config::GenerationConfig;
use crate::error::*;
use crate::location::Pose;
use crate::oracle::GeometryOracle;
use crate::pipeline::*;
use crate::room::RoomId;
use crate::session::GenerationSession;
use crate::template::TemplateCatalog;

/// Fluent builder for a generation session.
pub struct GeneratorBuilder {
    config: GenerationConfig,
    catalog: TemplateCatalog,
    seed_template: Option<String>,
    seed_pose: Pose,
}

impl GeneratorBuilder {
    pub fn new(catalog: TemplateCatalog) -> Self {
        GeneratorBuilder {
            config: GenerationConfig::default(),
            catalog,
            seed_template: None,
            seed_pose: Pose::identity(),
        }
    }

    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, rng_seed: u64) -> Self {
        self.config.rng_seed = rng_seed;
        self
    }

    /// Template for the seed room (default: first variant of the default room type).
    pub fn seed_template(mut self, name: impl Into<String>) -> Self {
        self.seed_template = Some(name.into());
        self
    }

    pub fn seed_pose(mut self, pose: Pose) -> Self {
        self.seed_pose = pose;
        self
    }

    /// Create the session and place the seed room.
    pub fn build(self, oracle: &mut dyn GeometryOracle) -> GenerationResult<GenerationSession> {
        let seed_template = match self.seed_template {
            Some(name) => name,
            None => {
                let room_type = self.catalog.default_room_type();
                self.catalog
                    .variants(room_type)
                    .and_then(|v| v.first())
                    .map(|v| v.template.clone())
                    .ok_or_else(|| GenerationError::MissingVariants(room_type.clone()))?
            }
        };
        let mut session = GenerationSession::new(self.config, self.catalog)?;
        session.place_seed(&seed_template, self.seed_pose, oracle)?;
        Ok(session)
    }

    /// Build the session and run the initial pass to completion.
    pub fn generate(
        self,
        oracle: &mut dyn GeometryOracle,
    ) -> GenerationResult<(GenerationSession, GrowthReport)> {
        let mut session = self.build(oracle)?;
        let report = generate_level(&mut session, oracle)?;
        Ok((session, report))
    }
}

/// Drive `builder` until it finishes, jumping the clock to each resume time.
pub fn run_to_completion(
    builder: &mut RoomGraphBuilder,
    session: &mut GenerationSession,
    oracle: &mut dyn GeometryOracle,
) -> GenerationResult<GrowthReport> {
    let budget = StepBudget::unlimited();
    match run_with_budget(builder, session, oracle, &budget)? {
        Some(report) => Ok(report),
        None => Err(GenerationError::InvariantViolated(
            "unlimited budget ran out".to_string(),
        )),
    }
}

/// Like `run_to_completion`, but gives up (returning `None`) once `budget`
/// is spent. The builder can be resumed later.
pub fn run_with_budget(
    builder: &mut RoomGraphBuilder,
    session: &mut GenerationSession,
    oracle: &mut dyn GeometryOracle,
    budget: &StepBudget,
) -> GenerationResult<Option<GrowthReport>> {
    let mut now = session.clock();
    loop {
        match builder.step(session, oracle, now, budget)? {
            StepResult::Complete(report) => return Ok(Some(report)),
            StepResult::Waiting(resume_at) => now = now.max(resume_at),
            StepResult::Running => {
                if !budget.has_budget() {
                    return Ok(None);
                }
            }
        }
    }
}

/// Grow up to `target` rooms outward from `seed`.
pub fn grow_from(
    session: &mut GenerationSession,
    seed: RoomId,
    target: u32,
    oracle: &mut dyn GeometryOracle,
) -> GenerationResult<GrowthReport> {
    let mut builder = RoomGraphBuilder::new(target);
    builder.start_from(session, seed)?;
    run_to_completion(&mut builder, session, oracle)
}

/// The initial pass: `room_count_first_time` rooms from the session's seed.
pub fn generate_level(
    session: &mut GenerationSession,
    oracle: &mut dyn GeometryOracle,
) -> GenerationResult<GrowthReport> {
    let seed = session.graph().seed().ok_or(GenerationError::NotStarted)?;
    let target = session.config().room_count_first_time;
    grow_from(session, seed, target, oracle)
}

/// A later pass: `room_count_per_depth` rooms from the rooms the previous
/// pass left with open doors.
pub fn expand_level(
    session: &mut GenerationSession,
    oracle: &mut dyn GeometryOracle,
) -> GenerationResult<GrowthReport> {
    if session.graph().seed().is_none() {
        return Err(GenerationError::NotStarted);
    }
    let retained = session.retained().to_vec();
    let mut builder = RoomGraphBuilder::new(session.config().room_count_per_depth);
    builder.start_from_retained(session, &retained)?;
    run_to_completion(&mut builder, session, oracle)
}

/// Start a pass for host-driven stepping.
pub fn start_generation(session: &GenerationSession) -> GenerationResult<RoomGraphBuilder> {
    let seed = session.graph().seed().ok_or(GenerationError::NotStarted)?;
    let mut builder = RoomGraphBuilder::new(session.config().room_count_first_time);
    builder.start_from(session, seed)?;
    Ok(builder)
}
