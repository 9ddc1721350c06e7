use crate::config::GenerationConfig;
use crate::error::*;
use crate::graph::RoomGraph;
use crate::layout::Layout;
use crate::location::Pose;
use crate::oracle::GeometryOracle;
use crate::policy::DirectionBias;
use crate::retry::RetryBook;
use crate::room::RoomId;
use crate::template::TemplateCatalog;
use log::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use uuid::Uuid;

/// All state for generating one level. Construct one per level; sessions
/// share nothing, so independent generations never interfere.
pub struct GenerationSession {
    pub(crate) id: Uuid,
    pub(crate) config: GenerationConfig,
    pub(crate) catalog: TemplateCatalog,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) graph: RoomGraph,
    pub(crate) direction: DirectionBias,
    pub(crate) retries: RetryBook,
    /// Rooms with open doors left over from the last finished pass.
    pub(crate) retained: Vec<RoomId>,
    pub(crate) clock: Duration,
}

impl GenerationSession {
    pub fn new(config: GenerationConfig, catalog: TemplateCatalog) -> GenerationResult<Self> {
        config.validate()?;
        catalog.validate(config.probability_epsilon)?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let id = Uuid::from_u128(rng.gen());

        Ok(GenerationSession {
            id,
            config,
            catalog,
            rng,
            graph: RoomGraph::new(),
            direction: DirectionBias::new(),
            retries: RetryBook::new(),
            retained: Vec::new(),
            clock: Duration::ZERO,
        })
    }

    /// Place and commit the seed room.
    pub fn place_seed(
        &mut self,
        template: &str,
        pose: Pose,
        oracle: &mut dyn GeometryOracle,
    ) -> GenerationResult<RoomId> {
        let template = self
            .catalog
            .template(template)
            .ok_or_else(|| GenerationError::UnknownTemplate(template.to_string()))?;
        let id = self.graph.place_seed(template, pose)?;

        if let Some(room) = self.graph.room(id) {
            oracle.place(id, &room.probes);
            oracle.commit(id);
            debug!(
                "Seed {} '{}' placed with {} doors",
                id,
                room.template,
                room.doors.len()
            );
        }
        self.retained = self.graph.expandable_rooms();
        Ok(id)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    pub fn retries(&self) -> &RetryBook {
        &self.retries
    }

    pub fn direction_bias(&self) -> &DirectionBias {
        &self.direction
    }

    pub fn retained(&self) -> &[RoomId] {
        &self.retained
    }

    /// Latest host time seen by any step.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub(crate) fn advance_clock(&mut self, now: Duration) {
        self.clock = self.clock.max(now);
    }

    pub fn layout(&self) -> Layout {
        Layout::from_graph(self.id, &self.graph)
    }
}
