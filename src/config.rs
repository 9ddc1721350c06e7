use crate::constants::*;
use crate::error::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DoorSelectionPolicy {
    /// Mostly keep growing straight, occasionally branch.
    DirectionBias,
    /// One random door plus each other door with `multiple_door_probability`.
    MultipleDoors,
}

/// Generation tunables. Durations are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub room_count_first_time: u32,
    pub room_count_per_depth: u32,
    pub max_try_count: u32,
    pub attempts_per_room: u32,
    pub door_retry_probability: f32,
    pub fail_penalty_factor: f32,
    pub max_door_fail_count: u32,
    pub door_retry_delay: f32,
    pub max_reinjected_doors: usize,
    pub settle_delay: f32,
    pub initial_direction_change_delay: u32,
    pub direction_probability_increase_rate: f32,
    pub multiple_door_probability: f32,
    pub door_selection: DoorSelectionPolicy,
    pub angle_tolerance: f32,
    pub probability_epsilon: f32,
    pub rng_seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            room_count_first_time: DEFAULT_ROOM_COUNT_FIRST_TIME,
            room_count_per_depth: DEFAULT_ROOM_COUNT_PER_DEPTH,
            max_try_count: DEFAULT_MAX_TRY_COUNT,
            attempts_per_room: DEFAULT_ATTEMPTS_PER_ROOM,
            door_retry_probability: DEFAULT_DOOR_RETRY_PROBABILITY,
            fail_penalty_factor: DEFAULT_FAIL_PENALTY_FACTOR,
            max_door_fail_count: DEFAULT_MAX_DOOR_FAIL_COUNT,
            door_retry_delay: DEFAULT_DOOR_RETRY_DELAY,
            max_reinjected_doors: DEFAULT_MAX_REINJECTED_DOORS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            initial_direction_change_delay: DEFAULT_INITIAL_DIRECTION_CHANGE_DELAY,
            direction_probability_increase_rate: DEFAULT_DIRECTION_PROBABILITY_INCREASE_RATE,
            multiple_door_probability: DEFAULT_MULTIPLE_DOOR_PROBABILITY,
            door_selection: DoorSelectionPolicy::DirectionBias,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            probability_epsilon: DEFAULT_PROBABILITY_EPSILON,
            rng_seed: 0,
        }
    }
}

impl GenerationConfig {
    pub fn from_json(json: &str) -> GenerationResult<Self> {
        let config: GenerationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> GenerationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Hard cap on placement tries for a pass targeting `target` rooms.
    pub fn max_total_attempts(&self, target: u32) -> u32 {
        self.attempts_per_room.saturating_mul(target)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.settle_delay).unwrap_or(Duration::MAX)
    }

    pub fn door_retry_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.door_retry_delay).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> GenerationResult<()> {
        let invalid = |msg: &str| Err(GenerationError::InvalidConfig(msg.to_string()));
        let unit = |p: f32| (0.0..=1.0).contains(&p);

        if self.max_try_count == 0 {
            return invalid("max_try_count must be at least 1");
        }
        if self.attempts_per_room == 0 {
            return invalid("attempts_per_room must be at least 1");
        }
        if self.max_door_fail_count == 0 {
            return invalid("max_door_fail_count must be at least 1");
        }
        if self.max_reinjected_doors == 0 {
            return invalid("max_reinjected_doors must be at least 1");
        }
        if !unit(self.door_retry_probability) {
            return invalid("door_retry_probability must lie in [0, 1]");
        }
        if !unit(self.multiple_door_probability) {
            return invalid("multiple_door_probability must lie in [0, 1]");
        }
        if !(self.fail_penalty_factor >= 0.0) {
            return invalid("fail_penalty_factor must not be negative");
        }
        if !(self.direction_probability_increase_rate >= 0.0) {
            return invalid("direction_probability_increase_rate must not be negative");
        }
        let delay = |v: f32| (0.0..=MAX_DELAY_SECONDS).contains(&v);
        if !delay(self.settle_delay) {
            return Err(GenerationError::InvalidConfig(format!(
                "settle_delay must lie in [0, {}] seconds",
                MAX_DELAY_SECONDS
            )));
        }
        if !delay(self.door_retry_delay) {
            return Err(GenerationError::InvalidConfig(format!(
                "door_retry_delay must lie in [0, {}] seconds",
                MAX_DELAY_SECONDS
            )));
        }
        if !(self.angle_tolerance > 0.0 && self.angle_tolerance < 45.0) {
            return invalid("angle_tolerance must lie in (0, 45) degrees");
        }
        if !(self.probability_epsilon >= 0.0) {
            return invalid("probability_epsilon must not be negative");
        }
        Ok(())
    }
}
