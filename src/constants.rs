//! Default values for every generation tunable.

pub const DEFAULT_ROOM_COUNT_FIRST_TIME: u32 = 20;
pub const DEFAULT_ROOM_COUNT_PER_DEPTH: u32 = 5;

pub const DEFAULT_MAX_TRY_COUNT: u32 = 3;
/// Multiplier applied to the requested room count to get the hard attempt cap.
pub const DEFAULT_ATTEMPTS_PER_ROOM: u32 = 3;

pub const DEFAULT_DOOR_RETRY_PROBABILITY: f32 = 0.6;
pub const DEFAULT_FAIL_PENALTY_FACTOR: f32 = 0.2;
pub const DEFAULT_MAX_DOOR_FAIL_COUNT: u32 = 3;
/// Seconds.
pub const DEFAULT_DOOR_RETRY_DELAY: f32 = 1.0;
pub const DEFAULT_MAX_REINJECTED_DOORS: usize = 3;

/// Seconds between placing a candidate and reading the overlap verdict.
pub const DEFAULT_SETTLE_DELAY: f32 = 0.5;

/// Upper bound for `settle_delay` and `door_retry_delay`, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 3600.0;

pub const DEFAULT_INITIAL_DIRECTION_CHANGE_DELAY: u32 = 3;
pub const DEFAULT_DIRECTION_PROBABILITY_INCREASE_RATE: f32 = 0.25;
pub const DEFAULT_MULTIPLE_DOOR_PROBABILITY: f32 = 0.3;

/// Degrees.
pub const DEFAULT_ANGLE_TOLERANCE: f32 = 5.0;
pub const DEFAULT_PROBABILITY_EPSILON: f32 = 0.001;

/// Penetration depth below which two footprints are considered touching, not overlapping.
pub const OVERLAP_TOLERANCE: f32 = 1e-3;
