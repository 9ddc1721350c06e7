use crate::door::DoorId;
use crate::room::RoomId;
use crate::template::RoomType;
use thiserror::Error;

/// Everything that can go wrong while configuring or running a generation session.
///
/// Placement collisions are not errors; they are the normal retry signal and
/// never surface here. Running out of doors is not an error either: the
/// builder reports it through `GrowthOutcome::Exhausted`.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("variant probabilities for room type '{room_type}' sum to {sum}, expected 1.0")]
    ProbabilitySum { room_type: RoomType, sum: f32 },
    #[error("no template variants registered for room type '{0}'")]
    MissingVariants(RoomType),
    #[error("unknown room template '{0}'")]
    UnknownTemplate(String),
    #[error("room template '{0}' has no door sockets and cannot be attached")]
    TemplateWithoutDoors(String),
    #[error("door facings differ by {angle} degrees, which is not a multiple of 90")]
    DoorMisaligned { angle: f32 },
    #[error("room {0} cannot connect a door to itself")]
    SelfConnection(RoomId),
    #[error("door {0} is not open")]
    DoorNotOpen(DoorId),
    #[error("unknown room {0}")]
    UnknownRoom(RoomId),
    #[error("unknown door {0}")]
    UnknownDoor(DoorId),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("graph invariant violated: {0}")]
    InvariantViolated(String),
    #[error("builder stepped before it was started")]
    NotStarted,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    /// True for errors caused by the template catalog rather than by runtime state.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GenerationError::ProbabilitySum { .. }
                | GenerationError::MissingVariants(_)
                | GenerationError::UnknownTemplate(_)
                | GenerationError::TemplateWithoutDoors(_)
                | GenerationError::InvalidConfig(_)
                | GenerationError::Json(_)
        )
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;
