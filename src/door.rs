use crate::direction::*;
use crate::error::*;
use crate::location::*;
use crate::room::RoomId;
use crate::template::{DoorSocket, RoomType};
use serde::{Deserialize, Serialize};

/// A door socket is addressed by its owning room and its index in that room's template.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DoorId {
    pub room: RoomId,
    pub index: u8,
}

impl DoorId {
    pub fn new(room: RoomId, index: u8) -> Self {
        DoorId { room, index }
    }
}

impl std::fmt::Display for DoorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.room, self.index)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DoorState {
    /// Not connected; may still be grown through.
    Open,
    Connected(RoomId),
    /// Permanently closed. Generation will not try this door again.
    Walled,
}

/// A door socket of a placed (or candidate) room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DoorEdge {
    pub id: DoorId,
    pub local_position: WorldPos,
    pub local_direction: Direction,
    pub position: WorldPos,
    pub yaw: f32,
    pub leads_to: Option<RoomType>,
    state: DoorState,
}

impl DoorEdge {
    pub fn from_socket(id: DoorId, socket: &DoorSocket, pose: &Pose) -> Self {
        DoorEdge {
            id,
            local_position: socket.position,
            local_direction: socket.direction,
            position: pose.transform_point(socket.position),
            yaw: pose.transform_yaw(socket.direction.yaw()),
            leads_to: socket.leads_to.clone(),
            state: DoorState::Open,
        }
    }

    /// The room this door belongs to.
    pub fn from_room(&self) -> RoomId {
        self.id.room
    }

    pub fn to_room(&self) -> Option<RoomId> {
        match self.state {
            DoorState::Connected(room) => Some(room),
            _ => None,
        }
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn is_visited(&self) -> bool {
        self.to_room().is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state == DoorState::Open
    }

    pub fn is_walled(&self) -> bool {
        self.state == DoorState::Walled
    }

    /// World facing snapped to the compass, if the owning room is axis aligned.
    pub fn direction(&self, tolerance: f32) -> Option<Direction> {
        Direction::from_yaw(self.yaw, tolerance)
    }

    pub(crate) fn connect(&mut self, to: RoomId) -> GenerationResult<()> {
        if to == self.id.room {
            return Err(GenerationError::SelfConnection(to));
        }
        if self.state != DoorState::Open {
            return Err(GenerationError::DoorNotOpen(self.id));
        }
        self.state = DoorState::Connected(to);
        Ok(())
    }

    pub(crate) fn disconnect(&mut self) {
        if let DoorState::Connected(_) = self.state {
            self.state = DoorState::Open;
        }
    }

    pub(crate) fn wall_off(&mut self) {
        if self.state == DoorState::Open {
            self.state = DoorState::Walled;
        }
    }
}
