use crate::direction::Direction;
use crate::door::*;
use crate::error::*;
use crate::graph::RoomGraph;
use crate::location::*;
use crate::oracle::Obb;
use crate::room::RoomId;
use crate::template::RoomType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A door as it ended up in the finished level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutDoor {
    pub id: DoorId,
    pub position: WorldPos,
    pub yaw: f32,
    pub state: DoorState,
}

/// A committed room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutRoom {
    pub id: RoomId,
    pub room_type: RoomType,
    pub template: String,
    pub depth: u32,
    pub pose: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RoomId>,
    #[serde(default)]
    pub is_branch: bool,
    pub footprint: Vec<Obb>,
    pub doors: Vec<LayoutDoor>,
}

/// A parent-to-child seam.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConnection {
    pub parent_door: DoorId,
    pub child_door: DoorId,
}

/// Serialisable snapshot of a level, rooms in placement order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layout {
    pub session_id: Uuid,
    pub rooms: Vec<LayoutRoom>,
    pub connections: Vec<LayoutConnection>,
}

impl Layout {
    pub fn from_graph(session_id: Uuid, graph: &RoomGraph) -> Self {
        let rooms = graph
            .rooms()
            .map(|room| LayoutRoom {
                id: room.id,
                room_type: room.room_type.clone(),
                template: room.template.clone(),
                depth: room.depth,
                pose: room.pose,
                parent: room.parent.map(|d| d.room),
                is_branch: room.is_branch,
                footprint: room.probes.clone(),
                doors: room
                    .doors
                    .iter()
                    .map(|d| LayoutDoor {
                        id: d.id,
                        position: d.position,
                        yaw: d.yaw,
                        state: d.state(),
                    })
                    .collect(),
            })
            .collect();

        let connections = graph
            .rooms()
            .filter_map(|room| {
                let parent_door = room.parent?;
                let child_door = DoorId::new(room.id, room.parent_door?);
                Some(LayoutConnection {
                    parent_door,
                    child_door,
                })
            })
            .collect();

        Layout {
            session_id,
            rooms,
            connections,
        }
    }

    pub fn room(&self, id: RoomId) -> Option<&LayoutRoom> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn max_depth(&self) -> u32 {
        self.rooms.iter().map(|r| r.depth).max().unwrap_or(0)
    }

    /// World facings of every door still open, for hosts that cap them.
    pub fn open_doors(&self) -> impl Iterator<Item = (&LayoutDoor, Option<Direction>)> {
        self.rooms
            .iter()
            .flat_map(|r| r.doors.iter())
            .filter(|d| d.state == DoorState::Open)
            .map(|d| (d, Direction::from_yaw(d.yaw, crate::constants::DEFAULT_ANGLE_TOLERANCE)))
    }

    pub fn to_json(&self) -> GenerationResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> GenerationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
