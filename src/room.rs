use crate::direction::*;
use crate::door::*;
use crate::location::*;
use crate::oracle::Obb;
use crate::template::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A room instance placed in the world (or a candidate awaiting its overlap verdict).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomNode {
    pub id: RoomId,
    pub room_type: RoomType,
    pub template: String,
    /// Edges from the seed room.
    pub depth: u32,
    pub pose: Pose,
    /// Latest overlap verdict from the oracle.
    pub overlapping: bool,
    /// False while the room is a candidate.
    pub committed: bool,
    pub doors: Vec<DoorEdge>,
    /// Index of the door that connects this room to its parent. `None` only for the seed.
    pub parent_door: Option<u8>,
    /// The parent's door on the other side of the seam.
    pub parent: Option<DoorId>,
    /// Direction this room was grown in: the world facing of the parent door.
    pub growth_direction: Option<Direction>,
    /// Set when the direction policy branched here.
    pub is_branch: bool,
    selected_doors: Vec<u8>,
    pub probes: Vec<Obb>,
}

impl RoomNode {
    pub fn from_template(id: RoomId, template: &RoomTemplate, pose: Pose, depth: u32) -> Self {
        let doors = template
            .doors
            .iter()
            .enumerate()
            .map(|(i, socket)| DoorEdge::from_socket(DoorId::new(id, i as u8), socket, &pose))
            .collect();
        let probes = template
            .footprint
            .iter()
            .map(|rect| Obb::from_rect(rect, &pose))
            .collect();

        RoomNode {
            id,
            room_type: template.room_type.clone(),
            template: template.name.clone(),
            depth,
            pose,
            overlapping: false,
            committed: false,
            doors,
            parent_door: None,
            parent: None,
            growth_direction: None,
            is_branch: false,
            selected_doors: Vec::new(),
            probes,
        }
    }

    pub fn door(&self, index: u8) -> Option<&DoorEdge> {
        self.doors.get(index as usize)
    }

    pub(crate) fn door_mut(&mut self, index: u8) -> Option<&mut DoorEdge> {
        self.doors.get_mut(index as usize)
    }

    pub fn door_ids(&self) -> impl Iterator<Item = DoorId> + '_ {
        self.doors.iter().map(|d| d.id)
    }

    pub fn connect_to_parent_door(&self) -> Option<&DoorEdge> {
        self.parent_door.and_then(|i| self.door(i))
    }

    pub fn selected_doors(&self) -> &[u8] {
        &self.selected_doors
    }

    pub fn is_selected(&self, index: u8) -> bool {
        self.selected_doors.contains(&index)
    }

    /// Replace the expansion set. The parent door is always filtered out.
    pub(crate) fn set_selected_doors(&mut self, doors: impl IntoIterator<Item = u8>) {
        let parent = self.parent_door;
        let count = self.doors.len();
        let mut selected: Vec<u8> = doors
            .into_iter()
            .filter(|i| Some(*i) != parent && (*i as usize) < count)
            .collect();
        selected.sort_unstable();
        selected.dedup();
        self.selected_doors = selected;
    }

    /// Doors other than the parent door.
    pub fn non_parent_doors(&self) -> impl Iterator<Item = u8> + '_ {
        let parent = self.parent_door;
        (0..self.doors.len() as u8).filter(move |i| Some(*i) != parent)
    }

    pub fn open_doors(&self) -> impl Iterator<Item = &DoorEdge> {
        self.doors.iter().filter(|d| d.is_open())
    }

    /// Selected doors that are still open.
    pub fn open_selected_doors(&self) -> impl Iterator<Item = DoorId> + '_ {
        self.selected_doors
            .iter()
            .filter_map(move |i| self.door(*i))
            .filter(|d| d.is_open())
            .map(|d| d.id)
    }

    pub fn has_open_doors(&self) -> bool {
        self.doors.iter().any(|d| d.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross() -> RoomTemplate {
        RoomTemplate::square("cross", "hall", 10.0, DirectionSet::all())
    }

    #[test]
    fn doors_and_probes_follow_pose() {
        let pose = Pose::new(WorldPos::new(20.0, 0.0), 0.0);
        let room = RoomNode::from_template(RoomId(1), &cross(), pose, 2);
        assert_eq!(room.doors.len(), 4);
        assert_eq!(room.probes.len(), 1);
        assert!(room.probes[0].center.approx_eq(WorldPos::new(20.0, 0.0), 1e-5));
        assert!(room.doors.iter().all(|d| d.from_room() == RoomId(1)));
    }

    #[test]
    fn selected_doors_never_contain_parent_door() {
        let mut room = RoomNode::from_template(RoomId(1), &cross(), Pose::identity(), 1);
        room.parent_door = Some(2);
        room.set_selected_doors([0, 1, 2, 3, 3, 9]);
        assert_eq!(room.selected_doors(), &[0, 1, 3]);
        assert!(!room.is_selected(2));
        assert_eq!(room.non_parent_doors().collect::<Vec<_>>(), vec![0, 1, 3]);
    }
}
