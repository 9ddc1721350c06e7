//! Arena of placed and candidate rooms.
//!
//! The graph owns every `RoomNode` and is the only place door connection
//! state changes. Connecting two rooms writes both sides of the seam in one
//! call and disconnecting clears both in one call, so a half-connected seam
//! is never observable.

use crate::constants::DEFAULT_ANGLE_TOLERANCE;
use crate::direction::*;
use crate::door::*;
use crate::error::*;
use crate::location::*;
use crate::room::*;
use crate::template::*;
use fnv::{FnvHashMap, FnvHashSet};
use log::*;
use pathfinding::prelude::bfs;
use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RoomGraph {
    rooms: FnvHashMap<RoomId, RoomNode>,
    /// Committed rooms in placement order (seed first).
    placed: Vec<RoomId>,
    seed: Option<RoomId>,
    next_id: u32,
}

impl RoomGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self) -> Option<RoomId> {
        self.seed
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomNode> {
        self.rooms.get(&id)
    }

    pub(crate) fn room_mut(&mut self, id: RoomId) -> Option<&mut RoomNode> {
        self.rooms.get_mut(&id)
    }

    pub fn door(&self, id: DoorId) -> Option<&DoorEdge> {
        self.rooms.get(&id.room).and_then(|r| r.door(id.index))
    }

    fn door_mut(&mut self, id: DoorId) -> GenerationResult<&mut DoorEdge> {
        self.rooms
            .get_mut(&id.room)
            .and_then(|r| r.door_mut(id.index))
            .ok_or(GenerationError::UnknownDoor(id))
    }

    /// Committed rooms in placement order.
    pub fn placed_rooms(&self) -> &[RoomId] {
        &self.placed
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomNode> {
        self.placed.iter().filter_map(move |id| self.rooms.get(id))
    }

    /// Number of committed rooms, seed included.
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    fn allocate_id(&mut self) -> RoomId {
        let id = RoomId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a candidate room. It takes no part in the level until committed.
    pub fn instantiate(&mut self, template: &RoomTemplate, pose: Pose, depth: u32) -> RoomId {
        let id = self.allocate_id();
        self.rooms
            .insert(id, RoomNode::from_template(id, template, pose, depth));
        id
    }

    /// Place and commit the seed room. Every door of the seed is eligible for expansion.
    pub fn place_seed(&mut self, template: &RoomTemplate, pose: Pose) -> GenerationResult<RoomId> {
        if self.seed.is_some() {
            return Err(GenerationError::InvariantViolated(
                "seed room already placed".to_string(),
            ));
        }
        let id = self.instantiate(template, pose, 0);
        if let Some(room) = self.rooms.get_mut(&id) {
            let all: Vec<u8> = room.non_parent_doors().collect();
            room.set_selected_doors(all);
        }
        self.seed = Some(id);
        self.commit(id)?;
        Ok(id)
    }

    /// Connect `parent_door` (on a placed room) to `child_door` (on a candidate).
    /// Both sides are written together or not at all.
    pub fn connect(&mut self, parent_door: DoorId, child_door: DoorId) -> GenerationResult<()> {
        self.connect_with_tolerance(parent_door, child_door, DEFAULT_ANGLE_TOLERANCE)
    }

    /// `connect`, snapping the child's growth direction with `tolerance` degrees.
    pub fn connect_with_tolerance(
        &mut self,
        parent_door: DoorId,
        child_door: DoorId,
        tolerance: f32,
    ) -> GenerationResult<()> {
        if parent_door.room == child_door.room {
            return Err(GenerationError::SelfConnection(parent_door.room));
        }
        let parent = self
            .door(parent_door)
            .ok_or(GenerationError::UnknownDoor(parent_door))?;
        if !parent.is_open() {
            return Err(GenerationError::DoorNotOpen(parent_door));
        }
        let growth = parent.direction(tolerance);
        let parent_depth = self
            .room(parent_door.room)
            .map(|r| r.depth)
            .ok_or(GenerationError::UnknownRoom(parent_door.room))?;

        let child = self
            .door(child_door)
            .ok_or(GenerationError::UnknownDoor(child_door))?;
        if !child.is_open() {
            return Err(GenerationError::DoorNotOpen(child_door));
        }

        self.door_mut(parent_door)?.connect(child_door.room)?;
        self.door_mut(child_door)?.connect(parent_door.room)?;

        if let Some(room) = self.rooms.get_mut(&child_door.room) {
            room.parent_door = Some(child_door.index);
            room.parent = Some(parent_door);
            room.growth_direction = growth;
            room.depth = parent_depth + 1;
        }
        Ok(())
    }

    /// Undo `connect`, clearing both sides.
    pub fn disconnect(&mut self, parent_door: DoorId, child_door: DoorId) -> GenerationResult<()> {
        self.door_mut(parent_door)?.disconnect();
        self.door_mut(child_door)?.disconnect();
        if let Some(room) = self.rooms.get_mut(&child_door.room) {
            if room.parent == Some(parent_door) {
                room.parent = None;
                room.parent_door = None;
                room.growth_direction = None;
            }
        }
        Ok(())
    }

    pub fn commit(&mut self, id: RoomId) -> GenerationResult<()> {
        let room = self
            .rooms
            .get_mut(&id)
            .ok_or(GenerationError::UnknownRoom(id))?;
        if !room.committed {
            room.committed = true;
            self.placed.push(id);
        }
        Ok(())
    }

    /// Tear down a candidate. Committed rooms are never torn down.
    pub fn discard(&mut self, id: RoomId) -> GenerationResult<RoomNode> {
        match self.rooms.get(&id) {
            None => return Err(GenerationError::UnknownRoom(id)),
            Some(room) if room.committed => {
                return Err(GenerationError::InvariantViolated(format!(
                    "attempted to discard committed room {}",
                    id
                )))
            }
            Some(_) => {}
        }

        // Any door still pointing at the candidate goes back to open.
        for room in self.rooms.values_mut() {
            for door in room.doors.iter_mut() {
                if door.to_room() == Some(id) {
                    door.disconnect();
                }
            }
        }

        self.rooms
            .remove(&id)
            .ok_or(GenerationError::UnknownRoom(id))
    }

    pub fn wall_off(&mut self, door: DoorId) -> GenerationResult<()> {
        self.door_mut(door)?.wall_off();
        Ok(())
    }

    /// Every open door on a committed room, in placement order, minus `exclude`.
    pub fn open_doors(&self, exclude: &FnvHashSet<DoorId>) -> Vec<DoorId> {
        self.rooms()
            .flat_map(|room| room.open_doors())
            .map(|d| d.id)
            .filter(|id| !exclude.contains(id))
            .collect()
    }

    /// Committed rooms with at least one selected door still open.
    pub fn expandable_rooms(&self) -> Vec<RoomId> {
        self.rooms()
            .filter(|room| room.open_selected_doors().next().is_some())
            .map(|room| room.id)
            .collect()
    }

    fn neighbours(&self, id: RoomId) -> Vec<RoomId> {
        self.rooms
            .get(&id)
            .map(|room| {
                room.doors
                    .iter()
                    .filter_map(|d| d.to_room())
                    .filter(|other| self.rooms.get(other).map_or(false, |r| r.committed))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Edges on the shortest path from the seed, over committed connections.
    pub fn hop_distance(&self, id: RoomId) -> Option<u32> {
        let seed = self.seed?;
        bfs(&seed, |r| self.neighbours(*r), |r| *r == id).map(|path| (path.len() - 1) as u32)
    }

    /// Check every structural invariant of the committed graph.
    pub fn validate(&self) -> GenerationResult<()> {
        let violation = |msg: String| Err(GenerationError::InvariantViolated(msg));

        for room in self.rooms() {
            for door in &room.doors {
                if door.to_room() == Some(room.id) {
                    return violation(format!("door {} connects to its own room", door.id));
                }
                if let Some(other) = door.to_room() {
                    let back = self
                        .rooms
                        .get(&other)
                        .map_or(false, |o| o.doors.iter().any(|d| d.to_room() == Some(room.id)));
                    if !back {
                        return violation(format!("door {} has no partner in {}", door.id, other));
                    }
                }
            }

            if let Some(index) = room.parent_door {
                if room.is_selected(index) {
                    return violation(format!("{} selects its own parent door", room.id));
                }
            }

            if Some(room.id) == self.seed {
                if room.depth != 0 || room.parent.is_some() {
                    return violation(format!("seed {} has depth {}", room.id, room.depth));
                }
                continue;
            }

            let parent_door = match room.parent {
                Some(door) => door,
                None => return violation(format!("{} has no parent", room.id)),
            };
            let parent = match self.rooms.get(&parent_door.room) {
                Some(parent) if parent.committed => parent,
                _ => return violation(format!("{} has no committed parent", room.id)),
            };
            if room.depth != parent.depth + 1 {
                return violation(format!(
                    "{} depth {} under {} depth {}",
                    room.id, room.depth, parent.id, parent.depth
                ));
            }
            if self.door(parent_door).and_then(|d| d.to_room()) != Some(room.id) {
                return violation(format!("parent door {} does not lead to {}", parent_door, room.id));
            }
            if self.hop_distance(room.id) != Some(room.depth) {
                return violation(format!("{} is not {} edges from the seed", room.id, room.depth));
            }
        }

        trace!("Validated room graph with {} rooms", self.placed.len());
        Ok(())
    }

    /// Facings offered by the open doors of a room.
    pub fn open_directions(&self, id: RoomId, tolerance: f32) -> DirectionSet {
        self.rooms
            .get(&id)
            .map(|room| {
                room.open_doors()
                    .filter_map(|d| d.direction(tolerance))
                    .collect()
            })
            .unwrap_or(DirectionSet::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross() -> RoomTemplate {
        RoomTemplate::square("cross", "hall", 10.0, DirectionSet::all())
    }

    #[test]
    fn seed_selects_every_door() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let room = graph.room(seed).unwrap();
        assert_eq!(room.selected_doors(), &[0, 1, 2, 3]);
        assert_eq!(room.depth, 0);
        assert!(graph.place_seed(&cross(), Pose::identity()).is_err());
    }

    #[test]
    fn connect_and_disconnect_are_two_sided() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let child = graph.instantiate(&cross(), Pose::new(WorldPos::new(0.0, 10.0), 0.0), 0);
        let parent_door = DoorId::new(seed, 0);
        let child_door = DoorId::new(child, 2);

        graph.connect(parent_door, child_door).unwrap();
        assert_eq!(graph.door(parent_door).unwrap().to_room(), Some(child));
        assert_eq!(graph.door(child_door).unwrap().to_room(), Some(seed));
        let room = graph.room(child).unwrap();
        assert_eq!(room.depth, 1);
        assert_eq!(room.growth_direction, Some(Direction::North));

        graph.disconnect(parent_door, child_door).unwrap();
        assert!(graph.door(parent_door).unwrap().is_open());
        assert!(graph.door(child_door).unwrap().is_open());
        assert!(graph.room(child).unwrap().parent.is_none());
    }

    #[test]
    fn failed_connect_leaves_both_sides_untouched() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let a = graph.instantiate(&cross(), Pose::identity(), 0);
        let b = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(seed, 0), DoorId::new(a, 2)).unwrap();

        // Parent door already taken: the child side must stay open.
        assert!(graph
            .connect(DoorId::new(seed, 0), DoorId::new(b, 2))
            .is_err());
        assert!(graph.door(DoorId::new(b, 2)).unwrap().is_open());

        assert!(matches!(
            graph.connect(DoorId::new(a, 0), DoorId::new(a, 1)),
            Err(GenerationError::SelfConnection(_))
        ));
    }

    #[test]
    fn discard_only_tears_down_candidates() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let child = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(seed, 1), DoorId::new(child, 3)).unwrap();

        graph.discard(child).unwrap();
        assert!(graph.room(child).is_none());
        assert!(graph.door(DoorId::new(seed, 1)).unwrap().is_open());
        assert!(graph.discard(seed).is_err());
    }

    #[test]
    fn committed_chain_validates() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let a = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(seed, 0), DoorId::new(a, 2)).unwrap();
        graph.commit(a).unwrap();
        let b = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(a, 0), DoorId::new(b, 2)).unwrap();
        graph.commit(b).unwrap();

        assert!(graph.validate().is_ok());
        assert_eq!(graph.hop_distance(b), Some(2));
        assert_eq!(graph.room(b).unwrap().depth, 2);
        assert_eq!(graph.len(), 3);

        let excluded: FnvHashSet<DoorId> = [DoorId::new(seed, 1)].into_iter().collect();
        let open = graph.open_doors(&excluded);
        assert!(!open.contains(&DoorId::new(seed, 1)));
        assert!(!open.contains(&DoorId::new(seed, 0)));
        assert!(open.contains(&DoorId::new(b, 0)));
        // Only the seed selected doors; `a` and `b` have open doors but none selected.
        assert_eq!(graph.expandable_rooms(), vec![seed]);
    }

    #[test]
    fn expandable_rooms_need_an_open_selected_door() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        let a = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(seed, 0), DoorId::new(a, 2)).unwrap();
        graph.commit(a).unwrap();
        graph.room_mut(a).unwrap().set_selected_doors([0]);
        assert_eq!(graph.expandable_rooms(), vec![seed, a]);

        let b = graph.instantiate(&cross(), Pose::identity(), 0);
        graph.connect(DoorId::new(a, 0), DoorId::new(b, 2)).unwrap();
        graph.commit(b).unwrap();

        // `a` still has open doors 1 and 3, but its only selected door is taken.
        assert!(graph.room(a).unwrap().has_open_doors());
        assert_eq!(graph.expandable_rooms(), vec![seed]);
    }

    #[test]
    fn growth_direction_uses_the_given_tolerance() {
        let mut graph = RoomGraph::new();
        // Door facings sit 8 degrees off the compass points.
        let seed = graph
            .place_seed(&cross(), Pose::new(WorldPos::ORIGIN, 8.0))
            .unwrap();

        let loose = graph.instantiate(&cross(), Pose::identity(), 0);
        graph
            .connect_with_tolerance(DoorId::new(seed, 0), DoorId::new(loose, 2), 10.0)
            .unwrap();
        assert_eq!(graph.room(loose).unwrap().growth_direction, Some(Direction::North));

        let strict = graph.instantiate(&cross(), Pose::identity(), 0);
        graph
            .connect_with_tolerance(DoorId::new(seed, 1), DoorId::new(strict, 3), 5.0)
            .unwrap();
        assert_eq!(graph.room(strict).unwrap().growth_direction, None);
    }

    #[test]
    fn wall_off_closes_door_for_rescan() {
        let mut graph = RoomGraph::new();
        let seed = graph.place_seed(&cross(), Pose::identity()).unwrap();
        for i in 0..4 {
            graph.wall_off(DoorId::new(seed, i)).unwrap();
        }
        assert!(graph.open_doors(&FnvHashSet::default()).is_empty());
        assert!(graph.expandable_rooms().is_empty());
        assert_eq!(graph.open_directions(seed, 1.0), DirectionSet::NONE);
    }
}
