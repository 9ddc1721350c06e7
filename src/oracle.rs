//! Overlap detection for candidate rooms.
//!
//! The builder only ever asks one question: after the settling window, does
//! this candidate overlap anything already committed? `GeometryOracle` is that
//! question as a trait. `FootprintOracle` answers it with oriented boxes and
//! the separating-axis theorem; hosts with a physics engine implement the
//! trait on top of their own collision volumes instead.

use crate::constants::OVERLAP_TOLERANCE;
use crate::location::*;
use crate::room::RoomId;
use crate::template::FootprintRect;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

pub type Corners = [WorldPos; 4];

/// Oriented box on the floor plane.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: WorldPos,
    pub half_width: f32,
    pub half_depth: f32,
    pub yaw: f32,
}

impl Obb {
    /// Place a template-local rectangle into the world.
    pub fn from_rect(rect: &FootprintRect, pose: &Pose) -> Self {
        Obb {
            center: pose.transform_point(rect.center),
            half_width: rect.half_width,
            half_depth: rect.half_depth,
            yaw: pose.yaw,
        }
    }

    pub fn corners(&self) -> Corners {
        const SIGNS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let mut corners = [WorldPos::ORIGIN; 4];
        for (i, &(sx, sz)) in SIGNS.iter().enumerate() {
            let local = WorldPos::new(sx * self.half_width, sz * self.half_depth);
            corners[i] = self.center + local.rotated(self.yaw);
        }
        corners
    }

    pub fn contains(&self, point: WorldPos) -> bool {
        let local = (point - self.center).rotated(-self.yaw);
        local.x.abs() <= self.half_width && local.z.abs() <= self.half_depth
    }

    /// True if the interiors overlap by more than `OVERLAP_TOLERANCE`.
    /// Shared edges and corners do not count.
    pub fn overlaps(&self, other: &Obb) -> bool {
        obbs_overlap(&self.corners(), &other.corners())
    }
}

fn project(corners: &Corners, ax: f32, az: f32) -> (f32, f32) {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for c in corners {
        let dot = c.x * ax + c.z * az;
        lo = lo.min(dot);
        hi = hi.max(dot);
    }
    (lo, hi)
}

pub fn obbs_overlap(a: &Corners, b: &Corners) -> bool {
    for corners in [a, b] {
        // Opposite edges are parallel, two normals per box are enough.
        for i in 0..2 {
            let j = (i + 1) % 4;
            let ex = corners[j].x - corners[i].x;
            let ez = corners[j].z - corners[i].z;
            let len = (ex * ex + ez * ez).sqrt();
            if len <= f32::EPSILON {
                continue;
            }
            let (ax, az) = (-ez / len, ex / len);
            let (min_a, max_a) = project(a, ax, az);
            let (min_b, max_b) = project(b, ax, az);
            let penetration = max_a.min(max_b) - min_a.max(min_b);
            if penetration <= OVERLAP_TOLERANCE {
                return false;
            }
        }
    }
    true
}

/// Overlap verdicts for candidate rooms.
///
/// Call order per candidate: `place`, then (after the settling window)
/// `is_overlapping`, then exactly one of `commit` or `remove`.
pub trait GeometryOracle {
    /// Register a candidate's probes. The verdict may not be final until the
    /// settling window has elapsed.
    fn place(&mut self, room: RoomId, probes: &[Obb]);

    /// Does the candidate overlap previously committed geometry? Its own
    /// probes never count against each other.
    fn is_overlapping(&self, room: RoomId) -> bool;

    /// The candidate is now permanent geometry.
    fn commit(&mut self, room: RoomId);

    /// Forget the candidate (rolled back or cancelled).
    fn remove(&mut self, room: RoomId);
}

/// Reference oracle: committed boxes in a flat list, candidates tested with SAT.
#[derive(Default, Clone)]
pub struct FootprintOracle {
    committed: FnvHashMap<RoomId, Vec<Obb>>,
    pending: FnvHashMap<RoomId, Vec<Obb>>,
}

impl FootprintOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed_rooms(&self) -> usize {
        self.committed.len()
    }

    pub fn pending_rooms(&self) -> usize {
        self.pending.len()
    }
}

impl GeometryOracle for FootprintOracle {
    fn place(&mut self, room: RoomId, probes: &[Obb]) {
        self.pending.insert(room, probes.to_vec());
    }

    fn is_overlapping(&self, room: RoomId) -> bool {
        let probes = match self.pending.get(&room) {
            Some(probes) => probes,
            None => return false,
        };
        self.committed
            .iter()
            .filter(|(id, _)| **id != room)
            .flat_map(|(_, boxes)| boxes.iter())
            .any(|placed| probes.iter().any(|probe| probe.overlaps(placed)))
    }

    fn commit(&mut self, room: RoomId) {
        if let Some(probes) = self.pending.remove(&room) {
            self.committed.insert(room, probes);
        }
    }

    fn remove(&mut self, room: RoomId) {
        self.pending.remove(&room);
        self.committed.remove(&room);
    }
}

/// Unobstructed infinite plane: nothing ever overlaps.
#[derive(Default, Clone, Copy)]
pub struct OpenPlane;

impl GeometryOracle for OpenPlane {
    fn place(&mut self, _room: RoomId, _probes: &[Obb]) {}

    fn is_overlapping(&self, _room: RoomId) -> bool {
        false
    }

    fn commit(&mut self, _room: RoomId) {}

    fn remove(&mut self, _room: RoomId) {}
}

/// Every candidate overlaps.
#[derive(Default, Clone, Copy)]
pub struct AlwaysBlocked;

impl GeometryOracle for AlwaysBlocked {
    fn place(&mut self, _room: RoomId, _probes: &[Obb]) {}

    fn is_overlapping(&self, _room: RoomId) -> bool {
        true
    }

    fn commit(&mut self, _room: RoomId) {}

    fn remove(&mut self, _room: RoomId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, z: f32, half: f32, yaw: f32) -> Obb {
        Obb {
            center: WorldPos::new(x, z),
            half_width: half,
            half_depth: half,
            yaw,
        }
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = square(0.0, 0.0, 5.0, 0.0);
        let b = square(10.0, 0.0, 5.0, 0.0);
        assert!(!a.overlaps(&b));
        let c = square(9.0, 0.0, 5.0, 0.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn rotated_box_is_tested_on_its_own_axes() {
        let a = square(0.0, 0.0, 1.0, 0.0);
        // Diamond off the corner of `a`: bounding boxes intersect, shapes do not.
        let b = square(2.0, 2.0, 1.0, 45.0);
        assert!(!a.overlaps(&b));
        let c = square(1.5, 1.5, 1.0, 45.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn oracle_ignores_candidate_self_overlap() {
        let mut oracle = FootprintOracle::new();
        let seed = RoomId(0);
        oracle.place(seed, &[square(0.0, 0.0, 5.0, 0.0)]);
        oracle.commit(seed);

        // Two probes of one candidate overlap each other but not the seed.
        let candidate = RoomId(1);
        oracle.place(
            candidate,
            &[square(10.0, 0.0, 5.0, 0.0), square(11.0, 0.0, 2.0, 0.0)],
        );
        assert!(!oracle.is_overlapping(candidate));

        let clash = RoomId(2);
        oracle.place(clash, &[square(3.0, 3.0, 5.0, 0.0)]);
        assert!(oracle.is_overlapping(clash));
        oracle.remove(clash);
        assert_eq!(oracle.pending_rooms(), 1);

        oracle.commit(candidate);
        assert_eq!(oracle.committed_rooms(), 2);
    }
}
