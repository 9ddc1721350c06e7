//! Door alignment: the rigid transform that brings a candidate room's door
//! onto an existing door so the two close the seam.
//!
//! Rotation is always applied to the candidate room as a whole, around the
//! room's own origin, and only in quarter turns. Anything that is not close to
//! a quarter turn means a malformed template and is refused.

use crate::error::*;
use crate::location::*;
use log::*;

/// World-space facing of one door.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DoorFacing {
    pub position: WorldPos,
    pub yaw: f32,
}

impl DoorFacing {
    pub fn new(position: WorldPos, yaw: f32) -> Self {
        DoorFacing {
            position,
            yaw: normalize_yaw(yaw),
        }
    }
}

/// The result of aligning a candidate room to an existing door.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    /// Extra yaw applied to the candidate room.
    pub rotation: f32,
    /// Translation applied after the rotation.
    pub offset: WorldPos,
    /// Final room pose.
    pub pose: Pose,
}

#[derive(Copy, Clone, Debug)]
pub struct DoorAligner {
    tolerance: f32,
}

impl Default for DoorAligner {
    fn default() -> Self {
        DoorAligner::new(crate::constants::DEFAULT_ANGLE_TOLERANCE)
    }
}

impl DoorAligner {
    pub fn new(tolerance: f32) -> Self {
        DoorAligner { tolerance }
    }

    /// Extra room rotation needed so `candidate_yaw` ends up facing exactly
    /// opposite `existing_yaw`.
    ///
    /// The difference `candidate - existing` is bucketed:
    /// - 0 (same facing): turn 180,
    /// - 180 (already opposite): no turn,
    /// - +90 / -90: turn by the difference itself.
    pub fn rotation_for(&self, existing_yaw: f32, candidate_yaw: f32) -> GenerationResult<f32> {
        let diff = normalized_delta(existing_yaw, candidate_yaw);
        let near = |target: f32| normalized_delta(target, diff).abs() <= self.tolerance;

        if near(0.0) {
            Ok(180.0)
        } else if near(180.0) {
            Ok(0.0)
        } else if near(90.0) {
            Ok(90.0)
        } else if near(-90.0) {
            Ok(-90.0)
        } else {
            error!(
                "Door facings {} and {} differ by {}: not a quarter turn",
                existing_yaw, candidate_yaw, diff
            );
            Err(GenerationError::DoorMisaligned { angle: diff })
        }
    }

    /// Align a candidate room (currently at `candidate_pose`) so that its door
    /// at `local_door_position` / `local_door_yaw` coincides with `existing`.
    pub fn compute_placement(
        &self,
        existing: &DoorFacing,
        candidate_pose: Pose,
        local_door_position: WorldPos,
        local_door_yaw: f32,
    ) -> GenerationResult<Placement> {
        let candidate_yaw = candidate_pose.transform_yaw(local_door_yaw);
        let rotation = self.rotation_for(existing.yaw, candidate_yaw)?;

        // Snap the result onto the exact opposite facing so tolerance does not
        // accumulate along a chain of rooms.
        let rotated = candidate_pose.rotated_by(rotation);
        let residual = normalized_delta(
            rotated.transform_yaw(local_door_yaw),
            normalize_yaw(existing.yaw + 180.0),
        );
        let rotated = rotated.rotated_by(residual);

        let door_position = rotated.transform_point(local_door_position);
        let offset = existing.position - door_position;
        let pose = rotated.translated_by(offset);

        trace!(
            "Aligned door: rotation={} residual={} offset=({}, {})",
            rotation,
            residual,
            offset.x,
            offset.z
        );

        Ok(Placement {
            rotation: rotation + residual,
            offset,
            pose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligner() -> DoorAligner {
        DoorAligner::new(5.0)
    }

    #[test]
    fn buckets_match_quarter_turns() {
        let a = aligner();
        assert_eq!(a.rotation_for(0.0, 180.0).unwrap(), 0.0);
        assert_eq!(a.rotation_for(0.0, 0.0).unwrap(), 180.0);
        assert_eq!(a.rotation_for(0.0, 90.0).unwrap(), 90.0);
        assert_eq!(a.rotation_for(0.0, 270.0).unwrap(), -90.0);
        assert_eq!(a.rotation_for(90.0, 0.0).unwrap(), -90.0);
        assert_eq!(a.rotation_for(0.0, 357.0).unwrap(), 180.0);
    }

    #[test]
    fn off_axis_difference_is_refused() {
        assert!(matches!(
            aligner().rotation_for(0.0, 45.0),
            Err(GenerationError::DoorMisaligned { .. })
        ));
    }

    #[test]
    fn opposite_doors_only_translate() {
        let existing = DoorFacing::new(WorldPos::new(0.0, 5.0), 0.0);
        let placement = aligner()
            .compute_placement(&existing, Pose::identity(), WorldPos::new(0.0, -5.0), 180.0)
            .unwrap();
        assert_eq!(placement.rotation, 0.0);
        assert!(placement.pose.position.approx_eq(WorldPos::new(0.0, 10.0), 1e-4));
        let door = placement.pose.transform_point(WorldPos::new(0.0, -5.0));
        assert!(door.approx_eq(existing.position, 1e-4));
    }

    #[test]
    fn quarter_turn_rotates_room_then_closes_seam() {
        // Existing door faces north; candidate door faces east in local space.
        let existing = DoorFacing::new(WorldPos::new(3.0, 5.0), 0.0);
        let local_door = WorldPos::new(4.0, 0.0);
        let placement = aligner()
            .compute_placement(&existing, Pose::identity(), local_door, 90.0)
            .unwrap();
        assert_eq!(placement.rotation, 90.0);

        let door = placement.pose.transform_point(local_door);
        assert!(door.approx_eq(existing.position, 1e-4));
        let facing = placement.pose.transform_yaw(90.0);
        assert!(normalized_delta(facing, 180.0).abs() < 1e-4);
    }

    #[test]
    fn same_facing_turns_half_way_round() {
        let existing = DoorFacing::new(WorldPos::new(0.0, 0.0), 90.0);
        let local_door = WorldPos::new(2.0, 0.0);
        let placement = aligner()
            .compute_placement(&existing, Pose::identity(), local_door, 90.0)
            .unwrap();
        assert_eq!(placement.rotation, 180.0);
        let door = placement.pose.transform_point(local_door);
        assert!(door.approx_eq(existing.position, 1e-4));
        // The room now lies to the east of the seam.
        assert!(placement.pose.position.x > 0.0);
    }
}
