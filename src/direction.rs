use crate::location::*;
use bitflags::*;
use serde::{Deserialize, Serialize};

/// Compass facing of a door socket. North is yaw 0, yaw grows clockwise.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn yaw(self) -> f32 {
        match self {
            Direction::North => 0.0,
            Direction::East => 90.0,
            Direction::South => 180.0,
            Direction::West => 270.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn rotated_cw(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Snap a yaw to the nearest compass direction, if it lies within `tolerance` degrees.
    pub fn from_yaw(yaw: f32, tolerance: f32) -> Option<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .find(|d| normalized_delta(d.yaw(), yaw).abs() <= tolerance)
    }

    /// Unit vector pointing out of a door with this facing.
    pub fn unit(self) -> WorldPos {
        WorldPos::new(0.0, 1.0).rotated(self.yaw())
    }

    pub fn as_set(self) -> DirectionSet {
        match self {
            Direction::North => DirectionSet::NORTH,
            Direction::East => DirectionSet::EAST,
            Direction::South => DirectionSet::SOUTH,
            Direction::West => DirectionSet::WEST,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::North => "N",
            Direction::East => "E",
            Direction::South => "S",
            Direction::West => "W",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Set of compass directions, e.g. the facings offered by a template.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirectionSet: u8 {
        const NONE = 0;
        const NORTH = 1;
        const EAST = 2;
        const SOUTH = 4;
        const WEST = 8;
    }
}

impl DirectionSet {
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |d| self.contains(d.as_set()))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        iter.into_iter()
            .fold(DirectionSet::NONE, |set, d| set | d.as_set())
    }
}
