//! Which doors of a freshly committed room may spawn further rooms.
//!
//! The direction bias keeps growth running straight for a while and
//! occasionally branches, which yields corridor-like layouts instead of
//! uniform blobs. The bias state belongs to the generation session, not to
//! any room, because it tracks a run across rooms.

use crate::config::*;
use crate::room::RoomNode;
use log::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DirectionMode {
    /// Only doors facing the room's growth direction.
    SameDirection,
    /// Every door except the parent door.
    OtherDirection,
}

/// Warm-up counter for the first forced branch.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
enum Warmup {
    /// Rooms placed so far while the warm-up runs.
    Counting(u32),
    /// The forced branch has happened.
    Done,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionBias {
    warmup: Warmup,
    other_direction_probability: f32,
}

impl Default for DirectionBias {
    fn default() -> Self {
        DirectionBias {
            warmup: Warmup::Counting(0),
            other_direction_probability: 0.0,
        }
    }
}

impl DirectionBias {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn other_direction_probability(&self) -> f32 {
        self.other_direction_probability
    }

    pub fn warmup_done(&self) -> bool {
        self.warmup == Warmup::Done
    }

    /// Decide the mode for the next room.
    pub fn choose_mode<R: Rng>(&mut self, config: &GenerationConfig, rng: &mut R) -> DirectionMode {
        match self.warmup {
            Warmup::Counting(placed) if placed < config.initial_direction_change_delay => {
                self.warmup = Warmup::Counting(placed + 1);
                DirectionMode::SameDirection
            }
            Warmup::Counting(_) => {
                self.warmup = Warmup::Done;
                DirectionMode::OtherDirection
            }
            Warmup::Done => {
                let draw: f32 = rng.gen();
                if draw < self.other_direction_probability {
                    DirectionMode::OtherDirection
                } else {
                    DirectionMode::SameDirection
                }
            }
        }
    }

    /// Populate `room`'s selected doors (the `InitSelectedDoors` step).
    pub fn select_doors<R: Rng>(
        &mut self,
        room: &mut RoomNode,
        config: &GenerationConfig,
        rng: &mut R,
    ) -> DirectionMode {
        let mode = self.choose_mode(config, rng);
        match mode {
            DirectionMode::SameDirection => {
                let forward: Vec<u8> = match room.growth_direction {
                    Some(growth) => room
                        .non_parent_doors()
                        .filter(|i| {
                            room.door(*i)
                                .and_then(|d| d.direction(config.angle_tolerance))
                                == Some(growth)
                        })
                        .collect(),
                    None => room.non_parent_doors().collect(),
                };
                room.set_selected_doors(forward);

                let increment = if config.direction_probability_increase_rate > 0.0 {
                    rng.gen_range(0.0..config.direction_probability_increase_rate)
                } else {
                    0.0
                };
                self.other_direction_probability =
                    (self.other_direction_probability + increment).min(1.0);
            }
            DirectionMode::OtherDirection => {
                let all: Vec<u8> = room.non_parent_doors().collect();
                room.set_selected_doors(all);
                room.is_branch = true;
                self.other_direction_probability = 0.0;
            }
        }
        trace!(
            "{} selected doors {:?} ({:?}, next branch chance {:.2})",
            room.id,
            room.selected_doors(),
            mode,
            self.other_direction_probability
        );
        mode
    }
}

/// Legacy policy: one random non-parent door always, each other one with
/// `multiple_door_probability`.
pub fn select_multiple_doors<R: Rng>(room: &mut RoomNode, config: &GenerationConfig, rng: &mut R) {
    let candidates: Vec<u8> = room.non_parent_doors().collect();
    if candidates.is_empty() {
        room.set_selected_doors(Vec::new());
        return;
    }
    let guaranteed = candidates[rng.gen_range(0..candidates.len())];
    let mut selected = vec![guaranteed];
    for index in candidates {
        if index != guaranteed && rng.gen::<f32>() < config.multiple_door_probability {
            selected.push(index);
        }
    }
    room.set_selected_doors(selected);
}

/// Apply whichever selection policy the config names.
pub fn init_selected_doors<R: Rng>(
    bias: &mut DirectionBias,
    room: &mut RoomNode,
    config: &GenerationConfig,
    rng: &mut R,
) {
    match config.door_selection {
        DoorSelectionPolicy::DirectionBias => {
            bias.select_doors(room, config, rng);
        }
        DoorSelectionPolicy::MultipleDoors => select_multiple_doors(room, config, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::*;
    use crate::location::*;
    use crate::room::RoomId;
    use crate::template::RoomTemplate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn child_room() -> RoomNode {
        let template = RoomTemplate::square("cross", "hall", 10.0, DirectionSet::all());
        let mut room = RoomNode::from_template(RoomId(1), &template, Pose::identity(), 1);
        // Entered through the south door while growing north.
        room.parent_door = Some(2);
        room.growth_direction = Some(Direction::North);
        room
    }

    fn config(delay: u32) -> GenerationConfig {
        GenerationConfig {
            initial_direction_change_delay: delay,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn warmup_forces_same_then_one_branch() {
        let mut bias = DirectionBias::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let cfg = config(2);
        assert_eq!(bias.choose_mode(&cfg, &mut rng), DirectionMode::SameDirection);
        assert_eq!(bias.choose_mode(&cfg, &mut rng), DirectionMode::SameDirection);
        assert_eq!(bias.choose_mode(&cfg, &mut rng), DirectionMode::OtherDirection);
        assert!(bias.warmup_done());
    }

    #[test]
    fn same_direction_keeps_only_forward_doors() {
        let mut bias = DirectionBias::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut room = child_room();
        let mode = bias.select_doors(&mut room, &config(5), &mut rng);
        assert_eq!(mode, DirectionMode::SameDirection);
        assert_eq!(room.selected_doors(), &[0]);
        assert!(!room.is_branch);
        assert!(bias.other_direction_probability() < 0.25);
    }

    #[test]
    fn branch_selects_everything_but_parent_and_resets_probability() {
        let mut bias = DirectionBias::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut room = child_room();
        let mode = bias.select_doors(&mut room, &config(0), &mut rng);
        assert_eq!(mode, DirectionMode::OtherDirection);
        assert_eq!(room.selected_doors(), &[0, 1, 3]);
        assert!(room.is_branch);
        assert_eq!(bias.other_direction_probability(), 0.0);
    }

    #[test]
    fn long_straight_runs_make_branching_likely() {
        let mut bias = DirectionBias::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let cfg = GenerationConfig {
            initial_direction_change_delay: 0,
            direction_probability_increase_rate: 0.5,
            ..GenerationConfig::default()
        };
        // Burn the forced branch.
        bias.choose_mode(&cfg, &mut rng);
        let branches = (0..200)
            .map(|_| bias.select_doors(&mut child_room(), &cfg, &mut rng))
            .filter(|m| *m == DirectionMode::OtherDirection)
            .count();
        assert!(branches > 20, "only {branches} branches");
    }

    #[test]
    fn multiple_door_policy_always_selects_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let cfg = GenerationConfig {
            multiple_door_probability: 0.0,
            ..GenerationConfig::default()
        };
        for _ in 0..20 {
            let mut room = child_room();
            select_multiple_doors(&mut room, &cfg, &mut rng);
            assert_eq!(room.selected_doors().len(), 1);
            assert!(!room.is_selected(2));
        }
    }
}
