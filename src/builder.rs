//! The room graph builder: grows a level outward from a set of frontier doors.
//!
//! One builder runs one pass. Each pass dequeues frontier doors in FIFO
//! order and tries to attach a room to each. A placed candidate must survive
//! a settling window before the oracle's verdict is read, so the builder
//! suspends (`StepResult::Waiting`) after every placement and the host calls
//! `step` again once that time has come.
//!
//! Three bounds keep every pass finite: tries per door, tries per pass
//! (`attempts_per_room * target`), and the per-door failure count after
//! which a door is walled off for good.

use crate::align::*;
use crate::door::DoorId;
use crate::error::*;
use crate::location::Pose;
use crate::oracle::GeometryOracle;
use crate::pipeline::*;
use crate::policy::init_selected_doors;
use crate::retry::RetryDecision;
use crate::room::RoomId;
use crate::selector::RoomTemplateSelector;
use crate::session::GenerationSession;
use fnv::FnvHashSet;
use log::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum GrowthOutcome {
    /// Placed as many rooms as requested.
    TargetReached,
    /// Ran out of doors to try.
    Exhausted,
    /// Hit the per-pass try cap.
    AttemptCapReached,
    Cancelled,
}

/// Summary of a finished pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthReport {
    pub requested: u32,
    pub placed: u32,
    pub total_attempts: u32,
    pub max_total_attempts: u32,
    pub abandoned_doors: u32,
    pub reinjections: u32,
    pub misalignments: u32,
    pub outcome: GrowthOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuilderState {
    Idle,
    /// Growing from the seed room.
    GeneratingInitial,
    /// Growing from rooms retained by an earlier pass.
    ExpandingFrontier,
    Finished(GrowthReport),
    Failed(String),
}

/// A candidate room waiting out its settling window.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
struct PendingCandidate {
    room: RoomId,
    child_door: DoorId,
    resume_at: Duration,
}

/// The frontier door currently being worked on.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
struct ActiveDoor {
    door: DoorId,
    tries: u32,
    pending: Option<PendingCandidate>,
}

#[derive(Clone, Default, Debug, Serialize, Deserialize)]
struct Counters {
    placed: u32,
    total_attempts: u32,
    abandoned_doors: u32,
    reinjections: u32,
    misalignments: u32,
}

enum TryOutcome {
    /// Candidate placed; wait for the verdict.
    Placed,
    /// The try was spent without placing anything.
    Spent,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomGraphBuilder {
    state: BuilderState,
    target: u32,
    max_total_attempts: u32,
    frontier: VecDeque<DoorId>,
    failed: Vec<DoorId>,
    active: Option<ActiveDoor>,
    counters: Counters,
}

impl RoomGraphBuilder {
    pub fn new(target: u32) -> Self {
        RoomGraphBuilder {
            state: BuilderState::Idle,
            target,
            max_total_attempts: 0,
            frontier: VecDeque::new(),
            failed: Vec::new(),
            active: None,
            counters: Counters::default(),
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn placed(&self) -> u32 {
        self.counters.placed
    }

    pub fn total_attempts(&self) -> u32 {
        self.counters.total_attempts
    }

    pub fn frontier(&self) -> impl Iterator<Item = &DoorId> {
        self.frontier.iter()
    }

    pub fn failed_doors(&self) -> &[DoorId] {
        &self.failed
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BuilderState::Finished(_) | BuilderState::Failed(_))
    }

    pub fn report(&self) -> Option<&GrowthReport> {
        match &self.state {
            BuilderState::Finished(report) => Some(report),
            _ => None,
        }
    }

    fn ensure_idle(&self) -> GenerationResult<()> {
        if self.state != BuilderState::Idle {
            return Err(GenerationError::InvariantViolated(
                "builder already started".to_string(),
            ));
        }
        Ok(())
    }

    /// Start the initial pass from every open door of `seed`.
    pub fn start_from(&mut self, session: &GenerationSession, seed: RoomId) -> GenerationResult<()> {
        self.ensure_idle()?;
        let room = session
            .graph
            .room(seed)
            .ok_or(GenerationError::UnknownRoom(seed))?;
        self.frontier = room.open_doors().map(|d| d.id).collect();
        self.max_total_attempts = session.config.max_total_attempts(self.target);
        self.state = BuilderState::GeneratingInitial;

        debug!(
            "Growing {} rooms from {} ({} frontier doors, {} tries max)",
            self.target,
            seed,
            self.frontier.len(),
            self.max_total_attempts
        );
        Ok(())
    }

    /// Start an expansion pass from the open selected doors of `rooms`.
    pub fn start_from_retained(
        &mut self,
        session: &GenerationSession,
        rooms: &[RoomId],
    ) -> GenerationResult<()> {
        self.ensure_idle()?;
        let mut frontier = VecDeque::new();
        for id in rooms {
            let room = session
                .graph
                .room(*id)
                .ok_or(GenerationError::UnknownRoom(*id))?;
            frontier.extend(room.open_selected_doors());
        }
        self.frontier = frontier;
        self.max_total_attempts = session.config.max_total_attempts(self.target);
        self.state = BuilderState::ExpandingFrontier;

        debug!(
            "Expanding {} rooms from {} retained rooms ({} frontier doors)",
            self.target,
            rooms.len(),
            self.frontier.len()
        );
        Ok(())
    }

    /// Advance the pass as far as `budget` and the settling windows allow.
    pub fn step(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
        now: Duration,
        budget: &StepBudget,
    ) -> GenerationResult<StepResult> {
        match &self.state {
            BuilderState::Idle => return Err(GenerationError::NotStarted),
            BuilderState::Finished(report) => return Ok(StepResult::Complete(report.clone())),
            BuilderState::Failed(msg) => {
                return Err(GenerationError::InvariantViolated(format!(
                    "builder failed earlier: {}",
                    msg
                )))
            }
            BuilderState::GeneratingInitial | BuilderState::ExpandingFrontier => {}
        }
        session.advance_clock(now);

        loop {
            if let Some(pending) = self.active.and_then(|a| a.pending) {
                if now < pending.resume_at {
                    return Ok(StepResult::Waiting(pending.resume_at));
                }
                self.resolve(session, oracle, pending)?;
                continue;
            }

            if !budget.has_budget() {
                return Ok(StepResult::Running);
            }

            if self.counters.placed >= self.target {
                return Ok(self.finish(session, GrowthOutcome::TargetReached));
            }
            if self.counters.total_attempts >= self.max_total_attempts {
                return Ok(self.finish(session, GrowthOutcome::AttemptCapReached));
            }

            if let Some(active) = self.active {
                if active.tries >= session.config.max_try_count {
                    self.exhaust_door(session, active.door, now)?;
                    continue;
                }
                match self.begin_try(session, oracle, active.door, now) {
                    Ok(TryOutcome::Placed) => {}
                    Ok(TryOutcome::Spent) => {
                        if let Some(active) = self.active.as_mut() {
                            active.tries += 1;
                        }
                    }
                    Err(err) => return Err(self.fail(session, oracle, err)),
                }
                continue;
            }

            match self.frontier.pop_front() {
                Some(door) => {
                    // Doors can be connected or walled while they sit in the queue.
                    if session.graph.door(door).map_or(false, |d| d.is_open()) {
                        self.active = Some(ActiveDoor {
                            door,
                            tries: 0,
                            pending: None,
                        });
                    }
                }
                None => {
                    if let Some(resume_at) = self.refill_frontier(session, now) {
                        return Ok(StepResult::Waiting(resume_at));
                    }
                    if self.frontier.is_empty() {
                        return Ok(self.finish(session, GrowthOutcome::Exhausted));
                    }
                }
            }
        }
    }

    /// Stop the pass, tearing down any candidate still settling.
    pub fn cancel(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
    ) -> GenerationResult<GrowthReport> {
        match &self.state {
            BuilderState::Finished(report) => return Ok(report.clone()),
            BuilderState::Failed(reason) => {
                return Err(GenerationError::InvariantViolated(format!(
                    "builder failed earlier: {}",
                    reason
                )))
            }
            _ => {}
        }
        if let Some(pending) = self.active.and_then(|a| a.pending) {
            warn!("Cancelling with candidate {} still settling", pending.room);
            self.teardown(session, oracle, pending)?;
        }
        self.active = None;
        match self.finish(session, GrowthOutcome::Cancelled) {
            StepResult::Complete(report) => Ok(report),
            _ => Err(GenerationError::InvariantViolated(
                "cancelled builder did not finish".to_string(),
            )),
        }
    }

    /// Re-inject eligible failed doors, else rescan placed rooms for open doors.
    /// Returns a resume time when only not-yet-eligible failed doors remain.
    fn refill_frontier(&mut self, session: &GenerationSession, now: Duration) -> Option<Duration> {
        let delay = session.config.door_retry_delay();
        let ready = session.retries.take_ready(
            &mut self.failed,
            now,
            delay,
            session.config.max_reinjected_doors,
        );
        if !ready.is_empty() {
            debug!("Re-injecting failed doors {:?}", ready);
            self.counters.reinjections += ready.len() as u32;
            self.frontier.extend(ready);
            return None;
        }

        let parked: FnvHashSet<DoorId> = self.failed.iter().copied().collect();
        let open = session.graph.open_doors(&parked);
        if !open.is_empty() {
            trace!("Rescanned {} open doors", open.len());
            self.frontier.extend(open);
            return None;
        }

        session.retries.next_ready(&self.failed, delay)
    }

    fn begin_try(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
        door: DoorId,
        now: Duration,
    ) -> GenerationResult<TryOutcome> {
        self.counters.total_attempts += 1;

        let (facing, growth, room_type) = {
            let edge = session
                .graph
                .door(door)
                .ok_or(GenerationError::UnknownDoor(door))?;
            let room_type = edge
                .leads_to
                .clone()
                .unwrap_or_else(|| session.catalog.default_room_type().clone());
            (
                DoorFacing::new(edge.position, edge.yaw),
                edge.direction(session.config.angle_tolerance),
                room_type,
            )
        };
        let depth = session
            .graph
            .room(door.room)
            .map(|r| r.depth + 1)
            .ok_or(GenerationError::UnknownRoom(door.room))?;

        let selector = RoomTemplateSelector::new(&session.catalog, session.config.probability_epsilon);
        let template = selector.select(&room_type, &mut session.rng)?;
        if template.doors.is_empty() {
            warn!("Template '{}' has no doors to attach through", template.name);
            return Err(GenerationError::TemplateWithoutDoors(template.name.clone()));
        }

        // Prefer a door that already faces back at the frontier door.
        let facing_back: Vec<usize> = match growth {
            Some(dir) => template
                .doors
                .iter()
                .enumerate()
                .filter(|(_, s)| s.direction == dir.opposite())
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };
        let socket_index = if facing_back.is_empty() {
            session.rng.gen_range(0..template.doors.len())
        } else {
            facing_back[session.rng.gen_range(0..facing_back.len())]
        };
        let socket = &template.doors[socket_index];

        let aligner = DoorAligner::new(session.config.angle_tolerance);
        let placement = match aligner.compute_placement(
            &facing,
            Pose::identity(),
            socket.position,
            socket.direction.yaw(),
        ) {
            Ok(placement) => placement,
            Err(GenerationError::DoorMisaligned { angle }) => {
                self.counters.misalignments += 1;
                trace!("Try for {} spent: '{}' misaligned by {}", door, template.name, angle);
                return Ok(TryOutcome::Spent);
            }
            Err(err) => return Err(err),
        };

        let resume_at = now.checked_add(session.config.settle_delay()).ok_or_else(|| {
            GenerationError::InvalidConfig(format!(
                "settle_delay of {}s overflows the clock at {:?}",
                session.config.settle_delay, now
            ))
        })?;

        let room = session.graph.instantiate(template, placement.pose, depth);
        let child_door = DoorId::new(room, socket_index as u8);
        if let Err(err) =
            session
                .graph
                .connect_with_tolerance(door, child_door, session.config.angle_tolerance)
        {
            session.graph.discard(room)?;
            return Err(err);
        }

        let probes = session
            .graph
            .room(room)
            .map(|r| r.probes.clone())
            .unwrap_or_default();
        oracle.place(room, &probes);

        trace!(
            "Try {} for {}: '{}' as {} rotated {}, settling until {:?}",
            self.counters.total_attempts,
            door,
            template.name,
            room,
            placement.rotation,
            resume_at
        );
        if let Some(active) = self.active.as_mut() {
            active.pending = Some(PendingCandidate {
                room,
                child_door,
                resume_at,
            });
        }
        Ok(TryOutcome::Placed)
    }

    fn resolve(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
        pending: PendingCandidate,
    ) -> GenerationResult<()> {
        let overlapping = oracle.is_overlapping(pending.room);
        if let Some(room) = session.graph.room_mut(pending.room) {
            room.overlapping = overlapping;
        }

        if overlapping {
            trace!("Candidate {} overlaps, tearing down", pending.room);
            self.teardown(session, oracle, pending)?;
            if let Some(active) = self.active.as_mut() {
                active.pending = None;
                active.tries += 1;
            }
            return Ok(());
        }

        session.graph.commit(pending.room)?;
        oracle.commit(pending.room);
        self.counters.placed += 1;
        self.active = None;

        if let Some(room) = session.graph.room_mut(pending.room) {
            init_selected_doors(&mut session.direction, room, &session.config, &mut session.rng);
            self.frontier.extend(room.open_selected_doors());
            debug!(
                "Committed {} '{}' at depth {} ({}/{})",
                room.id, room.template, room.depth, self.counters.placed, self.target
            );
        }
        Ok(())
    }

    fn teardown(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
        pending: PendingCandidate,
    ) -> GenerationResult<()> {
        if let Some(parent) = session.graph.room(pending.room).and_then(|r| r.parent) {
            session.graph.disconnect(parent, pending.child_door)?;
        }
        session.graph.discard(pending.room)?;
        oracle.remove(pending.room);
        Ok(())
    }

    /// Every try for `door` failed: park it for later or wall it off.
    fn exhaust_door(
        &mut self,
        session: &mut GenerationSession,
        door: DoorId,
        now: Duration,
    ) -> GenerationResult<()> {
        self.active = None;
        let info = session.retries.record_failure(door, now);
        match session.retries.decide(door, &session.config, &mut session.rng) {
            RetryDecision::Requeue => {
                trace!("Parking {} after {} failures", door, info.fail_count);
                if !self.failed.contains(&door) {
                    self.failed.push(door);
                }
            }
            RetryDecision::Abandon => {
                debug!("Abandoning {} after {} failures", door, info.fail_count);
                session.graph.wall_off(door)?;
                self.counters.abandoned_doors += 1;
            }
        }
        Ok(())
    }

    fn fail(
        &mut self,
        session: &mut GenerationSession,
        oracle: &mut dyn GeometryOracle,
        err: GenerationError,
    ) -> GenerationError {
        error!("Generation pass aborted: {}", err);
        if let Some(pending) = self.active.and_then(|a| a.pending) {
            if let Err(teardown_err) = self.teardown(session, oracle, pending) {
                error!("Could not tear down {}: {}", pending.room, teardown_err);
            }
        }
        self.active = None;
        self.state = BuilderState::Failed(err.to_string());
        err
    }

    fn finish(&mut self, session: &mut GenerationSession, outcome: GrowthOutcome) -> StepResult {
        session.retained = session.graph.expandable_rooms();

        let report = GrowthReport {
            requested: self.target,
            placed: self.counters.placed,
            total_attempts: self.counters.total_attempts,
            max_total_attempts: self.max_total_attempts,
            abandoned_doors: self.counters.abandoned_doors,
            reinjections: self.counters.reinjections,
            misalignments: self.counters.misalignments,
            outcome,
        };
        debug!(
            "Pass finished ({:?}): placed={}/{}, attempts={}/{}, abandoned={}, reinjected={}, retained={}",
            outcome,
            report.placed,
            report.requested,
            report.total_attempts,
            report.max_total_attempts,
            report.abandoned_doors,
            report.reinjections,
            session.retained.len()
        );
        self.state = BuilderState::Finished(report.clone());
        StepResult::Complete(report)
    }
}
