//! Second chances for doors that failed every placement try.
//!
//! Each failure lowers the odds of another chance; past the configured
//! maximum a door is abandoned outright, which bounds the whole process.

use crate::config::*;
use crate::door::DoorId;
use fnv::FnvHashMap;
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorRetryInfo {
    pub door: DoorId,
    pub fail_count: u32,
    /// Session time of the last failed attempt.
    pub last_attempt: Duration,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RetryDecision {
    /// Park the door in the failed-door list for a later attempt.
    Requeue,
    /// Never try the door again.
    Abandon,
}

/// `clamp01(base - fail_count * penalty)`.
pub fn adjusted_probability(config: &GenerationConfig, fail_count: u32) -> f32 {
    (config.door_retry_probability - fail_count as f32 * config.fail_penalty_factor).clamp(0.0, 1.0)
}

/// Per-session failure bookkeeping. Entries are never removed.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct RetryBook {
    entries: FnvHashMap<DoorId, DoorRetryInfo>,
}

impl RetryBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, door: DoorId) -> Option<&DoorRetryInfo> {
        self.entries.get(&door)
    }

    pub fn fail_count(&self, door: DoorId) -> u32 {
        self.entries.get(&door).map_or(0, |i| i.fail_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record_failure(&mut self, door: DoorId, now: Duration) -> DoorRetryInfo {
        let info = self.entries.entry(door).or_insert(DoorRetryInfo {
            door,
            fail_count: 0,
            last_attempt: now,
        });
        info.fail_count += 1;
        info.last_attempt = info.last_attempt.max(now);
        *info
    }

    /// Apply the retry policy to a door that has just failed.
    pub fn decide<R: Rng>(&self, door: DoorId, config: &GenerationConfig, rng: &mut R) -> RetryDecision {
        let fail_count = self.fail_count(door);
        if fail_count >= config.max_door_fail_count {
            return RetryDecision::Abandon;
        }
        let draw: f32 = rng.gen();
        if draw < adjusted_probability(config, fail_count) {
            RetryDecision::Requeue
        } else {
            RetryDecision::Abandon
        }
    }

    fn ready_at(&self, door: DoorId, delay: Duration) -> Duration {
        self.entries
            .get(&door)
            .map_or(Duration::ZERO, |i| i.last_attempt.saturating_add(delay))
    }

    /// Pull up to `limit` doors out of `failed` whose retry delay has elapsed,
    /// fewest failures first (ties: oldest attempt first).
    pub fn take_ready(
        &self,
        failed: &mut Vec<DoorId>,
        now: Duration,
        delay: Duration,
        limit: usize,
    ) -> Vec<DoorId> {
        let chosen: Vec<DoorId> = failed
            .iter()
            .copied()
            .filter(|d| self.ready_at(*d, delay) <= now)
            .sorted_by_key(|d| (self.fail_count(*d), self.ready_at(*d, delay), *d))
            .take(limit)
            .collect();
        failed.retain(|d| !chosen.contains(d));
        chosen
    }

    /// Earliest time at which any door in `failed` becomes eligible.
    pub fn next_ready(&self, failed: &[DoorId], delay: Duration) -> Option<Duration> {
        failed.iter().map(|d| self.ready_at(*d, delay)).min()
    }
}
