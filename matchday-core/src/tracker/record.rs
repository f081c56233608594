//! Per-fixture tracking state.

use std::collections::HashSet;
use time::OffsetDateTime;

/// Where a fixture is in its lifecycle.
///
/// Only ever moves forward: `Scheduled` → `InProgress` → `Finished`, with
/// `Finished` also reachable directly for fixtures first seen after the
/// final whistle. Half-time is a latch on the record, not a phase; a match
/// at half-time is still diffed for goals afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchPhase {
    Scheduled,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RedCardLatch {
    pub home: bool,
    pub away: bool,
}

/// The authoritative memory of what has already been announced for one
/// fixture. Created on first sighting, never destroyed during a run,
/// mutated only by the tracker.
#[derive(Debug)]
pub(crate) struct MatchRecord {
    pub phase: MatchPhase,
    pub home: String,
    pub away: String,
    /// Last announced score pair; also the per-side clamp floor, so a feed
    /// regression can never pull an accepted count back down.
    pub score: (u32, u32),
    /// Watermark of the highest accepted goal total.
    pub goal_total: u32,
    /// Incident ids already announced, for structured-event sources.
    pub seen_marker_ids: HashSet<i64>,
    pub red_cards: RedCardLatch,
    pub half_time_announced: bool,
    /// Set exactly once, at the `Scheduled` → `InProgress` transition.
    pub started_at: Option<OffsetDateTime>,
}

impl MatchRecord {
    pub fn new(home: &str, away: &str) -> Self {
        Self {
            phase: MatchPhase::Scheduled,
            home: home.to_string(),
            away: away.to_string(),
            score: (0, 0),
            goal_total: 0,
            seen_marker_ids: HashSet::new(),
            red_cards: RedCardLatch::default(),
            half_time_announced: false,
            started_at: None,
        }
    }
}
