//! Derived event definitions.
//!
//! Events are immutable values produced by the tracker and consumed by the
//! notifier. They carry everything a renderer needs; they are never stored,
//! since the tracker's records are the only memory of what was announced.

use crate::fixture::MatchId;
use time::OffsetDateTime;

/// How a goal came about. Markers distinguish these; the score-diff
/// heuristic only ever produces `Regular`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalKind {
    Regular,
    OwnGoal,
    Penalty,
}

/// Attribution for a marker-fed goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorer {
    pub name: String,
    pub team: String,
}

/// A notable change derived from one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// Pre-kickoff schedule entry, emitted once per fixture on the first
    /// cycle of the day.
    Scheduled {
        match_id: MatchId,
        home: String,
        away: String,
        kickoff: Option<OffsetDateTime>,
        venue: Option<String>,
    },
    Started {
        match_id: MatchId,
        home: String,
        away: String,
    },
    HalfTime {
        match_id: MatchId,
        home: String,
        away: String,
        home_goals: u32,
        away_goals: u32,
    },
    RedCard {
        match_id: MatchId,
        team: String,
        /// Known for marker-fed cards, absent for boolean-flag sources.
        player: Option<String>,
    },
    YellowCard {
        match_id: MatchId,
        team: String,
        player: String,
    },
    Goal {
        match_id: MatchId,
        home: String,
        away: String,
        home_goals: u32,
        away_goals: u32,
        kind: GoalKind,
        scorer: Option<Scorer>,
    },
    /// A score change that is not an increase in total goals, announced as
    /// a correction rather than a goal.
    ScoreCorrection {
        match_id: MatchId,
        home: String,
        away: String,
        home_goals: u32,
        away_goals: u32,
    },
    Ended {
        match_id: MatchId,
        home: String,
        away: String,
        home_goals: u32,
        away_goals: u32,
        /// False when the completion was forced by the timeout fallback
        /// rather than reported by the source.
        confirmed: bool,
    },
}

impl MatchEvent {
    /// The fixture this event belongs to.
    pub fn match_id(&self) -> &MatchId {
        match self {
            MatchEvent::Scheduled { match_id, .. }
            | MatchEvent::Started { match_id, .. }
            | MatchEvent::HalfTime { match_id, .. }
            | MatchEvent::RedCard { match_id, .. }
            | MatchEvent::YellowCard { match_id, .. }
            | MatchEvent::Goal { match_id, .. }
            | MatchEvent::ScoreCorrection { match_id, .. }
            | MatchEvent::Ended { match_id, .. } => match_id,
        }
    }
}

/// All events derived from one poll cycle, in emission order.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub events: Vec<MatchEvent>,
}

impl EventBatch {
    pub fn new(events: Vec<MatchEvent>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
