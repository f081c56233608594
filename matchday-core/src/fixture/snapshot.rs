//! One poll's reported state of a single fixture.

use super::{MatchId, TeamSide};
use time::OffsetDateTime;

/// Lifecycle indicator as classified by the Snapshot Source.
///
/// Sources carry wildly different vocabularies ("in progress", "IN_PLAY",
/// localized status words); the adapter maps its own vocabulary into this
/// enum so the tracker never parses source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    NotStarted,
    Live,
    HalfTime,
    Ended,
    Unknown,
}

/// Kind tag of a structured incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Goal,
    OwnGoal,
    PenaltyGoal,
    YellowCard,
    RedCard,
}

/// A discrete incident from a source with a structured event feed.
///
/// The id is the source's own incident identifier and is the dedup key;
/// it must be stable across polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMarker {
    pub id: i64,
    pub kind: MarkerKind,
    pub player: String,
    pub side: TeamSide,
}

/// Per-side red-card indicators for sources that expose a persistent visual
/// flag instead of discrete card events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedCardFlags {
    pub home: bool,
    pub away: bool,
}

/// Full reported state of one fixture at one poll.
///
/// Ephemeral: produced fresh each cycle and owned by the caller of a single
/// tracker update. All memory of what was already announced lives in the
/// tracker's records, never here.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub home_side: String,
    pub away_side: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub lifecycle: LifecycleSignal,
    /// Structured incidents; empty for sources without an event feed.
    pub markers: Vec<EventMarker>,
    /// Present only for sources that expose the boolean indicator.
    pub red_card_flags: Option<RedCardFlags>,
    /// Wall-clock kickoff, used only for the pre-kickoff schedule digest.
    pub kickoff: Option<OffsetDateTime>,
    pub venue: Option<String>,
}

impl MatchSnapshot {
    /// A snapshot whose identity is unusable cannot be tracked; the cycle
    /// skips it.
    pub fn has_usable_identity(&self) -> bool {
        !self.match_id.is_empty()
            && !self.home_side.trim().is_empty()
            && !self.away_side.trim().is_empty()
    }
}
