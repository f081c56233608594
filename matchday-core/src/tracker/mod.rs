//! The match tracker: state machine and diff engine.
//!
//! The tracker owns one `MatchRecord` per fixture and derives events by
//! diffing each incoming snapshot batch against that state. All dedup and
//! ordering guarantees live here:
//!
//! - a fixture's phase never moves backward, and `Finished` is terminal
//! - the accepted goal total never decreases, whatever the feed reports
//! - a structured incident id is announced at most once, ever
//! - per fixture and cycle, events emit in causal order:
//!   started → half-time → cards → goals → ended
//!
//! The record map is mutated synchronously inside `update` and nowhere
//! else; callers drive updates from a single loop.

mod record;

pub use record::MatchPhase;

use crate::events::types::{GoalKind, MatchEvent, Scorer};
use crate::fixture::{EventMarker, LifecycleSignal, MarkerKind, MatchId, MatchSnapshot, TeamSide};
use record::MatchRecord;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Tunables for the tracker.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// How long after kickoff a match may stay `InProgress` before it is
    /// force-finished. Sources that reliably report completion tolerate a
    /// generous ceiling; pure elapsed-time sources need a tighter one.
    pub completion_ceiling: std::time::Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreChange {
    Increase,
    Correction,
}

/// Relabel an apparent goal that does not raise the total: after a clamp
/// correction the pair can change without the match gaining a goal.
fn classify_score_change(previous_total: u32, new_total: u32) -> ScoreChange {
    if new_total <= previous_total {
        ScoreChange::Correction
    } else {
        ScoreChange::Increase
    }
}

pub struct MatchTracker {
    records: HashMap<MatchId, MatchRecord>,
    completion_ceiling: time::Duration,
}

impl MatchTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            records: HashMap::new(),
            completion_ceiling: time::Duration::try_from(config.completion_ceiling)
                .unwrap_or(time::Duration::MAX),
        }
    }

    /// First-cycle schedule announcement.
    ///
    /// Creates a record for every newly seen fixture and returns one
    /// `Scheduled` event per creation. Fixtures already tracked produce
    /// nothing, so calling this again later is harmless.
    pub fn announce_schedule(&mut self, snapshots: &[MatchSnapshot]) -> Vec<MatchEvent> {
        let mut out = Vec::new();
        for snap in snapshots {
            if !snap.has_usable_identity() {
                warn!(match_id = %snap.match_id, "skipping schedule entry with unusable identity");
                continue;
            }
            if self.records.contains_key(&snap.match_id) {
                continue;
            }
            self.records.insert(
                snap.match_id.clone(),
                MatchRecord::new(&snap.home_side, &snap.away_side),
            );
            out.push(MatchEvent::Scheduled {
                match_id: snap.match_id.clone(),
                home: snap.home_side.clone(),
                away: snap.away_side.clone(),
                kickoff: snap.kickoff,
                venue: snap.venue.clone(),
            });
        }
        out
    }

    /// Diff a snapshot batch against stored state and emit derived events.
    pub fn update(&mut self, snapshots: &[MatchSnapshot]) -> Vec<MatchEvent> {
        self.update_at(snapshots, OffsetDateTime::now_utc())
    }

    /// `update` with an explicit clock, for deterministic tests and for
    /// callers that already hold a cycle timestamp.
    pub fn update_at(&mut self, snapshots: &[MatchSnapshot], now: OffsetDateTime) -> Vec<MatchEvent> {
        let mut out = Vec::new();
        for snap in snapshots {
            if !snap.has_usable_identity() {
                warn!(match_id = %snap.match_id, "skipping snapshot with unusable identity");
                continue;
            }
            let record = self
                .records
                .entry(snap.match_id.clone())
                .or_insert_with(|| MatchRecord::new(&snap.home_side, &snap.away_side));
            if record.phase == MatchPhase::Finished {
                continue;
            }
            apply_snapshot(record, snap, now, &mut out);
        }
        self.sweep_overdue(now, &mut out);
        out
    }

    /// True once at least one fixture is tracked and every one of them has
    /// finished. Drives the bounded lifetime mode.
    pub fn all_finished(&self) -> bool {
        !self.records.is_empty()
            && self
                .records
                .values()
                .all(|r| r.phase == MatchPhase::Finished)
    }

    /// Number of fixtures currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Force-finish matches that exceeded the completion ceiling.
    ///
    /// Runs over every record, not just the current batch: a flaky source
    /// may stop listing a match entirely instead of reporting its end.
    fn sweep_overdue(&mut self, now: OffsetDateTime, out: &mut Vec<MatchEvent>) {
        for (id, record) in self.records.iter_mut() {
            if record.phase != MatchPhase::InProgress {
                continue;
            }
            let Some(started_at) = record.started_at else {
                continue;
            };
            if now - started_at > self.completion_ceiling {
                record.phase = MatchPhase::Finished;
                warn!(
                    match_id = %id,
                    started_at = %started_at,
                    "match exceeded completion ceiling, force-finishing"
                );
                out.push(MatchEvent::Ended {
                    match_id: id.clone(),
                    home: record.home.clone(),
                    away: record.away.clone(),
                    home_goals: record.score.0,
                    away_goals: record.score.1,
                    confirmed: false,
                });
            }
        }
    }
}

fn apply_snapshot(
    record: &mut MatchRecord,
    snap: &MatchSnapshot,
    now: OffsetDateTime,
    out: &mut Vec<MatchEvent>,
) {
    // Accepted counts never fall below what was already accepted.
    let clamped = (
        record.score.0.max(snap.home_goals),
        record.score.1.max(snap.away_goals),
    );

    match snap.lifecycle {
        LifecycleSignal::Live if record.phase == MatchPhase::Scheduled => {
            record.phase = MatchPhase::InProgress;
            record.started_at = Some(now);
            debug!(match_id = %snap.match_id, "match started");
            out.push(MatchEvent::Started {
                match_id: snap.match_id.clone(),
                home: record.home.clone(),
                away: record.away.clone(),
            });
        }
        LifecycleSignal::Ended => {
            record.phase = MatchPhase::Finished;
            record.score = clamped;
            record.goal_total = record.goal_total.max(clamped.0 + clamped.1);
            debug!(match_id = %snap.match_id, "match ended");
            out.push(MatchEvent::Ended {
                match_id: snap.match_id.clone(),
                home: record.home.clone(),
                away: record.away.clone(),
                home_goals: clamped.0,
                away_goals: clamped.1,
                confirmed: true,
            });
            // Nothing else is checked once the source reports completion.
            return;
        }
        LifecycleSignal::HalfTime
            if !record.half_time_announced && record.phase != MatchPhase::Scheduled =>
        {
            record.half_time_announced = true;
            out.push(MatchEvent::HalfTime {
                match_id: snap.match_id.clone(),
                home: record.home.clone(),
                away: record.away.clone(),
                home_goals: clamped.0,
                away_goals: clamped.1,
            });
        }
        _ => {}
    }

    if record.phase == MatchPhase::Scheduled {
        // Still waiting for kickoff; placeholder scores and incidents from
        // the feed are not diffed before the live signal.
        return;
    }

    let (card_events, goal_events, structured_goal) =
        collect_marker_events(record, snap, clamped);
    out.extend(card_events);

    if let Some(flags) = snap.red_card_flags {
        if flags.home && !record.red_cards.home {
            record.red_cards.home = true;
            out.push(MatchEvent::RedCard {
                match_id: snap.match_id.clone(),
                team: record.home.clone(),
                player: None,
            });
        }
        if flags.away && !record.red_cards.away {
            record.red_cards.away = true;
            out.push(MatchEvent::RedCard {
                match_id: snap.match_id.clone(),
                team: record.away.clone(),
                player: None,
            });
        }
    }

    out.extend(goal_events);

    if clamped != record.score {
        let new_total = clamped.0 + clamped.1;
        if structured_goal {
            // A structured marker already announced this change; the
            // heuristic diff stays quiet so the goal lands once.
        } else {
            match classify_score_change(record.goal_total, new_total) {
                ScoreChange::Correction => out.push(MatchEvent::ScoreCorrection {
                    match_id: snap.match_id.clone(),
                    home: record.home.clone(),
                    away: record.away.clone(),
                    home_goals: clamped.0,
                    away_goals: clamped.1,
                }),
                ScoreChange::Increase => out.push(MatchEvent::Goal {
                    match_id: snap.match_id.clone(),
                    home: record.home.clone(),
                    away: record.away.clone(),
                    home_goals: clamped.0,
                    away_goals: clamped.1,
                    kind: GoalKind::Regular,
                    scorer: None,
                }),
            }
        }
        record.score = clamped;
        record.goal_total = record.goal_total.max(new_total);
    }
}

/// Translate unseen structured incidents into events.
///
/// Returns cards and goals separately so the caller can keep the
/// cards-before-goals emission order, plus whether any goal marker fired
/// (which suppresses the heuristic score diff for the cycle).
fn collect_marker_events(
    record: &mut MatchRecord,
    snap: &MatchSnapshot,
    clamped: (u32, u32),
) -> (Vec<MatchEvent>, Vec<MatchEvent>, bool) {
    let mut sorted: Vec<&EventMarker> = snap.markers.iter().collect();
    sorted.sort_by_key(|m| m.id);

    let mut cards = Vec::new();
    let mut goals = Vec::new();
    let mut structured_goal = false;

    for marker in sorted {
        if !record.seen_marker_ids.insert(marker.id) {
            continue;
        }
        let team = match marker.side {
            TeamSide::Home => record.home.clone(),
            TeamSide::Away => record.away.clone(),
        };
        match marker.kind {
            MarkerKind::YellowCard => cards.push(MatchEvent::YellowCard {
                match_id: snap.match_id.clone(),
                team,
                player: marker.player.clone(),
            }),
            MarkerKind::RedCard => cards.push(MatchEvent::RedCard {
                match_id: snap.match_id.clone(),
                team,
                player: Some(marker.player.clone()),
            }),
            MarkerKind::Goal | MarkerKind::OwnGoal | MarkerKind::PenaltyGoal => {
                structured_goal = true;
                let kind = match marker.kind {
                    MarkerKind::OwnGoal => GoalKind::OwnGoal,
                    MarkerKind::PenaltyGoal => GoalKind::Penalty,
                    _ => GoalKind::Regular,
                };
                goals.push(MatchEvent::Goal {
                    match_id: snap.match_id.clone(),
                    home: record.home.clone(),
                    away: record.away.clone(),
                    home_goals: clamped.0,
                    away_goals: clamped.1,
                    kind,
                    scorer: Some(Scorer {
                        name: marker.player.clone(),
                        team,
                    }),
                });
            }
        }
    }

    (cards, goals, structured_goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::RedCardFlags;
    use std::time::Duration;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2026-06-14 16:00 UTC);

    fn tracker() -> MatchTracker {
        MatchTracker::new(TrackerConfig {
            completion_ceiling: Duration::from_secs(7200),
        })
    }

    fn snap(home_goals: u32, away_goals: u32, lifecycle: LifecycleSignal) -> MatchSnapshot {
        MatchSnapshot {
            match_id: MatchId::derive("SWE", "ENG"),
            home_side: "Sweden".into(),
            away_side: "England".into(),
            home_goals,
            away_goals,
            lifecycle,
            markers: Vec::new(),
            red_card_flags: None,
            kickoff: None,
            venue: None,
        }
    }

    fn goal_marker(id: i64, kind: MarkerKind, player: &str, side: TeamSide) -> EventMarker {
        EventMarker {
            id,
            kind,
            player: player.into(),
            side,
        }
    }

    #[test]
    fn full_match_flow_announces_five_events_in_order() {
        let mut t = tracker();
        let mut all = Vec::new();
        all.extend(t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0));
        all.extend(t.update_at(&[snap(1, 0, LifecycleSignal::Live)], T0));
        all.extend(t.update_at(&[snap(1, 0, LifecycleSignal::HalfTime)], T0));
        all.extend(t.update_at(&[snap(2, 0, LifecycleSignal::Live)], T0));
        all.extend(t.update_at(&[snap(2, 1, LifecycleSignal::Ended)], T0));

        assert_eq!(all.len(), 5);
        assert!(matches!(all[0], MatchEvent::Started { .. }));
        assert!(matches!(
            all[1],
            MatchEvent::Goal {
                home_goals: 1,
                away_goals: 0,
                ..
            }
        ));
        assert!(matches!(all[2], MatchEvent::HalfTime { .. }));
        assert!(matches!(
            all[3],
            MatchEvent::Goal {
                home_goals: 2,
                away_goals: 0,
                ..
            }
        ));
        assert!(matches!(
            all[4],
            MatchEvent::Ended {
                home_goals: 2,
                away_goals: 1,
                confirmed: true,
                ..
            }
        ));
    }

    #[test]
    fn schedule_announced_once_per_fixture() {
        let mut t = tracker();
        let first = t.announce_schedule(&[snap(0, 0, LifecycleSignal::NotStarted)]);
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], MatchEvent::Scheduled { .. }));

        let second = t.announce_schedule(&[snap(0, 0, LifecycleSignal::NotStarted)]);
        assert!(second.is_empty());
    }

    #[test]
    fn update_creates_records_silently() {
        let mut t = tracker();
        let events = t.update_at(&[snap(0, 0, LifecycleSignal::NotStarted)], T0);
        assert!(events.is_empty());
        assert_eq!(t.tracked(), 1);
    }

    #[test]
    fn score_regression_emits_nothing_and_keeps_watermark() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);
        let events = t.update_at(&[snap(2, 0, LifecycleSignal::Live)], T0);
        assert_eq!(events.len(), 1);

        // Feed regresses to 1-0; the accepted score stays 2-0 and nothing fires.
        let events = t.update_at(&[snap(1, 0, LifecycleSignal::Live)], T0);
        assert!(events.is_empty());

        // The regressed final snapshot still announces the clamped score.
        let events = t.update_at(&[snap(1, 0, LifecycleSignal::Ended)], T0);
        assert!(matches!(
            events[0],
            MatchEvent::Ended {
                home_goals: 2,
                away_goals: 0,
                ..
            }
        ));
    }

    #[test]
    fn finished_is_terminal() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);
        t.update_at(&[snap(0, 0, LifecycleSignal::Ended)], T0);
        assert!(t.all_finished());

        // Flapping back to live with a new score and a red card: silence.
        let mut late = snap(3, 0, LifecycleSignal::Live);
        late.red_card_flags = Some(RedCardFlags {
            home: true,
            away: false,
        });
        let events = t.update_at(&[late], T0);
        assert!(events.is_empty());
        assert!(t.all_finished());
    }

    #[test]
    fn ended_signal_short_circuits_the_rest_of_the_cycle() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut last = snap(1, 0, LifecycleSignal::Ended);
        last.markers = vec![goal_marker(9, MarkerKind::Goal, "A. Larsson", TeamSide::Home)];
        last.red_card_flags = Some(RedCardFlags {
            home: true,
            away: true,
        });
        let events = t.update_at(&[last], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            MatchEvent::Ended {
                home_goals: 1,
                confirmed: true,
                ..
            }
        ));
    }

    #[test]
    fn fixture_first_seen_after_the_final_whistle_ends_immediately() {
        let mut t = tracker();
        let events = t.update_at(&[snap(2, 2, LifecycleSignal::Ended)], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            MatchEvent::Ended {
                home_goals: 2,
                away_goals: 2,
                confirmed: true,
                ..
            }
        ));
        assert!(t.all_finished());
    }

    #[test]
    fn half_time_is_latched_once_and_needs_a_started_match() {
        let mut t = tracker();
        // Half-time before any live signal: still waiting for kickoff.
        let events = t.update_at(&[snap(0, 0, LifecycleSignal::HalfTime)], T0);
        assert!(events.is_empty());

        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);
        let events = t.update_at(&[snap(0, 0, LifecycleSignal::HalfTime)], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MatchEvent::HalfTime { .. }));

        let events = t.update_at(&[snap(0, 0, LifecycleSignal::HalfTime)], T0);
        assert!(events.is_empty());
    }

    #[test]
    fn red_card_flags_latch_per_side() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut s = snap(0, 0, LifecycleSignal::Live);
        s.red_card_flags = Some(RedCardFlags {
            home: true,
            away: false,
        });
        let events = t.update_at(&[s.clone()], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            MatchEvent::RedCard { team, player: None, .. } if team == "Sweden"
        ));

        // Same flag again: latched, no repeat. The away side fires fresh.
        s.red_card_flags = Some(RedCardFlags {
            home: true,
            away: true,
        });
        let events = t.update_at(&[s], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            MatchEvent::RedCard { team, .. } if team == "England"
        ));
    }

    #[test]
    fn marker_ids_are_never_announced_twice() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut s = snap(1, 0, LifecycleSignal::Live);
        s.markers = vec![goal_marker(41, MarkerKind::Goal, "A. Larsson", TeamSide::Home)];
        let events = t.update_at(&[s.clone()], T0);
        assert_eq!(events.len(), 1);

        // Same marker id in the next cycle: nothing.
        let events = t.update_at(&[s], T0);
        assert!(events.is_empty());
    }

    #[test]
    fn structured_marker_wins_over_score_diff_in_the_same_cycle() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut s = snap(1, 0, LifecycleSignal::Live);
        s.markers = vec![goal_marker(7, MarkerKind::PenaltyGoal, "A. Larsson", TeamSide::Home)];
        let events = t.update_at(&[s], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            MatchEvent::Goal {
                kind: GoalKind::Penalty,
                scorer: Some(_),
                home_goals: 1,
                ..
            }
        ));

        // The suppressed diff still advanced the watermark: the same score
        // without the marker stays quiet next cycle.
        let events = t.update_at(&[snap(1, 0, LifecycleSignal::Live)], T0);
        assert!(events.is_empty());
    }

    #[test]
    fn card_markers_do_not_suppress_the_score_diff() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut s = snap(1, 0, LifecycleSignal::Live);
        s.markers = vec![goal_marker(3, MarkerKind::YellowCard, "B. Khan", TeamSide::Away)];
        let events = t.update_at(&[s], T0);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], MatchEvent::YellowCard { team, .. } if team == "England"));
        assert!(matches!(events[1], MatchEvent::Goal { scorer: None, .. }));
    }

    #[test]
    fn emission_order_within_one_cycle_is_causal() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::Live)], T0);

        let mut s = snap(1, 0, LifecycleSignal::HalfTime);
        s.red_card_flags = Some(RedCardFlags {
            home: false,
            away: true,
        });
        let events = t.update_at(&[s], T0);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], MatchEvent::HalfTime { .. }));
        assert!(matches!(events[1], MatchEvent::RedCard { .. }));
        assert!(matches!(events[2], MatchEvent::Goal { .. }));
    }

    #[test]
    fn started_and_first_goal_can_share_a_cycle() {
        let mut t = tracker();
        let events = t.update_at(&[snap(1, 0, LifecycleSignal::Live)], T0);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MatchEvent::Started { .. }));
        assert!(matches!(events[1], MatchEvent::Goal { .. }));
    }

    #[test]
    fn overdue_match_is_force_finished_even_when_absent_from_the_batch() {
        let mut t = tracker();
        t.update_at(&[snap(1, 0, LifecycleSignal::Live)], T0);

        // Within the ceiling: nothing.
        let events = t.update_at(&[], T0 + time::Duration::seconds(7200));
        assert!(events.is_empty());

        // Past the ceiling, with the source no longer listing the match.
        let events = t.update_at(&[], T0 + time::Duration::seconds(7201));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            MatchEvent::Ended {
                home_goals: 1,
                away_goals: 0,
                confirmed: false,
                ..
            }
        ));
        assert!(t.all_finished());

        // Terminal: the sweep never fires twice.
        let events = t.update_at(&[], T0 + time::Duration::seconds(20000));
        assert!(events.is_empty());
    }

    #[test]
    fn unstarted_fixture_never_times_out() {
        let mut t = tracker();
        t.update_at(&[snap(0, 0, LifecycleSignal::NotStarted)], T0);
        let events = t.update_at(&[], T0 + time::Duration::seconds(100_000));
        assert!(events.is_empty());
        assert!(!t.all_finished());
    }

    #[test]
    fn malformed_snapshot_skips_only_that_fixture() {
        let mut t = tracker();
        let mut broken = snap(0, 0, LifecycleSignal::Live);
        broken.home_side = String::new();

        let mut other = snap(0, 0, LifecycleSignal::Live);
        other.match_id = MatchId::derive("FRA", "PER");
        other.home_side = "France".into();
        other.away_side = "Peru".into();

        let events = t.update_at(&[broken, other], T0);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], MatchEvent::Started { home, .. } if home == "France"));
        assert_eq!(t.tracked(), 1);
    }

    #[test]
    fn all_finished_requires_at_least_one_fixture() {
        let t = tracker();
        assert!(!t.all_finished());
    }

    #[test]
    fn score_change_classification() {
        assert_eq!(classify_score_change(0, 1), ScoreChange::Increase);
        assert_eq!(classify_score_change(2, 3), ScoreChange::Increase);
        assert_eq!(classify_score_change(2, 2), ScoreChange::Correction);
        assert_eq!(classify_score_change(3, 2), ScoreChange::Correction);
    }
}
