//! Event → message rendering.
//!
//! A cycle renders to at most one schedule digest plus one message per
//! fixture, so a half-time flag and a goal landing in the same cycle read
//! as a single notification. Per-sink participant decoration is applied
//! last, just before delivery.

use super::types::{GoalKind, MatchEvent};
use crate::fixture::MatchId;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::macros::format_description;

/// Render one cycle's events into delivery-ready messages.
///
/// `Scheduled` events collapse into a single day digest; all other events
/// group per fixture in emission order.
pub fn render_cycle(events: &[MatchEvent]) -> Vec<String> {
    let mut schedule_lines: Vec<String> = Vec::new();
    let mut per_match: Vec<(MatchId, Vec<String>)> = Vec::new();

    for event in events {
        if let MatchEvent::Scheduled {
            home,
            away,
            kickoff,
            venue,
            ..
        } = event
        {
            let mut line = format!("{}: {} vs {}", format_kickoff(*kickoff), home, away);
            if let Some(venue) = venue {
                line.push_str(&format!(" @ {venue}"));
            }
            schedule_lines.push(line);
            continue;
        }

        let id = event.match_id();
        let line = render_line(event);
        match per_match.iter_mut().find(|(i, _)| i == id) {
            Some((_, lines)) => lines.push(line),
            None => per_match.push((id.clone(), vec![line])),
        }
    }

    let mut messages = Vec::new();
    if !schedule_lines.is_empty() {
        messages.push(format!("Today's matches:\n{}", schedule_lines.join("\n")));
    }
    messages.extend(per_match.into_iter().map(|(_, lines)| lines.join("\n")));
    messages
}

/// Apply a sink's participant-name decorations to a rendered message.
///
/// Every occurrence of a decorated name gains its label: with
/// `"Sweden" => "Anna"`, `Sweden 1 - 0 England` becomes
/// `Sweden (Anna) 1 - 0 England`.
pub fn decorate(text: &str, decorations: &BTreeMap<String, String>) -> String {
    let mut out = text.to_string();
    for (name, label) in decorations {
        if name.is_empty() {
            continue;
        }
        out = out.replace(name, &format!("{name} ({label})"));
    }
    out
}

fn render_line(event: &MatchEvent) -> String {
    match event {
        MatchEvent::Scheduled { .. } => String::new(),
        MatchEvent::Started { home, away, .. } => {
            format!("{home} vs {away} just started!")
        }
        MatchEvent::HalfTime {
            home,
            away,
            home_goals,
            away_goals,
            ..
        } => format!("Half-time: {home} {home_goals} - {away_goals} {away}"),
        MatchEvent::RedCard { team, player, .. } => match player {
            Some(player) => format!("{team}: {player} just received a red card"),
            None => format!("{team} just received a red card!"),
        },
        MatchEvent::YellowCard { team, player, .. } => {
            format!("{team}: {player} just received a yellow card")
        }
        MatchEvent::Goal {
            home,
            away,
            home_goals,
            away_goals,
            kind,
            scorer,
            ..
        } => {
            let score = format!("{home} {home_goals} - {away_goals} {away}");
            match (kind, scorer) {
                (GoalKind::OwnGoal, Some(s)) => {
                    format!("Oh no, {} put one in their own net ({})! {score}", s.name, s.team)
                }
                (GoalKind::Penalty, Some(s)) => {
                    format!("{} converts a penalty for {}! {score}", s.name, s.team)
                }
                (_, Some(s)) => format!("GOAL! {} scores for {}! {score}", s.name, s.team),
                (_, None) => format!("GOAL! {score}"),
            }
        }
        MatchEvent::ScoreCorrection {
            home,
            away,
            home_goals,
            away_goals,
            ..
        } => format!("Score update: {home} {home_goals} - {away_goals} {away}"),
        MatchEvent::Ended {
            home,
            away,
            home_goals,
            away_goals,
            confirmed,
            ..
        } => {
            let prefix = if *confirmed {
                "Match ended!"
            } else {
                "Match (probably) ended!"
            };
            format!("{prefix} Final score: {home} {home_goals} - {away_goals} {away}")
        }
    }
}

fn format_kickoff(kickoff: Option<OffsetDateTime>) -> String {
    let format = format_description!("[hour]:[minute]");
    kickoff
        .and_then(|t| t.format(&format).ok())
        .unwrap_or_else(|| "--:--".to_string())
}
