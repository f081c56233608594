//! Livescore-API adapter.
//!
//! Targets APIs shaped like the worldcup livescore feed: one "today"
//! endpoint returning every fixture with per-side goal counts and a
//! structured incident list per team. This is the richest source kind:
//! incidents carry stable ids, so the engine can prefer them over the
//! score-diff heuristic.

use crate::FETCH_CONCURRENCY;
use async_trait::async_trait;
use matchday_core::fixture::{
    EventMarker, LifecycleSignal, MarkerKind, MatchId, MatchSnapshot, TeamSide,
};
use matchday_core::source::{SnapshotSource, SourceError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

pub struct LivescoreSource {
    today_url: Url,
    http: reqwest::Client,
    gate: Arc<Semaphore>,
}

impl LivescoreSource {
    /// `today_url` is the full "today's matches" endpoint.
    pub fn new(today_url: Url) -> Self {
        Self {
            today_url,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            gate: Arc::new(Semaphore::new(FETCH_CONCURRENCY)),
        }
    }
}

#[async_trait]
impl SnapshotSource for LivescoreSource {
    async fn fetch_today(&self) -> Result<Vec<MatchSnapshot>, SourceError> {
        // The gate is never closed; a failed acquire cannot happen.
        let _permit = self.gate.acquire().await.ok();
        let response = self.http.get(self.today_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let matches: Vec<ApiMatch> = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        Ok(convert_matches(&matches))
    }

    fn name(&self) -> &'static str {
        "livescore"
    }
}

// -- Response shape ------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiMatch {
    home_team: ApiTeam,
    away_team: ApiTeam,
    #[serde(default)]
    status: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    home_team_events: Vec<ApiIncident>,
    #[serde(default)]
    away_team_events: Vec<ApiIncident>,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    #[serde(default)]
    country: String,
    #[serde(default)]
    code: String,
    /// Number in the happy case, but the feed has been seen emitting
    /// strings and nulls around kickoff.
    #[serde(default)]
    goals: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiIncident {
    id: i64,
    #[serde(default)]
    type_of_event: String,
    #[serde(default)]
    player: String,
}

// -- Conversion ----------------------------------------------------------

fn convert_matches(matches: &[ApiMatch]) -> Vec<MatchSnapshot> {
    let mut snapshots = Vec::with_capacity(matches.len());
    for m in matches {
        match convert(m) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(reason) => warn!(
                home = %m.home_team.country,
                away = %m.away_team.country,
                %reason,
                "skipping fixture with malformed fields"
            ),
        }
    }
    snapshots
}

fn convert(m: &ApiMatch) -> Result<MatchSnapshot, String> {
    let home_key = side_key(&m.home_team).ok_or("missing home side identifier")?;
    let away_key = side_key(&m.away_team).ok_or("missing away side identifier")?;
    let home_goals = parse_goals(&m.home_team.goals).ok_or("unparseable home goal count")?;
    let away_goals = parse_goals(&m.away_team.goals).ok_or("unparseable away goal count")?;

    let mut markers = Vec::new();
    collect_incidents(&m.home_team_events, TeamSide::Home, &mut markers);
    collect_incidents(&m.away_team_events, TeamSide::Away, &mut markers);

    Ok(MatchSnapshot {
        match_id: MatchId::derive(home_key, away_key),
        home_side: m.home_team.country.clone(),
        away_side: m.away_team.country.clone(),
        home_goals,
        away_goals,
        lifecycle: classify_status(&m.status, m.time.as_deref(), m.winner.is_some()),
        markers,
        red_card_flags: None,
        kickoff: m
            .datetime
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok()),
        venue: venue_text(m.location.as_deref(), m.venue.as_deref()),
    })
}

fn side_key(team: &ApiTeam) -> Option<&str> {
    if !team.code.trim().is_empty() {
        Some(&team.code)
    } else if !team.country.trim().is_empty() {
        Some(&team.country)
    } else {
        None
    }
}

/// Accepts the goal count however the feed spells it this cycle.
/// `null` means pre-kickoff; anything that is not a non-negative integer
/// marks the fixture malformed.
fn parse_goals(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Null => Some(0),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn classify_status(status: &str, time_field: Option<&str>, has_winner: bool) -> LifecycleSignal {
    let status = status.trim().to_ascii_lowercase();
    if status == "completed" || has_winner {
        return LifecycleSignal::Ended;
    }
    if status == "in progress" {
        if matches!(time_field, Some(t) if t.eq_ignore_ascii_case("half-time")) {
            return LifecycleSignal::HalfTime;
        }
        return LifecycleSignal::Live;
    }
    match status.as_str() {
        "future" | "pending" | "pre-match" => LifecycleSignal::NotStarted,
        _ => LifecycleSignal::Unknown,
    }
}

fn collect_incidents(incidents: &[ApiIncident], side: TeamSide, out: &mut Vec<EventMarker>) {
    for incident in incidents {
        let Some(kind) = marker_kind(&incident.type_of_event) else {
            debug!(
                id = incident.id,
                kind = %incident.type_of_event,
                "ignoring incident of unknown kind"
            );
            continue;
        };
        out.push(EventMarker {
            id: incident.id,
            kind,
            player: incident.player.clone(),
            side,
        });
    }
}

fn marker_kind(type_of_event: &str) -> Option<MarkerKind> {
    match type_of_event {
        "goal" => Some(MarkerKind::Goal),
        "goal-own" => Some(MarkerKind::OwnGoal),
        "goal-penalty" => Some(MarkerKind::PenaltyGoal),
        "yellow-card" => Some(MarkerKind::YellowCard),
        "red-card" => Some(MarkerKind::RedCard),
        _ => None,
    }
}

fn venue_text(location: Option<&str>, venue: Option<&str>) -> Option<String> {
    match (location, venue) {
        (Some(l), Some(v)) => Some(format!("{l}, {v}")),
        (Some(l), None) => Some(l.to_string()),
        (None, Some(v)) => Some(v.to_string()),
        (None, None) => None,
    }
}
