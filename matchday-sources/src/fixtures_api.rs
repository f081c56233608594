//! Fixtures-API adapter.
//!
//! Targets competition-fixtures APIs (football-data shape): one endpoint
//! listing every fixture of the competition with kickoff timestamps and a
//! result block, filtered down to today's date client-side. No structured
//! incident feed; goal detection relies entirely on the engine's
//! score-diff heuristic, which is why this source kind pairs with the more
//! generous completion ceiling.

use crate::FETCH_CONCURRENCY;
use async_trait::async_trait;
use matchday_core::fixture::{LifecycleSignal, MatchId, MatchSnapshot};
use matchday_core::source::{SnapshotSource, SourceError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tokio::sync::Semaphore;
use tracing::warn;
use url::Url;

pub struct FixturesSource {
    fixtures_url: Url,
    auth_token: Option<String>,
    /// Display offset for kickoff times; the API reports UTC.
    hours_to_add: i64,
    http: reqwest::Client,
    gate: Arc<Semaphore>,
}

impl FixturesSource {
    pub fn new(fixtures_url: Url, auth_token: Option<String>, hours_to_add: i64) -> Self {
        Self {
            fixtures_url,
            auth_token,
            hours_to_add,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            gate: Arc::new(Semaphore::new(FETCH_CONCURRENCY)),
        }
    }
}

#[async_trait]
impl SnapshotSource for FixturesSource {
    async fn fetch_today(&self) -> Result<Vec<MatchSnapshot>, SourceError> {
        let _permit = self.gate.acquire().await.ok();
        let mut request = self.http.get(self.fixtures_url.clone());
        if let Some(token) = &self.auth_token {
            request = request.header("X-Auth-Token", token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body: FixturesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        Ok(convert_fixtures(
            &body.fixtures,
            OffsetDateTime::now_utc().date(),
            self.hours_to_add,
        ))
    }

    fn name(&self) -> &'static str {
        "fixtures"
    }
}

// -- Response shape ------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    fixtures: Vec<ApiFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFixture {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    home_team_name: String,
    #[serde(default)]
    away_team_name: String,
    #[serde(default)]
    result: Option<ApiResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResult {
    #[serde(default)]
    goals_home_team: serde_json::Value,
    #[serde(default)]
    goals_away_team: serde_json::Value,
}

// -- Conversion ----------------------------------------------------------

fn convert_fixtures(fixtures: &[ApiFixture], today: Date, hours_to_add: i64) -> Vec<MatchSnapshot> {
    let mut snapshots = Vec::new();
    for fixture in fixtures {
        let Some(kickoff) = fixture
            .date
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        else {
            warn!(
                home = %fixture.home_team_name,
                away = %fixture.away_team_name,
                "skipping fixture without a parseable kickoff"
            );
            continue;
        };
        // The competition listing spans the whole tournament.
        if kickoff.date() != today {
            continue;
        }
        match convert(fixture, kickoff, hours_to_add) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(reason) => warn!(
                home = %fixture.home_team_name,
                away = %fixture.away_team_name,
                %reason,
                "skipping fixture with malformed fields"
            ),
        }
    }
    snapshots
}

fn convert(
    fixture: &ApiFixture,
    kickoff: OffsetDateTime,
    hours_to_add: i64,
) -> Result<MatchSnapshot, String> {
    let home = fixture.home_team_name.trim();
    let away = fixture.away_team_name.trim();
    if home.is_empty() || away.is_empty() {
        return Err("missing side identifier".into());
    }

    let (home_goals, away_goals) = match &fixture.result {
        Some(result) => (
            parse_goals(&result.goals_home_team).ok_or("unparseable home goal count")?,
            parse_goals(&result.goals_away_team).ok_or("unparseable away goal count")?,
        ),
        None => (0, 0),
    };

    Ok(MatchSnapshot {
        match_id: MatchId::derive(home, away),
        home_side: home.to_string(),
        away_side: away.to_string(),
        home_goals,
        away_goals,
        lifecycle: classify_status(&fixture.status),
        markers: Vec::new(),
        red_card_flags: None,
        kickoff: Some(kickoff + time::Duration::hours(hours_to_add)),
        venue: None,
    })
}

fn parse_goals(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Null => Some(0),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn classify_status(status: &str) -> LifecycleSignal {
    match status.trim().to_ascii_uppercase().as_str() {
        "IN_PLAY" => LifecycleSignal::Live,
        "PAUSED" => LifecycleSignal::HalfTime,
        "FINISHED" => LifecycleSignal::Ended,
        "TIMED" | "SCHEDULED" => LifecycleSignal::NotStarted,
        _ => LifecycleSignal::Unknown,
    }
}
