//! ESPN NBA scoreboard plus per-game box scores.
//!
//! Leaders come from two places: each competitor's `leaders` shortcut on the
//! scoreboard, and the full per-player `boxscore` tables on the game summary.
//! Summaries are fetched only for games that have started.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::SourceConfig;
use crate::data::http::HttpFetcher;
use crate::data::{collect_events, date_vars, espn, render_url, Provider, RawPayload, StatusTable};
use crate::error::{FetchError, NormalizeError};
use crate::events::fields::{coerce_int, coerce_text, Field};
use crate::events::leaders::POINTS;
use crate::events::{CanonicalEvent, LeaderOrigin, Participant, StatLeader};

const STATUS: StatusTable = StatusTable {
    completed: &["STATUS_FINAL"],
    in_progress: &["STATUS_IN_PROGRESS", "STATUS_HALFTIME", "STATUS_END_PERIOD"],
    scheduled: &["STATUS_SCHEDULED", "STATUS_POSTPONED"],
};

const LEAGUE: &str = "NBA";

// Scoreboard leaders shortcut, per competitor.
const LEADER_CATEGORIES: Field = Field::new(&["leaders"]);
const CATEGORY_NAME: Field = Field::new(&["name", "abbreviation", "displayName"]);
const CATEGORY_LEADERS: Field = Field::new(&["leaders"]);
const LEADER_ATHLETE: Field = Field::new(&[
    "athlete.displayName",
    "athlete.fullName",
    "athlete.shortName",
]);
const LEADER_VALUE: Field = Field::new(&["value", "displayValue"]);

// Summary box score.
const BOX_TEAMS: Field = Field::new(&["boxscore.players"]);
const BOX_TEAM: Field = Field::new(&["team.abbreviation", "team.displayName"]);
const BOX_STATISTICS: Field = Field::new(&["statistics"]);
const BOX_LABELS: Field = Field::new(&["labels", "names", "keys"]);
const BOX_ATHLETES: Field = Field::new(&["athletes"]);
const BOX_ATHLETE_NAME: Field = Field::new(&["athlete.displayName", "athlete.shortName"]);
const BOX_STATS: Field = Field::new(&["stats"]);

pub struct EspnNbaSource {
    name: String,
    scoreboard_url: String,
    detail_url: Option<String>,
    headers: HeaderMap,
    fetcher: Arc<HttpFetcher>,
}

impl EspnNbaSource {
    pub fn new(config: &SourceConfig, headers: HeaderMap, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            name: config.name.clone(),
            scoreboard_url: config.scoreboard_url.clone(),
            detail_url: config.detail_url.clone(),
            headers,
            fetcher,
        }
    }

    fn read_event(&self, raw: &RawPayload, event: &Value) -> Result<CanonicalEvent, NormalizeError> {
        if !event.is_object() {
            return Err(NormalizeError::NotAnObject);
        }
        let (home_raw, away_raw) = espn::sides(event)?;
        let home = espn::participant(home_raw);
        let away = espn::participant(away_raw);
        let status = espn::status(event, &STATUS);
        let event_id = espn::EVENT_ID.text(event);

        let mut leaders = Vec::new();
        if status.has_started() {
            leaders.extend(shortcut_leaders(home_raw, &home));
            leaders.extend(shortcut_leaders(away_raw, &away));
            if let Some(summary) = event_id.as_ref().and_then(|id| raw.details.get(id)) {
                leaders.extend(box_score_leaders(summary));
            }
        }

        Ok(CanonicalEvent {
            source: self.name.clone(),
            event_id,
            league: LEAGUE.to_string(),
            home,
            away,
            status,
            leaders,
        })
    }
}

/// Points leaders from a scoreboard competitor's `leaders` categories.
fn shortcut_leaders(competitor: &Value, side: &Participant) -> Vec<StatLeader> {
    let categories = LEADER_CATEGORIES.array(competitor);
    let names: Vec<String> = categories
        .iter()
        .map(|c| CATEGORY_NAME.text(c).unwrap_or_default())
        .collect();

    let Some(index) = POINTS.find_column(names.iter().map(String::as_str)) else {
        return Vec::new();
    };

    let team = side.short_name();
    CATEGORY_LEADERS
        .array(&categories[index])
        .iter()
        .filter_map(|leader| {
            Some(StatLeader {
                participant: LEADER_ATHLETE.text(leader)?,
                team: team.clone(),
                stat: POINTS.name.to_string(),
                value: LEADER_VALUE.int(leader).unwrap_or(0),
                origin: LeaderOrigin::Shortcut,
            })
        })
        .collect()
}

/// Points for every player listed in a game summary's box score.
fn box_score_leaders(summary: &Value) -> Vec<StatLeader> {
    let mut leaders = Vec::new();

    for team_block in BOX_TEAMS.array(summary) {
        let team = BOX_TEAM.text(team_block).unwrap_or_default();

        for table in BOX_STATISTICS.array(team_block) {
            let labels: Vec<String> = BOX_LABELS
                .array(table)
                .iter()
                .map(|l| coerce_text(l).unwrap_or_default())
                .collect();
            let Some(col) = POINTS.find_column(labels.iter().map(String::as_str)) else {
                debug!(team = %team, "Box score table has no points column");
                continue;
            };

            for athlete in BOX_ATHLETES.array(table) {
                let stats = BOX_STATS.array(athlete);
                // Players who did not play carry an empty stat line.
                let (Some(name), Some(cell)) = (BOX_ATHLETE_NAME.text(athlete), stats.get(col))
                else {
                    continue;
                };
                leaders.push(StatLeader {
                    participant: name,
                    team: team.clone(),
                    stat: POINTS.name.to_string(),
                    value: coerce_int(cell),
                    origin: LeaderOrigin::BoxScore,
                });
            }
        }
    }

    leaders
}

#[async_trait]
impl Provider for EspnNbaSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name))]
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawPayload>, FetchError> {
        let [day, day_iso] = date_vars(date);
        let url = render_url(
            &self.scoreboard_url,
            &[(day.0, day.1.as_str()), (day_iso.0, day_iso.1.as_str())],
        );
        let body = self.fetcher.get_json(&url, &self.headers).await?;
        let mut payload = RawPayload::new(&self.name, date, body);

        let started: Vec<String> = espn::EVENTS
            .array(&payload.body)
            .iter()
            .filter(|ev| espn::status(ev, &STATUS).has_started())
            .filter_map(|ev| espn::EVENT_ID.text(ev))
            .collect();

        info!(
            date = %date,
            events = espn::EVENTS.array(&payload.body).len(),
            started = started.len(),
            "Scoreboard fetched"
        );

        if let Some(template) = &self.detail_url {
            for id in started {
                let url = render_url(template, &[("event", id.as_str())]);
                match self.fetcher.get_json(&url, &self.headers).await {
                    Ok(summary) => {
                        payload.details.insert(id, summary);
                    }
                    Err(e) => {
                        warn!(event_id = %id, error = %e, "Box score unavailable, using scoreboard leaders");
                    }
                }
            }
        }

        Ok(vec![payload])
    }

    fn normalize(&self, raw: &RawPayload) -> Vec<CanonicalEvent> {
        collect_events(&self.name, espn::EVENTS.array(&raw.body), |event| {
            self.read_event(raw, event)
        })
    }
}
