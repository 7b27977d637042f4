//! stats.nba.com scoreboard and traditional box scores.
//!
//! Responses are column-oriented result sets (`headers` plus `rowSet`), so
//! every field is located by header name rather than by key path.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::SourceConfig;
use crate::data::http::HttpFetcher;
use crate::data::{collect_events, date_vars, render_url, Provider, RawPayload, StatusTable};
use crate::error::{FetchError, NormalizeError};
use crate::events::fields::{coerce_int, coerce_text, lookup, Field};
use crate::events::leaders::POINTS;
use crate::events::{CanonicalEvent, EventStatus, LeaderOrigin, Participant, StatLeader};

const STATUS: StatusTable = StatusTable {
    completed: &["3"],
    in_progress: &["2"],
    scheduled: &["1"],
};

const LEAGUE: &str = "NBA";

const RESULT_SETS: Field = Field::new(&["resultSets", "resultSet"]);

const GAME_HEADER: &str = "GameHeader";
const LINE_SCORE: &str = "LineScore";
const TEAM_LEADERS: &str = "TeamLeaders";
const PLAYER_STATS: &str = "PlayerStats";

/// One named result set: header labels and the rows under them.
struct ResultTable<'a> {
    headers: Vec<String>,
    rows: &'a [Value],
}

impl<'a> ResultTable<'a> {
    fn find(body: &'a Value, name: &str) -> Option<Self> {
        let sets: Vec<&Value> = match RESULT_SETS.get(body) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            _ => Vec::new(),
        };

        let set = sets.into_iter().find(|s| {
            lookup(s, "name").and_then(coerce_text).is_some_and(|n| n.eq_ignore_ascii_case(name))
        })?;

        let headers: Vec<String> = lookup(set, "headers")
            .and_then(Value::as_array)
            .map(|hs| hs.iter().map(|h| coerce_text(h).unwrap_or_default()).collect())
            .unwrap_or_default();
        let rows = lookup(set, "rowSet")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        Some(Self { headers, rows })
    }

    fn col(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Cell under the first of `names` present in the headers. Null is absent.
    fn cell<'r>(&self, row: &'r Value, names: &[&str]) -> Option<&'r Value> {
        let col = names.iter().find_map(|n| self.col(n))?;
        row.get(col).filter(|v| !v.is_null())
    }

    fn text(&self, row: &Value, names: &[&str]) -> Option<String> {
        self.cell(row, names).and_then(coerce_text)
    }

    fn rows_for_game<'s>(&'s self, game_id: &'s str) -> impl Iterator<Item = &'a Value> + 's {
        self.rows
            .iter()
            .filter(move |row| self.text(row, &["GAME_ID"]).as_deref() == Some(game_id))
    }
}

pub struct NbaStatsSource {
    name: String,
    scoreboard_url: String,
    detail_url: Option<String>,
    headers: HeaderMap,
    fetcher: Arc<HttpFetcher>,
}

impl NbaStatsSource {
    pub fn new(config: &SourceConfig, headers: HeaderMap, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            name: config.name.clone(),
            scoreboard_url: config.scoreboard_url.clone(),
            detail_url: config.detail_url.clone(),
            headers,
            fetcher,
        }
    }

    fn read_game(
        &self,
        raw: &RawPayload,
        games: &ResultTable<'_>,
        game: &Value,
    ) -> Result<CanonicalEvent, NormalizeError> {
        if !game.is_array() {
            return Err(NormalizeError::NotAnObject);
        }
        let game_id = games.text(game, &["GAME_ID"]).unwrap_or_default();
        let status = game_status(games, game);

        let lines = ResultTable::find(&raw.body, LINE_SCORE)
            .ok_or(NormalizeError::MissingResultSet(LINE_SCORE))?;
        let side = |team_col: &str| {
            let team_id = games.text(game, &[team_col])?;
            lines
                .rows_for_game(&game_id)
                .find(|row| lines.text(row, &["TEAM_ID"]).as_deref() == Some(team_id.as_str()))
                .map(|row| line_participant(&lines, row))
        };

        let (home, away) = match (side("HOME_TEAM_ID"), side("VISITOR_TEAM_ID")) {
            (Some(home), Some(away)) => (home, away),
            (h, a) => {
                return Err(NormalizeError::Participants {
                    found: h.is_some() as usize + a.is_some() as usize,
                })
            }
        };

        let mut leaders = Vec::new();
        if status.has_started() {
            if let Some(team_leaders) = ResultTable::find(&raw.body, TEAM_LEADERS) {
                leaders.extend(team_leaders.rows_for_game(&game_id).filter_map(|row| {
                    Some(StatLeader {
                        participant: team_leaders.text(row, &["PTS_PLAYER_NAME"])?,
                        team: team_leaders
                            .text(row, &["TEAM_ABBREVIATION", "TEAM_NICKNAME"])
                            .unwrap_or_default(),
                        stat: POINTS.name.to_string(),
                        value: team_leaders.cell(row, &["PTS"]).map(coerce_int).unwrap_or(0),
                        origin: LeaderOrigin::Shortcut,
                    })
                }));
            }
            if let Some(box_score) = raw.details.get(&game_id) {
                leaders.extend(player_stats(box_score));
            }
        }

        Ok(CanonicalEvent {
            source: self.name.clone(),
            event_id: (!game_id.is_empty()).then_some(game_id),
            league: LEAGUE.to_string(),
            home,
            away,
            status,
            leaders,
        })
    }
}

fn game_status(games: &ResultTable<'_>, game: &Value) -> EventStatus {
    games
        .text(game, &["GAME_STATUS_ID"])
        .and_then(|t| STATUS.resolve(&t))
        .unwrap_or(EventStatus::Scheduled)
}

fn line_participant(lines: &ResultTable<'_>, row: &Value) -> Participant {
    let city = lines.text(row, &["TEAM_CITY_NAME", "TEAM_CITY"]);
    let nickname = lines.text(row, &["TEAM_NAME", "TEAM_NICKNAME"]);
    let name = match (city, nickname) {
        (Some(c), Some(n)) => format!("{c} {n}"),
        (c, n) => c.or(n).unwrap_or_default(),
    };
    Participant {
        name,
        abbreviation: lines.text(row, &["TEAM_ABBREVIATION"]).unwrap_or_default(),
        score: lines.cell(row, &["PTS"]).map(coerce_int).unwrap_or(0),
    }
}

/// Points per player from a traditional box score's `PlayerStats` set.
fn player_stats(box_score: &Value) -> Vec<StatLeader> {
    let Some(table) = ResultTable::find(box_score, PLAYER_STATS) else {
        return Vec::new();
    };
    let Some(col) = POINTS.find_column(table.headers.iter().map(String::as_str)) else {
        return Vec::new();
    };
    let points_header = table.headers[col].clone();

    table
        .rows
        .iter()
        .filter_map(|row| {
            Some(StatLeader {
                participant: table.text(row, &["PLAYER_NAME"])?,
                team: table.text(row, &["TEAM_ABBREVIATION"]).unwrap_or_default(),
                stat: POINTS.name.to_string(),
                // No cell means the player did not play.
                value: coerce_int(table.cell(row, &[points_header.as_str()])?),
                origin: LeaderOrigin::BoxScore,
            })
        })
        .collect()
}

#[async_trait]
impl Provider for NbaStatsSource {
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

        let started: Vec<String> = match ResultTable::find(&payload.body, GAME_HEADER) {
            Some(games) => games
                .rows
                .iter()
                .filter(|g| game_status(&games, g).has_started())
                .filter_map(|g| games.text(g, &["GAME_ID"]))
                .collect(),
            None => Vec::new(),
        };
        info!(date = %date, started = started.len(), "Scoreboard fetched");

        if let Some(template) = &self.detail_url {
            for id in started {
                let url = render_url(template, &[("event", id.as_str())]);
                match self.fetcher.get_json(&url, &self.headers).await {
                    Ok(box_score) => {
                        payload.details.insert(id, box_score);
                    }
                    Err(e) => {
                        warn!(event_id = %id, error = %e, "Box score unavailable, using team leaders");
                    }
                }
            }
        }

        Ok(vec![payload])
    }

    fn normalize(&self, raw: &RawPayload) -> Vec<CanonicalEvent> {
        let Some(games) = ResultTable::find(&raw.body, GAME_HEADER) else {
            warn!(
                source = %self.name,
                error = %NormalizeError::MissingResultSet(GAME_HEADER),
                "Scoreboard has no games table"
            );
            return Vec::new();
        };

        collect_events(&self.name, games.rows, |game| self.read_game(raw, &games, game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    fn source() -> NbaStatsSource {
        let config = AppConfig::builtin().unwrap();
        let cfg = config.sources.iter().find(|s| s.name == "nba_stats").unwrap();
        NbaStatsSource::new(
            cfg,
            HeaderMap::new(),
            Arc::new(HttpFetcher::new(&config.http).unwrap()),
        )
    }

    fn scoreboard() -> Value {
        json!({"resultSets": [
            {"name": "GameHeader",
             "headers": ["GAME_DATE_EST", "GAME_ID", "GAME_STATUS_ID", "GAME_STATUS_TEXT", "HOME_TEAM_ID", "VISITOR_TEAM_ID"],
             "rowSet": [
                ["2026-01-04T00:00:00", "0022500500", 3, "Final", 1610612738, 1610612752],
                ["2026-01-04T00:00:00", "0022500501", 1, "7:30 pm ET", 1610612747, 1610612744]
             ]},
            {"name": "LineScore",
             "headers": ["GAME_ID", "TEAM_ID", "TEAM_ABBREVIATION", "TEAM_CITY_NAME", "TEAM_NAME", "PTS"],
             "rowSet": [
                ["0022500500", 1610612738, "BOS", "Boston", "Celtics", 131],
                ["0022500500", 1610612752, "NYK", "New York", "Knicks", "120"],
                ["0022500501", 1610612747, "LAL", "Los Angeles", "Lakers", null],
                ["0022500501", 1610612744, "GSW", "Golden State", "Warriors", null]
             ]},
            {"name": "TeamLeaders",
             "headers": ["GAME_ID", "TEAM_ID", "TEAM_ABBREVIATION", "PTS_PLAYER_ID", "PTS_PLAYER_NAME", "PTS"],
             "rowSet": [
                ["0022500500", 1610612738, "BOS", 1627759, "Jaylen Brown", "50"],
                ["0022500500", 1610612752, "NYK", 1628973, "Jalen Brunson", 33]
             ]}
        ]})
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()
    }

    #[test]
    fn test_scoreboard_normalizes_games() {
        let raw = RawPayload::new("nba_stats", date(), scoreboard());
        let events = source().normalize(&raw);
        assert_eq!(events.len(), 2);

        let final_game = &events[0];
        assert_eq!(final_game.status, EventStatus::Completed);
        assert_eq!(final_game.home.name, "Boston Celtics");
        assert_eq!(final_game.away.score, 120);
        assert_eq!(final_game.matchup_label(), "NYK 120 - 131 BOS");
        let pts: Vec<_> = final_game.leaders.iter().map(|l| (l.participant.as_str(), l.value)).collect();
        assert_eq!(pts, vec![("Jaylen Brown", 50), ("Jalen Brunson", 33)]);

        let upcoming = &events[1];
        assert_eq!(upcoming.status, EventStatus::Scheduled);
        assert_eq!(upcoming.home.score, 0);
        assert!(upcoming.leaders.is_empty());
    }

    #[test]
    fn test_player_stats_by_header() {
        let mut raw = RawPayload::new("nba_stats", date(), scoreboard());
        raw.details.insert(
            "0022500500".to_string(),
            json!({"resultSets": [{
                "name": "PlayerStats",
                "headers": ["GAME_ID", "TEAM_ABBREVIATION", "PLAYER_NAME", "MIN", "PTS", "PLUS_MINUS"],
                "rowSet": [
                    ["0022500500", "BOS", "Jaylen Brown", "44:10", 52, 11],
                    ["0022500500", "BOS", "Bench Guy", null, null, null]
                ]
            }]}),
        );
        let ev = &source().normalize(&raw)[0];
        let boxed: Vec<_> = ev
            .leaders
            .iter()
            .filter(|l| l.origin == LeaderOrigin::BoxScore)
            .map(|l| (l.participant.as_str(), l.value))
            .collect();
        assert_eq!(boxed, vec![("Jaylen Brown", 52)]);
    }

    #[test]
    fn test_missing_game_header_yields_nothing() {
        let raw = RawPayload::new("nba_stats", date(), json!({"resultSets": []}));
        assert!(source().normalize(&raw).is_empty());
    }

    #[test]
    fn test_game_without_line_score_is_skipped() {
        let mut body = scoreboard();
        body["resultSets"][1]["rowSet"] = json!([
            ["0022500501", 1610612747, "LAL", "Los Angeles", "Lakers", null],
            ["0022500501", 1610612744, "GSW", "Golden State", "Warriors", null]
        ]);
        let raw = RawPayload::new("nba_stats", date(), body);
        let events = source().normalize(&raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].home.abbreviation, "LAL");
    }
}
