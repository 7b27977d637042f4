//! ESPN soccer scoreboards, one query per (league, date).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::{LeagueConfig, SourceConfig};
use crate::data::http::HttpFetcher;
use crate::data::{collect_events, date_vars, espn, render_url, Provider, RawPayload, StatusTable};
use crate::error::{FetchError, NormalizeError};
use crate::events::CanonicalEvent;

const STATUS: StatusTable = StatusTable {
    completed: &[
        "STATUS_FINAL",
        "STATUS_FULL_TIME",
        "STATUS_FINAL_AET",
        "STATUS_FINAL_PEN",
    ],
    in_progress: &[
        "STATUS_IN_PROGRESS",
        "STATUS_FIRST_HALF",
        "STATUS_SECOND_HALF",
        "STATUS_HALFTIME",
        "STATUS_EXTRA_TIME",
        "STATUS_SHOOTOUT",
    ],
    scheduled: &["STATUS_SCHEDULED", "STATUS_POSTPONED", "STATUS_CANCELED"],
};

pub struct EspnSoccerSource {
    name: String,
    scoreboard_url: String,
    leagues: Vec<LeagueConfig>,
    headers: HeaderMap,
    fetcher: Arc<HttpFetcher>,
}

impl EspnSoccerSource {
    pub fn new(
        config: &SourceConfig,
        leagues: Vec<LeagueConfig>,
        headers: HeaderMap,
        fetcher: Arc<HttpFetcher>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            scoreboard_url: config.scoreboard_url.clone(),
            leagues,
            headers,
            fetcher,
        }
    }

    fn read_event(&self, league: &str, event: &Value) -> Result<CanonicalEvent, NormalizeError> {
        if !event.is_object() {
            return Err(NormalizeError::NotAnObject);
        }
        let (home, away) = espn::sides(event)?;

        Ok(CanonicalEvent {
            source: self.name.clone(),
            event_id: espn::EVENT_ID.text(event),
            league: league.to_string(),
            home: espn::participant(home),
            away: espn::participant(away),
            status: espn::status(event, &STATUS),
            leaders: Vec::new(),
        })
    }
}

#[async_trait]
impl Provider for EspnSoccerSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// One scoreboard per league. A league that fails is skipped; the date
    /// only fails when every league does.
    #[instrument(skip(self), fields(source = %self.name))]
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawPayload>, FetchError> {
        let [day, day_iso] = date_vars(date);
        let mut payloads = Vec::new();
        let mut last_error = None;

        for league in &self.leagues {
            let url = render_url(
                &self.scoreboard_url,
                &[
                    ("league", league.id.as_str()),
                    (day.0, day.1.as_str()),
                    (day_iso.0, day_iso.1.as_str()),
                ],
            );

            match self.fetcher.get_json(&url, &self.headers).await {
                Ok(body) => {
                    let count = espn::EVENTS.array(&body).len();
                    info!(league = %league.name, date = %date, events = count, "Scoreboard fetched");
                    let mut payload = RawPayload::new(&self.name, date, body);
                    payload.league = Some(league.name.clone());
                    payloads.push(payload);
                }
                Err(e) => {
                    warn!(league = %league.name, date = %date, error = %e, "League scoreboard failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if payloads.is_empty() => Err(FetchError::AllQueriesFailed {
                source_name: self.name.clone(),
                last: e.to_string(),
            }),
            _ => Ok(payloads),
        }
    }

    fn normalize(&self, raw: &RawPayload) -> Vec<CanonicalEvent> {
        let league = raw
            .league
            .clone()
            .or_else(|| espn::LEAGUE_NAME.text(&raw.body))
            .unwrap_or_default();

        collect_events(&self.name, espn::EVENTS.array(&raw.body), |event| {
            self.read_event(&league, event)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::events::EventStatus;
    use serde_json::json;

    fn source() -> EspnSoccerSource {
        let config = AppConfig::builtin().unwrap();
        let cfg = config.sources.iter().find(|s| s.name == "espn_soccer").unwrap();
        EspnSoccerSource::new(
            cfg,
            config.football.leagues.clone(),
            HeaderMap::new(),
            Arc::new(HttpFetcher::new(&config.http).unwrap()),
        )
    }

    fn payload(body: Value) -> RawPayload {
        let mut raw = RawPayload::new("espn_soccer", NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(), body);
        raw.league = Some("English Premier League".to_string());
        raw
    }

    #[test]
    fn test_normalizes_finished_match() {
        let body = json!({"events": [{
            "id": "740001",
            "name": "Chelsea at Arsenal",
            "status": {"type": {"name": "STATUS_FULL_TIME", "state": "post"}},
            "competitions": [{"competitors": [
                {"homeAway": "home", "score": "2", "team": {"displayName": "Arsenal", "abbreviation": "ARS"}},
                {"homeAway": "away", "score": "1", "team": {"displayName": "Chelsea", "abbreviation": "CHE"}}
            ]}]
        }]});
        let events = source().normalize(&payload(body));
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.status, EventStatus::Completed);
        assert_eq!(ev.league, "English Premier League");
        assert_eq!(ev.matchup_label(), "CHE 1 - 2 ARS");
        assert!(ev.leaders.is_empty());
    }

    #[test]
    fn test_bad_event_does_not_sink_batch() {
        let body = json!({"events": [
            "garbage",
            {"competitions": [{"competitors": []}]},
            {"status": {"type": {"name": "STATUS_SCHEDULED"}},
             "competitions": [{"competitors": [
                {"score": {"value": 0}, "team": {"displayName": "Real Madrid"}},
                {"team": {"displayName": "Sevilla"}}
             ]}]}
        ]});
        let events = source().normalize(&payload(body));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, EventStatus::Scheduled);
        assert_eq!(events[0].away.score, 0);
    }

    #[test]
    fn test_missing_events_key_is_empty() {
        assert!(source().normalize(&payload(json!({"leagues": []}))).is_empty());
    }
}
