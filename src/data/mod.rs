pub mod client;
pub mod espn;
pub mod espn_nba;
pub mod espn_soccer;
pub mod http;
pub mod nba_stats;
pub mod scope;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::warn;

use crate::config::{AppConfig, LeagueConfig, Secrets, SourceConfig, SourceShape, Sport};
use crate::error::{ConfigError, FetchError, NormalizeError};
use crate::events::{CanonicalEvent, EventStatus};

use self::espn_nba::EspnNbaSource;
use self::espn_soccer::EspnSoccerSource;
use self::http::HttpFetcher;
use self::nba_stats::NbaStatsSource;

/// One upstream JSON document for one query, plus any per-event detail
/// documents fetched alongside it (keyed by event id).
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source: String,
    pub date: NaiveDate,
    /// Competition label when the query was per league.
    pub league: Option<String>,
    pub body: Value,
    pub details: HashMap<String, Value>,
}

impl RawPayload {
    pub fn new(source: &str, date: NaiveDate, body: Value) -> Self {
        Self {
            source: source.to_string(),
            date,
            league: None,
            body,
            details: HashMap::new(),
        }
    }
}

/// One upstream sports-data API: how to query it and how to read what it returns.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, recorded as the source of every event it produces.
    fn name(&self) -> &str;

    /// Fetch every raw payload this provider serves for `date`.
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawPayload>, FetchError>;

    /// Convert one payload into canonical events. Never fails as a whole:
    /// events that cannot be read are logged and skipped.
    fn normalize(&self, raw: &RawPayload) -> Vec<CanonicalEvent>;
}

/// Per-source vocabulary for event status tokens.
#[derive(Debug, Clone, Copy)]
pub struct StatusTable {
    pub completed: &'static [&'static str],
    pub in_progress: &'static [&'static str],
    pub scheduled: &'static [&'static str],
}

impl StatusTable {
    pub fn resolve(&self, token: &str) -> Option<EventStatus> {
        let token = token.trim();
        let hit = |set: &[&str]| set.iter().any(|t| t.eq_ignore_ascii_case(token));
        if hit(self.completed) {
            Some(EventStatus::Completed)
        } else if hit(self.in_progress) {
            Some(EventStatus::InProgress)
        } else if hit(self.scheduled) {
            Some(EventStatus::Scheduled)
        } else {
            None
        }
    }
}

/// Fill `{name}` placeholders in a URL template.
pub fn render_url(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |url, (key, value)| {
        url.replace(&format!("{{{key}}}"), value)
    })
}

/// Template variables for a query date.
pub fn date_vars(date: NaiveDate) -> [(&'static str, String); 2] {
    [
        ("date", date.format("%Y%m%d").to_string()),
        ("date_iso", date.format("%Y-%m-%d").to_string()),
    ]
}

/// Headers specific to one source, including its API key when one is set.
/// Unusable header names or values are logged and dropped.
pub fn source_headers(config: &SourceConfig, api_key: Option<&SecretString>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let mut put = |name: &str, value: &str| {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(source = %config.name, header = name, "Skipping invalid header"),
        }
    };

    for (name, value) in &config.headers {
        put(name.as_str(), value.as_str());
    }
    if let (Some(header), Some(key)) = (&config.api_key_header, api_key) {
        put(header.as_str(), key.expose_secret());
    }

    headers
}

/// Run `read` over every item, keeping what normalizes and logging the rest.
pub fn collect_events<'a, I, F>(source: &str, items: I, mut read: F) -> Vec<CanonicalEvent>
where
    I: IntoIterator<Item = &'a Value>,
    F: FnMut(&'a Value) -> Result<CanonicalEvent, NormalizeError>,
{
    let mut events = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match read(item) {
            Ok(event) => events.push(event),
            Err(e) => warn!(source, index, error = %e, "Skipping event that failed to normalize"),
        }
    }
    events
}

/// Build the provider chain for `sport` in configured priority order.
/// `leagues` restricts football queries when non-empty.
pub fn build_providers(
    sport: Sport,
    config: &AppConfig,
    secrets: &Secrets,
    fetcher: Arc<HttpFetcher>,
    leagues: &[String],
) -> Result<Vec<Box<dyn Provider>>, ConfigError> {
    let league_set: Vec<LeagueConfig> = config
        .football
        .leagues
        .iter()
        .filter(|l| leagues.is_empty() || leagues.iter().any(|id| id == &l.id))
        .cloned()
        .collect();

    config
        .sources_for(sport)?
        .into_iter()
        .map(|source| {
            let headers = source_headers(source, secrets.api_keys.get(&source.name));
            let provider: Box<dyn Provider> = match source.shape {
                SourceShape::EspnSoccer => Box::new(EspnSoccerSource::new(
                    source,
                    league_set.clone(),
                    headers,
                    fetcher.clone(),
                )),
                SourceShape::EspnNba => {
                    Box::new(EspnNbaSource::new(source, headers, fetcher.clone()))
                }
                SourceShape::NbaStats => {
                    Box::new(NbaStatsSource::new(source, headers, fetcher.clone()))
                }
            };
            Ok(provider)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_url_fills_placeholders() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 4).unwrap();
        let [d, iso] = date_vars(date);
        let url = render_url(
            "https://x/{league}/scoreboard?dates={date}&iso={date_iso}",
            &[("league", "eng.1"), (d.0, d.1.as_str()), (iso.0, iso.1.as_str())],
        );
        assert_eq!(url, "https://x/eng.1/scoreboard?dates=20260104&iso=2026-01-04");
    }

    #[test]
    fn test_status_table_is_case_insensitive() {
        const TABLE: StatusTable = StatusTable {
            completed: &["STATUS_FINAL"],
            in_progress: &["STATUS_IN_PROGRESS"],
            scheduled: &["STATUS_SCHEDULED"],
        };
        assert_eq!(TABLE.resolve("status_final"), Some(EventStatus::Completed));
        assert_eq!(TABLE.resolve("STATUS_IN_PROGRESS"), Some(EventStatus::InProgress));
        assert_eq!(TABLE.resolve("STATUS_POSTPONED"), None);
    }

    #[test]
    fn test_source_headers_include_api_key() {
        let mut config = AppConfig::builtin().unwrap();
        let source = config.sources.iter_mut().find(|s| s.name == "espn_nba").unwrap();
        source.api_key_header = Some("x-api-key".to_string());
        let key = SecretString::from("k-123".to_string());
        let headers = source_headers(source, Some(&key));
        assert_eq!(headers.get("x-api-key").unwrap(), "k-123");
        assert_eq!(headers.get("referer").unwrap(), "https://www.espn.com/");
    }

    #[test]
    fn test_collect_events_skips_failures() {
        let items = vec![json!(1), json!("bad"), json!(2)];
        let events = collect_events("test", &items, |v| {
            if v.is_number() {
                Ok(crate::events::CanonicalEvent {
                    source: "test".into(),
                    event_id: Some(v.to_string()),
                    league: String::new(),
                    home: crate::events::Participant {
                        name: "A".into(),
                        abbreviation: String::new(),
                        score: 0,
                    },
                    away: crate::events::Participant {
                        name: "B".into(),
                        abbreviation: String::new(),
                        score: 0,
                    },
                    status: EventStatus::Scheduled,
                    leaders: vec![],
                })
            } else {
                Err(NormalizeError::NotAnObject)
            }
        });
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_build_providers_respects_priority() {
        let config = AppConfig::builtin().unwrap();
        let fetcher = Arc::new(HttpFetcher::new(&config.http).unwrap());
        let providers =
            build_providers(Sport::Basketball, &config, &Secrets::empty(), fetcher, &[]).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["espn_nba", "nba_stats"]);
    }
}
