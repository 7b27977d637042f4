//! Notice construction and backend-specific rendering.
//!
//! A [`Notice`] is backend-neutral: a title, a palette and up to five body
//! sections in a fixed order (primary message, source provenance, event
//! detail, top scorers, timestamp). Missing sections are left out. Rendering
//! turns it into the embed or card JSON schema.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::status::RunStatus;
use crate::config::{AppConfig, Sport};
use crate::detect::{TriggerKind, TriggerRecord};
use crate::notify::{BackendKind, MessageKind, Palette};

/// Raw error detail kept in error notices.
pub const ERROR_DETAIL_CHARS: usize = 200;

/// Discord rejects embed descriptions above 4096 characters.
const EMBED_DESCRIPTION_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: MessageKind,
    pub palette: Palette,
    pub title: String,
    pub primary: String,
    pub provenance: Option<String>,
    pub detail: Option<String>,
    pub top_scorers: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Notice {
    fn new(kind: MessageKind, palette: Palette, title: String, primary: String, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            palette,
            title,
            primary,
            provenance: None,
            detail: None,
            top_scorers: None,
            generated_at: now,
        }
    }

    pub fn body(&self) -> String {
        let stamp = format!("Generated: {} UTC", self.generated_at.format("%Y-%m-%d %H:%M:%S"));
        [
            Some(self.primary.as_str()),
            self.provenance.as_deref(),
            self.detail.as_deref(),
            self.top_scorers.as_deref(),
            Some(stamp.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

pub struct Formatter {
    sport: Sport,
    threshold: i64,
    trigger_note: Option<String>,
    footer: String,
}

impl Formatter {
    pub fn new(sport: Sport, config: &AppConfig) -> Self {
        Self {
            sport,
            threshold: config.basketball.threshold,
            trigger_note: config.basketball.trigger_note.clone(),
            footer: config.notify.footer.clone(),
        }
    }

    fn heading(&self, text: &str) -> String {
        let icon = match self.sport {
            Sport::Basketball => "🏀",
            Sport::Football => "⚽",
        };
        format!("{icon} {text}")
    }

    fn sport_label(&self) -> &'static str {
        match self.sport {
            Sport::Basketball => "Basketball",
            Sport::Football => "Football",
        }
    }

    pub fn startup(&self, now: DateTime<Utc>) -> Notice {
        Notice::new(
            MessageKind::Startup,
            Palette::Info,
            self.heading(&format!("{} monitor started", self.sport_label())),
            format!("Monitoring run started, checking {} results.", self.sport),
            now,
        )
    }

    pub fn no_events(&self, status: &RunStatus, now: DateTime<Utc>) -> Notice {
        let mut notice = Notice::new(
            MessageKind::NoEvents,
            Palette::Warning,
            self.heading(&format!("No {} events", self.sport)),
            format!("No {} events found.", self.sport),
            now,
        );
        notice.provenance = provenance(status);
        notice.detail = dates_checked(status);
        notice
    }

    pub fn no_trigger(&self, status: &RunStatus, now: DateTime<Utc>) -> Notice {
        let (title, primary) = match self.sport {
            Sport::Basketball => (
                format!("No {}-point games", self.threshold),
                format!(
                    "{} game(s) checked, nobody reached {} points.",
                    status.event_count, self.threshold
                ),
            ),
            Sport::Football => (
                "No completed matches".to_string(),
                format!("{} match(es) checked, none completed.", status.event_count),
            ),
        };

        let mut notice = Notice::new(MessageKind::NoTrigger, Palette::Neutral, self.heading(&title), primary, now);
        notice.provenance = provenance(status);
        notice.detail = dates_checked(status);
        notice.top_scorers = top_scorers(status);
        notice
    }

    pub fn trigger(&self, trigger: &TriggerRecord, status: &RunStatus, now: DateTime<Utc>) -> Notice {
        let mut notice = match &trigger.kind {
            TriggerKind::MatchCompleted => {
                let mut notice = Notice::new(
                    MessageKind::Trigger,
                    Palette::Success,
                    self.heading("Match completed"),
                    format!("**{}**: {}", trigger.league, trigger.matchup),
                    now,
                );
                notice.detail = Some(format!("Status: {}", trigger.status));
                notice
            }
            TriggerKind::StatThreshold {
                participant,
                team,
                stat,
                value,
                threshold,
            } => {
                let mut notice = Notice::new(
                    MessageKind::Trigger,
                    Palette::Alert,
                    self.heading(&format!("{threshold}-point game!")),
                    format!("**{participant}** ({team}) scored **{value}** {stat}."),
                    now,
                );
                let mut detail = vec![
                    format!("Matchup: {} ({})", trigger.matchup, trigger.status),
                    format!("League: {}", trigger.league),
                ];
                detail.extend(self.trigger_note.clone());
                notice.detail = Some(detail.join("\n"));
                notice
            }
        };
        notice.provenance = provenance(status);
        notice
    }

    /// All triggers in one message, grouped by league in first-seen order.
    pub fn digest(&self, triggers: &[TriggerRecord], status: &RunStatus, now: DateTime<Utc>) -> Notice {
        let mut order: Vec<&str> = Vec::new();
        let mut by_league: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for t in triggers {
            if !by_league.contains_key(t.league.as_str()) {
                order.push(&t.league);
            }
            by_league.entry(&t.league).or_default().push(&t.matchup);
        }

        let blocks: Vec<String> = order
            .iter()
            .map(|league| {
                let matchups = &by_league[league];
                let mut lines = vec![format!("**{league}** ({})", matchups.len())];
                lines.extend(matchups.iter().map(|m| format!("   {m}")));
                lines.join("\n")
            })
            .collect();

        let mut notice = Notice::new(
            MessageKind::Trigger,
            Palette::Info,
            self.heading(&format!("{} daily report", self.sport_label())),
            format!("{} completed match(es).", triggers.len()),
            now,
        );
        notice.provenance = provenance(status);
        notice.detail = (!blocks.is_empty()).then(|| blocks.join("\n\n"));
        notice
    }

    pub fn error(&self, status: &RunStatus, now: DateTime<Utc>) -> Notice {
        let raw = status.error.clone().unwrap_or_default();
        let mut notice = Notice::new(
            MessageKind::Error,
            Palette::Alert,
            self.heading(&format!("{} monitor error", self.sport_label())),
            format!("Could not fetch {} data: {}.", self.sport, classify_failure(&raw)),
            now,
        );
        notice.provenance = provenance(status);
        notice.detail = (!raw.is_empty()).then(|| format!("Details: {}", truncate_chars(&raw, ERROR_DETAIL_CHARS)));
        notice
    }

    pub fn render(&self, notice: &Notice, backend: BackendKind) -> NotificationPayload {
        let body = notice.body();
        match backend {
            BackendKind::Embed => NotificationPayload::Embed(EmbedMessage {
                content: format!("**{}**", notice.title),
                embeds: vec![Embed {
                    title: notice.title.clone(),
                    description: truncate_chars(&body, EMBED_DESCRIPTION_CHARS),
                    color: notice.palette.embed_color(),
                    footer: EmbedFooter {
                        text: self.footer.clone(),
                    },
                }],
            }),
            BackendKind::Card => NotificationPayload::Card(CardMessage {
                msg_type: "interactive",
                card: Card {
                    header: CardHeader {
                        title: CardText {
                            tag: "plain_text",
                            content: notice.title.clone(),
                        },
                        template: notice.palette.card_template(),
                    },
                    elements: vec![CardElement {
                        tag: "div",
                        text: CardText {
                            tag: "lark_md",
                            content: format!("**{}**\n\n{}", notice.title, body),
                        },
                    }],
                },
            }),
        }
    }
}

fn provenance(status: &RunStatus) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(source) = &status.successful_source {
        lines.push(format!("Data source: {source}"));
    }
    if !status.failed_sources.is_empty() {
        let names: Vec<&str> = status.failed_sources.iter().map(|f| f.source.as_str()).collect();
        lines.push(format!("Failed sources: {}", names.join(", ")));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn dates_checked(status: &RunStatus) -> Option<String> {
    if status.dates.is_empty() {
        return None;
    }
    let dates: Vec<String> = status.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    Some(format!("Dates checked: {}", dates.join(", ")))
}

fn top_scorers(status: &RunStatus) -> Option<String> {
    if status.top_scorers.is_empty() {
        return None;
    }
    let mut lines = vec!["Top scorers:".to_string()];
    lines.extend(status.top_scorers.iter().map(|s| {
        format!("• {} ({}) {} pts, {} ({})", s.participant, s.team, s.value, s.matchup, s.status)
    }));
    Some(lines.join("\n"))
}

/// Readable cause for a raw failure description.
pub fn classify_failure(detail: &str) -> String {
    let lower = detail.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        "network timeout".to_string()
    } else if lower.contains("connect") {
        "connection failure".to_string()
    } else if lower.contains("http 4") || lower.contains("http 5") {
        "upstream HTTP error".to_string()
    } else if detail.trim().is_empty() {
        "unknown error".to_string()
    } else {
        // The raw text goes to the detail block.
        "upstream error".to_string()
    }
}

/// At most `max` characters, with an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// A message ready to POST, in one backend's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    Embed(EmbedMessage),
    Card(CardMessage),
}

impl NotificationPayload {
    pub fn backend(&self) -> BackendKind {
        match self {
            NotificationPayload::Embed(_) => BackendKind::Embed,
            NotificationPayload::Card(_) => BackendKind::Card,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardMessage {
    pub msg_type: &'static str,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub header: CardHeader,
    pub elements: Vec<CardElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    pub title: CardText,
    pub template: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardText {
    pub tag: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardElement {
    pub tag: &'static str,
    pub text: CardText,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::client::SourceFailure;
    use crate::detect::TopScorer;
    use crate::events::EventStatus;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap()
    }

    fn formatter(sport: Sport) -> Formatter {
        Formatter::new(sport, &AppConfig::builtin().unwrap())
    }

    fn status(sport: Sport) -> RunStatus {
        let mut status = RunStatus::new(sport);
        status.successful_source = Some("nba_stats".to_string());
        status.failed_sources = vec![SourceFailure {
            source: "espn_nba".to_string(),
            reason: "request to https://x timed out after 3 attempt(s)".to_string(),
        }];
        status.dates = vec![NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()];
        status.event_count = 5;
        status
    }

    fn fifty_point_trigger() -> TriggerRecord {
        TriggerRecord {
            kind: TriggerKind::StatThreshold {
                participant: "Jaylen Brown".to_string(),
                team: "BOS".to_string(),
                stat: "points".to_string(),
                value: 50,
                threshold: 50,
            },
            league: "NBA".to_string(),
            matchup: "NY 120 - 131 BOS".to_string(),
            status: EventStatus::Completed,
            source: "nba_stats".to_string(),
            event_id: Some("0022500500".to_string()),
        }
    }

    #[test]
    fn test_trigger_renders_on_both_backends() {
        let f = formatter(Sport::Basketball);
        let notice = f.trigger(&fifty_point_trigger(), &status(Sport::Basketball), now());
        assert_eq!(notice.palette, Palette::Alert);

        for backend in [BackendKind::Embed, BackendKind::Card] {
            let json = serde_json::to_string(&f.render(&notice, backend)).unwrap();
            assert!(json.contains("Jaylen Brown"), "{backend}: {json}");
            assert!(json.contains("50"), "{backend}: {json}");
            assert!(json.contains("NY 120 - 131 BOS"), "{backend}: {json}");
        }
    }

    #[test]
    fn test_body_sections_in_order() {
        let f = formatter(Sport::Basketball);
        let body = f.trigger(&fifty_point_trigger(), &status(Sport::Basketball), now()).body();

        let primary = body.find("scored").unwrap();
        let source = body.find("Data source: nba_stats").unwrap();
        let failed = body.find("Failed sources: espn_nba").unwrap();
        let detail = body.find("Matchup:").unwrap();
        let stamp = body.find("Generated: 2026-01-05 14:30:00 UTC").unwrap();
        assert!(primary < source && source < failed && failed < detail && detail < stamp);
        assert!(body.contains("NBA50"));
    }

    #[test]
    fn test_missing_sections_are_omitted() {
        let f = formatter(Sport::Football);
        let body = f.startup(now()).body();
        assert!(!body.contains("Data source"));
        assert!(!body.contains("\n\n\n"));
        assert!(body.ends_with("Generated: 2026-01-05 14:30:00 UTC"));
    }

    #[test]
    fn test_embed_schema() {
        let f = formatter(Sport::Football);
        let payload = f.render(&f.startup(now()), BackendKind::Embed);
        assert_eq!(payload.backend(), BackendKind::Embed);
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["content"], "**⚽ Football monitor started**");
        assert_eq!(v["embeds"][0]["title"], "⚽ Football monitor started");
        assert_eq!(v["embeds"][0]["color"], 3_447_003);
        assert_eq!(v["embeds"][0]["footer"]["text"], "scorewatch scheduled monitor");
    }

    #[test]
    fn test_card_schema() {
        let f = formatter(Sport::Football);
        let payload = f.render(&f.error(&RunStatus::new(Sport::Football), now()), BackendKind::Card);
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["msg_type"], "interactive");
        assert_eq!(v["card"]["header"]["title"]["tag"], "plain_text");
        assert_eq!(v["card"]["header"]["template"], "red");
        assert_eq!(v["card"]["elements"][0]["tag"], "div");
        assert_eq!(v["card"]["elements"][0]["text"]["tag"], "lark_md");
        let content = v["card"]["elements"][0]["text"]["content"].as_str().unwrap();
        assert!(content.starts_with("**⚽ Football monitor error**\n\n"));
    }

    #[test]
    fn test_error_notice_classifies_and_truncates() {
        let f = formatter(Sport::Basketball);
        let mut status = RunStatus::new(Sport::Basketball);
        status.error = Some(format!("espn_nba: request timed out {}", "x".repeat(400)));
        let notice = f.error(&status, now());
        assert!(notice.primary.contains("network timeout"));
        let detail = notice.detail.unwrap();
        assert_eq!(detail.chars().count(), "Details: ".len() + ERROR_DETAIL_CHARS + 3);
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("request to u timed out after 3 attempt(s)"), "network timeout");
        assert_eq!(classify_failure("connection failure for u"), "connection failure");
        assert_eq!(classify_failure("HTTP 503 from u after 3 attempt(s)"), "upstream HTTP error");
        assert_eq!(classify_failure("invalid JSON from u"), "upstream error");
        assert_eq!(classify_failure("  "), "unknown error");
    }

    #[test]
    fn test_unrecognized_cause_is_not_repeated() {
        let f = formatter(Sport::Basketball);
        let mut status = RunStatus::new(Sport::Basketball);
        status.error = Some("nba_stats: invalid JSON from https://x: expected value".to_string());
        let notice = f.error(&status, now());
        assert_eq!(notice.primary, "Could not fetch basketball data: upstream error.");
        assert_eq!(notice.body().matches("invalid JSON").count(), 1);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        let text = "ü".repeat(10);
        assert_eq!(truncate_chars(&text, 4), "üüüü...");
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn test_no_trigger_lists_top_scorers() {
        let f = formatter(Sport::Basketball);
        let mut status = status(Sport::Basketball);
        status.top_scorers = vec![TopScorer {
            participant: "Luka Doncic".to_string(),
            team: "LAL".to_string(),
            value: 41,
            matchup: "LAL 118 - 110 GSW".to_string(),
            status: EventStatus::Completed,
        }];
        let notice = f.no_trigger(&status, now());
        assert_eq!(notice.palette, Palette::Neutral);
        assert!(notice.primary.contains("nobody reached 50 points"));
        assert!(notice.top_scorers.unwrap().contains("Luka Doncic (LAL) 41 pts"));
    }

    #[test]
    fn test_digest_groups_by_league() {
        let f = formatter(Sport::Football);
        let t = |league: &str, matchup: &str| TriggerRecord {
            kind: TriggerKind::MatchCompleted,
            league: league.to_string(),
            matchup: matchup.to_string(),
            status: EventStatus::Completed,
            source: "espn_soccer".to_string(),
            event_id: None,
        };
        let triggers = vec![
            t("English Premier League", "CHE 1 - 2 ARS"),
            t("Spanish La Liga", "SEV 0 - 3 RMA"),
            t("English Premier League", "LIV 2 - 2 EVE"),
        ];
        let notice = f.digest(&triggers, &status(Sport::Football), now());
        let detail = notice.detail.unwrap();
        assert!(detail.starts_with("**English Premier League** (2)\n   CHE 1 - 2 ARS\n   LIV 2 - 2 EVE"));
        assert!(detail.contains("**Spanish La Liga** (1)"));
        assert_eq!(notice.primary, "3 completed match(es).");
    }
}
