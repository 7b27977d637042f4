use serde::Serialize;

/// Canonical lifecycle of a match or game, independent of provider vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl EventStatus {
    /// Live or finished; the only states whose stats mean anything.
    pub fn has_started(&self) -> bool {
        matches!(self, EventStatus::InProgress | EventStatus::Completed)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Scheduled => write!(f, "scheduled"),
            EventStatus::InProgress => write!(f, "in progress"),
            EventStatus::Completed => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub name: String,
    pub abbreviation: String,
    pub score: i64,
}

impl Participant {
    /// Abbreviation when the provider has one, else the last word of the name
    /// (or its first 15 characters for one-word names).
    pub fn short_name(&self) -> String {
        if !self.abbreviation.is_empty() {
            return self.abbreviation.clone();
        }
        let name = self.name.trim();
        if name.contains(' ') {
            name.rsplit(' ').next().unwrap_or(name).to_string()
        } else {
            name.chars().take(15).collect()
        }
    }
}

/// Where a stat leader came from; full box scores outrank shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderOrigin {
    Shortcut,
    BoxScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatLeader {
    pub participant: String,
    pub team: String,
    pub stat: String,
    pub value: i64,
    pub origin: LeaderOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEvent {
    pub source: String,
    pub event_id: Option<String>,
    pub league: String,
    pub home: Participant,
    pub away: Participant,
    pub status: EventStatus,
    pub leaders: Vec<StatLeader>,
}

impl CanonicalEvent {
    /// `AWAY 98 - 104 HOME`, away side first.
    pub fn matchup_label(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.away.short_name(),
            self.away.score,
            self.home.score,
            self.home.short_name()
        )
    }
}
