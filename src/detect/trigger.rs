use serde::Serialize;

use crate::events::{CanonicalEvent, EventStatus, StatLeader};

/// What made an event notable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKind {
    MatchCompleted,
    StatThreshold {
        participant: String,
        team: String,
        stat: String,
        value: i64,
        threshold: i64,
    },
}

/// One notable occurrence, carrying everything the formatter needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerRecord {
    pub kind: TriggerKind,
    pub league: String,
    pub matchup: String,
    pub status: EventStatus,
    pub source: String,
    pub event_id: Option<String>,
}

impl TriggerRecord {
    pub fn completed(event: &CanonicalEvent) -> Self {
        Self::from_event(event, TriggerKind::MatchCompleted)
    }

    pub fn threshold(event: &CanonicalEvent, leader: &StatLeader, threshold: i64) -> Self {
        Self::from_event(
            event,
            TriggerKind::StatThreshold {
                participant: leader.participant.clone(),
                team: leader.team.clone(),
                stat: leader.stat.clone(),
                value: leader.value,
                threshold,
            },
        )
    }

    fn from_event(event: &CanonicalEvent, kind: TriggerKind) -> Self {
        Self {
            kind,
            league: event.league.clone(),
            matchup: event.matchup_label(),
            status: event.status,
            source: event.source.clone(),
            event_id: event.event_id.clone(),
        }
    }
}

/// Highest stat line of one event, reported whether or not it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopScorer {
    pub participant: String,
    pub team: String,
    pub value: i64,
    pub matchup: String,
    pub status: EventStatus,
}

impl TopScorer {
    pub fn new(event: &CanonicalEvent, leader: &StatLeader) -> Self {
        Self {
            participant: leader.participant.clone(),
            team: leader.team.clone(),
            value: leader.value,
            matchup: event.matchup_label(),
            status: event.status,
        }
    }
}
