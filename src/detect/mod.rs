//! Threshold detection over canonical events.
//!
//! Pure: no I/O, no clock. Events are scanned in upstream order and triggers
//! come out in that order.

pub mod trigger;

use tracing::debug;

use crate::config::{AppConfig, Sport};
use crate::events::{CanonicalEvent, EventStatus, StatLeader};

pub use trigger::{TopScorer, TriggerKind, TriggerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPolicy {
    /// Every completed event triggers once.
    Completion,
    /// Every stat leader of a started event at or above `threshold` triggers.
    Threshold { threshold: i64 },
}

impl DetectionPolicy {
    pub fn for_sport(sport: Sport, config: &AppConfig) -> Self {
        match sport {
            Sport::Football => DetectionPolicy::Completion,
            Sport::Basketball => DetectionPolicy::Threshold {
                threshold: config.basketball.threshold,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub triggers: Vec<TriggerRecord>,
    /// One entry per started event that has any leaders.
    pub top_scorers: Vec<TopScorer>,
}

pub fn detect(events: &[CanonicalEvent], policy: &DetectionPolicy) -> Detection {
    let mut detection = Detection::default();

    for event in events {
        match *policy {
            DetectionPolicy::Completion => {
                if event.status == EventStatus::Completed {
                    detection.triggers.push(TriggerRecord::completed(event));
                }
            }
            DetectionPolicy::Threshold { threshold } => {
                if !event.status.has_started() {
                    continue;
                }
                let leaders = dedupe_leaders(&event.leaders);

                // Ties keep the first leader listed.
                let top = leaders.iter().fold(None, |best: Option<&&StatLeader>, l| match best {
                    Some(b) if b.value >= l.value => Some(b),
                    _ => Some(l),
                });
                if let Some(top) = top {
                    detection.top_scorers.push(TopScorer::new(event, top));
                }

                for leader in leaders.iter().filter(|l| l.value >= threshold) {
                    debug!(
                        participant = %leader.participant,
                        value = leader.value,
                        threshold,
                        matchup = %event.matchup_label(),
                        "Threshold crossed"
                    );
                    detection
                        .triggers
                        .push(TriggerRecord::threshold(event, leader, threshold));
                }
            }
        }
    }

    detection
}

/// One line per participant: full box-score values outrank shortcuts, then
/// the higher value wins. First-appearance order is kept.
fn dedupe_leaders(leaders: &[StatLeader]) -> Vec<&StatLeader> {
    let mut kept: Vec<&StatLeader> = Vec::new();

    for leader in leaders {
        let key = leader.participant.trim();
        match kept
            .iter_mut()
            .find(|k| k.participant.trim().eq_ignore_ascii_case(key))
        {
            Some(existing) => {
                if (leader.origin, leader.value) > (existing.origin, existing.value) {
                    *existing = leader;
                }
            }
            None => kept.push(leader),
        }
    }

    kept
}
