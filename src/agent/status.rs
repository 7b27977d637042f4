use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Sport;
use crate::data::client::SourceFailure;
use crate::detect::TopScorer;

/// Summary of one run, handed to the formatter and logged at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub sport: Sport,
    pub successful_source: Option<String>,
    pub failed_sources: Vec<SourceFailure>,
    /// Dates that contributed events, most recent first.
    pub dates: Vec<NaiveDate>,
    pub event_count: usize,
    pub top_scorers: Vec<TopScorer>,
    pub trigger_count: usize,
    /// Raw failure detail when no source was usable.
    pub error: Option<String>,
}

impl RunStatus {
    pub fn new(sport: Sport) -> Self {
        Self {
            sport,
            successful_source: None,
            failed_sources: Vec::new(),
            dates: Vec::new(),
            event_count: 0,
            top_scorers: Vec::new(),
            trigger_count: 0,
            error: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.successful_source.is_none() {
            Outcome::DataUnavailable
        } else if self.trigger_count > 0 {
            Outcome::Triggered
        } else if self.event_count == 0 {
            Outcome::NoEvents
        } else {
            Outcome::NoTrigger
        }
    }

    /// `source: reason` for every failed source, one per line.
    pub fn failure_summary(&self) -> String {
        self.failed_sources
            .iter()
            .map(|f| format!("{}: {}", f.source, f.reason))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Triggered,
    NoEvents,
    NoTrigger,
    DataUnavailable,
}

impl Outcome {
    pub fn exit_signal(&self) -> ExitSignal {
        match self {
            Outcome::Triggered => ExitSignal::Success,
            Outcome::NoEvents | Outcome::NoTrigger => ExitSignal::NoOp,
            Outcome::DataUnavailable => ExitSignal::Error,
        }
    }
}

/// What the scheduler is told about the run. The process exits 0 for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    Success,
    NoOp,
    Error,
}

impl std::fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitSignal::Success => write!(f, "success"),
            ExitSignal::NoOp => write!(f, "no-op"),
            ExitSignal::Error => write!(f, "error"),
        }
    }
}
