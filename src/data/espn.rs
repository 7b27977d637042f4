//! Field tables shared by the ESPN site API scoreboards (soccer and NBA).

use serde_json::Value;

use crate::data::StatusTable;
use crate::error::NormalizeError;
use crate::events::fields::Field;
use crate::events::{EventStatus, Participant};

pub const EVENTS: Field = Field::new(&["events"]);
pub const EVENT_ID: Field = Field::new(&["id", "uid"]);
pub const COMPETITORS: Field = Field::new(&["competitions.0.competitors", "competitors"]);
pub const STATUS_NAME: Field = Field::new(&[
    "status.type.name",
    "competitions.0.status.type.name",
]);
pub const STATUS_STATE: Field = Field::new(&[
    "status.type.state",
    "competitions.0.status.type.state",
]);
pub const LEAGUE_NAME: Field = Field::new(&["leagues.0.abbreviation", "leagues.0.name"]);

pub const TEAM_NAME: Field = Field::new(&[
    "team.displayName",
    "team.name",
    "team.shortDisplayName",
    "athlete.displayName",
]);
pub const TEAM_ABBREVIATION: Field = Field::new(&["team.abbreviation", "team.shortDisplayName"]);
pub const SCORE: Field = Field::new(&["score"]);
pub const HOME_AWAY: Field = Field::new(&["homeAway"]);

/// ESPN's coarse `state` token, used when the detailed name is unknown.
pub const STATE_TABLE: StatusTable = StatusTable {
    completed: &["post"],
    in_progress: &["in"],
    scheduled: &["pre"],
};

/// Resolve event status from the detailed name via `names`, then the coarse
/// state. Unknown or missing tokens count as scheduled.
pub fn status(event: &Value, names: &StatusTable) -> EventStatus {
    STATUS_NAME
        .text(event)
        .and_then(|t| names.resolve(&t))
        .or_else(|| STATUS_STATE.text(event).and_then(|t| STATE_TABLE.resolve(&t)))
        .unwrap_or(EventStatus::Scheduled)
}

pub fn participant(competitor: &Value) -> Participant {
    Participant {
        name: TEAM_NAME.text(competitor).unwrap_or_default(),
        abbreviation: TEAM_ABBREVIATION.text(competitor).unwrap_or_default(),
        score: SCORE.int(competitor).unwrap_or(0),
    }
}

/// `(home, away)` competitor objects. Uses the `homeAway` marker when present,
/// otherwise ESPN's listing order (home first).
pub fn sides(event: &Value) -> Result<(&Value, &Value), NormalizeError> {
    let competitors = COMPETITORS.array(event);
    if competitors.len() < 2 {
        return Err(NormalizeError::Participants {
            found: competitors.len(),
        });
    }

    let marked = |side: &str| {
        competitors
            .iter()
            .find(|c| HOME_AWAY.text(c).is_some_and(|h| h.eq_ignore_ascii_case(side)))
    };

    match (marked("home"), marked("away")) {
        (Some(home), Some(away)) => Ok((home, away)),
        _ => Ok((&competitors[0], &competitors[1])),
    }
}
