pub mod fields;
pub mod leaders;
pub mod models;

pub use models::{CanonicalEvent, EventStatus, LeaderOrigin, Participant, StatLeader};
