//! Polls sports-statistics APIs, detects notable results (finished football
//! matches, basketball scoring performances over a threshold) and posts them
//! to a chat webhook.

pub mod agent;
pub mod config;
pub mod data;
pub mod detect;
pub mod error;
pub mod events;
pub mod monitoring;
pub mod notify;
