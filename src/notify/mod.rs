//! Chat webhook notifications.
//!
//! Two backend schema families are supported: Discord-style "embed" messages
//! and Lark/Feishu "card" messages. The backend is picked from the webhook URL
//! once per run.

pub mod dispatch;
pub mod format;

pub use dispatch::{DeliveryResult, Dispatcher};
pub use format::{Formatter, Notice, NotificationPayload};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Discord webhook, answers 204.
    Embed,
    /// Lark/Feishu bot webhook, answers 200.
    Card,
}

impl BackendKind {
    /// Match on the host first, then anywhere in the URL. Unknown URLs get
    /// the embed schema.
    pub fn detect(webhook_url: &str) -> Self {
        let host = reqwest::Url::parse(webhook_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        Self::from_text(&host)
            .or_else(|| Self::from_text(&webhook_url.to_lowercase()))
            .unwrap_or(BackendKind::Embed)
    }

    fn from_text(text: &str) -> Option<Self> {
        if text.contains("discord") {
            Some(BackendKind::Embed)
        } else if text.contains("larksuite.com") || text.contains("feishu") {
            Some(BackendKind::Card)
        } else {
            None
        }
    }

    pub fn expected_status(&self) -> u16 {
        match self {
            BackendKind::Embed => 204,
            BackendKind::Card => 200,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Embed => write!(f, "embed"),
            BackendKind::Card => write!(f, "card"),
        }
    }
}

/// Shared color vocabulary, mapped per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Info,
    Success,
    Warning,
    Neutral,
    Alert,
}

impl Palette {
    pub fn embed_color(&self) -> u32 {
        match self {
            Palette::Info => 3_447_003,
            Palette::Success => 65_280,
            Palette::Warning => 16_776_960,
            Palette::Neutral => 9_807_270,
            Palette::Alert => 15_158_332,
        }
    }

    pub fn card_template(&self) -> &'static str {
        match self {
            Palette::Info => "blue",
            Palette::Success => "green",
            Palette::Warning => "yellow",
            Palette::Neutral => "grey",
            Palette::Alert => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Startup,
    NoEvents,
    NoTrigger,
    Trigger,
    Error,
}
