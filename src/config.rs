use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Built-in defaults, identical to `config/default.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub run: RunConfig,
    pub schedule: ScheduleConfig,
    pub http: HttpConfig,
    pub basketball: BasketballConfig,
    pub football: FootballConfig,
    pub notify: NotifyConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Basketball,
    Football,
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sport::Basketball => write!(f, "basketball"),
            Sport::Football => write!(f, "football"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub sport: Sport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    UsPacific,
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub zone: ZoneKind,
    #[serde(default)]
    pub utc_offset_hours: i32,
    pub days_back: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub max_attempts: u32,
    pub base_timeout_ms: u64,
    pub timeout_step_ms: u64,
    pub backoff_step_ms: u64,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

/// How a source walks its candidate dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStrategy {
    /// Stop at the first date with a live or finished event.
    FirstHit,
    /// Query every date and merge.
    FullRange,
}

/// When a source's answer is good enough to stop trying further sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptPolicy {
    NonEmpty,
    ValidResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasketballConfig {
    pub threshold: i64,
    pub sources: Vec<String>,
    pub date_strategy: DateStrategy,
    pub accept: AcceptPolicy,
    /// Extra line appended to every threshold notification.
    #[serde(default)]
    pub trigger_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootballConfig {
    pub sources: Vec<String>,
    pub date_strategy: DateStrategy,
    pub accept: AcceptPolicy,
    #[serde(default)]
    pub digest: bool,
    pub leagues: Vec<LeagueConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub timeout_seconds: u64,
    pub footer: String,
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line, for the scheduler's log collector.
    #[default]
    Json,
    /// Human-readable lines for local runs.
    Text,
}

/// Response shape tag; picks the provider strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    EspnSoccer,
    EspnNba,
    NbaStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub shape: SourceShape,
    pub scoreboard_url: String,
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Environment variable holding an API key for this source.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub api_key_header: Option<String>,
}

impl AppConfig {
    /// Load configuration from `path`, or from the built-in defaults when the
    /// path is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => Self::builtin()?,
        };

        Ok(config)
    }

    pub fn builtin() -> Result<Self> {
        toml::from_str(DEFAULT_CONFIG).context("Failed to parse built-in default config")
    }

    /// Source configs for `sport`, in configured priority order.
    pub fn sources_for(&self, sport: Sport) -> Result<Vec<&SourceConfig>, ConfigError> {
        let names = match sport {
            Sport::Basketball => &self.basketball.sources,
            Sport::Football => &self.football.sources,
        };
        if names.is_empty() {
            return Err(ConfigError::NoSources(sport.to_string()));
        }
        names
            .iter()
            .map(|name| {
                self.sources
                    .iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(|| ConfigError::UnknownSource(name.clone()))
            })
            .collect()
    }

    pub fn date_strategy(&self, sport: Sport) -> DateStrategy {
        match sport {
            Sport::Basketball => self.basketball.date_strategy,
            Sport::Football => self.football.date_strategy,
        }
    }

    pub fn accept_policy(&self, sport: Sport) -> AcceptPolicy {
        match sport {
            Sport::Basketball => self.basketball.accept,
            Sport::Football => self.football.accept,
        }
    }
}

/// Secrets loaded exclusively from environment variables.
/// Not serializable, not stored in config files.
pub struct Secrets {
    pub webhook_url: Option<SecretString>,
    /// API keys by source name.
    pub api_keys: HashMap<String, SecretString>,
}

impl Secrets {
    pub fn from_env(config: &AppConfig) -> Self {
        let webhook_url = std::env::var("WEBHOOK_URL")
            .or_else(|_| std::env::var("DISCORD_WEBHOOK"))
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(SecretString::from);

        let api_keys = config
            .sources
            .iter()
            .filter_map(|s| {
                let var = s.api_key_env.as_ref()?;
                let key = std::env::var(var).ok()?;
                Some((s.name.clone(), SecretString::from(key)))
            })
            .collect();

        Self {
            webhook_url,
            api_keys,
        }
    }

    pub fn with_webhook(url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(SecretString::from(url.into())),
            api_keys: HashMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            webhook_url: None,
            api_keys: HashMap::new(),
        }
    }
}
