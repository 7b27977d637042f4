use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use crate::agent::status::{Outcome, RunStatus};
use crate::config::{AppConfig, Secrets, Sport};
use crate::data::client::{Acquisition, SourceClient};
use crate::data::http::HttpFetcher;
use crate::data::scope::{ReferenceZone, ScopeSelector};
use crate::data::build_providers;
use crate::detect::{detect, DetectionPolicy, TriggerRecord};
use crate::notify::{BackendKind, DeliveryResult, Dispatcher, Formatter, Notice};

/// Run trigger name under which the startup announcement is skipped.
pub const SCHEDULED_TRIGGER: &str = "schedule";

/// Per-invocation choices, usually from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sport: Sport,
    pub scope: ScopeSelector,
    /// Football league ids to query; empty means every configured league.
    pub leagues: Vec<String>,
    /// What started this run (`schedule`, `workflow_dispatch`, `local`).
    pub trigger: String,
    /// Format and log notifications without sending them.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(sport: Sport, config: &AppConfig) -> Self {
        Self {
            sport,
            scope: ScopeSelector::Rolling {
                days_back: config.schedule.days_back,
            },
            leagues: Vec::new(),
            trigger: "local".to_string(),
            dry_run: false,
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub triggers: Vec<TriggerRecord>,
    pub deliveries: Vec<DeliveryResult>,
}

impl RunReport {
    pub fn outcome(&self) -> Outcome {
        self.status.outcome()
    }
}

/// One-shot monitor: acquire, detect, notify, report.
pub struct Runner {
    config: AppConfig,
    secrets: Secrets,
    fetcher: Arc<HttpFetcher>,
    dispatcher: Dispatcher,
}

impl Runner {
    pub fn new(config: AppConfig, secrets: Secrets) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
        let dispatcher = Dispatcher::new(config.notify.timeout());

        info!(
            webhook_configured = secrets.webhook_url.is_some(),
            max_attempts = fetcher.policy().max_attempts,
            "Runner initialized"
        );

        Ok(Self {
            config,
            secrets,
            fetcher,
            dispatcher,
        })
    }

    pub async fn run_once(&self, options: &RunOptions) -> Result<RunReport> {
        self.run_once_at(options, Utc::now()).await
    }

    /// Run against an explicit clock. Only configuration faults are errors;
    /// data and delivery failures end up in the report.
    pub async fn run_once_at(&self, options: &RunOptions, now: DateTime<Utc>) -> Result<RunReport> {
        let start = Instant::now();
        let sport = options.sport;
        let formatter = Formatter::new(sport, &self.config);
        let backend = self
            .secrets
            .webhook_url
            .as_ref()
            .map(|url| BackendKind::detect(url.expose_secret()));
        let mut deliveries = Vec::new();

        info!(
            sport = %sport,
            trigger = %options.trigger,
            backend = ?backend,
            dry_run = options.dry_run,
            "Starting run"
        );

        if options.trigger == SCHEDULED_TRIGGER {
            info!("Scheduled run, skipping startup announcement");
        } else {
            self.notify(&formatter, &formatter.startup(now), backend, options.dry_run, &mut deliveries)
                .await;
        }

        let zone = ReferenceZone::from_config(&self.config.schedule)?;
        let dates = options
            .scope
            .candidate_dates(zone.today(now))
            .context("Invalid date scope")?;

        let providers = build_providers(
            sport,
            &self.config,
            &self.secrets,
            self.fetcher.clone(),
            &options.leagues,
        )?;
        let client = SourceClient::new(
            providers,
            self.config.date_strategy(sport),
            self.config.accept_policy(sport),
        );
        info!(sources = ?client.provider_names(), dates = ?dates, "Acquiring events");

        let mut status = RunStatus::new(sport);
        let mut triggers = Vec::new();

        match client.acquire(&dates).await {
            Acquisition::Exhausted { failures } => {
                status.failed_sources = failures;
                status.error = Some(status.failure_summary());
                error!(failed_sources = status.failed_sources.len(), "No source returned usable data");
                self.notify(&formatter, &formatter.error(&status, now), backend, options.dry_run, &mut deliveries)
                    .await;
            }
            Acquisition::Acquired {
                source,
                events,
                dates,
                failures,
            } => {
                let detection = detect(&events, &DetectionPolicy::for_sport(sport, &self.config));

                status.successful_source = Some(source);
                status.failed_sources = failures;
                status.dates = dates;
                status.event_count = events.len();
                status.top_scorers = detection.top_scorers;
                status.trigger_count = detection.triggers.len();
                triggers = detection.triggers;

                let notices: Vec<Notice> = match status.outcome() {
                    Outcome::NoEvents => vec![formatter.no_events(&status, now)],
                    Outcome::NoTrigger => vec![formatter.no_trigger(&status, now)],
                    Outcome::Triggered if sport == Sport::Football && self.config.football.digest => {
                        vec![formatter.digest(&triggers, &status, now)]
                    }
                    Outcome::Triggered => triggers
                        .iter()
                        .map(|t| formatter.trigger(t, &status, now))
                        .collect(),
                    Outcome::DataUnavailable => Vec::new(),
                };

                for notice in &notices {
                    self.notify(&formatter, notice, backend, options.dry_run, &mut deliveries)
                        .await;
                }
            }
        }

        let outcome = status.outcome();
        info!(
            sport = %sport,
            outcome = ?outcome,
            signal = %outcome.exit_signal(),
            successful_source = ?status.successful_source,
            failed_sources = status.failed_sources.len(),
            events = status.event_count,
            triggers = status.trigger_count,
            deliveries = deliveries.len(),
            delivered = deliveries.iter().filter(|d| d.ok).count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Run complete"
        );

        Ok(RunReport {
            status,
            triggers,
            deliveries,
        })
    }

    /// Render and send one notice. A missing webhook or a failed delivery is
    /// logged and the run carries on.
    async fn notify(
        &self,
        formatter: &Formatter,
        notice: &Notice,
        backend: Option<BackendKind>,
        dry_run: bool,
        deliveries: &mut Vec<DeliveryResult>,
    ) {
        let (Some(url), Some(backend)) = (&self.secrets.webhook_url, backend) else {
            warn!(kind = ?notice.kind, title = %notice.title, "No webhook configured, notification skipped");
            return;
        };

        let payload = formatter.render(notice, backend);
        if dry_run {
            match serde_json::to_string(&payload) {
                Ok(json) => info!(kind = ?notice.kind, payload = %json, "Dry run, notification not sent"),
                Err(e) => warn!(error = %e, "Failed to serialize notification"),
            }
            return;
        }

        let result = self.dispatcher.dispatch(&payload, url).await;
        if !result.ok {
            warn!(
                kind = ?notice.kind,
                status_code = ?result.status_code,
                error = ?result.error,
                "Notification not delivered"
            );
        }
        deliveries.push(result);
    }
}
