//! Ordered provider fallback over a window of candidate dates.
//!
//! Providers are consumed strictly in priority order. Each one walks the
//! candidate dates (most recent first) according to the configured
//! [`DateStrategy`]; its answer is then judged against the [`AcceptPolicy`].
//! Every provider tried before the accepted one is recorded as a failure,
//! whether it errored or simply had nothing to offer.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AcceptPolicy, DateStrategy};
use crate::data::Provider;
use crate::events::CanonicalEvent;

/// A source that was tried and not used, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Outcome of one acquisition. Total failure is a value, not an error.
#[derive(Debug)]
pub enum Acquisition {
    Acquired {
        source: String,
        events: Vec<CanonicalEvent>,
        /// Dates whose payloads contributed, most recent first.
        dates: Vec<NaiveDate>,
        failures: Vec<SourceFailure>,
    },
    Exhausted {
        failures: Vec<SourceFailure>,
    },
}

impl Acquisition {
    pub fn failures(&self) -> &[SourceFailure] {
        match self {
            Acquisition::Acquired { failures, .. } | Acquisition::Exhausted { failures } => failures,
        }
    }
}

/// What one provider produced over the date window.
struct Answer {
    events: Vec<CanonicalEvent>,
    dates: Vec<NaiveDate>,
}

pub struct SourceClient {
    providers: Vec<Box<dyn Provider>>,
    strategy: DateStrategy,
    accept: AcceptPolicy,
}

impl SourceClient {
    pub fn new(providers: Vec<Box<dyn Provider>>, strategy: DateStrategy, accept: AcceptPolicy) -> Self {
        Self {
            providers,
            strategy,
            accept,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider in order until one yields an acceptable answer.
    /// When no source has events but at least one answered cleanly, the first
    /// such source is returned with an empty event list: an off-day is not an
    /// outage.
    pub async fn acquire(&self, dates: &[NaiveDate]) -> Acquisition {
        let mut failures = Vec::new();
        // First source that answered with nothing, and its slot in `failures`.
        let mut answered_empty: Option<(usize, String, Answer)> = None;

        for provider in &self.providers {
            let name = provider.name().to_string();

            let answer = match self.query(provider.as_ref(), dates).await {
                Ok(answer) => answer,
                Err(reason) => {
                    warn!(source = %name, reason = %reason, "Source failed");
                    failures.push(SourceFailure { source: name, reason });
                    continue;
                }
            };

            if self.accept == AcceptPolicy::NonEmpty && answer.events.is_empty() {
                let reason = format!("no events for {}", format_dates(dates));
                warn!(source = %name, reason = %reason, "Source returned nothing, trying next");
                failures.push(SourceFailure {
                    source: name.clone(),
                    reason,
                });
                if answered_empty.is_none() {
                    answered_empty = Some((failures.len() - 1, name, answer));
                }
                continue;
            }

            info!(
                source = %name,
                events = answer.events.len(),
                dates = %format_dates(&answer.dates),
                failed_sources = failures.len(),
                "Source accepted"
            );
            return Acquisition::Acquired {
                source: name,
                events: answer.events,
                dates: answer.dates,
                failures,
            };
        }

        if let Some((slot, source, answer)) = answered_empty {
            failures.remove(slot);
            info!(
                source = %source,
                dates = %format_dates(&answer.dates),
                failed_sources = failures.len(),
                "No source had events, accepting empty answer"
            );
            return Acquisition::Acquired {
                source,
                events: answer.events,
                dates: answer.dates,
                failures,
            };
        }

        warn!(failed_sources = failures.len(), "Every source failed");
        Acquisition::Exhausted { failures }
    }

    /// Walk the date window for one provider. `Err` carries the reason when
    /// no date produced a usable response.
    async fn query(&self, provider: &dyn Provider, dates: &[NaiveDate]) -> Result<Answer, String> {
        let mut events: Vec<CanonicalEvent> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut answered = Vec::new();
        let mut last_error = None;

        for &date in dates {
            let payloads = match provider.fetch(date).await {
                Ok(payloads) => payloads,
                Err(e) => {
                    warn!(source = provider.name(), date = %date, error = %e, "Date query failed");
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            // Payloads are dropped once read.
            let day: Vec<CanonicalEvent> = payloads.iter().flat_map(|p| provider.normalize(p)).collect();
            let hit = day.iter().any(|e| e.status.has_started());
            debug!(source = provider.name(), date = %date, events = day.len(), hit, "Date normalized");

            answered.push(date);
            for event in day {
                let fresh = match &event.event_id {
                    Some(id) => seen.insert(id.clone()),
                    None => true,
                };
                if fresh {
                    events.push(event);
                }
            }

            if self.strategy == DateStrategy::FirstHit && hit {
                break;
            }
        }

        if answered.is_empty() {
            return Err(last_error.unwrap_or_else(|| "no candidate dates".to_string()));
        }

        Ok(Answer {
            events,
            dates: answered,
        })
    }
}

fn format_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
