use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::notify::format::{truncate_chars, NotificationPayload};

/// Response bodies kept in delivery results.
const BODY_CHARS: usize = 500;

/// Outcome of one webhook POST. Delivery problems are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub ok: bool,
    pub status_code: Option<u16>,
    pub body: String,
    pub error: Option<String>,
}

/// Single-shot webhook client: one POST per dispatch, no retry.
pub struct Dispatcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Success only when the webhook answers the backend's expected status.
    #[instrument(skip_all, fields(backend = %payload.backend()))]
    pub async fn dispatch(&self, payload: &NotificationPayload, webhook_url: &SecretString) -> DeliveryResult {
        let expected = payload.backend().expected_status();

        let response = match self
            .http
            .post(webhook_url.expose_secret())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors carry the URL, which holds the webhook token.
                let detail = e.without_url().to_string();
                warn!(error = %detail, "Webhook request failed");
                return DeliveryResult {
                    ok: false,
                    status_code: None,
                    body: String::new(),
                    error: Some(detail),
                };
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map(|b| truncate_chars(&b, BODY_CHARS))
            .unwrap_or_default();

        if status == expected {
            info!(status, "Notification delivered");
            DeliveryResult {
                ok: true,
                status_code: Some(status),
                body,
                error: None,
            }
        } else {
            warn!(status, expected, body = %body, "Webhook returned unexpected status");
            DeliveryResult {
                ok: false,
                status_code: Some(status),
                error: Some(format!("expected HTTP {expected}, got {status}")),
                body,
            }
        }
    }
}
