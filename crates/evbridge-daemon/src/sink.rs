//! Event sink delivery
//!
//! The [`EventSink`] trait is the seam between the dispatch queue and
//! the outside world. The production implementation posts each event to
//! the supervisor's event API; tests substitute an in-memory recorder.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::ButtonEvent;

/// Default base URL of the event API, reachable from inside the add-on
/// container.
pub const DEFAULT_API_BASE: &str = "http://supervisor/core/api";

/// Longest response-body excerpt included in a delivery error.
const BODY_SNIPPET_LEN: usize = 180;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Event post failed status={status} body='{body}'")]
    Status { status: u16, body: String },

    #[error("Event post error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Destination for resolved button events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &ButtonEvent) -> Result<(), DeliveryError>;
}

/// Posts events to the supervisor event API with bearer-token auth.
pub struct HttpEventSink {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl HttpEventSink {
    pub fn new(
        api_base: &str,
        event_type: &str,
        token: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/events/{}", api_base.trim_end_matches('/'), event_type),
            token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &ButtonEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body: body_snippet(&body),
        })
    }
}

/// Flatten and truncate a response body for one-line logging.
fn body_snippet(body: &str) -> String {
    let flat = body.replace('\n', " ").trim().to_string();
    if flat.chars().count() <= BODY_SNIPPET_LEN {
        return flat;
    }
    let cut: String = flat.chars().take(BODY_SNIPPET_LEN - 3).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_event_url_from_base_and_type() {
        let sink = HttpEventSink::new(
            DEFAULT_API_BASE,
            "evbridge_command_received",
            "token".to_string(),
            Duration::from_secs(3),
        )
        .unwrap();
        assert_eq!(
            sink.url(),
            "http://supervisor/core/api/events/evbridge_command_received"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_tolerated() {
        let sink = HttpEventSink::new(
            "http://localhost:8123/api/",
            "my_event",
            "token".to_string(),
            Duration::from_secs(3),
        )
        .unwrap();
        assert_eq!(sink.url(), "http://localhost:8123/api/events/my_event");
    }

    #[test]
    fn body_snippet_flattens_and_truncates() {
        assert_eq!(body_snippet("short\nbody"), "short body");
        let long = "x".repeat(400);
        let snippet = body_snippet(&long);
        assert_eq!(snippet.chars().count(), BODY_SNIPPET_LEN);
        assert!(snippet.ends_with("..."));
    }
}
