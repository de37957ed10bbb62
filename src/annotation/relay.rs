use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::backend::{CommentBackend, CommentRequest};
use super::error::CommentError;

pub const COMMENTS_ROUTE: &str = "/api/comments";

/// The relay is telemetry, so it never gets to hold up a trial for longer
/// than this.
pub const MAX_RELAY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Shortest timeout the relay client is built with. Anything below this
/// would time out every request.
pub const MIN_RELAY_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    event: &'a str,
    task: &'a str,
    additional_text: &'a str,
}

/// Posts comments to the comment relay service as JSON.
///
/// Best-effort: transport errors and non-2xx replies are logged and
/// dropped, and `send` always returns `Ok`. No ledger is read or written.
pub struct RelayCommentBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    timeout: Duration,
}

impl RelayCommentBackend {
    /// `base_url` is the relay root, e.g. `http://127.0.0.1:5000`. The
    /// timeout is clamped to `MIN_RELAY_TIMEOUT..=MAX_RELAY_TIMEOUT`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CommentError> {
        let timeout = timeout.clamp(MIN_RELAY_TIMEOUT, MAX_RELAY_TIMEOUT);
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| CommentError::RelayClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), COMMENTS_ROUTE),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl CommentBackend for RelayCommentBackend {
    fn send(&mut self, request: &CommentRequest) -> Result<(), CommentError> {
        let payload = RelayPayload {
            event: request.event.as_str(),
            task: &request.task,
            additional_text: &request.additional_text,
        };

        match self.client.post(&self.endpoint).json(&payload).send() {
            Ok(response) if response.status().is_success() => {
                debug!(endpoint = %self.endpoint, event = payload.event, "relayed comment");
            }
            Ok(response) => {
                warn!(
                    endpoint = %self.endpoint,
                    status = %response.status(),
                    event = payload.event,
                    "comment relay rejected comment"
                );
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, event = payload.event, "comment relay unreachable");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let relay =
            RelayCommentBackend::new("http://127.0.0.1:5000/", Duration::from_millis(200)).unwrap();
        assert_eq!(relay.endpoint(), "http://127.0.0.1:5000/api/comments");
    }

    #[test]
    fn timeout_is_kept_within_bounds() {
        let zero = RelayCommentBackend::new("http://127.0.0.1:5000", Duration::ZERO).unwrap();
        assert_eq!(zero.timeout(), MIN_RELAY_TIMEOUT);

        let long =
            RelayCommentBackend::new("http://127.0.0.1:5000", Duration::from_secs(30)).unwrap();
        assert_eq!(long.timeout(), MAX_RELAY_TIMEOUT);

        let normal =
            RelayCommentBackend::new("http://127.0.0.1:5000", Duration::from_millis(250)).unwrap();
        assert_eq!(normal.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn payload_field_names() {
        let payload = RelayPayload {
            event: "annotate",
            task: "InstrWM",
            additional_text: "trial=5",
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"event": "annotate", "task": "InstrWM", "additional_text": "trial=5"})
        );
    }
}
