//! Hit transport: one blocking form POST per hit to the collector.

use std::sync::Mutex;
use std::time::Duration;

use ssga_core::config::{TrackerConfig, DEFAULT_COLLECTOR_URL};
use ssga_core::params::ParameterSet;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::outcome::{classify_status, FailureReason, HitOutcome};

/// Delivers an assembled parameter set and classifies the result.
pub trait Transport: Send + Sync {
    fn send(&self, params: &ParameterSet) -> HitOutcome;
}

/// Encode the non-null parameters as an `application/x-www-form-urlencoded` body.
pub fn encode_form(params: &ParameterSet) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.wire_pairs())
        .finish()
}

/// HTTP transport posting to the collector endpoint. Redirects are not
/// followed, so a `3xx` answer is reported as a failure.
pub struct HttpTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpTransport {
    /// `timeout` bounds the whole request; `None` leaves it unbounded.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new().redirects(0);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(
            config.collector_url.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTOR_URL, None)
    }
}

impl Transport for HttpTransport {
    fn send(&self, params: &ParameterSet) -> HitOutcome {
        let body = encode_form(params);
        let result = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/x-www-form-urlencoded")
            .send_string(&body);

        let outcome = match result {
            Ok(resp) => classify_status(resp.status()),
            Err(ureq::Error::Status(code, _)) => classify_status(code),
            Err(ureq::Error::Transport(err)) => match err.kind() {
                ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                    warn!(endpoint = %self.endpoint, error = %err, "collector request could not be built");
                    HitOutcome::Unknown
                }
                _ => HitOutcome::Failed(FailureReason::Connection(err.to_string())),
            },
        };

        match &outcome {
            HitOutcome::Delivered => debug!(endpoint = %self.endpoint, "hit delivered"),
            HitOutcome::Failed(reason) => {
                warn!(endpoint = %self.endpoint, reason = %reason, "hit not delivered")
            }
            HitOutcome::Unknown => {}
        }
        outcome
    }
}

/// In-memory transport that records every hit and answers with a fixed
/// status. Used for dry runs and tests.
pub struct RecordingTransport {
    status: Option<u16>,
    sent: Mutex<Vec<ParameterSet>>,
}

impl RecordingTransport {
    /// Answer every hit with the given HTTP status.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Behave as if no request could be constructed.
    pub fn unavailable() -> Self {
        Self {
            status: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<ParameterSet> {
        self.sent.lock().expect("recording transport mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("recording transport mutex poisoned").len()
    }

    pub fn last(&self) -> Option<ParameterSet> {
        self.sent
            .lock()
            .expect("recording transport mutex poisoned")
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("recording transport mutex poisoned").clear();
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::with_status(200)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, params: &ParameterSet) -> HitOutcome {
        let Some(status) = self.status else {
            return HitOutcome::Unknown;
        };
        self.sent
            .lock()
            .expect("recording transport mutex poisoned")
            .push(params.clone());
        classify_status(status)
    }
}
