//! Result classification for a single hit.

use thiserror::Error;

/// Outcome of one send-like operation.
///
/// `Unknown` means the request could not even be constructed; callers should
/// not treat it as a definite failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitOutcome {
    Delivered,
    Failed(FailureReason),
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("product list produced no parameters")]
    EmptyProductList,

    #[error("collector responded with HTTP {0}")]
    Rejected(u16),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl HitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, HitOutcome::Delivered)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, HitOutcome::Unknown)
    }

    /// Collapse to the legacy tri-state boolean: `None` for `Unknown`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HitOutcome::Delivered => Some(true),
            HitOutcome::Failed(_) => Some(false),
            HitOutcome::Unknown => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            HitOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Classify an HTTP status code: only `2xx` counts as delivered.
pub fn classify_status(status: u16) -> HitOutcome {
    if (200..300).contains(&status) {
        HitOutcome::Delivered
    } else {
        HitOutcome::Failed(FailureReason::Rejected(status))
    }
}
