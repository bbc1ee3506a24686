//! Per-invocation transaction status.

use std::fmt;

/// Status of a single workflow invocation.
///
/// Each workflow instance owns exactly one of these; status is never shared
/// across concurrently running workflows.  A workflow refuses to start a new
/// submission while its status is [`TxStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxStatus {
    #[default]
    Idle,
    Pending(String),
    Success(String),
    Error(String),
}

impl TxStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TxStatus::Pending(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TxStatus::Error(_))
    }

    /// The human-readable message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            TxStatus::Idle => None,
            TxStatus::Pending(m) | TxStatus::Success(m) | TxStatus::Error(m) => Some(m),
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Idle => write!(f, "idle"),
            TxStatus::Pending(m) => write!(f, "pending: {m}"),
            TxStatus::Success(m) => write!(f, "success: {m}"),
            TxStatus::Error(m) => write!(f, "error: {m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(TxStatus::default(), TxStatus::Idle);
        assert!(!TxStatus::default().is_pending());
        assert!(TxStatus::default().message().is_none());
    }

    #[test]
    fn pending_blocks_and_carries_message() {
        let status = TxStatus::Pending("waiting for confirmation".into());
        assert!(status.is_pending());
        assert_eq!(status.message(), Some("waiting for confirmation"));
        assert_eq!(status.to_string(), "pending: waiting for confirmation");
    }
}
