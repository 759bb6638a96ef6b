//! Transfer State Definitions

use std::fmt;

use serde::Serialize;

/// Transfer request lifecycle
///
/// ```text
/// IDLE → VALIDATING → READY → SUBMITTING → SETTLED
///   ↑         │          │          ↓
///   └─────────┘          │        FAILED
///   ↑  (address error)   │          │
///   └────────────────────┴──────────┘  (any edit)
/// ```
///
/// Terminal: SETTLED, FAILED (both return to IDLE on the next edit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    #[default]
    Idle,

    /// Address check in progress
    Validating,

    /// Recipient verified, amount may be submitted
    Ready,

    /// Network call in flight; no other submission may start
    Submitting,

    /// Terminal: network returned a signature
    Settled,

    /// Terminal: network or signing error
    Failed,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Settled | TransferState::Failed)
    }

    /// States an input edit resets to IDLE
    #[inline]
    pub fn is_reset_on_edit(&self) -> bool {
        matches!(
            self,
            TransferState::Ready | TransferState::Settled | TransferState::Failed
        )
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(self, TransferState::Validating | TransferState::Submitting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Idle => "IDLE",
            TransferState::Validating => "VALIDATING",
            TransferState::Ready => "READY",
            TransferState::Submitting => "SUBMITTING",
            TransferState::Settled => "SETTLED",
            TransferState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Settled.is_terminal());
        assert!(TransferState::Failed.is_terminal());

        assert!(!TransferState::Idle.is_terminal());
        assert!(!TransferState::Validating.is_terminal());
        assert!(!TransferState::Ready.is_terminal());
        assert!(!TransferState::Submitting.is_terminal());
    }

    #[test]
    fn test_reset_on_edit_states() {
        assert!(TransferState::Ready.is_reset_on_edit());
        assert!(TransferState::Settled.is_reset_on_edit());
        assert!(TransferState::Failed.is_reset_on_edit());

        assert!(!TransferState::Idle.is_reset_on_edit());
        assert!(!TransferState::Submitting.is_reset_on_edit());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Idle.to_string(), "IDLE");
        assert_eq!(TransferState::Submitting.to_string(), "SUBMITTING");
        assert_eq!(TransferState::default(), TransferState::Idle);
    }

    #[test]
    fn test_serialize() {
        assert_eq!(
            serde_json::to_string(&TransferState::Settled).unwrap(),
            "\"SETTLED\""
        );
    }
}
