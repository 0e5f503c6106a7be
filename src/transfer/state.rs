//! Transfer FSM State Definitions
//!
//! Every transfer walks this machine exactly once, inside a single call.
//! Nothing is persisted: the state exists only for tracing and for the
//! transition assertions in the coordinator.

use std::fmt;

use serde::Serialize;

/// Transfer FSM States
///
/// Terminal states: COMMITTED, REJECTED, ABORTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    /// Request received, nothing checked yet
    Pending,

    /// Amount, ids and account existence being checked (no locks held)
    Validating,

    /// Both account locks held in ascending id order
    LockAcquired,

    /// Debit and credit being applied under both locks
    Applying,

    /// Terminal: both sides applied, locks released
    Committed,

    /// Terminal: failed validation, no lock was ever taken
    Rejected,

    /// Source could not cover the amount (locks still held, nothing mutated)
    InsufficientFunds,

    /// Terminal: locks released without mutating either balance
    Aborted,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Committed | TransferState::Rejected | TransferState::Aborted
        )
    }

    /// Check if account locks are held in this state
    #[inline]
    pub fn holds_locks(&self) -> bool {
        matches!(
            self,
            TransferState::LockAcquired | TransferState::Applying | TransferState::InsufficientFunds
        )
    }

    /// Legal FSM edges
    ///
    /// ```text
    /// PENDING → VALIDATING → LOCK_ACQUIRED → APPLYING → COMMITTED
    ///               ↓              ↓
    ///           REJECTED    INSUFFICIENT_FUNDS → ABORTED
    ///                              ↓
    ///                           ABORTED (internal fault)
    /// ```
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (*self, next),
            (Pending, Validating)
                | (Validating, LockAcquired)
                | (Validating, Rejected)
                | (LockAcquired, Applying)
                | (LockAcquired, InsufficientFunds)
                | (LockAcquired, Aborted)
                | (InsufficientFunds, Aborted)
                | (Applying, Committed)
        )
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Pending => "PENDING",
            TransferState::Validating => "VALIDATING",
            TransferState::LockAcquired => "LOCK_ACQUIRED",
            TransferState::Applying => "APPLYING",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
            TransferState::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferState::Aborted => "ABORTED",
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
        assert!(TransferState::Committed.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(TransferState::Aborted.is_terminal());

        assert!(!TransferState::Pending.is_terminal());
        assert!(!TransferState::Validating.is_terminal());
        assert!(!TransferState::LockAcquired.is_terminal());
        assert!(!TransferState::Applying.is_terminal());
        assert!(!TransferState::InsufficientFunds.is_terminal());
    }

    #[test]
    fn test_lock_holding_states() {
        assert!(TransferState::LockAcquired.holds_locks());
        assert!(TransferState::Applying.holds_locks());
        assert!(TransferState::InsufficientFunds.holds_locks());

        assert!(!TransferState::Validating.holds_locks());
        assert!(!TransferState::Committed.holds_locks());
        assert!(!TransferState::Aborted.holds_locks());
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            TransferState::Pending,
            TransferState::Validating,
            TransferState::LockAcquired,
            TransferState::Applying,
            TransferState::Committed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_partial_commit_edges() {
        // Once applying, the only way out is COMMITTED
        assert!(!TransferState::Applying.can_transition_to(TransferState::Aborted));
        assert!(!TransferState::Applying.can_transition_to(TransferState::Rejected));
        // Rejection never follows lock acquisition
        assert!(!TransferState::LockAcquired.can_transition_to(TransferState::Rejected));
        // Terminal states are sinks
        assert!(!TransferState::Committed.can_transition_to(TransferState::Pending));
        assert!(!TransferState::Aborted.can_transition_to(TransferState::Validating));
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Pending.to_string(), "PENDING");
        assert_eq!(TransferState::LockAcquired.to_string(), "LOCK_ACQUIRED");
        assert_eq!(
            TransferState::InsufficientFunds.to_string(),
            "INSUFFICIENT_FUNDS"
        );
    }
}
