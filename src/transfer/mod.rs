//! Transfer FSM
//!
//! Atomic two-account transfers under concurrent access.
//!
//! # State Machine
//!
//! ```text
//! PENDING → VALIDATING → LOCK_ACQUIRED → APPLYING → COMMITTED
//!               ↓              ↓
//!           REJECTED    INSUFFICIENT_FUNDS → ABORTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Ordered Locking**: the two account locks are taken smaller id first
//! 2. **Check Before Mutate**: every failure is detected before the first write
//! 3. **Notify After Release**: sinks are called with no account lock held

pub mod coordinator;
pub mod state;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use coordinator::TransferCoordinator;
pub use state::TransferState;
pub use stats::{TransferStats, TransferStatsSnapshot};
pub use types::{PairBalances, TransferReceipt, TransferRequest};
