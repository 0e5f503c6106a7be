//! Pairwise Ledger - concurrent in-memory accounts and transfers
//!
//! Every account owns its own lock. A transfer takes exactly the two locks
//! it needs, smaller [`AccountId`] first, checks everything, then debits and
//! credits. There is no global lock and no rollback path.
//!
//! # Modules
//!
//! - [`core_types`] - `AccountId` (the lock order) and `TransferId`
//! - [`error`] - `LedgerError` with stable codes
//! - [`account`] - balance cell with a private mutex
//! - [`registry`] - id → account store with atomic create-if-absent
//! - [`transfer`] - coordinator, FSM states, stats
//! - [`notification`] - post-commit sinks and the queued dispatcher
//! - [`ledger`] - caller-facing facade
//! - [`config`] / [`logging`] - YAML config and tracing setup
//! - [`csv_io`] / [`runner`] - fixture loading and the threaded batch runner

// Core types - must be first!
pub mod core_types;
pub mod error;

// Ledger components
pub mod account;
pub mod ledger;
pub mod notification;
pub mod registry;
pub mod transfer;

// Ambient
pub mod config;
pub mod csv_io;
pub mod logging;
pub mod runner;

// Convenient re-exports at crate root
pub use account::Account;
pub use core_types::{AccountId, TransferId};
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerSnapshot};
pub use notification::{
    NotificationDispatcher, NotificationSink, NotifyError, NullNotificationSink,
    RecordingNotificationSink, TracingNotificationSink,
};
pub use registry::{AccountRegistry, InMemoryAccountRegistry};
pub use transfer::{
    PairBalances, TransferCoordinator, TransferReceipt, TransferRequest, TransferState,
    TransferStats, TransferStatsSnapshot,
};
