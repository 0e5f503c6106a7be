//! Notification sinks
//!
//! A sink receives one message per account after a transfer commits. It is
//! called strictly after both account locks are released, and whatever it
//! returns never reaches committed balances.

use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

use crate::core_types::AccountId;

/// Why a notification could not be accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("Notification queue full")]
    QueueFull,

    #[error("Notification dispatcher closed")]
    Closed,
}

/// Post-transfer notification target
///
/// Implementations must be cheap and must not block on account state:
/// the coordinator calls `notify` on the transfer thread.
pub trait NotificationSink: Send + Sync {
    /// Get sink name for logging
    fn name(&self) -> &'static str;

    /// Hand a message for `account_id` to the sink
    fn notify(&self, account_id: &AccountId, message: &str) -> Result<(), NotifyError>;
}

/// Writes every notification to the `NOTIFY` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn notify(&self, account_id: &AccountId, message: &str) -> Result<(), NotifyError> {
        info!(target: "NOTIFY", account_id = %account_id, "{}", message);
        Ok(())
    }
}

/// Discards everything (notifications disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn notify(&self, _account_id: &AccountId, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Keeps every notification in memory, in arrival order
///
/// Used by the test-suite and by embedders that want to inspect what
/// would have been sent.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    received: Mutex<Vec<(AccountId, String)>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn received(&self) -> Vec<(AccountId, String)> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Messages received for one account
    pub fn messages_for(&self, account_id: &str) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|(id, _)| id.as_str() == account_id)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn notify(&self, account_id: &AccountId, message: &str) -> Result<(), NotifyError> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((account_id.clone(), message.to_string()));
        Ok(())
    }
}
