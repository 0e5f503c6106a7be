//! Post-transfer notifications
//!
//! Fire-and-forget, best-effort. The coordinator formats one message per
//! account after a commit and hands it to a [`NotificationSink`]; failures
//! are logged and counted, never propagated.

pub mod dispatcher;
pub mod sink;

pub use dispatcher::{NotificationDispatcher, ShutdownSignal};
pub use sink::{
    NotificationSink, NotifyError, NullNotificationSink, RecordingNotificationSink,
    TracingNotificationSink,
};

use rust_decimal::Decimal;

use crate::core_types::AccountId;

/// Message for the debited (source) account
///
/// Amounts print with the scale they carry: `500` stays `500`, `500.0`
/// stays `500.0`. Nothing is rounded through a float.
pub fn debit_message(account_id: &AccountId, amount: Decimal, balance: Decimal) -> String {
    format!(
        "An amount of $ {} is debited from your account {} your current account balance is {}",
        amount, account_id, balance
    )
}

/// Message for the credited (target) account
pub fn credit_message(account_id: &AccountId, amount: Decimal, balance: Decimal) -> String {
    format!(
        "An amount of $ {} is credited in your account {} your current account balance is {}",
        amount, account_id, balance
    )
}
