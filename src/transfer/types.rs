//! Transfer request / receipt types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{AccountId, TransferId};

/// Transfer request
///
/// Constructed per call and consumed by exactly one transfer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(from: impl Into<AccountId>, to: impl Into<AccountId>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

/// Proof of a committed transfer
///
/// Balances are the values both accounts held at the instant the pair
/// locks were released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
    pub committed_at: DateTime<Utc>,
}

/// Consistent pair read, taken under both account locks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairBalances {
    pub first: (AccountId, Decimal),
    pub second: (AccountId, Decimal),
}

impl PairBalances {
    /// Sum of both balances, `None` if it exceeds `Decimal::MAX`
    pub fn total(&self) -> Option<Decimal> {
        self.first.1.checked_add(self.second.1)
    }
}
