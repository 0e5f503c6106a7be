//! Ledger - caller-facing facade
//!
//! Wires the registry, the transfer coordinator and the notification sink
//! together. A `Ledger` is `Send + Sync`; share it with `Arc` and call it
//! from as many threads as needed.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::account::{Account, lock_all_ordered};
use crate::config::LedgerConfig;
use crate::core_types::AccountId;
use crate::error::{LedgerError, Result};
use crate::notification::{
    NotificationDispatcher, NotificationSink, NullNotificationSink, TracingNotificationSink,
};
use crate::registry::{AccountRegistry, InMemoryAccountRegistry};
use crate::transfer::{
    PairBalances, TransferCoordinator, TransferReceipt, TransferRequest, TransferStatsSnapshot,
};

/// Globally consistent view of every account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub balances: BTreeMap<AccountId, Decimal>,
    pub total: Decimal,
}

impl LedgerSnapshot {
    pub fn get(&self, id: &str) -> Option<Decimal> {
        self.balances.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

pub struct Ledger {
    registry: Arc<dyn AccountRegistry>,
    coordinator: TransferCoordinator,
    dispatcher: Option<Arc<NotificationDispatcher>>,
}

impl Ledger {
    /// In-memory ledger that logs notifications synchronously
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingNotificationSink))
    }

    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_parts(Arc::new(InMemoryAccountRegistry::new()), sink)
    }

    pub fn with_parts(registry: Arc<dyn AccountRegistry>, sink: Arc<dyn NotificationSink>) -> Self {
        let coordinator = TransferCoordinator::new(Arc::clone(&registry), sink);
        Self {
            registry,
            coordinator,
            dispatcher: None,
        }
    }

    /// Ledger with notifications behind a bounded queue and worker thread
    ///
    /// # Errors
    /// `Internal` if the notification worker cannot be spawned.
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        if !config.notifications_enabled {
            info!("Notifications disabled");
            return Ok(Self::with_sink(Arc::new(NullNotificationSink)));
        }

        let dispatcher = NotificationDispatcher::spawn(
            Arc::new(TracingNotificationSink),
            config.notification_queue_size,
        )
        .map_err(|e| LedgerError::Internal(format!("failed to spawn notification worker: {}", e)))?;
        let dispatcher = Arc::new(dispatcher);

        let mut ledger = Self::with_sink(dispatcher.clone());
        ledger.dispatcher = Some(dispatcher);
        Ok(ledger)
    }

    /// Create an account; `None` starts it at zero
    ///
    /// # Errors
    /// - `DuplicateAccountId` if `id` already exists
    /// - `InvalidAccountId` if `id` is blank
    /// - `NegativeBalance` if `initial_balance < 0`
    pub fn create_account(
        &self,
        id: impl Into<AccountId>,
        initial_balance: Option<Decimal>,
    ) -> Result<Arc<Account>> {
        self.registry
            .create(id.into(), initial_balance.unwrap_or(Decimal::ZERO))
    }

    pub fn get_account(&self, id: &str) -> Result<Arc<Account>> {
        self.registry.get(id)
    }

    pub fn get_balance(&self, id: &str) -> Result<Decimal> {
        Ok(self.registry.get(id)?.balance())
    }

    pub fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<TransferReceipt> {
        self.coordinator.transfer(from, to, amount)
    }

    pub fn execute(&self, req: &TransferRequest) -> Result<TransferReceipt> {
        self.coordinator.execute(req)
    }

    /// Consistent read of two balances
    pub fn balances(&self, a: &str, b: &str) -> Result<PairBalances> {
        self.coordinator.balances(a, b)
    }

    /// Lock every account in id order and read all balances at once
    ///
    /// Accounts created while the snapshot is being taken may be missing.
    ///
    /// # Errors
    /// `Internal` if the summed balances exceed the `Decimal` range.
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let mut accounts = self.registry.accounts();
        let guards = lock_all_ordered(&mut accounts);

        let mut balances = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for guard in &guards {
            total = total.checked_add(guard.balance()).ok_or_else(|| {
                LedgerError::Internal("ledger total overflows decimal range".into())
            })?;
            balances.insert(guard.id().clone(), guard.balance());
        }
        Ok(LedgerSnapshot { balances, total })
    }

    pub fn stats(&self) -> TransferStatsSnapshot {
        self.coordinator.stats().snapshot()
    }

    pub fn account_count(&self) -> usize {
        self.registry.len()
    }

    /// Flush queued notifications and stop the worker (if any)
    pub fn shutdown(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown();
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingNotificationSink;

    #[test]
    fn test_create_account_defaults_to_zero() {
        let ledger = Ledger::new();
        ledger.create_account("A", None).unwrap();
        assert_eq!(ledger.get_balance("A").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_duplicate_and_missing() {
        let ledger = Ledger::new();
        ledger.create_account("A", Some(Decimal::from(5))).unwrap();
        assert_eq!(
            ledger
                .create_account("A", Some(Decimal::ONE))
                .unwrap_err()
                .code(),
            "DUPLICATE_ACCOUNT_ID"
        );
        assert_eq!(ledger.get_balance("A").unwrap(), Decimal::from(5));
        assert_eq!(ledger.get_balance("B").unwrap_err().code(), "ACCOUNT_NOT_FOUND");
    }

    #[test]
    fn test_snapshot_is_sorted_and_totals() {
        let ledger = Ledger::with_sink(Arc::new(RecordingNotificationSink::new()));
        ledger.create_account("C", Some(Decimal::from(3))).unwrap();
        ledger.create_account("A", Some(Decimal::from(1))).unwrap();
        ledger.create_account("B", Some(Decimal::new(25, 1))).unwrap();

        let snap = ledger.snapshot().unwrap();
        let ids: Vec<&str> = snap.balances.keys().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(snap.total, Decimal::new(65, 1));
        assert_eq!(snap.get("B"), Some(Decimal::new(25, 1)));
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_snapshot_total_overflow_is_internal_error() {
        let ledger = Ledger::with_sink(Arc::new(RecordingNotificationSink::new()));
        ledger.create_account("A", Some(Decimal::MAX)).unwrap();
        ledger.create_account("B", Some(Decimal::ONE)).unwrap();

        let err = ledger.snapshot().unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        // balances stay readable one by one
        assert_eq!(ledger.get_balance("A").unwrap(), Decimal::MAX);
        let pair = ledger.balances("A", "B").unwrap();
        assert_eq!(pair.total(), None);
    }

    #[test]
    fn test_from_config_with_dispatcher_flushes_on_shutdown() {
        let config = LedgerConfig {
            notification_queue_size: 16,
            workers: 1,
            notifications_enabled: true,
        };
        let ledger = Ledger::from_config(&config).unwrap();
        ledger.create_account("A", Some(Decimal::from(10))).unwrap();
        ledger.create_account("B", None).unwrap();

        ledger.transfer("A", "B", Decimal::from(4)).unwrap();
        ledger.shutdown();

        assert_eq!(ledger.get_balance("B").unwrap(), Decimal::from(4));
        assert_eq!(ledger.stats().committed, 1);
        assert_eq!(ledger.stats().notifications_dropped, 0);

        // Closed dispatcher drops, transfer still commits
        ledger.transfer("A", "B", Decimal::ONE).unwrap();
        assert_eq!(ledger.stats().notifications_dropped, 2);
        assert_eq!(ledger.get_balance("A").unwrap(), Decimal::from(5));
    }

    #[test]
    fn test_from_config_disabled() {
        let config = LedgerConfig {
            notifications_enabled: false,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::from_config(&config).unwrap();
        ledger.create_account("A", Some(Decimal::ONE)).unwrap();
        ledger.create_account("B", None).unwrap();
        ledger.transfer("A", "B", Decimal::ONE).unwrap();
        assert_eq!(ledger.stats().notifications_dropped, 0);
    }
}
