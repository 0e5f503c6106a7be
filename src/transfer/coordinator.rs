//! Transfer Coordinator
//!
//! Moves funds between two accounts as a single unit. There is no
//! coordinator-wide lock: a transfer holds exactly the two account locks it
//! touches, acquired smaller-id first, so A→B and B→A can never deadlock.
//!
//! Inside the critical section every check runs before the first mutation:
//! source sufficiency, then target overflow, then debit, then credit. A
//! failure therefore never needs a rollback.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::state::TransferState;
use super::stats::TransferStats;
use super::types::{PairBalances, TransferReceipt, TransferRequest};
use crate::account::{Account, BalanceGuard, ensure_positive};
use crate::core_types::{AccountId, TransferId};
use crate::error::{LedgerError, Result};
use crate::notification::{self, NotificationSink};
use crate::registry::AccountRegistry;

/// Both locks of one transfer, acquired in ascending id order
struct PairGuard<'a> {
    source: BalanceGuard<'a>,
    target: BalanceGuard<'a>,
}

impl<'a> PairGuard<'a> {
    /// Caller guarantees `source` and `target` are distinct accounts.
    fn acquire(source: &'a Account, target: &'a Account) -> Self {
        if source.id() < target.id() {
            let source = source.lock();
            let target = target.lock();
            Self { source, target }
        } else {
            let target = target.lock();
            let source = source.lock();
            Self { source, target }
        }
    }
}

/// Per-invocation FSM cursor
struct TransferProgress {
    transfer_id: TransferId,
    state: TransferState,
}

impl TransferProgress {
    fn new(transfer_id: TransferId) -> Self {
        Self {
            transfer_id,
            state: TransferState::Pending,
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transfer transition {} -> {}",
            self.state,
            next
        );
        debug!(
            target: "TRANSFER_FSM",
            transfer_id = %self.transfer_id,
            from = %self.state,
            to = %next,
            "state transition"
        );
        self.state = next;
    }
}

/// Transfer Coordinator - ordered pair locking over a shared registry
pub struct TransferCoordinator {
    registry: Arc<dyn AccountRegistry>,
    sink: Arc<dyn NotificationSink>,
    stats: Arc<TransferStats>,
}

impl TransferCoordinator {
    pub fn new(registry: Arc<dyn AccountRegistry>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_stats(registry, sink, Arc::new(TransferStats::new()))
    }

    pub fn with_stats(
        registry: Arc<dyn AccountRegistry>,
        sink: Arc<dyn NotificationSink>,
        stats: Arc<TransferStats>,
    ) -> Self {
        Self {
            registry,
            sink,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<TransferStats> {
        &self.stats
    }

    /// Transfer `amount` from `from` to `to`
    ///
    /// # Errors
    /// - `InvalidAmount`, `SameAccount`, `AccountNotFound`: rejected before locking
    /// - `InsufficientFunds`: source cannot cover `amount`; nothing mutated
    /// - `Internal`: target balance would overflow; nothing mutated
    pub fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<TransferReceipt> {
        self.execute(&TransferRequest::new(from, to, amount))
    }

    /// Run one transfer request to a terminal state
    pub fn execute(&self, req: &TransferRequest) -> Result<TransferReceipt> {
        let transfer_id = TransferId::new();
        let mut progress = TransferProgress::new(transfer_id);
        progress.advance(TransferState::Validating);

        let (source, target) = match self.resolve(req) {
            Ok(pair) => pair,
            Err(e) => {
                progress.advance(TransferState::Rejected);
                self.stats.incr_rejected();
                warn!(
                    transfer_id = %transfer_id,
                    from = %req.from,
                    to = %req.to,
                    amount = %req.amount,
                    code = e.code(),
                    "Transfer rejected: {}", e
                );
                return Err(e);
            }
        };

        let outcome = {
            let mut pair = PairGuard::acquire(&source, &target);
            progress.advance(TransferState::LockAcquired);
            Self::apply(&mut pair, req.amount, &mut progress)
            // both guards drop here
        };

        match outcome {
            Ok((from_balance, to_balance)) => {
                progress.advance(TransferState::Committed);
                self.stats.incr_committed();
                info!(
                    transfer_id = %transfer_id,
                    from = %req.from,
                    to = %req.to,
                    amount = %req.amount,
                    from_balance = %from_balance,
                    to_balance = %to_balance,
                    "Transfer committed"
                );

                self.notify(
                    transfer_id,
                    &req.from,
                    notification::debit_message(&req.from, req.amount, from_balance),
                );
                self.notify(
                    transfer_id,
                    &req.to,
                    notification::credit_message(&req.to, req.amount, to_balance),
                );

                Ok(TransferReceipt {
                    transfer_id,
                    from: req.from.clone(),
                    to: req.to.clone(),
                    amount: req.amount,
                    from_balance,
                    to_balance,
                    committed_at: Utc::now(),
                })
            }
            Err(e) => {
                progress.advance(TransferState::Aborted);
                self.stats.incr_aborted();
                warn!(
                    transfer_id = %transfer_id,
                    from = %req.from,
                    to = %req.to,
                    amount = %req.amount,
                    code = e.code(),
                    "Transfer aborted: {}", e
                );
                Err(e)
            }
        }
    }

    /// Read two balances under the pair-lock protocol
    ///
    /// No transfer between `a` and `b` can be half-visible in the result.
    pub fn balances(&self, a: &str, b: &str) -> Result<PairBalances> {
        if a == b {
            return Err(LedgerError::SameAccount(AccountId::from(a)));
        }
        let first = self.registry.get(a)?;
        let second = self.registry.get(b)?;
        let pair = PairGuard::acquire(&first, &second);
        Ok(PairBalances {
            first: (first.id().clone(), pair.source.balance()),
            second: (second.id().clone(), pair.target.balance()),
        })
    }

    /// Validation phase, no locks taken
    fn resolve(&self, req: &TransferRequest) -> Result<(Arc<Account>, Arc<Account>)> {
        ensure_positive(req.amount)?;
        if req.from == req.to {
            return Err(LedgerError::SameAccount(req.from.clone()));
        }
        let source = self.registry.get(req.from.as_str())?;
        let target = self.registry.get(req.to.as_str())?;
        // Locking one mutex twice would self-deadlock
        if Arc::ptr_eq(&source, &target) {
            return Err(LedgerError::SameAccount(req.from.clone()));
        }
        Ok((source, target))
    }

    /// Critical section. Returns the post-commit (source, target) balances.
    fn apply(
        pair: &mut PairGuard<'_>,
        amount: Decimal,
        progress: &mut TransferProgress,
    ) -> Result<(Decimal, Decimal)> {
        if let Err(e) = pair.source.ensure_covers(amount) {
            progress.advance(TransferState::InsufficientFunds);
            return Err(e);
        }
        pair.target.credited(amount)?;

        progress.advance(TransferState::Applying);
        let from_balance = pair.source.debit(amount)?;
        let to_balance = pair.target.credit(amount)?;
        Ok((from_balance, to_balance))
    }

    /// Hand one message to the sink. Never fails the transfer.
    fn notify(&self, transfer_id: TransferId, account_id: &AccountId, message: String) {
        if let Err(e) = self.sink.notify(account_id, &message) {
            self.stats.incr_notifications_dropped();
            warn!(
                transfer_id = %transfer_id,
                account_id = %account_id,
                sink = self.sink.name(),
                error = %e,
                "Notification dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotifyError, RecordingNotificationSink};
    use crate::registry::InMemoryAccountRegistry;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct FailingSink;

    impl NotificationSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn notify(&self, _: &AccountId, _: &str) -> std::result::Result<(), NotifyError> {
            Err(NotifyError::Unavailable("mail server down".into()))
        }
    }

    fn setup(
        sink: Arc<dyn NotificationSink>,
        accounts: &[(&str, i64)],
    ) -> (Arc<InMemoryAccountRegistry>, TransferCoordinator) {
        let registry = Arc::new(InMemoryAccountRegistry::new());
        for (id, balance) in accounts {
            registry
                .create(AccountId::from(*id), Decimal::from(*balance))
                .unwrap();
        }
        let coordinator = TransferCoordinator::new(registry.clone(), sink);
        (registry, coordinator)
    }

    #[test]
    fn test_transfer_commits_and_returns_receipt() {
        let recorder = Arc::new(RecordingNotificationSink::new());
        let (registry, coord) = setup(recorder.clone(), &[("A", 1000), ("B", 1000)]);

        let receipt = coord.transfer("A", "B", Decimal::from(500)).unwrap();
        assert_eq!(receipt.from_balance, Decimal::from(500));
        assert_eq!(receipt.to_balance, Decimal::from(1500));
        assert_eq!(registry.get("A").unwrap().balance(), Decimal::from(500));
        assert_eq!(registry.get("B").unwrap().balance(), Decimal::from(1500));

        assert_eq!(
            recorder.messages_for("A"),
            vec![
                "An amount of $ 500 is debited from your account A your current account balance is 500"
            ]
        );
        assert_eq!(recorder.messages_for("B").len(), 1);
        assert_eq!(coord.stats().snapshot().committed, 1);
    }

    #[test]
    fn test_validation_rejects_before_locking() {
        let recorder = Arc::new(RecordingNotificationSink::new());
        let (_registry, coord) = setup(recorder.clone(), &[("A", 1000), ("B", 1000)]);

        assert!(matches!(
            coord.transfer("A", "B", Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            coord.transfer("A", "A", Decimal::ONE),
            Err(LedgerError::SameAccount(_))
        ));
        assert!(matches!(
            coord.transfer("A", "Z", Decimal::ONE),
            Err(LedgerError::AccountNotFound(_))
        ));

        let stats = coord.stats().snapshot();
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.committed, 0);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_insufficient_funds_aborts_without_mutation() {
        let recorder = Arc::new(RecordingNotificationSink::new());
        let (registry, coord) = setup(recorder.clone(), &[("A", 1000), ("B", 1000)]);

        let err = coord.transfer("A", "B", Decimal::from(1001)).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(registry.get("A").unwrap().balance(), Decimal::from(1000));
        assert_eq!(registry.get("B").unwrap().balance(), Decimal::from(1000));
        assert_eq!(coord.stats().snapshot().aborted, 1);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_target_overflow_aborts_without_debit() {
        let registry = Arc::new(InMemoryAccountRegistry::new());
        registry
            .create(AccountId::from("A"), Decimal::from(10))
            .unwrap();
        registry.create(AccountId::from("B"), Decimal::MAX).unwrap();
        let coord = TransferCoordinator::new(registry.clone(), Arc::new(FailingSink));

        let err = coord.transfer("A", "B", Decimal::ONE).unwrap_err();
        assert!(matches!(err, LedgerError::Internal(_)));
        assert_eq!(registry.get("A").unwrap().balance(), Decimal::from(10));
        assert_eq!(registry.get("B").unwrap().balance(), Decimal::MAX);
    }

    #[test]
    fn test_failing_sink_never_rolls_back() {
        let (registry, coord) = setup(Arc::new(FailingSink), &[("A", 100), ("B", 0)]);

        let receipt = coord.transfer("A", "B", Decimal::from(40)).unwrap();
        assert_eq!(receipt.to_balance, Decimal::from(40));
        assert_eq!(registry.get("A").unwrap().balance(), Decimal::from(60));

        let stats = coord.stats().snapshot();
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.notifications_dropped, 2);
    }

    #[test]
    fn test_unrelated_lock_does_not_block_transfer() {
        let (registry, coord) = setup(
            Arc::new(RecordingNotificationSink::new()),
            &[("A", 100), ("B", 100), ("C", 100)],
        );
        let c = registry.get("C").unwrap();
        let _held = c.lock();

        coord.transfer("A", "B", Decimal::from(10)).unwrap();
        assert_eq!(registry.get("B").unwrap().balance(), Decimal::from(110));
    }

    #[test]
    fn test_transfer_waits_for_held_account() {
        let (registry, coord) = setup(
            Arc::new(RecordingNotificationSink::new()),
            &[("A", 100), ("B", 100)],
        );
        let coord = Arc::new(coord);
        let b = registry.get("B").unwrap();
        let held = b.lock();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let coord = Arc::clone(&coord);
            thread::spawn(move || {
                let result = coord.transfer("A", "B", Decimal::from(10));
                tx.send(result.is_ok()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        worker.join().unwrap();
        assert_eq!(b.balance(), Decimal::from(110));
    }

    #[test]
    fn test_pair_balances() {
        let (_registry, coord) = setup(
            Arc::new(RecordingNotificationSink::new()),
            &[("A", 300), ("B", 700)],
        );
        let pair = coord.balances("B", "A").unwrap();
        assert_eq!(pair.first, (AccountId::from("B"), Decimal::from(700)));
        assert_eq!(pair.second, (AccountId::from("A"), Decimal::from(300)));
        assert_eq!(pair.total(), Some(Decimal::from(1000)));

        assert!(matches!(
            coord.balances("A", "A"),
            Err(LedgerError::SameAccount(_))
        ));
    }
}
