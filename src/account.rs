//! Account - a balance cell that owns its own lock
//!
//! This is the SINGLE place where balances change.
//!
//! # Enforcement Strategy:
//! 1. The balance sits behind a private `Mutex` - no direct access
//! 2. All mutations return Result - errors are explicit
//! 3. Checked decimal arithmetic - overflow is an error, never a wrap
//! 4. Every mutation is one assignment after validation, so a failed call
//!    leaves the balance exactly as it was
//!
//! Callers use `debit`/`credit`, which take and release the lock themselves.
//! The transfer coordinator needs two accounts held at once; it gets scoped
//! [`BalanceGuard`]s through crate-private methods and never sees the mutex.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use crate::core_types::AccountId;
use crate::error::{LedgerError, Result};

/// A ledger account
///
/// # Invariants (enforced by private fields):
/// - `id` is immutable after creation
/// - `balance >= 0` whenever the lock is not held
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    balance: Mutex<Decimal>,
}

impl Account {
    /// Create an account with a starting balance
    ///
    /// # Errors
    /// - `InvalidAccountId` if the id is blank
    /// - `NegativeBalance` if `initial_balance < 0`
    pub fn new(id: AccountId, initial_balance: Decimal) -> Result<Self> {
        if id.is_blank() {
            return Err(LedgerError::InvalidAccountId);
        }
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeBalance(initial_balance));
        }
        Ok(Self {
            id,
            balance: Mutex::new(initial_balance),
        })
    }

    #[inline]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Current balance (consistent single-account read)
    pub fn balance(&self) -> Decimal {
        self.lock().balance()
    }

    /// Withdraw `amount`, returning the new balance
    ///
    /// Check-and-subtract happens under this account's lock.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `InsufficientFunds` if the balance would go negative (balance unchanged)
    pub fn debit(&self, amount: Decimal) -> Result<Decimal> {
        self.lock().debit(amount)
    }

    /// Deposit `amount`, returning the new balance
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `Internal` on decimal overflow (balance unchanged)
    pub fn credit(&self, amount: Decimal) -> Result<Decimal> {
        self.lock().credit(amount)
    }

    /// Acquire this account's lock.
    ///
    /// A poisoned lock is recovered: no mutation can be observed half-done,
    /// so the guarded decimal is always a valid committed balance.
    pub(crate) fn lock(&self) -> BalanceGuard<'_> {
        let cell = self.balance.lock().unwrap_or_else(PoisonError::into_inner);
        BalanceGuard { id: &self.id, cell }
    }
}

/// Reject non-positive amounts
#[inline]
pub(crate) fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Exclusive access to one account's balance for the guard's lifetime
pub(crate) struct BalanceGuard<'a> {
    id: &'a AccountId,
    cell: MutexGuard<'a, Decimal>,
}

impl BalanceGuard<'_> {
    #[inline]
    pub(crate) fn id(&self) -> &AccountId {
        self.id
    }

    #[inline]
    pub(crate) fn balance(&self) -> Decimal {
        *self.cell
    }

    /// Fail with `InsufficientFunds` unless the balance covers `amount`.
    /// Does not mutate.
    pub(crate) fn ensure_covers(&self, amount: Decimal) -> Result<()> {
        let available = *self.cell;
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: self.id.clone(),
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Balance after crediting `amount`, without applying it
    pub(crate) fn credited(&self, amount: Decimal) -> Result<Decimal> {
        self.cell.checked_add(amount).ok_or_else(|| {
            LedgerError::Internal(format!("balance overflow crediting account {}", self.id))
        })
    }

    pub(crate) fn debit(&mut self, amount: Decimal) -> Result<Decimal> {
        ensure_positive(amount)?;
        self.ensure_covers(amount)?;
        let next = self.cell.checked_sub(amount).ok_or_else(|| {
            LedgerError::Internal(format!("balance underflow debiting account {}", self.id))
        })?;
        *self.cell = next;
        Ok(next)
    }

    pub(crate) fn credit(&mut self, amount: Decimal) -> Result<Decimal> {
        ensure_positive(amount)?;
        let next = self.credited(amount)?;
        *self.cell = next;
        Ok(next)
    }
}

/// Lock a set of accounts in ascending id order.
///
/// The returned guards are in id order. Duplicate accounts (same id) are
/// locked once.
pub(crate) fn lock_all_ordered(accounts: &mut Vec<Arc<Account>>) -> Vec<BalanceGuard<'_>> {
    accounts.sort_by(|a, b| a.id().cmp(b.id()));
    accounts.dedup_by(|a, b| a.id() == b.id());
    accounts.iter().map(|account| account.lock()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, balance: i64) -> Account {
        Account::new(AccountId::from(id), Decimal::from(balance)).unwrap()
    }

    #[test]
    fn test_new_rejects_blank_id() {
        let result = Account::new(AccountId::from("  "), Decimal::ZERO);
        assert_eq!(result.unwrap_err(), LedgerError::InvalidAccountId);
    }

    #[test]
    fn test_new_rejects_negative_balance() {
        let result = Account::new(AccountId::from("A"), Decimal::from(-1));
        assert_eq!(
            result.unwrap_err(),
            LedgerError::NegativeBalance(Decimal::from(-1))
        );
    }

    #[test]
    fn test_debit() {
        let acc = account("A", 1000);
        assert_eq!(acc.debit(Decimal::from(400)).unwrap(), Decimal::from(600));
        assert_eq!(acc.balance(), Decimal::from(600));
    }

    #[test]
    fn test_debit_to_exactly_zero() {
        let acc = account("A", 1000);
        assert_eq!(acc.debit(Decimal::from(1000)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_debit_insufficient() {
        let acc = account("A", 1000);
        let err = acc.debit(Decimal::from(1001)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: AccountId::from("A"),
                requested: Decimal::from(1001),
                available: Decimal::from(1000),
            }
        );
        assert_eq!(acc.balance(), Decimal::from(1000)); // Unchanged
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let acc = account("A", 1000);
        assert!(matches!(
            acc.debit(Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            acc.credit(Decimal::from(-5)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(acc.balance(), Decimal::from(1000));
    }

    #[test]
    fn test_credit_keeps_decimal_precision() {
        let acc = account("A", 0);
        acc.credit(Decimal::new(10, 2)).unwrap(); // 0.10
        acc.credit(Decimal::new(20, 2)).unwrap(); // 0.20
        assert_eq!(acc.balance(), Decimal::new(30, 2));
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let acc = Account::new(AccountId::from("A"), Decimal::MAX).unwrap();
        let err = acc.credit(Decimal::ONE).unwrap_err();
        assert!(matches!(err, LedgerError::Internal(_)));
        assert_eq!(acc.balance(), Decimal::MAX);
    }

    #[test]
    fn test_guard_checks_do_not_mutate() {
        let acc = account("A", 50);
        let guard = acc.lock();
        assert!(guard.ensure_covers(Decimal::from(50)).is_ok());
        assert!(guard.ensure_covers(Decimal::from(51)).is_err());
        assert_eq!(guard.credited(Decimal::from(5)).unwrap(), Decimal::from(55));
        assert_eq!(guard.balance(), Decimal::from(50));
    }

    #[test]
    fn test_lock_all_ordered_sorts_and_dedups() {
        let b = Arc::new(account("B", 2));
        let a = Arc::new(account("A", 1));
        let mut accounts = vec![Arc::clone(&b), Arc::clone(&a), Arc::clone(&b)];
        let guards = lock_all_ordered(&mut accounts);
        let ids: Vec<&str> = guards.iter().map(|g| g.id().as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let acc = Arc::new(account("A", 100));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| acc.debit(Decimal::ONE).is_ok())
                        .count()
                })
            })
            .collect();

        let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(succeeded, 100);
        assert_eq!(acc.balance(), Decimal::ZERO);
    }
}
