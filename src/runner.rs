//! Batch runner - drive a list of transfers through a shared ledger
//!
//! ```text
//! ┌────────────┐    ┌──────────────────────────┐    ┌──────────┐
//! │ transfers  │───▶│ ArrayQueue<TransferReq>  │───▶│ worker×N │──▶ Ledger::execute
//! └────────────┘    └──────────────────────────┘    └──────────┘
//! ```
//!
//! Workers pop until the queue is empty; the queue is fully loaded before
//! the first worker starts, so an empty pop means the batch is done.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossbeam_queue::ArrayQueue;
use serde::Serialize;
use tracing::{debug, info};

use crate::ledger::Ledger;
use crate::transfer::TransferRequest;

/// Outcome counts for one worker or a whole batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub submitted: usize,
    pub committed: usize,
    /// Failed transfers keyed by `LedgerError::code()`
    pub failures: BTreeMap<&'static str, usize>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    fn merge(&mut self, other: BatchReport) {
        self.submitted += other.submitted;
        self.committed += other.committed;
        for (code, count) in other.failures {
            *self.failures.entry(code).or_default() += count;
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch: submitted={}, committed={}, failed={}",
            self.submitted,
            self.committed,
            self.failed()
        )?;
        for (code, count) in &self.failures {
            write!(f, " {}={}", code, count)?;
        }
        write!(f, " elapsed={:.2?}", self.elapsed)
    }
}

/// Execute `transfers` on `workers` threads and wait for all of them
///
/// Order between transfers is whatever the scheduler produces; only the
/// ledger invariants are guaranteed.
pub fn run_batch(
    ledger: &Arc<Ledger>,
    transfers: Vec<TransferRequest>,
    workers: usize,
) -> Result<BatchReport> {
    let start = Instant::now();
    let workers = workers.max(1);
    let queue = Arc::new(ArrayQueue::new(transfers.len().max(1)));
    for req in transfers {
        queue
            .push(req)
            .map_err(|_| anyhow!("transfer queue sized too small"))?;
    }
    info!(transfers = queue.len(), workers, "Batch started");

    let handles: Vec<JoinHandle<BatchReport>> = (0..workers)
        .map(|worker_id| {
            let ledger = Arc::clone(ledger);
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name(format!("ledger-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, &ledger, &queue))
        })
        .collect::<std::io::Result<_>>()?;

    let mut report = BatchReport::default();
    for handle in handles {
        let partial = handle
            .join()
            .map_err(|_| anyhow!("batch worker panicked"))?;
        report.merge(partial);
    }
    report.elapsed = start.elapsed();

    info!(
        submitted = report.submitted,
        committed = report.committed,
        failed = report.failed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Batch finished"
    );
    Ok(report)
}

fn run_worker(
    worker_id: usize,
    ledger: &Ledger,
    queue: &ArrayQueue<TransferRequest>,
) -> BatchReport {
    let mut report = BatchReport::default();
    while let Some(req) = queue.pop() {
        report.submitted += 1;
        match ledger.execute(&req) {
            Ok(_) => report.committed += 1,
            Err(e) => *report.failures.entry(e.code()).or_default() += 1,
        }
    }
    debug!(
        worker_id,
        submitted = report.submitted,
        committed = report.committed,
        "Batch worker done"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NullNotificationSink;
    use rust_decimal::Decimal;

    #[test]
    fn test_run_batch_counts_outcomes() {
        let ledger = Arc::new(Ledger::with_sink(Arc::new(NullNotificationSink)));
        ledger.create_account("A", Some(Decimal::from(100))).unwrap();
        ledger.create_account("B", Some(Decimal::from(100))).unwrap();

        let mut transfers: Vec<TransferRequest> = (0..50)
            .map(|_| TransferRequest::new("A", "B", Decimal::ONE))
            .collect();
        transfers.push(TransferRequest::new("A", "A", Decimal::ONE));
        transfers.push(TransferRequest::new("A", "Z", Decimal::ONE));
        transfers.push(TransferRequest::new("B", "A", Decimal::from(10_000)));

        let report = run_batch(&ledger, transfers, 4).unwrap();
        assert_eq!(report.submitted, 53);
        assert_eq!(report.committed, 50);
        assert_eq!(report.failures.get("SAME_ACCOUNT"), Some(&1));
        assert_eq!(report.failures.get("ACCOUNT_NOT_FOUND"), Some(&1));
        assert_eq!(report.failures.get("INSUFFICIENT_FUNDS"), Some(&1));

        assert_eq!(ledger.get_balance("A").unwrap(), Decimal::from(50));
        assert_eq!(ledger.get_balance("B").unwrap(), Decimal::from(150));
    }

    #[test]
    fn test_empty_batch() {
        let ledger = Arc::new(Ledger::new());
        let report = run_batch(&ledger, Vec::new(), 3).unwrap();
        assert_eq!(report.submitted, 0);
        assert_eq!(report.failed(), 0);
    }
}
