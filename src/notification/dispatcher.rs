//! Asynchronous notification dispatch
//!
//! ```text
//! transfer thread ──push──▶ ArrayQueue<Notification> ──pop──▶ worker ──▶ inner sink
//! ```
//!
//! `notify` never blocks: a full queue drops the event and reports
//! `QueueFull`. The worker drains whatever is queued before it exits.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use tracing::{debug, error, warn};

use super::sink::{NotificationSink, NotifyError};
use crate::core_types::AccountId;

const WORKER_THREAD_NAME: &str = "ledger-notify";
const IDLE_SPINS: u32 = 100;
const IDLE_PARK: Duration = Duration::from_millis(1);

/// One queued message
#[derive(Debug, Clone)]
struct Notification {
    account_id: AccountId,
    message: String,
}

/// Shutdown signal for graceful worker termination
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    shutdown: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// State shared between producers and the worker
struct Shared {
    queue: ArrayQueue<Notification>,
    shutdown: ShutdownSignal,
    inner: Arc<dyn NotificationSink>,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn deliver(&self, notification: Notification) {
        match self
            .inner
            .notify(&notification.account_id, &notification.message)
        {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    sink = self.inner.name(),
                    account_id = %notification.account_id,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}

/// Bounded queue + background worker in front of another sink
pub struct NotificationDispatcher {
    shared: Arc<Shared>,
    worker: Thread,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    /// Start the worker thread
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(inner: Arc<dyn NotificationSink>, capacity: usize) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: ArrayQueue::new(capacity.max(1)),
            shutdown: ShutdownSignal::new(),
            inner,
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(&worker_shared))?;

        debug!(
            sink = shared.inner.name(),
            capacity = shared.queue.capacity(),
            "Notification dispatcher started"
        );

        Ok(Self {
            shared,
            worker: handle.thread().clone(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Messages handed to the inner sink successfully
    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Messages the inner sink refused
    pub fn failed(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// Messages still waiting in the queue
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stop accepting, drain the queue, join the worker
    ///
    /// Idempotent. Later `notify` calls return `Closed`. A `notify` racing
    /// with this call may be accepted and still never delivered.
    pub fn shutdown(&self) {
        self.shared.shutdown.request_shutdown();
        self.worker.unpark();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Notification worker panicked");
            } else {
                debug!(
                    delivered = self.delivered(),
                    failed = self.failed(),
                    "Notification dispatcher stopped"
                );
            }
        }
    }
}

impl NotificationSink for NotificationDispatcher {
    fn name(&self) -> &'static str {
        "dispatcher"
    }

    fn notify(&self, account_id: &AccountId, message: &str) -> Result<(), NotifyError> {
        if self.shared.shutdown.is_shutdown_requested() {
            return Err(NotifyError::Closed);
        }
        self.shared
            .queue
            .push(Notification {
                account_id: account_id.clone(),
                message: message.to_string(),
            })
            .map_err(|_| NotifyError::QueueFull)?;
        self.worker.unpark();
        Ok(())
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    let mut spin_count = 0u32;
    loop {
        if let Some(notification) = shared.queue.pop() {
            shared.deliver(notification);
            spin_count = 0;
            continue;
        }

        // Queue observed empty after the flag: nothing can be left behind
        if shared.shutdown.is_shutdown_requested() {
            while let Some(notification) = shared.queue.pop() {
                shared.deliver(notification);
            }
            break;
        }

        spin_count += 1;
        if spin_count > IDLE_SPINS {
            thread::park_timeout(IDLE_PARK);
            spin_count = 0;
        } else {
            std::hint::spin_loop();
        }
    }
}
