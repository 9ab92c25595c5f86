//! Transaction manager.

use crate::transaction::state::{Outcomes, Transaction, TransactionId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out transactions on the single core context.
///
/// Only one transaction is open at a time: [`begin`](Self::begin) blocks
/// until the previous one commits, rolls back or is dropped. Opening a
/// second transaction on the same thread while one is open deadlocks, so
/// code that already holds a transaction passes it down instead.
#[derive(Debug)]
pub struct TransactionManager {
    next_txid: AtomicU64,
    core: Mutex<()>,
    outcomes: Outcomes,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Creates a transaction manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_txid: AtomicU64::new(1),
            core: Mutex::new(()),
            outcomes: Outcomes::default(),
        }
    }

    /// Begins a transaction, waiting for the core context.
    pub fn begin(&self) -> Transaction<'_> {
        let guard = self.core.lock();
        let id = TransactionId(self.next_txid.fetch_add(1, Ordering::SeqCst));
        Transaction::new(id, &self.outcomes, guard)
    }

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    ///
    /// `E` only needs to absorb [`crate::CoreError`] so commit failures can
    /// be reported through the caller's own error type.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<crate::CoreError>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.rollback();
                Err(err)
            }
        }
    }

    /// Number of transactions committed so far.
    #[must_use]
    pub fn committed_count(&self) -> u64 {
        self.outcomes.committed.load(Ordering::SeqCst)
    }

    /// Number of transactions rolled back so far.
    #[must_use]
    pub fn rolled_back_count(&self) -> u64 {
        self.outcomes.rolled_back.load(Ordering::SeqCst)
    }
}
