//! Transaction state.

use crate::error::{CoreError, CoreResult};
use parking_lot::MutexGuard;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Unique identifier for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and accepts mutations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

type UndoAction = Box<dyn FnOnce() + Send>;
type CommitAction = Box<dyn FnOnce() -> CoreResult<()> + Send>;

/// Counters shared with the manager.
#[derive(Debug, Default)]
pub(crate) struct Outcomes {
    pub(crate) committed: AtomicU64,
    pub(crate) rolled_back: AtomicU64,
}

/// An active transaction on the core context.
///
/// Holds the core lock for its whole lifetime. Undo actions run in reverse
/// registration order on rollback; commit actions run in registration
/// order on commit.
pub struct Transaction<'m> {
    id: TransactionId,
    state: TransactionState,
    undo: Vec<UndoAction>,
    commit_actions: Vec<CommitAction>,
    outcomes: &'m Outcomes,
    _core: MutexGuard<'m, ()>,
}

impl<'m> Transaction<'m> {
    pub(crate) fn new(id: TransactionId, outcomes: &'m Outcomes, core: MutexGuard<'m, ()>) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            undo: Vec::new(),
            commit_actions: Vec::new(),
            outcomes,
            _core: core,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Registers an action that reverts a change already applied.
    pub fn on_rollback(&mut self, action: impl FnOnce() + Send + 'static) -> CoreResult<()> {
        self.ensure_active()?;
        self.undo.push(Box::new(action));
        Ok(())
    }

    /// Registers a durable write performed at commit.
    ///
    /// If the action fails the transaction is rolled back instead.
    pub fn on_commit(
        &mut self,
        action: impl FnOnce() -> CoreResult<()> + Send + 'static,
    ) -> CoreResult<()> {
        self.ensure_active()?;
        self.commit_actions.push(Box::new(action));
        Ok(())
    }

    /// Returns the number of registered undo actions.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.undo.len()
    }

    /// Commits the transaction.
    pub fn commit(mut self) -> CoreResult<TransactionId> {
        self.ensure_active()?;
        let actions = std::mem::take(&mut self.commit_actions);
        for action in actions {
            if let Err(err) = action() {
                debug!(txn = %self.id, error = %err, "commit action failed, rolling back");
                self.unwind();
                return Err(err);
            }
        }
        self.undo.clear();
        self.state = TransactionState::Committed;
        self.outcomes.committed.fetch_add(1, Ordering::SeqCst);
        Ok(self.id)
    }

    /// Rolls the transaction back.
    pub fn rollback(mut self) {
        self.unwind();
    }

    fn unwind(&mut self) {
        if self.state != TransactionState::Active {
            return;
        }
        self.commit_actions.clear();
        while let Some(action) = self.undo.pop() {
            action();
        }
        self.state = TransactionState::RolledBack;
        self.outcomes.rolled_back.fetch_add(1, Ordering::SeqCst);
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::RolledBack => Err(CoreError::invalid_operation(
                "transaction already rolled back",
            )),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.is_active() {
            debug!(txn = %self.id, changes = self.undo.len(), "dropping open transaction, rolling back");
            self.unwind();
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("changes", &self.undo.len())
            .field("commit_actions", &self.commit_actions.len())
            .finish()
    }
}
