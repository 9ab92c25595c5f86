//! Error types for storesync core.

use crate::types::{Socid, Soid};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by collaborators and core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Log storage error.
    #[error("storage error: {0}")]
    Storage(#[from] storesync_storage::StorageError),

    /// I/O error from physical storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding or decoding of a persisted record failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// An object expected to exist is missing.
    #[error("object not found: {soid}")]
    ObjectNotFound {
        /// The missing object.
        soid: Soid,
    },

    /// A store index has no binding on this device.
    #[error("store not known locally: {store}")]
    StoreNotKnown {
        /// Description of the store (index or id).
        store: String,
    },

    /// A dependency could not be fetched from a peer.
    #[error("fetch of {socid} failed: {message}")]
    FetchFailed {
        /// The component that was requested.
        socid: Socid,
        /// Description of the failure.
        message: String,
        /// Whether a later attempt may succeed.
        retryable: bool,
    },

    /// A cross-store invariant does not hold. Never recovered locally.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the broken invariant.
        message: String,
    },

    /// Transaction was rolled back.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for the rollback.
        reason: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The immigrant ledger log is damaged before its tail.
    #[error("ledger corruption at offset {offset}: {message}")]
    LedgerCorruption {
        /// Offset of the damaged frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates a retryable fetch failure.
    pub fn fetch_failed(socid: Socid, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            socid,
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a store-not-known error.
    pub fn store_not_known(store: impl ToString) -> Self {
        Self::StoreNotKnown {
            store: store.to_string(),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a correctness bug elsewhere.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Returns true if retrying the triggering update may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { retryable, .. } => *retryable,
            Self::Io(_) | Self::Storage(_) | Self::TransactionAborted { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::types::{ComponentKind, StoreIndex};

    #[test]
    fn classification() {
        let socid = Socid::new(
            Soid::new(StoreIndex::new(3), ObjectId::ROOT),
            ComponentKind::Meta,
        );
        assert!(CoreError::fetch_failed(socid, "peer went away").is_retryable());
        assert!(!CoreError::invariant("two admitted copies").is_retryable());
        assert!(CoreError::invariant("x").is_invariant_violation());
        assert!(!CoreError::invalid_operation("x").is_invariant_violation());
    }

    #[test]
    fn display_mentions_component() {
        let socid = Socid::new(
            Soid::new(StoreIndex::new(7), ObjectId::TRASH),
            ComponentKind::Content,
        );
        let text = CoreError::fetch_failed(socid, "timeout").to_string();
        assert!(text.contains("7"));
        assert!(text.contains("timeout"));
    }
}
