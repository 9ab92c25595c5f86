//! Error types for the migration engine.

use storesync_core::CoreError;
use thiserror::Error;

/// Result type for migration operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors raised by the migration engine.
///
/// Absence conditions (no source copy, no common ancestor, already
/// migrated) are not errors; they come back as ordinary return values.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// A collaborator failed. The triggering update may be retried.
    #[error(transparent)]
    Core(CoreError),

    /// A cross-store invariant is broken, e.g. two admitted copies of one
    /// object. Never recovered locally.
    #[error("migration invariant violated: {message}")]
    InvariantViolation {
        /// Description of the broken invariant.
        message: String,
    },
}

impl MigrationError {
    /// Creates an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns true if the error indicates corruption elsewhere in the system.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Returns true if re-running the triggering update may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Core(err) => err.is_retryable(),
            Self::InvariantViolation { .. } => false,
        }
    }
}

impl From<CoreError> for MigrationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvariantViolation { message } => Self::InvariantViolation { message },
            other => Self::Core(other),
        }
    }
}

impl From<MigrationError> for CoreError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::Core(inner) => inner,
            MigrationError::InvariantViolation { message } => CoreError::invariant(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storesync_core::{ObjectId, Socid, Soid, StoreIndex};

    #[test]
    fn core_invariants_are_lifted() {
        let err: MigrationError = CoreError::invariant("two admitted copies").into();
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn fetch_failures_are_retryable() {
        let socid = Socid::meta(Soid::new(StoreIndex::new(1), ObjectId::ROOT));
        let err: MigrationError = CoreError::fetch_failed(socid, "peer offline").into();
        assert!(!err.is_fatal());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("peer offline"));
    }

    #[test]
    fn converts_back_into_core() {
        let core: CoreError = MigrationError::invariant("type mismatch").into();
        assert!(core.is_invariant_violation());
    }
}
