//! Ambient transactions.
//!
//! Every mutation performed by the migration engine happens inside one
//! [`Transaction`]. Collaborators register undo actions as they mutate and
//! commit actions for durable writes; the transaction either runs all
//! commit actions or unwinds every undo action, never a mix.
//!
//! - **Atomicity**: rollback restores every registered change
//! - **Serialization**: one transaction at a time per core context
//! - **Scope-bound**: dropping an uncommitted transaction rolls it back

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{Transaction, TransactionId, TransactionState};
