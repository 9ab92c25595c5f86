//! # storesync migration
//!
//! Moving objects between stores while peers discover the destination at
//! different times.
//!
//! A store is replicated independently of every other store, and a device
//! may know only some of them. When an object moves from one store to
//! another, each peer learns about it from a deletion whose tombstone name
//! carries the destination store. This crate provides:
//!
//! - [`tombstone`]: the migration tombstone name format
//! - [`AncestorSidResolver`]: the store chain sent alongside a tombstone
//! - [`AdmittedObjectLocator`]: the single live replica of a migrating object
//! - [`EmigrationCoordinator`]: acquiring the destination and pulling the
//!   object there when a peer reports the move
//! - [`ImmigrationCoordinator`]: moving content, versions and child stores
//!   onto the destination copy
//! - [`TreeImmigrator`]: moving a whole subtree on a local move
//! - [`ImmigrantVersionLedger`]: durable record of versions re-issued by
//!   migration
//!
//! ## Invariants
//!
//! - At most one replica of an object id is admitted at any time; a second
//!   one is reported as [`MigrationError::InvariantViolation`]
//! - Every mutation runs in one ambient transaction; a failed immigration
//!   leaves nothing behind and is retried in full
//! - Malformed tombstones are never errors

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ancestors;
mod collaborators;
mod emigration;
mod error;
mod immigration;
pub mod ledger;
mod locator;
mod migrator;
pub mod tombstone;
mod tree;

pub use ancestors::AncestorSidResolver;
pub use collaborators::Collaborators;
pub use emigration::{EmigrationCoordinator, EmigrationOutcome};
pub use error::{MigrationError, MigrationResult};
pub use immigration::ImmigrationCoordinator;
pub use ledger::{ImmigrantTickRow, ImmigrantVersionLedger, LedgerScan};
pub use locator::AdmittedObjectLocator;
pub use migrator::Migrator;
pub use tree::TreeImmigrator;
