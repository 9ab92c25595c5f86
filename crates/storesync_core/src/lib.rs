//! # storesync core
//!
//! Shared vocabulary of the storesync replication engine.
//!
//! This crate provides:
//! - Store, object and device identifiers and the store-local references
//!   built from them (`Soid`, `Socid`, `Sokid`, `Sockid`)
//! - Object attributes and the opaque [`CausalVersion`] type
//! - Ambient transactions with guaranteed rollback-or-commit
//! - The collaborator interfaces the migration engine drives (metadata,
//!   store hierarchy, versions, dependency fetch, physical storage)
//! - A filesystem-backed [`LocalPhysicalStorage`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attr;
mod config;
mod error;
mod fetch;
mod hierarchy;
mod id;
mod meta;
mod physical;
pub mod transaction;
mod types;
mod version;
mod versions;

pub use attr::{ContentAttributes, ContentHash, ObjectAttributes, ObjectFlags};
pub use config::MigrationConfig;
pub use error::{CoreError, CoreResult};
pub use fetch::DependencyFetcher;
pub use hierarchy::StoreHierarchy;
pub use id::{DeviceId, IdParseError, ObjectId, StoreId, ID_TEXT_LEN};
pub use meta::{DeletionCause, MetaDatabase, NewObject};
pub use physical::{LocalPhysicalStorage, PhysicalStorage};
pub use transaction::{Transaction, TransactionId, TransactionManager};
pub use types::{ComponentKind, KIndex, ObjectType, Socid, Sockid, Soid, Sokid, StoreIndex, Tick};
pub use version::CausalVersion;
pub use versions::VersionStore;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
