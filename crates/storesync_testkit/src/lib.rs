//! # storesync testkit
//!
//! Test utilities for storesync.
//!
//! This crate provides:
//! - In-memory implementations of every collaborator the migration engine
//!   drives, each undoing its changes when the transaction rolls back
//! - A simulated peer that serves fetches from a remote object model
//! - The [`World`] fixture wiring all of it to a [`storesync_migration::Migrator`]
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storesync_testkit::prelude::*;
//!
//! #[test]
//! fn file_moves() {
//!     let world = World::new();
//!     let (_, store) = world.add_store(world.root, "shared");
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod hierarchy;
pub mod meta;
pub mod peer;
pub mod physical;
pub mod versions;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::hierarchy::*;
    pub use crate::meta::*;
    pub use crate::peer::*;
    pub use crate::physical::*;
    pub use crate::versions::*;
}

pub use fixtures::*;
pub use generators::*;
pub use hierarchy::*;
pub use meta::*;
pub use peer::*;
pub use physical::*;
pub use versions::*;
