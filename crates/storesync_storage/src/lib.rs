//! # storesync storage
//!
//! Append-only byte logs used by storesync for the state it owns durably
//! (the immigrant version ledger).
//!
//! Backends are **opaque byte stores**: they append, read back and
//! truncate. Record framing, checksums and replay belong to the caller.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and throwaway devices
//! - [`FileBackend`] - A single locked file on disk
//!
//! ## Example
//!
//! ```rust
//! use storesync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut log = InMemoryBackend::new();
//! let offset = log.append(b"row").unwrap();
//! assert_eq!(log.read_at(offset, 3).unwrap(), b"row");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, OpenMode};
pub use memory::InMemoryBackend;
