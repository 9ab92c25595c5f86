//! Physical storage of file content and anchor folders.

use crate::error::CoreResult;
use crate::transaction::Transaction;
use crate::types::{Soid, Sokid};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Moves physical data between replicas.
///
/// Paths are computed by the implementation from the references; callers
/// never see them. Each move registers its reverse move with the
/// transaction. Undo is best effort: a reverse move that fails during
/// rollback is logged at `warn` and leaves the data at the destination,
/// and the rollback carries on with the remaining undo actions.
pub trait PhysicalStorage: Send + Sync {
    /// Moves the content file of branch `from` to branch `to`.
    fn move_content(&self, txn: &mut Transaction<'_>, from: Sokid, to: Sokid) -> CoreResult<()>;

    /// Moves the backing folder of anchor `from` to anchor `to`.
    fn move_anchor_root(&self, txn: &mut Transaction<'_>, from: Soid, to: Soid) -> CoreResult<()>;
}

/// [`PhysicalStorage`] on a local directory.
///
/// Layout under the root:
///
/// ```text
/// content/<sidx>/<oid>.<kidx>   file content, one file per branch
/// anchors/<sidx>/<oid>/         folder backing a mounted child store
/// ```
#[derive(Debug, Clone)]
pub struct LocalPhysicalStorage {
    root: PathBuf,
}

impl LocalPhysicalStorage {
    /// Uses `root` as the storage directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of a branch's content file.
    #[must_use]
    pub fn content_path(&self, k: Sokid) -> PathBuf {
        self.root
            .join("content")
            .join(k.soid.sidx.as_u32().to_string())
            .join(format!("{}.{}", k.soid.oid, k.kidx.0))
    }

    /// Returns the path of an anchor's backing folder.
    #[must_use]
    pub fn anchor_path(&self, soid: Soid) -> PathBuf {
        self.root
            .join("anchors")
            .join(soid.sidx.as_u32().to_string())
            .join(soid.oid.to_text())
    }

    /// Writes branch content outside any transaction.
    pub fn write_content(&self, k: Sokid, bytes: &[u8]) -> CoreResult<()> {
        let path = self.content_path(k);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn rename(&self, txn: &mut Transaction<'_>, from: PathBuf, to: PathBuf) -> CoreResult<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            )
            .into());
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&from, &to)?;
        debug!(from = %from.display(), to = %to.display(), "moved physical object");

        txn.on_rollback(move || {
            if let Err(err) = fs::rename(&to, &from) {
                warn!(from = %to.display(), to = %from.display(), error = %err, "failed to undo physical move");
            }
        })
    }
}

impl PhysicalStorage for LocalPhysicalStorage {
    fn move_content(&self, txn: &mut Transaction<'_>, from: Sokid, to: Sokid) -> CoreResult<()> {
        self.rename(txn, self.content_path(from), self.content_path(to))
    }

    fn move_anchor_root(&self, txn: &mut Transaction<'_>, from: Soid, to: Soid) -> CoreResult<()> {
        self.rename(txn, self.anchor_path(from), self.anchor_path(to))
    }
}
