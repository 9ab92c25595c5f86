//! In-memory physical storage.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storesync_core::{CoreResult, PhysicalStorage, Soid, Sokid, Transaction};

#[derive(Default)]
struct PhysicalState {
    content: BTreeMap<Sokid, Vec<u8>>,
    anchors: BTreeSet<Soid>,
}

/// [`PhysicalStorage`] holding content bytes and anchor folders in memory.
///
/// [`fail_moves`](Self::fail_moves) makes every later move fail, for
/// exercising rollback.
#[derive(Default)]
pub struct MemoryPhysicalStorage {
    state: Arc<RwLock<PhysicalState>>,
    failing: AtomicBool,
}

fn not_found(what: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{what} has no physical data"))
}

impl MemoryPhysicalStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores branch content.
    pub fn write_content(&self, k: Sokid, bytes: &[u8]) {
        self.state.write().content.insert(k, bytes.to_vec());
    }

    /// Returns branch content.
    pub fn content(&self, k: Sokid) -> Option<Vec<u8>> {
        self.state.read().content.get(&k).cloned()
    }

    /// Creates the folder backing an anchor.
    pub fn add_anchor_root(&self, soid: Soid) {
        self.state.write().anchors.insert(soid);
    }

    /// Returns true if the anchor has a backing folder.
    pub fn has_anchor_root(&self, soid: Soid) -> bool {
        self.state.read().anchors.contains(&soid)
    }

    /// Makes later moves fail (or succeed again).
    pub fn fail_moves(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check_failing(&self) -> CoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected move failure").into());
        }
        Ok(())
    }
}

impl PhysicalStorage for MemoryPhysicalStorage {
    fn move_content(&self, txn: &mut Transaction<'_>, from: Sokid, to: Sokid) -> CoreResult<()> {
        self.check_failing()?;
        let mut state = self.state.write();
        if state.content.contains_key(&to) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("{to} exists")).into());
        }
        let bytes = state.content.remove(&from).ok_or_else(|| not_found(from))?;
        state.content.insert(to, bytes);
        drop(state);

        let shared = Arc::clone(&self.state);
        txn.on_rollback(move || {
            let mut state = shared.write();
            if let Some(bytes) = state.content.remove(&to) {
                state.content.insert(from, bytes);
            }
        })
    }

    fn move_anchor_root(&self, txn: &mut Transaction<'_>, from: Soid, to: Soid) -> CoreResult<()> {
        self.check_failing()?;
        let mut state = self.state.write();
        if !state.anchors.remove(&from) {
            return Err(not_found(from).into());
        }
        state.anchors.insert(to);
        drop(state);

        let shared = Arc::clone(&self.state);
        txn.on_rollback(move || {
            let mut state = shared.write();
            state.anchors.remove(&to);
            state.anchors.insert(from);
        })
    }
}
