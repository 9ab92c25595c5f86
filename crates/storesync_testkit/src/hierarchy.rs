//! In-memory store hierarchy.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use storesync_core::{CoreError, CoreResult, StoreHierarchy, StoreId, StoreIndex, Transaction};

#[derive(Default, Clone)]
struct HierarchyState {
    by_sid: HashMap<StoreId, StoreIndex>,
    by_sidx: BTreeMap<StoreIndex, StoreId>,
    parents: BTreeMap<StoreIndex, StoreIndex>,
    root: Option<StoreIndex>,
    next: u32,
}

impl HierarchyState {
    fn bind(&mut self, sid: StoreId, parent: Option<StoreIndex>) -> StoreIndex {
        self.next += 1;
        let sidx = StoreIndex::new(self.next);
        self.by_sid.insert(sid, sidx);
        self.by_sidx.insert(sidx, sid);
        match parent {
            Some(parent) => {
                self.parents.insert(sidx, parent);
            }
            None => self.root = Some(sidx),
        }
        sidx
    }
}

/// [`StoreHierarchy`] over in-memory maps.
///
/// Store indices are handed out densely from 1 and never reused.
#[derive(Default)]
pub struct MemoryStoreHierarchy {
    state: Arc<RwLock<HierarchyState>>,
}

impl MemoryStoreHierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the root store.
    pub fn add_root(&self, sid: StoreId) -> StoreIndex {
        self.state.write().bind(sid, None)
    }

    /// Binds `sid` under `parent` outside any transaction.
    pub fn add_store(&self, sid: StoreId, parent: StoreIndex) -> StoreIndex {
        self.state.write().bind(sid, Some(parent))
    }

    /// Joins `sid` under `parent`, forgetting it again on rollback.
    pub fn join(
        &self,
        txn: &mut Transaction<'_>,
        sid: StoreId,
        parent: StoreIndex,
    ) -> CoreResult<StoreIndex> {
        let mut state = self.state.write();
        if state.by_sid.contains_key(&sid) {
            return Err(CoreError::invalid_operation(format!("store {sid} already joined")));
        }
        let sidx = state.bind(sid, Some(parent));
        drop(state);

        let shared = Arc::clone(&self.state);
        txn.on_rollback(move || {
            let mut state = shared.write();
            state.by_sid.remove(&sid);
            state.by_sidx.remove(&sidx);
            state.parents.remove(&sidx);
        })?;
        Ok(sidx)
    }

    /// Returns the root store, if bound.
    pub fn root(&self) -> Option<StoreIndex> {
        self.state.read().root
    }

    /// Number of known stores.
    pub fn len(&self) -> usize {
        self.state.read().by_sidx.len()
    }

    /// Returns true if no store is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StoreHierarchy for MemoryStoreHierarchy {
    fn sidx_of(&self, sid: StoreId) -> CoreResult<Option<StoreIndex>> {
        Ok(self.state.read().by_sid.get(&sid).copied())
    }

    fn sid_of(&self, sidx: StoreIndex) -> CoreResult<Option<StoreId>> {
        Ok(self.state.read().by_sidx.get(&sidx).copied())
    }

    fn parent_of(&self, sidx: StoreIndex) -> CoreResult<Option<StoreIndex>> {
        let state = self.state.read();
        if !state.by_sidx.contains_key(&sidx) {
            return Err(CoreError::store_not_known(sidx));
        }
        Ok(state.parents.get(&sidx).copied())
    }

    fn is_root(&self, sidx: StoreIndex) -> CoreResult<bool> {
        Ok(self.state.read().root == Some(sidx))
    }

    fn reparent(
        &self,
        txn: &mut Transaction<'_>,
        child: StoreIndex,
        from: StoreIndex,
        to: StoreIndex,
    ) -> CoreResult<()> {
        let mut state = self.state.write();
        let current = state.parents.get(&child).copied();
        if current != Some(from) {
            return Err(CoreError::invariant(format!(
                "store {child} is not parented under {from}"
            )));
        }
        state.parents.insert(child, to);
        drop(state);

        let shared = Arc::clone(&self.state);
        txn.on_rollback(move || {
            shared.write().parents.insert(child, from);
        })
    }
}
