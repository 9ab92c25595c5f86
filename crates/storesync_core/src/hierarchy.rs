//! Store hierarchy interface.

use crate::error::CoreResult;
use crate::id::StoreId;
use crate::transaction::Transaction;
use crate::types::StoreIndex;

/// Store id bindings and store parentage on this device.
///
/// Parentage forms a tree rooted at the root store; a store is parented
/// under the store holding its anchor.
pub trait StoreHierarchy: Send + Sync {
    /// Returns the local index of `sid`, if the store is known here.
    fn sidx_of(&self, sid: StoreId) -> CoreResult<Option<StoreIndex>>;

    /// Returns the store id bound to `sidx`.
    fn sid_of(&self, sidx: StoreIndex) -> CoreResult<Option<StoreId>>;

    /// Returns the parent of `sidx`; `None` for the root store.
    fn parent_of(&self, sidx: StoreIndex) -> CoreResult<Option<StoreIndex>>;

    /// Returns true if `sidx` is the root store.
    fn is_root(&self, sidx: StoreIndex) -> CoreResult<bool>;

    /// Moves `child` from under `from` to under `to`.
    fn reparent(
        &self,
        txn: &mut Transaction<'_>,
        child: StoreIndex,
        from: StoreIndex,
        to: StoreIndex,
    ) -> CoreResult<()>;
}
