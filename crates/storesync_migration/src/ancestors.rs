//! Ancestor store chains for outgoing migration tombstones.

use crate::error::{MigrationError, MigrationResult};
use crate::tombstone;
use std::sync::Arc;
use storesync_core::{CoreError, ObjectId, StoreHierarchy, StoreId};

/// Computes the stores a peer must walk through to reach a migration target.
///
/// When a deletion that carries a migration tombstone is sent to a peer, the
/// message also lists the target's ancestor stores so a peer that does not
/// know the target yet can acquire the stores in between.
pub struct AncestorSidResolver {
    stores: Arc<dyn StoreHierarchy>,
    max_depth: usize,
}

impl AncestorSidResolver {
    /// Creates a resolver that refuses walks deeper than `max_depth`.
    pub fn new(stores: Arc<dyn StoreHierarchy>, max_depth: usize) -> Self {
        Self { stores, max_depth }
    }

    /// Returns the ancestors of the store named in tombstone `name`.
    ///
    /// The chain starts at the target's parent and ends at the root store.
    /// It is empty when `parent` is not the trash, `name` is not a
    /// migration tombstone, or the target store is not known locally.
    pub fn chain_for_tombstone(&self, parent: ObjectId, name: &str) -> MigrationResult<Vec<StoreId>> {
        if parent != ObjectId::TRASH || !tombstone::is_migration_name(name) {
            return Ok(Vec::new());
        }
        let Some(target) = tombstone::decode_target_store(name) else {
            return Ok(Vec::new());
        };
        let Some(mut sidx) = self.stores.sidx_of(target)? else {
            return Ok(Vec::new());
        };

        let mut chain = Vec::new();
        while let Some(parent) = self.stores.parent_of(sidx)? {
            if chain.len() == self.max_depth {
                return Err(MigrationError::invariant(format!(
                    "store {target} is nested deeper than {} levels",
                    self.max_depth
                )));
            }
            let sid = self
                .stores
                .sid_of(parent)?
                .ok_or_else(|| CoreError::store_not_known(parent))?;
            chain.push(sid);
            sidx = parent;
        }
        Ok(chain)
    }
}
