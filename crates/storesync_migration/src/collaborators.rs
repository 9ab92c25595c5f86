//! Services the migration engine drives.

use std::fmt;
use std::sync::Arc;
use storesync_core::{
    DependencyFetcher, MetaDatabase, PhysicalStorage, StoreHierarchy, VersionStore,
};

/// Handles on the per-device services migration reads from and mutates.
///
/// Cloning is cheap; every coordinator keeps its own copy.
#[derive(Clone)]
pub struct Collaborators {
    /// Object metadata of every store.
    pub meta: Arc<dyn MetaDatabase>,
    /// Store id bindings and parentage.
    pub stores: Arc<dyn StoreHierarchy>,
    /// Local and known-missing versions.
    pub versions: Arc<dyn VersionStore>,
    /// Content files and anchor folders.
    pub physical: Arc<dyn PhysicalStorage>,
    /// Download path for remote components.
    pub fetcher: Arc<dyn DependencyFetcher>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
