//! In-memory version store.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use storesync_core::{CausalVersion, CoreResult, Socid, Sockid, Transaction, VersionStore};

#[derive(Default)]
struct VersionState {
    local: BTreeMap<Sockid, CausalVersion>,
    kml: BTreeMap<Socid, CausalVersion>,
}

/// [`VersionStore`] over in-memory maps.
#[derive(Default)]
pub struct MemoryVersionStore {
    state: Arc<RwLock<VersionState>>,
}

impl MemoryVersionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a local version outside any transaction.
    pub fn set_local(&self, k: Sockid, version: CausalVersion) {
        self.state.write().local.insert(k, version);
    }

    /// Sets a KML version outside any transaction.
    pub fn set_kml(&self, socid: Socid, version: CausalVersion) {
        self.state.write().kml.insert(socid, version);
    }
}

fn replace<K: Ord + Copy + Send + Sync + 'static>(
    txn: &mut Transaction<'_>,
    state: &Arc<RwLock<VersionState>>,
    select: fn(&mut VersionState) -> &mut BTreeMap<K, CausalVersion>,
    key: K,
    change: impl FnOnce(&CausalVersion) -> CausalVersion,
) -> CoreResult<()> {
    let mut guard = state.write();
    let map = select(&mut *guard);
    let before = map.get(&key).cloned().unwrap_or_default();
    let after = change(&before);
    if after.is_zero() {
        map.remove(&key);
    } else {
        map.insert(key, after);
    }
    drop(guard);

    let shared = Arc::clone(state);
    txn.on_rollback(move || {
        let mut guard = shared.write();
        let map = select(&mut *guard);
        if before.is_zero() {
            map.remove(&key);
        } else {
            map.insert(key, before);
        }
    })
}

fn local_map(state: &mut VersionState) -> &mut BTreeMap<Sockid, CausalVersion> {
    &mut state.local
}

fn kml_map(state: &mut VersionState) -> &mut BTreeMap<Socid, CausalVersion> {
    &mut state.kml
}

impl VersionStore for MemoryVersionStore {
    fn local_version(&self, k: Sockid) -> CoreResult<CausalVersion> {
        Ok(self.state.read().local.get(&k).cloned().unwrap_or_default())
    }

    fn add_local_version(
        &self,
        txn: &mut Transaction<'_>,
        k: Sockid,
        version: &CausalVersion,
    ) -> CoreResult<()> {
        replace(txn, &self.state, local_map, k, |v| v.add(version))
    }

    fn delete_local_version(
        &self,
        txn: &mut Transaction<'_>,
        k: Sockid,
        version: &CausalVersion,
    ) -> CoreResult<()> {
        replace(txn, &self.state, local_map, k, |v| v.sub(version))
    }

    fn kml_version(&self, socid: Socid) -> CoreResult<CausalVersion> {
        Ok(self.state.read().kml.get(&socid).cloned().unwrap_or_default())
    }

    fn add_kml_version(
        &self,
        txn: &mut Transaction<'_>,
        socid: Socid,
        version: &CausalVersion,
    ) -> CoreResult<()> {
        replace(txn, &self.state, kml_map, socid, |v| v.add(version))
    }

    fn delete_kml_version(
        &self,
        txn: &mut Transaction<'_>,
        socid: Socid,
        version: &CausalVersion,
    ) -> CoreResult<()> {
        replace(txn, &self.state, kml_map, socid, |v| v.sub(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storesync_core::{DeviceId, KIndex, ObjectId, Soid, StoreIndex, Tick, TransactionManager};

    #[test]
    fn kml_deletion_rolls_back() {
        let versions = MemoryVersionStore::new();
        let socid = Socid::content(Soid::new(StoreIndex::new(1), ObjectId::generate()));
        let d = DeviceId::from_bytes([1; 16]);
        let kml = CausalVersion::new().with(d, Tick::new(4));
        versions.set_kml(socid, kml.clone());
        let tm = TransactionManager::new();

        {
            let mut txn = tm.begin();
            versions.delete_kml_version(&mut txn, socid, &kml).unwrap();
            assert!(versions.kml_version(socid).unwrap().is_zero());
        }
        assert_eq!(versions.kml_version(socid).unwrap(), kml);
    }

    #[test]
    fn local_versions_merge() {
        let versions = MemoryVersionStore::new();
        let k = Sockid::content(Soid::new(StoreIndex::new(1), ObjectId::generate()), KIndex::MASTER);
        let d = DeviceId::from_bytes([1; 16]);
        let tm = TransactionManager::new();
        let mut txn = tm.begin();
        versions
            .add_local_version(&mut txn, k, &CausalVersion::new().with(d, Tick::new(2)))
            .unwrap();
        versions
            .add_local_version(&mut txn, k, &CausalVersion::new().with(d, Tick::new(7)))
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(versions.local_version(k).unwrap().get(d), Tick::new(7));
    }
}
