//! A simulated remote peer.
//!
//! The peer holds a model of objects it has, keyed by store id and object
//! id. A fetch looks the requested component up in that model and applies
//! it locally the way the real download path does: in its own transaction,
//! creating the object and then running the creation hook (immigration
//! detection). Fetching an anchor also joins the store it mounts, unless
//! immigration already brought that store over.

use crate::hierarchy::MemoryStoreHierarchy;
use crate::meta::MemoryMetaDatabase;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storesync_core::{
    CoreError, CoreResult, DependencyFetcher, DeviceId, MetaDatabase, NewObject, ObjectAttributes,
    ObjectFlags, ObjectId, ObjectType, Socid, StoreHierarchy, StoreId, Transaction,
    TransactionManager,
};
use tracing::debug;

/// An object as the peer knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Kind of object.
    pub object_type: ObjectType,
    /// Parent object in the same store.
    pub parent: ObjectId,
    /// Name within the parent.
    pub name: String,
}

impl RemoteObject {
    /// A remote object under the store root.
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            object_type,
            parent: ObjectId::ROOT,
            name: name.into(),
        }
    }
}

/// One call made to the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCall {
    /// Requested component.
    pub socid: Socid,
    /// Peer asked.
    pub peer: DeviceId,
    /// Local component offered for reuse.
    pub hint: Option<Socid>,
}

type CreationHook = Arc<dyn Fn(&mut Transaction<'_>, &ObjectAttributes) -> CoreResult<()> + Send + Sync>;

/// [`DependencyFetcher`] answering from an in-memory remote model.
pub struct SimulatedPeer {
    tm: Arc<TransactionManager>,
    meta: Arc<MemoryMetaDatabase>,
    stores: Arc<MemoryStoreHierarchy>,
    remote: RwLock<HashMap<(StoreId, ObjectId), RemoteObject>>,
    failing: RwLock<HashSet<Socid>>,
    calls: Mutex<Vec<FetchCall>>,
    hook: RwLock<Option<CreationHook>>,
}

impl SimulatedPeer {
    /// Creates a peer applying fetched objects to `meta` and `stores`.
    pub fn new(
        tm: Arc<TransactionManager>,
        meta: Arc<MemoryMetaDatabase>,
        stores: Arc<MemoryStoreHierarchy>,
    ) -> Self {
        Self {
            tm,
            meta,
            stores,
            remote: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            hook: RwLock::new(None),
        }
    }

    /// Installs the hook run after a fetched object is created.
    pub fn set_creation_hook<F>(&self, hook: F)
    where
        F: Fn(&mut Transaction<'_>, &ObjectAttributes) -> CoreResult<()> + Send + Sync + 'static,
    {
        *self.hook.write() = Some(Arc::new(hook));
    }

    /// Makes the peer hold `object` as `oid` in store `sid`.
    pub fn publish(&self, sid: StoreId, oid: ObjectId, object: RemoteObject) {
        self.remote.write().insert((sid, oid), object);
    }

    /// Makes fetches of `socid` fail with a retryable error.
    pub fn fail_fetch(&self, socid: Socid) {
        self.failing.write().insert(socid);
    }

    /// Every fetch made so far, in order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    /// Number of fetches made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn apply(&self, socid: Socid, object: RemoteObject) -> CoreResult<()> {
        let soid = socid.soid;
        let mut txn = self.tm.begin();
        self.meta.create_object(
            &mut txn,
            NewObject {
                soid,
                object_type: object.object_type,
                parent: object.parent,
                name: object.name,
                flags: ObjectFlags::NONE,
            },
        )?;
        let created = self
            .meta
            .attributes(soid)?
            .ok_or(CoreError::ObjectNotFound { soid })?;

        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            hook(&mut txn, &created)?;
        }

        if created.is_anchor() {
            let child = soid.oid.anchored_store();
            if self.stores.sidx_of(child)?.is_none() {
                let sidx = self.stores.join(&mut txn, child, soid.sidx)?;
                debug!(store = %child, sidx = %sidx, "joined store through anchor");
            }
        }
        txn.commit()?;
        Ok(())
    }
}

impl DependencyFetcher for SimulatedPeer {
    fn fetch(&self, socid: Socid, peer: DeviceId, hint: Option<Socid>) -> CoreResult<()> {
        self.calls.lock().push(FetchCall { socid, peer, hint });
        if self.failing.read().contains(&socid) {
            return Err(CoreError::fetch_failed(socid, "simulated transfer failure"));
        }

        let sid = self
            .stores
            .sid_of(socid.soid.sidx)?
            .ok_or_else(|| CoreError::store_not_known(socid.soid.sidx))?;
        let object = self
            .remote
            .read()
            .get(&(sid, socid.soid.oid))
            .cloned()
            .ok_or_else(|| CoreError::fetch_failed(socid, "peer does not have the object"))?;

        if self.meta.attributes(socid.soid)?.is_some() {
            debug!(socid = %socid, "fetched object already present");
            return Ok(());
        }
        self.apply(socid, object)
    }
}
