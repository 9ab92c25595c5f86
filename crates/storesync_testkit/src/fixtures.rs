//! Scenario fixtures.
//!
//! [`World`] is one device: an in-memory copy of every collaborator, a
//! [`Migrator`] over them, and a [`SimulatedPeer`] whose fetched objects
//! go through immigration detection.

use crate::hierarchy::MemoryStoreHierarchy;
use crate::meta::MemoryMetaDatabase;
use crate::peer::{RemoteObject, SimulatedPeer};
use crate::physical::MemoryPhysicalStorage;
use crate::versions::MemoryVersionStore;
use std::path::PathBuf;
use std::sync::Arc;
use storesync_core::{
    CausalVersion, ContentAttributes, ContentHash, CoreError, DeviceId, KIndex, MigrationConfig,
    ObjectAttributes, ObjectFlags, ObjectId, ObjectType, Sockid, Soid, Sokid, StoreId, StoreIndex,
    Transaction, TransactionManager,
};
use storesync_migration::{Collaborators, ImmigrantVersionLedger, Migrator};
use storesync_storage::{FileBackend, InMemoryBackend};
use tempfile::TempDir;

/// Content of one branch of a test file.
#[derive(Debug, Clone)]
pub struct Branch {
    /// File bytes.
    pub bytes: Vec<u8>,
    /// Local version of the branch.
    pub version: CausalVersion,
}

impl Branch {
    /// A branch with `bytes` and a single-device version.
    pub fn new(bytes: &[u8], device: DeviceId, tick: u64) -> Self {
        Self {
            bytes: bytes.to_vec(),
            version: CausalVersion::new().with(device, storesync_core::Tick::new(tick)),
        }
    }

    /// Content attributes of this branch.
    pub fn attributes(&self) -> ContentAttributes {
        ContentAttributes {
            length: self.bytes.len() as u64,
            mtime: 1_700_000_000_000,
            hash: ContentHash::of(&self.bytes),
        }
    }
}

/// One simulated device.
pub struct World {
    /// The local device.
    pub device: DeviceId,
    /// The device the simulated peer answers as.
    pub peer_device: DeviceId,
    /// Core context.
    pub tm: Arc<TransactionManager>,
    /// Object metadata.
    pub meta: Arc<MemoryMetaDatabase>,
    /// Store hierarchy.
    pub stores: Arc<MemoryStoreHierarchy>,
    /// Versions.
    pub versions: Arc<MemoryVersionStore>,
    /// Physical storage.
    pub physical: Arc<MemoryPhysicalStorage>,
    /// The peer serving fetches.
    pub peer: Arc<SimulatedPeer>,
    /// Backing log of the ledger.
    pub ledger_log: InMemoryBackend,
    /// Migration engine under test.
    pub migrator: Arc<Migrator>,
    /// Root store id.
    pub root_sid: StoreId,
    /// Root store index.
    pub root: StoreIndex,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with default configuration.
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::new(DeviceId::from_bytes([0xD0; 16])))
    }

    /// Creates a world with `config`.
    pub fn with_config(config: MigrationConfig) -> Self {
        let device = config.local_device;
        let tm = Arc::new(TransactionManager::new());
        let meta = Arc::new(MemoryMetaDatabase::new());
        let stores = Arc::new(MemoryStoreHierarchy::new());
        let versions = Arc::new(MemoryVersionStore::new());
        let physical = Arc::new(MemoryPhysicalStorage::new());
        let peer = Arc::new(SimulatedPeer::new(
            Arc::clone(&tm),
            Arc::clone(&meta),
            Arc::clone(&stores),
        ));

        let root_sid = StoreId::generate();
        let root = stores.add_root(root_sid);
        meta.insert(ObjectAttributes::new(
            Soid::new(root, ObjectId::ROOT),
            ObjectType::Dir,
            ObjectId::ROOT,
            "",
            ObjectFlags::NONE,
        ));

        let collab = Collaborators {
            meta: meta.clone(),
            stores: stores.clone(),
            versions: versions.clone(),
            physical: physical.clone(),
            fetcher: peer.clone(),
        };
        let ledger_log = InMemoryBackend::new();
        let ledger = ImmigrantVersionLedger::open(ledger_log.clone(), &config)
            .expect("Failed to open in-memory ledger");
        let migrator = Arc::new(Migrator::new(config, collab, Arc::new(ledger)));

        let weak = Arc::downgrade(&migrator);
        peer.set_creation_hook(move |txn: &mut Transaction<'_>, oa: &ObjectAttributes| {
            match weak.upgrade() {
                Some(migrator) => migrator
                    .maybe_immigrate(txn, oa)
                    .map(|_| ())
                    .map_err(CoreError::from),
                None => Ok(()),
            }
        });

        Self {
            device,
            peer_device: DeviceId::from_bytes([0xE0; 16]),
            tm,
            meta,
            stores,
            versions,
            physical,
            peer,
            ledger_log,
            migrator,
            root_sid,
            root,
        }
    }

    /// Returns handles on the collaborators.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            meta: self.meta.clone(),
            stores: self.stores.clone(),
            versions: self.versions.clone(),
            physical: self.physical.clone(),
            fetcher: self.peer.clone(),
        }
    }

    /// Creates a store mounted under the root of `parent`, known locally.
    pub fn add_store(&self, parent: StoreIndex, name: &str) -> (StoreId, StoreIndex) {
        let sid = StoreId::generate();
        let anchor = Soid::new(parent, sid.anchor_oid());
        self.meta.insert(ObjectAttributes::new(
            anchor,
            ObjectType::Anchor,
            ObjectId::ROOT,
            name,
            ObjectFlags::NONE,
        ));
        self.physical.add_anchor_root(anchor);
        let sidx = self.stores.add_store(sid, parent);
        self.meta.insert(ObjectAttributes::new(
            Soid::new(sidx, ObjectId::ROOT),
            ObjectType::Dir,
            ObjectId::ROOT,
            "",
            ObjectFlags::NONE,
        ));
        (sid, sidx)
    }

    /// Creates a store the peer has under `parent_sid` but this device
    /// does not know.
    pub fn remote_store(&self, parent_sid: StoreId, name: &str) -> StoreId {
        let sid = StoreId::generate();
        self.peer.publish(
            parent_sid,
            sid.anchor_oid(),
            RemoteObject::new(ObjectType::Anchor, name),
        );
        sid
    }

    /// Creates a directory.
    pub fn add_dir(&self, sidx: StoreIndex, parent: ObjectId, name: &str) -> Soid {
        let soid = Soid::new(sidx, ObjectId::generate());
        self.meta.insert(ObjectAttributes::new(
            soid,
            ObjectType::Dir,
            parent,
            name,
            ObjectFlags::NONE,
        ));
        soid
    }

    /// Creates a file with one branch per element of `branches`.
    pub fn add_file(&self, sidx: StoreIndex, parent: ObjectId, name: &str, branches: &[Branch]) -> Soid {
        let soid = Soid::new(sidx, ObjectId::generate());
        self.add_file_at(soid, parent, name, ObjectFlags::NONE, branches);
        soid
    }

    /// Creates a file replica at `soid`.
    pub fn add_file_at(
        &self,
        soid: Soid,
        parent: ObjectId,
        name: &str,
        flags: ObjectFlags,
        branches: &[Branch],
    ) {
        let mut oa = ObjectAttributes::new(soid, ObjectType::File, parent, name, flags);
        for (i, branch) in branches.iter().enumerate() {
            let kidx = KIndex::new(i as u32);
            oa.branches.insert(kidx, branch.attributes());
            self.versions
                .set_local(Sockid::content(soid, kidx), branch.version.clone());
            self.physical
                .write_content(Sokid::new(soid, kidx), &branch.bytes);
        }
        self.meta.insert(oa);
    }

    /// Returns the attributes of `soid`, panicking if it does not exist.
    pub fn attributes(&self, soid: Soid) -> ObjectAttributes {
        use storesync_core::MetaDatabase;
        self.meta
            .attributes(soid)
            .expect("metadata read failed")
            .unwrap_or_else(|| panic!("{soid} does not exist"))
    }
}

/// A ledger file in a temporary directory, removed on drop.
pub struct TempLedger {
    /// Path of the log file.
    pub path: PathBuf,
    _dir: TempDir,
}

impl Default for TempLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TempLedger {
    /// Creates an empty temporary directory for the ledger.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: dir.path().join("immigrants.log"),
            _dir: dir,
        }
    }

    /// Opens the ledger file. Only one handle may be open at a time.
    pub fn open(&self, config: &MigrationConfig) -> ImmigrantVersionLedger {
        let backend = FileBackend::open(&self.path).expect("Failed to open ledger file");
        ImmigrantVersionLedger::open(backend, config).expect("Failed to replay ledger")
    }
}
