//! In-memory object metadata.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use storesync_core::{
    ContentAttributes, ContentHash, CoreError, CoreResult, DeletionCause, KIndex, MetaDatabase,
    NewObject, ObjectAttributes, ObjectFlags, ObjectId, ObjectType, Soid, StoreIndex, Transaction,
};
use storesync_migration::tombstone;

#[derive(Default)]
struct MetaState {
    objects: BTreeMap<Soid, ObjectAttributes>,
    branch_creations: usize,
    deletions: Vec<(Soid, DeletionCause)>,
}

/// [`MetaDatabase`] over a map of attributes.
///
/// Deleting an object moves it into the trash, expels it and names it like
/// the real metadata database does: the bare object id for ordinary
/// deletions, a migration tombstone for emigrations.
#[derive(Default)]
pub struct MemoryMetaDatabase {
    state: Arc<RwLock<MetaState>>,
}

impl MemoryMetaDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts attributes outside any transaction.
    pub fn insert(&self, oa: ObjectAttributes) {
        self.state.write().objects.insert(oa.soid, oa);
    }

    /// Number of `create_branch` calls that were not rolled back.
    pub fn branch_creations(&self) -> usize {
        self.state.read().branch_creations
    }

    /// Deletions that were not rolled back, in order.
    pub fn deletions(&self) -> Vec<(Soid, DeletionCause)> {
        self.state.read().deletions.clone()
    }

    /// Number of replicas.
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Returns true if there are no replicas.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        change: impl FnOnce(&mut MetaState, Option<ObjectAttributes>) -> CoreResult<Option<ObjectAttributes>>,
    ) -> CoreResult<()> {
        let mut state = self.state.write();
        let before = state.objects.get(&soid).cloned();
        let branch_creations = state.branch_creations;
        let deletions = state.deletions.len();

        match change(&mut *state, before.clone())? {
            Some(after) => state.objects.insert(soid, after),
            None => state.objects.remove(&soid),
        };
        drop(state);

        let shared = Arc::clone(&self.state);
        txn.on_rollback(move || {
            let mut state = shared.write();
            match before {
                Some(oa) => state.objects.insert(soid, oa),
                None => state.objects.remove(&soid),
            };
            state.branch_creations = branch_creations;
            state.deletions.truncate(deletions);
        })
    }
}

fn existing(soid: Soid, oa: Option<ObjectAttributes>) -> CoreResult<ObjectAttributes> {
    oa.ok_or(CoreError::ObjectNotFound { soid })
}

impl MetaDatabase for MemoryMetaDatabase {
    fn attributes(&self, soid: Soid) -> CoreResult<Option<ObjectAttributes>> {
        Ok(self.state.read().objects.get(&soid).cloned())
    }

    fn children(&self, soid: Soid) -> CoreResult<Vec<ObjectId>> {
        Ok(self
            .state
            .read()
            .objects
            .values()
            .filter(|oa| {
                oa.soid.sidx == soid.sidx && oa.parent == soid.oid && oa.soid.oid != soid.oid
            })
            .map(|oa| oa.soid.oid)
            .collect())
    }

    fn stores_holding(&self, oid: ObjectId, excluding: StoreIndex) -> CoreResult<Vec<StoreIndex>> {
        Ok(self
            .state
            .read()
            .objects
            .keys()
            .filter(|soid| soid.oid == oid && soid.sidx != excluding)
            .map(|soid| soid.sidx)
            .collect())
    }

    fn create_object(&self, txn: &mut Transaction<'_>, object: NewObject) -> CoreResult<()> {
        self.update(txn, object.soid, |_, before| {
            if before.is_some() {
                return Err(CoreError::invalid_operation(format!(
                    "{} already exists",
                    object.soid
                )));
            }
            Ok(Some(ObjectAttributes::new(
                object.soid,
                object.object_type,
                object.parent,
                object.name,
                object.flags,
            )))
        })
    }

    fn move_object(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        parent: ObjectId,
        name: &str,
    ) -> CoreResult<()> {
        self.update(txn, soid, |_, before| {
            let mut oa = existing(soid, before)?;
            oa.parent = parent;
            oa.name = name.to_string();
            Ok(Some(oa))
        })
    }

    fn delete_object(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        cause: DeletionCause,
    ) -> CoreResult<()> {
        self.update(txn, soid, |state, before| {
            let mut oa = existing(soid, before)?;
            oa.parent = ObjectId::TRASH;
            oa.name = match cause {
                DeletionCause::Ordinary => soid.oid.to_text(),
                DeletionCause::Emigrated { target } => tombstone::encode(soid.oid, target),
            };
            oa.flags = oa.flags.with(ObjectFlags::EXPELLED_ORIGINAL);
            oa.branches.clear();
            state.deletions.push((soid, cause));
            Ok(Some(oa))
        })
    }

    fn create_branch(&self, txn: &mut Transaction<'_>, soid: Soid, kidx: KIndex) -> CoreResult<()> {
        self.update(txn, soid, |state, before| {
            let mut oa = existing(soid, before)?;
            if oa.object_type != ObjectType::File {
                return Err(CoreError::invalid_operation(format!("{soid} is not a file")));
            }
            oa.branches.entry(kidx).or_insert(ContentAttributes {
                length: 0,
                mtime: 0,
                hash: ContentHash::of(&[]),
            });
            state.branch_creations += 1;
            Ok(Some(oa))
        })
    }

    fn set_content(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        kidx: KIndex,
        content: ContentAttributes,
    ) -> CoreResult<()> {
        self.update(txn, soid, |_, before| {
            let mut oa = existing(soid, before)?;
            let branch = oa
                .branches
                .get_mut(&kidx)
                .ok_or_else(|| CoreError::invalid_operation(format!("{soid} has no branch {kidx}")))?;
            *branch = content;
            Ok(Some(oa))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storesync_core::{StoreId, TransactionManager};

    fn file(sidx: u32) -> ObjectAttributes {
        ObjectAttributes::new(
            Soid::new(StoreIndex::new(sidx), ObjectId::from_bytes([4; 16])),
            ObjectType::File,
            ObjectId::ROOT,
            "a.txt",
            ObjectFlags::NONE,
        )
    }

    #[test]
    fn emigration_deletion_writes_tombstone() {
        let meta = MemoryMetaDatabase::new();
        let oa = file(1);
        meta.insert(oa.clone());
        let tm = TransactionManager::new();
        let target = StoreId::generate();

        let mut txn = tm.begin();
        meta.delete_object(&mut txn, oa.soid, DeletionCause::Emigrated { target })
            .unwrap();
        txn.commit().unwrap();

        let deleted = meta.attributes(oa.soid).unwrap().unwrap();
        assert_eq!(deleted.parent, ObjectId::TRASH);
        assert!(deleted.is_expelled());
        assert_eq!(tombstone::decode_target_store(&deleted.name), Some(target));
    }

    #[test]
    fn rollback_restores_everything() {
        let meta = MemoryMetaDatabase::new();
        let oa = file(1);
        meta.insert(oa.clone());
        let tm = TransactionManager::new();
        {
            let mut txn = tm.begin();
            meta.create_branch(&mut txn, oa.soid, KIndex::MASTER).unwrap();
            meta.delete_object(&mut txn, oa.soid, DeletionCause::Ordinary)
                .unwrap();
        }
        assert_eq!(meta.attributes(oa.soid).unwrap(), Some(oa));
        assert_eq!(meta.branch_creations(), 0);
        assert!(meta.deletions().is_empty());
    }

    #[test]
    fn stores_holding_excludes_one_store() {
        let meta = MemoryMetaDatabase::new();
        meta.insert(file(1));
        meta.insert(file(2));
        meta.insert(file(3));
        let oid = ObjectId::from_bytes([4; 16]);
        let holders = meta.stores_holding(oid, StoreIndex::new(2)).unwrap();
        assert_eq!(holders, vec![StoreIndex::new(1), StoreIndex::new(3)]);
    }
}
