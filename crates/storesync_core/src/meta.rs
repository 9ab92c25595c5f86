//! Object metadata database interface.

use crate::attr::{ContentAttributes, ObjectAttributes, ObjectFlags};
use crate::error::CoreResult;
use crate::id::{ObjectId, StoreId};
use crate::transaction::Transaction;
use crate::types::{KIndex, ObjectType, Soid, StoreIndex};

/// Why an object is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionCause {
    /// Ordinary user or remote deletion.
    Ordinary,
    /// The object moved to another store. The tombstone name carries the
    /// destination so downstream peers can follow the move.
    Emigrated {
        /// Store the object moved to.
        target: StoreId,
    },
}

/// Description of an object to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    /// Replica to create.
    pub soid: Soid,
    /// Kind of object.
    pub object_type: ObjectType,
    /// Parent object in the same store.
    pub parent: ObjectId,
    /// Name within the parent.
    pub name: String,
    /// Initial flags.
    pub flags: ObjectFlags,
}

/// Per-store object metadata, shared by every store on the device.
///
/// Mutations take the ambient transaction and register their own undo.
pub trait MetaDatabase: Send + Sync {
    /// Returns the attributes of `soid`, if the replica exists.
    fn attributes(&self, soid: Soid) -> CoreResult<Option<ObjectAttributes>>;

    /// Returns the children of `soid` within its store.
    fn children(&self, soid: Soid) -> CoreResult<Vec<ObjectId>>;

    /// Returns every store holding a replica of `oid`, except `excluding`.
    fn stores_holding(&self, oid: ObjectId, excluding: StoreIndex) -> CoreResult<Vec<StoreIndex>>;

    /// Creates a replica.
    fn create_object(&self, txn: &mut Transaction<'_>, object: NewObject) -> CoreResult<()>;

    /// Renames and reparents a replica within its store.
    fn move_object(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        parent: ObjectId,
        name: &str,
    ) -> CoreResult<()>;

    /// Deletes a replica, leaving a tombstone in the trash.
    fn delete_object(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        cause: DeletionCause,
    ) -> CoreResult<()>;

    /// Creates an empty content branch on a file.
    fn create_branch(&self, txn: &mut Transaction<'_>, soid: Soid, kidx: KIndex) -> CoreResult<()>;

    /// Sets the attributes of an existing content branch.
    fn set_content(
        &self,
        txn: &mut Transaction<'_>,
        soid: Soid,
        kidx: KIndex,
        content: ContentAttributes,
    ) -> CoreResult<()>;
}
