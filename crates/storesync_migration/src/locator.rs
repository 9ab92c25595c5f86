//! Finding the admitted copy of a migrating object.

use crate::error::{MigrationError, MigrationResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use storesync_core::{MetaDatabase, ObjectId, ObjectType, Soid, StoreIndex};
use tracing::{error, trace};

/// Locates the single admitted replica of an object across stores.
///
/// At most one replica of an object id may be admitted at any time. The
/// locator does not assume this; it checks it on every call and reports a
/// second admitted copy as an invariant violation.
pub struct AdmittedObjectLocator {
    meta: Arc<dyn MetaDatabase>,
}

impl AdmittedObjectLocator {
    /// Creates a locator over `meta`.
    pub fn new(meta: Arc<dyn MetaDatabase>) -> Self {
        Self { meta }
    }

    /// Returns the admitted replica of `oid` outside store `from`.
    ///
    /// Every replica found must be of type `expected`. Expelled replicas are
    /// searched in turn, so an admitted copy reachable only through a chain
    /// of expelled copies is still found. Each store is visited once.
    pub fn locate(
        &self,
        oid: ObjectId,
        from: StoreIndex,
        expected: ObjectType,
    ) -> MigrationResult<Option<Soid>> {
        let mut visited = BTreeSet::from([from]);
        let mut pending = vec![from];
        let mut admitted: Option<Soid> = None;

        while let Some(sidx) = pending.pop() {
            for holder in self.meta.stores_holding(oid, sidx)? {
                if !visited.insert(holder) {
                    continue;
                }
                let soid = Soid::new(holder, oid);
                let Some(oa) = self.meta.attributes(soid)? else {
                    continue;
                };
                if oa.object_type != expected {
                    error!(soid = %soid, found = %oa.object_type, expected = %expected, "replica type mismatch");
                    return Err(MigrationError::invariant(format!(
                        "replica {soid} is a {} but {expected} was expected",
                        oa.object_type
                    )));
                }
                if oa.is_expelled() {
                    trace!(soid = %soid, "following expelled replica");
                    pending.push(holder);
                } else if let Some(first) = admitted {
                    error!(first = %first, second = %soid, "two admitted replicas");
                    return Err(MigrationError::invariant(format!(
                        "object {oid} is admitted in both {first} and {soid}"
                    )));
                } else {
                    admitted = Some(soid);
                }
            }
        }
        Ok(admitted)
    }
}
