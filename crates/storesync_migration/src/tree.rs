//! Locally initiated migration of a whole subtree.

use crate::collaborators::Collaborators;
use crate::error::{MigrationError, MigrationResult};
use crate::immigration::ImmigrationCoordinator;
use std::sync::Arc;
use storesync_core::{
    CoreError, DeletionCause, NewObject, ObjectAttributes, ObjectFlags, ObjectId, Soid, StoreIndex,
    Transaction,
};
use tracing::{debug, info};

enum Visit {
    Enter {
        source: Soid,
        parent: ObjectId,
        name: Option<String>,
    },
    Leave {
        source: Soid,
    },
}

/// Moves a subtree to another store when the user moves it across a store
/// boundary on this device.
///
/// Nodes keep their object ids. Directories are recreated at the
/// destination and deleted at the source once their children have moved;
/// files and anchors go through immigration, which moves their content or
/// child store. The walk does not descend into anchors: the store they
/// mount moves as a whole.
pub struct TreeImmigrator {
    collab: Collaborators,
    immigration: Arc<ImmigrationCoordinator>,
}

impl TreeImmigrator {
    /// Creates a tree immigrator.
    pub fn new(collab: Collaborators, immigration: Arc<ImmigrationCoordinator>) -> Self {
        Self {
            collab,
            immigration,
        }
    }

    /// Migrates the subtree at `source_root` under `dest_parent` as `name`.
    ///
    /// Returns the destination replica of the subtree root.
    pub fn migrate_subtree(
        &self,
        txn: &mut Transaction<'_>,
        source_root: Soid,
        dest_parent: Soid,
        name: &str,
    ) -> MigrationResult<Soid> {
        if source_root.sidx == dest_parent.sidx {
            return Err(CoreError::invalid_operation(format!(
                "{source_root} is already in store {}",
                dest_parent.sidx
            ))
            .into());
        }
        let to = dest_parent.sidx;
        let target = self
            .collab
            .stores
            .sid_of(to)?
            .ok_or_else(|| CoreError::store_not_known(to))?;

        let mut stack = vec![Visit::Enter {
            source: source_root,
            parent: dest_parent.oid,
            name: Some(name.to_string()),
        }];
        let mut moved = 0usize;

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter {
                    source,
                    parent,
                    name,
                } => {
                    let oa = self
                        .collab
                        .meta
                        .attributes(source)?
                        .ok_or(CoreError::ObjectNotFound { soid: source })?;
                    let name = name.unwrap_or_else(|| oa.name.clone());
                    self.place(txn, &oa, to, parent, &name)?;
                    moved += 1;

                    if oa.is_dir() {
                        stack.push(Visit::Leave { source });
                        let mut children = self.collab.meta.children(source)?;
                        children.sort_unstable();
                        for child in children.into_iter().rev() {
                            stack.push(Visit::Enter {
                                source: Soid::new(source.sidx, child),
                                parent: source.oid,
                                name: None,
                            });
                        }
                    }
                }
                Visit::Leave { source } => {
                    self.collab
                        .meta
                        .delete_object(txn, source, DeletionCause::Emigrated { target })?;
                }
            }
        }

        let root = Soid::new(to, source_root.oid);
        info!(from = %source_root, to = %root, objects = moved, "migrated subtree");
        Ok(root)
    }

    /// Creates or moves the destination replica of one node.
    fn place(
        &self,
        txn: &mut Transaction<'_>,
        source: &ObjectAttributes,
        to: StoreIndex,
        parent: ObjectId,
        name: &str,
    ) -> MigrationResult<()> {
        let dest = source.soid.in_store(to);

        if let Some(existing) = self.collab.meta.attributes(dest)? {
            if existing.is_expelled() == source.is_expelled() {
                return Err(MigrationError::invariant(format!(
                    "{} and {dest} are both {}",
                    source.soid,
                    if existing.is_expelled() { "expelled" } else { "admitted" }
                )));
            }
            debug!(soid = %dest, "destination exists, moving in place");
            self.collab.meta.move_object(txn, dest, parent, name)?;
            return Ok(());
        }

        self.collab.meta.create_object(
            txn,
            NewObject {
                soid: dest,
                object_type: source.object_type,
                parent,
                name: name.to_string(),
                flags: source.flags.without(ObjectFlags::EXPELLED_INHERITED),
            },
        )?;

        if !source.is_dir() {
            let created = self
                .collab
                .meta
                .attributes(dest)?
                .ok_or(CoreError::ObjectNotFound { soid: dest })?;
            if !created.is_expelled() {
                self.immigration.maybe_immigrate(txn, &created)?;
            }
        }
        Ok(())
    }
}
