//! Moving a migrated object's local state onto its destination copy.

use crate::collaborators::Collaborators;
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::ImmigrantVersionLedger;
use crate::locator::AdmittedObjectLocator;
use std::fmt;
use std::sync::Arc;
use storesync_core::{
    CausalVersion, CoreError, DeletionCause, ObjectAttributes, ObjectType, Socid, Sockid, Soid,
    Sokid, Transaction,
};
use tracing::{debug, error, info};

/// Runs when a destination-side copy of an object is created.
///
/// If another store holds the admitted copy of the same object, its content
/// branches and versions (files) or child store (anchors) are moved onto the
/// new copy, and the old copy is deleted with a migration tombstone. Every
/// step runs in the caller's transaction; a failure anywhere leaves the
/// transaction to roll back and the attempt can be repeated in full.
pub struct ImmigrationCoordinator {
    collab: Collaborators,
    locator: AdmittedObjectLocator,
    ledger: Arc<ImmigrantVersionLedger>,
}

impl ImmigrationCoordinator {
    /// Creates a coordinator.
    pub fn new(collab: Collaborators, ledger: Arc<ImmigrantVersionLedger>) -> Self {
        let locator = AdmittedObjectLocator::new(Arc::clone(&collab.meta));
        Self {
            collab,
            locator,
            ledger,
        }
    }

    /// Immigrates into the freshly created replica `to`.
    ///
    /// Returns false when `to` is a directory or no admitted source exists,
    /// which means the object was created independently.
    ///
    /// # Errors
    ///
    /// Broken caller preconditions (expelled destination, file with
    /// branches, anchor whose store is already mounted there) and type
    /// mismatches are invariant violations. Collaborator failures propagate.
    pub fn maybe_immigrate(
        &self,
        txn: &mut Transaction<'_>,
        to: &ObjectAttributes,
    ) -> MigrationResult<bool> {
        self.check_destination(to)?;
        if to.is_dir() {
            return Ok(false);
        }

        let Some(from) = self.locator.locate(to.soid.oid, to.soid.sidx, to.object_type)? else {
            debug!(soid = %to.soid, "no admitted source, not an immigrant");
            return Ok(false);
        };
        let source = self
            .collab
            .meta
            .attributes(from)?
            .ok_or(CoreError::ObjectNotFound { soid: from })?;
        if source.object_type != to.object_type {
            error!(from = %from, to = %to.soid, "immigrant type changed");
            return Err(MigrationError::invariant(format!(
                "source {from} is a {} but destination {} is a {}",
                source.object_type, to.soid, to.object_type
            )));
        }

        match to.object_type {
            ObjectType::File => self.immigrate_file(txn, &source, to.soid)?,
            ObjectType::Anchor => self.immigrate_anchor(txn, from, to.soid)?,
            ObjectType::Dir => return Ok(false),
        }

        let target = self
            .collab
            .stores
            .sid_of(to.soid.sidx)?
            .ok_or_else(|| CoreError::store_not_known(to.soid.sidx))?;
        self.collab
            .meta
            .delete_object(txn, from, DeletionCause::Emigrated { target })?;

        info!(from = %from, to = %to.soid, kind = %to.object_type, "immigrated object");
        Ok(true)
    }

    fn check_destination(&self, to: &ObjectAttributes) -> MigrationResult<()> {
        if to.is_expelled() {
            return Err(MigrationError::invariant(format!(
                "immigration destination {} is expelled",
                to.soid
            )));
        }
        match to.object_type {
            ObjectType::File if !to.branches.is_empty() => Err(MigrationError::invariant(format!(
                "immigration destination {} already has {} branches",
                to.soid,
                to.branches.len()
            ))),
            ObjectType::Anchor => {
                let child = to.soid.oid.anchored_store();
                if let Some(sidx) = self.collab.stores.sidx_of(child)? {
                    if self.collab.stores.parent_of(sidx)? == Some(to.soid.sidx) {
                        return Err(MigrationError::invariant(format!(
                            "store {child} is already mounted under {}",
                            to.soid
                        )));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn immigrate_file(
        &self,
        txn: &mut Transaction<'_>,
        source: &ObjectAttributes,
        to: Soid,
    ) -> MigrationResult<()> {
        let from = source.soid;
        let mut transferred = CausalVersion::new();

        for (&kidx, content) in &source.branches {
            let version = self
                .collab
                .versions
                .local_version(Sockid::content(from, kidx))?;
            self.collab.meta.create_branch(txn, to, kidx)?;
            self.collab.meta.set_content(txn, to, kidx, *content)?;
            self.collab
                .versions
                .add_local_version(txn, Sockid::content(to, kidx), &version)?;
            self.collab
                .physical
                .move_content(txn, Sokid::new(from, kidx), Sokid::new(to, kidx))?;
            debug!(from = %from, to = %to, kidx = %kidx, version = ?version, "moved branch");
            transferred.merge(&version);
        }

        // Peers advertised versions the branches now satisfy locally.
        let socid = Socid::content(to);
        let kml = self.collab.versions.kml_version(socid)?;
        let satisfied = kml.sub(&kml.sub(&transferred));
        if !satisfied.is_zero() {
            self.collab
                .versions
                .delete_kml_version(txn, socid, &satisfied)?;
        }

        self.ledger.record(txn, socid, &transferred)?;
        Ok(())
    }

    fn immigrate_anchor(&self, txn: &mut Transaction<'_>, from: Soid, to: Soid) -> MigrationResult<()> {
        let child_sid = to.oid.anchored_store();
        let child = self.collab.stores.sidx_of(child_sid)?.ok_or_else(|| {
            MigrationError::invariant(format!(
                "admitted anchor {from} mounts store {child_sid}, which is not known"
            ))
        })?;
        self.collab
            .stores
            .reparent(txn, child, from.sidx, to.sidx)?;
        self.collab.physical.move_anchor_root(txn, from, to)?;
        debug!(store = %child_sid, from = %from.sidx, to = %to.sidx, "reparented child store");
        Ok(())
    }
}

impl fmt::Debug for ImmigrationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmigrationCoordinator")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
