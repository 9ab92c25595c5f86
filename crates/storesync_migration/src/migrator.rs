//! Entry points used by the replication engine.

use crate::ancestors::AncestorSidResolver;
use crate::collaborators::Collaborators;
use crate::emigration::{EmigrationCoordinator, EmigrationOutcome};
use crate::error::MigrationResult;
use crate::immigration::ImmigrationCoordinator;
use crate::ledger::ImmigrantVersionLedger;
use crate::tree::TreeImmigrator;
use std::fmt;
use std::sync::Arc;
use storesync_core::{
    DeviceId, MigrationConfig, ObjectAttributes, ObjectId, Soid, StoreId, Transaction,
};

/// Cross-store migration for one device.
///
/// - [`maybe_emigrate`](Self::maybe_emigrate): the update path, before a
///   remote deletion is applied
/// - [`maybe_immigrate`](Self::maybe_immigrate): the object creation path,
///   after destination metadata is created
/// - [`migrate_subtree`](Self::migrate_subtree): the local move path
/// - [`ancestor_chain_for_tombstone`](Self::ancestor_chain_for_tombstone):
///   the outgoing update path, to describe a migration tombstone to a peer
///
/// # Example
///
/// ```ignore
/// let migrator = Migrator::new(config, collaborators, ledger);
/// let outcome = migrator.maybe_emigrate(soid, parent, &name, &ancestors, peer)?;
/// ```
pub struct Migrator {
    config: MigrationConfig,
    ancestors: AncestorSidResolver,
    emigration: EmigrationCoordinator,
    immigration: Arc<ImmigrationCoordinator>,
    tree: TreeImmigrator,
    ledger: Arc<ImmigrantVersionLedger>,
}

impl Migrator {
    /// Wires the coordinators over `collab`.
    pub fn new(
        config: MigrationConfig,
        collab: Collaborators,
        ledger: Arc<ImmigrantVersionLedger>,
    ) -> Self {
        let ancestors = AncestorSidResolver::new(Arc::clone(&collab.stores), config.max_store_depth);
        let emigration = EmigrationCoordinator::new(collab.clone(), &config);
        let immigration = Arc::new(ImmigrationCoordinator::new(collab.clone(), Arc::clone(&ledger)));
        let tree = TreeImmigrator::new(collab, Arc::clone(&immigration));
        Self {
            config,
            ancestors,
            emigration,
            immigration,
            tree,
            ledger,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Returns the immigrant version ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<ImmigrantVersionLedger> {
        &self.ledger
    }

    /// See [`EmigrationCoordinator::maybe_emigrate`].
    ///
    /// Must be called without an open transaction; fetches open their own.
    pub fn maybe_emigrate(
        &self,
        soid: Soid,
        new_parent: ObjectId,
        new_name: &str,
        ancestors: &[StoreId],
        peer: DeviceId,
    ) -> MigrationResult<EmigrationOutcome> {
        self.emigration
            .maybe_emigrate(soid, new_parent, new_name, ancestors, peer)
    }

    /// See [`ImmigrationCoordinator::maybe_immigrate`].
    pub fn maybe_immigrate(
        &self,
        txn: &mut Transaction<'_>,
        to: &ObjectAttributes,
    ) -> MigrationResult<bool> {
        self.immigration.maybe_immigrate(txn, to)
    }

    /// See [`TreeImmigrator::migrate_subtree`].
    pub fn migrate_subtree(
        &self,
        txn: &mut Transaction<'_>,
        source_root: Soid,
        dest_parent: Soid,
        name: &str,
    ) -> MigrationResult<Soid> {
        self.tree.migrate_subtree(txn, source_root, dest_parent, name)
    }

    /// See [`AncestorSidResolver::chain_for_tombstone`].
    pub fn ancestor_chain_for_tombstone(
        &self,
        parent: ObjectId,
        name: &str,
    ) -> MigrationResult<Vec<StoreId>> {
        self.ancestors.chain_for_tombstone(parent, name)
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
