//! Following objects that a peer reports as migrated away.
//!
//! A remote deletion whose new name is a migration tombstone means the
//! object moved to another store on the peer. Before the deletion is
//! applied locally the emigration coordinator makes sure the destination
//! store is known here, acquiring any missing ancestor stores on the way,
//! and then pulls the destination copy. Creating that copy runs
//! immigration, which moves the local content across instead of
//! downloading it again.

use crate::collaborators::Collaborators;
use crate::error::MigrationResult;
use crate::tombstone;
use std::fmt;
use storesync_core::{
    DeviceId, MigrationConfig, ObjectId, ObjectType, Socid, Soid, StoreId, StoreIndex,
};
use tracing::{debug, info, warn};

/// Terminal state of one emigration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmigrationOutcome {
    /// The update is an ordinary deletion.
    NotMigration,
    /// Emigration handling is switched off.
    Disabled,
    /// The object is not present locally.
    ObjectMissing,
    /// The object already carries this migration tombstone.
    AlreadyMigrated,
    /// No store of the chain is known locally; the peers do not share
    /// enough history yet.
    NoCommonAncestor,
    /// The object is a directory; its children were requested.
    ChildrenRequested {
        /// Children whose fetch returned successfully.
        fetched: usize,
        /// Children whose fetch failed and was logged.
        failed: usize,
    },
    /// The destination copy of a file or anchor was fetched.
    ObjectFetched {
        /// Component that was fetched.
        socid: Socid,
    },
}

impl EmigrationOutcome {
    /// Returns true if anything was requested from the peer.
    #[must_use]
    pub fn fetched_anything(&self) -> bool {
        matches!(self, Self::ChildrenRequested { .. } | Self::ObjectFetched { .. })
    }
}

/// Handles remote deletions that carry a migration tombstone.
pub struct EmigrationCoordinator {
    collab: Collaborators,
    enabled: bool,
    max_depth: usize,
}

impl EmigrationCoordinator {
    /// Creates a coordinator.
    pub fn new(collab: Collaborators, config: &MigrationConfig) -> Self {
        Self {
            collab,
            enabled: config.emigration_enabled,
            max_depth: config.max_store_depth,
        }
    }

    /// Reacts to a remote update moving `soid` under `new_parent` as `new_name`.
    ///
    /// Called before the deletion is applied. `ancestors` is the chain the
    /// peer sent with the update, from the target's parent outward.
    ///
    /// # Errors
    ///
    /// A failed ancestor anchor fetch or destination fetch is returned; the
    /// update is retried later. A failed child fetch is only logged.
    pub fn maybe_emigrate(
        &self,
        soid: Soid,
        new_parent: ObjectId,
        new_name: &str,
        ancestors: &[StoreId],
        peer: DeviceId,
    ) -> MigrationResult<EmigrationOutcome> {
        if ancestors.is_empty()
            || new_parent != ObjectId::TRASH
            || !tombstone::is_migration_name(new_name)
        {
            return Ok(EmigrationOutcome::NotMigration);
        }
        if !self.enabled {
            debug!(soid = %soid, "emigration disabled");
            return Ok(EmigrationOutcome::Disabled);
        }
        let Some(target) = tombstone::decode_target_store(new_name) else {
            return Ok(EmigrationOutcome::NotMigration);
        };
        // The chain comes from the peer; one deeper than any real nesting
        // is malformed input, not local damage.
        if ancestors.len() > self.max_depth {
            debug!(
                soid = %soid,
                depth = ancestors.len(),
                max = self.max_depth,
                "ancestor chain too deep, ignoring tombstone"
            );
            return Ok(EmigrationOutcome::NotMigration);
        }

        let Some(oa) = self.collab.meta.attributes(soid)? else {
            debug!(soid = %soid, "emigrating object not present");
            return Ok(EmigrationOutcome::ObjectMissing);
        };
        if oa.name == new_name {
            debug!(soid = %soid, target = %target, "already emigrated");
            return Ok(EmigrationOutcome::AlreadyMigrated);
        }

        let Some(to) = self.resolve_target(target, ancestors, peer)? else {
            debug!(soid = %soid, target = %target, "no common ancestor store, skipping");
            return Ok(EmigrationOutcome::NoCommonAncestor);
        };

        // Fetches may have run other core work; read the object again.
        let Some(oa) = self.collab.meta.attributes(soid)? else {
            debug!(soid = %soid, "object vanished while acquiring stores");
            return Ok(EmigrationOutcome::ObjectMissing);
        };

        if oa.object_type == ObjectType::Dir {
            return self.request_children(soid, to, peer);
        }

        let socid = Socid::meta(Soid::new(to, soid.oid));
        debug!(socid = %socid, hint = %Socid::meta(soid), "fetching emigrant");
        self.collab
            .fetcher
            .fetch(socid, peer, Some(Socid::meta(soid)))?;
        Ok(EmigrationOutcome::ObjectFetched { socid })
    }

    /// Returns the local index of `target`, acquiring missing stores.
    ///
    /// The queue holds the target followed by its ancestors. The innermost
    /// store already known locally is the starting point; each store inside
    /// it is acquired by fetching its anchor from its parent, working back
    /// toward the target.
    fn resolve_target(
        &self,
        target: StoreId,
        ancestors: &[StoreId],
        peer: DeviceId,
    ) -> MigrationResult<Option<StoreIndex>> {
        let queue: Vec<StoreId> = std::iter::once(target)
            .chain(ancestors.iter().copied())
            .collect();

        let mut known = None;
        for (level, sid) in queue.iter().enumerate() {
            if let Some(sidx) = self.collab.stores.sidx_of(*sid)? {
                known = Some((level, sidx));
                break;
            }
        }
        let Some((mut level, mut parent)) = known else {
            return Ok(None);
        };

        while level > 0 {
            level -= 1;
            let sid = queue[level];
            if let Some(sidx) = self.collab.stores.sidx_of(sid)? {
                parent = sidx;
                continue;
            }
            let anchor = Socid::meta(Soid::new(parent, sid.anchor_oid()));
            debug!(store = %sid, anchor = %anchor, "fetching anchor of missing store");
            self.collab.fetcher.fetch(anchor, peer, None)?;

            match self.collab.stores.sidx_of(sid)? {
                Some(sidx) => {
                    info!(store = %sid, sidx = %sidx, "acquired store for emigration");
                    parent = sidx;
                }
                None => {
                    debug!(store = %sid, "anchor fetch did not make store known");
                    return Ok(None);
                }
            }
        }
        Ok(Some(parent))
    }

    fn request_children(
        &self,
        soid: Soid,
        to: StoreIndex,
        peer: DeviceId,
    ) -> MigrationResult<EmigrationOutcome> {
        let mut fetched = 0;
        let mut failed = 0;
        for child in self.collab.meta.children(soid)? {
            let socid = Socid::meta(Soid::new(to, child));
            let hint = Socid::meta(Soid::new(soid.sidx, child));
            match self.collab.fetcher.fetch(socid, peer, Some(hint)) {
                Ok(()) => fetched += 1,
                Err(err) if err.is_invariant_violation() => return Err(err.into()),
                Err(err) => {
                    // Local writes may race with the remote move; the child
                    // is picked up by a later update.
                    warn!(socid = %socid, error = %err, "failed to fetch emigrating child");
                    failed += 1;
                }
            }
        }
        debug!(soid = %soid, fetched, failed, "requested children of emigrating directory");
        Ok(EmigrationOutcome::ChildrenRequested { fetched, failed })
    }
}

impl fmt::Debug for EmigrationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmigrationCoordinator")
            .field("enabled", &self.enabled)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
