//! Version database interface.

use crate::error::CoreResult;
use crate::transaction::Transaction;
use crate::types::{Socid, Sockid};
use crate::version::CausalVersion;

/// Local and known-missing (KML) versions of components.
///
/// The local version of a branch is what this replica has; the KML
/// version of a component is what peers advertised that this replica does
/// not have yet.
pub trait VersionStore: Send + Sync {
    /// Returns the local version of a branch.
    fn local_version(&self, k: Sockid) -> CoreResult<CausalVersion>;

    /// Merges `version` into the local version of a branch.
    fn add_local_version(
        &self,
        txn: &mut Transaction<'_>,
        k: Sockid,
        version: &CausalVersion,
    ) -> CoreResult<()>;

    /// Removes `version` from the local version of a branch.
    fn delete_local_version(
        &self,
        txn: &mut Transaction<'_>,
        k: Sockid,
        version: &CausalVersion,
    ) -> CoreResult<()>;

    /// Returns the KML version of a component.
    fn kml_version(&self, socid: Socid) -> CoreResult<CausalVersion>;

    /// Merges `version` into the KML version of a component.
    fn add_kml_version(
        &self,
        txn: &mut Transaction<'_>,
        socid: Socid,
        version: &CausalVersion,
    ) -> CoreResult<()>;

    /// Removes `version` from the KML version of a component.
    fn delete_kml_version(
        &self,
        txn: &mut Transaction<'_>,
        socid: Socid,
        version: &CausalVersion,
    ) -> CoreResult<()>;
}
