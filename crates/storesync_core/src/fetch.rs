//! Dependency fetch interface.

use crate::error::CoreResult;
use crate::id::DeviceId;
use crate::types::Socid;

/// Downloads a component from a peer and applies it locally.
///
/// This is the one call in the migration engine that suspends: other core
/// work may run (and mutate metadata) while it waits, so callers re-read
/// any state they need afterwards. Applying a fetched object runs the
/// ordinary object-creation path, which in turn calls back into
/// immigration detection.
pub trait DependencyFetcher: Send + Sync {
    /// Fetches `socid` from `peer`.
    ///
    /// `hint` names a local component whose state the transfer may reuse,
    /// typically the pre-migration copy of the same object.
    fn fetch(&self, socid: Socid, peer: DeviceId, hint: Option<Socid>) -> CoreResult<()>;
}
