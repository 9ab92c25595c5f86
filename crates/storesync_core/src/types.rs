//! Store-local handles and references.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local handle of a store.
///
/// Bound 1:1 to a [`crate::StoreId`] for the lifetime of one device
/// database. Never meaningful on another device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreIndex(pub u32);

impl StoreIndex {
    /// Creates a store index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StoreIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Index of a content branch of a file.
///
/// Branch [`KIndex::MASTER`] always exists once a file has content; other
/// branches hold conflicting versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KIndex(pub u32);

impl KIndex {
    /// The master branch.
    pub const MASTER: Self = Self(0);

    /// Creates a branch index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for KIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// A per-device logical clock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    /// The absent tick.
    pub const ZERO: Self = Self(0);

    /// Creates a tick.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Regular file with content branches.
    File,
    /// Directory.
    Dir,
    /// Mount point of a child store.
    Anchor,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Dir => "dir",
            Self::Anchor => "anchor",
        })
    }
}

/// Independently versioned part of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Name, parent and flags.
    Meta,
    /// File content.
    Content,
}

/// A concrete replica of an object: (store index, object id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Soid {
    /// Store holding the replica.
    pub sidx: StoreIndex,
    /// Logical object.
    pub oid: ObjectId,
}

impl Soid {
    /// Creates an object reference.
    #[must_use]
    pub const fn new(sidx: StoreIndex, oid: ObjectId) -> Self {
        Self { sidx, oid }
    }

    /// Returns the reference to the same object in another store.
    #[must_use]
    pub const fn in_store(self, sidx: StoreIndex) -> Self {
        Self { sidx, oid: self.oid }
    }
}

impl fmt::Display for Soid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sidx, self.oid)
    }
}

/// A component of a replica: (soid, component kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Socid {
    /// Replica.
    pub soid: Soid,
    /// Component.
    pub component: ComponentKind,
}

impl Socid {
    /// Creates a component reference.
    #[must_use]
    pub const fn new(soid: Soid, component: ComponentKind) -> Self {
        Self { soid, component }
    }

    /// Metadata component of `soid`.
    #[must_use]
    pub const fn meta(soid: Soid) -> Self {
        Self::new(soid, ComponentKind::Meta)
    }

    /// Content component of `soid`.
    #[must_use]
    pub const fn content(soid: Soid) -> Self {
        Self::new(soid, ComponentKind::Content)
    }
}

impl fmt::Display for Socid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.component {
            ComponentKind::Meta => "meta",
            ComponentKind::Content => "content",
        };
        write!(f, "{}/{}", self.soid, kind)
    }
}

/// A content branch of a replica: (soid, branch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sokid {
    /// Replica.
    pub soid: Soid,
    /// Branch.
    pub kidx: KIndex,
}

impl Sokid {
    /// Creates a branch reference.
    #[must_use]
    pub const fn new(soid: Soid, kidx: KIndex) -> Self {
        Self { soid, kidx }
    }
}

impl fmt::Display for Sokid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.soid, self.kidx)
    }
}

/// A versioned branch of a component: (socid, branch).
///
/// Local versions are kept per branch; the metadata component only has
/// the master branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sockid {
    /// Component.
    pub socid: Socid,
    /// Branch.
    pub kidx: KIndex,
}

impl Sockid {
    /// Creates a versioned branch reference.
    #[must_use]
    pub const fn new(socid: Socid, kidx: KIndex) -> Self {
        Self { socid, kidx }
    }

    /// Content branch `kidx` of `soid`.
    #[must_use]
    pub const fn content(soid: Soid, kidx: KIndex) -> Self {
        Self::new(Socid::content(soid), kidx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_next() {
        assert_eq!(Tick::new(4).next(), Tick::new(5));
        assert!(Tick::ZERO < Tick::new(1));
    }

    #[test]
    fn soid_in_store_keeps_oid() {
        let oid = ObjectId::generate();
        let from = Soid::new(StoreIndex::new(1), oid);
        let to = from.in_store(StoreIndex::new(9));
        assert_eq!(to.oid, oid);
        assert_eq!(to.sidx, StoreIndex::new(9));
    }

    #[test]
    fn display_forms() {
        let soid = Soid::new(StoreIndex::new(2), ObjectId::ROOT);
        assert!(soid.to_string().starts_with("s2:"));
        assert!(Socid::content(soid).to_string().ends_with("/content"));
        assert!(Sokid::new(soid, KIndex::new(3)).to_string().ends_with("#k3"));
    }
}
