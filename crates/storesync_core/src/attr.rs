//! Object attributes.

use crate::id::ObjectId;
use crate::types::{KIndex, ObjectType, Soid};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// SHA-256 digest of file content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Hashes `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Attributes of one content branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAttributes {
    /// Length in bytes.
    pub length: u64,
    /// Modification time, milliseconds since the epoch.
    pub mtime: u64,
    /// Content digest.
    pub hash: ContentHash,
}

/// Per-object flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ObjectFlags(u32);

impl ObjectFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Expelled by an explicit decision on this object.
    pub const EXPELLED_ORIGINAL: Self = Self(1);
    /// Expelled because an ancestor is expelled.
    pub const EXPELLED_INHERITED: Self = Self(1 << 1);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with the bits of `other` set.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns true if either expulsion bit is set.
    #[must_use]
    pub const fn is_expelled(self) -> bool {
        self.0 & (Self::EXPELLED_ORIGINAL.0 | Self::EXPELLED_INHERITED.0) != 0
    }
}

/// Attributes of one replica (OA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttributes {
    /// Replica these attributes describe.
    pub soid: Soid,
    /// Kind of object.
    pub object_type: ObjectType,
    /// Parent object in the same store.
    pub parent: ObjectId,
    /// Name within the parent.
    pub name: String,
    /// Flag bits.
    pub flags: ObjectFlags,
    /// Content branches; empty for directories and anchors.
    pub branches: BTreeMap<KIndex, ContentAttributes>,
}

impl ObjectAttributes {
    /// Creates attributes with no branches.
    #[must_use]
    pub fn new(
        soid: Soid,
        object_type: ObjectType,
        parent: ObjectId,
        name: impl Into<String>,
        flags: ObjectFlags,
    ) -> Self {
        Self {
            soid,
            object_type,
            parent,
            name: name.into(),
            flags,
            branches: BTreeMap::new(),
        }
    }

    /// Returns true if this replica is expelled.
    #[must_use]
    pub fn is_expelled(&self) -> bool {
        self.flags.is_expelled()
    }

    /// Returns true for files.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.object_type == ObjectType::File
    }

    /// Returns true for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.object_type == ObjectType::Dir
    }

    /// Returns true for anchors.
    #[must_use]
    pub fn is_anchor(&self) -> bool {
        self.object_type == ObjectType::Anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreIndex;

    #[test]
    fn expulsion_flags() {
        assert!(!ObjectFlags::NONE.is_expelled());
        assert!(ObjectFlags::EXPELLED_ORIGINAL.is_expelled());
        let both = ObjectFlags::EXPELLED_ORIGINAL.with(ObjectFlags::EXPELLED_INHERITED);
        assert!(both.contains(ObjectFlags::EXPELLED_INHERITED));
        let stripped = both.without(ObjectFlags::EXPELLED_INHERITED);
        assert_eq!(stripped, ObjectFlags::EXPELLED_ORIGINAL);
        assert!(!ObjectFlags::EXPELLED_INHERITED
            .without(ObjectFlags::EXPELLED_INHERITED)
            .is_expelled());
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(ContentHash::of(b"abc"), ContentHash::of(b"abc"));
        assert_ne!(ContentHash::of(b"abc"), ContentHash::of(b"abd"));
    }

    #[test]
    fn type_predicates() {
        let soid = Soid::new(StoreIndex::new(1), ObjectId::generate());
        let oa = ObjectAttributes::new(soid, ObjectType::Anchor, ObjectId::ROOT, "a", ObjectFlags::NONE);
        assert!(oa.is_anchor());
        assert!(!oa.is_file());
        assert!(!oa.is_expelled());
        assert!(oa.branches.is_empty());
    }
}
