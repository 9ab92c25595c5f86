//! Migration tombstone names.
//!
//! When an object leaves a store, its tombstone in the trash is named
//!
//! ```text
//! <oid text>.<destination sid text>
//! ```
//!
//! Every id has a fixed-width text form, so a migration tombstone is always
//! exactly [`MIGRATION_NAME_LEN`] bytes long. Ordinary tombstones are named
//! after the bare object id and are therefore shorter. Every deletion update
//! passes through [`is_migration_name`], which only looks at the length.

use storesync_core::{ObjectId, StoreId, ID_TEXT_LEN};
use tracing::debug;

/// Separator between the object id and the destination store id.
pub const SEPARATOR: char = '.';

/// Length in bytes of every migration tombstone name.
pub const MIGRATION_NAME_LEN: usize = 2 * ID_TEXT_LEN + 1;

/// Returns the tombstone name for `oid` migrating to `target`.
#[must_use]
pub fn encode(oid: ObjectId, target: StoreId) -> String {
    let mut name = String::with_capacity(MIGRATION_NAME_LEN);
    name.push_str(&oid.to_text());
    name.push(SEPARATOR);
    name.push_str(&target.to_text());
    name
}

/// Returns true if `name` has the shape of a migration tombstone.
///
/// Does not parse; a name of the right length with a malformed suffix is
/// still classified as a migration name and rejected by
/// [`decode_target_store`].
#[must_use]
pub fn is_migration_name(name: &str) -> bool {
    name.len() == MIGRATION_NAME_LEN
}

/// Returns the destination store encoded in a migration tombstone.
///
/// Malformed names are logged and yield `None`; a bad name from a peer must
/// not stall the update stream it arrived in.
#[must_use]
pub fn decode_target_store(name: &str) -> Option<StoreId> {
    if !is_migration_name(name) {
        return None;
    }
    let Some(suffix) = name.get(ID_TEXT_LEN + 1..) else {
        debug!(name, "migration tombstone suffix is not on a character boundary");
        return None;
    };
    match suffix.parse() {
        Ok(sid) => Some(sid),
        Err(err) => {
            debug!(name, error = %err, "malformed migration tombstone suffix");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encoded_name_has_fixed_length() {
        let name = encode(ObjectId::generate(), StoreId::generate());
        assert_eq!(name.len(), 65);
        assert_eq!(name.as_bytes()[ID_TEXT_LEN], b'.');
    }

    #[test]
    fn ordinary_tombstone_is_not_a_migration() {
        let oid = ObjectId::generate();
        assert!(!is_migration_name(&oid.to_text()));
        assert_eq!(decode_target_store(&oid.to_text()), None);
    }

    #[test]
    fn malformed_suffix_is_classified_but_not_decoded() {
        let name = format!("{}.{}", ObjectId::generate(), "z".repeat(ID_TEXT_LEN));
        assert!(is_migration_name(&name));
        assert_eq!(decode_target_store(&name), None);
    }

    #[test]
    fn multibyte_name_of_right_length_is_rejected() {
        // 63 ASCII bytes + one 2-byte character straddling the suffix start
        let name = format!("{}é{}", "a".repeat(ID_TEXT_LEN), "b".repeat(ID_TEXT_LEN - 1));
        assert_eq!(name.len(), MIGRATION_NAME_LEN);
        assert_eq!(decode_target_store(&name), None);
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            oid in prop::array::uniform16(any::<u8>()),
            sid in prop::array::uniform16(any::<u8>()),
        ) {
            let sid = StoreId::from_bytes(sid);
            let name = encode(ObjectId::from_bytes(oid), sid);
            prop_assert!(is_migration_name(&name));
            prop_assert_eq!(decode_target_store(&name), Some(sid));
        }

        #[test]
        fn other_lengths_are_never_migrations(name in "\\PC{0,80}") {
            prop_assume!(name.len() != MIGRATION_NAME_LEN);
            prop_assert!(!is_migration_name(&name));
            prop_assert_eq!(decode_target_store(&name), None);
        }
    }
}
