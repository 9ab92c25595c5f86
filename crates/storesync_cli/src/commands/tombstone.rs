//! Tombstone name commands.

use storesync_core::{IdParseError, ObjectId, StoreId};
use storesync_migration::tombstone;

/// Builds the tombstone name for `oid` moving to `store`.
pub fn encode(oid: &str, store: &str) -> Result<String, IdParseError> {
    let oid: ObjectId = oid.parse()?;
    let store: StoreId = store.parse()?;
    Ok(tombstone::encode(oid, store))
}

/// Describes what a trashed object's name says about its deletion.
pub fn describe(name: &str) -> String {
    if !tombstone::is_migration_name(name) {
        return "not a migration tombstone".to_string();
    }
    match tombstone::decode_target_store(name) {
        Some(store) => format!("migrated to store {store}"),
        None => "malformed migration tombstone".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_describe() {
        let oid = ObjectId::generate().to_text();
        let store = StoreId::generate();
        let name = encode(&oid, &store.to_text()).unwrap();
        assert_eq!(describe(&name), format!("migrated to store {store}"));
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!(encode("not hex", &StoreId::generate().to_text()).is_err());
        assert!(encode(&ObjectId::generate().to_text(), "").is_err());
    }

    #[test]
    fn ordinary_and_malformed_names() {
        let oid = ObjectId::generate().to_text();
        assert_eq!(describe(&oid), "not a migration tombstone");
        let bogus = "z".repeat(tombstone::MIGRATION_NAME_LEN);
        assert_eq!(describe(&bogus), "malformed migration tombstone");
    }
}
