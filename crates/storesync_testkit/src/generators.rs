//! Property-based test generators using proptest.

use proptest::prelude::*;
use storesync_core::{CausalVersion, DeviceId, ObjectId, StoreId, Tick};
use storesync_migration::tombstone::MIGRATION_NAME_LEN;

/// Strategy for object ids.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform16(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for store ids.
pub fn store_id_strategy() -> impl Strategy<Value = StoreId> {
    prop::array::uniform16(any::<u8>()).prop_map(StoreId::from_bytes)
}

/// Strategy for one of `devices` small device ids.
pub fn device_id_strategy(devices: u8) -> impl Strategy<Value = DeviceId> {
    (0..devices.max(1)).prop_map(|n| DeviceId::from_bytes([n + 1; 16]))
}

/// Strategy for versions over a handful of devices.
pub fn version_strategy() -> impl Strategy<Value = CausalVersion> {
    prop::collection::vec((device_id_strategy(4), 1u64..20), 0..6)
        .prop_map(|entries| entries.into_iter().map(|(d, t)| (d, Tick::new(t))).collect())
}

/// Strategy for names that can never be migration tombstones.
pub fn ordinary_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ._-]{1,100}")
        .expect("Invalid regex")
        .prop_filter("length of a migration tombstone", |s| s.len() != MIGRATION_NAME_LEN)
}
