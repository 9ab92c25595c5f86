//! Migration configuration.

use crate::id::DeviceId;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Device that owns immigrant ticks assigned on this replica.
    pub local_device: DeviceId,

    /// Whether remote migration tombstones trigger emigration handling.
    pub emigration_enabled: bool,

    /// Upper bound on store nesting walked by ancestor resolution.
    ///
    /// Store parentage is a tree, so a longer walk means the hierarchy is
    /// corrupt.
    pub max_store_depth: usize,

    /// Whether the immigrant ledger is synced to disk on every commit.
    pub sync_ledger_on_commit: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            local_device: DeviceId::UNSET,
            emigration_enabled: true,
            max_store_depth: 64,
            sync_ledger_on_commit: true,
        }
    }
}

impl MigrationConfig {
    /// Creates a configuration for `local_device` with default values.
    #[must_use]
    pub fn new(local_device: DeviceId) -> Self {
        Self {
            local_device,
            ..Self::default()
        }
    }

    /// Enables or disables emigration handling.
    #[must_use]
    pub const fn emigration_enabled(mut self, value: bool) -> Self {
        self.emigration_enabled = value;
        self
    }

    /// Sets the maximum store nesting depth.
    #[must_use]
    pub const fn max_store_depth(mut self, depth: usize) -> Self {
        self.max_store_depth = depth;
        self
    }

    /// Sets whether the ledger is synced on every commit.
    #[must_use]
    pub const fn sync_ledger_on_commit(mut self, value: bool) -> Self {
        self.sync_ledger_on_commit = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = MigrationConfig::default();
        assert!(config.emigration_enabled);
        assert!(config.sync_ledger_on_commit);
        assert_eq!(config.max_store_depth, 64);
        assert_eq!(config.local_device, DeviceId::UNSET);
    }

    #[test]
    fn builder_pattern() {
        let device = DeviceId::from_bytes([7; 16]);
        let config = MigrationConfig::new(device)
            .emigration_enabled(false)
            .max_store_depth(8)
            .sync_ledger_on_commit(false);

        assert_eq!(config.local_device, device);
        assert!(!config.emigration_enabled);
        assert_eq!(config.max_store_depth, 8);
        assert!(!config.sync_ledger_on_commit);
    }
}
