//! Causal versions.

use crate::id::DeviceId;
use crate::types::Tick;
use std::collections::BTreeMap;
use std::fmt;

/// A per-device tick vector.
///
/// The representation is private; callers combine versions only through
/// [`add`](Self::add), [`sub`](Self::sub) and [`is_zero`](Self::is_zero).
/// Zero ticks are never stored, so two equal versions always compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CausalVersion {
    ticks: BTreeMap<DeviceId, Tick>,
}

impl CausalVersion {
    /// The empty version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `device` raised to at least `tick`.
    #[must_use]
    pub fn with(mut self, device: DeviceId, tick: Tick) -> Self {
        self.set_max(device, tick);
        self
    }

    fn set_max(&mut self, device: DeviceId, tick: Tick) {
        if tick == Tick::ZERO {
            return;
        }
        let slot = self.ticks.entry(device).or_insert(tick);
        if *slot < tick {
            *slot = tick;
        }
    }

    /// Returns the tick recorded for `device`, zero if none.
    #[must_use]
    pub fn get(&self, device: DeviceId) -> Tick {
        self.ticks.get(&device).copied().unwrap_or(Tick::ZERO)
    }

    /// Returns true if no device has a tick.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Returns the union (per-device maximum).
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Merges `other` into `self` (per-device maximum).
    pub fn merge(&mut self, other: &Self) {
        for (&device, &tick) in &other.ticks {
            self.set_max(device, tick);
        }
    }

    /// Returns the entries of `self` that `other` does not cover.
    ///
    /// An entry `(d, t)` survives when `t > other.get(d)`.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let ticks = self
            .ticks
            .iter()
            .filter(|(device, tick)| **tick > other.get(**device))
            .map(|(device, tick)| (*device, *tick))
            .collect();
        Self { ticks }
    }

    /// Returns true if every entry of `other` is covered by `self`.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        other.sub(self).is_zero()
    }

    /// Iterates over `(device, tick)` pairs in device order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, Tick)> + '_ {
        self.ticks.iter().map(|(device, tick)| (*device, *tick))
    }

    /// Returns the number of devices with a tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Returns true if no device has a tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_zero()
    }
}

impl FromIterator<(DeviceId, Tick)> for CausalVersion {
    fn from_iter<I: IntoIterator<Item = (DeviceId, Tick)>>(iter: I) -> Self {
        let mut version = Self::new();
        for (device, tick) in iter {
            version.set_max(device, tick);
        }
        version
    }
}

impl fmt::Debug for CausalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (device, tick)) in self.ticks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", &device.to_text()[..8], tick)?;
        }
        f.write_str("}")
    }
}
