//! Globally unique identifiers.
//!
//! Stores, objects and devices are named by 128-bit values. Their canonical
//! text form is 32 lowercase hex digits with no separators; the tombstone
//! name format depends on that width staying fixed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Length of the canonical text form of every identifier.
pub const ID_TEXT_LEN: usize = 32;

/// Error returned when parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    /// The text is not exactly [`ID_TEXT_LEN`] characters long.
    #[error("expected {ID_TEXT_LEN} hex digits, got {0} characters")]
    Length(usize),
    /// The text contains a non-hex character.
    #[error("invalid hex digit {0:?}")]
    Digit(char),
}

fn parse_hex(text: &str) -> Result<[u8; 16], IdParseError> {
    if text.len() != ID_TEXT_LEN {
        return Err(IdParseError::Length(text.chars().count()));
    }
    let mut bytes = [0u8; 16];
    let mut digits = text.chars();
    for byte in &mut bytes {
        let mut value = 0u8;
        for _ in 0..2 {
            let c = digits.next().ok_or(IdParseError::Length(text.len()))?;
            let nibble = c.to_digit(16).ok_or(IdParseError::Digit(c))?;
            value = (value << 4) | nibble as u8;
        }
        *byte = value;
    }
    Ok(bytes)
}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 16]);

        impl $name {
            /// Creates an identifier from raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Generates a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().into_bytes())
            }

            /// Returns the raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Returns the canonical text form.
            #[must_use]
            pub fn to_text(&self) -> String {
                let mut text = String::with_capacity(ID_TEXT_LEN);
                for byte in self.0 {
                    text.push_str(&format!("{byte:02x}"));
                }
                text
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                parse_hex(text).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_text())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_text())
            }
        }
    };
}

define_id!(
    /// Identifier of a store, the unit of replication.
    StoreId
);

define_id!(
    /// Identifier of a logical object.
    ///
    /// The same value may exist in several stores while the object migrates;
    /// at most one of those copies is admitted.
    ObjectId
);

define_id!(
    /// Identifier of a device taking part in replication.
    DeviceId
);

/// Byte and mask that distinguish a store id from its anchor's object id.
const ANCHOR_BYTE: usize = 6;
const ANCHOR_MASK: u8 = 0xF0;

impl ObjectId {
    /// Root directory of every store.
    pub const ROOT: Self = Self([0; 16]);

    /// Trash container of every store. Deleted objects are moved here.
    pub const TRASH: Self = Self([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

    /// Returns the store anchored by this object if it is an anchor.
    #[must_use]
    pub fn anchored_store(&self) -> StoreId {
        let mut bytes = self.0;
        bytes[ANCHOR_BYTE] ^= ANCHOR_MASK;
        StoreId(bytes)
    }
}

impl StoreId {
    /// Returns the object id of the anchor that mounts this store inside
    /// its parent store.
    #[must_use]
    pub fn anchor_oid(&self) -> ObjectId {
        let mut bytes = self.0;
        bytes[ANCHOR_BYTE] ^= ANCHOR_MASK;
        ObjectId(bytes)
    }
}

impl DeviceId {
    /// Placeholder device used before configuration names the local one.
    pub const UNSET: Self = Self([0; 16]);
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::UNSET
    }
}
