//! Typed mesh addresses and group identifiers.
//!
//! Both are small positive integers on the wire. Zero is reserved: a zero
//! mesh address never names a device and a zero group id means "ungrouped".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_address {
    ($(#[doc = $doc:expr])* $name:ident, $zero:expr) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u16", into = "u16")]
        pub struct $name(u16);

        impl $name {
            /// Wrap a raw value, rejecting zero.
            ///
            /// # Errors
            ///
            /// Returns a [`ValidationError`] when `value` is zero.
            pub fn new(value: u16) -> Result<Self, ValidationError> {
                if value == 0 {
                    return Err($zero);
                }
                Ok(Self(value))
            }

            /// Access the raw value.
            #[must_use]
            pub fn get(self) -> u16 {
                self.0
            }
        }

        impl TryFrom<u16> for $name {
            type Error = ValidationError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = AddressParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: u16 = s.parse().map_err(AddressParseError::Number)?;
                Self::new(raw).map_err(AddressParseError::Invalid)
            }
        }
    };
}

define_address!(
    /// Protocol-level address of a single mesh device.
    MeshAddress,
    ValidationError::ZeroMeshAddress
);

define_address!(
    /// Broadcast identifier addressing every device enrolled in a group.
    GroupId,
    ValidationError::ZeroGroupId
);

/// Why a textual address could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum AddressParseError {
    /// Not an unsigned 16-bit integer.
    #[error("address is not a number")]
    Number(#[source] std::num::ParseIntError),
    /// A number, but not a valid address.
    #[error("invalid address")]
    Invalid(#[source] ValidationError),
}

/// Addressee of an outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Destination {
    /// A single device.
    Device(MeshAddress),
    /// Every member of a group, in one broadcast.
    Group(GroupId),
}

impl Destination {
    /// The integer written to the `dstAdr` field of a control message.
    ///
    /// Group ids are sent as-is; the broker resolves them against the
    /// group enrolment stored in the mesh.
    #[must_use]
    pub fn wire_address(self) -> u16 {
        match self {
            Self::Device(address) => address.get(),
            Self::Group(group) => group.get(),
        }
    }
}

impl From<MeshAddress> for Destination {
    fn from(value: MeshAddress) -> Self {
        Self::Device(value)
    }
}

impl From<GroupId> for Destination {
    fn from(value: GroupId) -> Self {
        Self::Group(value)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(address) => write!(f, "device {address}"),
            Self::Group(group) => write!(f, "group {group}"),
        }
    }
}
