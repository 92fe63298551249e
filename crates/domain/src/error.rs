//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`MeshError`]
//! via `#[from]` at port boundaries.

/// Top-level error carried across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A local argument check failed; nothing was published.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The addressed light or group is not part of the roster.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An inbound payload could not be decoded.
    #[error("decode error")]
    Decode(#[from] DecodeError),

    /// Publishing or connecting to the broker failed.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations detected before anything reaches the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// An RGB channel is outside `0..=255`.
    #[error("{channel} channel must be within 0..=255, got {value}")]
    ChannelOutOfRange {
        /// Channel name (`red`, `green` or `blue`).
        channel: &'static str,
        /// The rejected value.
        value: i32,
    },

    /// Hue outside `0..=360` degrees.
    #[error("hue must be within 0..=360, got {0}")]
    HueOutOfRange(f64),

    /// Saturation not strictly above `0.1` or above `1.0`.
    #[error("saturation must be within (0.1, 1.0], got {0}")]
    SaturationOutOfRange(f64),

    /// Lightness not strictly above `0.1` or above `1.0`.
    #[error("lightness must be within (0.1, 1.0], got {0}")]
    LightnessOutOfRange(f64),

    /// Colour temperature outside the supported Kelvin range.
    #[error("color temperature must be within {min}..={max} K, got {value}")]
    ColorTempOutOfRange {
        /// The rejected value.
        value: u32,
        /// Lowest supported Kelvin value.
        min: u32,
        /// Highest supported Kelvin value.
        max: u32,
    },

    /// Mesh addresses are positive integers.
    #[error("mesh address must be positive")]
    ZeroMeshAddress,

    /// Group id `0` means "ungrouped" and is never a broadcast destination.
    #[error("group id must be positive")]
    ZeroGroupId,

    /// Two roster devices share the same mesh address.
    #[error("mesh address {0} appears more than once in the roster")]
    DuplicateMeshAddress(u16),
}

/// Error when a requested light is not present in the roster.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (e.g. `"Light"`).
    pub entity: &'static str,
    /// Identifier used for the lookup.
    pub id: String,
}

/// Why an inbound status payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Status payloads are exactly 8 hex characters.
    #[error("status payload must be 8 hex characters, got {actual}")]
    WrongLength {
        /// The actual character count.
        actual: usize,
    },

    /// A character pair was not valid hexadecimal.
    #[error("invalid hex byte {pair:?} at offset {offset}")]
    InvalidHex {
        /// The offending two-character slice.
        pair: String,
        /// Character offset of the pair.
        offset: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_channel_out_of_range() {
        let err = ValidationError::ChannelOutOfRange {
            channel: "red",
            value: 300,
        };
        assert_eq!(err.to_string(), "red channel must be within 0..=255, got 300");
    }

    #[test]
    fn should_display_not_found() {
        let err = NotFoundError {
            entity: "Light",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Light not found: 42");
    }

    #[test]
    fn should_display_wrong_length_decode_error() {
        let err = DecodeError::WrongLength { actual: 6 };
        assert_eq!(
            err.to_string(),
            "status payload must be 8 hex characters, got 6"
        );
    }

    #[test]
    fn should_convert_validation_into_mesh_error() {
        let err: MeshError = ValidationError::ZeroGroupId.into();
        assert!(matches!(
            err,
            MeshError::Validation(ValidationError::ZeroGroupId)
        ));
    }

    #[test]
    fn should_expose_validation_as_source() {
        let err: MeshError = ValidationError::ZeroMeshAddress.into();
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "mesh address must be positive");
    }
}
