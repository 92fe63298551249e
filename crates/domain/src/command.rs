//! Command encoder — builds the fixed-format hex commands understood by the
//! mesh bridge.
//!
//! Every command is an [`OutboundCommand`]: a destination, a one-byte
//! operation code and a hex payload. Two commands with the same operation
//! code and payload drive their destinations to the same state, which is
//! what the outbound queue relies on to merge them into group commands.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Destination;
use crate::color::{MAX_KELVIN, MIN_KELVIN, Rgb, kelvin_to_percent};
use crate::error::ValidationError;

/// Sum of the three channels above which the bulbs draw too much power.
pub const MAX_CHANNEL_SUM: u16 = 630;
/// Colour temperature used when the caller supplies none.
pub const DEFAULT_KELVIN: u32 = 5000;

const COLOR_PREFIX: &str = "0560";
const COLOR_SUFFIX: &str = "00000200";
const TEMPERATURE_PREFIX: &str = "0562";
const TEMPERATURE_SUFFIX: &str = "0000000200";
const POWER_ON_PAYLOAD: &str = "0501FF000000000300";
const POWER_OFF_PAYLOAD: &str = "050100000000000300";

/// One-byte command class identifier, written as two hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpCode(u8);

impl OpCode {
    /// Colour and colour-temperature commands.
    pub const COLOR: Self = Self(0xE2);
    /// Power on/off commands.
    pub const POWER: Self = Self(0xD0);

    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        u8::from_str_radix(&text, 16)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A command ready to be queued. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutboundCommand {
    pub destination: Destination,
    pub op_code: OpCode,
    pub payload: String,
}

impl OutboundCommand {
    #[must_use]
    pub fn new(destination: Destination, op_code: OpCode, payload: impl Into<String>) -> Self {
        Self {
            destination,
            op_code,
            payload: payload.into(),
        }
    }

    /// The same command addressed elsewhere.
    #[must_use]
    pub fn redirect(&self, destination: Destination) -> Self {
        Self {
            destination,
            op_code: self.op_code,
            payload: self.payload.clone(),
        }
    }

    /// Whether `other` drives its destination to the same state.
    #[must_use]
    pub fn same_effect(&self, other: &Self) -> bool {
        self.op_code == other.op_code && self.payload == other.payload
    }
}

/// Lower all three channels by the same step until their sum fits the
/// power limit.
///
/// # Errors
///
/// Returns [`ValidationError::ChannelOutOfRange`] for any channel outside
/// `0..=255`.
pub fn limit_power(red: i32, green: i32, blue: i32) -> Result<Rgb, ValidationError> {
    let red = channel("red", red)?;
    let green = channel("green", green)?;
    let blue = channel("blue", blue)?;

    let sum = u16::from(red) + u16::from(green) + u16::from(blue);
    if sum <= MAX_CHANNEL_SUM {
        return Ok(Rgb::new(red, green, blue));
    }

    // Three channels of at most 255 exceed the limit by at most 135, so the
    // step is at most 45 and the smallest channel (at least 120) never
    // underflows.
    let step = u8::try_from((sum - MAX_CHANNEL_SUM).div_ceil(3)).unwrap_or(u8::MAX);
    Ok(Rgb::new(
        red.saturating_sub(step),
        green.saturating_sub(step),
        blue.saturating_sub(step),
    ))
}

/// Encode a "set colour" command.
///
/// # Errors
///
/// Returns [`ValidationError::ChannelOutOfRange`] for any channel outside
/// `0..=255`.
pub fn set_color(
    destination: impl Into<Destination>,
    red: i32,
    green: i32,
    blue: i32,
) -> Result<OutboundCommand, ValidationError> {
    let rgb = limit_power(red, green, blue)?;
    let payload = format!(
        "{COLOR_PREFIX}{:02X}{:02X}{:02X}{COLOR_SUFFIX}",
        rgb.red, rgb.green, rgb.blue
    );
    Ok(OutboundCommand::new(
        destination.into(),
        OpCode::COLOR,
        payload,
    ))
}

/// Encode a "turn on" command.
#[must_use]
pub fn turn_on(destination: impl Into<Destination>) -> OutboundCommand {
    OutboundCommand::new(destination.into(), OpCode::POWER, POWER_ON_PAYLOAD)
}

/// Encode a "turn off" command.
#[must_use]
pub fn turn_off(destination: impl Into<Destination>) -> OutboundCommand {
    OutboundCommand::new(destination.into(), OpCode::POWER, POWER_OFF_PAYLOAD)
}

/// Encode a "set colour temperature" command.
///
/// A missing or zero `kelvin` falls back to [`DEFAULT_KELVIN`]. The
/// brightness is given on the platform's `0..=255` scale.
///
/// # Errors
///
/// Returns [`ValidationError::ColorTempOutOfRange`] when `kelvin` is
/// outside the supported range; nothing is encoded in that case.
pub fn set_color_temp(
    destination: impl Into<Destination>,
    kelvin: Option<u32>,
    brightness: u8,
) -> Result<OutboundCommand, ValidationError> {
    let kelvin = kelvin.filter(|value| *value != 0).unwrap_or(DEFAULT_KELVIN);
    if !(MIN_KELVIN..=MAX_KELVIN).contains(&kelvin) {
        return Err(ValidationError::ColorTempOutOfRange {
            value: kelvin,
            min: MIN_KELVIN,
            max: MAX_KELVIN,
        });
    }

    let payload = format!(
        "{TEMPERATURE_PREFIX}{:02X}{:02X}{TEMPERATURE_SUFFIX}",
        kelvin_to_percent(kelvin),
        brightness_to_percent(brightness),
    );
    Ok(OutboundCommand::new(
        destination.into(),
        OpCode::COLOR,
        payload,
    ))
}

/// Rescale a `0..=255` brightness onto the `0..=100` wire scale.
#[must_use]
pub fn brightness_to_percent(brightness: u8) -> u8 {
    let scaled = (u16::from(brightness) * 100 + 127) / 255;
    u8::try_from(scaled).unwrap_or(100)
}

fn channel(name: &'static str, value: i32) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::ChannelOutOfRange {
        channel: name,
        value,
    })
}
