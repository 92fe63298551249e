//! Colour codec — decodes the compact status notifications pushed by the
//! mesh bridge and converts between the cloud's HSL-like representation
//! and RGB.
//!
//! A status payload is 4 bytes written as 8 hex characters:
//!
//! | Byte | Meaning | Scale |
//! |------|---------|-------|
//! | 0 | Reported / reachable flag | `0` = never reported |
//! | 1 | Brightness | percent, `/ 100` |
//! | 2 | Saturation | `/ 63` (values above 63 flag a colour-temperature report) |
//! | 3 | Hue, or temperature percent in colour-temperature mode | `* 360 / 255`, or `0..=100` over the Kelvin range |

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ValidationError};

/// Lowest colour temperature the bulbs support.
pub const MIN_KELVIN: u32 = 2500;
/// Highest colour temperature the bulbs support.
pub const MAX_KELVIN: u32 = 6535;

const STATUS_HEX_LEN: usize = 8;
const SATURATION_SCALE: f64 = 63.0;
const PERCENT_SCALE: f64 = 100.0;
const HUE_SCALE: f64 = 255.0;
const MIN_HSL_COMPONENT: f64 = 0.1;
/// Saturation byte written when encoding a colour-temperature status.
const TEMPERATURE_MARKER: u8 = 64;

/// An 8-bit-per-channel RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Channels as an array, in `[red, green, blue]` order.
    #[must_use]
    pub const fn channels(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Whether every channel is zero.
    #[must_use]
    pub const fn is_black(self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self { red, green, blue }
    }
}

/// Colour carried by a status notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LightColor {
    /// Hue in degrees `0..=360`, saturation and value in `0..=1`.
    Hsv {
        hue: f64,
        saturation: f64,
        value: f64,
    },
    /// White light at a colour temperature, brightness in `0..=1`.
    Temperature { kelvin: u32, brightness: f64 },
}

impl LightColor {
    /// The "off" reading: hue, saturation and value all zero.
    pub const OFF: Self = Self::Hsv {
        hue: 0.0,
        saturation: 0.0,
        value: 0.0,
    };

    /// Whether this colour means the light is dark.
    #[must_use]
    pub fn is_off(&self) -> bool {
        match *self {
            Self::Hsv {
                saturation, value, ..
            } => saturation == 0.0 || value == 0.0,
            Self::Temperature { brightness, .. } => brightness == 0.0,
        }
    }
}

/// A decoded status notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorReading {
    /// Byte 0 was non-zero.
    pub available: bool,
    /// Byte 0 and the colour bytes were all zero: the device has never
    /// reported and no light state should be derived from this reading.
    pub never_reported: bool,
    pub color: LightColor,
}

impl ColorReading {
    /// Reading used when a payload could not be decoded.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            available: false,
            never_reported: false,
            color: LightColor::OFF,
        }
    }

    /// Convert an HS reading to RGB for display.
    ///
    /// Returns `None` for colour-temperature readings and for HS readings
    /// whose saturation or value is too low to convert.
    #[must_use]
    pub fn to_rgb(&self) -> Option<Rgb> {
        match self.color {
            LightColor::Hsv {
                hue,
                saturation,
                value,
            } => hsl_to_rgb(hue, saturation, value).ok(),
            LightColor::Temperature { .. } => None,
        }
    }
}

/// Decode an 8-hex-character status payload.
///
/// Pure function: the same input always yields the same reading.
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload is not exactly 4 hex-encoded
/// bytes.
pub fn decode_status(hex: &str) -> Result<ColorReading, DecodeError> {
    let [flag, brightness_raw, saturation_raw, hue_raw] = parse_status_bytes(hex)?;

    let available = flag != 0;
    let never_reported = flag == 0 && brightness_raw == 0 && saturation_raw == 0 && hue_raw == 0;

    let brightness = f64::from(brightness_raw) / PERCENT_SCALE;
    let saturation = f64::from(saturation_raw) / SATURATION_SCALE;

    let color = if saturation == 0.0 || brightness == 0.0 {
        LightColor::OFF
    } else if saturation > 1.0 {
        LightColor::Temperature {
            kelvin: percent_to_kelvin(hue_raw),
            brightness: brightness.min(1.0),
        }
    } else {
        LightColor::Hsv {
            hue: f64::from(hue_raw) * 360.0 / HUE_SCALE,
            saturation,
            value: brightness.min(1.0),
        }
    };

    Ok(ColorReading {
        available,
        never_reported,
        color,
    })
}

/// Build a status payload describing `reading`.
///
/// Inverse of [`decode_status`] up to the rounding of each byte.
#[must_use]
pub fn encode_status(reading: &ColorReading) -> String {
    if reading.never_reported {
        return "00000000".to_string();
    }
    let flag = u8::from(reading.available);
    let [brightness, saturation, hue] = match reading.color {
        color if color.is_off() => [0, 0, 0],
        LightColor::Hsv {
            hue,
            saturation,
            value,
        } => [
            scale_to_byte(value, PERCENT_SCALE),
            scale_to_byte(saturation, SATURATION_SCALE),
            scale_to_byte(hue / 360.0, HUE_SCALE),
        ],
        LightColor::Temperature { kelvin, brightness } => [
            scale_to_byte(brightness, PERCENT_SCALE),
            TEMPERATURE_MARKER,
            kelvin_to_percent(kelvin),
        ],
    };
    format!("{flag:02X}{brightness:02X}{saturation:02X}{hue:02X}")
}

/// Map a Kelvin value onto the `0..=100` scale used on the wire.
///
/// Values outside the supported range are clamped first.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn kelvin_to_percent(kelvin: u32) -> u8 {
    let kelvin = kelvin.clamp(MIN_KELVIN, MAX_KELVIN);
    let proportion = f64::from(kelvin - MIN_KELVIN) / f64::from(MAX_KELVIN - MIN_KELVIN);
    (proportion * PERCENT_SCALE) as u8
}

/// Map a `0..=100` wire percentage onto the supported Kelvin range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent_to_kelvin(percent: u8) -> u32 {
    let proportion = f64::from(percent.min(100)) / PERCENT_SCALE;
    MIN_KELVIN + (proportion * f64::from(MAX_KELVIN - MIN_KELVIN)).round() as u32
}

/// Standard HSL to RGB conversion.
///
/// Zero saturation or lightness is not accepted here: a dark light is
/// represented by [`LightColor::OFF`], never by this function.
///
/// # Errors
///
/// Returns [`ValidationError`] when `hue` is outside `0..=360` or when
/// `saturation` / `lightness` are not within `(0.1, 1.0]`.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Result<Rgb, ValidationError> {
    if !(0.0..=360.0).contains(&hue) {
        return Err(ValidationError::HueOutOfRange(hue));
    }
    if !(saturation > MIN_HSL_COMPONENT && saturation <= 1.0) {
        return Err(ValidationError::SaturationOutOfRange(saturation));
    }
    if !(lightness > MIN_HSL_COMPONENT && lightness <= 1.0) {
        return Err(ValidationError::LightnessOutOfRange(lightness));
    }

    let hue = hue / 360.0;
    let q = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;

    Ok(Rgb {
        red: unit_to_byte(hue_to_channel(p, q, hue + 1.0 / 3.0)),
        green: unit_to_byte(hue_to_channel(p, q, hue)),
        blue: unit_to_byte(hue_to_channel(p, q, hue - 1.0 / 3.0)),
    })
}

/// Standard RGB to HSL conversion: hue in degrees, saturation and
/// lightness in `0..=1`.
#[must_use]
pub fn rgb_to_hsl(rgb: Rgb) -> (f64, f64, f64) {
    let r = f64::from(rgb.red) / 255.0;
    let g = f64::from(rgb.green) / 255.0;
    let b = f64::from(rgb.blue) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return (0.0, 0.0, lightness);
    }

    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let sector = if (max - r).abs() < f64::EPSILON {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (sector * 60.0, saturation, lightness)
}

/// Euclidean distance between two colours in RGB space.
#[must_use]
pub fn rgb_distance(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a.red) - f64::from(b.red);
    let dg = f64::from(a.green) - f64::from(b.green);
    let db = f64::from(a.blue) - f64::from(b.blue);
    (dr * dr + dg * dg + db * db).sqrt()
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_to_byte(value: f64, scale: f64) -> u8 {
    (value * scale).round().clamp(0.0, 255.0) as u8
}

fn parse_status_bytes(hex: &str) -> Result<[u8; 4], DecodeError> {
    let raw = hex.as_bytes();
    if raw.len() != STATUS_HEX_LEN {
        return Err(DecodeError::WrongLength { actual: raw.len() });
    }

    let mut bytes = [0u8; 4];
    for (index, pair) in raw.chunks(2).enumerate() {
        let invalid = || DecodeError::InvalidHex {
            pair: String::from_utf8_lossy(pair).into_owned(),
            offset: index * 2,
        };
        if !pair.iter().all(u8::is_ascii_hexdigit) {
            return Err(invalid());
        }
        let text = std::str::from_utf8(pair).map_err(|_| invalid())?;
        bytes[index] = u8::from_str_radix(text, 16).map_err(|_| invalid())?;
    }
    Ok(bytes)
}
