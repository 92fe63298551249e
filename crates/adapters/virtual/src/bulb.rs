//! Simulated bulb — interprets control payloads the way a mesh bulb would.

use meshlight_domain::color::{
    ColorReading, LightColor, Rgb, encode_status, percent_to_kelvin, rgb_to_hsl,
};
use meshlight_domain::command::OpCode;

/// Power flag and last colour of one simulated bulb.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualBulb {
    power: bool,
    color: LightColor,
}

impl Default for VirtualBulb {
    fn default() -> Self {
        Self {
            power: false,
            color: LightColor::Temperature {
                kelvin: 4000,
                brightness: 1.0,
            },
        }
    }
}

impl VirtualBulb {
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.power
    }

    #[must_use]
    pub fn color(&self) -> LightColor {
        self.color
    }

    /// Apply one control payload. Returns `false` when the payload is not
    /// understood, leaving the bulb untouched.
    pub fn apply(&mut self, op_code: OpCode, payload: &str) -> bool {
        let Some(bytes) = hex_bytes(payload) else {
            return false;
        };
        match (op_code, bytes.as_slice()) {
            (OpCode::POWER, [0x05, 0x01, level, ..]) => {
                self.power = *level != 0;
                true
            }
            (OpCode::COLOR, [0x05, 0x60, red, green, blue, ..]) => {
                let (hue, saturation, lightness) = rgb_to_hsl(Rgb::new(*red, *green, *blue));
                self.color = LightColor::Hsv {
                    hue,
                    saturation,
                    value: lightness,
                };
                self.power = true;
                true
            }
            (OpCode::COLOR, [0x05, 0x62, temperature, brightness, ..]) => {
                self.color = LightColor::Temperature {
                    kelvin: percent_to_kelvin(*temperature),
                    brightness: f64::from((*brightness).min(100)) / 100.0,
                };
                self.power = true;
                true
            }
            _ => false,
        }
    }

    /// The 8-hex-character status this bulb would report.
    #[must_use]
    pub fn status(&self) -> String {
        let color = if self.power {
            self.color
        } else {
            LightColor::OFF
        };
        encode_status(&ColorReading {
            available: true,
            never_reported: false,
            color,
        })
    }
}

fn hex_bytes(payload: &str) -> Option<Vec<u8>> {
    if payload.len() % 2 != 0 {
        return None;
    }
    (0..payload.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(payload.get(index..index + 2)?, 16).ok())
        .collect()
}
