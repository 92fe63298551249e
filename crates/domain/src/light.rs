//! Light — the platform-facing state of one mesh bulb.
//!
//! The state is optimistic: user commands update it immediately, and status
//! notifications from the mesh reconcile it afterwards.

use serde::{Deserialize, Serialize};

use crate::address::MeshAddress;
use crate::color::{ColorReading, LightColor, Rgb, rgb_distance};
use crate::device::Device;
use crate::time::{Timestamp, now};

/// Channels below this value are pulled down when the colour is bright.
const DIM_CHANNEL_CEILING: u8 = 20;
const DIM_CHANNEL_PULL: u8 = 10;
const BRIGHT_CHANNEL_FLOOR: u8 = 100;

/// How the light is currently coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Rgb,
    ColorTemp,
}

/// Desired state carried by a "turn on" request.
///
/// Precedence when several fields are set: `rgb`, then `brightness`, then
/// `color_temp_kelvin`. An empty request is a plain power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnOn {
    pub rgb: Option<Rgb>,
    pub brightness: Option<u8>,
    pub color_temp_kelvin: Option<u32>,
}

/// Current state of one light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub address: MeshAddress,
    pub unique_id: String,
    pub name: String,
    pub is_on: bool,
    pub available: bool,
    pub color_mode: ColorMode,
    pub rgb: Rgb,
    /// Brightness on the `0..=255` scale.
    pub brightness: u8,
    pub color_temp_kelvin: Option<u32>,
    pub last_changed: Timestamp,
}

impl LightState {
    /// Initial state for a roster device: off, red, full brightness.
    #[must_use]
    pub fn from_device(device: &Device) -> Self {
        Self {
            address: device.mesh_address,
            unique_id: device.unique_id.clone(),
            name: device.display_name.clone(),
            is_on: false,
            available: false,
            color_mode: ColorMode::Rgb,
            rgb: Rgb::new(255, 0, 0),
            brightness: u8::MAX,
            color_temp_kelvin: None,
            last_changed: now(),
        }
    }

    /// Reconcile with a status reading from the mesh.
    ///
    /// HS readings within `echo_distance` of the current colour are treated
    /// as the echo of a colour we already hold. Readings from devices that
    /// never reported leave the state untouched apart from availability.
    ///
    /// Returns `true` when the visible state changed.
    pub fn apply_reading(&mut self, reading: &ColorReading, echo_distance: f64) -> bool {
        if reading.never_reported {
            self.available = false;
            return false;
        }

        let before = self.clone();
        self.available = reading.available;

        match reading.color {
            color if color.is_off() => self.is_on = false,
            LightColor::Hsv { value, .. } => {
                self.is_on = true;
                self.brightness = unit_to_brightness(value);
                if let Some(rgb) = reading.to_rgb() {
                    let is_echo = before.is_on
                        && before.color_mode == ColorMode::Rgb
                        && rgb_distance(rgb, before.rgb) < echo_distance;
                    if is_echo {
                        self.brightness = before.brightness;
                    } else {
                        self.color_mode = ColorMode::Rgb;
                        self.rgb = rgb;
                    }
                }
            }
            LightColor::Temperature { kelvin, brightness } => {
                self.is_on = true;
                self.color_mode = ColorMode::ColorTemp;
                self.color_temp_kelvin = Some(kelvin);
                self.brightness = unit_to_brightness(brightness);
            }
        }

        let changed = *self != before;
        if changed {
            self.last_changed = now();
        }
        changed
    }
}

/// Scale a colour by `brightness / 255`, then pull faint channels down
/// when another channel is bright so the mix does not wash out.
#[must_use]
pub fn normalize_colors(rgb: Rgb, brightness: u8) -> Rgb {
    let adjusted = rgb.channels().map(|c| scale_channel(c, brightness));
    let max = adjusted.iter().copied().max().unwrap_or(0);
    Rgb::from(adjusted.map(|c| {
        if max > BRIGHT_CHANNEL_FLOOR && c > 0 && c < DIM_CHANNEL_CEILING {
            c - c.min(DIM_CHANNEL_PULL)
        } else {
            c
        }
    }))
}

/// What the colour would be at full brightness.
#[must_use]
pub fn base_colors(rgb: Rgb) -> Rgb {
    let max = rgb.channels().iter().copied().max().unwrap_or(0);
    if max == 0 {
        return rgb;
    }
    Rgb::from(rgb.channels().map(|c| {
        let scaled = (u16::from(c) * 255).div_ceil(u16::from(max));
        u8::try_from(scaled).unwrap_or(u8::MAX)
    }))
}

/// Scale every channel by `brightness / 255`.
#[must_use]
pub fn scale_brightness(rgb: Rgb, brightness: u8) -> Rgb {
    Rgb::from(rgb.channels().map(|c| scale_channel(c, brightness)))
}

fn scale_channel(channel: u8, brightness: u8) -> u8 {
    let scaled = u16::from(channel) * u16::from(brightness) / 255;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_brightness(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::decode_status;
    use crate::device::tests::device;

    fn light() -> LightState {
        LightState::from_device(&device(10, &[]))
    }

    #[test]
    fn should_start_off_and_unavailable() {
        let state = light();
        assert!(!state.is_on);
        assert!(!state.available);
        assert_eq!(state.rgb, Rgb::new(255, 0, 0));
        assert_eq!(state.brightness, 255);
    }

    #[test]
    fn should_scale_colors_by_brightness() {
        assert_eq!(
            normalize_colors(Rgb::new(200, 100, 50), 128),
            Rgb::new(100, 50, 25)
        );
    }

    #[test]
    fn should_pull_faint_channels_down_when_bright() {
        assert_eq!(
            normalize_colors(Rgb::new(255, 15, 5), 255),
            Rgb::new(255, 5, 0)
        );
    }

    #[test]
    fn should_keep_faint_channels_when_nothing_is_bright() {
        assert_eq!(normalize_colors(Rgb::new(90, 15, 0), 255), Rgb::new(90, 15, 0));
    }

    #[test]
    fn should_restore_full_brightness_base_colors() {
        assert_eq!(base_colors(Rgb::new(100, 50, 0)), Rgb::new(255, 128, 0));
        assert_eq!(base_colors(Rgb::new(0, 0, 0)), Rgb::new(0, 0, 0));
    }

    #[test]
    fn should_turn_off_on_off_reading() {
        let mut state = light();
        state.is_on = true;
        let changed = state.apply_reading(&decode_status("01003F00").unwrap(), 50.0);
        assert!(changed);
        assert!(!state.is_on);
        assert!(state.available);
    }

    #[test]
    fn should_adopt_new_hs_color() {
        let mut state = light();
        let changed = state.apply_reading(&decode_status("01323F55").unwrap(), 50.0);
        assert!(changed);
        assert!(state.is_on);
        assert_eq!(state.rgb, Rgb::new(0, 255, 0));
        assert_eq!(state.color_mode, ColorMode::Rgb);
    }

    #[test]
    fn should_ignore_close_hs_echo() {
        let mut state = light();
        state.is_on = true;
        state.available = true;
        state.rgb = Rgb::new(250, 5, 0);
        let changed = state.apply_reading(&decode_status("01323F00").unwrap(), 50.0);
        assert!(!changed);
        assert_eq!(state.rgb, Rgb::new(250, 5, 0));
    }

    #[test]
    fn should_switch_to_temperature_mode() {
        let mut state = light();
        let changed = state.apply_reading(&decode_status("01644000").unwrap(), 50.0);
        assert!(changed);
        assert_eq!(state.color_mode, ColorMode::ColorTemp);
        assert_eq!(state.color_temp_kelvin, Some(2500));
        assert_eq!(state.brightness, 255);
    }

    #[test]
    fn should_not_change_state_for_never_reported_device() {
        let mut state = light();
        state.is_on = true;
        state.available = true;
        let changed = state.apply_reading(&decode_status("00000000").unwrap(), 50.0);
        assert!(!changed);
        assert!(state.is_on);
        assert!(!state.available);
    }

    #[test]
    fn should_deserialize_partial_turn_on() {
        let request: TurnOn = serde_json::from_str(r#"{"brightness": 80}"#).unwrap();
        assert_eq!(request.brightness, Some(80));
        assert!(request.rgb.is_none());
    }
}
