//! Packed 32-bit color word
//!
//! Byte 0 is the most significant byte of the word:
//!
//! ```text
//! byte 0   W L - - - - M M   white, looping, mode
//! byte 1   hue | loop time (minifloat, 1/4 s) | red
//! byte 2   saturation | green
//! byte 3   value | blue
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::minifloat;

const MODE_MASK: u8 = 0x03;
const LOOPING_BIT: u8 = 0x40;
const WHITE_BIT: u8 = 0x80;

/// Loop times travel as quarter seconds
const TIME_UNITS_PER_SECOND: f64 = 4.0;

/// Color interpretation mode (low two bits of byte 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum ColorMode {
    Rgb = 0,
    Hsv = 1,
    HsvMax = 2,
    /// Bit pattern 3 has no firmware meaning but must survive a round trip
    Undefined = 3,
}

impl ColorMode {
    /// Mode from the low two bits of `bits`
    pub fn from_bits(bits: u8) -> Self {
        match bits & MODE_MASK {
            0 => Self::Rgb,
            1 => Self::Hsv,
            2 => Self::HsvMax,
            _ => Self::Undefined,
        }
    }

    /// Whether bytes 1-3 carry hue/saturation/value
    pub fn is_hsv_family(self) -> bool {
        matches!(self, Self::Hsv | Self::HsvMax)
    }

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Hsv => "hsv",
            Self::HsvMax => "hsv-max",
            Self::Undefined => "undefined",
        }
    }

    /// Parse a wire name (`rgb`, `hsv`, `hsv-max`, `undefined`) or bit value
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" | "0" => Some(Self::Rgb),
            "hsv" | "1" => Some(Self::Hsv),
            "hsv-max" | "hsvmax" | "2" => Some(Self::HsvMax),
            "undefined" | "3" => Some(Self::Undefined),
            _ => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scale a normalized channel to a byte
fn to_channel(x: f64) -> u8 {
    (x * 255.0).round() as u8
}

/// Scale a byte to a normalized channel
fn from_channel(b: u8) -> f64 {
    b as f64 / 255.0
}

/// A color as stored in the board's `color` register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    bytes: [u8; 4],
}

impl Color {
    /// Decode a raw register word
    pub fn from_raw(raw: u32) -> Self {
        Self {
            bytes: raw.to_be_bytes(),
        }
    }

    /// Encode to a raw register word
    pub fn raw(&self) -> u32 {
        u32::from_be_bytes(self.bytes)
    }

    /// Plain RGB color
    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self {
            bytes: [
                ColorMode::Rgb as u8,
                to_channel(red),
                to_channel(green),
                to_channel(blue),
            ],
        }
    }

    /// Fixed-hue HSV color
    pub fn hsv(hue: f64, saturation: f64, value: f64) -> Self {
        Self {
            bytes: [
                ColorMode::Hsv as u8,
                to_channel(hue),
                to_channel(saturation),
                to_channel(value),
            ],
        }
    }

    pub fn mode(&self) -> ColorMode {
        ColorMode::from_bits(self.bytes[0])
    }

    pub fn is_white(&self) -> bool {
        self.bytes[0] & WHITE_BIT != 0
    }

    pub fn is_looping(&self) -> bool {
        self.bytes[0] & LOOPING_BIT != 0
    }

    fn is_rgb(&self) -> bool {
        self.mode() == ColorMode::Rgb
    }

    /// Fixed hue, absent in RGB or looping colors
    pub fn hue(&self) -> Option<f64> {
        (!self.is_rgb() && !self.is_looping()).then(|| from_channel(self.bytes[1]))
    }

    /// Hue loop period in seconds, present only for looping colors
    pub fn time(&self) -> Option<f64> {
        (!self.is_rgb() && self.is_looping())
            .then(|| minifloat::decode(self.bytes[1]) as f64 / TIME_UNITS_PER_SECOND)
    }

    pub fn saturation(&self) -> Option<f64> {
        (!self.is_rgb()).then(|| from_channel(self.bytes[2]))
    }

    pub fn value(&self) -> Option<f64> {
        (!self.is_rgb()).then(|| from_channel(self.bytes[3]))
    }

    pub fn red(&self) -> Option<f64> {
        self.is_rgb().then(|| from_channel(self.bytes[1]))
    }

    pub fn green(&self) -> Option<f64> {
        self.is_rgb().then(|| from_channel(self.bytes[2]))
    }

    pub fn blue(&self) -> Option<f64> {
        self.is_rgb().then(|| from_channel(self.bytes[3]))
    }

    // === Setters ===
    //
    // Channel setters switch a non-HSV color to `hsv` first.

    fn ensure_hsv(&mut self) {
        if !self.mode().is_hsv_family() {
            self.set_mode(ColorMode::Hsv);
        }
    }

    fn set_flag(&mut self, bit: u8, on: bool) {
        if on {
            self.bytes[0] |= bit;
        } else {
            self.bytes[0] &= !bit;
        }
    }

    /// Set the mode bits, keeping flags and channel bytes
    pub fn set_mode(&mut self, mode: ColorMode) {
        self.bytes[0] = (self.bytes[0] & !MODE_MASK) | mode as u8;
    }

    pub fn set_white(&mut self, white: bool) {
        self.set_flag(WHITE_BIT, white);
    }

    /// Hold a fixed hue (clears looping)
    pub fn set_hue(&mut self, hue: f64) {
        self.ensure_hsv();
        self.set_flag(LOOPING_BIT, false);
        self.bytes[1] = to_channel(hue);
    }

    /// Cycle the hue with a period of `seconds` (sets looping)
    pub fn set_time(&mut self, seconds: f64) {
        self.ensure_hsv();
        self.set_flag(LOOPING_BIT, true);
        self.bytes[1] = minifloat::encode(seconds * TIME_UNITS_PER_SECOND);
    }

    pub fn set_saturation(&mut self, saturation: f64) {
        self.ensure_hsv();
        self.bytes[2] = to_channel(saturation);
    }

    pub fn set_value(&mut self, value: f64) {
        self.ensure_hsv();
        self.bytes[3] = to_channel(value);
    }

    // === Structured form ===

    /// Field view used on the upstream wire
    pub fn to_fields(&self) -> ColorFields {
        ColorFields {
            mode: self.mode(),
            white: self.is_white(),
            looping: self.is_looping(),
            hue: self.hue(),
            time: self.time(),
            saturation: self.saturation(),
            value: self.value(),
            red: self.red(),
            green: self.green(),
            blue: self.blue(),
        }
    }

    /// Build from a field view; missing channels count as 0
    pub fn from_fields(fields: &ColorFields) -> Self {
        let mut bytes = [fields.mode as u8, 0, 0, 0];
        if fields.white {
            bytes[0] |= WHITE_BIT;
        }
        if fields.looping {
            bytes[0] |= LOOPING_BIT;
        }

        if fields.mode == ColorMode::Rgb {
            bytes[1] = to_channel(fields.red.unwrap_or(0.0));
            bytes[2] = to_channel(fields.green.unwrap_or(0.0));
            bytes[3] = to_channel(fields.blue.unwrap_or(0.0));
        } else {
            bytes[1] = if fields.looping {
                minifloat::encode(fields.time.unwrap_or(0.0) * TIME_UNITS_PER_SECOND)
            } else {
                to_channel(fields.hue.unwrap_or(0.0))
            };
            bytes[2] = to_channel(fields.saturation.unwrap_or(0.0));
            bytes[3] = to_channel(fields.value.unwrap_or(0.0));
        }
        Self { bytes }
    }
}

impl From<u32> for Color {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.mode(), self.raw())?;
        if let (Some(r), Some(g), Some(b)) = (self.red(), self.green(), self.blue()) {
            write!(f, " r={r:.3} g={g:.3} b={b:.3}")?;
        }
        if let Some(h) = self.hue() {
            write!(f, " h={h:.3}")?;
        }
        if let Some(t) = self.time() {
            write!(f, " loop={t}s")?;
        }
        if let (Some(s), Some(v)) = (self.saturation(), self.value()) {
            write!(f, " s={s:.3} v={v:.3}")?;
        }
        if self.is_white() {
            f.write_str(" +white")?;
        }
        Ok(())
    }
}

/// Color as a flat record of optional fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorFields {
    pub mode: ColorMode,
    #[serde(default)]
    pub white: bool,
    #[serde(default)]
    pub looping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub green: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blue: Option<f64>,
}
