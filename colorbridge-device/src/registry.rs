// Parameter Registry - Known board registers
//
// Single source of truth for firmware register ids, word widths and scaling.
// A firmware change to command ids only touches this table.

use colorbridge_transport::protocol::{self, Width};

use crate::error::DeviceError;

/// A named board register
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    /// Logical name used by the CLI and the session
    pub name: &'static str,
    /// Register id (top two opcode bits are added per direction/width)
    pub opcode: u8,
    /// Word width on the wire
    pub width: Width,
    /// Multiplier applied to user input before truncation
    pub scale: Option<f64>,
    /// Largest raw value the firmware accepts
    pub max_raw: Option<u32>,
    /// Whether a setter exists
    pub writable: bool,
}

impl Parameter {
    /// Opcode that reads this register
    pub fn getter(&self) -> u8 {
        protocol::getter(self.opcode, self.width)
    }

    /// Opcode that writes this register
    pub fn setter(&self) -> u8 {
        protocol::setter(self.opcode, self.width)
    }

    /// Upper bound for raw values: explicit maximum or word capacity
    pub fn raw_limit(&self) -> u32 {
        self.max_raw.unwrap_or_else(|| self.width.max_raw())
    }

    /// Raw register value for user input `value`
    ///
    /// With `scaled`, the scale factor is applied first. The result is
    /// truncated toward zero.
    pub fn raw_value(&self, value: f64, scaled: bool) -> Result<u32, DeviceError> {
        if !self.writable {
            return Err(DeviceError::ReadOnly(self.name));
        }
        let value = match (scaled, self.scale) {
            (true, Some(scale)) => value * scale,
            _ => value,
        };
        let raw = value.trunc() as i64;
        let max = self.raw_limit();
        if raw < 0 || raw > max as i64 {
            return Err(DeviceError::ValueOutOfRange {
                name: self.name,
                raw,
                max,
            });
        }
        Ok(raw as u32)
    }
}

/// All board registers
const PARAMETERS: &[Parameter] = &[
    // Instantaneous thermistor reading, raw = centidegrees + 5500
    Parameter {
        name: "temp",
        opcode: 0x01,
        width: Width::Two,
        scale: None,
        max_raw: None,
        writable: false,
    },
    // Firmware-side rolling average of `temp`
    Parameter {
        name: "tempavg",
        opcode: 0x02,
        width: Width::Two,
        scale: None,
        max_raw: None,
        writable: false,
    },
    // Packed color word, see `color::Color`
    Parameter {
        name: "color",
        opcode: 0x03,
        width: Width::Four,
        scale: None,
        max_raw: None,
        writable: true,
    },
    // Hue loop period, seconds in, milliseconds on the wire
    Parameter {
        name: "looptime",
        opcode: 0x04,
        width: Width::Two,
        scale: Some(1000.0),
        max_raw: Some(65_535),
        writable: true,
    },
    // Cross-fade duration between colors, seconds in, milliseconds on the wire
    Parameter {
        name: "fadetime",
        opcode: 0x05,
        width: Width::Two,
        scale: Some(1000.0),
        max_raw: Some(65_535),
        writable: true,
    },
    // Global brightness, 0..1 in
    Parameter {
        name: "brightness",
        opcode: 0x06,
        width: Width::Two,
        scale: Some(65_535.0),
        max_raw: Some(65_535),
        writable: true,
    },
    // Seconds since board power-up
    Parameter {
        name: "uptime",
        opcode: 0x07,
        width: Width::Four,
        scale: None,
        max_raw: None,
        writable: false,
    },
    Parameter {
        name: "version",
        opcode: 0x08,
        width: Width::Two,
        scale: None,
        max_raw: None,
        writable: false,
    },
];

/// Look up a register by logical name
pub fn describe(name: &str) -> Result<&'static Parameter, DeviceError> {
    PARAMETERS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| DeviceError::UnknownParameter(name.to_string()))
}

/// Every register, in table order
pub fn all() -> &'static [Parameter] {
    PARAMETERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_describe_known() {
        let color = describe("color").unwrap();
        assert_eq!(color.width, Width::Four);
        assert_eq!(color.getter(), 0x43);
        assert_eq!(color.setter(), 0xC3);

        let temp = describe("temp").unwrap();
        assert_eq!(temp.getter(), 0x01);
        assert!(!temp.writable);
    }

    #[test]
    fn test_describe_unknown() {
        assert!(matches!(
            describe("nope"),
            Err(DeviceError::UnknownParameter(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_raw_value_scaling() {
        let looptime = describe("looptime").unwrap();
        assert_eq!(looptime.raw_value(2.5, true).unwrap(), 2500);
        assert_eq!(looptime.raw_value(2.5, false).unwrap(), 2);
        assert_eq!(looptime.raw_value(1.9999, true).unwrap(), 1999);
        assert!(matches!(
            looptime.raw_value(70.0, true),
            Err(DeviceError::ValueOutOfRange { raw: 70000, .. })
        ));
        assert!(matches!(
            looptime.raw_value(-1.0, false),
            Err(DeviceError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            describe("temp").unwrap().raw_value(1.0, false),
            Err(DeviceError::ReadOnly("temp"))
        ));
    }

    #[test]
    fn test_table_is_consistent() {
        let mut names = HashSet::new();
        let mut opcodes = HashSet::new();
        for p in all() {
            assert!(names.insert(p.name), "duplicate name {}", p.name);
            assert!(opcodes.insert(p.opcode), "duplicate opcode {}", p.opcode);
            assert!(p.opcode <= protocol::BASE_MASK, "{} overlaps mode bits", p.name);
            assert!(p.raw_limit() <= p.width.max_raw());
        }
    }
}
