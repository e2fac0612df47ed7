//! Upstream wire messages
//!
//! Every frame is a JSON object whose `message` field names its kind.
//! Timestamps are milliseconds since the Unix epoch.

use colorbridge_device::{Color, ColorFields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Name of the color actuator
pub const COLOR_ACTUATOR: &str = "color";

/// Messages sent to the upstream service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message", rename_all = "camelCase")]
pub enum Outbound {
    /// Authentication, first message on every connection
    Connect {
        name: String,
        serial: String,
        passphrase: String,
    },
    /// One telemetry sample
    SensorLog {
        name: String,
        value: f64,
        time: i64,
        #[serde(rename = "type")]
        kind: String,
        interval: u64,
    },
    /// Current state of an actuator; `None` when unknown
    Actuator {
        name: String,
        value: Option<ColorFields>,
    },
}

impl Outbound {
    /// Color actuator report
    pub fn color(color: Option<Color>) -> Self {
        Outbound::Actuator {
            name: COLOR_ACTUATOR.to_string(),
            value: color.map(|c| c.to_fields()),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Deserialize)]
struct TimeBody {
    timestamp: i64,
}

#[derive(Deserialize)]
struct ActuatorBody {
    name: String,
    #[serde(default)]
    value: Value,
}

/// Messages received from the upstream service
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Server clock
    Time { timestamp: i64 },
    /// Command for an actuator; `value` is kind-specific
    Actuator { name: String, value: Value },
    /// Any other kind, carried by name
    Unknown(String),
}

impl Inbound {
    /// Parse a JSON text frame
    ///
    /// Unknown kinds are not an error. A frame that is not an object with a
    /// string `message` field, or a known kind with a bad body, is.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::ProtocolDecode("missing \"message\" field".into()))?
            .to_string();

        match kind.as_str() {
            "time" => {
                let body: TimeBody = serde_json::from_value(value)?;
                Ok(Inbound::Time {
                    timestamp: body.timestamp,
                })
            }
            "actuator" => {
                let body: ActuatorBody = serde_json::from_value(value)?;
                Ok(Inbound::Actuator {
                    name: body.name,
                    value: body.value,
                })
            }
            _ => Ok(Inbound::Unknown(kind)),
        }
    }
}

/// Decode the value of a `color` actuator command
pub fn parse_color(value: &Value) -> Result<Color, SessionError> {
    let fields = ColorFields::deserialize(value)?;
    Ok(Color::from_fields(&fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorbridge_device::ColorMode;
    use serde_json::json;

    #[test]
    fn test_connect_shape() {
        let msg = Outbound::Connect {
            name: "lamp".into(),
            serial: "CB-1".into(),
            passphrase: "pw".into(),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"message": "connect", "name": "lamp", "serial": "CB-1", "passphrase": "pw"})
        );
    }

    #[test]
    fn test_sensor_log_shape() {
        let msg = Outbound::SensorLog {
            name: "temperature".into(),
            value: 21.5,
            time: 1_700_000_100_000,
            kind: "temperature".into(),
            interval: 300,
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["message"], "sensorLog");
        assert_eq!(value["type"], "temperature");
        assert_eq!(value["time"], 1_700_000_100_000i64);
        assert_eq!(value["interval"], 300);
    }

    #[test]
    fn test_actuator_null_when_unknown() {
        let value: Value = serde_json::from_str(&Outbound::color(None).to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"message": "actuator", "name": "color", "value": null}));
    }

    #[test]
    fn test_actuator_carries_fields() {
        let color = Color::rgb(1.0, 0.0, 0.0);
        let value: Value =
            serde_json::from_str(&Outbound::color(Some(color)).to_json().unwrap()).unwrap();
        assert_eq!(value["value"]["mode"], "rgb");
        assert_eq!(value["value"]["red"], 1.0);
        assert!(value["value"].get("hue").is_none());
    }

    #[test]
    fn test_parse_time() {
        let msg = Inbound::parse(r#"{"message":"time","timestamp":1700000000000}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Time {
                timestamp: 1_700_000_000_000
            }
        );
    }

    #[test]
    fn test_parse_actuator_color() {
        let msg = Inbound::parse(
            r#"{"message":"actuator","name":"color","value":{"mode":"hsv","hue":0.5,"saturation":1.0,"value":1.0}}"#,
        )
        .unwrap();
        let Inbound::Actuator { name, value } = msg else {
            panic!("expected actuator, got {msg:?}");
        };
        assert_eq!(name, "color");
        let color = parse_color(&value).unwrap();
        assert_eq!(color.mode(), ColorMode::Hsv);
        assert_eq!(color.raw(), 0x01_80_FF_FF);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let msg = Inbound::parse(r#"{"message":"firmwareUpdate","url":"x"}"#).unwrap();
        assert_eq!(msg, Inbound::Unknown("firmwareUpdate".into()));
    }

    #[test]
    fn test_parse_malformed() {
        for text in [
            "not json",
            "[1, 2]",
            r#"{"name":"color"}"#,
            r#"{"message":"time"}"#,
            r#"{"message":"time","timestamp":"noon"}"#,
            r#"{"message":"actuator"}"#,
        ] {
            assert!(
                matches!(Inbound::parse(text), Err(SessionError::ProtocolDecode(_))),
                "{text} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_color_rejects_bad_mode() {
        assert!(parse_color(&json!({"mode": "cmyk"})).is_err());
        assert!(parse_color(&Value::Null).is_err());
    }
}
