//! Device interface error types

use colorbridge_transport::TransportError;
use thiserror::Error;

/// Errors from device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Name not present in the parameter table
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Setter used on a read-only register
    #[error("Parameter is read-only: {0}")]
    ReadOnly(&'static str),

    /// Scaled value does not fit the register
    #[error("Value {raw} out of range for {name} (max {max})")]
    ValueOutOfRange {
        name: &'static str,
        raw: i64,
        max: u32,
    },

    /// The board answered but no trustworthy value came back
    #[error("No data from device")]
    NoData,

    /// The board did not answer at all
    #[error("Device is offline")]
    Offline,
}
