//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (get, temp, temp-dbg, color, help, ports)
//! - `set`: Writing commands (set, resync, color field setters)
//! - `serve`: The bridge itself

pub mod query;
pub mod serve;
pub mod set;

use colorbridge::Config;
use colorbridge_device::{Device, DeviceError, Reading};
use colorbridge_transport::{BoxedLink, Bus, MonitorLink, SerialLink};
use std::fmt::Display;
use tokio::sync::mpsc;

/// Result type for command handlers
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Settings shared by every command
pub struct Context {
    pub config: Config,
    pub monitor: bool,
}

impl Context {
    /// Open the serial link named in the config
    pub fn open_link(&self) -> Result<BoxedLink, Box<dyn std::error::Error>> {
        let device = &self.config.device;
        let link: BoxedLink = Box::new(SerialLink::open(&device.port, device.baud_rate)?);
        Ok(if self.monitor {
            MonitorLink::wrap(link)
        } else {
            link
        })
    }

    /// Open the board for a one-shot command
    ///
    /// Prints an error and returns None if the port cannot be opened.
    pub fn open_device<T>(&self) -> Option<Device<T>> {
        match self.open_link() {
            Ok(link) => Some(Device::new(Bus::new(link))),
            Err(e) => {
                eprintln!("No device on {}: {e}", self.config.device.port);
                None
            }
        }
    }
}

/// Print a reading, or why there is none
pub fn print_reading<T: Display>(label: &str, reading: Reading<T>) {
    match reading {
        Reading {
            value: Some(value), ..
        } => println!("{label}: {value}"),
        Reading { online: true, .. } => eprintln!("{label}: no valid data (corrupt frames)"),
        Reading { online: false, .. } => eprintln!("{label}: device offline"),
    }
}

/// Device errors are expected conditions: print them instead of failing
pub fn report(result: Result<(), DeviceError>) -> CommandResult {
    if let Err(e) = result {
        eprintln!("Error: {e}");
    }
    Ok(())
}

/// Ctrl-C handler feeding a channel
pub fn setup_shutdown_channel() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);

    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .ok();

    rx
}
