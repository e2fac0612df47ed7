// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "colorbridge")]
#[command(author, version, about = "Serial light/sensor board bridge")]
#[command(propagate_version = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Trace every byte on the serial link
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Config file (default: $XDG_CONFIG_HOME/colorbridge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port, overrides the config file
    #[arg(long, short = 'p', global = true)]
    pub port: Option<String>,

    /// Upstream WebSocket URL, overrides the config file
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Bridge ===
    /// Run the bridge: poll the board and relay to the upstream service
    #[command(visible_aliases = ["run"])]
    Serve,

    // === Registers ===
    /// Read a register by name
    Get {
        /// Register name (see `help`)
        param: String,
        /// Read attempts
        #[arg(long, default_value_t = colorbridge_device::DEFAULT_TRIES)]
        tries: usize,
    },

    /// Write a register by name
    Set {
        /// Register name (see `help`)
        param: String,
        /// Value in user units (seconds, 0..1, ...)
        value: f64,
        /// Write the value as-is, without the register's scale factor
        #[arg(long)]
        raw: bool,
    },

    /// Reset the board's frame parser
    Resync,

    // === Temperature ===
    /// Read the temperature (median of 10 probes)
    Temp {
        /// Read the firmware's rolling average instead
        #[arg(long)]
        avg: bool,
    },

    /// Dump raw temperature probes
    #[command(name = "temp-dbg", visible_aliases = ["tempDbg"])]
    TempDbg,

    // === Color ===
    /// Read the color, or write a raw color word (hex with 0x, or decimal)
    #[command(visible_aliases = ["c"])]
    Color {
        raw: Option<String>,
    },

    /// Read or set a fixed hue (0..1)
    Hue { hue: Option<f64> },

    /// Read or set the hue loop period in seconds
    #[command(visible_aliases = ["loop"])]
    Time { seconds: Option<f64> },

    /// Read or set saturation (0..1)
    #[command(visible_aliases = ["sat"])]
    Saturation { saturation: Option<f64> },

    /// Read or set value/brightness of the color (0..1)
    #[command(visible_aliases = ["val"])]
    Value { value: Option<f64> },

    /// Read or set the color mode (rgb, hsv, hsv-max)
    Mode { mode: Option<String> },

    // === Utility ===
    /// List registers and commands
    #[command(visible_aliases = ["list", "ls"])]
    Help,

    /// List serial ports
    Ports,
}
