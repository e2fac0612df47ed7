//! colorbridge CLI
//!
//! Runs the board-to-cloud bridge and offers one-shot diagnostics for the
//! board's registers and color.

use clap::Parser;
use colorbridge::Config;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::Context;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    colorbridge::logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(port) = cli.port {
        config.device.port = port;
    }
    if let Some(url) = cli.url {
        config.upstream.url = url;
    }
    let ctx = Context {
        config,
        monitor: cli.monitor,
    };

    match cli.command {
        // Default: run the bridge
        None | Some(Commands::Serve) => commands::serve::serve(&ctx).await?,

        // === Registers ===
        Some(Commands::Get { param, tries }) => commands::query::get(&ctx, &param, tries).await?,
        Some(Commands::Set { param, value, raw }) => {
            commands::set::set(&ctx, &param, value, raw).await?
        }
        Some(Commands::Resync) => commands::set::resync(&ctx).await?,

        // === Temperature ===
        Some(Commands::Temp { avg }) => commands::query::temp(&ctx, avg).await?,
        Some(Commands::TempDbg) => commands::query::temp_dbg(&ctx).await?,

        // === Color ===
        Some(Commands::Color { raw: None }) => commands::query::color(&ctx).await?,
        Some(Commands::Color { raw: Some(raw) }) => commands::set::color_raw(&ctx, &raw).await?,
        Some(Commands::Hue { hue }) => commands::set::hue(&ctx, hue).await?,
        Some(Commands::Time { seconds }) => commands::set::time(&ctx, seconds).await?,
        Some(Commands::Saturation { saturation }) => {
            commands::set::saturation(&ctx, saturation).await?
        }
        Some(Commands::Value { value }) => commands::set::value(&ctx, value).await?,
        Some(Commands::Mode { mode }) => commands::set::mode(&ctx, mode.as_deref()).await?,

        // === Utility ===
        Some(Commands::Help) => commands::query::help()?,
        Some(Commands::Ports) => commands::query::ports()?,
    }

    Ok(())
}
