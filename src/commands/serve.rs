//! The bridge

use super::{setup_shutdown_channel, CommandResult, Context};
use colorbridge::session::{self, SessionCore, SessionSettings};
use colorbridge_device::Device;
use colorbridge_transport::Bus;
use tracing::info;

/// Run until Ctrl-C
pub async fn serve(ctx: &Context) -> CommandResult {
    let link = ctx.open_link()?;
    let device = Device::new(Bus::new(link));
    let settings = SessionSettings::from(&ctx.config);
    let url = ctx.config.upstream.url.clone();

    info!(
        "Bridging {} to {} as {:?}",
        ctx.config.device.port, url, settings.name
    );
    if ctx.monitor {
        info!("Monitor mode enabled - tracing all bus bytes");
    }

    let shutdown = setup_shutdown_channel();
    session::run(SessionCore::new(device, settings), url, shutdown).await?;
    Ok(())
}
