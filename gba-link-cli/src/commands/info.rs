use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gba_link_core::util::format_bytes;
use gba_link_protocol::SaveType;

use crate::CliError;
use crate::commands::{LinkContext, print_header};
use crate::logger::log_blank;

/// Show the inserted cartridge.
pub(crate) fn run_info(ctx: &LinkContext) -> Result<(), CliError> {
    let mut cart = ctx.cartridge()?;
    let info = cart.info()?;

    log_blank();
    log::info!(
        "{}",
        "Cartridge".if_supports_color(Stdout, |t| t.bold())
    );
    print_header(&info.header);
    log::info!("  ROM size:      {}", format_bytes(u64::from(info.game_size)));

    match info.save_type {
        SaveType::None => log::info!(
            "  Save:          {}",
            "none".if_supports_color(Stdout, |t| t.dimmed())
        ),
        SaveType::Unknown(size) => log::info!(
            "  Save:          {} ({})",
            "unrecognized size".if_supports_color(Stdout, |t| t.yellow()),
            format_bytes(u64::from(size))
        ),
        known => log::info!(
            "  Save:          {} ({})",
            known.name(),
            format_bytes(u64::from(info.save_size))
        ),
    }
    Ok(())
}
