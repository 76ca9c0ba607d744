use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gba_link_core::util::format_bytes_approx;
use gba_link_protocol::{HandshakeParams, MultibootSession, RomImage};

use crate::CliError;
use crate::commands::LinkContext;
use crate::progress::{BarUnit, run_with_bar};

/// Upload a multiboot image and boot it.
pub(crate) fn run_boot(ctx: &LinkContext, params: HandshakeParams) -> Result<(), CliError> {
    let path = ctx.settings.payload.value.as_deref().ok_or_else(|| {
        CliError::invalid_argument(
            "no ROM given and no [boot] payload in settings.toml (see 'gba-link config path')",
        )
    })?;

    let bytes = std::fs::read(path)
        .map_err(|e| CliError::other(format!("Failed to read {}: {}", path.display(), e)))?;
    let image = RomImage::from_bytes(&bytes)?;
    let header = image.parse_header();

    log::info!(
        "Booting {} ({})",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        format_bytes_approx(image.aligned_length() as u64),
    );
    if !header.game_name.is_empty() {
        log::info!("  Title: {}", header.game_name);
    }
    if !header.is_valid() {
        log::warn!("header check failed; the console may refuse to run this image");
    }
    if image.aligned_length() != image.len() {
        log::warn!(
            "{} trailing bytes past the 16-byte boundary will not be sent",
            image.len() - image.aligned_length()
        );
    }

    let link = ctx.open_link()?;
    let mut session = MultibootSession::new(link, image)
        .with_params(params)
        .with_poll_options(ctx.settings.poll_options());

    run_with_bar(ctx.quiet, BarUnit::Words, "waiting", |tx| {
        session.run_with_progress(tx)
    })?;

    if let Some(keys) = session.keys() {
        log::debug!(
            "seed {:#010x}, final A {:#04x}, final B {:#04x}",
            keys.seed,
            keys.crc_final_a,
            keys.crc_final_b
        );
    }
    log::info!(
        "{}",
        "Console booted".if_supports_color(Stdout, |t| t.green())
    );
    Ok(())
}
