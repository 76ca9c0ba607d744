use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gba_link_core::util::{format_bytes, format_bytes_approx};
use gba_link_protocol::RomImage;
use gba_link_protocol::constants::MULTIBOOT_MAX_BYTES;

use crate::CliError;
use crate::commands::print_header;

/// Check a ROM file's header and multiboot fitness without touching the device.
pub(crate) fn run_inspect(path: &Path) -> Result<(), CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::other(format!("Failed to read {}: {}", path.display(), e)))?;
    let image = RomImage::from_bytes(&bytes)?;

    log::info!(
        "{}",
        path.display().if_supports_color(Stdout, |t| t.bold())
    );
    print_header(&image.parse_header());
    log::info!("  File size:     {}", format_bytes(image.len() as u64));
    log::info!(
        "  Sent length:   {:#x} ({} body words)",
        image.aligned_length(),
        image.body_words()
    );

    match image.validate_for_multiboot() {
        Ok(()) => log::info!(
            "  Multiboot:     {}",
            "fits".if_supports_color(Stdout, |t| t.green())
        ),
        Err(_) => log::info!(
            "  Multiboot:     {} (limit {})",
            "too large".if_supports_color(Stdout, |t| t.red()),
            format_bytes_approx(MULTIBOOT_MAX_BYTES as u64)
        ),
    }
    Ok(())
}
