use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use sha1::{Digest, Sha1};

use gba_link_core::util::format_bytes;

use crate::CliError;
use crate::commands::LinkContext;
use crate::progress::{BarUnit, run_with_bar};

/// Checksums printed after a dump.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DumpHashes {
    pub crc32: String,
    pub sha1: String,
}

pub(crate) fn hash_dump(data: &[u8]) -> DumpHashes {
    let mut sha = Sha1::new();
    sha.update(data);
    DumpHashes {
        crc32: format!("{:08x}", crc32fast::hash(data)),
        sha1: format!("{:x}", sha.finalize()),
    }
}

/// Dump the whole cartridge ROM to `out`.
pub(crate) fn run_dump_rom(ctx: &LinkContext, out: &Path) -> Result<(), CliError> {
    let mut cart = ctx.cartridge()?;
    let header = cart.read_header()?;
    if !header.game_name.is_empty() {
        log::info!(
            "Dumping {} [{}]",
            header.game_name.if_supports_color(Stdout, |t| t.bold()),
            header.game_id
        );
    }

    let data = run_with_bar(ctx.quiet, BarUnit::Bytes, "reading ROM", |tx| {
        cart.read_rom_with_progress(tx)
    })?;
    write_dump(out, &data)
}

/// Dump the cartridge save to `out`.
pub(crate) fn run_dump_save(ctx: &LinkContext, out: &Path) -> Result<(), CliError> {
    let mut cart = ctx.cartridge()?;
    let data = run_with_bar(ctx.quiet, BarUnit::Bytes, "reading save", |tx| {
        cart.read_save_with_progress(tx)
    })?;

    if data.is_empty() {
        log::warn!("cartridge has no save memory; nothing written");
        return Ok(());
    }
    write_dump(out, &data)
}

fn write_dump(out: &Path, data: &[u8]) -> Result<(), CliError> {
    std::fs::write(out, data)
        .map_err(|e| CliError::other(format!("Failed to write {}: {}", out.display(), e)))?;

    let hashes = hash_dump(data);
    log::info!(
        "Wrote {} to {}",
        format_bytes(data.len() as u64),
        out.display().if_supports_color(Stdout, |t| t.cyan())
    );
    log::info!("  CRC32: {}", hashes.crc32);
    log::info!("  SHA-1: {}", hashes.sha1);
    Ok(())
}
