use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gba_link_core::util::format_bytes;

use crate::CliError;
use crate::commands::LinkContext;
use crate::progress::{BarUnit, run_with_bar};

/// Replace the cartridge save with the contents of `input`.
pub(crate) fn run_write_save(ctx: &LinkContext, input: &Path) -> Result<(), CliError> {
    let data = std::fs::read(input)
        .map_err(|e| CliError::other(format!("Failed to read {}: {}", input.display(), e)))?;

    let mut cart = ctx.cartridge()?;
    run_with_bar(ctx.quiet, BarUnit::Bytes, "writing save", |tx| {
        cart.write_save_with_progress(&data, tx)
    })?;

    log::info!(
        "Wrote {} from {}",
        format_bytes(data.len() as u64),
        input.display().if_supports_color(Stdout, |t| t.cyan())
    );
    Ok(())
}

/// Erase the cartridge save, asking first unless `yes` is set.
pub(crate) fn run_clear_save(ctx: &LinkContext, yes: bool) -> Result<(), CliError> {
    if !yes && !confirm("Erase the cartridge save? This cannot be undone. [y/N] ")? {
        log::info!("Aborted");
        return Ok(());
    }

    let mut cart = ctx.cartridge()?;
    cart.clear_save()?;
    log::info!(
        "{}",
        "Save cleared".if_supports_color(Stdout, |t| t.green())
    );
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
