//! gba-link CLI
//!
//! Command-line interface for booting a Game Boy Advance over multiboot and
//! talking to the cartridge dumper firmware through a USB link adapter.

mod cli_types;
mod commands;
mod error;
mod logger;
mod progress;
mod settings;
mod usb;

use clap::Parser;

use gba_link_protocol::HandshakeParams;

use crate::cli_types::{Cli, Commands, ConfigAction};
use crate::commands::LinkContext;
pub(crate) use crate::error::CliError;
use crate::settings::{EffectiveSettings, Overrides};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init(cli.quiet, cli.verbose, cli.logfile.as_deref()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let quiet = cli.quiet;
    let mut overrides = Overrides {
        vendor_id: cli.vendor_id,
        poll_timeout_secs: cli.timeout,
        payload: None,
    };

    match cli.command {
        Commands::Boot {
            rom,
            palette,
            speed,
            reverse,
        } => {
            overrides.payload = rom;
            let params = HandshakeParams {
                palette_color: palette,
                direction: reverse,
                speed,
            };
            commands::boot::run_boot(&link_context(&overrides, quiet)?, params)
        }
        Commands::Info => commands::info::run_info(&link_context(&overrides, quiet)?),
        Commands::DumpRom { out } => {
            commands::dump::run_dump_rom(&link_context(&overrides, quiet)?, &out)
        }
        Commands::DumpSave { out } => {
            commands::dump::run_dump_save(&link_context(&overrides, quiet)?, &out)
        }
        Commands::WriteSave { input } => {
            commands::save::run_write_save(&link_context(&overrides, quiet)?, &input)
        }
        Commands::ClearSave { yes } => {
            commands::save::run_clear_save(&link_context(&overrides, quiet)?, yes)
        }
        Commands::Echo { words } => {
            commands::echo::run_echo(&link_context(&overrides, quiet)?, &words)
        }
        Commands::Inspect { rom } => commands::inspect::run_inspect(&rom),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config::run_config_show(&EffectiveSettings::load(&overrides)?);
                Ok(())
            }
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
            ConfigAction::Init { force } => commands::config::run_config_init(force),
        },
    }
}

fn link_context(overrides: &Overrides, quiet: bool) -> Result<LinkContext, CliError> {
    Ok(LinkContext {
        settings: EffectiveSettings::load(overrides)?,
        quiet,
    })
}
