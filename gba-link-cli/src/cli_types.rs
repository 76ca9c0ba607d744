//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gba-link")]
#[command(about = "Boot, dump and back up Game Boy Advance cartridges over a USB link", long_about = None)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    /// Give up waiting for the console after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// USB vendor ID of the link adapter (e.g., 0x1234)
    #[arg(long, global = true, value_parser = parse_u16)]
    pub vendor_id: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Upload a program to the console over multiboot
    Boot {
        /// Multiboot image (defaults to [boot] payload in settings.toml)
        rom: Option<PathBuf>,

        /// Boot logo palette color
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=7))]
        palette: u8,

        /// Boot logo palette speed
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        speed: u8,

        /// Reverse the palette direction
        #[arg(long)]
        reverse: bool,
    },

    /// Show the inserted cartridge's header, ROM size and save type
    Info,

    /// Dump the cartridge ROM to a file
    DumpRom {
        /// Output file
        out: PathBuf,
    },

    /// Dump the cartridge save to a file
    DumpSave {
        /// Output file
        out: PathBuf,
    },

    /// Replace the cartridge save with the contents of a file
    WriteSave {
        /// Save file, must match the cartridge's save size
        input: PathBuf,
    },

    /// Erase the cartridge save
    ClearSave {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Send words through the firmware and check they come back
    Echo {
        /// Words to send (decimal or 0x-prefixed hex)
        #[arg(required = true, value_parser = parse_u32)]
        words: Vec<u32>,
    },

    /// Check a ROM file's header offline
    Inspect {
        /// ROM file to inspect
        rom: PathBuf,
    },

    /// Manage gba-link settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show effective settings and where each value comes from
    Show,

    /// Print the settings file path
    Path,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
pub(crate) fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

pub(crate) fn parse_u16(s: &str) -> Result<u16, String> {
    let n = parse_number(s)?;
    u16::try_from(n).map_err(|_| format!("{} does not fit in 16 bits", s))
}

pub(crate) fn parse_u32(s: &str) -> Result<u32, String> {
    let n = parse_number(s)?;
    u32::try_from(n).map_err(|_| format!("{} does not fit in 32 bits", s))
}
