pub(crate) mod boot;
pub(crate) mod config;
pub(crate) mod dump;
pub(crate) mod echo;
pub(crate) mod info;
pub(crate) mod inspect;
pub(crate) mod save;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gba_link_protocol::{CartridgeLink, RomHeader};

use crate::CliError;
use crate::settings::EffectiveSettings;
use crate::usb::UsbLink;

/// Shared state for commands that talk to the console.
pub(crate) struct LinkContext {
    pub settings: EffectiveSettings,
    pub quiet: bool,
}

impl LinkContext {
    pub(crate) fn open_link(&self) -> Result<UsbLink, CliError> {
        let config = self.settings.usb_config();
        log::debug!(
            "Opening adapter {:04x}:{} interface {}",
            config.vendor_id,
            config
                .product_id
                .map_or_else(|| "*".to_string(), |p| format!("{:04x}", p)),
            config.interface
        );
        UsbLink::open(&config)
    }

    /// Open the adapter and wait until the dumper firmware reports a cartridge.
    pub(crate) fn cartridge(&self) -> Result<CartridgeLink<UsbLink>, CliError> {
        let link = self.open_link()?;
        let mut cart = CartridgeLink::new(link).with_poll_options(self.settings.poll_options());
        log::info!(
            "{}",
            "Waiting for cartridge...".if_supports_color(Stdout, |t| t.dimmed())
        );
        cart.wait()?;
        Ok(cart)
    }
}

/// Print the descriptive header fields, one per line.
pub(crate) fn print_header(header: &RomHeader) {
    log::info!(
        "  Title:         {}",
        header.game_name.if_supports_color(Stdout, |t| t.bold())
    );
    log::info!("  Game code:     {}", header.game_id);
    log::info!("  Maker code:    {}", header.company_id);
    log::info!(
        "  Region:        {}",
        header.region().unwrap_or("unknown")
    );
    log::info!("  Version:       {}", header.software_version);

    if header.is_valid() {
        log::info!(
            "  Header check:  {}",
            "OK".if_supports_color(Stdout, |t| t.green())
        );
    } else {
        log::info!(
            "  Header check:  {} (stored {:#04x}, computed {:#04x}, fixed byte {:#04x})",
            "FAILED".if_supports_color(Stdout, |t| t.red()),
            header.complement_check,
            header.computed_complement,
            header.fixed_value,
        );
    }
}
