use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::logger::log_blank;
use crate::settings::{EffectiveSettings, SettingsFile, Sourced, settings_path};

/// Show effective settings and where each value comes from.
pub(crate) fn run_config_show(settings: &EffectiveSettings) {
    log::info!(
        "{}",
        "gba-link Settings".if_supports_color(Stdout, |t| t.bold()),
    );
    log_blank();

    let path = settings_path();
    log::info!(
        "  Settings file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        if path.exists() {
            "(exists)".if_supports_color(Stdout, |t| t.green()).to_string()
        } else {
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()).to_string()
        },
    );
    log_blank();

    show("usb.vendor_id", &settings.vendor_id, |v| format!("{:#06x}", v));
    show("usb.product_id", &settings.product_id, |v| {
        v.map_or_else(|| "any".to_string(), |p| format!("{:#06x}", p))
    });
    show("usb.interface", &settings.interface, |v| v.to_string());
    show("usb.timeout_ms", &settings.usb_timeout_ms, |v| v.to_string());
    show("poll.timeout_secs", &settings.poll_timeout_secs, |v| {
        v.map_or_else(|| "wait forever".to_string(), |s| s.to_string())
    });
    show("poll.interval_ms", &settings.poll_interval_ms, |v| v.to_string());
    show("boot.payload", &settings.payload, |v| {
        v.as_ref()
            .map_or_else(|| "not set".to_string(), |p| p.display().to_string())
    });
}

fn show<T>(name: &str, sourced: &Sourced<T>, render: impl Fn(&T) -> String) {
    log::info!(
        "  {:<18} {} {}",
        name,
        render(&sourced.value),
        format!("({})", sourced.source).if_supports_color(Stdout, |t| t.dimmed()),
    );
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    log::info!("{}", settings_path().display());
}

/// Write a settings file with the built-in defaults.
pub(crate) fn run_config_init(force: bool) -> Result<(), CliError> {
    let path = settings_path();
    if path.exists() && !force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    SettingsFile::defaults().save_to(&path)?;
    log::info!(
        "Wrote default settings to {}",
        path.display().if_supports_color(Stdout, |t| t.cyan())
    );
    Ok(())
}
