//! Settings file and effective-value resolution.
//!
//! The settings file lives at `~/.config/gba-link/settings.toml`. Every value
//! is resolved through the same priority chain:
//!
//! 1. Command-line flag
//! 2. Environment variable (only for the values that have one)
//! 3. Settings file
//! 4. Built-in default

use std::path::{Path, PathBuf};
use std::time::Duration;

use gba_link_core::PollOptions;
use gba_link_protocol::constants::{USB_ENDPOINT_IN, USB_ENDPOINT_OUT, USB_INTERFACE, USB_VENDOR_ID};
use serde::{Deserialize, Serialize};

use crate::CliError;
use crate::cli_types::parse_number;
use crate::usb::UsbConfig;

pub(crate) const ENV_VENDOR_ID: &str = "GBA_LINK_VENDOR_ID";
pub(crate) const ENV_POLL_TIMEOUT: &str = "GBA_LINK_POLL_TIMEOUT";

const DEFAULT_USB_TIMEOUT_MS: u64 = 1000;

/// Canonical path to the settings file: `~/.config/gba-link/settings.toml`.
pub(crate) fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("gba-link").join("settings.toml")
}

/// On-disk settings. Every field is optional so a missing key falls through
/// to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb: Option<UsbSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot: Option<BootSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct UsbSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PollSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BootSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PathBuf>,
}

impl SettingsFile {
    /// Load from `path`. A missing file is an empty settings file.
    pub(crate) fn load_from(path: &Path) -> Result<Self, CliError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents)
            .map_err(|e| CliError::config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// The file `config init` writes.
    pub(crate) fn defaults() -> Self {
        Self {
            usb: Some(UsbSection {
                vendor_id: Some(USB_VENDOR_ID),
                product_id: None,
                interface: Some(USB_INTERFACE),
                timeout_ms: Some(DEFAULT_USB_TIMEOUT_MS),
            }),
            poll: Some(PollSection {
                timeout_secs: None,
                interval_ms: Some(0),
            }),
            boot: None,
        }
    }

    /// Write atomically, creating parent directories as needed.
    pub(crate) fn save_to(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize settings: {}", e)))?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn usb(&self) -> UsbSection {
        self.usb.clone().unwrap_or_default()
    }

    fn poll(&self) -> PollSection {
        self.poll.clone().unwrap_or_default()
    }
}

/// Where an effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettingSource {
    Flag,
    EnvVar(&'static str),
    SettingsFile,
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag => write!(f, "command line"),
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::SettingsFile => write!(f, "settings file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// A resolved value and its provenance.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sourced<T> {
    pub value: T,
    pub source: SettingSource,
}

impl<T> Sourced<T> {
    fn pick(
        flag: Option<T>,
        env: Option<(&'static str, T)>,
        file: Option<T>,
        default: T,
    ) -> Self {
        if let Some(value) = flag {
            return Self {
                value,
                source: SettingSource::Flag,
            };
        }
        if let Some((var, value)) = env {
            return Self {
                value,
                source: SettingSource::EnvVar(var),
            };
        }
        match file {
            Some(value) => Self {
                value,
                source: SettingSource::SettingsFile,
            },
            None => Self {
                value: default,
                source: SettingSource::Default,
            },
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub vendor_id: Option<u16>,
    pub poll_timeout_secs: Option<u64>,
    pub payload: Option<PathBuf>,
}

/// Settings after applying the priority chain.
#[derive(Debug, Clone)]
pub(crate) struct EffectiveSettings {
    pub vendor_id: Sourced<u16>,
    pub product_id: Sourced<Option<u16>>,
    pub interface: Sourced<u8>,
    pub usb_timeout_ms: Sourced<u64>,
    pub poll_timeout_secs: Sourced<Option<u64>>,
    pub poll_interval_ms: Sourced<u64>,
    pub payload: Sourced<Option<PathBuf>>,
}

impl EffectiveSettings {
    /// Resolve against the real environment and settings file.
    pub(crate) fn load(overrides: &Overrides) -> Result<Self, CliError> {
        let file = SettingsFile::load_from(&settings_path())?;
        Self::resolve(&file, overrides, |var| std::env::var(var).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub(crate) fn resolve(
        file: &SettingsFile,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CliError> {
        let usb = file.usb();
        let poll = file.poll();

        let env_vendor = match env(ENV_VENDOR_ID) {
            Some(raw) => {
                let n = parse_number(&raw)
                    .map_err(|e| CliError::config(format!("${}: {}", ENV_VENDOR_ID, e)))?;
                let id = u16::try_from(n).map_err(|_| {
                    CliError::config(format!("${}: {} does not fit in 16 bits", ENV_VENDOR_ID, raw))
                })?;
                Some((ENV_VENDOR_ID, id))
            }
            None => None,
        };

        let env_timeout = match env(ENV_POLL_TIMEOUT) {
            Some(raw) => {
                let secs = parse_number(&raw)
                    .map_err(|e| CliError::config(format!("${}: {}", ENV_POLL_TIMEOUT, e)))?;
                Some((ENV_POLL_TIMEOUT, Some(secs)))
            }
            None => None,
        };

        let payload_file = file.boot.as_ref().and_then(|b| b.payload.clone());

        Ok(Self {
            vendor_id: Sourced::pick(overrides.vendor_id, env_vendor, usb.vendor_id, USB_VENDOR_ID),
            product_id: Sourced::pick(None, None, usb.product_id.map(Some), None),
            interface: Sourced::pick(None, None, usb.interface, USB_INTERFACE),
            usb_timeout_ms: Sourced::pick(None, None, usb.timeout_ms, DEFAULT_USB_TIMEOUT_MS),
            poll_timeout_secs: Sourced::pick(
                overrides.poll_timeout_secs.map(Some),
                env_timeout,
                poll.timeout_secs.map(Some),
                None,
            ),
            poll_interval_ms: Sourced::pick(None, None, poll.interval_ms, 0),
            payload: Sourced::pick(
                overrides.payload.clone().map(Some),
                None,
                payload_file.map(Some),
                None,
            ),
        })
    }

    pub(crate) fn usb_config(&self) -> UsbConfig {
        UsbConfig {
            vendor_id: self.vendor_id.value,
            product_id: self.product_id.value,
            interface: self.interface.value,
            endpoint_out: USB_ENDPOINT_OUT,
            endpoint_in: USB_ENDPOINT_IN,
            timeout: Duration::from_millis(self.usb_timeout_ms.value),
        }
    }

    pub(crate) fn poll_options(&self) -> PollOptions {
        let mut options = PollOptions::new();
        if let Some(secs) = self.poll_timeout_secs.value {
            options = options.timeout(Duration::from_secs(secs));
        }
        if self.poll_interval_ms.value > 0 {
            options = options.interval(Duration::from_millis(self.poll_interval_ms.value));
        }
        options
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
