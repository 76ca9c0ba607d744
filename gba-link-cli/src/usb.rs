//! `WordLink` over the USB link adapter.
//!
//! The adapter forwards each 4-byte bulk OUT transfer to the console's serial
//! port and returns the console's answer as a 4-byte bulk IN transfer. Words
//! are big-endian on the wire.

use std::time::Duration;

use gba_link_core::{LinkError, WordLink};
use rusb::{Context, DeviceHandle, UsbContext};

use crate::CliError;

/// Where and how to reach the adapter.
#[derive(Debug, Clone)]
pub(crate) struct UsbConfig {
    pub vendor_id: u16,
    /// Match any product when `None`.
    pub product_id: Option<u16>,
    pub interface: u8,
    pub endpoint_out: u8,
    pub endpoint_in: u8,
    pub timeout: Duration,
}

pub(crate) struct UsbLink {
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint_out: u8,
    endpoint_in: u8,
    timeout: Duration,
}

impl UsbLink {
    /// Find the first adapter matching `config`, open it and claim its interface.
    pub(crate) fn open(config: &UsbConfig) -> Result<Self, CliError> {
        let ctx = Context::new().map_err(|e| CliError::usb(format!("init failed: {}", e)))?;

        let device = ctx
            .devices()
            .map_err(|e| CliError::usb(format!("could not list devices: {}", e)))?
            .iter()
            .find(|dev| {
                dev.device_descriptor()
                    .map(|d| {
                        d.vendor_id() == config.vendor_id
                            && config.product_id.is_none_or(|pid| d.product_id() == pid)
                    })
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                CliError::usb(format!(
                    "no adapter with vendor ID {:#06x} found",
                    config.vendor_id
                ))
            })?;

        let handle = device
            .open()
            .map_err(|e| CliError::usb(format!("could not open adapter: {}", e)))?;

        // Not every platform supports detaching; claiming reports the real problem.
        let _ = handle.set_auto_detach_kernel_driver(true);

        handle.claim_interface(config.interface).map_err(|e| {
            CliError::usb(format!("could not claim interface {}: {}", config.interface, e))
        })?;

        log::debug!(
            "Opened link adapter (bus {:03} dev {:03})",
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            handle,
            interface: config.interface,
            endpoint_out: config.endpoint_out,
            endpoint_in: config.endpoint_in,
            timeout: config.timeout,
        })
    }
}

impl WordLink for UsbLink {
    fn send_word(&mut self, tx: u32) -> Result<u32, LinkError> {
        let written = self
            .handle
            .write_bulk(self.endpoint_out, &tx.to_be_bytes(), self.timeout)
            .map_err(link_error)?;
        if written != 4 {
            return Err(LinkError::ShortTransfer {
                expected: 4,
                actual: written,
            });
        }

        let mut buf = [0u8; 4];
        let read = self
            .handle
            .read_bulk(self.endpoint_in, &mut buf, self.timeout)
            .map_err(link_error)?;
        let rx = decode_response(&buf, read)?;
        log::trace!("usb {:08x} -> {:08x}", tx, rx);
        Ok(rx)
    }
}

impl Drop for UsbLink {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }
}

fn link_error(e: rusb::Error) -> LinkError {
    match e {
        rusb::Error::NoDevice => LinkError::Disconnected,
        other => LinkError::transport(other.to_string()),
    }
}

fn decode_response(buf: &[u8; 4], read: usize) -> Result<u32, LinkError> {
    if read != 4 {
        return Err(LinkError::ShortTransfer {
            expected: 4,
            actual: read,
        });
    }
    Ok(u32::from_be_bytes(*buf))
}
