use std::time::Duration;

use thiserror::Error;

/// Transport-level failures reported by a [`WordLink`](crate::WordLink).
///
/// Always fatal to the operation that was running.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying transport rejected or failed the transfer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The device answered with fewer bytes than a full word
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// The device went away mid-operation
    #[error("Device disconnected")]
    Disconnected,
}

impl LinkError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

/// Errors surfaced by the multiboot handshake and the cartridge protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The link itself failed
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Key exchange token did not carry the expected high byte
    #[error("Handshake failed: unexpected token {token:#06x}")]
    Handshake { token: u16 },

    /// The console echoed the wrong index for a ROM word
    #[error("Transmission error: expected echo {expected:#06x}, got {actual:#06x}")]
    Transmission { expected: u16, actual: u16 },

    /// The console computed a different checksum than the host
    #[error("Checksum mismatch: sent {expected:#06x}, console reported {actual:#06x}")]
    Checksum { expected: u16, actual: u16 },

    /// The ROM buffer cannot be multibooted
    #[error("Invalid ROM ({length} bytes): {reason}")]
    InvalidRom { length: usize, reason: String },

    /// A save buffer does not match the size reported by the console
    #[error("Save size mismatch: console expects {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A command payload exceeds what the firmware can buffer
    #[error("Payload too large: {words} words (firmware limit {max})")]
    PayloadTooLarge { words: usize, max: usize },

    /// A wait loop ran past its deadline
    #[error("Timed out after {attempts} polls ({elapsed:?})")]
    Timeout { attempts: u64, elapsed: Duration },

    /// A wait loop was cancelled from outside
    #[error("Cancelled")]
    Cancelled,

    /// The session already reached a terminal state
    #[error("Session already finished ({state})")]
    SessionFinished { state: &'static str },
}

impl ProtocolError {
    pub fn invalid_rom(length: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRom {
            length,
            reason: reason.into(),
        }
    }

    /// True when the failure came from the transport rather than the protocol.
    pub fn is_link_error(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}
