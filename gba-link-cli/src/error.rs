use gba_link_core::ProtocolError;
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Link or protocol failure while talking to the console
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// USB device could not be found or opened
    #[error("USB error: {0}")]
    Usb(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Bad command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn usb(msg: impl Into<String>) -> Self {
        Self::Usb(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
