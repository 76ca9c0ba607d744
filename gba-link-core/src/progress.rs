/// Progress update sent during a long link operation.
///
/// Sent via MPSC channel so a frontend can draw a progress bar while another
/// thread owns the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferProgress {
    /// A named protocol phase has started
    Phase {
        /// Name of the current phase
        name: &'static str,
    },

    /// ROM words pushed to the console during multiboot
    Words {
        /// Words acknowledged so far
        sent: u64,
        /// Total words to send
        total: u64,
    },

    /// Bytes moved to or from the cartridge
    Bytes {
        /// Bytes transferred so far
        done: u64,
        /// Total bytes to transfer
        total: u64,
    },

    /// Operation completed successfully
    Completed,

    /// Operation failed with an error
    Failed {
        /// Error message
        message: String,
    },
}

impl TransferProgress {
    pub fn phase(name: &'static str) -> Self {
        Self::Phase { name }
    }

    pub fn words(sent: u64, total: u64) -> Self {
        Self::Words { sent, total }
    }

    pub fn bytes(done: u64, total: u64) -> Self {
        Self::Bytes { done, total }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Fraction complete in `0.0..=1.0`, when the update carries a count.
    pub fn fraction(&self) -> Option<f64> {
        let (done, total) = match self {
            Self::Words { sent, total } => (*sent, *total),
            Self::Bytes { done, total } => (*done, *total),
            Self::Completed => return Some(1.0),
            _ => return None,
        };
        if total == 0 {
            Some(1.0)
        } else {
            Some(done as f64 / total as f64)
        }
    }
}
