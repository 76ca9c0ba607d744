//! Shared types for talking to a Game Boy Advance over a word-oriented link.
//!
//! This crate holds the vocabulary every other crate agrees on: the
//! [`WordLink`] capability, the error taxonomy, interruptible polling and
//! progress reporting. Protocol logic lives in `gba-link-protocol`.

pub mod error;
pub mod poll;
pub mod progress;
pub mod util;

pub use error::{LinkError, ProtocolError};
pub use poll::{CancelToken, PollOptions, poll_until};
pub use progress::TransferProgress;

/// A 32-bit unit exchanged per round trip over the link.
pub type Word = u32;

/// A bidirectional channel that exchanges one 32-bit word per round trip.
///
/// Implementations send `tx` to the device (big-endian on the wire) and return
/// the word the device answered with. Exactly one round trip is in flight at a
/// time; there is no reordering and no partial words. Transport failures are
/// reported as [`LinkError`] and are never retried by callers in this workspace.
pub trait WordLink {
    /// Send one word and wait for the matching response.
    fn send_word(&mut self, tx: Word) -> Result<Word, LinkError>;
}

impl<L: WordLink + ?Sized> WordLink for &mut L {
    fn send_word(&mut self, tx: Word) -> Result<Word, LinkError> {
        (**self).send_word(tx)
    }
}

impl<L: WordLink + ?Sized> WordLink for Box<L> {
    fn send_word(&mut self, tx: Word) -> Result<Word, LinkError> {
        (**self).send_word(tx)
    }
}
