//! Command framing for the dumper firmware.
//!
//! A frame goes out as `[opcode][payload word count][payload words...]`, one
//! word per round trip. The payload is zero-padded to a 4-byte boundary and
//! read as little-endian words. Responses to frame words carry nothing.

use gba_link_core::util::{pack_le_words, unpack_le_words};
use gba_link_core::{LinkError, WordLink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// A frame whose payload is a sequence of words.
    pub fn from_words(opcode: u8, words: &[u32]) -> Self {
        Self::new(opcode, unpack_le_words(words))
    }

    /// Payload length in words, after padding.
    pub fn payload_words(&self) -> usize {
        self.payload.len().div_ceil(4)
    }

    /// The words this frame puts on the wire.
    pub fn serialize(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(2 + self.payload_words());
        words.push(u32::from(self.opcode));
        words.push(self.payload_words() as u32);
        words.extend(pack_le_words(&self.payload));
        words
    }

    /// Send every word of the frame, discarding the responses.
    pub fn send<L: WordLink + ?Sized>(&self, link: &mut L) -> Result<(), LinkError> {
        let words = self.serialize();
        log::trace!(
            "command {:#04x}: {} payload words",
            self.opcode,
            words.len() - 2
        );
        for word in words {
            link.send_word(word)?;
        }
        Ok(())
    }
}
