//! LCG keystream that obfuscates multiboot body words.

use crate::constants::{KEYSTREAM_INDEX_BASE, KEYSTREAM_MASK, KEYSTREAM_MULTIPLIER};

/// Keystream state for one multiboot attempt.
///
/// The console runs an identical generator. Every call advances it, so each
/// body word must be passed through exactly once, in ascending index order.
#[derive(Debug, Clone)]
pub struct KeystreamCipher {
    seed: u32,
}

impl KeystreamCipher {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Advance the generator and obfuscate `value`.
    ///
    /// `word_index` is the byte offset of the word in the full image, i.e.
    /// header length plus offset within the body.
    pub fn step(&mut self, value: u32, word_index: u32) -> u32 {
        self.seed = self.seed.wrapping_mul(KEYSTREAM_MULTIPLIER).wrapping_add(1);
        self.seed ^ value ^ KEYSTREAM_INDEX_BASE.wrapping_sub(word_index) ^ KEYSTREAM_MASK
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}
