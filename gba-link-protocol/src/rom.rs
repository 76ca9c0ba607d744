//! ROM image view and cartridge header decoding.
//!
//! Layout of the first 0xC0 bytes:
//!
//! | Offset | Size | Field                          |
//! |--------|------|--------------------------------|
//! | 0x00   | 4    | ARM entry point                |
//! | 0x04   | 156  | Nintendo logo                  |
//! | 0xA0   | 12   | Game title                     |
//! | 0xAC   | 4    | Game code                      |
//! | 0xB0   | 2    | Maker code                     |
//! | 0xB2   | 1    | Fixed value (0x96)             |
//! | 0xBC   | 1    | Software version               |
//! | 0xBD   | 1    | Header complement check        |
//!
//! The game body follows at 0xC0.

use std::ops::Range;

use gba_link_core::ProtocolError;
use gba_link_core::util::decode_field;

use crate::constants::{
    COMPANY_ID_RANGE, COMPLEMENT_CHECK_OFFSET, FIXED_VALUE_OFFSET, GAME_ID_RANGE, GAME_NAME_RANGE,
    HEADER_FIXED_VALUE, HEADER_LENGTH, MULTIBOOT_MAX_BYTES, ROM_ALIGNMENT_MASK,
    SOFTWARE_VERSION_OFFSET,
};

/// Immutable view over a ROM buffer, truncated to a 16-byte boundary.
#[derive(Debug, Clone, Copy)]
pub struct RomImage<'a> {
    bytes: &'a [u8],
    aligned_length: usize,
}

impl<'a> RomImage<'a> {
    /// Wrap a buffer. Fails when less than a full header survives alignment.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        let aligned_length = bytes.len() & ROM_ALIGNMENT_MASK;
        if aligned_length < HEADER_LENGTH {
            return Err(ProtocolError::invalid_rom(
                bytes.len(),
                format!(
                    "aligned length {:#x} is shorter than the {:#x}-byte header",
                    aligned_length, HEADER_LENGTH
                ),
            ));
        }
        Ok(Self {
            bytes,
            aligned_length,
        })
    }

    /// Raw byte count of the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn aligned_length(&self) -> usize {
        self.aligned_length
    }

    pub fn header(&self) -> &'a [u8] {
        &self.bytes[..HEADER_LENGTH]
    }

    pub fn game_body(&self) -> &'a [u8] {
        &self.bytes[HEADER_LENGTH..self.aligned_length]
    }

    /// Number of 32-bit words in the game body.
    pub fn body_words(&self) -> usize {
        self.game_body().len() / 4
    }

    pub fn parse_header(&self) -> RomHeader {
        parse_header(self.header())
    }

    /// Check that the console can hold the image.
    pub fn validate_for_multiboot(&self) -> Result<(), ProtocolError> {
        if self.aligned_length > MULTIBOOT_MAX_BYTES {
            return Err(ProtocolError::invalid_rom(
                self.bytes.len(),
                format!(
                    "multiboot images are limited to {:#x} bytes",
                    MULTIBOOT_MAX_BYTES
                ),
            ));
        }
        Ok(())
    }
}

/// Descriptive fields decoded from a cartridge header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomHeader {
    /// Title at 0xA0..0xAC
    pub game_name: String,
    /// Four-character game code at 0xAC..0xB0
    pub game_id: String,
    /// Two-character maker code at 0xB0..0xB2
    pub company_id: String,
    pub fixed_value: u8,
    pub software_version: u8,
    /// Check byte stored in the header
    pub complement_check: u8,
    /// Check byte computed over 0xA0..=0xBC
    pub computed_complement: u8,
}

impl RomHeader {
    /// True when the fixed byte and the complement check both match.
    pub fn is_valid(&self) -> bool {
        self.fixed_value == HEADER_FIXED_VALUE && self.complement_check == self.computed_complement
    }

    /// Release region implied by the last character of the game code.
    pub fn region(&self) -> Option<&'static str> {
        match self.game_id.chars().nth(3)? {
            'J' => Some("Japan"),
            'E' => Some("USA"),
            'P' | 'D' | 'F' | 'I' | 'S' | 'H' | 'X' | 'Y' => Some("Europe"),
            'K' => Some("Korea"),
            'C' => Some("China"),
            _ => None,
        }
    }
}

/// Decode the descriptive header fields. Best effort: short buffers produce
/// empty fields and invalid UTF-8 is replaced.
pub fn parse_header(header: &[u8]) -> RomHeader {
    let field = |range: Range<usize>| decode_field(header.get(range).unwrap_or(&[]));
    let byte = |offset: usize| header.get(offset).copied().unwrap_or(0);

    RomHeader {
        game_name: field(GAME_NAME_RANGE),
        game_id: field(GAME_ID_RANGE),
        company_id: field(COMPANY_ID_RANGE),
        fixed_value: byte(FIXED_VALUE_OFFSET),
        software_version: byte(SOFTWARE_VERSION_OFFSET),
        complement_check: byte(COMPLEMENT_CHECK_OFFSET),
        computed_complement: header_complement(header),
    }
}

/// Compute the header complement check over bytes 0xA0..=0xBC.
pub fn header_complement(header: &[u8]) -> u8 {
    let sum = header
        .get(GAME_NAME_RANGE.start..COMPLEMENT_CHECK_OFFSET)
        .unwrap_or(&[])
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum).wrapping_sub(0x19)
}

#[cfg(test)]
#[path = "tests/rom_tests.rs"]
mod tests;
