//! Bit-serial CRC-16 over the multiboot body.
//!
//! The BIOS runs the same loop on its side and compares results at the end of
//! the transfer, so this is reproduced bit for bit. A table-driven CRC-16
//! variant produces different values.

use crate::constants::{CRC_FINALIZE_BASE, CRC_INITIAL, CRC_POLYNOMIAL};

/// CRC accumulator for one multiboot attempt.
#[derive(Debug, Clone)]
pub struct Crc16Accumulator {
    register: u32,
    polynomial_mask: u32,
    finalize_code: u32,
}

impl Crc16Accumulator {
    /// Create an accumulator for the `final_a`/`final_b` bytes negotiated
    /// during key exchange.
    pub fn new(final_a: u8, final_b: u8) -> Self {
        Self {
            register: CRC_INITIAL,
            polynomial_mask: CRC_POLYNOMIAL,
            finalize_code: CRC_FINALIZE_BASE | (u32::from(final_b) << 8) | u32::from(final_a),
        }
    }

    /// Feed one raw (unencrypted) body word, least-significant bit first.
    pub fn step(&mut self, value: u32) {
        let mut value = value;
        for _ in 0..32 {
            let bit = (self.register ^ value) & 1;
            self.register >>= 1;
            if bit != 0 {
                self.register ^= self.polynomial_mask;
            }
            value >>= 1;
        }
    }

    /// Mix in the finalize code and return the 16-bit digest.
    ///
    /// Takes `self` by value: an accumulator yields exactly one digest.
    pub fn digest(mut self) -> u16 {
        self.step(self.finalize_code);
        (self.register & 0xFFFF) as u16
    }

    pub fn finalize_code(&self) -> u32 {
        self.finalize_code
    }
}

#[cfg(test)]
#[path = "tests/crc_tests.rs"]
mod tests;
