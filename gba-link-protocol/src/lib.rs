//! Game Boy Advance link protocol.
//!
//! Two protocols share one [`WordLink`](gba_link_core::WordLink):
//!
//! - Multiboot: the BIOS handshake that uploads a program into the console's
//!   RAM ([`MultibootSession`]), using a bit-serial CRC ([`Crc16Accumulator`])
//!   and an LCG keystream ([`KeystreamCipher`]).
//! - Cartridge: the command/response framing spoken by the uploaded dumper
//!   program ([`CartridgeLink`]) for size queries and ROM/save access.

pub mod cartridge;
pub mod cipher;
pub mod constants;
pub mod crc;
pub mod frame;
pub mod multiboot;
pub mod rom;

#[cfg(test)]
pub(crate) mod test_support;

pub use cartridge::{CartridgeInfo, CartridgeLink, SaveType};
pub use cipher::KeystreamCipher;
pub use crc::Crc16Accumulator;
pub use frame::CommandFrame;
pub use multiboot::{HandshakeParams, MultibootSession, SessionKeys, SessionState};
pub use rom::{RomHeader, RomImage, parse_header};
