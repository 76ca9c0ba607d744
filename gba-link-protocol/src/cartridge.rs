//! Command/response protocol spoken by the dumper program after multiboot.
//!
//! Each operation sends a [`CommandFrame`] and then clocks result words out
//! of the console with bare probe words. Result words carry data
//! little-endian. The firmware keeps no state between commands.

use std::sync::mpsc::Sender;

use gba_link_core::util::{pack_le_words, unpack_le_words};
use gba_link_core::{PollOptions, ProtocolError, TransferProgress, WordLink, poll_until};

use crate::constants::{
    CARTRIDGE_PRESENT, CMD_ECHO, CMD_GAME_SIZE, CMD_READ, CMD_SAVE_SIZE, CMD_WRITE_SAVE,
    ECHO_MAX_WORDS, HEADER_LENGTH, PROBE_WORD, ROM_BASE, SAVE_BASE, SAVE_MAX_BYTES,
};
use crate::frame::CommandFrame;
use crate::rom::{RomHeader, parse_header};

/// Send a progress update every this many words.
const PROGRESS_INTERVAL: usize = 1024;

/// Save hardware implied by the size the firmware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveType {
    None,
    Eeprom512,
    Eeprom8K,
    Sram32K,
    Flash64K,
    Flash128K,
    Unknown(u32),
}

impl SaveType {
    pub fn from_size(size: u32) -> Self {
        match size {
            0 => Self::None,
            0x200 => Self::Eeprom512,
            0x2000 => Self::Eeprom8K,
            0x8000 => Self::Sram32K,
            0x10000 => Self::Flash64K,
            0x20000 => Self::Flash128K,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Eeprom512 => "EEPROM 512 B",
            Self::Eeprom8K => "EEPROM 8 KB",
            Self::Sram32K => "SRAM 32 KB",
            Self::Flash64K => "Flash 64 KB",
            Self::Flash128K => "Flash 128 KB",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Everything `info()` learns about the inserted cartridge.
#[derive(Debug, Clone)]
pub struct CartridgeInfo {
    pub game_size: u32,
    pub save_size: u32,
    pub save_type: SaveType,
    pub header: RomHeader,
}

/// Cartridge access over a link whose console runs the dumper program.
pub struct CartridgeLink<L: WordLink> {
    link: L,
    poll: PollOptions,
}

impl<L: WordLink> CartridgeLink<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            poll: PollOptions::default(),
        }
    }

    /// Limits for [`wait`](Self::wait).
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Send a bare probe word and return the raw response.
    pub fn probe(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.link.send_word(PROBE_WORD)?)
    }

    /// Poll until the firmware reports a cartridge.
    pub fn wait(&mut self) -> Result<(), ProtocolError> {
        poll_until(
            &self.poll,
            || self.link.send_word(PROBE_WORD),
            |response| response == CARTRIDGE_PRESENT,
        )?;
        log::debug!("cartridge present");
        Ok(())
    }

    /// ROM size in bytes.
    pub fn game_size(&mut self) -> Result<u32, ProtocolError> {
        self.query(CMD_GAME_SIZE)
    }

    /// Save size in bytes, 0 when the cartridge has no save memory.
    pub fn save_size(&mut self) -> Result<u32, ProtocolError> {
        self.query(CMD_SAVE_SIZE)
    }

    fn query(&mut self, opcode: u8) -> Result<u32, ProtocolError> {
        CommandFrame::new(opcode, Vec::new()).send(&mut self.link)?;
        let value = self.probe()?;
        log::debug!("command {:#04x} -> {:#x}", opcode, value);
        Ok(value)
    }

    /// Read `count` bytes starting at console address `addr`.
    pub fn read(&mut self, addr: u32, count: usize) -> Result<Vec<u8>, ProtocolError> {
        self.read_inner(addr, count, None)
    }

    pub fn read_with_progress(
        &mut self,
        addr: u32,
        count: usize,
        progress_tx: &Sender<TransferProgress>,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.read_inner(addr, count, Some(progress_tx))
    }

    fn read_inner(
        &mut self,
        addr: u32,
        count: usize,
        progress: Option<&Sender<TransferProgress>>,
    ) -> Result<Vec<u8>, ProtocolError> {
        let words = count.div_ceil(4);
        log::debug!("read {:#x} bytes at {:#010x}", count, addr);
        CommandFrame::from_words(CMD_READ, &[addr, words as u32]).send(&mut self.link)?;

        let mut data = Vec::with_capacity(words * 4);
        for n in 0..words {
            let word = self.probe()?;
            data.extend_from_slice(&word.to_le_bytes());

            let done = n + 1;
            if done % PROGRESS_INTERVAL == 0 || done == words {
                notify(
                    progress,
                    TransferProgress::bytes((done * 4).min(count) as u64, count as u64),
                );
            }
        }
        data.truncate(count);
        Ok(data)
    }

    /// Read and decode the cartridge header.
    pub fn read_header(&mut self) -> Result<RomHeader, ProtocolError> {
        let bytes = self.read(ROM_BASE, HEADER_LENGTH)?;
        Ok(parse_header(&bytes))
    }

    pub fn read_rom(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let size = self.game_size()?;
        self.read(ROM_BASE, size as usize)
    }

    pub fn read_rom_with_progress(
        &mut self,
        progress_tx: &Sender<TransferProgress>,
    ) -> Result<Vec<u8>, ProtocolError> {
        let size = self.game_size()?;
        self.read_with_progress(ROM_BASE, size as usize, progress_tx)
    }

    pub fn read_save(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let size = self.save_size()?;
        self.read(SAVE_BASE, size as usize)
    }

    pub fn read_save_with_progress(
        &mut self,
        progress_tx: &Sender<TransferProgress>,
    ) -> Result<Vec<u8>, ProtocolError> {
        let size = self.save_size()?;
        self.read_with_progress(SAVE_BASE, size as usize, progress_tx)
    }

    /// Replace the cartridge save. `data` must match the reported save size.
    pub fn write_save(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.write_save_inner(data, None)
    }

    pub fn write_save_with_progress(
        &mut self,
        data: &[u8],
        progress_tx: &Sender<TransferProgress>,
    ) -> Result<(), ProtocolError> {
        self.write_save_inner(data, Some(progress_tx))
    }

    /// Overwrite the save with zeros.
    pub fn clear_save(&mut self) -> Result<(), ProtocolError> {
        let size = self.save_size()?;
        self.send_save(&vec![0u8; size as usize], None)
    }

    fn write_save_inner(
        &mut self,
        data: &[u8],
        progress: Option<&Sender<TransferProgress>>,
    ) -> Result<(), ProtocolError> {
        let expected = self.save_size()? as usize;
        if data.len() != expected {
            return Err(ProtocolError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        self.send_save(data, progress)
    }

    fn send_save(
        &mut self,
        data: &[u8],
        progress: Option<&Sender<TransferProgress>>,
    ) -> Result<(), ProtocolError> {
        if data.len() % 4 != 0 {
            return Err(ProtocolError::SizeMismatch {
                expected: data.len().next_multiple_of(4),
                actual: data.len(),
            });
        }
        if data.len() > SAVE_MAX_BYTES {
            return Err(ProtocolError::PayloadTooLarge {
                words: data.len().div_ceil(4),
                max: SAVE_MAX_BYTES / 4,
            });
        }

        let frame = CommandFrame::new(CMD_WRITE_SAVE, data);
        let words = frame.serialize();
        let total = words.len();
        log::debug!("write save: {} bytes", data.len());
        for (n, word) in words.into_iter().enumerate() {
            self.link.send_word(word)?;
            let done = n + 1;
            if done % PROGRESS_INTERVAL == 0 || done == total {
                notify(
                    progress,
                    TransferProgress::bytes(
                        (done.saturating_sub(2) * 4).min(data.len()) as u64,
                        data.len() as u64,
                    ),
                );
            }
        }
        Ok(())
    }

    /// Round-trip `words` through the firmware to check the link.
    pub fn echo(&mut self, words: &[u32]) -> Result<Vec<u32>, ProtocolError> {
        if words.len() > ECHO_MAX_WORDS {
            return Err(ProtocolError::PayloadTooLarge {
                words: words.len(),
                max: ECHO_MAX_WORDS,
            });
        }
        let payload = unpack_le_words(words);
        CommandFrame::new(CMD_ECHO, payload.as_slice()).send(&mut self.link)?;
        let received = self.read_back(payload.len())?;
        Ok(pack_le_words(&received))
    }

    fn read_back(&mut self, count: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut data = Vec::with_capacity(count);
        for _ in 0..count.div_ceil(4) {
            data.extend_from_slice(&self.probe()?.to_le_bytes());
        }
        data.truncate(count);
        Ok(data)
    }

    /// Sizes, save type and header in one go.
    pub fn info(&mut self) -> Result<CartridgeInfo, ProtocolError> {
        let game_size = self.game_size()?;
        let save_size = self.save_size()?;
        let header = self.read_header()?;
        Ok(CartridgeInfo {
            game_size,
            save_size,
            save_type: SaveType::from_size(save_size),
            header,
        })
    }
}

fn notify(progress: Option<&Sender<TransferProgress>>, update: TransferProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(update);
    }
}

#[cfg(test)]
#[path = "tests/cartridge_tests.rs"]
mod tests;
