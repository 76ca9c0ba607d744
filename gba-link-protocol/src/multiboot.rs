//! Multiboot handshake: upload a program into the console's RAM.
//!
//! The session walks through its states strictly in order:
//!
//! 1. **WaitReady**: poll `0x6202` until the console answers `0x7202`.
//! 2. **SendHeader**: `0x6100`, the 0xC0-byte header as 96 half-words, `0x6200`.
//! 3. **KeyExchange**: trade the parameter byte for a token, derive the
//!    keystream seed and the two CRC finalize bytes.
//! 4. **TransferRom**: send every body word obfuscated; the console echoes the
//!    word's byte index in the high half of each response.
//! 5. **ValidateChecksum**: wait for the console to finish, send the CRC and
//!    compare the value it reports back.
//!
//! Any failure moves the session to `Error`. Nothing is retried; a new attempt
//! needs a new session.
//!
//! Every boot-time send is a "16-bit send": a full word goes out and only the
//! upper 16 bits of the response are meaningful.

use std::sync::mpsc::Sender;

use gba_link_core::{
    LinkError, PollOptions, ProtocolError, TransferProgress, WordLink, poll_until,
};

use crate::cipher::KeystreamCipher;
use crate::constants::{
    CHECKSUM_POLL, CHECKSUM_READY, CHECKSUM_SEND, CRC_FINAL_BASE, HEADER_LENGTH,
    HEADER_MODE_END, HEADER_MODE_START, KEY_EXCHANGE_BASE, LENGTH_BIAS, PARAM_BASE, READY_PROBE,
    READY_RESPONSE, SEED_BASE, TOKEN_MARKER,
};
use crate::crc::Crc16Accumulator;
use crate::rom::RomImage;

/// Send a progress update every this many body words.
const PROGRESS_INTERVAL: u64 = 256;

/// Where a multiboot session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitReady,
    SendHeader,
    KeyExchange,
    TransferRom,
    ValidateChecksum,
    Done,
    Error,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitReady => "wait-ready",
            Self::SendHeader => "send-header",
            Self::KeyExchange => "key-exchange",
            Self::TransferRom => "transfer-rom",
            Self::ValidateChecksum => "validate-checksum",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Link parameters folded into the `pp` byte of the key exchange.
///
/// Only the all-zero default has been seen in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeParams {
    /// Boot logo palette, 0..=7
    pub palette_color: u8,
    pub direction: bool,
    /// Palette speed, 0..=3
    pub speed: u8,
}

impl HandshakeParams {
    /// `0x81 | color << 4 | direction << 3 | speed << 1`
    pub fn pp(&self) -> u8 {
        PARAM_BASE
            | ((self.palette_color & 0x7) << 4)
            | (u8::from(self.direction) << 3)
            | ((self.speed & 0x3) << 1)
    }
}

/// Values negotiated during key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKeys {
    pub seed: u32,
    pub crc_final_a: u8,
    pub crc_final_b: u8,
}

/// Drives one multiboot attempt over an exclusively held link.
pub struct MultibootSession<'a, L: WordLink> {
    link: L,
    rom: RomImage<'a>,
    params: HandshakeParams,
    poll: PollOptions,
    state: SessionState,
    keys: Option<SessionKeys>,
}

impl<'a, L: WordLink> MultibootSession<'a, L> {
    pub fn new(link: L, rom: RomImage<'a>) -> Self {
        Self {
            link,
            rom,
            params: HandshakeParams::default(),
            poll: PollOptions::default(),
            state: SessionState::WaitReady,
            keys: None,
        }
    }

    pub fn with_params(mut self, params: HandshakeParams) -> Self {
        self.params = params;
        self
    }

    /// Limits for the ready wait and the checksum wait.
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Keys from the key exchange, once it has happened.
    pub fn keys(&self) -> Option<SessionKeys> {
        self.keys
    }

    /// Give the link back, e.g. to hand it to a `CartridgeLink`.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Boot the console.
    pub fn run(&mut self) -> Result<(), ProtocolError> {
        self.run_inner(None)
    }

    /// Boot the console, reporting phases and word counts on `progress_tx`.
    pub fn run_with_progress(
        &mut self,
        progress_tx: &Sender<TransferProgress>,
    ) -> Result<(), ProtocolError> {
        self.run_inner(Some(progress_tx))
    }

    fn run_inner(&mut self, progress: Option<&Sender<TransferProgress>>) -> Result<(), ProtocolError> {
        if self.state != SessionState::WaitReady {
            return Err(ProtocolError::SessionFinished {
                state: self.state.name(),
            });
        }

        match self.drive(progress) {
            Ok(()) => {
                self.state = SessionState::Done;
                log::info!("multiboot complete ({} bytes)", self.rom.aligned_length());
                notify(progress, TransferProgress::Completed);
                Ok(())
            }
            Err(e) => {
                log::debug!("multiboot failed in {}: {}", self.state, e);
                self.state = SessionState::Error;
                notify(progress, TransferProgress::failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn drive(&mut self, progress: Option<&Sender<TransferProgress>>) -> Result<(), ProtocolError> {
        self.rom.validate_for_multiboot()?;

        self.enter(SessionState::WaitReady, progress);
        self.wait_ready()?;

        self.enter(SessionState::SendHeader, progress);
        self.send_header()?;

        self.enter(SessionState::KeyExchange, progress);
        let (mut crc, mut cipher) = self.key_exchange()?;

        self.enter(SessionState::TransferRom, progress);
        self.transfer_rom(&mut crc, &mut cipher, progress)?;

        self.enter(SessionState::ValidateChecksum, progress);
        self.validate_checksum(crc.digest())
    }

    fn enter(&mut self, state: SessionState, progress: Option<&Sender<TransferProgress>>) {
        log::debug!("multiboot: {}", state);
        self.state = state;
        notify(progress, TransferProgress::phase(state.name()));
    }

    /// Send a word, keep the upper half of the response.
    fn send16(&mut self, word: u32) -> Result<u16, LinkError> {
        let response = self.link.send_word(word)?;
        Ok((response >> 16) as u16)
    }

    fn wait_ready(&mut self) -> Result<(), ProtocolError> {
        poll_until(
            &self.poll,
            || self.link.send_word(READY_PROBE),
            |response| response >> 16 == READY_RESPONSE,
        )?;
        Ok(())
    }

    fn send_header(&mut self) -> Result<(), ProtocolError> {
        self.send16(HEADER_MODE_START)?;
        let header = self.rom.header();
        for half in header.chunks_exact(2) {
            let value = u16::from_le_bytes([half[0], half[1]]);
            self.send16(u32::from(value))?;
        }
        self.send16(HEADER_MODE_END)?;
        log::trace!("sent {} header half-words", header.len() / 2);
        Ok(())
    }

    fn key_exchange(&mut self) -> Result<(Crc16Accumulator, KeystreamCipher), ProtocolError> {
        let pp = self.params.pp();
        let param_word = KEY_EXCHANGE_BASE | u32::from(pp);

        self.send16(READY_PROBE)?;
        self.send16(param_word)?;
        let token = self.send16(param_word)?;
        if token >> 8 != TOKEN_MARKER {
            return Err(ProtocolError::Handshake { token });
        }

        let token_low = (token & 0xFF) as u8;
        let seed = SEED_BASE | (u32::from(token_low) << 8) | u32::from(pp);
        let crc_final_a = token_low.wrapping_add(0xF);

        self.send16(CRC_FINAL_BASE | u32::from(crc_final_a))?;
        let body_words = ((self.rom.aligned_length() - HEADER_LENGTH) / 4) as u32;
        let length_word = body_words.wrapping_sub(LENGTH_BIAS);
        let crc_final_b = (self.send16(length_word)? & 0xFF) as u8;

        let keys = SessionKeys {
            seed,
            crc_final_a,
            crc_final_b,
        };
        log::debug!("key exchange: {:08x?}", keys);
        self.keys = Some(keys);

        Ok((
            Crc16Accumulator::new(crc_final_a, crc_final_b),
            KeystreamCipher::new(seed),
        ))
    }

    fn transfer_rom(
        &mut self,
        crc: &mut Crc16Accumulator,
        cipher: &mut KeystreamCipher,
        progress: Option<&Sender<TransferProgress>>,
    ) -> Result<(), ProtocolError> {
        let body = self.rom.game_body();
        let total = (body.len() / 4) as u64;

        for (n, chunk) in body.chunks_exact(4).enumerate() {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let index = (HEADER_LENGTH + n * 4) as u32;

            crc.step(raw);
            let encrypted = cipher.step(raw, index);

            let echo = self.send16(encrypted)?;
            let expected = (index & 0xFFFF) as u16;
            if echo != expected {
                return Err(ProtocolError::Transmission {
                    expected,
                    actual: echo,
                });
            }

            let sent = n as u64 + 1;
            if sent % PROGRESS_INTERVAL == 0 || sent == total {
                notify(progress, TransferProgress::words(sent, total));
            }
        }
        Ok(())
    }

    fn validate_checksum(&mut self, checksum: u16) -> Result<(), ProtocolError> {
        poll_until(
            &self.poll,
            || self.link.send_word(CHECKSUM_POLL),
            |response| response >> 16 == CHECKSUM_READY,
        )?;

        self.send16(CHECKSUM_SEND)?;
        let reported = self.send16(u32::from(checksum))?;
        if reported != checksum {
            return Err(ProtocolError::Checksum {
                expected: checksum,
                actual: reported,
            });
        }
        Ok(())
    }
}

fn notify(progress: Option<&Sender<TransferProgress>>, update: TransferProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(update);
    }
}

#[cfg(test)]
#[path = "tests/multiboot_tests.rs"]
mod tests;
