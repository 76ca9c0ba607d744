//! Emulated devices for protocol tests.
//!
//! [`FakeConsole`] plays the BIOS side of multiboot: it runs its own CRC and
//! keystream, decrypts what it receives and answers like the console would.
//! [`FakeCartridge`] plays the dumper firmware's command loop over an in-memory
//! ROM and save. [`ScriptedLink`] just replays canned responses.

use std::collections::VecDeque;

use gba_link_core::{LinkError, WordLink};

use crate::cipher::KeystreamCipher;
use crate::constants::*;
use crate::crc::Crc16Accumulator;

/// Build a ROM of `len` bytes with a valid header and a patterned body.
pub(crate) fn make_rom(len: usize) -> Vec<u8> {
    let mut rom = vec![0u8; len];
    for (i, b) in rom.iter_mut().enumerate().skip(HEADER_LENGTH) {
        *b = (i as u8).wrapping_mul(7).wrapping_add(3);
    }
    rom[0x03] = 0xEA;
    rom[0xA0..0xAC].copy_from_slice(b"TESTGAME\0\0\0\0");
    rom[0xAC..0xB0].copy_from_slice(b"ATEJ");
    rom[0xB0..0xB2].copy_from_slice(b"01");
    rom[0xB2] = HEADER_FIXED_VALUE;
    rom[0xBD] = crate::rom::header_complement(&rom);
    rom
}

/// Replays queued responses and records everything sent.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLink {
    pub responses: VecDeque<u32>,
    pub sent: Vec<u32>,
    /// Answer once `responses` runs dry.
    pub fallback: u32,
    /// Fail with a transport error on this send (0-based).
    pub fail_at: Option<usize>,
}

impl ScriptedLink {
    pub fn new(responses: impl IntoIterator<Item = u32>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl WordLink for ScriptedLink {
    fn send_word(&mut self, tx: u32) -> Result<u32, LinkError> {
        if self.fail_at == Some(self.sent.len()) {
            return Err(LinkError::transport("scripted failure"));
        }
        self.sent.push(tx);
        Ok(self.responses.pop_front().unwrap_or(self.fallback))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsolePhase {
    Idle,
    Header,
    AwaitKey,
    AwaitLength,
    Rom,
    AwaitChecksumPoll,
    AwaitChecksum,
    Done,
}

/// BIOS side of the multiboot handshake.
#[derive(Debug)]
pub(crate) struct FakeConsole {
    pub sent: Vec<u32>,
    /// Ready probes answered with 0 before the console reports ready.
    pub not_ready_polls: usize,
    pub token_high: u16,
    pub token_low: u8,
    pub final_b: u8,
    /// Checksum polls answered with 0 before 0x75.
    pub busy_checksum_polls: usize,
    /// Reply to the n-th body word (0-based) with this echo instead.
    pub corrupt_echo_at: Option<(usize, u16)>,
    /// Report this checksum instead of the computed one.
    pub checksum_override: Option<u16>,
    pub header: Vec<u16>,
    pub body: Vec<u32>,
    pub pp: Option<u8>,
    pub final_a: Option<u8>,
    pub host_checksum: Option<u16>,
    pub booted: bool,
    pub phase: ConsolePhase,
    pub crc: Option<Crc16Accumulator>,
    pub cipher: Option<KeystreamCipher>,
    pub index: u32,
    pub remaining: u32,
}

impl Default for FakeConsole {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            not_ready_polls: 0,
            token_high: TOKEN_MARKER,
            token_low: 0x12,
            final_b: 0x5C,
            busy_checksum_polls: 0,
            corrupt_echo_at: None,
            checksum_override: None,
            header: Vec::new(),
            body: Vec::new(),
            pp: None,
            final_a: None,
            host_checksum: None,
            booted: false,
            phase: ConsolePhase::Idle,
            crc: None,
            cipher: None,
            index: 0,
            remaining: 0,
        }
    }
}

impl FakeConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn answer(&mut self, w: u32) -> u32 {
        match self.phase {
            ConsolePhase::Idle => match w {
                READY_PROBE if self.not_ready_polls > 0 => {
                    self.not_ready_polls -= 1;
                    0
                }
                READY_PROBE => READY_RESPONSE << 16,
                HEADER_MODE_START => {
                    self.phase = ConsolePhase::Header;
                    0
                }
                _ => 0,
            },
            ConsolePhase::Header => {
                if w == HEADER_MODE_END {
                    self.phase = ConsolePhase::AwaitKey;
                } else {
                    self.header.push(w as u16);
                }
                0
            }
            ConsolePhase::AwaitKey => match w & 0xFF00 {
                _ if w == READY_PROBE => READY_RESPONSE << 16,
                KEY_EXCHANGE_BASE => {
                    self.pp = Some((w & 0xFF) as u8);
                    let token = (self.token_high << 8) | u16::from(self.token_low);
                    u32::from(token) << 16
                }
                CRC_FINAL_BASE => {
                    self.final_a = Some((w & 0xFF) as u8);
                    self.phase = ConsolePhase::AwaitLength;
                    0
                }
                _ => 0,
            },
            ConsolePhase::AwaitLength => {
                let pp = self.pp.unwrap_or(0);
                let seed = SEED_BASE | (u32::from(self.token_low) << 8) | u32::from(pp);
                self.cipher = Some(KeystreamCipher::new(seed));
                self.crc = Some(Crc16Accumulator::new(
                    self.final_a.unwrap_or(0),
                    self.final_b,
                ));
                self.index = HEADER_LENGTH as u32;
                self.remaining = w.wrapping_add(LENGTH_BIAS);
                self.phase = if self.remaining == 0 {
                    ConsolePhase::AwaitChecksumPoll
                } else {
                    ConsolePhase::Rom
                };
                // Upper byte is noise the host must mask off.
                (0xAB00 | u32::from(self.final_b)) << 16
            }
            ConsolePhase::Rom => {
                let cipher = self.cipher.as_mut().expect("cipher set up");
                let raw = cipher.step(w, self.index);
                self.crc.as_mut().expect("crc set up").step(raw);
                self.body.push(raw);

                let ordinal = self.body.len() - 1;
                let echo = match self.corrupt_echo_at {
                    Some((at, wrong)) if at == ordinal => wrong,
                    _ => (self.index & 0xFFFF) as u16,
                };
                self.index += 4;
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.phase = ConsolePhase::AwaitChecksumPoll;
                }
                u32::from(echo) << 16
            }
            ConsolePhase::AwaitChecksumPoll => match w {
                CHECKSUM_POLL if self.busy_checksum_polls > 0 => {
                    self.busy_checksum_polls -= 1;
                    0
                }
                CHECKSUM_POLL => CHECKSUM_READY << 16,
                CHECKSUM_SEND => {
                    self.phase = ConsolePhase::AwaitChecksum;
                    0
                }
                _ => 0,
            },
            ConsolePhase::AwaitChecksum => {
                let digest = self.crc.take().expect("crc set up").digest();
                self.host_checksum = Some(w as u16);
                self.booted = digest == w as u16;
                self.phase = ConsolePhase::Done;
                u32::from(self.checksum_override.unwrap_or(digest)) << 16
            }
            ConsolePhase::Done => 0,
        }
    }
}

impl WordLink for FakeConsole {
    fn send_word(&mut self, tx: u32) -> Result<u32, LinkError> {
        self.sent.push(tx);
        Ok(self.answer(tx))
    }
}

#[derive(Debug, Clone)]
enum FirmwareState {
    Command,
    Payload {
        command: u32,
        size: usize,
        words: Vec<u32>,
    },
}

/// Dumper firmware command loop.
///
/// While the firmware has words queued for the host, incoming words only clock
/// them out; otherwise each incoming word feeds the command parser.
#[derive(Debug)]
pub(crate) struct FakeCartridge {
    pub rom: Vec<u8>,
    pub save: Vec<u8>,
    pub sent: Vec<u32>,
    /// Health checks ignored before the cartridge shows up.
    pub absent_polls: usize,
    pub saves_written: usize,
    outbox: VecDeque<u32>,
    state: FirmwareState,
    pending_command: Option<u32>,
}

impl FakeCartridge {
    pub fn new(rom: Vec<u8>, save: Vec<u8>) -> Self {
        Self {
            rom,
            save,
            sent: Vec::new(),
            absent_polls: 0,
            saves_written: 0,
            outbox: VecDeque::new(),
            state: FirmwareState::Command,
            pending_command: None,
        }
    }

    fn feed(&mut self, w: u32) {
        match std::mem::replace(&mut self.state, FirmwareState::Command) {
            FirmwareState::Command => match self.pending_command.take() {
                None if w == PROBE_WORD => {
                    if self.absent_polls > 0 {
                        self.absent_polls -= 1;
                    } else {
                        self.outbox.push_back(CARTRIDGE_PRESENT);
                    }
                }
                None => self.pending_command = Some(w),
                Some(command) => {
                    let max = if command == u32::from(CMD_WRITE_SAVE) {
                        SAVE_MAX_BYTES / 4
                    } else {
                        ECHO_MAX_WORDS
                    };
                    let size = (w as usize).min(max);
                    if size == 0 {
                        self.execute(command, 0, &[]);
                    } else {
                        self.state = FirmwareState::Payload {
                            command,
                            size,
                            words: Vec::with_capacity(size),
                        };
                    }
                }
            },
            FirmwareState::Payload {
                command,
                size,
                mut words,
            } => {
                words.push(w);
                if words.len() == size {
                    self.execute(command, size, &words);
                } else {
                    self.state = FirmwareState::Payload {
                        command,
                        size,
                        words,
                    };
                }
            }
        }
    }

    fn execute(&mut self, command: u32, size: usize, words: &[u32]) {
        match u8::try_from(command).unwrap_or(u8::MAX) {
            CMD_GAME_SIZE => self.outbox.push_back(self.rom.len() as u32),
            CMD_SAVE_SIZE => self.outbox.push_back(self.save.len() as u32),
            CMD_READ => {
                let (addr, count) = (words[0], words[1] as usize);
                let (memory, offset) = if addr == SAVE_BASE {
                    (&self.save, 0)
                } else {
                    (&self.rom, (addr - ROM_BASE) as usize)
                };
                for i in 0..count {
                    let mut word = [0u8; 4];
                    for (j, b) in word.iter_mut().enumerate() {
                        *b = memory.get(offset + i * 4 + j).copied().unwrap_or(0);
                    }
                    self.outbox.push_back(u32::from_le_bytes(word));
                }
            }
            CMD_WRITE_SAVE => {
                if size * 4 == self.save.len() {
                    self.save = words.iter().flat_map(|w| w.to_le_bytes()).collect();
                    self.saves_written += 1;
                }
            }
            CMD_ECHO => self.outbox.extend(words.iter().copied()),
            _ => self.outbox.push_back(BAD_COMMAND),
        }
    }
}

impl WordLink for FakeCartridge {
    fn send_word(&mut self, tx: u32) -> Result<u32, LinkError> {
        self.sent.push(tx);
        if let Some(out) = self.outbox.pop_front() {
            return Ok(out);
        }
        self.feed(tx);
        Ok(0)
    }
}
