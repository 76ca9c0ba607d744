//! Wire constants for the multiboot BIOS handshake and the dumper firmware.
//!
//! Kept in one place so the CRC, keystream and framing can be checked against
//! the console-side values at a glance.

// ---------------------------------------------------------------------------
// ROM layout
// ---------------------------------------------------------------------------

/// Length of the cartridge header sent verbatim before the game body.
pub const HEADER_LENGTH: usize = 0xC0;

/// Multiboot images are truncated to this alignment.
pub const ROM_ALIGNMENT_MASK: usize = !0xF;

/// Largest image the console can receive into EWRAM.
pub const MULTIBOOT_MAX_BYTES: usize = 0x40000;

pub const GAME_NAME_RANGE: std::ops::Range<usize> = 0xA0..0xAC;
pub const GAME_ID_RANGE: std::ops::Range<usize> = 0xAC..0xB0;
pub const COMPANY_ID_RANGE: std::ops::Range<usize> = 0xB0..0xB2;
pub const FIXED_VALUE_OFFSET: usize = 0xB2;
pub const SOFTWARE_VERSION_OFFSET: usize = 0xBC;
pub const COMPLEMENT_CHECK_OFFSET: usize = 0xBD;

/// Required value at [`FIXED_VALUE_OFFSET`].
pub const HEADER_FIXED_VALUE: u8 = 0x96;

// ---------------------------------------------------------------------------
// Multiboot handshake
// ---------------------------------------------------------------------------

/// Readiness probe, also repeated at the start of key exchange.
pub const READY_PROBE: u32 = 0x6202;
/// High half-word the console answers [`READY_PROBE`] with once it is listening.
pub const READY_RESPONSE: u32 = 0x7202;

pub const HEADER_MODE_START: u32 = 0x6100;
pub const HEADER_MODE_END: u32 = 0x6200;

/// Base for the palette/parameter word; OR'd with `pp`.
pub const KEY_EXCHANGE_BASE: u32 = 0x6300;
/// High byte required in the key exchange token.
pub const TOKEN_MARKER: u16 = 0x73;
/// Base for the CRC final-A word.
pub const CRC_FINAL_BASE: u32 = 0x6400;
/// Subtracted from the body word count in the length word.
pub const LENGTH_BIAS: u32 = 0x34;

/// Base value of the parameter byte (`pp`) before color, direction and speed.
pub const PARAM_BASE: u8 = 0x81;

pub const CHECKSUM_POLL: u32 = 0x0065;
pub const CHECKSUM_READY: u32 = 0x0075;
pub const CHECKSUM_SEND: u32 = 0x0066;

// ---------------------------------------------------------------------------
// CRC and keystream
// ---------------------------------------------------------------------------

pub const CRC_INITIAL: u32 = 0xC387;
pub const CRC_POLYNOMIAL: u32 = 0xC37B;
pub const CRC_FINALIZE_BASE: u32 = 0xFFFF_0000;

pub const KEYSTREAM_MULTIPLIER: u32 = 0x6F64_6573;
pub const KEYSTREAM_MASK: u32 = 0x4320_2F2F;
pub const KEYSTREAM_INDEX_BASE: u32 = 0xFE00_0000;
pub const SEED_BASE: u32 = 0xFFFF_0000;

// ---------------------------------------------------------------------------
// Dumper firmware commands
// ---------------------------------------------------------------------------

pub const CMD_GAME_SIZE: u8 = 0x01;
pub const CMD_SAVE_SIZE: u8 = 0x02;
pub const CMD_READ: u8 = 0x03;
pub const CMD_WRITE_SAVE: u8 = 0x04;
pub const CMD_ECHO: u8 = 0x05;

/// Bare word used both as health check and as a clock word for reads.
pub const PROBE_WORD: u32 = 0x00;
/// Answer to a health check once the firmware is running with a cartridge.
pub const CARTRIDGE_PRESENT: u32 = 0xC0DE;
/// Firmware answer to an unknown opcode.
pub const BAD_COMMAND: u32 = 0x0BAD;

/// Cartridge ROM as mapped on the console.
pub const ROM_BASE: u32 = 0x0800_0000;
/// Save memory as addressed by the firmware.
pub const SAVE_BASE: u32 = 0x0700_0000;

/// Words the firmware buffers for non-save commands.
pub const ECHO_MAX_WORDS: usize = 0x64;
/// Largest save the firmware handles (128 KiB flash).
pub const SAVE_MAX_BYTES: usize = 0x20000;

// ---------------------------------------------------------------------------
// USB bridge defaults
// ---------------------------------------------------------------------------

pub const USB_VENDOR_ID: u16 = 0x1234;
pub const USB_INTERFACE: u8 = 1;
pub const USB_ENDPOINT_OUT: u8 = 0x01;
pub const USB_ENDPOINT_IN: u8 = 0x82;
