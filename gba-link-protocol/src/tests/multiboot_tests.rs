use std::sync::mpsc;
use std::time::Duration;

use gba_link_core::CancelToken;

use super::*;
use crate::constants::MULTIBOOT_MAX_BYTES;
use crate::test_support::{FakeConsole, ScriptedLink, make_rom};

fn body_words(rom: &[u8]) -> Vec<u32> {
    rom[0xC0..rom.len() & !0xF]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn header_halves(rom: &[u8]) -> Vec<u16> {
    rom[..0xC0]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

#[test]
fn boots_synthetic_rom_end_to_end() {
    let rom = make_rom(256);
    let mut console = FakeConsole::new();

    let (result, state, keys) = {
        let mut session = MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap());
        let result = session.run();
        (result, session.state(), session.keys())
    };

    result.unwrap();
    assert_eq!(state, SessionState::Done);
    assert_eq!(
        keys,
        Some(SessionKeys {
            seed: 0xFFFF_1281,
            crc_final_a: 0x21,
            crc_final_b: 0x5C,
        })
    );

    assert!(console.booted);
    assert_eq!(console.pp, Some(0x81));
    assert_eq!(console.header, header_halves(&rom));
    assert_eq!(console.body, body_words(&rom));
    assert_eq!(console.body.len(), (256 - 0xC0) / 4);
    assert_eq!(console.host_checksum, Some(0xACC6));

    assert_eq!(console.sent.iter().filter(|&&w| w == 0x6100).count(), 1);
    assert_eq!(console.sent.iter().filter(|&&w| w == 0x6200).count(), 1);
}

#[test]
fn wire_sequence_matches_handshake() {
    let rom = make_rom(256);
    let mut console = FakeConsole::new();
    MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap())
        .run()
        .unwrap();

    let sent = &console.sent;
    assert_eq!(sent[0], READY_PROBE);
    assert_eq!(sent[1], HEADER_MODE_START);
    assert_eq!(sent[2 + 96], HEADER_MODE_END);
    assert_eq!(&sent[99..103], &[0x6202, 0x6381, 0x6381, 0x6421]);
    // 16 body words minus the 0x34 bias, as a wrapped 32-bit value
    assert_eq!(sent[103], 16u32.wrapping_sub(0x34));
    assert_eq!(&sent[120..], &[CHECKSUM_POLL, CHECKSUM_SEND, 0xACC6]);
}

#[test]
fn waits_until_console_reports_ready() {
    let rom = make_rom(256);
    let mut console = FakeConsole {
        not_ready_polls: 5,
        ..FakeConsole::new()
    };
    MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap())
        .run()
        .unwrap();

    assert!(console.sent[..6].iter().all(|&w| w == READY_PROBE));
    assert_eq!(console.sent[6], HEADER_MODE_START);
    assert!(console.booted);
}

#[test]
fn waits_for_checksum_ready() {
    let rom = make_rom(256);
    let mut console = FakeConsole {
        busy_checksum_polls: 3,
        ..FakeConsole::new()
    };
    MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap())
        .run()
        .unwrap();

    let polls = console.sent.iter().filter(|&&w| w == CHECKSUM_POLL).count();
    assert_eq!(polls, 4);
    assert!(console.booted);
}

#[test]
fn header_only_rom_boots() {
    let rom = make_rom(0xC0);
    let mut console = FakeConsole::new();
    MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap())
        .run()
        .unwrap();
    assert!(console.body.is_empty());
    assert!(console.booted);
}

#[test]
fn bad_token_fails_handshake() {
    let rom = make_rom(256);
    let mut console = FakeConsole {
        token_high: 0x72,
        ..FakeConsole::new()
    };

    let (result, state) = {
        let mut session = MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap());
        (session.run(), session.state())
    };

    assert!(matches!(result, Err(ProtocolError::Handshake { token: 0x7212 })));
    assert_eq!(state, SessionState::Error);
    assert!(!console.sent.iter().any(|&w| w & 0xFF00 == CRC_FINAL_BASE));
}

#[test]
fn wrong_echo_on_fifth_word_aborts_transfer() {
    let rom = make_rom(256);
    let mut console = FakeConsole {
        corrupt_echo_at: Some((4, 0xBEEF)),
        ..FakeConsole::new()
    };

    let (result, state) = {
        let mut session = MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap());
        (session.run(), session.state())
    };

    match result {
        Err(ProtocolError::Transmission { expected, actual }) => {
            assert_eq!(expected, 0xC0 + 4 * 4);
            assert_eq!(actual, 0xBEEF);
        }
        other => panic!("expected transmission error, got {:?}", other),
    }
    assert_eq!(state, SessionState::Error);
    // The sixth word never went out
    assert_eq!(console.body.len(), 5);
    assert!(!console.sent.contains(&CHECKSUM_POLL));
}

#[test]
fn checksum_mismatch_is_terminal() {
    let rom = make_rom(256);
    let mut console = FakeConsole {
        checksum_override: Some(0x1234),
        ..FakeConsole::new()
    };
    let mut session = MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap());

    match session.run() {
        Err(ProtocolError::Checksum { expected, actual }) => {
            assert_eq!(expected, 0xACC6);
            assert_eq!(actual, 0x1234);
        }
        other => panic!("expected checksum error, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Error);

    let again = session.run();
    assert!(matches!(
        again,
        Err(ProtocolError::SessionFinished { state: "error" })
    ));
}

#[test]
fn finished_session_rejects_second_run() {
    let rom = make_rom(256);
    let mut session = MultibootSession::new(FakeConsole::new(), RomImage::from_bytes(&rom).unwrap());
    session.run().unwrap();
    assert!(matches!(
        session.run(),
        Err(ProtocolError::SessionFinished { state: "done" })
    ));
    assert!(session.into_link().booted);
}

#[test]
fn link_error_propagates() {
    let rom = make_rom(256);
    let mut link = ScriptedLink::new([READY_RESPONSE << 16]);
    link.fail_at = Some(3);

    let mut session = MultibootSession::new(&mut link, RomImage::from_bytes(&rom).unwrap());
    let result = session.run();
    assert!(matches!(result, Err(ProtocolError::Link(_))));
    assert_eq!(session.state(), SessionState::Error);
}

#[test]
fn oversized_rom_is_rejected_before_sending() {
    let rom = vec![0u8; MULTIBOOT_MAX_BYTES + 0x10];
    let mut link = ScriptedLink::default();
    let result = MultibootSession::new(&mut link, RomImage::from_bytes(&rom).unwrap()).run();
    assert!(matches!(result, Err(ProtocolError::InvalidRom { .. })));
    assert!(link.sent.is_empty());
}

#[test]
fn ready_wait_times_out() {
    let rom = make_rom(256);
    let mut link = ScriptedLink::default();
    let mut session = MultibootSession::new(&mut link, RomImage::from_bytes(&rom).unwrap())
        .with_poll_options(PollOptions::new().timeout(Duration::from_millis(5)));

    assert!(matches!(session.run(), Err(ProtocolError::Timeout { .. })));
    assert_eq!(session.state(), SessionState::Error);
}

#[test]
fn ready_wait_can_be_cancelled() {
    let rom = make_rom(256);
    let token = CancelToken::new();
    token.cancel();
    let mut link = ScriptedLink::default();
    let result = MultibootSession::new(&mut link, RomImage::from_bytes(&rom).unwrap())
        .with_poll_options(PollOptions::new().cancel_token(token))
        .run();

    assert!(matches!(result, Err(ProtocolError::Cancelled)));
    assert!(link.sent.is_empty());
}

#[test]
fn handshake_params_fold_into_pp() {
    assert_eq!(HandshakeParams::default().pp(), 0x81);
    let params = HandshakeParams {
        palette_color: 7,
        direction: true,
        speed: 3,
    };
    assert_eq!(params.pp(), 0xFF);
    let params = HandshakeParams {
        palette_color: 2,
        direction: false,
        speed: 1,
    };
    assert_eq!(params.pp(), 0xA3);
}

#[test]
fn custom_params_still_boot() {
    let rom = make_rom(0x140);
    let mut console = FakeConsole::new();
    let params = HandshakeParams {
        palette_color: 3,
        direction: true,
        speed: 2,
    };
    let keys = {
        let mut session = MultibootSession::new(&mut console, RomImage::from_bytes(&rom).unwrap())
            .with_params(params);
        session.run().unwrap();
        session.keys().unwrap()
    };

    assert_eq!(console.pp, Some(params.pp()));
    assert_eq!(keys.seed & 0xFF, u32::from(params.pp()));
    assert!(console.booted);
}

#[test]
fn progress_reports_phases_and_words() {
    let rom = make_rom(256);
    let (tx, rx) = mpsc::channel();
    MultibootSession::new(FakeConsole::new(), RomImage::from_bytes(&rom).unwrap())
        .run_with_progress(&tx)
        .unwrap();
    drop(tx);

    let updates: Vec<TransferProgress> = rx.iter().collect();
    assert_eq!(updates.first(), Some(&TransferProgress::phase("wait-ready")));
    assert!(updates.contains(&TransferProgress::phase("transfer-rom")));
    assert!(updates.contains(&TransferProgress::words(16, 16)));
    assert_eq!(updates.last(), Some(&TransferProgress::Completed));
}

#[test]
fn progress_reports_failure() {
    let rom = make_rom(256);
    let (tx, rx) = mpsc::channel();
    let console = FakeConsole {
        checksum_override: Some(0),
        ..FakeConsole::new()
    };
    let result = MultibootSession::new(console, RomImage::from_bytes(&rom).unwrap())
        .run_with_progress(&tx);
    drop(tx);

    assert!(result.is_err());
    let last = rx.iter().last().unwrap();
    assert!(matches!(last, TransferProgress::Failed { .. }));
}
