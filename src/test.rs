use crate::disasm::{disassemble, DisasmOptions};
use crate::opcodes::{decode, encoding};
use crate::{AddrMode, Mnemonic, MNEMONIC_COUNT};
use num_traits::FromPrimitive;
use util::FromName;

#[test]
fn encode_spot_checks() {
    assert_eq!(encoding(Mnemonic::LDA, AddrMode::Immediate).unwrap().opcode, 0xA9);
    assert_eq!(encoding(Mnemonic::LDA, AddrMode::ZeroPage).unwrap().opcode, 0xA5);
    assert_eq!(encoding(Mnemonic::STA, AddrMode::Absolute).unwrap().opcode, 0x8D);
    assert_eq!(encoding(Mnemonic::JMP, AddrMode::Absolute).unwrap().opcode, 0x4C);
    assert_eq!(encoding(Mnemonic::JMP, AddrMode::Indirect).unwrap().opcode, 0x6C);
    assert_eq!(encoding(Mnemonic::JSR, AddrMode::Absolute).unwrap().opcode, 0x20);
    assert_eq!(encoding(Mnemonic::BNE, AddrMode::Relative).unwrap().opcode, 0xD0);
    assert_eq!(encoding(Mnemonic::RTS, AddrMode::Implied).unwrap().opcode, 0x60);
    assert_eq!(encoding(Mnemonic::ASL, AddrMode::Accumulator).unwrap().opcode, 0x0A);
}

#[test]
fn unsupported_combinations() {
    assert!(encoding(Mnemonic::JSR, AddrMode::Indirect).is_none());
    assert!(encoding(Mnemonic::STA, AddrMode::Immediate).is_none());
    assert!(encoding(Mnemonic::STX, AddrMode::AbsoluteY).is_none());
    assert!(encoding(Mnemonic::BNE, AddrMode::Absolute).is_none());
    assert!(encoding(Mnemonic::INC, AddrMode::Accumulator).is_none());
}

#[test]
fn branches_are_relative_only() {
    for index in 0..MNEMONIC_COUNT {
        let mnemonic = Mnemonic::from_usize(index).unwrap();
        if mnemonic.is_branch() {
            assert!(mnemonic.supports(AddrMode::Relative));
            assert!(!mnemonic.supports(AddrMode::Absolute));
            assert!(!mnemonic.supports(AddrMode::ZeroPage));
        }
    }
}

#[test]
fn decode_inverts_encode() {
    for index in 0..MNEMONIC_COUNT {
        let mnemonic = Mnemonic::from_usize(index).unwrap();
        for mode_index in 0..crate::ADDR_MODE_COUNT {
            let mode = AddrMode::from_usize(mode_index).unwrap();
            if let Some(enc) = encoding(mnemonic, mode) {
                assert_eq!(decode(enc.opcode), Some((mnemonic, mode)));
            }
        }
    }
}

#[test]
fn mnemonic_from_name_is_case_insensitive() {
    assert_eq!(Mnemonic::from_name("LDA"), Ok(Mnemonic::LDA));
    assert_eq!(Mnemonic::from_name("tya"), Ok(Mnemonic::TYA));
    assert_eq!(Mnemonic::from_name("Jmp"), Ok(Mnemonic::JMP));
    assert!(Mnemonic::from_name("LAX").is_err());
    assert!(Mnemonic::from_name("ld").is_err());
}

#[test]
fn disassemble_simple() {
    let image = [0xA9, 0x41, 0x8D, 0x20, 0xD0, 0x60];
    let lines = disassemble(&image, 0x0801, None, &DisasmOptions::default());

    assert_eq!(
        lines,
        vec![
            "0801: a9 41     lda #$41",
            "0803: 8d 20 d0  sta $d020",
            "0806: 60        rts",
        ]
    );
}

#[test]
fn disassemble_branch_target() {
    // loop: dex / bne loop
    let image = [0xCA, 0xD0, 0xFD];
    let lines = disassemble(&image, 0x0801, None, &DisasmOptions::default());

    assert_eq!(
        lines,
        vec!["0801: ca        dex", "0802: d0 fd     bne $0801"]
    );
}

#[test]
fn disassemble_respects_predicate() {
    // A valid LDA opcode that debug info marks as data.
    let image = [0xA9, 0x41];
    let pred = |_offset: usize| false;
    let lines = disassemble(&image, 0x1000, Some(&pred), &DisasmOptions::default());

    assert_eq!(
        lines,
        vec!["1000: a9        !byte $a9", "1001: 41        !byte $41"]
    );
}

#[test]
fn disassemble_unknown_opcode_as_data() {
    let image = [0xFF, 0xEA];
    let lines = disassemble(&image, 0x2000, None, &DisasmOptions::default());

    assert_eq!(
        lines,
        vec!["2000: ff        !byte $ff", "2001: ea        nop"]
    );
}

#[test]
fn disassemble_with_cycles() {
    let image = [0xEA];
    let options = DisasmOptions {
        show_cycles: true,
        ..DisasmOptions::default()
    };
    let lines = disassemble(&image, 0xC000, None, &options);

    assert_eq!(lines, vec!["c000: ea        nop          ; 2"]);
}

#[test]
fn disassemble_labels() {
    let image = [0xCA, 0xD0, 0xFD];
    let mut options = DisasmOptions::default();
    options.show_labels = true;
    options.labels.insert(0x0801, "loop".to_string());

    let lines = disassemble(&image, 0x0801, None, &options);

    assert_eq!(
        lines,
        vec!["loop:", "0801: ca        dex", "0802: d0 fd     bne loop"]
    );
}
