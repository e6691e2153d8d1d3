//! The opcode matrix for the official 6502 instruction set.
//!
//! Every `(mnemonic, addressing mode)` pair the CPU supports maps to its
//! opcode byte and a cycle-count string. Cycle strings carry a trailing `+`
//! when the instruction takes extra cycles on a taken branch or a page
//! crossing.

use crate::enums::{AddrMode, Mnemonic};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Encoding {
    pub opcode: u8,
    pub cycles: &'static str,
}

use AddrMode::*;
use Mnemonic::*;

#[rustfmt::skip]
static TABLE: &[(Mnemonic, AddrMode, u8, &str)] = &[
    (ADC, Immediate,   0x69, "2"),
    (ADC, ZeroPage,    0x65, "3"),
    (ADC, ZeroPageX,   0x75, "4"),
    (ADC, Absolute,    0x6D, "4"),
    (ADC, AbsoluteX,   0x7D, "4+"),
    (ADC, AbsoluteY,   0x79, "4+"),
    (ADC, IndirectX,   0x61, "6"),
    (ADC, IndirectY,   0x71, "5+"),
    (AND, Immediate,   0x29, "2"),
    (AND, ZeroPage,    0x25, "3"),
    (AND, ZeroPageX,   0x35, "4"),
    (AND, Absolute,    0x2D, "4"),
    (AND, AbsoluteX,   0x3D, "4+"),
    (AND, AbsoluteY,   0x39, "4+"),
    (AND, IndirectX,   0x21, "6"),
    (AND, IndirectY,   0x31, "5+"),
    (ASL, Accumulator, 0x0A, "2"),
    (ASL, ZeroPage,    0x06, "5"),
    (ASL, ZeroPageX,   0x16, "6"),
    (ASL, Absolute,    0x0E, "6"),
    (ASL, AbsoluteX,   0x1E, "7"),
    (BCC, Relative,    0x90, "2+"),
    (BCS, Relative,    0xB0, "2+"),
    (BEQ, Relative,    0xF0, "2+"),
    (BIT, ZeroPage,    0x24, "3"),
    (BIT, Absolute,    0x2C, "4"),
    (BMI, Relative,    0x30, "2+"),
    (BNE, Relative,    0xD0, "2+"),
    (BPL, Relative,    0x10, "2+"),
    (BRK, Implied,     0x00, "7"),
    (BVC, Relative,    0x50, "2+"),
    (BVS, Relative,    0x70, "2+"),
    (CLC, Implied,     0x18, "2"),
    (CLD, Implied,     0xD8, "2"),
    (CLI, Implied,     0x58, "2"),
    (CLV, Implied,     0xB8, "2"),
    (CMP, Immediate,   0xC9, "2"),
    (CMP, ZeroPage,    0xC5, "3"),
    (CMP, ZeroPageX,   0xD5, "4"),
    (CMP, Absolute,    0xCD, "4"),
    (CMP, AbsoluteX,   0xDD, "4+"),
    (CMP, AbsoluteY,   0xD9, "4+"),
    (CMP, IndirectX,   0xC1, "6"),
    (CMP, IndirectY,   0xD1, "5+"),
    (CPX, Immediate,   0xE0, "2"),
    (CPX, ZeroPage,    0xE4, "3"),
    (CPX, Absolute,    0xEC, "4"),
    (CPY, Immediate,   0xC0, "2"),
    (CPY, ZeroPage,    0xC4, "3"),
    (CPY, Absolute,    0xCC, "4"),
    (DEC, ZeroPage,    0xC6, "5"),
    (DEC, ZeroPageX,   0xD6, "6"),
    (DEC, Absolute,    0xCE, "6"),
    (DEC, AbsoluteX,   0xDE, "7"),
    (DEX, Implied,     0xCA, "2"),
    (DEY, Implied,     0x88, "2"),
    (EOR, Immediate,   0x49, "2"),
    (EOR, ZeroPage,    0x45, "3"),
    (EOR, ZeroPageX,   0x55, "4"),
    (EOR, Absolute,    0x4D, "4"),
    (EOR, AbsoluteX,   0x5D, "4+"),
    (EOR, AbsoluteY,   0x59, "4+"),
    (EOR, IndirectX,   0x41, "6"),
    (EOR, IndirectY,   0x51, "5+"),
    (INC, ZeroPage,    0xE6, "5"),
    (INC, ZeroPageX,   0xF6, "6"),
    (INC, Absolute,    0xEE, "6"),
    (INC, AbsoluteX,   0xFE, "7"),
    (INX, Implied,     0xE8, "2"),
    (INY, Implied,     0xC8, "2"),
    (JMP, Absolute,    0x4C, "3"),
    (JMP, Indirect,    0x6C, "5"),
    (JSR, Absolute,    0x20, "6"),
    (LDA, Immediate,   0xA9, "2"),
    (LDA, ZeroPage,    0xA5, "3"),
    (LDA, ZeroPageX,   0xB5, "4"),
    (LDA, Absolute,    0xAD, "4"),
    (LDA, AbsoluteX,   0xBD, "4+"),
    (LDA, AbsoluteY,   0xB9, "4+"),
    (LDA, IndirectX,   0xA1, "6"),
    (LDA, IndirectY,   0xB1, "5+"),
    (LDX, Immediate,   0xA2, "2"),
    (LDX, ZeroPage,    0xA6, "3"),
    (LDX, ZeroPageY,   0xB6, "4"),
    (LDX, Absolute,    0xAE, "4"),
    (LDX, AbsoluteY,   0xBE, "4+"),
    (LDY, Immediate,   0xA0, "2"),
    (LDY, ZeroPage,    0xA4, "3"),
    (LDY, ZeroPageX,   0xB4, "4"),
    (LDY, Absolute,    0xAC, "4"),
    (LDY, AbsoluteX,   0xBC, "4+"),
    (LSR, Accumulator, 0x4A, "2"),
    (LSR, ZeroPage,    0x46, "5"),
    (LSR, ZeroPageX,   0x56, "6"),
    (LSR, Absolute,    0x4E, "6"),
    (LSR, AbsoluteX,   0x5E, "7"),
    (NOP, Implied,     0xEA, "2"),
    (ORA, Immediate,   0x09, "2"),
    (ORA, ZeroPage,    0x05, "3"),
    (ORA, ZeroPageX,   0x15, "4"),
    (ORA, Absolute,    0x0D, "4"),
    (ORA, AbsoluteX,   0x1D, "4+"),
    (ORA, AbsoluteY,   0x19, "4+"),
    (ORA, IndirectX,   0x01, "6"),
    (ORA, IndirectY,   0x11, "5+"),
    (PHA, Implied,     0x48, "3"),
    (PHP, Implied,     0x08, "3"),
    (PLA, Implied,     0x68, "4"),
    (PLP, Implied,     0x28, "4"),
    (ROL, Accumulator, 0x2A, "2"),
    (ROL, ZeroPage,    0x26, "5"),
    (ROL, ZeroPageX,   0x36, "6"),
    (ROL, Absolute,    0x2E, "6"),
    (ROL, AbsoluteX,   0x3E, "7"),
    (ROR, Accumulator, 0x6A, "2"),
    (ROR, ZeroPage,    0x66, "5"),
    (ROR, ZeroPageX,   0x76, "6"),
    (ROR, Absolute,    0x6E, "6"),
    (ROR, AbsoluteX,   0x7E, "7"),
    (RTI, Implied,     0x40, "6"),
    (RTS, Implied,     0x60, "6"),
    (SBC, Immediate,   0xE9, "2"),
    (SBC, ZeroPage,    0xE5, "3"),
    (SBC, ZeroPageX,   0xF5, "4"),
    (SBC, Absolute,    0xED, "4"),
    (SBC, AbsoluteX,   0xFD, "4+"),
    (SBC, AbsoluteY,   0xF9, "4+"),
    (SBC, IndirectX,   0xE1, "6"),
    (SBC, IndirectY,   0xF1, "5+"),
    (SEC, Implied,     0x38, "2"),
    (SED, Implied,     0xF8, "2"),
    (SEI, Implied,     0x78, "2"),
    (STA, ZeroPage,    0x85, "3"),
    (STA, ZeroPageX,   0x95, "4"),
    (STA, Absolute,    0x8D, "4"),
    (STA, AbsoluteX,   0x9D, "5"),
    (STA, AbsoluteY,   0x99, "5"),
    (STA, IndirectX,   0x81, "6"),
    (STA, IndirectY,   0x91, "6"),
    (STX, ZeroPage,    0x86, "3"),
    (STX, ZeroPageY,   0x96, "4"),
    (STX, Absolute,    0x8E, "4"),
    (STY, ZeroPage,    0x84, "3"),
    (STY, ZeroPageX,   0x94, "4"),
    (STY, Absolute,    0x8C, "4"),
    (TAX, Implied,     0xAA, "2"),
    (TAY, Implied,     0xA8, "2"),
    (TSX, Implied,     0xBA, "2"),
    (TXA, Implied,     0x8A, "2"),
    (TXS, Implied,     0x9A, "2"),
    (TYA, Implied,     0x98, "2"),
];

static ENCODE: Lazy<HashMap<(Mnemonic, AddrMode), Encoding>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(TABLE.len());
    for &(mnemonic, mode, opcode, cycles) in TABLE {
        let old = map.insert((mnemonic, mode), Encoding { opcode, cycles });
        debug_assert!(old.is_none());
    }
    map
});

static DECODE: Lazy<[Option<(Mnemonic, AddrMode)>; 256]> = Lazy::new(|| {
    let mut map = [None; 256];
    for &(mnemonic, mode, opcode, _) in TABLE {
        debug_assert!(map[opcode as usize].is_none());
        map[opcode as usize] = Some((mnemonic, mode));
    }
    map
});

/// Looks up the encoding for a mnemonic in a given addressing mode, or
/// `None` for an unsupported combination.
pub fn encoding(mnemonic: Mnemonic, mode: AddrMode) -> Option<Encoding> {
    ENCODE.get(&(mnemonic, mode)).copied()
}

/// Reverse lookup used by the disassembler.
pub fn decode(opcode: u8) -> Option<(Mnemonic, AddrMode)> {
    DECODE[opcode as usize]
}

impl Mnemonic {
    pub fn supports(self, mode: AddrMode) -> bool {
        ENCODE.contains_key(&(self, mode))
    }
}
