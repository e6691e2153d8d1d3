use num_derive::{FromPrimitive, ToPrimitive};
use util::FromName;
use util_derive::FromName;

/// The 56 official MOS 6502 mnemonics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, ToPrimitive, FromPrimitive, FromName)]
#[rustfmt::skip]
pub enum Mnemonic {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
}

pub const MNEMONIC_COUNT: usize = 56;

/// The 13 operand-interpretation patterns of the 6502.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, ToPrimitive, FromPrimitive)]
pub enum AddrMode {
    Implied,
    Immediate,
    Accumulator,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

pub const ADDR_MODE_COUNT: usize = 13;

impl AddrMode {
    /// Number of operand bytes following the opcode byte.
    pub fn operand_bytes(self) -> usize {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 1,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect => 2,
        }
    }

    /// The absolute-width counterpart of a zero-page mode.
    pub fn widened(self) -> Option<AddrMode> {
        match self {
            AddrMode::ZeroPage => Some(AddrMode::Absolute),
            AddrMode::ZeroPageX => Some(AddrMode::AbsoluteX),
            AddrMode::ZeroPageY => Some(AddrMode::AbsoluteY),
            _ => None,
        }
    }

    /// The zero-page counterpart of an absolute-width mode.
    pub fn narrowed(self) -> Option<AddrMode> {
        match self {
            AddrMode::Absolute => Some(AddrMode::ZeroPage),
            AddrMode::AbsoluteX => Some(AddrMode::ZeroPageX),
            AddrMode::AbsoluteY => Some(AddrMode::ZeroPageY),
            _ => None,
        }
    }
}

macro_rules! impl_enum_display {
    ($e:ty) => {
        impl std::fmt::Display for $e {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", format!("{:?}", self).to_lowercase())
            }
        }
    };
}

impl_enum_display!(Mnemonic);
impl_enum_display!(AddrMode);

impl Mnemonic {
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Mnemonic::BCC
                | Mnemonic::BCS
                | Mnemonic::BEQ
                | Mnemonic::BMI
                | Mnemonic::BNE
                | Mnemonic::BPL
                | Mnemonic::BVC
                | Mnemonic::BVS
        )
    }
}
