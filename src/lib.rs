//! Instruction-set knowledge for the MOS 6502.
//!
//! This crate owns the data every other part of the toolchain shares: the
//! [`Mnemonic`](enum.Mnemonic.html) and [`AddrMode`](enum.AddrMode.html)
//! enums, the opcode/cycle matrix in [`opcodes`](opcodes/index.html), and a
//! small [`disasm`](disasm/index.html) module that walks the matrix in
//! reverse to turn byte images back into listings.

pub mod disasm;
mod enums;
pub mod opcodes;

pub use enums::{AddrMode, Mnemonic, ADDR_MODE_COUNT, MNEMONIC_COUNT};

#[cfg(test)]
mod test;
