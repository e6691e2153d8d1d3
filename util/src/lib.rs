//! Helpers shared by the assembler workspace.

use std::{error::Error, fmt};

/// Byte order of everything this toolchain reads and writes: the 6502 is
/// little-endian, and the `.prg` and debug-info formats follow it.
pub type Endian = byteorder::LittleEndian;

/// A name that matches no variant of an instruction-set enum.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NoSuchVariant {
    pub token: String,
    pub expected: &'static str,
}

impl fmt::Display for NoSuchVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" is not a {}.", &self.token, self.expected)
    }
}

impl Error for NoSuchVariant {}

/// Name-to-variant parsing for the instruction-set enums. Matching is
/// case-insensitive, since assembly source writes mnemonics in either case.
///
/// Derive with `util_derive::FromName`, which also supplies a `FromStr`
/// impl backed by the same lookup.
pub trait FromName: Sized {
    fn from_name(name: &str) -> Result<Self, NoSuchVariant>;
}
