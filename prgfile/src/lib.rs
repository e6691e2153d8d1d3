//! Reading and writing of C64 program files (`.prg`).
//!
//! A `.prg` file consists of a 16-bit little-endian load address followed by
//! the raw program image. [`Program`](struct.Program.html) is the in-memory
//! form of that file; [`basic_stub`](fn.basic_stub.html) builds the BASIC
//! one-liner (`10 SYS <addr>`) that makes a program runnable with `RUN`.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use util::Endian;

/// The address C64 BASIC programs load to.
pub const DEFAULT_LOAD_ADDRESS: u16 = 0x0801;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    load_address: u16,
    bytes: Vec<u8>,
}

impl Program {
    pub fn from(load_address: u16, bytes: Vec<u8>) -> Program {
        Program {
            load_address,
            bytes,
        }
    }

    pub fn load_address(&self) -> u16 {
        self.load_address
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    /// The file image: load address prefix followed by the program bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + 2);
        out.push(self.load_address as u8);
        out.push((self.load_address >> 8) as u8);
        out.extend_from_slice(&self.bytes[..]);
        out
    }
}

/// Builds the BASIC stub `10 SYS <addr>` for a program starting right after
/// the stub itself at the default load address.
///
/// Returns the stub bytes and the address of the first instruction after it.
/// The stub size depends on the decimal digit count of the `SYS` target, so
/// the target is found by probing each possible digit count.
pub fn basic_stub() -> (Vec<u8>, u16) {
    let base = DEFAULT_LOAD_ADDRESS as u32;

    let mut digits = 1u32;
    loop {
        // link(2) + line number(2) + SYS token(1) + digits + NUL(1) + end link(2)
        let target = base + 8 + digits;
        if target.to_string().len() as u32 == digits {
            let text = target.to_string();
            let next_line = base + 6 + digits;

            let mut stub = Vec::with_capacity(8 + digits as usize);
            stub.push(next_line as u8);
            stub.push((next_line >> 8) as u8);
            stub.push(0x0A);
            stub.push(0x00);
            stub.push(0x9E); // SYS
            stub.extend_from_slice(text.as_bytes());
            stub.push(0x00);
            stub.push(0x00);
            stub.push(0x00);
            return (stub, target as u16);
        }
        digits += 1;
    }
}

pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Program> {
    let load_address = reader.read_u16::<Endian>()?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    Ok(Program::from(load_address, bytes))
}

pub fn write<W: Write>(writer: &mut W, program: &Program) -> std::io::Result<()> {
    writer.write_u16::<Endian>(program.load_address)?;
    writer.write_all(&program.bytes[..])?;
    Ok(())
}

pub trait ReadPrgExt: Read + Sized {
    fn read_prg(&mut self) -> std::io::Result<Program> {
        read(self)
    }
}

impl<R: Read + Sized> ReadPrgExt for R {}

pub trait WritePrgExt: Write + Sized {
    fn write_prg(&mut self, program: &Program) -> std::io::Result<()> {
        write(self, program)
    }
}

impl<W: Write + Sized> WritePrgExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> std::io::Result<Program> {
    BufReader::new(File::open(path)?).read_prg()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> std::io::Result<()> {
    BufWriter::new(File::create(path)?).write_prg(program)
}

#[cfg(test)]
mod test;
