//! Textual disassembly of 6502 byte images.
//!
//! Decoding walks the image front to back. At each offset the byte is either
//! decoded through the opcode table or, when it is no known opcode (or an
//! `is_instruction` predicate says the offset holds data), printed as a
//! `!byte` line. The walk keeps no state other than the current offset.

use crate::enums::AddrMode;
use crate::opcodes::decode;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct DisasmOptions {
    pub show_cycles: bool,
    pub show_labels: bool,
    /// Address-to-name map consulted when `show_labels` is set, typically
    /// sourced from assembler debug info.
    pub labels: BTreeMap<u16, String>,
}

/// Disassembles `image` as if loaded at `origin`.
///
/// `is_instruction` marks which offsets hold instruction starts; when absent
/// every decodable offset is treated as one.
pub fn disassemble(
    image: &[u8],
    origin: u16,
    is_instruction: Option<&dyn Fn(usize) -> bool>,
    options: &DisasmOptions,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut offset = 0usize;

    while offset < image.len() {
        let addr = origin.wrapping_add(offset as u16);

        if options.show_labels {
            if let Some(name) = options.labels.get(&addr) {
                lines.push(format!("{}:", name));
            }
        }

        let decodable = match is_instruction {
            Some(pred) => pred(offset),
            None => true,
        };

        let decoded = if decodable { decode(image[offset]) } else { None };

        match decoded {
            Some((mnemonic, mode)) if offset + mode.operand_bytes() < image.len() => {
                let size = 1 + mode.operand_bytes();
                let bytes = &image[offset..offset + size];
                let operand = format_operand(mode, bytes, addr, options);

                let text = if operand.is_empty() {
                    mnemonic.to_string()
                } else {
                    format!("{} {}", mnemonic, operand)
                };

                lines.push(finish_line(addr, bytes, &text, mnemonic, mode, options));
                offset += size;
            }
            _ => {
                let bytes = &image[offset..offset + 1];
                let text = format!("!byte ${:02x}", image[offset]);
                lines.push(format!("{:04x}: {:<8}  {}", addr, hex_bytes(bytes), text));
                offset += 1;
            }
        }
    }

    lines
}

fn finish_line(
    addr: u16,
    bytes: &[u8],
    text: &str,
    mnemonic: crate::Mnemonic,
    mode: AddrMode,
    options: &DisasmOptions,
) -> String {
    let mut line = format!("{:04x}: {:<8}  {}", addr, hex_bytes(bytes), text);
    if options.show_cycles {
        if let Some(encoding) = crate::opcodes::encoding(mnemonic, mode) {
            while line.len() < 28 {
                line.push(' ');
            }
            line.push_str(&format!(" ; {}", encoding.cycles));
        }
    }
    line
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_operand(mode: AddrMode, bytes: &[u8], addr: u16, options: &DisasmOptions) -> String {
    let byte = || bytes[1];
    let word = || u16::from(bytes[1]) | (u16::from(bytes[2]) << 8);

    let target = |value: u16| -> String {
        if options.show_labels {
            if let Some(name) = options.labels.get(&value) {
                return name.clone();
            }
        }
        format!("${:04x}", value)
    };

    match mode {
        AddrMode::Implied | AddrMode::Accumulator => String::new(),
        AddrMode::Immediate => format!("#${:02x}", byte()),
        AddrMode::ZeroPage => format!("${:02x}", byte()),
        AddrMode::ZeroPageX => format!("${:02x},x", byte()),
        AddrMode::ZeroPageY => format!("${:02x},y", byte()),
        AddrMode::Absolute => target(word()),
        AddrMode::AbsoluteX => format!("{},x", target(word())),
        AddrMode::AbsoluteY => format!("{},y", target(word())),
        AddrMode::Indirect => format!("(${:04x})", word()),
        AddrMode::IndirectX => format!("(${:02x},x)", byte()),
        AddrMode::IndirectY => format!("(${:02x}),y", byte()),
        AddrMode::Relative => {
            let dest = addr.wrapping_add(2).wrapping_add(byte() as i8 as u16);
            target(dest)
        }
    }
}
