//! Debug information: emitted bytes back to source locations, plus the
//! final symbol and constant tables.
//!
//! The builder collects one record per emitted run of bytes during a pass
//! and is cleared when the next pass starts, so the snapshot built after the
//! final pass describes exactly the returned program image.

use crate::scope::{Symbol, SymbolTable};
use crate::source::{Loc, SourceSet};
use crate::value::Value;
use byteorder::WriteBytesExt;
use std::collections::BTreeMap;
use std::io::{self, Write};
use util::Endian;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ByteRole {
    InstructionStart,
    InstructionContinuation,
    Data,
}

/// A `{ file, line }` source reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub file: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SymbolInfo {
    pub name: String,
    pub address: u16,
    pub size: u16,
    pub segment: String,
    pub file: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantInfo {
    pub name: String,
    pub value: i64,
    pub file: String,
    pub line: u32,
}

struct Record {
    segment: usize,
    offset: usize,
    len: usize,
    instruction: bool,
    /// Producing locations, innermost (in-macro) first, then call sites.
    locs: Vec<Loc>,
}

#[derive(Default)]
pub(crate) struct DebugInfoBuilder {
    records: Vec<Record>,
}

pub(crate) struct SegmentInfo {
    pub name: String,
    pub start: u16,
    pub len: usize,
}

impl DebugInfoBuilder {
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn record(
        &mut self,
        segment: usize,
        offset: usize,
        len: usize,
        instruction: bool,
        locs: Vec<Loc>,
    ) {
        self.records.push(Record {
            segment,
            offset,
            len,
            instruction,
            locs,
        });
    }

    pub fn finish(
        &self,
        sources: &SourceSet,
        symtab: &SymbolTable,
        segments: &[SegmentInfo],
    ) -> DebugInfo {
        // Image offsets of each segment in declaration order.
        let mut bases = Vec::with_capacity(segments.len());
        let mut total = 0usize;
        for segment in segments {
            bases.push(total);
            total += segment.len;
        }

        let mut roles = vec![ByteRole::Data; total];
        let mut pc_to_source: BTreeMap<u16, Vec<SourcePos>> = BTreeMap::new();

        for record in &self.records {
            let image = bases[record.segment] + record.offset;
            if record.instruction {
                roles[image] = ByteRole::InstructionStart;
                for role in roles.iter_mut().skip(image + 1).take(record.len - 1) {
                    *role = ByteRole::InstructionContinuation;
                }
            }

            let address = segments[record.segment].start.wrapping_add(record.offset as u16);
            let positions: Vec<SourcePos> = record
                .locs
                .iter()
                .map(|loc| SourcePos {
                    file: sources.name(loc.file).to_owned(),
                    line: loc.line,
                })
                .collect();
            let entry = pc_to_source.entry(address).or_default();
            for position in positions {
                if !entry.contains(&position) {
                    entry.push(position);
                }
            }
        }

        let mut symbols = Vec::new();
        let mut constants = Vec::new();
        symtab.for_each_symbol(|name, symbol| match symbol {
            Symbol::Label(label) => {
                if let Some(value) = label.cur {
                    symbols.push(SymbolInfo {
                        name,
                        address: value as u16,
                        size: 0,
                        segment: segments
                            .get(label.segment)
                            .map(|s| s.name.clone())
                            .unwrap_or_default(),
                        file: sources.name(label.loc.file).to_owned(),
                        line: label.loc.line,
                    });
                }
            }
            Symbol::Constant(constant) => {
                if let Some(Value::Int(value)) = &constant.cur {
                    constants.push(ConstantInfo {
                        name,
                        value: *value,
                        file: sources.name(constant.loc.file).to_owned(),
                        line: constant.loc.line,
                    });
                }
            }
            Symbol::Macro(_) => {}
        });

        symbols.sort_by(|a, b| (a.address, &a.name).cmp(&(b.address, &b.name)));
        constants.sort_by(|a, b| (&a.file, a.line, &a.name).cmp(&(&b.file, b.line, &b.name)));

        // A label covers the bytes up to the next label in its segment.
        for segment in segments {
            let ends: Vec<(usize, u16)> = symbols
                .iter()
                .enumerate()
                .filter(|(_, s)| s.segment == segment.name)
                .map(|(i, s)| (i, s.address))
                .collect();
            for window in 0..ends.len() {
                let (index, address) = ends[window];
                let end = ends
                    .get(window + 1)
                    .map(|&(_, next)| next)
                    .unwrap_or_else(|| segment.start.wrapping_add(segment.len as u16));
                symbols[index].size = end.wrapping_sub(address);
            }
        }

        DebugInfo {
            pc_to_source,
            symbols,
            constants,
            roles,
        }
    }
}

pub struct DebugInfo {
    /// Address to producing source lines; several entries when macro
    /// expansion collapses distinct lines onto one address (the in-macro
    /// line first).
    pub pc_to_source: BTreeMap<u16, Vec<SourcePos>>,
    pub symbols: Vec<SymbolInfo>,
    pub constants: Vec<ConstantInfo>,
    roles: Vec<ByteRole>,
}

impl DebugInfo {
    /// Whether the byte at `offset` into the program image starts an
    /// instruction.
    pub fn is_instruction(&self, offset: usize) -> bool {
        matches!(self.roles.get(offset), Some(ByteRole::InstructionStart))
    }

    pub fn roles(&self) -> &[ByteRole] {
        &self.roles
    }

    /// Label map for the disassembler.
    pub fn label_addresses(&self) -> BTreeMap<u16, String> {
        self.symbols
            .iter()
            .map(|s| (s.address, s.name.clone()))
            .collect()
    }

    /// Stable little-endian serialization with length-prefixed strings.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        fn write_str<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
            writer.write_u32::<Endian>(s.len() as u32)?;
            writer.write_all(s.as_bytes())
        }

        writer.write_all(b"C64DBG\0\x01")?;

        writer.write_u32::<Endian>(self.pc_to_source.len() as u32)?;
        for (address, positions) in &self.pc_to_source {
            writer.write_u16::<Endian>(*address)?;
            writer.write_u16::<Endian>(positions.len() as u16)?;
            for position in positions {
                write_str(writer, &position.file)?;
                writer.write_u32::<Endian>(position.line)?;
            }
        }

        writer.write_u32::<Endian>(self.symbols.len() as u32)?;
        for symbol in &self.symbols {
            write_str(writer, &symbol.name)?;
            writer.write_u16::<Endian>(symbol.address)?;
            writer.write_u16::<Endian>(symbol.size)?;
            write_str(writer, &symbol.segment)?;
            write_str(writer, &symbol.file)?;
            writer.write_u32::<Endian>(symbol.line)?;
        }

        writer.write_u32::<Endian>(self.constants.len() as u32)?;
        for constant in &self.constants {
            write_str(writer, &constant.name)?;
            writer.write_i64::<Endian>(constant.value)?;
            write_str(writer, &constant.file)?;
            writer.write_u32::<Endian>(constant.line)?;
        }

        writer.write_u32::<Endian>(self.roles.len() as u32)?;
        for role in &self.roles {
            writer.write_u8(match role {
                ByteRole::InstructionStart => 0,
                ByteRole::InstructionContinuation => 1,
                ByteRole::Data => 2,
            })?;
        }

        Ok(())
    }
}
