//! Byte emission: addressing-mode selection and encoding for instructions,
//! plus the data directives.
//!
//! Mode widths must stabilize across passes, so zero-page narrowing is
//! sticky in the wide direction: an operand that ever needed (or could not
//! rule out needing) an absolute encoding keeps it in later passes.

use crate::asm::Assembler;
use crate::ast::{Expr, ExprNode, Operand};
use crate::eval::{Evaluated, IntVal};
use crate::petscii;
use crate::source::Loc;
use crate::value::Value;
use byteorder::ByteOrder;
use mos6502::opcodes::encoding;
use mos6502::{AddrMode, Mnemonic};
use util::Endian;

impl<'r> Assembler<'r> {
    pub(crate) fn emit_instruction(&mut self, mnemonic: Mnemonic, operand: &Operand, loc: &Loc) {
        match operand {
            Operand::None => {
                let mode = if mnemonic.supports(AddrMode::Implied) {
                    AddrMode::Implied
                } else if mnemonic.supports(AddrMode::Accumulator) {
                    AddrMode::Accumulator
                } else {
                    self.illegal_mode(mnemonic, loc);
                    return;
                };
                self.emit_op(mnemonic, mode, &[], loc);
            }
            Operand::Immediate(expr) => {
                if !mnemonic.supports(AddrMode::Immediate) {
                    self.illegal_mode(mnemonic, loc);
                    return;
                }
                let byte = self.byte_operand(expr, -128, 255);
                self.emit_op(mnemonic, AddrMode::Immediate, &[byte], loc);
            }
            Operand::Bare(expr) => {
                if mnemonic.is_branch() {
                    self.emit_branch(mnemonic, expr, loc);
                } else if is_accumulator(expr) && mnemonic.supports(AddrMode::Accumulator) {
                    self.emit_op(mnemonic, AddrMode::Accumulator, &[], loc);
                } else {
                    self.emit_zp_abs(mnemonic, AddrMode::ZeroPage, AddrMode::Absolute, expr, loc);
                }
            }
            Operand::IndexedX(expr) => {
                self.emit_zp_abs(mnemonic, AddrMode::ZeroPageX, AddrMode::AbsoluteX, expr, loc)
            }
            Operand::IndexedY(expr) => {
                self.emit_zp_abs(mnemonic, AddrMode::ZeroPageY, AddrMode::AbsoluteY, expr, loc)
            }
            Operand::Indirect(expr) => {
                if !mnemonic.supports(AddrMode::Indirect) {
                    self.illegal_mode(mnemonic, loc);
                    return;
                }
                let word = self.word_operand(expr);
                let mut bytes = [0u8; 2];
                Endian::write_u16(&mut bytes, word);
                self.emit_op(mnemonic, AddrMode::Indirect, &bytes, loc);
            }
            Operand::IndirectX(expr) => {
                if !mnemonic.supports(AddrMode::IndirectX) {
                    self.illegal_mode(mnemonic, loc);
                    return;
                }
                let byte = self.byte_operand(expr, 0, 255);
                self.emit_op(mnemonic, AddrMode::IndirectX, &[byte], loc);
            }
            Operand::IndirectY(expr) => {
                if !mnemonic.supports(AddrMode::IndirectY) {
                    self.illegal_mode(mnemonic, loc);
                    return;
                }
                let byte = self.byte_operand(expr, 0, 255);
                self.emit_op(mnemonic, AddrMode::IndirectY, &[byte], loc);
            }
        }
    }

    fn emit_op(&mut self, mnemonic: Mnemonic, mode: AddrMode, operand: &[u8], loc: &Loc) {
        // The mode was validated against the opcode table by the caller.
        let encoding = encoding(mnemonic, mode).unwrap();
        let mut bytes = Vec::with_capacity(1 + operand.len());
        bytes.push(encoding.opcode);
        bytes.extend_from_slice(operand);
        self.note_width(bytes.len() as u8);
        self.push_bytes(loc, true, &bytes);
    }

    fn illegal_mode(&mut self, mnemonic: Mnemonic, loc: &Loc) {
        self.error(loc, format!("Illegal addressing mode for \"{}\"", mnemonic));
        self.note_width(0);
    }

    /// Chooses between the zero-page and absolute flavor of an indexing
    /// shape, preferring zero page when the operand provably fits a byte.
    fn emit_zp_abs(
        &mut self,
        mnemonic: Mnemonic,
        narrow: AddrMode,
        wide: AddrMode,
        expr: &ExprNode,
        loc: &Loc,
    ) {
        let has_narrow = mnemonic.supports(narrow);
        let has_wide = mnemonic.supports(wide);
        if !has_narrow && !has_wide {
            self.illegal_mode(mnemonic, loc);
            return;
        }

        let value = self.eval_int(expr);
        let use_narrow = if !has_wide {
            true
        } else if !has_narrow {
            false
        } else {
            match value {
                Some(IntVal::Known(v)) => (0..=255).contains(&v) && self.prev_width() != Some(3),
                _ => false,
            }
        };

        if use_narrow {
            let v = match value {
                Some(IntVal::Known(v)) => {
                    if !(0..=255).contains(&v) {
                        self.error(
                            &expr.loc,
                            format!("Operand {} out of zero-page range [0, 255]", v),
                        );
                    }
                    v
                }
                _ => 0,
            };
            self.emit_op(mnemonic, narrow, &[(v & 0xFF) as u8], loc);
        } else {
            let v = match value {
                Some(IntVal::Known(v)) => {
                    if !(0..=0xFFFF).contains(&v) {
                        self.error(
                            &expr.loc,
                            format!("Operand {} out of range [0, 65535]", v),
                        );
                    }
                    v
                }
                _ => 0,
            };
            let mut bytes = [0u8; 2];
            Endian::write_u16(&mut bytes, (v & 0xFFFF) as u16);
            self.emit_op(mnemonic, wide, &bytes, loc);
        }
    }

    /// Branches carry a signed 8-bit offset relative to the address after
    /// the two instruction bytes. The range check runs on the distance
    /// before truncation.
    fn emit_branch(&mut self, mnemonic: Mnemonic, expr: &ExprNode, loc: &Loc) {
        let pc = self.pc() as i64;
        let offset = match self.eval_int(expr) {
            Some(IntVal::Known(target)) => {
                let delta = target - (pc + 2);
                if delta < -128 || delta > 127 {
                    self.error(
                        loc,
                        format!("Branch target out of range ({} bytes away)", delta),
                    );
                    0
                } else {
                    (delta & 0xFF) as u8
                }
            }
            _ => 0,
        };
        self.emit_op(mnemonic, AddrMode::Relative, &[offset], loc);
    }

    fn byte_operand(&mut self, expr: &ExprNode, min: i64, max: i64) -> u8 {
        match self.eval_int(expr) {
            Some(IntVal::Known(v)) => {
                if v < min || v > max {
                    self.error(
                        &expr.loc,
                        format!("Value {} out of range [{}, {}]", v, min, max),
                    );
                }
                (v & 0xFF) as u8
            }
            _ => 0,
        }
    }

    fn word_operand(&mut self, expr: &ExprNode) -> u16 {
        match self.eval_int(expr) {
            Some(IntVal::Known(v)) => {
                if !(0..=0xFFFF).contains(&v) {
                    self.error(
                        &expr.loc,
                        format!("Operand {} out of range [0, 65535]", v),
                    );
                }
                (v & 0xFFFF) as u16
            }
            _ => 0,
        }
    }

    pub(crate) fn emit_byte_dir(&mut self, exprs: &[ExprNode]) {
        for expr in exprs {
            match self.eval(expr) {
                Some(Evaluated::Known(value)) => self.emit_byte_value(&value, &expr.loc),
                _ => self.push_bytes(&expr.loc, false, &[0]),
            }
        }
    }

    fn emit_byte_value(&mut self, value: &Value, loc: &Loc) {
        match value {
            Value::Int(v) => {
                if !(-128..=255).contains(v) {
                    self.error(loc, format!("Byte value {} out of range [-128, 255]", v));
                }
                self.push_bytes(loc, false, &[(*v & 0xFF) as u8]);
            }
            Value::Str(text) => self.emit_petscii(text, loc),
            Value::Array(items) => {
                for item in items.iter() {
                    self.emit_byte_value(item, loc);
                }
            }
            other => {
                self.error(
                    loc,
                    format!("Cannot emit a value of type {} with !byte", other.type_name()),
                );
            }
        }
    }

    pub(crate) fn emit_word_dir(&mut self, exprs: &[ExprNode]) {
        for expr in exprs {
            match self.eval_int(expr) {
                Some(IntVal::Known(v)) => {
                    if !(-32768..=65535).contains(&v) {
                        self.error(
                            &expr.loc,
                            format!("Word value {} out of range [-32768, 65535]", v),
                        );
                    }
                    let mut bytes = [0u8; 2];
                    Endian::write_u16(&mut bytes, (v & 0xFFFF) as u16);
                    self.push_bytes(&expr.loc, false, &bytes);
                }
                _ => self.push_bytes(&expr.loc, false, &[0, 0]),
            }
        }
    }

    pub(crate) fn emit_fill(&mut self, count: &ExprNode, value: Option<&ExprNode>, loc: &Loc) {
        let count = match self.eval_int(count) {
            Some(IntVal::Known(c)) => {
                if c < 0 {
                    self.error(&count.loc, "!fill count must not be negative");
                    return;
                }
                if c > 0x10000 {
                    self.error(&count.loc, "!fill count is too large");
                    return;
                }
                c
            }
            Some(IntVal::Unknown) => return,
            None => return,
        };

        let fill = match value {
            Some(expr) => match self.eval_int(expr) {
                Some(IntVal::Known(v)) => {
                    if !(-128..=255).contains(&v) {
                        self.error(
                            &expr.loc,
                            format!("Byte value {} out of range [-128, 255]", v),
                        );
                    }
                    (v & 0xFF) as u8
                }
                _ => 0,
            },
            None => 0,
        };

        let bytes = vec![fill; count as usize];
        self.push_bytes(loc, false, &bytes);
    }

    pub(crate) fn emit_text_dir(&mut self, exprs: &[ExprNode]) {
        for expr in exprs {
            match self.eval(expr) {
                Some(Evaluated::Known(Value::Str(text))) => {
                    self.emit_petscii(&text, &expr.loc);
                }
                Some(Evaluated::Known(other)) => {
                    self.error(
                        &expr.loc,
                        format!("!text expects a string, found {}", other.type_name()),
                    );
                }
                _ => {}
            }
        }
    }

    fn emit_petscii(&mut self, text: &str, loc: &Loc) {
        match petscii::convert(text) {
            Ok(bytes) => self.push_bytes(loc, false, &bytes),
            Err(c) => {
                self.error(loc, format!("Character {:?} has no PETSCII encoding", c));
            }
        }
    }

    pub(crate) fn emit_binary(
        &mut self,
        path: &str,
        size: Option<&ExprNode>,
        offset: Option<&ExprNode>,
        loc: &Loc,
    ) {
        let full = self.sources.get(loc.file).dir().join(path);
        let data = match self.read_binary(&full) {
            Some(data) => data,
            None => {
                self.error(loc, format!("Cannot read binary file \"{}\"", path));
                return;
            }
        };

        let size = match size {
            Some(expr) => match self.eval_int(expr) {
                Some(IntVal::Known(v)) => Some(v),
                Some(IntVal::Unknown) => return,
                None => return,
            },
            None => None,
        };
        let offset = match offset {
            Some(expr) => match self.eval_int(expr) {
                Some(IntVal::Known(v)) => v,
                Some(IntVal::Unknown) => return,
                None => return,
            },
            None => 0,
        };

        if offset < 0 || offset as usize > data.len() {
            self.error(loc, format!("!binary offset {} exceeds file size", offset));
            return;
        }
        let start = offset as usize;
        let end = match size {
            Some(s) => {
                if s < 0 || start + s as usize > data.len() {
                    self.error(loc, "!binary range exceeds file size");
                    return;
                }
                start + s as usize
            }
            None => data.len(),
        };

        let slice = data[start..end].to_vec();
        self.push_bytes(loc, false, &slice);
    }
}

fn is_accumulator(expr: &ExprNode) -> bool {
    match &expr.expr {
        Expr::Path(path) => path.len() == 1 && path[0].eq_ignore_ascii_case("a"),
        _ => false,
    }
}
