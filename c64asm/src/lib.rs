//! Assembler for the MOS 6502 targeting the Commodore 64 program format.
//!
//! The main functions provided by this crate are [`assemble`](fn.assemble.html) and
//! [`assemble_file`](fn.assemble_file.html), which accept a program written in a
//! macro assembly language and output a [`Program`](../prgfile/struct.Program.html)
//! (the `.prg` image, load address included) together with
//! [`DebugInfo`](struct.DebugInfo.html) mapping every emitted byte back to its
//! source location. Diagnostics never panic the assembler; they accumulate and
//! are returned with a stable `<file>:<line>:<col> - <severity>: <message>`
//! rendering.
//!
//! Parsing the assembly language is implemented using [pest]; symbol
//! resolution runs the classic multi-pass fixpoint scheme so that forward
//! references, zero-page narrowing and branch offsets settle together.
//!
//! # Assembly language
//!
//! Statements are separated by newlines (or `:` within a line). Comments run
//! from `;` to the end of the line; `/* ... */` block comments are also
//! recognized. A statement may be preceded by label definitions (`name:`, or
//! a bare `name` that is no mnemonic). `@name:` defines a label that stays
//! local to the enclosing named scope.
//!
//! ## Instructions
//!
//! All 56 official 6502 mnemonics are supported, written with their usual
//! operand shapes:
//!
//!  Shape        | Addressing mode          | Example
//! --------------|--------------------------|------------------
//! (none) or `a` | Implied / Accumulator    | `rts`, `asl a`
//! `#expr`       | Immediate                | `lda #$41`
//! `expr`        | Zero page or absolute    | `lda $d020`
//! `expr,x`      | Zero page,X / absolute,X | `sta buf,x`
//! `expr,y`      | Zero page,Y / absolute,Y | `ldx tab,y`
//! `(expr)`      | Indirect (`jmp` only)    | `jmp ($fffc)`
//! `(expr,x)`    | Indexed indirect         | `lda ($20,x)`
//! `(expr),y`    | Indirect indexed         | `sta ($20),y`
//!
//! The zero-page encoding is chosen automatically whenever the operand value
//! fits into one byte on every pass; branch instructions always take a label
//! or address whose distance must fit a signed byte.
//!
//! ## Directives
//!
//!  Directive | Description | Example
//! -----------|-------------|--------
//! `!byte`    | emit bytes (integers, strings, arrays) | `!byte 1, "hi", $ff`
//! `!word`    | emit 16-bit little-endian words | `!word screen, $0400`
//! `!fill`    | emit `count` copies of a byte (default 0) | `!fill 256, $aa`
//! `!text`    | emit a PETSCII-converted string | `!text "hello"`
//! `!binary`  | splice a file: path, size?, offset? | `!binary "sprites.bin", 64, 2`
//! `!include` | inline another source file | `!include "macros.asm"`
//! `!if`      | conditional assembly with `else` | `!if DEBUG { ... } else { ... }`
//! `!for`     | repetition over a count or array | `!for i in range(8) { ... }`
//! `!macro`   | macro definition | `!macro poke(addr, v) { ... }`
//! `!scope`   | nested symbol scope, optionally named | `!scope sprites { ... }`
//! `!let`     | constant definition (same as `name = expr`) | `!let irq = $ea31`
//! `!segment` | switch the output segment | `!segment data`
//! `!align`   | pad with zeroes to an alignment | `!align 256`
//! `* = expr` | set the program counter | `* = $c000`
//! `+name(args)` | macro invocation | `+poke($d020, 0)`
//!
//! When the source never sets `* =` before its first emission, output starts
//! at `$0801` with an auto-generated BASIC `10 SYS <addr>` stub so the
//! program is RUN-able.
//!
//! ## Expressions
//!
//! Integer arithmetic is 64-bit and wrapping. Operators, loosest first:
//! `||`, `&&`, `|`, `^`, `&`, `==` `!=`, `<` `<=` `>` `>=`, `<<` `>>`,
//! `+` `-`, `*` `/` `%`; unary `-`, `!`, `~`, and `<`/`>` for the low/high
//! byte of a 16-bit value. `*` evaluates to the current program counter.
//! Literals: decimal, `$` hex, `%` binary, `'c'` characters, `"..."`
//! strings, `[...]` arrays and `{ name: expr }` objects (for macro
//! parameters and `!for`). Built-in functions: `lo`, `hi`, `len`, `sizeof`,
//! `min`, `max`, `abs`, `range`, `petscii`, `bytes`, `string`.
//!
//! Macros are hygienic: each invocation gets a fresh scope under the scope
//! the macro was *defined* in, so labels inside a macro body never collide
//! between calls and free identifiers resolve at the definition site.
//!
//! [pest]: https://docs.rs/pest/

mod asm;
mod ast;
mod debuginfo;
mod diag;
mod emit;
mod eval;
mod parser;
mod petscii;
mod scope;
mod source;
mod value;

#[cfg(test)]
mod test;

use std::path::Path;

pub use asm::AssembleResult;
pub use debuginfo::{ByteRole, ConstantInfo, DebugInfo, SourcePos, SymbolInfo};
pub use diag::{Diagnostic, Severity};
pub use source::{FileId, FsReader, Loc, MemReader, SourceReader, SourceSet};
pub use value::{Builtin, Value};

/// Assembles a source string. `!include` and `!binary` paths resolve
/// against the process working directory.
pub fn assemble(input: &str) -> AssembleResult {
    let mut reader = FsReader;
    asm::run(Path::new("<input>"), Some(input.to_owned()), &mut reader)
}

/// Assembles a source string with an injected file reader; `root_name` is
/// the name diagnostics use for the root source.
pub fn assemble_with(input: &str, root_name: &str, reader: &mut dyn SourceReader) -> AssembleResult {
    asm::run(Path::new(root_name), Some(input.to_owned()), reader)
}

/// Assembles the source file at `path`.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> AssembleResult {
    let mut reader = FsReader;
    asm::run(path.as_ref(), None, &mut reader)
}

/// Assembles the source file at `path` with an injected file reader.
pub fn assemble_file_with<P: AsRef<Path>>(
    path: P,
    reader: &mut dyn SourceReader,
) -> AssembleResult {
    asm::run(path.as_ref(), None, reader)
}
