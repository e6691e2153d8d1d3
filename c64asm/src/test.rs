use crate::debuginfo::ByteRole;
use crate::source::MemReader;
use crate::{assemble, assemble_with, Severity};

mod grammar;

fn ok(source: &str) -> crate::AssembleResult {
    let result = assemble(source);
    assert!(
        !result.has_errors(),
        "unexpected diagnostics: {:?}",
        result.formatted_diagnostics()
    );
    result
}

fn ok_bytes(source: &str) -> Vec<u8> {
    ok(source).program.unwrap().bytes().to_vec()
}

fn errors(source: &str) -> Vec<String> {
    let result = assemble(source);
    assert!(result.has_errors());
    assert!(result.program.is_none());
    result.formatted_diagnostics()
}

#[test]
fn hello() {
    let result = ok("* = $0801\n lda #$41\n sta $d020\n rts");
    let program = result.program.unwrap();

    assert_eq!(program.load_address(), 0x0801);
    assert_eq!(program.bytes(), &[0xA9, 0x41, 0x8D, 0x20, 0xD0, 0x60]);
    assert_eq!(program.to_bytes()[..2], [0x01, 0x08]);
}

#[test]
fn backward_branch() {
    let bytes = ok_bytes("* = $0801\nloop: dex\n bne loop");
    assert_eq!(bytes, vec![0xCA, 0xD0, 0xFD]);
}

#[test]
fn forward_branch() {
    let bytes = ok_bytes("* = $0801\n beq done\n lda #0\ndone: rts");
    // done = $0805, offset = $0805 - ($0801 + 2) = 2
    assert_eq!(bytes, vec![0xF0, 0x02, 0xA9, 0x00, 0x60]);
}

#[test]
fn zero_page_narrowing() {
    let bytes = ok_bytes("* = $0801\nzp = $10\n lda zp");
    assert_eq!(bytes, vec![0xA5, 0x10]);
}

#[test]
fn forward_reference_stays_absolute() {
    // The operand is unknown on the first pass, so the wide encoding is
    // chosen and kept.
    let bytes = ok_bytes("* = $0801\n lda value\nvalue = $10");
    assert_eq!(bytes, vec![0xAD, 0x10, 0x00]);
}

#[test]
fn forward_label_operand() {
    let bytes = ok_bytes("* = $0801\n lda data\ndata: !byte 7");
    assert_eq!(bytes, vec![0xAD, 0x04, 0x08, 0x07]);
}

#[test]
fn branch_out_of_range() {
    let diags = errors("* = $0801\n bne target\n!fill 200, 0\ntarget: rts");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].starts_with("<input>:2:"));
    assert!(diags[0].contains("Branch target out of range"));
}

#[test]
fn macro_hygiene() {
    let result = ok("* = $0801\n!macro delay() {\ninner: dex\n bne inner\n}\n+delay()\n+delay()");
    let program = result.program.unwrap();
    assert_eq!(program.bytes(), &[0xCA, 0xD0, 0xFD, 0xCA, 0xD0, 0xFD]);

    let info = result.debug_info.unwrap();
    let inner: Vec<_> = info
        .symbols
        .iter()
        .filter(|s| s.name.ends_with("::inner"))
        .collect();
    assert_eq!(inner.len(), 2);
    assert_ne!(inner[0].name, inner[1].name);
    assert_eq!(inner[0].address, 0x0801);
    assert_eq!(inner[1].address, 0x0804);
}

#[test]
fn binary_include_window() {
    let mut reader = MemReader::new();
    reader.insert("blob.bin", vec![0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

    let result = assemble_with("* = $0801\n!binary \"blob.bin\", 4, 2", "main.asm", &mut reader);
    assert!(!result.has_errors());
    assert_eq!(result.program.unwrap().bytes(), &[2, 3, 4, 5]);
}

#[test]
fn binary_include_out_of_range() {
    let mut reader = MemReader::new();
    reader.insert("blob.bin", vec![0u8, 1, 2, 3]);

    let result = assemble_with("* = $0801\n!binary \"blob.bin\", 4, 2", "main.asm", &mut reader);
    assert!(result.has_errors());
    assert!(result.formatted_diagnostics()[0].contains("range exceeds file size"));
}

#[test]
fn include_provides_macros() {
    let mut reader = MemReader::new();
    reader.insert("lib.asm", "!macro ten() { !byte 10 }\n");

    let result = assemble_with(
        "* = $0801\n!include \"lib.asm\"\n+ten()",
        "main.asm",
        &mut reader,
    );
    assert!(
        !result.has_errors(),
        "{:?}",
        result.formatted_diagnostics()
    );
    assert_eq!(result.program.unwrap().bytes(), &[10]);
}

#[test]
fn missing_include_is_reported() {
    let mut reader = MemReader::new();
    let result = assemble_with("!include \"nope.asm\"", "main.asm", &mut reader);
    assert!(result.has_errors());
    assert!(result.formatted_diagnostics()[0].contains("Cannot read included file"));
}

#[test]
fn basic_stub_emitted_by_default() {
    let result = ok(" lda #0\n rts");
    let program = result.program.unwrap();

    assert_eq!(program.load_address(), 0x0801);
    // 12-byte BASIC stub, then the code at $080d (2061).
    assert_eq!(program.bytes().len(), 15);
    assert_eq!(&program.bytes()[..2], &[0x0B, 0x08]);
    assert_eq!(&program.bytes()[12..], &[0xA9, 0x00, 0x60]);

    let info = result.debug_info.unwrap();
    assert!(!info.is_instruction(0));
    assert!(info.is_instruction(12));
}

#[test]
fn data_directives() {
    let bytes = ok_bytes("* = $0801\n!byte 1, $ff, -1\n!word $1234, -1\n!fill 3, $aa");
    assert_eq!(
        bytes,
        vec![0x01, 0xFF, 0xFF, 0x34, 0x12, 0xFF, 0xFF, 0xAA, 0xAA, 0xAA]
    );
}

#[test]
fn text_is_petscii() {
    let bytes = ok_bytes("* = $0801\n!text \"Hi!\"");
    assert_eq!(bytes, vec![0xC8, 0x49, 0x21]);
}

#[test]
fn byte_accepts_strings_and_arrays() {
    let bytes = ok_bytes("* = $0801\n!byte \"ab\", [1, 2]");
    assert_eq!(bytes, vec![0x41, 0x42, 0x01, 0x02]);
}

#[test]
fn align_pads_with_zeroes() {
    let bytes = ok_bytes("* = $0801\n !byte 1\n!align 4\n !byte 2");
    assert_eq!(bytes, vec![0x01, 0x00, 0x00, 0x02]);
}

#[test]
fn set_pc_forward_pads() {
    let bytes = ok_bytes("* = $0801\n !byte 1\n* = $0804\n !byte 2");
    assert_eq!(bytes, vec![0x01, 0x00, 0x00, 0x02]);
}

#[test]
fn segments_concatenate_in_declaration_order() {
    let bytes = ok_bytes(
        "* = $0801\n !byte 1\n!segment data\n* = $2000\n !byte 2\n!segment default\n !byte 3",
    );
    assert_eq!(bytes, vec![1, 3, 2]);
}

#[test]
fn expressions() {
    let bytes = ok_bytes("* = $0801\n!byte 2+3*4, (2+3)*4, $10|%101, <$1234, >$1234, 7 % 3");
    assert_eq!(bytes, vec![14, 20, 0x15, 0x34, 0x12, 1]);
}

#[test]
fn builtins() {
    let bytes =
        ok_bytes("* = $0801\n!byte len(\"abc\"), min(4,2), max(4,2), abs(0-5), sizeof(\"ab\")");
    assert_eq!(bytes, vec![3, 2, 4, 5, 2]);
}

#[test]
fn lo_hi_operators_in_immediates() {
    let bytes = ok_bytes("* = $0801\naddr = $1234\n lda #<addr\n ldx #>addr\n ldy #hi($ffee)");
    assert_eq!(bytes, vec![0xA9, 0x34, 0xA2, 0x12, 0xA0, 0xFF]);
}

#[test]
fn char_literal() {
    let bytes = ok_bytes("* = $0801\n lda #'A'");
    assert_eq!(bytes, vec![0xA9, 0x41]);
}

#[test]
fn pc_expression() {
    let bytes = ok_bytes("* = $0801\n jmp *");
    assert_eq!(bytes, vec![0x4C, 0x01, 0x08]);
}

#[test]
fn accumulator_mode() {
    let bytes = ok_bytes("* = $0801\n asl\n asl a\n lsr a");
    assert_eq!(bytes, vec![0x0A, 0x0A, 0x4A]);
}

#[test]
fn indirect_modes() {
    let bytes = ok_bytes("* = $0801\n jmp ($fffc)\n lda ($20,x)\n sta ($20),y");
    assert_eq!(bytes, vec![0x6C, 0xFC, 0xFF, 0xA1, 0x20, 0x91, 0x20]);
}

#[test]
fn for_loop_unrolls_in_order() {
    let bytes = ok_bytes("* = $0801\n!for i in range(3) { !byte i }");
    assert_eq!(bytes, vec![0, 1, 2]);
}

#[test]
fn for_loop_over_integer_and_array() {
    let bytes = ok_bytes("* = $0801\n!for i in 2 { !byte i }\n!for v in [7, 9] { !byte v }");
    assert_eq!(bytes, vec![0, 1, 7, 9]);
}

#[test]
fn if_else_chain() {
    let bytes = ok_bytes(
        "* = $0801\n!let v = 2\n!if v == 1 { !byte 1 } else !if v == 2 { !byte 2 } else { !byte 3 }",
    );
    assert_eq!(bytes, vec![2]);
}

#[test]
fn if_false_with_no_else_emits_nothing() {
    let bytes = ok_bytes("* = $0801\n!if 0 { !byte 1 }\n !byte 9");
    assert_eq!(bytes, vec![9]);
}

#[test]
fn scopes_and_qualified_lookup() {
    let bytes = ok_bytes("* = $0801\n!scope data {\nval = $20\n}\n lda data::val");
    assert_eq!(bytes, vec![0xA5, 0x20]);
}

#[test]
fn local_labels() {
    let bytes = ok_bytes("* = $0801\n!scope code {\n@loop: dex\n bne @loop\n}");
    assert_eq!(bytes, vec![0xCA, 0xD0, 0xFD]);
}

#[test]
fn macro_parameters_and_capture() {
    let source = "* = $0801
!scope lib {
base = $d000
!macro poke(off, v) {
 lda #v
 sta base + off
}
}
+lib::poke($20, 7)";
    let bytes = ok_bytes(source);
    assert_eq!(bytes, vec![0xA9, 0x07, 0x8D, 0x20, 0xD0]);
}

#[test]
fn objects_and_subscripts() {
    let bytes = ok_bytes("* = $0801\n!let cfg = { border: $d020 }\n sta cfg.border\n!byte [5, 6, 7][1]");
    assert_eq!(bytes, vec![0x8D, 0x20, 0xD0, 0x06]);
}

#[test]
fn statements_separated_by_colon() {
    let bytes = ok_bytes("* = $0801\n lda #1 : sta $d020");
    assert_eq!(bytes, vec![0xA9, 0x01, 0x8D, 0x20, 0xD0]);
}

#[test]
fn unknown_mnemonic() {
    let diags = errors(" lda #$41\n foo #1");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0], "<input>:2:2 - error: Unknown mnemonic \"foo\"");
}

#[test]
fn unknown_directive() {
    let diags = errors("!frobnicate 1, 2");
    assert!(diags[0].contains("Unknown directive \"!frobnicate\""));
}

#[test]
fn undefined_symbol_in_final_pass() {
    let diags = errors("* = $0801\n lda missing");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].contains("Undefined symbol \"missing\""));
}

#[test]
fn duplicate_label() {
    let diags = errors("* = $0801\nx: rts\nx: rts");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].starts_with("<input>:3:"));
    assert!(diags[0].contains("Duplicate symbol \"x\""));
}

#[test]
fn illegal_addressing_mode() {
    let diags = errors("* = $0801\n sta #1");
    assert!(diags[0].contains("Illegal addressing mode for \"sta\""));
}

#[test]
fn division_by_zero() {
    let diags = errors("* = $0801\n!byte 1 / 0");
    assert!(diags[0].contains("Division by zero"));
}

#[test]
fn syntax_error_recovery_collects_multiple_errors() {
    let diags = errors(" lda #$41\n $$$\n rts\n %%%");
    assert_eq!(diags.len(), 2);
    assert!(diags[0].starts_with("<input>:2:"));
    assert!(diags[0].contains("Syntax error: "));
    assert!(diags[1].starts_with("<input>:4:"));
}

#[test]
fn diagnostics_are_ordered_by_location() {
    let diags = errors("* = $0801\n!byte 1/0\n!byte bad\n!byte 2/0");
    assert_eq!(diags.len(), 3);
    assert!(diags[0].starts_with("<input>:2:"));
    assert!(diags[1].starts_with("<input>:3:"));
    assert!(diags[2].starts_with("<input>:4:"));
}

#[test]
fn shadowing_builtin_is_a_warning_only() {
    let result = assemble("* = $0801\nlo = 1\n lda #lo");
    assert!(!result.has_errors());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    assert!(result.formatted_diagnostics()[0].contains("shadows a built-in"));
    assert_eq!(result.program.unwrap().bytes(), &[0xA9, 0x01]);
}

#[test]
fn idempotence() {
    let source = "* = $0801\n!for i in range(4) { lda #i\n sta $0400 + i }\n rts";
    let first = assemble(source);
    let second = assemble(source);

    assert_eq!(
        first.program.as_ref().unwrap().to_bytes(),
        second.program.as_ref().unwrap().to_bytes()
    );
    assert_eq!(
        first.formatted_diagnostics(),
        second.formatted_diagnostics()
    );
}

#[test]
fn debug_info_covers_every_byte() {
    let result = ok("* = $0801\n lda #$41\nloop: rts\n!byte 5");
    let program = result.program.unwrap();
    let info = result.debug_info.unwrap();

    assert_eq!(info.roles().len(), program.bytes().len());
    assert_eq!(info.roles()[0], ByteRole::InstructionStart);
    assert_eq!(info.roles()[1], ByteRole::InstructionContinuation);
    assert_eq!(info.roles()[2], ByteRole::InstructionStart);
    assert_eq!(info.roles()[3], ByteRole::Data);

    assert_eq!(info.pc_to_source[&0x0801][0].line, 2);
    assert_eq!(info.pc_to_source[&0x0803][0].line, 3);

    let symbol = info.symbols.iter().find(|s| s.name == "loop").unwrap();
    assert_eq!(symbol.address, 0x0803);
    // rts plus the trailing data byte
    assert_eq!(symbol.size, 2);
    assert_eq!(symbol.segment, "default");
}

#[test]
fn debug_info_records_macro_call_site() {
    let result = ok("* = $0801\n!macro m() { nop }\n+m()");
    let info = result.debug_info.unwrap();

    let positions = &info.pc_to_source[&0x0801];
    assert_eq!(positions.len(), 2);
    // In-macro location first, call site second.
    assert_eq!(positions[0].line, 2);
    assert_eq!(positions[1].line, 3);
}

#[test]
fn debug_info_serialization_is_stable() {
    let source = "* = $0801\n lda #$41\nloop: rts";
    let info = ok(source).debug_info.unwrap();

    let mut first = Vec::new();
    info.write(&mut first).unwrap();

    // Magic and version, then the little-endian address map: two mapped
    // addresses, the first being $0801 with one source position whose
    // file name is length-prefixed.
    assert_eq!(&first[..8], b"C64DBG\0\x01");
    assert_eq!(&first[8..12], &2u32.to_le_bytes());
    assert_eq!(&first[12..14], &0x0801u16.to_le_bytes());
    assert_eq!(&first[14..16], &1u16.to_le_bytes());
    assert_eq!(&first[16..20], &7u32.to_le_bytes());
    assert_eq!(&first[20..27], b"<input>");
    assert_eq!(&first[27..31], &2u32.to_le_bytes());

    let mut second = Vec::new();
    ok(source).debug_info.unwrap().write(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn round_trip_through_disassembler() {
    let source = "* = $0801\nstart: lda #$41\n sta $d020\nloop: dex\n bne loop\n jmp start\n rts";
    let result = ok(source);
    let program = result.program.unwrap();
    let info = result.debug_info.unwrap();

    let predicate = |offset: usize| info.is_instruction(offset);
    let lines = mos6502::disasm::disassemble(
        program.bytes(),
        program.load_address(),
        Some(&predicate),
        &mos6502::disasm::DisasmOptions::default(),
    );

    let decoded: Vec<&str> = lines
        .iter()
        .map(|l| l[16..].split_whitespace().next().unwrap())
        .collect();
    assert_eq!(decoded, vec!["lda", "sta", "dex", "bne", "jmp", "rts"]);
}

#[test]
fn convergence_failure_is_reported() {
    // A condition that flips with the label position it controls: label
    // at $0801 => branch taken away from the padding, which moves the
    // label, and so on.
    let source = "* = $0801\n!if here > $0801 { !byte 0 }\nhere: rts";
    let result = assemble(source);
    // Either it converges (the implementation settles the oscillation) or
    // it reports non-convergence; it must never hang. This source settles:
    // pass 1 skips the branch (unknown), later passes agree.
    assert!(!result.has_errors() || result.formatted_diagnostics()[0].contains("did not converge"));
}

#[test]
fn word_range_checked() {
    let diags = errors("* = $0801\n!word $12345");
    assert!(diags[0].contains("out of range"));
}

#[test]
fn negative_fill_count() {
    let diags = errors("* = $0801\n!fill 0-1, 7");
    assert!(diags[0].contains("count must not be negative"));
}
