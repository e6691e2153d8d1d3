#![allow(clippy::cognitive_complexity)]

use crate::parser::{AsmParser, Rule};
use ::pest::*;

fn parses(rule: Rule, input: &str) -> bool {
    AsmParser::parse(rule, input).is_ok()
}

#[test]
fn numbers() {
    parses_to! {
        parser: AsmParser,
        input: "$1af",
        rule: Rule::num_hex,
        tokens: [ num_hex(0, 4) ]
    };
    parses_to! {
        parser: AsmParser,
        input: "%10110",
        rule: Rule::num_bin,
        tokens: [ num_bin(0, 6) ]
    };
    parses_to! {
        parser: AsmParser,
        input: "123",
        rule: Rule::num_dec,
        tokens: [ num_dec(0, 3) ]
    };
}

#[test]
fn identifier() {
    parses_to! {
        parser: AsmParser,
        input: "_some9_label",
        rule: Rule::identifier,
        tokens: [ identifier(0, 12) ]
    };
    fails_with! {
        parser: AsmParser,
        input: "9abc",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn string_and_char() {
    parses_to! {
        parser: AsmParser,
        input: "\"hello\"",
        rule: Rule::string,
        tokens: [ string(0, 7) ]
    };
    parses_to! {
        parser: AsmParser,
        input: "'x'",
        rule: Rule::char_lit,
        tokens: [ char_lit(0, 3) ]
    };
    assert!(!parses(Rule::string, "\"unterminated"));
}

#[test]
fn labels() {
    parses_to! {
        parser: AsmParser,
        input: "loop:",
        rule: Rule::label_global,
        tokens: [ label_global(0, 5, [ identifier(0, 4) ]) ]
    };
    parses_to! {
        parser: AsmParser,
        input: "@skip:",
        rule: Rule::label_local,
        tokens: [ label_local(0, 6, [ identifier(1, 5) ]) ]
    };
}

#[test]
fn pc_assignment() {
    parses_to! {
        parser: AsmParser,
        input: "* = $0801",
        rule: Rule::pc_assign,
        tokens: [ pc_assign(0, 9, [
            expr(4, 9, [ unary(4, 9, [ postfix(4, 9, [ num_hex(4, 9) ]) ]) ])
        ]) ]
    };
}

#[test]
fn instructions_parse() {
    assert!(parses(Rule::program, "lda #$41"));
    assert!(parses(Rule::program, " sta $d020"));
    assert!(parses(Rule::program, "lda ($20,x)"));
    assert!(parses(Rule::program, "sta ($20),y"));
    assert!(parses(Rule::program, "jmp ($fffc)"));
    assert!(parses(Rule::program, "lda table,x : rts"));
    assert!(parses(Rule::program, "asl a"));
    assert!(parses(Rule::program, "rts"));
}

#[test]
fn directives_parse() {
    assert!(parses(Rule::program, "!byte 1, $ff, %101, 'c'"));
    assert!(parses(Rule::program, "!word $1234, label"));
    assert!(parses(Rule::program, "!fill 256, $aa"));
    assert!(parses(Rule::program, "!text \"hello\", \"world\""));
    assert!(parses(Rule::program, "!binary \"blob.bin\", 4, 2"));
    assert!(parses(Rule::program, "!include \"macros.asm\""));
    assert!(parses(Rule::program, "!segment data"));
    assert!(parses(Rule::program, "!align 256"));
    assert!(parses(Rule::program, "!let border = $d020"));
    assert!(parses(Rule::program, "count = 8"));
}

#[test]
fn blocks_parse() {
    assert!(parses(Rule::program, "!if debug { lda #1 } else { lda #2 }"));
    assert!(parses(
        Rule::program,
        "!if v == 1 { nop } else !if v == 2 { rts }"
    ));
    assert!(parses(Rule::program, "!for i in range(8) {\n !byte i\n}"));
    assert!(parses(
        Rule::program,
        "!macro poke(addr, v) {\n lda #v\n sta addr\n}"
    ));
    assert!(parses(Rule::program, "!scope sprites {\nx: !byte 0\n}"));
    assert!(parses(Rule::program, "+poke($d020, 0)"));
    assert!(parses(Rule::program, "+lib::poke($d020, 0)"));
}

#[test]
fn expressions_parse() {
    assert!(parses(Rule::program, "!byte 2+3*4, (2+3)*4"));
    assert!(parses(Rule::program, "!byte <$1234, >$1234, ~%1010, !0, -1"));
    assert!(parses(Rule::program, "!byte a && b || c == d"));
    assert!(parses(Rule::program, "!byte $10 << 2, $10 >> 2, 7 % 3"));
    assert!(parses(Rule::program, "!byte len(\"abc\"), arr[2], obj.field"));
    assert!(parses(Rule::program, "!let xs = [1, 2, 3]"));
    assert!(parses(Rule::program, "!let cfg = { border: $d020, n: 8 }"));
    assert!(parses(Rule::program, "!byte outer::inner, @local"));
    assert!(parses(Rule::program, "jmp *"));
}

#[test]
fn comments_are_skipped() {
    assert!(parses(Rule::program, "lda #1 ; set accumulator"));
    assert!(parses(Rule::program, "; full line comment\nrts"));
    assert!(parses(Rule::program, "lda /* inline */ #1"));
    assert!(!parses(Rule::program, "lda #1 /* unterminated"));
}

#[test]
fn malformed_input_is_rejected() {
    assert!(!parses(Rule::program, "lda ($10,x"));
    assert!(!parses(Rule::program, "!byte"));
    assert!(!parses(Rule::program, "!if { rts }"));
    assert!(!parses(Rule::program, "!macro m( { rts }"));
    assert!(!parses(Rule::program, "lda #1 }"));
    assert!(!parses(Rule::program, "$$$"));
}

#[test]
fn line_separators() {
    assert!(parses(Rule::program, "lda #1\nsta $d020\r\nrts"));
    assert!(parses(Rule::program, ""));
    assert!(parses(Rule::program, "\n\n\n"));
    assert!(parses(Rule::program, "lda #1 : sta $d020 : rts"));
}
