//! The multi-pass assembly driver.
//!
//! Pass 0 parses and collects macro definitions. Resolution passes then walk
//! the AST in source order, rebuilding segment contents and symbol values
//! each time, until a pass changes nothing (no label moved, no instruction
//! changed width, the set of unresolved references stopped shrinking). One
//! last strict pass produces the output; on that pass anything still
//! unresolved or out of range is a hard error.

use crate::ast::{ExprNode, Stmt, StmtNode};
use crate::debuginfo::{DebugInfo, DebugInfoBuilder, SegmentInfo};
use crate::diag::{self, Diagnostic, Severity};
use crate::eval::{EvalCtx, Evaluated, IntVal};
use crate::parser;
use crate::scope::{Defined, ScopeId, ScopeKind, Symbol, SymbolTable};
use crate::source::{FileId, Loc, SourceReader, SourceSet};
use crate::value::{Builtin, Value};
use log::{debug, trace};
use std::collections::HashMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub(crate) const MAX_PASSES: u32 = 16;
const MAX_MACRO_DEPTH: usize = 64;
const MAX_FOR_ITERATIONS: i64 = 1 << 20;

/// Everything an assembly run produces. `program` and `debug_info` are
/// present only when no error diagnostic was reported.
pub struct AssembleResult {
    pub program: Option<prgfile::Program>,
    pub debug_info: Option<DebugInfo>,
    pub diagnostics: Vec<Diagnostic>,
    sources: SourceSet,
}

impl AssembleResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics in their stable `<file>:<line>:<col> - ...` rendering.
    pub fn formatted_diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| d.formatted(&self.sources))
            .collect()
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }
}

pub(crate) struct Segment {
    pub name: String,
    pub start: Option<u16>,
    pub buf: Vec<u8>,
}

pub(crate) struct Assembler<'r> {
    pub(crate) sources: SourceSet,
    pub(crate) reader: &'r mut dyn SourceReader,
    pub(crate) parse_diags: Vec<Diagnostic>,
    pub(crate) diags: Vec<Diagnostic>,
    pub(crate) symtab: SymbolTable,
    pub(crate) scope: ScopeId,
    pub(crate) segments: Vec<Segment>,
    pub(crate) seg_index: HashMap<String, usize>,
    pub(crate) cur_seg: usize,
    pub(crate) final_pass: bool,
    pub(crate) unresolved: bool,
    pub(crate) changed: bool,
    pub(crate) widths: Vec<u8>,
    pub(crate) prev_widths: Vec<u8>,
    pub(crate) invocation: u32,
    pub(crate) call_locs: Vec<Loc>,
    pub(crate) debug: DebugInfoBuilder,
    pub(crate) overflowed: bool,
    stub_bytes: Vec<u8>,
    stub_target: u16,
    binary_cache: HashMap<PathBuf, Option<Rc<Vec<u8>>>>,
}

/// Assembles the file at `root`; when `text` is given it is used as the
/// root's contents instead of going through `reader`.
pub(crate) fn run(
    root: &Path,
    text: Option<String>,
    reader: &mut dyn SourceReader,
) -> AssembleResult {
    let mut sources = SourceSet::new();

    let text = match text {
        Some(text) => text,
        None => match reader.read(root) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => {
                let id = sources.add(root.to_path_buf(), String::new());
                let loc = sources.loc(id, 0, 0);
                let diagnostic =
                    Diagnostic::error(loc, format!("Cannot read file \"{}\"", root.display()));
                return AssembleResult {
                    program: None,
                    debug_info: None,
                    diagnostics: vec![diagnostic],
                    sources,
                };
            }
        },
    };

    let parsed = parser::parse_source(&mut sources, reader, root, text);
    let (stub_bytes, stub_target) = prgfile::basic_stub();

    let mut asm = Assembler {
        sources,
        reader,
        parse_diags: parsed.diagnostics,
        diags: Vec::new(),
        symtab: SymbolTable::new(),
        scope: ScopeId(0),
        segments: Vec::new(),
        seg_index: HashMap::new(),
        cur_seg: 0,
        final_pass: false,
        unresolved: false,
        changed: false,
        widths: Vec::new(),
        prev_widths: Vec::new(),
        invocation: 0,
        call_locs: Vec::new(),
        debug: DebugInfoBuilder::default(),
        overflowed: false,
        stub_bytes,
        stub_target,
        binary_cache: HashMap::new(),
    };

    asm.scope = asm.symtab.root();
    asm.collect(&parsed.stmts);

    let mut converged = false;
    let mut prev_unresolved = false;
    let mut passes = 0;
    for pass in 1..=MAX_PASSES {
        passes = pass;
        asm.begin_pass(false);
        asm.process(&parsed.stmts);
        debug!(
            "pass {}: changed={} unresolved={}",
            pass, asm.changed, asm.unresolved
        );
        if !asm.changed && (!asm.unresolved || asm.unresolved == prev_unresolved) {
            converged = true;
            break;
        }
        prev_unresolved = asm.unresolved;
    }
    trace!(
        "fixpoint: {} resolution passes, converged={}",
        passes, converged
    );

    let mut diagnostics = asm.parse_diags.clone();

    if !converged {
        let loc = asm.sources.loc(FileId(0), 0, 0);
        diagnostics.push(Diagnostic::error(
            loc,
            format!("Assembly did not converge after {} passes", MAX_PASSES),
        ));
        diag::sort(&mut diagnostics, &asm.sources);
        return AssembleResult {
            program: None,
            debug_info: None,
            diagnostics,
            sources: asm.sources,
        };
    }

    asm.begin_pass(true);
    asm.process(&parsed.stmts);
    diagnostics.extend(asm.diags.drain(..));
    diag::sort(&mut diagnostics, &asm.sources);

    let has_errors = diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error);
    if has_errors {
        return AssembleResult {
            program: None,
            debug_info: None,
            diagnostics,
            sources: asm.sources,
        };
    }

    let load_address = asm.segments[0]
        .start
        .unwrap_or(prgfile::DEFAULT_LOAD_ADDRESS);
    let mut bytes = Vec::new();
    for segment in &asm.segments {
        bytes.extend_from_slice(&segment.buf);
    }

    let segment_infos: Vec<SegmentInfo> = asm
        .segments
        .iter()
        .map(|s| SegmentInfo {
            name: s.name.clone(),
            start: s.start.unwrap_or(0),
            len: s.buf.len(),
        })
        .collect();
    let debug_info = asm.debug.finish(&asm.sources, &asm.symtab, &segment_infos);

    AssembleResult {
        program: Some(prgfile::Program::from(load_address, bytes)),
        debug_info: Some(debug_info),
        diagnostics,
        sources: asm.sources,
    }
}

impl<'r> Assembler<'r> {
    fn begin_pass(&mut self, final_pass: bool) {
        self.symtab.begin_pass();
        self.segments.clear();
        self.seg_index.clear();
        self.segments.push(Segment {
            name: "default".to_owned(),
            start: None,
            buf: Vec::new(),
        });
        self.seg_index.insert("default".to_owned(), 0);
        self.cur_seg = 0;
        self.scope = self.symtab.root();
        self.final_pass = final_pass;
        self.unresolved = false;
        self.changed = false;
        self.overflowed = false;
        self.prev_widths = mem::take(&mut self.widths);
        self.invocation = 0;
        self.call_locs.clear();
        self.diags.clear();
        self.debug.clear();
    }

    /// The program counter of the active segment. Before any emission in
    /// the default segment this anticipates the BASIC stub.
    pub(crate) fn pc(&self) -> u32 {
        let segment = &self.segments[self.cur_seg];
        match segment.start {
            Some(start) => u32::from(start) + segment.buf.len() as u32,
            None if self.cur_seg == 0 => u32::from(self.stub_target),
            None => 0,
        }
    }

    pub(crate) fn error<M: Into<String>>(&mut self, loc: &Loc, message: M) {
        self.diags.push(Diagnostic::error(*loc, message));
    }

    pub(crate) fn warning<M: Into<String>>(&mut self, loc: &Loc, message: M) {
        self.diags.push(Diagnostic::warning(*loc, message));
    }

    pub(crate) fn evaluator(&mut self) -> EvalCtx<'_> {
        let pc = self.pc() as i64;
        EvalCtx {
            symtab: &self.symtab,
            scope: self.scope,
            pc,
            final_pass: self.final_pass,
            diags: &mut self.diags,
            unresolved: &mut self.unresolved,
        }
    }

    pub(crate) fn eval(&mut self, expr: &ExprNode) -> Option<Evaluated> {
        self.evaluator().eval(expr)
    }

    pub(crate) fn eval_int(&mut self, expr: &ExprNode) -> Option<IntVal> {
        self.evaluator().eval_int(expr)
    }

    /// Pass 0: register macro definitions (with their captured scopes) so
    /// calls resolve regardless of definition order. Conditional and loop
    /// bodies are dynamic and register on traversal instead.
    fn collect(&mut self, stmts: &[StmtNode]) {
        for node in stmts {
            match &node.stmt {
                Stmt::MacroDef(def) => {
                    self.symtab.define_macro(self.scope, def.clone(), self.scope)
                }
                Stmt::Scope { name, body } => {
                    let saved = self.scope;
                    self.enter_scope(name.as_deref(), &node.loc);
                    self.collect(body);
                    self.scope = saved;
                }
                Stmt::Include { body, .. } => self.collect(body),
                _ => {}
            }
        }
    }

    pub(crate) fn process(&mut self, stmts: &[StmtNode]) {
        for node in stmts {
            self.process_stmt(node);
        }
    }

    fn process_stmt(&mut self, node: &StmtNode) {
        match &node.stmt {
            Stmt::Label { name, local } => {
                // Local labels live under their spelled `@name` so plain
                // lookups never see them.
                if *local {
                    let key = format!("@{}", name);
                    self.define_label(&key, &node.loc);
                } else {
                    self.define_label(name, &node.loc);
                }
            }
            Stmt::Instruction { mnemonic, operand } => {
                self.emit_instruction(*mnemonic, operand, &node.loc)
            }
            Stmt::Byte(exprs) => self.emit_byte_dir(exprs),
            Stmt::Word(exprs) => self.emit_word_dir(exprs),
            Stmt::Fill { count, value } => self.emit_fill(count, value.as_ref(), &node.loc),
            Stmt::Text(exprs) => self.emit_text_dir(exprs),
            Stmt::BinaryInclude { path, size, offset } => {
                self.emit_binary(path, size.as_ref(), offset.as_ref(), &node.loc)
            }
            Stmt::If {
                branches,
                else_body,
            } => self.process_if(branches, else_body, &node.loc),
            Stmt::For {
                var,
                iterable,
                body,
            } => self.process_for(var, iterable, body, &node.loc),
            Stmt::MacroDef(def) => {
                self.symtab.define_macro(self.scope, def.clone(), self.scope)
            }
            Stmt::MacroCall { path, args } => self.process_call(path, args, &node.loc),
            Stmt::Scope { name, body } => {
                let saved = self.scope;
                self.enter_scope(name.as_deref(), &node.loc);
                self.process(body);
                self.scope = saved;
            }
            Stmt::Let { name, value } => self.process_let(name, value, &node.loc),
            Stmt::Include { body, .. } => self.process(body),
            Stmt::SegmentSwitch { name } => self.switch_segment(name),
            Stmt::SetPc { value } => self.set_pc(value, &node.loc),
            Stmt::Align { value } => self.align(value, &node.loc),
        }
    }

    /// Enters (creating on first visit) the scope of a `!scope` block.
    /// Anonymous blocks are keyed by source position so reruns and the
    /// collect walk agree on identity.
    fn enter_scope(&mut self, name: Option<&str>, loc: &Loc) -> ScopeId {
        let (key, kind) = match name {
            Some(name) => (name.to_owned(), ScopeKind::Named),
            None => (anon_key(loc, 0), ScopeKind::Anonymous),
        };
        let child = self.symtab.ensure_child(
            self.scope,
            &key,
            name.map(str::to_owned),
            kind,
        );
        self.scope = child;
        child
    }

    fn define_label(&mut self, name: &str, loc: &Loc) {
        let address = self.pc() as i64;
        match self
            .symtab
            .define_label(self.scope, name, address, self.cur_seg, *loc)
        {
            Defined::Ok { changed, .. } => {
                self.changed |= changed;
                if self.final_pass && Builtin::lookup(name).is_some() {
                    self.warning(
                        loc,
                        format!("Label \"{}\" shadows a built-in function", name),
                    );
                }
            }
            Defined::Duplicate { original } => {
                self.error(
                    loc,
                    format!(
                        "Duplicate symbol \"{}\" (first defined on line {})",
                        name, original.line
                    ),
                );
            }
        }
    }

    fn process_let(&mut self, name: &str, value: &ExprNode, loc: &Loc) {
        let evaluated = match self.eval(value) {
            Some(Evaluated::Known(v)) => Some(v),
            _ => None,
        };
        match self.symtab.define_constant(self.scope, name, evaluated, *loc) {
            Defined::Ok { changed, .. } => {
                self.changed |= changed;
                if self.final_pass && Builtin::lookup(name).is_some() {
                    self.warning(
                        loc,
                        format!("Constant \"{}\" shadows a built-in function", name),
                    );
                }
            }
            Defined::Duplicate { original } => {
                self.error(
                    loc,
                    format!(
                        "Duplicate symbol \"{}\" (first defined on line {})",
                        name, original.line
                    ),
                );
            }
        }
    }

    fn process_if(
        &mut self,
        branches: &[(ExprNode, Vec<StmtNode>)],
        else_body: &[StmtNode],
        loc: &Loc,
    ) {
        for (index, (cond, body)) in branches.iter().enumerate() {
            let value = match self.eval(cond) {
                Some(Evaluated::Known(value)) => value,
                Some(Evaluated::Unknown) => {
                    // Unknown condition: treat the whole statement as not
                    // taken this pass; a later pass reconsiders.
                    if self.final_pass {
                        self.error(&cond.loc, "!if condition could not be resolved");
                    }
                    return;
                }
                None => return,
            };
            let truthy = {
                let mut ev = self.evaluator();
                ev.truthy(&value, cond.loc)
            };
            match truthy {
                Some(true) => {
                    self.run_block(body, &anon_key(loc, index as u32 + 1));
                    return;
                }
                Some(false) => continue,
                None => return,
            }
        }
        self.run_block(else_body, &anon_key(loc, 0));
    }

    fn run_block(&mut self, body: &[StmtNode], key: &str) {
        if body.is_empty() {
            return;
        }
        let child = self
            .symtab
            .ensure_child(self.scope, key, None, ScopeKind::Anonymous);
        let saved = self.scope;
        self.scope = child;
        self.process(body);
        self.scope = saved;
    }

    fn process_for(&mut self, var: &str, iterable: &ExprNode, body: &[StmtNode], loc: &Loc) {
        let items: Vec<Value> = match self.eval(iterable) {
            Some(Evaluated::Known(Value::Int(count))) => {
                if count < 0 {
                    self.error(&iterable.loc, "!for count must not be negative");
                    return;
                }
                if count > MAX_FOR_ITERATIONS {
                    self.error(&iterable.loc, "!for count is too large");
                    return;
                }
                (0..count).map(Value::Int).collect()
            }
            Some(Evaluated::Known(Value::Array(items))) => items.as_ref().clone(),
            Some(Evaluated::Known(other)) => {
                self.error(
                    &iterable.loc,
                    format!("Cannot iterate a value of type {}", other.type_name()),
                );
                return;
            }
            Some(Evaluated::Unknown) => {
                if self.final_pass {
                    self.error(&iterable.loc, "!for range could not be resolved");
                }
                return;
            }
            None => return,
        };

        for (index, item) in items.into_iter().enumerate() {
            let key = anon_key(loc, index as u32);
            let child = self
                .symtab
                .ensure_child(self.scope, &key, None, ScopeKind::Anonymous);
            let saved = self.scope;
            self.scope = child;
            self.symtab.define_constant(child, var, Some(item), *loc);
            self.process(body);
            self.scope = saved;
        }
    }

    fn process_call(&mut self, path: &[String], args: &[ExprNode], loc: &Loc) {
        let (def, captured) = match self.symtab.lookup_path(self.scope, path) {
            Some(Symbol::Macro(m)) => (m.def.clone(), m.captured),
            Some(other) => {
                let kind = other.kind_name();
                self.error(
                    loc,
                    format!("\"{}\" is a {}, not a macro", path.join("::"), kind),
                );
                return;
            }
            None => {
                if self.final_pass {
                    self.error(loc, format!("Unknown macro \"+{}\"", path.join("::")));
                } else {
                    self.unresolved = true;
                }
                return;
            }
        };

        if args.len() != def.params.len() {
            self.error(
                loc,
                format!(
                    "Macro \"{}\" expects {} argument(s), got {}",
                    def.name,
                    def.params.len(),
                    args.len()
                ),
            );
            return;
        }
        if self.call_locs.len() >= MAX_MACRO_DEPTH {
            self.error(loc, format!("Macro recursion deeper than {}", MAX_MACRO_DEPTH));
            return;
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match self.eval(arg) {
                Some(Evaluated::Known(value)) => Some(value),
                _ => None,
            });
        }

        // Fresh invocation scope under the *defining* scope: free names in
        // the body resolve where the macro was written, and labels defined
        // by different calls never collide.
        self.invocation += 1;
        let key = format!("{}#{}", def.name, self.invocation);
        let child =
            self.symtab
                .ensure_child(captured, &key, Some(key.clone()), ScopeKind::Invocation);
        for (param, value) in def.params.iter().zip(values) {
            self.symtab.define_constant(child, param, value, *loc);
        }

        let saved = self.scope;
        self.scope = child;
        self.call_locs.push(*loc);
        self.process(&def.body);
        self.call_locs.pop();
        self.scope = saved;
    }

    fn switch_segment(&mut self, name: &str) {
        if let Some(&index) = self.seg_index.get(name) {
            self.cur_seg = index;
            return;
        }
        let index = self.segments.len();
        self.segments.push(Segment {
            name: name.to_owned(),
            start: None,
            buf: Vec::new(),
        });
        self.seg_index.insert(name.to_owned(), index);
        self.cur_seg = index;
    }

    fn set_pc(&mut self, value: &ExprNode, loc: &Loc) {
        match self.eval_int(value) {
            Some(IntVal::Known(v)) => {
                if !(0..=0xFFFF).contains(&v) {
                    self.error(loc, format!("Program counter {} out of range", v));
                    return;
                }
                if self.segments[self.cur_seg].buf.is_empty() {
                    self.segments[self.cur_seg].start = Some(v as u16);
                } else {
                    let pc = self.pc() as i64;
                    if v < pc {
                        self.error(loc, "Cannot move the program counter backwards");
                    } else if v > pc {
                        let pad = vec![0u8; (v - pc) as usize];
                        self.push_bytes(loc, false, &pad);
                    }
                }
            }
            Some(IntVal::Unknown) => {
                if self.final_pass {
                    self.error(loc, "Program counter expression could not be resolved");
                }
            }
            None => {}
        }
    }

    fn align(&mut self, value: &ExprNode, loc: &Loc) {
        match self.eval_int(value) {
            Some(IntVal::Known(n)) => {
                if n <= 0 {
                    self.error(loc, "!align expects a positive value");
                    return;
                }
                if n > 0x10000 {
                    self.error(loc, "!align boundary is too large");
                    return;
                }
                let pc = self.pc() as i64;
                let pad = (n - pc % n) % n;
                if pad > 0 {
                    let zeros = vec![0u8; pad as usize];
                    self.push_bytes(loc, false, &zeros);
                }
            }
            Some(IntVal::Unknown) => {
                if self.final_pass {
                    self.error(loc, "!align expression could not be resolved");
                }
            }
            None => {}
        }
    }

    /// Gives the active segment its start address on first emission. The
    /// default segment additionally receives the BASIC stub unless the
    /// source already placed the program counter itself.
    fn ensure_started(&mut self, loc: &Loc) {
        if self.segments[self.cur_seg].start.is_some() {
            return;
        }
        if self.cur_seg == 0 {
            self.segments[0].start = Some(prgfile::DEFAULT_LOAD_ADDRESS);
            let stub = self.stub_bytes.clone();
            self.segments[0].buf.extend_from_slice(&stub);
            self.debug.record(0, 0, stub.len(), false, vec![*loc]);
        } else {
            self.segments[self.cur_seg].start = Some(0);
        }
    }

    pub(crate) fn push_bytes(&mut self, loc: &Loc, instruction: bool, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.ensure_started(loc);

        if self.pc() as usize + bytes.len() > 0x10000 {
            if !self.overflowed {
                self.error(loc, "Program counter exceeds $ffff");
                self.overflowed = true;
            }
            return;
        }

        let mut locs = Vec::with_capacity(1 + self.call_locs.len());
        locs.push(*loc);
        locs.extend(self.call_locs.iter().rev().cloned());

        let segment = &mut self.segments[self.cur_seg];
        let offset = segment.buf.len();
        segment.buf.extend_from_slice(bytes);
        self.debug
            .record(self.cur_seg, offset, bytes.len(), instruction, locs);
    }

    pub(crate) fn read_binary(&mut self, full: &Path) -> Option<Rc<Vec<u8>>> {
        if let Some(cached) = self.binary_cache.get(full) {
            return cached.clone();
        }
        let loaded = match self.reader.read(full) {
            Ok(bytes) => Some(Rc::new(bytes)),
            Err(_) => None,
        };
        self.binary_cache.insert(full.to_path_buf(), loaded.clone());
        loaded
    }

    /// Tracks the byte width this instruction chose; a difference from the
    /// previous pass marks the pass unstable.
    pub(crate) fn note_width(&mut self, len: u8) {
        let index = self.widths.len();
        if self.prev_widths.get(index) != Some(&len) {
            self.changed = true;
        }
        self.widths.push(len);
    }

    /// Width this instruction had in the previous pass, if any.
    pub(crate) fn prev_width(&self) -> Option<u8> {
        self.prev_widths.get(self.widths.len()).copied()
    }
}

fn anon_key(loc: &Loc, discriminant: u32) -> String {
    format!("#{}:{}:{}", loc.file.0, loc.start, discriminant)
}
