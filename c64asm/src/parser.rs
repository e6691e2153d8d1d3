//! Parsing and lowering of source text into the AST.
//!
//! The grammar lives in `c64asm.pest`. Parsing runs per file; on a syntax
//! error the parser reports a diagnostic and resumes at the next line break,
//! so a single run collects as many syntax errors as possible. `!include`
//! directives are resolved here, inlining the included file's statements
//! (with their own file id) into the AST.

use crate::ast::*;
use crate::diag::Diagnostic;
use crate::source::{FileId, Loc, SourceReader, SourceSet};
use matches::debug_assert_matches;
use mos6502::Mnemonic;
use pest::error::{Error as PestError, ErrorVariant, InputLocation};
use pest::iterators::Pair;
use pest::{Parser, Span};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(pest_derive::Parser)]
#[grammar = "c64asm.pest"]
pub struct AsmParser;

const MAX_INCLUDE_DEPTH: usize = 64;

pub struct ParseOutput {
    pub stmts: Vec<StmtNode>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses `text` as the root source file named `path`. Included files are
/// loaded through `reader`.
pub fn parse_source(
    sources: &mut SourceSet,
    reader: &mut dyn SourceReader,
    path: &Path,
    text: String,
) -> ParseOutput {
    let file = sources.add(path.to_path_buf(), text);
    let mut ctx = ParseCtx {
        sources,
        reader,
        diags: Vec::new(),
        include_stack: vec![path.to_path_buf()],
    };
    let stmts = parse_file(&mut ctx, file);
    ParseOutput {
        stmts,
        diagnostics: ctx.diags,
    }
}

struct ParseCtx<'a> {
    sources: &'a mut SourceSet,
    reader: &'a mut dyn SourceReader,
    diags: Vec<Diagnostic>,
    include_stack: Vec<PathBuf>,
}

/// Parses one file with error recovery: each failed parse reports a syntax
/// error and retries from the line after the failure position.
fn parse_file(ctx: &mut ParseCtx, file: FileId) -> Vec<StmtNode> {
    let text = ctx.sources.get(file).text().to_owned();
    let mut stmts = Vec::new();
    let mut base = 0usize;

    loop {
        match AsmParser::parse(Rule::program, &text[base..]) {
            Ok(mut pairs) => {
                let program = pairs.next().unwrap();
                let mut lower = Lowerer {
                    ctx: &mut *ctx,
                    file,
                    base,
                };
                stmts.extend(lower.program(program));
                break;
            }
            Err(error) => {
                let offset = base + error_offset(&error);
                let loc = ctx.sources.loc(file, offset, offset);
                ctx.diags.push(Diagnostic::error(
                    loc,
                    format!("Syntax error: {}", error_detail(&error)),
                ));

                // Keep the statements preceding the failing line, when they
                // form a complete program on their own.
                let line_start = text[..offset]
                    .rfind(|c| c == '\n' || c == '\r')
                    .map(|i| i + 1)
                    .unwrap_or(0);
                if line_start > base {
                    if let Ok(mut pairs) = AsmParser::parse(Rule::program, &text[base..line_start])
                    {
                        let program = pairs.next().unwrap();
                        let mut lower = Lowerer {
                            ctx: &mut *ctx,
                            file,
                            base,
                        };
                        stmts.extend(lower.program(program));
                    }
                }

                match next_line_start(&text, offset) {
                    Some(next) => base = next,
                    None => break,
                }
            }
        }
    }

    stmts
}

fn error_offset(error: &PestError<Rule>) -> usize {
    match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    }
}

fn error_detail(error: &PestError<Rule>) -> String {
    match &error.variant {
        ErrorVariant::CustomError { message } => message.clone(),
        ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            let expected: Vec<String> = positives.iter().map(|r| format!("{:?}", r)).collect();
            format!("expected {}", expected.join(", "))
        }
        _ => "unexpected input".to_owned(),
    }
}

fn next_line_start(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = from;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' => return Some(index + 1),
            b'\r' => {
                if bytes.get(index + 1) == Some(&b'\n') {
                    return Some(index + 2);
                }
                return Some(index + 1);
            }
            _ => index += 1,
        }
    }
    None
}

struct Lowerer<'a, 'c> {
    ctx: &'a mut ParseCtx<'c>,
    file: FileId,
    /// Byte offset of the parsed slice within the file (non-zero after
    /// error recovery).
    base: usize,
}

impl<'a, 'c> Lowerer<'a, 'c> {
    fn loc_of(&self, span: &Span) -> Loc {
        self.ctx
            .sources
            .loc(self.file, self.base + span.start(), self.base + span.end())
    }

    fn error<M: Into<String>>(&mut self, loc: Loc, message: M) {
        self.ctx.diags.push(Diagnostic::error(loc, message));
    }

    fn program(&mut self, pair: Pair<Rule>) -> Vec<StmtNode> {
        debug_assert_matches!(pair.as_rule(), Rule::program);
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::item)
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|p| self.item(p))
            .collect()
    }

    fn block(&mut self, pair: Pair<Rule>) -> Vec<StmtNode> {
        debug_assert_matches!(pair.as_rule(), Rule::block);
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::item)
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|p| self.item(p))
            .collect()
    }

    fn item(&mut self, pair: Pair<Rule>) -> Option<StmtNode> {
        let inner = pair.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::label_def => {
                let label = inner.into_inner().next().unwrap();
                let local = label.as_rule() == Rule::label_local;
                let loc = self.loc_of(&label.as_span());
                let name = label.into_inner().next().unwrap().as_str().to_owned();
                Some(StmtNode {
                    stmt: Stmt::Label { name, local },
                    loc,
                })
            }
            Rule::statement => self.statement(inner),
            _ => unreachable!(),
        }
    }

    fn statement(&mut self, pair: Pair<Rule>) -> Option<StmtNode> {
        let loc = self.loc_of(&pair.as_span());
        let inner = pair.into_inner().next().unwrap();
        let stmt = match inner.as_rule() {
            Rule::directive => return self.directive(inner, loc),
            Rule::macro_call => {
                let mut path = Vec::new();
                let mut args = Vec::new();
                for p in inner.into_inner().collect::<Vec<_>>() {
                    match p.as_rule() {
                        Rule::qualified => {
                            path = p.into_inner().map(|s| s.as_str().to_owned()).collect()
                        }
                        Rule::expr_list => args = self.expr_list(p)?,
                        _ => unreachable!(),
                    }
                }
                Stmt::MacroCall { path, args }
            }
            Rule::pc_assign => {
                let value = self.expr(inner.into_inner().next().unwrap())?;
                Stmt::SetPc { value }
            }
            Rule::assignment => {
                let mut pairs = inner.into_inner();
                let name = pairs.next().unwrap().as_str().to_owned();
                let value = self.expr(pairs.next().unwrap())?;
                Stmt::Let { name, value }
            }
            Rule::instruction => return self.instruction(inner, loc),
            _ => unreachable!(),
        };
        Some(StmtNode { stmt, loc })
    }

    fn instruction(&mut self, pair: Pair<Rule>, loc: Loc) -> Option<StmtNode> {
        let mut pairs = pair.into_inner();
        let ident = pairs.next().unwrap();
        let name = ident.as_str().to_owned();
        let operand_pair = pairs.next();

        match name.parse::<Mnemonic>() {
            Ok(mnemonic) => {
                let operand = match operand_pair {
                    Some(p) => self.operand(p)?,
                    None => Operand::None,
                };
                Some(StmtNode {
                    stmt: Stmt::Instruction { mnemonic, operand },
                    loc,
                })
            }
            // A lone identifier that is no mnemonic defines a label.
            Err(_) if operand_pair.is_none() => Some(StmtNode {
                stmt: Stmt::Label { name, local: false },
                loc,
            }),
            Err(_) => {
                self.error(loc, format!("Unknown mnemonic \"{}\"", name));
                None
            }
        }
    }

    fn operand(&mut self, pair: Pair<Rule>) -> Option<Operand> {
        debug_assert_matches!(pair.as_rule(), Rule::operand);
        let inner = pair.into_inner().next().unwrap();
        let rule = inner.as_rule();
        let mut pairs = inner.into_inner();

        Some(match rule {
            Rule::immediate => Operand::Immediate(self.expr(pairs.next().unwrap())?),
            Rule::ind_x => Operand::IndirectX(self.expr(pairs.next().unwrap())?),
            Rule::ind_y => Operand::IndirectY(self.expr(pairs.next().unwrap())?),
            Rule::indirect => Operand::Indirect(self.expr(pairs.next().unwrap())?),
            Rule::indexed => {
                let value = self.expr(pairs.next().unwrap())?;
                let reg = pairs.next().unwrap().into_inner().next().unwrap();
                match reg.as_rule() {
                    Rule::reg_x => Operand::IndexedX(value),
                    Rule::reg_y => Operand::IndexedY(value),
                    _ => unreachable!(),
                }
            }
            Rule::bare => Operand::Bare(self.expr(pairs.next().unwrap())?),
            _ => unreachable!(),
        })
    }

    fn directive(&mut self, pair: Pair<Rule>, loc: Loc) -> Option<StmtNode> {
        let inner = pair.into_inner().next().unwrap();
        let rule = inner.as_rule();

        let stmt = match rule {
            Rule::dir_byte => Stmt::Byte(self.expr_list(self.find_child(&inner, Rule::expr_list))?),
            Rule::dir_word => Stmt::Word(self.expr_list(self.find_child(&inner, Rule::expr_list))?),
            Rule::dir_text => Stmt::Text(self.expr_list(self.find_child(&inner, Rule::expr_list))?),
            Rule::dir_fill => {
                let mut exprs = self.child_exprs(inner)?;
                let count = exprs.remove(0);
                let value = exprs.pop();
                Stmt::Fill { count, value }
            }
            Rule::dir_binary => {
                let mut path = None;
                let mut exprs = Vec::new();
                for p in inner.into_inner().collect::<Vec<_>>() {
                    match p.as_rule() {
                        Rule::string => path = Some(self.string_value(p)?),
                        Rule::expr => exprs.push(self.expr(p)?),
                        _ => {}
                    }
                }
                let mut exprs = exprs.into_iter();
                Stmt::BinaryInclude {
                    path: path.unwrap(),
                    size: exprs.next(),
                    offset: exprs.next(),
                }
            }
            Rule::dir_include => {
                let string = self.find_child(&inner, Rule::string);
                let path = self.string_value(string)?;
                let body = self.include(&path, loc);
                Stmt::Include { path, body }
            }
            Rule::dir_if => {
                let (branches, else_body) = self.if_directive(inner)?;
                Stmt::If {
                    branches,
                    else_body,
                }
            }
            Rule::dir_for => {
                let mut var = String::new();
                let mut iterable = None;
                let mut body = Vec::new();
                for p in inner.into_inner().collect::<Vec<_>>() {
                    match p.as_rule() {
                        Rule::identifier => var = p.as_str().to_owned(),
                        Rule::expr => iterable = Some(self.expr(p)?),
                        Rule::block => body = self.block(p),
                        _ => {}
                    }
                }
                Stmt::For {
                    var,
                    iterable: iterable.unwrap(),
                    body,
                }
            }
            Rule::dir_macro => {
                let mut name = String::new();
                let mut params = Vec::new();
                let mut body = Vec::new();
                for p in inner.into_inner().collect::<Vec<_>>() {
                    match p.as_rule() {
                        Rule::identifier => name = p.as_str().to_owned(),
                        Rule::param_list => {
                            params = p.into_inner().map(|i| i.as_str().to_owned()).collect()
                        }
                        Rule::block => body = self.block(p),
                        _ => {}
                    }
                }
                Stmt::MacroDef(Rc::new(MacroDef {
                    name,
                    params,
                    body,
                    loc,
                }))
            }
            Rule::dir_scope => {
                let mut name = None;
                let mut body = Vec::new();
                for p in inner.into_inner().collect::<Vec<_>>() {
                    match p.as_rule() {
                        Rule::identifier => name = Some(p.as_str().to_owned()),
                        Rule::block => body = self.block(p),
                        _ => {}
                    }
                }
                Stmt::Scope { name, body }
            }
            Rule::dir_let => {
                let mut pairs = inner
                    .into_inner()
                    .filter(|p| p.as_rule() != Rule::kw_let)
                    .collect::<Vec<_>>()
                    .into_iter();
                let name = pairs.next().unwrap().as_str().to_owned();
                let value = self.expr(pairs.next().unwrap())?;
                Stmt::Let { name, value }
            }
            Rule::dir_segment => {
                let name = self.find_child(&inner, Rule::identifier);
                Stmt::SegmentSwitch {
                    name: name.as_str().to_owned(),
                }
            }
            Rule::dir_align => {
                let value = self.expr(self.find_child(&inner, Rule::expr))?;
                Stmt::Align { value }
            }
            Rule::dir_unknown => {
                let text = inner.as_str();
                let name: String = text[1..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                self.error(loc, format!("Unknown directive \"!{}\"", name));
                return None;
            }
            _ => unreachable!(),
        };

        Some(StmtNode { stmt, loc })
    }

    fn if_directive(
        &mut self,
        pair: Pair<Rule>,
    ) -> Option<(Vec<(ExprNode, Vec<StmtNode>)>, Vec<StmtNode>)> {
        debug_assert_matches!(pair.as_rule(), Rule::dir_if);
        let mut branches = Vec::new();
        let mut else_body = Vec::new();

        let mut cond = None;
        for p in pair.into_inner().collect::<Vec<_>>() {
            match p.as_rule() {
                Rule::expr => cond = Some(self.expr(p)?),
                Rule::block => branches.push((cond.take().unwrap(), self.block(p))),
                Rule::else_clause => {
                    for e in p.into_inner().collect::<Vec<_>>() {
                        match e.as_rule() {
                            Rule::dir_if => {
                                let (more, tail) = self.if_directive(e)?;
                                branches.extend(more);
                                else_body = tail;
                            }
                            Rule::block => else_body = self.block(e),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Some((branches, else_body))
    }

    fn include(&mut self, path: &str, loc: Loc) -> Vec<StmtNode> {
        let full = self.ctx.sources.get(self.file).dir().join(path);

        if self.ctx.include_stack.iter().any(|p| p == &full) {
            self.error(loc, format!("Circular !include of \"{}\"", path));
            return Vec::new();
        }
        if self.ctx.include_stack.len() >= MAX_INCLUDE_DEPTH {
            self.error(loc, "!include nesting too deep".to_owned());
            return Vec::new();
        }

        let bytes = match self.ctx.reader.read(&full) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.error(loc, format!("Cannot read included file \"{}\"", path));
                return Vec::new();
            }
        };

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let id = self.ctx.sources.add(full.clone(), text);
        self.ctx.include_stack.push(full);
        let stmts = parse_file(&mut *self.ctx, id);
        self.ctx.include_stack.pop();
        stmts
    }

    fn find_child<'i>(&self, pair: &Pair<'i, Rule>, rule: Rule) -> Pair<'i, Rule> {
        pair.clone()
            .into_inner()
            .find(|p| p.as_rule() == rule)
            .unwrap()
    }

    fn child_exprs(&mut self, pair: Pair<Rule>) -> Option<Vec<ExprNode>> {
        let pairs: Vec<_> = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::expr)
            .collect();
        let mut exprs = Vec::with_capacity(pairs.len());
        for p in pairs {
            exprs.push(self.expr(p)?);
        }
        Some(exprs)
    }

    fn expr_list(&mut self, pair: Pair<Rule>) -> Option<Vec<ExprNode>> {
        debug_assert_matches!(pair.as_rule(), Rule::expr_list);
        let pairs: Vec<_> = pair.into_inner().collect();
        let mut exprs = Vec::with_capacity(pairs.len());
        for p in pairs {
            exprs.push(self.expr(p)?);
        }
        Some(exprs)
    }

    fn expr(&mut self, pair: Pair<Rule>) -> Option<ExprNode> {
        debug_assert_matches!(pair.as_rule(), Rule::expr);
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        for p in pair.into_inner().collect::<Vec<_>>() {
            match p.as_rule() {
                Rule::unary => operands.push(self.unary(p)?),
                rule => ops.push(binop_of(rule)),
            }
        }
        Some(fold_binary(operands, ops))
    }

    fn unary(&mut self, pair: Pair<Rule>) -> Option<ExprNode> {
        debug_assert_matches!(pair.as_rule(), Rule::unary);
        let loc = self.loc_of(&pair.as_span());
        let mut ops = Vec::new();
        let mut node = None;
        for p in pair.into_inner().collect::<Vec<_>>() {
            match p.as_rule() {
                Rule::un_neg => ops.push(UnOp::Neg),
                Rule::un_not => ops.push(UnOp::Not),
                Rule::un_bnot => ops.push(UnOp::BitNot),
                Rule::un_lo => ops.push(UnOp::Lo),
                Rule::un_hi => ops.push(UnOp::Hi),
                Rule::postfix => node = Some(self.postfix(p)?),
                _ => unreachable!(),
            }
        }
        let mut node = node.unwrap();
        for op in ops.into_iter().rev() {
            node = ExprNode {
                expr: Expr::Unary(op, Box::new(node)),
                loc,
            };
        }
        Some(node)
    }

    fn postfix(&mut self, pair: Pair<Rule>) -> Option<ExprNode> {
        debug_assert_matches!(pair.as_rule(), Rule::postfix);
        let pairs: Vec<_> = pair.into_inner().collect();
        let mut iter = pairs.into_iter();
        let mut node = self.primary(iter.next().unwrap())?;

        for p in iter {
            let loc = Loc::merge(node.loc, self.loc_of(&p.as_span()));
            let expr = match p.as_rule() {
                Rule::call_args => {
                    let args = match p.into_inner().next() {
                        Some(list) => self.expr_list(list)?,
                        None => Vec::new(),
                    };
                    Expr::Call(Box::new(node), args)
                }
                Rule::subscript => {
                    let index = self.expr(p.into_inner().next().unwrap())?;
                    Expr::Index(Box::new(node), Box::new(index))
                }
                Rule::member => {
                    let field = p.into_inner().next().unwrap().as_str().to_owned();
                    Expr::Member(Box::new(node), field)
                }
                _ => unreachable!(),
            };
            node = ExprNode { expr, loc };
        }

        Some(node)
    }

    fn primary(&mut self, pair: Pair<Rule>) -> Option<ExprNode> {
        let loc = self.loc_of(&pair.as_span());
        let expr = match pair.as_rule() {
            Rule::num_hex => Expr::Int(self.int_literal(&pair.as_str()[1..], 16, loc)?),
            Rule::num_bin => Expr::Int(self.int_literal(&pair.as_str()[1..], 2, loc)?),
            Rule::num_dec => match pair.as_str().parse::<i64>() {
                Ok(value) => Expr::Int(value),
                Err(_) => {
                    self.error(loc, "Integer literal out of range");
                    return None;
                }
            },
            Rule::char_lit => {
                let inner = &pair.as_str()[1..pair.as_str().len() - 1];
                let c = self.unescape(inner, loc)?.chars().next().unwrap();
                if !c.is_ascii() {
                    self.error(loc, "Non-ASCII character literal");
                    return None;
                }
                Expr::Int(c as i64)
            }
            Rule::string => Expr::Str(self.string_value(pair)?),
            Rule::array_lit => {
                let values = match pair.into_inner().next() {
                    Some(list) => self.expr_list(list)?,
                    None => Vec::new(),
                };
                Expr::Array(values)
            }
            Rule::object_lit => {
                let mut fields = Vec::new();
                for field in pair.into_inner().collect::<Vec<_>>() {
                    let mut pairs = field.into_inner();
                    let name = pairs.next().unwrap().as_str().to_owned();
                    let value = self.expr(pairs.next().unwrap())?;
                    fields.push((name, value));
                }
                Expr::Object(fields)
            }
            Rule::pc_ref => Expr::Pc,
            Rule::local_ref => {
                Expr::Local(pair.into_inner().next().unwrap().as_str().to_owned())
            }
            Rule::qualified => {
                Expr::Path(pair.into_inner().map(|p| p.as_str().to_owned()).collect())
            }
            Rule::paren_expr => return self.expr(pair.into_inner().next().unwrap()),
            _ => unreachable!(),
        };
        Some(ExprNode { expr, loc })
    }

    fn int_literal(&mut self, digits: &str, radix: u32, loc: Loc) -> Option<i64> {
        match u64::from_str_radix(digits, radix) {
            Ok(value) => Some(value as i64),
            Err(_) => {
                self.error(loc, "Integer literal out of range");
                None
            }
        }
    }

    fn string_value(&mut self, pair: Pair<Rule>) -> Option<String> {
        debug_assert_matches!(pair.as_rule(), Rule::string);
        let loc = self.loc_of(&pair.as_span());
        let text = pair.as_str();
        let inner = &text[1..text.len() - 1];
        self.unescape(inner, loc)
    }

    fn unescape(&mut self, text: &str, loc: Loc) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                other => {
                    let shown = other.map(|c| c.to_string()).unwrap_or_default();
                    self.error(loc, format!("Unknown escape sequence \"\\{}\"", shown));
                    return None;
                }
            }
        }
        Some(out)
    }
}

fn binop_of(rule: Rule) -> BinOp {
    match rule {
        Rule::op_lor => BinOp::Or,
        Rule::op_land => BinOp::And,
        Rule::op_bor => BinOp::BitOr,
        Rule::op_bxor => BinOp::BitXor,
        Rule::op_band => BinOp::BitAnd,
        Rule::op_eq => BinOp::Eq,
        Rule::op_ne => BinOp::Ne,
        Rule::op_lt => BinOp::Lt,
        Rule::op_le => BinOp::Le,
        Rule::op_gt => BinOp::Gt,
        Rule::op_ge => BinOp::Ge,
        Rule::op_shl => BinOp::Shl,
        Rule::op_shr => BinOp::Shr,
        Rule::op_add => BinOp::Add,
        Rule::op_sub => BinOp::Sub,
        Rule::op_mul => BinOp::Mul,
        Rule::op_div => BinOp::Div,
        Rule::op_mod => BinOp::Rem,
        _ => unreachable!(),
    }
}

/// Applies operator precedence over the flat operand/operator lists the
/// grammar yields (all operators left-associative).
fn fold_binary(operands: Vec<ExprNode>, ops: Vec<BinOp>) -> ExprNode {
    debug_assert_eq!(operands.len(), ops.len() + 1);
    let mut operands = operands.into_iter();
    let mut out = vec![operands.next().unwrap()];
    let mut op_stack: Vec<BinOp> = Vec::new();

    for op in ops {
        while let Some(&top) = op_stack.last() {
            if top.precedence() >= op.precedence() {
                op_stack.pop();
                reduce(&mut out, top);
            } else {
                break;
            }
        }
        op_stack.push(op);
        out.push(operands.next().unwrap());
    }
    while let Some(op) = op_stack.pop() {
        reduce(&mut out, op);
    }

    debug_assert_eq!(out.len(), 1);
    out.pop().unwrap()
}

fn reduce(out: &mut Vec<ExprNode>, op: BinOp) {
    let rhs = out.pop().unwrap();
    let lhs = out.pop().unwrap();
    let loc = Loc::merge(lhs.loc, rhs.loc);
    out.push(ExprNode {
        expr: Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
        loc,
    });
}
