//! The abstract syntax tree produced by the parser.
//!
//! Nodes are immutable after parse; the multi-pass driver walks them once
//! per pass. Every node carries the [`Loc`](../source/struct.Loc.html) of
//! the source text it came from.

use crate::source::Loc;
use mos6502::Mnemonic;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub expr: Expr,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Array(Vec<ExprNode>),
    Object(Vec<(String, ExprNode)>),
    /// `name` or `outer::inner`.
    Path(Vec<String>),
    /// `@name`, resolved within the enclosing non-anonymous scope.
    Local(String),
    /// `*`, the current program counter.
    Pc,
    Unary(UnOp, Box<ExprNode>),
    Binary(BinOp, Box<ExprNode>, Box<ExprNode>),
    Call(Box<ExprNode>, Vec<ExprNode>),
    Index(Box<ExprNode>, Box<ExprNode>),
    Member(Box<ExprNode>, String),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    /// Unary `<`: low byte.
    Lo,
    /// Unary `>`: high byte.
    Hi,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Binding strength, loosest first. All binary operators are
    /// left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::BitOr => 3,
            BinOp::BitXor => 4,
            BinOp::BitAnd => 5,
            BinOp::Eq | BinOp::Ne => 6,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 7,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 10,
        }
    }
}

/// The written shape of an instruction operand. The emitter maps shapes to
/// addressing modes once operand values are known.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    Immediate(ExprNode),
    Bare(ExprNode),
    IndexedX(ExprNode),
    IndexedY(ExprNode),
    Indirect(ExprNode),
    IndirectX(ExprNode),
    IndirectY(ExprNode),
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtNode {
    pub stmt: Stmt,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Label {
        name: String,
        local: bool,
    },
    Instruction {
        mnemonic: Mnemonic,
        operand: Operand,
    },
    Byte(Vec<ExprNode>),
    Word(Vec<ExprNode>),
    Fill {
        count: ExprNode,
        value: Option<ExprNode>,
    },
    Text(Vec<ExprNode>),
    BinaryInclude {
        path: String,
        size: Option<ExprNode>,
        offset: Option<ExprNode>,
    },
    /// `!if`/`else !if` chain: branches in source order, then the final
    /// `else` body (possibly empty).
    If {
        branches: Vec<(ExprNode, Vec<StmtNode>)>,
        else_body: Vec<StmtNode>,
    },
    For {
        var: String,
        iterable: ExprNode,
        body: Vec<StmtNode>,
    },
    MacroDef(Rc<MacroDef>),
    MacroCall {
        path: Vec<String>,
        args: Vec<ExprNode>,
    },
    Scope {
        name: Option<String>,
        body: Vec<StmtNode>,
    },
    Let {
        name: String,
        value: ExprNode,
    },
    /// `!include`, already inlined at parse time.
    Include {
        path: String,
        body: Vec<StmtNode>,
    },
    SegmentSwitch {
        name: String,
    },
    SetPc {
        value: ExprNode,
    },
    Align {
        value: ExprNode,
    },
}

#[derive(Debug, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<StmtNode>,
    pub loc: Loc,
}
