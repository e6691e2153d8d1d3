//! Compile-time expression evaluation.
//!
//! Evaluation happens against the symbol table of the running pass. An
//! identifier without a value yet yields [`Evaluated::Unknown`] instead of
//! an error; the driver records the pass as unresolved and retries on the
//! next one. On the final pass the same situation is a hard error. Integer
//! arithmetic is 64-bit two's complement and wraps.

use crate::ast::{BinOp, Expr, ExprNode, UnOp};
use crate::diag::Diagnostic;
use crate::petscii;
use crate::scope::{ScopeId, Symbol, SymbolTable};
use crate::source::Loc;
use crate::value::{Builtin, Value};

const MAX_RANGE_LEN: i64 = 1 << 20;

#[derive(Clone, Debug, PartialEq)]
pub enum Evaluated {
    Known(Value),
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IntVal {
    Known(i64),
    Unknown,
}

pub struct EvalCtx<'a> {
    pub symtab: &'a SymbolTable,
    pub scope: ScopeId,
    pub pc: i64,
    pub final_pass: bool,
    pub diags: &'a mut Vec<Diagnostic>,
    pub unresolved: &'a mut bool,
}

impl<'a> EvalCtx<'a> {
    fn error<M: Into<String>>(&mut self, loc: Loc, message: M) {
        self.diags.push(Diagnostic::error(loc, message));
    }

    fn unknown(&mut self) -> Option<Evaluated> {
        *self.unresolved = true;
        Some(Evaluated::Unknown)
    }

    /// Evaluates to a value, `Unknown`, or `None` after reporting an error.
    pub fn eval(&mut self, node: &ExprNode) -> Option<Evaluated> {
        match &node.expr {
            Expr::Int(value) => Some(Evaluated::Known(Value::Int(*value))),
            Expr::Str(text) => Some(Evaluated::Known(Value::string(text.clone()))),
            Expr::Pc => Some(Evaluated::Known(Value::Int(self.pc))),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.eval(item)? {
                        Evaluated::Known(value) => values.push(value),
                        Evaluated::Unknown => return Some(Evaluated::Unknown),
                    }
                }
                Some(Evaluated::Known(Value::array(values)))
            }
            Expr::Object(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    match self.eval(field)? {
                        Evaluated::Known(value) => values.push((name.clone(), value)),
                        Evaluated::Unknown => return Some(Evaluated::Unknown),
                    }
                }
                Some(Evaluated::Known(Value::Object(std::rc::Rc::new(values))))
            }
            Expr::Path(path) => self.resolve_path(path, node.loc),
            Expr::Local(name) => self.resolve_local(name, node.loc),
            Expr::Unary(op, inner) => {
                let value = match self.eval(inner)? {
                    Evaluated::Known(value) => value,
                    Evaluated::Unknown => return Some(Evaluated::Unknown),
                };
                self.unary(*op, value, node.loc).map(Evaluated::Known)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs_val = self.eval(lhs)?;
                let rhs_val = self.eval(rhs)?;
                match (lhs_val, rhs_val) {
                    (Evaluated::Known(l), Evaluated::Known(r)) => {
                        self.binary(*op, l, r, node.loc).map(Evaluated::Known)
                    }
                    _ => Some(Evaluated::Unknown),
                }
            }
            Expr::Call(callee, args) => {
                let callee_val = self.eval(callee)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval(arg)?);
                }
                match callee_val {
                    Evaluated::Known(Value::Callable(builtin)) => {
                        self.call_builtin(builtin, arg_vals, node.loc)
                    }
                    Evaluated::Known(other) => {
                        self.error(
                            callee.loc,
                            format!("Cannot call a value of type {}", other.type_name()),
                        );
                        None
                    }
                    Evaluated::Unknown => Some(Evaluated::Unknown),
                }
            }
            Expr::Index(target, index) => {
                let target_val = self.eval(target)?;
                let index_val = self.eval(index)?;
                match (target_val, index_val) {
                    (Evaluated::Known(t), Evaluated::Known(i)) => self.index(t, i, node.loc),
                    _ => Some(Evaluated::Unknown),
                }
            }
            Expr::Member(target, field) => match self.eval(target)? {
                Evaluated::Known(Value::Object(fields)) => {
                    match fields.iter().find(|(name, _)| name == field) {
                        Some((_, value)) => Some(Evaluated::Known(value.clone())),
                        None => {
                            self.error(node.loc, format!("Object has no field \"{}\"", field));
                            None
                        }
                    }
                }
                Evaluated::Known(other) => {
                    self.error(
                        node.loc,
                        format!("Cannot access field of {}", other.type_name()),
                    );
                    None
                }
                Evaluated::Unknown => Some(Evaluated::Unknown),
            },
        }
    }

    /// Evaluates and requires an integer.
    pub fn eval_int(&mut self, node: &ExprNode) -> Option<IntVal> {
        match self.eval(node)? {
            Evaluated::Known(Value::Int(value)) => Some(IntVal::Known(value)),
            Evaluated::Known(other) => {
                self.error(
                    node.loc,
                    format!("Expected integer, found {}", other.type_name()),
                );
                None
            }
            Evaluated::Unknown => Some(IntVal::Unknown),
        }
    }

    /// Boolean context: non-zero integers are true.
    pub fn truthy(&mut self, value: &Value, loc: Loc) -> Option<bool> {
        match value {
            Value::Int(v) => Some(*v != 0),
            other => {
                self.error(
                    loc,
                    format!("Expected integer condition, found {}", other.type_name()),
                );
                None
            }
        }
    }

    fn resolve_path(&mut self, path: &[String], loc: Loc) -> Option<Evaluated> {
        let symtab = self.symtab;
        let symbol = symtab.lookup_path(self.scope, path);
        let display = path.join("::");

        if symbol.is_none() && path.len() == 1 {
            if let Some(builtin) = Builtin::lookup(&path[0]) {
                return Some(Evaluated::Known(Value::Callable(builtin)));
            }
        }

        self.symbol_value(symbol, &display, loc)
    }

    fn resolve_local(&mut self, name: &str, loc: Loc) -> Option<Evaluated> {
        let display = format!("@{}", name);
        let symtab = self.symtab;
        let symbol = symtab.lookup_local(self.scope, &display);
        self.symbol_value(symbol, &display, loc)
    }

    fn symbol_value(
        &mut self,
        symbol: Option<&Symbol>,
        display: &str,
        loc: Loc,
    ) -> Option<Evaluated> {
        match symbol {
            Some(Symbol::Label(label)) => match label.cur.or(label.prev) {
                Some(value) => Some(Evaluated::Known(Value::Int(value))),
                None => self.no_value(display, loc),
            },
            Some(Symbol::Constant(constant)) => {
                match constant.cur.clone().or_else(|| constant.prev.clone()) {
                    Some(value) => Some(Evaluated::Known(value)),
                    None => self.no_value(display, loc),
                }
            }
            Some(Symbol::Macro(_)) => {
                self.error(
                    loc,
                    format!("Macro \"{}\" cannot be used in an expression", display),
                );
                None
            }
            None => {
                if self.final_pass {
                    self.error(loc, format!("Undefined symbol \"{}\"", display));
                    None
                } else {
                    self.unknown()
                }
            }
        }
    }

    fn no_value(&mut self, display: &str, loc: Loc) -> Option<Evaluated> {
        if self.final_pass {
            self.error(loc, format!("Symbol \"{}\" could not be resolved", display));
            None
        } else {
            self.unknown()
        }
    }

    fn unary(&mut self, op: UnOp, value: Value, loc: Loc) -> Option<Value> {
        let v = match value {
            Value::Int(v) => v,
            other => {
                self.error(
                    loc,
                    format!("Unary operator expects an integer, found {}", other.type_name()),
                );
                return None;
            }
        };
        Some(Value::Int(match op {
            UnOp::Neg => v.wrapping_neg(),
            UnOp::Not => (v == 0) as i64,
            UnOp::BitNot => !v,
            UnOp::Lo => v & 0xFF,
            UnOp::Hi => (v >> 8) & 0xFF,
        }))
    }

    fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value, loc: Loc) -> Option<Value> {
        // Equality is defined for every value type.
        match op {
            BinOp::Eq => return Some(Value::Int((lhs == rhs) as i64)),
            BinOp::Ne => return Some(Value::Int((lhs != rhs) as i64)),
            _ => {}
        }

        match (&lhs, &rhs) {
            (Value::Int(a), Value::Int(b)) => self.int_binary(op, *a, *b, loc),
            (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
                Some(Value::string(format!("{}{}", a, b)))
            }
            (Value::Array(a), Value::Array(b)) if op == BinOp::Add => {
                let mut joined = a.as_ref().clone();
                joined.extend(b.iter().cloned());
                Some(Value::array(joined))
            }
            _ => {
                self.error(
                    loc,
                    format!(
                        "Operator not defined for {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                );
                None
            }
        }
    }

    fn int_binary(&mut self, op: BinOp, a: i64, b: i64, loc: Loc) -> Option<Value> {
        let value = match op {
            BinOp::Or => ((a != 0) || (b != 0)) as i64,
            BinOp::And => ((a != 0) && (b != 0)) as i64,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            BinOp::BitAnd => a & b,
            BinOp::Lt => (a < b) as i64,
            BinOp::Le => (a <= b) as i64,
            BinOp::Gt => (a > b) as i64,
            BinOp::Ge => (a >= b) as i64,
            BinOp::Shl | BinOp::Shr => {
                if !(0..=63).contains(&b) {
                    self.error(loc, "Shift count out of range");
                    return None;
                }
                if op == BinOp::Shl {
                    a.wrapping_shl(b as u32)
                } else {
                    a.wrapping_shr(b as u32)
                }
            }
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div | BinOp::Rem => {
                if b == 0 {
                    self.error(loc, "Division by zero");
                    return None;
                }
                if op == BinOp::Div {
                    a.wrapping_div(b)
                } else {
                    a.wrapping_rem(b)
                }
            }
            BinOp::Eq | BinOp::Ne => unreachable!(),
        };
        Some(Value::Int(value))
    }

    fn index(&mut self, target: Value, index: Value, loc: Loc) -> Option<Evaluated> {
        let i = match index {
            Value::Int(i) => i,
            other => {
                self.error(
                    loc,
                    format!("Subscript expects an integer, found {}", other.type_name()),
                );
                return None;
            }
        };

        match target {
            Value::Array(values) => {
                if i < 0 || i as usize >= values.len() {
                    self.error(loc, format!("Array index {} out of range", i));
                    return None;
                }
                Some(Evaluated::Known(values[i as usize].clone()))
            }
            Value::Str(text) => {
                let bytes = text.as_bytes();
                if i < 0 || i as usize >= bytes.len() {
                    self.error(loc, format!("String index {} out of range", i));
                    return None;
                }
                Some(Evaluated::Known(Value::Int(i64::from(bytes[i as usize]))))
            }
            other => {
                self.error(
                    loc,
                    format!("Cannot subscript a value of type {}", other.type_name()),
                );
                None
            }
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Evaluated>,
        loc: Loc,
    ) -> Option<Evaluated> {
        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{} to {}", min, max)
            };
            self.error(
                loc,
                format!(
                    "{}() expects {} argument(s), got {}",
                    builtin.name(),
                    expected,
                    args.len()
                ),
            );
            return None;
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Evaluated::Known(value) => values.push(value),
                Evaluated::Unknown => return Some(Evaluated::Unknown),
            }
        }

        let result = match builtin {
            Builtin::Lo => Value::Int(self.int_arg(&values[0], loc)? & 0xFF),
            Builtin::Hi => Value::Int((self.int_arg(&values[0], loc)? >> 8) & 0xFF),
            Builtin::Len => match &values[0] {
                Value::Str(text) => Value::Int(text.len() as i64),
                Value::Array(items) => Value::Int(items.len() as i64),
                other => {
                    self.error(loc, format!("len() expects a string or array, found {}", other.type_name()));
                    return None;
                }
            },
            Builtin::Sizeof => Value::Int(self.sizeof(&values[0], loc)?),
            Builtin::Min => {
                let a = self.int_arg(&values[0], loc)?;
                let b = self.int_arg(&values[1], loc)?;
                Value::Int(a.min(b))
            }
            Builtin::Max => {
                let a = self.int_arg(&values[0], loc)?;
                let b = self.int_arg(&values[1], loc)?;
                Value::Int(a.max(b))
            }
            Builtin::Abs => Value::Int(self.int_arg(&values[0], loc)?.wrapping_abs()),
            Builtin::Range => self.range(&values, loc)?,
            Builtin::Petscii => match &values[0] {
                Value::Str(text) => match petscii::convert(text) {
                    Ok(bytes) => {
                        Value::array(bytes.into_iter().map(|b| Value::Int(i64::from(b))).collect())
                    }
                    Err(c) => {
                        self.error(loc, format!("Character {:?} has no PETSCII encoding", c));
                        return None;
                    }
                },
                other => {
                    self.error(loc, format!("petscii() expects a string, found {}", other.type_name()));
                    return None;
                }
            },
            Builtin::Bytes => match &values[0] {
                Value::Str(text) => Value::array(
                    text.as_bytes()
                        .iter()
                        .map(|&b| Value::Int(i64::from(b)))
                        .collect(),
                ),
                other => {
                    self.error(loc, format!("bytes() expects a string, found {}", other.type_name()));
                    return None;
                }
            },
            Builtin::String => match &values[0] {
                Value::Array(items) => {
                    let mut bytes = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        match item {
                            Value::Int(v) if (0..=255).contains(v) => bytes.push(*v as u8),
                            _ => {
                                self.error(loc, "string() expects an array of byte values");
                                return None;
                            }
                        }
                    }
                    Value::string(String::from_utf8_lossy(&bytes).into_owned())
                }
                other => {
                    self.error(loc, format!("string() expects an array, found {}", other.type_name()));
                    return None;
                }
            },
        };

        Some(Evaluated::Known(result))
    }

    fn int_arg(&mut self, value: &Value, loc: Loc) -> Option<i64> {
        match value {
            Value::Int(v) => Some(*v),
            other => {
                self.error(
                    loc,
                    format!("Expected integer argument, found {}", other.type_name()),
                );
                None
            }
        }
    }

    fn sizeof(&mut self, value: &Value, loc: Loc) -> Option<i64> {
        match value {
            Value::Int(_) => Some(1),
            Value::Str(text) => Some(text.len() as i64),
            Value::Array(items) => {
                let mut total = 0i64;
                for item in items.iter() {
                    total = total.wrapping_add(self.sizeof(item, loc)?);
                }
                Some(total)
            }
            other => {
                self.error(
                    loc,
                    format!("sizeof() is not defined for {}", other.type_name()),
                );
                None
            }
        }
    }

    fn range(&mut self, args: &[Value], loc: Loc) -> Option<Value> {
        let mut ints = Vec::with_capacity(args.len());
        for arg in args {
            ints.push(self.int_arg(arg, loc)?);
        }
        let (start, end, step) = match ints.len() {
            1 => (0, ints[0], 1),
            2 => (ints[0], ints[1], 1),
            _ => (ints[0], ints[1], ints[2]),
        };
        if step == 0 {
            self.error(loc, "range() step must not be zero");
            return None;
        }

        let span = (end - start).abs();
        if span / step.abs() > MAX_RANGE_LEN {
            self.error(loc, "range() is too large");
            return None;
        }

        let mut values = Vec::new();
        let mut current = start;
        while (step > 0 && current < end) || (step < 0 && current > end) {
            values.push(Value::Int(current));
            current += step;
        }
        Some(Value::array(values))
    }
}
