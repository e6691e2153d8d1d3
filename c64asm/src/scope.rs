//! The scope tree and the symbols that live in it.
//!
//! Scopes form a tree rooted at the program. The tree is built once (during
//! the collect walk and, for macro invocations and control-flow bodies, on
//! first traversal) and persists across passes; only symbol *values* change
//! per pass. Each symbol keeps its value from the previous pass next to the
//! current one, which is what lets forward references resolve mid-pass and
//! what drives the fixpoint test.

use crate::ast::MacroDef;
use crate::source::Loc;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScopeId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    Root,
    /// Explicit named `!scope` block.
    Named,
    /// Per-call macro invocation scope.
    Invocation,
    /// Unnamed `!scope`, `!if` branch, or `!for` iteration.
    Anonymous,
}

pub struct Scope {
    pub name: Option<String>,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
    children: HashMap<String, ScopeId>,
}

#[derive(Debug)]
pub enum Symbol {
    Label(LabelSym),
    Constant(ConstSym),
    Macro(MacroSym),
}

impl Symbol {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Label(_) => "label",
            Symbol::Constant(_) => "constant",
            Symbol::Macro(_) => "macro",
        }
    }

    pub fn defined_at(&self) -> Loc {
        match self {
            Symbol::Label(l) => l.loc,
            Symbol::Constant(c) => c.loc,
            Symbol::Macro(m) => m.loc,
        }
    }
}

#[derive(Debug)]
pub struct LabelSym {
    pub cur: Option<i64>,
    pub prev: Option<i64>,
    pub loc: Loc,
    pub segment: usize,
}

#[derive(Debug)]
pub struct ConstSym {
    pub cur: Option<Value>,
    pub prev: Option<Value>,
    pub loc: Loc,
}

#[derive(Debug)]
pub struct MacroSym {
    pub def: Rc<MacroDef>,
    pub captured: ScopeId,
    pub loc: Loc,
}

/// Result of (re-)defining a label or constant during a pass.
#[derive(Debug, PartialEq)]
pub enum Defined {
    /// Newly defined this pass; `changed` is set when the value differs
    /// from the previous pass.
    Ok { changed: bool },
    /// Already defined this pass in the same scope.
    Duplicate { original: Loc },
}

#[derive(Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        let mut table = SymbolTable { scopes: Vec::new() };
        table.scopes.push(Scope {
            name: None,
            kind: ScopeKind::Root,
            parent: None,
            symbols: HashMap::new(),
            children: HashMap::new(),
        });
        table
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Fetches or creates the child scope of `parent` stored under `key`.
    /// Keys are stable across passes so that reruns reuse scope identities.
    pub fn ensure_child(
        &mut self,
        parent: ScopeId,
        key: &str,
        name: Option<String>,
        kind: ScopeKind,
    ) -> ScopeId {
        if let Some(&existing) = self.scopes[parent.0].children.get(key) {
            return existing;
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name,
            kind,
            parent: Some(parent),
            symbols: HashMap::new(),
            children: HashMap::new(),
        });
        self.scopes[parent.0].children.insert(key.to_owned(), id);
        id
    }

    /// Starts a new pass: every label and constant value becomes the
    /// "previous pass" value and the current slot empties.
    pub fn begin_pass(&mut self) {
        for scope in &mut self.scopes {
            for symbol in scope.symbols.values_mut() {
                match symbol {
                    Symbol::Label(label) => label.prev = label.cur.take(),
                    Symbol::Constant(constant) => constant.prev = constant.cur.take(),
                    Symbol::Macro(_) => {}
                }
            }
        }
    }

    /// Unqualified lookup: the scope itself, then its ancestors.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(symbol);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Lookup for `@name`: stops at the nearest non-anonymous scope, so
    /// locals never leak past it.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(symbol);
            }
            if self.scopes[id.0].kind != ScopeKind::Anonymous {
                return None;
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Qualified lookup `outer::...::name`: walks outward until a scope
    /// named `outer` is reachable, then descends the remaining path.
    pub fn lookup_path(&self, scope: ScopeId, path: &[String]) -> Option<&Symbol> {
        if path.len() == 1 {
            return self.lookup(scope, &path[0]);
        }

        let mut current = Some(scope);
        while let Some(id) = current {
            let target = if self.scopes[id.0].children.contains_key(&path[0]) {
                Some(self.scopes[id.0].children[&path[0]])
            } else if self.scopes[id.0].name.as_deref() == Some(path[0].as_str()) {
                Some(id)
            } else {
                None
            };

            if let Some(mut walk) = target {
                for segment in &path[1..path.len() - 1] {
                    walk = *self.scopes[walk.0].children.get(segment)?;
                }
                return self.scopes[walk.0].symbols.get(&path[path.len() - 1]);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    pub fn define_label(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: i64,
        segment: usize,
        loc: Loc,
    ) -> Defined {
        let symbols = &mut self.scopes[scope.0].symbols;
        match symbols.get_mut(name) {
            Some(Symbol::Label(label)) => {
                if label.cur.is_some() {
                    return Defined::Duplicate { original: label.loc };
                }
                let changed = label.prev != Some(value);
                label.cur = Some(value);
                label.segment = segment;
                label.loc = loc;
                Defined::Ok { changed }
            }
            Some(other) => Defined::Duplicate {
                original: other.defined_at(),
            },
            None => {
                symbols.insert(
                    name.to_owned(),
                    Symbol::Label(LabelSym {
                        cur: Some(value),
                        prev: None,
                        loc,
                        segment,
                    }),
                );
                Defined::Ok { changed: true }
            }
        }
    }

    pub fn define_constant(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Option<Value>,
        loc: Loc,
    ) -> Defined {
        let symbols = &mut self.scopes[scope.0].symbols;
        match symbols.get_mut(name) {
            Some(Symbol::Constant(constant)) => {
                if constant.cur.is_some() {
                    return Defined::Duplicate {
                        original: constant.loc,
                    };
                }
                let changed = constant.prev != value;
                constant.cur = value;
                constant.loc = loc;
                Defined::Ok { changed }
            }
            Some(other) => Defined::Duplicate {
                original: other.defined_at(),
            },
            None => {
                symbols.insert(
                    name.to_owned(),
                    Symbol::Constant(ConstSym {
                        cur: value,
                        prev: None,
                        loc,
                    }),
                );
                Defined::Ok { changed: true }
            }
        }
    }

    pub fn define_macro(&mut self, scope: ScopeId, def: Rc<MacroDef>, captured: ScopeId) {
        let name = def.name.clone();
        let loc = def.loc;
        self.scopes[scope.0].symbols.entry(name).or_insert_with(|| {
            Symbol::Macro(MacroSym {
                def,
                captured,
                loc,
            })
        });
    }

    /// Scope-path prefix (`outer::inner::`) for symbols in `scope`; empty
    /// at the root.
    pub fn path_of(&self, scope: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(name) = &self.scopes[id.0].name {
                parts.push(name.clone());
            } else if self.scopes[id.0].kind == ScopeKind::Anonymous {
                parts.push("<anon>".to_owned());
            }
            current = self.scopes[id.0].parent;
        }
        parts.reverse();
        parts.join("::")
    }

    /// Visits every label and constant with its scope-qualified name.
    pub fn for_each_symbol<F: FnMut(String, &Symbol)>(&self, mut visit: F) {
        for (index, scope) in self.scopes.iter().enumerate() {
            let prefix = self.path_of(ScopeId(index));
            let mut names: Vec<&String> = scope.symbols.keys().collect();
            names.sort();
            for name in names {
                let qualified = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}::{}", prefix, name)
                };
                visit(qualified, &scope.symbols[name]);
            }
        }
    }
}
