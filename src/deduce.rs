//! Best-effort type deduction from syntax alone.
//!
//! There is no type checker behind this: types come from declarations,
//! literals and a handful of builtin rules. Whatever cannot be deduced
//! becomes [`GoType::Unresolved`], which prints as a placeholder identifier
//! so the output still parses and the gap is easy to spot.

use std::collections::{HashMap, HashSet};
use std::fmt;

use go_syntax::ast::{
    AstArena, BasicLitKind, BinaryOp, ChanDir, Expr, ExprId, Field, FieldId, ForKind, FuncDeclId,
    GenDeclKind, Interner, ListRef, Signature, SignatureId, SimpleStmt, Spec, Stmt, Symbol,
    TopLevelDecl, Type, TypeId, UnaryOp,
};
use go_syntax::print::{print_expr, print_type};
use go_syntax::Document;
use smallvec::{smallvec, SmallVec};

use crate::scope::{BindingId, BindingKind, DeclSite, ScopeTable};

/// A Go type as far as it could be worked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    Named {
        pkg: Option<String>,
        name: String,
    },
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    /// `len` is the length expression as written.
    Array {
        len: Option<String>,
        elem: Box<GoType>,
    },
    Map {
        key: Box<GoType>,
        value: Box<GoType>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<GoType>,
    },
    /// With `variadic`, the last parameter is the element type of `...T`.
    Func {
        params: Vec<GoType>,
        results: Vec<GoType>,
        variadic: bool,
    },
    /// Struct and interface types, kept as printed.
    Literal(String),
    /// Printed as `Unresolved_<hint>`.
    Unresolved(String),
}

const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

const INTEGER_TYPES: &[&str] = &[
    "byte", "int", "int8", "int16", "int32", "int64", "rune", "uint", "uint8", "uint16", "uint32",
    "uint64", "uintptr",
];

impl GoType {
    pub fn named(name: &str) -> Self {
        Self::Named {
            pkg: None,
            name: name.to_owned(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    fn is_named(&self, want: &str) -> bool {
        matches!(self, Self::Named { pkg: None, name } if name == want)
    }

    fn is_integer(&self) -> bool {
        matches!(self, Self::Named { pkg: None, name } if INTEGER_TYPES.contains(&name.as_str()))
    }

    /// Builds fresh, not yet laid out type nodes for `self`.
    pub fn materialize(&self, arena: &mut AstArena, interner: &mut Interner) -> TypeId {
        let ty = match self {
            Self::Named { pkg, name } => Type::Named {
                pkg: pkg.as_deref().map(|p| interner.intern(p)),
                name: interner.intern(name),
            },
            Self::Pointer(t) => Type::Pointer(t.materialize(arena, interner)),
            Self::Slice(t) => Type::Slice(t.materialize(arena, interner)),
            Self::Array { len, elem } => {
                let len = len.as_deref().map(|l| {
                    let sym = interner.intern(l);
                    arena.exprs.alloc_fresh(Expr::Ident(sym))
                });
                Type::Array {
                    len,
                    elem: elem.materialize(arena, interner),
                }
            }
            Self::Map { key, value } => Type::Map {
                key: key.materialize(arena, interner),
                value: value.materialize(arena, interner),
            },
            Self::Chan { dir, elem } => Type::Chan {
                dir: *dir,
                elem: elem.materialize(arena, interner),
            },
            Self::Func {
                params,
                results,
                variadic,
            } => {
                let params = unnamed_fields(arena, interner, params, *variadic);
                let results = unnamed_fields(arena, interner, results, false);
                let sig = arena.signatures.alloc_fresh(Signature { params, results });
                Type::Func(sig)
            }
            Self::Literal(_) | Self::Unresolved(_) => Type::Named {
                pkg: None,
                name: interner.intern(&self.to_string()),
            },
        };
        arena.types.alloc_fresh(ty)
    }
}

fn unnamed_fields(
    arena: &mut AstArena,
    interner: &mut Interner,
    types: &[GoType],
    variadic: bool,
) -> ListRef<FieldId> {
    let fields: Vec<_> = types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let typ = t.materialize(arena, interner);
            arena.fields.alloc_fresh(Field {
                names: ListRef::EMPTY,
                typ,
                variadic: variadic && i + 1 == types.len(),
                tag: None,
            })
        })
        .collect();
    arena.list_fields(fields)
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { pkg: Some(pkg), name } => write!(f, "{pkg}.{name}"),
            Self::Named { pkg: None, name } => f.write_str(name),
            Self::Pointer(t) => write!(f, "*{t}"),
            Self::Slice(t) => write!(f, "[]{t}"),
            Self::Array { len: Some(len), elem } => write!(f, "[{len}]{elem}"),
            Self::Array { len: None, elem } => write!(f, "[...]{elem}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {elem}"),
                ChanDir::Send => write!(f, "chan<- {elem}"),
                ChanDir::Recv => write!(f, "<-chan {elem}"),
            },
            Self::Func {
                params,
                results,
                variadic,
            } => {
                f.write_str("func(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if *variadic && i + 1 == params.len() {
                        f.write_str("...")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")?;
                match results.as_slice() {
                    [] => Ok(()),
                    [one] => write!(f, " {one}"),
                    many => {
                        f.write_str(" (")?;
                        for (i, r) in many.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{r}")?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Self::Literal(text) => f.write_str(text),
            Self::Unresolved(hint) => write!(f, "Unresolved_{hint}"),
        }
    }
}

/// Deduces expression and variable types for one document.
pub struct TypeDeducer<'a> {
    doc: &'a Document,
    scopes: &'a ScopeTable,
    /// `(receiver type name, method name)` of every method in the file.
    methods: HashMap<(Symbol, Symbol), FuncDeclId>,
    /// File-level type declarations.
    types: HashMap<Symbol, TypeId>,
    /// Bindings whose type is being computed, to cut declaration cycles.
    visiting: HashSet<BindingId>,
}

impl<'a> TypeDeducer<'a> {
    pub fn new(doc: &'a Document, scopes: &'a ScopeTable) -> Self {
        let arena = &doc.arena;
        let mut methods = HashMap::new();
        let mut types = HashMap::new();
        for &d in arena.top_decls(doc.file.decls) {
            match d {
                TopLevelDecl::Func(id) => {
                    let f = arena.funcs[id];
                    let recv_type = f.recv.map(|r| arena.fields[r].typ).and_then(|mut t| {
                        if let Type::Pointer(inner) = arena.types[t] {
                            t = inner;
                        }
                        match arena.types[t] {
                            Type::Named { pkg: None, name } => Some(name),
                            _ => None,
                        }
                    });
                    if let Some(recv) = recv_type {
                        methods.insert((recv, f.name.sym), id);
                    }
                }
                TopLevelDecl::Decl(id) if arena.decls[id].kind == GenDeclKind::Type => {
                    for &spec in arena.specs_list(arena.decls[id].specs) {
                        if let Spec::Type { name, typ, .. } = arena.specs[spec] {
                            types.insert(name.sym, typ);
                        }
                    }
                }
                TopLevelDecl::Decl(_) => {}
            }
        }
        Self {
            doc,
            scopes,
            methods,
            types,
            visiting: HashSet::new(),
        }
    }

    fn arena(&self) -> &'a AstArena {
        &self.doc.arena
    }

    fn text(&self, sym: Symbol) -> &'a str {
        self.doc.interner.resolve(sym)
    }

    /// All values `e` produces: several for multi-result calls, none for
    /// calls without results.
    pub fn deduce(&mut self, e: ExprId) -> SmallVec<[GoType; 1]> {
        match self.arena().exprs[e] {
            Expr::Call { callee, args, .. } => self.call(e, callee, args),
            Expr::Paren(x) => self.deduce(x),
            _ => smallvec![self.deduce_one(e)],
        }
    }

    /// The type of `e` in a single-value context.
    pub fn deduce_one(&mut self, e: ExprId) -> GoType {
        let arena = self.arena();
        match arena.exprs[e] {
            Expr::BasicLit(lit) => GoType::named(match lit.kind {
                BasicLitKind::Int => "int",
                BasicLitKind::Float => "float64",
                BasicLitKind::Imag => "complex128",
                BasicLitKind::Rune => "rune",
                BasicLitKind::String => "string",
            }),
            Expr::Ident(sym) => self.ident(e, sym),
            Expr::FuncLit { sig, .. } => self.signature_type(sig),
            Expr::CompositeLit { typ: Some(t), elems } => match self.type_of(t) {
                GoType::Array { len: None, elem } => GoType::Array {
                    len: Some(elems.len().to_string()),
                    elem,
                },
                t => t,
            },
            Expr::CompositeLit { typ: None, .. } => self.unresolved(e),
            Expr::Paren(x) => self.deduce_one(x),
            Expr::Selector { expr, sel } => {
                if self.is_package(expr) {
                    return self.unresolved(e);
                }
                let recv = self.deduce_one(expr);
                if let Some(t) = self.field_type(&recv, sel.sym, 0) {
                    return t;
                }
                match self.method(&recv, sel.sym) {
                    Some(m) => self.signature_type(arena.funcs[m].sig),
                    None => self.unresolved(e),
                }
            }
            Expr::Index { expr, .. } => {
                let operand = self.deduce_one(expr);
                self.index_type(e, operand)
            }
            Expr::Slice { expr, .. } => {
                let operand = self.deduce_one(expr);
                match self.underlying(operand.clone()) {
                    GoType::Array { elem, .. } => GoType::Slice(elem),
                    GoType::Pointer(p) => match *p {
                        GoType::Array { elem, .. } => GoType::Slice(elem),
                        _ => operand,
                    },
                    _ => operand,
                }
            }
            Expr::TypeAssert { typ: Some(t), .. } => self.type_of(t),
            Expr::TypeAssert { typ: None, .. } => self.unresolved(e),
            Expr::Call { .. } => {
                let mut results = self.deduce(e);
                if results.is_empty() {
                    self.unresolved(e)
                } else {
                    results.swap_remove(0)
                }
            }
            Expr::Unary { op, expr } => match op {
                UnaryOp::Addr => GoType::Pointer(Box::new(self.deduce_one(expr))),
                UnaryOp::Deref => match self.deduce_one(expr) {
                    GoType::Pointer(t) => *t,
                    _ => self.unresolved(e),
                },
                UnaryOp::Recv => {
                    let operand = self.deduce_one(expr);
                    match self.underlying(operand) {
                        GoType::Chan { elem, .. } => *elem,
                        _ => self.unresolved(e),
                    }
                }
                UnaryOp::Not => GoType::named("bool"),
                UnaryOp::Add | UnaryOp::Sub | UnaryOp::Xor => self.deduce_one(expr),
            },
            Expr::Binary { left, op, right } => {
                if op.is_comparison() || matches!(op, BinaryOp::LAnd | BinaryOp::LOr) {
                    return GoType::named("bool");
                }
                if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                    return self.deduce_one(left);
                }
                if is_untyped_literal(arena, left) && !is_untyped_literal(arena, right) {
                    return self.deduce_one(right);
                }
                let l = self.deduce_one(left);
                if l.is_unresolved() {
                    let r = self.deduce_one(right);
                    if !r.is_unresolved() {
                        return r;
                    }
                }
                l
            }
            Expr::TypeExpr(t) => self.type_of(t),
        }
    }

    fn index_type(&self, e: ExprId, operand: GoType) -> GoType {
        match self.underlying(operand) {
            GoType::Slice(elem) | GoType::Array { elem, .. } => *elem,
            GoType::Pointer(p) => match *p {
                GoType::Array { elem, .. } => *elem,
                _ => self.unresolved(e),
            },
            GoType::Map { value, .. } => *value,
            t if t.is_named("string") => GoType::named("byte"),
            _ => self.unresolved(e),
        }
    }

    fn ident(&mut self, e: ExprId, sym: Symbol) -> GoType {
        let Some(b) = self.scopes.binding_of(e) else {
            return match self.text(sym) {
                "true" | "false" => GoType::named("bool"),
                "iota" => GoType::named("int"),
                name if PREDECLARED_TYPES.contains(&name) => GoType::named(name),
                _ => self.unresolved(e),
            };
        };
        let binding = *self.scopes.binding(b);
        match (binding.kind, binding.site) {
            (BindingKind::LocalVar | BindingKind::GlobalVar, _) => self.binding_type(b),
            (BindingKind::TypeName, _) => GoType::named(self.text(sym)),
            (BindingKind::Function, DeclSite::Func(f)) => {
                self.signature_type(self.arena().funcs[f].sig)
            }
            _ => self.unresolved(e),
        }
    }

    /// Type of a declared variable, from its annotation or its initializer.
    pub fn binding_type(&mut self, id: BindingId) -> GoType {
        let binding = *self.scopes.binding(id);
        let name = self.text(binding.name);
        if !self.visiting.insert(id) {
            return GoType::Unresolved(name.to_owned());
        }
        let arena = self.arena();
        let t = match binding.site {
            DeclSite::ShortVar { stmt, index } => match arena.simple_stmts[stmt] {
                SimpleStmt::ShortVarDecl { names, values } => {
                    self.value_type(values, names.len() as usize, index)
                }
                _ => None,
            },
            DeclSite::ValueSpec { spec, index } => match arena.specs[spec] {
                Spec::Value { typ: Some(t), .. } => Some(self.type_of(t)),
                Spec::Value { names, values, .. } => {
                    self.value_type(values, names.len() as usize, index)
                }
                _ => None,
            },
            DeclSite::Param { field, .. } => {
                let f = arena.fields[field];
                let t = self.type_of(f.typ);
                Some(if f.variadic { GoType::Slice(Box::new(t)) } else { t })
            }
            DeclSite::Range { stmt, index } => match arena.stmts[stmt] {
                Stmt::For {
                    kind: ForKind::Range { expr, .. },
                    ..
                } => {
                    let subject = self.deduce_one(expr);
                    self.range_types(subject).into_iter().nth(index)
                }
                _ => None,
            },
            DeclSite::Func(f) => Some(self.signature_type(arena.funcs[f].sig)),
            DeclSite::TypeSpec(_) => Some(GoType::named(name)),
            DeclSite::TypeSwitchBind { .. } | DeclSite::Import(_) => None,
        };
        self.visiting.remove(&id);
        match t {
            Some(t) if !t.is_unresolved() => t,
            _ => GoType::Unresolved(name.to_owned()),
        }
    }

    /// Type of the `index`-th of `names` names assigned from `values`.
    fn value_type(&mut self, values: ListRef<ExprId>, names: usize, index: usize) -> Option<GoType> {
        let arena = self.arena();
        let values = arena.exprs_list(values);
        if values.len() == names {
            return Some(self.deduce_one(values[index]));
        }
        let &[single] = values else {
            return None;
        };
        let tuple = self.deduce(single);
        if tuple.len() == names {
            return tuple.into_iter().nth(index);
        }
        // v, ok := m[k] / x.(T) / <-ch
        if names == 2 && is_comma_ok(arena, single) {
            return Some(match index {
                0 => self.deduce_one(single),
                _ => GoType::named("bool"),
            });
        }
        None
    }

    /// Iteration variables of `range subject`.
    pub fn range_types(&self, subject: GoType) -> SmallVec<[GoType; 2]> {
        let int = GoType::named("int");
        match self.underlying(subject) {
            GoType::Slice(elem) | GoType::Array { elem, .. } => smallvec![int, *elem],
            GoType::Pointer(p) => match *p {
                GoType::Array { elem, .. } => smallvec![int, *elem],
                _ => SmallVec::new(),
            },
            GoType::Map { key, value } => smallvec![*key, *value],
            GoType::Chan { elem, .. } => smallvec![*elem],
            t if t.is_named("string") => smallvec![int, GoType::named("rune")],
            t if t.is_integer() => smallvec![t],
            _ => SmallVec::new(),
        }
    }

    fn call(&mut self, e: ExprId, callee: ExprId, args: ListRef<ExprId>) -> SmallVec<[GoType; 1]> {
        let arena = self.arena();
        let mut target = callee;
        while let Expr::Paren(x) = arena.exprs[target] {
            target = x;
        }

        let callee_type = match arena.exprs[target] {
            Expr::Ident(sym) => match self.scopes.binding_of(target) {
                Some(b) => {
                    let binding = *self.scopes.binding(b);
                    match (binding.kind, binding.site) {
                        (BindingKind::Function, DeclSite::Func(f)) => {
                            return self.results_of(arena.funcs[f].sig);
                        }
                        // conversion
                        (BindingKind::TypeName, _) => {
                            return smallvec![GoType::named(self.text(sym))];
                        }
                        (BindingKind::LocalVar | BindingKind::GlobalVar, _) => {
                            Some(self.binding_type(b))
                        }
                        _ => None,
                    }
                }
                None => {
                    let name = self.text(sym);
                    if let Some(results) = self.builtin(name, args) {
                        return results;
                    }
                    None
                }
            },
            Expr::Selector { expr, sel } if !self.is_package(expr) => {
                let recv = self.deduce_one(expr);
                if let Some(m) = self.method(&recv, sel.sym) {
                    return self.results_of(arena.funcs[m].sig);
                }
                self.field_type(&recv, sel.sym, 0)
            }
            Expr::Selector { .. } => None,
            Expr::TypeExpr(t) => return smallvec![self.type_of(t)],
            Expr::FuncLit { sig, .. } => return self.results_of(sig),
            _ => Some(self.deduce_one(target)),
        };

        match callee_type {
            Some(GoType::Func { results, .. }) => results.into_iter().collect(),
            _ => smallvec![self.unresolved(e)],
        }
    }

    fn builtin(&mut self, name: &str, args: ListRef<ExprId>) -> Option<SmallVec<[GoType; 1]>> {
        let arena = self.arena();
        let args = arena.exprs_list(args);
        let first = args.first().copied();
        let one = |t: GoType| Some(smallvec![t]);
        match name {
            "len" | "cap" | "copy" => one(GoType::named("int")),
            "new" => {
                let t = first.map(|a| self.type_arg(a))?;
                one(GoType::Pointer(Box::new(t)))
            }
            "make" => one(first.map(|a| self.type_arg(a))?),
            "append" | "min" | "max" => one(self.deduce_one(first?)),
            "real" | "imag" => one(GoType::named("float64")),
            "complex" => one(GoType::named("complex128")),
            "recover" => one(GoType::Literal("interface{}".to_owned())),
            "print" | "println" | "panic" | "close" | "delete" | "clear" => Some(SmallVec::new()),
            t if PREDECLARED_TYPES.contains(&t) => one(GoType::named(t)),
            _ => None,
        }
    }

    /// A type passed as a call argument (`new(T)`, `make([]T, n)`).
    fn type_arg(&mut self, e: ExprId) -> GoType {
        let arena = self.arena();
        match arena.exprs[e] {
            Expr::TypeExpr(t) => self.type_of(t),
            Expr::Ident(sym) => GoType::named(self.text(sym)),
            Expr::Selector { expr, sel } => match arena.exprs[expr] {
                Expr::Ident(pkg) => GoType::Named {
                    pkg: Some(self.text(pkg).to_owned()),
                    name: self.text(sel.sym).to_owned(),
                },
                _ => self.unresolved(e),
            },
            Expr::Paren(x) => self.type_arg(x),
            _ => self.unresolved(e),
        }
    }

    // -------------------------------------------------------------------------
    // Declared types
    // -------------------------------------------------------------------------

    /// Converts a written type.
    pub fn type_of(&self, t: TypeId) -> GoType {
        let arena = self.arena();
        match arena.types[t] {
            Type::Named { pkg, name } => GoType::Named {
                pkg: pkg.map(|p| self.text(p).to_owned()),
                name: self.text(name).to_owned(),
            },
            Type::Pointer(x) => GoType::Pointer(Box::new(self.type_of(x))),
            Type::Slice(x) => GoType::Slice(Box::new(self.type_of(x))),
            Type::Array { len, elem } => GoType::Array {
                len: len.map(|l| print_expr(arena, &self.doc.interner, l)),
                elem: Box::new(self.type_of(elem)),
            },
            Type::Map { key, value } => GoType::Map {
                key: Box::new(self.type_of(key)),
                value: Box::new(self.type_of(value)),
            },
            Type::Chan { dir, elem } => GoType::Chan {
                dir,
                elem: Box::new(self.type_of(elem)),
            },
            Type::Func(sig) => self.signature_type(sig),
            Type::Struct { .. } | Type::Interface { .. } => {
                GoType::Literal(print_type(arena, &self.doc.interner, t))
            }
        }
    }

    fn signature_type(&self, sig: SignatureId) -> GoType {
        let arena = self.arena();
        let s = arena.signatures[sig];
        let variadic = arena
            .fields_list(s.params)
            .last()
            .is_some_and(|&f| arena.fields[f].variadic);
        GoType::Func {
            params: self.field_types(s.params).into_vec(),
            results: self.field_types(s.results).into_vec(),
            variadic,
        }
    }

    fn results_of(&self, sig: SignatureId) -> SmallVec<[GoType; 1]> {
        self.field_types(self.arena().signatures[sig].results)
    }

    /// One type per declared name; `a, b int` counts twice.
    fn field_types(&self, fields: ListRef<FieldId>) -> SmallVec<[GoType; 1]> {
        let arena = self.arena();
        let mut out = SmallVec::new();
        for &f in arena.fields_list(fields) {
            let field = arena.fields[f];
            let t = self.type_of(field.typ);
            let count = field.names.len().max(1);
            for _ in 0..count {
                out.push(t.clone());
            }
        }
        out
    }

    /// Follows file-level named types to their definition.
    fn underlying(&self, t: GoType) -> GoType {
        let mut t = t;
        for _ in 0..8 {
            let GoType::Named { pkg: None, name } = &t else {
                break;
            };
            match self.local_type(name) {
                Some(def) => t = self.type_of(def),
                None => break,
            }
        }
        t
    }

    fn local_type(&self, name: &str) -> Option<TypeId> {
        let sym = self.doc.interner.get(name)?;
        self.types.get(&sym).copied()
    }

    /// Field `sel` of a file-level struct, through pointers and embedded fields.
    fn field_type(&self, recv: &GoType, sel: Symbol, depth: u32) -> Option<GoType> {
        if depth > 4 {
            return None;
        }
        let recv = match recv {
            GoType::Pointer(inner) => inner.as_ref(),
            t => t,
        };
        let GoType::Named { pkg: None, name } = recv else {
            return None;
        };
        let arena = self.arena();
        let def = self.local_type(name)?;
        let Type::Struct { fields } = arena.types[def] else {
            return None;
        };
        let mut embedded = Vec::new();
        for &f in arena.fields_list(fields) {
            let field = arena.fields[f];
            if arena.ident_names(field.names).iter().any(|n| n.sym == sel) {
                return Some(self.type_of(field.typ));
            }
            if field.names.is_empty() {
                let t = self.type_of(field.typ);
                let matches_sel = match &t {
                    GoType::Named { name, .. } => name == self.text(sel),
                    GoType::Pointer(p) => matches!(p.as_ref(), GoType::Named { name, .. } if name == self.text(sel)),
                    _ => false,
                };
                if matches_sel {
                    return Some(t);
                }
                embedded.push(t);
            }
        }
        embedded
            .iter()
            .find_map(|t| self.field_type(t, sel, depth + 1))
    }

    fn method(&self, recv: &GoType, sel: Symbol) -> Option<FuncDeclId> {
        let recv = match recv {
            GoType::Pointer(inner) => inner.as_ref(),
            t => t,
        };
        let GoType::Named { pkg: None, name } = recv else {
            return None;
        };
        let sym = self.doc.interner.get(name)?;
        self.methods.get(&(sym, sel)).copied()
    }

    fn is_package(&self, e: ExprId) -> bool {
        self.scopes
            .binding_of(e)
            .is_some_and(|b| self.scopes.binding(b).kind == BindingKind::Package)
    }

    fn unresolved(&self, e: ExprId) -> GoType {
        GoType::Unresolved(hint(&print_expr(self.arena(), &self.doc.interner, e)))
    }
}

fn is_untyped_literal(arena: &AstArena, e: ExprId) -> bool {
    match arena.exprs[e] {
        Expr::BasicLit(_) => true,
        Expr::Paren(x) => is_untyped_literal(arena, x),
        _ => false,
    }
}

fn is_comma_ok(arena: &AstArena, e: ExprId) -> bool {
    match arena.exprs[e] {
        Expr::Index { .. } | Expr::TypeAssert { .. } => true,
        Expr::Unary {
            op: UnaryOp::Recv, ..
        } => true,
        Expr::Paren(x) => is_comma_ok(arena, x),
        _ => false,
    }
}

/// Identifier-safe rendering of an expression, for placeholder names.
fn hint(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        if out.len() >= 32 {
            break;
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "value".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use go_syntax::parse_source;
    use pretty_assertions::assert_eq;

    const SRC: &str = r#"package p

import "strings"

type Point struct {
	X, Y float64
	Tags []string
}

type Grid [4][4]int

func (p *Point) Norm() float64 { return p.X*p.X + p.Y*p.Y }

func pair() (int, error) { return 0, nil }

var origin = &Point{}

func f(xs []string, m map[string]*Point, ch <-chan bool, rest ...int) {
	n, err := pair()
	p, ok := m["a"]
	q := *origin
	g := Grid{}
	for i, s := range xs {
		println(i, s)
	}
	for k, v := range m {
		println(k, v)
	}
	use(n, err, p, ok, q, g, len(xs), strings.ToUpper(xs[0]), <-ch, 1.5*2, p.Norm(), q.Tags[0:1], rest, g[0], 'x', n << 2, n > 0)
}
"#;

    /// The type of every argument of the `use(...)` call.
    fn argument_types() -> Vec<String> {
        let doc = parse_source(SRC).expect("parse");
        let scopes = ScopeTable::resolve(&doc);
        let use_sym = doc.interner.get("use").expect("use");
        let (_, call, _) = doc
            .arena
            .exprs
            .iter()
            .find(|(_, e, _)| matches!(e, Expr::Call { callee, .. } if doc.arena.exprs[*callee] == Expr::Ident(use_sym)))
            .expect("call");
        let Expr::Call { args, .. } = *call else {
            unreachable!()
        };
        let mut d = TypeDeducer::new(&doc, &scopes);
        doc.arena
            .exprs_list(args)
            .iter()
            .map(|&a| d.deduce_one(a).to_string())
            .collect()
    }

    #[test]
    fn deduces_from_declarations_and_literals() {
        assert_eq!(
            argument_types(),
            [
                "int",
                "error",
                "*Point",
                "bool",
                "Point",
                "Grid",
                "int",
                "Unresolved_strings_ToUpper_xs_0",
                "bool",
                "float64",
                "float64",
                "[]string",
                "[]int",
                "[4]int",
                "rune",
                "int",
                "bool",
            ]
        );
    }

    #[test]
    fn range_variables_follow_the_subject() {
        let doc = parse_source(SRC).expect("parse");
        let scopes = ScopeTable::resolve(&doc);
        let mut d = TypeDeducer::new(&doc, &scopes);
        let by_name = |name: &str| {
            let sym = doc.interner.get(name).expect("name");
            scopes
                .bindings()
                .find(|(_, b)| b.name == sym && matches!(b.site, DeclSite::Range { .. }))
                .map(|(id, _)| id)
                .expect("range binding")
        };
        let types: Vec<String> = ["i", "s", "k", "v"]
            .iter()
            .map(|n| d.binding_type(by_name(n)).to_string())
            .collect();
        assert_eq!(types, ["int", "string", "string", "*Point"]);
    }

    #[test]
    fn materialized_types_print_as_go() {
        let mut doc = parse_source("package p\n").expect("parse");
        let t = GoType::Map {
            key: Box::new(GoType::named("string")),
            value: Box::new(GoType::Func {
                params: vec![GoType::named("int"), GoType::named("string")],
                results: vec![GoType::named("bool"), GoType::named("error")],
                variadic: true,
            }),
        };
        let id = t.materialize(&mut doc.arena, &mut doc.interner);
        let printed = print_type(&doc.arena, &doc.interner, id);
        assert_eq!(printed, "map[string]func(int, ...string) (bool, error)");
        assert_eq!(printed, t.to_string());
        assert_eq!(GoType::Unresolved("x".into()).to_string(), "Unresolved_x");
    }

    #[test]
    fn hints_are_identifiers() {
        assert_eq!(hint("foo.Bar(x[1])"), "foo_Bar_x_1");
        assert_eq!(hint("()"), "value");
    }
}
