//! Identifier resolution.
//!
//! One pass over the file with an explicit stack of lexical scopes binds
//! every identifier expression to the declaration it refers to. The result
//! is a side table keyed by `ExprId`; the tree itself is not touched.

use std::collections::HashMap;

use go_syntax::ast::{
    AstArena, CaseKind, DeclId, Expr, ExprId, FieldId, ForKind, FuncDeclId, IdentName, Interner,
    ListRef, SignatureId, SimpleStmt, SimpleStmtId, Span, Spec, SpecId, Stmt, StmtId, Symbol,
    TopLevelDecl, Type, TypeId,
};
use go_syntax::Document;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Variable or constant declared inside a function, parameters included.
    LocalVar,
    /// Package-level variable or constant.
    GlobalVar,
    TypeName,
    Function,
    Package,
}

/// Where a binding was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclSite {
    /// `index`-th name of a `:=` statement.
    ShortVar { stmt: SimpleStmtId, index: usize },
    /// `index`-th name of a `var`/`const` spec.
    ValueSpec { spec: SpecId, index: usize },
    /// Parameter, named result or receiver.
    Param { field: FieldId, index: usize },
    /// Key (0) or value (1) of a `for ... := range`.
    Range { stmt: StmtId, index: usize },
    TypeSwitchBind { stmt: StmtId },
    Func(FuncDeclId),
    TypeSpec(SpecId),
    Import(SpecId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub name: Symbol,
    pub kind: BindingKind,
    pub site: DeclSite,
    /// Span of the declaring identifier.
    pub pos: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

/// Bindings of one file and the identifier expressions that refer to them.
#[derive(Debug, Default)]
pub struct ScopeTable {
    bindings: Vec<Binding>,
    uses: HashMap<ExprId, BindingId>,
    /// Bindings a statement adds to the scope it appears in.
    declared_by: HashMap<StmtId, SmallVec<[BindingId; 2]>>,
    package: HashMap<Symbol, BindingId>,
}

impl ScopeTable {
    pub fn resolve(doc: &Document) -> Self {
        let mut r = Resolver {
            arena: &doc.arena,
            table: ScopeTable::default(),
            names: Vec::new(),
            frames: Vec::new(),
            blank: doc.interner.get("_"),
        };
        r.file(&doc.interner, doc.file.decls);
        tracing::trace!(
            bindings = r.table.bindings.len(),
            uses = r.table.uses.len(),
            "scopes resolved"
        );
        r.table
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingId(i as u32), b))
    }

    /// The declaration an identifier expression refers to; `None` for
    /// predeclared and unknown names.
    pub fn binding_of(&self, expr: ExprId) -> Option<BindingId> {
        self.uses.get(&expr).copied()
    }

    /// Bindings that `stmt` makes visible to the statements after it.
    pub fn declared_by(&self, stmt: StmtId) -> &[BindingId] {
        self.declared_by.get(&stmt).map_or(&[], |b| b.as_slice())
    }

    pub fn package_binding(&self, name: Symbol) -> Option<BindingId> {
        self.package.get(&name).copied()
    }

    fn push(&mut self, binding: Binding) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }
}

struct Resolver<'a> {
    arena: &'a AstArena,
    table: ScopeTable,
    /// Visible local names, innermost last.
    names: Vec<(Symbol, BindingId)>,
    /// Start of each open scope in `names`.
    frames: Vec<usize>,
    blank: Option<Symbol>,
}

impl<'a> Resolver<'a> {
    fn open(&mut self) {
        self.frames.push(self.names.len());
    }

    fn close(&mut self) {
        if let Some(start) = self.frames.pop() {
            self.names.truncate(start);
        }
    }

    fn lookup(&self, sym: Symbol) -> Option<BindingId> {
        self.names
            .iter()
            .rev()
            .find(|(s, _)| *s == sym)
            .map(|&(_, b)| b)
            .or_else(|| self.table.package_binding(sym))
    }

    fn declared_here(&self, sym: Symbol) -> bool {
        let start = self.frames.last().copied().unwrap_or(0);
        self.names[start..].iter().any(|(s, _)| *s == sym)
    }

    fn declare(&mut self, name: IdentName, kind: BindingKind, site: DeclSite) -> Option<BindingId> {
        if Some(name.sym) == self.blank {
            return None;
        }
        let id = self.table.push(Binding {
            name: name.sym,
            kind,
            site,
            pos: name.pos,
        });
        self.names.push((name.sym, id));
        Some(id)
    }

    fn declare_package(&mut self, name: IdentName, kind: BindingKind, site: DeclSite) {
        if Some(name.sym) == self.blank {
            return;
        }
        let id = self.table.push(Binding {
            name: name.sym,
            kind,
            site,
            pos: name.pos,
        });
        self.table.package.insert(name.sym, id);
    }

    // -------------------------------------------------------------------------
    // Package scope
    // -------------------------------------------------------------------------

    fn file(&mut self, interner: &Interner, decls: ListRef<TopLevelDecl>) {
        let arena = self.arena;
        // every package-level name is visible in every function body
        for &d in arena.top_decls(decls) {
            match d {
                TopLevelDecl::Decl(id) => self.package_decl(id, interner),
                TopLevelDecl::Func(id) => {
                    let f = arena.funcs[id];
                    if f.recv.is_none() {
                        self.declare_package(f.name, BindingKind::Function, DeclSite::Func(id));
                    }
                }
            }
        }

        for &d in arena.top_decls(decls) {
            match d {
                TopLevelDecl::Decl(id) => {
                    for &spec in arena.specs_list(arena.decls[id].specs) {
                        match arena.specs[spec] {
                            Spec::Value { typ, values, .. } => {
                                self.opt_typ(typ);
                                self.exprs(values);
                            }
                            Spec::Type { typ, .. } => self.typ(typ),
                            Spec::Import { .. } => {}
                        }
                    }
                }
                TopLevelDecl::Func(id) => self.func_decl(id),
            }
        }
    }

    fn package_decl(&mut self, id: DeclId, interner: &Interner) {
        let arena = self.arena;
        for &spec in arena.specs_list(arena.decls[id].specs) {
            match arena.specs[spec] {
                Spec::Import { name, path } => {
                    let name = match name {
                        Some(name) => Some(name),
                        None => {
                            let path = interner.resolve(path).trim_matches(|c| c == '"' || c == '`');
                            let last = path.rsplit('/').next().unwrap_or(path);
                            // a name never interned is never referenced
                            interner.get(last).map(|sym| IdentName {
                                sym,
                                pos: arena.specs.span(spec),
                            })
                        }
                    };
                    if let Some(name) = name {
                        if interner.resolve(name.sym) != "." {
                            self.declare_package(name, BindingKind::Package, DeclSite::Import(spec));
                        }
                    }
                }
                Spec::Value { names, .. } => {
                    for (index, &name) in arena.ident_names(names).iter().enumerate() {
                        self.declare_package(
                            name,
                            BindingKind::GlobalVar,
                            DeclSite::ValueSpec { spec, index },
                        );
                    }
                }
                Spec::Type { name, .. } => {
                    self.declare_package(name, BindingKind::TypeName, DeclSite::TypeSpec(spec));
                }
            }
        }
    }

    fn func_decl(&mut self, id: FuncDeclId) {
        let arena = self.arena;
        let f = arena.funcs[id];
        self.open();
        if let Some(recv) = f.recv {
            self.fields(ListRef::EMPTY, Some(recv));
        }
        self.signature(f.sig);
        if let Some(body) = f.body {
            // the body shares the parameters' scope
            self.stmts(arena.blocks[body].stmts);
        }
        self.close();
    }

    fn signature(&mut self, sig: SignatureId) {
        let s = self.arena.signatures[sig];
        self.fields(s.params, None);
        self.fields(s.results, None);
    }

    fn fields(&mut self, list: ListRef<FieldId>, extra: Option<FieldId>) {
        let arena = self.arena;
        for &field in extra.iter().chain(arena.fields_list(list)) {
            let f = arena.fields[field];
            self.typ(f.typ);
            for (index, &name) in arena.ident_names(f.names).iter().enumerate() {
                self.declare(name, BindingKind::LocalVar, DeclSite::Param { field, index });
            }
        }
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn stmts(&mut self, list: ListRef<StmtId>) {
        for &s in self.arena.stmts_list(list) {
            self.stmt(s);
        }
    }

    fn block(&mut self, list: ListRef<StmtId>) {
        self.open();
        self.stmts(list);
        self.close();
    }

    fn stmt(&mut self, id: StmtId) {
        let arena = self.arena;
        match arena.stmts[id] {
            Stmt::Simple(s) => self.simple_stmt(s, Some(id)),
            Stmt::Decl(d) => self.local_decl(d, id),
            Stmt::Labeled { stmt, .. } => self.stmt(stmt),
            Stmt::Go(e) | Stmt::Defer(e) => self.expr(e),
            Stmt::Return(results) => self.exprs(results),
            Stmt::Branch { .. } => {}
            Stmt::Block(b) => self.block(arena.blocks[b].stmts),
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            } => {
                self.open();
                if let Some(init) = init {
                    self.simple_stmt(init, None);
                }
                self.expr(cond);
                self.block(arena.blocks[then_block].stmts);
                if let Some(e) = else_stmt {
                    self.stmt(e);
                }
                self.close();
            }
            Stmt::For { kind, body } => {
                self.open();
                match kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(cond) => self.expr(cond),
                    ForKind::Clause { init, cond, post } => {
                        if let Some(init) = init {
                            self.simple_stmt(init, None);
                        }
                        self.opt_expr(cond);
                        if let Some(post) = post {
                            self.simple_stmt(post, None);
                        }
                    }
                    ForKind::Range {
                        key,
                        value,
                        define,
                        expr,
                    } => {
                        self.expr(expr);
                        if define {
                            for (index, var) in [key, value].into_iter().enumerate() {
                                let Some(var) = var else { continue };
                                if let Expr::Ident(sym) = arena.exprs[var] {
                                    let name = IdentName {
                                        sym,
                                        pos: arena.exprs.span(var),
                                    };
                                    let site = DeclSite::Range { stmt: id, index };
                                    if let Some(b) = self.declare(name, BindingKind::LocalVar, site) {
                                        self.table.uses.insert(var, b);
                                    }
                                }
                            }
                        } else {
                            self.opt_expr(key);
                            self.opt_expr(value);
                        }
                    }
                }
                self.block(arena.blocks[body].stmts);
                self.close();
            }
            Stmt::Switch { init, tag, clauses } => {
                self.open();
                if let Some(init) = init {
                    self.simple_stmt(init, None);
                }
                self.opt_expr(tag);
                for &c in arena.switch_clause_ids(clauses) {
                    let clause = arena.switch_clauses[c];
                    self.open();
                    if let CaseKind::Exprs(list) = clause.kind {
                        self.exprs(list);
                    }
                    self.stmts(clause.stmts);
                    self.close();
                }
                self.close();
            }
            Stmt::TypeSwitch {
                init,
                bind,
                guard,
                clauses,
            } => {
                self.open();
                if let Some(init) = init {
                    self.simple_stmt(init, None);
                }
                self.expr(guard);
                for &c in arena.switch_clause_ids(clauses) {
                    let clause = arena.switch_clauses[c];
                    self.open();
                    if let CaseKind::Types(list) = clause.kind {
                        for &t in arena.types_list(list) {
                            self.typ(t);
                        }
                    }
                    // each clause gets its own copy of the bound variable
                    if let Some(bind) = bind {
                        self.declare(bind, BindingKind::LocalVar, DeclSite::TypeSwitchBind { stmt: id });
                    }
                    self.stmts(clause.stmts);
                    self.close();
                }
                self.close();
            }
            Stmt::Select { clauses } => {
                for &c in arena.comm_clause_ids(clauses) {
                    let clause = arena.comm_clauses[c];
                    self.open();
                    if let Some(comm) = clause.comm {
                        self.simple_stmt(comm, None);
                    }
                    self.stmts(clause.stmts);
                    self.close();
                }
            }
        }
    }

    /// `stmt` is the enclosing statement when the declarations land in the
    /// surrounding list's scope.
    fn simple_stmt(&mut self, id: SimpleStmtId, stmt: Option<StmtId>) {
        let arena = self.arena;
        match arena.simple_stmts[id] {
            SimpleStmt::Expr(e) => self.expr(e),
            SimpleStmt::Send { chan, value } => {
                self.expr(chan);
                self.expr(value);
            }
            SimpleStmt::IncDec { expr, .. } => self.expr(expr),
            SimpleStmt::Assign { lhs, rhs, .. } => {
                self.exprs(lhs);
                self.exprs(rhs);
            }
            SimpleStmt::ShortVarDecl { names, values } => {
                self.exprs(values);
                for (index, &name) in arena.ident_names(names).iter().enumerate() {
                    // `:=` reuses names already declared in the same scope
                    if self.declared_here(name.sym) {
                        continue;
                    }
                    let site = DeclSite::ShortVar { stmt: id, index };
                    if let Some(b) = self.declare(name, BindingKind::LocalVar, site) {
                        if let Some(stmt) = stmt {
                            self.table.declared_by.entry(stmt).or_default().push(b);
                        }
                    }
                }
            }
        }
    }

    fn local_decl(&mut self, id: DeclId, stmt: StmtId) {
        let arena = self.arena;
        for &spec in arena.specs_list(arena.decls[id].specs) {
            match arena.specs[spec] {
                Spec::Value { names, typ, values } => {
                    self.opt_typ(typ);
                    self.exprs(values);
                    for (index, &name) in arena.ident_names(names).iter().enumerate() {
                        let site = DeclSite::ValueSpec { spec, index };
                        if let Some(b) = self.declare(name, BindingKind::LocalVar, site) {
                            self.table.declared_by.entry(stmt).or_default().push(b);
                        }
                    }
                }
                Spec::Type { name, typ, .. } => {
                    if let Some(b) = self.declare(name, BindingKind::TypeName, DeclSite::TypeSpec(spec)) {
                        self.table.declared_by.entry(stmt).or_default().push(b);
                    }
                    self.typ(typ);
                }
                Spec::Import { .. } => {}
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions and types
    // -------------------------------------------------------------------------

    fn exprs(&mut self, list: ListRef<ExprId>) {
        for &e in self.arena.exprs_list(list) {
            self.expr(e);
        }
    }

    fn opt_expr(&mut self, e: Option<ExprId>) {
        if let Some(e) = e {
            self.expr(e);
        }
    }

    fn expr(&mut self, id: ExprId) {
        let arena = self.arena;
        match arena.exprs[id] {
            Expr::Ident(sym) => {
                if let Some(b) = self.lookup(sym) {
                    self.table.uses.insert(id, b);
                }
            }
            Expr::BasicLit(_) => {}
            Expr::FuncLit { sig, body } => {
                self.open();
                self.signature(sig);
                self.stmts(arena.blocks[body].stmts);
                self.close();
            }
            Expr::CompositeLit { typ, elems } => {
                // bare identifier keys name struct fields unless the literal is a map, slice or array
                let keys_are_fields = typ.map_or(true, |t| {
                    matches!(
                        arena.types[t],
                        Type::Named { .. } | Type::Struct { .. } | Type::Pointer(_)
                    )
                });
                self.opt_typ(typ);
                for el in arena.keyed_elems_list(elems) {
                    if let Some(key) = el.key {
                        if !(keys_are_fields && matches!(arena.exprs[key], Expr::Ident(_))) {
                            self.expr(key);
                        }
                    }
                    self.expr(el.value);
                }
            }
            Expr::Paren(x) | Expr::Selector { expr: x, .. } | Expr::Unary { expr: x, .. } => {
                self.expr(x)
            }
            Expr::Index { expr, index } => {
                self.expr(expr);
                self.expr(index);
            }
            Expr::Slice { expr, lo, hi, max } => {
                self.expr(expr);
                self.opt_expr(lo);
                self.opt_expr(hi);
                self.opt_expr(max);
            }
            Expr::TypeAssert { expr, typ } => {
                self.expr(expr);
                self.opt_typ(typ);
            }
            Expr::Call { callee, args, .. } => {
                self.expr(callee);
                self.exprs(args);
            }
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::TypeExpr(t) => self.typ(t),
        }
    }

    fn opt_typ(&mut self, t: Option<TypeId>) {
        if let Some(t) = t {
            self.typ(t);
        }
    }

    /// Types declare nothing; only array lengths refer to values.
    fn typ(&mut self, id: TypeId) {
        let arena = self.arena;
        match arena.types[id] {
            Type::Named { .. } => {}
            Type::Pointer(t) | Type::Slice(t) | Type::Chan { elem: t, .. } => self.typ(t),
            Type::Array { len, elem } => {
                self.opt_expr(len);
                self.typ(elem);
            }
            Type::Map { key, value } => {
                self.typ(key);
                self.typ(value);
            }
            Type::Func(sig) => {
                let s = arena.signatures[sig];
                for &f in arena.fields_list(s.params).iter().chain(arena.fields_list(s.results)) {
                    self.typ(arena.fields[f].typ);
                }
            }
            Type::Struct { fields } | Type::Interface { methods: fields } => {
                for &f in arena.fields_list(fields) {
                    self.typ(arena.fields[f].typ);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use go_syntax::parse_source;

    /// Identifier expressions named `name`, in source order.
    fn idents(doc: &Document, name: &str) -> Vec<ExprId> {
        let sym = doc.interner.get(name).expect("interned");
        let mut found: Vec<_> = doc
            .arena
            .exprs
            .iter()
            .filter(|(_, e, _)| **e == Expr::Ident(sym))
            .map(|(id, _, span)| (span.start, id))
            .collect();
        found.sort();
        found.into_iter().map(|(_, id)| id).collect()
    }

    fn kind_of(table: &ScopeTable, e: ExprId) -> Option<BindingKind> {
        table.binding_of(e).map(|b| table.binding(b).kind)
    }

    #[test]
    fn inner_declarations_shadow_outer_ones() {
        let doc = parse_source(
            "package p

var x = 1

func f(y int) int {
	a := x + y
	{
		x := 2
		a += x
	}
	return x + a
}
",
        )
        .expect("parse");
        let table = ScopeTable::resolve(&doc);
        let xs = idents(&doc, "x");
        assert_eq!(xs.len(), 3);
        assert_eq!(kind_of(&table, xs[0]), Some(BindingKind::GlobalVar));
        assert_eq!(kind_of(&table, xs[1]), Some(BindingKind::LocalVar));
        assert_eq!(kind_of(&table, xs[2]), Some(BindingKind::GlobalVar));

        let y = idents(&doc, "y")[0];
        let b = table.binding(table.binding_of(y).expect("bound"));
        assert!(matches!(b.site, DeclSite::Param { index: 0, .. }));
    }

    #[test]
    fn short_redeclaration_keeps_the_first_binding() {
        let doc = parse_source(
            "package p

func f() (int, error) {
	n, err := g()
	m, err := g()
	return n + m, err
}

func g() (int, error) { return 0, nil }
",
        )
        .expect("parse");
        let table = ScopeTable::resolve(&doc);
        let err = *idents(&doc, "err").last().expect("use");
        let b = table.binding(table.binding_of(err).expect("bound"));
        assert!(matches!(b.site, DeclSite::ShortVar { index: 1, .. }));

        let stmts: Vec<_> = doc.arena.stmts.iter().map(|(id, _, _)| id).collect();
        let declared: Vec<usize> = stmts.iter().map(|&s| table.declared_by(s).len()).collect();
        // n, err then only m
        assert!(declared.contains(&2));
        assert!(declared.contains(&1));

        let g = idents(&doc, "g")[0];
        assert_eq!(kind_of(&table, g), Some(BindingKind::Function));
    }

    #[test]
    fn range_and_closure_variables_are_local() {
        let doc = parse_source(
            "package p

import \"strings\"

func f(xs []string) {
	for i, s := range xs {
		g := func(t string) string { return strings.ToUpper(t) }
		println(i, g(s))
	}
}
",
        )
        .expect("parse");
        let table = ScopeTable::resolve(&doc);
        let s = idents(&doc, "s");
        let b = table.binding(table.binding_of(s[1]).expect("bound"));
        assert!(matches!(b.site, DeclSite::Range { index: 1, .. }));
        assert_eq!(kind_of(&table, idents(&doc, "t")[0]), Some(BindingKind::LocalVar));
        assert_eq!(kind_of(&table, idents(&doc, "strings")[0]), Some(BindingKind::Package));
        assert_eq!(kind_of(&table, idents(&doc, "println")[0]), None);
    }
}
