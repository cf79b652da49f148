//! Recursive-descent parser over the [`Lexer`] token stream.
//!
//! Stops at the first syntax error. Control-clause headers (`if`, `for`,
//! `switch`) do not accept composite literals of bare type names, like Go.

use crate::ast::*;
use crate::document::Document;
use crate::error::{Diag, ParseFailure};
use crate::lexer::{Lexer, RawComment, Tok};

type PResult<T> = Result<T, Diag>;

/// Parses one Go file. A missing final newline is added.
pub fn parse_source(src: &str) -> Result<Document, ParseFailure> {
    let mut text = src.to_owned();
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let (arena, interner, file) = {
        let mut lexer = Lexer::new(&text);
        let toks: Vec<_> = lexer.by_ref().collect();
        let diags = lexer.take_diags();
        if !diags.is_empty() {
            tracing::debug!(count = diags.len(), "lexing failed");
            return Err(ParseFailure { diags });
        }
        let comments = lexer.take_comments();

        let mut p = Parser::new(&text, toks);
        let file = p.source_file().map_err(|d| ParseFailure { diags: vec![d] })?;
        let file = SourceFile {
            comments: p.comment_groups(&comments),
            ..file
        };
        (p.arena, p.interner, file)
    };

    tracing::debug!(
        decls = file.decls.len(),
        comment_groups = file.comments.len(),
        bytes = text.len(),
        "parsed source"
    );
    Ok(Document::new(arena, interner, file, text))
}

/// One entry of a parameter list before names and types are grouped.
#[derive(Clone, Copy, Debug)]
struct ParamDecl {
    name: Option<IdentName>,
    typ: Option<TypeId>,
    variadic: bool,
    span: Span,
}

struct Parser<'src> {
    src: &'src str,
    toks: Vec<(usize, Tok<'src>, usize)>,
    pos: usize,
    prev_end: usize,
    no_lit: bool,
    arena: AstArena,
    interner: Interner,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str, toks: Vec<(usize, Tok<'src>, usize)>) -> Self {
        let mut interner = Interner::new();
        interner.reserve(toks.len() / 4);
        Self {
            src,
            toks,
            pos: 0,
            prev_end: 0,
            no_lit: false,
            arena: AstArena::new(),
            interner,
        }
    }

    // -------------------------------------------------------------------------
    // Token plumbing
    // -------------------------------------------------------------------------

    #[inline]
    fn peek(&self) -> Option<Tok<'src>> {
        self.toks.get(self.pos).map(|t| t.1)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + n).map(|t| t.1)
    }

    #[inline]
    fn at(&self, tok: Tok<'src>) -> bool {
        self.peek() == Some(tok)
    }

    #[inline]
    fn start(&self) -> usize {
        self.toks.get(self.pos).map_or(self.src.len(), |t| t.0)
    }

    fn bump(&mut self) -> (usize, Tok<'src>, usize) {
        let eof = (self.src.len(), Tok::Error, self.src.len());
        let tok = self.toks.get(self.pos).copied().unwrap_or(eof);
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        // injected semicolons do not extend the previous node
        if !(tok.1 == Tok::Semi && tok.0 == tok.2) {
            self.prev_end = tok.2;
        }
        tok
    }

    fn eat(&mut self, tok: Tok<'src>) -> bool {
        if self.at(tok) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok<'src>, what: &str) -> PResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            self.unexpected(what)
        }
    }

    fn unexpected<T>(&self, what: &str) -> PResult<T> {
        let (span, found) = match self.toks.get(self.pos) {
            Some(&(s, tok, e)) if tok == Tok::Semi && s == e => (Span::new(s, e), "newline".to_owned()),
            Some(&(s, tok, e)) => (Span::new(s, e), tok.to_string()),
            None => (Span::new(self.src.len(), self.src.len()), "EOF".to_owned()),
        };
        Err(Diag::parse(span, format!("expected {what}, found {found}")))
    }

    /// A statement or spec ends at `;`, or right before `)` / `}`.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.peek() {
            Some(Tok::Semi) => {
                self.bump();
                Ok(())
            }
            Some(Tok::RParen | Tok::RBrace) | None => Ok(()),
            Some(_) => self.unexpected("';' or newline"),
        }
    }

    #[inline]
    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn ident(&mut self) -> PResult<IdentName> {
        match self.peek() {
            Some(Tok::Ident(s)) => {
                let (start, _, end) = self.bump();
                Ok(IdentName {
                    sym: self.interner.intern(s),
                    pos: Span::new(start, end),
                })
            }
            _ => self.unexpected("identifier"),
        }
    }

    fn ident_list(&mut self) -> PResult<Vec<IdentName>> {
        let mut names = vec![self.ident()?];
        while self.eat(Tok::Comma) {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    fn with_lit<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let old = std::mem::replace(&mut self.no_lit, !allowed);
        let out = f(self);
        self.no_lit = old;
        out
    }

    // -------------------------------------------------------------------------
    // File and declarations
    // -------------------------------------------------------------------------

    fn source_file(&mut self) -> PResult<SourceFile> {
        let start = self.start();
        self.expect(Tok::KwPackage, "'package'")?;
        let name = self.ident()?;
        let package = self.span_from(start);
        self.expect_semi()?;

        let mut decls = Vec::new();
        while let Some(tok) = self.peek() {
            match tok {
                Tok::Semi => {
                    self.bump();
                    continue;
                }
                Tok::KwFunc => decls.push(TopLevelDecl::Func(self.func_decl()?)),
                Tok::KwImport | Tok::KwConst | Tok::KwVar | Tok::KwType => {
                    decls.push(TopLevelDecl::Decl(self.gen_decl()?))
                }
                _ => return self.unexpected("declaration"),
            }
            if self.at(Tok::RParen) || self.at(Tok::RBrace) {
                return self.unexpected("declaration");
            }
            self.expect_semi()?;
        }

        Ok(SourceFile {
            package,
            name,
            decls: self.arena.list_top_decls(decls),
            comments: ListRef::EMPTY,
        })
    }

    fn gen_decl(&mut self) -> PResult<DeclId> {
        let start = self.start();
        let kind = match self.bump().1 {
            Tok::KwImport => GenDeclKind::Import,
            Tok::KwConst => GenDeclKind::Const,
            Tok::KwType => GenDeclKind::Type,
            _ => GenDeclKind::Var,
        };

        let mut specs = Vec::new();
        let grouped = self.eat(Tok::LParen);
        if grouped {
            while !self.at(Tok::RParen) && self.peek().is_some() {
                specs.push(self.spec(kind)?);
                self.expect_semi()?;
            }
            self.expect(Tok::RParen, "')'")?;
        } else {
            specs.push(self.spec(kind)?);
        }

        let specs = self.arena.list_specs(specs);
        Ok(self.arena.decls.alloc(
            Decl {
                kind,
                grouped,
                specs,
            },
            self.span_from(start),
        ))
    }

    fn spec(&mut self, kind: GenDeclKind) -> PResult<SpecId> {
        let start = self.start();
        let spec = match kind {
            GenDeclKind::Import => {
                let name = match self.peek() {
                    Some(Tok::Ident(_)) => Some(self.ident()?),
                    Some(Tok::Dot) => {
                        let (s, _, e) = self.bump();
                        Some(IdentName {
                            sym: self.interner.intern("."),
                            pos: Span::new(s, e),
                        })
                    }
                    _ => None,
                };
                let path = match self.peek() {
                    Some(Tok::StringLit(s) | Tok::RawStringLit(s)) => {
                        self.bump();
                        self.interner.intern(s)
                    }
                    _ => return self.unexpected("import path"),
                };
                Spec::Import { name, path }
            }
            GenDeclKind::Type => {
                let name = self.ident()?;
                let alias = self.eat(Tok::Assign);
                let typ = self.parse_type()?;
                Spec::Type { name, alias, typ }
            }
            GenDeclKind::Const | GenDeclKind::Var => {
                let names = self.ident_list()?;
                let typ = match self.peek() {
                    Some(Tok::Assign | Tok::Semi | Tok::RParen) | None => None,
                    Some(_) => Some(self.parse_type()?),
                };
                let values = if self.eat(Tok::Assign) {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                Spec::Value {
                    names: self.arena.list_ident_names(names),
                    typ,
                    values: self.arena.list_exprs(values),
                }
            }
        };
        Ok(self.arena.specs.alloc(spec, self.span_from(start)))
    }

    fn func_decl(&mut self) -> PResult<FuncDeclId> {
        let start = self.start();
        self.expect(Tok::KwFunc, "'func'")?;

        let recv = if self.at(Tok::LParen) {
            let recv_start = self.start();
            match self.parameters()?.as_slice() {
                [field] => Some(*field),
                _ => {
                    return Err(Diag::parse(
                        self.span_from(recv_start),
                        "method has no receiver or multiple receivers",
                    ))
                }
            }
        } else {
            None
        };

        let name = self.ident()?;
        let sig = self.signature()?;
        let body = if self.at(Tok::LBrace) {
            Some(self.with_lit(true, Self::block)?)
        } else {
            None
        };

        Ok(self.arena.funcs.alloc(
            FuncDecl {
                recv,
                name,
                sig,
                body,
            },
            self.span_from(start),
        ))
    }

    // -------------------------------------------------------------------------
    // Signatures and types
    // -------------------------------------------------------------------------

    fn signature(&mut self) -> PResult<SignatureId> {
        let start = self.start();
        let params = self.parameters()?;
        let results = if self.at(Tok::LParen) {
            self.parameters()?
        } else if self.at_type_start() {
            let typ = self.parse_type()?;
            let span = self.arena.types.span(typ);
            vec![self.arena.fields.alloc(
                Field {
                    names: ListRef::EMPTY,
                    typ,
                    variadic: false,
                    tag: None,
                },
                span,
            )]
        } else {
            Vec::new()
        };

        let params = self.arena.list_fields(params);
        let results = self.arena.list_fields(results);
        Ok(self
            .arena
            .signatures
            .alloc(Signature { params, results }, self.span_from(start)))
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Tok::Ident(_)
                    | Tok::LBrack
                    | Tok::Star
                    | Tok::KwMap
                    | Tok::KwChan
                    | Tok::KwFunc
                    | Tok::KwStruct
                    | Tok::KwInterface
                    | Tok::Arrow
                    | Tok::LParen
            )
        )
    }

    fn parameters(&mut self) -> PResult<Vec<FieldId>> {
        self.expect(Tok::LParen, "'('")?;
        let mut decls = Vec::new();
        while !self.at(Tok::RParen) {
            decls.push(self.param_decl()?);
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        Ok(self.resolve_param_list(decls))
    }

    fn param_decl(&mut self) -> PResult<ParamDecl> {
        let start = self.start();
        let (name, typ, variadic) = match self.peek() {
            Some(Tok::Ident(_)) => {
                let name = self.ident()?;
                match self.peek() {
                    Some(Tok::Comma | Tok::RParen) => (Some(name), None, false),
                    Some(Tok::Dot) => {
                        self.bump();
                        let sel = self.ident()?;
                        let typ = self.arena.types.alloc(
                            Type::Named {
                                pkg: Some(name.sym),
                                name: sel.sym,
                            },
                            self.span_from(start),
                        );
                        (None, Some(typ), false)
                    }
                    Some(Tok::Ellipsis) => {
                        self.bump();
                        (Some(name), Some(self.parse_type()?), true)
                    }
                    _ => (Some(name), Some(self.parse_type()?), false),
                }
            }
            Some(Tok::Ellipsis) => {
                self.bump();
                (None, Some(self.parse_type()?), true)
            }
            _ => (None, Some(self.parse_type()?), false),
        };
        Ok(ParamDecl {
            name,
            typ,
            variadic,
            span: self.span_from(start),
        })
    }

    /// Groups `a, b int` into one field; a list of bare names is a list of types.
    fn resolve_param_list(&mut self, params: Vec<ParamDecl>) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut pending: Vec<IdentName> = Vec::new();
        let mut pending_start: Option<u32> = None;

        for param in params {
            match (param.name, param.typ) {
                (Some(name), Some(typ)) => {
                    pending.push(name);
                    let names = self.arena.list_ident_names(pending.drain(..));
                    let span = Span {
                        start: pending_start.take().unwrap_or(param.span.start),
                        end: param.span.end,
                    };
                    out.push(self.arena.fields.alloc(
                        Field {
                            names,
                            typ,
                            variadic: param.variadic,
                            tag: None,
                        },
                        span,
                    ));
                }
                (None, Some(typ)) => {
                    self.flush_as_types(&mut pending, &mut out);
                    pending_start = None;
                    out.push(self.arena.fields.alloc(
                        Field {
                            names: ListRef::EMPTY,
                            typ,
                            variadic: param.variadic,
                            tag: None,
                        },
                        param.span,
                    ));
                }
                (Some(name), None) => {
                    pending_start.get_or_insert(param.span.start);
                    pending.push(name);
                }
                (None, None) => {}
            }
        }

        self.flush_as_types(&mut pending, &mut out);
        out
    }

    fn flush_as_types(&mut self, pending: &mut Vec<IdentName>, out: &mut Vec<FieldId>) {
        for name in pending.drain(..) {
            let typ = self.arena.types.alloc(
                Type::Named {
                    pkg: None,
                    name: name.sym,
                },
                name.pos,
            );
            out.push(self.arena.fields.alloc(
                Field {
                    names: ListRef::EMPTY,
                    typ,
                    variadic: false,
                    tag: None,
                },
                name.pos,
            ));
        }
    }

    fn parse_type(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let typ = match self.peek() {
            Some(Tok::Ident(_)) => {
                let first = self.ident()?;
                if self.eat(Tok::Dot) {
                    let name = self.ident()?;
                    Type::Named {
                        pkg: Some(first.sym),
                        name: name.sym,
                    }
                } else {
                    Type::Named {
                        pkg: None,
                        name: first.sym,
                    }
                }
            }
            Some(Tok::Star) => {
                self.bump();
                Type::Pointer(self.parse_type()?)
            }
            Some(Tok::LBrack) => {
                self.bump();
                if self.eat(Tok::RBrack) {
                    Type::Slice(self.parse_type()?)
                } else if self.eat(Tok::Ellipsis) {
                    self.expect(Tok::RBrack, "']'")?;
                    Type::Array {
                        len: None,
                        elem: self.parse_type()?,
                    }
                } else {
                    let len = self.with_lit(true, Self::expr)?;
                    self.expect(Tok::RBrack, "']'")?;
                    Type::Array {
                        len: Some(len),
                        elem: self.parse_type()?,
                    }
                }
            }
            Some(Tok::KwMap) => {
                self.bump();
                self.expect(Tok::LBrack, "'['")?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack, "']'")?;
                Type::Map {
                    key,
                    value: self.parse_type()?,
                }
            }
            Some(Tok::KwChan) => {
                self.bump();
                let dir = if self.eat(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::Arrow) => {
                self.bump();
                self.expect(Tok::KwChan, "'chan'")?;
                Type::Chan {
                    dir: ChanDir::Recv,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::KwFunc) => {
                self.bump();
                Type::Func(self.signature()?)
            }
            Some(Tok::KwStruct) => {
                self.bump();
                Type::Struct {
                    fields: self.struct_fields()?,
                }
            }
            Some(Tok::KwInterface) => {
                self.bump();
                Type::Interface {
                    methods: self.interface_methods()?,
                }
            }
            Some(Tok::LParen) => {
                self.bump();
                let inner = self.parse_type()?;
                self.expect(Tok::RParen, "')'")?;
                return Ok(inner);
            }
            _ => return self.unexpected("type"),
        };
        Ok(self.arena.types.alloc(typ, self.span_from(start)))
    }

    fn struct_fields(&mut self) -> PResult<ListRef<FieldId>> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) && self.peek().is_some() {
            let start = self.start();
            let embedded = match (self.peek(), self.peek_at(1)) {
                (Some(Tok::Ident(_)), Some(next)) => matches!(
                    next,
                    Tok::Dot | Tok::Semi | Tok::RBrace | Tok::StringLit(_) | Tok::RawStringLit(_)
                ),
                _ => true,
            };
            let names = if embedded {
                ListRef::EMPTY
            } else {
                let names = self.ident_list()?;
                self.arena.list_ident_names(names)
            };
            let typ = self.parse_type()?;
            let tag = match self.peek() {
                Some(Tok::StringLit(s) | Tok::RawStringLit(s)) => {
                    self.bump();
                    Some(self.interner.intern(s))
                }
                _ => None,
            };
            fields.push(self.arena.fields.alloc(
                Field {
                    names,
                    typ,
                    variadic: false,
                    tag,
                },
                self.span_from(start),
            ));
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(self.arena.list_fields(fields))
    }

    fn interface_methods(&mut self) -> PResult<ListRef<FieldId>> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut methods = Vec::new();
        while !self.at(Tok::RBrace) && self.peek().is_some() {
            let start = self.start();
            let field = if matches!(
                (self.peek(), self.peek_at(1)),
                (Some(Tok::Ident(_)), Some(Tok::LParen))
            ) {
                let name = self.ident()?;
                let sig_start = self.start();
                let sig = self.signature()?;
                let typ = self
                    .arena
                    .types
                    .alloc(Type::Func(sig), self.span_from(sig_start));
                Field {
                    names: self.arena.list_ident_names([name]),
                    typ,
                    variadic: false,
                    tag: None,
                }
            } else {
                Field {
                    names: ListRef::EMPTY,
                    typ: self.parse_type()?,
                    variadic: false,
                    tag: None,
                }
            };
            methods.push(self.arena.fields.alloc(field, self.span_from(start)));
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(self.arena.list_fields(methods))
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn block(&mut self) -> PResult<BlockId> {
        let start = self.start();
        self.expect(Tok::LBrace, "'{'")?;
        let stmts = self.with_lit(true, Self::stmt_list)?;
        self.expect(Tok::RBrace, "'}'")?;
        let stmts = self.arena.list_stmts(stmts);
        Ok(self.arena.blocks.alloc(Block { stmts }, self.span_from(start)))
    }

    fn stmt_list(&mut self) -> PResult<Vec<StmtId>> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                None | Some(Tok::RBrace | Tok::KwCase | Tok::KwDefault) => break,
                Some(Tok::Semi) => {
                    self.bump();
                }
                Some(_) => {
                    stmts.push(self.stmt()?);
                    if !matches!(
                        self.peek(),
                        None | Some(Tok::RBrace | Tok::KwCase | Tok::KwDefault)
                    ) {
                        self.expect_semi()?;
                    }
                }
            }
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        let stmt = match self.peek() {
            Some(Tok::KwVar | Tok::KwConst | Tok::KwType) => Stmt::Decl(self.gen_decl()?),
            Some(Tok::KwGo) => {
                self.bump();
                Stmt::Go(self.expr()?)
            }
            Some(Tok::KwDefer) => {
                self.bump();
                Stmt::Defer(self.expr()?)
            }
            Some(Tok::KwReturn) => {
                self.bump();
                let results = match self.peek() {
                    Some(Tok::Semi | Tok::RBrace) | None => Vec::new(),
                    Some(_) => self.expr_list()?,
                };
                Stmt::Return(self.arena.list_exprs(results))
            }
            Some(tok @ (Tok::KwBreak | Tok::KwContinue | Tok::KwGoto | Tok::KwFallthrough)) => {
                self.bump();
                let kind = match tok {
                    Tok::KwBreak => BranchKind::Break,
                    Tok::KwContinue => BranchKind::Continue,
                    Tok::KwGoto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = match self.peek() {
                    Some(Tok::Ident(_)) if kind != BranchKind::Fallthrough => Some(self.ident()?),
                    _ => None,
                };
                Stmt::Branch { kind, label }
            }
            Some(Tok::LBrace) => Stmt::Block(self.block()?),
            Some(Tok::KwIf) => return self.if_stmt(),
            Some(Tok::KwFor) => return self.for_stmt(),
            Some(Tok::KwSwitch) => return self.switch_stmt(),
            Some(Tok::KwSelect) => return self.select_stmt(),
            Some(Tok::Ident(_)) if self.peek_at(1) == Some(Tok::Colon) => {
                let label = self.ident()?;
                self.bump();
                let stmt = self.stmt()?;
                Stmt::Labeled { label, stmt }
            }
            _ => Stmt::Simple(self.simple_stmt()?),
        };
        Ok(self.arena.stmts.alloc(stmt, self.span_from(start)))
    }

    /// `a, b :=` ahead, with only identifiers on the left.
    fn at_short_var_decl(&self) -> bool {
        let mut i = self.pos;
        loop {
            match self.toks.get(i).map(|t| t.1) {
                Some(Tok::Ident(_)) => i += 1,
                _ => return false,
            }
            match self.toks.get(i).map(|t| t.1) {
                Some(Tok::Comma) => i += 1,
                Some(Tok::Define) => return true,
                _ => return false,
            }
        }
    }

    fn simple_stmt(&mut self) -> PResult<SimpleStmtId> {
        let start = self.start();
        let stmt = if self.at_short_var_decl() {
            let names = self.ident_list()?;
            self.expect(Tok::Define, "':='")?;
            let values = self.expr_list()?;
            SimpleStmt::ShortVarDecl {
                names: self.arena.list_ident_names(names),
                values: self.arena.list_exprs(values),
            }
        } else {
            let lhs = self.expr_list()?;
            match self.peek() {
                Some(tok) if assign_op(tok).is_some() => {
                    self.bump();
                    let op = assign_op(tok).unwrap_or(AssignOp::Assign);
                    let rhs = self.expr_list()?;
                    SimpleStmt::Assign {
                        lhs: self.arena.list_exprs(lhs),
                        op,
                        rhs: self.arena.list_exprs(rhs),
                    }
                }
                Some(tok @ (Tok::Inc | Tok::Dec)) => {
                    let expr = self.single(&lhs, start)?;
                    self.bump();
                    let op = if tok == Tok::Inc {
                        IncDecOp::Inc
                    } else {
                        IncDecOp::Dec
                    };
                    SimpleStmt::IncDec { expr, op }
                }
                Some(Tok::Arrow) => {
                    let chan = self.single(&lhs, start)?;
                    self.bump();
                    let value = self.expr()?;
                    SimpleStmt::Send { chan, value }
                }
                Some(Tok::Define) => {
                    return Err(Diag::parse(
                        self.span_from(start),
                        "non-name on left side of :=",
                    ))
                }
                _ => SimpleStmt::Expr(self.single(&lhs, start)?),
            }
        };
        Ok(self.arena.simple_stmts.alloc(stmt, self.span_from(start)))
    }

    fn single(&self, list: &[ExprId], start: usize) -> PResult<ExprId> {
        match list {
            [one] => Ok(*one),
            _ => Err(Diag::parse(
                self.span_from(start),
                format!("expected 1 expression, found {}", list.len()),
            )),
        }
    }

    fn expr_of(&self, stmt: SimpleStmtId) -> PResult<ExprId> {
        match self.arena.simple_stmts[stmt] {
            SimpleStmt::Expr(e) => Ok(e),
            _ => Err(Diag::parse(
                self.arena.simple_stmts.span(stmt),
                "expected expression, found simple statement",
            )),
        }
    }

    fn if_stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        self.expect(Tok::KwIf, "'if'")?;
        let (init, cond) = self.with_lit(false, |p| {
            if p.eat(Tok::Semi) {
                return Ok((None, p.expr()?));
            }
            let first = p.simple_stmt()?;
            if p.eat(Tok::Semi) {
                Ok((Some(first), p.expr()?))
            } else {
                Ok((None, p.expr_of(first)?))
            }
        })?;
        let then_block = self.block()?;
        let else_stmt = if self.eat(Tok::KwElse) {
            match self.peek() {
                Some(Tok::KwIf) => Some(self.if_stmt()?),
                Some(Tok::LBrace) => {
                    let else_start = self.start();
                    let block = self.block()?;
                    Some(
                        self.arena
                            .stmts
                            .alloc(Stmt::Block(block), self.span_from(else_start)),
                    )
                }
                _ => return self.unexpected("'if' or block after 'else'"),
            }
        } else {
            None
        };
        Ok(self.arena.stmts.alloc(
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            },
            self.span_from(start),
        ))
    }

    /// `(:=|=) range` at bracket depth 0 before the loop body; `Some(define)`.
    fn range_ahead(&self) -> Option<bool> {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(&(_, tok, _)) = self.toks.get(i) {
            match tok {
                Tok::LParen | Tok::LBrack => depth += 1,
                Tok::RParen | Tok::RBrack => depth = depth.saturating_sub(1),
                Tok::LBrace | Tok::Semi if depth == 0 => return None,
                Tok::Define | Tok::Assign if depth == 0 => {
                    return (self.toks.get(i + 1).map(|t| t.1) == Some(Tok::KwRange))
                        .then_some(tok == Tok::Define);
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn for_stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        self.expect(Tok::KwFor, "'for'")?;
        let kind = self.with_lit(false, |p| {
            if p.at(Tok::LBrace) {
                return Ok(ForKind::Infinite);
            }
            if p.eat(Tok::KwRange) {
                return Ok(ForKind::Range {
                    key: None,
                    value: None,
                    define: false,
                    expr: p.expr()?,
                });
            }
            if let Some(define) = p.range_ahead() {
                let key = p.expr()?;
                let value = if p.eat(Tok::Comma) {
                    Some(p.expr()?)
                } else {
                    None
                };
                p.bump();
                p.expect(Tok::KwRange, "'range'")?;
                return Ok(ForKind::Range {
                    key: Some(key),
                    value,
                    define,
                    expr: p.expr()?,
                });
            }

            let init = if p.at(Tok::Semi) {
                None
            } else {
                Some(p.simple_stmt()?)
            };
            if !p.eat(Tok::Semi) {
                return match init {
                    Some(s) => Ok(ForKind::Cond(p.expr_of(s)?)),
                    None => Ok(ForKind::Infinite),
                };
            }
            let cond = if p.at(Tok::Semi) {
                None
            } else {
                Some(p.expr()?)
            };
            p.expect(Tok::Semi, "';'")?;
            let post = if p.at(Tok::LBrace) {
                None
            } else {
                Some(p.simple_stmt()?)
            };
            Ok(ForKind::Clause { init, cond, post })
        })?;
        let body = self.block()?;
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::For { kind, body }, self.span_from(start)))
    }

    fn type_switch_guard(&self, stmt: SimpleStmtId) -> Option<(Option<IdentName>, ExprId)> {
        let is_guard = |e: ExprId| matches!(self.arena.exprs[e], Expr::TypeAssert { typ: None, .. });
        match self.arena.simple_stmts[stmt] {
            SimpleStmt::Expr(e) if is_guard(e) => Some((None, e)),
            SimpleStmt::ShortVarDecl { names, values } => {
                match (self.arena.ident_names(names), self.arena.exprs_list(values)) {
                    ([name], [value]) if is_guard(*value) => Some((Some(*name), *value)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn switch_stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        self.expect(Tok::KwSwitch, "'switch'")?;
        let (init, tag_stmt) = self.with_lit(false, |p| {
            if p.at(Tok::LBrace) {
                return Ok((None, None));
            }
            let first = if p.at(Tok::Semi) {
                None
            } else {
                Some(p.simple_stmt()?)
            };
            if !p.eat(Tok::Semi) {
                return Ok((None, first));
            }
            let tag = if p.at(Tok::LBrace) {
                None
            } else {
                Some(p.simple_stmt()?)
            };
            Ok((first, tag))
        })?;

        let guard = tag_stmt.and_then(|s| self.type_switch_guard(s));
        self.expect(Tok::LBrace, "'{'")?;
        let mut clauses = Vec::new();
        while matches!(self.peek(), Some(Tok::KwCase | Tok::KwDefault)) {
            clauses.push(self.switch_clause(guard.is_some())?);
        }
        self.expect(Tok::RBrace, "'}'")?;
        let clauses = self.arena.list_switch_clause_ids(clauses);

        let stmt = match guard {
            Some((bind, guard)) => Stmt::TypeSwitch {
                init,
                bind,
                guard,
                clauses,
            },
            None => Stmt::Switch {
                init,
                tag: tag_stmt.map(|s| self.expr_of(s)).transpose()?,
                clauses,
            },
        };
        Ok(self.arena.stmts.alloc(stmt, self.span_from(start)))
    }

    fn switch_clause(&mut self, types: bool) -> PResult<SwitchClauseId> {
        let start = self.start();
        let kind = if self.eat(Tok::KwDefault) {
            CaseKind::Default
        } else {
            self.expect(Tok::KwCase, "'case'")?;
            if types {
                let mut list = vec![self.parse_type()?];
                while self.eat(Tok::Comma) {
                    list.push(self.parse_type()?);
                }
                CaseKind::Types(self.arena.list_types(list))
            } else {
                let list = self.expr_list()?;
                CaseKind::Exprs(self.arena.list_exprs(list))
            }
        };
        self.expect(Tok::Colon, "':'")?;
        let stmts = self.stmt_list()?;
        let stmts = self.arena.list_stmts(stmts);
        Ok(self
            .arena
            .switch_clauses
            .alloc(SwitchClause { kind, stmts }, self.span_from(start)))
    }

    fn select_stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        self.expect(Tok::KwSelect, "'select'")?;
        self.expect(Tok::LBrace, "'{'")?;
        let mut clauses = Vec::new();
        while matches!(self.peek(), Some(Tok::KwCase | Tok::KwDefault)) {
            let clause_start = self.start();
            let comm = if self.eat(Tok::KwDefault) {
                None
            } else {
                self.expect(Tok::KwCase, "'case'")?;
                Some(self.simple_stmt()?)
            };
            self.expect(Tok::Colon, "':'")?;
            let stmts = self.stmt_list()?;
            let stmts = self.arena.list_stmts(stmts);
            clauses.push(
                self.arena
                    .comm_clauses
                    .alloc(CommClause { comm, stmts }, self.span_from(clause_start)),
            );
        }
        self.expect(Tok::RBrace, "'}'")?;
        let clauses = self.arena.list_comm_clause_ids(clauses);
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::Select { clauses }, self.span_from(start)))
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr_list(&mut self) -> PResult<Vec<ExprId>> {
        let mut list = vec![self.expr()?];
        while self.eat(Tok::Comma) {
            list.push(self.expr()?);
        }
        Ok(list)
    }

    fn expr(&mut self) -> PResult<ExprId> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, prec1: u8) -> PResult<ExprId> {
        let start = self.start();
        let mut x = self.unary_expr()?;
        while let Some(op) = self.peek().and_then(binary_op) {
            let prec = op.precedence();
            if prec < prec1 {
                break;
            }
            self.bump();
            let right = self.binary_expr(prec + 1)?;
            x = self.arena.exprs.alloc(
                Expr::Binary { left: x, op, right },
                self.span_from(start),
            );
        }
        Ok(x)
    }

    fn unary_expr(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let op = match self.peek() {
            Some(Tok::Plus) => UnaryOp::Add,
            Some(Tok::Minus) => UnaryOp::Sub,
            Some(Tok::Bang) => UnaryOp::Not,
            Some(Tok::Caret) => UnaryOp::Xor,
            Some(Tok::Star) => UnaryOp::Deref,
            Some(Tok::Amp) => UnaryOp::Addr,
            Some(Tok::Arrow) => UnaryOp::Recv,
            _ => return self.primary_expr(),
        };
        self.bump();
        let expr = self.unary_expr()?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::Unary { op, expr }, self.span_from(start)))
    }

    fn primary_expr(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let mut x = self.operand()?;
        loop {
            let expr = match self.peek() {
                Some(Tok::Dot) => {
                    self.bump();
                    if self.eat(Tok::LParen) {
                        let typ = if self.eat(Tok::KwType) {
                            None
                        } else {
                            Some(self.parse_type()?)
                        };
                        self.expect(Tok::RParen, "')'")?;
                        Expr::TypeAssert { expr: x, typ }
                    } else {
                        Expr::Selector {
                            expr: x,
                            sel: self.ident()?,
                        }
                    }
                }
                Some(Tok::LBrack) => {
                    self.bump();
                    let expr = self.with_lit(true, |p| p.index_or_slice(x))?;
                    self.expect(Tok::RBrack, "']'")?;
                    expr
                }
                Some(Tok::LParen) => {
                    self.bump();
                    let (args, ellipsis) = self.with_lit(true, Self::call_args)?;
                    self.expect(Tok::RParen, "')'")?;
                    Expr::Call {
                        callee: x,
                        args: self.arena.list_exprs(args),
                        ellipsis,
                    }
                }
                Some(Tok::LBrace) if self.is_literal_type(x) => {
                    let typ = self.literal_type(x);
                    x = self.composite_lit(start, Some(typ))?;
                    continue;
                }
                _ => break,
            };
            x = self.arena.exprs.alloc(expr, self.span_from(start));
        }
        Ok(x)
    }

    fn index_or_slice(&mut self, x: ExprId) -> PResult<Expr> {
        let lo = if self.at(Tok::Colon) {
            None
        } else {
            Some(self.expr()?)
        };
        if !self.eat(Tok::Colon) {
            return match lo {
                Some(index) => Ok(Expr::Index { expr: x, index }),
                None => self.unexpected("index"),
            };
        }
        let hi = match self.peek() {
            Some(Tok::Colon | Tok::RBrack) => None,
            _ => Some(self.expr()?),
        };
        let max = if self.eat(Tok::Colon) {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Expr::Slice {
            expr: x,
            lo,
            hi,
            max,
        })
    }

    fn call_args(&mut self) -> PResult<(Vec<ExprId>, bool)> {
        let mut args = Vec::new();
        let mut ellipsis = false;
        while !self.at(Tok::RParen) {
            args.push(self.expr()?);
            if self.eat(Tok::Ellipsis) {
                ellipsis = true;
            }
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        Ok((args, ellipsis))
    }

    fn is_literal_type(&self, x: ExprId) -> bool {
        match self.arena.exprs[x] {
            Expr::Ident(_) => !self.no_lit,
            Expr::Selector { expr, .. } => {
                !self.no_lit && matches!(self.arena.exprs[expr], Expr::Ident(_))
            }
            Expr::TypeExpr(t) => matches!(
                self.arena.types[t],
                Type::Array { .. } | Type::Slice(_) | Type::Map { .. } | Type::Struct { .. }
            ),
            _ => false,
        }
    }

    /// Re-reads a literal's type operand as a type node.
    fn literal_type(&mut self, x: ExprId) -> TypeId {
        let span = self.arena.exprs.span(x);
        let named = match self.arena.exprs[x] {
            Expr::TypeExpr(t) => return t,
            Expr::Ident(name) => Type::Named { pkg: None, name },
            Expr::Selector { expr, sel } => match self.arena.exprs[expr] {
                Expr::Ident(pkg) => Type::Named {
                    pkg: Some(pkg),
                    name: sel.sym,
                },
                _ => Type::Named {
                    pkg: None,
                    name: sel.sym,
                },
            },
            _ => Type::Named {
                pkg: None,
                name: self.interner.intern("_"),
            },
        };
        self.arena.types.alloc(named, span)
    }

    fn composite_lit(&mut self, start: usize, typ: Option<TypeId>) -> PResult<ExprId> {
        self.expect(Tok::LBrace, "'{'")?;
        let elems = self.with_lit(true, |p| {
            let mut elems = Vec::new();
            while !p.at(Tok::RBrace) {
                let first = p.element()?;
                let elem = if p.eat(Tok::Colon) {
                    KeyedElement {
                        key: Some(first),
                        value: p.element()?,
                    }
                } else {
                    KeyedElement {
                        key: None,
                        value: first,
                    }
                };
                elems.push(elem);
                if !p.eat(Tok::Comma) {
                    break;
                }
            }
            Ok(elems)
        })?;
        self.expect(Tok::RBrace, "'}'")?;
        let elems = self.arena.list_keyed_elems(elems);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::CompositeLit { typ, elems }, self.span_from(start)))
    }

    fn element(&mut self) -> PResult<ExprId> {
        if self.at(Tok::LBrace) {
            let start = self.start();
            self.composite_lit(start, None)
        } else {
            self.expr()
        }
    }

    fn operand(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let lit = |kind, s: &str, p: &mut Self| {
            p.bump();
            Expr::BasicLit(BasicLit {
                kind,
                value: p.interner.intern(s),
            })
        };
        let expr = match self.peek() {
            Some(Tok::Ident(s)) => {
                self.bump();
                Expr::Ident(self.interner.intern(s))
            }
            Some(Tok::IntLit(s)) => lit(BasicLitKind::Int, s, self),
            Some(Tok::FloatLit(s)) => lit(BasicLitKind::Float, s, self),
            Some(Tok::ImagLit(s)) => lit(BasicLitKind::Imag, s, self),
            Some(Tok::RuneLit(s)) => lit(BasicLitKind::Rune, s, self),
            Some(Tok::StringLit(s) | Tok::RawStringLit(s)) => lit(BasicLitKind::String, s, self),
            Some(Tok::LParen) => {
                self.bump();
                let inner = self.with_lit(true, Self::expr)?;
                self.expect(Tok::RParen, "')'")?;
                Expr::Paren(inner)
            }
            Some(Tok::KwFunc) => {
                self.bump();
                let sig = self.signature()?;
                if self.at(Tok::LBrace) {
                    let body = self.with_lit(true, Self::block)?;
                    Expr::FuncLit { sig, body }
                } else {
                    let typ = self.arena.types.alloc(Type::Func(sig), self.span_from(start));
                    Expr::TypeExpr(typ)
                }
            }
            Some(Tok::LBrack | Tok::KwMap | Tok::KwChan | Tok::KwStruct | Tok::KwInterface) => {
                Expr::TypeExpr(self.parse_type()?)
            }
            _ => return self.unexpected("expression"),
        };
        Ok(self.arena.exprs.alloc(expr, self.span_from(start)))
    }

    // -------------------------------------------------------------------------
    // Comments
    // -------------------------------------------------------------------------

    /// Groups comments like Go: a trailing comment group stays on its line,
    /// an own-line group takes comments on adjacent lines.
    fn comment_groups(&mut self, raw: &[RawComment]) -> ListRef<CommentGroupId> {
        let mut groups = Vec::new();
        let mut i = 0;
        while i < raw.len() {
            let trailing = !raw[i].own_line;
            let mut j = i + 1;
            while let Some(next) = raw.get(j) {
                let between = &self.src[raw[j - 1].span.end..next.span.start];
                if !between.bytes().all(|b| b.is_ascii_whitespace()) {
                    break;
                }
                let lines = between.bytes().filter(|&b| b == b'\n').count();
                if !(lines == 0 || (!trailing && lines == 1)) {
                    break;
                }
                j += 1;
            }

            let ids: Vec<CommentId> = raw[i..j]
                .iter()
                .map(|c| {
                    let text = self.interner.intern(&self.src[c.span.clone()]);
                    self.arena.comments.alloc(
                        Comment { kind: c.kind, text },
                        Span::new(c.span.start, c.span.end),
                    )
                })
                .collect();
            let span = Span::new(raw[i].span.start, raw[j - 1].span.end);
            let comments = self.arena.list_comment_ids(ids);
            groups.push(
                self.arena
                    .comment_groups
                    .alloc(CommentGroup { comments }, span),
            );
            i = j;
        }
        self.arena.list_comment_group_ids(groups)
    }
}

fn binary_op(tok: Tok<'_>) -> Option<BinaryOp> {
    Some(match tok {
        Tok::Plus => BinaryOp::Add,
        Tok::Minus => BinaryOp::Sub,
        Tok::Star => BinaryOp::Mul,
        Tok::Slash => BinaryOp::Div,
        Tok::Percent => BinaryOp::Mod,
        Tok::Amp => BinaryOp::And,
        Tok::Pipe => BinaryOp::Or,
        Tok::Caret => BinaryOp::Xor,
        Tok::Shl => BinaryOp::Shl,
        Tok::Shr => BinaryOp::Shr,
        Tok::AndNot => BinaryOp::AndNot,
        Tok::LAnd => BinaryOp::LAnd,
        Tok::LOr => BinaryOp::LOr,
        Tok::EqEq => BinaryOp::Eq,
        Tok::NotEq => BinaryOp::Ne,
        Tok::Lt => BinaryOp::Lt,
        Tok::Le => BinaryOp::Le,
        Tok::Gt => BinaryOp::Gt,
        Tok::Ge => BinaryOp::Ge,
        _ => return None,
    })
}

fn assign_op(tok: Tok<'_>) -> Option<AssignOp> {
    Some(match tok {
        Tok::Assign => AssignOp::Assign,
        Tok::AddAssign => AssignOp::AddAssign,
        Tok::SubAssign => AssignOp::SubAssign,
        Tok::MulAssign => AssignOp::MulAssign,
        Tok::DivAssign => AssignOp::DivAssign,
        Tok::ModAssign => AssignOp::ModAssign,
        Tok::AndAssign => AssignOp::AndAssign,
        Tok::OrAssign => AssignOp::OrAssign,
        Tok::XorAssign => AssignOp::XorAssign,
        Tok::ShlAssign => AssignOp::ShlAssign,
        Tok::ShrAssign => AssignOp::ShrAssign,
        Tok::AndNotAssign => AssignOp::AndNotAssign,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Document {
        match parse_source(src) {
            Ok(doc) => doc,
            Err(e) => panic!("parse failed: {e}"),
        }
    }

    fn only_func_body(doc: &Document) -> &[StmtId] {
        let decls = doc.arena.top_decls(doc.file.decls);
        let Some(TopLevelDecl::Func(f)) = decls.last() else {
            panic!("no function");
        };
        let Some(body) = doc.arena.funcs[*f].body else {
            panic!("no body");
        };
        doc.arena.stmts_list(doc.arena.blocks[body].stmts)
    }

    #[test]
    fn spans_cover_statements() {
        let src = "package p\n\nfunc f() {\n\tx := 3\n\tprintln(x)\n}\n";
        let doc = parse(src);
        let stmts = only_func_body(&doc);
        assert_eq!(stmts.len(), 2);
        let s = doc.arena.stmts.span(stmts[0]);
        assert_eq!(&src[s.start as usize..s.end as usize], "x := 3");
        let s = doc.arena.stmts.span(stmts[1]);
        assert_eq!(&src[s.start as usize..s.end as usize], "println(x)");
    }

    #[test]
    fn groups_parameters_by_type() {
        let doc = parse("package p\n\nfunc f(a, b int, c string) {}\n");
        let decls = doc.arena.top_decls(doc.file.decls);
        let TopLevelDecl::Func(f) = decls[0] else {
            panic!("expected func");
        };
        let sig = doc.arena.signatures[doc.arena.funcs[f].sig];
        let params = doc.arena.fields_list(sig.params);
        assert_eq!(params.len(), 2);
        assert_eq!(doc.arena.ident_names(doc.arena.fields[params[0]].names).len(), 2);
    }

    #[test]
    fn unnamed_parameters_are_types() {
        let doc = parse("package p\n\ntype F func(int, []string) (bool, error)\n");
        let decls = doc.arena.top_decls(doc.file.decls);
        let TopLevelDecl::Decl(d) = decls[0] else {
            panic!("expected decl");
        };
        let spec = doc.arena.specs_list(doc.arena.decls[d].specs)[0];
        let Spec::Type { typ, .. } = doc.arena.specs[spec] else {
            panic!("expected type spec");
        };
        let Type::Func(sig) = doc.arena.types[typ] else {
            panic!("expected func type");
        };
        let sig = doc.arena.signatures[sig];
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.results.len(), 2);
    }

    #[test]
    fn composite_literal_not_taken_in_if_header() {
        let doc = parse("package p\n\nfunc f(x T) {\n\tif x == y {\n\t}\n}\n");
        let stmts = only_func_body(&doc);
        assert!(matches!(doc.arena.stmts[stmts[0]], Stmt::If { .. }));
    }

    #[test]
    fn recognizes_range_and_type_switch() {
        let src = "package p\n\nfunc f(xs []int, v any) {\n\tfor i, x := range xs {\n\t\t_ = i + x\n\t}\n\tswitch t := v.(type) {\n\tcase int:\n\t\t_ = t\n\t}\n}\n";
        let doc = parse(src);
        let stmts = only_func_body(&doc);
        assert!(matches!(
            doc.arena.stmts[stmts[0]],
            Stmt::For {
                kind: ForKind::Range { define: true, .. },
                ..
            }
        ));
        assert!(matches!(
            doc.arena.stmts[stmts[1]],
            Stmt::TypeSwitch { bind: Some(_), .. }
        ));
    }

    #[test]
    fn collects_comment_groups() {
        let src = "package p\n\n// a\n// b\n\n// c\nfunc f() {\n\tx := 1 // d\n\t_ = x\n}\n";
        let doc = parse(src);
        let groups = doc.arena.comment_group_ids(doc.file.comments);
        assert_eq!(groups.len(), 3);
        let first = doc.arena.comment_groups[groups[0]];
        assert_eq!(first.comments.len(), 2);
    }

    #[test]
    fn reports_first_syntax_error() {
        let err = parse_source("package p\n\nfunc f() {\n\tx :=\n}\n").unwrap_err();
        assert_eq!(err.diags.len(), 1);
        assert!(err.diags[0].message.contains("expected expression"));
    }
}
