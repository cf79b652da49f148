//! Concrete-syntax renderer shared by the printer and the layout pass.
//!
//! The renderer walks the tree and writes gofmt-style text into a [`Sink`].
//! A [`TextSink`] collects the text; a [`LayoutSink`] only measures it and
//! records where every node and identifier landed, so computed positions and
//! printed text cannot disagree.
//!
//! Blank lines, line breaks inside lists and comment placement are derived
//! from the spans already in the tree, measured against the `LineIndex` the
//! renderer was built with. Fresh nodes (`Span::UNSET`) get the minimum
//! spacing.

use crate::ast::*;
use crate::document::{Document, LineIndex};

/// A place a laid-out span is written back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanSlot {
    Node(NodeRef),
    Ident(IdentSlot),
    /// The `package name` clause.
    PackageClause,
}

/// Receives rendered text.
pub trait Sink {
    /// `s` may contain newlines.
    fn write(&mut self, s: &str);
    /// Document offset of the next byte written.
    fn offset(&self) -> u32;
    fn mark(&mut self, slot: SpanSlot, span: Span);
}

/// Collects rendered text.
#[derive(Debug, Default)]
pub struct TextSink {
    out: String,
    base: u32,
}

impl TextSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

impl Sink for TextSink {
    #[inline]
    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    #[inline]
    fn offset(&self) -> u32 {
        self.base + self.out.len() as u32
    }

    #[inline]
    fn mark(&mut self, _: SpanSlot, _: Span) {}
}

/// Measures rendered text starting at a document offset.
#[derive(Debug)]
pub struct LayoutSink {
    offset: u32,
    line: u32,
    lines: Vec<u32>,
    marks: Vec<(SpanSlot, Span)>,
}

/// Result of a layout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Offset one past the last byte written.
    pub end: u32,
    /// Lengths of the lines terminated while rendering.
    pub lines: Vec<u32>,
    /// Length of the final, unterminated line.
    pub tail: u32,
    pub marks: Vec<(SpanSlot, Span)>,
}

impl LayoutSink {
    pub fn new(base: u32) -> Self {
        Self {
            offset: base,
            line: 0,
            lines: Vec::new(),
            marks: Vec::new(),
        }
    }

    pub fn finish(self) -> Layout {
        Layout {
            end: self.offset,
            lines: self.lines,
            tail: self.line,
            marks: self.marks,
        }
    }
}

impl Sink for LayoutSink {
    fn write(&mut self, s: &str) {
        let mut rest = s.as_bytes();
        while let Some(nl) = memchr::memchr(b'\n', rest) {
            self.lines.push(self.line + nl as u32);
            self.line = 0;
            rest = &rest[nl + 1..];
        }
        self.line += rest.len() as u32;
        self.offset += s.len() as u32;
    }

    #[inline]
    fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    fn mark(&mut self, slot: SpanSlot, span: Span) {
        self.marks.push((slot, span));
    }
}

/// Bodies longer than this are never put on one line.
const ONE_LINE_MAX: u32 = 100;
/// A struct or interface with one member stays on one line up to this size.
const ONE_LINE_FIELD_MAX: u32 = 30;

#[inline]
fn known(offset: u32) -> Option<u32> {
    (offset != u32::MAX).then_some(offset)
}

fn reduce_depth(depth: u32) -> u32 {
    depth.saturating_sub(1).max(1)
}

pub struct Renderer<'d, S: Sink> {
    arena: &'d AstArena,
    interner: &'d Interner,
    index: &'d LineIndex,
    comments: Vec<CommentGroupId>,
    next_comment: usize,
    sink: S,
    indent: u32,
    /// Source end of the last item written, for blank-line and trailing-comment decisions.
    last_end: Option<u32>,
    at_start: bool,
    /// Operator just written, if nothing followed it yet.
    last_op: Option<&'static str>,
}

impl<'d, S: Sink> Renderer<'d, S> {
    /// Renders `doc` with all of its comments.
    pub fn new(doc: &'d Document, sink: S) -> Self {
        let comments = doc.arena.comment_group_ids(doc.file.comments).to_vec();
        Self::with_parts(&doc.arena, &doc.interner, doc.line_index(), comments, sink)
    }

    /// `comments` must be sorted by start offset; `index` must match the spans in `arena`.
    pub fn with_parts(
        arena: &'d AstArena,
        interner: &'d Interner,
        index: &'d LineIndex,
        comments: Vec<CommentGroupId>,
        sink: S,
    ) -> Self {
        Self {
            arena,
            interner,
            index,
            comments,
            next_comment: 0,
            sink,
            indent: 0,
            last_end: None,
            at_start: false,
            last_op: None,
        }
    }

    /// Returns the sink and the comment groups that were never written.
    pub fn finish(self) -> (S, Vec<CommentGroupId>) {
        let rest = self.comments[self.next_comment..].to_vec();
        (self.sink, rest)
    }

    // -------------------------------------------------------------------------
    // Output primitives
    // -------------------------------------------------------------------------

    #[inline]
    fn text(&mut self, s: &str) {
        self.sink.write(s);
        self.last_op = None;
    }

    fn sym(&mut self, sym: Symbol) {
        let interner = self.interner;
        self.text(interner.resolve(sym));
    }

    /// Separates tokens that would lex as one (`- -x`, `a/ *p`, `a& ^b`).
    fn space_if_combines(&mut self, next: &str) {
        let combines = match (self.last_op, next.as_bytes().first()) {
            (Some("+"), Some(b'+')) | (Some("-"), Some(b'-')) | (Some("/"), Some(b'*')) => true,
            (Some("<"), Some(b'-' | b'<')) | (Some("&"), Some(b'&' | b'^')) => true,
            _ => false,
        };
        if combines {
            self.text(" ");
        }
    }

    fn op(&mut self, op: &'static str) {
        self.space_if_combines(op);
        self.sink.write(op);
        self.last_op = Some(op);
    }

    fn newlines(&mut self, n: u32) {
        for _ in 0..n {
            self.sink.write("\n");
        }
        for _ in 0..self.indent {
            self.sink.write("\t");
        }
        self.last_op = None;
    }

    #[inline]
    fn mark(&mut self, node: NodeRef, start: u32) {
        let end = self.sink.offset();
        self.sink.mark(SpanSlot::Node(node), Span { start, end });
    }

    fn ident_name(&mut self, name: IdentName, slot: IdentSlot) {
        let start = self.sink.offset();
        self.sym(name.sym);
        let end = self.sink.offset();
        self.sink.mark(SpanSlot::Ident(slot), Span { start, end });
    }

    fn ident_list(&mut self, names: ListRef<IdentName>) {
        let arena = self.arena;
        for (i, &name) in arena.ident_names(names).iter().enumerate() {
            if i > 0 {
                self.text(", ");
            }
            self.ident_name(name, AstArena::ident_slot(names, i));
        }
    }

    // -------------------------------------------------------------------------
    // Lines and comments
    // -------------------------------------------------------------------------

    #[inline]
    fn line_at(&self, offset: u32) -> Option<u32> {
        known(offset).map(|o| self.index.line_of(o))
    }

    fn same_line(&self, a: u32, b: u32) -> bool {
        matches!((self.line_at(a), self.line_at(b)), (Some(x), Some(y)) if x == y)
    }

    /// Line breaks before an item starting at `next`: the source distance,
    /// clamped to `min..=2`.
    fn gap(&self, next: Span, min: u32) -> u32 {
        match (self.last_end.and_then(|e| self.line_at(e)), self.line_at(next.start)) {
            (Some(prev), Some(line)) => line.saturating_sub(prev).clamp(min, 2),
            _ => min,
        }
    }

    fn separate(&mut self, next: Span, min: u32) {
        if std::mem::take(&mut self.at_start) {
            return;
        }
        let n = self.gap(next, min);
        self.newlines(n);
    }

    fn is_trailing(&self, span: Span) -> bool {
        self.last_end.is_some_and(|e| self.same_line(e, span.start))
    }

    fn pending_comment(&self) -> Option<(CommentGroupId, Span)> {
        let g = *self.comments.get(self.next_comment)?;
        Some((g, self.arena.comment_groups.span(g)))
    }

    /// True when a pending comment starts inside `span`.
    fn comments_within(&self, span: Span) -> bool {
        if span.is_unset() {
            return false;
        }
        let arena = self.arena;
        self.comments[self.next_comment..]
            .iter()
            .map(|&g| arena.comment_groups.span(g))
            .take_while(|s| s.start < span.end)
            .any(|s| s.start >= span.start)
    }

    /// Writes pending comments starting before `limit`; `min` spaces the first one.
    fn flush_comments(&mut self, limit: u32, min: u32) -> bool {
        let mut min = min;
        let mut any = false;
        while let Some((g, span)) = self.pending_comment() {
            if span.start >= limit {
                break;
            }
            self.next_comment += 1;
            self.comment_group(g, min);
            min = 1;
            any = true;
        }
        any
    }

    fn flush_trailing(&mut self) {
        while let Some((g, span)) = self.pending_comment() {
            if !self.is_trailing(span) {
                break;
            }
            self.next_comment += 1;
            self.comment_group(g, 1);
        }
    }

    fn comment_group(&mut self, g: CommentGroupId, min: u32) {
        let arena = self.arena;
        let span = arena.comment_groups.span(g);
        if self.is_trailing(span) {
            self.text(" ");
        } else {
            self.separate(span, min);
        }

        let start = self.sink.offset();
        let mut prev_end: Option<u32> = None;
        for &c in arena.comment_ids(arena.comment_groups[g].comments) {
            let cs = arena.comments.span(c);
            if let Some(end) = prev_end {
                if self.same_line(end, cs.start) {
                    self.text(" ");
                } else {
                    self.newlines(1);
                }
            }
            let comment_start = self.sink.offset();
            self.sym(arena.comments[c].text);
            self.mark(NodeRef::Comment(c), comment_start);
            prev_end = Some(cs.end);
        }
        self.mark(NodeRef::CommentGroup(g), start);
        self.last_end = known(span.end);
    }

    /// Block comments sitting on the same line in front of an operand, as in
    /// `n + /* c */ 2`.
    fn inline_comments(&mut self, span: Span) {
        if span.is_unset() {
            return;
        }
        let arena = self.arena;
        while let Some((g, group)) = self.pending_comment() {
            if group.start >= span.start || !self.same_line(group.end, span.start) {
                break;
            }
            self.next_comment += 1;
            let start = self.sink.offset();
            for (i, &c) in arena.comment_ids(arena.comment_groups[g].comments).iter().enumerate() {
                if i > 0 {
                    self.text(" ");
                }
                let comment_start = self.sink.offset();
                self.sym(arena.comments[c].text);
                self.mark(NodeRef::Comment(c), comment_start);
            }
            self.mark(NodeRef::CommentGroup(g), start);
            self.text(" ");
        }
    }

    /// Comments due before an item; returns the spacing left for the item.
    fn before_item(&mut self, span: Span, min: u32) -> u32 {
        if span.is_unset() {
            self.flush_trailing();
            return min;
        }
        if self.flush_comments(span.start, min) {
            1
        } else {
            min
        }
    }

    fn item_break(&mut self, span: Span, min: u32) {
        let min = self.before_item(span, min);
        self.separate(span, min);
    }

    /// Closing delimiter of a multi-line construct spanning `span`. With
    /// `indented`, the contents sit one level deeper and the caller has not
    /// dedented yet.
    fn close(&mut self, span: Span, delim: &str, indented: bool) {
        let at = if span.is_unset() {
            Span::UNSET
        } else {
            Span {
                start: span.end.saturating_sub(1),
                end: span.end,
            }
        };
        let limit = if at.is_unset() { u32::MAX } else { at.start };
        self.flush_comments(limit, 1);
        if indented {
            self.indent -= 1;
        }
        self.separate(at, 1);
        self.text(delim);
    }

    /// Line break before item `i` of a parenthesized declaration group or a
    /// struct: the first item always starts right on the next line.
    fn group_break(&mut self, i: usize, span: Span) {
        if i > 0 {
            self.item_break(span, 1);
        } else if !span.is_unset() && self.flush_comments(span.start, 1) {
            self.separate(span, 1);
        } else {
            self.newlines(1);
        }
    }

    /// Counterpart of [`Self::group_break`]; expects the group indent to still be raised.
    fn close_group(&mut self, span: Span, delim: &str) {
        let limit = match known(span.end) {
            Some(end) => end - 1,
            None => u32::MAX,
        };
        self.flush_comments(limit, 1);
        self.indent -= 1;
        self.newlines(1);
        self.text(delim);
    }

    /// Comma-separated list that keeps the source's line breaks. A list whose
    /// closing delimiter sits on its own line gets a trailing comma.
    fn list<T: Copy>(
        &mut self,
        open: u32,
        items: &[T],
        close: Span,
        tail: &str,
        span_of: fn(&AstArena, T) -> Span,
        mut item: impl FnMut(&mut Self, T),
    ) {
        let arena = self.arena;
        let mut prev_line = self.line_at(open);
        if let Some(open) = known(open) {
            self.last_end = Some(open);
        }
        let mut broke = false;

        for (i, &x) in items.iter().enumerate() {
            let span = span_of(arena, x);
            if i > 0 {
                self.text(",");
            }
            let on_new_line = matches!(
                (prev_line, self.line_at(span.start)),
                (Some(p), Some(l)) if l > p
            );
            if on_new_line {
                if !broke {
                    broke = true;
                    self.indent += 1;
                }
                self.item_break(span, 1);
            } else if i > 0 {
                self.text(" ");
            }
            item(self, x);
            if i + 1 == items.len() {
                self.text(tail);
            }
            prev_line = self.line_at(span.end);
            if let Some(end) = known(span.end) {
                self.last_end = Some(end);
            }
        }

        let close_on_new_line = !items.is_empty()
            && matches!((prev_line, self.line_at(close.start)), (Some(p), Some(c)) if c > p);
        if close_on_new_line {
            self.text(",");
            if !broke {
                broke = true;
                self.indent += 1;
            }
            self.flush_comments(close.start, 1);
        }
        if broke {
            self.indent -= 1;
        }
        if close_on_new_line {
            self.newlines(1);
        }
    }

    // -------------------------------------------------------------------------
    // File and declarations
    // -------------------------------------------------------------------------

    pub fn source_file(&mut self, file: &SourceFile) {
        let arena = self.arena;
        self.at_start = true;
        self.flush_comments(file.package.start, 1);
        self.separate(file.package, 1);
        let start = self.sink.offset();
        self.text("package ");
        self.ident_name(file.name, IdentSlot::PackageName);
        let end = self.sink.offset();
        self.sink.mark(SpanSlot::PackageClause, Span { start, end });
        self.last_end = known(file.package.end);

        let mut prev: Option<Option<GenDeclKind>> = None;
        for &d in arena.top_decls(file.decls) {
            let (span, kind) = match d {
                TopLevelDecl::Decl(id) => (arena.decls.span(id), Some(arena.decls[id].kind)),
                TopLevelDecl::Func(id) => (arena.funcs.span(id), None),
            };
            let min = if prev != Some(kind) || span.is_unset() || self.has_doc_comment(span) {
                2
            } else {
                1
            };
            self.item_break(span, min);
            self.top_level_decl(d);
            self.last_end = known(span.end);
            prev = Some(kind);
        }

        self.flush_comments(u32::MAX, 1);
        self.text("\n");
    }

    /// A comment group ending on the line right above `span`.
    fn has_doc_comment(&self, span: Span) -> bool {
        let Some(line) = self.line_at(span.start) else {
            return false;
        };
        let arena = self.arena;
        self.comments[self.next_comment..]
            .iter()
            .map(|&g| arena.comment_groups.span(g))
            .take_while(|s| s.start < span.start)
            .last()
            .and_then(|s| self.line_at(s.end))
            .is_some_and(|end| end + 1 == line)
    }

    pub fn top_level_decl(&mut self, decl: TopLevelDecl) {
        match decl {
            TopLevelDecl::Decl(id) => self.gen_decl(id),
            TopLevelDecl::Func(id) => self.func_decl(id),
        }
    }

    fn gen_decl(&mut self, id: DeclId) {
        let arena = self.arena;
        let decl = arena.decls[id];
        let span = arena.decls.span(id);
        let start = self.sink.offset();
        self.text(decl.kind.as_str());
        self.text(" ");

        let specs = arena.specs_list(decl.specs);
        if decl.grouped {
            self.text("(");
            if specs.is_empty() {
                self.text(")");
            } else {
                self.last_end = known(span.start);
                self.indent += 1;
                for (i, &s) in specs.iter().enumerate() {
                    let s_span = arena.specs.span(s);
                    self.group_break(i, s_span);
                    self.spec(s);
                    self.last_end = known(s_span.end);
                }
                self.close_group(span, ")");
            }
        } else if let Some(&s) = specs.first() {
            self.spec(s);
        }
        self.mark(NodeRef::Decl(id), start);
    }

    fn spec(&mut self, id: SpecId) {
        let arena = self.arena;
        let start = self.sink.offset();
        match arena.specs[id] {
            Spec::Import { name, path } => {
                if let Some(name) = name {
                    self.ident_name(name, IdentSlot::Import(id));
                    self.text(" ");
                }
                self.sym(path);
            }
            Spec::Value { names, typ, values } => {
                self.ident_list(names);
                if let Some(typ) = typ {
                    self.text(" ");
                    self.typ(typ);
                }
                if !values.is_empty() {
                    self.text(" = ");
                    self.expr_list(values, arena.specs.span(id).start, 1);
                }
            }
            Spec::Type { name, alias, typ } => {
                self.ident_name(name, IdentSlot::TypeName(id));
                self.text(if alias { " = " } else { " " });
                self.typ(typ);
            }
        }
        self.mark(NodeRef::Spec(id), start);
    }

    fn func_decl(&mut self, id: FuncDeclId) {
        let arena = self.arena;
        let f = arena.funcs[id];
        let start = self.sink.offset();
        self.text("func ");
        if let Some(recv) = f.recv {
            self.text("(");
            self.field(recv);
            self.text(") ");
        }
        self.ident_name(f.name, IdentSlot::Func(id));
        self.signature(f.sig);
        if let Some(body) = f.body {
            self.func_body(body, arena.funcs.span(id));
        }
        self.mark(NodeRef::Func(id), start);
    }

    pub fn signature(&mut self, id: SignatureId) {
        let arena = self.arena;
        let sig = arena.signatures[id];
        let span = arena.signatures.span(id);
        let start = self.sink.offset();

        let results = arena.fields_list(sig.results);
        let last_paren = match known(span.end) {
            Some(end) => Span {
                start: end - 1,
                end,
            },
            None => Span::UNSET,
        };
        let params_close = match results.first() {
            Some(&r) => arena.fields.span(r),
            None => last_paren,
        };
        self.params(sig.params, span.start, params_close);

        match results {
            [] => {}
            [only] if arena.fields[*only].names.is_empty() => {
                self.text(" ");
                self.field(*only);
            }
            _ => {
                self.text(" ");
                self.params(sig.results, u32::MAX, last_paren);
            }
        }
        self.mark(NodeRef::Signature(id), start);
    }

    /// `(a, b int)`; `open` is the offset of the parenthesis when known.
    fn params(&mut self, fields: ListRef<FieldId>, open: u32, close: Span) {
        let arena = self.arena;
        self.text("(");
        self.list(
            open,
            arena.fields_list(fields),
            close,
            "",
            |a, f| a.fields.span(f),
            |r, f| r.field(f),
        );
        self.text(")");
    }

    fn field(&mut self, id: FieldId) {
        let arena = self.arena;
        let f = arena.fields[id];
        let start = self.sink.offset();
        self.ident_list(f.names);
        if !f.names.is_empty() {
            self.text(" ");
        }
        if f.variadic {
            self.text("...");
        }
        self.typ(f.typ);
        if let Some(tag) = f.tag {
            self.text(" ");
            self.sym(tag);
        }
        self.mark(NodeRef::Field(id), start);
    }

    fn interface_method(&mut self, id: FieldId) {
        let arena = self.arena;
        let f = arena.fields[id];
        let start = self.sink.offset();
        match (arena.ident_names(f.names), arena.types[f.typ]) {
            ([name], Type::Func(sig)) => {
                self.ident_name(*name, AstArena::ident_slot(f.names, 0));
                let type_start = self.sink.offset();
                self.signature(sig);
                self.mark(NodeRef::Type(f.typ), type_start);
            }
            _ => self.typ(f.typ),
        }
        self.mark(NodeRef::Field(id), start);
    }

    /// One-line bodies survive when the source had them and they stay small.
    fn fits_one_line(&self, outer: Span, body: Span, stmts: &[StmtId]) -> bool {
        if outer.is_unset() || body.is_unset() {
            return false;
        }
        let arena = self.arena;
        self.same_line(body.start, body.end.saturating_sub(1))
            && stmts.len() <= 5
            && outer.len() <= ONE_LINE_MAX
            && !self.comments_within(body)
            && stmts.iter().all(|&s| {
                !matches!(
                    arena.stmts[s],
                    Stmt::Block(_)
                        | Stmt::If { .. }
                        | Stmt::For { .. }
                        | Stmt::Switch { .. }
                        | Stmt::TypeSwitch { .. }
                        | Stmt::Select { .. }
                        | Stmt::Labeled { .. }
                )
            })
    }

    fn func_body(&mut self, body: BlockId, outer: Span) {
        let arena = self.arena;
        let span = arena.blocks.span(body);
        let stmts = arena.stmts_list(arena.blocks[body].stmts);
        self.text(" ");
        if !self.fits_one_line(outer, span, stmts) {
            self.block(body);
            return;
        }

        let start = self.sink.offset();
        self.text("{");
        if !stmts.is_empty() {
            self.text(" ");
            for (i, &s) in stmts.iter().enumerate() {
                if i > 0 {
                    self.text("; ");
                }
                self.stmt(s);
            }
            self.text(" ");
        }
        self.text("}");
        self.mark(NodeRef::Block(body), start);
        self.last_end = known(span.end);
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub fn block(&mut self, id: BlockId) {
        let arena = self.arena;
        let span = arena.blocks.span(id);
        let start = self.sink.offset();
        self.text("{");
        self.last_end = known(span.start);
        self.indent += 1;
        self.stmt_list(arena.stmts_list(arena.blocks[id].stmts));
        self.close(span, "}", true);
        self.mark(NodeRef::Block(id), start);
    }

    fn stmt_list(&mut self, stmts: &[StmtId]) {
        let arena = self.arena;
        for &s in stmts {
            let span = arena.stmts.span(s);
            let min = self.before_item(span, 1);
            // labels sit one level left of their statement
            let indent = self.indent;
            if matches!(arena.stmts[s], Stmt::Labeled { .. }) {
                self.indent = indent.saturating_sub(1);
            }
            self.separate(span, min);
            self.indent = indent;
            self.stmt(s);
            self.last_end = known(span.end);
        }
    }

    pub fn stmt(&mut self, id: StmtId) {
        let arena = self.arena;
        let span = arena.stmts.span(id);
        let start = self.sink.offset();
        match arena.stmts[id] {
            Stmt::Simple(s) => self.simple_stmt(s),
            Stmt::Decl(d) => self.gen_decl(d),
            Stmt::Labeled { label, stmt } => {
                self.ident_name(label, IdentSlot::Label(id));
                self.text(":");
                self.last_end = known(span.start);
                self.item_break(arena.stmts.span(stmt), 1);
                self.stmt(stmt);
            }
            Stmt::Go(e) => {
                self.text("go ");
                self.expr(e);
            }
            Stmt::Defer(e) => {
                self.text("defer ");
                self.expr(e);
            }
            Stmt::Return(results) => {
                self.text("return");
                if !results.is_empty() {
                    self.text(" ");
                    self.expr_list(results, span.start, 1);
                }
            }
            Stmt::Branch { kind, label } => {
                self.text(kind.as_str());
                if let Some(label) = label {
                    self.text(" ");
                    self.ident_name(label, IdentSlot::Label(id));
                }
            }
            Stmt::Block(b) => self.block(b),
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            } => {
                self.text("if");
                self.control_clause(false, init, Some(cond), None);
                self.block(then_block);
                if let Some(e) = else_stmt {
                    self.text(" else ");
                    self.stmt(e);
                }
            }
            Stmt::For { kind, body } => {
                self.text("for");
                match kind {
                    ForKind::Infinite => self.control_clause(true, None, None, None),
                    ForKind::Cond(c) => self.control_clause(true, None, Some(c), None),
                    ForKind::Clause { init, cond, post } => {
                        self.control_clause(true, init, cond, post)
                    }
                    ForKind::Range {
                        key,
                        value,
                        define,
                        expr,
                    } => {
                        self.text(" ");
                        if let Some(key) = key {
                            self.expr(key);
                            if let Some(value) = value {
                                self.text(", ");
                                self.expr(value);
                            }
                            self.text(if define { " := " } else { " = " });
                        }
                        self.text("range ");
                        self.control_expr(expr);
                        self.text(" ");
                    }
                }
                self.block(body);
            }
            Stmt::Switch { init, tag, clauses } => {
                self.text("switch");
                self.control_clause(false, init, tag, None);
                self.switch_body(span, clauses);
            }
            Stmt::TypeSwitch {
                init,
                bind,
                guard,
                clauses,
            } => {
                self.text("switch ");
                if let Some(init) = init {
                    self.simple_stmt(init);
                    self.text("; ");
                }
                if let Some(bind) = bind {
                    self.ident_name(bind, IdentSlot::TypeSwitchBind(id));
                    self.text(" := ");
                }
                self.expr(guard);
                self.text(" ");
                self.switch_body(span, clauses);
            }
            Stmt::Select { clauses } => {
                self.text("select ");
                let list = arena.comm_clause_ids(clauses);
                if list.is_empty() && !self.comments_within(span) {
                    self.text("{}");
                } else {
                    self.text("{");
                    self.last_end = known(span.start);
                    for &c in list {
                        let c_span = arena.comm_clauses.span(c);
                        self.item_break(c_span, 1);
                        self.comm_clause(c);
                        self.last_end = known(c_span.end);
                    }
                    self.close(span, "}", false);
                }
            }
        }
        self.mark(NodeRef::Stmt(id), start);
    }

    /// `if`/`for`/`switch` header between the keyword and the body.
    fn control_clause(
        &mut self,
        is_for: bool,
        init: Option<SimpleStmtId>,
        expr: Option<ExprId>,
        post: Option<SimpleStmtId>,
    ) {
        self.text(" ");
        let mut needs_blank = false;
        if init.is_none() && post.is_none() {
            if let Some(e) = expr {
                self.control_expr(e);
                needs_blank = true;
            }
        } else {
            if let Some(init) = init {
                self.simple_stmt(init);
            }
            self.text("; ");
            if let Some(e) = expr {
                self.control_expr(e);
                needs_blank = true;
            }
            if is_for {
                self.text("; ");
                needs_blank = false;
                if let Some(post) = post {
                    self.simple_stmt(post);
                    needs_blank = true;
                }
            }
        }
        if needs_blank {
            self.text(" ");
        }
    }

    fn switch_body(&mut self, span: Span, clauses: ListRef<SwitchClauseId>) {
        let arena = self.arena;
        self.text("{");
        self.last_end = known(span.start);
        for &c in arena.switch_clause_ids(clauses) {
            let c_span = arena.switch_clauses.span(c);
            self.item_break(c_span, 1);
            self.switch_clause(c);
            self.last_end = known(c_span.end);
        }
        self.close(span, "}", false);
    }

    fn switch_clause(&mut self, id: SwitchClauseId) {
        let arena = self.arena;
        let clause = arena.switch_clauses[id];
        let start = self.sink.offset();
        let clause_start = arena.switch_clauses.span(id).start;
        self.last_end = known(clause_start);
        match clause.kind {
            CaseKind::Default => self.text("default"),
            CaseKind::Exprs(list) => {
                self.text("case ");
                self.expr_list(list, clause_start, 1);
            }
            CaseKind::Types(list) => {
                self.text("case ");
                self.list(
                    clause_start,
                    arena.types_list(list),
                    Span::UNSET,
                    "",
                    |a, t| a.types.span(t),
                    |r, t| r.typ(t),
                );
            }
        }
        self.text(":");
        self.indent += 1;
        self.stmt_list(arena.stmts_list(clause.stmts));
        self.indent -= 1;
        self.mark(NodeRef::SwitchClause(id), start);
    }

    fn comm_clause(&mut self, id: CommClauseId) {
        let arena = self.arena;
        let clause = arena.comm_clauses[id];
        let start = self.sink.offset();
        self.last_end = known(arena.comm_clauses.span(id).start);
        match clause.comm {
            Some(comm) => {
                self.text("case ");
                self.simple_stmt(comm);
                self.last_end = known(arena.simple_stmts.span(comm).end);
            }
            None => self.text("default"),
        }
        self.text(":");
        self.indent += 1;
        self.stmt_list(arena.stmts_list(clause.stmts));
        self.indent -= 1;
        self.mark(NodeRef::CommClause(id), start);
    }

    pub fn simple_stmt(&mut self, id: SimpleStmtId) {
        let arena = self.arena;
        let start = self.sink.offset();
        match arena.simple_stmts[id] {
            SimpleStmt::Expr(e) => self.expr0(e, 1),
            SimpleStmt::Send { chan, value } => {
                self.expr0(chan, 1);
                self.text(" <- ");
                self.expr0(value, 1);
            }
            SimpleStmt::IncDec { expr, op } => {
                self.expr0(expr, 2);
                self.text(op.as_str());
            }
            SimpleStmt::Assign { lhs, op, rhs } => {
                let depth = if lhs.len() > 1 && rhs.len() > 1 { 2 } else { 1 };
                self.expr_list(lhs, arena.simple_stmts.span(id).start, depth);
                self.text(" ");
                self.text(op.as_str());
                self.text(" ");
                let open = arena
                    .exprs_list(lhs)
                    .last()
                    .map_or(u32::MAX, |&e| arena.exprs.span(e).end);
                self.expr_list(rhs, open, depth);
            }
            SimpleStmt::ShortVarDecl { names, values } => {
                let depth = if names.len() > 1 && values.len() > 1 { 2 } else { 1 };
                self.ident_list(names);
                self.text(" := ");
                let open = arena
                    .ident_names(names)
                    .last()
                    .map_or(u32::MAX, |n| n.pos.end);
                self.expr_list(values, open, depth);
            }
        }
        self.mark(NodeRef::SimpleStmt(id), start);
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr_list(&mut self, list: ListRef<ExprId>, open: u32, depth: u32) {
        let arena = self.arena;
        self.list(
            open,
            arena.exprs_list(list),
            Span::UNSET,
            "",
            |a, e| a.exprs.span(e),
            |r, e| r.expr0(e, depth),
        );
    }

    /// Condition, tag or range subject: redundant parentheses are dropped.
    fn control_expr(&mut self, e: ExprId) {
        let arena = self.arena;
        let mut inner = e;
        let mut stripped = Vec::new();
        while let Expr::Paren(x) = arena.exprs[inner] {
            if has_bare_literal(arena, x) {
                break;
            }
            stripped.push(inner);
            inner = x;
        }
        let start = self.sink.offset();
        self.expr(inner);
        for paren in stripped {
            self.mark(NodeRef::Expr(paren), start);
        }
    }

    pub fn expr(&mut self, id: ExprId) {
        self.expr0(id, 1);
    }

    /// `depth` drives the blank-around-operator decisions of nested binary
    /// expressions, as in gofmt. Parentheses are always explicit in the tree.
    fn expr0(&mut self, id: ExprId, depth: u32) {
        let arena = self.arena;
        let span = arena.exprs.span(id);
        self.inline_comments(span);
        if let Expr::Unary { op, .. } = arena.exprs[id] {
            self.space_if_combines(op.as_str());
        }
        let start = self.sink.offset();

        match arena.exprs[id] {
            Expr::Ident(sym) => self.sym(sym),
            Expr::BasicLit(lit) => self.sym(lit.value),
            Expr::FuncLit { sig, body } => {
                self.text("func");
                self.signature(sig);
                self.func_body(body, span);
            }
            Expr::CompositeLit { typ, elems } => {
                let open = match typ {
                    Some(t) => arena.types.span(t).end,
                    None => span.start,
                };
                if let Some(t) = typ {
                    self.typ(t);
                }
                self.text("{");
                let close = match known(span.end) {
                    Some(end) => Span {
                        start: end - 1,
                        end,
                    },
                    None => Span::UNSET,
                };
                self.list(
                    open,
                    arena.keyed_elems_list(elems),
                    close,
                    "",
                    keyed_span,
                    |r, e| {
                        if let Some(key) = e.key {
                            r.expr(key);
                            r.text(": ");
                        }
                        r.expr(e.value);
                    },
                );
                self.text("}");
            }
            Expr::Paren(inner) => {
                if matches!(arena.exprs[inner], Expr::Paren(_)) {
                    self.expr0(inner, depth);
                } else {
                    self.text("(");
                    self.expr0(inner, reduce_depth(depth));
                    self.text(")");
                }
            }
            Expr::Selector { expr, sel } => {
                self.expr0(expr, depth);
                self.text(".");
                self.ident_name(sel, IdentSlot::Selector(id));
            }
            Expr::Index { expr, index } => {
                self.expr0(expr, 1);
                self.text("[");
                self.expr0(index, depth + 1);
                self.text("]");
            }
            Expr::Slice { expr, lo, hi, max } => {
                self.expr0(expr, 1);
                self.text("[");
                let mut indices = vec![lo, hi];
                if max.is_some() {
                    indices.push(max);
                }
                let needs_blanks = depth <= 1
                    && indices.iter().flatten().count() > 1
                    && indices
                        .iter()
                        .flatten()
                        .any(|&x| matches!(arena.exprs[x], Expr::Binary { .. }));
                for (i, x) in indices.iter().enumerate() {
                    if i > 0 {
                        if indices[i - 1].is_some() && needs_blanks {
                            self.text(" ");
                        }
                        self.text(":");
                        if x.is_some() && needs_blanks {
                            self.text(" ");
                        }
                    }
                    if let Some(x) = *x {
                        self.expr0(x, depth + 1);
                    }
                }
                self.text("]");
            }
            Expr::TypeAssert { expr, typ } => {
                self.expr0(expr, 1);
                self.text(".(");
                match typ {
                    Some(t) => self.typ(t),
                    None => self.text("type"),
                }
                self.text(")");
            }
            Expr::Call {
                callee,
                args,
                ellipsis,
            } => {
                let depth = if args.len() > 1 { depth + 1 } else { depth };
                self.expr0(callee, depth);
                let open = arena.exprs.span(callee).end;
                let close = match known(span.end) {
                    Some(end) => Span {
                        start: end - 1,
                        end,
                    },
                    None => Span::UNSET,
                };
                self.text("(");
                self.list(
                    open,
                    arena.exprs_list(args),
                    close,
                    if ellipsis { "..." } else { "" },
                    |a, e| a.exprs.span(e),
                    |r, e| r.expr0(e, depth),
                );
                self.text(")");
            }
            Expr::Unary { op, expr } => {
                self.op(op.as_str());
                let depth = if op == UnaryOp::Deref { 1 } else { depth };
                self.expr0(expr, depth);
            }
            Expr::Binary { .. } => {
                let cutoff = cutoff(arena, id, depth);
                self.binary_expr(id, cutoff, depth);
            }
            Expr::TypeExpr(t) => self.typ(t),
        }
        self.mark(NodeRef::Expr(id), start);
    }

    fn binary_expr(&mut self, id: ExprId, cutoff: u8, depth: u32) {
        let arena = self.arena;
        let Expr::Binary { left, op, right } = arena.exprs[id] else {
            return;
        };
        let prec = op.precedence();
        let print_blank = prec < cutoff;

        self.expr0(left, depth + diff_prec(arena, left, prec));
        if print_blank {
            self.text(" ");
        }
        self.op(op.as_str());

        let break_lines = match (
            self.line_at(arena.exprs.span(left).end),
            self.line_at(arena.exprs.span(right).start),
        ) {
            (Some(x), Some(y)) if y > x => Some((y - x).min(2)),
            _ => None,
        };
        if let Some(n) = break_lines {
            self.indent += 1;
            self.newlines(n);
        } else if print_blank {
            self.text(" ");
        }
        self.expr0(right, depth + 1);
        if break_lines.is_some() {
            self.indent -= 1;
        }
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    pub fn typ(&mut self, id: TypeId) {
        let arena = self.arena;
        let span = arena.types.span(id);
        let start = self.sink.offset();
        match arena.types[id] {
            Type::Named { pkg, name } => {
                if let Some(pkg) = pkg {
                    self.sym(pkg);
                    self.text(".");
                }
                self.sym(name);
            }
            Type::Pointer(t) => {
                self.text("*");
                self.typ(t);
            }
            Type::Slice(t) => {
                self.text("[]");
                self.typ(t);
            }
            Type::Array { len, elem } => {
                self.text("[");
                match len {
                    Some(len) => self.expr(len),
                    None => self.text("..."),
                }
                self.text("]");
                self.typ(elem);
            }
            Type::Map { key, value } => {
                self.text("map[");
                self.typ(key);
                self.text("]");
                self.typ(value);
            }
            Type::Chan { dir, elem } => {
                self.text(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.typ(elem);
            }
            Type::Func(sig) => {
                self.text("func");
                self.signature(sig);
            }
            Type::Struct { fields } => self.field_block("struct", span, fields, true),
            Type::Interface { methods } => self.field_block("interface", span, methods, false),
        }
        self.mark(NodeRef::Type(id), start);
    }

    fn field_block(&mut self, keyword: &str, span: Span, fields: ListRef<FieldId>, is_struct: bool) {
        let arena = self.arena;
        let list = arena.fields_list(fields);
        let small = |f: FieldId| {
            arena.fields[f].tag.is_none() && arena.fields.span(f).len() <= ONE_LINE_FIELD_MAX
        };
        let one_line = !self.comments_within(span)
            && match list {
                [] => true,
                [only] if span.is_unset() => small(*only),
                [only] => self.same_line(span.start, span.end.saturating_sub(1)) && small(*only),
                _ => false,
            };

        self.text(keyword);
        if one_line {
            match list.first() {
                None => self.text("{}"),
                Some(&f) => {
                    self.text("{ ");
                    self.member(f, is_struct);
                    self.text(" }");
                }
            }
            return;
        }

        self.text(" {");
        self.last_end = known(span.start);
        self.indent += 1;
        for (i, &f) in list.iter().enumerate() {
            let f_span = arena.fields.span(f);
            self.group_break(i, f_span);
            self.member(f, is_struct);
            self.last_end = known(f_span.end);
        }
        self.close_group(span, "}");
    }

    fn member(&mut self, f: FieldId, is_struct: bool) {
        if is_struct {
            self.field(f);
        } else {
            self.interface_method(f);
        }
    }
}

fn keyed_span(a: &AstArena, e: KeyedElement) -> Span {
    let value = a.exprs.span(e.value);
    match e.key.map(|k| a.exprs.span(k)) {
        Some(key) if !key.is_unset() && !value.is_unset() => key.to(value),
        Some(_) => Span::UNSET,
        None => value,
    }
}

/// 0 when `x` is a binary expression of precedence `prec`.
fn diff_prec(a: &AstArena, x: ExprId, prec: u8) -> u32 {
    match a.exprs[x] {
        Expr::Binary { op, .. } if op.precedence() == prec => 0,
        _ => 1,
    }
}

/// Operators binding tighter than the cutoff are written without blanks.
fn cutoff(a: &AstArena, e: ExprId, depth: u32) -> u8 {
    let (has4, has5, max_problem) = walk_binary(a, e);
    if max_problem > 0 {
        return max_problem + 1;
    }
    match (has4 && has5, depth == 1) {
        (true, true) => 5,
        (true, false) => 4,
        (false, true) => 6,
        (false, false) => 4,
    }
}

fn walk_binary(a: &AstArena, e: ExprId) -> (bool, bool, u8) {
    let Expr::Binary { left, op, right } = a.exprs[e] else {
        return (false, false, 0);
    };
    let prec = op.precedence();
    let mut has4 = prec == 4;
    let mut has5 = prec == 5;
    let mut max_problem = 0;

    if let Expr::Binary { op: l, .. } = a.exprs[left] {
        if l.precedence() >= prec {
            let (h4, h5, mp) = walk_binary(a, left);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        }
    }

    match a.exprs[right] {
        Expr::Binary { op: r, .. } if r.precedence() > prec => {
            let (h4, h5, mp) = walk_binary(a, right);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        }
        Expr::Unary {
            op: UnaryOp::Deref, ..
        } => {
            if op == BinaryOp::Div {
                max_problem = 5;
            }
        }
        Expr::Unary { op: u, .. } => match (op, u) {
            (BinaryOp::And, UnaryOp::Addr) | (BinaryOp::And, UnaryOp::Xor) => max_problem = 5,
            (BinaryOp::Add, UnaryOp::Add) | (BinaryOp::Sub, UnaryOp::Sub) => {
                max_problem = max_problem.max(4)
            }
            _ => {}
        },
        _ => {}
    }
    (has4, has5, max_problem)
}

/// A composite literal of a named type outside any parentheses; such
/// parentheses must stay in control clauses.
fn has_bare_literal(a: &AstArena, e: ExprId) -> bool {
    let any = |list: &[ExprId]| list.iter().any(|&x| has_bare_literal(a, x));
    match a.exprs[e] {
        Expr::Paren(_) => false,
        Expr::CompositeLit { typ, .. } => {
            typ.is_some_and(|t| matches!(a.types[t], Type::Named { .. }))
        }
        Expr::Selector { expr, .. } | Expr::TypeAssert { expr, .. } | Expr::Unary { expr, .. } => {
            has_bare_literal(a, expr)
        }
        Expr::Index { expr, index } => any(&[expr, index]),
        Expr::Slice { expr, lo, hi, max } => {
            has_bare_literal(a, expr) || [lo, hi, max].into_iter().flatten().any(|x| has_bare_literal(a, x))
        }
        Expr::Call { callee, args, .. } => has_bare_literal(a, callee) || any(a.exprs_list(args)),
        Expr::Binary { left, right, .. } => any(&[left, right]),
        Expr::Ident(_) | Expr::BasicLit(_) | Expr::FuncLit { .. } | Expr::TypeExpr(_) => false,
    }
}

/// Renders a detached fragment (no comments, no source positions).
pub fn fragment(
    arena: &AstArena,
    interner: &Interner,
    f: impl FnOnce(&mut Renderer<'_, TextSink>),
) -> String {
    let index = LineIndex::default();
    let mut r = Renderer::with_parts(arena, interner, &index, Vec::new(), TextSink::new());
    f(&mut r);
    r.finish().0.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;

    fn layout_of(src: &str) -> (String, Layout) {
        let doc = parse_source(src).expect("parse");
        let mut r = Renderer::new(&doc, LayoutSink::new(0));
        r.source_file(&doc.file);
        let (sink, rest) = r.finish();
        assert!(rest.is_empty());
        (doc.source().unwrap_or_default().to_owned(), sink.finish())
    }

    #[test]
    fn layout_marks_match_parsed_spans() {
        let src = "package p\n\nfunc f(a int) int {\n\tb := a * 2\n\treturn b + 1\n}\n";
        let doc = parse_source(src).expect("parse");
        let mut r = Renderer::new(&doc, LayoutSink::new(0));
        r.source_file(&doc.file);
        let layout = r.finish().0.finish();
        for (slot, span) in layout.marks {
            if let SpanSlot::Node(node) = slot {
                assert_eq!(doc.arena.span(node), span, "{}", doc.arena.describe(node));
            }
        }
    }

    #[test]
    fn layout_counts_lines() {
        let (src, layout) = layout_of("package p\n\nvar x = 1\n");
        assert_eq!(layout.lines, vec![9, 0, 9]);
        assert_eq!(layout.tail, 0);
        assert_eq!(layout.end as usize, src.len());
    }

    #[test]
    fn separates_combining_operators() {
        let doc = parse_source("package p\n\nvar x = a / *p - -b\n").expect("parse");
        let text = crate::print_document(&doc);
        assert_eq!(text, "package p\n\nvar x = a / *p - -b\n");
    }
}
