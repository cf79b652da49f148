//! # Go Syntax Tree
//!
//! Arena-allocated syntax tree for the subset of Go the refactoring engine edits.
//!
//! ## Architecture
//!
//! - **Nodes**: every node family lives in a typed arena (`SpannedArena<T>`) and is
//!   addressed by a typed `Id<T>`.
//! - **Lists**: variable-length children are `ListRef<T>` handles into the central
//!   buffers of `ExtraData`.
//! - **Spans**: byte ranges are kept in a side table parallel to each arena, so a
//!   node can be re-positioned without touching its payload. Freshly synthesized
//!   nodes carry `Span::UNSET` until the layout pass assigns them a position.
//! - **Symbols**: identifier, literal and comment text is interned. The tree can be
//!   printed without the original source text.
//!
//! Walk/Visitor infrastructure lives in `walk.rs`. `#[derive(WalkAst)]` generates
//! `crate::walk::Walk`, `#[derive(SpanFields)]` generates [`SpanFields`].

use ast_derive::{SpanFields, WalkAst};
use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher, RandomState};

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Half-open byte range `[start, end)` into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Position of a node that has not been laid out yet.
    pub const UNSET: Span = Span {
        start: u32::MAX,
        end: u32::MAX,
    };

    /// Creates a new span from usize positions.
    ///
    /// # Panics
    /// In debug builds, panics if positions exceed `u32::MAX`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(end <= u32::MAX as usize);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn is_unset(&self) -> bool {
        self.start == u32::MAX
    }

    /// True when `offset` lies in `[start, end]`.
    #[inline]
    pub const fn covers(&self, offset: u32) -> bool {
        !self.is_unset() && self.start <= offset && offset <= self.end
    }

    /// Smallest span containing both.
    #[inline]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Type-safe identifier for arena-allocated nodes.
///
/// The phantom marker ensures type safety at compile time. The trait impls are
/// written by hand so they hold for every `T`, not only `T: Trait`.
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn to_usize(&self) -> usize {
        self.raw as usize
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.raw);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// Typed reference into a centralized list buffer.
///
/// Lists are stored in `AstArena::extras` to avoid per-node allocations.
/// Each `ListRef` points to a contiguous slice in the appropriate buffer.
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for ListRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.len == other.len
    }
}

impl<T> Eq for ListRef<T> {}

impl<T> fmt::Debug for ListRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end())
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Returns the end index (exclusive).
    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
}

// =============================================================================
// Symbol Interning System
// =============================================================================

/// Interned string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(u32);

/// Type alias for identifier symbols.
pub type Ident = Symbol;

impl Symbol {
    #[inline]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier occurrence (interned symbol + source position).
///
/// Used for names that are not expressions: declared names, labels, selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentName {
    pub sym: Ident,
    pub pos: Span,
}

impl IdentName {
    pub const fn fresh(sym: Ident) -> Self {
        Self {
            sym,
            pos: Span::UNSET,
        }
    }
}

/// Identity hasher for u64 values (used for symbol hash buckets).
#[derive(Default)]
struct U64IdentityHasher(u64);

impl Hasher for U64IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

type U64IdentityBuild = BuildHasherDefault<U64IdentityHasher>;

/// String interner for identifiers, literals and comment text.
///
/// Symbols are stored once and looked up via hash buckets keyed by a seeded hash.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, U64IdentityBuild>,
    state: RandomState,
}

impl Interner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.strings.reserve(additional);
        self.buckets.reserve(additional);
    }

    #[inline(always)]
    fn hash_str(&self, s: &str) -> u64 {
        let mut h = self.state.build_hasher();
        s.hash(&mut h);
        h.finish()
    }

    /// Interns a string and returns its symbol.
    ///
    /// If the string already exists, returns the existing symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.hash_str(s);
        let entry = self.buckets.entry(h).or_default();

        for &sym in entry.iter() {
            if self.strings[sym.0 as usize].as_ref() == s {
                return sym;
            }
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        entry.push(sym);
        sym
    }

    /// Looks a string up without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let h = self.hash_str(s);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
    }

    /// Resolves a symbol back to its string.
    ///
    /// Symbols from another interner resolve to the empty string.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        debug_assert!((sym.0 as usize) < self.strings.len());
        self.strings.get(sym.0 as usize).map_or("", |s| s.as_ref())
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Arena for nodes with associated spans.
///
/// Stores nodes and their spans in parallel vectors.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a node with its span and returns an ID.
    #[inline]
    pub fn alloc(&mut self, node: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(node);
        self.spans.push(span);
        id
    }

    /// Allocates a node that still has to be laid out.
    #[inline]
    pub fn alloc_fresh(&mut self, node: T) -> Id<T> {
        self.alloc(node, Span::UNSET)
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }

    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    #[inline]
    pub fn span_mut(&mut self, id: Id<T>) -> &mut Span {
        &mut self.spans[id.to_usize()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T, Span)> + '_ {
        self.data
            .iter()
            .zip(self.spans.iter().copied())
            .enumerate()
            .map(|(i, (node, span))| (Id::from_raw(i as u32), node, span))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id<T>, &mut T, &mut Span)> + '_ {
        self.data
            .iter_mut()
            .zip(self.spans.iter_mut())
            .enumerate()
            .map(|(i, (node, span))| (Id::from_raw(i as u32), node, span))
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        self.get_mut(id)
    }
}

// =============================================================================
// Inline span rewriting
// =============================================================================

/// Visits every span stored inline in a node (not the arena side-table span).
pub trait SpanFields {
    fn for_each_span(&mut self, f: &mut dyn FnMut(&mut Span));
}

impl SpanFields for Span {
    #[inline]
    fn for_each_span(&mut self, f: &mut dyn FnMut(&mut Span)) {
        f(self)
    }
}

impl SpanFields for IdentName {
    #[inline]
    fn for_each_span(&mut self, f: &mut dyn FnMut(&mut Span)) {
        f(&mut self.pos)
    }
}

impl<T: SpanFields> SpanFields for Option<T> {
    #[inline]
    fn for_each_span(&mut self, f: &mut dyn FnMut(&mut Span)) {
        if let Some(x) = self {
            x.for_each_span(f);
        }
    }
}

impl<T> SpanFields for Id<T> {
    #[inline]
    fn for_each_span(&mut self, _: &mut dyn FnMut(&mut Span)) {}
}

// List payloads live in `ExtraData`; `IdentName` lists are rewritten there.
impl<T> SpanFields for ListRef<T> {
    #[inline]
    fn for_each_span(&mut self, _: &mut dyn FnMut(&mut Span)) {}
}

macro_rules! impl_span_fields_noop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SpanFields for $ty {
                #[inline]
                fn for_each_span(&mut self, _: &mut dyn FnMut(&mut Span)) {}
            }
        )*
    };
}

impl_span_fields_noop! {
    Symbol,
    bool,
    GenDeclKind,
    BasicLitKind,
    ChanDir,
    UnaryOp,
    BinaryOp,
    AssignOp,
    IncDecOp,
    BranchKind,
    CommentKind,
}

// =============================================================================
// Type Aliases for Node IDs
// =============================================================================

pub type DeclId = Id<Decl>;
pub type SpecId = Id<Spec>;
pub type FuncDeclId = Id<FuncDecl>;
pub type SignatureId = Id<Signature>;
pub type FieldId = Id<Field>;
pub type BlockId = Id<Block>;
pub type StmtId = Id<Stmt>;
pub type SimpleStmtId = Id<SimpleStmt>;
pub type ExprId = Id<Expr>;
pub type TypeId = Id<Type>;
pub type SwitchClauseId = Id<SwitchClause>;
pub type CommClauseId = Id<CommClause>;
pub type CommentId = Id<Comment>;
pub type CommentGroupId = Id<CommentGroup>;

/// Any arena node, by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Decl(DeclId),
    Spec(SpecId),
    Func(FuncDeclId),
    Signature(SignatureId),
    Field(FieldId),
    Block(BlockId),
    Stmt(StmtId),
    SimpleStmt(SimpleStmtId),
    Expr(ExprId),
    Type(TypeId),
    SwitchClause(SwitchClauseId),
    CommClause(CommClauseId),
    Comment(CommentId),
    CommentGroup(CommentGroupId),
}

/// Location of an `IdentName`, wherever the tree keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentSlot {
    /// Index into `ExtraData::ident_names`.
    List(u32),
    PackageName,
    Import(SpecId),
    TypeName(SpecId),
    Func(FuncDeclId),
    Selector(ExprId),
    Label(StmtId),
    TypeSwitchBind(StmtId),
}

// =============================================================================
// Centralized List Storage
// =============================================================================

/// Buffers that every `ListRef<T>` points into.
#[derive(Debug, Default)]
pub struct ExtraData {
    pub ident_names: Vec<IdentName>,
    pub exprs: Vec<ExprId>,
    pub stmts: Vec<StmtId>,
    pub types: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub specs: Vec<SpecId>,
    pub keyed_elems: Vec<KeyedElement>,
    pub top_decls: Vec<TopLevelDecl>,
    pub switch_clause_ids: Vec<SwitchClauseId>,
    pub comm_clause_ids: Vec<CommClauseId>,
    pub comment_ids: Vec<CommentId>,
    pub comment_group_ids: Vec<CommentGroupId>,
}

// =============================================================================
// Main AST Arena
// =============================================================================

/// Central arena holding all AST nodes and list buffers.
#[derive(Debug, Default)]
pub struct AstArena {
    pub decls: SpannedArena<Decl>,
    pub specs: SpannedArena<Spec>,
    pub funcs: SpannedArena<FuncDecl>,
    pub signatures: SpannedArena<Signature>,
    pub fields: SpannedArena<Field>,
    pub blocks: SpannedArena<Block>,
    pub stmts: SpannedArena<Stmt>,
    pub simple_stmts: SpannedArena<SimpleStmt>,
    pub exprs: SpannedArena<Expr>,
    pub types: SpannedArena<Type>,
    pub switch_clauses: SpannedArena<SwitchClause>,
    pub comm_clauses: SpannedArena<CommClause>,
    pub comments: SpannedArena<Comment>,
    pub comment_groups: SpannedArena<CommentGroup>,
    pub extras: ExtraData,
}

/// Arena sizes at one point in time. Nodes below the mark existed before an edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    pub decls: usize,
    pub specs: usize,
    pub funcs: usize,
    pub signatures: usize,
    pub fields: usize,
    pub blocks: usize,
    pub stmts: usize,
    pub simple_stmts: usize,
    pub exprs: usize,
    pub types: usize,
    pub switch_clauses: usize,
    pub comm_clauses: usize,
    pub comments: usize,
    pub comment_groups: usize,
    pub ident_names: usize,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn push_list<T>(buf: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> ListRef<T> {
        let start = buf.len();
        buf.extend(items);
        let len = buf.len() - start;
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(len <= u32::MAX as usize);
        ListRef::new(start as u32, len as u32)
    }

    #[inline]
    fn slice<T>(buf: &[T], r: ListRef<T>) -> &[T] {
        &buf[r.start() as usize..r.end() as usize]
    }

    #[inline]
    fn slice_mut<T>(buf: &mut [T], r: ListRef<T>) -> &mut [T] {
        &mut buf[r.start() as usize..r.end() as usize]
    }

    pub fn watermark(&self) -> Watermark {
        Watermark {
            decls: self.decls.len(),
            specs: self.specs.len(),
            funcs: self.funcs.len(),
            signatures: self.signatures.len(),
            fields: self.fields.len(),
            blocks: self.blocks.len(),
            stmts: self.stmts.len(),
            simple_stmts: self.simple_stmts.len(),
            exprs: self.exprs.len(),
            types: self.types.len(),
            switch_clauses: self.switch_clauses.len(),
            comm_clauses: self.comm_clauses.len(),
            comments: self.comments.len(),
            comment_groups: self.comment_groups.len(),
            ident_names: self.extras.ident_names.len(),
        }
    }

    // List Builders

    pub fn list_ident_names(
        &mut self,
        i: impl IntoIterator<Item = IdentName>,
    ) -> ListRef<IdentName> {
        Self::push_list(&mut self.extras.ident_names, i)
    }

    pub fn list_exprs(&mut self, i: impl IntoIterator<Item = ExprId>) -> ListRef<ExprId> {
        Self::push_list(&mut self.extras.exprs, i)
    }

    pub fn list_stmts(&mut self, i: impl IntoIterator<Item = StmtId>) -> ListRef<StmtId> {
        Self::push_list(&mut self.extras.stmts, i)
    }

    pub fn list_types(&mut self, i: impl IntoIterator<Item = TypeId>) -> ListRef<TypeId> {
        Self::push_list(&mut self.extras.types, i)
    }

    pub fn list_fields(&mut self, i: impl IntoIterator<Item = FieldId>) -> ListRef<FieldId> {
        Self::push_list(&mut self.extras.fields, i)
    }

    pub fn list_specs(&mut self, i: impl IntoIterator<Item = SpecId>) -> ListRef<SpecId> {
        Self::push_list(&mut self.extras.specs, i)
    }

    pub fn list_keyed_elems(
        &mut self,
        i: impl IntoIterator<Item = KeyedElement>,
    ) -> ListRef<KeyedElement> {
        Self::push_list(&mut self.extras.keyed_elems, i)
    }

    pub fn list_top_decls(
        &mut self,
        i: impl IntoIterator<Item = TopLevelDecl>,
    ) -> ListRef<TopLevelDecl> {
        Self::push_list(&mut self.extras.top_decls, i)
    }

    pub fn list_switch_clause_ids(
        &mut self,
        i: impl IntoIterator<Item = SwitchClauseId>,
    ) -> ListRef<SwitchClauseId> {
        Self::push_list(&mut self.extras.switch_clause_ids, i)
    }

    pub fn list_comm_clause_ids(
        &mut self,
        i: impl IntoIterator<Item = CommClauseId>,
    ) -> ListRef<CommClauseId> {
        Self::push_list(&mut self.extras.comm_clause_ids, i)
    }

    pub fn list_comment_ids(
        &mut self,
        i: impl IntoIterator<Item = CommentId>,
    ) -> ListRef<CommentId> {
        Self::push_list(&mut self.extras.comment_ids, i)
    }

    pub fn list_comment_group_ids(
        &mut self,
        i: impl IntoIterator<Item = CommentGroupId>,
    ) -> ListRef<CommentGroupId> {
        Self::push_list(&mut self.extras.comment_group_ids, i)
    }

    // List Accessors

    pub fn ident_names(&self, r: ListRef<IdentName>) -> &[IdentName] {
        Self::slice(&self.extras.ident_names, r)
    }

    pub fn exprs_list(&self, r: ListRef<ExprId>) -> &[ExprId] {
        Self::slice(&self.extras.exprs, r)
    }

    pub fn stmts_list(&self, r: ListRef<StmtId>) -> &[StmtId] {
        Self::slice(&self.extras.stmts, r)
    }

    pub fn types_list(&self, r: ListRef<TypeId>) -> &[TypeId] {
        Self::slice(&self.extras.types, r)
    }

    pub fn fields_list(&self, r: ListRef<FieldId>) -> &[FieldId] {
        Self::slice(&self.extras.fields, r)
    }

    pub fn specs_list(&self, r: ListRef<SpecId>) -> &[SpecId] {
        Self::slice(&self.extras.specs, r)
    }

    pub fn keyed_elems_list(&self, r: ListRef<KeyedElement>) -> &[KeyedElement] {
        Self::slice(&self.extras.keyed_elems, r)
    }

    pub fn top_decls(&self, r: ListRef<TopLevelDecl>) -> &[TopLevelDecl] {
        Self::slice(&self.extras.top_decls, r)
    }

    pub fn switch_clause_ids(&self, r: ListRef<SwitchClauseId>) -> &[SwitchClauseId] {
        Self::slice(&self.extras.switch_clause_ids, r)
    }

    pub fn comm_clause_ids(&self, r: ListRef<CommClauseId>) -> &[CommClauseId] {
        Self::slice(&self.extras.comm_clause_ids, r)
    }

    pub fn comment_ids(&self, r: ListRef<CommentId>) -> &[CommentId] {
        Self::slice(&self.extras.comment_ids, r)
    }

    pub fn comment_group_ids(&self, r: ListRef<CommentGroupId>) -> &[CommentGroupId] {
        Self::slice(&self.extras.comment_group_ids, r)
    }

    // Mutable slot access used by tree surgery

    pub fn exprs_list_mut(&mut self, r: ListRef<ExprId>) -> &mut [ExprId] {
        Self::slice_mut(&mut self.extras.exprs, r)
    }

    pub fn keyed_elems_list_mut(&mut self, r: ListRef<KeyedElement>) -> &mut [KeyedElement] {
        Self::slice_mut(&mut self.extras.keyed_elems, r)
    }

    pub fn ident_names_mut(&mut self, r: ListRef<IdentName>) -> &mut [IdentName] {
        Self::slice_mut(&mut self.extras.ident_names, r)
    }

    /// Index of the first element of an `IdentName` list, for [`IdentSlot::List`].
    pub fn ident_slot(r: ListRef<IdentName>, i: usize) -> IdentSlot {
        IdentSlot::List(r.start() + i as u32)
    }

    // Spans by node reference

    pub fn span(&self, node: NodeRef) -> Span {
        match node {
            NodeRef::Decl(id) => self.decls.span(id),
            NodeRef::Spec(id) => self.specs.span(id),
            NodeRef::Func(id) => self.funcs.span(id),
            NodeRef::Signature(id) => self.signatures.span(id),
            NodeRef::Field(id) => self.fields.span(id),
            NodeRef::Block(id) => self.blocks.span(id),
            NodeRef::Stmt(id) => self.stmts.span(id),
            NodeRef::SimpleStmt(id) => self.simple_stmts.span(id),
            NodeRef::Expr(id) => self.exprs.span(id),
            NodeRef::Type(id) => self.types.span(id),
            NodeRef::SwitchClause(id) => self.switch_clauses.span(id),
            NodeRef::CommClause(id) => self.comm_clauses.span(id),
            NodeRef::Comment(id) => self.comments.span(id),
            NodeRef::CommentGroup(id) => self.comment_groups.span(id),
        }
    }

    pub fn span_mut(&mut self, node: NodeRef) -> &mut Span {
        match node {
            NodeRef::Decl(id) => self.decls.span_mut(id),
            NodeRef::Spec(id) => self.specs.span_mut(id),
            NodeRef::Func(id) => self.funcs.span_mut(id),
            NodeRef::Signature(id) => self.signatures.span_mut(id),
            NodeRef::Field(id) => self.fields.span_mut(id),
            NodeRef::Block(id) => self.blocks.span_mut(id),
            NodeRef::Stmt(id) => self.stmts.span_mut(id),
            NodeRef::SimpleStmt(id) => self.simple_stmts.span_mut(id),
            NodeRef::Expr(id) => self.exprs.span_mut(id),
            NodeRef::Type(id) => self.types.span_mut(id),
            NodeRef::SwitchClause(id) => self.switch_clauses.span_mut(id),
            NodeRef::CommClause(id) => self.comm_clauses.span_mut(id),
            NodeRef::Comment(id) => self.comments.span_mut(id),
            NodeRef::CommentGroup(id) => self.comment_groups.span_mut(id),
        }
    }

    /// The `IdentName` stored at `slot`. `PackageName` lives on the `SourceFile`.
    pub fn ident_name_mut(&mut self, slot: IdentSlot) -> Option<&mut IdentName> {
        match slot {
            IdentSlot::List(i) => self.extras.ident_names.get_mut(i as usize),
            IdentSlot::PackageName => None,
            IdentSlot::Import(id) => match &mut self.specs[id] {
                Spec::Import { name, .. } => name.as_mut(),
                _ => None,
            },
            IdentSlot::TypeName(id) => match &mut self.specs[id] {
                Spec::Type { name, .. } => Some(name),
                _ => None,
            },
            IdentSlot::Func(id) => Some(&mut self.funcs[id].name),
            IdentSlot::Selector(id) => match &mut self.exprs[id] {
                Expr::Selector { sel, .. } => Some(sel),
                _ => None,
            },
            IdentSlot::Label(id) => match &mut self.stmts[id] {
                Stmt::Labeled { label, .. } => Some(label),
                Stmt::Branch { label, .. } => label.as_mut(),
                _ => None,
            },
            IdentSlot::TypeSwitchBind(id) => match &mut self.stmts[id] {
                Stmt::TypeSwitch { bind, .. } => bind.as_mut(),
                _ => None,
            },
        }
    }

    /// Human-readable node kind, used in diagnostics.
    pub fn describe(&self, node: NodeRef) -> &'static str {
        match node {
            NodeRef::Decl(_) => "declaration",
            NodeRef::Spec(id) => match self.specs[id] {
                Spec::Import { .. } => "import spec",
                Spec::Value { .. } => "value spec",
                Spec::Type { .. } => "type spec",
            },
            NodeRef::Func(_) => "function declaration",
            NodeRef::Signature(_) => "signature",
            NodeRef::Field(_) => "field",
            NodeRef::Block(_) => "block",
            NodeRef::Stmt(id) => self.stmts[id].describe(),
            NodeRef::SimpleStmt(id) => match self.simple_stmts[id] {
                SimpleStmt::Expr(_) => "expression statement",
                SimpleStmt::Send { .. } => "send statement",
                SimpleStmt::IncDec { .. } => "inc/dec statement",
                SimpleStmt::Assign { .. } => "assignment",
                SimpleStmt::ShortVarDecl { .. } => "short variable declaration",
            },
            NodeRef::Expr(id) => self.exprs[id].describe(),
            NodeRef::Type(_) => "type expression",
            NodeRef::SwitchClause(_) => "case clause",
            NodeRef::CommClause(_) => "select case",
            NodeRef::Comment(_) | NodeRef::CommentGroup(_) => "comment",
        }
    }
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/* ... */`
    Block,
}

/// A single comment; `text` includes the comment markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: Symbol,
}

/// Adjacent comments with no blank line or code between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct CommentGroup {
    pub comments: ListRef<CommentId>,
}

// =============================================================================
// Source File (Root Node)
// =============================================================================

/// A complete Go source file.
///
/// ```text
/// SourceFile = PackageClause ";" { ImportDecl ";" } { TopLevelDecl ";" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct SourceFile {
    /// Span of the `package name` clause.
    pub package: Span,
    pub name: IdentName,
    /// All top-level declarations in source order.
    pub decls: ListRef<TopLevelDecl>,
    /// All comment groups, sorted by position.
    pub comments: ListRef<CommentGroupId>,
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum TopLevelDecl {
    Decl(DeclId),
    Func(FuncDeclId),
}

/// `import`, `const`, `type` or `var` declaration, single or parenthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct Decl {
    pub kind: GenDeclKind,
    pub grouped: bool,
    pub specs: ListRef<SpecId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GenDeclKind {
    Import,
    Const,
    Type,
    Var,
}

impl GenDeclKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Const => "const",
            Self::Type => "type",
            Self::Var => "var",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum Spec {
    /// `[name] "path"`
    Import {
        name: Option<IdentName>,
        path: Symbol,
    },
    /// `names [typ] [= values]`
    Value {
        names: ListRef<IdentName>,
        typ: Option<TypeId>,
        values: ListRef<ExprId>,
    },
    /// `name [=] typ`
    Type {
        name: IdentName,
        alias: bool,
        typ: TypeId,
    },
}

/// Function or method declaration.
///
/// ```text
/// FunctionDecl = "func" FunctionName Signature [ FunctionBody ]
/// MethodDecl   = "func" Receiver MethodName Signature [ FunctionBody ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct FuncDecl {
    pub recv: Option<FieldId>,
    pub name: IdentName,
    pub sig: SignatureId,
    pub body: Option<BlockId>,
}

// =============================================================================
// Signatures and Fields
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct Signature {
    pub params: ListRef<FieldId>,
    pub results: ListRef<FieldId>,
}

/// Parameter, result, struct field or interface method.
///
/// `a, b int` is one field with two names. Interface methods are a single name
/// with a `Type::Func`; embedded fields have no names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct Field {
    pub names: ListRef<IdentName>,
    pub typ: TypeId,
    pub variadic: bool,
    pub tag: Option<Symbol>,
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct Block {
    pub stmts: ListRef<StmtId>,
}

/// Statements allowed in `if`/`for`/`switch` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum SimpleStmt {
    Expr(ExprId),
    /// `chan <- value`
    Send { chan: ExprId, value: ExprId },
    /// `x++` / `x--`
    IncDec { expr: ExprId, op: IncDecOp },
    /// `lhs = rhs` / `lhs op= rhs`
    Assign {
        lhs: ListRef<ExprId>,
        op: AssignOp,
        rhs: ListRef<ExprId>,
    },
    /// `names := values`
    ShortVarDecl {
        names: ListRef<IdentName>,
        values: ListRef<ExprId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum Stmt {
    Simple(SimpleStmtId),
    Decl(DeclId),
    Labeled {
        label: IdentName,
        stmt: StmtId,
    },
    Go(ExprId),
    Defer(ExprId),
    Return(ListRef<ExprId>),
    Branch {
        kind: BranchKind,
        label: Option<IdentName>,
    },
    Block(BlockId),
    If {
        init: Option<SimpleStmtId>,
        cond: ExprId,
        then_block: BlockId,
        else_stmt: Option<StmtId>,
    },
    For {
        kind: ForKind,
        body: BlockId,
    },
    Switch {
        init: Option<SimpleStmtId>,
        tag: Option<ExprId>,
        clauses: ListRef<SwitchClauseId>,
    },
    /// `switch [init;] [bind :=] x.(type) { ... }`; `guard` is the `x.(type)` expression.
    TypeSwitch {
        init: Option<SimpleStmtId>,
        bind: Option<IdentName>,
        guard: ExprId,
        clauses: ListRef<SwitchClauseId>,
    },
    Select {
        clauses: ListRef<CommClauseId>,
    },
}

impl Stmt {
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple statement",
            Self::Decl(_) => "declaration statement",
            Self::Labeled { .. } => "labeled statement",
            Self::Go(_) => "go statement",
            Self::Defer(_) => "defer statement",
            Self::Return(_) => "return statement",
            Self::Branch { .. } => "branch statement",
            Self::Block(_) => "block statement",
            Self::If { .. } => "if statement",
            Self::For { .. } => "for statement",
            Self::Switch { .. } => "switch statement",
            Self::TypeSwitch { .. } => "type switch statement",
            Self::Select { .. } => "select statement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum ForKind {
    /// `for { }`
    Infinite,
    /// `for cond { }`
    Cond(ExprId),
    /// `for init; cond; post { }`
    Clause {
        init: Option<SimpleStmtId>,
        cond: Option<ExprId>,
        post: Option<SimpleStmtId>,
    },
    /// `for [key [, value] (:= | =)] range expr { }`
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        define: bool,
        expr: ExprId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Goto => "goto",
            Self::Fallthrough => "fallthrough",
        }
    }
}

/// `case ...:` / `default:` clause of an expression or type switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct SwitchClause {
    pub kind: CaseKind,
    pub stmts: ListRef<StmtId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum CaseKind {
    Default,
    Exprs(ListRef<ExprId>),
    Types(ListRef<TypeId>),
}

/// `case comm:` / `default:` clause of a select statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct CommClause {
    pub comm: Option<SimpleStmtId>,
    pub stmts: ListRef<StmtId>,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum Expr {
    Ident(Ident),
    BasicLit(BasicLit),
    FuncLit {
        sig: SignatureId,
        body: BlockId,
    },
    /// `typ{elems}`; `typ` is `None` for elided element literals.
    CompositeLit {
        typ: Option<TypeId>,
        elems: ListRef<KeyedElement>,
    },
    Paren(ExprId),
    Selector {
        expr: ExprId,
        sel: IdentName,
    },
    Index {
        expr: ExprId,
        index: ExprId,
    },
    Slice {
        expr: ExprId,
        lo: Option<ExprId>,
        hi: Option<ExprId>,
        max: Option<ExprId>,
    },
    /// `expr.(typ)`; `typ` is `None` for the `.(type)` switch guard.
    TypeAssert {
        expr: ExprId,
        typ: Option<TypeId>,
    },
    Call {
        callee: ExprId,
        args: ListRef<ExprId>,
        ellipsis: bool,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Binary {
        left: ExprId,
        op: BinaryOp,
        right: ExprId,
    },
    /// A type in expression position: conversions, `make`/`new` arguments.
    TypeExpr(TypeId),
}

impl Expr {
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Ident(_) => "identifier",
            Self::BasicLit(_) => "literal",
            Self::FuncLit { .. } => "function literal",
            Self::CompositeLit { .. } => "composite literal",
            Self::Paren(_) => "parenthesized expression",
            Self::Selector { .. } => "selector expression",
            Self::Index { .. } => "index expression",
            Self::Slice { .. } => "slice expression",
            Self::TypeAssert { .. } => "type assertion",
            Self::Call { .. } => "call expression",
            Self::Unary { .. } => "unary expression",
            Self::Binary { .. } => "binary expression",
            Self::TypeExpr(_) => "type expression",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct KeyedElement {
    pub key: Option<ExprId>,
    pub value: ExprId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub struct BasicLit {
    pub kind: BasicLitKind,
    pub value: Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BasicLitKind {
    Int,
    Float,
    Imag,
    Rune,
    String,
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst, SpanFields)]
pub enum Type {
    /// `name` or `pkg.name`
    Named {
        pkg: Option<Ident>,
        name: Ident,
    },
    Pointer(TypeId),
    Slice(TypeId),
    /// `[len]elem`; `len` is `None` for `[...]elem`.
    Array {
        len: Option<ExprId>,
        elem: TypeId,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Chan {
        dir: ChanDir,
        elem: TypeId,
    },
    Func(SignatureId),
    Struct {
        fields: ListRef<FieldId>,
    },
    Interface {
        methods: ListRef<FieldId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

// =============================================================================
// Operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Add,   // +
    Sub,   // -
    Not,   // !
    Xor,   // ^
    Deref, // *
    Addr,  // &
    Recv,  // <-
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Not => "!",
            Self::Xor => "^",
            Self::Deref => "*",
            Self::Addr => "&",
            Self::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,    // +
    Sub,    // -
    Mul,    // *
    Div,    // /
    Mod,    // %
    And,    // &
    Or,     // |
    Xor,    // ^
    Shl,    // <<
    Shr,    // >>
    AndNot, // &^
    LAnd,   // &&
    LOr,    // ||
    Eq,     // ==
    Ne,     // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::AndNot => "&^",
            Self::LAnd => "&&",
            Self::LOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Go operator precedence, 1 (`||`) to 5 (multiplicative).
    pub const fn precedence(self) -> u8 {
        match self {
            Self::LOr => 1,
            Self::LAnd => 2,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 3,
            Self::Add | Self::Sub | Self::Or | Self::Xor => 4,
            Self::Mul | Self::Div | Self::Mod | Self::Shl | Self::Shr | Self::And | Self::AndNot => 5,
        }
    }

    pub const fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,       // =
    AddAssign,    // +=
    SubAssign,    // -=
    MulAssign,    // *=
    DivAssign,    // /=
    ModAssign,    // %=
    AndAssign,    // &=
    OrAssign,     // |=
    XorAssign,    // ^=
    ShlAssign,    // <<=
    ShrAssign,    // >>=
    AndNotAssign, // &^=
}

impl AssignOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::ModAssign => "%=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::AndNotAssign => "&^=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc, // ++
    Dec, // --
}

impl IncDecOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inc => "++",
            Self::Dec => "--",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_round_trips_and_dedups() {
        let mut i = Interner::new();
        let a = i.intern("fmt");
        let b = i.intern("Println");
        assert_eq!(i.intern("fmt"), a);
        assert_ne!(a, b);
        assert_eq!(i.resolve(b), "Println");
        assert_eq!(i.get("Println"), Some(b));
        assert_eq!(i.get("missing"), None);
    }

    #[test]
    fn ids_hash_without_node_bounds() {
        use std::collections::HashSet;
        let mut arena = AstArena::new();
        let x = arena.exprs.alloc(Expr::Ident(Symbol::from_raw(0)), Span::new(0, 1));
        let set: HashSet<NodeRef> = [NodeRef::Expr(x), NodeRef::Expr(x)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn inline_spans_are_visited() {
        let mut stmt = Stmt::Labeled {
            label: IdentName {
                sym: Symbol::from_raw(0),
                pos: Span::new(4, 7),
            },
            stmt: StmtId::from_raw(0),
        };
        stmt.for_each_span(&mut |s| {
            s.start += 10;
            s.end += 10;
        });
        let Stmt::Labeled { label, .. } = stmt else {
            unreachable!()
        };
        assert_eq!(label.pos, Span::new(14, 17));
    }

    #[test]
    fn watermark_tracks_growth() {
        let mut arena = AstArena::new();
        let before = arena.watermark();
        arena.exprs.alloc_fresh(Expr::Ident(Symbol::from_raw(1)));
        let after = arena.watermark();
        assert_eq!(before.exprs + 1, after.exprs);
        assert!(arena.exprs.span(ExprId::from_raw(0)).is_unset());
    }
}
