//! Maps a `line:col-line:col` selection onto the syntax tree.
//!
//! Two passes over the tree, both pre-order with a parent stack:
//!
//! 1. an expression whose span is exactly the selection;
//! 2. otherwise a run of sibling statements, starting with the first node
//!    that begins at the selection start and ending with the sibling that
//!    ends at the selection end.

use std::fmt;
use std::str::FromStr;

use go_syntax::ast::{
    AstArena, BlockId, CommClauseId, ExprId, ListRef, NodeRef, Span, StmtId, SwitchClauseId,
};
use go_syntax::walk::Visitor;
use go_syntax::{print_document, Document, LineIndex, LineTable, Position};
use thiserror::Error;

use crate::error::{ExtractError, SelectionFailure};

/// A text range in 1-based `(line, column)` positions; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub begin: Position,
    pub end: Position,
}

impl Selection {
    pub const fn new(begin: Position, end: Position) -> Self {
        Self { begin, end }
    }

    /// Drops surrounding spaces, tabs and line ends. Cursors past the end of a
    /// line or of the document are clamped first.
    pub fn shrink_to_non_whitespace(self, source: &str) -> Self {
        let terminated;
        let text = if source.ends_with('\n') {
            source
        } else {
            terminated = format!("{source}\n");
            &terminated
        };
        let index = LineIndex::new(&LineTable::from_text(text));
        let (Some(mut begin), Some(mut end)) = (
            index.offset(index.clamp(self.begin)),
            index.offset(index.clamp(self.end)),
        ) else {
            return self;
        };

        let bytes = text.as_bytes();
        let blank = |b: u8| matches!(b, b' ' | b'\t' | b'\n' | b'\r');
        while begin < end && blank(bytes[begin as usize]) {
            begin += 1;
        }
        while end > begin && blank(bytes[end as usize - 1]) {
            end -= 1;
        }
        Self::new(index.position(begin), index.position(end))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed selection `{0}`, expected `line:col-line:col`")]
pub struct ParseSelectionError(String);

impl FromStr for Selection {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let err = || ParseSelectionError(s.to_owned());
        let position = |part: &str| -> Option<Position> {
            let (line, col) = part.split_once(':')?;
            Some(Position::new(line.parse().ok()?, col.parse().ok()?))
        };
        let (begin, end) = compact.split_once('-').ok_or_else(err)?;
        Ok(Self::new(
            position(begin).ok_or_else(err)?,
            position(end).ok_or_else(err)?,
        ))
    }
}

/// The node that owns a statement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtListOwner {
    Block(BlockId),
    SwitchClause(SwitchClauseId),
    CommClause(CommClauseId),
}

impl StmtListOwner {
    pub fn of(node: NodeRef) -> Option<Self> {
        match node {
            NodeRef::Block(id) => Some(Self::Block(id)),
            NodeRef::SwitchClause(id) => Some(Self::SwitchClause(id)),
            NodeRef::CommClause(id) => Some(Self::CommClause(id)),
            _ => None,
        }
    }

    pub fn node(self) -> NodeRef {
        match self {
            Self::Block(id) => NodeRef::Block(id),
            Self::SwitchClause(id) => NodeRef::SwitchClause(id),
            Self::CommClause(id) => NodeRef::CommClause(id),
        }
    }

    pub fn stmts(self, arena: &AstArena) -> ListRef<StmtId> {
        match self {
            Self::Block(id) => arena.blocks[id].stmts,
            Self::SwitchClause(id) => arena.switch_clauses[id].stmts,
            Self::CommClause(id) => arena.comm_clauses[id].stmts,
        }
    }

    pub fn set_stmts(self, arena: &mut AstArena, stmts: ListRef<StmtId>) {
        match self {
            Self::Block(id) => arena.blocks[id].stmts = stmts,
            Self::SwitchClause(id) => arena.switch_clauses[id].stmts = stmts,
            Self::CommClause(id) => arena.comm_clauses[id].stmts = stmts,
        }
    }
}

/// What a selection resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    Expression { expr: ExprId, parent: NodeRef },
    /// Consecutive statements of one list, in source order.
    Statements {
        stmts: Vec<StmtId>,
        owner: StmtListOwner,
    },
}

impl Region {
    /// Source range from the first selected byte to one past the last.
    pub fn span(&self, arena: &AstArena) -> Span {
        match self {
            Self::Expression { expr, .. } => arena.exprs.span(*expr),
            Self::Statements { stmts, .. } => match (stmts.first(), stmts.last()) {
                (Some(&first), Some(&last)) => arena.stmts.span(first).to(arena.stmts.span(last)),
                _ => Span::UNSET,
            },
        }
    }

    /// Top-level nodes of the region.
    pub fn roots(&self) -> Vec<NodeRef> {
        match self {
            Self::Expression { expr, .. } => vec![NodeRef::Expr(*expr)],
            Self::Statements { stmts, .. } => stmts.iter().map(|&s| NodeRef::Stmt(s)).collect(),
        }
    }
}

/// Resolves `selection` against `doc`, trimming surrounding whitespace first.
pub fn resolve_selection(doc: &Document, selection: Selection) -> Result<Region, ExtractError> {
    let invalid = |reason| ExtractError::InvalidSelection { selection, reason };
    let (Some(raw_begin), Some(raw_end)) = (doc.offset_of(selection.begin), doc.offset_of(selection.end))
    else {
        return Err(invalid(SelectionFailure::OutOfBounds));
    };
    if raw_begin > raw_end {
        return Err(invalid(SelectionFailure::Reversed));
    }

    let trimmed = match doc.source() {
        Some(source) => selection.shrink_to_non_whitespace(source),
        None => selection.shrink_to_non_whitespace(&print_document(doc)),
    };
    let (Some(begin), Some(end)) = (doc.offset_of(trimmed.begin), doc.offset_of(trimmed.end))
    else {
        return Err(invalid(SelectionFailure::OutOfBounds));
    };
    if begin >= end {
        return Err(invalid(SelectionFailure::Empty));
    }

    let mut exact = ExprFinder::new(begin, end);
    exact.visit_source_file(&doc.arena, &doc.file);
    if let Some((expr, Some(parent))) = exact.found {
        tracing::debug!(?expr, parent = doc.arena.describe(parent), "selection is an expression");
        return Ok(Region::Expression { expr, parent });
    }

    let mut run = RunFinder::new(begin, end);
    run.visit_source_file(&doc.arena, &doc.file);
    let region = run.into_region().map_err(invalid)?;
    tracing::debug!(?region, "selection is a statement run");
    Ok(region)
}

/// First expression whose span equals the selection.
struct ExprFinder {
    begin: u32,
    end: u32,
    parents: Vec<NodeRef>,
    found: Option<(ExprId, Option<NodeRef>)>,
}

impl ExprFinder {
    fn new(begin: u32, end: u32) -> Self {
        Self {
            begin,
            end,
            parents: Vec::new(),
            found: None,
        }
    }

    fn enter(&mut self, a: &AstArena, node: NodeRef) -> bool {
        self.parents.push(node);
        if self.found.is_some() || is_comment(node) {
            return false;
        }
        let span = a.span(node);
        if span.start > self.end || span.end < self.begin {
            return false;
        }
        if let NodeRef::Expr(id) = node {
            if span.start == self.begin && span.end == self.end {
                let parent = self.parents.iter().rev().nth(1).copied();
                self.found = Some((id, parent));
                return false;
            }
        }
        true
    }

    fn leave(&mut self, _: NodeRef) {
        self.parents.pop();
    }
}

impl<'ast> Visitor<'ast> for ExprFinder {
    tracking_visitor!('ast);
}

/// Siblings from the node starting at the selection start to the one ending
/// at its end.
struct RunFinder {
    begin: u32,
    end: u32,
    parents: Vec<NodeRef>,
    /// Set once a node starting at `begin` was seen; holds its parent.
    owner: Option<Option<NodeRef>>,
    recorded: Vec<NodeRef>,
    complete: bool,
    /// Left the owner without reaching `end`.
    abandoned: bool,
}

impl RunFinder {
    fn new(begin: u32, end: u32) -> Self {
        Self {
            begin,
            end,
            parents: Vec::new(),
            owner: None,
            recorded: Vec::new(),
            complete: false,
            abandoned: false,
        }
    }

    fn enter(&mut self, a: &AstArena, node: NodeRef) -> bool {
        let parent = self.parents.last().copied();
        self.parents.push(node);
        if self.complete || self.abandoned || is_comment(node) {
            return false;
        }
        let span = a.span(node);
        if self.owner.is_none() && span.start == self.begin {
            self.owner = Some(parent);
        }
        if self.owner == Some(parent) {
            self.recorded.push(node);
            if span.end == self.end {
                self.complete = true;
                return false;
            }
        }
        true
    }

    fn leave(&mut self, node: NodeRef) {
        self.parents.pop();
        if !self.complete && self.owner == Some(Some(node)) {
            self.abandoned = true;
        }
    }

    fn into_region(self) -> Result<Region, SelectionFailure> {
        let Some(owner) = self.owner else {
            return Err(SelectionFailure::NoNodeAtBegin);
        };
        if !self.complete {
            return Err(SelectionFailure::NoNodeAtEnd);
        }
        let owner = owner
            .and_then(StmtListOwner::of)
            .ok_or(SelectionFailure::NotAStatementList)?;
        let stmts = self
            .recorded
            .into_iter()
            .map(|node| match node {
                NodeRef::Stmt(id) => Ok(id),
                _ => Err(SelectionFailure::NotAStatement),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Region::Statements { stmts, owner })
    }
}

impl<'ast> Visitor<'ast> for RunFinder {
    tracking_visitor!('ast);
}

fn is_comment(node: NodeRef) -> bool {
    matches!(node, NodeRef::Comment(_) | NodeRef::CommentGroup(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use go_syntax::ast::{Expr, Stmt};
    use go_syntax::parse_source;
    use pretty_assertions::assert_eq;

    fn sel(s: &str) -> Selection {
        s.parse().expect("selection")
    }

    const SRC: &str = "package main

func main() {
	x := 3
	y := (x + 1) * 2
	println(x, y)

	if y > 0 {
		println(y)
	}
}
";

    #[test]
    fn parses_and_displays_selections() {
        let s = sel(" 4 : 7 - 10 : 2 ");
        assert_eq!(s, Selection::new(Position::new(4, 7), Position::new(10, 2)));
        assert_eq!(s.to_string(), "4:7-10:2");
        assert!("4:7".parse::<Selection>().is_err());
        assert!("a:1-2:3".parse::<Selection>().is_err());
    }

    #[test]
    fn shrinks_to_the_selected_code() {
        // from the newline before `x` to the blank line after `println`
        let s = sel("3:14-7:1").shrink_to_non_whitespace(SRC);
        assert_eq!(s, sel("4:2-6:15"));
        assert_eq!(s.shrink_to_non_whitespace(SRC), s);
    }

    #[test]
    fn clamps_before_shrinking() {
        let s = sel("4:99-4:99").shrink_to_non_whitespace(SRC);
        assert_eq!(s.begin, s.end);
        let whole = sel("1:1-99:1").shrink_to_non_whitespace(SRC);
        assert_eq!(whole, sel("1:1-11:2"));
    }

    #[test]
    fn exact_expression_wins() {
        let doc = parse_source(SRC).expect("parse");
        let Region::Expression { expr, parent } = resolve_selection(&doc, sel("5:7-5:14")).expect("region")
        else {
            panic!("expected an expression");
        };
        assert!(matches!(doc.arena.exprs[expr], Expr::Paren(_)));
        assert!(matches!(parent, NodeRef::Expr(p) if matches!(doc.arena.exprs[p], Expr::Binary { .. })));
    }

    #[test]
    fn every_expression_resolves_to_itself() {
        let doc = parse_source(SRC).expect("parse");
        for (id, _, span) in doc.arena.exprs.iter() {
            let selection = Selection::new(doc.position_of(span.start), doc.position_of(span.end));
            match resolve_selection(&doc, selection) {
                Ok(Region::Expression { expr, .. }) => assert_eq!(expr, id, "{selection}"),
                other => panic!("{selection}: {other:?}"),
            }
        }
    }

    #[test]
    fn statement_runs_need_matching_ends() {
        let doc = parse_source(SRC).expect("parse");
        let Region::Statements { stmts, owner } = resolve_selection(&doc, sel("4:2-6:15")).expect("region")
        else {
            panic!("expected statements");
        };
        assert_eq!(stmts.len(), 3);
        assert!(matches!(owner, StmtListOwner::Block(_)));

        // the run may span a nested block as long as its last sibling ends the selection
        let Region::Statements { stmts, .. } = resolve_selection(&doc, sel("6:2-10:3")).expect("region")
        else {
            panic!("expected statements");
        };
        assert!(matches!(doc.arena.stmts[stmts[1]], Stmt::If { .. }));
    }

    #[test]
    fn rejects_partial_and_mixed_selections() {
        let doc = parse_source(SRC).expect("parse");
        let reason = |s: &str| match resolve_selection(&doc, sel(s)) {
            Err(ExtractError::InvalidSelection { reason, .. }) => reason,
            other => panic!("expected an invalid selection, got {other:?}"),
        };
        // from inside the parenthesis to the end of the statement
        assert_eq!(reason("5:8-5:18"), SelectionFailure::NoNodeAtEnd);
        // `:=` starts no node
        assert_eq!(reason("4:4-4:8"), SelectionFailure::NoNodeAtBegin);
        assert_eq!(reason("4:2-4:2"), SelectionFailure::Empty);
        assert_eq!(reason("5:7-4:2"), SelectionFailure::Reversed);
        assert_eq!(reason("40:1-41:1"), SelectionFailure::OutOfBounds);
        // the whole function is a declaration, not a statement list
        assert_eq!(reason("3:1-11:2"), SelectionFailure::NotAStatementList);
    }
}
