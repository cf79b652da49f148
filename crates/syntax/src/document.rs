//! Parsed document: tree, interner, comments and the line tables that map byte
//! offsets to 1-based `(line, column)` positions.
//!
//! Every line of a document is newline terminated, so
//! `sum(line length + 1) == document size` always holds.

use crate::ast::{AstArena, IdentSlot, Interner, SourceFile, Span, Symbol};
use crate::render::SpanSlot;

/// 1-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line index ↦ byte length, newline excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    lens: Vec<u32>,
}

impl LineTable {
    pub fn new(lens: Vec<u32>) -> Self {
        Self { lens }
    }

    /// `text` must end with a newline.
    pub fn from_text(text: &str) -> Self {
        debug_assert!(text.is_empty() || text.ends_with('\n'));
        let mut lens = Vec::new();
        let mut start = 0usize;
        for nl in memchr::memchr_iter(b'\n', text.as_bytes()) {
            lens.push((nl - start) as u32);
            start = nl + 1;
        }
        Self { lens }
    }

    /// Rebuilds lengths from line start offsets and the total document size.
    pub fn from_line_starts(starts: &[u32], size: u32) -> Self {
        let lens = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let next = starts.get(i + 1).copied().unwrap_or(size);
                next.saturating_sub(start).saturating_sub(1)
            })
            .collect();
        Self { lens }
    }

    pub fn to_line_starts(&self) -> Vec<u32> {
        let mut at = 0u32;
        self.lens
            .iter()
            .map(|&len| {
                let start = at;
                at += len + 1;
                start
            })
            .collect()
    }

    /// Document size implied by the table.
    pub fn total_len(&self) -> u32 {
        self.lens.iter().map(|&l| l + 1).sum()
    }

    pub fn len(&self) -> usize {
        self.lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lens.is_empty()
    }

    pub fn lengths(&self) -> &[u32] {
        &self.lens
    }

    /// Length of 1-based `line`.
    pub fn line_len(&self, line: u32) -> Option<u32> {
        let idx = (line as usize).checked_sub(1)?;
        self.lens.get(idx).copied()
    }

    /// Replaces the 0-based line range with `with`.
    pub fn splice(&mut self, range: std::ops::Range<usize>, with: impl IntoIterator<Item = u32>) {
        self.lens.splice(range, with);
    }

    pub fn push(&mut self, len: u32) {
        self.lens.push(len);
    }

    pub fn extend(&mut self, lens: impl IntoIterator<Item = u32>) {
        self.lens.extend(lens);
    }
}

/// Line start offsets derived from a [`LineTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<u32>,
    lens: Vec<u32>,
    size: u32,
}

impl LineIndex {
    pub fn new(table: &LineTable) -> Self {
        Self {
            starts: table.to_line_starts(),
            lens: table.lengths().to_vec(),
            size: table.total_len(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn line_count(&self) -> u32 {
        self.starts.len() as u32
    }

    pub fn line_starts(&self) -> &[u32] {
        &self.starts
    }

    /// Byte offset of `pos`. The column may point at the line's newline.
    pub fn offset(&self, pos: Position) -> Option<u32> {
        let idx = (pos.line as usize).checked_sub(1)?;
        let start = *self.starts.get(idx)?;
        let len = self.lens[idx];
        if pos.column == 0 || pos.column > len + 1 {
            return None;
        }
        Some(start + pos.column - 1)
    }

    /// 1-based line containing `offset`; the end of the document maps past the last line.
    pub fn line_of(&self, offset: u32) -> u32 {
        if offset >= self.size {
            return self.line_count() + 1;
        }
        self.starts.partition_point(|&s| s <= offset) as u32
    }

    pub fn position(&self, offset: u32) -> Position {
        let line = self.line_of(offset);
        let start = self
            .starts
            .get(line as usize - 1)
            .copied()
            .unwrap_or(self.size);
        Position::new(line, offset - start + 1)
    }

    /// Clamps `pos` to the nearest valid position of the document.
    pub fn clamp(&self, pos: Position) -> Position {
        if self.starts.is_empty() {
            return Position::new(1, 1);
        }
        let last = self.line_count();
        if pos.line > last {
            return Position::new(last, self.lens[last as usize - 1] + 1);
        }
        let line = pos.line.max(1);
        let max_col = self.lens[line as usize - 1] + 1;
        Position::new(line, pos.column.clamp(1, max_col))
    }
}

/// A parsed Go file plus its position tables.
#[derive(Debug)]
pub struct Document {
    pub arena: AstArena,
    pub interner: Interner,
    pub file: SourceFile,
    lines: LineTable,
    index: LineIndex,
    source: Option<String>,
}

impl Document {
    pub(crate) fn new(arena: AstArena, interner: Interner, file: SourceFile, source: String) -> Self {
        let lines = LineTable::from_text(&source);
        let index = LineIndex::new(&lines);
        Self {
            arena,
            interner,
            file,
            lines,
            index,
            source: Some(source),
        }
    }

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn size(&self) -> u32 {
        self.index.size()
    }

    /// The parsed text, until the document is first edited.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Installs a rewritten line table and drops the stale source text.
    pub fn install_lines(&mut self, lines: LineTable) {
        self.index = LineIndex::new(&lines);
        self.lines = lines;
        self.source = None;
    }

    pub fn offset_of(&self, pos: Position) -> Option<u32> {
        self.index.offset(pos)
    }

    pub fn position_of(&self, offset: u32) -> Position {
        self.index.position(offset)
    }

    pub fn text(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Writes a laid-out span back into the tree.
    pub fn apply_span(&mut self, slot: SpanSlot, span: Span) {
        match slot {
            SpanSlot::Node(node) => *self.arena.span_mut(node) = span,
            SpanSlot::PackageClause => self.file.package = span,
            SpanSlot::Ident(IdentSlot::PackageName) => self.file.name.pos = span,
            SpanSlot::Ident(ident) => {
                if let Some(name) = self.arena.ident_name_mut(ident) {
                    name.pos = span;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_convert_both_ways() {
        let table = LineTable::from_line_starts(&[0, 18, 19, 25, 38, 68, 72], 106);
        assert_eq!(table.lengths(), &[17, 0, 5, 12, 29, 3, 33]);
        assert_eq!(table.to_line_starts(), vec![0, 18, 19, 25, 38, 68, 72]);
        assert_eq!(table.total_len(), 106);
    }

    #[test]
    fn positions_are_one_based() {
        let table = LineTable::from_text("ab\n\ncde\n");
        let index = LineIndex::new(&table);
        assert_eq!(index.offset(Position::new(1, 1)), Some(0));
        assert_eq!(index.offset(Position::new(1, 3)), Some(2));
        assert_eq!(index.offset(Position::new(3, 2)), Some(5));
        assert_eq!(index.offset(Position::new(3, 5)), None);
        assert_eq!(index.offset(Position::new(4, 1)), None);
        assert_eq!(index.position(5), Position::new(3, 2));
        assert_eq!(index.position(3), Position::new(2, 1));
        assert_eq!(index.line_of(8), 4);
    }

    #[test]
    fn clamps_out_of_range_positions() {
        let index = LineIndex::new(&LineTable::from_text("ab\ncde\n"));
        assert_eq!(index.clamp(Position::new(9, 9)), Position::new(2, 4));
        assert_eq!(index.clamp(Position::new(0, 0)), Position::new(1, 1));
        assert_eq!(index.clamp(Position::new(9, 1)), Position::new(2, 4));
        assert_eq!(index.clamp(Position::new(1, 9)), Position::new(1, 3));
    }
}
