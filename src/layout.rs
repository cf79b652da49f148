//! Keeps spans, comments and the line table byte-accurate after an extraction.
//!
//! The edited area is laid out first: the replacement at the call site and
//! the new function at the end of the file, with everything else shifted by
//! the call-site delta. A final pass over the whole file then brings every
//! span in line with the printed text.

use std::collections::HashSet;
use std::ops::Range;

use go_syntax::ast::{CommentGroupId, NodeRef, Span, SpanFields, TopLevelDecl};
use go_syntax::render::{LayoutSink, Renderer, Sink, SpanSlot};
use go_syntax::{Document, LineTable};

use crate::error::ExtractError;
use crate::transform::{Applied, Replacement};

/// How the call-site edit changed the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// 1-based line and the 0-based byte columns removed from it.
    pub removed: Vec<(u32, Range<u32>)>,
    /// Size change at the call site.
    pub delta: i64,
    /// Line table of the edited document.
    pub lines: LineTable,
}

fn shifted(offset: u32, from: u32, delta: i64) -> u32 {
    if offset >= from {
        (i64::from(offset) + delta) as u32
    } else {
        offset
    }
}

fn shift(span: &mut Span, from: u32, delta: i64) {
    if span.is_unset() || delta == 0 {
        return;
    }
    span.start = shifted(span.start, from, delta);
    span.end = shifted(span.end, from, delta);
}

/// Lays out the edit recorded in `applied` and installs the new line table.
pub fn relayout(doc: &mut Document, applied: &Applied) -> Result<LineEdit, ExtractError> {
    let old_index = doc.line_index().clone();
    let old_size = doc.size();
    let Span { start: pos, end } = applied.old;

    // call site
    let replacement = {
        let sink = LayoutSink::new(pos);
        let mut r = Renderer::with_parts(&doc.arena, &doc.interner, &old_index, Vec::new(), sink);
        match applied.replacement {
            Replacement::Expr(e) => r.expr(e),
            Replacement::Stmt(s) => r.stmt(s),
        }
        r.finish().0.finish()
    };
    let delta = i64::from(replacement.end) - i64::from(end);

    let begin_at = old_index.position(pos);
    let end_at = old_index.position(end);
    let removed = removed_columns(doc.lines(), begin_at.line, begin_at.column, end_at.line, end_at.column);

    // comments inside the region travel with the moved code
    let arena = &doc.arena;
    let (detached, kept): (Vec<CommentGroupId>, Vec<CommentGroupId>) = arena
        .comment_group_ids(doc.file.comments)
        .iter()
        .partition(|&&g| {
            let s = arena.comment_groups.span(g);
            s.start >= pos && s.start <= end
        });
    let mut detached_nodes: HashSet<NodeRef> = HashSet::new();
    for &g in &detached {
        detached_nodes.insert(NodeRef::CommentGroup(g));
        for &c in arena.comment_ids(arena.comment_groups[g].comments) {
            detached_nodes.insert(NodeRef::Comment(c));
        }
    }

    shift_unmoved(doc, applied, &detached_nodes, end, delta);
    for (slot, span) in replacement.marks {
        doc.apply_span(slot, span);
    }

    let mut lines = doc.lines().clone();
    let prefix = begin_at.column - 1;
    let suffix = lines
        .line_len(end_at.line)
        .map_or(0, |len| len - (end_at.column - 1));
    let mut rewritten = replacement.lines;
    rewritten.push(replacement.tail);
    if let Some(first) = rewritten.first_mut() {
        *first += prefix;
    }
    if let Some(last) = rewritten.last_mut() {
        *last += suffix;
    }
    lines.splice(
        (begin_at.line as usize - 1)..(end_at.line as usize),
        rewritten,
    );
    let expected = (i64::from(old_size) + delta) as u32;
    if lines.total_len() != expected {
        return Err(ExtractError::LayoutInconsistency {
            expected,
            actual: lines.total_len(),
        });
    }

    let trailing = lines
        .lengths()
        .iter()
        .rev()
        .take_while(|&&len| len == 0)
        .count();
    let count = lines.len();
    lines.splice(count - trailing..count, []);

    // the new function, one blank line after the last declaration
    let (function, unplaced) = {
        let mut sink = LayoutSink::new(lines.total_len());
        sink.write("\n");
        let mut r = Renderer::with_parts(
            &doc.arena,
            &doc.interner,
            &old_index,
            detached.clone(),
            sink,
        );
        r.top_level_decl(TopLevelDecl::Func(applied.function));
        let (mut sink, unplaced) = r.finish();
        sink.write("\n");
        (sink.finish(), unplaced)
    };

    // the region starts with its first root
    let move_offset = applied
        .anchor
        .and_then(|anchor| {
            function
                .marks
                .iter()
                .find(|(slot, _)| *slot == SpanSlot::Node(anchor))
        })
        .map_or(0, |(_, span)| i64::from(span.start) - i64::from(pos));
    for &g in &unplaced {
        shift(doc.arena.comment_groups.span_mut(g), 0, move_offset);
        let comments = doc.arena.comment_ids(doc.arena.comment_groups[g].comments).to_vec();
        for c in comments {
            shift(doc.arena.comments.span_mut(c), 0, move_offset);
        }
    }
    for (slot, span) in function.marks {
        doc.apply_span(slot, span);
    }

    lines.extend(function.lines.iter().copied());
    if lines.total_len() != function.end || function.tail != 0 {
        return Err(ExtractError::LayoutInconsistency {
            expected: function.end,
            actual: lines.total_len(),
        });
    }

    let mut comments = kept;
    comments.extend(detached);
    comments.sort_by_key(|&g| doc.arena.comment_groups.span(g).start);
    doc.file.comments = doc.arena.list_comment_group_ids(comments);

    tracing::debug!(
        delta,
        move_offset,
        size = function.end,
        lines = lines.len(),
        "layout recalculated"
    );
    doc.install_lines(lines);
    let lines = settle(doc);
    Ok(LineEdit {
        removed,
        delta,
        lines,
    })
}

/// Lays the whole document out again and installs the result, so every span
/// and the line table describe exactly the text the printer writes. Source
/// the printer does not reproduce byte for byte (aligned columns, odd
/// spacing) changes size here.
fn settle(doc: &mut Document) -> LineTable {
    let layout = {
        let mut r = Renderer::new(doc, LayoutSink::new(0));
        r.source_file(&doc.file);
        r.finish().0.finish()
    };
    if layout.end != doc.size() {
        tracing::debug!(before = doc.size(), after = layout.end, "layout normalized");
    }
    for (slot, span) in layout.marks {
        doc.apply_span(slot, span);
    }
    let lines = LineTable::new(layout.lines);
    doc.install_lines(lines.clone());
    lines
}

/// Column ranges of the selected text, split per line.
fn removed_columns(
    lines: &LineTable,
    first: u32,
    first_col: u32,
    last: u32,
    last_col: u32,
) -> Vec<(u32, Range<u32>)> {
    if first == last {
        return vec![(first, first_col - 1..last_col - 1)];
    }
    let len = |line| lines.line_len(line).unwrap_or(0);
    let mut removed = vec![(first, first_col - 1..len(first))];
    removed.extend((first + 1..last).map(|line| (line, 0..len(line))));
    removed.push((last, 0..last_col - 1));
    removed
}

/// Moves every pre-edit span at or after `from` by `delta`, except for the
/// nodes that now belong to the new function.
fn shift_unmoved(
    doc: &mut Document,
    applied: &Applied,
    detached: &HashSet<NodeRef>,
    from: u32,
    delta: i64,
) {
    let wm = applied.watermark;
    let moved = |node: NodeRef| applied.moved.contains(node) || detached.contains(&node);
    let arena = &mut doc.arena;

    macro_rules! shift_family {
        ($($family:ident => $variant:ident),* $(,)?) => {
            $(
                for (id, node, span) in arena.$family.iter_mut().take(wm.$family) {
                    if moved(NodeRef::$variant(id)) {
                        continue;
                    }
                    shift(span, from, delta);
                    node.for_each_span(&mut |s| shift(s, from, delta));
                }
            )*
        };
    }
    shift_family! {
        decls => Decl,
        specs => Spec,
        funcs => Func,
        signatures => Signature,
        fields => Field,
        blocks => Block,
        stmts => Stmt,
        simple_stmts => SimpleStmt,
        exprs => Expr,
        types => Type,
        switch_clauses => SwitchClause,
        comm_clauses => CommClause,
        comments => Comment,
        comment_groups => CommentGroup,
    }

    for (i, name) in arena
        .extras
        .ident_names
        .iter_mut()
        .enumerate()
        .take(wm.ident_names)
    {
        if !applied.moved.contains_ident(i as u32) {
            shift(&mut name.pos, from, delta);
        }
    }
    doc.file.for_each_span(&mut |s| shift(s, from, delta));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::resolve_selection;
    use crate::transform::{apply, ExtractionPlan};
    use go_syntax::{parse_source, print_document};
    use pretty_assertions::assert_eq;

    fn extract(src: &str, selection: &str, name: &str) -> (Document, LineEdit) {
        let mut doc = parse_source(src).expect("parse");
        let region = resolve_selection(&doc, selection.parse().expect("selection")).expect("region");
        let plan = ExtractionPlan::build(&doc, region, name).expect("plan");
        let applied = apply(&mut doc, &plan);
        let edit = relayout(&mut doc, &applied).expect("layout");
        (doc, edit)
    }

    #[test]
    fn one_line_expression() {
        let src = "package p\n\nfunc f() {\n\tx := 3\n\tprintln(x)\n}\n";
        let (doc, edit) = extract(src, "4:7-4:8", "Seven");
        assert_eq!(edit.removed, [(4, 6..7)]);
        assert_eq!(edit.delta, 6);
        let printed = print_document(&doc);
        assert_eq!(
            printed,
            "package p\n\nfunc f() {\n\tx := Seven()\n\tprintln(x)\n}\n\nfunc Seven() int {\n\treturn 3\n}\n"
        );
        assert_eq!(printed.len() as u32, doc.size());
        assert_eq!(doc.lines().lengths(), LineTable::from_text(&printed).lengths());
    }

    #[test]
    fn multi_line_run_keeps_comments() {
        let src = "package p

func f(n int) {
	// setup
	a := n + 1
	// double it
	b := a * 2
	println(b) // done
}
";
        let (doc, edit) = extract(src, "5:2-7:12", "prepare");
        assert_eq!(edit.removed, [(5, 1..11), (6, 0..13), (7, 0..11)]);
        let printed = print_document(&doc);
        assert_eq!(
            printed,
            "package p

func f(n int) {
	// setup
	b := prepare(n)
	println(b) // done
}

func prepare(n int) int {
	a := n + 1
	// double it
	b := a * 2
	return b
}
"
        );
        assert_eq!(printed.len() as u32, doc.size());
        assert_eq!(doc.lines().lengths(), LineTable::from_text(&printed).lengths());
    }

    #[test]
    fn spans_after_the_edit_point_at_their_text() {
        let src = "package p\n\nfunc f(a, b int) int {\n\tc := a*b + 1\n\treturn c\n}\n\nvar z = 1\n";
        let (doc, _) = extract(src, "4:7-4:10", "mul");
        let printed = print_document(&doc);
        for (_, expr, span) in doc.arena.exprs.iter() {
            if span.is_unset() {
                continue;
            }
            if let go_syntax::ast::Expr::Ident(sym) = expr {
                let text = &printed[span.start as usize..span.end as usize];
                assert_eq!(text, doc.text(*sym));
            }
        }
    }
}
