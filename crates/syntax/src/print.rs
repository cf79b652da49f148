//! Text output for documents and detached tree fragments.

use crate::ast::{AstArena, ExprId, Interner, StmtId, TypeId};
use crate::document::Document;
use crate::render::{self, Renderer, TextSink};

/// Renders the whole document, comments included.
///
/// For a freshly parsed gofmt-formatted file this reproduces the source text
/// byte for byte, except where gofmt would align columns.
pub fn print_document(doc: &Document) -> String {
    let mut r = Renderer::new(doc, TextSink::new());
    r.source_file(&doc.file);
    let (sink, rest) = r.finish();
    debug_assert!(rest.is_empty(), "unplaced comments after a full render");
    sink.into_string()
}

pub fn print_expr(arena: &AstArena, interner: &Interner, id: ExprId) -> String {
    render::fragment(arena, interner, |r| r.expr(id))
}

pub fn print_type(arena: &AstArena, interner: &Interner, id: TypeId) -> String {
    render::fragment(arena, interner, |r| r.typ(id))
}

pub fn print_stmt(arena: &AstArena, interner: &Interner, id: StmtId) -> String {
    render::fragment(arena, interner, |r| r.stmt(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Type};
    use crate::parse_source;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragments_print_without_positions() {
        let doc = parse_source("package p\n\nvar m = map[string][]int{\"a\": {1, 2}}\n").expect("parse");
        let (lit, _, _) = doc
            .arena
            .exprs
            .iter()
            .find(|(_, e, _)| matches!(e, Expr::CompositeLit { typ: Some(_), .. }))
            .expect("literal");
        assert_eq!(
            print_expr(&doc.arena, &doc.interner, lit),
            "map[string][]int{\"a\": {1, 2}}"
        );

        let (map, _, _) = doc
            .arena
            .types
            .iter()
            .find(|(_, t, _)| matches!(t, Type::Map { .. }))
            .expect("map type");
        assert_eq!(print_type(&doc.arena, &doc.interner, map), "map[string][]int");
    }

    #[test]
    fn fresh_nodes_get_minimal_spacing() {
        let mut doc = parse_source("package p\n").expect("parse");
        let x = doc.interner.intern("x");
        let one = doc.interner.intern("1");
        let arena = &mut doc.arena;
        let lhs = arena.exprs.alloc_fresh(Expr::Ident(x));
        let rhs = arena.exprs.alloc_fresh(Expr::BasicLit(crate::ast::BasicLit {
            kind: crate::ast::BasicLitKind::Int,
            value: one,
        }));
        let sum = arena.exprs.alloc_fresh(Expr::Binary {
            left: lhs,
            op: crate::ast::BinaryOp::Add,
            right: rhs,
        });
        assert_eq!(print_expr(&doc.arena, &doc.interner, sum), "x + 1");
    }
}
