use goextract::{
    extract_function, extract_source, parse_source, print_document, Document, Error,
    ExtractError, Selection, SelectionFailure, Warning,
};
use go_syntax::ast::{AstArena, Expr, ExprId, FieldId, IdentName, SimpleStmt, SimpleStmtId};
use go_syntax::walk::{Visitor, Walk};
use go_syntax::LineTable;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn extracted(src: &str, selection: &str, name: &str) -> String {
    let selection: Selection = selection.parse().expect("selection");
    match extract_source(src, selection, name) {
        Ok((text, _)) => text,
        Err(err) => panic!("extraction failed: {err}"),
    }
}

fn extract_err(src: &str, selection: &str, name: &str) -> ExtractError {
    let mut doc = parse_source(src).expect("parse");
    let err = extract_function(&mut doc, selection.parse().expect("selection"), name)
        .expect_err("extraction should fail");
    // a rejected extraction leaves the document alone
    assert_eq!(print_document(&doc), src);
    err
}

#[test]
fn literal_becomes_a_function() {
    let src = "package main

func main() {
	x := 3
	println(x)
}
";
    assert_eq!(
        extracted(src, "4:7-4:8", "Seven"),
        "package main

func main() {
	x := Seven()
	println(x)
}

func Seven() int {
	return 3
}
"
    );
}

#[test]
fn statement_run_becomes_one_call() {
    let src = "package main

func main() {
	x := 1
	println(x)
	println(x + 1)
}
";
    assert_eq!(
        extracted(src, "5:2-6:16", "printBoth"),
        "package main

func main() {
	x := 1
	printBoth(x)
}

func printBoth(x int) {
	println(x)
	println(x + 1)
}
"
    );
}

#[test]
fn later_uses_become_results() {
    let src = "package main

func compute() int { return 42 }

func main() {
	a := compute()
	println(a)
}
";
    assert_eq!(
        extracted(src, "6:2-6:16", "NewFunc"),
        "package main

func compute() int { return 42 }

func main() {
	a := NewFunc()
	println(a)
}

func NewFunc() int {
	a := compute()
	return a
}
"
    );
}

#[test]
fn selection_whitespace_is_ignored() {
    let src = "package main

func main() {
	x := 1
	println(x)
	println(x + 1)
}
";
    // from the start of line 5 to the start of line 7
    assert_eq!(
        extracted(src, "5:1-7:1", "printBoth"),
        extracted(src, "5:2-6:16", "printBoth")
    );
}

#[test]
fn unresolved_types_are_reported() {
    let src = "package main

import \"strings\"

func main() {
	s := strings.ToUpper(\"a\")
	println(s)
}
";
    let (text, extraction) =
        extract_source(src, "7:2-7:12".parse().expect("selection"), "show").expect("extract");
    assert!(text.contains("func show(s Unresolved_s) {"), "{text}");
    assert_eq!(
        extraction.warnings,
        [Warning::UnresolvedType {
            subject: "parameter `s`".into(),
            placeholder: "Unresolved_s".into(),
        }]
    );
}

#[test]
fn mismatched_depth_is_rejected() {
    let src = "package main

func main() {
	if true {
		println(1)
	}
	println(2)
}
";
    let err = extract_err(src, "5:3-7:12", "both");
    assert!(
        matches!(
            err,
            ExtractError::InvalidSelection {
                reason: SelectionFailure::NoNodeAtEnd,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn unsupported_contexts_and_names_are_rejected() {
    let src = "package main

type P struct {
	X int
}

func main() {
	p := P{}
	println(p.X)
}
";
    assert_eq!(
        extract_err(src, "9:10-9:11", "base"),
        ExtractError::UnsupportedExtractionContext {
            parent: "selector expression"
        }
    );
    assert_eq!(
        extract_err(src, "9:10-9:13", "main"),
        ExtractError::NameCollision("main".into())
    );
    assert_eq!(
        extract_err(src, "9:10-9:13", "range"),
        ExtractError::InvalidFunctionName("range".into())
    );
}

#[test]
fn parse_errors_surface_as_parse_failures() {
    let result = extract_source("package main\n\nfunc {\n", "3:1-3:5".parse().expect("selection"), "f");
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn size_grows_by_the_delta_and_the_new_function() {
    let src = "package main

func area(w, h int) int {
	// scale first
	s := w * 2
	return s * h
}

var unit = 1
";
    let mut doc = parse_source(src).expect("parse");
    let old_size = doc.size();
    let extraction =
        extract_function(&mut doc, "5:7-5:12".parse().expect("selection"), "double").expect("extract");
    let printed = print_document(&doc);

    assert_eq!(printed.len() as u32, doc.size());
    assert_eq!(extraction.edit.lines.total_len(), doc.size());
    let function = &printed[printed.rfind("func double").expect("function")..];
    assert_eq!(function, "func double(w int) int {\n\treturn w * 2\n}\n");
    // one blank line separates the new function
    assert_eq!(
        i64::from(doc.size()),
        i64::from(old_size) + extraction.edit.delta + 1 + function.len() as i64
    );
}

/// Identifier uses and declared names reachable from the file.
#[derive(Default)]
struct Names {
    uses: Vec<ExprId>,
    declared: Vec<IdentName>,
}

impl<'ast> Visitor<'ast> for Names {
    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        if let Expr::Ident(_) = a.exprs[id] {
            self.uses.push(id);
        }
        a.exprs[id].walk(a, self);
    }

    fn visit_field(&mut self, a: &'ast AstArena, id: FieldId) {
        self.declared.extend_from_slice(a.ident_names(a.fields[id].names));
        a.fields[id].walk(a, self);
    }

    fn visit_simple_stmt(&mut self, a: &'ast AstArena, id: SimpleStmtId) {
        if let SimpleStmt::ShortVarDecl { names, .. } = a.simple_stmts[id] {
            self.declared.extend_from_slice(a.ident_names(names));
        }
        a.simple_stmts[id].walk(a, self);
    }
}

/// Every identifier, comment and the line table agree with the printed text.
fn assert_positions_match(doc: &Document) -> String {
    let printed = print_document(doc);
    assert_eq!(printed.len() as u32, doc.size());
    assert_eq!(doc.lines().lengths(), LineTable::from_text(&printed).lengths());

    let at = |start: u32, end: u32| &printed[start as usize..end as usize];
    assert_eq!(at(doc.file.package.start, doc.file.package.end), "package main");

    let mut names = Names::default();
    names.visit_source_file(&doc.arena, &doc.file);
    assert!(!names.uses.is_empty());
    for id in names.uses {
        let span = doc.arena.exprs.span(id);
        let Expr::Ident(sym) = doc.arena.exprs[id] else {
            unreachable!("only identifiers are collected");
        };
        assert_eq!(at(span.start, span.end), doc.text(sym));
    }
    for name in names.declared {
        assert_eq!(at(name.pos.start, name.pos.end), doc.text(name.sym));
    }
    for &g in doc.arena.comment_group_ids(doc.file.comments) {
        for &c in doc.arena.comment_ids(doc.arena.comment_groups[g].comments) {
            let span = doc.arena.comments.span(c);
            assert_eq!(at(span.start, span.end), doc.text(doc.arena.comments[c].text));
        }
    }
    printed
}

#[test]
fn aligned_source_keeps_positions_in_step_with_the_text() {
    let src = "package main

type T struct {
	A    int    // first
	Bcde string // second
}

func f() {
	x := 3
	println(x)
}

func g() {
	a := 1  // one
	bb := 2 // two
	println(a, bb)
}

var z=1
";
    let mut doc = parse_source(src).expect("parse");
    extract_function(&mut doc, "9:7-9:8".parse().expect("selection"), "three").expect("extract");
    let printed = assert_positions_match(&doc);
    assert!(printed.contains("\tx := three()\n"), "{printed}");
    assert!(printed.contains("\tbb := 2 // two\n"), "{printed}");
    assert_eq!(print_document(&parse_source(&printed).expect("reparse")), printed);

    // the edited document is a valid starting point for the next extraction
    let two = printed.find("bb := 2").expect("bb") as u32 + 6;
    let selection = Selection::new(doc.position_of(two), doc.position_of(two + 1));
    extract_function(&mut doc, selection, "two").expect("second extract");
    let printed = assert_positions_match(&doc);
    assert!(printed.contains("\tbb := two() // two\n"), "{printed}");
    assert!(printed.ends_with("func two() int {\n\treturn 2\n}\n"), "{printed}");
}

proptest! {
    #[test]
    fn shrinking_is_idempotent(
        l1 in 1u32..12, c1 in 1u32..30, l2 in 1u32..12, c2 in 1u32..30,
    ) {
        let src = "package main\n\nfunc main() {\n\tx := 1\n\n\tprintln(x)   \n}\n";
        let selection = Selection::new(
            goextract::Position::new(l1, c1),
            goextract::Position::new(l2, c2),
        );
        let once = selection.shrink_to_non_whitespace(src);
        prop_assert_eq!(once.shrink_to_non_whitespace(src), once);
    }
}
