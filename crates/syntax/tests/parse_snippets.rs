use go_syntax::ast::{Expr, ForKind, GenDeclKind, Stmt, StmtId, TopLevelDecl};
use go_syntax::{parse_source, Document};
use pretty_assertions::assert_eq;

fn parse(src: &str) -> Document {
    match parse_source(src) {
        Ok(doc) => doc,
        Err(f) => panic!("expected parse ok, got diagnostics: {:#?}", f.diags),
    }
}

fn last_body(doc: &Document) -> Vec<StmtId> {
    let Some(&TopLevelDecl::Func(f)) = doc.arena.top_decls(doc.file.decls).last() else {
        panic!("no function");
    };
    let body = doc.arena.funcs[f].body.expect("body");
    doc.arena.stmts_list(doc.arena.blocks[body].stmts).to_vec()
}

#[test]
fn declaration_groups() {
    let doc = parse(
        r#"package main

import (
	"fmt"
	_ "net/http"
)

const limit = 3

var (
	x    = 1
	y, z int
)

type (
	T struct{ F int }
	S interface {
		fmt.Stringer
		Size() int
	}
)

func (t *T) String() string { return fmt.Sprint(t.F) }
"#,
    );
    let kinds: Vec<_> = doc
        .arena
        .top_decls(doc.file.decls)
        .iter()
        .filter_map(|&d| match d {
            TopLevelDecl::Decl(id) => Some((doc.arena.decls[id].kind, doc.arena.decls[id].grouped)),
            TopLevelDecl::Func(_) => None,
        })
        .collect();
    assert_eq!(
        kinds,
        [
            (GenDeclKind::Import, true),
            (GenDeclKind::Const, false),
            (GenDeclKind::Var, true),
            (GenDeclKind::Type, true),
        ]
    );
    let Some(&TopLevelDecl::Func(method)) = doc.arena.top_decls(doc.file.decls).last() else {
        panic!("expected the method last");
    };
    assert!(doc.arena.funcs[method].recv.is_some());
}

#[test]
fn every_statement_form() {
    let doc = parse(
        r#"package p

func f(ch chan int, v any) {
	var n int
	const k = 2
outer:
	for {
		break outer
	}
	for n < k {
		n++
	}
	for i := 0; i < k; i++ {
		continue
	}
	for range ch {
	}
	go func() {}()
	defer close(ch)
	ch <- n
	{
		n = 1
	}
	switch n {
	case 1:
		fallthrough
	default:
	}
	switch t := v.(type) {
	case int:
		_ = t
	}
	select {
	case x, ok := <-ch:
		_, _ = x, ok
	default:
	}
	if n > 0 {
	} else if n < 0 {
	} else {
	}
	goto end
end:
	return
}
"#,
    );
    let stmts = last_body(&doc);
    let kinds: Vec<_> = stmts.iter().map(|&s| doc.arena.stmts[s].describe()).collect();
    assert_eq!(
        kinds,
        [
            "declaration statement",
            "declaration statement",
            "labeled statement",
            "for statement",
            "for statement",
            "for statement",
            "go statement",
            "defer statement",
            "simple statement",
            "block statement",
            "switch statement",
            "type switch statement",
            "select statement",
            "if statement",
            "branch statement",
            "labeled statement",
        ]
    );

    let for_kind = |i: usize| match doc.arena.stmts[stmts[i]] {
        Stmt::For { kind, .. } => kind,
        other => panic!("expected a for statement, got {other:?}"),
    };
    assert!(matches!(for_kind(3), ForKind::Cond(_)));
    assert!(matches!(for_kind(4), ForKind::Clause { init: Some(_), cond: Some(_), post: Some(_) }));
    assert!(matches!(for_kind(5), ForKind::Range { key: None, value: None, .. }));
}

#[test]
fn composite_literals_in_control_headers() {
    let doc = parse(
        r#"package p

type T struct{}

func f(p T) {
	if p == (T{}) {
	}
	for _, v := range []int{1, 2} {
		_ = v
	}
}
"#,
    );
    let stmts = last_body(&doc);
    let Stmt::If { cond, .. } = doc.arena.stmts[stmts[0]] else {
        panic!("expected if");
    };
    let Expr::Binary { right, .. } = doc.arena.exprs[cond] else {
        panic!("expected comparison");
    };
    let Expr::Paren(lit) = doc.arena.exprs[right] else {
        panic!("expected parenthesized literal");
    };
    assert!(matches!(doc.arena.exprs[lit], Expr::CompositeLit { .. }));

    let Stmt::For { kind: ForKind::Range { expr, .. }, .. } = doc.arena.stmts[stmts[1]] else {
        panic!("expected range");
    };
    assert!(matches!(doc.arena.exprs[expr], Expr::CompositeLit { .. }));

    // a bare `T{}` in a header ends the condition at `T`, like Go
    assert!(parse_source("package p\n\nfunc f(p T) {\n\tif p == T{} {\n\t}\n}\n").is_err());
}

#[test]
fn comments_group_by_line() {
    let src = "package p

// one
// two

// three
func f() {
	x := 1 // four
	// five
	_ = x
}
";
    let doc = parse(src);
    let groups: Vec<Vec<&str>> = doc
        .arena
        .comment_group_ids(doc.file.comments)
        .iter()
        .map(|&g| {
            doc.arena
                .comment_ids(doc.arena.comment_groups[g].comments)
                .iter()
                .map(|&c| doc.text(doc.arena.comments[c].text))
                .collect()
        })
        .collect();
    assert_eq!(
        groups,
        [vec!["// one", "// two"], vec!["// three"], vec!["// four"], vec!["// five"]]
    );
}
