use go_syntax::{parse_source, print_document};
use pretty_assertions::assert_eq;

fn assert_round_trip(src: &str) {
    let doc = parse_source(src).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(print_document(&doc), src);
}

#[test]
fn declarations_and_doc_comments() {
    assert_round_trip(
        r#"// Package p is a test.
package p

import (
	"fmt"
	"strings"
)

const limit = 10

type pair struct {
	a int
	b string
}

// sum adds things.
func sum(xs []int) (total int) {
	for _, x := range xs {
		if x > limit {
			continue
		}
		total += x
	}
	return total
}

func (p *pair) String() string {
	return fmt.Sprintf("%d:%s", p.a, strings.ToUpper(p.b))
}

func classify(n int) string {
	switch {
	case n < 0:
		return "neg"
	case n == 0:
		return "zero"
	default:
		return "pos"
	}
}
"#,
    );
}

#[test]
fn statements_literals_and_comments() {
    assert_round_trip(
        r#"package q

var (
	x = 1
	y = 2
)

func run(ch chan int, done <-chan struct{}) {
	items := []string{
		"a",
		"b",
	}
	f := func(s string) int { return len(s) }
	// count things
	n := 0 // trailing
	for i := 0; i < len(items); i++ {
		n += f(items[i])
	}
outer:
	for {
		select {
		case v := <-ch:
			if v > n {
				break outer
			}
		case <-done:
			return
		}
	}
	go func() {
		ch <- n * 2
	}()
	defer close(ch)
}
"#,
    );
}

#[test]
fn binary_expression_spacing() {
    assert_round_trip(
        r#"package r

var defaults = config{name: "x", size: 3}

func calc(a, b int, xs []int) int {
	c := a*b + 1
	d := xs[a+1:]
	e := -a * -b
	return (c + d[0]) * e
}

func choose(v int) string {
	if v > 0 {
		return describe(
			"positive",
			v,
		)
	} else if v < 0 {
		return "negative"
	}
	return ""
}
"#,
    );
}

#[test]
fn normalizes_redundant_layout() {
    let doc = parse_source("package s\nfunc f(x int) int {\n\n\n\tif (x > 1) {\n\t\treturn x\n\t}\n\treturn   0\n}\n")
        .expect("parse");
    assert_eq!(
        print_document(&doc),
        "package s\n\nfunc f(x int) int {\n\n\tif x > 1 {\n\t\treturn x\n\t}\n\treturn 0\n}\n"
    );
}

#[test]
fn inline_block_comments_stay_before_their_operand() {
    assert_round_trip(
        r#"package t

func f(n int) int {
	m := /* base */ n
	return m + /* c */ 2
}
"#,
    );
}
