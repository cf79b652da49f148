//! Which local variables flow into and out of an extracted region.

use std::collections::{BTreeMap, HashSet};

use go_syntax::ast::{AstArena, ExprId, NodeRef, Symbol};
use go_syntax::walk::{self, Visitor, Walk};
use go_syntax::Document;

use crate::scope::{BindingId, BindingKind, ScopeTable};
use crate::selection::Region;

/// Parameters and outputs of an extraction, keyed and ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureAnalysis {
    /// Free local variables the region reads.
    pub params: BTreeMap<String, BindingId>,
    /// Variables the region declares that later statements still use.
    pub outputs: BTreeMap<String, BindingId>,
}

impl CaptureAnalysis {
    pub fn analyze(doc: &Document, scopes: &ScopeTable, region: &Region) -> Self {
        let arena = &doc.arena;
        let span = region.span(arena);

        let declared_inside: HashSet<Symbol> = scopes
            .bindings()
            .filter(|(_, b)| {
                !b.pos.is_unset() && b.pos.start >= span.start && b.pos.end <= span.end
            })
            .map(|(_, b)| b.name)
            .collect();

        let mut params = BTreeMap::new();
        for b in references(arena, scopes, region.roots()) {
            let binding = scopes.binding(b);
            if binding.kind != BindingKind::LocalVar || declared_inside.contains(&binding.name) {
                continue;
            }
            params
                .entry(doc.text(binding.name).to_owned())
                .or_insert(b);
        }

        let mut outputs = BTreeMap::new();
        if let Region::Statements { stmts, owner } = region {
            let list = arena.stmts_list(owner.stmts(arena));
            let after = stmts
                .last()
                .and_then(|last| list.iter().position(|s| s == last))
                .map_or(&[][..], |i| &list[i + 1..]);
            let produced: HashSet<BindingId> = stmts
                .iter()
                .flat_map(|&s| scopes.declared_by(s).iter().copied())
                .collect();
            let later = after.iter().map(|&s| NodeRef::Stmt(s));
            for b in references(arena, scopes, later) {
                if produced.contains(&b) && scopes.binding(b).kind == BindingKind::LocalVar {
                    outputs
                        .entry(doc.text(scopes.binding(b).name).to_owned())
                        .or_insert(b);
                }
            }
        }

        tracing::debug!(
            params = ?params.keys().collect::<Vec<_>>(),
            outputs = ?outputs.keys().collect::<Vec<_>>(),
            "captures analyzed"
        );
        Self { params, outputs }
    }
}

/// Bound identifier references under `roots`, in walk order.
fn references(
    arena: &AstArena,
    scopes: &ScopeTable,
    roots: impl IntoIterator<Item = NodeRef>,
) -> Vec<BindingId> {
    let mut refs = References {
        scopes,
        hits: Vec::new(),
    };
    for root in roots {
        walk::visit_node(arena, &mut refs, root);
    }
    refs.hits
}

struct References<'s> {
    scopes: &'s ScopeTable,
    hits: Vec<BindingId>,
}

impl<'ast> Visitor<'ast> for References<'_> {
    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        if let Some(b) = self.scopes.binding_of(id) {
            self.hits.push(b);
        }
        a.exprs[id].walk(a, self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::resolve_selection;
    use go_syntax::parse_source;
    use pretty_assertions::assert_eq;

    fn analyze(src: &str, selection: &str) -> (Vec<String>, Vec<String>) {
        let doc = parse_source(src).expect("parse");
        let region = resolve_selection(&doc, selection.parse().expect("selection")).expect("region");
        let scopes = ScopeTable::resolve(&doc);
        let c = CaptureAnalysis::analyze(&doc, &scopes, &region);
        (c.params.into_keys().collect(), c.outputs.into_keys().collect())
    }

    const SRC: &str = "package p

var total = 0

func f(a, b int) int {
	sum := a + b
	diff := a - b
	total += sum
	sq := sum * sum
	for i := 0; i < diff; i++ {
		sq += i
	}
	return sq + diff
}
";

    #[test]
    fn globals_and_inner_declarations_are_not_parameters() {
        // `total += sum` through `for`
        let (params, outputs) = analyze(SRC, "8:2-12:3");
        assert_eq!(params, ["diff", "sum"]);
        assert_eq!(outputs, ["sq"]);
    }

    #[test]
    fn only_later_uses_make_outputs() {
        // `sum := ...` and `diff := ...`; `sum` is used later, `diff` too
        let (params, outputs) = analyze(SRC, "6:2-7:15");
        assert_eq!(params, ["a", "b"]);
        assert_eq!(outputs, ["diff", "sum"]);

        // the whole body up to `return`: nothing follows but the return
        let (_, outputs) = analyze(SRC, "6:2-12:3");
        assert_eq!(outputs, ["diff", "sq"]);
    }

    #[test]
    fn shadowed_names_are_not_outputs() {
        let src = "package p

func g(n int) {
	a := n * 2
	b := a + 1
	if b > 0 {
		a := b
		println(a)
	}
	println(b)
}
";
        // the `a` used after the run is a new variable in the `if` block
        let (params, outputs) = analyze(src, "4:2-5:12");
        assert_eq!(params, ["n"]);
        assert_eq!(outputs, ["b"]);
    }

    #[test]
    fn expressions_have_no_outputs() {
        let (params, outputs) = analyze(SRC, "13:9-13:18");
        assert_eq!(params, ["diff", "sq"]);
        assert!(outputs.is_empty());
    }
}
