//! Tree surgery: the call site, the new function and its attachment to the file.
//!
//! [`ExtractionPlan::build`] does every check and all analysis against an
//! untouched document; only [`apply`] mutates it.

use std::collections::HashSet;
use std::ops::Range;

use go_syntax::ast::{
    AstArena, Block, CaseKind, Expr, ExprId, Field, ForKind, FuncDecl, FuncDeclId, IdentName,
    KeyedElement, ListRef, NodeRef, Signature, SimpleStmt, Span, Spec, Stmt, StmtId, TopLevelDecl,
    Watermark,
};
use go_syntax::walk::{self, Visitor};
use go_syntax::Document;

use crate::capture::CaptureAnalysis;
use crate::deduce::{GoType, TypeDeducer};
use crate::error::{ExtractError, Warning};
use crate::scope::{BindingId, ScopeTable};
use crate::selection::Region;

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// A parameter or output of the new function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub ty: GoType,
}

/// Everything needed to perform one extraction, computed without touching
/// the document.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub name: String,
    pub region: Region,
    /// Sorted by name.
    pub params: Vec<Capture>,
    /// Sorted by name; empty for expressions.
    pub outputs: Vec<Capture>,
    pub results: Vec<GoType>,
    pub warnings: Vec<Warning>,
    slot: Option<Slot>,
}

impl ExtractionPlan {
    pub fn build(doc: &Document, region: Region, name: &str) -> Result<Self, ExtractError> {
        validate_name(name)?;
        let scopes = ScopeTable::resolve(doc);
        if let Some(sym) = doc.interner.get(name) {
            if scopes.package_binding(sym).is_some() {
                return Err(ExtractError::NameCollision(name.to_owned()));
            }
        }

        let arena = &doc.arena;
        let slot = match &region {
            Region::Expression { expr, parent } => Some(Slot::locate(arena, *parent, *expr)?),
            Region::Statements { .. } => None,
        };

        let captures = CaptureAnalysis::analyze(doc, &scopes, &region);
        let mut deducer = TypeDeducer::new(doc, &scopes);
        let mut warnings = Vec::new();
        let mut typed = |kind: &str, (name, binding): (String, BindingId)| {
            let ty = deducer.binding_type(binding);
            note_unresolved(&mut warnings, &ty, || format!("{kind} `{name}`"));
            Capture { name, ty }
        };
        let params: Vec<Capture> = captures
            .params
            .into_iter()
            .map(|c| typed("parameter", c))
            .collect();
        let outputs: Vec<Capture> = captures
            .outputs
            .into_iter()
            .map(|c| typed("result", c))
            .collect();

        let results = match &region {
            Region::Expression { parent, .. } if !is_value_context(arena, *parent) => Vec::new(),
            Region::Expression { expr, .. } => {
                let results = deducer.deduce(*expr).into_vec();
                for ty in &results {
                    note_unresolved(&mut warnings, ty, || "extracted expression".to_owned());
                }
                results
            }
            Region::Statements { .. } => outputs.iter().map(|c| c.ty.clone()).collect(),
        };

        Ok(Self {
            name: name.to_owned(),
            region,
            params,
            outputs,
            results,
            warnings,
            slot,
        })
    }
}

fn note_unresolved(warnings: &mut Vec<Warning>, ty: &GoType, subject: impl FnOnce() -> String) {
    if ty.is_unresolved() {
        warnings.push(Warning::UnresolvedType {
            subject: subject(),
            placeholder: ty.to_string(),
        });
    }
}

fn validate_name(name: &str) -> Result<(), ExtractError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && name != "_"
        && !GO_KEYWORDS.contains(&name);
    if valid {
        Ok(())
    } else {
        Err(ExtractError::InvalidFunctionName(name.to_owned()))
    }
}

/// Whether the value of an expression under `parent` is used. The operand
/// of an expression statement, `go` or `defer` is evaluated for effect.
fn is_value_context(arena: &AstArena, parent: NodeRef) -> bool {
    match parent {
        NodeRef::SimpleStmt(id) => !matches!(arena.simple_stmts[id], SimpleStmt::Expr(_)),
        NodeRef::Stmt(id) => !matches!(arena.stmts[id], Stmt::Go(_) | Stmt::Defer(_)),
        _ => true,
    }
}

/// Where an extracted expression sits in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Position in an expression list.
    List(ListRef<ExprId>, usize),
    /// Value of a composite literal element.
    Element(ListRef<KeyedElement>, usize),
    /// A single-expression field of the parent node.
    Field(NodeRef),
}

impl Slot {
    pub fn locate(arena: &AstArena, parent: NodeRef, target: ExprId) -> Result<Self, ExtractError> {
        let in_list = |list: ListRef<ExprId>| {
            arena
                .exprs_list(list)
                .iter()
                .position(|&e| e == target)
                .map(|i| Self::List(list, i))
        };
        let field = |ids: &[Option<ExprId>]| {
            ids.contains(&Some(target))
                .then_some(Self::Field(parent))
        };

        let slot = match parent {
            NodeRef::SimpleStmt(id) => match arena.simple_stmts[id] {
                SimpleStmt::Assign { lhs, rhs, .. } => in_list(lhs).or_else(|| in_list(rhs)),
                SimpleStmt::ShortVarDecl { values, .. } => in_list(values),
                SimpleStmt::Expr(e) => field(&[Some(e)]),
                SimpleStmt::Send { chan, value } => field(&[Some(chan), Some(value)]),
                SimpleStmt::IncDec { expr, .. } => field(&[Some(expr)]),
            },
            NodeRef::Stmt(id) => match arena.stmts[id] {
                Stmt::Return(results) => in_list(results),
                Stmt::Go(e) | Stmt::Defer(e) => field(&[Some(e)]),
                Stmt::If { cond, .. } => field(&[Some(cond)]),
                Stmt::Switch { tag, .. } => field(&[tag]),
                Stmt::For { kind, .. } => match kind {
                    ForKind::Cond(cond) => field(&[Some(cond)]),
                    ForKind::Clause { cond, .. } => field(&[cond]),
                    ForKind::Range {
                        key, value, expr, ..
                    } => field(&[key, value, Some(expr)]),
                    ForKind::Infinite => None,
                },
                _ => None,
            },
            NodeRef::SwitchClause(id) => match arena.switch_clauses[id].kind {
                CaseKind::Exprs(list) => in_list(list),
                CaseKind::Default | CaseKind::Types(_) => None,
            },
            NodeRef::Spec(id) => match arena.specs[id] {
                Spec::Value { values, .. } => in_list(values),
                _ => None,
            },
            NodeRef::Expr(id) => match arena.exprs[id] {
                Expr::Call { args, .. } => in_list(args),
                Expr::Binary { left, right, .. } => field(&[Some(left), Some(right)]),
                Expr::Unary { expr, .. } | Expr::Paren(expr) => field(&[Some(expr)]),
                Expr::Index { index, .. } => field(&[Some(index)]),
                Expr::CompositeLit { elems, .. } => arena
                    .keyed_elems_list(elems)
                    .iter()
                    .position(|el| el.value == target)
                    .map(|i| Self::Element(elems, i)),
                _ => None,
            },
            _ => None,
        };
        slot.ok_or(ExtractError::UnsupportedExtractionContext {
            parent: arena.describe(parent),
        })
    }

    /// Puts `with` where `target` was.
    pub fn fill(self, arena: &mut AstArena, target: ExprId, with: ExprId) {
        match self {
            Self::List(list, i) => arena.exprs_list_mut(list)[i] = with,
            Self::Element(elems, i) => arena.keyed_elems_list_mut(elems)[i].value = with,
            Self::Field(parent) => {
                let swap = |e: &mut ExprId| {
                    if *e == target {
                        *e = with;
                    }
                };
                match parent {
                    NodeRef::SimpleStmt(id) => match &mut arena.simple_stmts[id] {
                        SimpleStmt::Expr(e) | SimpleStmt::IncDec { expr: e, .. } => swap(e),
                        SimpleStmt::Send { chan, value } => {
                            swap(chan);
                            swap(value);
                        }
                        SimpleStmt::Assign { .. } | SimpleStmt::ShortVarDecl { .. } => {}
                    },
                    NodeRef::Stmt(id) => match &mut arena.stmts[id] {
                        Stmt::Go(e) | Stmt::Defer(e) | Stmt::If { cond: e, .. } => swap(e),
                        Stmt::Switch { tag: Some(e), .. } => swap(e),
                        Stmt::For { kind, .. } => match kind {
                            ForKind::Cond(e) | ForKind::Clause { cond: Some(e), .. } => swap(e),
                            ForKind::Range {
                                key, value, expr, ..
                            } => {
                                key.iter_mut().chain(value.iter_mut()).for_each(|e| swap(e));
                                swap(expr);
                            }
                            _ => {}
                        },
                        _ => {}
                    },
                    NodeRef::Expr(id) => match &mut arena.exprs[id] {
                        Expr::Binary { left, right, .. } => {
                            swap(left);
                            swap(right);
                        }
                        Expr::Unary { expr: e, .. } | Expr::Paren(e) | Expr::Index { index: e, .. } => {
                            swap(e)
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }
}

/// What [`apply`] put into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Expr(ExprId),
    Stmt(StmtId),
}

impl Replacement {
    pub fn node(&self) -> NodeRef {
        match *self {
            Self::Expr(id) => NodeRef::Expr(id),
            Self::Stmt(id) => NodeRef::Stmt(id),
        }
    }
}

/// Result of the tree surgery, input to the layout pass.
#[derive(Debug)]
pub struct Applied {
    pub replacement: Replacement,
    pub function: FuncDeclId,
    /// Source range the replacement took over.
    pub old: Span,
    /// Arena sizes before the edit.
    pub watermark: Watermark,
    /// Nodes that now live in the new function.
    pub moved: MovedSet,
    /// First moved node; its new position gives the move offset.
    pub anchor: Option<NodeRef>,
}

/// Nodes and identifier list entries that moved into the new function.
#[derive(Debug, Default)]
pub struct MovedSet {
    pub nodes: HashSet<NodeRef>,
    idents: Vec<Range<u32>>,
}

impl MovedSet {
    fn collect(arena: &AstArena, roots: &[NodeRef]) -> Self {
        let mut moved = Self::default();
        let mut c = Collector {
            moved: &mut moved,
        };
        for &root in roots {
            walk::visit_node(arena, &mut c, root);
        }
        moved
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes.contains(&node)
    }

    /// Whether entry `index` of the identifier buffer belongs to a moved node.
    pub fn contains_ident(&self, index: u32) -> bool {
        self.idents.iter().any(|r| r.contains(&index))
    }

    fn add_idents(&mut self, names: ListRef<IdentName>) {
        if !names.is_empty() {
            self.idents.push(names.start()..names.end());
        }
    }
}

struct Collector<'m> {
    moved: &'m mut MovedSet,
}

impl Collector<'_> {
    fn enter(&mut self, a: &AstArena, node: NodeRef) -> bool {
        let names = match node {
            NodeRef::Spec(id) => match a.specs[id] {
                Spec::Value { names, .. } => Some(names),
                _ => None,
            },
            NodeRef::SimpleStmt(id) => match a.simple_stmts[id] {
                SimpleStmt::ShortVarDecl { names, .. } => Some(names),
                _ => None,
            },
            NodeRef::Field(id) => Some(a.fields[id].names),
            _ => None,
        };
        if let Some(names) = names {
            self.moved.add_idents(names);
        }
        self.moved.nodes.insert(node)
    }

    fn leave(&mut self, _: NodeRef) {}
}

impl<'ast> Visitor<'ast> for Collector<'_> {
    tracking_visitor!('ast);
}

/// Performs the extraction planned in `plan`.
pub fn apply(doc: &mut Document, plan: &ExtractionPlan) -> Applied {
    let watermark = doc.arena.watermark();
    let roots = plan.region.roots();
    let moved = MovedSet::collect(&doc.arena, &roots);
    let old = plan.region.span(&doc.arena);

    let arena = &mut doc.arena;
    let interner = &mut doc.interner;

    let fresh_ident = |arena: &mut AstArena, sym| arena.exprs.alloc_fresh(Expr::Ident(sym));
    let name = interner.intern(&plan.name);
    let callee = fresh_ident(arena, name);
    let args: Vec<ExprId> = plan
        .params
        .iter()
        .map(|p| {
            let sym = interner.intern(&p.name);
            fresh_ident(arena, sym)
        })
        .collect();
    let args = arena.list_exprs(args);
    let call = arena.exprs.alloc_fresh(Expr::Call {
        callee,
        args,
        ellipsis: false,
    });

    let (replacement, body) = match &plan.region {
        Region::Expression { expr, .. } => {
            if let Some(slot) = plan.slot {
                slot.fill(arena, *expr, call);
            }
            let stmt = if plan.results.is_empty() {
                let s = arena.simple_stmts.alloc_fresh(SimpleStmt::Expr(*expr));
                Stmt::Simple(s)
            } else {
                Stmt::Return(arena.list_exprs([*expr]))
            };
            (Replacement::Expr(call), vec![arena.stmts.alloc_fresh(stmt)])
        }
        Region::Statements { stmts, owner } => {
            let output_syms: Vec<_> = plan
                .outputs
                .iter()
                .map(|o| interner.intern(&o.name))
                .collect();
            let simple = if output_syms.is_empty() {
                SimpleStmt::Expr(call)
            } else {
                SimpleStmt::ShortVarDecl {
                    names: arena.list_ident_names(output_syms.iter().map(|&s| IdentName::fresh(s))),
                    values: arena.list_exprs([call]),
                }
            };
            let simple = arena.simple_stmts.alloc_fresh(simple);
            let call_stmt = arena.stmts.alloc_fresh(Stmt::Simple(simple));

            let list = arena.stmts_list(owner.stmts(arena)).to_vec();
            let first = list.iter().position(|s| Some(s) == stmts.first());
            let spliced: Vec<StmtId> = match first {
                Some(i) => list[..i]
                    .iter()
                    .copied()
                    .chain([call_stmt])
                    .chain(list[i + stmts.len()..].iter().copied())
                    .collect(),
                None => list,
            };
            let spliced = arena.list_stmts(spliced);
            owner.set_stmts(arena, spliced);

            let mut body = stmts.clone();
            if !output_syms.is_empty() {
                let results: Vec<ExprId> = output_syms
                    .iter()
                    .map(|&s| fresh_ident(arena, s))
                    .collect();
                let results = arena.list_exprs(results);
                body.push(arena.stmts.alloc_fresh(Stmt::Return(results)));
            }
            (Replacement::Stmt(call_stmt), body)
        }
    };

    let params: Vec<_> = plan
        .params
        .iter()
        .map(|p| {
            let sym = interner.intern(&p.name);
            let names = arena.list_ident_names([IdentName::fresh(sym)]);
            let typ = p.ty.materialize(arena, interner);
            arena.fields.alloc_fresh(Field {
                names,
                typ,
                variadic: false,
                tag: None,
            })
        })
        .collect();
    let params = arena.list_fields(params);
    let results: Vec<_> = plan
        .results
        .iter()
        .map(|t| {
            let typ = t.materialize(arena, interner);
            arena.fields.alloc_fresh(Field {
                names: ListRef::EMPTY,
                typ,
                variadic: false,
                tag: None,
            })
        })
        .collect();
    let results = arena.list_fields(results);
    let sig = arena.signatures.alloc_fresh(Signature { params, results });
    let stmts = arena.list_stmts(body);
    let block = arena.blocks.alloc_fresh(Block { stmts });
    let function = arena.funcs.alloc_fresh(FuncDecl {
        recv: None,
        name: IdentName::fresh(name),
        sig,
        body: Some(block),
    });

    let decls: Vec<TopLevelDecl> = arena
        .top_decls(doc.file.decls)
        .iter()
        .copied()
        .chain([TopLevelDecl::Func(function)])
        .collect();
    doc.file.decls = arena.list_top_decls(decls);

    tracing::debug!(
        function = %plan.name,
        moved = moved.nodes.len(),
        old_start = old.start,
        old_end = old.end,
        "tree rewritten"
    );
    Applied {
        replacement,
        function,
        old,
        watermark,
        moved,
        anchor: roots.first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::resolve_selection;
    use go_syntax::parse_source;
    use go_syntax::print::print_stmt;
    use pretty_assertions::assert_eq;

    const SRC: &str = "package p

func compute() int { return 1 }

func f(n int) {
	a := compute()
	b := n * a
	println(b, n)
	defer println(a)
}
";

    fn plan(selection: &str, name: &str) -> Result<ExtractionPlan, ExtractError> {
        let doc = parse_source(SRC).expect("parse");
        let region = resolve_selection(&doc, selection.parse().expect("selection"))?;
        ExtractionPlan::build(&doc, region, name)
    }

    fn described(captures: &[Capture]) -> Vec<String> {
        captures.iter().map(|c| format!("{} {}", c.name, c.ty)).collect()
    }

    #[test]
    fn plans_typed_parameters_and_outputs() {
        let p = plan("6:2-7:12", "prepare").expect("plan");
        assert_eq!(described(&p.params), ["n int"]);
        assert_eq!(described(&p.outputs), ["a int", "b int"]);
        assert_eq!(p.results, [GoType::named("int"), GoType::named("int")]);
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn effect_only_expressions_have_no_results() {
        let p = plan("9:8-9:18", "logA").expect("plan");
        assert!(p.results.is_empty());
        assert_eq!(described(&p.params), ["a int"]);

        let p = plan("7:7-7:12", "scaled").expect("plan");
        assert_eq!(p.results, [GoType::named("int")]);
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "9lives", "func", "_", "a-b"] {
            assert_eq!(
                plan("7:7-7:12", name).unwrap_err(),
                ExtractError::InvalidFunctionName(name.to_owned())
            );
        }
        assert_eq!(
            plan("7:7-7:12", "compute").unwrap_err(),
            ExtractError::NameCollision("compute".to_owned())
        );
    }

    #[test]
    fn rejects_unsupported_parents() {
        let err = plan("6:7-6:14", "callee").unwrap_err();
        assert_eq!(
            err,
            ExtractError::UnsupportedExtractionContext {
                parent: "call expression"
            }
        );
    }

    #[test]
    fn splices_the_statement_list() {
        let mut doc = parse_source(SRC).expect("parse");
        let region = resolve_selection(&doc, "6:2-7:12".parse().expect("selection")).expect("region");
        let plan = ExtractionPlan::build(&doc, region, "prepare").expect("plan");
        let applied = apply(&mut doc, &plan);

        let Replacement::Stmt(call) = applied.replacement else {
            panic!("expected a statement replacement");
        };
        assert_eq!(print_stmt(&doc.arena, &doc.interner, call), "a, b := prepare(n)");
        assert_eq!(doc.arena.top_decls(doc.file.decls).len(), 3);
        let body = doc.arena.funcs[applied.function].body.expect("body");
        let body = doc.arena.stmts_list(doc.arena.blocks[body].stmts);
        assert_eq!(body.len(), 3);
        assert!(applied.moved.contains(NodeRef::Stmt(body[0])));
        assert!(!applied.moved.contains(NodeRef::Stmt(body[2])));
    }
}
