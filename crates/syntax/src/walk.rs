use crate::ast::*;

// Core traits
pub trait Walk<'ast> {
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V);
}

/// Pre-order visitor. Every method's default descends into the node's children;
/// overriding one and not calling `walk` prunes that subtree.
pub trait Visitor<'ast> {
    #[inline(always)]
    fn visit_source_file(&mut self, a: &'ast AstArena, f: &'ast SourceFile) {
        f.walk(a, self);
    }

    #[inline(always)]
    fn visit_decl(&mut self, a: &'ast AstArena, id: DeclId) {
        a.decls[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_spec(&mut self, a: &'ast AstArena, id: SpecId) {
        a.specs[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_func_decl(&mut self, a: &'ast AstArena, id: FuncDeclId) {
        a.funcs[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_signature(&mut self, a: &'ast AstArena, id: SignatureId) {
        a.signatures[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_field(&mut self, a: &'ast AstArena, id: FieldId) {
        a.fields[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_block(&mut self, a: &'ast AstArena, id: BlockId) {
        a.blocks[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
        a.stmts[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_simple_stmt(&mut self, a: &'ast AstArena, id: SimpleStmtId) {
        a.simple_stmts[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        a.exprs[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_type(&mut self, a: &'ast AstArena, id: TypeId) {
        a.types[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_switch_clause(&mut self, a: &'ast AstArena, id: SwitchClauseId) {
        a.switch_clauses[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_comm_clause(&mut self, a: &'ast AstArena, id: CommClauseId) {
        a.comm_clauses[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_comment(&mut self, a: &'ast AstArena, id: CommentId) {
        a.comments[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_comment_group(&mut self, a: &'ast AstArena, id: CommentGroupId) {
        a.comment_groups[id].walk(a, self);
    }
}

/// Dispatches a [`NodeRef`] to the matching `visit_*` method.
pub fn visit_node<'ast, V: Visitor<'ast> + ?Sized>(a: &'ast AstArena, v: &mut V, node: NodeRef) {
    match node {
        NodeRef::Decl(id) => v.visit_decl(a, id),
        NodeRef::Spec(id) => v.visit_spec(a, id),
        NodeRef::Func(id) => v.visit_func_decl(a, id),
        NodeRef::Signature(id) => v.visit_signature(a, id),
        NodeRef::Field(id) => v.visit_field(a, id),
        NodeRef::Block(id) => v.visit_block(a, id),
        NodeRef::Stmt(id) => v.visit_stmt(a, id),
        NodeRef::SimpleStmt(id) => v.visit_simple_stmt(a, id),
        NodeRef::Expr(id) => v.visit_expr(a, id),
        NodeRef::Type(id) => v.visit_type(a, id),
        NodeRef::SwitchClause(id) => v.visit_switch_clause(a, id),
        NodeRef::CommClause(id) => v.visit_comm_clause(a, id),
        NodeRef::Comment(id) => v.visit_comment(a, id),
        NodeRef::CommentGroup(id) => v.visit_comment_group(a, id),
    }
}

macro_rules! impl_walk_for_ids {
    ($($id:ty => $visit:ident),* $(,)?) => {
        $(
            impl<'ast> Walk<'ast> for $id {
                #[inline(always)]
                fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
                    v.$visit(a, *self);
                }
            }
        )*
    };
}

impl_walk_for_ids! {
    DeclId => visit_decl,
    SpecId => visit_spec,
    FuncDeclId => visit_func_decl,
    SignatureId => visit_signature,
    FieldId => visit_field,
    BlockId => visit_block,
    StmtId => visit_stmt,
    SimpleStmtId => visit_simple_stmt,
    ExprId => visit_expr,
    TypeId => visit_type,
    SwitchClauseId => visit_switch_clause,
    CommClauseId => visit_comm_clause,
    CommentId => visit_comment,
    CommentGroupId => visit_comment_group,
}

pub trait ListSlice<T> {
    fn slice(&self, r: ListRef<T>) -> &[T];
}

impl<'ast, T> Walk<'ast> for ListRef<T>
where
    AstArena: ListSlice<T>,
    T: Walk<'ast> + 'ast,
{
    #[inline(always)]
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
        for item in a.slice(*self) {
            item.walk(a, v);
        }
    }
}

macro_rules! impl_list_slice {
    ($($t:ty => $getter:ident),* $(,)?) => {
        $(
            impl ListSlice<$t> for AstArena {
                #[inline(always)]
                fn slice(&self, r: ListRef<$t>) -> &[$t] {
                    self.$getter(r)
                }
            }
        )*
    };
}

impl_list_slice! {
    IdentName => ident_names,
    ExprId => exprs_list,
    StmtId => stmts_list,
    TypeId => types_list,
    FieldId => fields_list,
    SpecId => specs_list,
    KeyedElement => keyed_elems_list,
    TopLevelDecl => top_decls,
    SwitchClauseId => switch_clause_ids,
    CommClauseId => comm_clause_ids,
    CommentId => comment_ids,
    CommentGroupId => comment_group_ids,
}

impl<'ast, T: Walk<'ast>> Walk<'ast> for Option<T> {
    #[inline(always)]
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
        if let Some(x) = self {
            x.walk(a, v);
        }
    }
}

// Leaves
macro_rules! impl_walk_noop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'ast> Walk<'ast> for $ty {
                #[inline(always)]
                fn walk<V: Visitor<'ast> + ?Sized>(&self, _: &'ast AstArena, _: &mut V) {}
            }
        )*
    };
}

impl_walk_noop! {
    Span,
    Symbol,
    IdentName,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;

    #[derive(Default)]
    struct Counter {
        exprs: usize,
        stmts: usize,
        blocks: usize,
    }

    impl<'ast> Visitor<'ast> for Counter {
        fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
            self.exprs += 1;
            a.exprs[id].walk(a, self);
        }

        fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
            self.stmts += 1;
            a.stmts[id].walk(a, self);
        }

        fn visit_block(&mut self, a: &'ast AstArena, id: BlockId) {
            self.blocks += 1;
            a.blocks[id].walk(a, self);
        }
    }

    #[test]
    fn visits_nested_statements_and_expressions() {
        let doc = parse_source("package p\n\nfunc f(x int) {\n\tif x > 0 {\n\t\tx--\n\t}\n}\n")
            .expect("parse");
        let mut c = Counter::default();
        c.visit_source_file(&doc.arena, &doc.file);
        // if, x--
        assert_eq!(c.stmts, 2);
        // x > 0 (x, 0, binary), x
        assert_eq!(c.exprs, 4);
        // function body, then block
        assert_eq!(c.blocks, 2);
    }
}
