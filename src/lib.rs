//! Extract Function for Go source files.
//!
//! Given a parsed [`Document`] and a `line:col-line:col` selection, the
//! selected expression or statements move into a new top-level function and
//! a call takes their place:
//!
//! ```text
//! selection ─▶ Region ─▶ captures + types ─▶ ExtractionPlan ─▶ tree edit ─▶ layout
//! ```
//!
//! The document stays printable and byte-accurate after every successful
//! extraction; failed extractions leave it untouched.

/// Implements every `Visitor` method as `enter` / walk children / `leave`.
/// `enter` returns whether to descend.
macro_rules! tracking_visitor {
    ($lt:lifetime) => {
        tracking_visitor!($lt;
            visit_decl, decls, Decl, DeclId;
            visit_spec, specs, Spec, SpecId;
            visit_func_decl, funcs, Func, FuncDeclId;
            visit_signature, signatures, Signature, SignatureId;
            visit_field, fields, Field, FieldId;
            visit_block, blocks, Block, BlockId;
            visit_stmt, stmts, Stmt, StmtId;
            visit_simple_stmt, simple_stmts, SimpleStmt, SimpleStmtId;
            visit_expr, exprs, Expr, ExprId;
            visit_type, types, Type, TypeId;
            visit_switch_clause, switch_clauses, SwitchClause, SwitchClauseId;
            visit_comm_clause, comm_clauses, CommClause, CommClauseId;
            visit_comment, comments, Comment, CommentId;
            visit_comment_group, comment_groups, CommentGroup, CommentGroupId;
        );
    };
    ($lt:lifetime; $($method:ident, $family:ident, $variant:ident, $id:ident;)*) => {
        $(
            fn $method(&mut self, a: &$lt ::go_syntax::ast::AstArena, id: ::go_syntax::ast::$id) {
                let node = ::go_syntax::ast::NodeRef::$variant(id);
                if self.enter(a, node) {
                    ::go_syntax::walk::Walk::walk(&a.$family[id], a, self);
                }
                self.leave(node);
            }
        )*
    };
}

pub mod capture;
pub mod deduce;
pub mod error;
pub mod layout;
pub mod scope;
pub mod selection;
pub mod transform;

pub use capture::CaptureAnalysis;
pub use deduce::{GoType, TypeDeducer};
pub use error::{Error, ExtractError, SelectionFailure, Warning};
pub use layout::LineEdit;
pub use selection::{resolve_selection, Region, Selection};
pub use transform::{Capture, ExtractionPlan};

pub use go_syntax::{parse_source, print_document, Document, Position};

use go_syntax::ast::FuncDeclId;

/// Outcome of a successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The new function declaration.
    pub function: FuncDeclId,
    pub name: String,
    pub params: Vec<Capture>,
    pub outputs: Vec<Capture>,
    pub results: Vec<GoType>,
    pub warnings: Vec<Warning>,
    pub edit: LineEdit,
}

/// Moves the code under `selection` into a new function called `name`.
///
/// On error `doc` is unchanged, except for [`ExtractError::LayoutInconsistency`],
/// which means the layout pass itself is broken.
pub fn extract_function(
    doc: &mut Document,
    selection: Selection,
    name: &str,
) -> Result<Extraction, ExtractError> {
    let span = tracing::debug_span!("extract", %selection, function = name);
    let _guard = span.enter();

    let region = resolve_selection(doc, selection)?;
    let plan = ExtractionPlan::build(doc, region, name)?;
    for warning in &plan.warnings {
        tracing::warn!("{warning}");
    }

    let applied = transform::apply(doc, &plan);
    let edit = layout::relayout(doc, &applied)?;

    let ExtractionPlan {
        name,
        params,
        outputs,
        results,
        warnings,
        ..
    } = plan;
    Ok(Extraction {
        function: applied.function,
        name,
        params,
        outputs,
        results,
        warnings,
        edit,
    })
}

/// Parses `source`, extracts, and prints the result.
pub fn extract_source(
    source: &str,
    selection: Selection,
    name: &str,
) -> Result<(String, Extraction), Error> {
    let mut doc = parse_source(source)?;
    let extraction = extract_function(&mut doc, selection, name)?;
    Ok((print_document(&doc), extraction))
}
