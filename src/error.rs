use std::fmt;

use go_syntax::ParseFailure;
use thiserror::Error;

use crate::selection::Selection;

/// Why a selection does not map onto an extractable region.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SelectionFailure {
    #[error("a cursor lies outside the document")]
    OutOfBounds,
    #[error("the selection is empty")]
    Empty,
    #[error("the selection ends before it begins")]
    Reversed,
    #[error("no syntax node starts at the beginning of the selection")]
    NoNodeAtBegin,
    #[error("no sibling node ends at the end of the selection")]
    NoNodeAtEnd,
    #[error("the selected nodes are not part of a statement list")]
    NotAStatementList,
    #[error("the selection covers something other than whole statements")]
    NotAStatement,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid selection {selection}: {reason}")]
    InvalidSelection {
        selection: Selection,
        reason: SelectionFailure,
    },

    #[error("cannot extract an expression used as the operand of a {parent}")]
    UnsupportedExtractionContext { parent: &'static str },

    #[error("`{0}` is not a valid Go function name")]
    InvalidFunctionName(String),

    #[error("`{0}` is already declared in this file")]
    NameCollision(String),

    /// The rewritten line table disagrees with the laid-out text.
    #[error("layout inconsistency: expected document size {expected}, line table sums to {actual}")]
    LayoutInconsistency { expected: u32, actual: u32 },
}

/// Non-fatal findings reported with a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No type could be deduced; `placeholder` was emitted instead.
    UnresolvedType { subject: String, placeholder: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedType {
                subject,
                placeholder,
            } => write!(f, "could not deduce the type of {subject}; wrote `{placeholder}`"),
        }
    }
}

/// Everything that can go wrong between source text and extracted source text.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}
