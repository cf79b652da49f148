//! Go source syntax: Logos lexer with semicolon insertion, recursive-descent
//! parser into an arena AST, and a gofmt-style printer that can also lay out
//! positions for nodes it prints.
//!
//! - Every node's span lives in a side table next to the node, so a tree can be
//!   edited and re-positioned without rebuilding it.
//! - [`Document`] pairs a tree with the line table that maps byte offsets to
//!   `(line, column)` positions.

pub mod ast;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod print;
pub mod render;
pub mod walk;

pub use document::{Document, LineIndex, LineTable, Position};
pub use error::{Diag, ParseFailure};
pub use lexer::Lexer;
pub use parser::parse_source;
pub use print::print_document;
