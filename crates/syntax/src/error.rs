use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            DiagKind::Lex => "lex",
            DiagKind::Parse => "parse",
        };
        write!(
            f,
            "{kind} error at {}..{}: {}",
            self.span.start, self.span.end, self.message
        )
    }
}

/// Source text that could not be turned into a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} syntax error(s); first: {}", .diags.len(), first_message(.diags))]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

fn first_message(diags: &[Diag]) -> String {
    diags.first().map_or_else(String::new, ToString::to_string)
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated comment")]
    UnterminatedComment,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}
