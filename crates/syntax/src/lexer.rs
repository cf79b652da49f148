use crate::ast::CommentKind;
use crate::error::{Diag, LexError, LexErrorKind};
use logos::{Lexer as LogosLexer, Logos};
use std::ops::Range;

// =============================================================================
// 0. Shared helpers
// =============================================================================

#[inline(always)]
fn first_newline_offset(s: &str) -> Option<usize> {
    memchr::memchr2(b'\n', b'\r', s.as_bytes())
}

#[inline(always)]
const fn lower_ascii(b: u8) -> u8 {
    b | 0x20
}

#[inline(always)]
const fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

#[inline]
fn hex_value(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        let d = (b as char).to_digit(16)?;
        acc.checked_mul(16)?.checked_add(d)
    })
}

#[inline(always)]
const fn is_valid_unicode_scalar(x: u32) -> bool {
    x <= 0x10_FFFF && !(x >= 0xD800 && x <= 0xDFFF)
}

// =============================================================================
// 1. Block comment scanner
// =============================================================================

fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut from = 0;

    while let Some(star) = memchr::memchr(b'*', &rem[from..]) {
        let at = from + star;
        if rem.get(at + 1) == Some(&b'/') {
            lex.bump(at + 2);
            return Ok(());
        }
        from = at + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

// =============================================================================
// 2. Escapes (interpreted strings and runes)
// =============================================================================

mod esc {
    use super::*;

    /// Validates one escape starting at `body[i] == b'\\'`; returns its length.
    pub fn escape_len(body: &[u8], i: usize, quote: u8) -> Result<usize, LexErrorKind> {
        let Some(&c) = body.get(i + 1) else {
            return Err(LexErrorKind::InvalidEscape);
        };
        let fixed = |n: usize, radix_ok: fn(u8) -> bool| -> Result<&[u8], LexErrorKind> {
            let digits = body
                .get(i + 2..i + 2 + n)
                .ok_or(LexErrorKind::InvalidEscape)?;
            if digits.iter().all(|&d| radix_ok(d)) {
                Ok(digits)
            } else {
                Err(LexErrorKind::InvalidEscape)
            }
        };

        match c {
            b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\\' => Ok(2),
            _ if c == quote => Ok(2),
            b'0'..=b'7' => {
                let digits = body
                    .get(i + 1..i + 4)
                    .ok_or(LexErrorKind::InvalidEscape)?;
                if !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                    return Err(LexErrorKind::InvalidEscape);
                }
                let v = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if v > 255 {
                    return Err(LexErrorKind::InvalidEscape);
                }
                Ok(4)
            }
            b'x' => fixed(2, is_hex_digit).map(|_| 4),
            b'u' | b'U' => {
                let n = if c == b'u' { 4 } else { 8 };
                let digits = fixed(n, is_hex_digit)?;
                match hex_value(digits) {
                    Some(v) if is_valid_unicode_scalar(v) => Ok(2 + n),
                    _ => Err(LexErrorKind::InvalidEscape),
                }
            }
            _ => Err(LexErrorKind::InvalidEscape),
        }
    }

    pub fn validate_interpreted_string(
        lex: &mut LogosLexer<'_, RawTok>,
    ) -> Result<(), LexErrorKind> {
        let s = lex.slice().as_bytes();
        let body = &s[1..s.len() - 1];
        let mut i = 0;
        while let Some(off) = memchr::memchr(b'\\', &body[i..]) {
            i += off;
            i += escape_len(body, i, b'"')?;
        }
        Ok(())
    }

    /// A rune literal holds exactly one character or one escape.
    pub fn validate_rune(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
        let s = lex.slice();
        let body = &s[1..s.len() - 1];
        let bytes = body.as_bytes();
        let used = if bytes.first() == Some(&b'\\') {
            escape_len(bytes, 0, b'\'')?
        } else {
            body.chars().next().map_or(0, char::len_utf8)
        };
        if used == 0 || used != bytes.len() {
            return Err(LexErrorKind::InvalidToken);
        }
        Ok(())
    }
}

// =============================================================================
// 3. Numbers: maximal munch in the logos callback, validation in the wrapper
// =============================================================================

mod num {
    use super::*;

    fn consume_digits(src: &[u8], mut i: usize, base: u8) -> usize {
        while let Some(&b) = src.get(i) {
            let ok = b == b'_' || if base == 16 { is_hex_digit(b) } else { b.is_ascii_digit() };
            if !ok {
                break;
            }
            i += 1;
        }
        i
    }

    /// Logos callback: extend the number token to its maximal munch.
    /// Digits that are wrong for the base stay in the token and are rejected later.
    pub fn lex_number(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
        let src = lex.source().as_bytes();
        let start = lex.span().start;
        let mut i = start;
        let mut base = 10;

        if src[i] == b'.' {
            i = consume_digits(src, i + 1, 10);
        } else {
            if src[i] == b'0' {
                if let Some(&p) = src.get(i + 1) {
                    base = match lower_ascii(p) {
                        b'x' => 16,
                        b'o' => 8,
                        b'b' => 2,
                        _ => 10,
                    };
                    if base != 10 {
                        i += 2;
                    }
                }
            }
            i = consume_digits(src, i, base);

            // fraction, without stealing ".." / "..."
            if src.get(i) == Some(&b'.') && src.get(i + 1) != Some(&b'.') {
                i = consume_digits(src, i + 1, base);
            }
        }

        let exp = if base == 16 { b'p' } else { b'e' };
        if src.get(i).map(|&b| lower_ascii(b)) == Some(exp) {
            i += 1;
            if matches!(src.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            i = consume_digits(src, i, 10);
        }

        let already = lex.span().end;
        if i > already {
            lex.bump(i - already);
        }
        Ok(())
    }

    fn digits_ok(digits: &[u8], valid: impl Fn(u8) -> bool) -> bool {
        // `_` may only separate digits (a leading one is allowed after a base prefix).
        !digits.is_empty()
            && digits.last() != Some(&b'_')
            && !digits.windows(2).any(|w| w == b"__")
            && digits.iter().all(|&b| b == b'_' || valid(b))
            && digits.iter().any(|&b| b != b'_')
    }

    /// Returns `Ok(true)` for floating-point literals, `Ok(false)` for integers.
    pub fn classify_number(s: &[u8]) -> Result<bool, LexErrorKind> {
        let bad = Err(LexErrorKind::InvalidNumber);

        if s.len() >= 2 && s[0] == b'0' && matches!(lower_ascii(s[1]), b'x' | b'o' | b'b') {
            let body = &s[2..];
            return match lower_ascii(s[1]) {
                b'x' => {
                    let exp = body.iter().position(|&b| lower_ascii(b) == b'p');
                    let mantissa = &body[..exp.unwrap_or(body.len())];
                    let is_float = exp.is_some() || mantissa.contains(&b'.');
                    let ok_mantissa = mantissa
                        .split(|&b| b == b'.')
                        .filter(|part| !part.is_empty())
                        .all(|part| digits_ok(part, is_hex_digit))
                        && mantissa.iter().any(|&b| is_hex_digit(b));
                    if !ok_mantissa || (mantissa.contains(&b'.') && exp.is_none()) {
                        return bad;
                    }
                    if let Some(p) = exp {
                        let mut e = &body[p + 1..];
                        if matches!(e.first(), Some(b'+' | b'-')) {
                            e = &e[1..];
                        }
                        if !digits_ok(e, |b| b.is_ascii_digit()) {
                            return bad;
                        }
                    }
                    Ok(is_float)
                }
                b'o' if digits_ok(body, |b| (b'0'..=b'7').contains(&b)) => Ok(false),
                b'b' if digits_ok(body, |b| b == b'0' || b == b'1') => Ok(false),
                _ => bad,
            };
        }

        let exp = s.iter().position(|&b| lower_ascii(b) == b'e');
        let mantissa = &s[..exp.unwrap_or(s.len())];
        let is_float = exp.is_some() || mantissa.contains(&b'.');

        if let Some(e) = exp {
            let mut e = &s[e + 1..];
            if matches!(e.first(), Some(b'+' | b'-')) {
                e = &e[1..];
            }
            if !digits_ok(e, |b| b.is_ascii_digit()) {
                return bad;
            }
        }

        let mut parts = mantissa.splitn(2, |&b| b == b'.');
        let int_part = parts.next().unwrap_or_default();
        let frac_part = parts.next();
        if int_part.is_empty() && frac_part.map_or(true, <[u8]>::is_empty) {
            return bad;
        }
        if !int_part.is_empty() && !digits_ok(int_part, |b| b.is_ascii_digit()) {
            return bad;
        }
        if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
            if frac[0] == b'_' || !digits_ok(frac, |b| b.is_ascii_digit()) {
                return bad;
            }
        }
        // legacy octal: 0777
        if !is_float && int_part.len() > 1 && int_part[0] == b'0' {
            if !int_part.iter().all(|&b| b == b'_' || (b'0'..=b'7').contains(&b)) {
                return bad;
            }
        }
        Ok(is_float)
    }
}

// =============================================================================
// 4. Token Definition (RawTok)
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\f]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[regex(r"//[^\n\r]*", allow_greedy = true)] LineComment,
    #[token("/*", lex_block_comment)] BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    #[regex(r"[0-9]|\.[0-9]", num::lex_number)] Number,

    #[regex(r"`[^`]*`")] RawString,
    #[regex(r#""([^"\\\n\r]|\\.)*""#, esc::validate_interpreted_string)] String,
    #[regex(r"'([^'\\\n\r]|\\.)+'", esc::validate_rune)] Rune,

    // Operators
    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("&^=")] AndNotAssign,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("|=")] OrAssign,
    #[token("^=")] XorAssign,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("&^")] AndNot,
    #[token("&&")] LAnd,
    #[token("||")] LOr,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token(":=")] Define,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("<")] Lt,
    #[token(">")] Gt,

    // Delimiters
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    #[regex(r".", priority = 0)] Error,
}

// =============================================================================
// 5. Lookup tables
// =============================================================================

macro_rules! gen_lookup_table {
    ($($variant:ident),* $(,)?) => {{
        let mut table = [false; 256];
        $(table[RawTok::$variant as usize] = true;)*
        table
    }};
}

/// Tokens after which a newline turns into `;`.
const SEMI_INSERT_TABLE: [bool; 256] = gen_lookup_table!(
    Ident, Number, Rune, String, RawString,
    KwBreak, KwContinue, KwFallthrough, KwReturn,
    Inc, Dec, RParen, RBrack, RBrace,
);

impl RawTok {
    #[inline(always)]
    const fn can_insert_semicolon(self) -> bool {
        SEMI_INSERT_TABLE[self as usize]
    }

    fn to_token<'src>(self, slice: &'src str) -> Tok<'src> {
        macro_rules! same_name {
            ($($v:ident),* $(,)?) => {
                match self {
                    Self::Ident => Tok::Ident(slice),
                    Self::Rune => Tok::RuneLit(slice),
                    Self::String => Tok::StringLit(slice),
                    Self::RawString => Tok::RawStringLit(slice),
                    $(Self::$v => Tok::$v,)*
                    // numbers, trivia and BOM are handled by the wrapper
                    Self::Number | Self::Newline | Self::LineComment
                    | Self::BlockComment | Self::Bom | Self::Error => Tok::Error,
                }
            };
        }

        same_name! {
            KwBreak, KwCase, KwChan, KwConst, KwContinue, KwDefault, KwDefer, KwElse,
            KwFallthrough, KwFor, KwFunc, KwGo, KwGoto, KwIf, KwImport, KwInterface,
            KwMap, KwPackage, KwRange, KwReturn, KwSelect, KwStruct, KwSwitch, KwType, KwVar,
            Ellipsis, ShlAssign, ShrAssign, AndNotAssign, AddAssign, SubAssign, MulAssign,
            DivAssign, ModAssign, AndAssign, OrAssign, XorAssign, Shl, Shr, AndNot, LAnd,
            LOr, EqEq, NotEq, Le, Ge, Inc, Dec, Define, Arrow, Assign, Plus, Minus, Star,
            Slash, Percent, Amp, Pipe, Caret, Tilde, Bang, Lt, Gt,
            LParen, RParen, LBrack, RBrack, LBrace, RBrace, Comma, Semi, Colon, Dot,
        }
    }
}

// =============================================================================
// 6. Public Token Definition (zero-copy)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'input> {
    Ident(&'input str),
    IntLit(&'input str),
    FloatLit(&'input str),
    ImagLit(&'input str),
    RuneLit(&'input str),
    StringLit(&'input str),
    RawStringLit(&'input str),

    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    Ellipsis,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    EqEq,
    NotEq,
    Le,
    Ge,
    Inc,
    Dec,
    Define,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
}

impl<'input> std::fmt::Display for Tok<'input> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s)
            | Tok::IntLit(s)
            | Tok::FloatLit(s)
            | Tok::ImagLit(s)
            | Tok::RuneLit(s)
            | Tok::StringLit(s)
            | Tok::RawStringLit(s) => f.write_str(s),
            Tok::Semi => f.write_str("';'"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A comment seen while lexing, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    pub span: Range<usize>,
    pub kind: CommentKind,
    /// No token precedes the comment on its line.
    pub own_line: bool,
}

// =============================================================================
// 7. Lexer wrapper: semicolon insertion + imag lookahead + comments + diags
// =============================================================================

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<(usize, Tok<'src>, usize)>,
    diags: Vec<Diag>,
    comments: Vec<RawComment>,
    last_can_insert_semi: bool,
    line_has_token: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::with_capacity(16),
            comments: Vec::new(),
            last_can_insert_semi: false,
            line_has_token: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    pub fn take_comments(&mut self) -> Vec<RawComment> {
        std::mem::take(&mut self.comments)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        let span = crate::ast::Span::new(span.start, span.end);
        self.diags.push(LexError { kind, span }.diag());
    }

    #[inline]
    fn emit_semi_at(&mut self, pos: usize) {
        self.pending = Some((pos, Tok::Semi, pos));
    }

    fn record_comment(&mut self, kind: CommentKind, span: &Range<usize>) {
        self.comments.push(RawComment {
            span: span.clone(),
            kind,
            own_line: !self.line_has_token,
        });
    }

    /// Returns true when the raw token was trivia and produced no token.
    fn handle_trivia(&mut self, raw: RawTok, span: &Range<usize>, slice: &str) -> bool {
        match raw {
            RawTok::Newline => {
                self.line_has_token = false;
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    self.emit_semi_at(span.start);
                }
                true
            }
            RawTok::LineComment => {
                self.record_comment(CommentKind::Line, span);
                true
            }
            RawTok::BlockComment => {
                self.record_comment(CommentKind::Block, span);
                if let Some(off) = first_newline_offset(slice) {
                    self.line_has_token = false;
                    if self.last_can_insert_semi {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(span.start + off);
                    }
                } else {
                    self.line_has_token = true;
                }
                true
            }
            _ => false,
        }
    }

    fn handle_eof(&mut self) {
        self.eof_done = true;
        if self.last_can_insert_semi {
            self.last_can_insert_semi = false;
            self.emit_semi_at(self.src_len);
        }
    }

    fn handle_lex_error(&mut self, kind: LexErrorKind) -> (usize, Tok<'src>, usize) {
        let span = self.logos.span();
        // an unterminated block comment still counts as a comment
        if kind == LexErrorKind::UnterminatedComment {
            self.record_comment(CommentKind::Block, &span);
        }
        self.push_lex_diag(kind, span.clone());
        self.last_can_insert_semi = false;
        self.line_has_token = true;
        (span.start, Tok::Error, span.end)
    }

    fn handle_raw_token(&mut self, raw: RawTok) -> Option<(usize, Tok<'src>, usize)> {
        let span = self.logos.span();
        let slice = self.logos.slice();

        if raw == RawTok::Bom {
            if span.start == 0 {
                return None;
            }
            return Some(self.handle_lex_error(LexErrorKind::InvalidToken));
        }

        if self.handle_trivia(raw, &span, slice) {
            return None;
        }

        self.line_has_token = true;

        if raw == RawTok::Error {
            return Some(self.handle_lex_error(LexErrorKind::InvalidToken));
        }

        if raw == RawTok::Number {
            return Some(self.handle_number_token(span, slice));
        }

        self.last_can_insert_semi = raw.can_insert_semicolon();
        Some((span.start, raw.to_token(slice), span.end))
    }

    fn handle_number_token(&mut self, span: Range<usize>, slice: &'src str) -> (usize, Tok<'src>, usize) {
        let src = self.logos.source();
        let classified = num::classify_number(slice.as_bytes());

        if src.as_bytes().get(span.end) == Some(&b'i') {
            self.logos.bump(1);
            let end = span.end + 1;
            // 0123i is a decimal imaginary literal, not octal
            let valid = classified.is_ok()
                || slice.bytes().all(|b| b.is_ascii_digit() || b == b'_');
            self.last_can_insert_semi = valid;
            if !valid {
                self.push_lex_diag(LexErrorKind::InvalidNumber, span.start..end);
                return (span.start, Tok::Error, end);
            }
            return (span.start, Tok::ImagLit(&src[span.start..end]), end);
        }

        match classified {
            Ok(is_float) => {
                self.last_can_insert_semi = true;
                let tok = if is_float { Tok::FloatLit(slice) } else { Tok::IntLit(slice) };
                (span.start, tok, span.end)
            }
            Err(kind) => {
                self.push_lex_diag(kind, span.clone());
                self.last_can_insert_semi = false;
                (span.start, Tok::Error, span.end)
            }
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = (usize, Tok<'src>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // injected ';' first
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }
            if self.eof_done {
                return None;
            }
            match self.logos.next() {
                // don't return: a pending ';' may still be due
                None => self.handle_eof(),
                Some(Err(kind)) => return Some(self.handle_lex_error(kind)),
                Some(Ok(raw)) => {
                    if let Some(item) = self.handle_raw_token(raw) {
                        return Some(item);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::num::classify_number;
    use super::*;

    #[test]
    fn classifies_numbers() {
        assert_eq!(classify_number(b"42"), Ok(false));
        assert_eq!(classify_number(b"1_000"), Ok(false));
        assert_eq!(classify_number(b"0x1F"), Ok(false));
        assert_eq!(classify_number(b"0o17"), Ok(false));
        assert_eq!(classify_number(b"0b1010"), Ok(false));
        assert_eq!(classify_number(b"0777"), Ok(false));
        assert_eq!(classify_number(b"3.14"), Ok(true));
        assert_eq!(classify_number(b".5"), Ok(true));
        assert_eq!(classify_number(b"1e9"), Ok(true));
        assert_eq!(classify_number(b"0x1p-2"), Ok(true));
        assert!(classify_number(b"09").is_err());
        assert!(classify_number(b"0b2").is_err());
        assert!(classify_number(b"1__0").is_err());
        assert!(classify_number(b"1e").is_err());
        assert!(classify_number(b"0x1.8").is_err());
    }

    #[test]
    fn records_comments_with_placement() {
        let mut lx = Lexer::new("x := 1 // trailing\n// own\n/* a */ y\n");
        let _: Vec<_> = lx.by_ref().collect();
        let comments = lx.take_comments();
        assert_eq!(comments.len(), 3);
        assert!(!comments[0].own_line);
        assert!(comments[1].own_line);
        assert_eq!(comments[2].kind, CommentKind::Block);
        assert!(comments[2].own_line);
    }
}
