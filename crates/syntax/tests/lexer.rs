use go_syntax::lexer::{Lexer, Tok};
use pretty_assertions::assert_eq;

fn injected_semis(input: &str) -> Vec<usize> {
    Lexer::new(input)
        .filter(|(s, t, e)| matches!(t, Tok::Semi) && s == e)
        .map(|(s, _, _)| s)
        .collect()
}

fn tok_name(t: &Tok<'_>) -> &'static str {
    match t {
        Tok::Ident(_) => "IDENT",
        Tok::IntLit(_) => "INT",
        Tok::FloatLit(_) => "FLOAT",
        Tok::ImagLit(_) => "IMAG",
        Tok::RuneLit(_) => "CHAR",
        Tok::StringLit(_) => "STRING",
        Tok::RawStringLit(_) => "STRING",

        Tok::Semi => ";",

        Tok::Plus => "+",
        Tok::Minus => "-",
        Tok::Star => "*",
        Tok::Slash => "/",
        Tok::Percent => "%",

        Tok::Amp => "&",
        Tok::Pipe => "|",
        Tok::Caret => "^",
        Tok::Shl => "<<",
        Tok::Shr => ">>",
        Tok::AndNot => "&^",

        Tok::AddAssign => "+=",
        Tok::SubAssign => "-=",
        Tok::MulAssign => "*=",
        Tok::DivAssign => "/=",
        Tok::ModAssign => "%=",

        Tok::AndAssign => "&=",
        Tok::OrAssign => "|=",
        Tok::XorAssign => "^=",
        Tok::ShlAssign => "<<=",
        Tok::ShrAssign => ">>=",
        Tok::AndNotAssign => "&^=",

        Tok::LAnd => "&&",
        Tok::LOr => "||",
        Tok::Arrow => "<-",
        Tok::Inc => "++",
        Tok::Dec => "--",

        Tok::EqEq => "==",
        Tok::NotEq => "!=",
        Tok::Lt => "<",
        Tok::Gt => ">",
        Tok::Le => "<=",
        Tok::Ge => ">=",
        Tok::Assign => "=",
        Tok::Bang => "!",
        Tok::Define => ":=",
        Tok::Ellipsis => "...",
        Tok::Tilde => "~",

        Tok::LParen => "(",
        Tok::RParen => ")",
        Tok::LBrack => "[",
        Tok::RBrack => "]",
        Tok::LBrace => "{",
        Tok::RBrace => "}",
        Tok::Comma => ",",
        Tok::Dot => ".",
        Tok::Colon => ":",

        Tok::KwBreak => "break",
        Tok::KwCase => "case",
        Tok::KwChan => "chan",
        Tok::KwConst => "const",
        Tok::KwContinue => "continue",
        Tok::KwDefault => "default",
        Tok::KwDefer => "defer",
        Tok::KwElse => "else",
        Tok::KwFallthrough => "fallthrough",
        Tok::KwFor => "for",
        Tok::KwFunc => "func",
        Tok::KwGo => "go",
        Tok::KwGoto => "goto",
        Tok::KwIf => "if",
        Tok::KwImport => "import",
        Tok::KwInterface => "interface",
        Tok::KwMap => "map",
        Tok::KwPackage => "package",
        Tok::KwRange => "range",
        Tok::KwReturn => "return",
        Tok::KwSelect => "select",
        Tok::KwStruct => "struct",
        Tok::KwSwitch => "switch",
        Tok::KwType => "type",
        Tok::KwVar => "var",

        Tok::Error => "ERROR",
    }
}

fn lex_names(input: &str) -> Vec<&'static str> {
    Lexer::new(input).map(|(_, t, _)| tok_name(&t)).collect()
}

/// Comments are trivia here; the `COMMENT` markers in the table only document
/// where Go's scanner would report one.
fn check_semi_case(input: &str, want: &str) {
    let want = want
        .split_whitespace()
        .filter(|w| *w != "COMMENT")
        .collect::<Vec<_>>()
        .join(" ");
    let got = lex_names(input).join(" ");
    assert_eq!(got, want, "input=<<{input}>>");
}

struct SemiCase {
    input: &'static str,
    want: &'static str,
}

#[rustfmt::skip]
const SEMICOLON_TESTS: &[SemiCase] = &[
    SemiCase { input: "", want: "" },
    SemiCase { input: "\u{FEFF};", want: ";" }, // leading BOM is skipped
    SemiCase { input: ";", want: ";" },

    SemiCase { input: "foo\n", want: "IDENT ;" },
    SemiCase { input: "123\n", want: "INT ;" },
    SemiCase { input: "1.2\n", want: "FLOAT ;" },
    SemiCase { input: "'x'\n", want: "CHAR ;" },
    SemiCase { input: "\"x\"\n", want: "STRING ;" },
    SemiCase { input: "`x`\n", want: "STRING ;" },

    SemiCase { input: "+\n", want: "+" },
    SemiCase { input: "-\n", want: "-" },
    SemiCase { input: "*\n", want: "*" },
    SemiCase { input: "/\n", want: "/" },
    SemiCase { input: "%\n", want: "%" },

    SemiCase { input: "&\n", want: "&" },
    SemiCase { input: "|\n", want: "|" },
    SemiCase { input: "^\n", want: "^" },
    SemiCase { input: "<<\n", want: "<<" },
    SemiCase { input: ">>\n", want: ">>" },
    SemiCase { input: "&^\n", want: "&^" },

    SemiCase { input: "+=\n", want: "+=" },
    SemiCase { input: "-=\n", want: "-=" },
    SemiCase { input: "*=\n", want: "*=" },
    SemiCase { input: "/=\n", want: "/=" },
    SemiCase { input: "%=\n", want: "%=" },

    SemiCase { input: "&=\n", want: "&=" },
    SemiCase { input: "|=\n", want: "|=" },
    SemiCase { input: "^=\n", want: "^=" },
    SemiCase { input: "<<=\n", want: "<<=" },
    SemiCase { input: ">>=\n", want: ">>=" },
    SemiCase { input: "&^=\n", want: "&^=" },

    SemiCase { input: "&&\n", want: "&&" },
    SemiCase { input: "||\n", want: "||" },
    SemiCase { input: "<-\n", want: "<-" },
    SemiCase { input: "++\n", want: "++ ;" },
    SemiCase { input: "--\n", want: "-- ;" },

    SemiCase { input: "==\n", want: "==" },
    SemiCase { input: "<\n", want: "<" },
    SemiCase { input: ">\n", want: ">" },
    SemiCase { input: "=\n", want: "=" },
    SemiCase { input: "!\n", want: "!" },

    SemiCase { input: "!=\n", want: "!=" },
    SemiCase { input: "<=\n", want: "<=" },
    SemiCase { input: ">=\n", want: ">=" },
    SemiCase { input: ":=\n", want: ":=" },
    SemiCase { input: "...\n", want: "..." },

    SemiCase { input: "(\n", want: "(" },
    SemiCase { input: "[\n", want: "[" },
    SemiCase { input: "{\n", want: "{" },
    SemiCase { input: ",\n", want: "," },
    SemiCase { input: ".\n", want: "." },

    SemiCase { input: ")\n", want: ") ;" },
    SemiCase { input: "]\n", want: "] ;" },
    SemiCase { input: "}\n", want: "} ;" },
    SemiCase { input: ";\n", want: ";" },
    SemiCase { input: ":\n", want: ":" },

    SemiCase { input: "break\n", want: "break ;" },
    SemiCase { input: "case\n", want: "case" },
    SemiCase { input: "chan\n", want: "chan" },
    SemiCase { input: "const\n", want: "const" },
    SemiCase { input: "continue\n", want: "continue ;" },

    SemiCase { input: "default\n", want: "default" },
    SemiCase { input: "defer\n", want: "defer" },
    SemiCase { input: "else\n", want: "else" },
    SemiCase { input: "fallthrough\n", want: "fallthrough ;" },
    SemiCase { input: "for\n", want: "for" },

    SemiCase { input: "func\n", want: "func" },
    SemiCase { input: "go\n", want: "go" },
    SemiCase { input: "goto\n", want: "goto" },
    SemiCase { input: "if\n", want: "if" },
    SemiCase { input: "import\n", want: "import" },

    SemiCase { input: "interface\n", want: "interface" },
    SemiCase { input: "map\n", want: "map" },
    SemiCase { input: "package\n", want: "package" },
    SemiCase { input: "range\n", want: "range" },
    SemiCase { input: "return\n", want: "return ;" },

    SemiCase { input: "select\n", want: "select" },
    SemiCase { input: "struct\n", want: "struct" },
    SemiCase { input: "switch\n", want: "switch" },
    SemiCase { input: "type\n", want: "type" },
    SemiCase { input: "var\n", want: "var" },

    SemiCase { input: "foo//comment\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo//comment", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*comment*/\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*\n*/", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*comment*/    \n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo/*\n*/    ", want: "IDENT COMMENT ;" },

    SemiCase { input: "foo    // comment\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo    // comment", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo    /*comment*/\n", want: "IDENT COMMENT ;" },
    SemiCase { input: "foo    /*\n*/", want: "IDENT COMMENT ;" },

    SemiCase {
        input: "package main\n\nfunc main() {\n\tif {\n\t\treturn /* */ }\n}\n",
        want: "package IDENT ; func IDENT ( ) { if { return COMMENT } ; } ;",
    },
    SemiCase { input: "package main", want: "package IDENT ;" },
];

#[test]
fn semicolons_follow_go_insertion_rules() {
    for t in SEMICOLON_TESTS {
        check_semi_case(t.input, t.want);

        // trailing newlines never change the token stream
        let mut trimmed = t.input;
        while let Some(rest) = trimmed.strip_suffix('\n') {
            trimmed = rest;
            check_semi_case(trimmed, t.want);
        }
    }
}

#[test]
fn block_comment_with_newline_acts_like_newline() {
    // inserted at the first line end inside the comment, then at EOF
    assert_eq!(injected_semis("x/*\n*/y"), vec![3, 7]);
    assert_eq!(injected_semis("x\ny"), vec![1, 3]);
    assert_eq!(injected_semis("x/*\r*/y"), vec![3, 7]);
    assert_eq!(injected_semis("if/*\n*/x"), vec![8]);
}

#[test]
fn carriage_returns_end_lines() {
    assert_eq!(injected_semis("x\r\ny"), vec![1, 4]);
    let src = "x//c\r\ny";
    assert_eq!(injected_semis(src), vec![4, src.len()]);
}

#[test]
fn line_comment_at_eof_still_ends_statement() {
    let src = "x//c";
    assert_eq!(injected_semis(src), vec![src.len()]);
}

#[test]
fn statement_ending_tokens_insert_semicolons() {
    assert_eq!(injected_semis("break\nx"), vec![5, 7]);
    assert_eq!(injected_semis("fallthrough\nx"), vec![11, 13]);
    assert_eq!(injected_semis("x++\ny"), vec![3, 5]);
    assert_eq!(injected_semis("1i\nx"), vec![2, 4]);
}

#[test]
fn collects_lex_errors_without_stopping() {
    let mut lx = Lexer::new("a := 09\nb := 0b2\nc := 1\n");
    let toks: Vec<_> = lx.by_ref().collect();
    assert_eq!(toks.iter().filter(|(_, t, _)| matches!(t, Tok::Error)).count(), 2);
    assert_eq!(lx.take_diags().len(), 2);
    assert!(toks.iter().any(|(_, t, _)| *t == Tok::IntLit("1")));
}
