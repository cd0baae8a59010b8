// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::token::TokenKind as T;

fn kinds(src: &str) -> Vec<T> {
    Lexer::new(src, "test.js").tokenize().unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn words_numbers_strings() {
    assert_eq!(
        kinds("var x = 42;"),
        vec![T::Var, T::Ident("x".into()), T::Assign, T::Int(42), T::Semi, T::Eof]
    );
    assert_eq!(kinds("3.5"), vec![T::Num(3.5), T::Eof]);
    assert_eq!(kinds("0x1f"), vec![T::Int(31), T::Eof]);
    assert_eq!(kinds("1e3"), vec![T::Num(1000.0), T::Eof]);
    assert_eq!(kinds("\"a\\nb\" 'c'"), vec![T::Str("a\nb".into()), T::Str("c".into()), T::Eof]);
}

#[test]
fn member_access_on_int_is_not_a_fraction() {
    assert_eq!(
        kinds("x[0].length"),
        vec![
            T::Ident("x".into()),
            T::LBracket,
            T::Int(0),
            T::RBracket,
            T::Dot,
            T::Ident("length".into()),
            T::Eof
        ]
    );
}

#[test]
fn multi_char_operators() {
    assert_eq!(
        kinds("a === b !== c <= >= << >> && || ++ -- +="),
        vec![
            T::Ident("a".into()),
            T::StrictEq,
            T::Ident("b".into()),
            T::StrictNotEq,
            T::Ident("c".into()),
            T::Le,
            T::Ge,
            T::Shl,
            T::Shr,
            T::AndAnd,
            T::OrOr,
            T::PlusPlus,
            T::MinusMinus,
            T::PlusAssign,
            T::Eof
        ]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(kinds("a // line\nb /* block\nmore */ c"), vec![
        T::Ident("a".into()),
        T::Ident("b".into()),
        T::Ident("c".into()),
        T::Eof
    ]);
}

#[test]
fn lines_are_tracked() {
    let tokens = Lexer::new("a\nb\n\nc", "test.js").tokenize().unwrap();
    let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
    assert_eq!(lines, vec![1, 2, 4, 4]);
}

#[test]
fn bom_is_stripped() {
    assert_eq!(kinds("\u{feff}ok"), vec![T::Ident("ok".into()), T::Eof]);
}

#[test]
fn hash_lines_are_ignored() {
    assert_eq!(kinds("#pragma cache\nx"), vec![T::Ident("x".into()), T::Eof]);
}

#[test]
fn unterminated_string_reports_line() {
    let err = Lexer::new("\n\"oops", "test.js").tokenize().unwrap_err();
    assert!(matches!(err, ParseError::UnterminatedString { line: 2, .. }));
}

#[test]
fn unterminated_comment_is_an_error() {
    let err = Lexer::new("/* nope", "test.js").tokenize().unwrap_err();
    assert!(matches!(err, ParseError::UnterminatedComment { .. }));
}

#[test]
fn unexpected_character() {
    let err = Lexer::new("a @ b", "test.js").tokenize().unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedChar { ch: '@', .. }));
}
