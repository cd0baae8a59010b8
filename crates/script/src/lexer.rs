// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script lexer.
//!
//! Produces a line-tagged token stream. `//` and `/* */` comments are
//! skipped; lines starting with `#` are preprocessor territory and are
//! resolved before the lexer runs, so any surviving `#` line is ignored.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    file: String,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file: &str) -> Lexer<'a> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Lexer {
            input,
            file: file.to_string(),
            chars: input.char_indices().peekable(),
            line: 1,
            at_line_start: true,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.at_line_start = true;
            } else if !c.is_whitespace() {
                self.at_line_start = false;
            }
        }
        next
    }

    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_char(&self, ch: char) -> ParseError {
        ParseError::UnexpectedChar { ch, file: self.file.clone(), line: self.line }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;
        let line = self.line;
        let Some((start, ch)) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, line));
        };
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictNotEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.eat('<') {
                    TokenKind::Shl
                } else if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    TokenKind::Shr
                } else if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => TokenKind::Caret,
            '"' | '\'' => self.string(ch)?,
            c if c.is_ascii_digit() => self.number(start)?,
            c if is_ident_start(c) => self.ident(start),
            c => return Err(self.error_char(c)),
        };
        Ok(Token::new(kind, line))
    }

    /// Skip whitespace, comments and leftover preprocessor lines.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') if self.at_line_start => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek().map(|(_, c)| *c) {
                        Some('/') => {
                            while let Some(c) = self.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let line = self.line;
                            self.bump();
                            self.bump();
                            let mut closed = false;
                            while let Some((_, c)) = self.bump() {
                                if c == '*' && self.eat('/') {
                                    closed = true;
                                    break;
                                }
                            }
                            if !closed {
                                return Err(ParseError::UnterminatedComment {
                                    file: self.file.clone(),
                                    line,
                                });
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::UnterminatedString { file: self.file.clone(), line })
                }
                Some((_, c)) if c == quote => return Ok(TokenKind::Str(out)),
                Some((_, '\\')) => match self.bump() {
                    None => {
                        return Err(ParseError::UnterminatedString {
                            file: self.file.clone(),
                            line,
                        })
                    }
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, c)) => out.push(c),
                },
                Some((_, '\n')) => {
                    return Err(ParseError::UnterminatedString { file: self.file.clone(), line })
                }
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let line = self.line;
        // Hex literal
        if self.input[start..].starts_with("0x") || self.input[start..].starts_with("0X") {
            self.bump();
            let digits_start = start + 2;
            let mut end = digits_start;
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    self.bump();
                    end += 1;
                } else {
                    break;
                }
            }
            let text = &self.input[digits_start..end];
            return i64::from_str_radix(text, 16).map(TokenKind::Int).map_err(|_| {
                ParseError::BadNumber {
                    text: self.input[start..end].to_string(),
                    file: self.file.clone(),
                    line,
                }
            });
        }

        let mut end = start + 1;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                c if c.is_ascii_digit() => {
                    self.bump();
                    end += 1;
                }
                '.' if !is_float => {
                    // Member access on a literal is not a fraction.
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if !ahead.peek().map(|(_, c)| c.is_ascii_digit()).unwrap_or(false) {
                        break;
                    }
                    is_float = true;
                    self.bump();
                    end += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    end += 1;
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                        end += 1;
                    }
                }
                _ => break,
            }
        }
        let text = &self.input[start..end];
        if is_float {
            text.parse::<f64>().map(TokenKind::Num).map_err(|_| ParseError::BadNumber {
                text: text.to_string(),
                file: self.file.clone(),
                line,
            })
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| ParseError::BadNumber {
                text: text.to_string(),
                file: self.file.clone(),
                line,
            })
        }
    }

    fn ident(&mut self, start: usize) -> TokenKind {
        let mut end = start + 1;
        while let Some(c) = self.peek() {
            if is_ident_part(c) {
                self.bump();
                end += 1;
            } else {
                break;
            }
        }
        let word = &self.input[start..end];
        TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
