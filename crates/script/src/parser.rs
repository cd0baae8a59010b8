// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script parser: source assembly, recursive-descent statement parsing and
//! precedence-climbing expressions.
//!
//! [`ScriptParser`] is the front door: it enforces the file-size bound,
//! resolves `#include "f"` / `#require "f"` against the including file's
//! directory and the configured libs directory, and hands the assembled
//! source to the lexer, the statement parser and the compiler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::ast::{Expr, FuncDef, Stmt};
use crate::code::{BinOp, CodeBlock, UnOp};
use crate::compile::compile;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Default script size bound, overridable within hard limits.
const DEFAULT_MAX_LEN: u64 = 500_000;
const MIN_MAX_LEN: u64 = 32_768;
const MAX_MAX_LEN: u64 = 2_097_152;
/// Include nesting bound.
const MAX_INCLUDE_DEPTH: usize = 3;

/// A successfully compiled script.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub code: Arc<CodeBlock>,
}

#[derive(Debug, Clone)]
pub struct ScriptParser {
    libs_path: Option<PathBuf>,
    max_file_len: u64,
}

impl Default for ScriptParser {
    fn default() -> Self {
        ScriptParser { libs_path: None, max_file_len: DEFAULT_MAX_LEN }
    }
}

impl ScriptParser {
    pub fn new() -> ScriptParser {
        ScriptParser::default()
    }

    /// Directory searched for includes not found next to the script.
    pub fn set_libs_path(&mut self, path: impl Into<PathBuf>) {
        self.libs_path = Some(path.into());
    }

    /// Set the script length bound, clamped to 32768–2097152 bytes.
    pub fn set_max_file_len(&mut self, len: u64) {
        self.max_file_len = len.clamp(MIN_MAX_LEN, MAX_MAX_LEN);
    }

    pub fn max_file_len(&self) -> u64 {
        self.max_file_len
    }

    pub fn parse_file(&self, path: &Path) -> Result<Parsed, ParseError> {
        let source = self.read_bounded(path)?;
        let mut assembled = String::with_capacity(source.len());
        self.assemble(&source, path, 0, &mut assembled)?;
        self.compile_source(&assembled, &path.display().to_string())
    }

    /// Parse in-memory source; includes resolve against `virtual_path`.
    pub fn parse_source(&self, source: &str, virtual_path: &str) -> Result<Parsed, ParseError> {
        let mut assembled = String::with_capacity(source.len());
        self.assemble(source, Path::new(virtual_path), 0, &mut assembled)?;
        self.compile_source(&assembled, virtual_path)
    }

    fn compile_source(&self, source: &str, file: &str) -> Result<Parsed, ParseError> {
        let tokens = Lexer::new(source, file).tokenize()?;
        let program = TokenParser::new(tokens, file).parse_program()?;
        Ok(Parsed { code: Arc::new(compile(&program, file)) })
    }

    fn read_bounded(&self, path: &Path) -> Result<String, ParseError> {
        let meta = std::fs::metadata(path).map_err(|e| ParseError::Unreadable {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if meta.len() > self.max_file_len {
            return Err(ParseError::TooLarge {
                file: path.display().to_string(),
                size: meta.len(),
                limit: self.max_file_len,
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ParseError::Unreadable {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
    }

    /// Splice `#include`/`#require` directives into `out`.
    fn assemble(
        &self,
        source: &str,
        path: &Path,
        depth: usize,
        out: &mut String,
    ) -> Result<(), ParseError> {
        let file = path.display().to_string();
        for (idx, raw) in source.lines().enumerate() {
            let line = (idx + 1) as u32;
            let trimmed = raw.trim_start();
            let (directive, required) = if let Some(rest) = trimmed.strip_prefix("#require") {
                (Some(rest), true)
            } else if let Some(rest) = trimmed.strip_prefix("#include") {
                (Some(rest), false)
            } else {
                (None, false)
            };
            let Some(rest) = directive else {
                out.push_str(raw);
                out.push('\n');
                continue;
            };
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(ParseError::IncludeDepth { file, line });
            }
            let Some(target) = quoted_path(rest) else {
                return Err(ParseError::Syntax {
                    message: "malformed include directive".to_string(),
                    file,
                    line,
                });
            };
            match self.resolve_include(path, target) {
                Some(resolved) => {
                    let text = self.read_bounded(&resolved)?;
                    self.assemble(&text, &resolved, depth + 1, out)?;
                }
                None if required => {
                    return Err(ParseError::RequireFailed {
                        target: target.to_string(),
                        file,
                        line,
                    });
                }
                None => {
                    warn!(script = %file, line, target, "optional include not found");
                }
            }
        }
        Ok(())
    }

    /// Relative includes try the including file's directory, then libs.
    fn resolve_include(&self, including: &Path, target: &str) -> Option<PathBuf> {
        let target_path = Path::new(target);
        if target_path.is_absolute() {
            return target_path.is_file().then(|| target_path.to_path_buf());
        }
        let sibling = including.parent().unwrap_or(Path::new("")).join(target_path);
        if sibling.is_file() {
            return Some(sibling);
        }
        let libbed = self.libs_path.as_ref()?.join(target_path);
        libbed.is_file().then_some(libbed)
    }
}

fn quoted_path(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

// ---------------------------------------------------------------------------
// Token-stream parser
// ---------------------------------------------------------------------------

pub(crate) struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

impl TokenParser {
    pub(crate) fn new(tokens: Vec<Token>, file: &str) -> TokenParser {
        TokenParser { tokens, pos: 0, file: file.to_string() }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek2(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn bump(&mut self) -> TokenKind {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].kind.clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: self.peek().to_string(),
            file: self.file.clone(),
            line: self.line(),
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn parse_program(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut out = Vec::new();
        while self.peek() != &TokenKind::Eof {
            out.push(self.statement()?);
        }
        Ok(out)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut out = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.peek() == &TokenKind::Eof {
                return Err(self.unexpected("'}'"));
            }
            out.push(self.statement()?);
        }
        Ok(out)
    }

    /// A block, or a single statement treated as one.
    fn body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.peek() == &TokenKind::LBrace {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek() {
            TokenKind::Semi => {
                self.bump();
                Ok(Stmt::Empty)
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Var => {
                let stmt = self.var_statement()?;
                self.eat(&TokenKind::Semi);
                Ok(stmt)
            }
            TokenKind::Function => self.function_decl().map(Stmt::Func),
            TokenKind::If => self.if_statement(),
            TokenKind::While => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.expression()?;
                self.expect(TokenKind::RParen)?;
                let body = self.body()?;
                Ok(Stmt::While { cond, body })
            }
            TokenKind::Do => {
                self.bump();
                let body = self.body()?;
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LParen)?;
                let cond = self.expression()?;
                self.expect(TokenKind::RParen)?;
                self.eat(&TokenKind::Semi);
                Ok(Stmt::DoWhile { body, cond })
            }
            TokenKind::For => self.for_statement(),
            TokenKind::Return => {
                self.bump();
                let value = if matches!(self.peek(), TokenKind::Semi | TokenKind::RBrace) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Break => {
                self.bump();
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Break { line })
            }
            TokenKind::Continue => {
                self.bump();
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Continue { line })
            }
            _ => {
                let expr = self.expression()?;
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `var a = 1, b;` — multiple declarators become a block.
    fn var_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Var)?;
        let mut decls = Vec::new();
        loop {
            let line = self.line();
            let name = self.ident()?;
            let init =
                if self.eat(&TokenKind::Assign) { Some(self.expression()?) } else { None };
            decls.push(Stmt::Var { name, init, line });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if decls.len() == 1 {
            Ok(decls.remove(0))
        } else {
            Ok(Stmt::Block(decls))
        }
    }

    fn function_decl(&mut self) -> Result<FuncDef, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Function)?;
        let name = self.ident()?;
        let params = self.param_list()?;
        let body = self.block()?;
        Ok(FuncDef { name, params, body, line })
    }

    fn param_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                params.push(self.ident()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(params)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let then = self.body()?;
        let otherwise = if self.eat(&TokenKind::Else) {
            if self.peek() == &TokenKind::If {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.body()?)
            }
        } else {
            None
        };
        Ok(Stmt::If { cond, then, otherwise })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        // for (k in o) / for (var k in o)
        let declared = self.peek() == &TokenKind::Var;
        let ident_next = match (self.peek(), self.peek2()) {
            (TokenKind::Ident(_), TokenKind::In) => true,
            (TokenKind::Var, TokenKind::Ident(_)) => {
                self.tokens.get(self.pos + 2).map(|t| t.kind == TokenKind::In).unwrap_or(false)
            }
            _ => false,
        };
        if ident_next {
            if declared {
                self.bump();
            }
            let var = self.ident()?;
            self.expect(TokenKind::In)?;
            let object = self.expression()?;
            self.expect(TokenKind::RParen)?;
            let body = self.body()?;
            return Ok(Stmt::ForIn { var, object, body, line });
        }

        let init = if self.eat(&TokenKind::Semi) {
            None
        } else if self.peek() == &TokenKind::Var {
            let stmt = self.var_statement()?;
            self.expect(TokenKind::Semi)?;
            Some(Box::new(stmt))
        } else {
            let expr = self.expression()?;
            self.expect(TokenKind::Semi)?;
            Some(Box::new(Stmt::Expr(expr)))
        };
        let cond = if self.peek() == &TokenKind::Semi { None } else { Some(self.expression()?) };
        self.expect(TokenKind::Semi)?;
        let step = if self.peek() == &TokenKind::RParen { None } else { Some(self.expression()?) };
        self.expect(TokenKind::RParen)?;
        let body = self.body()?;
        Ok(Stmt::For { init, cond, step, body })
    }

    // -- expressions --------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.ternary()?;
        let op = match self.peek() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::PercentAssign => Some(BinOp::Mod),
            _ => return Ok(target),
        };
        let line = self.line();
        if !matches!(target, Expr::Ident { .. } | Expr::Member { .. } | Expr::Index { .. }) {
            return Err(ParseError::Syntax {
                message: "invalid assignment target".to_string(),
                file: self.file.clone(),
                line,
            });
        }
        self.bump();
        let value = self.assignment()?;
        Ok(Expr::Assign { target: Box::new(target), op, value: Box::new(value), line })
    }

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let line = cond.line();
        let then = self.assignment()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.assignment()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            line,
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.peek() == &TokenKind::OrOr {
            let line = self.line();
            self.bump();
            let right = self.logical_and()?;
            left = Expr::Or { left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.bit_or()?;
        while self.peek() == &TokenKind::AndAnd {
            let line = self.line();
            self.bump();
            let right = self.bit_or()?;
            left = Expr::And { left: Box::new(left), right: Box::new(right), line };
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[(TokenKind::Pipe, BinOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[(TokenKind::Caret, BinOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[(TokenKind::Amp, BinOp::BitAnd)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (TokenKind::EqEq, BinOp::Eq),
                (TokenKind::NotEq, BinOp::Ne),
                (TokenKind::StrictEq, BinOp::StrictEq),
                (TokenKind::StrictNotEq, BinOp::StrictNe),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Ge, BinOp::Ge),
            ],
            Self::shift,
        )
    }

    fn shift(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::unary,
        )
    }

    fn binary_level(
        &mut self,
        table: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        'outer: loop {
            for (tok, op) in table {
                if self.peek() == tok {
                    let line = self.line();
                    self.bump();
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                        line,
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let op = match self.peek() {
            TokenKind::Not => Some(UnOp::Not),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::Typeof => Some(UnOp::TypeOf),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let delta = if self.peek() == &TokenKind::PlusPlus { 1 } else { -1 };
                self.bump();
                let name = self.ident()?;
                return Ok(Expr::Incr { name, delta, prefix: true, line });
            }
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let expr = self.unary()?;
            return Ok(Expr::Unary { op, expr: Box::new(expr), line });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.call_chain()?;
        if matches!(self.peek(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            if let Expr::Ident { name, line } = &expr {
                let delta = if self.peek() == &TokenKind::PlusPlus { 1 } else { -1 };
                self.bump();
                return Ok(Expr::Incr {
                    name: name.clone(),
                    delta,
                    prefix: false,
                    line: *line,
                });
            }
        }
        Ok(expr)
    }

    fn call_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = if self.peek() == &TokenKind::New {
            self.new_expr()?
        } else {
            self.primary()?
        };
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    let line = self.line();
                    self.bump();
                    let name = self.ident()?;
                    expr = Expr::Member { object: Box::new(expr), name, line };
                }
                TokenKind::LBracket => {
                    let line = self.line();
                    self.bump();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index), line };
                }
                TokenKind::LParen => {
                    let line = self.line();
                    let args = self.arg_list()?;
                    expr = Expr::Call { callee: Box::new(expr), args, line };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn new_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::New)?;
        // Member chain only; the argument list ends the constructor target.
        let mut callee = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    let line = self.line();
                    self.bump();
                    let name = self.ident()?;
                    callee = Expr::Member { object: Box::new(callee), name, line };
                }
                _ => break,
            }
        }
        let args =
            if self.peek() == &TokenKind::LParen { self.arg_list()? } else { Vec::new() };
        Ok(Expr::New { callee: Box::new(callee), args, line })
    }

    fn arg_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.assignment()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Undefined => {
                self.bump();
                Ok(Expr::Undefined { line })
            }
            TokenKind::Null => {
                self.bump();
                Ok(Expr::Null { line })
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Bool { value: true, line })
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Bool { value: false, line })
            }
            TokenKind::Int(value) => {
                self.bump();
                Ok(Expr::Int { value, line })
            }
            TokenKind::Num(value) => {
                self.bump();
                Ok(Expr::Num { value, line })
            }
            TokenKind::Str(value) => {
                self.bump();
                Ok(Expr::Str { value, line })
            }
            TokenKind::This => {
                self.bump();
                Ok(Expr::This { line })
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(Expr::Ident { name, line })
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.array_literal(),
            TokenKind::LBrace => self.object_literal(),
            TokenKind::Function => {
                self.bump();
                let name = match self.peek().clone() {
                    TokenKind::Ident(n) => {
                        self.bump();
                        n
                    }
                    _ => String::new(),
                };
                let params = self.param_list()?;
                let body = self.block()?;
                Ok(Expr::FuncExpr(FuncDef { name, params, body, line }))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        if !self.eat(&TokenKind::RBracket) {
            loop {
                items.push(self.assignment()?);
                if self.eat(&TokenKind::RBracket) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
                // Tolerate a trailing comma.
                if self.eat(&TokenKind::RBracket) {
                    break;
                }
            }
        }
        Ok(Expr::ArrayLit { items, line })
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        if !self.eat(&TokenKind::RBrace) {
            loop {
                let key = match self.peek().clone() {
                    TokenKind::Ident(name) => {
                        self.bump();
                        name
                    }
                    TokenKind::Str(name) => {
                        self.bump();
                        name
                    }
                    TokenKind::Int(n) => {
                        self.bump();
                        n.to_string()
                    }
                    _ => return Err(self.unexpected("property name")),
                };
                self.expect(TokenKind::Colon)?;
                props.push((key, self.assignment()?));
                if self.eat(&TokenKind::RBrace) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
                if self.eat(&TokenKind::RBrace) {
                    break;
                }
            }
        }
        Ok(Expr::ObjectLit { props, line })
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
