// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AST → instruction-list compiler.
//!
//! Function bodies are compiled inline behind a jump-around; declaring one
//! at run time pushes a function value capturing the current scope. Every
//! expression nets exactly one stack slot, so statement compilation ends
//! with a single `Pop` and loops stay stack-neutral (the `for (k in o)`
//! iterator keeps two slots that `break` must discard).

use std::sync::Arc;

use crate::ast::{Expr, FuncDef, Stmt};
use crate::code::{BinOp, CodeBlock, FuncCode, Instr, Literal};

struct LoopCtx {
    breaks: Vec<usize>,
    continues: Vec<usize>,
    /// Stack slots the loop keeps live (2 for `for..in`).
    cleanup: usize,
}

struct Compiler {
    instrs: Vec<Instr>,
    lines: Vec<u32>,
    funcs: Vec<FuncCode>,
    loops: Vec<LoopCtx>,
    line: u32,
}

pub fn compile(program: &[Stmt], path: &str) -> CodeBlock {
    let mut c = Compiler { instrs: Vec::new(), lines: Vec::new(), funcs: Vec::new(), loops: Vec::new(), line: 1 };
    for stmt in program {
        c.stmt(stmt);
    }
    c.emit(Instr::End);
    CodeBlock { path: Arc::from(path), instrs: c.instrs, lines: c.lines, funcs: c.funcs, main: 0 }
}

impl Compiler {
    fn emit(&mut self, instr: Instr) -> usize {
        self.instrs.push(instr);
        self.lines.push(self.line);
        self.instrs.len() - 1
    }

    fn here(&self) -> usize {
        self.instrs.len()
    }

    fn patch_jump(&mut self, at: usize) {
        let target = self.here();
        match &mut self.instrs[at] {
            Instr::Jump(t)
            | Instr::JumpIfFalse(t)
            | Instr::JumpIfTruePeek(t)
            | Instr::JumpIfFalsePeek(t)
            | Instr::IterNext(_, t) => *t = target,
            _ => {}
        }
    }

    fn patch_jump_to(&mut self, at: usize, target: usize) {
        match &mut self.instrs[at] {
            Instr::Jump(t)
            | Instr::JumpIfFalse(t)
            | Instr::JumpIfTruePeek(t)
            | Instr::JumpIfFalsePeek(t)
            | Instr::IterNext(_, t) => *t = target,
            _ => {}
        }
    }

    // -- statements ---------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => {}
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(s);
                }
            }
            Stmt::Var { name, init, line } => {
                self.line = *line;
                match init {
                    Some(e) => self.expr(e),
                    None => {
                        self.emit(Instr::Const(Literal::Undefined));
                    }
                }
                self.emit(Instr::DeclVar(Arc::from(name.as_str())));
            }
            Stmt::Func(def) => {
                self.line = def.line;
                let idx = self.declare_func(def);
                self.emit(Instr::MakeFunc(idx));
                self.emit(Instr::DeclVar(Arc::from(def.name.as_str())));
            }
            Stmt::Expr(e) => {
                self.expr(e);
                self.emit(Instr::Pop);
            }
            Stmt::If { cond, then, otherwise } => {
                self.expr(cond);
                let to_else = self.emit(Instr::JumpIfFalse(0));
                for s in then {
                    self.stmt(s);
                }
                match otherwise {
                    Some(stmts) => {
                        let to_end = self.emit(Instr::Jump(0));
                        self.patch_jump(to_else);
                        for s in stmts {
                            self.stmt(s);
                        }
                        self.patch_jump(to_end);
                    }
                    None => self.patch_jump(to_else),
                }
            }
            Stmt::While { cond, body } => {
                let start = self.here();
                self.expr(cond);
                let to_end = self.emit(Instr::JumpIfFalse(0));
                self.loops.push(LoopCtx { breaks: vec![], continues: vec![], cleanup: 0 });
                for s in body {
                    self.stmt(s);
                }
                self.emit(Instr::Jump(start));
                self.patch_jump(to_end);
                self.end_loop(start);
            }
            Stmt::DoWhile { body, cond } => {
                let start = self.here();
                self.loops.push(LoopCtx { breaks: vec![], continues: vec![], cleanup: 0 });
                for s in body {
                    self.stmt(s);
                }
                let cond_at = self.here();
                self.expr(cond);
                let to_end = self.emit(Instr::JumpIfFalse(0));
                self.emit(Instr::Jump(start));
                self.patch_jump(to_end);
                self.end_loop(cond_at);
            }
            Stmt::For { init, cond, step, body } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                let cond_at = self.here();
                let to_end = match cond {
                    Some(c) => {
                        self.expr(c);
                        Some(self.emit(Instr::JumpIfFalse(0)))
                    }
                    None => None,
                };
                self.loops.push(LoopCtx { breaks: vec![], continues: vec![], cleanup: 0 });
                for s in body {
                    self.stmt(s);
                }
                let step_at = self.here();
                if let Some(s) = step {
                    self.expr(s);
                    self.emit(Instr::Pop);
                }
                self.emit(Instr::Jump(cond_at));
                if let Some(at) = to_end {
                    self.patch_jump(at);
                }
                self.end_loop(step_at);
            }
            Stmt::ForIn { var, object, body, line } => {
                self.line = *line;
                self.emit(Instr::Const(Literal::Undefined));
                self.emit(Instr::DeclVar(Arc::from(var.as_str())));
                self.expr(object);
                self.emit(Instr::IterKeys);
                let next_at = self.emit(Instr::IterNext(Arc::from(var.as_str()), 0));
                self.loops.push(LoopCtx { breaks: vec![], continues: vec![], cleanup: 2 });
                for s in body {
                    self.stmt(s);
                }
                self.emit(Instr::Jump(next_at));
                self.patch_jump(next_at);
                self.end_loop(next_at);
            }
            Stmt::Return { value, line } => {
                self.line = *line;
                match value {
                    Some(e) => self.expr(e),
                    None => {
                        self.emit(Instr::Const(Literal::Undefined));
                    }
                }
                self.emit(Instr::Return);
            }
            Stmt::Break { line } => {
                self.line = *line;
                let cleanup = self.loops.last().map(|l| l.cleanup).unwrap_or(0);
                for _ in 0..cleanup {
                    self.emit(Instr::Pop);
                }
                let at = self.emit(Instr::Jump(0));
                if let Some(ctx) = self.loops.last_mut() {
                    ctx.breaks.push(at);
                }
            }
            Stmt::Continue { line } => {
                self.line = *line;
                let at = self.emit(Instr::Jump(0));
                if let Some(ctx) = self.loops.last_mut() {
                    ctx.continues.push(at);
                }
            }
        }
    }

    /// Patch break/continue targets of the innermost loop.
    fn end_loop(&mut self, continue_target: usize) {
        if let Some(ctx) = self.loops.pop() {
            for at in ctx.breaks {
                self.patch_jump(at);
            }
            for at in ctx.continues {
                self.patch_jump_to(at, continue_target);
            }
        }
    }

    /// Compile a function body behind a jump-around; returns its index.
    fn declare_func(&mut self, def: &FuncDef) -> u16 {
        let over = self.emit(Instr::Jump(0));
        let entry = self.here();
        // A loop spanning a function boundary must not capture its jumps.
        let outer_loops = std::mem::take(&mut self.loops);
        for s in &def.body {
            self.stmt(s);
        }
        self.emit(Instr::Const(Literal::Undefined));
        self.emit(Instr::Return);
        self.loops = outer_loops;
        self.patch_jump(over);
        let name: Arc<str> = if def.name.is_empty() {
            Arc::from("anonymous")
        } else {
            Arc::from(def.name.as_str())
        };
        self.funcs.push(FuncCode {
            name,
            params: def.params.iter().map(|p| Arc::from(p.as_str())).collect(),
            entry,
        });
        (self.funcs.len() - 1) as u16
    }

    // -- expressions --------------------------------------------------------

    fn expr(&mut self, e: &Expr) {
        self.line = e.line();
        match e {
            Expr::Undefined { .. } => {
                self.emit(Instr::Const(Literal::Undefined));
            }
            Expr::Null { .. } => {
                self.emit(Instr::Const(Literal::Null));
            }
            Expr::Bool { value, .. } => {
                self.emit(Instr::Const(Literal::Bool(*value)));
            }
            Expr::Int { value, .. } => {
                self.emit(Instr::Const(Literal::Int(*value)));
            }
            Expr::Num { value, .. } => {
                self.emit(Instr::Const(Literal::Num(*value)));
            }
            Expr::Str { value, .. } => {
                self.emit(Instr::Const(Literal::Str(Arc::from(value.as_str()))));
            }
            Expr::Ident { name, .. } => {
                self.emit(Instr::LoadVar(Arc::from(name.as_str())));
            }
            Expr::This { .. } => {
                self.emit(Instr::LoadVar(Arc::from("this")));
            }
            Expr::Member { object, name, .. } => {
                self.expr(object);
                self.emit(Instr::GetProp(Arc::from(name.as_str())));
            }
            Expr::Index { object, index, .. } => {
                self.expr(object);
                self.expr(index);
                self.emit(Instr::GetIndex);
            }
            Expr::Call { callee, args, .. } => self.call(callee, args),
            Expr::New { callee, args, .. } => {
                self.expr(callee);
                for a in args {
                    self.expr(a);
                }
                self.emit(Instr::New(args.len() as u8));
            }
            Expr::Unary { op, expr, .. } => {
                self.expr(expr);
                self.emit(Instr::Un(*op));
            }
            Expr::Binary { op, left, right, .. } => {
                self.expr(left);
                self.expr(right);
                self.emit(Instr::Bin(*op));
            }
            Expr::And { left, right, .. } => {
                self.expr(left);
                let to_end = self.emit(Instr::JumpIfFalsePeek(0));
                self.emit(Instr::Pop);
                self.expr(right);
                self.patch_jump(to_end);
            }
            Expr::Or { left, right, .. } => {
                self.expr(left);
                let to_end = self.emit(Instr::JumpIfTruePeek(0));
                self.emit(Instr::Pop);
                self.expr(right);
                self.patch_jump(to_end);
            }
            Expr::Ternary { cond, then, otherwise, .. } => {
                self.expr(cond);
                let to_else = self.emit(Instr::JumpIfFalse(0));
                self.expr(then);
                let to_end = self.emit(Instr::Jump(0));
                self.patch_jump(to_else);
                self.expr(otherwise);
                self.patch_jump(to_end);
            }
            Expr::Assign { target, op, value, .. } => self.assign(target, *op, value),
            Expr::Incr { name, delta, prefix, .. } => {
                let name: Arc<str> = Arc::from(name.as_str());
                self.emit(Instr::LoadVar(Arc::clone(&name)));
                if *prefix {
                    self.emit(Instr::Const(Literal::Int(*delta)));
                    self.emit(Instr::Bin(BinOp::Add));
                    self.emit(Instr::Dup);
                } else {
                    self.emit(Instr::Dup);
                    self.emit(Instr::Const(Literal::Int(*delta)));
                    self.emit(Instr::Bin(BinOp::Add));
                }
                self.emit(Instr::StoreVar(name));
            }
            Expr::ArrayLit { items, .. } => {
                for item in items {
                    self.expr(item);
                }
                self.emit(Instr::MakeArray(items.len() as u16));
            }
            Expr::ObjectLit { props, .. } => {
                let keys: Arc<[Arc<str>]> =
                    props.iter().map(|(k, _)| Arc::from(k.as_str())).collect();
                for (_, v) in props {
                    self.expr(v);
                }
                self.emit(Instr::MakeObject(keys));
            }
            Expr::FuncExpr(def) => {
                let idx = self.declare_func(def);
                self.emit(Instr::MakeFunc(idx));
            }
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) {
        match callee {
            Expr::Member { object, name, .. } => {
                self.expr(object);
                for a in args {
                    self.expr(a);
                }
                self.emit(Instr::CallMethod(Arc::from(name.as_str()), args.len() as u8));
            }
            other => {
                self.expr(other);
                for a in args {
                    self.expr(a);
                }
                self.emit(Instr::Call(args.len() as u8));
            }
        }
    }

    fn assign(&mut self, target: &Expr, op: Option<BinOp>, value: &Expr) {
        match target {
            Expr::Ident { name, .. } => {
                let name: Arc<str> = Arc::from(name.as_str());
                if let Some(op) = op {
                    self.emit(Instr::LoadVar(Arc::clone(&name)));
                    self.expr(value);
                    self.emit(Instr::Bin(op));
                } else {
                    self.expr(value);
                }
                self.emit(Instr::Dup);
                self.emit(Instr::StoreVar(name));
            }
            Expr::Member { object, name, .. } => {
                let name: Arc<str> = Arc::from(name.as_str());
                self.expr(object);
                if let Some(op) = op {
                    self.emit(Instr::Dup);
                    self.emit(Instr::GetProp(Arc::clone(&name)));
                    self.expr(value);
                    self.emit(Instr::Bin(op));
                } else {
                    self.expr(value);
                }
                self.emit(Instr::SetProp(name));
            }
            Expr::Index { object, index, .. } => {
                self.expr(object);
                self.expr(index);
                if let Some(op) = op {
                    // Re-evaluate the pair for the read side.
                    self.expr(object);
                    self.expr(index);
                    self.emit(Instr::GetIndex);
                    self.expr(value);
                    self.emit(Instr::Bin(op));
                } else {
                    self.expr(value);
                }
                self.emit(Instr::SetIndex);
            }
            other => {
                // The parser rejects these; compile defensively as a read.
                self.expr(other);
            }
        }
    }
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod tests;
