// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The script runner: one logical thread of interpretation.
//!
//! A runner advances a compiled [`CodeBlock`] instruction by instruction
//! over an explicit value stack and frame stack. It may only be advanced by
//! one OS thread at a time. Suspension is cooperative: a native binding
//! deposits a [`WorkItem`] and pauses, `execute()` reports `Incomplete`,
//! the driver runs the item (off any object lock) and pushes its result,
//! then re-enters `execute()` — exactly one resume per primitive.

use std::collections::VecDeque;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::code::{CodeBlock, Instr, Literal};
use crate::context::ScriptContext;
use crate::native::NativeOutcome;
use crate::object::{ObjKind, ObjRef};
use crate::value::{bin_op, un_op, FuncValue, ScriptedFunc, Value};

/// Sentinel return address closing the bottom frame of a `call()`.
const RET_DONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Invalid,
    Running,
    Incomplete,
    Succeeded,
    Failed,
}

/// A deferred host action producing the value a paused runner resumes with.
pub struct WorkItem {
    run: Box<dyn FnOnce() -> Value + Send>,
}

impl WorkItem {
    pub fn new(f: impl FnOnce() -> Value + Send + 'static) -> WorkItem {
        WorkItem { run: Box::new(f) }
    }

    pub fn run(self) -> Value {
        (self.run)()
    }
}

struct Frame {
    ret_code: Arc<CodeBlock>,
    ret_pc: usize,
    base: usize,
    locals: ObjRef,
    env: Option<ObjRef>,
    /// Receiver to substitute for a non-object return of `new`.
    construct: Option<ObjRef>,
}

static EMPTY_CODE: Lazy<Arc<CodeBlock>> = Lazy::new(|| {
    Arc::new(CodeBlock {
        path: Arc::from("<native>"),
        instrs: vec![Instr::End],
        lines: vec![0],
        funcs: Vec::new(),
        main: 0,
    })
});

pub struct Runner {
    code: Arc<CodeBlock>,
    context: Arc<ScriptContext>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    pc: usize,
    state: RunState,
    paused: bool,
    pending: VecDeque<WorkItem>,
    trace_id: Option<String>,
    title: String,
}

impl Runner {
    pub fn new(code: Arc<CodeBlock>, context: Arc<ScriptContext>, title: &str) -> Runner {
        let main = code.main;
        Runner {
            code,
            context,
            stack: Vec::new(),
            frames: Vec::new(),
            pc: main,
            state: RunState::Incomplete,
            paused: false,
            pending: VecDeque::new(),
            trace_id: None,
            title: title.to_string(),
        }
    }

    /// A runner with no script of its own, for driving function values.
    pub fn for_context(context: Arc<ScriptContext>, title: &str) -> Runner {
        Runner::new(Arc::clone(&EMPTY_CODE), context, title)
    }

    pub fn context(&self) -> &Arc<ScriptContext> {
        &self.context
    }

    pub fn code(&self) -> &Arc<CodeBlock> {
        &self.code
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn current_line(&self) -> u32 {
        self.code.line_at(self.pc.min(self.code.instrs.len().saturating_sub(1)))
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Set or clear the correlation tag carried into log lines.
    pub fn set_trace_id(&mut self, id: Option<String>) {
        self.trace_id = id.filter(|s| !s.is_empty());
    }

    /// True when the named global resolves to a callable.
    pub fn callable(&self, name: &str) -> bool {
        matches!(self.context.get_global(name), Value::Func(_))
    }

    /// Clear the stack; with `init` the next `execute()` re-runs the
    /// top-level, otherwise there is nothing left to run.
    pub fn reset(&mut self, init: bool) {
        self.stack.clear();
        self.frames.clear();
        self.pending.clear();
        self.paused = false;
        self.pc = if init { self.code.main } else { self.code.instrs.len() };
        self.state = RunState::Incomplete;
    }

    /// Hand control back to the driver after the current step.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Queue a work-item; the driver resumes the runner with its result.
    pub fn schedule(&mut self, item: WorkItem) {
        self.pending.push_back(item);
        self.paused = true;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Run every queued work-item, pushing each result. Returns the count.
    pub fn service_async(&mut self) -> usize {
        let mut n = 0;
        while let Some(item) = self.pending.pop_front() {
            let v = item.run();
            self.stack.push(v);
            n += 1;
        }
        self.paused = false;
        n
    }

    /// Advance until terminal state or a pause point.
    pub fn execute(&mut self) -> RunState {
        if self.state != RunState::Incomplete {
            return self.state;
        }
        self.state = RunState::Running;
        while self.state == RunState::Running {
            if self.pc >= self.code.instrs.len() {
                self.state = RunState::Succeeded;
                break;
            }
            self.step();
            if self.paused && self.state == RunState::Running {
                self.paused = false;
                self.state = RunState::Incomplete;
                break;
            }
        }
        self.state
    }

    /// Drive to a terminal state, servicing async work in between.
    pub fn run(&mut self) -> RunState {
        loop {
            match self.execute() {
                RunState::Incomplete => {
                    self.service_async();
                }
                s => return s,
            }
        }
    }

    /// Invoke a global function by name; the return value is left on the
    /// stack for the caller to pop.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> RunState {
        match self.context.get_global(name) {
            Value::Func(f) => self.call_value(&f, args),
            _ => {
                debug!(runner = %self.title, func = name, "call of unknown function");
                self.state = RunState::Failed;
                RunState::Failed
            }
        }
    }

    /// Invoke a function value with no receiver and drive it to the end.
    pub fn call_value(&mut self, func: &FuncValue, args: Vec<Value>) -> RunState {
        self.stack.clear();
        self.frames.clear();
        self.pending.clear();
        self.paused = false;
        self.state = RunState::Running;
        self.pc = RET_DONE;
        self.invoke(Value::Func(func.clone()), Value::Undefined, args, None);
        if self.state == RunState::Failed {
            return self.state;
        }
        if self.frames.is_empty() {
            // Native callee: it either finished or suspended exactly once.
            if self.paused {
                self.service_async();
            }
            self.state = RunState::Succeeded;
            return self.state;
        }
        self.state = RunState::Incomplete;
        self.run()
    }

    /// Pop the value a completed call left behind.
    pub fn pop_value(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    // -- interpreter core ---------------------------------------------------

    fn fail(&mut self, message: &str) {
        debug!(
            runner = %self.title,
            script = %self.code.path,
            line = self.current_line(),
            message,
            "runner failed"
        );
        self.state = RunState::Failed;
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let at = self.stack.len().saturating_sub(n);
        self.stack.split_off(at)
    }

    fn step(&mut self) {
        let pc = self.pc;
        self.pc += 1;
        let instr = self.code.instrs[pc].clone();
        match instr {
            Instr::Const(lit) => self.stack.push(literal_value(&lit)),
            Instr::LoadVar(name) => {
                let v = self.lookup(&name);
                self.stack.push(v);
            }
            Instr::StoreVar(name) => {
                let v = self.pop();
                self.store(&name, v);
            }
            Instr::DeclVar(name) => {
                let v = self.pop();
                match self.frames.last() {
                    Some(f) => {
                        f.locals.set(&name, v);
                    }
                    None => self.context.set_global(&name, v),
                }
            }
            Instr::GetProp(name) => {
                let target = self.pop();
                match target {
                    Value::Object(o) => self.stack.push(o.get(&name)),
                    Value::Str(s) => self.stack.push(string_prop(&s, &name)),
                    Value::Undefined | Value::Null => {
                        self.fail(&format!("cannot read property '{}' of {}", name, target.type_of()));
                    }
                    _ => self.stack.push(Value::Undefined),
                }
            }
            Instr::SetProp(name) => {
                let value = self.pop();
                let target = self.pop();
                match target {
                    Value::Object(o) => {
                        let adopted = self.context.adopt(&value);
                        o.set(&name, adopted);
                        self.stack.push(value);
                    }
                    Value::Undefined | Value::Null => {
                        self.fail(&format!("cannot set property '{}' of {}", name, target.type_of()));
                    }
                    _ => self.stack.push(value),
                }
            }
            Instr::GetIndex => {
                let key = self.pop();
                let target = self.pop();
                match target {
                    Value::Object(o) => self.stack.push(o.get(&key.to_prop_name())),
                    Value::Str(s) => {
                        let idx = key.to_int();
                        let ch = (idx >= 0)
                            .then(|| s.chars().nth(idx as usize))
                            .flatten()
                            .map(|c| Value::Str(c.to_string()))
                            .unwrap_or_default();
                        self.stack.push(ch);
                    }
                    Value::Undefined | Value::Null => self.fail("cannot index undefined"),
                    _ => self.stack.push(Value::Undefined),
                }
            }
            Instr::SetIndex => {
                let value = self.pop();
                let key = self.pop();
                let target = self.pop();
                match target {
                    Value::Object(o) => {
                        let adopted = self.context.adopt(&value);
                        o.set(&key.to_prop_name(), adopted);
                        self.stack.push(value);
                    }
                    Value::Undefined | Value::Null => self.fail("cannot index undefined"),
                    _ => self.stack.push(value),
                }
            }
            Instr::MakeArray(n) => {
                let items = self.pop_n(n as usize);
                let origin = self.code.origin(pc);
                let arr =
                    self.context.make_object_at(ObjKind::Array, self.code.line_at(pc), &origin);
                arr.set_length(items.len());
                for (i, v) in items.into_iter().enumerate() {
                    arr.set(&i.to_string(), v);
                }
                self.stack.push(Value::Object(arr));
            }
            Instr::MakeObject(keys) => {
                let values = self.pop_n(keys.len());
                let origin = self.code.origin(pc);
                let obj =
                    self.context.make_object_at(ObjKind::Plain, self.code.line_at(pc), &origin);
                for (k, v) in keys.iter().zip(values) {
                    obj.set(k, v);
                }
                self.stack.push(Value::Object(obj));
            }
            Instr::MakeFunc(i) => {
                let func = &self.code.funcs[i as usize];
                let env = self.frames.last().map(|f| Arc::clone(&f.locals));
                self.stack.push(Value::Func(FuncValue::Scripted(ScriptedFunc {
                    name: Arc::clone(&func.name),
                    code: Arc::clone(&self.code),
                    index: i as usize,
                    env,
                })));
            }
            Instr::Call(argc) => {
                let args = self.pop_n(argc as usize);
                let callee = self.pop();
                self.invoke(callee, Value::Undefined, args, None);
            }
            Instr::CallMethod(name, argc) => {
                let args = self.pop_n(argc as usize);
                let receiver = self.pop();
                self.call_method(receiver, &name, args);
            }
            Instr::New(argc) => {
                let args = self.pop_n(argc as usize);
                let callee = self.pop();
                let construct = match &callee {
                    Value::Func(FuncValue::Scripted(_)) => {
                        let origin = self.code.origin(pc);
                        Some(self.context.make_object_at(
                            ObjKind::Plain,
                            self.code.line_at(pc),
                            &origin,
                        ))
                    }
                    _ => None,
                };
                let this = construct.as_ref().map(|o| Value::Object(Arc::clone(o)));
                self.invoke(callee, this.unwrap_or_default(), args, construct);
            }
            Instr::Jump(target) => self.pc = target,
            Instr::JumpIfFalse(target) => {
                if !self.pop().to_bool() {
                    self.pc = target;
                }
            }
            Instr::JumpIfTruePeek(target) => {
                if self.stack.last().map(Value::to_bool).unwrap_or(false) {
                    self.pc = target;
                }
            }
            Instr::JumpIfFalsePeek(target) => {
                if !self.stack.last().map(Value::to_bool).unwrap_or(false) {
                    self.pc = target;
                }
            }
            Instr::Pop => {
                self.pop();
            }
            Instr::Dup => {
                let top = self.stack.last().cloned().unwrap_or_default();
                self.stack.push(top);
            }
            Instr::Bin(op) => {
                let b = self.pop();
                let a = self.pop();
                self.stack.push(bin_op(op, &a, &b));
            }
            Instr::Un(op) => {
                let v = self.pop();
                self.stack.push(un_op(op, &v));
            }
            Instr::IterKeys => {
                let target = self.pop();
                let keys = match target {
                    Value::Object(o) => o.keys(),
                    _ => Vec::new(),
                };
                let arr =
                    self.context.array_from(keys.into_iter().map(Value::Str).collect());
                self.stack.push(Value::Object(arr));
                self.stack.push(Value::Int(0));
            }
            Instr::IterNext(var, end) => {
                let idx = match self.stack.last() {
                    Some(Value::Int(i)) => *i as usize,
                    _ => {
                        self.fail("corrupt iterator state");
                        return;
                    }
                };
                let arr = match self.stack.get(self.stack.len().saturating_sub(2)) {
                    Some(Value::Object(o)) => Arc::clone(o),
                    _ => {
                        self.fail("corrupt iterator state");
                        return;
                    }
                };
                if idx < arr.length() {
                    let key = arr.get_own(&idx.to_string()).unwrap_or_default();
                    self.store(&var, key);
                    let top = self.stack.len() - 1;
                    self.stack[top] = Value::Int(idx as i64 + 1);
                } else {
                    self.pop();
                    self.pop();
                    self.pc = end;
                }
            }
            Instr::Return => {
                let Some(frame) = self.frames.pop() else {
                    self.state = RunState::Succeeded;
                    return;
                };
                let ret = if self.stack.len() > frame.base { self.pop() } else { Value::Undefined };
                self.stack.truncate(frame.base);
                let ret = match frame.construct {
                    Some(obj) if !matches!(ret, Value::Object(_)) => Value::Object(obj),
                    _ => ret,
                };
                self.stack.push(ret);
                if frame.ret_pc == RET_DONE {
                    self.state = RunState::Succeeded;
                    self.pc = self.code.instrs.len();
                } else {
                    self.code = frame.ret_code;
                    self.pc = frame.ret_pc;
                }
            }
            Instr::End => {
                self.state = RunState::Succeeded;
            }
        }
    }

    fn call_method(&mut self, receiver: Value, name: &str, args: Vec<Value>) {
        match receiver {
            Value::Object(obj) => {
                match obj.get(name) {
                    Value::Func(f) => {
                        self.invoke(Value::Func(f), Value::Object(obj), args, None)
                    }
                    Value::Undefined => {
                        match crate::stdlib::builtin_method(self, &obj, name, args) {
                            Some(NativeOutcome::Ret(v)) => self.stack.push(v),
                            Some(NativeOutcome::Suspend(item)) => self.schedule(item),
                            None => {
                                debug!(
                                    runner = %self.title,
                                    method = name,
                                    "call of missing method"
                                );
                                self.stack.push(Value::Undefined);
                            }
                        }
                    }
                    other => {
                        debug!(runner = %self.title, method = name, kind = other.type_of(),
                            "property is not callable");
                        self.stack.push(Value::Undefined);
                    }
                }
            }
            Value::Str(s) => {
                let v = crate::strings::string_method(self, &s, name, &args);
                self.stack.push(v.unwrap_or_default());
            }
            Value::Undefined | Value::Null => {
                self.fail(&format!("cannot call '{}' of {}", name, receiver.type_of()));
            }
            _ => self.stack.push(Value::Undefined),
        }
    }

    /// Call a function value: natives run in place, scripted functions push
    /// a frame and continue inside the callee's code block.
    fn invoke(
        &mut self,
        callee: Value,
        this: Value,
        args: Vec<Value>,
        construct: Option<ObjRef>,
    ) {
        match callee {
            Value::Func(FuncValue::Native(nf)) => {
                let f = Arc::clone(&nf.f);
                match f(self, this, args) {
                    NativeOutcome::Ret(v) => self.stack.push(v),
                    NativeOutcome::Suspend(item) => self.schedule(item),
                }
            }
            Value::Func(FuncValue::Scripted(sf)) => {
                let func = &sf.code.funcs[sf.index];
                let locals = self.context.make_object_at(
                    ObjKind::Plain,
                    func_line(&sf),
                    "locals",
                );
                locals.set("this", this);
                for (i, param) in func.params.iter().enumerate() {
                    locals.set(param, args.get(i).cloned().unwrap_or_default());
                }
                let entry = func.entry;
                self.frames.push(Frame {
                    ret_code: Arc::clone(&self.code),
                    ret_pc: self.pc,
                    base: self.stack.len(),
                    locals,
                    env: sf.env.clone(),
                    construct,
                });
                self.code = Arc::clone(&sf.code);
                self.pc = entry;
            }
            // Constructor objects: callable through their `__invoke__` slot,
            // which lets a callable carry static methods as properties.
            Value::Object(obj) => match obj.get_own("__invoke__") {
                Some(Value::Func(f)) => self.invoke(Value::Func(f), this, args, construct),
                _ => {
                    debug!(runner = %self.title, "object callee is not invokable");
                    self.stack.push(Value::Undefined);
                }
            },
            other => {
                debug!(runner = %self.title, kind = other.type_of(), "callee is not a function");
                self.stack.push(Value::Undefined);
            }
        }
    }

    // -- name resolution ----------------------------------------------------

    fn lookup(&self, name: &str) -> Value {
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.locals.get_own(name) {
                return v;
            }
            let mut env = frame.env.clone();
            while let Some(e) = env {
                if let Some(v) = e.get_own(name) {
                    return v;
                }
                env = e.proto();
            }
        }
        self.context.get_global(name)
    }

    fn store(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last() {
            if frame.locals.has_own(name) {
                frame.locals.set(name, value);
                return;
            }
            let mut env = frame.env.clone();
            while let Some(e) = env {
                if e.has_own(name) {
                    e.set(name, value);
                    return;
                }
                env = e.proto();
            }
        }
        self.context.set_global(name, value);
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("title", &self.title)
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("stack", &self.stack.len())
            .field("frames", &self.frames.len())
            .finish()
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Num(n) => Value::Num(*n),
        Literal::Str(s) => Value::Str(s.to_string()),
    }
}

fn string_prop(s: &str, name: &str) -> Value {
    match name {
        "length" => Value::Int(s.chars().count() as i64),
        _ => Value::Undefined,
    }
}

fn func_line(sf: &ScriptedFunc) -> u32 {
    sf.code.funcs.get(sf.index).map(|f| sf.code.line_at(f.entry)).unwrap_or(0)
}

/// Call a function value to completion on a scratch runner.
///
/// Used by native re-entry points (array sort comparators, timer firing on
/// a fresh context) that need an isolated call.
pub fn call_function(
    context: &Arc<ScriptContext>,
    func: &FuncValue,
    args: Vec<Value>,
) -> Result<Value, RunState> {
    let mut runner = Runner::for_context(Arc::clone(context), "isolated");
    match runner.call_value(func, args) {
        RunState::Succeeded => Ok(runner.pop_value().unwrap_or_default()),
        state => Err(state),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
