// ABOUTME: Tree-walking evaluator executing the Duso AST

use crate::ast::{
    BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, TemplatePart, UnaryOp,
};
use crate::env::Environment;
use crate::error::{DusoError, Frame};
use crate::token::Position;
use crate::value::{ArrayRef, Function, NativeFn, ObjectRef, Value};
use indexmap::IndexMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-local exits from statement execution. These are a separate channel
/// from DusoError so `try` can never swallow them.
#[derive(Debug)]
pub enum Control {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

/// A resolved assignment destination. Targets are resolved once so that
/// compound assignment and `++`/`--` evaluate their index expressions a
/// single time.
enum Place {
    Var(String),
    ArrayElem(ArrayRef, i64),
    ObjectKey(ObjectRef, String),
}

pub struct Evaluator {
    file: String,
    stack: Vec<Frame>,
    cancelled: Arc<AtomicBool>,
}

impl Evaluator {
    pub fn new(file: &str, cancelled: Arc<AtomicBool>) -> Self {
        Evaluator {
            file: file.to_string(),
            stack: Vec::new(),
            cancelled,
        }
    }

    fn error(&self, message: impl Into<String>, pos: Position) -> DusoError {
        DusoError::new(message, &self.file, pos).with_stack(self.stack.clone())
    }

    /// Run a program for its side effects. Stray control signals at the
    /// top level are runtime errors.
    pub fn exec_program(
        &mut self,
        program: &Program,
        env: &Rc<Environment>,
    ) -> Result<(), DusoError> {
        for stmt in &program.statements {
            match self.exec_stmt(stmt, env)? {
                Control::Value(_) => {}
                Control::Return(_) => {
                    return Err(self.error("'return' outside function", stmt.pos));
                }
                Control::Break => return Err(self.error("'break' outside loop", stmt.pos)),
                Control::Continue => {
                    return Err(self.error("'continue' outside loop", stmt.pos));
                }
            }
        }
        Ok(())
    }

    /// Run a program as a module: the value of the final expression
    /// statement (or an explicit top-level `return`) is the export.
    pub fn exec_module(
        &mut self,
        program: &Program,
        env: &Rc<Environment>,
    ) -> Result<Value, DusoError> {
        let mut last = Value::Nil;
        for stmt in &program.statements {
            match self.exec_stmt(stmt, env)? {
                Control::Value(v) => {
                    if matches!(stmt.kind, StmtKind::Expression(_)) {
                        last = v;
                    }
                }
                Control::Return(v) => return Ok(v),
                Control::Break => return Err(self.error("'break' outside loop", stmt.pos)),
                Control::Continue => {
                    return Err(self.error("'continue' outside loop", stmt.pos));
                }
            }
        }
        Ok(last)
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &Rc<Environment>) -> Result<Control, DusoError> {
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Control::Value(_) => {}
                signal => return Ok(signal),
            }
        }
        Ok(Control::Value(Value::Nil))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Control, DusoError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(self.error("execution cancelled", stmt.pos));
        }
        match &stmt.kind {
            StmtKind::If {
                condition,
                then_block,
                elseif_branches,
                else_block,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    return self.exec_block(then_block, env);
                }
                for (cond, block) in elseif_branches {
                    if self.eval_expr(cond, env)?.is_truthy() {
                        return self.exec_block(block, env);
                    }
                }
                if let Some(block) = else_block {
                    return self.exec_block(block, env);
                }
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::While { condition, body } => {
                while self.eval_expr(condition, env)?.is_truthy() {
                    match self.exec_block(body, env)? {
                        Control::Value(_) | Control::Continue => {}
                        Control::Break => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                }
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::ForNumeric {
                var,
                start,
                end,
                step,
                body,
            } => {
                let start_n = self.eval_number(start, env, "start")?;
                let end_n = self.eval_number(end, env, "end")?;
                let step_n = match step {
                    Some(expr) => self.eval_number(expr, env, "step")?,
                    None => 1.0,
                };
                if step_n == 0.0 {
                    return Err(self.error("for loop step must not be zero", stmt.pos));
                }
                let mut i = start_n;
                while (step_n > 0.0 && i <= end_n) || (step_n < 0.0 && i >= end_n) {
                    // Fresh scope per iteration so closures capture distinct values
                    let scope = Environment::with_parent(env.clone());
                    scope.define(var.clone(), Value::Number(i));
                    match self.exec_block(body, &scope)? {
                        Control::Value(_) | Control::Continue => {}
                        Control::Break => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                    i += step_n;
                }
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::ForIter {
                var,
                iterable,
                body,
            } => {
                let value = self.eval_expr(iterable, env)?;
                match value {
                    Value::Array(items) => {
                        let snapshot: Vec<Value> = items.borrow().clone();
                        for item in snapshot {
                            let scope = Environment::with_parent(env.clone());
                            scope.define(var.clone(), item);
                            match self.exec_block(body, &scope)? {
                                Control::Value(_) | Control::Continue => {}
                                Control::Break => break,
                                ret @ Control::Return(_) => return Ok(ret),
                            }
                        }
                    }
                    Value::Object(entries) => {
                        let keys: Vec<String> = entries.borrow().keys().cloned().collect();
                        for key in keys {
                            let scope = Environment::with_parent(env.clone());
                            scope.define(var.clone(), Value::Str(key));
                            match self.exec_block(body, &scope)? {
                                Control::Value(_) | Control::Continue => {}
                                Control::Break => break,
                                ret @ Control::Return(_) => return Ok(ret),
                            }
                        }
                    }
                    other => {
                        return Err(self.error(
                            format!("cannot iterate over {}", other.type_name()),
                            iterable.pos,
                        ));
                    }
                }
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::FunctionDef { name, params, body } => {
                let func = Value::Function(Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    env: env.clone(),
                }));
                env.define(name.clone(), func);
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::Try {
                body,
                catch_name,
                catch_body,
            } => match self.exec_block(body, env) {
                Ok(control) => Ok(control),
                Err(err) => {
                    // Only the message string is visible to the script
                    let scope = Environment::with_parent(env.clone());
                    scope.define(catch_name.clone(), Value::Str(err.message));
                    self.exec_block(catch_body, &scope)
                }
            },

            StmtKind::Return(value) => {
                let v = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Control::Return(v))
            }

            StmtKind::Break => Ok(Control::Break),
            StmtKind::Continue => Ok(Control::Continue),

            StmtKind::Assign {
                target,
                value,
                local,
            } => {
                let v = self.eval_expr(value, env)?;
                if *local {
                    match &target.kind {
                        ExprKind::Identifier(name) => env.define(name.clone(), v),
                        _ => return Err(self.error("invalid assignment target", target.pos)),
                    }
                } else {
                    let place = self.resolve_place(target, env)?;
                    self.write_place(place, v, env, target.pos)?;
                }
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::CompoundAssign { target, op, value } => {
                let place = self.resolve_place(target, env)?;
                let current = self.read_place(&place, env, target.pos)?;
                let rhs = self.eval_expr(value, env)?;
                let result = self.apply_binary(*op, current, rhs, target.pos)?;
                self.write_place(place, result, env, target.pos)?;
                Ok(Control::Value(Value::Nil))
            }

            StmtKind::PostIncrement { target, decrement } => {
                let op_text = if *decrement { "--" } else { "++" };
                let place = self.resolve_place(target, env)?;
                let current = self.read_place(&place, env, target.pos)?;
                match current {
                    Value::Number(n) => {
                        let next = if *decrement { n - 1.0 } else { n + 1.0 };
                        self.write_place(place, Value::Number(next), env, target.pos)?;
                        Ok(Control::Value(Value::Nil))
                    }
                    other => Err(self.error(
                        format!("'{}' requires a number, got {}", op_text, other.type_name()),
                        target.pos,
                    )),
                }
            }

            StmtKind::Expression(expr) => Ok(Control::Value(self.eval_expr(expr, env)?)),
        }
    }

    fn eval_number(
        &mut self,
        expr: &Expr,
        env: &Rc<Environment>,
        what: &str,
    ) -> Result<f64, DusoError> {
        match self.eval_expr(expr, env)? {
            Value::Number(n) => Ok(n),
            other => Err(self.error(
                format!("for loop {} must be a number, got {}", what, other.type_name()),
                expr.pos,
            )),
        }
    }

    // ========================================================================
    // Assignment targets
    // ========================================================================

    fn resolve_place(&mut self, target: &Expr, env: &Rc<Environment>) -> Result<Place, DusoError> {
        match &target.kind {
            ExprKind::Identifier(name) => Ok(Place::Var(name.clone())),
            ExprKind::Index { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                match obj {
                    Value::Array(items) => {
                        let i = self.array_index(&idx, target.pos)?;
                        Ok(Place::ArrayElem(items, i))
                    }
                    Value::Object(entries) => match idx {
                        Value::Str(key) => Ok(Place::ObjectKey(entries, key)),
                        other => Err(self.error(
                            format!("object key must be a string, got {}", other.type_name()),
                            target.pos,
                        )),
                    },
                    other => Err(self.error(
                        format!("cannot index {}", other.type_name()),
                        target.pos,
                    )),
                }
            }
            ExprKind::Property { object, name } => {
                match self.eval_expr(object, env)? {
                    Value::Object(entries) => Ok(Place::ObjectKey(entries, name.clone())),
                    other => Err(self.error(
                        format!(
                            "cannot set property '{}' on {}",
                            name,
                            other.type_name()
                        ),
                        target.pos,
                    )),
                }
            }
            _ => Err(self.error("invalid assignment target", target.pos)),
        }
    }

    fn read_place(
        &self,
        place: &Place,
        env: &Rc<Environment>,
        pos: Position,
    ) -> Result<Value, DusoError> {
        match place {
            Place::Var(name) => env
                .get(name)
                .ok_or_else(|| self.error(format!("undefined variable '{}'", name), pos)),
            Place::ArrayElem(items, i) => {
                let items = items.borrow();
                if *i < 0 || *i as usize >= items.len() {
                    Err(self.error(
                        format!("array index {} out of bounds (len {})", i, items.len()),
                        pos,
                    ))
                } else {
                    Ok(items[*i as usize].clone())
                }
            }
            Place::ObjectKey(entries, key) => {
                Ok(entries.borrow().get(key).cloned().unwrap_or(Value::Nil))
            }
        }
    }

    /// Write through a resolved place. Array writes overwrite in range,
    /// append at exactly `len`, and error past that or below zero.
    fn write_place(
        &self,
        place: Place,
        value: Value,
        env: &Rc<Environment>,
        pos: Position,
    ) -> Result<(), DusoError> {
        match place {
            Place::Var(name) => {
                env.set(&name, value);
                Ok(())
            }
            Place::ArrayElem(items, i) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                if i >= 0 && (i as usize) < len {
                    items[i as usize] = value;
                    Ok(())
                } else if i >= 0 && i as usize == len {
                    items.push(value);
                    Ok(())
                } else {
                    Err(self.error(
                        format!("array index {} out of bounds for assignment (len {})", i, len),
                        pos,
                    ))
                }
            }
            Place::ObjectKey(entries, key) => {
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
        }
    }

    fn array_index(&self, idx: &Value, pos: Position) -> Result<i64, DusoError> {
        match idx {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            Value::Number(_) => Err(self.error("array index must be an integer", pos)),
            other => Err(self.error(
                format!("array index must be a number, got {}", other.type_name()),
                pos,
            )),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, DusoError> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Nil => Ok(Value::Nil),

            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env)?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Object(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let v = self.eval_expr(value, env)?;
                    map.insert(key.clone(), v);
                }
                Ok(Value::object(map))
            }

            ExprKind::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(inner) => {
                            let v = self.eval_expr(inner, env)?;
                            out.push_str(&v.to_string());
                        }
                    }
                }
                Ok(Value::Str(out))
            }

            ExprKind::Identifier(name) => env
                .get(name)
                .ok_or_else(|| self.error(format!("undefined variable '{}'", name), expr.pos)),

            ExprKind::Binary { op, left, right } => match op {
                // and/or return the deciding operand itself, not a boolean
                BinaryOp::And => {
                    let l = self.eval_expr(left, env)?;
                    if l.is_truthy() {
                        self.eval_expr(right, env)
                    } else {
                        Ok(l)
                    }
                }
                BinaryOp::Or => {
                    let l = self.eval_expr(left, env)?;
                    if l.is_truthy() {
                        Ok(l)
                    } else {
                        self.eval_expr(right, env)
                    }
                }
                _ => {
                    let l = self.eval_expr(left, env)?;
                    let r = self.eval_expr(right, env)?;
                    self.apply_binary(*op, l, r, expr.pos)
                }
            },

            ExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Neg => match v {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(self.error(
                            format!("unary '-' requires a number, got {}", other.type_name()),
                            expr.pos,
                        )),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                }
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    self.eval_expr(then_branch, env)
                } else {
                    self.eval_expr(else_branch, env)
                }
            }

            ExprKind::Index { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                match obj {
                    Value::Array(items) => {
                        let i = self.array_index(&idx, expr.pos)?;
                        let items = items.borrow();
                        if i < 0 || i as usize >= items.len() {
                            Err(self.error(
                                format!("array index {} out of bounds (len {})", i, items.len()),
                                expr.pos,
                            ))
                        } else {
                            Ok(items[i as usize].clone())
                        }
                    }
                    Value::Object(entries) => match idx {
                        Value::Str(key) => {
                            Ok(entries.borrow().get(&key).cloned().unwrap_or(Value::Nil))
                        }
                        other => Err(self.error(
                            format!("object key must be a string, got {}", other.type_name()),
                            expr.pos,
                        )),
                    },
                    other => Err(self.error(
                        format!("cannot index {}", other.type_name()),
                        expr.pos,
                    )),
                }
            }

            ExprKind::Property { object, name } => {
                match self.eval_expr(object, env)? {
                    // Missing keys read as nil
                    Value::Object(entries) => {
                        Ok(entries.borrow().get(name).cloned().unwrap_or(Value::Nil))
                    }
                    other => Err(self.error(
                        format!("cannot read property '{}' of {}", name, other.type_name()),
                        expr.pos,
                    )),
                }
            }

            ExprKind::Call {
                callee,
                args,
                named_args,
            } => self.eval_call(expr, callee, args, named_args, env),

            ExprKind::FunctionExpr { params, body } => Ok(Value::Function(Rc::new(Function {
                name: String::new(),
                params: params.clone(),
                body: Rc::new(body.clone()),
                env: env.clone(),
            }))),
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn eval_call(
        &mut self,
        call: &Expr,
        callee: &Expr,
        args: &[Expr],
        named_args: &[(String, Expr)],
        env: &Rc<Environment>,
    ) -> Result<Value, DusoError> {
        // `obj.member(args)` dispatches on the member without re-evaluating
        // the owner; a user function member becomes a method call with the
        // owner's fields in scope.
        if let ExprKind::Property { object, name } = &callee.kind {
            let owner = self.eval_expr(object, env)?;
            return match owner {
                Value::Object(entries) => {
                    let member = entries.borrow().get(name).cloned().unwrap_or(Value::Nil);
                    let (pos_args, named) = self.eval_args(args, named_args, env)?;
                    match member {
                        Value::Function(func) => self.call_function(
                            &func,
                            pos_args,
                            named,
                            Some(entries.clone()),
                            call.pos,
                        ),
                        Value::Native(native) => self.call_native(&native, pos_args, named, call.pos),
                        Value::Object(template) => Ok(construct_object(&template, named)),
                        other => Err(self.error(
                            format!("'{}' is not callable (got {})", name, other.type_name()),
                            call.pos,
                        )),
                    }
                }
                other => Err(self.error(
                    format!("cannot read property '{}' of {}", name, other.type_name()),
                    callee.pos,
                )),
            };
        }

        let callee_val = self.eval_expr(callee, env)?;
        let (pos_args, named) = self.eval_args(args, named_args, env)?;
        match callee_val {
            Value::Function(func) => self.call_function(&func, pos_args, named, None, call.pos),
            Value::Native(native) => self.call_native(&native, pos_args, named, call.pos),
            // Calling an object clones it: the constructor-template idiom
            Value::Object(template) => Ok(construct_object(&template, named)),
            other => Err(self.error(
                format!("value of type {} is not callable", other.type_name()),
                call.pos,
            )),
        }
    }

    fn eval_args(
        &mut self,
        args: &[Expr],
        named_args: &[(String, Expr)],
        env: &Rc<Environment>,
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), DusoError> {
        let mut pos_args = Vec::with_capacity(args.len());
        for arg in args {
            pos_args.push(self.eval_expr(arg, env)?);
        }
        let mut named = Vec::with_capacity(named_args.len());
        for (name, arg) in named_args {
            named.push((name.clone(), self.eval_expr(arg, env)?));
        }
        Ok((pos_args, named))
    }

    /// Call a user function. The call scope's parent is the function's
    /// captured environment (not the caller's); for a method call the
    /// owner's fields slot in between the two.
    pub fn call_function(
        &mut self,
        func: &Rc<Function>,
        pos_args: Vec<Value>,
        named: Vec<(String, Value)>,
        self_fields: Option<ObjectRef>,
        call_pos: Position,
    ) -> Result<Value, DusoError> {
        let parent = match self_fields {
            Some(fields) => Environment::with_fields(fields, func.env.clone()),
            None => func.env.clone(),
        };
        let scope = Environment::with_parent(parent);

        // Positionals fill left-to-right, named arguments bind by name,
        // defaults evaluate in the defining environment, the rest are nil.
        // Unknown named arguments and extra positionals are ignored.
        for (i, param) in func.params.iter().enumerate() {
            let named_value = named
                .iter()
                .find(|(n, _)| n == &param.name)
                .map(|(_, v)| v.clone());
            let value = if let Some(v) = named_value {
                v
            } else if i < pos_args.len() {
                pos_args[i].clone()
            } else if let Some(default) = &param.default {
                self.eval_expr(default, &func.env)?
            } else {
                Value::Nil
            };
            scope.define(param.name.clone(), value);
        }

        let function_name = if func.name.is_empty() {
            "<anonymous>".to_string()
        } else {
            func.name.clone()
        };
        self.stack.push(Frame {
            function_name,
            file: self.file.clone(),
            position: call_pos,
        });
        let result = self.exec_block(&func.body, &scope);
        self.stack.pop();

        match result? {
            Control::Return(v) => Ok(v),
            Control::Value(_) => Ok(Value::Nil),
            Control::Break => Err(self.error("'break' outside loop", call_pos)),
            Control::Continue => Err(self.error("'continue' outside loop", call_pos)),
        }
    }

    /// Call a host-registered native. Positional arguments arrive under
    /// keys "0", "1", …; named arguments keep their names. A native error
    /// string becomes a runtime error at the call site.
    fn call_native(
        &mut self,
        native: &Rc<NativeFn>,
        pos_args: Vec<Value>,
        named: Vec<(String, Value)>,
        call_pos: Position,
    ) -> Result<Value, DusoError> {
        let mut map = IndexMap::new();
        for (i, value) in pos_args.into_iter().enumerate() {
            map.insert(i.to_string(), value);
        }
        for (name, value) in named {
            map.insert(name, value);
        }
        (native.func)(&map).map_err(|msg| self.error(msg, call_pos))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn apply_binary(
        &self,
        op: BinaryOp,
        l: Value,
        r: Value,
        pos: Position,
    ) -> Result<Value, DusoError> {
        match op {
            BinaryOp::Add => {
                // Any string operand makes + a concatenation
                if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                    return Ok(Value::Str(format!("{}{}", l, r)));
                }
                let (a, b) = self.numeric_operands("+", &l, &r, pos)?;
                Ok(Value::Number(a + b))
            }
            BinaryOp::Sub => {
                let (a, b) = self.numeric_operands("-", &l, &r, pos)?;
                Ok(Value::Number(a - b))
            }
            BinaryOp::Mul => {
                let (a, b) = self.numeric_operands("*", &l, &r, pos)?;
                Ok(Value::Number(a * b))
            }
            BinaryOp::Div => {
                let (a, b) = self.numeric_operands("/", &l, &r, pos)?;
                if b == 0.0 {
                    return Err(self.error("division by zero", pos));
                }
                Ok(Value::Number(a / b))
            }
            BinaryOp::Mod => {
                let (a, b) = self.numeric_operands("%", &l, &r, pos)?;
                if b == 0.0 {
                    return Err(self.error("modulo by zero", pos));
                }
                Ok(Value::Number(a % b))
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.compare_values(op, &l, &r, pos)
            }
            BinaryOp::Eq => Ok(Value::Bool(l == r)),
            BinaryOp::NotEq => Ok(Value::Bool(l != r)),
            // and/or short-circuit in eval_expr; compound assignment never
            // carries them, so value selection is all that is left
            BinaryOp::And => Ok(if l.is_truthy() { r } else { l }),
            BinaryOp::Or => Ok(if l.is_truthy() { l } else { r }),
        }
    }

    /// Both operands as numbers; a numeric string on one side of a genuine
    /// number is coerced, anything else is a type error.
    fn numeric_operands(
        &self,
        op: &str,
        l: &Value,
        r: &Value,
        pos: Position,
    ) -> Result<(f64, f64), DusoError> {
        let mismatch = || {
            self.error(
                format!(
                    "unsupported operand types for '{}': {} and {}",
                    op,
                    l.type_name(),
                    r.type_name()
                ),
                pos,
            )
        };
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
            (Value::Number(a), Value::Str(s)) => match parse_numeric(s) {
                Some(b) => Ok((*a, b)),
                None => Err(mismatch()),
            },
            (Value::Str(s), Value::Number(b)) => match parse_numeric(s) {
                Some(a) => Ok((a, *b)),
                None => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }

    fn compare_values(
        &self,
        op: BinaryOp,
        l: &Value,
        r: &Value,
        pos: Position,
    ) -> Result<Value, DusoError> {
        // Two strings order lexicographically; a string against a number
        // coerces the string
        if let (Value::Str(a), Value::Str(b)) = (l, r) {
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::LtEq => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            };
            return Ok(Value::Bool(result));
        }
        let (a, b) = self.numeric_operands(&op.to_string(), l, r, pos)?;
        let result = match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
        Ok(Value::Bool(result))
    }
}

/// Calling an object builds a shallow clone of it, with named arguments
/// overriding matching fields. Positional arguments are ignored and the
/// template itself is unchanged.
fn construct_object(template: &ObjectRef, named: Vec<(String, Value)>) -> Value {
    let mut clone: IndexMap<String, Value> = template.borrow().clone();
    for (name, value) in named {
        clone.insert(name, value);
    }
    Value::object(clone)
}

fn parse_numeric(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}
