// ABOUTME: Tree-walking evaluator with call frames, method dispatch, and suspendable input

use crate::ast::{BinaryOp, CompareOp, LogicalOp, Node, NodeKind, UnaryOp};
use crate::env::{Cell, Definitions, Environment, FunctionDef};
use crate::error::RuntimeError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::debug;

/// A non-local outcome of evaluation. `?` propagates all three variants;
/// call sites catch `Return`, the session layer catches `InputRequired`,
/// and everything else surfaces as a runtime error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Return(Value),
    InputRequired { line: u32 },
    Error(RuntimeError),
}

impl From<RuntimeError> for Flow {
    fn from(err: RuntimeError) -> Self {
        Flow::Error(err)
    }
}

/// Walks the AST against an Environment, producing Values or suspending
/// when `input()` finds no staged value.
///
/// Print output goes to a shared ordered sink so parallel workers append to
/// the same buffer; the host drains it between steps.
pub struct Interpreter {
    env: Environment,
    printed: Arc<Mutex<Vec<String>>>,
    pending_input: Option<String>,
    in_parallel: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_defs(Definitions::new())
    }

    /// Creates an interpreter seeded with parse-time definition tables.
    pub fn with_defs(defs: Definitions) -> Self {
        Interpreter {
            env: Environment::with_defs(defs),
            printed: Arc::new(Mutex::new(Vec::new())),
            pending_input: None,
            in_parallel: false,
        }
    }

    /// Builds a parallel worker: a private variable snapshot, shared
    /// definitions, and the shared print sink. Workers cannot suspend.
    fn worker(env: Environment, printed: Arc<Mutex<Vec<String>>>) -> Self {
        Interpreter {
            env,
            printed,
            pending_input: None,
            in_parallel: true,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Stages a host-supplied input value for the next `input()`.
    pub fn stage_input(&mut self, value: impl Into<String>) {
        self.pending_input = Some(value.into());
    }

    /// Removes and returns everything printed since the last drain.
    pub fn drain_output(&mut self) -> Vec<String> {
        let mut sink = self.printed.lock().expect("print sink poisoned");
        std::mem::take(&mut *sink)
    }

    pub fn evaluate(&mut self, node: &Node) -> Result<Value, Flow> {
        match &node.kind {
            NodeKind::Number(n) => Ok(Value::Number(*n)),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::Null => Ok(Value::Null),

            NodeKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::Array(values))
            }

            // Constructing a lambda snapshots the current variables; later
            // mutations in the outer scope are not visible through it.
            NodeKind::Lambda { params, body } => Ok(Value::Lambda {
                params: params.clone(),
                body: Arc::new((**body).clone()),
                captured: self.env.snapshot(),
            }),

            NodeKind::Var(name) => self.read_var(name, node.line),

            NodeKind::FieldAccess { receiver, field } => {
                debug!(line = node.line, "accessing field {}.{}", receiver, field);
                let value = self.read_var(receiver, node.line)?;
                match value {
                    Value::Record { name, fields } => match fields.get(field) {
                        Some(value) => Ok(value.clone()),
                        None => Err(RuntimeError::UnknownField {
                            field: field.clone(),
                            record: name,
                            line: node.line,
                        }
                        .into()),
                    },
                    _ => Err(RuntimeError::NotARecord {
                        name: receiver.clone(),
                        line: node.line,
                    }
                    .into()),
                }
            }

            NodeKind::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_binary(*op, left, right, node.line)
            }

            NodeKind::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                match value {
                    Value::Number(n) => Ok(Value::Number(match op {
                        UnaryOp::Plus => n,
                        UnaryOp::Minus => -n,
                    })),
                    _ => Err(
                        RuntimeError::type_mismatch(format!("unary {}", op), node.line).into(),
                    ),
                }
            }

            NodeKind::Not(operand) => {
                let value = self.evaluate(operand)?;
                match value {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    _ => Err(RuntimeError::type_mismatch("not", node.line).into()),
                }
            }

            // Both operands are evaluated before combining; there is no
            // short-circuiting.
            NodeKind::Logical { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                match (left, right) {
                    (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
                        LogicalOp::And => a && b,
                        LogicalOp::Or => a || b,
                    })),
                    _ => Err(RuntimeError::type_mismatch(op.to_string(), node.line).into()),
                }
            }

            NodeKind::Compare { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_compare(*op, left, right, node.line)
            }

            NodeKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.assign(name.clone(), value.clone());
                Ok(value)
            }

            NodeKind::Delete(name) => {
                self.env.delete(name);
                Ok(Value::Null)
            }

            NodeKind::Print(expr) => {
                let value = self.evaluate(expr)?;
                let mut sink = self.printed.lock().expect("print sink poisoned");
                sink.push(value.to_string());
                Ok(value)
            }

            NodeKind::Input => {
                if self.in_parallel {
                    return Err(RuntimeError::InputInParallel { line: node.line }.into());
                }
                match self.pending_input.take() {
                    Some(raw) => match raw.trim().parse::<f64>() {
                        Ok(n) => Ok(Value::Number(n)),
                        Err(_) => Ok(Value::Str(raw)),
                    },
                    None => Err(Flow::InputRequired { line: node.line }),
                }
            }

            NodeKind::Block(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = self.evaluate(statement)?;
                }
                Ok(last)
            }

            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                match self.evaluate(condition)? {
                    Value::Bool(true) => self.evaluate(then_block),
                    Value::Bool(false) => match else_block {
                        Some(block) => self.evaluate(block),
                        None => Ok(Value::Null),
                    },
                    _ => Err(RuntimeError::NonBoolCondition { line: node.line }.into()),
                }
            }

            NodeKind::While { condition, body } => {
                loop {
                    match self.evaluate(condition)? {
                        Value::Bool(true) => {
                            self.evaluate(body)?;
                        }
                        Value::Bool(false) => return Ok(Value::Null),
                        _ => return Err(RuntimeError::NonBoolCondition { line: node.line }.into()),
                    }
                }
            }

            NodeKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.evaluate(init)?;
                loop {
                    match self.evaluate(condition)? {
                        Value::Bool(true) => {
                            self.evaluate(body)?;
                            self.evaluate(update)?;
                        }
                        Value::Bool(false) => return Ok(Value::Null),
                        _ => return Err(RuntimeError::NonBoolCondition { line: node.line }.into()),
                    }
                }
            }

            NodeKind::Call { name, args } => self.call(name, args, node.line),

            NodeKind::MethodCall {
                receiver,
                method,
                args,
            } => self.call_method(receiver, method, args, node.line),

            NodeKind::RecordInit { name, args } => self.construct_record(name, args, node.line),

            NodeKind::FuncDef { name, params, body } => {
                self.env.define_function(
                    name.clone(),
                    FunctionDef::new(params.clone(), (**body).clone()),
                );
                Ok(Value::Null)
            }

            NodeKind::RecordDef { name, fields } => {
                self.env.define_record(name.clone(), fields.clone());
                Ok(Value::Null)
            }

            NodeKind::ClassDef {
                name,
                fields,
                methods,
            } => {
                self.env.define_record(name.clone(), fields.clone());
                for method in methods {
                    self.env.define_function(
                        Definitions::method_key(name, &method.name),
                        FunctionDef::new(method.params.clone(), method.body.clone()),
                    );
                }
                Ok(Value::Null)
            }

            NodeKind::Parallel(block) => self.run_parallel(block, node.line),

            NodeKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Err(Flow::Return(value))
            }
        }
    }

    fn read_var(&self, name: &str, line: u32) -> Result<Value, Flow> {
        match self.env.cell(name) {
            Some(cell) if cell.deleted => Err(RuntimeError::DeletedVariable {
                name: name.to_string(),
                line,
            }
            .into()),
            Some(cell) => Ok(cell.value.clone()),
            None => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            }
            .into()),
        }
    }

    fn apply_binary(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
        line: u32,
    ) -> Result<Value, Flow> {
        match (op, left, right) {
            (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (BinaryOp::Div, Value::Number(_), Value::Number(b)) if b == 0.0 => {
                Err(RuntimeError::DivisionByZero { line }.into())
            }
            (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (BinaryOp::Mod, Value::Number(_), Value::Number(b)) if b == 0.0 => {
                Err(RuntimeError::ModulusByZero { line }.into())
            }
            (BinaryOp::Mod, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            (BinaryOp::Pow, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.powf(b))),
            (op, _, _) => Err(RuntimeError::type_mismatch(op.to_string(), line).into()),
        }
    }

    fn apply_compare(
        &self,
        op: CompareOp,
        left: Value,
        right: Value,
        line: u32,
    ) -> Result<Value, Flow> {
        // Equality accepts any two values and compares structurally; the
        // relational operators require numbers.
        match op {
            CompareOp::Eq => Ok(Value::Bool(left == right)),
            CompareOp::Ne => Ok(Value::Bool(left != right)),
            _ => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(match op {
                    CompareOp::Lt => a < b,
                    CompareOp::Gt => a > b,
                    CompareOp::Le => a <= b,
                    CompareOp::Ge => a >= b,
                    CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
                })),
                _ => Err(RuntimeError::type_mismatch(op.to_string(), line).into()),
            },
        }
    }

    /// A bare identifier used as a callable resolves in order: record type
    /// (construction), function table, then a variable holding a lambda.
    fn call(&mut self, name: &str, args: &[Node], line: u32) -> Result<Value, Flow> {
        if self.env.defs().is_record(name) {
            return self.construct_record(name, args, line);
        }

        if let Some(def) = self.env.defs().function(name).cloned() {
            debug!(line, "calling function '{}'", name);
            let args = self.eval_args(args)?;
            return self.invoke(name, &def, args, None, line);
        }

        let lambda = match self.env.cell(name) {
            Some(cell) if !cell.deleted => match &cell.value {
                Value::Lambda {
                    params,
                    body,
                    captured,
                } => Some((params.clone(), Arc::clone(body), captured.clone())),
                _ => None,
            },
            _ => None,
        };
        if let Some((params, body, captured)) = lambda {
            debug!(line, "calling lambda '{}'", name);
            let args = self.eval_args(args)?;
            return self.invoke_lambda(name, &params, &body, captured, args, line);
        }

        Err(RuntimeError::UndefinedFunction {
            name: name.to_string(),
            line,
        }
        .into())
    }

    /// `obj.method(args)`: resolve the receiver, qualify the method name by
    /// the receiver's type, and call with the receiver still bound under
    /// its original name so the body can read its fields.
    fn call_method(
        &mut self,
        receiver: &str,
        method: &str,
        args: &[Node],
        line: u32,
    ) -> Result<Value, Flow> {
        let receiver_value = self.read_var(receiver, line)?;
        let type_name = match &receiver_value {
            Value::Record { name, .. } => name.clone(),
            _ => {
                return Err(RuntimeError::NotARecord {
                    name: receiver.to_string(),
                    line,
                }
                .into());
            }
        };

        let key = Definitions::method_key(&type_name, method);
        let def = match self.env.defs().function(&key) {
            Some(def) => def.clone(),
            None => {
                return Err(RuntimeError::UnknownMethod {
                    method: method.to_string(),
                    record: type_name,
                    line,
                }
                .into());
            }
        };

        debug!(line, "calling method '{}'", key);
        let args = self.eval_args(args)?;
        self.invoke(
            &key,
            &def,
            args,
            Some((receiver.to_string(), receiver_value)),
            line,
        )
    }

    fn eval_args(&mut self, args: &[Node]) -> Result<Vec<Value>, Flow> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        Ok(values)
    }

    /// Runs a function body in a fresh frame: snapshot, bind parameters,
    /// evaluate, restore the snapshot on every exit path. A `Return`
    /// unwinding out of the body becomes the call's value.
    fn invoke(
        &mut self,
        callee: &str,
        def: &FunctionDef,
        args: Vec<Value>,
        receiver: Option<(String, Value)>,
        line: u32,
    ) -> Result<Value, Flow> {
        if def.params.len() != args.len() {
            return Err(RuntimeError::arity(callee, def.params.len(), args.len(), line).into());
        }

        let snapshot = self.env.snapshot();
        for (param, value) in def.params.iter().zip(args) {
            self.env.assign(param.clone(), value);
        }
        if let Some((name, value)) = receiver {
            self.env.assign(name, value);
        }

        let outcome = self.evaluate(&def.body);
        self.env.restore(snapshot);
        match outcome {
            Ok(value) => Ok(value),
            Err(Flow::Return(value)) => Ok(value),
            Err(flow) => Err(flow),
        }
    }

    /// Invoking a lambda installs its captured snapshot as the active
    /// variables, extends it with the parameters, evaluates the body, then
    /// restores the caller's variables.
    fn invoke_lambda(
        &mut self,
        callee: &str,
        params: &[String],
        body: &Node,
        captured: HashMap<String, Cell>,
        args: Vec<Value>,
        line: u32,
    ) -> Result<Value, Flow> {
        if params.len() != args.len() {
            return Err(RuntimeError::arity(callee, params.len(), args.len(), line).into());
        }

        let saved = self.env.snapshot();
        self.env.install(captured);
        for (param, value) in params.iter().zip(args) {
            self.env.assign(param.clone(), value);
        }

        let outcome = self.evaluate(body);
        self.env.restore(saved);
        match outcome {
            Ok(value) => Ok(value),
            Err(Flow::Return(value)) => Ok(value),
            Err(flow) => Err(flow),
        }
    }

    fn construct_record(&mut self, name: &str, args: &[Node], line: u32) -> Result<Value, Flow> {
        let field_names: Vec<String> = match self.env.defs().record(name) {
            Some(fields) => fields.to_vec(),
            None => {
                return Err(RuntimeError::UndefinedRecord {
                    name: name.to_string(),
                    line,
                }
                .into());
            }
        };

        debug!(line, "constructing record '{}'", name);
        let args = self.eval_args(args)?;

        // Zero-argument construction of a non-empty type yields a record
        // whose fields are all null.
        let mut fields = IndexMap::new();
        if args.is_empty() && !field_names.is_empty() {
            for field in field_names {
                fields.insert(field, Value::Null);
            }
        } else {
            if args.len() != field_names.len() {
                return Err(
                    RuntimeError::arity(name, field_names.len(), args.len(), line).into(),
                );
            }
            for (field, value) in field_names.into_iter().zip(args) {
                fields.insert(field, value);
            }
        }

        Ok(Value::Record {
            name: name.to_string(),
            fields,
        })
    }

    /// Ships the block to a worker thread with a private variable snapshot
    /// and shared definitions/print sink, then joins before yielding null.
    /// Worker mutations to variables are discarded.
    fn run_parallel(&mut self, block: &Node, line: u32) -> Result<Value, Flow> {
        debug!(line, "spawning parallel worker");
        let block = block.clone();
        let env = self.env.worker_view();
        let printed = Arc::clone(&self.printed);
        let (sender, receiver) = crossbeam_channel::bounded(1);

        let handle = thread::spawn(move || {
            let mut worker = Interpreter::worker(env, printed);
            let outcome = worker.evaluate(&block);
            let _ = sender.send(outcome.map(|_| ()));
        });

        let outcome = receiver.recv().expect("parallel worker disconnected");
        let _ = handle.join();

        match outcome {
            Ok(()) => Ok(Value::Null),
            // A return inside the block just ends the worker.
            Err(Flow::Return(_)) => Ok(Value::Null),
            Err(flow) => Err(flow),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
