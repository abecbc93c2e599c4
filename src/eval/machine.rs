//! A tree walking machine for lowered IR
//!
//! Runs translation units directly so that the behaviour of lowered
//! code can be checked end to end. Temp variables live in a single
//! table keyed by variable identity and are released when their
//! temp block completes.
use crate::common::sourcemap::{HasSmid, Smid};
use crate::core::ir::*;
use crate::core::temp::TempVariable;
use crate::core::unit::TranslationUnit;
use crate::eval::error::{suggest_similar, ExecutionError};
use crate::eval::value::{namespace, Keywords, Namespace, SeqIter, Value};
use indexmap::IndexMap;
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Default limit on loop iterations
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

const BUILTINS: &[&str] = &[
    "type",
    "print",
    "range",
    "len",
    "str",
    "StopIteration",
    "TypeError",
    "KeyError",
    "AttributeError",
    "NameError",
];

/// How a statement completed
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Break(Smid),
    Continue(Smid),
    Return(Value),
}

struct Frame {
    locals: Namespace,
}

pub struct Machine {
    globals: Namespace,
    frames: Vec<Frame>,
    temps: HashMap<TempVariable, Value>,
    output: Vec<String>,
    steps: usize,
    step_limit: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            globals: namespace(),
            frames: vec![],
            temps: HashMap::new(),
            output: vec![],
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Bind a global before running
    pub fn define<S: AsRef<str>>(&mut self, name: S, value: Value) {
        self.globals
            .borrow_mut()
            .insert(name.as_ref().to_string(), value);
    }

    /// Read a global after running
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// Lines written by `print`
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Number of live temp variables
    pub fn live_temps(&self) -> usize {
        self.temps.len()
    }

    /// Execute a translation unit's body at module level
    pub fn run(&mut self, unit: &TranslationUnit) -> Result<(), ExecutionError> {
        debug!("running module {}", unit.name);
        match &unit.body {
            Some(body) => self.run_statement(body),
            None => Ok(()),
        }
    }

    /// Execute a statement at module level
    pub fn run_statement(&mut self, stmt: &Stmt) -> Result<(), ExecutionError> {
        match self.exec(stmt)? {
            Flow::Normal => Ok(()),
            Flow::Break(s) => Err(ExecutionError::StrayControl(s, "break")),
            Flow::Continue(s) => Err(ExecutionError::StrayControl(s, "continue")),
            Flow::Return(_) => Err(ExecutionError::StrayControl(stmt.smid(), "return")),
        }
    }

    fn locals(&self) -> Namespace {
        self.frames
            .last()
            .map(|f| f.locals.clone())
            .unwrap_or_else(|| self.globals.clone())
    }

    fn tick(&mut self) -> Result<(), ExecutionError> {
        self.steps += 1;
        if self.steps > self.step_limit {
            Err(ExecutionError::DidntTerminate(self.step_limit))
        } else {
            Ok(())
        }
    }

    pub fn exec(&mut self, stmt: &Stmt) -> Result<Flow, ExecutionError> {
        match stmt {
            Stmt::Sequence(_, stmts) => {
                for s in stmts {
                    match self.exec(s)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Conditional(_, c, yes, no) => {
                let branch = if self.eval(c)?.is_truthy() { yes } else { no };
                match branch {
                    Some(s) => self.exec(s),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::Loop(_, body) => loop {
                self.tick()?;
                match self.exec(body)? {
                    Flow::Normal | Flow::Continue(_) => {}
                    Flow::Break(_) => return Ok(Flow::Normal),
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            },
            Stmt::Break(s) => Ok(Flow::Break(*s)),
            Stmt::Continue(s) => Ok(Flow::Continue(*s)),
            Stmt::Return(_, e) => Ok(Flow::Return(self.eval(e)?)),
            Stmt::Assign(s, target, source) => {
                let value = self.eval(source)?;
                self.assign(*s, target, value)?;
                Ok(Flow::Normal)
            }
            Stmt::DictRemove(s, d, k) => {
                let mapping = self.eval(d)?;
                let key = self.eval(k)?;
                let (mapping, key) = (as_dict(*s, &mapping)?, as_key(*s, &key)?);
                if mapping.borrow_mut().shift_remove(&key).is_none() {
                    return Err(ExecutionError::exception(*s, "KeyError", key));
                }
                Ok(Flow::Normal)
            }
            Stmt::SetLocals(s, e) => {
                let value = self.eval(e)?;
                let mapping = as_dict(*s, &value)?;
                match self.frames.last_mut() {
                    Some(frame) => frame.locals = mapping,
                    None => self.globals = mapping,
                }
                Ok(Flow::Normal)
            }
            Stmt::Expr(_, e) => {
                self.eval(e)?;
                Ok(Flow::Normal)
            }
            Stmt::Try(_, tried, handlers) => match self.exec(tried) {
                Ok(flow) => Ok(flow),
                Err(err) => {
                    for handler in handlers {
                        if self.handles(handler, &err)? {
                            trace!("handled {} at {}", err, handler.smid);
                            return self.exec(&handler.body);
                        }
                    }
                    Err(err)
                }
            },
            Stmt::TempBlock(scope) => {
                let result = match scope.body() {
                    Some(body) => self.exec(body),
                    None => Ok(Flow::Normal),
                };
                for variable in scope.variables() {
                    self.temps.remove(variable);
                }
                result
            }
        }
    }

    fn handles(&mut self, handler: &Handler, err: &ExecutionError) -> Result<bool, ExecutionError> {
        let kind = match err.kind() {
            Some(kind) => kind,
            None => return Ok(false),
        };
        for t in &handler.exception_types {
            if let Value::Builtin(name) = self.eval(t)? {
                if &*name == kind || &*name == "Exception" {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn assign(&mut self, smid: Smid, target: &Target, value: Value) -> Result<(), ExecutionError> {
        match target {
            Target::Name(n) => {
                self.locals().borrow_mut().insert(n.clone(), value);
            }
            Target::Temp(r) => {
                self.temps.insert(r.variable.clone(), value);
            }
            Target::Attribute(e, n) => match self.eval(e)? {
                Value::Class(c) => {
                    c.namespace.borrow_mut().insert(n.clone(), value);
                }
                other => {
                    return Err(ExecutionError::exception(
                        smid,
                        "AttributeError",
                        format!("cannot set attribute {} on {}", n, other.type_name()),
                    ))
                }
            },
            Target::Subscript(e, k) => {
                let container = self.eval(e)?;
                let key = self.eval(k)?;
                match container {
                    Value::Dict(d) => {
                        d.borrow_mut().insert(as_key(smid, &key)?, value);
                    }
                    Value::List(xs) => {
                        let mut xs = xs.borrow_mut();
                        let i = index(smid, &key, xs.len())?;
                        xs[i] = value;
                    }
                    other => {
                        return Err(ExecutionError::type_error(
                            smid,
                            format!("{} does not support item assignment", other.type_name()),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, ExecutionError> {
        match expr {
            Expr::Constant(_, c) => Ok(match c {
                Constant::None => Value::None,
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Int(n) => Value::Int(*n),
                Constant::Str(s) => Value::str(s),
            }),
            Expr::Name(s, n) => self.lookup(*s, n),
            Expr::Temp(s, r) => self
                .temps
                .get(&r.variable)
                .cloned()
                .ok_or_else(|| ExecutionError::UnboundTemp(*s, r.name().to_string())),
            Expr::Builtin(_, n) => Ok(Value::builtin(n)),
            Expr::Attribute(s, e, n) => {
                let object = self.eval(e)?;
                lookup_attribute(&object, n).ok_or_else(|| {
                    ExecutionError::exception(
                        *s,
                        "AttributeError",
                        format!("{} has no attribute {}", object.type_name(), n),
                    )
                })
            }
            Expr::HasAttr(_, e, n) => Ok(Value::Bool(lookup_attribute(&self.eval(e)?, n).is_some())),
            Expr::Subscript(s, e, k) => {
                let container = self.eval(e)?;
                let key = self.eval(k)?;
                index_value(*s, &container, &key)
            }
            Expr::DictGet(s, d, k) => {
                let mapping = self.eval(d)?;
                let key = self.eval(k)?;
                let key = as_key(*s, &key)?;
                let found = as_dict(*s, &mapping)?.borrow().get(&key).cloned();
                found.ok_or_else(|| ExecutionError::exception(*s, "KeyError", key))
            }
            Expr::Call(s, f, args, kw) => {
                let callee = self.eval(f)?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(a)?);
                }
                let kwargs = match kw {
                    Some(k) => {
                        let mapping = self.eval(k)?;
                        let pairs: Vec<(String, Value)> = as_dict(*s, &mapping)?
                            .borrow()
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect();
                        pairs
                    }
                    None => vec![],
                };
                self.call(*s, &callee, &values, &kwargs)
            }
            Expr::MakeTuple(_, xs) => {
                let mut items = Vec::with_capacity(xs.len());
                for x in xs {
                    items.push(self.eval(x)?);
                }
                Ok(Value::tuple(items))
            }
            Expr::MakeList(_, xs) => {
                let mut items = Vec::with_capacity(xs.len());
                for x in xs {
                    items.push(self.eval(x)?);
                }
                Ok(Value::list(items))
            }
            Expr::MakeDict(s, pairs) => {
                let mut entries = IndexMap::new();
                for (k, v) in pairs {
                    let key = self.eval(k)?;
                    let value = self.eval(v)?;
                    entries.insert(as_key(*s, &key)?, value);
                }
                Ok(Value::Dict(Rc::new(RefCell::new(entries))))
            }
            Expr::Conditional(_, c, y, n) => {
                if self.eval(c)?.is_truthy() {
                    self.eval(y)
                } else {
                    self.eval(n)
                }
            }
            Expr::Compare(s, op, l, r) => {
                let l = self.eval(l)?;
                let r = self.eval(r)?;
                compare_values(*s, *op, &l, &r).map(Value::Bool)
            }
            Expr::BinaryOp(s, op, l, r) => {
                let l = self.eval(l)?;
                let r = self.eval(r)?;
                binary(*s, *op, &l, &r)
            }
            Expr::Not(_, e) => Ok(Value::Bool(!self.eval(e)?.is_truthy())),
            Expr::Iter(s, e) => {
                let value = self.eval(e)?;
                iterate(*s, &value)
            }
            Expr::Next(s, e) => match self.eval(e)? {
                Value::Iterator(it) => {
                    let item = it.borrow_mut().next();
                    item.ok_or_else(|| ExecutionError::exception(*s, "StopIteration", ""))
                }
                other => Err(ExecutionError::type_error(
                    *s,
                    format!("{} is not an iterator", other.type_name()),
                )),
            },
            Expr::Unpack(s, e, n) => {
                let value = self.eval(e)?;
                unpack_exact(*s, &value, *n)
            }
            Expr::TypeOf(_, e) => Ok(type_of_value(&self.eval(e)?)),
            Expr::Locals(_) => Ok(Value::Dict(self.locals())),
            Expr::Function(_, body) => Ok(Value::Function(Rc::new((**body).clone()))),
        }
    }

    fn lookup(&self, smid: Smid, name: &str) -> Result<Value, ExecutionError> {
        if let Some(v) = self.locals().borrow().get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = self.globals.borrow().get(name) {
            return Ok(v.clone());
        }
        if BUILTINS.contains(&name) {
            return Ok(Value::builtin(name));
        }

        let candidates: Vec<String> = self
            .locals()
            .borrow()
            .keys()
            .chain(self.globals.borrow().keys())
            .cloned()
            .collect();
        Err(ExecutionError::UnboundName(
            smid,
            name.to_string(),
            suggest_similar(name, &candidates, 3, 2),
        ))
    }

    /// Call a value with positional and keyword arguments
    pub fn call(
        &mut self,
        smid: Smid,
        callee: &Value,
        args: &[Value],
        kwargs: &Keywords,
    ) -> Result<Value, ExecutionError> {
        match callee {
            Value::Function(body) => {
                if !args.is_empty() || !kwargs.is_empty() {
                    return Err(ExecutionError::ArityMismatch(
                        smid,
                        0,
                        args.len() + kwargs.len(),
                    ));
                }
                trace!("entering {}", body.name);
                self.frames.push(Frame {
                    locals: namespace(),
                });
                let result = match &body.body {
                    Some(stmt) => self.exec(stmt),
                    None => Ok(Flow::Normal),
                };
                self.frames.pop();
                match result? {
                    Flow::Return(v) => Ok(v),
                    Flow::Normal => Ok(Value::None),
                    Flow::Break(s) => Err(ExecutionError::StrayControl(s, "break")),
                    Flow::Continue(s) => Err(ExecutionError::StrayControl(s, "continue")),
                }
            }
            Value::Builtin(name) => self.call_builtin(smid, name, args, kwargs),
            Value::Native(native) => native.call(args, kwargs),
            _ => Err(ExecutionError::NotCallable(smid)),
        }
    }

    fn call_builtin(
        &mut self,
        smid: Smid,
        name: &str,
        args: &[Value],
        kwargs: &Keywords,
    ) -> Result<Value, ExecutionError> {
        if !kwargs.is_empty() {
            return Err(ExecutionError::type_error(
                smid,
                format!("{}() takes no keyword arguments", name),
            ));
        }
        match (name, args) {
            ("type", [value]) => Ok(type_of_value(value)),
            ("type", [Value::Str(n), Value::Tuple(bases), Value::Dict(ns)]) => Ok(Value::class(
                n,
                bases.to_vec(),
                ns.borrow().clone(),
                Value::builtin("type"),
            )),
            ("type", _) => Err(ExecutionError::type_error(
                smid,
                "type() takes 1 or 3 arguments",
            )),
            ("print", _) => {
                let line = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
                self.output.push(line);
                Ok(Value::None)
            }
            ("range", [Value::Int(n)]) => Ok(Value::list((0..*n).map(Value::Int).collect())),
            ("len", [value]) => match value {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Tuple(xs) => Ok(Value::Int(xs.len() as i64)),
                Value::List(xs) => Ok(Value::Int(xs.borrow().len() as i64)),
                Value::Dict(d) => Ok(Value::Int(d.borrow().len() as i64)),
                other => Err(ExecutionError::type_error(
                    smid,
                    format!("object of type {} has no len()", other.type_name()),
                )),
            },
            ("str", [value]) => Ok(Value::str(value.to_string())),
            _ => Err(ExecutionError::type_error(
                smid,
                format!("bad call to builtin {}", name),
            )),
        }
    }
}

fn as_dict(smid: Smid, value: &Value) -> Result<Namespace, ExecutionError> {
    match value {
        Value::Dict(d) => Ok(d.clone()),
        other => Err(ExecutionError::type_error(
            smid,
            format!("expected a mapping, found {}", other.type_name()),
        )),
    }
}

fn as_key(smid: Smid, value: &Value) -> Result<String, ExecutionError> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(ExecutionError::type_error(
            smid,
            format!("mapping keys must be strings, not {}", other.type_name()),
        )),
    }
}

fn index(smid: Smid, key: &Value, len: usize) -> Result<usize, ExecutionError> {
    match key {
        Value::Int(i) => {
            let i = if *i < 0 { *i + len as i64 } else { *i };
            if i >= 0 && (i as usize) < len {
                Ok(i as usize)
            } else {
                Err(ExecutionError::exception(smid, "IndexError", "index out of range"))
            }
        }
        other => Err(ExecutionError::type_error(
            smid,
            format!("indices must be integers, not {}", other.type_name()),
        )),
    }
}

fn lookup_attribute(object: &Value, name: &str) -> Option<Value> {
    match object {
        Value::Class(c) => match name {
            "__name__" => Some(Value::str(&c.name)),
            "__bases__" => Some(Value::tuple(c.bases.clone())),
            _ => c.lookup(name),
        },
        Value::Native(n) => n.attributes.get(name).cloned(),
        Value::Function(f) if name == "__name__" => Some(Value::str(&f.name)),
        _ => None,
    }
}

fn index_value(smid: Smid, container: &Value, key: &Value) -> Result<Value, ExecutionError> {
    match container {
        Value::Tuple(xs) => Ok(xs[index(smid, key, xs.len())?].clone()),
        Value::List(xs) => {
            let xs = xs.borrow();
            Ok(xs[index(smid, key, xs.len())?].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::str(chars[index(smid, key, chars.len())?].to_string()))
        }
        Value::Dict(d) => {
            let key = as_key(smid, key)?;
            let found = d.borrow().get(&key).cloned();
            found.ok_or_else(|| ExecutionError::exception(smid, "KeyError", key))
        }
        other => Err(ExecutionError::type_error(
            smid,
            format!("{} is not subscriptable", other.type_name()),
        )),
    }
}

/// Draw exactly `n` items from an iterable
fn unpack_exact(smid: Smid, value: &Value, n: usize) -> Result<Value, ExecutionError> {
    let iterator = iterate(smid, value)?;
    let items: Vec<Value> = match &iterator {
        Value::Iterator(it) => it.borrow_mut().by_ref().take(n + 1).collect(),
        _ => vec![],
    };
    match items.len() {
        got if got < n => Err(ExecutionError::exception(
            smid,
            "ValueError",
            format!("not enough values to unpack (expected {}, got {})", n, got),
        )),
        got if got > n => Err(ExecutionError::exception(
            smid,
            "ValueError",
            format!("too many values to unpack (expected {})", n),
        )),
        _ => Ok(Value::tuple(items)),
    }
}

fn iterate(smid: Smid, value: &Value) -> Result<Value, ExecutionError> {
    let items = match value {
        Value::Iterator(_) => return Ok(value.clone()),
        Value::Tuple(xs) => xs.to_vec(),
        Value::List(xs) => xs.borrow().clone(),
        Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        Value::Dict(d) => d.borrow().keys().map(Value::str).collect(),
        other => {
            return Err(ExecutionError::type_error(
                smid,
                format!("{} is not iterable", other.type_name()),
            ))
        }
    };
    Ok(Value::Iterator(Rc::new(RefCell::new(SeqIter::new(items)))))
}

fn type_of_value(value: &Value) -> Value {
    match value {
        Value::Class(c) => c.metaclass.clone(),
        other => Value::builtin(other.type_name()),
    }
}

fn compare_values(smid: Smid, op: Comparator, l: &Value, r: &Value) -> Result<bool, ExecutionError> {
    let ordering = || match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(ExecutionError::type_error(
            smid,
            format!("cannot order {} and {}", l.type_name(), r.type_name()),
        )),
    };
    Ok(match op {
        Comparator::Eq => l.equals(r),
        Comparator::NotEq => !l.equals(r),
        Comparator::Lt => ordering()?.is_lt(),
        Comparator::LtE => ordering()?.is_le(),
        Comparator::Gt => ordering()?.is_gt(),
        Comparator::GtE => ordering()?.is_ge(),
        Comparator::Is => l.is(r),
        Comparator::IsNot => !l.is(r),
        Comparator::In => contains(smid, r, l)?,
        Comparator::NotIn => !contains(smid, r, l)?,
    })
}

fn contains(smid: Smid, container: &Value, item: &Value) -> Result<bool, ExecutionError> {
    match container {
        Value::Tuple(xs) => Ok(xs.iter().any(|x| x.equals(item))),
        Value::List(xs) => Ok(xs.borrow().iter().any(|x| x.equals(item))),
        Value::Dict(d) => match item {
            Value::Str(k) => Ok(d.borrow().contains_key(&**k)),
            _ => Ok(false),
        },
        Value::Str(s) => match item {
            Value::Str(sub) => Ok(s.contains(&**sub)),
            other => Err(ExecutionError::type_error(
                smid,
                format!("'in <string>' requires string, not {}", other.type_name()),
            )),
        },
        other => Err(ExecutionError::type_error(
            smid,
            format!("argument of type {} is not iterable", other.type_name()),
        )),
    }
}

fn binary(smid: Smid, op: BinaryOperator, l: &Value, r: &Value) -> Result<Value, ExecutionError> {
    let overflow = || ExecutionError::exception(smid, "OverflowError", "integer overflow");
    match (op, l, r) {
        (BinaryOperator::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOperator::Sub, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOperator::Mul, Value::Int(a), Value::Int(b)) => {
            a.checked_mul(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOperator::Mod, Value::Int(_), Value::Int(0)) => Err(ExecutionError::exception(
            smid,
            "ZeroDivisionError",
            "integer modulo by zero",
        )),
        (BinaryOperator::Mod, Value::Int(a), Value::Int(b)) => {
            // result takes the sign of the divisor
            let m = a.checked_rem(*b).ok_or_else(overflow)?;
            Ok(Value::Int(if m != 0 && (m < 0) != (*b < 0) { m + b } else { m }))
        }
        (BinaryOperator::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (BinaryOperator::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOperator::Add, Value::List(a), Value::List(b)) => Ok(Value::list(
            a.borrow().iter().chain(b.borrow().iter()).cloned().collect(),
        )),
        _ => Err(ExecutionError::type_error(
            smid,
            format!(
                "unsupported operand types for {}: {} and {}",
                op,
                l.type_name(),
                r.type_name()
            ),
        )),
    }
}
