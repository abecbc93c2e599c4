//! Runtime values of the reference machine
use crate::core::ir::FunctionBody;
use crate::eval::error::ExecutionError;
use indexmap::IndexMap;
use itertools::Itertools;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A mutable, insertion ordered mapping from names to values
pub type Namespace = Rc<RefCell<IndexMap<String, Value>>>;

/// Create an empty namespace
pub fn namespace() -> Namespace {
    Rc::new(RefCell::new(IndexMap::new()))
}

/// Keyword arguments as passed to callables
pub type Keywords = [(String, Value)];

/// Host function signature
pub type NativeFn = dyn Fn(&[Value], &Keywords) -> Result<Value, ExecutionError>;

/// A callable supplied by the host, optionally carrying attributes
pub struct Native {
    pub name: String,
    pub attributes: IndexMap<String, Value>,
    call: Box<NativeFn>,
}

impl Native {
    pub fn new<S, F>(name: S, f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&[Value], &Keywords) -> Result<Value, ExecutionError> + 'static,
    {
        Native {
            name: name.as_ref().to_string(),
            attributes: IndexMap::new(),
            call: Box::new(f),
        }
    }

    pub fn with_attribute<S: AsRef<str>>(mut self, name: S, value: Value) -> Self {
        self.attributes.insert(name.as_ref().to_string(), value);
        self
    }

    pub fn call(&self, args: &[Value], kwargs: &Keywords) -> Result<Value, ExecutionError> {
        (self.call)(args, kwargs)
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

/// A class object
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub bases: Vec<Value>,
    pub namespace: RefCell<IndexMap<String, Value>>,
    /// The callable that created the class
    pub metaclass: Value,
}

impl Class {
    /// Look up an attribute in the class or its bases, depth first
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.namespace.borrow().get(name) {
            return Some(v.clone());
        }
        self.bases.iter().find_map(|base| match base {
            Value::Class(c) => c.lookup(name),
            _ => None,
        })
    }
}

/// State of an iteration in progress
#[derive(Debug)]
pub struct SeqIter {
    items: Vec<Value>,
    position: usize,
}

impl SeqIter {
    pub fn new(items: Vec<Value>) -> Self {
        SeqIter { items, position: 0 }
    }
}

impl Iterator for SeqIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.items.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Tuple(Rc<Vec<Value>>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Namespace),
    Iterator(Rc<RefCell<SeqIter>>),
    Function(Rc<FunctionBody>),
    Builtin(Rc<str>),
    Native(Rc<Native>),
    Class(Rc<Class>),
}

impl Value {
    pub fn str<S: AsRef<str>>(s: S) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn builtin<S: AsRef<str>>(s: S) -> Self {
        Value::Builtin(Rc::from(s.as_ref()))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn native(native: Native) -> Self {
        Value::Native(Rc::new(native))
    }

    pub fn class<S: AsRef<str>>(
        name: S,
        bases: Vec<Value>,
        namespace: IndexMap<String, Value>,
        metaclass: Value,
    ) -> Self {
        Value::Class(Rc::new(Class {
            name: name.as_ref().to_string(),
            bases,
            namespace: RefCell::new(namespace),
            metaclass,
        }))
    }

    /// Truth value as used by conditionals
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(xs) => !xs.is_empty(),
            Value::List(xs) => !xs.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            _ => true,
        }
    }

    /// Name of the value's type for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Iterator(_) => "iterator",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Native(_) => "native",
            Value::Class(_) => "type",
        }
    }

    /// Identity comparison
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Value equality
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Int(b)) | (Value::Int(b), Value::Bool(a)) => {
                i64::from(*a) == *b
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.equals(w)).unwrap_or(false))
            }
            _ => self.is(other),
        }
    }

    /// Representation as shown inside containers
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tuple(xs) if xs.len() == 1 => write!(f, "({},)", xs[0].repr()),
            Value::Tuple(xs) => write!(f, "({})", xs.iter().map(Value::repr).join(", ")),
            Value::List(xs) => write!(f, "[{}]", xs.borrow().iter().map(Value::repr).join(", ")),
            Value::Dict(d) => write!(
                f,
                "{{{}}}",
                d.borrow()
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v.repr()))
                    .join(", ")
            ),
            Value::Iterator(_) => write!(f, "<iterator>"),
            Value::Function(body) => write!(f, "<function {}>", body.name),
            Value::Builtin(n) => write!(f, "<built-in {}>", n),
            Value::Native(n) => write!(f, "<native {}>", n.name),
            Value::Class(c) => write!(f, "<class '{}'>", c.name),
        }
    }
}
