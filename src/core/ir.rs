//! Primitive intermediate representation
//!
//! The output of desugaring. Later phases only ever see these node
//! kinds: class statements and loops with else clauses have been
//! lowered away by the time a tree is built from them.
use crate::common::sourcemap::{HasSmid, Smid};
use crate::core::temp::{TempRef, TempScope};
pub use crate::syntax::ast::{BinaryOperator, Comparator};

/// Constant values
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Whether a function body is an ordinary function or the suite of
/// a class statement.
///
/// A class suite is accepted by later phases as an opaque flag: it
/// may not contain user returns and its final value is produced by
/// the reformulation rather than by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    ClassSuite,
}

/// A zero-parameter function body created in place
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub smid: Smid,
    pub name: String,
    pub kind: FunctionKind,
    pub doc: Option<String>,
    pub body: Option<Stmt>,
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Smid, Constant),
    /// Reference to a user variable by name
    Name(Smid, String),
    /// Reference to a temp variable
    Temp(Smid, TempRef),
    /// Reference to a builtin (including exception types)
    Builtin(Smid, String),
    Attribute(Smid, Box<Expr>, String),
    Subscript(Smid, Box<Expr>, Box<Expr>),
    /// Call (callee, positional args, keyword mapping to splat)
    Call(Smid, Box<Expr>, Vec<Expr>, Option<Box<Expr>>),
    MakeTuple(Smid, Vec<Expr>),
    MakeList(Smid, Vec<Expr>),
    MakeDict(Smid, Vec<(Expr, Expr)>),
    /// Conditional expression (condition, yes, no)
    Conditional(Smid, Box<Expr>, Box<Expr>, Box<Expr>),
    Compare(Smid, Comparator, Box<Expr>, Box<Expr>),
    BinaryOp(Smid, BinaryOperator, Box<Expr>, Box<Expr>),
    Not(Smid, Box<Expr>),
    /// Obtain an iterator
    Iter(Smid, Box<Expr>),
    /// Next element of an iterator, raising on exhaustion
    Next(Smid, Box<Expr>),
    /// Exactly `n` elements of an iterable as a tuple, raising
    /// `ValueError` on any other count
    Unpack(Smid, Box<Expr>, usize),
    /// Type of a value
    TypeOf(Smid, Box<Expr>),
    /// Test for an attribute
    HasAttr(Smid, Box<Expr>, String),
    /// Mapping lookup (mapping, key)
    DictGet(Smid, Box<Expr>, Box<Expr>),
    /// The mapping the current frame binds names into
    Locals(Smid),
    /// Create a function from a body
    Function(Smid, Box<FunctionBody>),
}

impl HasSmid for Expr {
    fn smid(&self) -> Smid {
        match *self {
            Expr::Constant(s, _) => s,
            Expr::Name(s, _) => s,
            Expr::Temp(s, _) => s,
            Expr::Builtin(s, _) => s,
            Expr::Attribute(s, _, _) => s,
            Expr::Subscript(s, _, _) => s,
            Expr::Call(s, _, _, _) => s,
            Expr::MakeTuple(s, _) => s,
            Expr::MakeList(s, _) => s,
            Expr::MakeDict(s, _) => s,
            Expr::Conditional(s, _, _, _) => s,
            Expr::Compare(s, _, _, _) => s,
            Expr::BinaryOp(s, _, _, _) => s,
            Expr::Not(s, _) => s,
            Expr::Iter(s, _) => s,
            Expr::Next(s, _) => s,
            Expr::Unpack(s, _, _) => s,
            Expr::TypeOf(s, _) => s,
            Expr::HasAttr(s, _, _) => s,
            Expr::DictGet(s, _, _) => s,
            Expr::Locals(s) => s,
            Expr::Function(s, _) => s,
        }
    }
}

/// Assignment targets
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(String),
    Temp(TempRef),
    Attribute(Expr, String),
    Subscript(Expr, Expr),
}

/// Exception handler of a try statement
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub smid: Smid,
    /// Exception types caught; the handler matches any of them
    pub exception_types: Vec<Expr>,
    pub body: Stmt,
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Ordered statements, never nested or empty once normalised
    Sequence(Smid, Vec<Stmt>),
    /// Conditional (condition, yes branch, no branch)
    Conditional(Smid, Expr, Option<Box<Stmt>>, Option<Box<Stmt>>),
    /// Loop forever, left via break
    Loop(Smid, Box<Stmt>),
    Break(Smid),
    Continue(Smid),
    Return(Smid, Expr),
    Assign(Smid, Target, Expr),
    /// Remove key from mapping (mapping, key)
    DictRemove(Smid, Expr, Expr),
    /// Install a mapping as the target of local name binding
    SetLocals(Smid, Expr),
    Expr(Smid, Expr),
    /// Guarded statement with handlers
    Try(Smid, Box<Stmt>, Vec<Handler>),
    /// Temp scope with its body
    TempBlock(Box<TempScope>),
}

impl HasSmid for Stmt {
    fn smid(&self) -> Smid {
        match self {
            Stmt::Sequence(s, _) => *s,
            Stmt::Conditional(s, _, _, _) => *s,
            Stmt::Loop(s, _) => *s,
            Stmt::Break(s) => *s,
            Stmt::Continue(s) => *s,
            Stmt::Return(s, _) => *s,
            Stmt::Assign(s, _, _) => *s,
            Stmt::DictRemove(s, _, _) => *s,
            Stmt::SetLocals(s, _) => *s,
            Stmt::Expr(s, _) => *s,
            Stmt::Try(s, _, _) => *s,
            Stmt::TempBlock(scope) => scope.smid(),
        }
    }
}

/// A node encountered while walking the tree
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Target(&'a Target),
}

impl Stmt {
    /// Visit this statement and everything below it in pre-order,
    /// including the bodies of functions created in expressions.
    pub fn walk<'a, F: FnMut(Node<'a>)>(&'a self, f: &mut F) {
        f(Node::Stmt(self));
        match self {
            Stmt::Sequence(_, stmts) => {
                for s in stmts {
                    s.walk(f);
                }
            }
            Stmt::Conditional(_, c, yes, no) => {
                c.walk(f);
                if let Some(y) = yes {
                    y.walk(f);
                }
                if let Some(n) = no {
                    n.walk(f);
                }
            }
            Stmt::Loop(_, body) => body.walk(f),
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::Return(_, e) | Stmt::SetLocals(_, e) | Stmt::Expr(_, e) => e.walk(f),
            Stmt::Assign(_, target, source) => {
                target.walk(f);
                source.walk(f);
            }
            Stmt::DictRemove(_, d, k) => {
                d.walk(f);
                k.walk(f);
            }
            Stmt::Try(_, tried, handlers) => {
                tried.walk(f);
                for h in handlers {
                    for t in &h.exception_types {
                        t.walk(f);
                    }
                    h.body.walk(f);
                }
            }
            Stmt::TempBlock(scope) => {
                if let Some(body) = scope.body() {
                    body.walk(f);
                }
            }
        }
    }

    /// All temp references in the tree, reads and writes
    pub fn temp_refs(&self) -> Vec<&TempRef> {
        let mut refs = vec![];
        self.walk(&mut |node| match node {
            Node::Expr(Expr::Temp(_, r)) => refs.push(r),
            Node::Target(Target::Temp(r)) => refs.push(r),
            _ => {}
        });
        refs
    }

    /// Names of all temp variables referenced in the tree
    pub fn temp_names(&self) -> Vec<&str> {
        self.temp_refs().into_iter().map(|r| r.name()).collect()
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Stmt::Loop(_, _))
    }

    pub fn is_temp_block(&self) -> bool {
        matches!(self, Stmt::TempBlock(_))
    }

    /// Statements of a sequence, or the statement itself
    pub fn statements(&self) -> &[Stmt] {
        match self {
            Stmt::Sequence(_, stmts) => stmts,
            _ => std::slice::from_ref(self),
        }
    }
}

impl Target {
    pub fn walk<'a, F: FnMut(Node<'a>)>(&'a self, f: &mut F) {
        f(Node::Target(self));
        match self {
            Target::Attribute(e, _) => e.walk(f),
            Target::Subscript(e, k) => {
                e.walk(f);
                k.walk(f);
            }
            Target::Name(_) | Target::Temp(_) => {}
        }
    }
}

impl Expr {
    pub fn walk<'a, F: FnMut(Node<'a>)>(&'a self, f: &mut F) {
        f(Node::Expr(self));
        match self {
            Expr::Constant(..)
            | Expr::Name(..)
            | Expr::Temp(..)
            | Expr::Builtin(..)
            | Expr::Locals(_) => {}
            Expr::Attribute(_, e, _)
            | Expr::Not(_, e)
            | Expr::Iter(_, e)
            | Expr::Next(_, e)
            | Expr::Unpack(_, e, _)
            | Expr::TypeOf(_, e)
            | Expr::HasAttr(_, e, _) => e.walk(f),
            Expr::Subscript(_, a, b)
            | Expr::Compare(_, _, a, b)
            | Expr::BinaryOp(_, _, a, b)
            | Expr::DictGet(_, a, b) => {
                a.walk(f);
                b.walk(f);
            }
            Expr::Call(_, callee, args, kw) => {
                callee.walk(f);
                for a in args {
                    a.walk(f);
                }
                if let Some(k) = kw {
                    k.walk(f);
                }
            }
            Expr::MakeTuple(_, xs) | Expr::MakeList(_, xs) => {
                for x in xs {
                    x.walk(f);
                }
            }
            Expr::MakeDict(_, pairs) => {
                for (k, v) in pairs {
                    k.walk(f);
                    v.walk(f);
                }
            }
            Expr::Conditional(_, c, y, n) => {
                c.walk(f);
                y.walk(f);
                n.walk(f);
            }
            Expr::Function(_, body) => {
                if let Some(b) = &body.body {
                    b.walk(f);
                }
            }
        }
    }
}

/// Normalise a list of statements into a sequence.
///
/// Absent entries and empty sequences are dropped, nested sequences
/// are flattened. Returns `None` if nothing remains.
pub fn sequence<I>(smid: Smid, statements: I) -> Option<Stmt>
where
    I: IntoIterator<Item = Option<Stmt>>,
{
    let mut flat = vec![];
    for stmt in statements.into_iter().flatten() {
        match stmt {
            Stmt::Sequence(_, inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    if flat.is_empty() {
        None
    } else {
        Some(Stmt::Sequence(smid, flat))
    }
}

/// Normalise as `sequence`, yielding an empty sequence if nothing
/// remains
pub fn sequence_or_empty<I>(smid: Smid, statements: I) -> Stmt
where
    I: IntoIterator<Item = Option<Stmt>>,
{
    sequence(smid, statements).unwrap_or(Stmt::Sequence(smid, vec![]))
}

/// A collection of functions for concisely creating IR
pub mod dsl {
    use super::*;

    pub fn constant(smid: Smid, c: Constant) -> Expr {
        Expr::Constant(smid, c)
    }

    pub fn none(smid: Smid) -> Expr {
        Expr::Constant(smid, Constant::None)
    }

    pub fn bool_(smid: Smid, b: bool) -> Expr {
        Expr::Constant(smid, Constant::Bool(b))
    }

    pub fn int(smid: Smid, n: i64) -> Expr {
        Expr::Constant(smid, Constant::Int(n))
    }

    pub fn str<T: AsRef<str>>(smid: Smid, s: T) -> Expr {
        Expr::Constant(smid, Constant::Str(s.as_ref().to_string()))
    }

    pub fn name<T: AsRef<str>>(smid: Smid, n: T) -> Expr {
        Expr::Name(smid, n.as_ref().to_string())
    }

    pub fn temp(smid: Smid, r: TempRef) -> Expr {
        Expr::Temp(smid, r)
    }

    pub fn builtin<T: AsRef<str>>(smid: Smid, n: T) -> Expr {
        Expr::Builtin(smid, n.as_ref().to_string())
    }

    pub fn attribute<T: AsRef<str>>(smid: Smid, e: Expr, n: T) -> Expr {
        Expr::Attribute(smid, Box::new(e), n.as_ref().to_string())
    }

    pub fn subscript(smid: Smid, e: Expr, key: Expr) -> Expr {
        Expr::Subscript(smid, Box::new(e), Box::new(key))
    }

    /// Call with positional arguments only
    pub fn call(smid: Smid, f: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(smid, Box::new(f), args, None)
    }

    /// Call with positional arguments and a keyword mapping
    pub fn call_kw(smid: Smid, f: Expr, args: Vec<Expr>, kw: Expr) -> Expr {
        Expr::Call(smid, Box::new(f), args, Some(Box::new(kw)))
    }

    pub fn tuple(smid: Smid, xs: Vec<Expr>) -> Expr {
        Expr::MakeTuple(smid, xs)
    }

    pub fn list(smid: Smid, xs: Vec<Expr>) -> Expr {
        Expr::MakeList(smid, xs)
    }

    pub fn dict(smid: Smid, pairs: Vec<(Expr, Expr)>) -> Expr {
        Expr::MakeDict(smid, pairs)
    }

    pub fn if_expr(smid: Smid, c: Expr, yes: Expr, no: Expr) -> Expr {
        Expr::Conditional(smid, Box::new(c), Box::new(yes), Box::new(no))
    }

    pub fn compare(smid: Smid, op: Comparator, l: Expr, r: Expr) -> Expr {
        Expr::Compare(smid, op, Box::new(l), Box::new(r))
    }

    pub fn iter(smid: Smid, e: Expr) -> Expr {
        Expr::Iter(smid, Box::new(e))
    }

    pub fn next(smid: Smid, e: Expr) -> Expr {
        Expr::Next(smid, Box::new(e))
    }

    pub fn unpack(smid: Smid, e: Expr, n: usize) -> Expr {
        Expr::Unpack(smid, Box::new(e), n)
    }

    pub fn type_of(smid: Smid, e: Expr) -> Expr {
        Expr::TypeOf(smid, Box::new(e))
    }

    pub fn has_attr<T: AsRef<str>>(smid: Smid, e: Expr, n: T) -> Expr {
        Expr::HasAttr(smid, Box::new(e), n.as_ref().to_string())
    }

    pub fn dict_get(smid: Smid, d: Expr, key: Expr) -> Expr {
        Expr::DictGet(smid, Box::new(d), Box::new(key))
    }

    pub fn locals(smid: Smid) -> Expr {
        Expr::Locals(smid)
    }

    pub fn function(smid: Smid, body: FunctionBody) -> Expr {
        Expr::Function(smid, Box::new(body))
    }

    pub fn assign(smid: Smid, target: Target, source: Expr) -> Stmt {
        Stmt::Assign(smid, target, source)
    }

    pub fn assign_temp(smid: Smid, target: TempRef, source: Expr) -> Stmt {
        Stmt::Assign(smid, Target::Temp(target), source)
    }

    pub fn assign_name<T: AsRef<str>>(smid: Smid, target: T, source: Expr) -> Stmt {
        Stmt::Assign(smid, Target::Name(target.as_ref().to_string()), source)
    }

    pub fn if_(smid: Smid, c: Expr, yes: Option<Stmt>, no: Option<Stmt>) -> Stmt {
        Stmt::Conditional(smid, c, yes.map(Box::new), no.map(Box::new))
    }

    pub fn loop_(smid: Smid, body: Stmt) -> Stmt {
        Stmt::Loop(smid, Box::new(body))
    }

    pub fn break_(smid: Smid) -> Stmt {
        Stmt::Break(smid)
    }

    pub fn return_(smid: Smid, e: Expr) -> Stmt {
        Stmt::Return(smid, e)
    }

    pub fn expr(smid: Smid, e: Expr) -> Stmt {
        Stmt::Expr(smid, e)
    }

    pub fn try_(smid: Smid, tried: Stmt, handlers: Vec<Handler>) -> Stmt {
        Stmt::Try(smid, Box::new(tried), handlers)
    }
}
