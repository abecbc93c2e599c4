//! Surface syntax tree
//!
//! These are the nodes handed to the desugaring stage by the parser.
//! Every node carries the SMID of its real source location.
use crate::common::sourcemap::{HasSmid, Smid};
use std::fmt;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Mod,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Sub => write!(f, "-"),
            BinaryOperator::Mul => write!(f, "*"),
            BinaryOperator::Mod => write!(f, "%"),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Comparator::Eq => "==",
            Comparator::NotEq => "!=",
            Comparator::Lt => "<",
            Comparator::LtE => "<=",
            Comparator::Gt => ">",
            Comparator::GtE => ">=",
            Comparator::Is => "is",
            Comparator::IsNot => "is not",
            Comparator::In => "in",
            Comparator::NotIn => "not in",
        };
        write!(f, "{}", text)
    }
}

/// Surface expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Name(Smid, String),
    Str(Smid, String),
    Int(Smid, i64),
    Bool(Smid, bool),
    None(Smid),
    Tuple(Smid, Vec<Expression>),
    List(Smid, Vec<Expression>),
    Dict(Smid, Vec<(Expression, Expression)>),
    /// Call (callee, positional args, keyword args)
    Call(Smid, Box<Expression>, Vec<Expression>, Vec<Keyword>),
    Attribute(Smid, Box<Expression>, String),
    Subscript(Smid, Box<Expression>, Box<Expression>),
    BinOp(Smid, BinaryOperator, Box<Expression>, Box<Expression>),
    Compare(Smid, Comparator, Box<Expression>, Box<Expression>),
    Not(Smid, Box<Expression>),
}

impl HasSmid for Expression {
    fn smid(&self) -> Smid {
        use self::Expression::*;
        match *self {
            Name(s, _) => s,
            Str(s, _) => s,
            Int(s, _) => s,
            Bool(s, _) => s,
            None(s) => s,
            Tuple(s, _) => s,
            List(s, _) => s,
            Dict(s, _) => s,
            Call(s, _, _, _) => s,
            Attribute(s, _, _) => s,
            Subscript(s, _, _) => s,
            BinOp(s, _, _, _) => s,
            Compare(s, _, _, _) => s,
            Not(s, _) => s,
        }
    }
}

/// Keyword argument, in a call or a class statement's argument list
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub smid: Smid,
    pub name: String,
    pub value: Expression,
}

/// Class statement
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub smid: Smid,
    pub name: String,
    pub bases: Vec<Expression>,
    pub keywords: Vec<Keyword>,
    /// Decorators in syntactic order (first listed is outermost)
    pub decorators: Vec<Expression>,
    pub body: Vec<Statement>,
}

impl ClassDef {
    /// Split a leading string literal statement off the body as the
    /// class documentation.
    pub fn split_doc(&self) -> (Option<&str>, &[Statement]) {
        match self.body.split_first() {
            Some((Statement::Expr(_, Expression::Str(_, doc)), rest)) => (Some(doc.as_str()), rest),
            _ => (None, &self.body[..]),
        }
    }
}

/// For statement with optional else clause
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub smid: Smid,
    pub target: Expression,
    pub iter: Expression,
    pub body: Vec<Statement>,
    pub orelse: Vec<Statement>,
}

/// While statement with optional else clause
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub smid: Smid,
    pub test: Expression,
    pub body: Vec<Statement>,
    pub orelse: Vec<Statement>,
}

/// Surface statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Class(ClassDef),
    For(ForLoop),
    While(WhileLoop),
    /// Conditional (test, body, else body)
    If(Smid, Expression, Vec<Statement>, Vec<Statement>),
    /// Assignment (target, value)
    Assign(Smid, Expression, Expression),
    Expr(Smid, Expression),
    Return(Smid, Option<Expression>),
    Break(Smid),
    Continue(Smid),
    Pass(Smid),
}

impl Statement {
    /// Name of the statement kind for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Class(_) => "class",
            Statement::For(_) => "for",
            Statement::While(_) => "while",
            Statement::If(..) => "if",
            Statement::Assign(..) => "assignment",
            Statement::Expr(..) => "expression",
            Statement::Return(..) => "return",
            Statement::Break(_) => "break",
            Statement::Continue(_) => "continue",
            Statement::Pass(_) => "pass",
        }
    }
}

impl HasSmid for Statement {
    fn smid(&self) -> Smid {
        match self {
            Statement::Class(c) => c.smid,
            Statement::For(f) => f.smid,
            Statement::While(w) => w.smid,
            Statement::If(s, _, _, _) => *s,
            Statement::Assign(s, _, _) => *s,
            Statement::Expr(s, _) => *s,
            Statement::Return(s, _) => *s,
            Statement::Break(s) => *s,
            Statement::Continue(s) => *s,
            Statement::Pass(s) => *s,
        }
    }
}

/// A parsed module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub smid: Smid,
    pub name: String,
    pub body: Vec<Statement>,
}

/// Functions for concisely creating surface trees
pub mod dsl {
    use super::*;

    pub fn name<T: AsRef<str>>(smid: Smid, n: T) -> Expression {
        Expression::Name(smid, n.as_ref().to_string())
    }

    pub fn str<T: AsRef<str>>(smid: Smid, s: T) -> Expression {
        Expression::Str(smid, s.as_ref().to_string())
    }

    pub fn int(smid: Smid, n: i64) -> Expression {
        Expression::Int(smid, n)
    }

    pub fn bool_(smid: Smid, b: bool) -> Expression {
        Expression::Bool(smid, b)
    }

    pub fn none(smid: Smid) -> Expression {
        Expression::None(smid)
    }

    pub fn tuple(smid: Smid, xs: Vec<Expression>) -> Expression {
        Expression::Tuple(smid, xs)
    }

    pub fn list(smid: Smid, xs: Vec<Expression>) -> Expression {
        Expression::List(smid, xs)
    }

    pub fn call(smid: Smid, f: Expression, args: Vec<Expression>) -> Expression {
        Expression::Call(smid, Box::new(f), args, vec![])
    }

    pub fn attr<T: AsRef<str>>(smid: Smid, target: Expression, n: T) -> Expression {
        Expression::Attribute(smid, Box::new(target), n.as_ref().to_string())
    }

    pub fn binop(smid: Smid, op: BinaryOperator, l: Expression, r: Expression) -> Expression {
        Expression::BinOp(smid, op, Box::new(l), Box::new(r))
    }

    pub fn compare(smid: Smid, op: Comparator, l: Expression, r: Expression) -> Expression {
        Expression::Compare(smid, op, Box::new(l), Box::new(r))
    }

    pub fn keyword<T: AsRef<str>>(smid: Smid, n: T, value: Expression) -> Keyword {
        Keyword {
            smid,
            name: n.as_ref().to_string(),
            value,
        }
    }

    pub fn assign(smid: Smid, target: Expression, value: Expression) -> Statement {
        Statement::Assign(smid, target, value)
    }

    pub fn expr(smid: Smid, e: Expression) -> Statement {
        Statement::Expr(smid, e)
    }

    pub fn if_(smid: Smid, test: Expression, body: Vec<Statement>, orelse: Vec<Statement>) -> Statement {
        Statement::If(smid, test, body, orelse)
    }

    pub fn class<T: AsRef<str>>(smid: Smid, n: T, bases: Vec<Expression>, body: Vec<Statement>) -> ClassDef {
        ClassDef {
            smid,
            name: n.as_ref().to_string(),
            bases,
            keywords: vec![],
            decorators: vec![],
            body,
        }
    }

    pub fn for_(
        smid: Smid,
        target: Expression,
        iter: Expression,
        body: Vec<Statement>,
        orelse: Vec<Statement>,
    ) -> Statement {
        Statement::For(ForLoop {
            smid,
            target,
            iter,
            body,
            orelse,
        })
    }

    pub fn while_(smid: Smid, test: Expression, body: Vec<Statement>, orelse: Vec<Statement>) -> Statement {
        Statement::While(WhileLoop {
            smid,
            test,
            body,
            orelse,
        })
    }
}
