//! Export pretty printed version of lowered IR.
//!
//! Output resembles the surface language closely enough to read but
//! is not intended to be parsed back. Temp variables print as
//! `name$scope` where scope identifies the owning temp block.
use crate::common::prettify::ToPretty;
use crate::core::ir::*;
use crate::core::temp::{TempRef, TempScope};
use pretty::{DocAllocator, DocBuilder};

impl ToPretty for Constant {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Constant::None => allocator.text("None"),
            Constant::Bool(b) => allocator.text(if *b { "True" } else { "False" }),
            Constant::Int(n) => allocator.text(format!("{}", n)),
            Constant::Str(s) => allocator.text(format!("{:?}", s)),
        }
    }
}

impl ToPretty for TempRef {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        allocator.text(format!("{}${}", self.name(), self.variable.owner()))
    }
}

/// Wrap an operand in parentheses unless it is atomic
fn operand<'b, D, A>(expr: &'b Expr, allocator: &'b D) -> DocBuilder<'b, D, A>
where
    D: DocAllocator<'b, A>,
    D::Doc: Clone,
    A: Clone,
{
    match expr {
        Expr::Compare(..) | Expr::BinaryOp(..) | Expr::Conditional(..) | Expr::Not(..) => {
            expr.pretty(allocator).parens()
        }
        _ => expr.pretty(allocator),
    }
}

/// Comma separated, as in argument lists
fn commas<'b, D, A, I>(docs: I, allocator: &'b D) -> DocBuilder<'b, D, A>
where
    D: DocAllocator<'b, A>,
    D::Doc: Clone,
    A: Clone,
    I: IntoIterator<Item = DocBuilder<'b, D, A>>,
{
    allocator
        .intersperse(docs, allocator.text(",").append(allocator.space()))
        .group()
}

/// Header line followed by an indented body
fn suite<'b, D, A>(
    header: DocBuilder<'b, D, A>,
    body: Option<&'b Stmt>,
    allocator: &'b D,
) -> DocBuilder<'b, D, A>
where
    D: DocAllocator<'b, A>,
    D::Doc: Clone,
    A: Clone,
{
    let body_doc = match body {
        Some(stmt) => stmt.pretty(allocator),
        None => allocator.text("pass"),
    };
    header
        .append(allocator.text(":"))
        .append(allocator.hardline().append(body_doc).nest(4))
}

impl ToPretty for Expr {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Expr::Constant(_, c) => c.pretty(allocator),
            Expr::Name(_, n) => allocator.text(n),
            Expr::Temp(_, r) => r.pretty(allocator),
            Expr::Builtin(_, n) => allocator.text("builtins.").append(allocator.text(n)),
            Expr::Attribute(_, e, n) => operand(e, allocator)
                .append(allocator.text("."))
                .append(allocator.text(n)),
            Expr::Subscript(_, e, k) | Expr::DictGet(_, e, k) => operand(e, allocator)
                .append(k.pretty(allocator).brackets()),
            Expr::Call(_, f, args, kw) => {
                let mut arg_docs: Vec<_> = args.iter().map(|a| a.pretty(allocator)).collect();
                if let Some(k) = kw {
                    arg_docs.push(allocator.text("**").append(operand(k, allocator)));
                }
                let callee = match f.as_ref() {
                    Expr::Function(..) => f.pretty(allocator).parens(),
                    _ => operand(f, allocator),
                };
                callee.append(commas(arg_docs, allocator).nest(2).parens())
            }
            Expr::MakeTuple(_, xs) => {
                let docs = xs.iter().map(|x| x.pretty(allocator));
                if xs.len() == 1 {
                    commas(docs, allocator).append(allocator.text(",")).parens()
                } else {
                    commas(docs, allocator).parens()
                }
            }
            Expr::MakeList(_, xs) => commas(xs.iter().map(|x| x.pretty(allocator)), allocator)
                .nest(2)
                .brackets(),
            Expr::MakeDict(_, pairs) => {
                let docs = pairs.iter().map(|(k, v)| {
                    k.pretty(allocator)
                        .append(allocator.text(":"))
                        .append(allocator.space())
                        .append(v.pretty(allocator))
                });
                commas(docs, allocator).nest(2).braces()
            }
            Expr::Conditional(_, c, y, n) => operand(y, allocator)
                .append(allocator.text(" if "))
                .append(operand(c, allocator))
                .append(allocator.text(" else "))
                .append(operand(n, allocator)),
            Expr::Compare(_, op, l, r) => operand(l, allocator)
                .append(allocator.text(format!(" {} ", op)))
                .append(operand(r, allocator)),
            Expr::BinaryOp(_, op, l, r) => operand(l, allocator)
                .append(allocator.text(format!(" {} ", op)))
                .append(operand(r, allocator)),
            Expr::Not(_, e) => allocator.text("not ").append(operand(e, allocator)),
            Expr::Iter(_, e) => allocator.text("iter").append(e.pretty(allocator).parens()),
            Expr::Next(_, e) => allocator.text("next").append(e.pretty(allocator).parens()),
            Expr::Unpack(_, e, n) => allocator.text("unpack").append(
                e.pretty(allocator)
                    .append(allocator.text(format!(", {}", n)))
                    .parens(),
            ),
            Expr::TypeOf(_, e) => allocator.text("type").append(e.pretty(allocator).parens()),
            Expr::HasAttr(_, e, n) => allocator.text("hasattr").append(
                e.pretty(allocator)
                    .append(allocator.text(format!(", {:?}", n)))
                    .parens(),
            ),
            Expr::Locals(_) => allocator.text("locals()"),
            Expr::Function(_, f) => {
                let header = match f.kind {
                    FunctionKind::Plain => allocator.text("def "),
                    FunctionKind::ClassSuite => allocator.text("def <class> "),
                };
                suite(
                    header.append(allocator.text(&f.name)).append(allocator.text("()")),
                    f.body.as_ref(),
                    allocator,
                )
            }
        }
    }
}

impl ToPretty for Target {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Target::Name(n) => allocator.text(n),
            Target::Temp(r) => r.pretty(allocator),
            Target::Attribute(e, n) => operand(e, allocator)
                .append(allocator.text("."))
                .append(allocator.text(n)),
            Target::Subscript(e, k) => operand(e, allocator).append(k.pretty(allocator).brackets()),
        }
    }
}

impl ToPretty for TempScope {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        let mut names: Vec<_> = self
            .variables()
            .map(|v| format!("{}${}", v.name(), v.owner()))
            .collect();
        names.sort();
        let header = allocator
            .text("with temps")
            .append(commas(names.into_iter().map(|n| allocator.text(n)), allocator).parens());
        suite(header, self.body(), allocator)
    }
}

impl ToPretty for Stmt {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Stmt::Sequence(_, stmts) if stmts.is_empty() => allocator.text("pass"),
            Stmt::Sequence(_, stmts) => {
                allocator.intersperse(stmts.iter().map(|s| s.pretty(allocator)), allocator.hardline())
            }
            Stmt::Conditional(_, c, yes, no) => {
                let doc = suite(
                    allocator.text("if ").append(c.pretty(allocator)),
                    yes.as_deref(),
                    allocator,
                );
                match no {
                    Some(n) => doc
                        .append(allocator.hardline())
                        .append(suite(allocator.text("else"), Some(&**n), allocator)),
                    None => doc,
                }
            }
            Stmt::Loop(_, body) => suite(allocator.text("loop"), Some(&**body), allocator),
            Stmt::Break(_) => allocator.text("break"),
            Stmt::Continue(_) => allocator.text("continue"),
            Stmt::Return(_, e) => allocator.text("return ").append(e.pretty(allocator)),
            Stmt::Assign(_, t, e) => t
                .pretty(allocator)
                .append(allocator.text(" = "))
                .append(e.pretty(allocator)),
            Stmt::DictRemove(_, d, k) => allocator
                .text("del ")
                .append(operand(d, allocator))
                .append(k.pretty(allocator).brackets()),
            Stmt::SetLocals(_, e) => allocator
                .text("set_locals")
                .append(e.pretty(allocator).parens()),
            Stmt::Expr(_, e) => e.pretty(allocator),
            Stmt::Try(_, tried, handlers) => {
                let mut doc = suite(allocator.text("try"), Some(&**tried), allocator);
                for h in handlers {
                    let types = commas(h.exception_types.iter().map(|t| t.pretty(allocator)), allocator);
                    let header = allocator.text("except ").append(if h.exception_types.len() == 1 {
                        types
                    } else {
                        types.parens()
                    });
                    doc = doc
                        .append(allocator.hardline())
                        .append(suite(header, Some(&h.body), allocator));
                }
                doc
            }
            Stmt::TempBlock(scope) => scope.pretty(allocator),
        }
    }
}
