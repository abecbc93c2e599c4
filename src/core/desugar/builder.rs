//! The general tree builder that reformulations recurse through
use super::{class, desugarer::Desugarer, loops};
use crate::{
    common::sourcemap::{HasSmid, Smid},
    core::{
        error::CoreError,
        ir::{self, dsl, Expr, Stmt, Target},
    },
    syntax::ast::{Expression, Keyword, Statement},
};
use std::collections::HashSet;

/// Translates surface expressions, statement lists and assignment
/// targets into IR.
///
/// Reformulations receive a builder rather than calling back into a
/// global translator so that they can be exercised against
/// alternative builders.
pub trait Builder {
    /// Translate an expression
    fn build_expression(&mut self, desugarer: &mut Desugarer<'_>, expr: &Expression)
        -> Result<Expr, CoreError>;

    /// Translate a single statement, yielding nothing for statements
    /// with no runtime effect
    fn build_statement(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        statement: &Statement,
    ) -> Result<Option<Stmt>, CoreError>;

    /// Translate an assignment of the already translated `source` to
    /// the surface target expression `target`
    fn build_assignment(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        target: &Expression,
        source: Expr,
    ) -> Result<Stmt, CoreError>;

    /// Translate a statement list into a normalised sequence; an
    /// empty list yields nothing
    fn build_statements(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        smid: Smid,
        statements: &[Statement],
    ) -> Result<Option<Stmt>, CoreError> {
        let mut built = Vec::with_capacity(statements.len());
        for statement in statements {
            built.push(self.build_statement(desugarer, statement)?);
        }
        Ok(ir::sequence(smid, built))
    }

    /// Translate keyword arguments into the entries of a keyword
    /// mapping. A keyword may appear only once.
    fn build_keywords(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        keywords: &[Keyword],
    ) -> Result<Vec<(Expr, Expr)>, CoreError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(keywords.len());
        for k in keywords {
            if !seen.insert(k.name.as_str()) {
                return Err(CoreError::Unsupported(
                    k.smid,
                    format!("repeated keyword argument {}", k.name),
                ));
            }
            entries.push((
                dsl::str(k.smid, &k.name),
                self.build_expression(desugarer, &k.value)?,
            ));
        }
        Ok(entries)
    }

    /// Translate expressions in order
    fn build_expressions(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        exprs: &[Expression],
    ) -> Result<Vec<Expr>, CoreError> {
        exprs
            .iter()
            .map(|e| self.build_expression(desugarer, e))
            .collect()
    }
}

/// The builder used for real compilation
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardBuilder;

impl Builder for StandardBuilder {
    fn build_expression(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        expr: &Expression,
    ) -> Result<Expr, CoreError> {
        Ok(match expr {
            Expression::Name(s, n) => dsl::name(*s, n),
            Expression::Str(s, v) => dsl::str(*s, v),
            Expression::Int(s, n) => dsl::int(*s, *n),
            Expression::Bool(s, b) => dsl::bool_(*s, *b),
            Expression::None(s) => dsl::none(*s),
            Expression::Tuple(s, xs) => dsl::tuple(*s, self.build_expressions(desugarer, xs)?),
            Expression::List(s, xs) => dsl::list(*s, self.build_expressions(desugarer, xs)?),
            Expression::Dict(s, pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = self.build_expression(desugarer, k)?;
                    let value = self.build_expression(desugarer, v)?;
                    entries.push((key, value));
                }
                dsl::dict(*s, entries)
            }
            Expression::Call(s, f, args, keywords) => {
                let callee = self.build_expression(desugarer, f)?;
                let args = self.build_expressions(desugarer, args)?;
                if keywords.is_empty() {
                    dsl::call(*s, callee, args)
                } else {
                    let entries = self.build_keywords(desugarer, keywords)?;
                    dsl::call_kw(*s, callee, args, dsl::dict(*s, entries))
                }
            }
            Expression::Attribute(s, e, n) => {
                dsl::attribute(*s, self.build_expression(desugarer, e)?, n)
            }
            Expression::Subscript(s, e, k) => dsl::subscript(
                *s,
                self.build_expression(desugarer, e)?,
                self.build_expression(desugarer, k)?,
            ),
            Expression::BinOp(s, op, l, r) => Expr::BinaryOp(
                *s,
                *op,
                Box::new(self.build_expression(desugarer, l)?),
                Box::new(self.build_expression(desugarer, r)?),
            ),
            Expression::Compare(s, op, l, r) => dsl::compare(
                *s,
                *op,
                self.build_expression(desugarer, l)?,
                self.build_expression(desugarer, r)?,
            ),
            Expression::Not(s, e) => Expr::Not(*s, Box::new(self.build_expression(desugarer, e)?)),
        })
    }

    fn build_statement(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        statement: &Statement,
    ) -> Result<Option<Stmt>, CoreError> {
        match statement {
            Statement::Class(_) => class::build_class_node(self, desugarer, statement).map(Some),
            Statement::For(_) => loops::build_for_loop(self, desugarer, statement).map(Some),
            Statement::While(_) => loops::build_while_loop(self, desugarer, statement).map(Some),
            Statement::If(s, test, body, orelse) => {
                let test = self.build_expression(desugarer, test)?;
                let yes = self.build_statements(desugarer, *s, body)?;
                let no = self.build_statements(desugarer, *s, orelse)?;
                Ok(Some(dsl::if_(*s, test, yes, no)))
            }
            Statement::Assign(_, target, value) => {
                let source = self.build_expression(desugarer, value)?;
                self.build_assignment(desugarer, target, source).map(Some)
            }
            Statement::Expr(s, e) => Ok(Some(dsl::expr(*s, self.build_expression(desugarer, e)?))),
            Statement::Return(s, value) => {
                let value = match value {
                    Some(v) => self.build_expression(desugarer, v)?,
                    None => dsl::none(*s),
                };
                Ok(Some(dsl::return_(*s, value)))
            }
            Statement::Break(s) => Ok(Some(dsl::break_(*s))),
            Statement::Continue(s) => Ok(Some(Stmt::Continue(*s))),
            Statement::Pass(_) => Ok(None),
        }
    }

    fn build_assignment(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        target: &Expression,
        source: Expr,
    ) -> Result<Stmt, CoreError> {
        match target {
            Expression::Name(s, n) => Ok(dsl::assign_name(*s, n, source)),
            Expression::Attribute(s, e, n) => {
                let object = self.build_expression(desugarer, e)?;
                Ok(dsl::assign(*s, Target::Attribute(object, n.clone()), source))
            }
            Expression::Subscript(s, e, k) => {
                let object = self.build_expression(desugarer, e)?;
                let key = self.build_expression(desugarer, k)?;
                Ok(dsl::assign(*s, Target::Subscript(object, key), source))
            }
            Expression::Tuple(s, elements) | Expression::List(s, elements) => {
                self.build_unpacking(desugarer, *s, elements, source)
            }
            other => Err(CoreError::InvalidAssignmentTarget(other.smid())),
        }
    }
}

impl StandardBuilder {
    /// Destructure `source` into `elements` via a temp holding exactly
    /// as many values as there are elements
    fn build_unpacking(
        &mut self,
        desugarer: &mut Desugarer<'_>,
        smid: Smid,
        elements: &[Expression],
        source: Expr,
    ) -> Result<Stmt, CoreError> {
        let internal = desugarer.internal(smid);
        let mut scope = desugarer.new_scope(smid);
        let unpack = scope.get_temp_variable("unpack");

        let mut statements = vec![Some(dsl::assign_temp(
            internal,
            unpack.make_reference(&scope),
            dsl::unpack(smid, source, elements.len()),
        ))];
        for (i, element) in elements.iter().enumerate() {
            let item = dsl::subscript(
                internal,
                dsl::temp(internal, unpack.make_reference(&scope)),
                dsl::int(internal, i as i64),
            );
            statements.push(Some(self.build_assignment(desugarer, element, item)?));
        }

        scope.set_body(ir::sequence_or_empty(smid, statements))?;
        scope.into_statement()
    }
}
