//! Lowering of class statements.
//!
//! A class statement becomes plain IR in one of two layouts depending
//! on the class protocol in force:
//!
//! - legacy: the suite runs first to produce a namespace mapping and
//!   the metaclass is found in that namespace
//! - modern: the metaclass comes from the statement's keywords, may
//!   prepare the namespace, and is called from inside the suite
//!
//! Both layouts keep their intermediates in temp variables owned by a
//! single temp block and bind the class name exactly once.
pub mod legacy;
pub mod modern;

use super::{builder::Builder, desugarer::Desugarer};
use crate::{
    common::sourcemap::{HasSmid, Smid},
    core::{
        error::CoreError,
        ir::{dsl, Expr, FunctionBody, FunctionKind, Stmt},
        temp::{TempScope, TempVariable},
    },
    driver::settings::ClassProtocol,
    syntax::ast::{ClassDef, Statement},
};
use log::debug;

/// Lower a class statement according to the configured protocol.
///
/// Fails before building anything if `node` is not a class
/// statement.
pub fn build_class_node<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    node: &Statement,
) -> Result<Stmt, CoreError> {
    let class = match node {
        Statement::Class(class) => class,
        other => {
            return Err(CoreError::UnexpectedNode(
                other.smid(),
                "class",
                other.kind(),
            ))
        }
    };

    let protocol = desugarer.class_protocol();
    debug!(
        "lowering class {} in {} ({} protocol)",
        class.name,
        desugarer.module_name(),
        protocol
    );

    match protocol {
        ClassProtocol::Legacy => legacy::build_class(builder, desugarer, class),
        ClassProtocol::Modern => modern::build_class(builder, desugarer, class),
    }
}

/// The tuple of base expressions, in source order
pub(crate) fn build_bases<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    class: &ClassDef,
    smid: Smid,
) -> Result<Expr, CoreError> {
    Ok(dsl::tuple(
        smid,
        builder.build_expressions(desugarer, &class.bases)?,
    ))
}

/// Decorator expressions, innermost (last listed) first
pub(crate) fn build_decorators<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    class: &ClassDef,
) -> Result<Vec<Expr>, CoreError> {
    let mut decorators = builder.build_expressions(desugarer, &class.decorators)?;
    decorators.reverse();
    Ok(decorators)
}

/// Statements opening every class suite: bind `__module__` and, if
/// the class is documented, `__doc__`.
pub(crate) fn suite_prelude(
    desugarer: &Desugarer<'_>,
    smid: Smid,
    doc: Option<&str>,
) -> Vec<Option<Stmt>> {
    vec![
        Some(dsl::assign_name(
            smid,
            "__module__",
            dsl::str(smid, desugarer.module_name()),
        )),
        doc.map(|text| dsl::assign_name(smid, "__doc__", dsl::str(smid, text))),
    ]
}

/// Wrap the suite statements as the class creation function
pub(crate) fn class_suite(
    smid: Smid,
    class: &ClassDef,
    doc: Option<&str>,
    body: Option<Stmt>,
) -> Expr {
    dsl::function(
        smid,
        FunctionBody {
            smid,
            name: class.name.clone(),
            kind: FunctionKind::ClassSuite,
            doc: doc.map(str::to_string),
            body,
        },
    )
}

/// The metaclass used when none is declared: the type of the first
/// base if there are bases, otherwise the builtin `type`.
pub(crate) fn default_metaclass(smid: Smid, scope: &TempScope, bases: &TempVariable) -> Expr {
    let bases_ref = || dsl::temp(smid, bases.make_reference(scope));
    dsl::if_expr(
        smid,
        bases_ref(),
        dsl::type_of(smid, dsl::subscript(smid, bases_ref(), dsl::int(smid, 0))),
        dsl::builtin(smid, "type"),
    )
}
