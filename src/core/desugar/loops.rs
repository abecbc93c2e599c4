//! Lowering of `for` and `while` loops to the primitive loop node.
//!
//! ```text
//! for target in source:            iterator = iter(source)
//!     body                         indicator = False
//! else:                            loop:
//!     orelse                           value = next(iterator)
//!                                        except StopIteration:
//!                                          indicator = True; break
//!                                      target = value
//!                                      body
//!                                  if indicator is True: orelse
//! ```
//!
//! A `while` loop tests its condition at the top of every iteration
//! and breaks out when it fails. In both cases the else clause runs
//! exactly when the loop ended because the iteration was exhausted or
//! the condition failed, never after a user `break`. Without an else
//! clause no indicator is allocated.
use super::{builder::Builder, desugarer::Desugarer};
use crate::{
    common::sourcemap::{HasSmid, Smid},
    core::{
        error::CoreError,
        ir::{self, dsl, Comparator, Expr, Handler, Stmt},
    },
    syntax::ast::Statement,
};
use log::debug;

const INDICATOR: &str = "indicator";

/// Lower a `for` statement. Fails before building anything if `node`
/// is some other statement.
pub fn build_for_loop<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    node: &Statement,
) -> Result<Stmt, CoreError> {
    let for_loop = match node {
        Statement::For(f) => f,
        other => {
            return Err(CoreError::UnexpectedNode(
                other.smid(),
                "for",
                other.kind(),
            ))
        }
    };

    let smid = for_loop.smid;
    let internal = desugarer.internal(smid);
    debug!(
        "lowering for loop in {} (else clause: {})",
        desugarer.module_name(),
        !for_loop.orelse.is_empty()
    );

    let source = builder.build_expression(desugarer, &for_loop.iter)?;
    let else_block = builder.build_statements(desugarer, smid, &for_loop.orelse)?;

    let mut outer = desugarer.new_scope(smid);
    let iterator = outer.get_temp_variable("iterator");
    let indicator = else_block
        .as_ref()
        .map(|_| outer.get_temp_variable(INDICATOR));

    // fetch the next element, or leave the loop on exhaustion
    let mut inner = desugarer.new_scope(internal);
    let value = inner.get_temp_variable("value");

    let mut on_exhaustion = vec![];
    if let Some(indicator) = &indicator {
        on_exhaustion.push(Some(dsl::assign_temp(
            internal,
            indicator.make_reference(&inner),
            dsl::bool_(internal, true),
        )));
    }
    on_exhaustion.push(Some(dsl::break_(internal)));

    let fetch = dsl::try_(
        internal,
        dsl::assign_temp(
            internal,
            value.make_reference(&inner),
            dsl::next(
                internal,
                dsl::temp(internal, iterator.make_reference(&inner)),
            ),
        ),
        vec![Handler {
            smid: internal,
            exception_types: vec![dsl::builtin(internal, "StopIteration")],
            body: ir::sequence_or_empty(internal, on_exhaustion),
        }],
    );
    let bind = builder.build_assignment(
        desugarer,
        &for_loop.target,
        dsl::temp(internal, value.make_reference(&inner)),
    )?;
    inner.set_body(ir::sequence_or_empty(internal, vec![Some(fetch), Some(bind)]))?;

    let body = builder.build_statements(desugarer, smid, &for_loop.body)?;
    let loop_body = ir::sequence_or_empty(internal, vec![Some(inner.into_statement()?), body]);

    let source_at = source.smid();
    let mut statements = vec![Some(dsl::assign_temp(
        internal,
        iterator.make_reference(&outer),
        dsl::iter(source_at, source),
    ))];

    if let Some(indicator) = &indicator {
        statements.push(Some(dsl::assign_temp(
            internal,
            indicator.make_reference(&outer),
            dsl::bool_(internal, false),
        )));
    }

    statements.push(Some(dsl::loop_(smid, loop_body)));

    if let (Some(indicator), Some(else_block)) = (indicator, else_block) {
        statements.push(Some(exhausted_check(
            internal,
            dsl::temp(internal, indicator.make_reference(&outer)),
            else_block,
        )));
    }

    outer.set_body(ir::sequence_or_empty(smid, statements))?;
    outer.into_statement()
}

/// Lower a `while` statement. Fails before building anything if
/// `node` is some other statement.
pub fn build_while_loop<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    node: &Statement,
) -> Result<Stmt, CoreError> {
    let while_loop = match node {
        Statement::While(w) => w,
        other => {
            return Err(CoreError::UnexpectedNode(
                other.smid(),
                "while",
                other.kind(),
            ))
        }
    };

    let smid = while_loop.smid;
    let internal = desugarer.internal(smid);
    debug!(
        "lowering while loop in {} (else clause: {})",
        desugarer.module_name(),
        !while_loop.orelse.is_empty()
    );

    let test = builder.build_expression(desugarer, &while_loop.test)?;
    let else_block = builder.build_statements(desugarer, smid, &while_loop.orelse)?;
    let body = builder.build_statements(desugarer, smid, &while_loop.body)?;

    match else_block {
        None => {
            let exit = dsl::if_(internal, test, None, Some(dsl::break_(internal)));
            Ok(dsl::loop_(
                smid,
                ir::sequence_or_empty(internal, vec![Some(exit), body]),
            ))
        }
        Some(else_block) => {
            let mut scope = desugarer.new_scope(smid);
            let indicator = scope.get_temp_variable(INDICATOR);

            let exit_branch = ir::sequence_or_empty(
                internal,
                vec![
                    Some(dsl::assign_temp(
                        internal,
                        indicator.make_reference(&scope),
                        dsl::bool_(internal, true),
                    )),
                    Some(dsl::break_(internal)),
                ],
            );
            let exit = dsl::if_(internal, test, None, Some(exit_branch));
            let lowered = dsl::loop_(
                smid,
                ir::sequence_or_empty(internal, vec![Some(exit), body]),
            );

            let statements = vec![
                Some(dsl::assign_temp(
                    internal,
                    indicator.make_reference(&scope),
                    dsl::bool_(internal, false),
                )),
                Some(lowered),
                Some(exhausted_check(
                    internal,
                    dsl::temp(internal, indicator.make_reference(&scope)),
                    else_block,
                )),
            ];
            scope.set_body(ir::sequence_or_empty(smid, statements))?;
            scope.into_statement()
        }
    }
}

/// Run the else clause iff the indicator was set on loop exit
fn exhausted_check(smid: Smid, indicator: Expr, else_block: Stmt) -> Stmt {
    dsl::if_(
        smid,
        dsl::compare(smid, Comparator::Is, indicator, dsl::bool_(smid, true)),
        Some(else_block),
        None,
    )
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::common::sourcemap::SourceMap;
    use crate::core::desugar::builder::StandardBuilder;
    use crate::core::ir::{Node, Target};
    use crate::driver::settings::DesugarSettings;
    use crate::syntax::ast::dsl as ast;
    use codespan::Span;

    fn lower(sm: &mut SourceMap, stmt: &Statement) -> Stmt {
        let mut d = Desugarer::new(&DesugarSettings::default(), sm);
        d.translate_statement(&mut StandardBuilder, "loops", stmt)
            .unwrap()
            .unwrap()
    }

    fn count_loops(stmt: &Stmt) -> usize {
        let mut n = 0;
        stmt.walk(&mut |node| {
            if let Node::Stmt(Stmt::Loop(..)) = node {
                n += 1;
            }
        });
        n
    }

    #[test]
    pub fn test_for_without_else_has_no_indicator() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 30));
        let stmt = ast::for_(
            at,
            ast::name(at, "x"),
            ast::name(at, "xs"),
            vec![ast::expr(at, ast::call(at, ast::name(at, "f"), vec![ast::name(at, "x")]))],
            vec![],
        );
        let lowered = lower(&mut sm, &stmt);

        assert!(!lowered.temp_names().contains(&INDICATOR));
        assert_eq!(count_loops(&lowered), 1);
        let statements = match &lowered {
            Stmt::TempBlock(scope) => scope.body().unwrap().statements().to_vec(),
            _ => panic!("expected temp block"),
        };
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[0], Stmt::Assign(_, Target::Temp(r), Expr::Iter(..))
            if r.name() == "iterator"));
        assert!(statements[1].is_loop());
    }

    #[test]
    pub fn test_for_else_sets_indicator_before_loop() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 30));
        let stmt = ast::for_(
            at,
            ast::name(at, "x"),
            ast::name(at, "xs"),
            vec![Statement::Break(at)],
            vec![ast::expr(at, ast::name(at, "done"))],
        );
        let lowered = lower(&mut sm, &stmt);

        let statements = match &lowered {
            Stmt::TempBlock(scope) => {
                assert!(scope.has_variable("iterator"));
                assert!(scope.has_variable(INDICATOR));
                scope.body().unwrap().statements().to_vec()
            }
            _ => panic!("expected temp block"),
        };
        assert_eq!(statements.len(), 4);
        assert!(matches!(&statements[1], Stmt::Assign(_, Target::Temp(r), Expr::Constant(..))
            if r.name() == INDICATOR));
        assert!(statements[2].is_loop());
        assert!(matches!(&statements[3], Stmt::Conditional(_, Expr::Compare(_, Comparator::Is, _, _), Some(_), None)));
    }

    #[test]
    pub fn test_for_loop_body_fetches_then_binds() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 30));
        let stmt = ast::for_(
            at,
            ast::name(at, "x"),
            ast::name(at, "xs"),
            vec![ast::expr(at, ast::name(at, "x"))],
            vec![],
        );
        let lowered = lower(&mut sm, &stmt);

        let mut loop_body = None;
        lowered.walk(&mut |node| {
            if let Node::Stmt(Stmt::Loop(_, body)) = node {
                loop_body = Some(body.as_ref().clone());
            }
        });
        let loop_body = loop_body.unwrap();
        let statements = loop_body.statements();
        let internal = sm.internal(at);
        assert_eq!(statements.len(), 2);

        match &statements[0] {
            Stmt::TempBlock(inner) => {
                assert!(inner.has_variable("value"));
                let fetch = inner.body().unwrap().statements();
                assert!(matches!(&fetch[0], Stmt::Try(_, _, handlers)
                    if handlers[0].exception_types == vec![dsl::builtin(internal, "StopIteration")]));
                assert!(matches!(&fetch[1], Stmt::Assign(_, Target::Name(n), Expr::Temp(..)) if n == "x"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(statements[1], dsl::expr(at, dsl::name(at, "x")));
    }

    #[test]
    pub fn test_while_without_else_is_bare_loop() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 30));
        let stmt = ast::while_(at, ast::name(at, "running"), vec![Statement::Pass(at)], vec![]);
        let lowered = lower(&mut sm, &stmt);

        let internal = sm.internal(at);
        assert_eq!(
            lowered,
            dsl::loop_(
                at,
                Stmt::Sequence(
                    internal,
                    vec![dsl::if_(
                        internal,
                        dsl::name(at, "running"),
                        None,
                        Some(dsl::break_(internal))
                    )]
                )
            )
        );
    }

    #[test]
    pub fn test_while_else_wraps_in_temp_block() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 30));
        let stmt = ast::while_(
            at,
            ast::name(at, "running"),
            vec![],
            vec![ast::expr(at, ast::name(at, "done"))],
        );
        let lowered = lower(&mut sm, &stmt);

        assert!(lowered.is_temp_block());
        assert_eq!(
            lowered.temp_names(),
            vec![INDICATOR, INDICATOR, INDICATOR]
        );
    }

    #[test]
    pub fn test_wrong_node_kind_rejected() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(5, 9));
        let mut d = Desugarer::new(&DesugarSettings::default(), &mut sm);
        let node = Statement::Pass(at);
        assert_eq!(
            build_for_loop(&mut StandardBuilder, &mut d, &node),
            Err(CoreError::UnexpectedNode(at, "for", "pass"))
        );
        assert_eq!(
            build_while_loop(&mut StandardBuilder, &mut d, &node),
            Err(CoreError::UnexpectedNode(at, "while", "pass"))
        );
    }

    #[test]
    pub fn test_for_else_synthesized_statements_are_internal() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 60));
        let user = sm.add(0, Span::new(20, 30));
        let stmt = ast::for_(
            at,
            ast::name(at, "x"),
            ast::name(at, "xs"),
            vec![
                ast::expr(user, ast::call(user, ast::name(user, "f"), vec![])),
                Statement::Break(user),
            ],
            vec![ast::expr(user, ast::name(user, "done"))],
        );
        let lowered = lower(&mut sm, &stmt);

        // iterator, indicator, loop, else check
        let statements = match &lowered {
            Stmt::TempBlock(scope) => scope.body().unwrap().statements().to_vec(),
            _ => panic!("expected temp block"),
        };
        assert!(sm.is_internal(statements[0].smid()));
        assert!(sm.is_internal(statements[1].smid()));
        assert_eq!(statements[2].smid(), at);
        match &statements[3] {
            Stmt::Conditional(s, _, Some(orelse), None) => {
                assert!(sm.is_internal(*s));
                assert_eq!(orelse.statements()[0].smid(), user);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut breaks = vec![];
        let mut handlers = vec![];
        let mut indicator_sets = vec![];
        lowered.walk(&mut |node| match node {
            Node::Stmt(Stmt::Break(s)) => breaks.push(*s),
            Node::Stmt(Stmt::Try(_, _, hs)) => handlers.extend(hs.iter().map(|h| h.smid)),
            Node::Stmt(Stmt::Assign(s, Target::Temp(r), _)) if r.name() == INDICATOR => {
                indicator_sets.push(*s)
            }
            _ => {}
        });
        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks.iter().filter(|s| sm.is_internal(**s)).count(), 1);
        assert!(breaks.contains(&user));
        assert_eq!(handlers.len(), 1);
        assert!(sm.is_internal(handlers[0]));
        assert_eq!(indicator_sets.len(), 2);
        assert!(indicator_sets.iter().all(|s| sm.is_internal(*s)));

        // user body follows the fetch block at its own positions
        let mut loop_body = None;
        lowered.walk(&mut |node| {
            if let Node::Stmt(Stmt::Loop(_, body)) = node {
                loop_body = Some(body.as_ref().clone());
            }
        });
        let loop_body = loop_body.unwrap();
        let body = loop_body.statements();
        assert_eq!(body.len(), 3);
        assert_eq!(body[1].smid(), user);
        assert_eq!(body[2].smid(), user);
    }

    #[test]
    pub fn test_while_else_synthesized_statements_are_internal() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 60));
        let user = sm.add(0, Span::new(20, 30));
        let stmt = ast::while_(
            at,
            ast::name(at, "running"),
            vec![ast::expr(user, ast::call(user, ast::name(user, "step"), vec![]))],
            vec![ast::expr(user, ast::name(user, "done"))],
        );
        let lowered = lower(&mut sm, &stmt);

        let statements = match &lowered {
            Stmt::TempBlock(scope) => scope.body().unwrap().statements().to_vec(),
            _ => panic!("expected temp block"),
        };
        assert_eq!(statements.len(), 3);
        assert!(sm.is_internal(statements[0].smid()));
        assert_eq!(statements[1].smid(), at);
        assert!(sm.is_internal(statements[2].smid()));

        let mut breaks = vec![];
        let mut indicator_sets = vec![];
        lowered.walk(&mut |node| match node {
            Node::Stmt(Stmt::Break(s)) => breaks.push(*s),
            Node::Stmt(Stmt::Assign(s, Target::Temp(r), _)) if r.name() == INDICATOR => {
                indicator_sets.push(*s)
            }
            _ => {}
        });
        assert_eq!(breaks.len(), 1);
        assert!(sm.is_internal(breaks[0]));
        assert_eq!(indicator_sets.len(), 2);
        assert!(indicator_sets.iter().all(|s| sm.is_internal(*s)));

        match &statements[1] {
            Stmt::Loop(_, body) => {
                let body = body.statements();
                assert!(sm.is_internal(body[0].smid()));
                assert_eq!(body[1].smid(), user);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
