//! Modern class protocol
//!
//! ```text
//! bases = (b1, b2, ...)
//! class_decl_dict = {keyword: value, ...}
//! metaclass = class_decl_dict["metaclass"] if "metaclass" in class_decl_dict
//!             else (type(bases[0]) if bases else type)
//! if "metaclass" in class_decl_dict: del class_decl_dict["metaclass"]
//! prepared = metaclass.__prepare__("Name", bases, **class_decl_dict)
//!            if hasattr(metaclass, "__prepare__") else {}
//! Name = d1(d2(<suite>()))
//! ```
//!
//! The suite installs `prepared` as its namespace, binds `__module__`
//! and `__doc__`, runs the user body, then creates the class by
//! calling the metaclass with its namespace and returns it.
use super::{build_bases, build_decorators, class_suite, default_metaclass, suite_prelude};
use crate::{
    common::sourcemap::HasSmid,
    core::{
        desugar::{builder::Builder, desugarer::block, desugarer::Desugarer},
        error::CoreError,
        ir::{self, dsl, Comparator, Stmt},
    },
    syntax::ast::ClassDef,
};

const METACLASS_KEY: &str = "metaclass";
const PREPARE: &str = "__prepare__";
const CLASS_CELL: &str = "__class__";

/// Lower `class` using the modern protocol
pub fn build_class<B: Builder + ?Sized>(
    builder: &mut B,
    desugarer: &mut Desugarer<'_>,
    class: &ClassDef,
) -> Result<Stmt, CoreError> {
    let smid = class.smid;
    let internal = desugarer.internal(smid);
    let (doc, statements) = class.split_doc();

    let mut scope = desugarer.new_scope(smid);
    let bases = scope.get_temp_variable("bases");
    let decl = scope.get_temp_variable("class_decl_dict");
    let metaclass = scope.get_temp_variable("metaclass");
    let prepared = scope.get_temp_variable("prepared");

    let bases_tuple = build_bases(builder, desugarer, class, internal)?;

    let keywords = builder.build_keywords(desugarer, &class.keywords)?;
    let decl_dict = dsl::dict(internal, keywords);

    let user_body = builder.build_statements(desugarer, internal, statements)?;

    let decl_ref = || dsl::temp(internal, decl.make_reference(&scope));
    let bases_ref = || dsl::temp(internal, bases.make_reference(&scope));
    let metaclass_ref = || dsl::temp(internal, metaclass.make_reference(&scope));
    let declared = || {
        dsl::compare(
            internal,
            Comparator::In,
            dsl::str(internal, METACLASS_KEY),
            decl_ref(),
        )
    };

    let mut suite = vec![Some(Stmt::SetLocals(
        internal,
        dsl::temp(internal, prepared.make_reference(&scope)),
    ))];
    suite.extend(suite_prelude(desugarer, internal, doc));
    suite.push(user_body);
    suite.push(Some(dsl::assign_name(
        internal,
        CLASS_CELL,
        dsl::call_kw(
            internal,
            metaclass_ref(),
            vec![
                dsl::str(internal, &class.name),
                bases_ref(),
                dsl::locals(internal),
            ],
            decl_ref(),
        ),
    )));
    suite.push(Some(dsl::return_(
        internal,
        dsl::name(internal, CLASS_CELL),
    )));
    let suite = class_suite(internal, class, doc, ir::sequence(internal, suite));

    let mut decorated = dsl::call(internal, suite, vec![]);
    for decorator in build_decorators(builder, desugarer, class)? {
        let at = decorator.smid();
        decorated = dsl::call(at, decorator, vec![decorated]);
    }

    let select_metaclass = dsl::if_expr(
        internal,
        declared(),
        dsl::dict_get(internal, decl_ref(), dsl::str(internal, METACLASS_KEY)),
        default_metaclass(internal, &scope, &bases),
    );

    let prepare = dsl::if_expr(
        internal,
        dsl::has_attr(internal, metaclass_ref(), PREPARE),
        dsl::call_kw(
            internal,
            dsl::attribute(internal, metaclass_ref(), PREPARE),
            vec![dsl::str(internal, &class.name), bases_ref()],
            decl_ref(),
        ),
        dsl::dict(internal, vec![]),
    );

    let body = vec![
        dsl::assign_temp(internal, bases.make_reference(&scope), bases_tuple),
        dsl::assign_temp(internal, decl.make_reference(&scope), decl_dict),
        dsl::assign_temp(internal, metaclass.make_reference(&scope), select_metaclass),
        dsl::if_(
            internal,
            declared(),
            Some(Stmt::DictRemove(
                internal,
                decl_ref(),
                dsl::str(internal, METACLASS_KEY),
            )),
            None,
        ),
        dsl::assign_temp(internal, prepared.make_reference(&scope), prepare),
        dsl::assign_name(smid, &class.name, decorated),
    ];

    scope.set_body(block(smid, body))?;
    scope.into_statement()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::common::sourcemap::SourceMap;
    use crate::core::desugar::builder::StandardBuilder;
    use crate::core::ir::{Expr, Node, Target};
    use crate::driver::settings::DesugarSettings;
    use crate::syntax::ast::{dsl as ast, Statement};
    use codespan::Span;

    fn lower(sm: &mut SourceMap, class: &ClassDef) -> Stmt {
        let mut d = Desugarer::new(&DesugarSettings::default(), sm);
        d.translate_statement(&mut StandardBuilder, "shapes", &Statement::Class(class.clone()))
            .unwrap()
            .unwrap()
    }

    fn top_level(lowered: &Stmt) -> Vec<Stmt> {
        match lowered {
            Stmt::TempBlock(scope) => scope.body().unwrap().statements().to_vec(),
            other => panic!("expected temp block, got {:?}", other),
        }
    }

    #[test]
    pub fn test_temps_and_ordering() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 20));
        let class = ast::class(at, "Foo", vec![], vec![Statement::Pass(at)]);
        let lowered = lower(&mut sm, &class);

        if let Stmt::TempBlock(scope) = &lowered {
            let mut names: Vec<_> = scope.variables().map(|v| v.name().to_string()).collect();
            names.sort();
            assert_eq!(
                names,
                vec!["bases", "class_decl_dict", "metaclass", "prepared"]
            );
        }

        let statements = top_level(&lowered);
        assert_eq!(statements.len(), 6);
        assert!(matches!(&statements[3], Stmt::Conditional(_, _, Some(yes), None)
            if matches!(yes.as_ref(), Stmt::DictRemove(..))));
        assert!(matches!(&statements[5], Stmt::Assign(s, Target::Name(n), _)
            if n == "Foo" && *s == at));
    }

    #[test]
    pub fn test_suite_installs_prepared_namespace_first() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 20));
        let class = ast::class(at, "Foo", vec![], vec![]);
        let lowered = lower(&mut sm, &class);

        let mut suite = None;
        lowered.walk(&mut |node| {
            if let Node::Expr(Expr::Function(_, f)) = node {
                suite = Some(f.clone());
            }
        });
        let suite = suite.unwrap();
        let statements = suite.body.as_ref().unwrap().statements();

        assert!(matches!(&statements[0], Stmt::SetLocals(_, Expr::Temp(_, r)) if r.name() == "prepared"));
        assert!(matches!(&statements[1], Stmt::Assign(_, Target::Name(n), _) if n == "__module__"));
        assert!(
            matches!(statements.last(), Some(Stmt::Return(_, Expr::Name(_, n))) if n == "__class__")
        );
    }

    #[test]
    pub fn test_decorators_nest_around_suite_call() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(20, 40));
        let d1 = sm.add(0, Span::new(0, 3));
        let d2 = sm.add(0, Span::new(4, 7));
        let mut class = ast::class(at, "Foo", vec![], vec![]);
        class.decorators = vec![ast::name(d1, "d1"), ast::name(d2, "d2")];
        let lowered = lower(&mut sm, &class);

        let statements = top_level(&lowered);
        match statements.last() {
            Some(Stmt::Assign(_, Target::Name(_), Expr::Call(outer_at, outer, args, None))) => {
                assert_eq!(*outer_at, d1);
                assert_eq!(outer.as_ref(), &dsl::name(d1, "d1"));
                match &args[0] {
                    Expr::Call(inner_at, inner, inner_args, None) => {
                        assert_eq!(*inner_at, d2);
                        assert_eq!(inner.as_ref(), &dsl::name(d2, "d2"));
                        assert!(matches!(&inner_args[0], Expr::Call(_, f, _, _)
                            if matches!(f.as_ref(), Expr::Function(..))));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    pub fn test_keywords_collected_in_declaration_dict() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 20));
        let mut class = ast::class(at, "Foo", vec![ast::name(at, "Base")], vec![]);
        class.keywords = vec![
            ast::keyword(at, "metaclass", ast::name(at, "Meta")),
            ast::keyword(at, "flag", ast::bool_(at, true)),
        ];
        let lowered = lower(&mut sm, &class);

        let statements = top_level(&lowered);
        match &statements[1] {
            Stmt::Assign(_, Target::Temp(r), Expr::MakeDict(_, entries)) => {
                assert_eq!(r.name(), "class_decl_dict");
                assert_eq!(
                    entries,
                    &vec![
                        (dsl::str(at, "metaclass"), dsl::name(at, "Meta")),
                        (dsl::str(at, "flag"), dsl::bool_(at, true)),
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    pub fn test_synthesized_statements_are_internal() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 40));
        let user = sm.add(0, Span::new(20, 25));
        let mut class = ast::class(
            at,
            "Foo",
            vec![ast::name(at, "Base")],
            vec![ast::assign(user, ast::name(user, "x"), ast::int(user, 1))],
        );
        class.keywords = vec![ast::keyword(at, "metaclass", ast::name(at, "Meta"))];
        let lowered = lower(&mut sm, &class);

        // bases, decl dict, metaclass, removal, prepared; then the name
        let statements = top_level(&lowered);
        let (last, rest) = statements.split_last().unwrap();
        assert_eq!(last.smid(), at);
        for s in rest {
            assert!(sm.is_internal(s.smid()));
        }
        match &statements[3] {
            Stmt::Conditional(_, _, Some(remove), None) => {
                assert!(matches!(remove.as_ref(), Stmt::DictRemove(s, _, _) if sm.is_internal(*s)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut suite = None;
        lowered.walk(&mut |node| {
            if let Node::Expr(Expr::Function(_, f)) = node {
                suite = Some(f.clone());
            }
        });
        let suite = suite.unwrap();
        for stmt in suite.body.as_ref().unwrap().statements() {
            match stmt {
                Stmt::Assign(s, Target::Name(n), _) if n == "x" => assert_eq!(*s, user),
                other => assert!(sm.is_internal(other.smid()), "{:?}", other),
            }
        }
    }

    #[test]
    pub fn test_repeated_keyword_rejected() {
        let mut sm = SourceMap::new();
        let at = sm.add(0, Span::new(0, 20));
        let again = sm.add(0, Span::new(30, 34));
        let mut class = ast::class(at, "Foo", vec![], vec![]);
        class.keywords = vec![
            ast::keyword(at, "flag", ast::bool_(at, true)),
            ast::keyword(again, "flag", ast::bool_(again, false)),
        ];
        let mut d = Desugarer::new(&DesugarSettings::default(), &mut sm);
        assert_eq!(
            d.translate_statement(&mut StandardBuilder, "shapes", &Statement::Class(class)),
            Err(CoreError::Unsupported(
                again,
                "repeated keyword argument flag".to_string()
            ))
        );
    }
}
