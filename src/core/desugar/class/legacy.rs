//! Legacy class protocol
//!
//! ```text
//! bases = (b1, b2, ...)
//! class_dict = <suite>()
//! metaclass = class_dict["__metaclass__"] if "__metaclass__" in class_dict
//!             else (type(bases[0]) if bases else type)
//! class = metaclass("Name", bases, class_dict)
//! class = dN(class) ... class = d1(class)
//! Name = class
//! ```
//!
//! The suite binds `__module__` and `__doc__`, runs the user body and
//! returns its local namespace.
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

const METACLASS_KEY: &str = "__metaclass__";

/// Lower `class` using the legacy protocol
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
    let class_dict = scope.get_temp_variable("class_dict");
    let metaclass = scope.get_temp_variable("metaclass");
    let class_var = scope.get_temp_variable("class");

    let bases_tuple = build_bases(builder, desugarer, class, internal)?;

    let mut suite = suite_prelude(desugarer, internal, doc);
    suite.push(builder.build_statements(desugarer, internal, statements)?);
    suite.push(Some(dsl::return_(internal, dsl::locals(internal))));
    let suite = class_suite(internal, class, doc, ir::sequence(internal, suite));

    let decorators = build_decorators(builder, desugarer, class)?;

    let dict_ref = || dsl::temp(internal, class_dict.make_reference(&scope));
    let declared = dsl::compare(
        internal,
        Comparator::In,
        dsl::str(internal, METACLASS_KEY),
        dict_ref(),
    );
    let select_metaclass = dsl::if_expr(
        internal,
        declared,
        dsl::dict_get(internal, dict_ref(), dsl::str(internal, METACLASS_KEY)),
        default_metaclass(internal, &scope, &bases),
    );

    let create = dsl::call(
        internal,
        dsl::temp(internal, metaclass.make_reference(&scope)),
        vec![
            dsl::str(internal, &class.name),
            dsl::temp(internal, bases.make_reference(&scope)),
            dict_ref(),
        ],
    );

    let mut body = vec![
        dsl::assign_temp(internal, bases.make_reference(&scope), bases_tuple),
        dsl::assign_temp(
            internal,
            class_dict.make_reference(&scope),
            dsl::call(internal, suite, vec![]),
        ),
        dsl::assign_temp(internal, metaclass.make_reference(&scope), select_metaclass),
        dsl::assign_temp(internal, class_var.make_reference(&scope), create),
    ];

    for decorator in decorators {
        let at = decorator.smid();
        let rebind_at = desugarer.internal(at);
        let decorated = dsl::call(
            at,
            decorator,
            vec![dsl::temp(rebind_at, class_var.make_reference(&scope))],
        );
        body.push(dsl::assign_temp(
            rebind_at,
            class_var.make_reference(&scope),
            decorated,
        ));
    }

    body.push(dsl::assign_name(
        smid,
        &class.name,
        dsl::temp(internal, class_var.make_reference(&scope)),
    ));

    scope.set_body(block(smid, body))?;
    scope.into_statement()
}
