//! Run lowered modules and check what they do
use reform::common::sourcemap::{Smid, SourceMap};
use reform::driver::lower::lower_and_run;
use reform::driver::settings::{ClassProtocol, DesugarSettings};
use reform::eval::{value::Keywords, ExecutionError, Machine, Native, Value};
use reform::syntax::ast::{dsl::*, BinaryOperator, ClassDef, Comparator, Expression, Statement};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn s() -> Smid {
    Smid::default()
}

fn module(body: Vec<Statement>) -> reform::syntax::ast::Module {
    reform::syntax::ast::Module {
        smid: s(),
        name: "app.models".to_string(),
        body,
    }
}

fn run(protocol: ClassProtocol, machine: &mut Machine, body: Vec<Statement>) {
    let settings = DesugarSettings::default().with_class_protocol(protocol);
    let mut sm = SourceMap::new();
    lower_and_run(&settings, &mut sm, &module(body), machine).unwrap();
    assert_eq!(machine.live_temps(), 0);
}

fn print(e: Expression) -> Statement {
    expr(s(), call(s(), name(s(), "print"), vec![e]))
}

fn ints(xs: &[i64]) -> Expression {
    list(s(), xs.iter().map(|x| int(s(), *x)).collect())
}

fn class_stmt(class: ClassDef) -> Statement {
    Statement::Class(class)
}

/// Build a class value from metaclass call arguments
fn class_from_args(args: &[Value], metaclass: Value) -> Value {
    match args {
        [Value::Str(n), Value::Tuple(bases), Value::Dict(ns)] => Value::class(
            n,
            bases.to_vec(),
            ns.borrow().clone(),
            metaclass,
        ),
        _ => Value::None,
    }
}

fn keys(ns: &Value) -> Vec<String> {
    match ns {
        Value::Dict(d) => d.borrow().keys().cloned().collect(),
        _ => vec![],
    }
}

fn strings(machine: &Machine) -> Vec<&str> {
    machine.output().iter().map(String::as_str).collect()
}

/// A decorator that wraps its argument as (name, arg) and logs the call
fn decorator(label: &'static str, log: &Log) -> Value {
    let log = log.clone();
    Value::native(Native::new(label, move |args: &[Value], _: &Keywords| {
        log.borrow_mut().push(label.to_string());
        Ok(Value::tuple(vec![Value::str(label), args[0].clone()]))
    }))
}

#[test]
pub fn test_for_else_runs_when_exhausted() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![for_(
            s(),
            name(s(), "x"),
            ints(&[1, 2, 3]),
            vec![print(name(s(), "x"))],
            vec![print(str(s(), "done"))],
        )],
    );
    assert_eq!(strings(&m), vec!["1", "2", "3", "done"]);
}

#[test]
pub fn test_for_else_skipped_after_break() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![for_(
            s(),
            name(s(), "x"),
            ints(&[1, 2, 3]),
            vec![
                if_(
                    s(),
                    compare(s(), Comparator::Eq, name(s(), "x"), int(s(), 2)),
                    vec![Statement::Break(s())],
                    vec![],
                ),
                print(name(s(), "x")),
            ],
            vec![print(str(s(), "done"))],
        )],
    );
    assert_eq!(strings(&m), vec!["1"]);
}

#[test]
pub fn test_for_over_empty_runs_else() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![for_(
            s(),
            name(s(), "x"),
            list(s(), vec![]),
            vec![Statement::Pass(s())],
            vec![print(str(s(), "X"))],
        )],
    );
    assert_eq!(strings(&m), vec!["X"]);
}

#[test]
pub fn test_while_false_runs_else() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![while_(
            s(),
            bool_(s(), false),
            vec![Statement::Pass(s())],
            vec![print(str(s(), "X"))],
        )],
    );
    assert_eq!(strings(&m), vec!["X"]);
}

#[test]
pub fn test_while_retests_condition_each_iteration() {
    let mut m = Machine::new();
    let n = || name(s(), "n");
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![
            assign(s(), n(), int(s(), 0)),
            while_(
                s(),
                compare(s(), Comparator::Lt, n(), int(s(), 3)),
                vec![
                    assign(s(), n(), binop(s(), BinaryOperator::Add, n(), int(s(), 1))),
                    print(n()),
                ],
                vec![print(str(s(), "else"))],
            ),
        ],
    );
    assert_eq!(strings(&m), vec!["1", "2", "3", "else"]);
}

#[test]
pub fn test_while_break_skips_else() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![while_(
            s(),
            bool_(s(), true),
            vec![Statement::Break(s())],
            vec![print(str(s(), "else"))],
        )],
    );
    assert!(m.output().is_empty());
}

#[test]
pub fn test_continue_and_destructuring() {
    let mut m = Machine::new();
    let pairs = list(
        s(),
        vec![
            tuple(s(), vec![int(s(), 1), str(s(), "a")]),
            tuple(s(), vec![int(s(), 2), str(s(), "b")]),
            tuple(s(), vec![int(s(), 3), str(s(), "c")]),
        ],
    );
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![for_(
            s(),
            tuple(s(), vec![name(s(), "k"), name(s(), "v")]),
            pairs,
            vec![
                if_(
                    s(),
                    compare(s(), Comparator::Eq, name(s(), "k"), int(s(), 2)),
                    vec![Statement::Continue(s())],
                    vec![],
                ),
                print(name(s(), "v")),
            ],
            vec![],
        )],
    );
    assert_eq!(strings(&m), vec!["a", "c"]);
}

#[test]
pub fn test_nested_loops_break_inner_only() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![for_(
            s(),
            name(s(), "i"),
            ints(&[1, 2]),
            vec![for_(
                s(),
                name(s(), "j"),
                ints(&[10, 20]),
                vec![print(name(s(), "j")), Statement::Break(s())],
                vec![print(str(s(), "inner else"))],
            )],
            vec![print(str(s(), "outer else"))],
        )],
    );
    assert_eq!(strings(&m), vec!["10", "10", "outer else"]);
}

#[test]
pub fn test_decorators_apply_innermost_first() {
    for protocol in &[ClassProtocol::Legacy, ClassProtocol::Modern] {
        let log: Log = Rc::new(RefCell::new(vec![]));
        let mut m = Machine::new();
        m.define("d1", decorator("d1", &log));
        m.define("d2", decorator("d2", &log));
        m.define("d3", decorator("d3", &log));

        let mut class = class(s(), "Foo", vec![], vec![Statement::Pass(s())]);
        class.decorators = vec![name(s(), "d1"), name(s(), "d2"), name(s(), "d3")];
        run(*protocol, &mut m, vec![class_stmt(class)]);

        assert_eq!(*log.borrow(), vec!["d3", "d2", "d1"]);
        assert_eq!(
            m.global("Foo").unwrap().to_string(),
            "(\"d1\", (\"d2\", (\"d3\", <class 'Foo'>)))"
        );
    }
}

#[test]
pub fn test_class_namespace_contents() {
    for protocol in &[ClassProtocol::Legacy, ClassProtocol::Modern] {
        let mut m = Machine::new();
        let class = class(
            s(),
            "Point",
            vec![],
            vec![
                expr(s(), str(s(), "A point.")),
                assign(s(), name(s(), "dims"), int(s(), 2)),
            ],
        );
        run(*protocol, &mut m, vec![class_stmt(class)]);

        match m.global("Point").unwrap() {
            Value::Class(c) => {
                assert_eq!(c.name, "Point");
                assert_eq!(c.lookup("__module__").unwrap().to_string(), "app.models");
                assert_eq!(c.lookup("__doc__").unwrap().to_string(), "A point.");
                assert_eq!(c.lookup("dims").unwrap().to_string(), "2");
                assert!(c.metaclass.is(&Value::builtin("type")));
            }
            other => panic!("expected class, got {}", other),
        }
    }
}

#[test]
pub fn test_class_inherits_metaclass_of_first_base() {
    for protocol in &[ClassProtocol::Legacy, ClassProtocol::Modern] {
        let log: Log = Rc::new(RefCell::new(vec![]));
        let slot: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

        let meta = {
            let log = log.clone();
            let slot = slot.clone();
            Value::native(Native::new("Meta", move |args: &[Value], _: &Keywords| {
                log.borrow_mut().push(args[0].to_string());
                let me = slot.borrow().clone().unwrap_or(Value::None);
                Ok(class_from_args(args, me))
            }))
        };
        *slot.borrow_mut() = Some(meta.clone());

        let mut m = Machine::new();
        let base = class_from_args(
            &[
                Value::str("Base"),
                Value::tuple(vec![]),
                Value::Dict(reform::eval::value::namespace()),
            ],
            meta,
        );
        m.define("Base", base);

        let derived = class(s(), "Derived", vec![name(s(), "Base")], vec![]);
        run(*protocol, &mut m, vec![class_stmt(derived)]);

        assert_eq!(*log.borrow(), vec!["Derived"]);
        match m.global("Derived").unwrap() {
            Value::Class(c) => assert_eq!(c.bases.len(), 1),
            other => panic!("expected class, got {}", other),
        }
    }
}

#[test]
pub fn test_legacy_metaclass_from_class_body() {
    let log: Log = Rc::new(RefCell::new(vec![]));
    let meta = {
        let log = log.clone();
        Value::native(Native::new("Meta", move |args: &[Value], _: &Keywords| {
            log.borrow_mut().extend(keys(&args[2]));
            Ok(class_from_args(args, Value::None))
        }))
    };

    let mut m = Machine::new();
    m.define("Meta", meta);
    let class = class(
        s(),
        "Model",
        vec![],
        vec![
            assign(s(), name(s(), "__metaclass__"), name(s(), "Meta")),
            assign(s(), name(s(), "table"), str(s(), "models")),
        ],
    );
    run(ClassProtocol::Legacy, &mut m, vec![class_stmt(class)]);

    assert_eq!(*log.borrow(), vec!["__module__", "__metaclass__", "table"]);
}

#[test]
pub fn test_modern_prepare_and_metaclass_keyword() {
    let log: Log = Rc::new(RefCell::new(vec![]));

    let prepare = {
        let log = log.clone();
        Value::native(Native::new("__prepare__", move |args: &[Value], kwargs: &Keywords| {
            log.borrow_mut().push(format!("prepare {}", args[0]));
            for (k, _) in kwargs {
                log.borrow_mut().push(format!("prepare kw {}", k));
            }
            let ns = reform::eval::value::namespace();
            ns.borrow_mut().insert("seeded".to_string(), Value::Int(1));
            Ok(Value::Dict(ns))
        }))
    };

    let meta = {
        let log = log.clone();
        Native::new("Meta", move |args: &[Value], kwargs: &Keywords| {
            log.borrow_mut().push(format!("call {}", keys(&args[2]).join(",")));
            for (k, _) in kwargs {
                log.borrow_mut().push(format!("call kw {}", k));
            }
            Ok(class_from_args(args, Value::None))
        })
        .with_attribute("__prepare__", prepare)
    };

    let mut m = Machine::new();
    m.define("Meta", Value::native(meta));
    let mut class = class(
        s(),
        "Model",
        vec![],
        vec![assign(s(), name(s(), "x"), int(s(), 1))],
    );
    class.keywords = vec![
        keyword(s(), "metaclass", name(s(), "Meta")),
        keyword(s(), "flag", bool_(s(), true)),
    ];
    run(ClassProtocol::Modern, &mut m, vec![class_stmt(class)]);

    assert_eq!(
        *log.borrow(),
        vec![
            "prepare Model",
            "prepare kw flag",
            "call seeded,__module__,x",
            "call kw flag",
        ]
    );
    match m.global("Model").unwrap() {
        Value::Class(c) => assert!(c.lookup("seeded").is_some()),
        other => panic!("expected class, got {}", other),
    }
}

#[test]
pub fn test_modern_metaclass_without_prepare_gets_empty_namespace() {
    let log: Log = Rc::new(RefCell::new(vec![]));
    let meta = {
        let log = log.clone();
        Value::native(Native::new("Meta", move |args: &[Value], _: &Keywords| {
            log.borrow_mut().extend(keys(&args[2]));
            Ok(class_from_args(args, Value::None))
        }))
    };

    let mut m = Machine::new();
    m.define("Meta", meta);
    let mut class = class(s(), "Plain", vec![], vec![]);
    class.keywords = vec![keyword(s(), "metaclass", name(s(), "Meta"))];
    run(ClassProtocol::Modern, &mut m, vec![class_stmt(class)]);

    assert_eq!(*log.borrow(), vec!["__module__"]);
}

#[test]
pub fn test_builtin_type_rejects_extra_keywords() {
    let mut class = class(s(), "Flagged", vec![], vec![]);
    class.keywords = vec![keyword(s(), "flag", bool_(s(), true))];

    let mut sm = SourceMap::new();
    let mut m = Machine::new();
    let result = lower_and_run(
        &DesugarSettings::default(),
        &mut sm,
        &module(vec![class_stmt(class)]),
        &mut m,
    );
    assert!(matches!(
        result,
        Err(reform::driver::error::ReformError::Execution(ExecutionError::Exception(_, kind, _)))
            if kind == "TypeError"
    ));
}

/// Run a module expected to raise, returning (kind, message)
fn raised(body: Vec<Statement>) -> (String, String) {
    let mut sm = SourceMap::new();
    let mut m = Machine::new();
    match lower_and_run(&DesugarSettings::default(), &mut sm, &module(body), &mut m) {
        Err(reform::driver::error::ReformError::Execution(ExecutionError::Exception(
            _,
            kind,
            message,
        ))) => {
            assert_eq!(m.live_temps(), 0);
            (kind, message)
        }
        other => panic!("expected an exception, got {:?}", other.map(|u| u.express())),
    }
}

fn pair_target() -> Expression {
    tuple(s(), vec![name(s(), "a"), name(s(), "b")])
}

#[test]
pub fn test_unpacking_too_many_values() {
    let (kind, message) = raised(vec![assign(s(), pair_target(), ints(&[1, 2, 3]))]);
    assert_eq!(kind, "ValueError");
    assert_eq!(message, "too many values to unpack (expected 2)");
}

#[test]
pub fn test_unpacking_too_few_values() {
    let (kind, message) = raised(vec![assign(
        s(),
        pair_target(),
        tuple(s(), vec![int(s(), 1)]),
    )]);
    assert_eq!(kind, "ValueError");
    assert_eq!(message, "not enough values to unpack (expected 2, got 1)");
}

#[test]
pub fn test_for_target_unpacking_checks_count() {
    let rows = list(
        s(),
        vec![ints(&[1, 2]), ints(&[3, 4, 5])],
    );
    let (kind, message) = raised(vec![for_(
        s(),
        pair_target(),
        rows,
        vec![print(name(s(), "a"))],
        vec![],
    )]);
    assert_eq!(kind, "ValueError");
    assert_eq!(message, "too many values to unpack (expected 2)");
}

#[test]
pub fn test_nested_unpacking() {
    let mut m = Machine::new();
    run(
        ClassProtocol::Modern,
        &mut m,
        vec![assign(
            s(),
            tuple(s(), vec![name(s(), "first"), pair_target()]),
            tuple(s(), vec![int(s(), 1), str(s(), "xy")]),
        )],
    );
    assert_eq!(m.global("first").unwrap().to_string(), "1");
    assert_eq!(m.global("a").unwrap().to_string(), "x");
    assert_eq!(m.global("b").unwrap().to_string(), "y");
}
