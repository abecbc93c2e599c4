//! Verify integrity of lowered IR before handing it on
use crate::common::sourcemap::{HasSmid, Smid};
use crate::core::error::CoreError;
use crate::core::ir::*;
use crate::core::temp::{ScopeId, TempRef};
use crate::core::unit::TranslationUnit;

/// Scan the statement for errors
pub fn verify(stmt: &Stmt) -> Vec<CoreError> {
    let mut verifier = Verifier::default();
    verifier.stmt(stmt);
    verifier.errors
}

/// Scan a whole unit for errors
pub fn verify_unit(unit: &TranslationUnit) -> Vec<CoreError> {
    unit.body.as_ref().map(verify).unwrap_or_default()
}

pub struct Verifier {
    errors: Vec<CoreError>,
    /// Temp scopes enclosing the current node, innermost last
    scopes: Vec<ScopeId>,
    /// Loop nesting depth per function frame, innermost last
    loops: Vec<usize>,
}

impl Default for Verifier {
    fn default() -> Self {
        Verifier {
            errors: Vec::new(),
            scopes: Vec::new(),
            loops: vec![0],
        }
    }
}

impl Verifier {
    fn in_loop(&self) -> bool {
        self.loops.last().map(|n| *n > 0).unwrap_or(false)
    }

    fn in_function(&self) -> bool {
        self.loops.len() > 1
    }

    fn temp(&mut self, smid: Smid, r: &TempRef) {
        if !self.scopes.contains(&r.scope) || !self.scopes.contains(&r.variable.owner()) {
            self.errors.push(CoreError::TempReferenceOutOfScope(
                smid,
                r.name().to_string(),
            ));
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Sequence(_, stmts) => {
                for s in stmts {
                    self.stmt(s);
                }
            }
            Stmt::Conditional(_, c, yes, no) => {
                self.expr(c);
                for branch in yes.iter().chain(no.iter()) {
                    self.stmt(branch);
                }
            }
            Stmt::Loop(_, body) => {
                if let Some(depth) = self.loops.last_mut() {
                    *depth += 1;
                }
                self.stmt(body);
                if let Some(depth) = self.loops.last_mut() {
                    *depth -= 1;
                }
            }
            Stmt::Break(s) => {
                if !self.in_loop() {
                    self.errors.push(CoreError::BreakOutsideLoop(*s));
                }
            }
            Stmt::Continue(s) => {
                if !self.in_loop() {
                    self.errors.push(CoreError::ContinueOutsideLoop(*s));
                }
            }
            Stmt::Return(s, e) => {
                if !self.in_function() {
                    self.errors.push(CoreError::ReturnOutsideFunction(*s));
                }
                self.expr(e);
            }
            Stmt::Assign(s, target, source) => {
                self.expr(source);
                match target {
                    Target::Name(_) => {}
                    Target::Temp(r) => self.temp(*s, r),
                    Target::Attribute(e, _) => self.expr(e),
                    Target::Subscript(e, k) => {
                        self.expr(e);
                        self.expr(k);
                    }
                }
            }
            Stmt::DictRemove(_, d, k) => {
                self.expr(d);
                self.expr(k);
            }
            Stmt::SetLocals(_, e) | Stmt::Expr(_, e) => self.expr(e),
            Stmt::Try(_, tried, handlers) => {
                self.stmt(tried);
                for h in handlers {
                    for t in &h.exception_types {
                        self.expr(t);
                    }
                    self.stmt(&h.body);
                }
            }
            Stmt::TempBlock(scope) => {
                self.scopes.push(scope.id());
                match scope.body() {
                    Some(body) => self.stmt(body),
                    None => self.errors.push(CoreError::TempBodyMissing(scope.smid())),
                }
                self.scopes.pop();
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Temp(s, r) => self.temp(*s, r),
            Expr::Function(_, f) => {
                // loops do not extend into function bodies
                self.loops.push(0);
                if let Some(body) = &f.body {
                    self.stmt(body);
                }
                self.loops.pop();
            }
            Expr::Constant(..) | Expr::Name(..) | Expr::Builtin(..) | Expr::Locals(_) => {}
            Expr::Attribute(_, e, _)
            | Expr::Not(_, e)
            | Expr::Iter(_, e)
            | Expr::Next(_, e)
            | Expr::Unpack(_, e, _)
            | Expr::TypeOf(_, e)
            | Expr::HasAttr(_, e, _) => self.expr(e),
            Expr::Subscript(_, a, b)
            | Expr::Compare(_, _, a, b)
            | Expr::BinaryOp(_, _, a, b)
            | Expr::DictGet(_, a, b) => {
                self.expr(a);
                self.expr(b);
            }
            Expr::Call(_, f, args, kw) => {
                self.expr(f);
                for a in args {
                    self.expr(a);
                }
                if let Some(k) = kw {
                    self.expr(k);
                }
            }
            Expr::MakeTuple(_, xs) | Expr::MakeList(_, xs) => {
                for x in xs {
                    self.expr(x);
                }
            }
            Expr::MakeDict(_, pairs) => {
                for (k, v) in pairs {
                    self.expr(k);
                    self.expr(v);
                }
            }
            Expr::Conditional(_, c, y, n) => {
                self.expr(c);
                self.expr(y);
                self.expr(n);
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::ir::dsl::*;
    use crate::core::temp::TempScope;

    #[test]
    pub fn test_break_placement() {
        let s = Smid::default();
        assert_eq!(verify(&break_(s)), vec![CoreError::BreakOutsideLoop(s)]);
        assert_eq!(verify(&loop_(s, break_(s))), vec![]);

        // a loop does not license a break inside a nested function
        let f = FunctionBody {
            smid: s,
            name: "f".to_string(),
            kind: FunctionKind::Plain,
            doc: None,
            body: Some(break_(s)),
        };
        assert_eq!(
            verify(&loop_(s, expr(s, call(s, function(s, f), vec![])))),
            vec![CoreError::BreakOutsideLoop(s)]
        );
    }

    #[test]
    pub fn test_return_placement() {
        let s = Smid::default();
        assert_eq!(
            verify(&return_(s, none(s))),
            vec![CoreError::ReturnOutsideFunction(s)]
        );
    }

    #[test]
    pub fn test_temp_used_outside_owner() {
        let s = Smid::default();
        let mut scope = TempScope::new(ScopeId::new(1), s);
        let v = scope.get_temp_variable("leak");
        let escaped = assign_name(s, "x", temp(s, v.make_reference(&scope)));

        assert_eq!(
            verify(&escaped),
            vec![CoreError::TempReferenceOutOfScope(s, "leak".to_string())]
        );

        scope.set_body(escaped).unwrap();
        assert_eq!(verify(&scope.into_statement().unwrap()), vec![]);
    }

    #[test]
    pub fn test_reference_tagged_for_unrelated_scope() {
        let s = Smid::default();
        let mut owner = TempScope::new(ScopeId::new(1), s);
        let stranger = TempScope::new(ScopeId::new(2), s);
        let v = owner.get_temp_variable("v");
        owner
            .set_body(assign_temp(s, v.make_reference(&stranger), none(s)))
            .unwrap();

        assert_eq!(
            verify(&owner.into_statement().unwrap()),
            vec![CoreError::TempReferenceOutOfScope(s, "v".to_string())]
        );
    }
}
