//! Errors encountered during desugaring to and processing of IR
use crate::common::sourcemap::SourceMap;
use crate::common::sourcemap::{HasSmid, Smid};
use codespan_reporting::diagnostic::Diagnostic;
use thiserror::Error;

#[derive(Eq, PartialEq, Debug, Clone, Error)]
pub enum CoreError {
    #[error("expected a {1} statement but found a {2} statement")]
    UnexpectedNode(Smid, &'static str, &'static str),
    #[error("temp block already has a body")]
    TempBodyAlreadySet(Smid),
    #[error("temp block embedded without a body")]
    TempBodyMissing(Smid),
    #[error("cannot assign to this expression")]
    InvalidAssignmentTarget(Smid),
    #[error("unsupported construct: {1}")]
    Unsupported(Smid, String),
    #[error("temp variable {1} referenced outside its scope")]
    TempReferenceOutOfScope(Smid, String),
    #[error("break outside loop")]
    BreakOutsideLoop(Smid),
    #[error("continue outside loop")]
    ContinueOutsideLoop(Smid),
    #[error("return outside function")]
    ReturnOutsideFunction(Smid),
}

impl HasSmid for CoreError {
    fn smid(&self) -> Smid {
        use self::CoreError::*;

        match *self {
            UnexpectedNode(s, _, _) => s,
            TempBodyAlreadySet(s) => s,
            TempBodyMissing(s) => s,
            InvalidAssignmentTarget(s) => s,
            Unsupported(s, _) => s,
            TempReferenceOutOfScope(s, _) => s,
            BreakOutsideLoop(s) => s,
            ContinueOutsideLoop(s) => s,
            ReturnOutsideFunction(s) => s,
        }
    }
}

impl CoreError {
    /// True for errors that indicate a defect in the compiler rather
    /// than in the program being compiled
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CoreError::UnexpectedNode(..)
                | CoreError::TempBodyAlreadySet(_)
                | CoreError::TempBodyMissing(_)
                | CoreError::TempReferenceOutOfScope(..)
        )
    }

    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic<usize> {
        let mut diag = source_map.diagnostic(self);
        if self.is_internal() {
            diag.notes
                .push("this is a compiler error, please report it".to_string());
        }
        diag
    }
}
