//! Overall high-level error type for the lowering pipeline
use crate::common::sourcemap::SourceMap;
use crate::core::error::CoreError;
use crate::driver::settings::SettingsError;
use crate::eval::error::ExecutionError;
use codespan_reporting::diagnostic::Diagnostic;
use std::fmt::Display;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReformError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn default_diagnostic<E>(e: &E) -> Diagnostic<usize>
where
    E: Display,
{
    Diagnostic::error().with_message(format!("{}", e))
}

impl ReformError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic<usize> {
        match self {
            ReformError::Core(e) => e.to_diagnostic(source_map),
            ReformError::Execution(e) => e.to_diagnostic(source_map),
            e => default_diagnostic(e),
        }
    }
}
