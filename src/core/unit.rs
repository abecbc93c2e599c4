//! Unit of lowered IR for one module
use crate::common::prettify::prettify;
use crate::core::ir::Stmt;

/// The lowered form of a module
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Dotted name of the module
    pub name: String,
    /// Module body, absent if the module has no runtime effect
    pub body: Option<Stmt>,
}

impl TranslationUnit {
    /// True if nothing remains to execute
    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }

    /// Number of top level statements
    pub fn len(&self) -> usize {
        self.body.as_ref().map(|b| b.statements().len()).unwrap_or(0)
    }

    /// Render the lowered body for inspection
    pub fn express(&self) -> String {
        match &self.body {
            Some(body) => prettify(body),
            None => "pass\n".to_string(),
        }
    }
}
