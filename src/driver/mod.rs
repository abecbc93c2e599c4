//! Entry points for hosting the lowering stage
pub mod error;
pub mod lower;
pub mod settings;
