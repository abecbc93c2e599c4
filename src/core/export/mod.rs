//! Output formats for lowered IR
pub mod pretty;
