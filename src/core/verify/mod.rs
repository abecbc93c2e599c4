//! Structural checks on lowered IR
pub mod content;

pub use content::{verify, verify_unit};
