//! Desugaring of the surface tree into primitive IR.
//!
//! This:
//! - lowers class statements into explicit metaclass calls
//! - lowers `for` and `while` loops (with else clauses) into the
//!   primitive loop node
//! - introduces temp scopes for the intermediates either needs
//!
//! Everything else is translated node for node by the builder.

pub mod builder;
pub mod class;
pub mod desugarer;
pub mod loops;

pub use builder::{Builder, StandardBuilder};
pub use desugarer::{desugar_module, Desugarer};
