//! Reference execution of lowered IR
pub mod error;
pub mod machine;
pub mod value;

pub use error::ExecutionError;
pub use machine::Machine;
pub use value::{Native, Value};
