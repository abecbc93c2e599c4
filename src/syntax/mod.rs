//! Surface syntax as delivered by the parser
pub mod ast;
