//! Facilities shared by the surface tree and the IR
pub mod prettify;
pub mod sourcemap;
