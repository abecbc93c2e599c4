//! The lowered IR and the phases that produce and check it
#![allow(clippy::result_large_err)]
pub mod desugar;
pub mod error;
pub mod export;
pub mod ir;
pub mod temp;
pub mod unit;
pub mod verify;
