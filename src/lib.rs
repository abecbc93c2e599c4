extern crate codespan;
extern crate codespan_reporting;
extern crate indexmap;
extern crate itertools;
extern crate moniker;
extern crate pretty;
extern crate structopt;
extern crate thiserror;

pub mod common;
pub mod core;
pub mod driver;
pub mod eval;
pub mod syntax;
