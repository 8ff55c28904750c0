//! **Ember**: a tree‑walking interpreter for a small dynamically typed
//! language with closures and structs.
//!
//! The pipeline is `scanner` → `parser` → `resolver` → `interpreter`.  Each
//! stage reports failures as a [`LoxError`](error::LoxError); the first
//! failing stage stops the run.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{DepthPolicy, Resolver};

/// Scan, parse, resolve and execute `source`, writing `println` output to
/// `out`.
pub fn run<W: Write>(source: &str, out: W) -> Result<()> {
    run_with_policy(source, out, DepthPolicy::default())
}

/// Like [`run`], with an explicit policy for recording closure depths.
pub fn run_with_policy<W: Write>(source: &str, out: W, policy: DepthPolicy) -> Result<()> {
    let tokens = scanner::scan(source)?;
    let statements = Parser::new(&tokens).parse()?;

    info!("Running program of {} statement(s)", statements.len());

    let mut interpreter = Interpreter::with_output(out);
    Resolver::with_policy(&mut interpreter, policy).resolve(&statements)?;
    interpreter.interpret(&statements)
}
