//! Compiler for DVD-Video navigation commands.
//!
//! Scripts in a small C-like language (`if (g0 == 1) jump title 2;`) are
//! compiled to the eight-byte commands stored in PGC command tables.

pub mod ast;
pub mod compiler;
pub mod diagnostic;
pub mod instruction;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod pgc;
pub mod vm;
pub mod workset;

use ast::{Program, Span};
use compiler::{Block, CompilerOptions};
use diagnostic::Diagnostic;
use workset::{Location, Workset};

/// Lexes and parses `source`, reporting the first error found.
pub fn parse(source: &str) -> Result<Program, Diagnostic> {
    let tokens = lexer::lex(source).map_err(|e| Diagnostic::from(&e).with_source(source))?;
    let tokens = tokens.into_iter().map(|(t, r)| (t, Span::from(r))).collect();
    let (program, errors) = parser::parse(tokens);
    match errors.first() {
        Some(e) => {
            let mut d = Diagnostic::from(e).with_source(source);
            if errors.len() > 1 {
                d = d.with_note(format!("{} more errors after this one", errors.len() - 1));
            }
            Err(d)
        }
        None => Ok(program),
    }
}

/// Parses and compiles one command block.
pub fn compile(
    source: &str,
    location: &Location,
    workset: &Workset,
    options: &CompilerOptions,
) -> Result<Block, Diagnostic> {
    let program = parse(source)?;
    compiler::compile_block(&program, location, workset, options)
        .map_err(|e| Diagnostic::from(&e).with_source(source))
}
