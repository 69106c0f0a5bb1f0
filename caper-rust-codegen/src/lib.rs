//! Rust backend: turns a [`caper_core::CompiledGrammar`] into a single
//! `.rs` source file implementing the stack-machine parser shape. Tables
//! are emitted as raw `write!`-based per-state `match` dispatch rather
//! than reached for via `quote!`/proc-macro machinery.

use std::io::{self, Write};

use caper_codegen::GeneratedCodeWriter;
use caper_core::CompiledGrammar;

mod lr_parser;

#[derive(Debug, Default)]
pub struct RustCodeGen;

impl RustCodeGen {
    pub fn new() -> Self {
        RustCodeGen
    }

    /// Emits the generated parser as a single `parser.rs` artifact.
    pub fn generate(&self, compiled: &CompiledGrammar, gen: &mut GeneratedCodeWriter) -> io::Result<()> {
        gen.generate_code("parser", |out: &mut dyn Write| lr_parser::emit(compiled, out))
    }
}
