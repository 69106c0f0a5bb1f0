//! C++ backend: mirrors `caper-rust-codegen`'s shape (single artifact,
//! `switch`-per-state table dispatch) but emits a header-only C++ parser,
//! using raw `write!`-based `switch (state) { case N: switch (lookahead)
//! { ... } }` emission for the action/goto tables.

use std::io::{self, Write};

use caper_codegen::GeneratedCodeWriter;
use caper_core::CompiledGrammar;

mod lr_parser;

#[derive(Debug, Default)]
pub struct CppCodeGen;

impl CppCodeGen {
    pub fn new() -> Self {
        CppCodeGen
    }

    /// Emits the generated parser as a single `parser.hpp` artifact.
    pub fn generate(&self, compiled: &CompiledGrammar, gen: &mut GeneratedCodeWriter) -> io::Result<()> {
        gen.generate_code("parser", |out: &mut dyn Write| lr_parser::emit(compiled, out))
    }
}
