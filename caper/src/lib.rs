//! Top-level driver: reads a grammar file, compiles it, and dispatches to
//! a code generator. A plain `Language` enum picks the backend — there's
//! no generic lexer/LL/LR factory trait to plug into, since this
//! generator only ever emits one parser shape (LALR(1)) per run.

use std::{
    io::BufWriter,
    path::{Path, PathBuf},
};

use clap::ValueEnum;

use caper_codegen::GeneratedCodeWriter;
use caper_core::CompiledGrammar;

pub mod errors;

pub use caper_core::options::Options;
pub use errors::CaperError;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Language {
    Rust,
    Cpp,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Language::Rust => "rust",
            Language::Cpp => "cpp",
        })
    }
}

/// Compiles the grammar at `grammar_path` and writes the generated parser
/// under `target_path` for `language`. When `write_table` is set, also
/// writes a human-readable state/action/goto dump as a `table` artifact.
pub fn generate(grammar_path: &Path, target_path: &Path, language: Language, write_table: bool) -> Result<(), Vec<CaperError>> {
    let file_contents = std::fs::read_to_string(grammar_path).map_err(|e| CaperError::io(grammar_path.to_path_buf(), e))?;

    let compiled = compile(grammar_path, &file_contents)?;

    let mut gen = GeneratedCodeWriter::with_default(|name| {
        let file = std::fs::File::create(target_path.join(file_name(name, language)))?;
        Ok(BufWriter::new(file))
    });

    if write_table {
        gen.generate_code("table", |out| caper_core::lr::write_table_dump(&compiled.grammar, &compiled.table, out))
            .map_err(|e| CaperError::io(target_path.join("table"), e))?;
    }

    match language {
        Language::Rust => caper_rust_codegen::RustCodeGen::new()
            .generate(&compiled, &mut gen)
            .map_err(|e| CaperError::io(target_path.to_path_buf(), e))?,
        Language::Cpp => caper_cpp_codegen::CppCodeGen::new()
            .generate(&compiled, &mut gen)
            .map_err(|e| CaperError::io(target_path.to_path_buf(), e))?,
    }
    Ok(())
}

fn file_name(artifact: &str, language: Language) -> String {
    match (artifact, language) {
        ("parser", Language::Rust) => "parser.rs".to_string(),
        ("parser", Language::Cpp) => "parser.hpp".to_string(),
        (other, _) => other.to_string(),
    }
}

/// Parses and compiles a grammar, translating generator errors and
/// reported conflicts into [`CaperError`]s anchored to `grammar_path`.
pub fn compile(grammar_path: &Path, file_contents: &str) -> Result<CompiledGrammar, Vec<CaperError>> {
    let file = caper_input::parse_grammar_file(file_contents).map_err(CaperError::parse)?;

    match caper_core::compile_file(&file) {
        Ok(compiled) => Ok(compiled),
        Err(caper_core::errors::CompileError::Parse(e)) => Err(CaperError::parse(e)),
        Err(caper_core::errors::CompileError::Grammar(errors)) => {
            Err(CaperError::grammar_errors(grammar_path, file_contents, &errors))
        }
        Err(caper_core::errors::CompileError::Conflicts(unresolved)) => {
            let symbols = caper_core::symbol_collector::collect_symbols(&file).expect("already validated above");
            let grammar = caper_core::grammar_builder::build_grammar(&file, symbols).expect("already validated above");
            Err(CaperError::conflicts(grammar_path, file_contents, &unresolved.0, &grammar))
        }
    }
}
