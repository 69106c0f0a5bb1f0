//! The compiler pipeline: grammar-file AST in, a compiled LALR(1) parsing
//! table out. `compile` is the single entry point the top-level `caper`
//! crate (and through it `caper-cli`) drives.

pub mod ebnf_validator;
pub mod errors;
pub mod grammar_builder;
pub mod lr;
pub mod model;
pub mod options;
pub mod symbol_collector;
pub mod util;

use caper_input::GrammarFile;
use tracing::{info, warn};

use errors::{CompileError, UnresolvableConflicts};
use lr::{Conflict, ParsingTable};
use model::Grammar;
use options::Options;

/// Everything produced by a successful compile, owned together for the
/// generator's lifetime and handed read-only to the emitters.
pub struct CompiledGrammar {
    pub grammar: Grammar,
    pub table: ParsingTable,
    pub options: Options,
    pub conflicts: Vec<Conflict>,
}

pub fn compile(source: &str) -> Result<CompiledGrammar, CompileError> {
    let file = caper_input::parse_grammar_file(source)?;
    compile_file(&file)
}

pub fn compile_file(file: &GrammarFile) -> Result<CompiledGrammar, CompileError> {
    let symbols = symbol_collector::collect_symbols(file).map_err(CompileError::Grammar)?;
    let options = symbols.options.clone();

    let ebnf_errors = ebnf_validator::validate_ebnf_usage(file, &options);
    if !ebnf_errors.is_empty() {
        return Err(CompileError::Grammar(ebnf_errors));
    }

    let grammar = grammar_builder::build_grammar(file, symbols).map_err(CompileError::Grammar)?;
    info!(
        terminals = grammar.terminals.len(),
        nonterminals = grammar.nonterminals.len(),
        rules = grammar.rules.len(),
        "grammar built"
    );

    let lr::TableResult { table, conflicts } = lr::build_table(&grammar);
    if !conflicts.is_empty() {
        warn!(count = conflicts.len(), "LALR(1) conflicts found");
        if !options.allow_conflicts {
            return Err(CompileError::Conflicts(UnresolvableConflicts(conflicts)));
        }
    }
    info!(states = table.state_count(), "LALR(1) table built");

    Ok(CompiledGrammar {
        grammar,
        table,
        options,
        conflicts,
    })
}
