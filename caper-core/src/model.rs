//! The compiled grammar data model: terminals, nonterminals, rules, and
//! their semantic actions. Everything downstream (the LALR table builder
//! and both code generators) works only against these types, never against
//! the grammar-file AST directly.

use std::fmt::{self, Display};

use caper_input::{Extension, SourceSpan};

pub type SymbolIdx = u32;

/// End-of-input is always terminal 0; it is a real terminal like any
/// other, not a pseudo-symbol, so FIRST-set and table code never special
/// case it beyond that id assignment.
pub const EOF_TERMINAL: SymbolIdx = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(SymbolIdx),
    Nonterminal(SymbolIdx),
}

/// An opaque, target-language type name. Empty means untyped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Type(pub String);

impl Type {
    pub fn is_untyped(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub id: SymbolIdx,
    pub name: String,
    pub value_type: Type,
}

/// Why a nonterminal exists, if it wasn't written directly in the grammar
/// file. Synthesized nonterminals carry the name of the rule element they
/// came from plus which EBNF operator produced them, so error messages and
/// the emitter's `Sequence`/`Option` naming can refer back to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedFrom {
    pub source_name: String,
    pub extension: Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonterminal {
    pub id: SymbolIdx,
    pub name: String,
    pub value_type: Type,
    pub synthesized: Option<SynthesizedFrom>,
}

/// One bound argument of a semantic action: `rhs[symbol_index]` is passed
/// as positional argument `slot` to the action function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argument {
    pub slot: u32,
    pub symbol_index: usize,
}

/// The callback a rule's reduction invokes. `name: None` is a "call
/// nothing" reduce — the stack is popped and a placeholder value pushed,
/// with no user code running (matches `call_nothing` in the original
/// code generator for action-less choices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticAction {
    pub name: Option<String>,
    pub arguments: Vec<Argument>,
}

impl SemanticAction {
    pub fn call_nothing() -> Self {
        SemanticAction {
            name: None,
            arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: usize,
    pub lhs: SymbolIdx,
    pub rhs: Vec<Symbol>,
    pub action: SemanticAction,
    pub span: Option<SourceSpan>,
}

impl Rule {
    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// The fully resolved grammar: every symbol has an id, every rule a
/// resolved action. `augmented_root` is the synthetic `$implicit_root ->
/// entry` rule's LHS nonterminal id, used so the table builder can tell
/// "reduce" from "accept" without a separate pseudo-symbol.
#[derive(Debug)]
pub struct Grammar {
    pub terminals: Vec<Terminal>,
    pub nonterminals: Vec<Nonterminal>,
    pub rules: Vec<Rule>,
    pub entry: SymbolIdx,
    pub augmented_root: SymbolIdx,
    pub recover_terminal: Option<SymbolIdx>,
}

impl Grammar {
    pub fn terminal_name(&self, id: SymbolIdx) -> &str {
        &self.terminals[id as usize].name
    }

    pub fn nonterminal_name(&self, id: SymbolIdx) -> &str {
        &self.nonterminals[id as usize].name
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => self.terminal_name(t),
            Symbol::Nonterminal(n) => self.nonterminal_name(n),
        }
    }

    pub fn rules_with_lhs(&self, lhs: SymbolIdx) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.lhs == lhs)
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grammar (entry: {}) {{", self.nonterminal_name(self.entry))?;
        for rule in &self.rules {
            let rhs: Vec<&str> = rule.rhs.iter().map(|s| self.symbol_name(*s)).collect();
            writeln!(f, "\t{}: {} -> {}", rule.id, self.nonterminal_name(rule.lhs), rhs.join(" "))?;
        }
        write!(f, "}}")
    }
}
