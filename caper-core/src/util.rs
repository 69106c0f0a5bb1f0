//! FIRST-set and nullability fixpoint computation, used by the LALR
//! closure/lookahead propagation step. There is no `Epsilon`
//! pseudo-symbol in this model, so nullability is tracked as a separate
//! `BTreeSet<nonterminal id>` rather than folded into the FIRST sets
//! themselves.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Grammar, Symbol, SymbolIdx};

pub fn compute_nullable(grammar: &Grammar) -> BTreeSet<SymbolIdx> {
    let mut nullable = BTreeSet::new();
    loop {
        let mut changed = false;
        for rule in &grammar.rules {
            let rhs_nullable = rule.rhs.iter().all(|symbol| match symbol {
                Symbol::Terminal(_) => false,
                Symbol::Nonterminal(n) => nullable.contains(n),
            });
            if rhs_nullable {
                changed |= nullable.insert(rule.lhs);
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}

pub fn compute_first_sets(
    grammar: &Grammar,
    nullable: &BTreeSet<SymbolIdx>,
) -> BTreeMap<SymbolIdx, BTreeSet<SymbolIdx>> {
    let mut first_sets = BTreeMap::new();
    for nonterminal in &grammar.nonterminals {
        first_sets.insert(nonterminal.id, BTreeSet::new());
    }
    loop {
        let mut changed = false;
        for rule in &grammar.rules {
            let first_of_rhs = first_of_sequence(&rule.rhs, &first_sets, nullable);
            let entry = first_sets.get_mut(&rule.lhs).unwrap();
            for terminal in first_of_rhs {
                changed |= entry.insert(terminal);
            }
        }
        if !changed {
            break;
        }
    }
    first_sets
}

/// FIRST of a symbol sequence: the set of terminals that can begin it. An
/// empty result means "the whole sequence is nullable with no fixed first
/// terminal"; callers that need to know nullability of the sequence
/// itself consult `nullable` directly on its trailing nonterminal.
pub fn first_of_sequence(
    sequence: &[Symbol],
    first_sets: &BTreeMap<SymbolIdx, BTreeSet<SymbolIdx>>,
    nullable: &BTreeSet<SymbolIdx>,
) -> BTreeSet<SymbolIdx> {
    let mut result = BTreeSet::new();
    for symbol in sequence {
        match symbol {
            Symbol::Terminal(t) => {
                result.insert(*t);
                return result;
            }
            Symbol::Nonterminal(n) => {
                result.extend(first_sets.get(n).into_iter().flatten());
                if !nullable.contains(n) {
                    return result;
                }
            }
        }
    }
    result
}
