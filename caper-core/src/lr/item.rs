//! LALR(1) items. Rules are referenced by their index into
//! `Grammar::rules` rather than by pointer or borrow — there is exactly
//! one owner (the `Grammar`) so an id is simpler, and it lets item sets
//! live in plain `BTreeSet`s without lifetime parameters.

use crate::model::{Grammar, Symbol, SymbolIdx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    pub rule_id: usize,
    pub dot: u16,
    pub lookahead: SymbolIdx,
}

impl Item {
    pub fn new(rule_id: usize, lookahead: SymbolIdx) -> Self {
        Item {
            rule_id,
            dot: 0,
            lookahead,
        }
    }

    /// The LR(0) core `(rule, dot)`, used as the merge key for LALR state
    /// construction — two items with the same core but different
    /// lookaheads belong in the same LALR state.
    pub fn lr0_core(&self) -> (usize, u16) {
        (self.rule_id, self.dot)
    }

    pub fn symbol_after_dot(&self, grammar: &Grammar) -> Option<Symbol> {
        grammar.rules[self.rule_id].rhs.get(self.dot as usize).copied()
    }

    pub fn symbol_after_dot_offset(&self, grammar: &Grammar, offset: u16) -> Option<Symbol> {
        grammar.rules[self.rule_id].rhs.get((self.dot + offset) as usize).copied()
    }

    pub fn symbols_after_next(&self, grammar: &Grammar) -> Vec<Symbol> {
        let rhs = &grammar.rules[self.rule_id].rhs;
        let start = (self.dot as usize + 1).min(rhs.len());
        rhs[start..].to_vec()
    }

    pub fn advanced(&self) -> Item {
        Item {
            rule_id: self.rule_id,
            dot: self.dot + 1,
            lookahead: self.lookahead,
        }
    }

    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.symbol_after_dot(grammar).is_none()
    }

    pub fn display(&self, grammar: &Grammar) -> String {
        let rule = &grammar.rules[self.rule_id];
        let pre: Vec<&str> = rule.rhs[..self.dot as usize].iter().map(|s| grammar.symbol_name(*s)).collect();
        let post: Vec<&str> = rule.rhs[self.dot as usize..].iter().map(|s| grammar.symbol_name(*s)).collect();
        format!(
            "{} -> {} . {} [{}]",
            grammar.nonterminal_name(rule.lhs),
            pre.join(" "),
            post.join(" "),
            grammar.terminal_name(self.lookahead)
        )
    }
}
