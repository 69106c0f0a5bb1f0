//! Desugars EBNF operators into plain BNF and assembles the final
//! [`Grammar`]. Each `*`/`+`/`?`/`/` item mints a fresh `name_seqN`
//! nonterminal, with the following rules (`?` uses a direct two-choice
//! desugaring rather than the same recursive shape as `*`/`+` — the two
//! are observationally different only when `?` is nested inside another
//! EBNF operator, which the single-valued sequence restriction already
//! disallows, so the simpler non-recursive shape is used here):
//!
//! - `x*`  → `N -> /*empty*/ [seq_head]`, `N -> N x [seq_trail]`
//! - `x+`  → `N -> x [seq_head]`, `N -> N x [seq_trail]`
//! - `x?`  → `N -> /*empty*/`, `N -> x`
//! - `x/d` → `N -> x [seq_head]`, `N -> N d x [seq_trail2]`
//!
//! Also rejects a user-written choice whose lowered `(lhs, rhs)` exactly
//! matches an earlier one under the same rule name — two alternatives
//! that reduce to an identical production are always a mistake, never
//! an intentional ambiguity.

use std::collections::{HashMap, HashSet};

use caper_input::{Choice, Extension, GrammarFile, RuleItem, SourceSpan, Spanned};

use crate::errors::GeneratorError;
use crate::model::{Argument, Grammar, Nonterminal, Rule, SemanticAction, Symbol, SymbolIdx, SynthesizedFrom, Type};
use crate::symbol_collector::SymbolTable;

pub fn build_grammar(file: &GrammarFile, mut table: SymbolTable) -> Result<Grammar, Vec<GeneratorError>> {
    let entry_rule = &file.rules[table.entry_rule_index];
    let entry_id = *table.nonterminal_ids.get(&entry_rule.inner.name).unwrap();

    let mut builder = Builder {
        table: &mut table,
        rules: Vec::new(),
        seq_counter: 0,
        seen_user_rules: HashMap::new(),
    };

    builder.rules.push(Rule {
        id: 0,
        lhs: builder.table.augmented_root,
        rhs: vec![Symbol::Nonterminal(entry_id)],
        action: SemanticAction::call_nothing(),
        span: None,
    });

    let mut errors = Vec::new();
    for rule in &file.rules {
        let lhs = *builder.table.nonterminal_ids.get(&rule.inner.name).unwrap();
        for choice in &rule.inner.choices {
            if let Err(mut e) = builder.build_choice(lhs, choice, rule.span) {
                errors.append(&mut e);
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut rules = builder.rules;
    for (i, rule) in rules.iter_mut().enumerate() {
        rule.id = i;
    }

    Ok(Grammar {
        terminals: table.terminals,
        nonterminals: table.nonterminals,
        rules,
        entry: entry_id,
        augmented_root: table.augmented_root,
        recover_terminal: table
            .options
            .recover_token
            .as_ref()
            .and_then(|name| table.terminal_ids.get(name).copied()),
    })
}

struct Builder<'a> {
    table: &'a mut SymbolTable,
    rules: Vec<Rule>,
    seq_counter: usize,
    seen_user_rules: HashMap<(SymbolIdx, Vec<Symbol>), SourceSpan>,
}

impl<'a> Builder<'a> {
    fn mint_nonterminal(&mut self, source_name: &str, extension: Extension) -> SymbolIdx {
        let id = self.table.nonterminals.len() as SymbolIdx;
        self.seq_counter += 1;
        let name = format!("{}_seq{}", source_name, self.seq_counter);
        self.table.nonterminals.push(Nonterminal {
            id,
            name,
            value_type: Type::default(),
            synthesized: Some(SynthesizedFrom {
                source_name: source_name.to_string(),
                extension,
            }),
        });
        id
    }

    fn resolve_symbol(&self, name: &str) -> Result<Symbol, GeneratorError> {
        if let Some(id) = self.table.terminal_ids.get(name) {
            return Ok(Symbol::Terminal(*id));
        }
        if let Some(id) = self.table.nonterminal_ids.get(name) {
            return Ok(Symbol::Nonterminal(*id));
        }
        Err(GeneratorError::UndefinedSymbol { name: name.to_string() })
    }

    fn desugar_item(&mut self, item: &Spanned<RuleItem>) -> Result<Symbol, GeneratorError> {
        let base = self.resolve_symbol(&item.inner.name)?;
        match item.inner.extension {
            Extension::None => Ok(base),
            Extension::Star => {
                let nt = self.mint_nonterminal(&item.inner.name, Extension::Star);
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![],
                    action: SemanticAction {
                        name: Some("seq_head".to_string()),
                        arguments: vec![],
                    },
                    span: Some(item.span),
                });
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![Symbol::Nonterminal(nt), base],
                    action: SemanticAction {
                        name: Some("seq_trail".to_string()),
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }, Argument { slot: 1, symbol_index: 1 }],
                    },
                    span: Some(item.span),
                });
                Ok(Symbol::Nonterminal(nt))
            }
            Extension::Plus => {
                let nt = self.mint_nonterminal(&item.inner.name, Extension::Plus);
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![base],
                    action: SemanticAction {
                        name: Some("seq_head".to_string()),
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }],
                    },
                    span: Some(item.span),
                });
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![Symbol::Nonterminal(nt), base],
                    action: SemanticAction {
                        name: Some("seq_trail".to_string()),
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }, Argument { slot: 1, symbol_index: 1 }],
                    },
                    span: Some(item.span),
                });
                Ok(Symbol::Nonterminal(nt))
            }
            Extension::Question => {
                let nt = self.mint_nonterminal(&item.inner.name, Extension::Question);
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![],
                    action: SemanticAction::call_nothing(),
                    span: Some(item.span),
                });
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![base],
                    action: SemanticAction {
                        name: None,
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }],
                    },
                    span: Some(item.span),
                });
                Ok(Symbol::Nonterminal(nt))
            }
            Extension::Slash => {
                let delimiter_name = item
                    .inner
                    .delimiter
                    .as_ref()
                    .expect("the front end never produces Slash without a delimiter");
                let delimiter = self.resolve_symbol(delimiter_name)?;
                let nt = self.mint_nonterminal(&item.inner.name, Extension::Slash);
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![base],
                    action: SemanticAction {
                        name: Some("seq_head".to_string()),
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }],
                    },
                    span: Some(item.span),
                });
                self.rules.push(Rule {
                    id: 0,
                    lhs: nt,
                    rhs: vec![Symbol::Nonterminal(nt), delimiter, base],
                    action: SemanticAction {
                        name: Some("seq_trail2".to_string()),
                        arguments: vec![Argument { slot: 0, symbol_index: 0 }, Argument { slot: 1, symbol_index: 2 }],
                    },
                    span: Some(item.span),
                });
                Ok(Symbol::Nonterminal(nt))
            }
        }
    }

    fn build_choice(&mut self, lhs: SymbolIdx, choice: &Choice, rule_span: SourceSpan) -> Result<(), Vec<GeneratorError>> {
        let mut errors = Vec::new();
        let mut rhs = Vec::new();
        let mut bound: Vec<(u32, usize, SourceSpan)> = Vec::new();

        for (i, item) in choice.elements.iter().enumerate() {
            match self.desugar_item(item) {
                Ok(symbol) => {
                    rhs.push(symbol);
                    if let Some(slot) = item.inner.argument_index {
                        if let Symbol::Terminal(t) = symbol {
                            if self.table.terminals[t as usize].value_type.is_untyped() {
                                errors.push(GeneratorError::UntypedTerminalAsArgument {
                                    terminal: item.inner.name.clone(),
                                    span: item.span,
                                });
                            }
                        }
                        bound.push((slot, i, item.span));
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        bound.sort_by_key(|(slot, _, _)| *slot);
        let mut seen_slots = HashSet::new();
        for (expected, (slot, _, span)) in bound.iter().enumerate() {
            if !seen_slots.insert(*slot) {
                errors.push(GeneratorError::DuplicateArgumentSlot { slot: *slot, span: *span });
            } else if *slot as usize != expected {
                errors.push(GeneratorError::SkippedArgumentSlot {
                    expected: expected as u32,
                    found: *slot,
                    span: *span,
                });
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if let Some(first) = self.seen_user_rules.get(&(lhs, rhs.clone())) {
            return Err(vec![GeneratorError::DuplicateRule {
                name: self.table.nonterminals[lhs as usize].name.clone(),
                first: *first,
                second: rule_span,
            }]);
        }
        self.seen_user_rules.insert((lhs, rhs.clone()), rule_span);

        let arguments = bound
            .into_iter()
            .map(|(slot, symbol_index, _)| Argument { slot, symbol_index })
            .collect();
        self.rules.push(Rule {
            id: 0,
            lhs,
            rhs,
            action: SemanticAction {
                name: choice.action_name.clone(),
                arguments,
            },
            span: Some(rule_span),
        });
        Ok(())
    }
}
