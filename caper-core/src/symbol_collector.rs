//! Walks the grammar-file AST once, before any rule is desugared, to
//! assign terminal/nonterminal ids, detect name clashes, and populate
//! [`Options`]. Token ids are assigned in a fixed order:
//! end-of-input is always id 0, the recovery token (if `%recover` is
//! declared) gets id 1, and the remaining declared tokens get sequential
//! ids in declaration order. The first rule written in the file is the
//! grammar's entry point.

use std::collections::HashMap;

use caper_input::{Declaration, GrammarFile, SourceSpan};

use crate::errors::GeneratorError;
use crate::model::{Nonterminal, SymbolIdx, Terminal, Type};
use crate::options::Options;

pub const EOF_NAME: &str = "$eof";
pub const IMPLICIT_ROOT_NAME: &str = "$implicit_root";

pub struct SymbolTable {
    pub terminals: Vec<Terminal>,
    pub nonterminals: Vec<Nonterminal>,
    pub terminal_ids: HashMap<String, SymbolIdx>,
    pub nonterminal_ids: HashMap<String, SymbolIdx>,
    pub options: Options,
    pub entry_rule_index: usize,
    pub augmented_root: SymbolIdx,
}

pub fn collect_symbols(file: &GrammarFile) -> Result<SymbolTable, Vec<GeneratorError>> {
    let mut errors = Vec::new();
    let mut options = Options::default();

    let mut declared_token_entries = Vec::new();
    for decl in &file.declarations {
        match &decl.inner {
            Declaration::Token(entries) => declared_token_entries.extend(entries.iter().cloned()),
            Declaration::TokenPrefix(prefix) => options.token_prefix = prefix.clone(),
            Declaration::ExternalToken => options.external_token = true,
            Declaration::AllowEbnf => options.allow_ebnf = true,
            Declaration::Namespace(ns) => options.namespace = Some(ns.clone()),
            Declaration::Recover(name) => options.recover_token = Some(name.clone()),
            Declaration::AccessModifier(modifier) => options.access_modifier = Some(modifier.clone()),
            Declaration::DontUseStl => options.dont_use_stl = true,
            Declaration::DebugParser => options.debug_parser = true,
        }
    }

    let mut terminals = vec![Terminal {
        id: 0,
        name: EOF_NAME.to_string(),
        value_type: Type::default(),
    }];
    let mut terminal_ids = HashMap::new();
    terminal_ids.insert(EOF_NAME.to_string(), 0);

    if let Some(recover_name) = &options.recover_token {
        let declared = declared_token_entries.iter().any(|t| &t.name == recover_name);
        if !declared {
            errors.push(GeneratorError::RecoveryTokenUndeclared {
                name: recover_name.clone(),
            });
        }
        let id = terminals.len() as SymbolIdx;
        terminals.push(Terminal {
            id,
            name: recover_name.clone(),
            value_type: Type::default(),
        });
        terminal_ids.insert(recover_name.clone(), id);
    }

    let mut spans_by_name: HashMap<String, SourceSpan> = HashMap::new();
    for decl in &file.declarations {
        if let Declaration::Token(entries) = &decl.inner {
            for entry in entries {
                if options.recover_token.as_deref() == Some(entry.name.as_str()) {
                    // pre-registered above; this just supplies its type.
                    if let Some(terminal) = terminals.iter_mut().find(|t| t.name == entry.name) {
                        terminal.value_type = Type(entry.type_name.clone());
                    }
                    continue;
                }
                if let Some(first_span) = spans_by_name.get(&entry.name) {
                    errors.push(GeneratorError::DuplicateSymbol {
                        name: entry.name.clone(),
                        first: *first_span,
                        second: decl.span,
                    });
                    continue;
                }
                spans_by_name.insert(entry.name.clone(), decl.span);
                let id = terminals.len() as SymbolIdx;
                terminals.push(Terminal {
                    id,
                    name: entry.name.clone(),
                    value_type: Type(entry.type_name.clone()),
                });
                terminal_ids.insert(entry.name.clone(), id);
            }
        }
    }

    let mut nonterminals = Vec::new();
    let mut nonterminal_ids = HashMap::new();
    for rule in &file.rules {
        if let Some(first_span) = spans_by_name.get(&rule.inner.name) {
            if terminal_ids.contains_key(&rule.inner.name) {
                errors.push(GeneratorError::RuleWithTerminalLeftHandSide {
                    name: rule.inner.name.clone(),
                    span: rule.span,
                });
                continue;
            }
            errors.push(GeneratorError::DuplicateSymbol {
                name: rule.inner.name.clone(),
                first: *first_span,
                second: rule.span,
            });
            continue;
        }
        spans_by_name.insert(rule.inner.name.clone(), rule.span);
        let id = nonterminals.len() as SymbolIdx;
        nonterminals.push(Nonterminal {
            id,
            name: rule.inner.name.clone(),
            value_type: Type(rule.inner.type_name.clone()),
            synthesized: None,
        });
        nonterminal_ids.insert(rule.inner.name.clone(), id);
    }

    if file.rules.is_empty() {
        errors.push(GeneratorError::UndefinedSymbol {
            name: "<entry rule>".to_string(),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let augmented_root = nonterminals.len() as SymbolIdx;
    nonterminals.push(Nonterminal {
        id: augmented_root,
        name: IMPLICIT_ROOT_NAME.to_string(),
        value_type: nonterminals[0].value_type.clone(),
        synthesized: None,
    });

    Ok(SymbolTable {
        terminals,
        nonterminals,
        terminal_ids,
        nonterminal_ids,
        options,
        entry_rule_index: 0,
        augmented_root,
    })
}
