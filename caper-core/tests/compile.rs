//! End-to-end tests driving the pipeline the way `caper-cli` does:
//! build a `GrammarFile` AST (bypassing the text front end, since these
//! tests are about table construction, not surface syntax) and feed it
//! to `compile_file`.

use caper_input::{Choice, Declaration, Extension, GrammarFile, RuleDef, RuleItem, SourceSpan, Spanned, TokenEntry};

use caper_core::errors::{CompileError, GeneratorError};
use caper_core::model::SynthesizedFrom;

fn spanned<T>(inner: T) -> Spanned<T> {
    Spanned::new(inner, SourceSpan::default())
}

fn token(name: &str, type_name: &str) -> TokenEntry {
    TokenEntry {
        name: name.to_string(),
        type_name: type_name.to_string(),
    }
}

fn tokens_decl(entries: &[(&str, &str)]) -> Spanned<Declaration> {
    spanned(Declaration::Token(entries.iter().map(|(n, t)| token(n, t)).collect()))
}

fn item(name: &str) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension: Extension::None,
        delimiter: None,
        argument_index: None,
    })
}

fn item_arg(name: &str, slot: u32) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension: Extension::None,
        delimiter: None,
        argument_index: Some(slot),
    })
}

fn item_ext(name: &str, extension: Extension) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension,
        delimiter: None,
        argument_index: None,
    })
}

fn choice(elements: Vec<Spanned<RuleItem>>, action_name: Option<&str>) -> Choice {
    Choice {
        elements,
        action_name: action_name.map(str::to_string),
    }
}

fn rule(name: &str, type_name: &str, choices: Vec<Choice>) -> Spanned<RuleDef> {
    spanned(RuleDef {
        name: name.to_string(),
        type_name: type_name.to_string(),
        choices,
    })
}

fn grammar_file(declarations: Vec<Spanned<Declaration>>, rules: Vec<Spanned<RuleDef>>) -> GrammarFile {
    GrammarFile { declarations, rules }
}

#[test]
fn compiles_a_single_rule_grammar() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 0)], Some("take"))])],
    );

    let compiled = caper_core::compile_file(&file).expect("trivial grammar compiles");
    assert!(compiled.conflicts.is_empty());
    assert_eq!(compiled.grammar.rules.len(), 2, "augmented root rule + S rule");
    assert_eq!(compiled.grammar.nonterminal_name(compiled.grammar.entry), "S");
    assert!(compiled.table.state_count() > 0);
}

#[test]
fn debug_parser_declaration_sets_the_option() {
    let file = grammar_file(
        vec![spanned(Declaration::DebugParser), tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 0)], Some("take"))])],
    );

    let compiled = caper_core::compile_file(&file).expect("trivial grammar compiles");
    assert!(compiled.options.debug_parser);
}

#[test]
fn first_declared_rule_is_the_entry_point() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![
            rule("S", "i32", vec![choice(vec![item_arg("A", 0)], Some("lit"))]),
            rule("T", "i32", vec![choice(vec![item_arg("A", 0)], Some("lit2"))]),
        ],
    );

    let compiled = caper_core::compile_file(&file).expect("two independent rules compile");
    assert_eq!(compiled.grammar.nonterminal_name(compiled.grammar.entry), "S");
}

#[test]
fn star_extension_is_rejected_without_allow_ebnf() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule("List", "i32", vec![choice(vec![item_ext("A", Extension::Star)], Some("mk"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("EBNF must be opted into");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors.iter().any(|e| matches!(e, GeneratorError::EbnfNotAllowed { .. })));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn star_extension_desugars_into_a_synthetic_nonterminal() {
    let file = grammar_file(
        vec![spanned(Declaration::AllowEbnf), tokens_decl(&[("A", "i32")])],
        vec![rule("List", "i32", vec![choice(vec![item_ext("A", Extension::Star)], Some("mk"))])],
    );

    let compiled = caper_core::compile_file(&file).expect("allowed EBNF compiles");
    // augmented root + seq_head + seq_trail + the List rule itself.
    assert_eq!(compiled.grammar.rules.len(), 4);

    let synthesized = compiled
        .grammar
        .nonterminals
        .iter()
        .find_map(|nt| nt.synthesized.as_ref().map(|s| (nt, s)));
    let (nt, from) = synthesized.expect("a synthetic nonterminal was minted for A*");
    assert_eq!(nt.name, "A_seq1");
    assert_eq!(
        from,
        &SynthesizedFrom {
            source_name: "A".to_string(),
            extension: Extension::Star,
        }
    );
}

#[test]
fn duplicate_argument_slot_is_rejected() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32"), ("B", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 0), item_arg("B", 0)], Some("pair"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("slot 0 bound twice must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors.iter().any(|e| matches!(e, GeneratorError::DuplicateArgumentSlot { slot: 0, .. })));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn duplicate_rule_choice_is_rejected() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule(
            "S",
            "i32",
            vec![choice(vec![item("A")], Some("take")), choice(vec![item("A")], Some("take_again"))],
        )],
    );

    let err = caper_core::compile_file(&file).expect_err("identical right-hand sides must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors
                .iter()
                .any(|e| matches!(e, GeneratorError::DuplicateRule { name, .. } if name == "S")));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn skipped_argument_slot_is_rejected() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32"), ("B", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 1), item("B")], Some("pair"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("slot 0 must be bound before slot 1");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors
                .iter()
                .any(|e| matches!(e, GeneratorError::SkippedArgumentSlot { expected: 0, found: 1, .. })));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn untyped_terminal_cannot_be_bound_as_an_argument() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 0)], Some("take"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("untyped token bound as argument must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors.iter().any(|e| matches!(e, GeneratorError::UntypedTerminalAsArgument { .. })));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn undefined_symbol_is_rejected() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item("Missing")], Some("take"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("reference to an undeclared symbol must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors.iter().any(|e| matches!(e, GeneratorError::UndefinedSymbol { name } if name == "Missing")));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn duplicate_token_declaration_is_rejected() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")]), tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item("A")], Some("take"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("redeclaring a token must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors.iter().any(|e| matches!(e, GeneratorError::DuplicateSymbol { name, .. } if name == "A")));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn recover_token_must_be_declared_as_a_token() {
    let file = grammar_file(
        vec![spanned(Declaration::Recover("Err".to_string())), tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item("A")], Some("take"))])],
    );

    let err = caper_core::compile_file(&file).expect_err("undeclared recovery token must fail");
    match err {
        CompileError::Grammar(errors) => {
            assert!(errors
                .iter()
                .any(|e| matches!(e, GeneratorError::RecoveryTokenUndeclared { name } if name == "Err")));
        }
        other => panic!("expected a grammar error, got {other:?}"),
    }
}

#[test]
fn ambiguous_expression_grammar_is_reported_as_conflicting() {
    // E -> E A E [add] | A [lit] — the textbook ambiguous binary-operator
    // grammar: at "E A E ." with lookahead A, both shifting into another
    // "E A E" and reducing the one just finished are valid, so the table
    // builder must record (and, since conflicts aren't opted into from the
    // grammar file, refuse to resolve past) a shift/reduce conflict.
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule(
            "E",
            "i32",
            vec![
                choice(vec![item("E"), item("A"), item("E")], Some("add")),
                choice(vec![item_arg("A", 0)], Some("lit")),
            ],
        )],
    );

    let err = caper_core::compile_file(&file).expect_err("ambiguous grammar must not compile cleanly");
    match err {
        CompileError::Conflicts(conflicts) => assert!(!conflicts.0.is_empty()),
        other => panic!("expected unresolved conflicts, got {other:?}"),
    }
}

#[test]
fn table_dump_lists_every_state() {
    let file = grammar_file(
        vec![tokens_decl(&[("A", "i32")])],
        vec![rule("S", "i32", vec![choice(vec![item_arg("A", 0)], Some("take"))])],
    );
    let compiled = caper_core::compile_file(&file).expect("trivial grammar compiles");

    let mut out = Vec::new();
    caper_core::lr::write_table_dump(&compiled.grammar, &compiled.table, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Rules:"));
    for state in 0..compiled.table.state_count() {
        assert!(text.contains(&format!("State {state}:")));
    }
}
