//! Drives `CppCodeGen` against a hand-built grammar and checks the shape
//! of the generated header, the same way `caper-rust-codegen/tests/emit.rs`
//! checks the Rust backend.

use std::io::BufWriter;

use caper_codegen::GeneratedCodeWriter;
use caper_cpp_codegen::CppCodeGen;
use caper_input::{Choice, Declaration, Extension, GrammarFile, RuleDef, RuleItem, SourceSpan, Spanned, TokenEntry};

fn spanned<T>(inner: T) -> Spanned<T> {
    Spanned::new(inner, SourceSpan::default())
}

fn item_arg(name: &str, slot: u32) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension: Extension::None,
        delimiter: None,
        argument_index: Some(slot),
    })
}

fn item(name: &str) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension: Extension::None,
        delimiter: None,
        argument_index: None,
    })
}

fn emit_to_string(file: &GrammarFile) -> String {
    let compiled = caper_core::compile_file(file).expect("grammar compiles");
    let mut buffer = Vec::new();
    {
        let mut gen = GeneratedCodeWriter::with_default(|_name| Ok(BufWriter::new(&mut buffer)));
        CppCodeGen::new().generate(&compiled, &mut gen).expect("generation succeeds");
    }
    String::from_utf8(buffer).expect("generated source is UTF-8")
}

#[test]
fn emits_a_token_enum_and_parser_class_for_a_trivial_grammar() {
    let file = GrammarFile {
        declarations: vec![spanned(Declaration::Token(vec![TokenEntry {
            name: "A".to_string(),
            type_name: "int".to_string(),
        }]))],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "int".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("enum class Token"));
    assert!(source.contains("A,"));
    assert!(source.contains("class SemanticAction"));
    assert!(source.contains("virtual int take(int arg0) = 0;"));
    assert!(source.contains("class Parser"));
    assert!(source.contains("bool drive(Token token"));
}

#[test]
fn emits_a_namespace_wrapper_when_declared() {
    let file = GrammarFile {
        declarations: vec![
            spanned(Declaration::Namespace("caper_generated".to_string())),
            spanned(Declaration::Token(vec![TokenEntry {
                name: "A".to_string(),
                type_name: "int".to_string(),
            }])),
        ],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "int".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("namespace caper_generated {"));
    assert!(source.contains("} // namespace caper_generated"));
}

#[test]
fn emits_trace_statements_when_debug_parser_is_declared() {
    let file = GrammarFile {
        declarations: vec![
            spanned(Declaration::DebugParser),
            spanned(Declaration::Token(vec![TokenEntry {
                name: "A".to_string(),
                type_name: "int".to_string(),
            }])),
        ],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "int".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("#include <iostream>"));
    assert!(source.contains("std::cerr"));

    let without_debug = emit_to_string(&GrammarFile {
        declarations: vec![spanned(Declaration::Token(vec![TokenEntry {
            name: "A".to_string(),
            type_name: "int".to_string(),
        }]))],
        rules: file.rules.clone(),
    });
    assert!(!without_debug.contains("std::cerr"));
}

#[test]
fn bound_argument_index_stays_aligned_past_untyped_neighbors() {
    let file = GrammarFile {
        declarations: vec![spanned(Declaration::Token(vec![
            TokenEntry {
                name: "LParen".to_string(),
                type_name: String::new(),
            },
            TokenEntry {
                name: "E".to_string(),
                type_name: "int".to_string(),
            },
            TokenEntry {
                name: "RParen".to_string(),
                type_name: String::new(),
            },
        ]))],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "int".to_string(),
            choices: vec![Choice {
                elements: vec![item("LParen"), item_arg("E", 0), item("RParen")],
                action_name: Some("wrap".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    // `E` sits at RHS position 1 (after the unbound `LParen`), so the
    // reduce arm must read `args[1]`, not `args[0]`.
    assert!(source.contains("args[1]->downcast<int>()"));
    assert!(!source.contains("args[0]->downcast<int>()"));
}
