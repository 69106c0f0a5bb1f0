//! Drives `RustCodeGen` against a hand-built grammar and checks that the
//! generated source contains the shapes a reader (or `rustc`) would
//! expect, mirroring how `caper-core/tests/compile.rs` builds its
//! `GrammarFile` ASTs directly instead of going through the text parser.

use std::io::BufWriter;

use caper_codegen::GeneratedCodeWriter;
use caper_input::{Choice, Declaration, Extension, GrammarFile, RuleDef, RuleItem, SourceSpan, Spanned, TokenEntry};
use caper_rust_codegen::RustCodeGen;

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

fn item_ext(name: &str, extension: Extension) -> Spanned<RuleItem> {
    spanned(RuleItem {
        name: name.to_string(),
        extension,
        delimiter: None,
        argument_index: None,
    })
}

fn emit_to_string(file: &GrammarFile) -> String {
    let compiled = caper_core::compile_file(file).expect("grammar compiles");
    let mut buffer = Vec::new();
    {
        let mut gen = GeneratedCodeWriter::with_default(|_name| Ok(BufWriter::new(&mut buffer)));
        RustCodeGen::new().generate(&compiled, &mut gen).expect("generation succeeds");
    }
    String::from_utf8(buffer).expect("generated source is UTF-8")
}

#[test]
fn emits_a_token_enum_and_parser_for_a_trivial_grammar() {
    let file = GrammarFile {
        declarations: vec![spanned(Declaration::Token(vec![TokenEntry {
            name: "A".to_string(),
            type_name: "i32".to_string(),
        }]))],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "i32".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("pub enum Token"));
    assert!(source.contains("A,"));
    assert!(source.contains("pub trait SemanticAction"));
    assert!(source.contains("fn take(&mut self, arg0: i32) -> i32;"));
    assert!(source.contains("pub struct Parser<SA: SemanticAction>"));
    assert!(source.contains("fn drive(&mut self"));
}

#[test]
fn emits_sequence_handling_for_an_ebnf_star_rule() {
    let file = GrammarFile {
        declarations: vec![
            spanned(Declaration::AllowEbnf),
            spanned(Declaration::Token(vec![TokenEntry {
                name: "A".to_string(),
                type_name: "i32".to_string(),
            }])),
        ],
        rules: vec![spanned(RuleDef {
            name: "List".to_string(),
            type_name: "Vec<i32>".to_string(),
            choices: vec![Choice {
                elements: vec![item_ext("A", Extension::Star)],
                action_name: Some("collect".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("struct Sequence"));
    assert!(source.contains("Sequence::empty()"));
    assert!(source.contains("fn collect(&mut self"));
}

#[test]
fn emits_recovery_methods_when_a_recover_token_is_declared() {
    let file = GrammarFile {
        declarations: vec![
            spanned(Declaration::Recover("Err".to_string())),
            spanned(Declaration::Token(vec![
                TokenEntry {
                    name: "A".to_string(),
                    type_name: "i32".to_string(),
                },
                TokenEntry {
                    name: "Err".to_string(),
                    type_name: String::new(),
                },
            ])),
        ],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "i32".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("fn recover(&mut self"));
    assert!(source.contains("self.drive(Token::Err, None);"));
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
                type_name: "i32".to_string(),
            },
            TokenEntry {
                name: "RParen".to_string(),
                type_name: String::new(),
            },
        ]))],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "i32".to_string(),
            choices: vec![Choice {
                elements: vec![item("LParen"), item_arg("E", 0), item("RParen")],
                action_name: Some("wrap".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    // `E` sits at RHS position 1 (after the unbound `LParen`), so the
    // reduce arm must read `args[1]`, not `args[0]`.
    assert!(source.contains("args[1].take().unwrap().downcast()"));
    assert!(!source.contains("args[0].take().unwrap().downcast()"));
}

#[test]
fn emits_trace_statements_when_debug_parser_is_declared() {
    let file = GrammarFile {
        declarations: vec![
            spanned(Declaration::DebugParser),
            spanned(Declaration::Token(vec![TokenEntry {
                name: "A".to_string(),
                type_name: "i32".to_string(),
            }])),
        ],
        rules: vec![spanned(RuleDef {
            name: "S".to_string(),
            type_name: "i32".to_string(),
            choices: vec![Choice {
                elements: vec![item_arg("A", 0)],
                action_name: Some("take".to_string()),
            }],
        })],
    };

    let source = emit_to_string(&file);
    assert!(source.contains("tracing::trace!"));

    let without_debug = emit_to_string(&GrammarFile {
        declarations: vec![spanned(Declaration::Token(vec![TokenEntry {
            name: "A".to_string(),
            type_name: "i32".to_string(),
        }]))],
        rules: file.rules.clone(),
    });
    assert!(!without_debug.contains("tracing::trace!"));
}
