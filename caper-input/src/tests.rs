use crate::{parse_grammar_file, Declaration, Extension};

#[test]
fn parses_token_declaration() {
    let file = parse_grammar_file("%token a: int, b: std::string;").unwrap();
    assert_eq!(file.declarations.len(), 1);
    match &file.declarations[0].inner {
        Declaration::Token(entries) => {
            assert_eq!(entries[0].name, "a");
            assert_eq!(entries[0].type_name, "int");
            assert_eq!(entries[1].name, "b");
            assert_eq!(entries[1].type_name, "std::string");
        }
        other => panic!("expected Token declaration, got {other:?}"),
    }
}

#[test]
fn parses_flag_declarations() {
    let file = parse_grammar_file(
        "%external_token;\n%allow_ebnf;\n%dont_use_stl;\n%recover error;\n%access_modifier protected;\n%debug_parser;",
    )
    .unwrap();
    assert_eq!(file.declarations.len(), 6);
    assert_eq!(file.declarations[0].inner, Declaration::ExternalToken);
    assert_eq!(file.declarations[1].inner, Declaration::AllowEbnf);
    assert_eq!(file.declarations[2].inner, Declaration::DontUseStl);
    assert_eq!(file.declarations[3].inner, Declaration::Recover("error".to_string()));
    assert_eq!(
        file.declarations[4].inner,
        Declaration::AccessModifier("protected".to_string())
    );
    assert_eq!(file.declarations[5].inner, Declaration::DebugParser);
}

#[test]
fn parses_namespace_path() {
    let file = parse_grammar_file("%namespace foo::bar::baz;").unwrap();
    assert_eq!(
        file.declarations[0].inner,
        Declaration::Namespace("foo::bar::baz".to_string())
    );
}

#[test]
fn parses_simple_rule_with_action() {
    let file = parse_grammar_file("%token A: int;\nS<int>: A [id];").unwrap();
    assert_eq!(file.rules.len(), 1);
    let rule = &file.rules[0].inner;
    assert_eq!(rule.name, "S");
    assert_eq!(rule.type_name, "int");
    assert_eq!(rule.choices.len(), 1);
    let choice = &rule.choices[0];
    assert_eq!(choice.elements.len(), 1);
    assert_eq!(choice.elements[0].inner.name, "A");
    assert_eq!(choice.elements[0].inner.extension, Extension::None);
    assert_eq!(choice.action_name.as_deref(), Some("id"));
}

#[test]
fn parses_alternatives_and_empty_choice() {
    let file = parse_grammar_file("S<int>: A B [ab] | [empty];").unwrap();
    let rule = &file.rules[0].inner;
    assert_eq!(rule.choices.len(), 2);
    assert_eq!(rule.choices[0].elements.len(), 2);
    assert!(rule.choices[1].elements.is_empty());
    assert_eq!(rule.choices[1].action_name.as_deref(), Some("empty"));
}

#[test]
fn parses_ebnf_extensions_and_argument_index() {
    let file = parse_grammar_file("List<seq>: Elt* [mk];\nS<int>: A:$0 A:$2 [f];").unwrap();
    let list_rule = &file.rules[0].inner;
    assert_eq!(list_rule.choices[0].elements[0].inner.extension, Extension::Star);

    let s_rule = &file.rules[1].inner;
    assert_eq!(s_rule.choices[0].elements[0].inner.argument_index, Some(0));
    assert_eq!(s_rule.choices[0].elements[1].inner.argument_index, Some(2));
}

#[test]
fn parses_slash_delimited_sequence() {
    let file = parse_grammar_file("List<seq>: Elt/Comma [mk];").unwrap();
    let elements = &file.rules[0].inner.choices[0].elements;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].inner.extension, Extension::Slash);
    assert_eq!(elements[0].inner.delimiter.as_deref(), Some("Comma"));
}

#[test]
fn spans_track_line_and_column() {
    let file = parse_grammar_file("%token A: int;\n\nS<int>: A [id];").unwrap();
    let rule_span = file.rules[0].span;
    assert_eq!(rule_span.start.line, 3);
    assert_eq!(rule_span.start.col, 1);
}

#[test]
fn rejects_malformed_input() {
    assert!(parse_grammar_file("%token ;").is_err());
    assert!(parse_grammar_file("S<int>: A [").is_err());
}

#[test]
fn comments_are_ignored() {
    let file = parse_grammar_file("// a comment\n%token A: int; // trailing\nS<int>: A [id];").unwrap();
    assert_eq!(file.declarations.len(), 1);
    assert_eq!(file.rules.len(), 1);
}
