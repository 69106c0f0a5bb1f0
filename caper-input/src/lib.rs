//! Grammar-file front end: turns the textual `.caper` grammar into a
//! [`GrammarFile`] AST. This crate is the "external collaborator" the core
//! pipeline depends on only through the AST shape, never through parsing
//! details.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{digit1, multispace1},
    combinator::{cut, map, map_res, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    Finish, IResult,
};

#[cfg(test)]
mod tests;

/// A 0-based byte offset paired with human-facing line/column, matching
/// what a caller would want to print in a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceSpan {
    pub fn substring<'src>(&self, source: &'src str) -> Option<&'src str> {
        source.get(self.start.offset..self.end.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: SourceSpan,
}

impl<T> Spanned<T> {
    pub fn new(inner: T, span: SourceSpan) -> Self {
        Spanned { inner, span }
    }
}

/// EBNF repetition/optionality marker on a rule element. `Slash` is the
/// sequence-with-delimiter form (`a / ','`-style lists); it desugars the
/// same way `Star`/`Plus` do but its trailing action consumes a delimiter
/// frame (`seq_trail2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extension {
    None,
    Star,
    Plus,
    Question,
    Slash,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::None => write!(f, ""),
            Extension::Star => write!(f, "*"),
            Extension::Plus => write!(f, "+"),
            Extension::Question => write!(f, "?"),
            Extension::Slash => write!(f, "/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub name: String,
    /// Value type. Empty means untyped (valid unless the token is later
    /// used as a semantic-action argument; see `untyped_terminal`).
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Token(Vec<TokenEntry>),
    TokenPrefix(String),
    ExternalToken,
    AllowEbnf,
    Namespace(String),
    Recover(String),
    AccessModifier(String),
    DontUseStl,
    DebugParser,
}

/// A single element of a rule's right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleItem {
    pub name: String,
    pub extension: Extension,
    /// The delimiter symbol name, present only when `extension` is `Slash`
    /// (`Elt/Comma` — a list of `Elt` separated by `Comma`).
    pub delimiter: Option<String>,
    /// `Some(k)` if the item was written `name:$k`, binding it to semantic
    /// action argument slot `k`.
    pub argument_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub elements: Vec<Spanned<RuleItem>>,
    pub action_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: String,
    pub type_name: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrammarFile {
    pub declarations: Vec<Spanned<Declaration>>,
    pub rules: Vec<Spanned<RuleDef>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Out-of-scope collaborator contract: anything that can turn source text
/// into a [`GrammarFile`]. `caper-core` only ever sees the result of this.
pub trait GrammarFileParser {
    fn parse(&self, source: &str) -> Result<GrammarFile, ParseError>;
}

pub struct NomGrammarFileParser;

impl GrammarFileParser for NomGrammarFileParser {
    fn parse(&self, source: &str) -> Result<GrammarFile, ParseError> {
        parse_grammar_file(source)
    }
}

pub fn parse_grammar_file(source: &str) -> Result<GrammarFile, ParseError> {
    match all_file(source)(source).finish() {
        Ok((remaining, file)) if remaining.trim().is_empty() => Ok(file),
        Ok((remaining, _)) => Err(ParseError {
            message: format!(
                "unexpected trailing input: {:?}",
                &remaining[..remaining.len().min(40)]
            ),
        }),
        Err(e) => Err(ParseError {
            message: format!("{:?}", e),
        }),
    }
}

fn pos_at(full: &str, rest: &str) -> SourcePos {
    let offset = full.len() - rest.len();
    let consumed = &full[..offset];
    let line = consumed.bytes().filter(|b| *b == b'\n').count() + 1;
    let col = offset - consumed.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    SourcePos { offset, line, col }
}

fn spanned<'a, F, O>(full: &'a str, mut inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, Spanned<O>>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    move |input: &'a str| {
        let start = pos_at(full, input);
        let (rest, value) = inner(input)?;
        let end = pos_at(full, rest);
        Ok((rest, Spanned::new(value, SourceSpan { start, end })))
    }
}

fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), take_while(|c| c != '\n'))),
        ))),
    )(input)
}

fn lexeme<'a, F, O>(mut inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    move |input: &'a str| {
        let (input, _) = ws(input)?;
        inner(input)
    }
}

fn ident(input: &str) -> IResult<&str, String> {
    lexeme(map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        |s: &str| s.to_string(),
    ))(input)
}

fn kw<'a>(k: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    lexeme(tag(k))
}

fn sym<'a>(s: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    lexeme(tag(s))
}

fn type_name(input: &str) -> IResult<&str, String> {
    // A type name is an opaque token: Caper never interprets it beyond
    // passing it through to the emitted target's type position. Used for
    // token declarations, where the type runs up to a `,` or `;`, so `<`
    // and `>` (and namespace `::`) can appear freely in the middle of it.
    lexeme(map(
        take_while1(|c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '<' || c == '>' || c == ' '
        }),
        |s: &str| s.trim().to_string(),
    ))(input)
}

fn rule_type_name(input: &str) -> IResult<&str, String> {
    // A rule's return type, written `Name<type>`: unlike `type_name`,
    // this position is bounded by a closing `>` rather than a `,`/`;`, so
    // the type text itself must not contain `>` or `:` or the greedy
    // take_while1 would swallow the delimiter and everything after it.
    lexeme(map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '<' || c == ' '),
        |s: &str| s.trim().to_string(),
    ))(input)
}

fn token_entry(input: &str) -> IResult<&str, TokenEntry> {
    map(tuple((ident, sym(":"), type_name)), |(name, _, type_name)| TokenEntry {
        name,
        type_name,
    })(input)
}

fn decl_token(input: &str) -> IResult<&str, Declaration> {
    map(
        delimited(kw("%token"), cut(separated_list1(sym(","), token_entry)), cut(sym(";"))),
        Declaration::Token,
    )(input)
}

fn decl_token_prefix(input: &str) -> IResult<&str, Declaration> {
    map(
        delimited(kw("%token_prefix"), cut(ident), cut(sym(";"))),
        Declaration::TokenPrefix,
    )(input)
}

fn decl_external_token(input: &str) -> IResult<&str, Declaration> {
    value(Declaration::ExternalToken, pair(kw("%external_token"), cut(sym(";"))))(input)
}

fn decl_allow_ebnf(input: &str) -> IResult<&str, Declaration> {
    value(Declaration::AllowEbnf, pair(kw("%allow_ebnf"), cut(sym(";"))))(input)
}

fn decl_namespace(input: &str) -> IResult<&str, Declaration> {
    map(
        delimited(kw("%namespace"), cut(separated_list1(sym("::"), ident)), cut(sym(";"))),
        |parts| Declaration::Namespace(parts.join("::")),
    )(input)
}

fn decl_recover(input: &str) -> IResult<&str, Declaration> {
    map(delimited(kw("%recover"), cut(ident), cut(sym(";"))), Declaration::Recover)(input)
}

fn decl_access_modifier(input: &str) -> IResult<&str, Declaration> {
    map(
        delimited(kw("%access_modifier"), cut(ident), cut(sym(";"))),
        Declaration::AccessModifier,
    )(input)
}

fn decl_dont_use_stl(input: &str) -> IResult<&str, Declaration> {
    value(Declaration::DontUseStl, pair(kw("%dont_use_stl"), cut(sym(";"))))(input)
}

fn decl_debug_parser(input: &str) -> IResult<&str, Declaration> {
    value(Declaration::DebugParser, pair(kw("%debug_parser"), cut(sym(";"))))(input)
}

fn declaration(input: &str) -> IResult<&str, Declaration> {
    alt((
        decl_token,
        decl_token_prefix,
        decl_external_token,
        decl_allow_ebnf,
        decl_namespace,
        decl_recover,
        decl_access_modifier,
        decl_dont_use_stl,
        decl_debug_parser,
    ))(input)
}

fn extension(input: &str) -> IResult<&str, Extension> {
    alt((
        value(Extension::Star, sym("*")),
        value(Extension::Plus, sym("+")),
        value(Extension::Question, sym("?")),
        value(Extension::Slash, sym("/")),
    ))(input)
}

fn argument_index(input: &str) -> IResult<&str, u32> {
    preceded(
        sym(":"),
        preceded(sym("$"), map_res(lexeme(digit1), |s: &str| s.parse::<u32>())),
    )(input)
}

fn rule_item(input: &str) -> IResult<&str, RuleItem> {
    let (input, name) = ident(input)?;
    let (input, extension) = opt(extension)(input)?;
    let extension = extension.unwrap_or(Extension::None);
    let (input, delimiter) = if extension == Extension::Slash {
        map(cut(ident), Some)(input)?
    } else {
        (input, None)
    };
    let (input, argument_index) = opt(argument_index)(input)?;
    Ok((
        input,
        RuleItem {
            name,
            extension,
            delimiter,
            argument_index,
        },
    ))
}

fn action_suffix(input: &str) -> IResult<&str, String> {
    delimited(sym("["), cut(ident), cut(sym("]")))(input)
}

fn choice<'a>(full: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, Choice> {
    move |input: &'a str| {
        map(pair(many0(spanned(full, rule_item)), opt(action_suffix)), |(elements, action_name)| Choice {
            elements,
            action_name,
        })(input)
    }
}

fn rule_def<'a>(full: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, RuleDef> {
    move |input: &'a str| {
        map(
            tuple((
                ident,
                delimited(sym("<"), rule_type_name, sym(">")),
                sym(":"),
                cut(separated_list1(sym("|"), choice(full))),
                cut(sym(";")),
            )),
            |(name, type_name, _, choices, _)| RuleDef {
                name,
                type_name,
                choices,
            },
        )(input)
    }
}

enum Item {
    Declaration(Spanned<Declaration>),
    Rule(Spanned<RuleDef>),
}

fn item<'a>(full: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, Item> {
    move |input: &'a str| {
        alt((
            map(spanned(full, declaration), Item::Declaration),
            map(spanned(full, rule_def(full)), Item::Rule),
        ))(input)
    }
}

fn all_file<'a>(full: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, GrammarFile> {
    move |input: &'a str| {
        let (input, items) = many0(item(full))(input)?;
        let (input, _) = ws(input)?;
        let mut file = GrammarFile::default();
        for it in items {
            match it {
                Item::Declaration(d) => file.declarations.push(d),
                Item::Rule(r) => file.rules.push(r),
            }
        }
        Ok((input, file))
    }
}
