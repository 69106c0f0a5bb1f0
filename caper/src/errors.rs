//! Top-level, colored error reporting: a `Severity`/`Location` pair
//! driving a `-->file:line:col` header plus a gutter-bar source snippet,
//! wrapping this crate's conflict representation (state ids and rule
//! ids) and `caper_core::errors::GeneratorError`.

use std::{
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
};

use caper_core::errors::GeneratorError;
use caper_core::lr::Conflict;
use caper_core::model::Grammar;
use caper_input::{SourcePos, SourceSpan};
use owo_colors::OwoColorize;

#[derive(Debug)]
pub enum Severity {
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".bright_red().bold()),
        }
    }
}

#[derive(Debug)]
pub struct Location {
    pos: SourcePos,
    file: PathBuf,
    text: String,
}

impl Location {
    fn from_span(span: SourceSpan, file: &Path, contents: &str) -> Option<Location> {
        Some(Location {
            pos: span.start,
            file: file.to_path_buf(),
            text: span.substring(contents)?.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct CaperError {
    severity: Severity,
    error: CaperErrorKind,
}

#[derive(Debug)]
enum CaperErrorKind {
    Grammar {
        message: String,
        location: Option<Location>,
    },
    ShiftReduce {
        symbol_name: String,
        items: Vec<(Location, String)>,
    },
    ReduceReduce {
        items: Vec<(Location, String)>,
    },
    IO {
        file: PathBuf,
        error: std::io::Error,
    },
    Parse(caper_input::ParseError),
}

fn rule_item_text(grammar: &Grammar, rule_id: usize) -> String {
    let rule = &grammar.rules[rule_id];
    let rhs: Vec<&str> = rule.rhs.iter().map(|s| grammar.symbol_name(*s)).collect();
    format!("{}: {} -> {} .", rule.id, grammar.nonterminal_name(rule.lhs), rhs.join(" "))
}

fn rule_location(grammar: &Grammar, rule_id: usize, file: &Path, contents: &str) -> Option<Location> {
    Location::from_span(grammar.rules[rule_id].span?, file, contents)
}

impl CaperError {
    pub fn grammar_errors(file: &Path, contents: &str, errors: &[GeneratorError]) -> Vec<Self> {
        errors
            .iter()
            .map(|e| CaperError {
                severity: Severity::Error,
                error: CaperErrorKind::Grammar {
                    message: e.to_string(),
                    location: e.span().and_then(|span| Location::from_span(span, file, contents)),
                },
            })
            .collect()
    }

    pub fn conflicts(file: &Path, contents: &str, conflicts: &[Conflict], grammar: &Grammar) -> Vec<Self> {
        conflicts
            .iter()
            .map(|c| match c {
                Conflict::ShiftReduce {
                    shift_symbol,
                    reduce_rule_ids,
                    ..
                } => CaperError {
                    severity: Severity::Error,
                    error: CaperErrorKind::ShiftReduce {
                        symbol_name: grammar.terminal_name(*shift_symbol).to_string(),
                        items: reduce_rule_ids
                            .iter()
                            .filter_map(|&id| Some((rule_location(grammar, id, file, contents)?, rule_item_text(grammar, id))))
                            .collect(),
                    },
                },
                Conflict::ReduceReduce { rule_ids, .. } => CaperError {
                    severity: Severity::Error,
                    error: CaperErrorKind::ReduceReduce {
                        items: rule_ids
                            .iter()
                            .filter_map(|&id| Some((rule_location(grammar, id, file, contents)?, rule_item_text(grammar, id))))
                            .collect(),
                    },
                },
            })
            .collect()
    }

    pub fn io(file: PathBuf, error: std::io::Error) -> Vec<CaperError> {
        vec![CaperError {
            severity: Severity::Error,
            error: CaperErrorKind::IO { error, file },
        }]
    }

    pub fn parse(error: caper_input::ParseError) -> Vec<CaperError> {
        vec![CaperError {
            severity: Severity::Error,
            error: CaperErrorKind::Parse(error),
        }]
    }
}

impl CaperErrorKind {
    fn message(&self) -> String {
        match self {
            CaperErrorKind::Grammar { message, .. } => message.clone(),
            CaperErrorKind::ShiftReduce { .. } => "shift-reduce conflict in grammar".to_string(),
            CaperErrorKind::ReduceReduce { .. } => "reduce-reduce conflict in grammar".to_string(),
            CaperErrorKind::IO { .. } => "failed to read grammar file".to_string(),
            CaperErrorKind::Parse(_) => "failed to parse grammar file".to_string(),
        }
    }
}

impl Display for CaperErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaperErrorKind::Grammar { location: Some(location), .. } => write_section(location, format_args!(""), f),
            CaperErrorKind::Grammar { location: None, .. } => Ok(()),
            CaperErrorKind::ShiftReduce { symbol_name, items } => {
                for (i, (location, item_text)) in items.iter().enumerate() {
                    write_section(
                        location,
                        format_args!("Could shift token\n\t{}\nOr reduce item\n\t{}", symbol_name.bold(), item_text.bold()),
                        f,
                    )?;
                    if i + 1 < items.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            CaperErrorKind::ReduceReduce { items } => {
                for (i, (location, item_text)) in items.iter().enumerate() {
                    write_section(location, format_args!("Could reduce this item:\n\t{}", item_text.bold()), f)?;
                    if i + 1 < items.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            CaperErrorKind::IO { error, file } => {
                write!(f, "     file: {}\n     reason: {}", file.display(), error)
            }
            CaperErrorKind::Parse(error) => write!(f, "     reason: {error}"),
        }
    }
}

impl Error for CaperError {}

fn write_section<D: Display>(location: &Location, contents: D, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        " {} {}:{}:{}",
        "-->".blue().bold(),
        location.file.display(),
        location.pos.line,
        location.pos.col
    )?;
    let formatted = format!(
        "{}\n{}\n\n{}",
        location.text.as_str(),
        "~".repeat(location.text.len()).bright_red().bold(),
        contents
    );
    let lines_iter_padded = std::iter::once("").chain(formatted.lines().chain(std::iter::once("")));
    let lines: Vec<String> = lines_iter_padded.map(|l| format!("  {}  {}", "|".blue().bold(), l)).collect();
    write!(f, "{}", lines.join("\n"))
}

impl Display for CaperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}: {}", self.severity, self.error.message())?;
        write!(f, "{}", self.error)
    }
}
