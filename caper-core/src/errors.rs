//! Generator-time error kinds. Every variant that can still be tied back
//! to an AST node carries its `SourceSpan`; the grammar-wide `undefined
//! symbol` check has none by construction, matching the original
//! generator's `throw undefined_symbol(-1, x)` (no single source location
//! to blame).

use std::error::Error;
use std::fmt::{self, Display};

use caper_input::SourceSpan;

use crate::lr::Conflict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    UndefinedSymbol {
        name: String,
    },
    DuplicateSymbol {
        name: String,
        first: SourceSpan,
        second: SourceSpan,
    },
    RuleWithTerminalLeftHandSide {
        name: String,
        span: SourceSpan,
    },
    UntypedTerminalAsArgument {
        terminal: String,
        span: SourceSpan,
    },
    DuplicateArgumentSlot {
        slot: u32,
        span: SourceSpan,
    },
    SkippedArgumentSlot {
        expected: u32,
        found: u32,
        span: SourceSpan,
    },
    EbnfNotAllowed {
        item: String,
        span: SourceSpan,
    },
    RecoveryTokenUndeclared {
        name: String,
    },
    TooManyRules,
    DuplicateRule {
        name: String,
        first: SourceSpan,
        second: SourceSpan,
    },
}

impl Error for GeneratorError {}

impl Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::UndefinedSymbol { name } => {
                write!(f, "undefined symbol `{name}`")
            }
            GeneratorError::DuplicateSymbol { name, .. } => {
                write!(f, "`{name}` is declared more than once")
            }
            GeneratorError::RuleWithTerminalLeftHandSide { name, .. } => {
                write!(f, "`{name}` is a token and cannot appear on the left-hand side of a rule")
            }
            GeneratorError::UntypedTerminalAsArgument { terminal, .. } => {
                write!(f, "token `{terminal}` has no value type but is bound as a semantic action argument")
            }
            GeneratorError::DuplicateArgumentSlot { slot, .. } => {
                write!(f, "argument slot {slot} is bound more than once in the same choice")
            }
            GeneratorError::SkippedArgumentSlot { expected, found, .. } => {
                write!(f, "argument slot {expected} must be bound before slot {found}")
            }
            GeneratorError::EbnfNotAllowed { item, .. } => {
                write!(f, "`{item}` uses an EBNF operator but `%allow_ebnf` was not declared")
            }
            GeneratorError::RecoveryTokenUndeclared { name } => {
                write!(f, "`%recover {name}` names a token that was never declared")
            }
            GeneratorError::TooManyRules => {
                write!(f, "grammar has more rules than fit in the table's index type")
            }
            GeneratorError::DuplicateRule { name, .. } => {
                write!(f, "`{name}` has two choices with identical right-hand sides")
            }
        }
    }
}

impl GeneratorError {
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            GeneratorError::DuplicateSymbol { second, .. } => Some(*second),
            GeneratorError::DuplicateRule { second, .. } => Some(*second),
            GeneratorError::RuleWithTerminalLeftHandSide { span, .. }
            | GeneratorError::UntypedTerminalAsArgument { span, .. }
            | GeneratorError::DuplicateArgumentSlot { span, .. }
            | GeneratorError::SkippedArgumentSlot { span, .. }
            | GeneratorError::EbnfNotAllowed { span, .. } => Some(*span),
            GeneratorError::UndefinedSymbol { .. }
            | GeneratorError::RecoveryTokenUndeclared { .. }
            | GeneratorError::TooManyRules => None,
        }
    }
}

/// Raised when the table builder finds shift/reduce or reduce/reduce
/// conflicts and the caller asked not to tolerate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvableConflicts(pub Vec<Conflict>);

impl Error for UnresolvableConflicts {}

impl Display for UnresolvableConflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unresolved conflict(s) in the grammar", self.0.len())
    }
}

#[derive(Debug)]
pub enum CompileError {
    Parse(caper_input::ParseError),
    Grammar(Vec<GeneratorError>),
    Conflicts(UnresolvableConflicts),
}

impl Error for CompileError {}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Grammar(errors) => {
                write!(f, "{} grammar error(s)", errors.len())
            }
            CompileError::Conflicts(c) => write!(f, "{c}"),
        }
    }
}

impl From<caper_input::ParseError> for CompileError {
    fn from(e: caper_input::ParseError) -> Self {
        CompileError::Parse(e)
    }
}
