//! Assembles the generated source text. Functions here only ever format
//! into a `dyn Write`; nothing here executes the grammar, it just
//! transliterates the compiled tables into Rust source.

use std::io::{self, Write};

use caper_core::lr::{Action, ParsingTable};
use caper_core::model::{Grammar, Rule, Symbol, SymbolIdx};
use caper_core::options::Options;
use caper_core::CompiledGrammar;

/// Soft cap on stack depth; exceeding it is reported through
/// `SemanticAction::stack_overflow` rather than panicking.
const MAX_STACK_DEPTH: usize = 1 << 16;

pub fn emit(compiled: &CompiledGrammar, out: &mut dyn Write) -> io::Result<()> {
    let grammar = &compiled.grammar;
    let table = &compiled.table;
    let options = &compiled.options;

    emit_header(grammar, options, out)?;
    if !options.external_token {
        emit_token_enum(grammar, options, out)?;
    }
    emit_value_and_stack(out)?;
    emit_semantic_action_trait(grammar, out)?;
    emit_action_and_goto(grammar, table, options, out)?;
    emit_reduce(grammar, out)?;
    emit_parser(grammar, options, out)?;
    Ok(())
}

fn emit_header(grammar: &Grammar, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "// Generated parser. Do not edit by hand.")?;
    if let Some(ns) = &options.namespace {
        writeln!(out, "// namespace: {ns}")?;
    }
    writeln!(
        out,
        "// entry rule: {}, {} terminal(s), {} nonterminal(s), {} state(s)",
        grammar.nonterminal_name(grammar.entry),
        grammar.terminals.len(),
        grammar.nonterminals.len(),
        table.state_count()
    )?;
    writeln!(out)?;
    Ok(())
}

fn token_variant(name: &str, options: &Options) -> String {
    format!("{}{}", options.token_prefix, name)
}

/// Renders `line` verbatim when `%debug_parser` is set, otherwise emits
/// nothing — keeps the parser loop free of tracing overhead by default.
fn debug_trace(options: &Options, line: &str) -> String {
    if options.debug_parser {
        line.to_string()
    } else {
        String::new()
    }
}

fn emit_token_enum(grammar: &Grammar, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]")?;
    writeln!(out, "pub enum Token {{")?;
    for terminal in &grammar.terminals {
        writeln!(out, "    {},", token_variant(&terminal.name, options))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_value_and_stack(out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        r#"/// Dynamically typed value carried on the parse stack, bridging the
/// statically typed semantic actions across the generic reduce dispatch.
pub struct Value(Box<dyn core::any::Any>);

impl Value {{
    pub fn upcast<T: 'static>(value: T) -> Self {{
        Value(Box::new(value))
    }}

    pub fn downcast<T: 'static>(self) -> T {{
        *self
            .0
            .downcast::<T>()
            .unwrap_or_else(|_| panic!("value stack type mismatch"))
    }}
}}

/// Accumulator for `*`/`+`/`/`-extended rule elements.
pub struct Sequence(Vec<Value>);

impl Sequence {{
    fn empty() -> Self {{
        Sequence(Vec::new())
    }}

    fn with_one(value: Value) -> Self {{
        Sequence(vec![value])
    }}

    fn push(mut self, value: Value) -> Self {{
        self.0.push(value);
        self
    }}

    pub fn len(&self) -> usize {{
        self.0.len()
    }}

    pub fn is_empty(&self) -> bool {{
        self.0.is_empty()
    }}

    pub fn into_values(self) -> Vec<Value> {{
        self.0
    }}
}}

struct Frame {{
    state: usize,
    value: Option<Value>,
}}

/// The parser's value stack. Reduces in this generator are atomic Rust
/// function calls that run to completion or not at all, so unlike the
/// speculative `tmp_`/`gap_` split described for the bulk-memory variant,
/// a single `Vec` is enough here; `rollback_tmp`/`commit_tmp` are kept as
/// named no-ops so recovery code reads the same regardless of which
/// stack variant backs it.
pub struct Stack {{
    frames: Vec<Frame>,
}}

impl Stack {{
    pub fn new() -> Self {{
        Stack {{ frames: Vec::new() }}
    }}

    pub fn clear(&mut self) {{
        self.frames.clear();
    }}

    pub fn depth(&self) -> usize {{
        self.frames.len()
    }}

    pub fn is_empty(&self) -> bool {{
        self.frames.is_empty()
    }}

    pub fn push(&mut self, state: usize, value: Option<Value>) -> bool {{
        if self.frames.len() >= {max_depth} {{
            return false;
        }}
        self.frames.push(Frame {{ state, value }});
        true
    }}

    /// Pops the top `n` frames, returning one slot per frame (`None` for
    /// frames holding an untyped/valueless symbol) so the result stays
    /// aligned with the popped rule's right-hand-side positions.
    pub fn pop(&mut self, n: usize) -> Vec<Option<Value>> {{
        let at = self.frames.len() - n;
        self.frames.split_off(at).into_iter().map(|f| f.value).collect()
    }}

    pub fn top_state(&self) -> usize {{
        self.frames.last().map(|f| f.state).unwrap_or(0)
    }}

    pub fn rollback_tmp(&mut self) {{}}

    pub fn commit_tmp(&mut self) {{}}
}}

impl Default for Stack {{
    fn default() -> Self {{
        Self::new()
    }}
}}
"#,
        max_depth = MAX_STACK_DEPTH
    )?;
    writeln!(out)?;
    Ok(())
}

fn emit_semantic_action_trait(grammar: &Grammar, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "pub trait SemanticAction {{")?;
    let mut seen = std::collections::BTreeSet::new();
    for rule in &grammar.rules {
        let Some(name) = &rule.action.name else { continue };
        if !seen.insert(name.clone()) {
            continue;
        }
        let lhs_type = &grammar.nonterminals[rule.lhs as usize].value_type;
        let mut args = Vec::new();
        for argument in &rule.action.arguments {
            let symbol = rule.rhs[argument.symbol_index];
            let type_name = match symbol {
                Symbol::Terminal(t) => grammar.terminals[t as usize].value_type.0.clone(),
                Symbol::Nonterminal(n) => grammar.nonterminals[n as usize].value_type.0.clone(),
            };
            args.push(format!("arg{}: {}", argument.slot, type_name));
        }
        writeln!(out, "    fn {name}(&mut self, {}) -> {lhs_type};", args.join(", "))?;
    }
    writeln!(out, "    fn syntax_error(&mut self);")?;
    writeln!(out, "    fn stack_overflow(&mut self);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn symbol_debug_name(grammar: &Grammar, symbol: Symbol) -> &str {
    grammar.symbol_name(symbol)
}

fn emit_action_and_goto(grammar: &Grammar, table: &ParsingTable, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq)]")?;
    writeln!(out, "pub enum ParseAction {{")?;
    writeln!(out, "    Shift(usize),")?;
    writeln!(out, "    Reduce(usize),")?;
    writeln!(out, "    Accept,")?;
    writeln!(out, "    Error,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "fn handle_error(state: usize) -> bool {{")?;
    writeln!(out, "    matches!(state, {})", handle_error_states(grammar, table))?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "fn action(state: usize, token: Token) -> ParseAction {{")?;
    writeln!(out, "    match (state, token) {{")?;
    for state in 0..table.state_count() {
        for (terminal, act) in table.terminal_actions(state, grammar) {
            let token = token_variant(grammar.terminal_name(terminal), options);
            let rendered = match act {
                Action::Shift(target) => format!("ParseAction::Shift({target})"),
                Action::Reduce(rule_id) => format!("ParseAction::Reduce({rule_id})"),
                Action::Accept => "ParseAction::Accept".to_string(),
            };
            writeln!(out, "        ({state}, Token::{token}) => {rendered},")?;
        }
    }
    writeln!(out, "        _ => ParseAction::Error,")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "fn goto(state: usize, nonterminal: u32) -> usize {{")?;
    writeln!(out, "    match (state, nonterminal) {{")?;
    for state in 0..table.state_count() {
        for (nonterminal, target) in table.nonterminal_gotos(state, grammar) {
            writeln!(
                out,
                "        ({state}, {nonterminal}) => {target}, // {}",
                symbol_debug_name(grammar, Symbol::Nonterminal(nonterminal))
            )?;
        }
    }
    writeln!(out, "        _ => unreachable!(\"goto table has no entry for this (state, nonterminal) pair\"),")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn handle_error_states(grammar: &Grammar, table: &ParsingTable) -> String {
    let Some(recover) = grammar.recover_terminal else {
        return "_ if false => true, _".to_string();
    };
    let states: Vec<String> = (0..table.state_count())
        .filter(|&s| table.action(s, recover).is_some())
        .map(|s| s.to_string())
        .collect();
    if states.is_empty() {
        "_ if false => true, _".to_string()
    } else {
        format!("{}", states.join(" | "))
    }
}

fn emit_reduce(grammar: &Grammar, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "fn reduce<SA: SemanticAction>(rule_id: usize, stack: &mut Stack, sa: &mut SA) -> (u32, Value) {{")?;
    writeln!(out, "    match rule_id {{")?;
    for rule in &grammar.rules {
        if rule.lhs == grammar.augmented_root {
            continue; // handled as Accept, never reduced.
        }
        emit_reduce_arm(grammar, rule, out)?;
    }
    writeln!(out, "        other => unreachable!(\"no rule with id {{other}}\"),")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_reduce_arm(grammar: &Grammar, rule: &Rule, out: &mut dyn Write) -> io::Result<()> {
    let n = rule.rhs.len();
    writeln!(out, "        {} => {{", rule.id)?;
    writeln!(out, "            let mut args: Vec<Option<Value>> = stack.pop({n});")?;

    let value_expr = match rule.action.name.as_deref() {
        Some("seq_head") if n == 0 => "Value::upcast(Sequence::empty())".to_string(),
        Some("seq_head") => "Value::upcast(Sequence::with_one(args[0].take().unwrap()))".to_string(),
        Some("seq_trail") => {
            "Value::upcast(args[0].take().unwrap().downcast::<Sequence>().push(args[1].take().unwrap()))".to_string()
        }
        Some("seq_trail2") => {
            "Value::upcast(args[0].take().unwrap().downcast::<Sequence>().push(args[2].take().unwrap()))".to_string()
        }
        Some(name) => {
            let mut call_args = Vec::new();
            for argument in &rule.action.arguments {
                call_args.push(format!("args[{}].take().unwrap().downcast()", argument.symbol_index));
            }
            format!("Value::upcast(sa.{name}({}))", call_args.join(", "))
        }
        None if rule.action.arguments.len() == 1 => {
            format!("args[{}].take().unwrap()", rule.action.arguments[0].symbol_index)
        }
        None => "Value::upcast(())".to_string(),
    };
    writeln!(out, "            let value = {value_expr};")?;
    writeln!(out, "            ({}, value)", rule.lhs)?;
    writeln!(out, "        }}")?;
    Ok(())
}

fn emit_parser(grammar: &Grammar, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        r#"pub struct Parser<SA: SemanticAction> {{
    stack: Stack,
    sa: SA,
    error: bool,
    accepted: Option<Value>,
}}

impl<SA: SemanticAction> Parser<SA> {{
    pub fn new(sa: SA) -> Self {{
        let mut parser = Parser {{
            stack: Stack::new(),
            sa,
            error: false,
            accepted: None,
        }};
        parser.reset();
        parser
    }}

    pub fn reset(&mut self) {{
        self.stack.clear();
        self.error = false;
        self.accepted = None;
        if !self.stack.push(0, None) {{
            self.sa.stack_overflow();
            self.error = true;
        }}
    }}

    pub fn error(&self) -> bool {{
        self.error
    }}

    pub fn accept(&mut self) -> Option<Value> {{
        self.accepted.take()
    }}

    /// Drives the parser with one input token. Returns `true` once the
    /// parser has either accepted or entered the error state.
    pub fn post(&mut self, token: Token, value: Option<Value>) -> bool {{
        if self.error {{
            return true;
        }}
        let done = self.drive(token, value);
        if self.error {{
            {recovery}
        }}
        done || self.error
    }}

    /// The shift/reduce/accept loop for a single input token. Unlike
    /// `post`, this never triggers recovery itself — `recover` calls this
    /// directly so a failed recovery token doesn't recursively re-enter
    /// recovery.
    fn drive(&mut self, token: Token, value: Option<Value>) -> bool {{
        loop {{
            let state = self.stack.top_state();
            {trace_state}
            match action(state, token) {{
                ParseAction::Shift(target) => {{
                    {trace_shift}
                    if !self.stack.push(target, value) {{
                        self.sa.stack_overflow();
                        self.error = true;
                    }}
                    return true;
                }}
                ParseAction::Reduce(rule_id) => {{
                    {trace_reduce}
                    let (lhs, reduced) = reduce(rule_id, &mut self.stack, &mut self.sa);
                    let dest = goto(self.stack.top_state(), lhs);
                    if !self.stack.push(dest, Some(reduced)) {{
                        self.sa.stack_overflow();
                        self.error = true;
                        return true;
                    }}
                }}
                ParseAction::Accept => {{
                    {trace_accept}
                    self.accepted = self.stack.pop(1).into_iter().next().flatten();
                    return true;
                }}
                ParseAction::Error => {{
                    {trace_error}
                    self.sa.syntax_error();
                    self.error = true;
                    return true;
                }}
            }}
        }}
    }}
}}
"#,
        recovery = if grammar.recover_terminal.is_some() {
            "self.recover(token, value);"
        } else {
            ""
        },
        trace_state = debug_trace(options, r#"tracing::trace!(?state, ?token, "post");"#),
        trace_shift = debug_trace(options, r#"tracing::trace!(?target, "shift");"#),
        trace_reduce = debug_trace(options, r#"tracing::trace!(rule_id, "reduce");"#),
        trace_accept = debug_trace(options, r#"tracing::trace!("accept");"#),
        trace_error = debug_trace(options, r#"tracing::trace!(?state, ?token, "syntax error");"#)
    )?;

    if let Some(recover_id) = grammar.recover_terminal {
        writeln!(
            out,
            r#"impl<SA: SemanticAction> Parser<SA> {{
    /// Panic-mode recovery: discard stack frames until a state that can
    /// shift the recovery token is found, then feed the recovery token
    /// until the driver stops erroring, and finally re-post the token
    /// that originally triggered the error.
    fn recover(&mut self, token: Token, value: Option<Value>) {{
        self.stack.rollback_tmp();
        while !self.stack.is_empty() && !handle_error(self.stack.top_state()) {{
            self.stack.pop(1);
        }}
        if self.stack.is_empty() {{
            return;
        }}
        self.error = false;
        loop {{
            self.drive(Token::{recover_token}, None);
            if !self.error {{
                break;
            }}
            if self.stack.is_empty() {{
                self.error = true;
                return;
            }}
            self.error = false;
        }}
        self.stack.commit_tmp();
        self.drive(token, value);
        if self.error && token == Token::{recover_token} {{
            self.error = true;
        }} else {{
            self.error = false;
        }}
    }}
}}
"#,
            recover_token = token_variant(grammar.terminal_name(recover_id), options)
        )?;
    }
    Ok(())
}
