//! Assembles the generated C++ header text. Functions here only ever
//! format into a `dyn Write`; nothing here executes the grammar, it just
//! transliterates the compiled tables into C++ source, following the same
//! section order as the Rust backend so the two stay easy to compare.

use std::io::{self, Write};

use caper_core::lr::{Action, ParsingTable};
use caper_core::model::{Grammar, Rule, Symbol};
use caper_core::options::Options;
use caper_core::CompiledGrammar;

const MAX_STACK_DEPTH: usize = 1 << 16;

pub fn emit(compiled: &CompiledGrammar, out: &mut dyn Write) -> io::Result<()> {
    let grammar = &compiled.grammar;
    let table = &compiled.table;
    let options = &compiled.options;

    emit_header(grammar, options, table, out)?;
    if let Some(ns) = &options.namespace {
        writeln!(out, "namespace {ns} {{")?;
    }
    if !options.external_token {
        emit_token_enum(grammar, options, out)?;
    }
    emit_value_and_stack(options, out)?;
    emit_semantic_action_interface(grammar, out)?;
    emit_action_and_goto(grammar, table, options, out)?;
    emit_reduce(grammar, out)?;
    emit_parser(grammar, options, out)?;
    if let Some(ns) = &options.namespace {
        writeln!(out, "}} // namespace {ns}")?;
    }
    Ok(())
}

fn emit_header(grammar: &Grammar, options: &Options, table: &ParsingTable, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "// Generated parser. Do not edit by hand.")?;
    writeln!(
        out,
        "// entry rule: {}, {} terminal(s), {} nonterminal(s), {} state(s)",
        grammar.nonterminal_name(grammar.entry),
        grammar.terminals.len(),
        grammar.nonterminals.len(),
        table.state_count()
    )?;
    writeln!(out, "#pragma once")?;
    writeln!(out)?;
    writeln!(out, "#include <any>")?;
    writeln!(out, "#include <cstdint>")?;
    if options.debug_parser {
        writeln!(out, "#include <iostream>")?;
    }
    writeln!(out, "#include <optional>")?;
    writeln!(out, "#include <stdexcept>")?;
    writeln!(out, "#include <utility>")?;
    writeln!(out, "#include <variant>")?;
    writeln!(out, "#include <vector>")?;
    writeln!(out)?;
    Ok(())
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

fn token_variant(name: &str, options: &Options) -> String {
    format!("{}{}", options.token_prefix, name)
}

fn emit_token_enum(grammar: &Grammar, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "enum class Token {{")?;
    for terminal in &grammar.terminals {
        writeln!(out, "    {},", token_variant(&terminal.name, options))?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

fn emit_value_and_stack(options: &Options, out: &mut dyn Write) -> io::Result<()> {
    let access = options.access_modifier.as_deref().unwrap_or("public");
    writeln!(
        out,
        r#"// Dynamically typed value carried on the parse stack, bridging the
// statically typed semantic actions across the generic reduce dispatch.
class Value {{
{access}:
    template <typename T> static Value upcast(T value) {{
        return Value(std::make_any<T>(std::move(value)));
    }}

    template <typename T> T downcast() {{
        return std::any_cast<T>(std::move(inner_));
    }}

private:
    explicit Value(std::any inner) : inner_(std::move(inner)) {{}}
    std::any inner_;
}};

// Accumulator for `*`/`+`/`/`-extended rule elements.
class Sequence {{
{access}:
    static Sequence empty() {{
        return Sequence();
    }}

    static Sequence with_one(Value value) {{
        Sequence seq;
        seq.values_.push_back(std::move(value));
        return seq;
    }}

    Sequence push(Value value) && {{
        values_.push_back(std::move(value));
        return std::move(*this);
    }}

    std::size_t len() const {{
        return values_.size();
    }}

    std::vector<Value> into_values() && {{
        return std::move(values_);
    }}

private:
    Sequence() = default;
    std::vector<Value> values_;
}};

struct Frame {{
    std::size_t state;
    std::optional<Value> value;
}};

// The parser's value stack. Reduces in this generator run to completion
// or not at all, so unlike the speculative `tmp_`/`gap_` split described
// for the bulk-memory variant, a single vector is enough here;
// rollback_tmp/commit_tmp are kept as named no-ops so recovery code reads
// the same regardless of which stack variant backs it.
class Stack {{
{access}:
    bool push(std::size_t state, std::optional<Value> value) {{
        if (frames_.size() >= {max_depth}) {{
            return false;
        }}
        frames_.push_back(Frame{{state, std::move(value)}});
        return true;
    }}

    // Pops the top n frames, returning one slot per frame (nullopt for
    // frames holding an untyped/valueless symbol) so the result stays
    // aligned with the popped rule's right-hand-side positions.
    std::vector<std::optional<Value>> pop(std::size_t n) {{
        std::vector<std::optional<Value>> popped;
        for (std::size_t i = frames_.size() - n; i < frames_.size(); ++i) {{
            popped.push_back(std::move(frames_[i].value));
        }}
        frames_.resize(frames_.size() - n);
        return popped;
    }}

    std::size_t top_state() const {{
        return frames_.empty() ? 0 : frames_.back().state;
    }}

    bool empty() const {{
        return frames_.empty();
    }}

    void clear() {{
        frames_.clear();
    }}

    void rollback_tmp() {{}}

    void commit_tmp() {{}}

private:
    std::vector<Frame> frames_;
}};
"#,
        access = access,
        max_depth = MAX_STACK_DEPTH
    )?;
    writeln!(out)?;
    Ok(())
}

fn emit_semantic_action_interface(grammar: &Grammar, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "class SemanticAction {{")?;
    writeln!(out, "public:")?;
    writeln!(out, "    virtual ~SemanticAction() = default;")?;
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
            args.push(format!("{} arg{}", type_name, argument.slot));
        }
        writeln!(out, "    virtual {lhs_type} {name}({}) = 0;", args.join(", "))?;
    }
    writeln!(out, "    virtual void syntax_error() = 0;")?;
    writeln!(out, "    virtual void stack_overflow() = 0;")?;
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

fn symbol_debug_name(grammar: &Grammar, symbol: Symbol) -> &str {
    grammar.symbol_name(symbol)
}

fn emit_action_and_goto(grammar: &Grammar, table: &ParsingTable, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "enum class ActionKind {{ Shift, Reduce, Accept, Error }};")?;
    writeln!(out)?;
    writeln!(out, "struct ParseAction {{")?;
    writeln!(out, "    ActionKind kind;")?;
    writeln!(out, "    std::size_t target;")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "inline bool handle_error(std::size_t state) {{")?;
    writeln!(out, "    switch (state) {{")?;
    for state in handle_error_states(grammar, table) {
        writeln!(out, "    case {state}: return true;")?;
    }
    writeln!(out, "    default: return false;")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "inline ParseAction action(std::size_t state, Token token) {{")?;
    writeln!(out, "    switch (state) {{")?;
    for state in 0..table.state_count() {
        writeln!(out, "    case {state}:")?;
        writeln!(out, "        switch (token) {{")?;
        for (terminal, act) in table.terminal_actions(state, grammar) {
            let token = token_variant(grammar.terminal_name(terminal), options);
            let rendered = match act {
                Action::Shift(target) => format!("ParseAction{{ActionKind::Shift, {target}}}"),
                Action::Reduce(rule_id) => format!("ParseAction{{ActionKind::Reduce, {rule_id}}}"),
                Action::Accept => "ParseAction{ActionKind::Accept, 0}".to_string(),
            };
            writeln!(out, "        case Token::{token}: return {rendered};")?;
        }
        writeln!(out, "        default: return ParseAction{{ActionKind::Error, 0}};")?;
        writeln!(out, "        }}")?;
    }
    writeln!(out, "    default: return ParseAction{{ActionKind::Error, 0}};")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "inline std::size_t parser_goto(std::size_t state, std::uint32_t nonterminal) {{")?;
    writeln!(out, "    switch (state) {{")?;
    for state in 0..table.state_count() {
        let gotos: Vec<_> = table.nonterminal_gotos(state, grammar).collect();
        if gotos.is_empty() {
            continue;
        }
        writeln!(out, "    case {state}:")?;
        writeln!(out, "        switch (nonterminal) {{")?;
        for (nonterminal, target) in gotos {
            writeln!(
                out,
                "        case {nonterminal}: return {target}; // {}",
                symbol_debug_name(grammar, Symbol::Nonterminal(nonterminal))
            )?;
        }
        writeln!(out, "        default: throw std::logic_error(\"goto table has no entry for this (state, nonterminal) pair\");")?;
        writeln!(out, "        }}")?;
    }
    writeln!(out, "    default: throw std::logic_error(\"goto table has no entry for this (state, nonterminal) pair\");")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn handle_error_states(grammar: &Grammar, table: &ParsingTable) -> Vec<usize> {
    let Some(recover) = grammar.recover_terminal else {
        return Vec::new();
    };
    (0..table.state_count()).filter(|&s| table.action(s, recover).is_some()).collect()
}

fn emit_reduce(grammar: &Grammar, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "template <typename SA>")?;
    writeln!(out, "inline std::pair<std::uint32_t, Value> reduce(std::size_t rule_id, Stack& stack, SA& sa) {{")?;
    writeln!(out, "    switch (rule_id) {{")?;
    for rule in &grammar.rules {
        if rule.lhs == grammar.augmented_root {
            continue;
        }
        emit_reduce_arm(grammar, rule, out)?;
    }
    writeln!(out, "    default: throw std::logic_error(\"no rule with this id\");")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_reduce_arm(grammar: &Grammar, rule: &Rule, out: &mut dyn Write) -> io::Result<()> {
    let n = rule.rhs.len();
    writeln!(out, "    case {}: {{", rule.id)?;
    writeln!(out, "        auto args = stack.pop({n});")?;

    let value_expr = match rule.action.name.as_deref() {
        Some("seq_head") if n == 0 => "Value::upcast(Sequence::empty())".to_string(),
        Some("seq_head") => "Value::upcast(Sequence::with_one(std::move(*args[0])))".to_string(),
        Some("seq_trail") => "Value::upcast(args[0]->downcast<Sequence>().push(std::move(*args[1])))".to_string(),
        Some("seq_trail2") => "Value::upcast(args[0]->downcast<Sequence>().push(std::move(*args[2])))".to_string(),
        Some(name) => {
            let mut call_args = Vec::new();
            for argument in &rule.action.arguments {
                let symbol = rule.rhs[argument.symbol_index];
                let type_name = match symbol {
                    Symbol::Terminal(t) => grammar.terminals[t as usize].value_type.0.clone(),
                    Symbol::Nonterminal(n) => grammar.nonterminals[n as usize].value_type.0.clone(),
                };
                call_args.push(format!("args[{}]->downcast<{}>()", argument.symbol_index, type_name));
            }
            format!("Value::upcast(sa.{name}({}))", call_args.join(", "))
        }
        None if rule.action.arguments.len() == 1 => {
            format!("std::move(*args[{}])", rule.action.arguments[0].symbol_index)
        }
        None => "Value::upcast(std::monostate{})".to_string(),
    };
    writeln!(out, "        Value value = {value_expr};")?;
    writeln!(out, "        return {{{}, std::move(value)}};", rule.lhs)?;
    writeln!(out, "    }}")?;
    Ok(())
}

fn emit_parser(grammar: &Grammar, options: &Options, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        r#"template <typename SA>
class Parser {{
public:
    explicit Parser(SA sa) : sa_(std::move(sa)) {{
        reset();
    }}

    void reset() {{
        stack_.clear();
        error_ = false;
        accepted_.reset();
        if (!stack_.push(0, std::nullopt)) {{
            sa_.stack_overflow();
            error_ = true;
        }}
    }}

    bool has_error() const {{
        return error_;
    }}

    std::optional<Value> accept() {{
        auto value = std::move(accepted_);
        accepted_.reset();
        return value;
    }}

    // Drives the parser with one input token. Returns true once the
    // parser has either accepted or entered the error state.
    bool post(Token token, std::optional<Value> value) {{
        if (error_) {{
            return true;
        }}
        bool done = drive(token, std::move(value));
        if (error_) {{
            {recovery}
        }}
        return done || error_;
    }}

private:
    // The shift/reduce/accept loop for a single input token. Unlike
    // post, this never triggers recovery itself -- recover calls this
    // directly so a failed recovery token doesn't recursively re-enter
    // recovery.
    bool drive(Token token, std::optional<Value> value) {{
        for (;;) {{
            std::size_t state = stack_.top_state();
            {trace_state}
            ParseAction act = action(state, token);
            switch (act.kind) {{
            case ActionKind::Shift: {{
                {trace_shift}
                if (!stack_.push(act.target, std::move(value))) {{
                    sa_.stack_overflow();
                    error_ = true;
                }}
                return true;
            }}
            case ActionKind::Reduce: {{
                {trace_reduce}
                auto [lhs, reduced] = reduce(act.target, stack_, sa_);
                std::size_t dest = parser_goto(stack_.top_state(), lhs);
                if (!stack_.push(dest, std::move(reduced))) {{
                    sa_.stack_overflow();
                    error_ = true;
                    return true;
                }}
                break;
            }}
            case ActionKind::Accept: {{
                {trace_accept}
                auto popped = stack_.pop(1);
                accepted_ = popped.empty() ? std::nullopt : std::move(popped[0]);
                return true;
            }}
            case ActionKind::Error: {{
                {trace_error}
                sa_.syntax_error();
                error_ = true;
                return true;
            }}
            }}
        }}
    }}
"#,
        recovery = if grammar.recover_terminal.is_some() {
            "recover(token, std::move(value));"
        } else {
            ""
        },
        trace_state = debug_trace(options, r#"std::cerr << "post: state=" << state << " token=" << static_cast<int>(token) << "\n";"#),
        trace_shift = debug_trace(options, r#"std::cerr << "shift: target=" << act.target << "\n";"#),
        trace_reduce = debug_trace(options, r#"std::cerr << "reduce: rule=" << act.target << "\n";"#),
        trace_accept = debug_trace(options, r#"std::cerr << "accept\n";"#),
        trace_error = debug_trace(options, r#"std::cerr << "syntax error: state=" << state << "\n";"#)
    )?;

    if let Some(recover_id) = grammar.recover_terminal {
        writeln!(
            out,
            r#"    // Panic-mode recovery: discard stack frames until a state that can
    // shift the recovery token is found, then feed the recovery token
    // until the driver stops erroring, and finally re-post the token
    // that originally triggered the error.
    void recover(Token token, std::optional<Value> value) {{
        stack_.rollback_tmp();
        while (!stack_.empty() && !handle_error(stack_.top_state())) {{
            stack_.pop(1);
        }}
        if (stack_.empty()) {{
            return;
        }}
        error_ = false;
        for (;;) {{
            drive(Token::{recover_token}, std::nullopt);
            if (!error_) {{
                break;
            }}
            if (stack_.empty()) {{
                error_ = true;
                return;
            }}
            error_ = false;
        }}
        stack_.commit_tmp();
        drive(token, std::move(value));
        error_ = error_ && token == Token::{recover_token};
    }}
"#,
            recover_token = token_variant(grammar.terminal_name(recover_id), options)
        )?;
    }

    writeln!(
        out,
        r#"
private:
    Stack stack_;
    SA sa_;
    bool error_ = false;
    std::optional<Value> accepted_;
}};
"#
    )?;
    Ok(())
}
