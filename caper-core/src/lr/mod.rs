//! LALR(1) item-set and state-graph construction: a petgraph-backed
//! state graph, a `BidiMap` for state↔item-set lookup, and an LR(0)-core
//! map for LALR lookahead merging, built over an owned, lifetime-free
//! grammar model and fixed to a single lookahead symbol — this generator
//! only ever builds LALR(1) tables, so there's no generic parameter over
//! LR(0)/LALR(1) and no runtime toggle between them to carry as dead
//! configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use petgraph::{graph::NodeIndex, prelude::DiGraph, visit::EdgeRef, Direction::Outgoing, Graph};

use crate::model::{Grammar, Symbol, SymbolIdx, EOF_TERMINAL};
use crate::util::{compute_first_sets, compute_nullable, first_of_sequence};

use self::bidimap::BidiMap;
use self::item::Item;

mod bidimap;
mod item;

type ItemSet = BTreeSet<Item>;
type Lr0Core = BTreeSet<(usize, u16)>;

fn lr0_core(set: &ItemSet) -> Lr0Core {
    set.iter().map(Item::lr0_core).collect()
}

fn closure(seed: Item, grammar: &Grammar, first_sets: &BTreeMap<SymbolIdx, BTreeSet<SymbolIdx>>, nullable: &BTreeSet<SymbolIdx>) -> ItemSet {
    let mut item_set = ItemSet::new();
    let mut worklist = vec![seed];
    item_set.insert(worklist[0]);

    while let Some(top) = worklist.pop() {
        let Some(Symbol::Nonterminal(n)) = top.symbol_after_dot(grammar) else {
            continue;
        };
        let lookaheads = lookaheads_for_closure(&top, n, grammar, first_sets, nullable);
        for rule in grammar.rules_with_lhs(n) {
            for &lookahead in &lookaheads {
                let new_item = Item::new(rule.id, lookahead);
                if item_set.insert(new_item) {
                    worklist.push(new_item);
                }
            }
        }
    }
    item_set
}

fn lookaheads_for_closure(
    item: &Item,
    _expanded_nonterminal: SymbolIdx,
    grammar: &Grammar,
    first_sets: &BTreeMap<SymbolIdx, BTreeSet<SymbolIdx>>,
    nullable: &BTreeSet<SymbolIdx>,
) -> Vec<SymbolIdx> {
    let rest = item.symbols_after_next(grammar);
    if rest.is_empty() {
        return vec![item.lookahead];
    }
    let mut sequence = rest;
    sequence.push(Symbol::Terminal(item.lookahead));
    first_of_sequence(&sequence, first_sets, nullable).into_iter().collect()
}

struct ParserGraph {
    state_map: BidiMap<ItemSet, NodeIndex>,
    lr0_core_map: BTreeMap<Lr0Core, NodeIndex>,
    graph: Graph<(), Symbol>,
    entry_state: NodeIndex,
}

impl ParserGraph {
    fn add_state(&mut self, set: ItemSet) -> NodeIndex {
        let node = self.graph.add_node(());
        self.lr0_core_map.insert(lr0_core(&set), node);
        self.state_map.insert(set, node);
        node
    }

    fn item_set(&self, state: &NodeIndex) -> &ItemSet {
        self.state_map.get_b_to_a(state).expect("every NodeIndex came from add_state")
    }

    fn merge_lookaheads(&mut self, state: NodeIndex, incoming: ItemSet) -> bool {
        let (mut set, node) = self.state_map.remove_by_b(&state).expect("state exists");
        let mut changed = false;
        for item in incoming {
            changed |= set.insert(item);
        }
        self.lr0_core_map.insert(lr0_core(&set), node);
        self.state_map.insert(set, node);
        changed
    }
}

fn build_parser_graph(
    grammar: &Grammar,
    first_sets: &BTreeMap<SymbolIdx, BTreeSet<SymbolIdx>>,
    nullable: &BTreeSet<SymbolIdx>,
) -> ParserGraph {
    let augmented_rule = grammar
        .rules_with_lhs(grammar.augmented_root)
        .next()
        .expect("grammar_builder always emits the augmented root rule");
    let entry_item = Item::new(augmented_rule.id, EOF_TERMINAL);
    let entry_set = closure(entry_item, grammar, first_sets, nullable);

    let mut graph = ParserGraph {
        state_map: BidiMap::new(),
        lr0_core_map: BTreeMap::new(),
        graph: DiGraph::new(),
        entry_state: NodeIndex::end(),
    };
    let entry_state = graph.add_state(entry_set);
    graph.entry_state = entry_state;

    let mut unprocessed = vec![entry_state];
    while let Some(state) = unprocessed.pop() {
        let mut transitions: BTreeMap<Symbol, ItemSet> = BTreeMap::new();
        for item in graph.item_set(&state) {
            if let Some(symbol) = item.symbol_after_dot(grammar) {
                let advanced = item.advanced();
                let expanded = closure(advanced, grammar, first_sets, nullable);
                transitions.entry(symbol).or_default().extend(expanded);
            }
        }
        for (symbol, item_set) in transitions {
            let core = lr0_core(&item_set);
            if let Some(&target) = graph.lr0_core_map.get(&core) {
                if graph.merge_lookaheads(target, item_set) {
                    unprocessed.push(target);
                }
                graph.graph.add_edge(state, target, symbol);
            } else {
                let target = graph.add_state(item_set);
                unprocessed.push(target);
                graph.graph.add_edge(state, target, symbol);
            }
        }
    }
    graph
}

/// A shift/reduce or reduce/reduce conflict, reported for diagnostics.
/// Resolution always happens regardless (shift wins shift/reduce, lowest
/// rule id wins reduce/reduce) — this only records that it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    ShiftReduce {
        state: usize,
        shift_symbol: SymbolIdx,
        reduce_rule_ids: Vec<usize>,
    },
    ReduceReduce {
        state: usize,
        lookahead: SymbolIdx,
        rule_ids: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

#[derive(Debug)]
pub struct ParsingTable {
    action: BTreeMap<(usize, SymbolIdx), Action>,
    goto: BTreeMap<(usize, SymbolIdx), usize>,
    state_count: usize,
    entry_state: usize,
}

impl ParsingTable {
    pub fn action(&self, state: usize, terminal: SymbolIdx) -> Option<Action> {
        self.action.get(&(state, terminal)).copied()
    }

    pub fn goto(&self, state: usize, nonterminal: SymbolIdx) -> Option<usize> {
        self.goto.get(&(state, nonterminal)).copied()
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn entry_state(&self) -> usize {
        self.entry_state
    }

    pub fn terminal_actions(&self, state: usize, grammar: &Grammar) -> impl Iterator<Item = (SymbolIdx, Action)> + '_ {
        (0..grammar.terminals.len() as SymbolIdx).filter_map(move |t| self.action(state, t).map(|a| (t, a)))
    }

    pub fn nonterminal_gotos(&self, state: usize, grammar: &Grammar) -> impl Iterator<Item = (SymbolIdx, usize)> + '_ {
        (0..grammar.nonterminals.len() as SymbolIdx).filter_map(move |n| self.goto(state, n).map(|s| (n, s)))
    }
}

pub struct TableResult {
    pub table: ParsingTable,
    pub conflicts: Vec<Conflict>,
}

pub fn build_table(grammar: &Grammar) -> TableResult {
    let nullable = compute_nullable(grammar);
    let first_sets = compute_first_sets(grammar, &nullable);
    let graph = build_parser_graph(grammar, &first_sets, &nullable);

    let mut action = BTreeMap::new();
    let mut goto = BTreeMap::new();
    let mut conflicts = Vec::new();

    for (item_set, node) in graph.state_map.iter() {
        let state = node.index();

        let mut shifts: BTreeMap<SymbolIdx, usize> = BTreeMap::new();
        for edge in graph.graph.edges_directed(*node, Outgoing) {
            match edge.weight() {
                Symbol::Terminal(t) => {
                    shifts.insert(*t, edge.target().index());
                }
                Symbol::Nonterminal(n) => {
                    goto.insert((state, *n), edge.target().index());
                }
            }
        }

        let mut reduces: BTreeMap<SymbolIdx, Vec<usize>> = BTreeMap::new();
        for item in item_set {
            if item.is_complete(grammar) {
                reduces.entry(item.lookahead).or_default().push(item.rule_id);
            }
        }

        let mut lookaheads: BTreeSet<SymbolIdx> = shifts.keys().copied().collect();
        lookaheads.extend(reduces.keys().copied());

        for lookahead in lookaheads {
            let shift = shifts.get(&lookahead).copied();
            let mut rule_ids = reduces.get(&lookahead).cloned().unwrap_or_default();
            rule_ids.sort_unstable();

            let resolved = match (shift, rule_ids.as_slice()) {
                (Some(target), []) => Action::Shift(target),
                (None, [rule_id]) => {
                    if grammar.rules[*rule_id].lhs == grammar.augmented_root {
                        Action::Accept
                    } else {
                        Action::Reduce(*rule_id)
                    }
                }
                (Some(target), rule_ids) => {
                    conflicts.push(Conflict::ShiftReduce {
                        state,
                        shift_symbol: lookahead,
                        reduce_rule_ids: rule_ids.to_vec(),
                    });
                    Action::Shift(target)
                }
                (None, rule_ids) => {
                    conflicts.push(Conflict::ReduceReduce {
                        state,
                        lookahead,
                        rule_ids: rule_ids.to_vec(),
                    });
                    Action::Reduce(rule_ids[0])
                }
            };
            action.insert((state, lookahead), resolved);
        }
    }

    let table = ParsingTable {
        action,
        goto,
        state_count: graph.graph.node_count(),
        entry_state: graph.entry_state.index(),
    };
    TableResult { table, conflicts }
}

pub fn write_table_dump(grammar: &Grammar, table: &ParsingTable, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Rules:")?;
    for rule in &grammar.rules {
        let rhs: Vec<&str> = rule.rhs.iter().map(|s| grammar.symbol_name(*s)).collect();
        writeln!(out, "  {}: {} -> {}", rule.id, grammar.nonterminal_name(rule.lhs), rhs.join(" "))?;
    }
    writeln!(out)?;
    for state in 0..table.state_count() {
        writeln!(out, "State {state}:")?;
        for (t, action) in table.terminal_actions(state, grammar) {
            let name = grammar.terminal_name(t);
            match action {
                Action::Shift(target) => writeln!(out, "  {name} -> shift {target}")?,
                Action::Reduce(rule_id) => writeln!(out, "  {name} -> reduce {rule_id}")?,
                Action::Accept => writeln!(out, "  {name} -> accept")?,
            }
        }
        for (n, target) in table.nonterminal_gotos(state, grammar) {
            writeln!(out, "  goto {} -> {}", grammar.nonterminal_name(n), target)?;
        }
    }
    Ok(())
}
