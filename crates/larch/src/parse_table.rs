//! Calculation of LR(1) parse table with conflict detection.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lr1::{Automaton, StateID},
    trace::{Trace, TraceEvent},
    types::Map,
    util::display_fn,
};
use larch_runtime::definition::{self, ParseAction};
use std::fmt;

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
///
/// A missing entry means the lookahead symbol is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

/// Mapping `(state, terminal) -> action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable {
    rows: Vec<Map<TerminalID, Action>>,
}

impl ActionTable {
    pub fn get(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.rows.get(state.into_raw())?.get(&lookahead).copied()
    }

    /// Return the actions defined for `state`.
    pub fn row(&self, state: StateID) -> impl Iterator<Item = (TerminalID, Action)> + '_ {
        self.rows
            .get(state.into_raw())
            .into_iter()
            .flat_map(|row| row.iter().map(|(t, action)| (*t, *action)))
    }

    /// The number of states covered by this table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Mapping `(state, nonterminal) -> state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoTable {
    rows: Vec<Map<NonterminalID, StateID>>,
}

impl GotoTable {
    pub fn get(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.rows.get(state.into_raw())?.get(&symbol).copied()
    }

    pub fn row(&self, state: StateID) -> impl Iterator<Item = (NonterminalID, StateID)> + '_ {
        self.rows
            .get(state.into_raw())
            .into_iter()
            .flat_map(|row| row.iter().map(|(n, next)| (*n, *next)))
    }
}

/// The shape of a production needed to perform its reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub left: NonterminalID,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    actions: ActionTable,
    gotos: GotoTable,
    reductions: Map<RuleID, Reduction>,
}

impl ParseTable {
    pub fn generate(grammar: &Grammar) -> Result<Self, TableError> {
        Self::generate_with(grammar, &mut ())
    }

    pub fn generate_with<T>(grammar: &Grammar, trace: &mut T) -> Result<Self, TableError>
    where
        T: ?Sized + Trace,
    {
        let first_sets = FirstSets::new(grammar);
        let automaton = Automaton::build_with(grammar, &first_sets, &mut *trace);
        Self::from_automaton(grammar, &automaton, trace)
    }

    pub fn from_automaton<T>(
        grammar: &Grammar,
        automaton: &Automaton,
        trace: &mut T,
    ) -> Result<Self, TableError>
    where
        T: ?Sized + Trace,
    {
        let _span = tracing::debug_span!("build_table").entered();

        let mut actions: Vec<Map<TerminalID, Action>> = vec![Map::default(); automaton.len()];
        let mut gotos: Vec<Map<NonterminalID, StateID>> = vec![Map::default(); automaton.len()];

        // reduce
        for reduce in automaton.reduces() {
            if reduce.rule == RuleID::ACCEPT {
                // replaced by the accept action below
                continue;
            }
            let row = &mut actions[reduce.state.into_raw()];
            if let Some(&Action::Reduce(first)) = row.get(&reduce.lookahead) {
                return Err(conflict(
                    grammar,
                    trace,
                    Conflict {
                        state: reduce.state,
                        lookahead: reduce.lookahead,
                        kind: ConflictKind::ReduceReduce {
                            first,
                            second: reduce.rule,
                        },
                    },
                ));
            }
            row.insert(reduce.lookahead, Action::Reduce(reduce.rule));
        }

        // shift, goto
        for (from, symbol, to) in automaton.transitions() {
            match symbol {
                SymbolID::T(t) => {
                    let row = &mut actions[from.into_raw()];
                    if let Some(&Action::Reduce(reduce)) = row.get(&t) {
                        return Err(conflict(
                            grammar,
                            trace,
                            Conflict {
                                state: from,
                                lookahead: t,
                                kind: ConflictKind::ShiftReduce { shift: to, reduce },
                            },
                        ));
                    }
                    row.insert(t, Action::Shift(to));
                }
                SymbolID::N(n) => match gotos[from.into_raw()].insert(n, to) {
                    Some(first) if first != to => {
                        return Err(TableError::GotoConflict {
                            state: from,
                            symbol: grammar.symbol_name(symbol).to_owned(),
                            first,
                            second: to,
                        });
                    }
                    _ => (),
                },
            }
        }

        // accept
        for (id, items) in automaton.states() {
            let accepts = items
                .iter()
                .any(|item| item.rule == RuleID::ACCEPT && item.is_complete(grammar));
            if !accepts {
                continue;
            }
            let row = &mut actions[id.into_raw()];
            match row.get(&TerminalID::EOI).copied() {
                Some(Action::Shift(shift)) => {
                    return Err(conflict(
                        grammar,
                        trace,
                        Conflict {
                            state: id,
                            lookahead: TerminalID::EOI,
                            kind: ConflictKind::ShiftAccept { shift },
                        },
                    ));
                }
                Some(Action::Reduce(rule)) => {
                    trace.event(TraceEvent::AcceptOverridesReduce { state: id, rule });
                }
                _ => (),
            }
            row.insert(TerminalID::EOI, Action::Accept);
        }

        let reductions = grammar
            .rules()
            .map(|(id, rule)| {
                (
                    id,
                    Reduction {
                        left: rule.left(),
                        len: rule.right().len(),
                    },
                )
            })
            .collect();

        Ok(Self {
            actions: ActionTable { rows: actions },
            gotos: GotoTable { rows: gotos },
            reductions,
        })
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn gotos(&self) -> &GotoTable {
        &self.gotos
    }

    pub fn reduction(&self, rule: RuleID) -> Option<Reduction> {
        self.reductions.get(&rule).copied()
    }

    /// The number of states.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The terminals that have an action in `state`.
    pub fn expected_terminals(&self, state: StateID) -> Vec<TerminalID> {
        self.actions.row(state).map(|(t, _)| t).collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for i in 0..self.len() {
                let id = StateID::from_raw(i);
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## actions")?;
                for (token, action) in self.actions.row(id) {
                    let token = g.symbol_name(SymbolID::T(token));
                    match action {
                        Action::Shift(n) => writeln!(f, "- {} => shift({:02})", token, n)?,
                        Action::Reduce(reduce) => match g.rule(reduce) {
                            Some(rule) => {
                                writeln!(f, "- {} => reduce({})", token, rule.display(g))?
                            }
                            None => writeln!(f, "- {} => reduce({})", token, reduce)?,
                        },
                        Action::Accept => writeln!(f, "- {} => accept", token)?,
                    }
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in self.gotos.row(id) {
                    writeln!(f, "- {} => goto({:02})", g.symbol_name(SymbolID::N(symbol)), goto)?;
                }
            }
            Ok(())
        })
    }
}

impl definition::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = RuleID;

    fn initial_state(&self) -> Self::State {
        StateID::START
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
        match self.actions.get(current, lookahead)? {
            Action::Shift(next) => Some(ParseAction::Shift(next)),
            Action::Reduce(reduce) => {
                let Reduction { left, len } = self.reduction(reduce)?;
                Some(ParseAction::Reduce { reduce, left, len })
            }
            Action::Accept => Some(ParseAction::Accept),
        }
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        self.gotos.get(current, symbol)
    }
}

/// Two incompatible actions assigned to the same `(state, lookahead)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub kind: ConflictKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    ShiftReduce { shift: StateID, reduce: RuleID },
    ReduceReduce { first: RuleID, second: RuleID },
    ShiftAccept { shift: StateID },
}

impl Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        let rule = move |id: RuleID| {
            display_fn(move |f| match g.rule(id) {
                Some(rule) => write!(f, "reduce({})", rule.display(g)),
                None => write!(f, "reduce({})", id),
            })
        };
        display_fn(move |f| {
            let lookahead = g.symbol_name(SymbolID::T(self.lookahead));
            match self.kind {
                ConflictKind::ShiftReduce { shift, reduce } => write!(
                    f,
                    "shift/reduce conflict in state {} on `{}': shift({:02}) vs {}",
                    self.state,
                    lookahead,
                    shift,
                    rule(reduce)
                ),
                ConflictKind::ReduceReduce { first, second } => write!(
                    f,
                    "reduce/reduce conflict in state {} on `{}': {} vs {}",
                    self.state,
                    lookahead,
                    rule(first),
                    rule(second)
                ),
                ConflictKind::ShiftAccept { shift } => write!(
                    f,
                    "shift/accept conflict in state {} on `{}': shift({:02}) vs accept",
                    self.state, lookahead, shift
                ),
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TableError {
    #[error("{description}")]
    Conflict {
        conflict: Conflict,
        description: String,
    },

    #[error("goto conflict in state {state} on `{symbol}': goto({first:02}) vs goto({second:02})")]
    GotoConflict {
        state: StateID,
        symbol: String,
        first: StateID,
        second: StateID,
    },
}

impl TableError {
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Self::Conflict { conflict, .. } => Some(conflict),
            Self::GotoConflict { .. } => None,
        }
    }
}

fn conflict<T>(grammar: &Grammar, trace: &mut T, conflict: Conflict) -> TableError
where
    T: ?Sized + Trace,
{
    trace.event(TraceEvent::ConflictDetected {
        conflict: &conflict,
    });
    let description = conflict.display(grammar).to_string();
    TableError::Conflict {
        conflict,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Production, Symbol};

    fn expr() -> Grammar {
        Grammar::from_productions([
            Production::new("S'", [Symbol::n("E")]),
            Production::new("E", [Symbol::n("E"), Symbol::t("+"), Symbol::n("T")]),
            Production::new("E", [Symbol::n("T")]),
            Production::new("T", [Symbol::n("T"), Symbol::t("*"), Symbol::n("F")]),
            Production::new("T", [Symbol::n("F")]),
            Production::new("F", [Symbol::t("("), Symbol::n("E"), Symbol::t(")")]),
            Production::new("F", [Symbol::t("id")]),
        ])
        .unwrap()
    }

    #[test]
    fn expression_grammar_is_conflict_free() {
        let g = expr();
        let table = ParseTable::generate(&g).unwrap();
        eprintln!("{}", table.display(&g));

        let e = g.nonterminal_id("E").unwrap();
        let id = g.terminal_id("id").unwrap();
        let after_e = table.gotos().get(StateID::START, e).unwrap();
        assert_eq!(table.actions().get(after_e, TerminalID::EOI), Some(Action::Accept));
        assert!(matches!(
            table.actions().get(StateID::START, id),
            Some(Action::Shift(..))
        ));
        assert_eq!(table.actions().get(StateID::START, TerminalID::EOI), None);
    }

    #[test]
    fn generation_is_pure() {
        assert_eq!(
            ParseTable::generate(&expr()).unwrap(),
            ParseTable::generate(&expr()).unwrap()
        );
    }

    #[test]
    fn reduce_reduce_conflict() {
        // S := A x | B x ; A := a ; B := a
        let g = Grammar::from_productions([
            Production::new("S'", [Symbol::n("S")]),
            Production::new("S", [Symbol::n("A"), Symbol::t("x")]),
            Production::new("S", [Symbol::n("B"), Symbol::t("x")]),
            Production::new("A", [Symbol::t("a")]),
            Production::new("B", [Symbol::t("a")]),
        ])
        .unwrap();

        let err = ParseTable::generate(&g).unwrap_err();
        eprintln!("{}", err);
        let conflict = err.conflict().unwrap();
        assert_eq!(conflict.lookahead, g.terminal_id("x").unwrap());
        match conflict.kind {
            ConflictKind::ReduceReduce { first, second } => {
                let mut lefts = [
                    g.rule(first).unwrap().left(),
                    g.rule(second).unwrap().left(),
                ];
                lefts.sort();
                let mut expected = [
                    g.nonterminal_id("A").unwrap(),
                    g.nonterminal_id("B").unwrap(),
                ];
                expected.sort();
                assert_eq!(lefts, expected);
            }
            kind => panic!("unexpected conflict kind: {:?}", kind),
        }
        let message = err.to_string();
        assert!(message.contains("reduce(A := a)"), "{}", message);
        assert!(message.contains("reduce(B := a)"), "{}", message);
    }

    #[test]
    fn shift_reduce_conflict() {
        // E := E + E | id
        let g = Grammar::from_productions([
            Production::new("S'", [Symbol::n("E")]),
            Production::new("E", [Symbol::n("E"), Symbol::t("+"), Symbol::n("E")]),
            Production::new("E", [Symbol::t("id")]),
        ])
        .unwrap();

        let err = ParseTable::generate(&g).unwrap_err();
        let conflict = err.conflict().unwrap();
        assert_eq!(conflict.lookahead, g.terminal_id("+").unwrap());
        assert!(matches!(conflict.kind, ConflictKind::ShiftReduce { .. }));
    }

    #[test]
    fn accept_overrides_reduce() {
        // S := S | a ; the completed `S := S` shares its state with `S' := S`
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::N(s)])?;
            g.rule(s, [SymbolID::T(a)])?;
            Ok(())
        })
        .unwrap();

        #[derive(Default)]
        struct Overrides(Vec<(StateID, RuleID)>);
        impl Trace for Overrides {
            fn event(&mut self, event: TraceEvent<'_>) {
                if let TraceEvent::AcceptOverridesReduce { state, rule } = event {
                    self.0.push((state, rule));
                }
            }
        }

        let mut overrides = Overrides::default();
        let table = ParseTable::generate_with(&g, &mut overrides).unwrap();
        let s = g.nonterminal_id("S").unwrap();
        let after_s = table.gotos().get(StateID::START, s).unwrap();
        assert_eq!(table.actions().get(after_s, TerminalID::EOI), Some(Action::Accept));
        assert_eq!(overrides.0.len(), 1);
        assert_eq!(overrides.0[0].0, after_s);
    }
}
