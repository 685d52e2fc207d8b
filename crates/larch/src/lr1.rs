//! The implementation of canonical LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    trace::{Trace, TraceEvent},
    types::{Map, Set},
    util::display_fn,
};
use std::{
    collections::{btree_set, BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: usize,
}

impl StateID {
    pub const START: Self = Self::from_raw(0);

    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> usize {
        self.raw
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// LR(1) item.
///
/// `X: Y1 Y2 ... Yn` という構文規則にマーカ位置と先読み記号を付与したもの。
/// Items that differ only in their lookahead are distinct.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    /// grammer内におけるruleの識別子
    pub rule: RuleID,
    /// marker位置
    pub marker: usize,
    pub lookahead: TerminalID,
}

impl Item {
    pub const fn new(rule: RuleID, marker: usize, lookahead: TerminalID) -> Self {
        Self {
            rule,
            marker,
            lookahead,
        }
    }

    /// Return the symbol right after the marker, or `None` if the marker is
    /// at the end of the production.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule)?.right().get(self.marker).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        g.rule(self.rule)
            .map_or(false, |rule| self.marker >= rule.right().len())
    }

    fn advance(self) -> Self {
        Self {
            marker: self.marker + 1,
            ..self
        }
    }

    // `"(LHS := R1 . R2, a)"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = match g.rule(self.rule) {
                Some(rule) => rule,
                None => return write!(f, "(<unknown rule {}>)", self.rule),
            };
            write!(f, "({} :=", g.symbol_name(SymbolID::N(rule.left())))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ", {})", g.symbol_name(SymbolID::T(self.lookahead)))
        })
    }
}

/// A set of LR(1) items; equality does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: BTreeSet<Item>,
}

impl ItemSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Item> {
        self.items.iter()
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = btree_set::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Expand the kernel items into their closure.
///
/// For each `[X -> ... @ Y beta, a]`, the items `[Y -> @ gamma, b]` are added
/// for every `b` in `First(beta a)`, until no more items appear.
pub fn closure<I>(kernel: I, grammar: &Grammar, first_sets: &FirstSets) -> ItemSet
where
    I: IntoIterator<Item = Item>,
{
    let mut items = BTreeSet::new();
    let mut pending = VecDeque::new();
    for item in kernel {
        if items.insert(item) {
            pending.push_back(item);
        }
    }

    while let Some(item) = pending.pop_front() {
        let rule = match grammar.rule(item.rule) {
            Some(rule) => rule,
            None => continue,
        };

        // [X -> ... @ Y beta]
        //  Y: one nonterminal symbol
        let (y_symbol, beta) = match rule.right().get(item.marker..) {
            Some([SymbolID::N(y_symbol), beta @ ..]) => (*y_symbol, beta),
            _ => continue,
        };

        let lookaheads = first_sets.first(beta, Some(item.lookahead));
        for rule in grammar.rules_of(y_symbol) {
            for lookahead in lookaheads.iter() {
                let new_item = Item::new(rule.id(), 0, lookahead);
                if items.insert(new_item) {
                    pending.push_back(new_item);
                }
            }
        }
    }

    ItemSet { items }
}

/// The item set reached from `state` by moving the marker over `symbol`.
///
/// The result is empty if no item in `state` expects `symbol`.
pub fn goto(
    state: &ItemSet,
    symbol: SymbolID,
    grammar: &Grammar,
    first_sets: &FirstSets,
) -> ItemSet {
    let kernel = state
        .iter()
        .filter(|item| item.next_symbol(grammar) == Some(symbol))
        .map(|item| item.advance());
    closure(kernel, grammar, first_sets)
}

/// A completed item `[X -> ... @, a]` found in a state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reduce {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub rule: RuleID,
}

/// The canonical collection of LR(1) item sets, with its transitions and reductions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    // the index of each item set is its state ID
    states: Set<ItemSet>,
    transitions: Map<(StateID, SymbolID), StateID>,
    reduces: Set<Reduce>,
}

impl Automaton {
    pub fn build(grammar: &Grammar) -> Self {
        Self::build_with(grammar, &FirstSets::new(grammar), &mut ())
    }

    pub fn build_with<T>(grammar: &Grammar, first_sets: &FirstSets, trace: &mut T) -> Self
    where
        T: ?Sized + Trace,
    {
        let _span = tracing::debug_span!("build_automaton").entered();

        let start = closure(
            Some(Item::new(RuleID::ACCEPT, 0, TerminalID::EOI)),
            grammar,
            first_sets,
        );
        let mut states = Set::default();
        states.insert(start);
        if let Some(items) = states.get_index(0) {
            trace.event(TraceEvent::StateDiscovered {
                id: StateID::START,
                items,
            });
        }

        let mut transitions = Map::default();
        let mut reduces = Set::default();

        // 新規に状態が生成されなくなるまで繰り返す
        let mut current = 0;
        while let Some(state) = states.get_index(current) {
            let id = StateID::from_raw(current);

            let mut labels = Set::default();
            for item in state {
                match item.next_symbol(grammar) {
                    Some(symbol) => {
                        labels.insert(symbol);
                    }
                    None => {
                        let reduce = Reduce {
                            state: id,
                            lookahead: item.lookahead,
                            rule: item.rule,
                        };
                        if reduces.insert(reduce) {
                            trace.event(TraceEvent::ReduceRecorded {
                                state: id,
                                lookahead: item.lookahead,
                                rule: item.rule,
                            });
                        }
                    }
                }
            }

            let targets: Vec<_> = labels
                .into_iter()
                .map(|symbol| (symbol, goto(state, symbol, grammar, first_sets)))
                .collect();

            for (symbol, target) in targets {
                let (index, inserted) = states.insert_full(target);
                let to = StateID::from_raw(index);
                if inserted {
                    if let Some(items) = states.get_index(index) {
                        trace.event(TraceEvent::StateDiscovered { id: to, items });
                    }
                }
                transitions.insert((id, symbol), to);
                trace.event(TraceEvent::TransitionRecorded {
                    from: id,
                    symbol,
                    to,
                });
            }

            current += 1;
        }

        tracing::debug!(
            states = states.len(),
            transitions = transitions.len(),
            reduces = reduces.len(),
            "LR(1) automaton built"
        );

        Self {
            states,
            transitions,
            reduces,
        }
    }

    /// The number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ItemSet)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, items)| (StateID::from_raw(i), items))
    }

    pub fn state(&self, id: StateID) -> Option<&ItemSet> {
        self.states.get_index(id.into_raw())
    }

    /// Look up the state holding exactly the given item set.
    pub fn find(&self, items: &ItemSet) -> Option<StateID> {
        self.states.get_index_of(items).map(StateID::from_raw)
    }

    pub fn transitions(&self) -> impl Iterator<Item = (StateID, SymbolID, StateID)> + '_ {
        self.transitions
            .iter()
            .map(|(&(from, symbol), &to)| (from, symbol, to))
    }

    pub fn transition(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&(from, symbol)).copied()
    }

    pub fn reduces(&self) -> impl Iterator<Item = &Reduce> + '_ {
        self.reduces.iter()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## states")?;
            for (id, items) in self.states() {
                writeln!(f, "#### State {:02}", id)?;
                for item in items {
                    writeln!(f, "- {}", item.display(g))?;
                }
            }

            writeln!(f, "\n## transitions")?;
            for (from, symbol, to) in self.transitions() {
                writeln!(f, "- {:02} & {} => {:02}", from, g.symbol_name(symbol), to)?;
            }

            writeln!(f, "\n## reduces")?;
            for reduce in self.reduces() {
                match g.rule(reduce.rule) {
                    Some(rule) => writeln!(
                        f,
                        "- {:02} & {} => {}",
                        reduce.state,
                        g.symbol_name(SymbolID::T(reduce.lookahead)),
                        rule.display(g)
                    )?,
                    None => writeln!(f, "- {:02} & <unknown rule {}>", reduce.state, reduce.rule)?,
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Production, Symbol};

    fn cc() -> Grammar {
        Grammar::from_productions([
            Production::new("S'", [Symbol::n("S")]),
            Production::new("S", [Symbol::n("C"), Symbol::n("C")]),
            Production::new("C", [Symbol::t("c"), Symbol::n("C")]),
            Production::new("C", [Symbol::t("d")]),
        ])
        .unwrap()
    }

    #[test]
    fn start_state_closure() {
        let g = cc();
        let first_sets = FirstSets::new(&g);
        let start = closure(
            Some(Item::new(RuleID::ACCEPT, 0, TerminalID::EOI)),
            &g,
            &first_sets,
        );
        let rendered: Vec<_> = start.iter().map(|item| item.display(&g).to_string()).collect();
        eprintln!("{:#?}", rendered);

        // [S' -> @S, $], [S -> @C C, $], [C -> @c C, c/d], [C -> @d, c/d]
        assert_eq!(start.len(), 6);
        assert!(rendered.contains(&"(S' := . S, $)".to_owned()));
        assert!(rendered.contains(&"(S := . C C, $)".to_owned()));
        assert!(rendered.contains(&"(C := . c C, c)".to_owned()));
        assert!(rendered.contains(&"(C := . d, d)".to_owned()));
    }

    #[test]
    fn closure_is_idempotent() {
        let g = cc();
        let first_sets = FirstSets::new(&g);
        let automaton = Automaton::build(&g);
        for (_, state) in automaton.states() {
            let again = closure(state.iter().copied(), &g, &first_sets);
            assert_eq!(&again, state);
        }
    }

    #[test]
    fn goto_without_matching_items_is_empty() {
        let g = cc();
        let first_sets = FirstSets::new(&g);
        let start = closure(
            Some(Item::new(RuleID::ACCEPT, 0, TerminalID::EOI)),
            &g,
            &first_sets,
        );
        let eoi = SymbolID::T(TerminalID::EOI);
        assert!(goto(&start, eoi, &g, &first_sets).is_empty());
    }

    #[test]
    fn canonical_collection_of_cc() {
        let g = cc();
        let automaton = Automaton::build(&g);
        eprintln!("{}", automaton.display(&g));

        // the classic example yields ten canonical LR(1) states
        assert_eq!(automaton.len(), 10);

        // `C -> d @` appears twice, once with lookaheads c/d and once with $
        let c = SymbolID::T(g.terminal_id("c").unwrap());
        let d = SymbolID::T(g.terminal_id("d").unwrap());
        let s = SymbolID::N(g.nonterminal_id("S").unwrap());
        let from_start = automaton.transition(StateID::START, d).unwrap();
        let after_s = automaton.transition(StateID::START, s).unwrap();
        assert_ne!(from_start, after_s);

        let c_state = automaton.transition(StateID::START, c).unwrap();
        assert_eq!(automaton.transition(c_state, c), Some(c_state));
        assert_eq!(automaton.transition(c_state, d), Some(from_start));

        let accepting = automaton
            .reduces()
            .filter(|r| r.rule == RuleID::ACCEPT)
            .collect::<Vec<_>>();
        assert_eq!(accepting.len(), 1);
        assert_eq!(accepting[0].state, after_s);
        assert_eq!(accepting[0].lookahead, TerminalID::EOI);
    }

    #[test]
    fn build_is_deterministic() {
        let g = cc();
        assert_eq!(Automaton::build(&g), Automaton::build(&g));
    }

    #[test]
    fn transitions_lead_to_goto_states() {
        let g = cc();
        let first_sets = FirstSets::new(&g);
        let automaton = Automaton::build_with(&g, &first_sets, &mut ());

        let start = automaton.state(StateID::START).unwrap();
        assert!(start.contains(&Item::new(RuleID::ACCEPT, 0, TerminalID::EOI)));
        assert_eq!(automaton.find(start), Some(StateID::START));

        for (from, symbol, to) in automaton.transitions() {
            let items = goto(automaton.state(from).unwrap(), symbol, &g, &first_sets);
            assert_eq!(automaton.find(&items), Some(to));
            for item in &items {
                assert!(automaton.state(to).unwrap().contains(item));
            }
        }

        let missing = goto(start, SymbolID::T(TerminalID::EOI), &g, &first_sets);
        assert_eq!(automaton.find(&missing), None);
    }
}
