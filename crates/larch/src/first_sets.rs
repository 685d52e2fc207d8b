//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::display_fn,
};
use std::fmt;

/// `First(X)` for every nonterminal `X` in a grammar.
///
/// A set contains `ε` iff the nonterminal can derive the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        // First(X) = {} と初期化する
        let mut first_sets = Self {
            map: grammar
                .nonterminals()
                .map(|(id, _)| (id, TerminalSet::default()))
                .collect(),
        };

        // 値が更新されなくなるまで繰り返す
        let mut passes = 1;
        while first_sets.saturate(grammar) {
            passes += 1;
        }
        tracing::trace!(passes, "first sets saturated");

        first_sets
    }

    /// Scan every production once, growing the sets of their left-hand sides.
    ///
    /// Returns `true` if any set grew.
    pub fn saturate(&mut self, grammar: &Grammar) -> bool {
        let mut changed = false;
        for (_, rule) in grammar.rules() {
            let added = self.first(rule.right(), None);
            let first = self.map.entry(rule.left()).or_default();
            if !added.is_subset(first) {
                first.union_with(&added);
                changed = true;
            }
        }
        changed
    }

    /// Return `First(symbol)`, or `None` if the symbol is not in the grammar.
    pub fn get(&self, symbol: NonterminalID) -> Option<&TerminalSet> {
        self.map.get(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.map.iter().map(|(id, first)| (*id, first))
    }

    /// `First(sequence lookahead)`
    ///
    /// When the whole sequence can vanish, the result contains `lookahead`,
    /// or `ε` if no lookahead is given. Otherwise it never contains `ε`.
    pub fn first(&self, sequence: &[SymbolID], lookahead: Option<TerminalID>) -> TerminalSet {
        let mut res = TerminalSet::default();
        for symbol in sequence {
            match symbol {
                SymbolID::T(t) => {
                    res.insert(*t);
                    return res;
                }
                SymbolID::N(n) => {
                    let first = match self.map.get(n) {
                        Some(first) => first,
                        None => return res,
                    };
                    res.union_with(first);
                    res.remove(TerminalID::EPSILON);
                    if !first.contains(TerminalID::EPSILON) {
                        return res;
                    }
                }
            }
        }

        res.insert(lookahead.unwrap_or(TerminalID::EPSILON));
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, first) in &self.map {
                write!(f, "{} => {{", g.symbol_name(SymbolID::N(*id)))?;
                for (i, t) in first.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(g.symbol_name(SymbolID::T(t)))?;
                }
                f.write_str("}\n")?;
            }
            Ok(())
        })
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

    // A := B C d ; B := b | ε ; C := c | ε
    fn nullable_chain() -> Grammar {
        Grammar::from_productions([
            Production::new("S'", [Symbol::n("A")]),
            Production::new("A", [Symbol::n("B"), Symbol::n("C"), Symbol::t("d")]),
            Production::new("B", [Symbol::t("b")]),
            Production::new("B", Vec::<Symbol>::new()),
            Production::new("C", [Symbol::t("c")]),
            Production::new("C", Vec::<Symbol>::new()),
        ])
        .unwrap()
    }

    fn set(g: &Grammar, names: &[&str]) -> TerminalSet {
        names
            .iter()
            .map(|name| g.terminal_id(name).unwrap())
            .collect()
    }

    #[test]
    fn expression_grammar() {
        let g = expr();
        let first_sets = FirstSets::new(&g);
        eprintln!("{}", first_sets.display(&g));

        let expected = set(&g, &["(", "id"]);
        for name in ["E", "T", "F"] {
            let n = g.nonterminal_id(name).unwrap();
            assert_eq!(first_sets.get(n), Some(&expected), "First({})", name);
        }
        assert_eq!(first_sets.get(g.start_symbol()), Some(&expected));
    }

    #[test]
    fn epsilon_threads_through_nullable_prefix() {
        let g = nullable_chain();
        let first_sets = FirstSets::new(&g);

        let a = g.nonterminal_id("A").unwrap();
        let b = g.nonterminal_id("B").unwrap();
        assert_eq!(first_sets.get(a), Some(&set(&g, &["b", "c", "d"])));
        assert_eq!(first_sets.get(b), Some(&set(&g, &["b", "ε"])));
    }

    #[test]
    fn first_of_suffix_with_lookahead() {
        let g = nullable_chain();
        let first_sets = FirstSets::new(&g);
        let b = SymbolID::N(g.nonterminal_id("B").unwrap());
        let c = SymbolID::N(g.nonterminal_id("C").unwrap());
        let d = SymbolID::T(g.terminal_id("d").unwrap());
        let x = g.terminal_id("$").unwrap();

        // empty sequence
        assert_eq!(first_sets.first(&[], Some(x)), set(&g, &["$"]));
        assert_eq!(first_sets.first(&[], None), set(&g, &["ε"]));

        // every symbol vanishes
        assert_eq!(first_sets.first(&[b, c], Some(x)), set(&g, &["b", "c", "$"]));
        assert_eq!(first_sets.first(&[b, c], None), set(&g, &["b", "c", "ε"]));

        // stops at the terminal
        assert_eq!(first_sets.first(&[b, d, c], Some(x)), set(&g, &["b", "d"]));
        assert_eq!(first_sets.first(&[d, b], None), set(&g, &["d"]));
    }

    #[test]
    fn deterministic_and_idempotent() {
        let g = expr();
        let mut first_sets = FirstSets::new(&g);
        assert_eq!(first_sets, FirstSets::new(&g));

        assert!(!first_sets.saturate(&g));
        assert_eq!(first_sets, FirstSets::new(&g));
    }
}
