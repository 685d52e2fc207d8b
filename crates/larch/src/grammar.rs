//! Grammar types.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::{borrow::Cow, fmt};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    /// Reserved symbol that stands for the empty string.
    ///
    /// It only ever shows up inside first sets, never in a production body.
    pub const EPSILON: Self = Self::from_raw(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// The left-hand side of the augmented production.
    pub const START: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Cow<'static, str>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An interned grammar symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented production `S' := Start`, always the first rule.
    pub const ACCEPT: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} :=", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                write!(f, " {}", g.terminals[&TerminalID::EPSILON])?;
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// A grammar symbol identified by its name, as supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Cow<'static, str>),
    Nonterminal(Cow<'static, str>),
}

impl Symbol {
    /// The end-of-input marker `$`.
    pub const EOI: Self = Self::Terminal(Cow::Borrowed("$"));

    /// The empty string `ε`.
    pub const EPSILON: Self = Self::Terminal(Cow::Borrowed("ε"));

    pub fn t(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Terminal(name.into())
    }

    pub fn n(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Nonterminal(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Terminal(name) | Self::Nonterminal(name) => name,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A production rule written with named symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub lhs: Cow<'static, str>,
    pub rhs: Vec<Symbol>,
}

impl Production {
    pub fn new<I>(lhs: impl Into<Cow<'static, str>>, rhs: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into_iter().collect(),
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :=", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// The grammar definition used to derive the parser tables.
///
/// The first rule is always the augmented production `S' := Start`.
#[derive(Debug)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if Some(nonterminal.id()) == self.root_symbol() {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Build a grammar from a list of productions whose first element is the
    /// augmented production `S' := Start`.
    pub fn from_productions<I>(productions: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = Production>,
    {
        let productions: Vec<Production> = productions.into_iter().collect();
        let (augmented, rest) = productions.split_first().ok_or(GrammarError::Empty)?;
        let root = match &augmented.rhs[..] {
            [Symbol::Nonterminal(root)] => root,
            _ => {
                return Err(GrammarError::MalformedAugmentedProduction {
                    production: augmented.to_string(),
                })
            }
        };

        Self::define(|g| {
            g.rename_start(augmented.lhs.clone())?;

            // Left-hand sides are declared first so that nonterminal IDs follow
            // the order of the productions.
            for production in rest {
                g.intern_nonterminal(&production.lhs)?;
            }
            let root = g.intern_nonterminal(root)?;
            g.start_symbol(root)?;

            for production in rest {
                let left = g.intern_nonterminal(&production.lhs)?;
                let mut right = Vec::with_capacity(production.rhs.len());
                for symbol in &production.rhs {
                    let symbol = match symbol {
                        Symbol::Terminal(name) => SymbolID::T(g.intern_terminal(name)?),
                        Symbol::Nonterminal(name) => SymbolID::N(g.intern_nonterminal(name)?),
                    };
                    right.push(symbol);
                }
                g.rule(left, right)?;
            }

            Ok(())
        })
    }

    /// Define a grammar using the specified function.
    ///
    /// The augmented production is synthesized from the start symbol.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: Cow::Borrowed("$"),
            },
        );
        def.terminals.insert(
            TerminalID::EPSILON,
            Terminal {
                id: TerminalID::EPSILON,
                name: Cow::Borrowed("ε"),
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: Cow::Borrowed("$start"),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &Terminal)> + '_ {
        self.terminals.iter().map(|(id, t)| (*id, t))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &Nonterminal)> + '_ {
        self.nonterminals.iter().map(|(id, n)| (*id, n))
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleID, &Rule)> + '_ {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    pub fn terminal(&self, id: TerminalID) -> Option<&Terminal> {
        self.terminals.get(&id)
    }

    pub fn nonterminal(&self, id: NonterminalID) -> Option<&Nonterminal> {
        self.nonterminals.get(&id)
    }

    pub fn rule(&self, id: RuleID) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Return the production rules whose left-hand side is `symbol`.
    pub fn rules_of(&self, symbol: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left == symbol)
    }

    /// Return the augmented start symbol, the left-hand side of the first rule.
    pub fn start_symbol(&self) -> NonterminalID {
        NonterminalID::START
    }

    /// Return the intended root nonterminal, derived by the augmented production.
    pub fn root_symbol(&self) -> Option<NonterminalID> {
        match self.rule(RuleID::ACCEPT)?.right() {
            [SymbolID::N(root)] => Some(*root),
            _ => None,
        }
    }

    /// The set of nonterminals that appear on the left-hand side of some rule.
    pub fn lhs_nonterminals(&self) -> Set<NonterminalID> {
        self.rules.values().map(|rule| rule.left).collect()
    }

    /// The set of terminals that appear in the right-hand side of some rule.
    pub fn rhs_terminals(&self) -> Set<TerminalID> {
        self.rules
            .values()
            .flat_map(|rule| rule.right.iter())
            .filter_map(|symbol| match symbol {
                SymbolID::T(t) => Some(*t),
                SymbolID::N(..) => None,
            })
            .collect()
    }

    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name() == name)
            .map(|t| t.id())
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    /// Translate a sequence of terminal names into their IDs.
    ///
    /// Unknown names are returned as the error value.
    pub fn terminal_ids<'a, I>(&self, names: I) -> Result<Vec<TerminalID>, &'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| self.terminal_id(name).ok_or(name))
            .collect()
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals.get(&t).map_or("<unknown>", |t| t.name()),
            SymbolID::N(n) => self.nonterminals.get(&n).map_or("<unknown>", |n| n.name()),
        }
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<TerminalID, GrammarError> {
        let name = name.into();
        self.verify_fresh_name(&name)?;

        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id = bump(self.next_terminal_id)?;
        self.terminals.insert(id, Terminal { id, name });

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<NonterminalID, GrammarError> {
        let name = name.into();
        self.verify_fresh_name(&name)?;

        let id = NonterminalID::from_raw(self.next_nonterminal_id);
        self.next_nonterminal_id = bump(self.next_nonterminal_id)?;
        self.nonterminals.insert(id, Nonterminal { id, name });

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// `ε` in the body is dropped; an empty body derives the empty string.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let mut right_ = vec![];
        for symbol in right {
            match symbol {
                SymbolID::T(TerminalID::EPSILON) => continue,
                SymbolID::T(TerminalID::EOI) => {
                    return Err(GrammarError::ReservedTerminal { name: "$".into() })
                }
                SymbolID::T(t) if !self.terminals.contains_key(&t) => {
                    return Err(GrammarError::UnknownSymbol {
                        symbol: SymbolID::T(t),
                    })
                }
                SymbolID::N(NonterminalID::START) => {
                    return Err(GrammarError::AugmentedSymbolReused {
                        name: self.nonterminals[&NonterminalID::START].name.to_string(),
                    })
                }
                SymbolID::N(n) if !self.nonterminals.contains_key(&n) => {
                    return Err(GrammarError::UnknownSymbol {
                        symbol: SymbolID::N(n),
                    })
                }
                symbol => right_.push(symbol),
            }
        }

        if left == NonterminalID::START {
            return Err(GrammarError::AugmentedSymbolReused {
                name: self.nonterminals[&NonterminalID::START].name.to_string(),
            });
        }
        if !self.nonterminals.contains_key(&left) {
            return Err(GrammarError::UnknownSymbol {
                symbol: SymbolID::N(left),
            });
        }

        for rule in self.rules.values() {
            if rule.left == left && rule.right == right_ {
                let mut production = self.nonterminals[&left].name.to_string();
                production.push_str(" :=");
                for symbol in &right_ {
                    production.push(' ');
                    production.push_str(self.symbol_name(*symbol));
                }
                return Err(GrammarError::DuplicateRule { production });
            }
        }

        let id = RuleID::from_raw(self.next_rule_id);
        self.next_rule_id = bump(self.next_rule_id)?;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right: right_,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarError::UnknownSymbol {
                symbol: SymbolID::N(symbol),
            });
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn rename_start(&mut self, name: Cow<'static, str>) -> Result<(), GrammarError> {
        self.verify_fresh_name(&name)?;
        if let Some(start) = self.nonterminals.get_mut(&NonterminalID::START) {
            start.name = name;
        }
        Ok(())
    }

    /// Look up a terminal by name, declaring it on its first appearance.
    fn intern_terminal(&mut self, name: &Cow<'static, str>) -> Result<TerminalID, GrammarError> {
        match &**name {
            "ε" => return Ok(TerminalID::EPSILON),
            "$" => return Err(GrammarError::ReservedTerminal { name: "$".into() }),
            _ => (),
        }
        match self.terminals.values().find(|t| t.name == *name) {
            Some(t) => Ok(t.id),
            None => self.terminal(name.clone()),
        }
    }

    /// Look up a nonterminal by name, declaring it on its first appearance.
    fn intern_nonterminal(
        &mut self,
        name: &Cow<'static, str>,
    ) -> Result<NonterminalID, GrammarError> {
        match self.nonterminals.values().find(|n| n.name == *name) {
            Some(n) if n.id == NonterminalID::START => Err(GrammarError::AugmentedSymbolReused {
                name: name.to_string(),
            }),
            Some(n) => Ok(n.id),
            None => self.nonterminal(name.clone()),
        }
    }

    fn verify_fresh_name(&self, name: &str) -> Result<(), GrammarError> {
        if name.is_empty() {
            return Err(GrammarError::EmptyName);
        }
        if matches!(name, "$" | "ε") {
            return Err(GrammarError::ReservedTerminal { name: name.into() });
        }
        let declared = self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name);
        if declared {
            return Err(GrammarError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => &self.terminals[&t].name,
            SymbolID::N(n) => &self.nonterminals[&n].name,
        }
    }

    fn end(self) -> Result<Grammar, GrammarError> {
        // 指定されていない場合は最初に登録されたnonterminal symbolを用いる
        let start = match self.start {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarError::NoStartSymbol)?,
        };

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
        })
    }
}

/// Advance an ID counter, failing once the raw IDs run out.
fn bump(next: u16) -> Result<u16, GrammarError> {
    next.checked_add(1).ok_or(GrammarError::TooManyIds)
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("the grammar has no productions")]
    Empty,

    #[error("the augmented production `{production}' must derive exactly one nonterminal")]
    MalformedAugmentedProduction { production: String },

    #[error("the augmented start symbol `{name}' must not appear in other productions")]
    AugmentedSymbolReused { name: String },

    #[error("the reserved terminal `{name}' cannot be declared or used in a production body")]
    ReservedTerminal { name: String },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("the symbol {symbol:?} is not declared in this grammar")]
    UnknownSymbol { symbol: SymbolID },

    #[error("duplicate production rule detected: `{production}'")]
    DuplicateRule { production: String },

    #[error("empty nonterminal symbols")]
    NoStartSymbol,

    #[error("the symbol name must not be empty")]
    EmptyName,

    #[error("too many symbols or rules to be numbered by 16-bit IDs")]
    TooManyIds,
}
