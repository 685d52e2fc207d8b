//! Built-in grammars.

use larch::grammar::{Grammar, GrammarError, Production, Symbol, SymbolID};

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum BuiltinGrammar {
    /// E := E + T | T ; T := T * F | F ; F := ( E ) | id
    Expr,
    /// S := C C ; C := c C | d
    Cc,
    /// SheepNoise := baa SheepNoise | baa
    Sheep,
}

impl BuiltinGrammar {
    pub fn load(self) -> Result<Grammar, GrammarError> {
        match self {
            Self::Expr => expr(),
            Self::Cc => cc(),
            Self::Sheep => sheep(),
        }
    }
}

fn expr() -> Result<Grammar, GrammarError> {
    Grammar::from_productions([
        Production::new("S'", [Symbol::n("E")]),
        Production::new("E", [Symbol::n("E"), Symbol::t("+"), Symbol::n("T")]),
        Production::new("E", [Symbol::n("T")]),
        Production::new("T", [Symbol::n("T"), Symbol::t("*"), Symbol::n("F")]),
        Production::new("T", [Symbol::n("F")]),
        Production::new("F", [Symbol::t("("), Symbol::n("E"), Symbol::t(")")]),
        Production::new("F", [Symbol::t("id")]),
    ])
}

fn cc() -> Result<Grammar, GrammarError> {
    Grammar::from_productions([
        Production::new("S'", [Symbol::n("S")]),
        Production::new("S", [Symbol::n("C"), Symbol::n("C")]),
        Production::new("C", [Symbol::t("c"), Symbol::n("C")]),
        Production::new("C", [Symbol::t("d")]),
    ])
}

fn sheep() -> Result<Grammar, GrammarError> {
    Grammar::define(|g| {
        let baa = g.terminal("baa")?;
        let noise = g.nonterminal("SheepNoise")?;
        g.start_symbol(noise)?;
        g.rule(noise, [SymbolID::T(baa), SymbolID::N(noise)])?;
        g.rule(noise, [SymbolID::T(baa)])?;
        Ok(())
    })
}
