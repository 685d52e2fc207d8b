//! A canonical LR(1) parse table generator.
//!
//! ```text
//! Grammar -> FirstSets -> Automaton -> ParseTable -> runtime::Parser
//! ```

pub mod first_sets;
pub mod grammar;
pub mod lr1;
pub mod parse_table;
pub mod trace;
pub mod types;

mod util;

pub use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, GrammarError, Production, Symbol},
    lr1::{Automaton, StateID},
    parse_table::{ParseTable, TableError},
    trace::{Trace, TraceEvent, TracingSink},
};
pub use larch_runtime as runtime;

use crate::grammar::{NonterminalID, SymbolID, TerminalID};
use larch_runtime::parser::{ParseItem, Parser};

pub type ParseError = larch_runtime::parser::ParseError<StateID, TerminalID, NonterminalID>;

/// Parse a sequence of terminals ending with `$`, returning the fully
/// reduced start symbol.
pub fn parse<I>(table: &ParseTable, terminals: I) -> Result<SymbolID, ParseError>
where
    I: IntoIterator<Item = TerminalID>,
{
    match Parser::new(table).parse(terminals)? {
        ParseItem::T(t) => Ok(SymbolID::T(t)),
        ParseItem::N(n) => Ok(SymbolID::N(n)),
    }
}
