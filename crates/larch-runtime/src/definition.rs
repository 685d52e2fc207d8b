//! Parse table definition.

use std::fmt;

/// The trait for abstracting the generated LR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR(1) automaton.
    type State: Copy + fmt::Debug;

    /// The number to identify the terminal symbols, including the end of input.
    type Terminal: Copy + fmt::Debug;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy + fmt::Debug;

    /// The context value corresponding to the matched production rule.
    type Reduce: Copy + fmt::Debug;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// `None` means that the lookahead symbol is not acceptable in this state.
    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>>;

    /// Return the state to move after reducing to `symbol` in `current`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

macro_rules! impl_parse_table_for_pointer {
    ($($ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Reduce = T::Reduce;

            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            fn action(
                &self,
                current: Self::State,
                lookahead: Self::Terminal,
            ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
                (**self).action(current, lookahead)
            }

            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TNonterminal, TReduce> {
    Shift(TState),
    Reduce {
        reduce: TReduce,
        /// The left-hand side of the production rule.
        left: TNonterminal,
        /// The number of symbols in the right-hand side.
        len: usize,
    },
    Accept,
}
