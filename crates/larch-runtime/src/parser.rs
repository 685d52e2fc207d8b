//! Parser.

use crate::definition::{ParseAction, ParseTable};

/// A trait for abstracting token symbols.
pub trait Token<TTerminal> {
    fn as_terminal(&self) -> TTerminal;
}

impl<T: Copy> Token<T> for T {
    #[inline]
    fn as_terminal(&self) -> T {
        *self
    }
}

/// The parser driven based on the generated parse table.
///
/// The stack is kept as two parallel stacks: the states, and the grammar
/// symbols between them. The state stack always holds one more entry.
#[derive(Debug)]
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TTok, TDef::Nonterminal>>,
    peeked_token: Option<TTok>,
    accepted: bool,
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            item_stack: vec![],
            peeked_token: None,
            accepted: false,
        }
    }

    /// The number of entries in the stack, counting both states and symbols.
    pub fn depth(&self) -> usize {
        self.state_stack.len() + self.item_stack.len()
    }

    /// Return the fully reduced symbol once the input has been accepted.
    pub fn accepted(&self) -> Option<&ParseItem<TTok, TDef::Nonterminal>> {
        if self.accepted {
            self.item_stack.last()
        } else {
            None
        }
    }

    /// Perform exactly one step of the state machine.
    ///
    /// A token is consumed from `tokens` only by a shift; a reduction keeps
    /// the current lookahead for the next step.
    #[allow(clippy::type_complexity)]
    pub fn next_event<I>(
        &mut self,
        tokens: &mut I,
    ) -> Result<
        ParseEvent<TDef::State, TDef::Terminal, TDef::Reduce>,
        ParseError<TDef::State, TDef::Terminal, TDef::Nonterminal>,
    >
    where
        I: Iterator<Item = TTok>,
    {
        if self.accepted {
            return Err(ParseError::AlreadyAccepted);
        }

        let current = *self.state_stack.last().ok_or(ParseError::EmptyStack)?;

        let token = match self.peeked_token.take().or_else(|| tokens.next()) {
            Some(token) => token,
            None => return Err(ParseError::UnexpectedEndOfInput { state: current }),
        };
        let lookahead = token.as_terminal();

        let action = match self.definition.action(current, lookahead) {
            Some(action) => action,
            None => {
                self.peeked_token = Some(token);
                tracing::debug!(state = ?current, ?lookahead, "no action");
                return Err(ParseError::UnexpectedToken {
                    state: current,
                    lookahead,
                    depth: self.depth(),
                });
            }
        };

        match action {
            ParseAction::Shift(next) => {
                self.item_stack.push(ParseItem::T(token));
                self.state_stack.push(next);
                tracing::trace!(state = ?current, ?lookahead, ?next, "shift");
                Ok(ParseEvent::Shift {
                    state: current,
                    lookahead,
                    next,
                })
            }

            ParseAction::Reduce { reduce, left, len } => {
                self.peeked_token = Some(token);
                if self.item_stack.len() < len {
                    return Err(ParseError::EmptyStack);
                }
                self.item_stack.truncate(self.item_stack.len() - len);
                self.state_stack.truncate(self.state_stack.len() - len);

                let exposed = *self.state_stack.last().ok_or(ParseError::EmptyStack)?;
                let goto = self
                    .definition
                    .goto(exposed, left)
                    .ok_or(ParseError::MissingGoto {
                        state: exposed,
                        symbol: left,
                    })?;
                self.item_stack.push(ParseItem::N(left));
                self.state_stack.push(goto);
                tracing::trace!(state = ?current, ?lookahead, ?reduce, ?goto, "reduce");

                Ok(ParseEvent::Reduce {
                    state: current,
                    lookahead,
                    reduce,
                    goto,
                })
            }

            ParseAction::Accept => {
                self.peeked_token = Some(token);
                if self.item_stack.is_empty() {
                    return Err(ParseError::EmptyStack);
                }
                self.accepted = true;
                tracing::trace!(state = ?current, ?lookahead, "accept");
                Ok(ParseEvent::Accept {
                    state: current,
                    lookahead,
                })
            }
        }
    }

    /// Drive the state machine until the input is accepted, returning the
    /// symbol left on top of the stack.
    #[allow(clippy::type_complexity)]
    pub fn parse<I>(
        mut self,
        tokens: I,
    ) -> Result<
        ParseItem<TTok, TDef::Nonterminal>,
        ParseError<TDef::State, TDef::Terminal, TDef::Nonterminal>,
    >
    where
        I: IntoIterator<Item = TTok>,
    {
        let mut tokens = tokens.into_iter();
        loop {
            if let ParseEvent::Accept { .. } = self.next_event(&mut tokens)? {
                return self.item_stack.pop().ok_or(ParseError::EmptyStack);
            }
        }
    }
}

/// A grammar symbol held in the parser stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseItem<TTok, TNonterminal> {
    T(TTok),
    N(TNonterminal),
}

/// A single step performed by the parser, with the `(state, lookahead)`
/// pair consulted to choose it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseEvent<TState, TTerminal, TReduce> {
    /// The lookahead was consumed and `next` pushed.
    Shift {
        state: TState,
        lookahead: TTerminal,
        next: TState,
    },

    /// A production was reduced and the parser moved to `goto`.
    /// The lookahead is still pending.
    Reduce {
        state: TState,
        lookahead: TTerminal,
        reduce: TReduce,
        goto: TState,
    },

    Accept {
        state: TState,
        lookahead: TTerminal,
    },
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError<TState, TTerminal, TNonterminal> {
    #[error("unexpected token {lookahead:?} in state {state} (stack depth: {depth})")]
    UnexpectedToken {
        state: TState,
        lookahead: TTerminal,
        depth: usize,
    },

    #[error("no goto entry for {symbol:?} in state {state}")]
    MissingGoto { state: TState, symbol: TNonterminal },

    #[error("the input ended before being accepted (state {state})")]
    UnexpectedEndOfInput { state: TState },

    #[error("empty stack")]
    EmptyStack,

    #[error("the input has already been accepted")]
    AlreadyAccepted,
}

impl<TState, TTerminal, TNonterminal> ParseError<TState, TTerminal, TNonterminal>
where
    TState: Copy,
{
    /// The state in which the parser stopped, if known.
    pub fn state(&self) -> Option<TState> {
        match self {
            Self::UnexpectedToken { state, .. }
            | Self::MissingGoto { state, .. }
            | Self::UnexpectedEndOfInput { state } => Some(*state),
            Self::EmptyStack | Self::AlreadyAccepted => None,
        }
    }
}
