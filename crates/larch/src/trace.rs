//! Observation of automaton and table construction.

use crate::{
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    lr1::{ItemSet, StateID},
    parse_table::Conflict,
};

/// An event emitted while the automaton and the parse table are built.
#[derive(Debug, Copy, Clone)]
#[non_exhaustive]
pub enum TraceEvent<'a> {
    /// A new LR(1) state was appended to the canonical collection.
    StateDiscovered { id: StateID, items: &'a ItemSet },

    TransitionRecorded {
        from: StateID,
        symbol: SymbolID,
        to: StateID,
    },

    ReduceRecorded {
        state: StateID,
        lookahead: TerminalID,
        rule: RuleID,
    },

    /// Table construction is about to fail with this conflict.
    ConflictDetected { conflict: &'a Conflict },

    /// The accept action replaced a reduction on the end of input.
    AcceptOverridesReduce { state: StateID, rule: RuleID },
}

/// A sink receiving construction events.
///
/// The builders never depend on what the sink does with them.
pub trait Trace {
    fn event(&mut self, event: TraceEvent<'_>);
}

impl Trace for () {
    #[inline]
    fn event(&mut self, _: TraceEvent<'_>) {}
}

impl<T: ?Sized + Trace> Trace for &mut T {
    fn event(&mut self, event: TraceEvent<'_>) {
        (**self).event(event)
    }
}

/// Forwards every event to `tracing`, rendering symbols by their names.
#[derive(Debug)]
pub struct TracingSink<'g> {
    grammar: &'g Grammar,
}

impl<'g> TracingSink<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }
}

impl Trace for TracingSink<'_> {
    fn event(&mut self, event: TraceEvent<'_>) {
        let g = self.grammar;
        match event {
            TraceEvent::StateDiscovered { id, items } => {
                tracing::debug!(state = %id, items = items.len(), "state discovered");
                for item in items {
                    tracing::trace!(state = %id, "{}", item.display(g));
                }
            }
            TraceEvent::TransitionRecorded { from, symbol, to } => {
                tracing::trace!(%from, %to, symbol = g.symbol_name(symbol), "transition");
            }
            TraceEvent::ReduceRecorded {
                state,
                lookahead,
                rule,
            } => match g.rule(rule) {
                Some(r) => tracing::trace!(
                    %state,
                    lookahead = g.symbol_name(SymbolID::T(lookahead)),
                    rule = %r.display(g),
                    "reduce"
                ),
                None => tracing::trace!(%state, %rule, "reduce"),
            },
            TraceEvent::ConflictDetected { conflict } => {
                tracing::warn!("{}", conflict.display(g));
            }
            TraceEvent::AcceptOverridesReduce { state, rule } => {
                tracing::debug!(%state, %rule, "accept takes precedence over reduce");
            }
        }
    }
}
