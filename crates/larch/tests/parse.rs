use larch::{
    grammar::{Grammar, Production, Symbol, SymbolID, TerminalID},
    runtime::{ParseEvent, Parser},
    ParseError, ParseTable, StateID,
};

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

fn cc() -> Grammar {
    Grammar::from_productions([
        Production::new("S'", [Symbol::n("S")]),
        Production::new("S", [Symbol::n("C"), Symbol::n("C")]),
        Production::new("C", [Symbol::t("c"), Symbol::n("C")]),
        Production::new("C", [Symbol::t("d")]),
    ])
    .unwrap()
}

fn input(g: &Grammar, source: &str) -> Vec<TerminalID> {
    g.terminal_ids(source.split_whitespace()).unwrap()
}

macro_rules! define_accept_tests {
    ($($name:ident: $grammar:ident, $input:expr, $root:expr;)*) => {$(
        #[test]
        fn $name() {
            let g = $grammar();
            let table = ParseTable::generate(&g).unwrap();
            let result = larch::parse(&table, input(&g, $input)).unwrap();
            assert_eq!(result, SymbolID::N(g.nonterminal_id($root).unwrap()));
        }
    )*};
}

define_accept_tests! {
    expr_sum_of_products: expr, "id * id + id $", "E";
    expr_parenthesized: expr, "( id + id ) * id $", "E";
    expr_single_id: expr, "id $", "E";
    cc_split: cc, "c d d $", "S";
    cc_shortest: cc, "d d $", "S";
    cc_long: cc, "c c c d c d $", "S";
}

#[test]
fn malformed_input_leaves_table_untouched() {
    let g = expr();
    let table = ParseTable::generate(&g).unwrap();
    let before = table.clone();

    let err = larch::parse(&table, input(&g, "id + * id $")).unwrap_err();
    match err {
        ParseError::UnexpectedToken {
            state,
            lookahead,
            depth,
        } => {
            assert_eq!(lookahead, g.terminal_id("*").unwrap());
            assert!(!table.expected_terminals(state).contains(&lookahead));
            // [0 E s +  s']
            assert_eq!(depth, 5);
        }
        err => panic!("unexpected error: {}", err),
    }
    assert_eq!(table, before);

    // the same table still accepts a correct input
    larch::parse(&table, input(&g, "id + id $")).unwrap();
}

#[test]
fn missing_end_of_input() {
    let g = cc();
    let table = ParseTable::generate(&g).unwrap();
    let err = larch::parse(&table, input(&g, "c d d")).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEndOfInput { .. }));
}

#[test]
fn reduce_does_not_advance_input() {
    let g = expr();
    let table = ParseTable::generate(&g).unwrap();
    let tokens = input(&g, "id * id + id $");

    let mut parser = Parser::new(&table);
    let mut iter = tokens.iter().copied();
    let mut events = vec![];
    loop {
        let event = parser.next_event(&mut iter).unwrap();
        events.push(event);
        if let ParseEvent::Accept { .. } = event {
            break;
        }
    }

    let consulted = |event: &ParseEvent<StateID, TerminalID, _>| match *event {
        ParseEvent::Shift {
            state, lookahead, ..
        }
        | ParseEvent::Reduce {
            state, lookahead, ..
        }
        | ParseEvent::Accept { state, lookahead } => (state, lookahead),
    };

    // every shift consumes exactly one terminal, in order.
    let shifted: Vec<TerminalID> = events
        .iter()
        .filter_map(|event| match event {
            ParseEvent::Shift { lookahead, .. } => Some(*lookahead),
            _ => None,
        })
        .collect();
    assert_eq!(shifted, tokens[..tokens.len() - 1]);

    for pair in events.windows(2) {
        let (state1, lookahead1) = consulted(&pair[0]);
        let (state2, lookahead2) = consulted(&pair[1]);
        match pair[0] {
            ParseEvent::Reduce { goto, .. } => {
                assert_eq!(lookahead1, lookahead2);
                assert_eq!(goto, state2);
            }
            ParseEvent::Shift { next, .. } => {
                assert_eq!(next, state2);
            }
            ParseEvent::Accept { .. } => unreachable!(),
        }
        if lookahead1 == lookahead2 && state1 != state2 {
            assert!(matches!(pair[0], ParseEvent::Reduce { .. }));
        }
    }
}
