mod grammars;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use grammars::BuiltinGrammar;
use larch::{grammar::SymbolID, Automaton, FirstSets, ParseTable, TracingSink};
use tracing_subscriber::EnvFilter;

const EOI: &str = "$";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the grammar and its LR(1) parse table.
    Table {
        grammar: BuiltinGrammar,

        /// Also print the FIRST sets.
        #[arg(long)]
        first: bool,

        /// Also print the canonical collection of LR(1) states.
        #[arg(long)]
        automaton: bool,
    },

    /// Parse a sequence of terminal names.
    Parse {
        grammar: BuiltinGrammar,

        /// The terminals to be parsed. `$` is appended when missing.
        #[arg(required = true)]
        terminals: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    match args.command {
        Command::Table {
            grammar,
            first,
            automaton,
        } => {
            let grammar = grammar.load().context("failed to load the grammar")?;
            print!("{}", grammar);

            let first_sets = FirstSets::new(&grammar);
            if first {
                println!("\n## first sets");
                print!("{}", first_sets.display(&grammar));
            }

            let mut sink = TracingSink::new(&grammar);
            let lr1 = Automaton::build_with(&grammar, &first_sets, &mut sink);
            if automaton {
                println!();
                print!("{}", lr1.display(&grammar));
            }

            let table = ParseTable::from_automaton(&grammar, &lr1, &mut sink)
                .context("failed to build the parse table")?;
            println!();
            print!("{}", table.display(&grammar));
        }

        Command::Parse { grammar, terminals } => {
            let grammar = grammar.load().context("failed to load the grammar")?;
            let table = ParseTable::generate_with(&grammar, &mut TracingSink::new(&grammar))
                .context("failed to build the parse table")?;

            let mut names: Vec<&str> = terminals.iter().map(String::as_str).collect();
            if names.last() != Some(&EOI) {
                names.push(EOI);
            }
            let input = grammar
                .terminal_ids(names.iter().copied())
                .map_err(|name| anyhow::anyhow!("unknown terminal: `{}'", name))?;

            match larch::parse(&table, input) {
                Ok(symbol) => println!("accepted: {}", grammar.symbol_name(symbol)),
                Err(err) => {
                    let expected: Vec<&str> = err
                        .state()
                        .map(|state| table.expected_terminals(state))
                        .unwrap_or_default()
                        .into_iter()
                        .map(|t| grammar.symbol_name(SymbolID::T(t)))
                        .collect();
                    return Err(err).with_context(|| {
                        format!("failed to parse the input (expected one of {:?})", expected)
                    });
                }
            }
        }
    }

    Ok(())
}
