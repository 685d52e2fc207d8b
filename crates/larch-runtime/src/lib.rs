//! Runtime implementation for the `larch` parser generator.
//!
//! The parser in this crate does not know how the tables were built; it only
//! consults them through [`ParseTable`](definition::ParseTable).

pub mod definition;
pub mod parser;

pub use crate::{
    definition::{ParseAction, ParseTable},
    parser::{ParseError, ParseEvent, ParseItem, Parser, Token},
};
