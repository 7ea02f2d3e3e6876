//! Syntax layer for boxql.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization
//! - `ast`: Abstract syntax tree types for executable documents and SDL
//! - `parser`: Recursive descent parser
//! - `printer`: GraphQL literal printing

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::{parse, ParseResult};
pub use printer::{print_type, print_value};
pub use token::{DirectiveLocation, Token, TokenKind};
