//! Lexer, parser and arithmetic evaluator for shell scripts.
//!
//! Source text is split into a lossless token stream by a mode-stack
//! lexer, then parsed into a [`SyntaxTree`] that keeps every token,
//! trivia included, and records problems as errors instead of stopping.
//! Arithmetic expressions are folded to constants while parsing.
//!
//! # Quick start
//!
//! ## Parse a script
//!
//! ```
//! use shellparse_rs::{NodeKind, parse_str};
//!
//! let input = "x[1+1]=5\necho $((6 & 3)) \"$x\"\n";
//! let tree = parse_str(input);
//! assert!(tree.is_ok());
//! assert_eq!(tree.text(), input);
//!
//! let index = tree.find(NodeKind::ArrayIndex).unwrap();
//! assert_eq!(index.value, Some(2));
//! let expansion = tree.find(NodeKind::ArithmeticExpansion).unwrap();
//! assert_eq!(expansion.value, Some(2));
//! ```
//!
//! ## Collect diagnostics
//!
//! ```
//! use shellparse_rs::{ParseErrorKind, parse_str};
//!
//! let tree = parse_str("a=(1 2");
//! assert_eq!(tree.errors.len(), 1);
//! assert_eq!(tree.errors[0].kind, ParseErrorKind::InvalidAssignmentList);
//! assert_eq!(tree.errors[0].message_key(), "parser.assignment.list.invalid");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools
)]

pub mod arithmetic;
pub mod builder;
pub mod config;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;

pub use arithmetic::{evaluate, parse_number};
pub use config::ParseOptions;
pub use formatter::{format_tokens, format_tree};
pub use lexer::{LexError, LexErrorKind, LexOutput, tokenize, tokenize_strict, tokenize_with};
pub use parser::{ParseError, ParseErrorKind, parse};
pub use token::{Position, Span, Token, TokenKind, TokenSet};
pub use tree::{Element, Node, NodeKind, SyntaxTree};

/// Unified error type covering both lexing and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

/// Parse with the default options.
#[must_use]
pub fn parse_str(input: &str) -> SyntaxTree {
    parse(input, &ParseOptions::default())
}

/// Parse with the default options, failing with the first recorded
/// error.
pub fn parse_strict(input: &str) -> Result<SyntaxTree, Error> {
    parse_strict_with(input, &ParseOptions::default())
}

/// Parse, failing with the first recorded error.
pub fn parse_strict_with(input: &str, options: &ParseOptions) -> Result<SyntaxTree, Error> {
    let lexed = tokenize_with(input, options);
    if let Some(first) = lexed.errors.first() {
        return Err(first.clone().into());
    }
    let mut tree = parser::parse_tokens(input, lexed, options);
    if tree.errors.is_empty() {
        Ok(tree)
    } else {
        Err(tree.errors.swap_remove(0).into())
    }
}
