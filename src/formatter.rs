//! Stable textual dumps of token streams and syntax trees.
//!
//! One element per line, children indented by two spaces:
//!
//! ```text
//! File@0..7
//!   SimpleCommand@0..7
//!     Word@0..4
//!       Word@0..4 "echo"
//!     Whitespace@4..5 " "
//! ```
//!
//! Nodes with a folded arithmetic value print it as `= value`. Recorded
//! errors follow the tree, one per line.

use std::fmt::Write as _;

use crate::token::Token;
use crate::tree::{Element, Node, SyntaxTree};

/// Dump a tree, its tokens and its errors.
#[must_use]
pub fn format_tree(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    format_node(&mut out, &tree.root, 0);
    for error in &tree.errors {
        let _ = writeln!(out, "error@{}: {error}", error.span);
    }
    out
}

/// Dump a token stream, one token per line.
#[must_use]
pub fn format_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        format_token(&mut out, token, 0);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn format_node(out: &mut String, node: &Node, depth: usize) {
    indent(out, depth);
    let _ = write!(out, "{}@{}", node.kind, node.span);
    if let Some(value) = node.value {
        let _ = write!(out, " = {value}");
    }
    out.push('\n');

    for child in &node.children {
        match child {
            Element::Node(child) => format_node(out, child, depth + 1),
            Element::Token(token) => format_token(out, token, depth + 1),
        }
    }
}

fn format_token(out: &mut String, token: &Token, depth: usize) {
    indent(out, depth);
    let _ = writeln!(out, "{:?}@{} {:?}", token.kind, token.span, token.text);
}
