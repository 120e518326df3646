#![allow(dead_code)]

use shellparse_rs::{NodeKind, ParseErrorKind, SyntaxTree, TokenKind, parse_str, tokenize};

/// Parse `input`, asserting it is error-free and lossless.
pub fn parse_ok(input: &str) -> SyntaxTree {
    let tree = parse_str(input);
    assert!(
        tree.is_ok(),
        "unexpected errors in {input:?}:\n{:#?}",
        tree.errors
    );
    assert_lossless(&tree, input);
    tree
}

pub fn assert_lossless(tree: &SyntaxTree, input: &str) {
    let text = tree.text();
    assert_eq!(
        text, input,
        "tree text mismatch:\n--- expected ---\n{input}\n--- got ---\n{text}"
    );
}

/// Kinds of the significant tokens of `input`.
pub fn token_kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .tokens
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect()
}

pub fn error_kinds(input: &str) -> Vec<ParseErrorKind> {
    parse_str(input).errors.into_iter().map(|e| e.kind).collect()
}

/// Texts of every node of `kind`, in source order.
pub fn texts(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
    tree.find_all(kind).into_iter().map(|n| n.text()).collect()
}

pub fn values(tree: &SyntaxTree, kind: NodeKind) -> Vec<Option<i64>> {
    tree.find_all(kind).into_iter().map(|n| n.value).collect()
}

/// Folded value of the first `$(( ))` in `echo $((body))`.
pub fn expansion_value(body: &str) -> Option<i64> {
    let tree = parse_ok(&format!("echo $(({body}))"));
    tree.find(NodeKind::ArithmeticExpansion)
        .expect("arithmetic expansion")
        .value
}
