//! Property-based tests with proptest.
//!
//! Arbitrary input must always lex and parse back to itself. Generated
//! scripts then check the here-document queue, the lexer mode stack and
//! arithmetic folding against deferred evaluation.

use proptest::prelude::*;
use shellparse_rs::lexer::{Lexer, Mode};
use shellparse_rs::{NodeKind, ParseOptions, TokenKind, evaluate, parse, parse_str, tokenize};

// -- Strategies --

/// Shell-heavy text, including unbalanced quotes and brackets.
fn shell_text() -> impl Strategy<Value = String> {
    "[a-z0-9 \t\n$(){}\\[\\]'\"`<>|&;=+*/%#!~^?:,@.\\\\-]{0,48}"
}

fn with_unicode() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => "[a-z$(){}\"' \n<>]".prop_map(|s| s),
            1 => Just("é".to_string()),
            1 => Just("✓".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

/// One here-document: (dedent, body lines).
fn heredoc() -> impl Strategy<Value = (bool, Vec<String>)> {
    (any::<bool>(), prop::collection::vec("[a-z][a-z ]{0,10}", 0..4))
}

/// Nested expansions and quotes; backquotes only appear as leaves.
fn nested_word() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("x".to_string()),
        Just("1".to_string()),
        Just("$v".to_string()),
        Just("`date`".to_string()),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| format!("$(echo {s})")),
            inner.clone().prop_map(|s| format!("\"a {s}\"")),
            inner.clone().prop_map(|s| format!("${{v:-{s}}}")),
            inner.prop_map(|s| format!("$(( 1 + $(echo {s}) ))")),
        ]
    })
}

/// Fully parenthesized arithmetic over small literals and one unknown
/// variable.
fn arith_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        4 => (0i64..20).prop_map(|n| n.to_string()),
        1 => Just("x".to_string()),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        let op = prop::sample::select(vec![
            "+", "-", "*", "/", "%", "**", "<<", ">>", "&", "|", "^", "<", "<=", "==", "!=", "&&",
            "||", ",",
        ]);
        prop_oneof![
            (inner.clone(), op, inner.clone()).prop_map(|(a, op, b)| format!("({a} {op} {b})")),
            (prop::sample::select(vec!["-", "!", "~"]), inner.clone())
                .prop_map(|(op, a)| format!("({op}{a})")),
            (inner.clone(), inner.clone(), inner)
                .prop_map(|(c, a, b)| format!("({c} ? {a} : {b})")),
        ]
    })
}

// -- Properties --

proptest! {
    #[test]
    fn tokens_cover_any_input(input in shell_text()) {
        let lexed = tokenize(&input);
        let text: String = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        prop_assert_eq!(text, input.clone());

        let mut offset = 0;
        for token in &lexed.tokens {
            prop_assert_eq!(token.span.start, offset);
            prop_assert!(token.span.end > token.span.start);
            offset = token.span.end;
        }
    }

    #[test]
    fn parsing_is_lossless(input in shell_text()) {
        let tree = parse_str(&input);
        prop_assert_eq!(tree.text(), input.clone());

        let posix = parse(&input, &ParseOptions::posix());
        prop_assert_eq!(posix.text(), input);
    }

    #[test]
    fn multibyte_input_is_lossless(input in with_unicode()) {
        let lexed = tokenize(&input);
        let text: String = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        prop_assert_eq!(&text, &input);
        prop_assert_eq!(parse_str(&input).text(), input);
    }

    #[test]
    fn heredoc_bodies_follow_declaration_order(
        docs in prop::collection::vec(heredoc(), 1..5)
    ) {
        let mut input = String::from("cat");
        for (i, (dedent, _)) in docs.iter().enumerate() {
            let op = if *dedent { "<<-" } else { "<<" };
            input.push_str(&format!(" {op}M{i}"));
        }
        input.push('\n');

        let mut expected = Vec::new();
        for (i, (dedent, lines)) in docs.iter().enumerate() {
            let indent = if *dedent { "\t" } else { "" };
            let mut body = String::new();
            for line in lines {
                body.push_str(&format!("{indent}{line}\n"));
            }
            body.push_str(&format!("{indent}M{i}"));
            input.push_str(&body);
            input.push('\n');
            expected.push(body);
        }

        let tree = parse_str(&input);
        prop_assert!(tree.is_ok(), "{:?}", tree.errors);
        prop_assert_eq!(tree.text(), input.clone());
        let bodies: Vec<_> = tree
            .find_all(NodeKind::HeredocBody)
            .into_iter()
            .map(|n| n.text())
            .collect();
        prop_assert_eq!(bodies, expected);

        let ends: Vec<_> = tokenize(&input)
            .tokens
            .into_iter()
            .filter(|t| t.kind == TokenKind::HeredocMarkerEnd)
            .map(|t| t.text.trim_start_matches('\t').to_string())
            .collect();
        let names: Vec<_> = (0..docs.len()).map(|i| format!("M{i}")).collect();
        prop_assert_eq!(ends, names);
    }

    #[test]
    fn nested_constructs_return_to_initial(word in nested_word()) {
        let input = format!("echo {word}");
        let mut lexer = Lexer::new(&input, &ParseOptions::default());
        let text: String = lexer.by_ref().map(|t| t.text).collect();
        prop_assert_eq!(&text, &input);
        prop_assert!(lexer.errors().is_empty(), "{:?}", lexer.errors());
        prop_assert_eq!(lexer.state().depth(), 1);
        prop_assert_eq!(lexer.state().current_mode(), Mode::Initial);
        prop_assert_eq!(parse_str(&input).text(), input);
    }

    #[test]
    fn folding_matches_evaluation(expr in arith_expr()) {
        let input = format!("echo $(( {expr} ))\n");
        let tree = parse_str(&input);
        prop_assert!(tree.is_ok(), "{:?}", tree.errors);
        for node in tree.root.descendants() {
            prop_assert_eq!(evaluate(node), node.value, "{:?} {:?}", node.kind, node.text());
        }
        let expansion = tree.find(NodeKind::ArithmeticExpansion);
        prop_assert!(expansion.is_some());
        if !expr.contains('x') {
            // only division by zero or a negative exponent leaves a
            // constant expression unfolded
            if expansion.and_then(|n| n.value).is_none() {
                prop_assert!(
                    expr.contains('/') || expr.contains('%') || expr.contains("**") || expr.contains('?'),
                    "{}", expr
                );
            }
        }
    }
}
