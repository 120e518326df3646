mod common;

use common::{error_kinds, parse_ok, texts};
use pretty_assertions::assert_eq;
use shellparse_rs::{
    Error, LexErrorKind, NodeKind, ParseErrorKind, ParseOptions, parse, parse_str, parse_strict,
    parse_strict_with,
};

// -----------------------------------------------------------------------
// Lists and pipelines
// -----------------------------------------------------------------------

#[test]
fn timed_and_negated_pipelines() {
    let tree = parse_ok("time -p ! grep x file | wc -l\n");
    let pipeline = tree.find(NodeKind::Pipeline).expect("pipeline");
    assert_eq!(
        pipeline
            .child_nodes()
            .filter(|n| n.kind == NodeKind::SimpleCommand)
            .count(),
        2
    );
}

#[test]
fn background_and_separators() {
    let tree = parse_ok("a & b; c\n\nd");
    assert_eq!(tree.root.child_nodes().count(), 4);
}

#[test]
fn operator_continues_after_newline() {
    let tree = parse_ok("a &&\n  b ||\n  c |\n  d\n");
    assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 4);
}

#[test]
fn dangling_operator() {
    assert_eq!(error_kinds("a &&"), vec![ParseErrorKind::ExpectedCommand]);
    assert_eq!(error_kinds("a |"), vec![ParseErrorKind::ExpectedCommand]);
}

// -----------------------------------------------------------------------
// Words and expansions
// -----------------------------------------------------------------------

#[test]
fn adjacent_parts_form_one_word() {
    let tree = parse_ok("echo pre\"$x\"'lit'${y}post$(date)\n");
    let command = tree.find(NodeKind::SimpleCommand).expect("command");
    let words: Vec<_> = command.child_nodes().map(|n| n.text()).collect();
    assert_eq!(words, vec!["echo", "pre\"$x\"'lit'${y}post$(date)"]);
}

#[test]
fn expansion_nodes() {
    let tree = parse_ok("echo ${#arr[@]} $(ls -l) `pwd` $((1 + 1)) $[2 * 2] <(sort a) \"$HOME\"");
    for kind in [
        NodeKind::ParamExpansion,
        NodeKind::CommandSubstitution,
        NodeKind::BackquoteCommand,
        NodeKind::ProcessSubstitution,
        NodeKind::String,
        NodeKind::Variable,
    ] {
        assert!(tree.find(kind).is_some(), "missing {kind}");
    }
    let values: Vec<_> = tree
        .find_all(NodeKind::ArithmeticExpansion)
        .iter()
        .map(|n| n.value)
        .collect();
    assert_eq!(values, vec![Some(2), Some(4)]);
}

#[test]
fn nested_substitutions() {
    let tree = parse_ok("x=$(echo \"$(basename `pwd`)\")");
    assert_eq!(tree.find_all(NodeKind::CommandSubstitution).len(), 2);
    assert!(tree.find(NodeKind::BackquoteCommand).is_some());
}

// -----------------------------------------------------------------------
// Redirects and here-documents
// -----------------------------------------------------------------------

#[test]
fn redirect_targets() {
    let tree = parse_ok("cmd <<<\"$v\" &>all 2>>err\n");
    assert_eq!(
        texts(&tree, NodeKind::Redirect),
        vec!["<<<\"$v\"", "&>all", "2>>err"]
    );
}

#[test]
fn heredoc_in_a_pipeline() {
    let input = "cat <<EOF | grep a\nabc $(echo x)\nEOF\necho next\n";
    let tree = parse_ok(input);
    let bodies = tree.find_all(NodeKind::HeredocBody);
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].find(NodeKind::CommandSubstitution).is_some());
    assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 4);
}

#[test]
fn quoted_heredoc_has_no_expansions() {
    let tree = parse_ok("cat <<'EOF'\n$(echo x) $y\nEOF\n");
    let body = tree.find(NodeKind::HeredocBody).expect("body");
    assert!(body.find(NodeKind::CommandSubstitution).is_none());
    assert!(body.find(NodeKind::Variable).is_none());
}

#[test]
fn missing_redirect_target() {
    assert_eq!(
        error_kinds("echo > ; ls"),
        vec![ParseErrorKind::ExpectedRedirectTarget]
    );
}

#[test]
fn unterminated_heredoc_is_a_tree_error() {
    let tree = parse_str("cat <<EOF\nbody\n");
    assert_eq!(tree.errors.len(), 1);
    assert_eq!(
        tree.errors[0].kind,
        ParseErrorKind::Lexical(LexErrorKind::UnterminatedHeredoc {
            marker: "EOF".to_string()
        })
    );
    assert_eq!(tree.text(), "cat <<EOF\nbody\n");
}

// -----------------------------------------------------------------------
// Dialects
// -----------------------------------------------------------------------

#[test]
fn coproc_needs_the_extended_dialect() {
    let extended = parse("coproc cat", &ParseOptions::default());
    assert!(extended.find(NodeKind::Coproc).is_some());

    let posix = parse("coproc cat", &ParseOptions::posix());
    assert!(posix.is_ok());
    assert!(posix.find(NodeKind::Coproc).is_none());
    assert_eq!(posix.find_all(NodeKind::Word).len(), 2);
}

#[test]
fn pipe_amp_is_two_operators_in_posix_mode() {
    assert!(parse("a |& b", &ParseOptions::default()).is_ok());
    let tree = parse("a |& b", &ParseOptions::posix());
    let kinds: Vec<_> = tree.errors.iter().map(|e| e.kind.clone()).collect();
    assert_eq!(kinds, vec![ParseErrorKind::ExpectedCommand]);
    assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 2);
}

// -----------------------------------------------------------------------
// Recovery
// -----------------------------------------------------------------------

#[test]
fn parsing_continues_after_errors() {
    let input = "echo a\nfi\necho b )\nif x; then y; fi\n";
    let tree = parse_str(input);
    assert_eq!(tree.text(), input);
    assert_eq!(tree.errors.len(), 2, "{:?}", tree.errors);
    assert!(tree.errors.iter().all(|e| e.kind == ParseErrorKind::UnexpectedToken));
    assert_eq!(tree.errors[0].position.line, 2);
    assert_eq!(tree.errors[1].position.line, 3);
    assert!(tree.find(NodeKind::If).is_some());
}

#[test]
fn errors_are_sorted_by_offset() {
    let tree = parse_str("a=(1 2\necho \"open");
    let offsets: Vec<_> = tree.errors.iter().map(|e| e.span.start).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
}

#[test]
fn strict_parse() {
    assert!(parse_strict("echo ok").is_ok());

    let err = parse_strict("echo 'open").expect_err("lexical");
    assert!(matches!(err, Error::Lex(_)), "{err:?}");

    let err = parse_strict("echo ok )").expect_err("structural");
    let Error::Parse(err) = err else {
        panic!("expected a parse error");
    };
    assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
    assert_eq!(err.to_string(), "unexpected token at line 1, column 9");
}

#[test]
fn strict_parse_honours_the_dialect() {
    assert!(parse_strict_with("a |& b", &ParseOptions::default()).is_ok());
    let err = parse_strict_with("a |& b", &ParseOptions::posix()).expect_err("posix");
    let Error::Parse(err) = err else {
        panic!("expected a parse error");
    };
    assert_eq!(err.kind, ParseErrorKind::ExpectedCommand);
}
