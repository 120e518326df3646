mod common;

use common::{parse_ok, texts, values};
use pretty_assertions::assert_eq;
use shellparse_rs::builder::TreeBuilder;
use shellparse_rs::parser::command::{AssignmentMode, is_assignment, read_assignment};
use shellparse_rs::{NodeKind, ParseErrorKind, ParseOptions, SyntaxTree, parse, parse_str, tokenize_with};

/// Run a single assignment routine over `input`.
fn assignment(
    input: &str,
    options: &ParseOptions,
    mode: AssignmentMode,
    accept_array_vars: bool,
) -> (bool, SyntaxTree) {
    let tokens = tokenize_with(input, options).tokens;
    let mut b = TreeBuilder::new(input, tokens, options);
    let ok = read_assignment(&mut b, mode, true, accept_array_vars);
    (ok, b.finish())
}

// -----------------------------------------------------------------------
// Array literals
// -----------------------------------------------------------------------

#[test]
fn list_elements_in_order() {
    let tree = parse_ok("a=(1 2 3)");
    let list = tree.find(NodeKind::AssignmentList).expect("list");
    let elements: Vec<_> = list
        .child_nodes()
        .filter(|n| n.kind == NodeKind::ArrayElement)
        .map(|n| n.text())
        .collect();
    assert_eq!(elements, vec!["1", "2", "3"]);
}

#[test]
fn indexed_elements_keep_their_indices() {
    let tree = parse_ok("a=([2]=x [0]=y)");
    assert_eq!(texts(&tree, NodeKind::ArrayElement), vec!["[2]=x", "[0]=y"]);
    assert_eq!(values(&tree, NodeKind::ArrayIndex), vec![Some(2), Some(0)]);
}

#[test]
fn elements_across_lines() {
    let tree = parse_ok("files=(\n  one\n  \"two words\"\n  [5]=$(three)\n)\n");
    assert_eq!(tree.find_all(NodeKind::ArrayElement).len(), 3);
    assert_eq!(values(&tree, NodeKind::ArrayIndex), vec![Some(5)]);
    assert!(tree.find(NodeKind::CommandSubstitution).is_some());
}

#[test]
fn unclosed_list() {
    let input = "a=(1 2";
    let tree = parse_str(input);
    assert_eq!(tree.errors.len(), 1);
    assert_eq!(tree.errors[0].kind, ParseErrorKind::InvalidAssignmentList);
    assert_eq!(tree.errors[0].span.start, input.len());
    assert!(tree.find(NodeKind::AssignmentList).is_none());
    assert!(tree.find(NodeKind::VarDef).is_none());
    assert_eq!(tree.text(), input);
}

#[test]
fn index_without_value_operator() {
    let tree = parse_str("a=([1] x)");
    assert_eq!(
        tree.errors.first().map(|e| e.kind.clone()),
        Some(ParseErrorKind::MissingAssignmentOperator)
    );
    assert!(tree.find(NodeKind::AssignmentList).is_none());
}

// -----------------------------------------------------------------------
// Modes
// -----------------------------------------------------------------------

#[test]
fn strict_mode_folds_the_index() {
    let (ok, tree) = assignment(
        "x[1]=5",
        &ParseOptions::default(),
        AssignmentMode::Strict,
        true,
    );
    assert!(ok);
    assert!(tree.is_ok(), "{:?}", tree.errors);
    let var_defs = tree.find_all(NodeKind::VarDef);
    assert_eq!(var_defs.len(), 1);
    assert_eq!(
        var_defs[0].child(NodeKind::ArrayIndex).and_then(|i| i.value),
        Some(1)
    );
    assert_eq!(
        var_defs[0].child(NodeKind::Word).map(|w| w.text()),
        Some("5".to_string())
    );
}

#[test]
fn simple_mode_reads_one_word() {
    let (ok, tree) = assignment(
        "x[1]=5",
        &ParseOptions::default(),
        AssignmentMode::Simple,
        false,
    );
    assert!(ok);
    assert!(tree.find(NodeKind::ArrayIndex).is_none());
    assert_eq!(texts(&tree, NodeKind::Word), vec!["x[1]=5"]);
}

#[test]
fn classification_agrees_with_parsing() {
    let inputs = [
        "a=1", "a+=x", "x[1]=5", "a[2] b", "foo", "$name=1", "a=(1 2", "a=(x)", "'q'", "${v}",
    ];
    let modes = [
        AssignmentMode::Strict,
        AssignmentMode::Lax,
        AssignmentMode::Simple,
    ];
    for eval_mode in [false, true] {
        let options = ParseOptions::default().eval_mode(eval_mode);
        for input in inputs {
            for mode in modes {
                for accept_array_vars in [false, true] {
                    let tokens = tokenize_with(input, &options).tokens;
                    let mut b = TreeBuilder::new(input, tokens, &options);
                    if !is_assignment(&b, mode, accept_array_vars) {
                        continue;
                    }
                    let start = b.position();
                    let ok = read_assignment(&mut b, mode, true, accept_array_vars);
                    assert!(
                        ok || b.position() > start,
                        "{input:?} {mode:?} accept={accept_array_vars} eval={eval_mode}"
                    );
                }
            }
        }
    }
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

#[test]
fn prefix_assignments() {
    let tree = parse_ok("FOO=1 BAR+=x env\n");
    assert_eq!(texts(&tree, NodeKind::VarDef), vec!["FOO=1", "BAR+=x"]);
    assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 1);
}

#[test]
fn bare_assignment_has_no_value() {
    let tree = parse_ok("empty=; next=1");
    assert_eq!(texts(&tree, NodeKind::VarDef), vec!["empty=", "next=1"]);
}

#[test]
fn declaration_builtins() {
    let tree = parse_ok("declare -x -i a=1 b\nlocal -a arr=(1 2)\nexport PATH=$PATH:/bin\n");
    assert_eq!(
        texts(&tree, NodeKind::VarDef),
        vec!["a=1", "b", "arr=(1 2)", "PATH=$PATH:/bin"]
    );
    assert_eq!(tree.find_all(NodeKind::ArrayElement).len(), 2);
}

#[test]
fn read_names() {
    let tree = parse_ok("read -r -p \"name: \" first rest\n");
    assert_eq!(texts(&tree, NodeKind::VarDef), vec!["first", "rest"]);
}

#[test]
fn read_array_option_takes_a_whole_word() {
    let tree = parse_ok("read -a a=1\nread -a list\n");
    assert_eq!(texts(&tree, NodeKind::VarDef), vec!["a=1", "list"]);
}

#[test]
fn eval_mode_computed_name() {
    let options = ParseOptions::default().eval_mode(true);
    let tree = parse("$name=1", &options);
    assert!(tree.is_ok(), "{:?}", tree.errors);
    assert!(tree.find(NodeKind::VarDef).is_none());
    let command = tree.find(NodeKind::SimpleCommand).expect("command");
    assert!(command.child(NodeKind::Variable).is_some());

    let tree = parse_ok("$name=1");
    let command = tree.find(NodeKind::SimpleCommand).expect("command");
    assert!(command.child(NodeKind::Variable).is_none());
    assert_eq!(texts(&tree, NodeKind::Word), vec!["$name=1"]);
}
