mod common;

use common::token_kinds;
use pretty_assertions::assert_eq;
use shellparse_rs::lexer::{HeredocQueue, Lexer, Mode};
use shellparse_rs::{
    LexErrorKind, ParseOptions, TokenKind as K, tokenize, tokenize_strict, tokenize_with,
};

fn texts_of(input: &str, kind: K) -> Vec<String> {
    tokenize(input)
        .tokens
        .into_iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.text)
        .collect()
}

// -----------------------------------------------------------------------
// Commands and keywords
// -----------------------------------------------------------------------

#[test]
fn pipeline_and_list_operators() {
    assert_eq!(
        token_kinds("a | b && c || d & e; f"),
        vec![
            K::Word,
            K::Pipe,
            K::Word,
            K::AndAnd,
            K::Word,
            K::OrOr,
            K::Word,
            K::Amp,
            K::Word,
            K::Semi,
            K::Word
        ]
    );
}

#[test]
fn reserved_words_after_separators() {
    assert_eq!(
        token_kinds("while true; do echo done; done"),
        vec![
            K::While,
            K::Word,
            K::Semi,
            K::Do,
            K::Word,
            K::Word,
            K::Semi,
            K::Done
        ]
    );
}

#[test]
fn redirect_operators() {
    assert_eq!(
        token_kinds("cmd <in >out 2>>log 2>&1 <<<word"),
        vec![
            K::Word,
            K::RedirectIn,
            K::Word,
            K::RedirectOut,
            K::Word,
            K::FileDescriptor,
            K::RedirectAppend,
            K::Word,
            K::FileDescriptor,
            K::RedirectDupOut,
            K::FileDescriptor,
            K::HereString,
            K::Word
        ]
    );
}

#[test]
fn case_terminators() {
    let kinds = token_kinds("case x in a) b;; c) d;& e) f;;& esac");
    assert!(kinds.contains(&K::CaseEnd));
    assert!(kinds.contains(&K::CaseFallthrough));
    assert!(kinds.contains(&K::CaseContinue));
    assert_eq!(kinds.last(), Some(&K::Esac));
}

#[test]
fn posix_dialect_splits_extended_terminators() {
    let lexed = tokenize_with("case x in a) b;& esac", &ParseOptions::posix());
    let kinds: Vec<_> = lexed
        .tokens
        .iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect();
    assert!(!kinds.contains(&K::CaseFallthrough));
    assert!(kinds.windows(2).any(|w| w == [K::Semi, K::Amp]));
}

// -----------------------------------------------------------------------
// Here-documents
// -----------------------------------------------------------------------

#[test]
fn heredoc_markers_close_in_declaration_order() {
    let input = "cat <<A <<B <<C\nB\nA\nx\nB\nC\n";
    assert_eq!(texts_of(input, K::HeredocMarkerStart), vec!["A", "B", "C"]);
    assert_eq!(texts_of(input, K::HeredocMarkerEnd), vec!["A", "B", "C"]);
    assert_eq!(texts_of(input, K::HeredocContent), vec!["B\n", "x\n"]);
    assert!(tokenize(input).is_ok());
}

#[test]
fn dedent_form_ignores_leading_tabs() {
    let input = "cat <<-END\n\tbody\n\tEND\n";
    let output = tokenize(input);
    assert!(output.is_ok(), "{:?}", output.errors);
    assert_eq!(texts_of(input, K::HeredocMarkerEnd), vec!["\tEND"]);
}

#[test]
fn plain_form_keeps_tabbed_terminator_as_content() {
    let input = "cat <<END\n\tEND\nEND\n";
    assert_eq!(texts_of(input, K::HeredocContent), vec!["\tEND\n"]);
    assert_eq!(texts_of(input, K::HeredocMarkerEnd), vec!["END"]);
}

#[test]
fn empty_heredoc_marker() {
    let output = tokenize("cat <<\n");
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, LexErrorKind::EmptyHeredocMarker);
}

#[test]
fn heredoc_queue_contract() {
    let mut queue = HeredocQueue::new();
    queue.push("'EOF'", false);
    queue.push("END", true);
    assert_eq!(queue.len(), 2);

    let front = queue.peek().expect("front marker");
    assert_eq!(front.key, "EOF");
    assert!(front.quoted);

    assert!(queue.is_end("EOF"));
    assert!(!queue.is_end("\tEOF"));
    assert!(queue.pop("END").is_none());
    assert!(queue.pop("EOF").is_some());

    assert!(queue.is_end("\t\tEND"));
    assert!(queue.pop("END").is_some());
    assert!(queue.is_empty());
}

#[test]
fn registered_marker_switches_to_body_after_newline() {
    let mut lexer = Lexer::new("x\nbody\nEND\ny", &ParseOptions::default());
    lexer.state_mut().heredocs_mut().push("END", false);

    let tokens: Vec<_> = lexer.by_ref().collect();
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            K::Word,
            K::LineFeed,
            K::HeredocContent,
            K::HeredocMarkerEnd,
            K::LineFeed,
            K::Word
        ]
    );
    assert!(!lexer.is_currently_evaluating_heredoc_body());
    assert!(lexer.is_in_mode(Mode::Initial));
}

#[test]
fn heredoc_body_flag_tracks_the_body() {
    let mut lexer = Lexer::new("cat <<END\nbody\nEND\ny", &ParseOptions::default());
    let mut seen = Vec::new();
    while let Some(token) = lexer.next_token() {
        seen.push((token.kind, lexer.is_currently_evaluating_heredoc_body()));
    }
    let in_body: Vec<_> = seen
        .iter()
        .filter(|(_, evaluating)| *evaluating)
        .map(|(kind, _)| *kind)
        .collect();
    assert_eq!(in_body, vec![K::LineFeed, K::HeredocContent]);
    assert_eq!(seen.last(), Some(&(K::Word, false)));
}

// -----------------------------------------------------------------------
// Mode stack
// -----------------------------------------------------------------------

#[test]
fn nested_constructs_restore_the_initial_mode() {
    for input in [
        "echo $(( 1 + $(echo $(( 2 * 3 ))) ))",
        "echo $(cat <<< \"$(( 1+$(echo 2) ))\")",
        "a[$((i+1))]=`echo \"$y\"`",
        "[[ $a == $(( 1 )) ]] && (( x[2] += 1 ))",
    ] {
        let mut lexer = Lexer::new(input, &ParseOptions::default());
        let text: String = lexer.by_ref().map(|t| t.text).collect();
        assert_eq!(text, input);
        assert!(lexer.errors().is_empty(), "{input:?}: {:?}", lexer.errors());
        assert_eq!(lexer.state().depth(), 1, "{input:?}");
        assert_eq!(lexer.state().current_mode(), Mode::Initial, "{input:?}");
    }
}

#[test]
fn within_mode_restores_depth() {
    let mut lexer = Lexer::new("", &ParseOptions::default());
    let depth = lexer.within_mode(Mode::Arithmetic, |lexer| {
        lexer.push_mode(Mode::DoubleQuoted);
        lexer.state().depth()
    });
    assert_eq!(depth, 3);
    assert_eq!(lexer.state().depth(), 1);
}

#[test]
fn unmatched_pop_degrades_to_initial() {
    let mut lexer = Lexer::new("", &ParseOptions::default());
    assert_eq!(lexer.pop_mode(), Mode::Initial);
    assert!(lexer.is_in_mode(Mode::Initial));
    assert_eq!(lexer.state().depth(), 1);
}

// -----------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------

#[test]
fn unterminated_constructs() {
    let cases = [
        ("echo 'abc", LexErrorKind::UnterminatedString),
        ("echo \"abc", LexErrorKind::UnterminatedString),
        ("echo `ls", LexErrorKind::UnterminatedBackquote),
        ("echo ${x", LexErrorKind::UnterminatedExpansion),
        ("echo $(( 1 +", LexErrorKind::UnterminatedExpansion),
    ];
    for (input, expected) in cases {
        let output = tokenize(input);
        assert_eq!(output.errors.len(), 1, "{input:?}: {:?}", output.errors);
        assert_eq!(output.errors[0].kind, expected, "{input:?}");
        let text: String = output.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, input);
    }
}

#[test]
fn strict_tokenize_reports_position() {
    let err = tokenize_strict("echo ok\necho \"open").expect_err("should fail");
    assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    assert_eq!(err.position.line, 2);
    assert_eq!(err.kind.message_key(), "lexer.unterminated.string");
}
