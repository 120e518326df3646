//! Recursive-descent parser producing a lossless [`SyntaxTree`].
//!
//! Grammar routines are free functions over a shared [`TreeBuilder`];
//! the submodules call into each other freely (commands need arithmetic
//! for `(( ))` and array indices, arithmetic needs words for
//! expansions).

pub mod arithmetic;
pub mod command;
pub mod redirect;
pub mod shell;
pub mod word;

use std::fmt;

use crate::builder::{CompletedMarker, TreeBuilder};
use crate::config::ParseOptions;
use crate::lexer::{LexError, LexErrorKind, LexOutput, tokenize_with};
use crate::token::{LIST_OPERATORS, Position, Span, TokenKind as K, TokenSet};
use crate::tree::{NodeKind, SyntaxTree};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that cannot appear here.
    UnexpectedToken,
    /// A specific token was required.
    ExpectedToken(K),
    /// A reserved word was required.
    ExpectedKeyword(&'static str),
    /// An operator or keyword that must be followed by a command.
    ExpectedCommand,
    /// A strict assignment without `=` or `+=`.
    MissingAssignmentOperator,
    /// A malformed or empty `[ ]` subscript.
    InvalidArrayIndex,
    /// A `( ... )` array literal that is not closed properly.
    InvalidAssignmentList,
    /// An element of an array literal that is not a word.
    InvalidAssignmentValue,
    /// Tokens inside an arithmetic context that do not form an expression.
    InvalidArithmetic,
    /// A redirect operator without a target word.
    ExpectedRedirectTarget,
    /// `<<` without a marker word.
    ExpectedHeredocMarker,
    /// A lexical error, reported through the parser's error channel.
    Lexical(LexErrorKind),
}

impl ParseErrorKind {
    /// Stable identifier of the message, independent of its wording.
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "parser.unexpected.token",
            Self::ExpectedToken(_) => "parser.expected.token",
            Self::ExpectedKeyword(_) => "parser.expected.keyword",
            Self::ExpectedCommand => "parser.expected.command",
            Self::MissingAssignmentOperator => "parser.assignment.operator.missing",
            Self::InvalidArrayIndex => "parser.array.index.invalid",
            Self::InvalidAssignmentList => "parser.assignment.list.invalid",
            Self::InvalidAssignmentValue => "parser.assignment.value.invalid",
            Self::InvalidArithmetic => "parser.arithmetic.invalid",
            Self::ExpectedRedirectTarget => "parser.redirect.target.expected",
            Self::ExpectedHeredocMarker => "parser.heredoc.marker.expected",
            Self::Lexical(kind) => kind.message_key(),
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken => {
                write!(f, "unexpected token")
            }
            Self::ExpectedToken(kind) => {
                write!(f, "expected {kind}")
            }
            Self::ExpectedKeyword(keyword) => {
                write!(f, "expected '{keyword}'")
            }
            Self::ExpectedCommand => {
                write!(f, "expected a command")
            }
            Self::MissingAssignmentOperator => {
                write!(f, "expected '=' or '+=' in assignment")
            }
            Self::InvalidArrayIndex => {
                write!(f, "invalid array index")
            }
            Self::InvalidAssignmentList => {
                write!(f, "invalid array assignment list")
            }
            Self::InvalidAssignmentValue => {
                write!(f, "invalid value in array assignment")
            }
            Self::InvalidArithmetic => {
                write!(f, "invalid arithmetic expression")
            }
            Self::ExpectedRedirectTarget => {
                write!(f, "expected a redirect target")
            }
            Self::ExpectedHeredocMarker => {
                write!(f, "expected a here-document marker")
            }
            Self::Lexical(kind) => {
                write!(f, "{kind}")
            }
        }
    }
}

/// Error recorded while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub position: Position,
}

impl ParseError {
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        self.kind.message_key()
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            kind: ParseErrorKind::Lexical(err.kind),
            span: err.span,
            position: err.position,
        }
    }
}

/// Lex and parse a shell script.
///
/// Parsing never fails: the tree always covers the whole input and
/// every problem found on the way is listed in [`SyntaxTree::errors`].
#[must_use]
pub fn parse(input: &str, options: &ParseOptions) -> SyntaxTree {
    parse_tokens(input, tokenize_with(input, options), options)
}

/// Parse an already tokenized script.
///
/// Lexical errors become [`ParseErrorKind::Lexical`] entries. A parse
/// error at the same offset as a lexical one is dropped, so a construct
/// left open at the end of the input is reported once.
#[must_use]
pub fn parse_tokens(source: &str, lexed: LexOutput, options: &ParseOptions) -> SyntaxTree {
    let mut b = TreeBuilder::new(source, lexed.tokens, options);
    compound_list(&mut b, TokenSet::new(&[]));
    let mut tree = b.finish();

    let lexical: Vec<ParseError> = lexed.errors.into_iter().map(ParseError::from).collect();
    tree.errors
        .retain(|e| !lexical.iter().any(|l| l.span.start == e.span.start));
    tree.errors.extend(lexical);
    tree.errors.sort_by_key(|e| e.span.start);
    tracing::debug!(errors = tree.errors.len(), "parsed input");
    tree
}

/// Tokens that close an enclosing construct; a nested command list
/// stops in front of them and leaves the closer to its owner.
const CLOSERS: TokenSet = TokenSet::new(&[
    K::RightParen,
    K::RightCurly,
    K::Then,
    K::Elif,
    K::Else,
    K::Fi,
    K::Do,
    K::Done,
    K::Esac,
    K::CaseEnd,
    K::CaseFallthrough,
    K::CaseContinue,
]);

/// Here-document body tokens, expansions included.
const HEREDOC_BODY: TokenSet = TokenSet::new(&[
    K::HeredocContent,
    K::HeredocMarkerEnd,
    K::Variable,
    K::Dollar,
    K::Backquote,
]);

/// Sequence of lists separated by `;`, `&` or newlines, up to a token
/// in `stop`. With an empty `stop` set the list runs to the end of the
/// input. Returns whether at least one command was parsed.
pub fn compound_list(b: &mut TreeBuilder<'_>, stop: TokenSet) -> bool {
    let nested = !stop.kinds().is_empty();
    let mut any = false;
    loop {
        newlines(b);
        if b.at_eof() || b.at_any(stop) {
            break;
        }
        if nested && (b.at_any(CLOSERS) || (b.at(K::Backquote) && b.in_backquote())) {
            break;
        }
        if !list(b) {
            b.error_and_advance(ParseErrorKind::UnexpectedToken);
            continue;
        }
        any = true;
        if b.eat(K::Semi) || b.eat(K::Amp) || newline(b) {
            continue;
        }
        if b.at_eof() || b.at_any(stop) || (nested && b.at_any(CLOSERS)) {
            break;
        }
        if b.at(K::Backquote) && b.in_backquote() {
            break;
        }
        b.error_and_advance(ParseErrorKind::UnexpectedToken);
    }
    any
}

/// Pipelines joined by `&&` and `||`.
pub fn list(b: &mut TreeBuilder<'_>) -> bool {
    let Some(mut lhs) = pipeline(b) else {
        return false;
    };
    while b.at_any(LIST_OPERATORS) {
        let m = lhs.precede(b);
        b.advance();
        newlines(b);
        if pipeline(b).is_none() {
            b.error(ParseErrorKind::ExpectedCommand);
        }
        lhs = m.done(b, NodeKind::List);
    }
    true
}

/// Commands joined by `|` or `|&`, with an optional `time [-p]` and `!`.
pub fn pipeline(b: &mut TreeBuilder<'_>) -> Option<CompletedMarker> {
    let m = b.mark();
    let mut timed = false;
    let mut negated = false;
    if b.eat(K::Time) {
        timed = true;
        if b.at_word("-p") {
            b.advance();
        }
    }
    while b.eat(K::Bang) {
        negated = true;
    }

    let Some(first) = command(b) else {
        if negated {
            b.error(ParseErrorKind::ExpectedCommand);
        }
        if timed || negated {
            return Some(m.done(b, NodeKind::Pipeline));
        }
        m.abandon(b);
        return None;
    };

    let mut piped = false;
    while b.at(K::Pipe) || b.at(K::PipeAmp) {
        piped = true;
        b.advance();
        newlines(b);
        if command(b).is_none() {
            b.error(ParseErrorKind::ExpectedCommand);
            break;
        }
    }

    if piped || timed || negated {
        Some(m.done(b, NodeKind::Pipeline))
    } else {
        m.abandon(b);
        Some(first)
    }
}

/// A single command: compound, function definition or simple.
pub fn command(b: &mut TreeBuilder<'_>) -> Option<CompletedMarker> {
    match b.current()? {
        K::Function => Some(shell::function_def(b)),
        K::Coproc => Some(shell::coproc(b)),
        K::Word if b.has_next_tokens(true, &[K::Word, K::LeftParen, K::RightParen]) => {
            Some(shell::function_def(b))
        }
        _ => shell::compound_command(b).or_else(|| command::parse_simple_command(b)),
    }
}

/// Consume one newline and the here-document bodies that follow it.
pub fn newline(b: &mut TreeBuilder<'_>) -> bool {
    if !b.at(K::LineFeed) {
        return false;
    }
    b.advance();
    heredoc_bodies(b);
    true
}

pub fn newlines(b: &mut TreeBuilder<'_>) -> bool {
    let mut any = false;
    while newline(b) {
        any = true;
    }
    any
}

/// Bodies are read in the order their markers were declared.
fn heredoc_bodies(b: &mut TreeBuilder<'_>) {
    while b.pending_heredocs() > 0 && b.at_any(HEREDOC_BODY) {
        let m = b.mark();
        loop {
            match b.current_raw() {
                Some(K::HeredocMarkerEnd) => {
                    b.advance_raw();
                    break;
                }
                Some(K::HeredocContent) => b.advance_raw(),
                Some(K::Variable | K::Dollar | K::Backquote) => {
                    word::word_part(b);
                }
                _ => break,
            }
        }
        m.done(b, NodeKind::HeredocBody);
        b.close_heredoc();
        // bodies after the first are separated by a newline of their own
        if b.pending_heredocs() > 0 && b.current_raw() == Some(K::LineFeed) {
            b.advance_raw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(input: &str) -> SyntaxTree {
        parse(input, &ParseOptions::default())
    }

    #[test]
    fn list_and_pipeline_shapes() {
        let tree = parse_default("a | b && ! c");
        assert!(tree.is_ok(), "{:?}", tree.errors);
        let list = tree.find(NodeKind::List).expect("list");
        let kinds: Vec<_> = list.child_nodes().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Pipeline, NodeKind::Pipeline]);
        assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 3);
    }

    #[test]
    fn heredoc_bodies_follow_the_command_line() {
        let input = "cat <<A <<-B\nfirst $x\nA\n\tsecond\n\tB\necho done\n";
        let tree = parse_default(input);
        assert!(tree.is_ok(), "{:?}", tree.errors);
        let bodies = tree.find_all(NodeKind::HeredocBody);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].text(), "first $x\nA");
        assert_eq!(bodies[1].text(), "\tsecond\n\tB");
        assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 2);
        assert_eq!(tree.text(), input);
    }

    #[test]
    fn stray_closer_is_an_error() {
        let tree = parse_default("echo a\n)\necho b\n");
        assert_eq!(tree.errors.len(), 1);
        assert_eq!(tree.errors[0].kind, ParseErrorKind::UnexpectedToken);
        assert_eq!(tree.errors[0].position.line, 2);
        assert_eq!(tree.find_all(NodeKind::SimpleCommand).len(), 2);
    }

    #[test]
    fn unterminated_construct_is_reported_once() {
        let tree = parse_default("echo $(ls");
        assert_eq!(tree.errors.len(), 1, "{:?}", tree.errors);
        assert_eq!(
            tree.errors[0].kind,
            ParseErrorKind::Lexical(LexErrorKind::UnterminatedExpansion)
        );
    }

    #[test]
    fn message_keys_are_stable() {
        assert_eq!(
            ParseErrorKind::UnexpectedToken.message_key(),
            "parser.unexpected.token"
        );
        assert_eq!(
            ParseErrorKind::Lexical(LexErrorKind::UnterminatedString).message_key(),
            "lexer.unterminated.string"
        );
    }
}
