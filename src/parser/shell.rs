//! Compound commands, function definitions and coprocesses.

use crate::builder::{CompletedMarker, Marker, TreeBuilder};
use crate::parser::{
    ParseErrorKind, arithmetic, command, compound_list, newline, newlines, redirect, word,
};
use crate::token::{TokenKind as K, TokenSet};
use crate::tree::NodeKind;

/// Tokens that open a compound command.
const COMPOUND_START: TokenSet = TokenSet::new(&[
    K::If,
    K::While,
    K::Until,
    K::For,
    K::Select,
    K::Case,
    K::LeftCurly,
    K::LeftParen,
    K::LeftDoubleBracket,
    K::ExprArithStart,
]);

const CLAUSE_END: TokenSet = TokenSet::new(&[
    K::CaseEnd,
    K::CaseFallthrough,
    K::CaseContinue,
    K::Esac,
]);

/// Parse a compound command, or return `None` if none starts here.
pub fn compound_command(b: &mut TreeBuilder<'_>) -> Option<CompletedMarker> {
    let marker = match b.current()? {
        K::If => if_command(b),
        K::While => loop_command(b, NodeKind::While),
        K::Until => loop_command(b, NodeKind::Until),
        K::For | K::Select => for_command(b),
        K::Case => case_command(b),
        K::LeftCurly => enclosed(b, K::RightCurly, &[K::RightCurly], NodeKind::Group),
        K::LeftParen => enclosed(b, K::RightParen, &[K::RightParen], NodeKind::Subshell),
        K::LeftDoubleBracket => conditional(b),
        K::ExprArithStart => arithmetic_command(b),
        _ => return None,
    };
    Some(marker)
}

/// Trailing redirects belong to the compound command they follow.
fn finish_compound(b: &mut TreeBuilder<'_>, m: Marker, kind: NodeKind) -> CompletedMarker {
    redirect::parse_redirect_list(b);
    m.done(b, kind)
}

/// A command list that must not be empty.
fn body(b: &mut TreeBuilder<'_>, stop: &'static [K]) {
    if !compound_list(b, TokenSet::new(stop)) && !b.at_eof() {
        b.error(ParseErrorKind::ExpectedCommand);
    }
}

fn if_command(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    body(b, &[K::Then]);
    b.expect(K::Then);
    body(b, &[K::Elif, K::Else, K::Fi]);
    while b.eat(K::Elif) {
        body(b, &[K::Then]);
        b.expect(K::Then);
        body(b, &[K::Elif, K::Else, K::Fi]);
    }
    if b.eat(K::Else) {
        body(b, &[K::Fi]);
    }
    b.expect(K::Fi);
    finish_compound(b, m, NodeKind::If)
}

fn loop_command(b: &mut TreeBuilder<'_>, kind: NodeKind) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    body(b, &[K::Do]);
    do_group(b);
    finish_compound(b, m, kind)
}

/// `do ... done`. A `do` right after `))` is lexed as a plain word.
fn do_group(b: &mut TreeBuilder<'_>) {
    if b.at_word("do") {
        b.advance();
    } else if !b.expect(K::Do) {
        return;
    }
    body(b, &[K::Done]);
    b.expect(K::Done);
}

fn for_command(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    let kind = if b.at(K::Select) {
        NodeKind::Select
    } else {
        NodeKind::For
    };
    b.advance();
    if kind == NodeKind::For && b.at(K::ExprArithStart) {
        return arithmetic_for(b, m);
    }

    let name = b.mark();
    if word::parse_word(b) {
        name.done(b, NodeKind::VarDef);
    } else {
        name.abandon(b);
        b.error(ParseErrorKind::ExpectedToken(K::Word));
    }
    if b.eat(K::In) {
        while word::is_word_token(b) {
            word::parse_word(b);
        }
    }
    b.eat(K::Semi);
    newlines(b);
    do_group(b);
    finish_compound(b, m, kind)
}

/// `for (( init; condition; step ))`
fn arithmetic_for(b: &mut TreeBuilder<'_>, m: Marker) -> CompletedMarker {
    b.advance();
    let clause_end = TokenSet::new(&[K::Semi, K::ExprArithEnd]);
    for clause in 0..3 {
        arithmetic::expression_until(b, clause_end);
        if clause < 2 && !b.expect(K::Semi) {
            break;
        }
    }
    b.expect(K::ExprArithEnd);
    b.eat(K::Semi);
    newlines(b);
    do_group(b);
    finish_compound(b, m, NodeKind::ArithmeticFor)
}

fn case_command(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    if !word::parse_word(b) {
        b.error(ParseErrorKind::ExpectedToken(K::Word));
    }
    newlines(b);
    if b.expect(K::In) {
        loop {
            newlines(b);
            if b.at_eof() || b.at(K::Esac) {
                break;
            }
            let before = b.position();
            case_clause(b);
            if b.position() == before {
                b.error_and_advance(ParseErrorKind::UnexpectedToken);
            }
        }
    }
    b.expect(K::Esac);
    finish_compound(b, m, NodeKind::Case)
}

/// `[(] pattern [| pattern]... ) list [;; | ;& | ;;&]`
fn case_clause(b: &mut TreeBuilder<'_>) {
    let m = b.mark();
    let pattern = b.mark();
    b.eat(K::LeftParen);
    loop {
        if !word::parse_word(b) {
            b.error(ParseErrorKind::ExpectedToken(K::Word));
            break;
        }
        if !b.eat(K::Pipe) {
            break;
        }
    }
    pattern.done(b, NodeKind::CasePattern);
    b.expect(K::RightParen);
    compound_list(b, CLAUSE_END);
    if !b.eat(K::CaseEnd) && !b.eat(K::CaseFallthrough) {
        b.eat(K::CaseContinue);
    }
    m.done(b, NodeKind::CaseClause);
}

/// `{ list; }` and `( list )`
fn enclosed(
    b: &mut TreeBuilder<'_>,
    close: K,
    stop: &'static [K],
    kind: NodeKind,
) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    body(b, stop);
    b.expect(close);
    finish_compound(b, m, kind)
}

/// `[[ expression ]]`. Operands are words; operators are kept as tokens.
fn conditional(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    loop {
        match b.current() {
            None | Some(K::RightDoubleBracket | K::Semi | K::Amp) => break,
            Some(K::LineFeed) => {
                newline(b);
            }
            Some(_) if word::is_word_token(b) => {
                word::parse_word(b);
            }
            Some(_) => b.advance(),
        }
    }
    b.expect(K::RightDoubleBracket);
    finish_compound(b, m, NodeKind::Conditional)
}

/// `(( expression ))`, folded when constant.
fn arithmetic_command(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    let (_, value) = arithmetic::expression_until(b, TokenSet::new(&[K::ExprArithEnd]));
    b.expect(K::ExprArithEnd);
    finish_compound(b, m, NodeKind::ArithmeticCommand).set_value(b, value)
}

/// `function name [()] body` or `name() body`.
pub fn function_def(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    let keyword = b.eat(K::Function);
    if !word::parse_word(b) {
        b.error(ParseErrorKind::ExpectedToken(K::Word));
    }
    if b.eat(K::LeftParen) {
        b.expect(K::RightParen);
    } else if !keyword {
        b.error(ParseErrorKind::ExpectedToken(K::LeftParen));
    }
    newlines(b);
    if compound_command(b).is_none() {
        b.error(ParseErrorKind::ExpectedCommand);
    }
    m.done(b, NodeKind::FunctionDef)
}

/// `coproc [NAME] compound-command` or `coproc simple-command`.
pub fn coproc(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    // a name is only given in front of a compound command
    if b.at(K::Word) && b.nth(1).is_some_and(|k| COMPOUND_START.contains(k)) {
        word::parse_word(b);
    }
    if compound_command(b)
        .or_else(|| command::parse_simple_command(b))
        .is_none()
    {
        b.error(ParseErrorKind::ExpectedCommand);
    }
    m.done(b, NodeKind::Coproc)
}
