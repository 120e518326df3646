//! Words and the expansions that can appear inside them.

use crate::builder::{CompletedMarker, TreeBuilder};
use crate::parser::{ParseErrorKind, arithmetic, compound_list};
use crate::token::{TokenKind as K, TokenSet, WORD_START};
use crate::tree::NodeKind;

const NOTHING: TokenSet = TokenSet::new(&[]);

/// Can the current token begin a word?
#[must_use]
pub fn is_word_token(b: &TreeBuilder<'_>) -> bool {
    match b.current() {
        Some(K::Backquote) => !b.in_backquote(),
        Some(kind) => WORD_START.contains(kind),
        None => false,
    }
}

/// Is the current token a variable reference, `$name` or `${...}`?
#[must_use]
pub fn is_variable(b: &TreeBuilder<'_>) -> bool {
    b.at(K::Variable) || b.has_next_tokens(false, &[K::Dollar, K::LeftCurly])
}

/// Parse `$name` or `${...}`.
pub fn parse_variable(b: &mut TreeBuilder<'_>) -> bool {
    is_variable(b) && word_part(b)
}

/// Parse one word: a run of adjacent word parts.
///
/// Returns false if no word starts at the cursor.
pub fn parse_word(b: &mut TreeBuilder<'_>) -> bool {
    parse_word_until(b, NOTHING)
}

/// Like [`parse_word`], but the word ends in front of any token in `stop`.
pub fn parse_word_until(b: &mut TreeBuilder<'_>, stop: TokenSet) -> bool {
    word_until(b, stop).is_some()
}

/// Parse one word and hand back its node.
pub fn word(b: &mut TreeBuilder<'_>) -> Option<CompletedMarker> {
    word_until(b, NOTHING)
}

fn word_until(b: &mut TreeBuilder<'_>, stop: TokenSet) -> Option<CompletedMarker> {
    if !is_word_token(b) {
        return None;
    }
    let m = b.mark();
    word_part(b);
    while b.is_adjacent() {
        let Some(kind) = b.current() else {
            break;
        };
        if !kind.is_word_continuation() || stop.contains(kind) {
            break;
        }
        if kind == K::Backquote && b.in_backquote() {
            break;
        }
        if kind == K::LeftSquare {
            subscript(b);
        } else {
            word_part(b);
        }
    }
    Some(m.done(b, NodeKind::Word))
}

/// A `[...]` glued to a word, such as the `[1]` of `echo a[1]`.
///
/// It is kept as plain word text; only assignments give subscripts
/// arithmetic meaning.
fn subscript(b: &mut TreeBuilder<'_>) {
    let mut depth = 0usize;
    while let Some(kind) = b.current_raw() {
        match kind {
            K::LeftSquare => {
                depth += 1;
                b.advance_raw();
            }
            K::RightSquare => {
                depth -= 1;
                b.advance_raw();
                if depth == 0 {
                    break;
                }
            }
            K::Variable | K::Dollar | K::StringBegin => {
                word_part(b);
            }
            K::Backquote if !b.in_backquote() => {
                word_part(b);
            }
            K::LineFeed => break,
            _ => b.advance_raw(),
        }
    }
}

/// Parse a single part of a word. Plain tokens are consumed as they
/// are; expansions and strings become nodes.
pub fn word_part(b: &mut TreeBuilder<'_>) -> bool {
    let Some(kind) = b.current() else {
        return false;
    };
    match kind {
        K::StringBegin => {
            string(b);
        }
        K::Variable => {
            let m = b.mark();
            b.advance();
            m.done(b, NodeKind::Variable);
        }
        K::Dollar => {
            dollar_expansion(b);
        }
        K::Backquote => {
            backquote(b);
        }
        K::ProcessSubstIn | K::ProcessSubstOut => {
            process_substitution(b);
        }
        _ => b.advance(),
    }
    true
}

/// `"..."` with the expansions inside it.
fn string(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let outer = b.set_in_backquote(false);
    let m = b.mark();
    b.advance();
    while let Some(kind) = b.current_raw() {
        match kind {
            K::StringEnd => {
                b.advance_raw();
                break;
            }
            K::Variable | K::Dollar | K::Backquote => {
                word_part(b);
            }
            _ => b.advance_raw(),
        }
    }
    b.set_in_backquote(outer);
    m.done(b, NodeKind::String)
}

/// Expansions introduced by a lone `$` token.
fn dollar_expansion(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let opener = [K::LeftCurly, K::LeftParen, K::ExprArithStart, K::LeftSquare]
        .into_iter()
        .find(|kind| b.has_next_tokens(false, &[K::Dollar, *kind]));
    match opener {
        Some(K::LeftCurly) => param_expansion(b),
        Some(K::LeftParen) => command_substitution(b),
        Some(K::ExprArithStart) => arithmetic_expansion(b, K::ExprArithEnd),
        Some(_) => arithmetic_expansion(b, K::RightSquare),
        None => {
            let m = b.mark();
            b.advance();
            m.done(b, NodeKind::Word)
        }
    }
}

/// `${...}`
fn param_expansion(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let outer = b.set_in_backquote(false);
    let m = b.mark();
    b.advance_raw();
    b.advance_raw();
    while let Some(kind) = b.current_raw() {
        match kind {
            K::RightCurly => {
                b.advance_raw();
                break;
            }
            K::LeftSquare => {
                array_index(b);
            }
            K::Variable | K::Dollar | K::Backquote | K::StringBegin => {
                word_part(b);
            }
            _ => b.advance_raw(),
        }
    }
    b.set_in_backquote(outer);
    m.done(b, NodeKind::ParamExpansion)
}

/// `[ expression ]` subscript, folded when the index is constant.
/// `[@]` and `[*]` select every element and have no value; `[]` is
/// an error.
///
/// Returns false if the subscript is malformed; errors are recorded
/// either way.
pub fn array_index(b: &mut TreeBuilder<'_>) -> bool {
    let m = b.mark();
    b.advance();
    let (ok, value) = if b.at(K::RightSquare) {
        b.error(ParseErrorKind::InvalidArrayIndex);
        (false, None)
    } else if (b.at_word("@") || b.at(K::ArithMult)) && b.nth(1) == Some(K::RightSquare) {
        b.advance();
        (true, None)
    } else {
        arithmetic::expression_until(b, TokenSet::new(&[K::RightSquare]))
    };
    let closed = b.expect(K::RightSquare);
    m.done(b, NodeKind::ArrayIndex).set_value(b, value);
    ok && closed
}

/// `$( ... )`
fn command_substitution(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let outer = b.set_in_backquote(false);
    let m = b.mark();
    b.advance_raw();
    b.advance_raw();
    compound_list(b, TokenSet::new(&[K::RightParen]));
    b.expect(K::RightParen);
    b.set_in_backquote(outer);
    m.done(b, NodeKind::CommandSubstitution)
}

/// `` `...` ``
fn backquote(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let m = b.mark();
    b.advance();
    let outer = b.set_in_backquote(true);
    compound_list(b, TokenSet::new(&[K::Backquote]));
    b.expect(K::Backquote);
    b.set_in_backquote(outer);
    m.done(b, NodeKind::BackquoteCommand)
}

/// `$(( ... ))` or the legacy `$[ ... ]`.
fn arithmetic_expansion(b: &mut TreeBuilder<'_>, close: K) -> CompletedMarker {
    let outer = b.set_in_backquote(false);
    let m = b.mark();
    b.advance_raw();
    b.advance_raw();
    let stop = if close == K::ExprArithEnd {
        TokenSet::new(&[K::ExprArithEnd])
    } else {
        TokenSet::new(&[K::RightSquare])
    };
    let (_, value) = arithmetic::expression_until(b, stop);
    b.expect(close);
    b.set_in_backquote(outer);
    m.done(b, NodeKind::ArithmeticExpansion).set_value(b, value)
}

/// `<( ... )` or `>( ... )`
fn process_substitution(b: &mut TreeBuilder<'_>) -> CompletedMarker {
    let outer = b.set_in_backquote(false);
    let m = b.mark();
    b.advance();
    compound_list(b, TokenSet::new(&[K::RightParen]));
    b.expect(K::RightParen);
    b.set_in_backquote(outer);
    m.done(b, NodeKind::ProcessSubstitution)
}
