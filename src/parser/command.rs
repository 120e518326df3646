//! Simple commands, variable assignments and array literals.
//!
//! The same `name=value` text is read differently depending on where it
//! appears, so every assignment routine takes an [`AssignmentMode`]:
//!
//! | mode     | left-hand side                         | `=value`  |
//! |----------|----------------------------------------|-----------|
//! | `Strict` | assignment word (`$name` in eval mode) | mandatory |
//! | `Lax`    | assignment word, word or variable      | optional  |
//! | `Simple` | a single word                          | not read  |

use crate::builder::{CompletedMarker, TreeBuilder};
use crate::parser::{ParseErrorKind, arithmetic, newlines, redirect, word};
use crate::token::{TokenKind as K, TokenSet};
use crate::tree::NodeKind;

/// How strictly an assignment is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentMode {
    /// Prefix assignments of a command: `name=value` with a mandatory `=`.
    Strict,
    /// Arguments of `declare` and friends, where `=value` is optional.
    Lax,
    /// Plain variable names, as read by `read`.
    Simple,
}

/// Tokens after which an assignment has no value.
const VALUE_END: TokenSet = TokenSet::new(&[K::LineFeed, K::Semi]);

/// Builtins whose arguments declare variables.
const DECLARATION_BUILTINS: &[&str] = &["declare", "typeset", "local", "export", "readonly"];

/// Options of `read` that take a parameter.
const READ_PARAM_OPTIONS: &[char] = &['a', 'd', 'i', 'n', 'N', 'p', 't', 'u'];

/// Consume redirects, words and tokens of `extra` until something else
/// shows up.
///
/// Stopping at an unrelated token is not a failure; false means that a
/// redirect that was started turned out malformed.
pub fn read_command_params(b: &mut TreeBuilder<'_>, extra: TokenSet) -> bool {
    let mut ok = true;
    while ok && !b.at_eof() {
        if redirect::is_redirect(b) {
            ok = redirect::parse_redirect(b);
        } else if word::is_word_token(b) {
            ok = word::parse_word(b);
        } else if b.at_any(extra) {
            b.advance();
        } else {
            break;
        }
    }
    ok
}

/// Does an assignment in `mode` start at the cursor?
#[must_use]
pub fn is_assignment(b: &TreeBuilder<'_>, mode: AssignmentMode, accept_array_vars: bool) -> bool {
    match mode {
        AssignmentMode::Simple => {
            (accept_array_vars && b.has_next_tokens(false, &[K::AssignmentWord, K::LeftSquare]))
                || word::is_word_token(b)
                || word::is_variable(b)
        }
        AssignmentMode::Lax => {
            b.at(K::AssignmentWord) || word::is_word_token(b) || word::is_variable(b)
        }
        AssignmentMode::Strict => {
            b.at(K::AssignmentWord)
                || (b.options().eval_mode && b.has_next_tokens(false, &[K::Variable, K::Eq]))
        }
    }
}

/// Is the cursor at an assignment in `mode` or at a redirect?
#[must_use]
pub fn is_assignment_or_redirect(
    b: &TreeBuilder<'_>,
    mode: AssignmentMode,
    accept_array_vars: bool,
) -> bool {
    is_assignment(b, mode, accept_array_vars) || redirect::is_redirect(b)
}

/// Read assignments and redirects as long as they keep coming.
pub fn read_optional_assignment_or_redirects(
    b: &mut TreeBuilder<'_>,
    mode: AssignmentMode,
    mark_as_var_def: bool,
    accept_array_vars: bool,
) -> bool {
    let mut ok = true;
    while ok && is_assignment_or_redirect(b, mode, accept_array_vars) {
        ok = read_assignments_and_redirects(b, mark_as_var_def, mode, accept_array_vars);
    }
    ok
}

/// Read assignments and redirects in source order. In `Lax` mode bare
/// words are accepted as well.
///
/// Returns false if nothing was read or if an element was malformed.
pub fn read_assignments_and_redirects(
    b: &mut TreeBuilder<'_>,
    mark_as_var_def: bool,
    mode: AssignmentMode,
    accept_array_vars: bool,
) -> bool {
    let mut ok = false;
    loop {
        if is_assignment(b, mode, accept_array_vars) {
            ok = read_assignment(b, mode, mark_as_var_def, accept_array_vars);
        } else if redirect::is_redirect(b) {
            ok = redirect::parse_redirect(b);
        } else if mode == AssignmentMode::Lax && word::is_word_token(b) {
            ok = word::parse_word(b);
        } else {
            break;
        }
        if !ok || b.at_eof() {
            break;
        }
    }
    ok
}

/// Read a single assignment.
///
/// A successful assignment becomes a `VarDef` node when
/// `mark_as_var_def` is set; otherwise its tokens stay with the parent.
/// On failure the error is recorded at the offending token and the
/// cursor is left there.
pub fn read_assignment(
    b: &mut TreeBuilder<'_>,
    mode: AssignmentMode,
    mut mark_as_var_def: bool,
    accept_array_vars: bool,
) -> bool {
    let m = b.mark();
    let array_var =
        accept_array_vars && b.has_next_tokens(false, &[K::AssignmentWord, K::LeftSquare]);

    match mode {
        AssignmentMode::Simple => {
            if !array_var && !word::parse_word(b) {
                m.abandon(b);
                return false;
            }
        }
        AssignmentMode::Lax => {
            if b.at(K::AssignmentWord) {
                b.advance();
            } else if word::is_variable(b) {
                word::parse_variable(b);
            } else if !word::parse_word_until(b, TokenSet::new(&[K::Eq, K::AddEq])) {
                m.abandon(b);
                return false;
            }
        }
        AssignmentMode::Strict => {
            if b.options().eval_mode && b.has_next_tokens(false, &[K::Variable, K::Eq]) {
                // `$name=value`: the name is computed, nothing is defined
                mark_as_var_def = false;
                word::parse_variable(b);
            } else if b.at(K::AssignmentWord) {
                b.advance();
            } else {
                b.advance();
                m.error(b, ParseErrorKind::UnexpectedToken);
                return false;
            }
        }
    }

    if mode == AssignmentMode::Simple && array_var {
        b.advance();
        if !read_array_index(b) {
            m.abandon(b);
            return false;
        }
    }

    if mode != AssignmentMode::Simple {
        if !read_array_index(b) {
            m.abandon(b);
            return false;
        }

        let has_operator = b.is_adjacent() && (b.at(K::Eq) || b.at(K::AddEq));
        if !has_operator && mode == AssignmentMode::Strict {
            b.error(ParseErrorKind::MissingAssignmentOperator);
            m.abandon(b);
            return false;
        }

        if has_operator {
            b.advance();
            if b.current_raw() == Some(K::LeftParen) {
                if !parse_assignment_list(b) {
                    m.abandon(b);
                    return false;
                }
            } else if b.is_adjacent() && !b.at_any(VALUE_END) && word::is_word_token(b) {
                word::parse_word(b);
            }
        }
    }

    if mark_as_var_def {
        m.done(b, NodeKind::VarDef);
    } else {
        m.abandon(b);
    }
    true
}

/// Parse an array literal: `( value [index]=value ... )`.
///
/// Elements are separated by whitespace or newlines. A malformed index,
/// a missing `=` after an index, a non-word element or a missing `)`
/// records an error and drops the list node, leaving the consumed
/// tokens with the enclosing assignment.
pub fn parse_assignment_list(b: &mut TreeBuilder<'_>) -> bool {
    if b.current() != Some(K::LeftParen) {
        b.error(ParseErrorKind::InvalidAssignmentList);
        return false;
    }

    let list = b.mark();
    b.advance();

    while !b.at_eof() && !b.at(K::RightParen) {
        newlines(b);
        if b.at(K::RightParen) {
            break;
        }

        let element = b.mark();
        if b.at(K::LeftSquare) {
            if !read_array_index(b) {
                element.abandon(b);
                list.abandon(b);
                return false;
            }
            if !(b.is_adjacent() && b.at(K::Eq)) {
                b.error(ParseErrorKind::MissingAssignmentOperator);
                element.abandon(b);
                list.abandon(b);
                return false;
            }
            b.advance();
            if b.is_adjacent() && word::is_word_token(b) {
                word::parse_word(b);
            }
        } else if word::is_word_token(b) {
            word::parse_word(b);
        } else {
            b.error(ParseErrorKind::InvalidAssignmentValue);
            element.abandon(b);
            list.abandon(b);
            return false;
        }
        element.done(b, NodeKind::ArrayElement);

        let had_newlines = newlines(b);
        if !had_newlines && b.current_raw() != Some(K::Whitespace) {
            break;
        }
    }

    if !b.eat(K::RightParen) {
        b.error(ParseErrorKind::InvalidAssignmentList);
        list.abandon(b);
        return false;
    }
    list.done(b, NodeKind::AssignmentList);
    true
}

/// Parse an optional `[ expression ]` subscript at the cursor.
///
/// Returns true if there is none or if it is well-formed.
pub fn read_array_index(b: &mut TreeBuilder<'_>) -> bool {
    if !b.at(K::LeftSquare) {
        return true;
    }
    let m = b.mark();
    let ok = word::array_index(b);
    if !ok && !b.has_errors_since(&m) {
        b.error(ParseErrorKind::InvalidArrayIndex);
    }
    m.abandon(b);
    ok
}

/// Parse a simple command: prefix assignments and redirects, the
/// command word and its arguments.
///
/// Arguments of declaration builtins (`declare`, `local`, ...) are read
/// as `Lax` assignments, those of `read` as `Simple` ones, and `let`
/// takes arithmetic expressions.
pub fn parse_simple_command(b: &mut TreeBuilder<'_>) -> Option<CompletedMarker> {
    let m = b.mark();
    let start = b.position();

    if is_assignment_or_redirect(b, AssignmentMode::Strict, true) {
        read_optional_assignment_or_redirects(b, AssignmentMode::Strict, true, true);
    }

    if word::is_word_token(b) {
        let name = b.at(K::Word).then(|| b.current_text().map(str::to_owned)).flatten();
        let word = b.mark();
        word::parse_word(b);
        let single = word.consumed(b) == 1;
        word.abandon(b);

        match name.as_deref() {
            Some(name) if single && DECLARATION_BUILTINS.contains(&name) => {
                declaration_args(b);
            }
            Some("read") if single => read_args(b),
            Some("let") if single => let_args(b),
            _ => {}
        }
        read_command_params(b, TokenSet::new(&[]));
    }

    if b.position() == start {
        m.abandon(b);
        return None;
    }
    Some(m.done(b, NodeKind::SimpleCommand))
}

fn is_option_word(b: &TreeBuilder<'_>) -> bool {
    b.at(K::Word)
        && b.current_text()
            .is_some_and(|t| t.len() > 1 && (t.starts_with('-') || t.starts_with('+')))
}

/// `declare -x a=1 b`: options stay plain words, everything else is a
/// variable definition.
fn declaration_args(b: &mut TreeBuilder<'_>) {
    loop {
        let before = b.position();
        if is_option_word(b) {
            word::parse_word(b);
        } else if redirect::is_redirect(b) {
            redirect::parse_redirect(b);
        } else if is_assignment(b, AssignmentMode::Lax, true) {
            if !read_assignment(b, AssignmentMode::Lax, true, true) {
                break;
            }
        } else {
            break;
        }
        if b.position() == before {
            break;
        }
    }
}

/// `read -r -a names -p prompt var1 var2`
fn read_args(b: &mut TreeBuilder<'_>) {
    loop {
        let before = b.position();
        if is_option_word(b) {
            let takes = b
                .current_text()
                .and_then(|t| t.chars().last())
                .filter(|c| READ_PARAM_OPTIONS.contains(c));
            word::parse_word(b);
            match takes {
                Some('a') => {
                    if is_assignment(b, AssignmentMode::Simple, true) {
                        read_assignment(b, AssignmentMode::Simple, true, true);
                    }
                }
                Some(_) => {
                    word::parse_word(b);
                }
                None => {}
            }
        } else if redirect::is_redirect(b) {
            redirect::parse_redirect(b);
        } else if is_assignment(b, AssignmentMode::Simple, false) {
            if !read_assignment(b, AssignmentMode::Simple, true, false) {
                break;
            }
        } else {
            break;
        }
        if b.position() == before {
            break;
        }
    }
}

/// `let a=1 'b += 2'`: one arithmetic expression per argument.
fn let_args(b: &mut TreeBuilder<'_>) {
    while arithmetic::starts_operand(b) {
        let before = b.position();
        arithmetic::expression(b);
        if b.position() == before {
            break;
        }
    }
}
