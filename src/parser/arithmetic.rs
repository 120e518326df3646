//! Arithmetic expressions: `$(( ))`, `(( ))`, `let`, array subscripts and
//! the clauses of `for (( ; ; ))`.
//!
//! Precedence climbs from the comma operator through assignment and the
//! ternary into the binary tiers of [`crate::arithmetic::TIERS`], then
//! prefix and postfix operators and finally operands. Every operation
//! node carries its folded value when all of its operands are constant.
//!
//! Each routine returns `None` only when it consumed nothing. Once an
//! operator is consumed a node is always built, with a recorded error if
//! its operand is missing.

use crate::arithmetic::{self as eval, Assoc, TIERS};
use crate::builder::{CompletedMarker, Marker, TreeBuilder};
use crate::parser::{ParseErrorKind, word};
use crate::token::{TokenKind as K, TokenSet};
use crate::tree::NodeKind;

const PREFIX_OPERATORS: TokenSet = TokenSet::new(&[
    K::ArithPlus,
    K::ArithMinus,
    K::ArithNot,
    K::ArithBitNot,
    K::ArithPlusPlus,
    K::ArithMinusMinus,
]);

const ASSIGNMENT_OPERATORS: TokenSet = TokenSet::new(&[K::ArithAssign, K::ArithAssignOp]);

/// A parsed operand and its constant value, if any.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub marker: CompletedMarker,
    pub value: Option<i64>,
}

fn finish(b: &mut TreeBuilder<'_>, m: Marker, kind: NodeKind, value: Option<i64>) -> Operand {
    Operand {
        marker: m.done(b, kind).set_value(b, value),
        value,
    }
}

fn is_name(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

/// Can an arithmetic operand start at the cursor?
#[must_use]
pub fn starts_operand(b: &TreeBuilder<'_>) -> bool {
    match b.current() {
        Some(K::Number | K::LeftParen) => true,
        Some(K::Word) => b.current_text().is_some_and(is_name),
        Some(kind) if PREFIX_OPERATORS.contains(kind) => true,
        Some(_) => word::is_word_token(b),
        None => false,
    }
}

/// Parse one complete expression into an `ArithmeticExpression` node.
pub fn expression(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let m = b.mark();
    match comma(b) {
        Some(inner) => Some(finish(b, m, NodeKind::ArithmeticExpression, inner.value)),
        None => {
            m.abandon(b);
            None
        }
    }
}

/// Parse an expression that runs up to a token of `close`, which is left
/// for the caller.
///
/// An empty expression is fine and has no value. Anything between the
/// expression and the closer is wrapped in an `Error` node. Returns
/// whether the expression was well formed, and its value.
pub fn expression_until(b: &mut TreeBuilder<'_>, close: TokenSet) -> (bool, Option<i64>) {
    let m = b.mark();
    let inner = comma(b);
    let mut value = inner.and_then(|operand| operand.value);

    if !b.at_eof() && !b.at_any(close) {
        let junk = b.mark();
        while !b.at_eof() && !b.at_any(close) {
            b.advance();
        }
        if b.has_errors_since(&m) {
            junk.done(b, NodeKind::Error);
        } else {
            junk.error(b, ParseErrorKind::InvalidArithmetic);
        }
        value = None;
    } else if inner.is_none() {
        m.abandon(b);
        return (true, None);
    }

    let ok = !b.has_errors_since(&m);
    m.done(b, NodeKind::ArithmeticExpression).set_value(b, value);
    (ok, value)
}

/// Deepest nesting of parentheses, ternaries, assignments and nested
/// expansions parsed before the rest of a group is skipped.
pub const MAX_NESTING: usize = 256;

/// Run `f` one nesting level deeper.
fn nested<'a>(
    b: &mut TreeBuilder<'a>,
    f: impl FnOnce(&mut TreeBuilder<'a>) -> Option<Operand>,
) -> Option<Operand> {
    if b.nesting() >= MAX_NESTING {
        return Some(too_deep(b));
    }
    b.enter_nested();
    let operand = f(b);
    b.leave_nested();
    operand
}

/// Skip to the end of the current group and wrap it in an `Error` node.
fn too_deep(b: &mut TreeBuilder<'_>) -> Operand {
    let m = b.mark();
    let mut depth = 0usize;
    while let Some(kind) = b.current() {
        match kind {
            K::LeftParen | K::ExprArithStart => depth += 1,
            K::RightParen | K::ExprArithEnd if depth > 0 => depth -= 1,
            K::RightParen | K::ExprArithEnd | K::RightSquare | K::Semi => break,
            _ => {}
        }
        b.advance();
    }
    Operand {
        marker: m.error(b, ParseErrorKind::InvalidArithmetic),
        value: None,
    }
}

fn missing_operand(b: &mut TreeBuilder<'_>) {
    b.error(ParseErrorKind::InvalidArithmetic);
}

fn comma(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let mut lhs = assignment(b)?;
    while b.at(K::ArithComma) {
        let m = lhs.marker.precede(b);
        b.advance();
        let value = match assignment(b) {
            Some(rhs) => rhs.value,
            None => {
                missing_operand(b);
                None
            }
        };
        lhs = finish(b, m, NodeKind::ArithComma, value);
    }
    Some(lhs)
}

fn assignment(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let lhs = ternary(b)?;
    if !b.at_any(ASSIGNMENT_OPERATORS) {
        return Some(lhs);
    }
    if !matches!(lhs.marker.kind(), NodeKind::ArithVariable | NodeKind::Word) {
        b.error(ParseErrorKind::InvalidArithmetic);
    }
    let m = lhs.marker.precede(b);
    b.advance();
    if nested(b, assignment).is_none() {
        missing_operand(b);
    }
    Some(finish(b, m, NodeKind::ArithAssignment, None))
}

fn ternary(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let condition = binary(b, 0)?;
    if !b.at(K::ArithQuestion) {
        return Some(condition);
    }
    let m = condition.marker.precede(b);
    b.advance();

    let then = nested(b, comma);
    if then.is_none() {
        missing_operand(b);
    }
    let otherwise = if b.expect(K::ArithColon) {
        let otherwise = nested(b, ternary);
        if otherwise.is_none() {
            missing_operand(b);
        }
        otherwise
    } else {
        None
    };

    let value = match (condition.value, then, otherwise) {
        (Some(0), Some(_), Some(otherwise)) => otherwise.value,
        (Some(_), Some(then), Some(_)) => then.value,
        _ => None,
    };
    Some(finish(b, m, NodeKind::ArithTernary, value))
}

/// Binary operators of `TIERS[min_level]` and tighter, by precedence
/// climbing: one call per operator, not per tier.
fn binary(b: &mut TreeBuilder<'_>, min_level: usize) -> Option<Operand> {
    let mut lhs = unary(b)?;
    while let Some((level, tier, op)) = b.current().and_then(|op| {
        TIERS
            .iter()
            .enumerate()
            .skip(min_level)
            .find(|(_, tier)| tier.accepts(op))
            .map(|(level, tier)| (level, tier, op))
    }) {
        let m = lhs.marker.precede(b);
        b.advance();
        let rhs = match tier.assoc {
            Assoc::Left => binary(b, level + 1),
            Assoc::Right => nested(b, |b| binary(b, level)),
        };
        let value = match rhs {
            Some(rhs) => lhs
                .value
                .zip(rhs.value)
                .and_then(|(l, r)| (tier.compute)(l, op, r)),
            None => {
                missing_operand(b);
                None
            }
        };
        lhs = finish(b, m, tier.node, value);
    }
    Some(lhs)
}

/// Prefix operators, innermost applied first.
fn unary(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let mut prefixes = Vec::new();
    let mut skipped = None;
    while let Some(op) = b.current().filter(|kind| PREFIX_OPERATORS.contains(*kind)) {
        if b.nesting() + prefixes.len() >= MAX_NESTING {
            skipped = Some(too_deep(b));
            break;
        }
        prefixes.push((b.mark(), op));
        b.advance();
    }
    let mut operand = skipped.or_else(|| postfix(b));
    if operand.is_none() && !prefixes.is_empty() {
        missing_operand(b);
    }
    while let Some((m, op)) = prefixes.pop() {
        let value = operand
            .and_then(|operand| operand.value)
            .and_then(|v| eval::unary(op, v));
        operand = Some(finish(b, m, NodeKind::ArithUnary, value));
    }
    operand
}

fn postfix(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    let operand = primary(b)?;
    if operand.marker.kind() == NodeKind::ArithVariable
        && matches!(b.current(), Some(K::ArithPlusPlus | K::ArithMinusMinus))
    {
        let m = operand.marker.precede(b);
        b.advance();
        return Some(finish(b, m, NodeKind::ArithPostfix, None));
    }
    Some(operand)
}

fn primary(b: &mut TreeBuilder<'_>) -> Option<Operand> {
    match b.current()? {
        K::Number => {
            let value = b.current_text().and_then(eval::parse_number);
            let m = b.mark();
            b.advance();
            Some(finish(b, m, NodeKind::ArithLiteral, value))
        }
        K::Word if b.current_text().is_some_and(is_name) => {
            let m = b.mark();
            b.advance();
            if b.is_adjacent() && b.at(K::LeftSquare) {
                if b.nesting() >= MAX_NESTING {
                    too_deep(b);
                } else {
                    b.enter_nested();
                    word::array_index(b);
                    b.leave_nested();
                }
            }
            Some(finish(b, m, NodeKind::ArithVariable, None))
        }
        K::Word => None,
        K::LeftParen => {
            let m = b.mark();
            b.advance();
            let inner = nested(b, comma);
            if inner.is_none() {
                missing_operand(b);
            }
            let closed = b.expect(K::RightParen);
            let value = inner.and_then(|operand| operand.value).filter(|_| closed);
            Some(finish(b, m, NodeKind::ArithParenthesized, value))
        }
        _ => nested(b, |b| {
            word::word(b).map(|marker| Operand {
                marker,
                value: None,
            })
        }),
    }
}
