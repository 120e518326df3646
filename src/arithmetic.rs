//! Integer semantics of arithmetic expressions.
//!
//! Binary operators are grouped into precedence tiers. Each [`Tier`]
//! knows its own operators and a `compute` function that folds two known
//! operands, or declines with `None` for anything it does not handle
//! (an unknown operator, division by zero, a negative exponent). The
//! parser walks [`TIERS`] in order, so adding a precedence level is a
//! matter of inserting a row.
//!
//! Values are 64-bit and wrap on overflow.

use crate::token::TokenKind as K;
use crate::tree::{Node, NodeKind};

/// Associativity of a binary tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// One precedence level of binary operators.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    /// Node built for an operation of this tier.
    pub node: NodeKind,
    pub operators: &'static [K],
    pub assoc: Assoc,
    /// Fold `lhs op rhs`, or decline.
    pub compute: fn(i64, K, i64) -> Option<i64>,
}

impl Tier {
    #[must_use]
    pub fn accepts(&self, op: K) -> bool {
        self.operators.contains(&op)
    }
}

/// Binary tiers, loosest binding first.
pub const TIERS: &[Tier] = &[
    Tier {
        node: NodeKind::ArithLogicalOr,
        operators: &[K::ArithOr],
        assoc: Assoc::Left,
        compute: logical_or,
    },
    Tier {
        node: NodeKind::ArithLogicalAnd,
        operators: &[K::ArithAnd],
        assoc: Assoc::Left,
        compute: logical_and,
    },
    Tier {
        node: NodeKind::ArithBitwiseOr,
        operators: &[K::ArithBitOr],
        assoc: Assoc::Left,
        compute: bitwise_or,
    },
    Tier {
        node: NodeKind::ArithBitwiseXor,
        operators: &[K::ArithBitXor],
        assoc: Assoc::Left,
        compute: bitwise_xor,
    },
    Tier {
        node: NodeKind::ArithBitwiseAnd,
        operators: &[K::ArithBitAnd],
        assoc: Assoc::Left,
        compute: bitwise_and,
    },
    Tier {
        node: NodeKind::ArithEquality,
        operators: &[K::ArithEqEq, K::ArithNe],
        assoc: Assoc::Left,
        compute: equality,
    },
    Tier {
        node: NodeKind::ArithComparison,
        operators: &[K::ArithLt, K::ArithGt, K::ArithLe, K::ArithGe],
        assoc: Assoc::Left,
        compute: comparison,
    },
    Tier {
        node: NodeKind::ArithShift,
        operators: &[K::ArithShiftLeft, K::ArithShiftRight],
        assoc: Assoc::Left,
        compute: shift,
    },
    Tier {
        node: NodeKind::ArithAdditive,
        operators: &[K::ArithPlus, K::ArithMinus],
        assoc: Assoc::Left,
        compute: additive,
    },
    Tier {
        node: NodeKind::ArithMultiplicative,
        operators: &[K::ArithMult, K::ArithDiv, K::ArithMod],
        assoc: Assoc::Left,
        compute: multiplicative,
    },
    Tier {
        node: NodeKind::ArithExponent,
        operators: &[K::ArithExp],
        assoc: Assoc::Right,
        compute: exponent,
    },
];

/// Tier that builds nodes of `kind`.
#[must_use]
pub fn tier_for(kind: NodeKind) -> Option<&'static Tier> {
    TIERS.iter().find(|tier| tier.node == kind)
}

fn truth(value: bool) -> i64 {
    i64::from(value)
}

fn logical_or(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    (op == K::ArithOr).then(|| truth(lhs != 0 || rhs != 0))
}

fn logical_and(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    (op == K::ArithAnd).then(|| truth(lhs != 0 && rhs != 0))
}

fn bitwise_or(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    (op == K::ArithBitOr).then_some(lhs | rhs)
}

fn bitwise_xor(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    (op == K::ArithBitXor).then_some(lhs ^ rhs)
}

fn bitwise_and(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    (op == K::ArithBitAnd).then_some(lhs & rhs)
}

fn equality(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    match op {
        K::ArithEqEq => Some(truth(lhs == rhs)),
        K::ArithNe => Some(truth(lhs != rhs)),
        _ => None,
    }
}

fn comparison(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    match op {
        K::ArithLt => Some(truth(lhs < rhs)),
        K::ArithGt => Some(truth(lhs > rhs)),
        K::ArithLe => Some(truth(lhs <= rhs)),
        K::ArithGe => Some(truth(lhs >= rhs)),
        _ => None,
    }
}

fn shift(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    // shift counts are taken modulo the word size
    let count = u32::try_from(rhs.rem_euclid(64)).ok()?;
    match op {
        K::ArithShiftLeft => Some(lhs.wrapping_shl(count)),
        K::ArithShiftRight => Some(lhs.wrapping_shr(count)),
        _ => None,
    }
}

fn additive(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    match op {
        K::ArithPlus => Some(lhs.wrapping_add(rhs)),
        K::ArithMinus => Some(lhs.wrapping_sub(rhs)),
        _ => None,
    }
}

fn multiplicative(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    match op {
        K::ArithMult => Some(lhs.wrapping_mul(rhs)),
        K::ArithDiv if rhs != 0 => Some(lhs.wrapping_div(rhs)),
        K::ArithMod if rhs != 0 => Some(lhs.wrapping_rem(rhs)),
        _ => None,
    }
}

fn exponent(lhs: i64, op: K, rhs: i64) -> Option<i64> {
    if op != K::ArithExp {
        return None;
    }
    u32::try_from(rhs).ok().map(|exp| lhs.wrapping_pow(exp))
}

/// Fold a prefix operator. Increments and decrements never fold.
#[must_use]
pub fn unary(op: K, value: i64) -> Option<i64> {
    match op {
        K::ArithPlus => Some(value),
        K::ArithMinus => Some(value.wrapping_neg()),
        K::ArithNot => Some(truth(value == 0)),
        K::ArithBitNot => Some(!value),
        _ => None,
    }
}

/// Value of a numeric literal: decimal, `0x` hex, leading-`0` octal or
/// `base#digits` with a base from 2 to 64.
///
/// Returns `None` for digits outside the base.
#[must_use]
pub fn parse_number(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return accumulate(hex, 16);
    }
    if let Some((base, digits)) = text.split_once('#') {
        let base: u32 = base.parse().ok()?;
        if !(2..=64).contains(&base) {
            return None;
        }
        return accumulate(digits, base);
    }
    match text.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => accumulate(octal, 8),
        _ => accumulate(text, 10),
    }
}

fn digit_value(c: char, base: u32) -> Option<u32> {
    let value = match c {
        '0'..='9' => u32::from(c) - u32::from('0'),
        'a'..='z' => u32::from(c) - u32::from('a') + 10,
        // upper case letters only get their own values above base 36
        'A'..='Z' if base > 36 => u32::from(c) - u32::from('A') + 36,
        'A'..='Z' => u32::from(c) - u32::from('A') + 10,
        '@' => 62,
        '_' => 63,
        _ => return None,
    };
    (value < base).then_some(value)
}

fn accumulate(digits: &str, base: u32) -> Option<i64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0i64, |acc, c| {
        let digit = digit_value(c, base)?;
        Some(
            acc.wrapping_mul(i64::from(base))
                .wrapping_add(i64::from(digit)),
        )
    })
}

/// Recompute the constant value of an already built node.
///
/// Gives the same answer the parser attached to the node while building
/// it; nodes that do not fold (variables, assignments, increments,
/// expansions) give `None`.
#[must_use]
pub fn evaluate(node: &Node) -> Option<i64> {
    match node.kind {
        NodeKind::ArithLiteral => node
            .significant_tokens()
            .next()
            .and_then(|t| parse_number(&t.text)),
        NodeKind::ArithmeticExpression => only_child(node).and_then(evaluate),
        NodeKind::ArrayIndex | NodeKind::ArithmeticExpansion | NodeKind::ArithmeticCommand => node
            .child(NodeKind::ArithmeticExpression)
            .and_then(evaluate),
        NodeKind::ArithParenthesized if node.has_token(K::RightParen) => {
            only_child(node).and_then(evaluate)
        }
        NodeKind::ArithUnary => {
            let op = node.significant_tokens().next()?.kind;
            unary(op, only_child(node).and_then(evaluate)?)
        }
        NodeKind::ArithComma => {
            let [_, last] = operands::<2>(node)?;
            evaluate(last)
        }
        NodeKind::ArithTernary => {
            let [condition, then, otherwise] = operands::<3>(node)?;
            if evaluate(condition)? == 0 {
                evaluate(otherwise)
            } else {
                evaluate(then)
            }
        }
        kind => {
            let tier = tier_for(kind)?;
            let [lhs, rhs] = operands::<2>(node)?;
            let op = node
                .significant_tokens()
                .map(|t| t.kind)
                .find(|k| tier.accepts(*k))?;
            (tier.compute)(evaluate(lhs)?, op, evaluate(rhs)?)
        }
    }
}

fn only_child(node: &Node) -> Option<&Node> {
    let [child] = operands::<1>(node)?;
    Some(child)
}

/// The child nodes of `node`, if there are exactly `N` of them.
fn operands<const N: usize>(node: &Node) -> Option<[&Node; N]> {
    let children: Vec<&Node> = node.child_nodes().collect();
    children.try_into().ok()
}
