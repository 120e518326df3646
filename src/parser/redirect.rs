//! Redirects: `>file`, `2>&1`, `<<<word`, `<<EOF`.

use crate::builder::TreeBuilder;
use crate::parser::{ParseErrorKind, word};
use crate::token::{REDIRECTS, TokenKind as K};
use crate::tree::NodeKind;

/// Does a redirect start at the cursor, with or without a file
/// descriptor prefix?
#[must_use]
pub fn is_redirect(b: &TreeBuilder<'_>) -> bool {
    if b.at_any(REDIRECTS) {
        return true;
    }
    b.at(K::FileDescriptor)
        && REDIRECTS
            .kinds()
            .iter()
            .any(|op| b.has_next_tokens(false, &[K::FileDescriptor, *op]))
}

/// Parse one redirect. Returns false if the target is missing.
pub fn parse_redirect(b: &mut TreeBuilder<'_>) -> bool {
    let m = b.mark();
    b.eat(K::FileDescriptor);
    let Some(op) = b.current() else {
        m.abandon(b);
        return false;
    };
    b.advance();

    let ok = match op {
        K::HeredocOperator | K::HeredocOperatorStrip => {
            if b.eat(K::HeredocMarkerStart) {
                true
            } else {
                b.error(ParseErrorKind::ExpectedHeredocMarker);
                false
            }
        }
        K::RedirectDupOut | K::RedirectDupIn if b.at(K::FileDescriptor) => {
            b.advance();
            true
        }
        _ => {
            if word::parse_word(b) {
                true
            } else {
                b.error(ParseErrorKind::ExpectedRedirectTarget);
                false
            }
        }
    };
    m.done(b, NodeKind::Redirect);
    ok
}

/// Parse consecutive redirects. Returns false if any was malformed.
pub fn parse_redirect_list(b: &mut TreeBuilder<'_>) -> bool {
    let mut ok = true;
    while is_redirect(b) {
        ok &= parse_redirect(b);
    }
    ok
}
