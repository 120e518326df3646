//! Here-document terminator queue.

use std::collections::VecDeque;

/// A terminator the lexer expects to see on a later line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocMarker {
    /// Marker text as written after `<<`, quotes included.
    pub raw: String,
    /// Text a terminator line has to match.
    pub key: String,
    /// Quoted markers disable expansions in the body.
    pub quoted: bool,
    /// Declared with `<<-`: leading tabs are ignored when matching.
    pub strip_tabs: bool,
}

impl HeredocMarker {
    #[must_use]
    pub fn new(raw: &str, strip_tabs: bool) -> Self {
        let key = unquote(raw);
        Self {
            raw: raw.to_string(),
            quoted: key.len() != raw.len(),
            key,
            strip_tabs,
        }
    }

    /// Does `line` (without its newline) terminate this here-document?
    #[must_use]
    pub fn is_terminator(&self, line: &str) -> bool {
        let line = if self.strip_tabs {
            line.trim_start_matches('\t')
        } else {
            line
        };
        line == self.key
    }
}

/// FIFO of pending here-document markers.
///
/// Bodies appear in the order their operators were written, so the
/// front marker is always the one the next terminator line must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeredocQueue {
    markers: VecDeque<HeredocMarker>,
    evaluating: bool,
}

impl HeredocQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: &str, strip_tabs: bool) {
        tracing::trace!(marker = raw, strip_tabs, "expect heredoc marker");
        self.markers.push_back(HeredocMarker::new(raw, strip_tabs));
    }

    /// Pop the front marker if its key equals `key`.
    pub fn pop(&mut self, key: &str) -> Option<HeredocMarker> {
        if self.markers.front().is_some_and(|m| m.key == key) {
            tracing::trace!(marker = key, "heredoc marker closed");
            let marker = self.markers.pop_front();
            if self.markers.is_empty() {
                self.evaluating = false;
            }
            marker
        } else {
            None
        }
    }

    #[must_use]
    pub fn peek(&self) -> Option<&HeredocMarker> {
        self.markers.front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Does `line` terminate the here-document currently being read?
    #[must_use]
    pub fn is_end(&self, line: &str) -> bool {
        self.markers.front().is_some_and(|m| m.is_terminator(line))
    }

    /// True while body lines are being consumed.
    #[must_use]
    pub const fn is_evaluating(&self) -> bool {
        self.evaluating
    }

    pub const fn set_evaluating(&mut self, evaluating: bool) {
        self.evaluating = evaluating;
    }

    /// Drain every marker that never saw its terminator.
    pub fn drain_unterminated(&mut self) -> Vec<HeredocMarker> {
        self.evaluating = false;
        self.markers.drain(..).collect()
    }
}

/// Strip quoting and backslashes from a marker word.
///
/// `'EOF'`, `"EOF"`, `E"O"F` and `\EOF` all terminate on `EOF`.
#[must_use]
pub fn unquote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if !in_single => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' if !in_single && !in_double && chars.peek() == Some(&'\'') => {
                // $'EOF' quotes like 'EOF'
            }
            _ => out.push(c),
        }
    }

    out
}
