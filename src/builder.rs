//! Token cursor and tree construction primitives used by the parser.
//!
//! Parser routines open nodes with [`TreeBuilder::mark`] and close them
//! with [`Marker::done`], [`Marker::abandon`], [`Marker::rollback`] or
//! [`Marker::error`]. Nodes are recorded as a flat event list and only
//! assembled into a [`Node`] tree by [`TreeBuilder::finish`], so a
//! marker can be discarded or wrapped ([`CompletedMarker::precede`])
//! after the fact without moving anything.

use crate::config::ParseOptions;
use crate::parser::{ParseError, ParseErrorKind};
use crate::token::{Position, Span, Token, TokenKind, TokenSet};
use crate::tree::{Element, Node, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    /// Opens a node. `kind` is `None` for abandoned markers.
    /// `forward_parent` is the distance to the `Start` of a node that
    /// was later wrapped around this one.
    Start {
        kind: Option<NodeKind>,
        forward_parent: Option<usize>,
        value: Option<i64>,
    },
    Finish,
    Token(usize),
}

impl Event {
    const fn tombstone() -> Self {
        Self::Start {
            kind: None,
            forward_parent: None,
            value: None,
        }
    }
}

/// Cursor over a token stream that records the shape of the tree.
///
/// The significant view (`current`, `nth`, `at`) skips whitespace,
/// comments and line continuations; the raw view (`current_raw`,
/// `nth_raw`) does not, because adjacency decides word boundaries.
/// Trivia is never lost: it is attached to whichever node is open when
/// the next token is consumed.
pub struct TreeBuilder<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    events: Vec<Event>,
    errors: Vec<ParseError>,
    options: ParseOptions,
    pending_heredocs: usize,
    in_backquote: bool,
    nesting: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Start building a tree for `tokens`, lexed from `source`.
    #[must_use]
    pub fn new(source: &'a str, tokens: Vec<Token>, options: &ParseOptions) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            events: vec![Event::Start {
                kind: Some(NodeKind::File),
                forward_parent: None,
                value: None,
            }],
            errors: Vec::new(),
            options: *options,
            pending_heredocs: 0,
            in_backquote: false,
            nesting: 0,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ParseOptions {
        &self.options
    }

    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.source
    }

    // -- lookahead --

    fn significant_index(&self, n: usize) -> Option<usize> {
        self.tokens
            .iter()
            .enumerate()
            .skip(self.pos)
            .filter(|(_, t)| !t.kind.is_trivia())
            .nth(n)
            .map(|(i, _)| i)
    }

    /// Kind of the current significant token.
    #[must_use]
    pub fn current(&self) -> Option<TokenKind> {
        self.nth(0)
    }

    #[must_use]
    pub fn current_token(&self) -> Option<&Token> {
        self.significant_index(0).map(|i| &self.tokens[i])
    }

    #[must_use]
    pub fn current_text(&self) -> Option<&str> {
        self.current_token().map(|t| t.text.as_str())
    }

    /// Kind of the `n`th significant token ahead.
    #[must_use]
    pub fn nth(&self, n: usize) -> Option<TokenKind> {
        self.significant_index(n).map(|i| self.tokens[i].kind)
    }

    /// Text of the `n`th significant token ahead.
    #[must_use]
    pub fn nth_text(&self, n: usize) -> Option<&str> {
        self.significant_index(n).map(|i| self.tokens[i].text.as_str())
    }

    /// Kind of the token at the cursor, trivia included.
    #[must_use]
    pub fn current_raw(&self) -> Option<TokenKind> {
        self.nth_raw(0)
    }

    #[must_use]
    pub fn nth_raw(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    /// Does the next token follow the previous one without trivia?
    #[must_use]
    pub fn is_adjacent(&self) -> bool {
        self.current_raw().is_some_and(|k| !k.is_trivia())
    }

    #[must_use]
    pub fn at(&self, kind: TokenKind) -> bool {
        self.current() == Some(kind)
    }

    #[must_use]
    pub fn at_any(&self, set: TokenSet) -> bool {
        self.current().is_some_and(|k| set.contains(k))
    }

    #[must_use]
    pub fn at_eof(&self) -> bool {
        self.current().is_none()
    }

    /// Is the current significant token the word `text`?
    #[must_use]
    pub fn at_word(&self, text: &str) -> bool {
        self.at(TokenKind::Word) && self.current_text() == Some(text)
    }

    /// Do the upcoming tokens have exactly the kinds in `kinds`?
    ///
    /// The first kind is matched against the current significant token.
    /// Later kinds must follow without trivia unless `skip_whitespace`.
    #[must_use]
    pub fn has_next_tokens(&self, skip_whitespace: bool, kinds: &[TokenKind]) -> bool {
        let Some(mut index) = self.significant_index(0) else {
            return kinds.is_empty();
        };
        for (i, kind) in kinds.iter().enumerate() {
            if i > 0 {
                index += 1;
                if skip_whitespace {
                    while self.tokens.get(index).is_some_and(|t| t.kind.is_trivia()) {
                        index += 1;
                    }
                }
            }
            if self.tokens.get(index).map(|t| t.kind) != Some(*kind) {
                return false;
            }
        }
        true
    }

    // -- consuming --

    fn push_token(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            if token.kind == TokenKind::HeredocMarkerStart {
                self.pending_heredocs += 1;
            }
            self.events.push(Event::Token(self.pos));
            self.pos += 1;
        }
    }

    /// Attach the trivia at the cursor to the currently open node.
    fn flush_trivia(&mut self) {
        while self.current_raw().is_some_and(TokenKind::is_trivia) {
            self.push_token();
        }
    }

    /// Consume the current significant token and the trivia before it.
    pub fn advance(&mut self) {
        self.flush_trivia();
        self.push_token();
    }

    /// Consume exactly one token, trivia or not.
    pub fn advance_raw(&mut self) {
        self.push_token();
    }

    /// Consume the current token if it has `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind`, or record an error.
    pub fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let error = if kind.is_keyword() {
            ParseErrorKind::ExpectedKeyword(kind.describe().trim_matches('\''))
        } else {
            ParseErrorKind::ExpectedToken(kind)
        };
        self.error(error);
        false
    }

    // -- errors --

    /// Span of the current significant token, or the end of the input.
    #[must_use]
    pub fn current_span(&self) -> Span {
        self.current_token()
            .map_or_else(|| Span::empty(self.source.len()), |t| t.span)
    }

    /// Record an error at the current token.
    pub fn error(&mut self, kind: ParseErrorKind) {
        let span = self.current_span();
        self.error_at(kind, span);
    }

    pub fn error_at(&mut self, kind: ParseErrorKind, span: Span) {
        tracing::debug!(%kind, offset = span.start, "parse error");
        let position = Position::locate(self.source, span.start);
        self.errors.push(ParseError {
            kind,
            span,
            position,
        });
    }

    /// Record an error and wrap the current token in an `Error` node.
    ///
    /// Newlines are left in place so that the caller can resynchronise
    /// on the next line.
    pub fn error_and_advance(&mut self, kind: ParseErrorKind) {
        if self.at_eof() || self.at(TokenKind::LineFeed) {
            self.error(kind);
            return;
        }
        let m = self.mark();
        self.advance();
        m.error(self, kind);
    }

    /// Has an error been recorded since `marker` was opened?
    #[must_use]
    pub fn has_errors_since(&self, marker: &Marker) -> bool {
        self.errors.len() > marker.error_count
    }

    /// Raw index of the cursor, for progress checks.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Is a `` ` `` at the cursor the end of an enclosing backquote
    /// command rather than the start of a nested one?
    #[must_use]
    pub const fn in_backquote(&self) -> bool {
        self.in_backquote
    }

    /// Set the backquote context, returning the previous one.
    pub const fn set_in_backquote(&mut self, in_backquote: bool) -> bool {
        let outer = self.in_backquote;
        self.in_backquote = in_backquote;
        outer
    }

    // -- nesting --

    /// Current depth of nested arithmetic sub-expressions.
    #[must_use]
    pub const fn nesting(&self) -> usize {
        self.nesting
    }

    pub const fn enter_nested(&mut self) {
        self.nesting += 1;
    }

    pub const fn leave_nested(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    // -- here-documents --

    /// Here-document bodies announced by a marker but not yet parsed.
    #[must_use]
    pub const fn pending_heredocs(&self) -> usize {
        self.pending_heredocs
    }

    pub const fn close_heredoc(&mut self) {
        self.pending_heredocs = self.pending_heredocs.saturating_sub(1);
    }

    // -- nodes --

    /// Open a node at the current significant token.
    pub fn mark(&mut self) -> Marker {
        self.flush_trivia();
        let pos = self.events.len();
        self.events.push(Event::tombstone());
        Marker {
            pos,
            token_pos: self.pos,
            error_count: self.errors.len(),
            pending_heredocs: self.pending_heredocs,
        }
    }

    /// Assemble the tree. Tokens not yet consumed go to the root node.
    #[must_use]
    pub fn finish(mut self) -> SyntaxTree {
        while self.pos < self.tokens.len() {
            self.push_token();
        }
        self.events.push(Event::Finish);
        let root = self.build();
        let mut errors = self.errors;
        errors.sort_by_key(|e| e.span.start);
        SyntaxTree { root, errors }
    }

    fn build(&mut self) -> Node {
        let mut events = std::mem::take(&mut self.events);
        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;
        let mut parents: Vec<(NodeKind, Option<i64>)> = Vec::new();
        let mut end = 0;

        for i in 0..events.len() {
            match std::mem::replace(&mut events[i], Event::tombstone()) {
                Event::Start {
                    kind,
                    forward_parent,
                    value,
                } => {
                    if let Some(kind) = kind {
                        parents.push((kind, value));
                    }
                    let mut index = i;
                    let mut forward = forward_parent;
                    while let Some(distance) = forward {
                        index += distance;
                        forward = match std::mem::replace(&mut events[index], Event::tombstone()) {
                            Event::Start {
                                kind,
                                forward_parent,
                                value,
                            } => {
                                if let Some(kind) = kind {
                                    parents.push((kind, value));
                                }
                                forward_parent
                            }
                            _ => None,
                        };
                    }
                    for (kind, value) in parents.drain(..).rev() {
                        let mut node = Node::new(kind, Span::empty(end));
                        node.value = value;
                        stack.push(node);
                    }
                }
                Event::Finish => {
                    if let Some(mut node) = stack.pop() {
                        node.span = children_span(&node.children).unwrap_or(Span::empty(end));
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Element::Node(node)),
                            None => root = Some(node),
                        }
                    }
                }
                Event::Token(index) => {
                    let token = self.tokens[index].clone();
                    end = token.span.end;
                    if let Some(node) = stack.last_mut() {
                        node.children.push(Element::Token(token));
                    }
                }
            }
        }

        // unbalanced markers: close whatever is still open
        while let Some(mut node) = stack.pop() {
            node.span = children_span(&node.children).unwrap_or(Span::empty(end));
            match stack.last_mut() {
                Some(parent) => parent.children.push(Element::Node(node)),
                None => root = Some(node),
            }
        }
        root.unwrap_or_else(|| Node::new(NodeKind::File, Span::empty(0)))
    }
}

fn children_span(children: &[Element]) -> Option<Span> {
    let first = children.first()?.span();
    let last = children.last()?.span();
    Some(Span::new(first.start, last.end))
}

/// An open node.
#[derive(Debug)]
#[must_use = "a marker must be completed, abandoned or rolled back"]
pub struct Marker {
    pos: usize,
    token_pos: usize,
    error_count: usize,
    pending_heredocs: usize,
}

impl Marker {
    /// Close the node as `kind`.
    pub fn done(self, b: &mut TreeBuilder<'_>, kind: NodeKind) -> CompletedMarker {
        if let Event::Start { kind: slot, .. } = &mut b.events[self.pos] {
            *slot = Some(kind);
        }
        b.events.push(Event::Finish);
        CompletedMarker {
            pos: self.pos,
            kind,
        }
    }

    /// Drop the node. Tokens consumed since `mark` stay with the parent
    /// and the cursor does not move.
    pub fn abandon(self, b: &mut TreeBuilder<'_>) {
        if self.pos == b.events.len() - 1 {
            b.events.pop();
        } else if let Event::Start { kind, .. } = &mut b.events[self.pos] {
            *kind = None;
        }
    }

    /// Drop the node and everything recorded since `mark`, rewinding the
    /// cursor to where the node began.
    pub fn rollback(self, b: &mut TreeBuilder<'_>) {
        b.events.truncate(self.pos);
        b.errors.truncate(self.error_count);
        b.pos = self.token_pos;
        b.pending_heredocs = self.pending_heredocs;
    }

    /// Close the node as an `Error` node and record `kind` at its start.
    pub fn error(self, b: &mut TreeBuilder<'_>, kind: ParseErrorKind) -> CompletedMarker {
        let span = if self.token_pos < b.pos {
            b.tokens[self.token_pos].span
        } else {
            b.current_span()
        };
        b.error_at(kind, span);
        self.done(b, NodeKind::Error)
    }

    /// Number of tokens consumed since `mark`.
    #[must_use]
    pub const fn consumed(&self, b: &TreeBuilder<'_>) -> usize {
        b.pos - self.token_pos
    }
}

/// A closed node that can still be wrapped or annotated.
#[derive(Debug, Clone, Copy)]
pub struct CompletedMarker {
    pos: usize,
    kind: NodeKind,
}

impl CompletedMarker {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Open a new node that will contain this one as its first child.
    pub fn precede(self, b: &mut TreeBuilder<'_>) -> Marker {
        let pos = b.events.len();
        b.events.push(Event::tombstone());
        if let Event::Start { forward_parent, .. } = &mut b.events[self.pos] {
            *forward_parent = Some(pos - self.pos);
        }
        Marker {
            pos,
            token_pos: b.pos,
            error_count: b.errors.len(),
            pending_heredocs: b.pending_heredocs,
        }
    }

    /// Attach a folded arithmetic value to the node.
    pub fn set_value(self, b: &mut TreeBuilder<'_>, value: Option<i64>) -> Self {
        if let Event::Start { value: slot, .. } = &mut b.events[self.pos] {
            *slot = value;
        }
        self
    }
}
