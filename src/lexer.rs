//! Mode-aware shell tokenizer.
//!
//! The lexer never fails: every byte of the input ends up in exactly one
//! token, and constructs left open at the end of the input are reported
//! as [`LexError`]s next to the token stream.

mod heredoc;
mod state;

use std::fmt;

pub use heredoc::{HeredocMarker, HeredocQueue, unquote};
pub use state::{LexerState, Mode, ParamExpansionFlags};

use crate::config::ParseOptions;
use crate::token::{Position, Span, Token, TokenKind as K};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Unterminated single- or double-quoted string.
    UnterminatedString,
    /// Unterminated backquote command substitution.
    UnterminatedBackquote,
    /// Unterminated `$( )`, `${ }`, `$(( ))` or `[ ]`.
    UnterminatedExpansion,
    /// A here-document whose terminator line never appeared.
    UnterminatedHeredoc { marker: String },
    /// `<<` not followed by a marker word.
    EmptyHeredocMarker,
}

impl LexErrorKind {
    /// Stable identifier of the message, independent of its wording.
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::UnterminatedString => "lexer.unterminated.string",
            Self::UnterminatedBackquote => "lexer.unterminated.backquote",
            Self::UnterminatedExpansion => "lexer.unterminated.expansion",
            Self::UnterminatedHeredoc { .. } => "lexer.unterminated.heredoc",
            Self::EmptyHeredocMarker => "lexer.heredoc.marker.empty",
        }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => {
                write!(f, "unterminated quoted string")
            }
            Self::UnterminatedBackquote => {
                write!(f, "unterminated backquote")
            }
            Self::UnterminatedExpansion => {
                write!(f, "unterminated expansion")
            }
            Self::UnterminatedHeredoc { marker } => {
                write!(
                    f,
                    "unterminated here-document, \
                     expected closing marker: {marker}"
                )
            }
            Self::EmptyHeredocMarker => {
                write!(f, "empty here-document marker")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub position: Position,
}

/// Tokens of a complete input plus the lexical errors found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexOutput {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Tokenize a shell script with the default (extended) dialect.
#[must_use]
pub fn tokenize(input: &str) -> LexOutput {
    tokenize_with(input, &ParseOptions::default())
}

/// Tokenize a shell script.
///
/// Lexing always runs to the end of the input; problems are collected
/// in [`LexOutput::errors`], sorted by offset.
#[must_use]
pub fn tokenize_with(input: &str, options: &ParseOptions) -> LexOutput {
    let mut lexer = Lexer::new(input, options);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    let mut errors = lexer.into_errors();
    errors.sort_by_key(|e| e.span.start);
    tracing::debug!(
        tokens = tokens.len(),
        errors = errors.len(),
        "tokenized input"
    );
    LexOutput { tokens, errors }
}

/// Tokenize a shell script, failing on the first lexical error.
///
/// # Errors
///
/// Returns the first `LexError` by offset: unterminated strings,
/// expansions or here-documents, and empty here-document markers.
pub fn tokenize_strict(input: &str) -> Result<Vec<Token>, LexError> {
    let output = tokenize(input);
    match output.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(output.tokens),
    }
}

/// Arithmetic operators, longest first.
const ARITH_OPERATORS: &[(&str, K)] = &[
    ("<<=", K::ArithAssignOp),
    (">>=", K::ArithAssignOp),
    ("**", K::ArithExp),
    ("++", K::ArithPlusPlus),
    ("--", K::ArithMinusMinus),
    ("<<", K::ArithShiftLeft),
    (">>", K::ArithShiftRight),
    ("<=", K::ArithLe),
    (">=", K::ArithGe),
    ("==", K::ArithEqEq),
    ("!=", K::ArithNe),
    ("&&", K::ArithAnd),
    ("||", K::ArithOr),
    ("+=", K::ArithAssignOp),
    ("-=", K::ArithAssignOp),
    ("*=", K::ArithAssignOp),
    ("/=", K::ArithAssignOp),
    ("%=", K::ArithAssignOp),
    ("&=", K::ArithAssignOp),
    ("|=", K::ArithAssignOp),
    ("^=", K::ArithAssignOp),
    ("+", K::ArithPlus),
    ("-", K::ArithMinus),
    ("*", K::ArithMult),
    ("/", K::ArithDiv),
    ("%", K::ArithMod),
    ("<", K::ArithLt),
    (">", K::ArithGt),
    ("=", K::ArithAssign),
    ("!", K::ArithNot),
    ("~", K::ArithBitNot),
    ("&", K::ArithBitAnd),
    ("|", K::ArithBitOr),
    ("^", K::ArithBitXor),
    ("?", K::ArithQuestion),
    (":", K::ArithColon),
    (",", K::ArithComma),
];

const fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

const fn is_special_param(c: u8) -> bool {
    matches!(c, b'@' | b'*' | b'#' | b'?' | b'-' | b'$' | b'!')
}

/// Bytes that end an unquoted word in command text.
const fn is_delimiter(c: u8) -> bool {
    matches!(
        c,
        b' ' | b'\t' | b'\r' | b'\n' | b';' | b'&' | b'|' | b'(' | b')' | b'<' | b'>'
    )
}

const fn is_word_stop(c: u8) -> bool {
    is_delimiter(c) || matches!(c, b'"' | b'\'' | b'`' | b'$')
}

/// Streaming tokenizer over a source string.
///
/// Besides producing tokens, the lexer exposes its [`LexerState`] so
/// callers can inspect the mode stack or register here-document markers
/// ahead of the lexer reaching them.
pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
    options: ParseOptions,
    state: LexerState,
    errors: Vec<LexError>,
    prev: Option<K>,
    prev_significant: Option<K>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str, options: &ParseOptions) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: 0,
            options: *options,
            state: LexerState::new(),
            errors: Vec::new(),
            prev: None,
            prev_significant: None,
            finished: false,
        }
    }

    /// Produce the next token, or `None` once the input is exhausted.
    ///
    /// Every returned token starts where the previous one ended.
    pub fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let kind = self.scan()?;
        // tokens are never empty and never split a character
        if self.pos == start {
            self.bump_char();
        }
        while !self.source.is_char_boundary(self.pos) {
            self.pos += 1;
        }
        let token = Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos]);
        self.prev = Some(kind);
        if !kind.is_trivia() {
            self.prev_significant = Some(kind);
        }
        Some(token)
    }

    #[must_use]
    pub const fn state(&self) -> &LexerState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut LexerState {
        &mut self.state
    }

    pub fn push_mode(&mut self, mode: Mode) {
        self.state.push_mode(mode);
    }

    pub fn pop_mode(&mut self) -> Mode {
        self.state.pop_mode()
    }

    #[must_use]
    pub fn is_in_mode(&self, mode: Mode) -> bool {
        self.state.is_in_mode(mode)
    }

    /// Run `f` with `mode` pushed; the mode stack is restored afterwards.
    pub fn within_mode<T>(&mut self, mode: Mode, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.state.depth();
        self.state.push_mode(mode);
        let out = f(self);
        self.state.restore_depth(depth);
        out
    }

    /// Is the lexer currently consuming here-document body lines?
    #[must_use]
    pub fn is_currently_evaluating_heredoc_body(&self) -> bool {
        self.state.heredocs().is_evaluating()
    }

    #[must_use]
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<LexError> {
        self.errors
    }

    // -- cursor helpers --

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Skip a backslash and the whole character it escapes.
    fn skip_escape(&mut self) {
        self.pos += 1;
        self.bump_char();
    }

    fn bump_char(&mut self) {
        if let Some(c) = self.source.get(self.pos..).and_then(|s| s.chars().next()) {
            self.pos += c.len_utf8();
        } else if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn eat_name(&mut self) {
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
    }

    fn record(&mut self, kind: LexErrorKind, span: Span) {
        tracing::debug!(%kind, offset = span.start, "lexical error");
        let position = Position::locate(self.source, span.start);
        self.errors.push(LexError {
            kind,
            span,
            position,
        });
    }

    fn is_line_continuation(&self) -> bool {
        self.peek() == Some(b'\\')
            && match self.peek_at(1) {
                Some(b'\n') => true,
                Some(b'\r') => self.peek_at(2) == Some(b'\n'),
                _ => false,
            }
    }

    /// Is the previous byte one that separates words?
    fn at_word_boundary(&self) -> bool {
        self.pos == 0
            || self.prev == Some(K::Whitespace)
            || matches!(self.input[self.pos - 1], c if is_delimiter(c) || c == b'`')
    }

    /// Does the current word end at a delimiter (or the end of input)?
    fn at_word_end(&self) -> bool {
        self.peek().is_none_or(is_delimiter)
    }

    /// Does the `$` at the cursor start an expansion?
    fn dollar_starts_expansion(&self, in_string: bool) -> bool {
        match self.peek_at(1) {
            Some(b'(' | b'{' | b'[') => true,
            Some(b'\'' | b'"') => !in_string,
            Some(c) => is_name_start(c) || c.is_ascii_digit() || is_special_param(c),
            None => false,
        }
    }

    // -- dispatch --

    fn scan(&mut self) -> Option<K> {
        loop {
            if std::mem::take(&mut self.state.after_dollar) {
                if let Some(kind) = self.scan_after_dollar() {
                    return Some(kind);
                }
            }
            if self.pos >= self.input.len() {
                self.finish();
                return None;
            }
            let assignment_value = std::mem::take(&mut self.state.assignment_value);
            let kind = match self.state.current_mode() {
                Mode::Initial | Mode::Subshell | Mode::Backquote => {
                    Some(self.scan_command(assignment_value))
                }
                Mode::DoubleQuoted => Some(self.scan_double_quoted()),
                Mode::ParamExpansion => Some(self.scan_param_expansion()),
                Mode::Arithmetic | Mode::ArrayIndex | Mode::LetExpression => self.scan_arithmetic(),
                Mode::HeredocMarker => self.scan_heredoc_marker(),
                Mode::HeredocBody => self.scan_heredoc_body(),
            };
            if kind.is_some() {
                return kind;
            }
            // the mode was left without consuming input: rescan
            self.state.assignment_value = assignment_value;
        }
    }

    fn scan_after_dollar(&mut self) -> Option<K> {
        let kind = match self.peek()? {
            b'(' if self.peek_at(1) == Some(b'(') => {
                self.pos += 2;
                self.state.push_mode(Mode::Arithmetic);
                K::ExprArithStart
            }
            b'(' => {
                self.pos += 1;
                self.state.push_mode(Mode::Subshell);
                K::LeftParen
            }
            b'{' => {
                self.pos += 1;
                self.state.push_mode(Mode::ParamExpansion);
                K::LeftCurly
            }
            b'[' => {
                self.pos += 1;
                self.state.push_mode(Mode::ArrayIndex);
                K::LeftSquare
            }
            _ => return None,
        };
        Some(kind)
    }

    /// Record errors for whatever is still open at the end of input.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let end = self.input.len();
        let open = self.state.modes().rev().find_map(|mode| match mode {
            Mode::DoubleQuoted => Some(LexErrorKind::UnterminatedString),
            Mode::Backquote => Some(LexErrorKind::UnterminatedBackquote),
            Mode::Subshell | Mode::ParamExpansion | Mode::Arithmetic | Mode::ArrayIndex => {
                Some(LexErrorKind::UnterminatedExpansion)
            }
            Mode::HeredocMarker => Some(LexErrorKind::EmptyHeredocMarker),
            Mode::Initial | Mode::LetExpression | Mode::HeredocBody => None,
        });
        if let Some(kind) = open {
            self.record(kind, Span::empty(end));
        }
        for marker in self.state.heredocs_mut().drain_unterminated() {
            self.record(
                LexErrorKind::UnterminatedHeredoc { marker: marker.key },
                Span::empty(end),
            );
        }
    }

    // -- command text --

    fn scan_command(&mut self, assignment_value: bool) -> K {
        let c = self.input[self.pos];

        if std::mem::take(&mut self.state.expect_assign_op) {
            if c == b'=' {
                self.pos += 1;
                self.state.assignment_value = true;
                return K::Eq;
            }
            if c == b'+' && self.peek_at(1) == Some(b'=') {
                self.pos += 2;
                self.state.assignment_value = true;
                return K::AddEq;
            }
        }
        if std::mem::take(&mut self.state.subscript_next) && c == b'[' {
            return self.open_assign_subscript();
        }

        match c {
            b'\n' => self.scan_newline(),
            b' ' | b'\t' | b'\r' => self.scan_whitespace(),
            0xEF if self.pos == 0 && self.input.starts_with(&[0xEF, 0xBB, 0xBF]) => {
                self.pos = 3;
                K::Whitespace
            }
            b'\\' if self.is_line_continuation() => self.scan_line_continuation(),
            b'#' if self.at_word_boundary() => self.scan_comment(),
            b';' => self.scan_semi(),
            b'&' => self.scan_amp(),
            b'|' => self.scan_pipe(),
            b'<' => self.scan_less(),
            b'>' => self.scan_greater(),
            b'(' => self.scan_left_paren(assignment_value),
            b')' => self.scan_right_paren(),
            b'"' => {
                self.pos += 1;
                self.note_word();
                self.state.push_mode(Mode::DoubleQuoted);
                K::StringBegin
            }
            b'\'' => {
                self.note_word();
                self.scan_single_quoted(1)
            }
            b'`' => self.scan_backquote(),
            b'$' => {
                self.note_word();
                self.scan_dollar(false)
            }
            b'=' if self.options.eval_mode && self.prev == Some(K::Variable) => {
                self.pos += 1;
                self.state.assignment_value = true;
                K::Eq
            }
            b'[' if self.state.is_in_array_literal() && self.at_word_boundary() => {
                self.open_assign_subscript()
            }
            _ => self.scan_word(),
        }
    }

    fn open_assign_subscript(&mut self) -> K {
        self.pos += 1;
        self.state.push_mode(Mode::ArrayIndex);
        self.state.set_assign_subscript(true);
        K::LeftSquare
    }

    fn scan_newline(&mut self) -> K {
        self.pos += 1;
        if !self.state.is_in_array_literal() && !self.state.is_in_conditional() {
            self.state.set_command_start(true);
        }
        let heredocs = self.state.heredocs_mut();
        if !heredocs.is_empty() && !heredocs.is_evaluating() {
            heredocs.set_evaluating(true);
            self.state.line_start = true;
            self.state.push_mode(Mode::HeredocBody);
        }
        K::LineFeed
    }

    fn scan_whitespace(&mut self) -> K {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        K::Whitespace
    }

    fn scan_line_continuation(&mut self) -> K {
        self.pos += if self.peek_at(1) == Some(b'\r') { 3 } else { 2 };
        K::LineContinuation
    }

    fn scan_comment(&mut self) -> K {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.pos += 1;
        }
        K::Comment
    }

    /// A list separator: the next word starts a new command.
    fn separator(&mut self) {
        if !self.state.is_in_conditional() {
            self.state.set_command_start(true);
        }
        self.state.set_expect_in(false);
        self.state.set_awaiting_name(false);
    }

    fn scan_semi(&mut self) -> K {
        let extended = self.options.extended;
        let kind = match (self.peek_at(1), self.peek_at(2)) {
            (Some(b';'), Some(b'&')) if extended => K::CaseContinue,
            (Some(b';'), _) => K::CaseEnd,
            (Some(b'&'), _) if extended => K::CaseFallthrough,
            _ => K::Semi,
        };
        self.pos += match kind {
            K::CaseContinue => 3,
            K::CaseEnd | K::CaseFallthrough => 2,
            _ => 1,
        };
        if kind != K::Semi && self.state.is_in_case_body() {
            self.state.set_in_case_pattern(true);
        }
        self.separator();
        kind
    }

    fn scan_amp(&mut self) -> K {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some(b'&'), _) => {
                self.pos += 2;
                self.separator();
                K::AndAnd
            }
            (Some(b'>'), Some(b'>')) if self.options.extended => {
                self.pos += 3;
                K::RedirectBothAppend
            }
            (Some(b'>'), _) => {
                self.pos += 2;
                K::RedirectBoth
            }
            _ => {
                self.pos += 1;
                self.separator();
                K::Amp
            }
        }
    }

    fn scan_pipe(&mut self) -> K {
        let kind = match self.peek_at(1) {
            Some(b'|') => K::OrOr,
            Some(b'&') if self.options.extended => K::PipeAmp,
            _ => K::Pipe,
        };
        self.pos += if kind == K::Pipe { 1 } else { 2 };
        // `|` separates alternatives inside a case pattern
        if !self.state.is_in_case_pattern() {
            self.separator();
        }
        kind
    }

    fn scan_less(&mut self) -> K {
        if self.state.is_in_conditional() {
            self.pos += 1;
            return K::CondOp;
        }
        let (kind, len) = match (self.peek_at(1), self.peek_at(2)) {
            (Some(b'<'), Some(b'<')) => (K::HereString, 3),
            (Some(b'<'), Some(b'-')) => (K::HeredocOperatorStrip, 3),
            (Some(b'<'), _) => (K::HeredocOperator, 2),
            (Some(b'&'), _) => (K::RedirectDupIn, 2),
            (Some(b'>'), _) => (K::RedirectReadWrite, 2),
            (Some(b'('), _) => (K::ProcessSubstIn, 2),
            _ => (K::RedirectIn, 1),
        };
        self.pos += len;
        match kind {
            K::HeredocOperator | K::HeredocOperatorStrip => {
                self.state.pending_strip = kind == K::HeredocOperatorStrip;
                self.state.push_mode(Mode::HeredocMarker);
            }
            K::ProcessSubstIn => self.open_process_substitution(),
            _ => {}
        }
        kind
    }

    fn scan_greater(&mut self) -> K {
        if self.state.is_in_conditional() {
            self.pos += 1;
            return K::CondOp;
        }
        let (kind, len) = match self.peek_at(1) {
            Some(b'>') => (K::RedirectAppend, 2),
            Some(b'&') => (K::RedirectDupOut, 2),
            Some(b'|') => (K::RedirectClobber, 2),
            Some(b'(') => (K::ProcessSubstOut, 2),
            _ => (K::RedirectOut, 1),
        };
        self.pos += len;
        if kind == K::ProcessSubstOut {
            self.open_process_substitution();
        }
        kind
    }

    fn open_process_substitution(&mut self) {
        self.note_word();
        self.state.push_mode(Mode::Subshell);
    }

    fn scan_left_paren(&mut self, assignment_value: bool) -> K {
        let state = &mut self.state;
        if self.input.get(self.pos + 1) == Some(&b'(')
            && !assignment_value
            && !state.is_in_case_pattern()
            && (state.command_start() || state.awaiting_name())
        {
            state.set_awaiting_name(false);
            state.set_command_start(false);
            state.push_mode(Mode::Arithmetic);
            self.pos += 2;
            return K::ExprArithStart;
        }

        self.pos += 1;
        if assignment_value {
            state.set_in_array_literal(true);
            state.set_command_start(false);
        } else if !state.is_in_case_pattern() {
            state.inc_open_parenthesis_count();
            state.set_function_name(false);
            if !state.is_in_conditional() {
                state.set_command_start(true);
            }
        }
        K::LeftParen
    }

    fn scan_right_paren(&mut self) -> K {
        self.pos += 1;
        let state = &mut self.state;
        if state.is_in_case_pattern() {
            state.set_in_case_pattern(false);
            state.set_command_start(true);
        } else if state.is_in_array_literal() {
            state.set_in_array_literal(false);
            state.set_command_start(false);
        } else if state.open_parenthesis_count() > 0 {
            state.dec_open_parenthesis_count();
            // `name()` is followed by the function body
            let empty = self.prev_significant == Some(K::LeftParen);
            state.set_command_start(empty);
        } else if state.is_in_mode(Mode::Subshell) {
            state.pop_mode();
        }
        K::RightParen
    }

    fn scan_backquote(&mut self) -> K {
        self.pos += 1;
        if self.state.is_in_mode(Mode::Backquote) {
            self.state.pop_mode();
        } else {
            if self.state.current_mode().is_command() {
                self.note_word();
            }
            self.state.push_mode(Mode::Backquote);
        }
        K::Backquote
    }

    /// `'...'`, or `$'...'` with backslash escapes when `prefix` is 2.
    fn scan_single_quoted(&mut self, prefix: usize) -> K {
        let start = self.pos;
        let ansi = prefix == 2;
        self.pos += prefix;
        loop {
            match self.peek() {
                None => {
                    self.record(
                        LexErrorKind::UnterminatedString,
                        Span::new(start, self.pos),
                    );
                    break;
                }
                Some(b'\'') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') if ansi => self.skip_escape(),
                Some(_) => self.pos += 1,
            }
        }
        K::SingleQuotedString
    }

    fn scan_dollar(&mut self, in_string: bool) -> K {
        match self.peek_at(1) {
            Some(b'(' | b'{' | b'[') => {
                self.pos += 1;
                self.state.after_dollar = true;
                K::Dollar
            }
            Some(b'\'') if !in_string => self.scan_single_quoted(2),
            Some(b'"') if !in_string => {
                self.pos += 2;
                self.state.push_mode(Mode::DoubleQuoted);
                K::StringBegin
            }
            Some(c) if is_name_start(c) => {
                self.pos += 1;
                self.eat_name();
                K::Variable
            }
            Some(c) if c.is_ascii_digit() || is_special_param(c) => {
                self.pos += 2;
                K::Variable
            }
            _ => {
                self.pos += 1;
                if in_string { K::StringContent } else { K::Word }
            }
        }
    }

    /// Bookkeeping after a word-starting token in command text.
    fn note_word(&mut self) {
        let state = &mut self.state;
        if state.awaiting_name() {
            state.set_awaiting_name(false);
            state.set_expect_in(true);
        }
        if state.function_name() {
            state.set_function_name(false);
            state.set_command_start(true);
        } else if !state.is_in_case_pattern() {
            state.set_command_start(false);
        }
    }

    /// End of a `name` at the cursor, if one starts here.
    fn name_end(&self) -> Option<usize> {
        let rest = self.rest();
        if !rest.first().copied().is_some_and(is_name_start) {
            return None;
        }
        let len = rest.iter().take_while(|c| is_name_char(**c)).count();
        Some(self.pos + len)
    }

    /// Index after the `]` matching the `[` at `open`.
    fn subscript_end(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, c) in self.input[open..].iter().enumerate() {
            match c {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + i + 1);
                    }
                }
                b' ' | b'\t' | b'\n' => return None,
                _ => {}
            }
        }
        None
    }

    fn is_assign_op_at(&self, at: usize) -> bool {
        match self.input.get(at) {
            Some(b'=') => true,
            Some(b'+') => self.input.get(at + 1) == Some(&b'='),
            _ => false,
        }
    }

    /// `name=`, `name+=` or `name[...]` at a word boundary.
    fn scan_assignment_word(&mut self) -> Option<K> {
        let name_end = self.name_end()?;
        if self.is_assign_op_at(name_end) {
            self.pos = name_end;
            self.note_word();
            self.state.expect_assign_op = true;
            return Some(K::AssignmentWord);
        }
        if self.input.get(name_end) == Some(&b'[') {
            let close = self.subscript_end(name_end)?;
            let delimited = self.input.get(close).is_none_or(|c| is_delimiter(*c));
            if self.is_assign_op_at(close) || delimited {
                self.pos = name_end;
                self.note_word();
                self.state.subscript_next = true;
                return Some(K::AssignmentWord);
            }
        }
        None
    }

    fn scan_word(&mut self) -> K {
        let start = self.pos;
        let boundary = self.at_word_boundary();
        if boundary && !self.state.is_in_conditional() && !self.state.is_in_case_pattern() {
            if let Some(kind) = self.scan_assignment_word() {
                return kind;
            }
        }

        while let Some(c) = self.peek() {
            match c {
                b'\\' if self.is_line_continuation() => break,
                b'\\' => self.skip_escape(),
                c if is_word_stop(c) => break,
                _ => self.pos += 1,
            }
        }
        self.classify_word(start, boundary)
    }

    fn classify_word(&mut self, start: usize, boundary: bool) -> K {
        let source = self.source;
        let text = &source[start..self.pos];
        let digits = !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());
        let delimited = boundary && self.at_word_end();

        if self.state.is_in_conditional() {
            if delimited && text == "]]" {
                self.state.set_in_conditional(false);
                self.state.set_command_start(false);
                return K::RightDoubleBracket;
            }
            return if digits { K::Number } else { K::Word };
        }

        if boundary && digits && matches!(self.peek(), Some(b'<' | b'>')) {
            return K::FileDescriptor;
        }
        if matches!(
            self.prev_significant,
            Some(K::RedirectDupOut | K::RedirectDupIn)
        ) && (text == "-" || text.trim_end_matches('-').bytes().all(|b| b.is_ascii_digit()))
        {
            return K::FileDescriptor;
        }

        if self.state.is_in_case_pattern() {
            if delimited && text == "esac" {
                return self.keyword(K::Esac);
            }
            return if digits { K::Number } else { K::Word };
        }

        if delimited && self.state.expect_in() {
            match text {
                "in" => return self.keyword(K::In),
                "do" => return self.keyword(K::Do),
                _ => {}
            }
        }
        let command_start = self.state.command_start();
        if delimited && command_start {
            match text {
                "{" => {
                    self.state.set_function_name(false);
                    return K::LeftCurly;
                }
                "}" => {
                    self.state.set_command_start(false);
                    return K::RightCurly;
                }
                "[[" => {
                    self.state.set_in_conditional(true);
                    self.state.set_command_start(false);
                    return K::LeftDoubleBracket;
                }
                "!" => return K::Bang,
                _ => {}
            }
            if let Some(kind) = K::keyword(text, self.options.extended) {
                return self.keyword(kind);
            }
        }

        if boundary {
            self.state.set_expect_in(false);
        }
        self.note_word();
        if delimited && command_start && text == "let" {
            self.state.push_mode(Mode::LetExpression);
        }
        if digits { K::Number } else { K::Word }
    }

    /// Context changes caused by a reserved word.
    fn keyword(&mut self, kind: K) -> K {
        let state = &mut self.state;
        state.set_expect_in(false);
        match kind {
            K::For | K::Select => {
                state.set_awaiting_name(true);
                state.set_command_start(false);
            }
            K::Case => {
                state.set_awaiting_name(true);
                state.set_case_pending(true);
                state.set_command_start(false);
            }
            K::In => {
                state.set_command_start(false);
                if state.case_pending() {
                    state.set_case_pending(false);
                    state.set_in_case_body(true);
                    state.set_in_case_pattern(true);
                }
            }
            K::Function => {
                state.set_function_name(true);
                state.set_command_start(false);
            }
            K::Coproc => {
                state.set_function_name(true);
                state.set_command_start(true);
            }
            K::Esac => {
                state.set_in_case_body(false);
                state.set_command_start(false);
            }
            K::Fi | K::Done => state.set_command_start(false),
            _ => state.set_command_start(true),
        }
        kind
    }

    // -- double quotes --

    fn scan_double_quoted(&mut self) -> K {
        match self.input[self.pos] {
            b'"' => {
                self.pos += 1;
                self.state.pop_mode();
                return K::StringEnd;
            }
            b'$' if self.dollar_starts_expansion(true) => return self.scan_dollar(true),
            b'`' => return self.scan_backquote(),
            _ => {}
        }
        while let Some(c) = self.peek() {
            match c {
                b'"' | b'`' => break,
                b'$' if self.dollar_starts_expansion(true) => break,
                b'\\' => self.skip_escape(),
                _ => self.pos += 1,
            }
        }
        K::StringContent
    }

    // -- ${...} --

    fn scan_param_expansion(&mut self) -> K {
        let c = self.input[self.pos];
        if c == b'}' {
            self.pos += 1;
            self.state.pop_mode();
            return K::RightCurly;
        }
        let flags = self.state.param_expansion();
        if flags.other {
            self.scan_param_word()
        } else if flags.word {
            self.scan_param_operator()
        } else {
            self.scan_param_name(flags.hash)
        }
    }

    fn scan_param_name(&mut self, prefixed: bool) -> K {
        let c = self.input[self.pos];
        match c {
            b'#' | b'!' if !prefixed && self.peek_at(1) != Some(b'}') => {
                self.pos += 1;
                self.state.set_param_expansion_hash(true);
                K::ParamExpansionOp
            }
            c if is_name_start(c) => {
                self.eat_name();
                self.state.set_param_expansion_word(true);
                K::Word
            }
            c if c.is_ascii_digit() => {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                self.state.set_param_expansion_word(true);
                K::Word
            }
            c if is_special_param(c) => {
                self.pos += 1;
                self.state.set_param_expansion_word(true);
                K::Word
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                    self.pos += 1;
                }
                K::Whitespace
            }
            _ => {
                self.state.set_param_expansion_other(true);
                self.scan_param_word()
            }
        }
    }

    fn scan_param_operator(&mut self) -> K {
        let extended = self.options.extended;
        let (len, separator) = match self.rest() {
            [b'[', ..] => {
                self.pos += 1;
                self.state.push_mode(Mode::ArrayIndex);
                return K::LeftSquare;
            }
            [b':', b'-' | b'=' | b'+' | b'?', ..] | [b'#', b'#', ..] | [b'%', b'%', ..] => {
                (2, None)
            }
            [b'/', b'/' | b'#' | b'%', ..] => (2, Some(b'/')),
            [b'^', b'^', ..] | [b',', b',', ..] if extended => (2, None),
            [b':' | b'-' | b'=' | b'+' | b'?' | b'#' | b'%' | b'@' | b'*', ..] => (1, None),
            [b'/', ..] => (1, Some(b'/')),
            [b'^' | b',', ..] if extended => (1, None),
            _ => {
                self.state.set_param_expansion_other(true);
                return self.scan_param_word();
            }
        };
        self.pos += len;
        self.state.set_param_expansion_other(true);
        self.state.set_param_separator(separator);
        K::ParamExpansionOp
    }

    /// Word text after an operator, e.g. the `default` of `${x:-default}`.
    fn scan_param_word(&mut self) -> K {
        match self.input[self.pos] {
            b'$' if self.dollar_starts_expansion(false) => return self.scan_dollar(false),
            b'`' => return self.scan_backquote(),
            b'"' => {
                self.pos += 1;
                self.state.push_mode(Mode::DoubleQuoted);
                return K::StringBegin;
            }
            b'\'' => return self.scan_single_quoted(1),
            _ => {}
        }
        let separator = self.state.param_separator();
        if separator == self.peek() {
            self.pos += 1;
            self.state.set_param_separator(None);
            return K::ParamExpansionOp;
        }
        while let Some(c) = self.peek() {
            match c {
                b'}' | b'`' | b'"' | b'\'' => break,
                b'$' if self.dollar_starts_expansion(false) => break,
                b'\\' => self.skip_escape(),
                c if Some(c) == separator => break,
                _ => self.pos += 1,
            }
        }
        K::Word
    }

    // -- arithmetic --

    fn scan_arithmetic(&mut self) -> Option<K> {
        let mode = self.state.current_mode();
        let c = self.input[self.pos];
        let depth = self.state.open_parenthesis_count();

        if mode == Mode::LetExpression
            && depth == 0
            && matches!(c, b';' | b'\n' | b'&' | b'|' | b'<' | b'>' | b')' | b'`')
        {
            self.state.pop_mode();
            return None;
        }

        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                    self.pos += 1;
                }
                K::Whitespace
            }
            b'\\' if self.is_line_continuation() => self.scan_line_continuation(),
            b'(' => {
                self.pos += 1;
                self.state.inc_open_parenthesis_count();
                K::LeftParen
            }
            b')' => self.scan_arith_right_paren(mode, depth),
            b'[' => {
                self.pos += 1;
                self.state.push_mode(Mode::ArrayIndex);
                K::LeftSquare
            }
            b']' => {
                self.pos += 1;
                if mode == Mode::ArrayIndex {
                    let assign = self.state.is_assign_subscript();
                    self.state.pop_mode();
                    self.state.expect_assign_op = assign;
                }
                K::RightSquare
            }
            b'0'..=b'9' => self.scan_number(),
            c if is_name_start(c) => {
                self.eat_name();
                K::Word
            }
            b'$' if self.dollar_starts_expansion(false) => self.scan_dollar(false),
            b'"' => {
                self.pos += 1;
                self.state.push_mode(Mode::DoubleQuoted);
                K::StringBegin
            }
            b'\'' => self.scan_single_quoted(1),
            b'`' => self.scan_backquote(),
            b';' => {
                self.pos += 1;
                K::Semi
            }
            _ => self.scan_arith_operator(),
        };
        Some(kind)
    }

    fn scan_arith_right_paren(&mut self, mode: Mode, depth: u32) -> K {
        if depth > 0 {
            self.pos += 1;
            self.state.dec_open_parenthesis_count();
            return K::RightParen;
        }
        if mode == Mode::Arithmetic {
            self.state.pop_mode();
            if self.peek_at(1) == Some(b')') {
                self.pos += 2;
                return K::ExprArithEnd;
            }
        }
        self.pos += 1;
        K::RightParen
    }

    /// Decimal, `0x` hex, octal and `base#digits` literals.
    fn scan_number(&mut self) -> K {
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return K::Number;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'#') {
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'@' || c == b'_')
            {
                self.pos += 1;
            }
        }
        K::Number
    }

    fn scan_arith_operator(&mut self) -> K {
        let rest = self.rest();
        for (op, kind) in ARITH_OPERATORS {
            if rest.starts_with(op.as_bytes()) {
                self.pos += op.len();
                return *kind;
            }
        }
        if rest.first() == Some(&b'\\') {
            self.skip_escape();
        } else {
            self.bump_char();
        }
        K::Word
    }

    // -- here-documents --

    fn scan_heredoc_marker(&mut self) -> Option<K> {
        match self.input[self.pos] {
            b' ' | b'\t' | b'\r' => return Some(self.scan_whitespace()),
            b'\\' if self.is_line_continuation() => return Some(self.scan_line_continuation()),
            c if is_delimiter(c) => {
                self.record(LexErrorKind::EmptyHeredocMarker, Span::empty(self.pos));
                self.state.pop_mode();
                return None;
            }
            _ => {}
        }

        let source = self.source;
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b'\'' => {
                    self.pos += 1;
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == b'\'' {
                            break;
                        }
                    }
                }
                b'"' => {
                    self.pos += 1;
                    while let Some(c) = self.peek() {
                        if c == b'\\' {
                            self.skip_escape();
                            continue;
                        }
                        self.pos += 1;
                        if c == b'"' {
                            break;
                        }
                    }
                }
                b'\\' => self.skip_escape(),
                c if is_delimiter(c) => break,
                _ => self.pos += 1,
            }
        }
        let strip_tabs = self.state.pending_strip;
        self.state
            .heredocs_mut()
            .push(&source[start..self.pos], strip_tabs);
        self.state.pop_mode();
        Some(K::HeredocMarkerStart)
    }

    fn line_end(&self, from: usize) -> usize {
        self.input[from..]
            .iter()
            .position(|c| *c == b'\n')
            .map_or(self.input.len(), |i| from + i)
    }

    /// Does the line starting at `at` terminate the current here-document?
    fn heredoc_end_at(&self, at: usize) -> bool {
        let line = &self.source[at..self.line_end(at)];
        let line = line.strip_suffix('\r').unwrap_or(line);
        self.state.heredocs().is_end(line)
    }

    fn scan_heredoc_body(&mut self) -> Option<K> {
        let Some(marker) = self.state.heredocs().peek() else {
            self.state.pop_mode();
            return None;
        };
        let quoted = marker.quoted;

        if self.state.line_start && self.heredoc_end_at(self.pos) {
            let key = marker.key.clone();
            self.pos = self.line_end(self.pos);
            self.state.line_start = false;
            self.state.heredocs_mut().pop(&key);
            if self.state.heredocs().is_empty() {
                self.state.pop_mode();
            }
            return Some(K::HeredocMarkerEnd);
        }
        if self.prev == Some(K::HeredocMarkerEnd) && self.peek() == Some(b'\n') {
            self.pos += 1;
            self.state.line_start = true;
            return Some(K::LineFeed);
        }

        if !quoted {
            match self.input[self.pos] {
                b'$' if self.dollar_starts_expansion(true) => {
                    self.state.line_start = false;
                    return Some(self.scan_dollar(true));
                }
                b'`' => {
                    self.state.line_start = false;
                    return Some(self.scan_backquote());
                }
                _ => {}
            }
        }

        let start = self.pos;
        let mut line_start = self.state.line_start;
        while let Some(c) = self.peek() {
            if line_start && self.pos > start && self.heredoc_end_at(self.pos) {
                break;
            }
            if !quoted {
                if c == b'`' || (c == b'$' && self.dollar_starts_expansion(true)) {
                    break;
                }
                if c == b'\\' {
                    self.skip_escape();
                    line_start = false;
                    continue;
                }
            }
            self.pos += 1;
            line_start = c == b'\n';
        }
        self.state.line_start = line_start;
        Some(K::HeredocContent)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
