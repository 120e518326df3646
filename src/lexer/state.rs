//! Lexer mode stack and the flags scoped to each mode.

use super::heredoc::HeredocQueue;

/// Lexing context deciding which characters are operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Top-level command text.
    Initial,
    /// Inside `$( )`, `<( )` or `>( )`.
    Subshell,
    /// Inside `` ` ` ``.
    Backquote,
    /// Inside `"..."`.
    DoubleQuoted,
    /// Inside `${...}`.
    ParamExpansion,
    /// Inside `(( ))` or `$(( ))`.
    Arithmetic,
    /// Inside an `[...]` array subscript or `$[...]`.
    ArrayIndex,
    /// Arguments of `let`, up to the end of the command.
    LetExpression,
    /// Waiting for the marker word after `<<`.
    HeredocMarker,
    /// Reading here-document body lines.
    HeredocBody,
}

impl Mode {
    /// Modes that scan command text (words, operators, keywords).
    #[must_use]
    pub const fn is_command(self) -> bool {
        matches!(self, Self::Initial | Self::Subshell | Self::Backquote)
    }

    /// Modes that scan arithmetic tokens.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Arithmetic | Self::ArrayIndex | Self::LetExpression
        )
    }
}

/// Sub-state of a `${...}` expansion.
///
/// `hash` is set once a leading `#` (length) was seen, `word` once the
/// parameter name was read, and `other` once an operator switched the
/// rest of the expansion to word text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParamExpansionFlags {
    pub hash: bool,
    pub word: bool,
    pub other: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    mode: Mode,
    paren_depth: u32,
    param: ParamExpansionFlags,
    // separator expected between pattern and replacement, e.g. `/`
    param_separator: Option<u8>,
    case_depth: u32,
    in_case_pattern: bool,
    in_conditional: bool,
    array_literal: bool,
    // `]` of this subscript is followed by `=` or `+=`
    assign_subscript: bool,
    command_start: bool,
    awaiting_name: bool,
    expect_in: bool,
    case_pending: bool,
    function_name: bool,
}

impl Frame {
    const fn new(mode: Mode) -> Self {
        Self {
            mode,
            paren_depth: 0,
            param: ParamExpansionFlags {
                hash: false,
                word: false,
                other: false,
            },
            param_separator: None,
            case_depth: 0,
            in_case_pattern: false,
            in_conditional: false,
            array_literal: false,
            assign_subscript: false,
            command_start: true,
            awaiting_name: false,
            expect_in: false,
            case_pending: false,
            function_name: false,
        }
    }
}

/// Everything the lexer mutates while scanning.
///
/// The mode stack is never empty: popping the last frame resets it to
/// a fresh [`Mode::Initial`] frame instead of failing. Command context
/// (keyword position, pending `in`, case and conditional nesting) lives
/// in the frames, so `$( )` starts a fresh command and closing it
/// restores the enclosing one. The remaining flags describe the next
/// token only and are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerState {
    frames: Vec<Frame>,
    pub(crate) heredocs: HeredocQueue,
    /// The next `=`/`+=` closes an assignment left-hand side.
    pub(crate) expect_assign_op: bool,
    /// Directly after an assignment operator, where `(` opens a list.
    pub(crate) assignment_value: bool,
    /// The previous token was a `$` waiting for `(`, `{` or `[`.
    pub(crate) after_dollar: bool,
    /// The next `[` opens an assignment subscript.
    pub(crate) subscript_next: bool,
    /// Strip flag of a `<<`/`<<-` awaiting its marker word.
    pub(crate) pending_strip: bool,
    /// Heredoc body scanning is at the start of a physical line.
    pub(crate) line_start: bool,
}

impl Default for LexerState {
    fn default() -> Self {
        Self::new()
    }
}

impl LexerState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(Mode::Initial)],
            heredocs: HeredocQueue::new(),
            expect_assign_op: false,
            assignment_value: false,
            after_dollar: false,
            subscript_next: false,
            pending_strip: false,
            line_start: false,
        }
    }

    fn top(&self) -> &Frame {
        // frames always holds at least one entry
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    #[must_use]
    pub fn current_mode(&self) -> Mode {
        self.top().mode
    }

    #[must_use]
    pub fn is_in_mode(&self, mode: Mode) -> bool {
        self.current_mode() == mode
    }

    /// Number of frames on the stack, always at least one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Modes from the bottom of the stack to the top.
    pub fn modes(&self) -> impl DoubleEndedIterator<Item = Mode> + '_ {
        self.frames.iter().map(|f| f.mode)
    }

    pub fn push_mode(&mut self, mode: Mode) {
        tracing::trace!(?mode, depth = self.frames.len(), "push lexer mode");
        self.frames.push(Frame::new(mode));
    }

    /// Leave the current mode and return the one now active.
    pub fn pop_mode(&mut self) -> Mode {
        if self.frames.len() > 1 {
            let popped = self.frames.pop().map(|f| f.mode);
            tracing::trace!(?popped, depth = self.frames.len(), "pop lexer mode");
        } else {
            tracing::trace!("pop on initial mode, resetting");
            self.frames[0] = Frame::new(Mode::Initial);
        }
        self.current_mode()
    }

    /// Drop frames until at most `depth` remain.
    pub fn restore_depth(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    /// Run `f` with `mode` pushed, restoring the stack afterwards.
    ///
    /// The stack is truncated back to its previous depth on every exit
    /// path, even when `f` pushed modes it never popped.
    pub fn scoped<T>(&mut self, mode: Mode, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.depth();
        self.push_mode(mode);
        let out = f(self);
        self.restore_depth(depth);
        out
    }

    // -- command context --

    /// Keywords are only recognised at the start of a command.
    #[must_use]
    pub fn command_start(&self) -> bool {
        self.top().command_start
    }

    pub fn set_command_start(&mut self, value: bool) {
        self.top_mut().command_start = value;
    }

    /// The previous keyword was `for`, `select` or `case`.
    #[must_use]
    pub fn awaiting_name(&self) -> bool {
        self.top().awaiting_name
    }

    pub fn set_awaiting_name(&mut self, value: bool) {
        self.top_mut().awaiting_name = value;
    }

    /// The next `in` is a keyword.
    #[must_use]
    pub fn expect_in(&self) -> bool {
        self.top().expect_in
    }

    pub fn set_expect_in(&mut self, value: bool) {
        self.top_mut().expect_in = value;
    }

    /// A `case` is waiting for its `in`.
    #[must_use]
    pub fn case_pending(&self) -> bool {
        self.top().case_pending
    }

    pub fn set_case_pending(&mut self, value: bool) {
        self.top_mut().case_pending = value;
    }

    /// The next word names a function or coprocess.
    #[must_use]
    pub fn function_name(&self) -> bool {
        self.top().function_name
    }

    pub fn set_function_name(&mut self, value: bool) {
        self.top_mut().function_name = value;
    }

    // -- parenthesis depth --

    #[must_use]
    pub fn open_parenthesis_count(&self) -> u32 {
        self.top().paren_depth
    }

    pub fn inc_open_parenthesis_count(&mut self) {
        self.top_mut().paren_depth += 1;
    }

    pub fn dec_open_parenthesis_count(&mut self) {
        let frame = self.top_mut();
        frame.paren_depth = frame.paren_depth.saturating_sub(1);
    }

    // -- parameter expansion --

    #[must_use]
    pub fn param_expansion(&self) -> ParamExpansionFlags {
        self.top().param
    }

    #[must_use]
    pub fn is_param_expansion_hash(&self) -> bool {
        self.top().param.hash
    }

    pub fn set_param_expansion_hash(&mut self, value: bool) {
        self.top_mut().param.hash = value;
    }

    #[must_use]
    pub fn is_param_expansion_word(&self) -> bool {
        self.top().param.word
    }

    pub fn set_param_expansion_word(&mut self, value: bool) {
        self.top_mut().param.word = value;
    }

    #[must_use]
    pub fn is_param_expansion_other(&self) -> bool {
        self.top().param.other
    }

    pub fn set_param_expansion_other(&mut self, value: bool) {
        self.top_mut().param.other = value;
    }

    pub(crate) fn param_separator(&self) -> Option<u8> {
        self.top().param_separator
    }

    pub(crate) fn set_param_separator(&mut self, separator: Option<u8>) {
        self.top_mut().param_separator = separator;
    }

    // -- case statements --

    /// Inside the body of a `case` (between `in` and `esac`).
    #[must_use]
    pub fn is_in_case_body(&self) -> bool {
        self.top().case_depth > 0
    }

    /// Enter or leave one level of `case` body in the current mode.
    pub fn set_in_case_body(&mut self, in_body: bool) {
        let frame = self.top_mut();
        if in_body {
            frame.case_depth += 1;
        } else {
            frame.case_depth = frame.case_depth.saturating_sub(1);
            frame.in_case_pattern = false;
        }
    }

    /// Waiting for a case pattern, which `)` terminates.
    #[must_use]
    pub fn is_in_case_pattern(&self) -> bool {
        self.top().in_case_pattern
    }

    pub fn set_in_case_pattern(&mut self, value: bool) {
        self.top_mut().in_case_pattern = value;
    }

    // -- [[ ]] and array literals --

    #[must_use]
    pub fn is_in_conditional(&self) -> bool {
        self.top().in_conditional
    }

    pub fn set_in_conditional(&mut self, value: bool) {
        self.top_mut().in_conditional = value;
    }

    #[must_use]
    pub fn is_in_array_literal(&self) -> bool {
        self.top().array_literal
    }

    pub fn set_in_array_literal(&mut self, value: bool) {
        self.top_mut().array_literal = value;
    }

    /// Is the current frame an assignment subscript such as `a[1]=`?
    #[must_use]
    pub fn is_assign_subscript(&self) -> bool {
        self.top().assign_subscript
    }

    pub fn set_assign_subscript(&mut self, value: bool) {
        self.top_mut().assign_subscript = value;
    }

    // -- here-documents --

    #[must_use]
    pub const fn heredocs(&self) -> &HeredocQueue {
        &self.heredocs
    }

    pub const fn heredocs_mut(&mut self) -> &mut HeredocQueue {
        &mut self.heredocs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_stack_falls_back_to_initial() {
        let mut state = LexerState::new();
        state.inc_open_parenthesis_count();
        assert_eq!(state.pop_mode(), Mode::Initial);
        assert_eq!(state.depth(), 1);
        assert_eq!(state.open_parenthesis_count(), 0);
    }

    #[test]
    fn flags_are_scoped_to_frames() {
        let mut state = LexerState::new();
        state.push_mode(Mode::ParamExpansion);
        state.set_param_expansion_word(true);
        state.push_mode(Mode::ParamExpansion);
        assert!(!state.is_param_expansion_word());
        state.set_param_expansion_hash(true);
        state.set_param_expansion_other(true);
        state.pop_mode();
        assert!(state.is_param_expansion_word());
        assert!(!state.is_param_expansion_hash());
        assert!(!state.is_param_expansion_other());
    }

    #[test]
    fn scoped_restores_on_unbalanced_pushes() {
        let mut state = LexerState::new();
        let depth = state.scoped(Mode::Arithmetic, |s| {
            s.push_mode(Mode::Subshell);
            s.push_mode(Mode::DoubleQuoted);
            s.depth()
        });
        assert_eq!(depth, 4);
        assert_eq!(state.depth(), 1);
        assert!(state.is_in_mode(Mode::Initial));
    }

    #[test]
    fn subshell_frames_start_a_new_command() {
        let mut state = LexerState::new();
        state.set_command_start(false);
        state.set_expect_in(true);
        state.push_mode(Mode::Subshell);
        assert!(state.command_start());
        assert!(!state.expect_in());
        state.pop_mode();
        assert!(!state.command_start());
        assert!(state.expect_in());
    }

    #[test]
    fn paren_count_never_negative() {
        let mut state = LexerState::new();
        state.dec_open_parenthesis_count();
        assert_eq!(state.open_parenthesis_count(), 0);
        state.inc_open_parenthesis_count();
        state.inc_open_parenthesis_count();
        state.dec_open_parenthesis_count();
        assert_eq!(state.open_parenthesis_count(), 1);
    }

    #[test]
    fn case_body_nesting() {
        let mut state = LexerState::new();
        state.set_in_case_body(true);
        state.set_in_case_body(true);
        state.set_in_case_pattern(true);
        state.set_in_case_body(false);
        assert!(state.is_in_case_body());
        assert!(!state.is_in_case_pattern());
        state.set_in_case_body(false);
        assert!(!state.is_in_case_body());
    }
}
