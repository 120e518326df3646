use std::fmt;

/// Byte range of a token or node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length span at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One-based line and column of a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the line and column of `offset` within `source`.
    ///
    /// Columns count characters, not bytes. Offsets past the end
    /// clamp to the end of the input.
    #[must_use]
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

/// Token kinds produced by the lexer.
///
/// The same characters map to different kinds depending on the lexer
/// mode they were scanned in; `<<` is a here-document operator in
/// command position but a shift inside `$(( ))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // -- trivia --
    /// Run of spaces, tabs or carriage returns.
    Whitespace,
    /// Backslash-newline.
    LineContinuation,
    /// `# ...` up to (not including) the newline.
    Comment,
    /// Newline outside of strings and arithmetic.
    LineFeed,

    // -- words --
    /// Plain word text.
    Word,
    /// Integer literal.
    Number,
    /// Name on the left-hand side of `=`, `+=` or `[...]=`.
    AssignmentWord,
    /// `=` following an assignment word.
    Eq,
    /// `+=` following an assignment word.
    AddEq,
    /// `'...'` or `$'...'`.
    SingleQuotedString,
    /// Opening `"` (or `$"`).
    StringBegin,
    /// Literal text inside a double-quoted string.
    StringContent,
    /// Closing `"`.
    StringEnd,
    /// `$name`, `$1`, `$@` and the other special parameters.
    Variable,
    /// `$` introducing `${`, `$(`, `$((` or `$[`.
    Dollar,
    /// `` ` `` opening or closing a command substitution.
    Backquote,
    /// Operator inside `${...}` such as `:-`, `#`, `%%` or `/`.
    ParamExpansionOp,
    /// Digits (or `-`) naming a file descriptor next to a redirect.
    FileDescriptor,
    /// `<`, `>`, `==`-style comparison inside `[[ ]]`.
    CondOp,

    // -- grouping --
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftCurly,
    RightCurly,
    /// `[[`
    LeftDoubleBracket,
    /// `]]`
    RightDoubleBracket,
    /// `((` opening an arithmetic command or expansion.
    ExprArithStart,
    /// `))` closing an arithmetic command or expansion.
    ExprArithEnd,

    // -- list operators --
    Semi,
    /// `;;`
    CaseEnd,
    /// `;&`
    CaseFallthrough,
    /// `;;&`
    CaseContinue,
    Amp,
    AndAnd,
    OrOr,
    Pipe,
    /// `|&`
    PipeAmp,

    // -- redirects --
    /// `<`
    RedirectIn,
    /// `>`
    RedirectOut,
    /// `>>`
    RedirectAppend,
    /// `<>`
    RedirectReadWrite,
    /// `>|`
    RedirectClobber,
    /// `&>`
    RedirectBoth,
    /// `&>>`
    RedirectBothAppend,
    /// `>&`
    RedirectDupOut,
    /// `<&`
    RedirectDupIn,
    /// `<<<`
    HereString,
    /// `<<`
    HeredocOperator,
    /// `<<-`
    HeredocOperatorStrip,
    /// Terminator word declared after `<<`.
    HeredocMarkerStart,
    /// Body text of a here-document.
    HeredocContent,
    /// The line that terminates a here-document body.
    HeredocMarkerEnd,
    /// `<(`
    ProcessSubstIn,
    /// `>(`
    ProcessSubstOut,

    // -- keywords --
    If,
    Then,
    Else,
    Elif,
    Fi,
    For,
    Select,
    In,
    Do,
    Done,
    While,
    Until,
    Case,
    Esac,
    Function,
    Time,
    Coproc,
    /// `!` in command position.
    Bang,

    // -- arithmetic --
    ArithPlus,
    ArithMinus,
    ArithMult,
    ArithDiv,
    ArithMod,
    /// `**`
    ArithExp,
    ArithPlusPlus,
    ArithMinusMinus,
    ArithShiftLeft,
    ArithShiftRight,
    ArithLt,
    ArithGt,
    ArithLe,
    ArithGe,
    ArithEqEq,
    ArithNe,
    ArithBitAnd,
    ArithBitOr,
    ArithBitXor,
    ArithBitNot,
    ArithNot,
    ArithAnd,
    ArithOr,
    ArithQuestion,
    ArithColon,
    ArithComma,
    /// `=` inside arithmetic.
    ArithAssign,
    /// Compound assignment such as `+=` or `<<=`.
    ArithAssignOp,
}

/// A named, closed set of token kinds used for lookahead decisions.
#[derive(Debug, Clone, Copy)]
pub struct TokenSet(&'static [TokenKind]);

impl TokenSet {
    #[must_use]
    pub const fn new(kinds: &'static [TokenKind]) -> Self {
        Self(kinds)
    }

    #[must_use]
    pub fn contains(self, kind: TokenKind) -> bool {
        self.0.contains(&kind)
    }

    #[must_use]
    pub const fn kinds(self) -> &'static [TokenKind] {
        self.0
    }
}

use TokenKind as K;

/// Trivia skipped by the parser's significant-token view.
pub const TRIVIA: TokenSet = TokenSet::new(&[K::Whitespace, K::LineContinuation, K::Comment]);

/// Tokens that can begin a word.
pub const WORD_START: TokenSet = TokenSet::new(&[
    K::Word,
    K::Number,
    K::AssignmentWord,
    K::SingleQuotedString,
    K::StringBegin,
    K::Variable,
    K::Dollar,
    K::Backquote,
    K::ProcessSubstIn,
    K::ProcessSubstOut,
]);

/// Tokens that may continue a word when directly adjacent to it.
pub const WORD_CONTINUATION: TokenSet = TokenSet::new(&[
    K::Word,
    K::Number,
    K::AssignmentWord,
    K::Eq,
    K::AddEq,
    K::LeftSquare,
    K::SingleQuotedString,
    K::StringBegin,
    K::Variable,
    K::Dollar,
    K::Backquote,
    K::ProcessSubstIn,
    K::ProcessSubstOut,
]);

/// Redirect operators.
pub const REDIRECTS: TokenSet = TokenSet::new(&[
    K::RedirectIn,
    K::RedirectOut,
    K::RedirectAppend,
    K::RedirectReadWrite,
    K::RedirectClobber,
    K::RedirectBoth,
    K::RedirectBothAppend,
    K::RedirectDupOut,
    K::RedirectDupIn,
    K::HereString,
    K::HeredocOperator,
    K::HeredocOperatorStrip,
]);

/// Here-document related tokens.
pub const HEREDOC: TokenSet = TokenSet::new(&[
    K::HeredocOperator,
    K::HeredocOperatorStrip,
    K::HeredocMarkerStart,
    K::HeredocContent,
    K::HeredocMarkerEnd,
]);

/// Tokens that introduce or belong to an expansion.
pub const EXPANSIONS: TokenSet = TokenSet::new(&[
    K::Variable,
    K::Dollar,
    K::Backquote,
    K::ParamExpansionOp,
    K::ProcessSubstIn,
    K::ProcessSubstOut,
]);

/// Reserved words.
pub const KEYWORDS: TokenSet = TokenSet::new(&[
    K::If,
    K::Then,
    K::Else,
    K::Elif,
    K::Fi,
    K::For,
    K::Select,
    K::In,
    K::Do,
    K::Done,
    K::While,
    K::Until,
    K::Case,
    K::Esac,
    K::Function,
    K::Time,
    K::Coproc,
    K::Bang,
    K::LeftCurly,
    K::RightCurly,
    K::LeftDoubleBracket,
    K::RightDoubleBracket,
]);

/// Operators that join pipelines into lists.
pub const LIST_OPERATORS: TokenSet = TokenSet::new(&[K::AndAnd, K::OrOr]);

/// Tokens that end a command.
pub const COMMAND_SEPARATORS: TokenSet = TokenSet::new(&[K::Semi, K::Amp, K::LineFeed]);

/// Tokens that end a case clause body.
pub const CASE_TERMINATORS: TokenSet =
    TokenSet::new(&[K::CaseEnd, K::CaseFallthrough, K::CaseContinue]);

/// Operators of arithmetic expressions.
pub const ARITH_OPERATORS: TokenSet = TokenSet::new(&[
    K::ArithPlus,
    K::ArithMinus,
    K::ArithMult,
    K::ArithDiv,
    K::ArithMod,
    K::ArithExp,
    K::ArithPlusPlus,
    K::ArithMinusMinus,
    K::ArithShiftLeft,
    K::ArithShiftRight,
    K::ArithLt,
    K::ArithGt,
    K::ArithLe,
    K::ArithGe,
    K::ArithEqEq,
    K::ArithNe,
    K::ArithBitAnd,
    K::ArithBitOr,
    K::ArithBitXor,
    K::ArithBitNot,
    K::ArithNot,
    K::ArithAnd,
    K::ArithOr,
    K::ArithQuestion,
    K::ArithColon,
    K::ArithComma,
    K::ArithAssign,
    K::ArithAssignOp,
]);

impl TokenKind {
    /// Trivia is kept in the tree but skipped for lookahead.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        TRIVIA.contains(self)
    }

    /// Can this token begin a word?
    #[must_use]
    pub fn is_word_start(self) -> bool {
        WORD_START.contains(self)
    }

    /// Can this token continue an adjacent word?
    #[must_use]
    pub fn is_word_continuation(self) -> bool {
        WORD_CONTINUATION.contains(self)
    }

    /// Is this a redirect operator?
    #[must_use]
    pub fn is_redirect(self) -> bool {
        REDIRECTS.contains(self)
    }

    /// Does this token introduce or belong to an expansion?
    #[must_use]
    pub fn is_expansion(self) -> bool {
        EXPANSIONS.contains(self)
    }

    #[must_use]
    pub fn is_keyword(self) -> bool {
        KEYWORDS.contains(self)
    }

    #[must_use]
    pub fn is_heredoc(self) -> bool {
        HEREDOC.contains(self)
    }

    #[must_use]
    pub fn is_arith_operator(self) -> bool {
        ARITH_OPERATORS.contains(self)
    }

    /// Reserved word for `text`, if it is one.
    ///
    /// `coproc` is only reserved in the extended dialect; `{`, `}`,
    /// `[[`, `]]` and `!` are recognised by the lexer directly.
    #[must_use]
    pub fn keyword(text: &str, extended: bool) -> Option<Self> {
        let kind = match text {
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "elif" => Self::Elif,
            "fi" => Self::Fi,
            "for" => Self::For,
            "select" => Self::Select,
            "in" => Self::In,
            "do" => Self::Do,
            "done" => Self::Done,
            "while" => Self::While,
            "until" => Self::Until,
            "case" => Self::Case,
            "esac" => Self::Esac,
            "function" => Self::Function,
            "time" => Self::Time,
            "coproc" if extended => Self::Coproc,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable rendering used in error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::LineContinuation => "line continuation",
            Self::Comment => "comment",
            Self::LineFeed => "newline",
            Self::Word => "word",
            Self::Number => "number",
            Self::AssignmentWord => "assignment",
            Self::Eq | Self::ArithAssign => "'='",
            Self::AddEq => "'+='",
            Self::SingleQuotedString => "string",
            Self::StringBegin | Self::StringEnd => "'\"'",
            Self::StringContent => "string content",
            Self::Variable => "variable",
            Self::Dollar => "'$'",
            Self::Backquote => "'`'",
            Self::ParamExpansionOp => "expansion operator",
            Self::FileDescriptor => "file descriptor",
            Self::CondOp => "conditional operator",
            Self::LeftParen => "'('",
            Self::RightParen => "')'",
            Self::LeftSquare => "'['",
            Self::RightSquare => "']'",
            Self::LeftCurly => "'{'",
            Self::RightCurly => "'}'",
            Self::LeftDoubleBracket => "'[['",
            Self::RightDoubleBracket => "']]'",
            Self::ExprArithStart => "'(('",
            Self::ExprArithEnd => "'))'",
            Self::Semi => "';'",
            Self::CaseEnd => "';;'",
            Self::CaseFallthrough => "';&'",
            Self::CaseContinue => "';;&'",
            Self::Amp | Self::ArithBitAnd => "'&'",
            Self::AndAnd | Self::ArithAnd => "'&&'",
            Self::OrOr | Self::ArithOr => "'||'",
            Self::Pipe | Self::ArithBitOr => "'|'",
            Self::PipeAmp => "'|&'",
            Self::RedirectIn | Self::ArithLt => "'<'",
            Self::RedirectOut | Self::ArithGt => "'>'",
            Self::RedirectAppend | Self::ArithShiftRight => "'>>'",
            Self::RedirectReadWrite => "'<>'",
            Self::RedirectClobber => "'>|'",
            Self::RedirectBoth => "'&>'",
            Self::RedirectBothAppend => "'&>>'",
            Self::RedirectDupOut => "'>&'",
            Self::RedirectDupIn => "'<&'",
            Self::HereString => "'<<<'",
            Self::HeredocOperator | Self::ArithShiftLeft => "'<<'",
            Self::HeredocOperatorStrip => "'<<-'",
            Self::HeredocMarkerStart => "here-document marker",
            Self::HeredocContent => "here-document content",
            Self::HeredocMarkerEnd => "here-document end marker",
            Self::ProcessSubstIn => "'<('",
            Self::ProcessSubstOut => "'>('",
            Self::If => "'if'",
            Self::Then => "'then'",
            Self::Else => "'else'",
            Self::Elif => "'elif'",
            Self::Fi => "'fi'",
            Self::For => "'for'",
            Self::Select => "'select'",
            Self::In => "'in'",
            Self::Do => "'do'",
            Self::Done => "'done'",
            Self::While => "'while'",
            Self::Until => "'until'",
            Self::Case => "'case'",
            Self::Esac => "'esac'",
            Self::Function => "'function'",
            Self::Time => "'time'",
            Self::Coproc => "'coproc'",
            Self::Bang | Self::ArithNot => "'!'",
            Self::ArithPlus => "'+'",
            Self::ArithMinus => "'-'",
            Self::ArithMult => "'*'",
            Self::ArithDiv => "'/'",
            Self::ArithMod => "'%'",
            Self::ArithExp => "'**'",
            Self::ArithPlusPlus => "'++'",
            Self::ArithMinusMinus => "'--'",
            Self::ArithLe => "'<='",
            Self::ArithGe => "'>='",
            Self::ArithEqEq => "'=='",
            Self::ArithNe => "'!='",
            Self::ArithBitXor => "'^'",
            Self::ArithBitNot => "'~'",
            Self::ArithQuestion => "'?'",
            Self::ArithColon => "':'",
            Self::ArithComma => "','",
            Self::ArithAssignOp => "assignment operator",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single token with its kind, source range, and raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_respect_dialect() {
        assert_eq!(TokenKind::keyword("esac", false), Some(TokenKind::Esac));
        assert_eq!(TokenKind::keyword("coproc", true), Some(TokenKind::Coproc));
        assert_eq!(TokenKind::keyword("coproc", false), None);
        assert_eq!(TokenKind::keyword("echo", true), None);
    }

    #[test]
    fn classification_sets() {
        assert!(TokenKind::Variable.is_word_start());
        assert!(TokenKind::Variable.is_expansion());
        assert!(!TokenKind::Eq.is_word_start());
        assert!(TokenKind::Eq.is_word_continuation());
        assert!(TokenKind::HeredocOperatorStrip.is_redirect());
        assert!(TokenKind::HeredocOperatorStrip.is_heredoc());
        assert!(!TokenKind::LineFeed.is_trivia());
        assert!(TokenKind::Comment.is_trivia());
        assert!(TokenKind::Elif.is_keyword());
        assert!(!TokenKind::Word.is_keyword());
        assert!(TokenKind::ArithMinus.is_arith_operator());
        assert!(!TokenKind::Pipe.is_arith_operator());
    }

    #[test]
    fn position_counts_lines_and_chars() {
        let src = "ab\ncä d";
        assert_eq!(Position::locate(src, 0), Position { line: 1, column: 1 });
        assert_eq!(Position::locate(src, 3), Position { line: 2, column: 1 });
        // byte 6 is after the two-byte 'ä'
        assert_eq!(Position::locate(src, 6), Position { line: 2, column: 3 });
        assert_eq!(Position::locate(src, 99), Position { line: 2, column: 5 });
    }

    #[test]
    fn span_cover() {
        let span = Span::new(4, 6).cover(Span::new(1, 5));
        assert_eq!(span, Span::new(1, 6));
        assert_eq!(span.len(), 5);
        assert!(Span::empty(3).is_empty());
    }
}
