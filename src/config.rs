/// Dialect and parsing behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    /// Enables the extended (bash) grammar: `;&`, `;;&`, `|&`, `&>>`,
    /// `coproc` and the `^ ^^ , ,,` case-modification expansions.
    pub extended: bool,
    /// Source is the argument of an `eval`: `$name=value` counts as an
    /// assignment.
    pub eval_mode: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extended: true,
            eval_mode: false,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain POSIX-style grammar without the extensions.
    #[must_use]
    pub const fn posix() -> Self {
        Self {
            extended: false,
            eval_mode: false,
        }
    }

    #[must_use]
    pub const fn extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    #[must_use]
    pub const fn eval_mode(mut self, eval_mode: bool) -> Self {
        self.eval_mode = eval_mode;
        self
    }
}
