//! Lossless syntax tree produced by the parser.

use std::fmt;

use crate::parser::ParseError;
use crate::token::{Span, Token, TokenKind};

/// Grammatical construct a [`Node`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    /// Pipelines joined by `&&` or `||`.
    List,
    /// Commands joined by `|` or `|&`, with optional `!` and `time`.
    Pipeline,
    SimpleCommand,
    /// Variable definition: `name=value`, `name[i]=value`, `declare name`.
    VarDef,
    /// `( ... )` on the right-hand side of an array assignment.
    AssignmentList,
    /// One value of an assignment list, optionally `[index]=`-tagged.
    ArrayElement,
    /// `[ expression ]` subscript.
    ArrayIndex,
    Redirect,
    /// Lines of a here-document up to and including its terminator.
    HeredocBody,
    Word,
    Variable,
    /// `${ ... }`
    ParamExpansion,
    /// `$( ... )`
    CommandSubstitution,
    /// `` `...` ``
    BackquoteCommand,
    /// `$(( ... ))` or `$[ ... ]`
    ArithmeticExpansion,
    /// `<( ... )` or `>( ... )`
    ProcessSubstitution,
    /// Double-quoted string.
    String,
    /// `( ... )` as a command.
    Subshell,
    /// `{ ...; }`
    Group,
    If,
    While,
    Until,
    For,
    /// `for (( init; cond; step ))`
    ArithmeticFor,
    Select,
    Case,
    CaseClause,
    CasePattern,
    FunctionDef,
    /// `[[ ... ]]`
    Conditional,
    /// `(( ... ))` as a command.
    ArithmeticCommand,
    Coproc,
    /// Root of an arithmetic context.
    ArithmeticExpression,
    ArithComma,
    ArithAssignment,
    ArithTernary,
    ArithLogicalOr,
    ArithLogicalAnd,
    ArithBitwiseOr,
    ArithBitwiseXor,
    ArithBitwiseAnd,
    ArithEquality,
    ArithComparison,
    ArithShift,
    ArithAdditive,
    ArithMultiplicative,
    ArithExponent,
    ArithUnary,
    ArithPostfix,
    ArithParenthesized,
    ArithLiteral,
    ArithVariable,
    /// Tokens the parser could not place.
    Error,
}

impl NodeKind {
    /// Nodes that belong to an arithmetic expression.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::ArithmeticExpression
                | Self::ArithComma
                | Self::ArithAssignment
                | Self::ArithTernary
                | Self::ArithLogicalOr
                | Self::ArithLogicalAnd
                | Self::ArithBitwiseOr
                | Self::ArithBitwiseXor
                | Self::ArithBitwiseAnd
                | Self::ArithEquality
                | Self::ArithComparison
                | Self::ArithShift
                | Self::ArithAdditive
                | Self::ArithMultiplicative
                | Self::ArithExponent
                | Self::ArithUnary
                | Self::ArithPostfix
                | Self::ArithParenthesized
                | Self::ArithLiteral
                | Self::ArithVariable
        )
    }

    /// Compound commands that may carry trailing redirects.
    #[must_use]
    pub const fn is_compound_command(self) -> bool {
        matches!(
            self,
            Self::Subshell
                | Self::Group
                | Self::If
                | Self::While
                | Self::Until
                | Self::For
                | Self::ArithmeticFor
                | Self::Select
                | Self::Case
                | Self::Conditional
                | Self::ArithmeticCommand
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A child of a [`Node`]: either a nested node or a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Node(Node),
    Token(Token),
}

impl Element {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Node(node) => node.span,
            Self::Token(token) => token.span,
        }
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub const fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }
}

/// A node of the syntax tree.
///
/// `span` covers exactly the tokens below the node. `value` holds the
/// constant-folded result of arithmetic nodes whose operands are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub value: Option<i64>,
    pub children: Vec<Element>,
}

impl Node {
    #[must_use]
    pub const fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            value: None,
            children: Vec::new(),
        }
    }

    /// Direct child nodes.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(Element::as_node)
    }

    /// Direct child tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(Element::as_token)
    }

    /// Direct child tokens that are not trivia.
    pub fn significant_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens().filter(|t| !t.kind.is_trivia())
    }

    /// First direct child node of `kind`.
    #[must_use]
    pub fn child(&self, kind: NodeKind) -> Option<&Self> {
        self.child_nodes().find(|n| n.kind == kind)
    }

    /// Is there a direct child token of `kind`?
    #[must_use]
    pub fn has_token(&self, kind: TokenKind) -> bool {
        self.tokens().any(|t| t.kind == kind)
    }

    /// All nodes below this one, in source order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack: Vec<&Self> = self.child_nodes().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let start = stack.len();
            stack.extend(node.child_nodes());
            stack[start..].reverse();
        }
        out
    }

    /// First node of `kind`, searching `self` and then its descendants.
    #[must_use]
    pub fn find(&self, kind: NodeKind) -> Option<&Self> {
        if self.kind == kind {
            return Some(self);
        }
        self.descendants().into_iter().find(|n| n.kind == kind)
    }

    /// Every node of `kind` at or below `self`, in source order.
    #[must_use]
    pub fn find_all(&self, kind: NodeKind) -> Vec<&Self> {
        let mut out: Vec<&Self> = Vec::new();
        if self.kind == kind {
            out.push(self);
        }
        out.extend(self.descendants().into_iter().filter(|n| n.kind == kind));
        out
    }

    /// Source text covered by this node.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.span.len());
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Element::Node(node) => node.write_text(out),
                Element::Token(token) => out.push_str(&token.text),
            }
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NodeKind::Error
    }
}

/// Result of a parse: the tree plus every recorded error.
///
/// Parsing never aborts; `errors` is sorted by offset and the tree
/// still covers the whole input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub root: Node,
    pub errors: Vec<ParseError>,
}

impl SyntaxTree {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reproduce the source text from the tree.
    #[must_use]
    pub fn text(&self) -> String {
        self.root.text()
    }

    #[must_use]
    pub fn find(&self, kind: NodeKind) -> Option<&Node> {
        self.root.find(kind)
    }

    #[must_use]
    pub fn find_all(&self, kind: NodeKind) -> Vec<&Node> {
        self.root.find_all(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, start: usize, text: &str) -> Element {
        Element::Token(Token::new(kind, Span::new(start, start + text.len()), text))
    }

    fn sample() -> Node {
        let mut word = Node::new(NodeKind::Word, Span::new(0, 4));
        word.children.push(token(TokenKind::Word, 0, "echo"));
        let mut arg = Node::new(NodeKind::Word, Span::new(5, 7));
        arg.children.push(token(TokenKind::Variable, 5, "$x"));
        let mut command = Node::new(NodeKind::SimpleCommand, Span::new(0, 7));
        command.children.push(Element::Node(word));
        command.children.push(token(TokenKind::Whitespace, 4, " "));
        command.children.push(Element::Node(arg));
        let mut file = Node::new(NodeKind::File, Span::new(0, 7));
        file.children.push(Element::Node(command));
        file
    }

    #[test]
    fn text_concatenates_tokens() {
        assert_eq!(sample().text(), "echo $x");
    }

    #[test]
    fn descendants_in_source_order() {
        let file = sample();
        let kinds: Vec<_> = file.descendants().iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::SimpleCommand, NodeKind::Word, NodeKind::Word]
        );
        assert_eq!(file.find_all(NodeKind::Word).len(), 2);
        assert_eq!(
            file.find(NodeKind::Word).map(Node::text),
            Some("echo".to_string())
        );
    }

    #[test]
    fn child_queries() {
        let file = sample();
        let command = file.child(NodeKind::SimpleCommand).expect("command");
        assert!(command.has_token(TokenKind::Whitespace));
        assert_eq!(command.significant_tokens().count(), 0);
        assert_eq!(command.child_nodes().count(), 2);
    }
}
