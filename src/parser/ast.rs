//! Syntax tree for Cadence interaction source
//!
//! The tree is deliberately shallow: import declarations are parsed into
//! structured form because their addresses take part in network-scoped
//! hashing, while everything after the imports is kept as delimiter-balanced
//! token trees.

use super::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node - a complete script or transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub imports: Vec<Spanned<ImportDecl>>,
    pub body: Vec<TokenTree>,
}

/// Import declaration
///
/// Covers `import A, B from 0xADDR`, `import A from 0xPLACEHOLDER`,
/// `import "A"` and `import A`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub contracts: Vec<Spanned<String>>,
    /// Raw `0x...` location as written, if any
    pub location: Option<Spanned<String>>,
}

/// Grouping delimiter of a token tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Brace,
    Paren,
    Bracket,
}

impl Delimiter {
    pub fn open(self) -> &'static str {
        match self {
            Delimiter::Brace => "{",
            Delimiter::Paren => "(",
            Delimiter::Bracket => "[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delimiter::Brace => "}",
            Delimiter::Paren => ")",
            Delimiter::Bracket => "]",
        }
    }
}

/// A leaf token or a balanced, delimited group of trees
#[derive(Debug, Clone, PartialEq)]
pub enum TokenTree {
    Leaf(Token),
    Group {
        delimiter: Delimiter,
        children: Vec<TokenTree>,
    },
}

