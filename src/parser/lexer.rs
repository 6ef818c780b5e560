//! Lexer for Cadence source using logos

use logos::{FilterResult, Lexer, Logos};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    // Import keywords
    #[token("import")]
    Import,
    #[token("from")]
    From,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,

    // Operators (longest match wins, so `<-!` beats `<-` beats `<`)
    #[regex(r"<-!|<->|<-|->|==|!=|<=|>=|&&|\|\||\?\?|\?\.|[+\-*/%&|^!~=<>?:;.@#]", |lex| lex.slice().to_string())]
    Op(String),

    // `0x` followed by hex digits is a concrete address; anything else is a
    // placeholder such as `0xFUNGIBLETOKENADDRESS`
    #[regex(r"0x[0-9a-zA-Z_]+", |lex| lex.slice().to_string(), priority = 3)]
    Address(String),

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    /// String literal, kept with its quotes and escapes exactly as written
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    Str(String),

    #[regex(r"[0-9][0-9_]*(\.[0-9][0-9_]*)?", |lex| lex.slice().to_string())]
    Number(String),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,
}

/// Skip a block comment, honouring nested `/* */` pairs
///
/// An unterminated comment consumes the rest of the input as an error.
fn block_comment(lex: &mut Lexer<Token>) -> FilterResult<(), ()> {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i + 1 < rest.len() {
        match (rest[i], rest[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return FilterResult::Skip;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(rest.len());
    FilterResult::Error(())
}

impl Token {
    /// Whether the token may appear as a plain leaf of a program body
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            Token::Import
                | Token::BraceOpen
                | Token::BraceClose
                | Token::ParenOpen
                | Token::ParenClose
                | Token::BracketOpen
                | Token::BracketClose
        )
    }

    /// Source text of the token, normalized for canonical rendering
    pub fn text(&self) -> &str {
        match self {
            Token::Import => "import",
            Token::From => "from",
            Token::BraceOpen => "{",
            Token::BraceClose => "}",
            Token::ParenOpen => "(",
            Token::ParenClose => ")",
            Token::BracketOpen => "[",
            Token::BracketClose => "]",
            Token::Comma => ",",
            Token::Op(s)
            | Token::Address(s)
            | Token::Ident(s)
            | Token::Str(s)
            | Token::Number(s) => s,
            Token::LineComment | Token::BlockComment => "",
        }
    }
}

/// Lex input string into tokens with spans
///
/// Unrecognized input is reported as `Err(span)` rather than dropped, so a
/// stray character never silently disappears from the hashed form.
pub fn lex(input: &str) -> impl Iterator<Item = Result<(Token, Span), Span>> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| tok.map(|t| (t, span.clone())).map_err(|_| span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).map(|r| r.expect("should lex").0).collect()
    }

    #[test]
    fn test_import_keywords() {
        assert_eq!(
            tokens("import FungibleToken from 0xf233dcee88fe0abe"),
            vec![
                Token::Import,
                Token::Ident("FungibleToken".to_string()),
                Token::From,
                Token::Address("0xf233dcee88fe0abe".to_string()),
            ]
        );
    }

    #[test]
    fn test_placeholder_address() {
        assert_eq!(
            tokens("0xFUNGIBLETOKENADDRESS"),
            vec![Token::Address("0xFUNGIBLETOKENADDRESS".to_string())]
        );
    }

    #[test]
    fn test_string_import() {
        assert_eq!(
            tokens(r#"import "FungibleToken""#),
            vec![Token::Import, Token::Str("\"FungibleToken\"".to_string())]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("let x // comment\n/* block\n ** comment */ = 1"),
            vec![
                Token::Ident("let".to_string()),
                Token::Ident("x".to_string()),
                Token::Op("=".to_string()),
                Token::Number("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_block_comment_skipped() {
        assert_eq!(
            tokens("a /* outer /* inner */ still comment */ b"),
            vec![Token::Ident("a".to_string()), Token::Ident("b".to_string())]
        );
    }

    #[test]
    fn test_block_comment_at_start() {
        assert_eq!(
            tokens("/* c */ fun"),
            vec![Token::Ident("fun".to_string())]
        );
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        let results: Vec<_> = lex("fun /* open /* */").collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1], Err(4..17));
    }

    #[test]
    fn test_move_operators() {
        assert_eq!(
            tokens("<- <-! <-> < -"),
            vec![
                Token::Op("<-".to_string()),
                Token::Op("<-!".to_string()),
                Token::Op("<->".to_string()),
                Token::Op("<".to_string()),
                Token::Op("-".to_string()),
            ]
        );
    }

    #[test]
    fn test_storage_path() {
        assert_eq!(
            tokens("/storage/flowTokenVault"),
            vec![
                Token::Op("/".to_string()),
                Token::Ident("storage".to_string()),
                Token::Op("/".to_string()),
                Token::Ident("flowTokenVault".to_string()),
            ]
        );
    }

    #[test]
    fn test_fixed_point_number() {
        assert_eq!(tokens("10.5"), vec![Token::Number("10.5".to_string())]);
    }

    #[test]
    fn test_unknown_character_is_error() {
        let results: Vec<_> = lex("let x = `").collect();
        assert!(results.last().is_some_and(|r| r.is_err()));
    }
}
