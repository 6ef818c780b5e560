//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::ParseError;

/// Parse Cadence source into a [`Program`]
pub fn parse(input: &str) -> Result<Program, Vec<ParseError>> {
    let len = input.len();

    let mut tokens = Vec::new();
    let mut lex_errors = Vec::new();
    for item in crate::parser::lexer::lex(input) {
        match item {
            Ok((tok, span)) => tokens.push((tok, SimpleSpan::from(span))),
            Err(span) => lex_errors.push(ParseError::UnexpectedCharacter {
                found: input.get(span.clone()).unwrap_or_default().to_string(),
                span,
            }),
        }
    }
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }

    let token_stream =
        Stream::from_iter(tokens.into_iter()).map((len..len).into(), |(t, s): (_, _)| (t, s));

    program_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn program_parser<'a, I>() -> impl Parser<'a, I, Program, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let contract_name = select! {
        Token::Ident(s) => s,
    }
    .labelled("contract name")
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let quoted_contract = select! {
        Token::Str(s) => s.trim_matches('"').to_string(),
    }
    .labelled("contract string")
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let location = select! {
        Token::Address(a) => a,
    }
    .labelled("address")
    .map_with(|a, e| Spanned::new(a, span_range(&e.span())));

    // import A, B from 0x01 | import A
    let named_import = contract_name
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then(just(Token::From).ignore_then(location).or_not())
        .map(|(contracts, location)| ImportDecl {
            contracts,
            location,
        });

    // import "A"
    let string_import = quoted_contract.map(|name| ImportDecl {
        contracts: vec![name],
        location: None,
    });

    let import = just(Token::Import)
        .ignore_then(choice((string_import, named_import)))
        .map_with(|decl, e| Spanned::new(decl, span_range(&e.span())));

    let tree = recursive(|tree| {
        let group = |open: Token, close: Token, delimiter: Delimiter| {
            tree.clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(open), just(close))
                .map(move |children| TokenTree::Group {
                    delimiter,
                    children,
                })
        };

        let leaf = any()
            .filter(|t: &Token| t.is_leaf())
            .map(TokenTree::Leaf)
            .labelled("token");

        choice((
            group(Token::BraceOpen, Token::BraceClose, Delimiter::Brace),
            group(Token::ParenOpen, Token::ParenClose, Delimiter::Paren),
            group(Token::BracketOpen, Token::BracketClose, Delimiter::Bracket),
            leaf,
        ))
        .boxed()
    });

    // Program is a list of imports followed by a non-empty body
    import
        .repeated()
        .collect::<Vec<_>>()
        .then(tree.repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(imports, body)| Program { imports, body })
}
