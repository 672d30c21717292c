pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of},
    combinator::{map, map_opt, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use nom_locate::{LocatedSpan, position};
use token::{TextRange, Token, TokenKind};

type Span<'a> = LocatedSpan<&'a str>;

fn range_of(span: &Span) -> TextRange {
    TextRange::new(span.location_offset(), span.fragment().len())
}

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: range_of(&span),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

/// Splits expression text into tokens, always ending with [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    let (rest, mut tokens) = match many0(delimited(multispace0, token, multispace0)).parse(Span::new(input)) {
        Ok(result) => result,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(unexpected_at(e.input)),
        Err(nom::Err::Incomplete(_)) => return Err(unexpected_at(Span::new(input))),
    };

    let trailing = rest.fragment().trim_start();
    if !trailing.is_empty() {
        let offset = rest.location_offset() + (rest.fragment().len() - trailing.len());
        let digits: String = trailing.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            return Err(LexerError::IntegerOutOfRange(TextRange::new(offset, digits.len()), digits));
        }
        let ch = trailing.chars().next().unwrap_or_default();
        return Err(LexerError::UnexpectedCharacter(TextRange::new(offset, ch.len_utf8()), ch));
    }

    tokens.push(Token {
        range: TextRange::new(input.len(), 0),
        kind: TokenKind::Eof,
    });
    Ok(tokens)
}

fn unexpected_at(span: Span) -> LexerError {
    let ch = span.fragment().chars().next().unwrap_or_default();
    LexerError::UnexpectedCharacter(TextRange::new(span.location_offset(), ch.len_utf8()), ch)
}

define_token_parser!(and_and, "&&", TokenKind::AndAnd);
define_token_parser!(or_or, "||", TokenKind::OrOr);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(star, "*", TokenKind::Star);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(bang, "!", TokenKind::Bang);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(empty_string, "\"\"", TokenKind::StringLiteral(String::new()));

fn operators(input: Span) -> IResult<Span, Token> {
    alt((and_and, or_or, lte, gte, eq_eq, ne_eq)).parse(input)
}

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        l_paren, r_paren, l_bracket, r_bracket, l_brace, r_brace, comma, dot, question, colon, plus, minus, star,
        slash, percent, lt, gt, bang, equal,
    ))
    .parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |span: Span| {
            let text = *span.fragment();
            let kind = if text.contains('.') {
                text.parse::<f64>().map(TokenKind::FloatLiteral).map_err(|_| ())?
            } else {
                text.parse::<i64>().map(TokenKind::IntLiteral).map_err(|_| ())?
            };
            Ok::<_, ()>(Token {
                range: range_of(&span),
                kind,
            })
        },
    )
    .parse(input)
}

fn unicode(input: Span) -> IResult<Span, char> {
    map_opt(
        map_res(
            preceded(
                char('u'),
                delimited(
                    char('{'),
                    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                    char('}'),
                ),
            ),
            |span: Span| u32::from_str_radix(span.fragment(), 16),
        ),
        char::from_u32,
    )
    .parse(input)
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, s) = delimited(
        char('"'),
        escaped_transform(
            none_of("\"\\"),
            '\\',
            alt((
                value('\\', char('\\')),
                value('\"', char('\"')),
                value('\r', char('r')),
                value('\n', char('n')),
                value('\t', char('t')),
                unicode,
            )),
        ),
        char('"'),
    )
    .parse(span)?;
    let (span, end) = position(span)?;

    Ok((
        span,
        Token {
            range: TextRange::new(
                start.location_offset(),
                end.location_offset() - start.location_offset(),
            ),
            kind: TokenKind::StringLiteral(s.to_string()),
        },
    ))
}

fn literals(input: Span) -> IResult<Span, Token> {
    alt((number_literal, empty_string, string_literal)).parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(alt((alpha1, tag("_"))), many0(alt((alphanumeric1, tag("_")))))),
        |span: Span| {
            let kind = match *span.fragment() {
                "true" => TokenKind::BoolLiteral(true),
                "false" => TokenKind::BoolLiteral(false),
                "null" => TokenKind::Null,
                "new" => TokenKind::New,
                "typeof" => TokenKind::Typeof,
                "is" => TokenKind::Is,
                "as" => TokenKind::As,
                name => TokenKind::Ident(name.into()),
            };
            Token {
                range: range_of(&span),
                kind,
            }
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((operators, punctuations, literals, ident)).parse(input)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[rstest]
    #[case::member_arithmetic(
        "customer.Age + 1",
        vec![
            TokenKind::Ident("customer".into()),
            TokenKind::Dot,
            TokenKind::Ident("Age".into()),
            TokenKind::Plus,
            TokenKind::IntLiteral(1),
            TokenKind::Eof,
        ]
    )]
    #[case::comparisons(
        "a<=b&&c!=d||!e",
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Lte,
            TokenKind::Ident("b".into()),
            TokenKind::AndAnd,
            TokenKind::Ident("c".into()),
            TokenKind::NeEq,
            TokenKind::Ident("d".into()),
            TokenKind::OrOr,
            TokenKind::Bang,
            TokenKind::Ident("e".into()),
            TokenKind::Eof,
        ]
    )]
    #[case::keywords(
        "new Point[] { } is typeof as null true",
        vec![
            TokenKind::New,
            TokenKind::Ident("Point".into()),
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Is,
            TokenKind::Typeof,
            TokenKind::As,
            TokenKind::Null,
            TokenKind::BoolLiteral(true),
            TokenKind::Eof,
        ]
    )]
    #[case::numbers(
        "1.5 42 7.ToString()",
        vec![
            TokenKind::FloatLiteral(1.5),
            TokenKind::IntLiteral(42),
            TokenKind::IntLiteral(7),
            TokenKind::Dot,
            TokenKind::Ident("ToString".into()),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    )]
    #[case::strings(
        r#""" "a\"b\u{0063}""#,
        vec![
            TokenKind::StringLiteral(String::new()),
            TokenKind::StringLiteral("a\"bc".to_string()),
            TokenKind::Eof,
        ]
    )]
    fn test_tokenize(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_token_ranges() {
        let tokens = tokenize("  x == \"ab\"").unwrap();
        assert_eq!(tokens[0].range, TextRange::new(2, 1));
        assert_eq!(tokens[1].range, TextRange::new(4, 2));
        assert_eq!(tokens[2].range, TextRange::new(7, 4));
        assert_eq!(tokens[3].range, TextRange::new(11, 0));
    }

    #[rstest]
    #[case::unknown_char("x # y", LexerError::UnexpectedCharacter(TextRange::new(2, 1), '#'))]
    #[case::unterminated("\"abc", LexerError::UnexpectedCharacter(TextRange::new(0, 1), '"'))]
    #[case::too_large(
        "99999999999999999999",
        LexerError::IntegerOutOfRange(TextRange::new(0, 20), "99999999999999999999".to_string())
    )]
    fn test_tokenize_errors(#[case] input: &str, #[case] expected: LexerError) {
        assert_eq!(tokenize(input), Err(expected));
    }
}
