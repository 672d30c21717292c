use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

/// Byte range of a token in the expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    pub offset: usize,
    pub len: usize,
}

impl TextRange {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: TextRange) -> TextRange {
        let start = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        TextRange::new(start, end - start)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub range: TextRange,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    AndAnd,
    As,
    Bang,
    BoolLiteral(bool),
    Colon,
    Comma,
    Dot,
    Eof,
    EqEq,
    Equal,
    FloatLiteral(f64),
    Gt,
    Gte,
    Ident(SmolStr),
    IntLiteral(i64),
    Is,
    LBrace,
    LBracket,
    LParen,
    Lt,
    Lte,
    Minus,
    NeEq,
    New,
    Null,
    OrOr,
    Percent,
    Plus,
    Question,
    RBrace,
    RBracket,
    RParen,
    Slash,
    Star,
    StringLiteral(String),
    Typeof,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::As => write!(f, "as"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::BoolLiteral(b) => write!(f, "{}", b),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Equal => write!(f, "="),
            TokenKind::FloatLiteral(n) => write!(f, "{}", n),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::Is => write!(f, "is"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::New => write!(f, "new"),
            TokenKind::Null => write!(f, "null"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::StringLiteral(s) => write!(f, "{:?}", s),
            TokenKind::Typeof => write!(f, "typeof"),
        }
    }
}
