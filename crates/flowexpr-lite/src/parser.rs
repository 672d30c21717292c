use thiserror::Error;

use crate::ast::{BinaryOperator, Literal, Node, NodeKind, TypeName, UnaryOperator};
use crate::lexer::token::{TextRange, Token, TokenKind};

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{0}`")]
    UnexpectedToken(Token),
    #[error("Unexpected end of expression")]
    UnexpectedEof(TextRange),
    #[error("Expected `{1}` but got `{0}`")]
    Expected(Token, &'static str),
    #[error("Expected an identifier but got `{0}`")]
    ExpectedIdent(Token),
    #[error("Expression is nested too deeply")]
    TooDeep(TextRange),
}

impl ParseError {
    pub fn range(&self) -> TextRange {
        match self {
            ParseError::UnexpectedToken(token) | ParseError::Expected(token, _) | ParseError::ExpectedIdent(token) => {
                token.range
            }
            ParseError::UnexpectedEof(range) | ParseError::TooDeep(range) => *range,
        }
    }
}

/// Deepest nesting of parenthesized, bracketed or prefixed subexpressions.
const MAX_DEPTH: usize = 128;

/// Parses a token stream produced by [`crate::lexer::tokenize`] into a single expression.
pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    let mut parser = Parser::new(tokens);
    let node = parser.parse_assign()?;
    let next = parser.peek();
    if next.is_eof() {
        Ok(node)
    } else {
        Err(ParseError::UnexpectedToken(next.clone()))
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    eof: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let end = tokens.last().map(|t| t.range.end()).unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            depth: 0,
            eof: Token {
                range: TextRange::new(end, 0),
                kind: TokenKind::Eof,
            },
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, display: &'static str) -> Result<Token, ParseError> {
        let token = self.next();
        if token.kind == kind {
            Ok(token)
        } else if token.is_eof() {
            Err(ParseError::UnexpectedEof(token.range))
        } else {
            Err(ParseError::Expected(token, display))
        }
    }

    fn expect_ident(&mut self) -> Result<(smol_str::SmolStr, TextRange), ParseError> {
        let token = self.next();
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.range)),
            TokenKind::Eof => Err(ParseError::UnexpectedEof(token.range)),
            _ => Err(ParseError::ExpectedIdent(token)),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node, ParseError>) -> Result<Node, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(self.peek().range));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn parse_assign(&mut self) -> Result<Node, ParseError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        let target = self.parse_conditional()?;
        if self.eat(&TokenKind::Equal) {
            let value = self.parse_assign()?;
            let range = target.range.cover(value.range);
            return Ok(Node::new(
                NodeKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                range,
            ));
        }
        Ok(target)
    }

    fn parse_conditional(&mut self) -> Result<Node, ParseError> {
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let if_true = self.parse_assign()?;
        self.expect(TokenKind::Colon, ":")?;
        let if_false = self.parse_assign()?;
        let range = test.range.cover(if_false.range);
        Ok(Node::new(
            NodeKind::Conditional {
                test: Box::new(test),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            range,
        ))
    }

    fn binary_op(kind: &TokenKind) -> Option<(u8, BinaryOperator)> {
        let op = match kind {
            TokenKind::OrOr => (1, BinaryOperator::Or),
            TokenKind::AndAnd => (2, BinaryOperator::And),
            TokenKind::EqEq => (3, BinaryOperator::Eq),
            TokenKind::NeEq => (3, BinaryOperator::Ne),
            TokenKind::Lt => (4, BinaryOperator::Lt),
            TokenKind::Lte => (4, BinaryOperator::Lte),
            TokenKind::Gt => (4, BinaryOperator::Gt),
            TokenKind::Gte => (4, BinaryOperator::Gte),
            TokenKind::Plus => (5, BinaryOperator::Add),
            TokenKind::Minus => (5, BinaryOperator::Sub),
            TokenKind::Star => (6, BinaryOperator::Mul),
            TokenKind::Slash => (6, BinaryOperator::Div),
            TokenKind::Percent => (6, BinaryOperator::Mod),
            _ => return None,
        };
        Some(op)
    }

    const TYPE_TEST_PRECEDENCE: u8 = 4;

    fn parse_binary(&mut self, min_prec: u8) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let kind = self.peek().kind.clone();
            if matches!(kind, TokenKind::Is | TokenKind::As) {
                if Self::TYPE_TEST_PRECEDENCE < min_prec {
                    break;
                }
                self.next();
                let ty = self.parse_type_name()?;
                let range = lhs.range.cover(ty.range);
                let operand = Box::new(lhs);
                lhs = Node::new(
                    match kind {
                        TokenKind::Is => NodeKind::Is { operand, ty },
                        _ => NodeKind::As { operand, ty },
                    },
                    range,
                );
                continue;
            }

            let Some((prec, op)) = Self::binary_op(&kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.next();
            let rhs = self.parse_binary(prec + 1)?;
            let range = lhs.range.cover(rhs.range);
            lhs = Node::new(
                NodeKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                range,
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.next().range;
        let operand = self.nested(Self::parse_unary)?;
        let range = start.cover(operand.range);
        Ok(Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            range,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let (name, name_range) = self.expect_ident()?;
                if self.eat(&TokenKind::LParen) {
                    let (args, close) = self.parse_args(TokenKind::RParen, ")")?;
                    let range = node.range.cover(close);
                    node = Node::new(
                        NodeKind::MethodCall {
                            target: Box::new(node),
                            name,
                            args,
                        },
                        range,
                    );
                } else {
                    let range = node.range.cover(name_range);
                    node = Node::new(
                        NodeKind::Member {
                            target: Box::new(node),
                            name,
                        },
                        range,
                    );
                }
            } else if self.eat(&TokenKind::LBracket) {
                let (args, close) = self.parse_args(TokenKind::RBracket, "]")?;
                let range = node.range.cover(close);
                node = Node::new(
                    NodeKind::Index {
                        target: Box::new(node),
                        args,
                    },
                    range,
                );
            } else {
                return Ok(node);
            }
        }
    }

    /// Parses comma-separated expressions up to and including `close`.
    fn parse_args(&mut self, close: TokenKind, display: &'static str) -> Result<(Vec<Node>, TextRange), ParseError> {
        let mut args = Vec::new();
        if self.peek().kind == close {
            return Ok((args, self.next().range));
        }
        loop {
            args.push(self.parse_assign()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let token = self.expect(close, display)?;
        Ok((args, token.range))
    }

    fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let (first, mut range) = self.expect_ident()?;
        let mut name = first.to_string();
        // a trailing `.` followed by something other than an identifier ends the name
        while self.peek().kind == TokenKind::Dot
            && matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Ident(_)))
        {
            self.next();
            let (part, part_range) = self.expect_ident()?;
            name.push('.');
            name.push_str(&part);
            range = range.cover(part_range);
        }
        Ok(TypeName {
            name: name.into(),
            range,
        })
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.next();
        let literal = |literal: Literal| -> Result<Node, ParseError> {
            Ok(Node::new(NodeKind::Literal(literal), token.range))
        };
        match &token.kind {
            TokenKind::IntLiteral(n) => literal(Literal::Int(*n)),
            TokenKind::FloatLiteral(n) => literal(Literal::Float(*n)),
            TokenKind::StringLiteral(s) => literal(Literal::String(s.clone())),
            TokenKind::BoolLiteral(b) => literal(Literal::Bool(*b)),
            TokenKind::Null => literal(Literal::Null),
            TokenKind::Ident(name) => Ok(Node::new(NodeKind::Ident(name.clone()), token.range)),
            TokenKind::LParen => {
                let inner = self.parse_assign()?;
                let close = self.expect(TokenKind::RParen, ")")?;
                Ok(Node::new(inner.kind, token.range.cover(close.range)))
            }
            TokenKind::New => self.parse_new(token.range),
            TokenKind::Typeof => {
                self.expect(TokenKind::LParen, "(")?;
                let ty = self.parse_type_name()?;
                let close = self.expect(TokenKind::RParen, ")")?;
                Ok(Node::new(NodeKind::TypeOf(ty), token.range.cover(close.range)))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof(token.range)),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn parse_new(&mut self, start: TextRange) -> Result<Node, ParseError> {
        let ty = self.parse_type_name()?;
        if self.eat(&TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "]")?;
            self.expect(TokenKind::LBrace, "{")?;
            let (items, close) = self.parse_args(TokenKind::RBrace, "}")?;
            return Ok(Node::new(NodeKind::NewArray { element: ty, items }, start.cover(close)));
        }
        self.expect(TokenKind::LParen, "(")?;
        let (args, close) = self.parse_args(TokenKind::RParen, ")")?;
        Ok(Node::new(NodeKind::New { ty, args }, start.cover(close)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(input: &str) -> Result<Node, ParseError> {
        parse(&tokenize(input).unwrap())
    }

    /// Compact rendering used to compare tree shapes.
    fn render(node: &Node) -> String {
        match &node.kind {
            NodeKind::Literal(Literal::Int(n)) => n.to_string(),
            NodeKind::Literal(Literal::Float(n)) => n.to_string(),
            NodeKind::Literal(Literal::String(s)) => format!("{s:?}"),
            NodeKind::Literal(Literal::Bool(b)) => b.to_string(),
            NodeKind::Literal(Literal::Null) => "null".to_string(),
            NodeKind::Ident(name) => name.to_string(),
            NodeKind::Member { target, name } => format!("{}.{name}", render(target)),
            NodeKind::MethodCall { target, name, args } => {
                format!("{}.{name}({})", render(target), args.iter().map(render).collect::<Vec<_>>().join(", "))
            }
            NodeKind::Index { target, args } => {
                format!("{}[{}]", render(target), args.iter().map(render).collect::<Vec<_>>().join(", "))
            }
            NodeKind::New { ty, args } => {
                format!("new {}({})", ty.name, args.iter().map(render).collect::<Vec<_>>().join(", "))
            }
            NodeKind::NewArray { element, items } => {
                format!("new {}[]{{{}}}", element.name, items.iter().map(render).collect::<Vec<_>>().join(", "))
            }
            NodeKind::TypeOf(ty) => format!("typeof({})", ty.name),
            NodeKind::Is { operand, ty } => format!("({} is {})", render(operand), ty.name),
            NodeKind::As { operand, ty } => format!("({} as {})", render(operand), ty.name),
            NodeKind::Unary { op, operand } => format!("({op:?} {})", render(operand)),
            NodeKind::Binary { op, left, right } => format!("({op:?} {} {})", render(left), render(right)),
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => format!("({} ? {} : {})", render(test), render(if_true), render(if_false)),
            NodeKind::Assign { target, value } => format!("({} = {})", render(target), render(value)),
        }
    }

    #[rstest]
    #[case::precedence("1 + 2 * 3", "(Add 1 (Mul 2 3))")]
    #[case::left_assoc("a - b - c", "(Sub (Sub a b) c)")]
    #[case::logical("a && b || !c", "(Or (And a b) (Not c))")]
    #[case::member_arith("customer.Age + 1", "(Add customer.Age 1)")]
    #[case::method_call("name.Contains(\"x\")", "name.Contains(\"x\")")]
    #[case::static_call("System.Math.Max(1, -2)", "System.Math.Max(1, (Negate 2))")]
    #[case::indexing("items[0].Name", "items[0].Name")]
    #[case::new_object("new Contoso.Point(1, 2)", "new Contoso.Point(1, 2)")]
    #[case::new_array("new Int32[] { 1, 2 }", "new Int32[]{1, 2}")]
    #[case::typeof_expr("typeof(String)", "typeof(String)")]
    #[case::type_tests("o is String && o as String == null", "(And (o is String) (Eq (o as String) null))")]
    #[case::conditional("a > 1 ? b : c", "((Gt a 1) ? b : c)")]
    #[case::assign("x = y = 1 + 2", "(x = (y = (Add 1 2)))")]
    #[case::parens("(1 + 2) * 3", "(Mul (Add 1 2) 3)")]
    fn test_parse(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(render(&parse_str(input).unwrap()), expected);
    }

    #[test]
    fn test_ranges_cover_source() {
        let node = parse_str("customer.Age + 1").unwrap();
        assert_eq!(node.range, TextRange::new(0, 16));
        let NodeKind::Binary { left, .. } = node.kind else {
            panic!("expected a binary node");
        };
        assert_eq!(left.range, TextRange::new(0, 12));
        assert_eq!(left.dotted_path().as_deref(), Some("customer.Age"));
        assert_eq!(left.root_ident(), Some("customer"));
    }

    #[rstest]
    #[case::dangling_operator("1 +", ParseError::UnexpectedEof(TextRange::new(3, 0)))]
    #[case::missing_paren("(1 + 2", ParseError::UnexpectedEof(TextRange::new(6, 0)))]
    #[case::trailing_token(
        "a b",
        ParseError::UnexpectedToken(Token { range: TextRange::new(2, 1), kind: TokenKind::Ident("b".into()) })
    )]
    #[case::member_needs_ident(
        "a.1",
        ParseError::ExpectedIdent(Token { range: TextRange::new(2, 1), kind: TokenKind::IntLiteral(1) })
    )]
    #[case::missing_colon(
        "a ? b c",
        ParseError::Expected(Token { range: TextRange::new(6, 1), kind: TokenKind::Ident("c".into()) }, ":")
    )]
    fn test_parse_errors(#[case] input: &str, #[case] expected: ParseError) {
        assert_eq!(parse_str(input), Err(expected));
    }

    #[test]
    fn test_nesting_limit() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse_str(&parens), Err(ParseError::TooDeep(TextRange::new(MAX_DEPTH, 1))));

        let negations = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse_str(&negations), Err(ParseError::TooDeep(_))));

        let shallow = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(render(&parse_str(&shallow).unwrap()), "1");
    }
}
