//! PURPOSE: Turns a token stream into a [`MarkerExpr`].
//! CONTEXT: Grammar is deliberately tiny: `expr := path | name '(' args? ')'`,
//! `path := ident ('.' ident)*`, `args := arg (',' arg)*`,
//! `arg := ident '=' value | value`, `value := ident | number`.

use crate::ast::{Arg, ArgValue, MarkerExpr};
use crate::lexer::Lexer;
use crate::token::Token;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError(format!(
                "expected {expected}, found {}",
                self.current
            )))
        }
    }

    /// Parses the full expression and asserts the input is exhausted.
    pub fn parse(&mut self) -> Result<MarkerExpr, ParseError> {
        let expr = self.parse_expr()?;
        if self.current != Token::EOF {
            return Err(ParseError(format!("unexpected trailing input: {}", self.current)));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<MarkerExpr, ParseError> {
        let name = match self.advance() {
            Token::Identifier(s) => s,
            other => return Err(ParseError(format!("expected identifier, found {other}"))),
        };

        if self.current == Token::LParen {
            self.advance();
            let args = if self.current == Token::RParen {
                Vec::new()
            } else {
                self.parse_args()?
            };
            self.expect(&Token::RParen)?;
            return Ok(MarkerExpr::Call { name, args });
        }

        let mut segments = vec![name];
        while self.current == Token::Dot {
            self.advance();
            match self.advance() {
                Token::Identifier(s) => segments.push(s),
                other => return Err(ParseError(format!("expected identifier after '.', found {other}"))),
            }
        }
        Ok(MarkerExpr::Path(segments))
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = vec![self.parse_arg()?];
        while self.current == Token::Comma {
            self.advance();
            args.push(self.parse_arg()?);
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        let first = self.advance();

        // Named argument: `ident '=' value`.
        if let Token::Identifier(ref key) = first {
            if self.current == Token::Equals {
                self.advance();
                let value = self.parse_value()?;
                return Ok(Arg {
                    key: Some(key.clone()),
                    value,
                });
            }
        }

        let value = match first {
            Token::Identifier(s) => ArgValue::Ident(s),
            Token::Number(n) => ArgValue::Number(n),
            other => return Err(ParseError(format!("expected argument, found {other}"))),
        };
        Ok(Arg { key: None, value })
    }

    fn parse_value(&mut self) -> Result<ArgValue, ParseError> {
        match self.advance() {
            Token::Identifier(s) => Ok(ArgValue::Ident(s)),
            Token::Number(n) => Ok(ArgValue::Number(n)),
            other => Err(ParseError(format!("expected value, found {other}"))),
        }
    }
}
