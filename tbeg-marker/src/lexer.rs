//! PURPOSE: Scans the inside of a `${...}` placeholder (or the argument list
//! of a `TBEG_REPEAT`/`TBEG_IMAGE`/`TBEG_SIZE` call) into a stream of Tokens.
//! CONTEXT: Mirrors the formula lexer's Peekable<Chars> shape. Identifiers
//! are read greedily so that A1 ranges (`A2:B2`), sheet-qualified ranges
//! (`'Sheet 1'!A2:B2`), and `key=value` argument names all come through as a
//! single token; the parser is responsible for splitting further.

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

/// Characters allowed inside a bare identifier/range token, beyond
/// alphanumerics: sheet-range punctuation and quoted-sheet-name delimiters.
fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | ':' | '!' | '\'' | '-' | '+' | '#')
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('.') => Token::Dot,
            Some(',') => Token::Comma,
            Some('=') => Token::Equals,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(':') => Token::Colon,
            Some(ch) if ch.is_ascii_digit() => self.read_number(ch),
            Some(ch) if is_identifier_char(ch) => self.read_identifier(ch),
            None => Token::EOF,
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        let mut has_dot = false;
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                // Only consume the dot as a decimal point if followed by a digit;
                // otherwise it belongs to a following `obj.path` dotted marker.
                has_dot = true;
                s.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        s.parse::<f64>().map(Token::Number).unwrap_or_else(|_| {
            // Trailing dot with no digits after it: back out, treat as identifier.
            Token::Identifier(s)
        })
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        if first == '\'' {
            // Quoted sheet name: consume verbatim (including spaces) up to
            // the closing quote, then fall through to read any trailing
            // range/punctuation (`!A2:B2`) as ordinary identifier chars.
            for ch in self.input.by_ref() {
                s.push(ch);
                if ch == '\'' {
                    break;
                }
            }
        }
        while let Some(&ch) = self.input.peek() {
            if ch.is_whitespace() {
                break;
            }
            if is_identifier_char(ch) {
                s.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        Token::Identifier(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok == Token::EOF {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn tokenizes_simple_call() {
        assert_eq!(
            tokens("repeat(items, A2:B2, it, DOWN)"),
            vec![
                Token::Identifier("repeat".into()),
                Token::LParen,
                Token::Identifier("items".into()),
                Token::Comma,
                Token::Identifier("A2:B2".into()),
                Token::Comma,
                Token::Identifier("it".into()),
                Token::Comma,
                Token::Identifier("DOWN".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn tokenizes_named_argument() {
        assert_eq!(
            tokens("empty=A7:C7"),
            vec![
                Token::Identifier("empty".into()),
                Token::Equals,
                Token::Identifier("A7:C7".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_dotted_path() {
        assert_eq!(
            tokens("obj.path.to.field"),
            vec![
                Token::Identifier("obj".into()),
                Token::Dot,
                Token::Identifier("path".into()),
                Token::Dot,
                Token::Identifier("to".into()),
                Token::Dot,
                Token::Identifier("field".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_sheet_qualified_range() {
        assert_eq!(
            tokens("'Sheet 1'!A2:B2"),
            vec![Token::Identifier("'Sheet 1'!A2:B2".into())]
        );
    }
}
