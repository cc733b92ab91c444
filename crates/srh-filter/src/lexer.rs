//! Scans a filter expression into tokens.
//!
//! Handles quoted strings (single or double quotes, backslash escapes),
//! backtick-quoted field names, integer and decimal literals and the
//! two-character comparison operators.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::CmpOp;
use crate::token::Token;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Returns the next token with its byte offset.
    pub fn next_token(&mut self) -> (usize, Token) {
        self.skip_whitespace();
        let Some((offset, ch)) = self.chars.next() else {
            return (self.input.len(), Token::Eof);
        };
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '&' => self.doubled('&', Token::Amp),
            '|' => self.doubled('|', Token::Pipe),
            '~' => Token::Tilde,
            '=' => match self.chars.peek() {
                Some((_, '=')) => {
                    self.chars.next();
                    Token::Cmp(CmpOp::Eq)
                }
                _ => Token::Illegal('='),
            },
            '!' => match self.chars.peek() {
                Some((_, '=')) => {
                    self.chars.next();
                    Token::Cmp(CmpOp::Ne)
                }
                _ => Token::Illegal('!'),
            },
            '<' => self.with_equals(CmpOp::Lt, CmpOp::Le),
            '>' => self.with_equals(CmpOp::Gt, CmpOp::Ge),
            '\'' | '"' => self.read_string(ch),
            '`' => self.read_backtick(),
            '-' if self.next_is_digit() => self.read_number(offset),
            c if c.is_ascii_digit() => self.read_number(offset),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(offset),
            other => Token::Illegal(other),
        };
        (offset, token)
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }

    /// `&&` and `||` read the same as their single forms.
    fn doubled(&mut self, ch: char, token: Token) -> Token {
        if matches!(self.chars.peek(), Some((_, next)) if *next == ch) {
            self.chars.next();
        }
        token
    }

    fn with_equals(&mut self, plain: CmpOp, or_equal: CmpOp) -> Token {
        match self.chars.peek() {
            Some((_, '=')) => {
                self.chars.next();
                Token::Cmp(or_equal)
            }
            _ => Token::Cmp(plain),
        }
    }

    fn next_is_digit(&mut self) -> bool {
        matches!(self.chars.peek(), Some((_, ch)) if ch.is_ascii_digit())
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut result = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = self.chars.next() {
                        result.push(escaped);
                    }
                }
                c if c == quote => return Token::Str(result),
                c => result.push(c),
            }
        }
        Token::UnterminatedString
    }

    fn read_backtick(&mut self) -> Token {
        let mut result = String::new();
        for (_, ch) in self.chars.by_ref() {
            if ch == '`' {
                return Token::Ident(result);
            }
            result.push(ch);
        }
        Token::UnterminatedString
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        let mut seen_dot = false;
        while let Some(&(idx, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() {
                end = idx + ch.len_utf8();
                self.chars.next();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                end = idx + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.input[start..end];
        if seen_dot {
            text.parse::<f64>().map_or(Token::Illegal('.'), Token::Float)
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::Int(value),
                Err(_) => text.parse::<f64>().map_or(Token::Illegal('-'), Token::Float),
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let mut end = start;
        if let Some(ch) = self.input[start..].chars().next() {
            end += ch.len_utf8();
        }
        while let Some(&(idx, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                end = idx + ch.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(self.input[start..end].to_string())
    }
}
