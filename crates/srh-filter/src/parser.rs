//! Recursive descent parser from tokens to a [`Predicate`].
//!
//! GRAMMAR:
//!   expr       --> or
//!   or         --> and ( ("|" | "or") and )*
//!   and        --> unary ( ("&" | "and") unary )*
//!   unary      --> ("~" | "not") unary | primary
//!   primary    --> "(" expr ")" | comparison
//!   comparison --> FIELD ( CMP literal
//!                        | "in" list | "not" "in" list
//!                        | ".isin" "(" list ")"
//!                        | ".str" "." STR_METHOD "(" STRING ")"
//!                        | ".notnull" "(" ")" | ".isnull" "(" ")" )
//!   list       --> "[" ( literal ( "," literal )* ","? )? "]"

use std::str::FromStr;

use crate::ast::{Literal, Predicate, StrMethod};
use crate::error::{FilterError, Result};
use crate::lexer::Lexer;
use crate::token::Token;

pub struct Parser<'a> {
    expression: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    offset: usize,
}

impl<'a> Parser<'a> {
    pub fn new(expression: &'a str) -> Self {
        let mut lexer = Lexer::new(expression);
        let (offset, current) = lexer.next_token();
        Parser {
            expression,
            lexer,
            current,
            offset,
        }
    }

    /// Parses the whole input; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Predicate> {
        if self.current == Token::Eof {
            return Err(self.error("empty expression"));
        }
        let predicate = self.parse_or()?;
        if self.current != Token::Eof {
            return Err(self.error(format!(
                "unexpected {} after expression",
                describe(&self.current)
            )));
        }
        Ok(predicate)
    }

    fn advance(&mut self) {
        let (offset, token) = self.lexer.next_token();
        self.offset = offset;
        self.current = token;
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Parse {
            expression: self.expression.to_string(),
            offset: self.offset,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if &self.current == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                describe(expected),
                describe(&self.current)
            )))
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.current, Token::Ident(name) if name == keyword)
    }

    fn expect_ident(&mut self) -> Result<String> {
        match &self.current {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected a name, found {}", describe(other)))),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate> {
        let mut left = self.parse_and()?;
        while self.current == Token::Pipe || self.is_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate> {
        let mut left = self.parse_unary()?;
        while self.current == Token::Amp || self.is_keyword("and") {
            self.advance();
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Predicate> {
        if self.current == Token::Tilde || self.is_keyword("not") {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate> {
        match &self.current {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(_) => {
                let field = self.expect_ident()?;
                self.parse_comparison(field)
            }
            other => Err(self.error(format!(
                "expected a field name or '(', found {}",
                describe(other)
            ))),
        }
    }

    fn parse_comparison(&mut self, field: String) -> Result<Predicate> {
        match &self.current {
            Token::Cmp(op) => {
                let op = *op;
                self.advance();
                let literal = self.parse_literal()?;
                Ok(Predicate::Compare { field, op, literal })
            }
            Token::Ident(word) if word == "in" => {
                self.advance();
                let values = self.parse_list()?;
                Ok(Predicate::InList {
                    field,
                    values,
                    negated: false,
                })
            }
            Token::Ident(word) if word == "not" => {
                self.advance();
                if !self.is_keyword("in") {
                    return Err(self.error(format!(
                        "expected 'in' after 'not', found {}",
                        describe(&self.current)
                    )));
                }
                self.advance();
                let values = self.parse_list()?;
                Ok(Predicate::InList {
                    field,
                    values,
                    negated: true,
                })
            }
            Token::Dot => {
                self.advance();
                self.parse_method(field)
            }
            other => Err(self.error(format!(
                "expected a comparison after field {field}, found {}",
                describe(other)
            ))),
        }
    }

    fn parse_method(&mut self, field: String) -> Result<Predicate> {
        let method = self.expect_ident()?;
        match method.as_str() {
            "isin" => {
                self.expect(&Token::LParen)?;
                let values = self.parse_list()?;
                self.expect(&Token::RParen)?;
                Ok(Predicate::InList {
                    field,
                    values,
                    negated: false,
                })
            }
            "str" => {
                self.expect(&Token::Dot)?;
                let name = self.expect_ident()?;
                let method = match name.as_str() {
                    "startswith" => StrMethod::StartsWith,
                    "endswith" => StrMethod::EndsWith,
                    "contains" => StrMethod::Contains,
                    other => {
                        return Err(self.error(format!("unsupported string method {other}")));
                    }
                };
                self.expect(&Token::LParen)?;
                let pattern = match &self.current {
                    Token::Str(pattern) => pattern.clone(),
                    other => {
                        return Err(self.error(format!(
                            "expected a quoted string, found {}",
                            describe(other)
                        )));
                    }
                };
                self.advance();
                self.expect(&Token::RParen)?;
                Ok(Predicate::Str {
                    field,
                    method,
                    pattern,
                })
            }
            "notnull" | "notna" | "isnull" | "isna" => {
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(Predicate::Null {
                    field,
                    negated: method.starts_with("not"),
                })
            }
            other => Err(self.error(format!("unsupported method {other}"))),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match &self.current {
            Token::Str(s) => Literal::Text(s.clone()),
            Token::Int(v) => Literal::Int(*v),
            Token::Float(v) => Literal::Float(*v),
            other => {
                return Err(self.error(format!(
                    "expected a literal value, found {}",
                    describe(other)
                )));
            }
        };
        self.advance();
        Ok(literal)
    }

    fn parse_list(&mut self) -> Result<Vec<Literal>> {
        self.expect(&Token::LBracket)?;
        let mut values = Vec::new();
        while self.current != Token::RBracket {
            values.push(self.parse_literal()?);
            if self.current == Token::Comma {
                self.advance();
            } else if self.current != Token::RBracket {
                return Err(self.error(format!(
                    "expected ',' or ']', found {}",
                    describe(&self.current)
                )));
            }
        }
        self.advance();
        Ok(values)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("name {name}"),
        Token::Str(s) => format!("string '{s}'"),
        Token::Int(v) => format!("number {v}"),
        Token::Float(v) => format!("number {v}"),
        Token::Cmp(op) => format!("'{}'", op.symbol()),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Amp => "'&'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Tilde => "'~'".to_string(),
        Token::Illegal(ch) => format!("illegal character '{ch}'"),
        Token::UnterminatedString => "unterminated string".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}

/// Parses a filter expression.
pub fn parse(expression: &str) -> Result<Predicate> {
    Parser::new(expression).parse()
}

impl FromStr for Predicate {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CmpOp;

    #[test]
    fn parses_conjunction_of_comparisons() {
        let predicate = parse("(Gender == '2') & (LA_parent_code.str.startswith('E12'))")
            .expect("parse");
        assert_eq!(
            predicate,
            Predicate::Compare {
                field: "Gender".to_string(),
                op: CmpOp::Eq,
                literal: Literal::Text("2".to_string()),
            }
            .and(Predicate::Str {
                field: "LA_parent_code".to_string(),
                method: StrMethod::StartsWith,
                pattern: "E12".to_string(),
            })
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let predicate = parse("a == 1 | b == 2 & c == 3").expect("parse");
        let Predicate::Or(_, right) = predicate else {
            panic!("expected or at the root");
        };
        assert!(matches!(*right, Predicate::And(_, _)));
    }

    #[test]
    fn parses_membership_forms() {
        let in_list = parse("Age_group_alt in['13-14', '15']").expect("parse");
        assert!(matches!(in_list, Predicate::InList { negated: false, ref values, .. } if values.len() == 2));
        let not_in = parse("Age_group_alt not in ['<13', '55+', 'unrecorded']").expect("parse");
        assert!(matches!(not_in, Predicate::InList { negated: true, .. }));
        let isin = parse("Gender.isin(['1', '2'])").expect("parse");
        assert!(matches!(isin, Predicate::InList { negated: false, .. }));
    }

    #[test]
    fn parses_null_checks_and_negation() {
        let predicate =
            parse("~ContraceptiveMethodStatus.isnull() or not x.notnull()").expect("parse");
        assert_eq!(
            predicate.required_fields().into_iter().collect::<Vec<_>>(),
            vec!["ContraceptiveMethodStatus".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse("(Gender == '2'").unwrap_err();
        match err {
            FilterError::Parse {
                offset, message, ..
            } => {
                assert_eq!(offset, 14);
                assert!(message.contains("')'"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(parse("").is_err());
        assert!(parse("Gender = '2'").is_err());
        assert!(parse("Gender == '2' Age").is_err());
        assert!(parse("x.str.upper('a')").is_err());
    }

    #[test]
    fn display_round_trips() {
        let source = "(Outside_england == 'N') & (Age_group_alt not in ['<13', '55+', 'unrecorded'])";
        let predicate = parse(source).expect("parse");
        let reparsed = parse(&predicate.to_string()).expect("reparse");
        assert_eq!(predicate, reparsed);
    }
}
