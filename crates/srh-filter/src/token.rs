use crate::ast::CmpOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Cmp(CmpOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Amp,
    Pipe,
    Tilde,
    Illegal(char),
    UnterminatedString,
    Eof,
}
