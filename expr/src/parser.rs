//! Parses a human-entered string into an [`Expr`].
//!
//! A small shunting-yard lexer/parser, the same shape as the original's
//! `Expr::Lex`/`Expr::Parse` (`examples/original_source/expr.cpp`), but
//! returning a `Result` instead of throwing and calling `popUpError` — see
//! the §9 design note on exceptions becoming a two-arm return.

use crate::{Expr, ParamId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    BadToken(String),
    UnknownName(String),
    UnexpectedEnd,
    MismatchedParens,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadToken(t) => write!(f, "bad token: {t}"),
            ParseError::UnknownName(n) => write!(f, "unknown name: {n}"),
            ParseError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ParseError::MismatchedParens => write!(f, "mismatched parentheses"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut out = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                out.push(Token::Plus);
            }
            '-' => {
                chars.next();
                out.push(Token::Minus);
            }
            '*' => {
                chars.next();
                out.push(Token::Star);
            }
            '/' => {
                chars.next();
                out.push(Token::Slash);
            }
            '(' => {
                chars.next();
                out.push(Token::LParen);
            }
            ')' => {
                chars.next();
                out.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let v = s.parse::<f64>().map_err(|_| ParseError::BadToken(s.clone()))?;
                out.push(Token::Number(v));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push(Token::Name(s));
            }
            other => return Err(ParseError::BadToken(other.to_string())),
        }
    }
    Ok(out)
}

fn precedence(t: &Token) -> u8 {
    match t {
        Token::Plus | Token::Minus => 1,
        Token::Star | Token::Slash => 2,
        _ => 0,
    }
}

fn apply_binary(t: &Token, a: Expr, b: Expr) -> Expr {
    match t {
        Token::Plus => a.plus(b),
        Token::Minus => a.minus(b),
        Token::Star => a.times(b),
        Token::Slash => a.div(b),
        _ => unreachable!(),
    }
}

fn call_function(name: &str, arg: Expr) -> Result<Expr, ParseError> {
    match name {
        "sin" => Ok(arg.sin()),
        "cos" => Ok(arg.cos()),
        "asin" => Ok(arg.asin()),
        "acos" => Ok(arg.acos()),
        "sqrt" => Ok(arg.sqrt()),
        "sq" => Ok(arg.square()),
        other => Err(ParseError::UnknownName(other.to_string())),
    }
}

const FUNCTION_NAMES: &[&str] = &["sin", "cos", "asin", "acos", "sqrt", "sq"];

/// Parses `input`, resolving bare identifiers to parameters through
/// `resolve_name`. Function names (`sin`, `cos`, `asin`, `acos`, `sqrt`,
/// `sq`) are recognised before falling back to `resolve_name`, so a
/// parameter literally named `sin` is unreachable — matching the original
/// parser reserving those tokens.
pub fn parse(input: &str, resolve_name: &dyn Fn(&str) -> Option<ParamId>) -> Result<Expr, ParseError> {
    let tokens = lex(input)?;
    let mut operands: Vec<Expr> = Vec::new();
    let mut operators: Vec<Token> = Vec::new();
    let mut pending_functions: Vec<String> = Vec::new();

    fn reduce_top(operands: &mut Vec<Expr>, operators: &mut Vec<Token>) -> Result<(), ParseError> {
        let op = operators.pop().ok_or(ParseError::UnexpectedEnd)?;
        let b = operands.pop().ok_or(ParseError::UnexpectedEnd)?;
        let a = operands.pop().ok_or(ParseError::UnexpectedEnd)?;
        operands.push(apply_binary(&op, a, b));
        Ok(())
    }

    let mut i = 0;
    let mut expect_operand = true;
    while i < tokens.len() {
        let tok = &tokens[i];
        match tok {
            Token::Number(v) => {
                operands.push(Expr::constant(*v));
                expect_operand = false;
            }
            Token::Name(name) => {
                // A name immediately followed by `(` is a function call.
                if FUNCTION_NAMES.contains(&name.as_str())
                    && matches!(tokens.get(i + 1), Some(Token::LParen))
                {
                    pending_functions.push(name.clone());
                    operators.push(Token::LParen);
                    i += 1; // consume the paren along with the name
                } else {
                    let id = resolve_name(name).ok_or_else(|| ParseError::UnknownName(name.clone()))?;
                    operands.push(Expr::param(id));
                }
                expect_operand = false;
            }
            Token::Minus if expect_operand => {
                // Unary minus: rewrite as `0 - x` by pushing a zero operand.
                operands.push(Expr::constant(0.0));
                operators.push(Token::Minus);
                expect_operand = true;
            }
            Token::Plus | Token::Minus | Token::Star | Token::Slash => {
                while let Some(top) = operators.last() {
                    if matches!(top, Token::LParen) {
                        break;
                    }
                    if precedence(top) >= precedence(tok) {
                        reduce_top(&mut operands, &mut operators)?;
                    } else {
                        break;
                    }
                }
                operators.push(tok.clone());
                expect_operand = true;
            }
            Token::LParen => {
                operators.push(Token::LParen);
                expect_operand = true;
            }
            Token::RParen => {
                loop {
                    match operators.last() {
                        Some(Token::LParen) => break,
                        Some(_) => reduce_top(&mut operands, &mut operators)?,
                        None => return Err(ParseError::MismatchedParens),
                    }
                }
                operators.pop(); // the LParen
                if let Some(func) = pending_functions.pop() {
                    let arg = operands.pop().ok_or(ParseError::UnexpectedEnd)?;
                    operands.push(call_function(&func, arg)?);
                }
                expect_operand = false;
            }
        }
        i += 1;
    }

    while !operators.is_empty() {
        if matches!(operators.last(), Some(Token::LParen)) {
            return Err(ParseError::MismatchedParens);
        }
        reduce_top(&mut operands, &mut operators)?;
    }

    if operands.len() != 1 {
        return Err(ParseError::UnexpectedEnd);
    }
    Ok(operands.pop().unwrap())
}
