//! Row filters for base filters and banner conditions.
//!
//! Conditions are short boolean expressions over the columns of the dataset,
//! written the way survey analysts write them:
//!
//! ```text
//! hGender == 2 and vboost == 1
//! S2 in [3, 4, 5] or not (S3 >= 18)
//! (Q1 != 1) & ~(region == "North")
//! ```
//!
//! PIPELINE: condition string --> Lexer --> Tokens --> Parser --> Expr<String>
//! --> bound to the dataset columns --> Filter, evaluated once per respondent.
//!
//! GRAMMAR:
//!   expression --> and_expr ( ("or" | "|") and_expr )*
//!   and_expr   --> not_expr ( ("and" | "&") not_expr )*
//!   not_expr   --> ("not" | "~") not_expr | "(" expression ")" | comparison
//!   comparison --> operand compare_op operand
//!   compare_op --> "==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not" "in"
//!   operand    --> IDENTIFIER | NUMBER | "-" NUMBER | STRING | BOOLEAN | list
//!   list       --> "[" literals? "]" | "(" literal ("," literal)+ ")"
//!
//! Identifiers containing spaces or operators can be quoted with backticks.
//! A comparison with a missing value is false, except `!=` and `not in`
//! which are true.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use snafu::ResultExt;

use crate::config::*;
use crate::dataset::{Cell, Dataset};

/// Tokens recognized by the condition lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Boolean(bool),

    And,
    Or,
    Not,
    In,
    Ampersand,
    Pipe,
    Tilde,

    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    /// A single `=`, which is never valid.
    Assign,
    Minus,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    EOF,
    Illegal(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::In => write!(f, "in"),
            Token::Ampersand => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Tilde => write!(f, "~"),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::LessThan => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::GreaterThan => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::Assign => write!(f, "="),
            Token::Minus => write!(f, "-"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::EOF => write!(f, "end of expression"),
            Token::Illegal(c) => write!(f, "{:?}", c),
        }
    }
}

pub struct Lexer<'a> {
    input: Peekable<CharIndices<'a>>,
    len: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.char_indices().peekable(),
            len: input.len(),
        }
    }

    /// Advances the lexer and returns the next token with its byte offset.
    pub fn next_token(&mut self) -> (Token, usize) {
        self.skip_whitespace();

        let (pos, ch) = match self.input.next() {
            Some(p) => p,
            None => return (Token::EOF, self.len),
        };
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '&' => Token::Ampersand,
            '|' => Token::Pipe,
            '~' => Token::Tilde,
            '-' => Token::Minus,
            '=' => self.followed_by('=', Token::Equal, Token::Assign),
            '!' => self.followed_by('=', Token::NotEqual, Token::Illegal('!')),
            '<' => self.followed_by('=', Token::LessEqual, Token::LessThan),
            '>' => self.followed_by('=', Token::GreaterEqual, Token::GreaterThan),
            '"' | '\'' => self.read_string(ch),
            '`' => self.read_quoted_identifier(),
            c if c.is_ascii_digit() || c == '.' => self.read_number(c),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(c),
            c => Token::Illegal(c),
        };
        (token, pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn followed_by(&mut self, next: char, yes: Token, no: Token) -> Token {
        match self.input.peek() {
            Some(&(_, c)) if c == next => {
                self.input.next();
                yes
            }
            _ => no,
        }
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut result = String::new();
        while let Some((_, ch)) = self.input.next() {
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = self.input.next() {
                        result.push(escaped);
                    }
                }
                c if c == quote => return Token::String(result),
                c => result.push(c),
            }
        }
        // Unterminated string
        Token::Illegal(quote)
    }

    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        for (_, ch) in self.input.by_ref() {
            if ch == '`' {
                return Token::Identifier(result);
            }
            result.push(ch);
        }
        Token::Illegal('`')
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        while let Some(&(_, ch)) = self.input.peek() {
            let exponent_sign =
                (ch == '+' || ch == '-') && matches!(text.chars().last(), Some('e' | 'E'));
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                text.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        match text.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(first),
        }
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut ident = String::from(first);
        while let Some(&(_, ch)) = self.input.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        match ident.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "True" | "true" => Token::Boolean(true),
            "False" | "false" => Token::Boolean(false),
            _ => Token::Identifier(ident),
        }
    }
}

/// A constant in a condition.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Number(f64),
    Text(String),
    Boolean(bool),
}

/// One side of a comparison. `C` is the column reference: a name once
/// parsed, a column index once bound to a dataset.
#[derive(Debug, PartialEq, Clone)]
pub enum Operand<C> {
    Column(C),
    Literal(Literal),
    List(Vec<Literal>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    In,
    NotIn,
}

impl CompareOp {
    fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::LessThan
                | CompareOp::LessEqual
                | CompareOp::GreaterThan
                | CompareOp::GreaterEqual
        )
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr<C> {
    And(Box<Expr<C>>, Box<Expr<C>>),
    Or(Box<Expr<C>>, Box<Expr<C>>),
    Not(Box<Expr<C>>),
    Compare {
        left: Operand<C>,
        op: CompareOp,
        right: Operand<C>,
    },
}

impl<C> Expr<C> {
    /// Rewrites every column reference, stopping at the first failure.
    pub fn try_map_columns<D, E, F>(&self, f: &mut F) -> Result<Expr<D>, E>
    where
        F: FnMut(&C) -> Result<D, E>,
    {
        Ok(match self {
            Expr::And(l, r) => Expr::And(
                Box::new(l.try_map_columns(f)?),
                Box::new(r.try_map_columns(f)?),
            ),
            Expr::Or(l, r) => Expr::Or(
                Box::new(l.try_map_columns(f)?),
                Box::new(r.try_map_columns(f)?),
            ),
            Expr::Not(e) => Expr::Not(Box::new(e.try_map_columns(f)?)),
            Expr::Compare { left, op, right } => Expr::Compare {
                left: map_operand(left, f)?,
                op: *op,
                right: map_operand(right, f)?,
            },
        })
    }
}

fn map_operand<C, D, E, F>(operand: &Operand<C>, f: &mut F) -> Result<Operand<D>, E>
where
    F: FnMut(&C) -> Result<D, E>,
{
    Ok(match operand {
        Operand::Column(c) => Operand::Column(f(c)?),
        Operand::Literal(l) => Operand::Literal(l.clone()),
        Operand::List(l) => Operand::List(l.clone()),
    })
}

/// Parser errors, with the byte offset where the problem was found.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let (current_token, position) = lexer.next_token();
        Parser {
            lexer,
            current_token,
            position,
        }
    }

    pub fn parse(&mut self) -> ParseResult<Expr<String>> {
        if self.current_token == Token::EOF {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        if self.current_token != Token::EOF {
            return Err(self.error(format!(
                "unexpected {} after expression",
                self.current_token
            )));
        }
        Ok(expr)
    }

    fn advance(&mut self) {
        let (token, position) = self.lexer.next_token();
        self.current_token = token;
        self.position = position;
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.position)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected, self.current_token
            )))
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr<String>> {
        let mut left = self.parse_and()?;
        while matches!(self.current_token, Token::Or | Token::Pipe) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr<String>> {
        let mut left = self.parse_not()?;
        while matches!(self.current_token, Token::And | Token::Ampersand) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr<String>> {
        match self.current_token {
            Token::Not | Token::Tilde => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_not()?)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr<String>> {
        let left = self.parse_operand()?;
        if matches!(left, Operand::List(_)) {
            return Err(self.error("a list can only appear on the right of a comparison"));
        }
        let op = match self.current_token {
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::LessThan => CompareOp::LessThan,
            Token::LessEqual => CompareOp::LessEqual,
            Token::GreaterThan => CompareOp::GreaterThan,
            Token::GreaterEqual => CompareOp::GreaterEqual,
            Token::In => CompareOp::In,
            Token::Not => {
                self.advance();
                if self.current_token != Token::In {
                    return Err(self.error(format!(
                        "expected 'in' after 'not', found {}",
                        self.current_token
                    )));
                }
                CompareOp::NotIn
            }
            Token::Assign => return Err(self.error("use '==' to test equality")),
            _ => {
                return Err(self.error(format!(
                    "expected a comparison operator, found {}",
                    self.current_token
                )))
            }
        };
        self.advance();
        let right = self.parse_operand()?;
        if op.is_ordering() && matches!(right, Operand::List(_)) {
            return Err(self.error("a list cannot be ordered"));
        }
        Ok(Expr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> ParseResult<Operand<String>> {
        let operand = match self.current_token.clone() {
            Token::Identifier(name) => Operand::Column(name),
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.current_token != Token::RBracket {
                    items.push(self.parse_literal()?);
                    if self.current_token == Token::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                if self.current_token != Token::RBracket {
                    return Err(self.error(format!("expected ], found {}", self.current_token)));
                }
                Operand::List(items)
            }
            Token::LParen => {
                self.advance();
                let mut items = vec![self.parse_literal()?];
                while self.current_token == Token::Comma {
                    self.advance();
                    if self.current_token == Token::RParen {
                        break;
                    }
                    items.push(self.parse_literal()?);
                }
                if self.current_token != Token::RParen {
                    return Err(self.error(format!("expected ), found {}", self.current_token)));
                }
                Operand::List(items)
            }
            _ => {
                return Ok(Operand::Literal(self.parse_literal()?));
            }
        };
        self.advance();
        Ok(operand)
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let literal = match self.current_token.clone() {
            Token::Number(n) => Literal::Number(n),
            Token::String(s) => Literal::Text(s),
            Token::Boolean(b) => Literal::Boolean(b),
            Token::Minus => {
                self.advance();
                match self.current_token {
                    Token::Number(n) => Literal::Number(-n),
                    _ => {
                        return Err(self.error(format!(
                            "expected a number after '-', found {}",
                            self.current_token
                        )))
                    }
                }
            }
            Token::Illegal(c) => return Err(self.error(format!("illegal character {:?}", c))),
            _ => {
                return Err(self.error(format!(
                    "expected a value, found {}",
                    self.current_token
                )))
            }
        };
        self.advance();
        Ok(literal)
    }
}

/// Parses a condition without looking at any dataset.
pub fn parse(input: &str) -> ParseResult<Expr<String>> {
    Parser::new(input).parse()
}

/// A condition bound to the columns of a dataset.
#[derive(Debug, PartialEq, Clone)]
pub struct Filter {
    source: String,
    expr: Expr<usize>,
}

/// Parses a condition and resolves its column names against the dataset.
///
/// Fails on syntax errors and on names that are not columns of the dataset,
/// even when the dataset has no rows.
pub fn compile_filter(expression: &str, dataset: &Dataset) -> TableResult<Filter> {
    let parsed = parse(expression).context(ExpressionSyntaxSnafu { expression })?;
    let expr = parsed.try_map_columns(&mut |name: &String| {
        dataset.column_index(name).ok_or_else(|| TableError::UndefinedColumn {
            expression: expression.to_string(),
            column: name.clone(),
        })
    })?;
    Ok(Filter {
        source: expression.to_string(),
        expr,
    })
}

// A value taken from a row or from the expression.
enum Scalar<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> Scalar<'a> {
    fn of_cell(cell: &'a Cell) -> Scalar<'a> {
        match cell {
            Cell::Missing => Scalar::Missing,
            Cell::Number(x) => Scalar::Number(*x),
            Cell::Text(s) => Scalar::Text(s.as_str()),
        }
    }

    fn of_literal(literal: &'a Literal) -> Scalar<'a> {
        match literal {
            Literal::Number(x) => Scalar::Number(*x),
            Literal::Text(s) => Scalar::Text(s.as_str()),
            Literal::Boolean(b) => Scalar::Number(if *b { 1.0 } else { 0.0 }),
        }
    }

    // Identifier columns keep their text, so numeric text is read as a
    // number when compared with a number.
    fn numeric_text(s: &str) -> Option<f64> {
        s.trim().parse::<f64>().ok().filter(|x| !x.is_nan())
    }

    fn equals(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => a == b,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Number(a), Scalar::Text(t)) | (Scalar::Text(t), Scalar::Number(a)) => {
                Scalar::numeric_text(t) == Some(*a)
            }
            _ => false,
        }
    }

    // None when one of the sides is missing.
    fn ordering(&self, other: &Scalar) -> Result<Option<Ordering>, String> {
        match (self, other) {
            (Scalar::Missing, _) | (_, Scalar::Missing) => Ok(None),
            (Scalar::Number(a), Scalar::Number(b)) => Ok(a.partial_cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Ok(Some(a.cmp(b))),
            (Scalar::Number(a), Scalar::Text(t)) => match Scalar::numeric_text(t) {
                Some(b) => Ok(a.partial_cmp(&b)),
                None => Err(format!("cannot order number and text {:?}", t)),
            },
            (Scalar::Text(t), Scalar::Number(b)) => match Scalar::numeric_text(t) {
                Some(a) => Ok(a.partial_cmp(b)),
                None => Err(format!("cannot order text {:?} and number", t)),
            },
        }
    }
}

impl Filter {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the condition for one respondent.
    pub fn matches(&self, dataset: &Dataset, row: usize) -> TableResult<bool> {
        self.eval(&self.expr, dataset, row)
            .map_err(|message| TableError::ExpressionType {
                expression: self.source.clone(),
                message,
            })
    }

    fn eval(&self, expr: &Expr<usize>, dataset: &Dataset, row: usize) -> Result<bool, String> {
        match expr {
            Expr::And(l, r) => Ok(self.eval(l, dataset, row)? && self.eval(r, dataset, row)?),
            Expr::Or(l, r) => Ok(self.eval(l, dataset, row)? || self.eval(r, dataset, row)?),
            Expr::Not(e) => Ok(!self.eval(e, dataset, row)?),
            Expr::Compare { left, op, right } => {
                let lhs = match left {
                    Operand::Column(idx) => Scalar::of_cell(dataset.cell(row, *idx)),
                    Operand::Literal(l) => Scalar::of_literal(l),
                    Operand::List(_) => return Err("a list cannot be compared".to_string()),
                };
                match right {
                    Operand::List(items) => {
                        let member = items.iter().any(|l| lhs.equals(&Scalar::of_literal(l)));
                        match op {
                            CompareOp::Equal | CompareOp::In => Ok(member),
                            CompareOp::NotEqual | CompareOp::NotIn => Ok(!member),
                            _ => Err("a list cannot be ordered".to_string()),
                        }
                    }
                    _ => {
                        let rhs = match right {
                            Operand::Column(idx) => Scalar::of_cell(dataset.cell(row, *idx)),
                            Operand::Literal(l) => Scalar::of_literal(l),
                            Operand::List(_) => Scalar::Missing,
                        };
                        compare(&lhs, *op, &rhs)
                    }
                }
            }
        }
    }
}

fn compare(lhs: &Scalar, op: CompareOp, rhs: &Scalar) -> Result<bool, String> {
    let res = match op {
        CompareOp::Equal | CompareOp::In => lhs.equals(rhs),
        CompareOp::NotEqual | CompareOp::NotIn => !lhs.equals(rhs),
        CompareOp::LessThan => lhs.ordering(rhs)? == Some(Ordering::Less),
        CompareOp::LessEqual => matches!(
            lhs.ordering(rhs)?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::GreaterThan => lhs.ordering(rhs)? == Some(Ordering::Greater),
        CompareOp::GreaterEqual => matches!(
            lhs.ordering(rhs)?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
    };
    Ok(res)
}
