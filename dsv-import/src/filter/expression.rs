//! A small expression language for `csv_filter`.
//!
//! Supported syntax:
//!
//! - field names as bare identifiers (`state`, `pop_2010`) and `$index`,
//!   the zero-based position of the record in the source
//! - literals: numbers, `'single'` or `"double"` quoted strings, `true`,
//!   `false`, `null`
//! - `!`, unary `-`, `&&`, `||`, parentheses
//! - comparisons `==`, `!=` (`===`, `!==` are accepted as aliases), `<`,
//!   `<=`, `>`, `>=`
//!
//! Comparisons are loose: when either side is a number the other side is
//! converted with [`parse_number`]; two strings compare lexicographically.
//! `&&` and `||` short-circuit and yield one of their operands.

use std::cmp::Ordering;

use super::{CompiledFilter, FilterContext, FilterValue, RecordFilterCompiler};
use crate::error::{ImportError, Result};
use crate::inference::parse_number;
use crate::table::Record;

/// The default [`RecordFilterCompiler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCompiler;

impl RecordFilterCompiler for ExpressionCompiler {
    fn compile(&self, expression: &str) -> Result<Box<dyn CompiledFilter>> {
        let tokens =
            tokenize(expression).map_err(|msg| ImportError::filter_expression(expression, msg))?;
        let mut parser = Parser::new(tokens);
        let expr = parser
            .parse()
            .map_err(|msg| ImportError::filter_expression(expression, msg))?;
        Ok(Box::new(expr))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Not,
    Minus,
    And,
    Or,
    Cmp(CmpOp),
}

fn tokenize(src: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' | '!' if next == Some('=') => {
                let op = if c == '=' { CmpOp::Eq } else { CmpOp::Ne };
                i += 2;
                if chars.get(i) == Some(&'=') {
                    i += 1;
                }
                tokens.push(Token::Cmp(op));
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' | '>' => {
                let or_equal = next == Some('=');
                let op = match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    (_, false) => CmpOp::Gt,
                    (_, true) => CmpOp::Ge,
                };
                tokens.push(Token::Cmp(op));
                i += if or_equal { 2 } else { 1 };
            }
            '\'' | '"' => {
                let start = i + 1;
                let mut j = start;
                let mut text = String::new();
                loop {
                    match chars.get(j) {
                        None => return Err("Unterminated string literal".to_string()),
                        Some(&ch) if ch == c => break,
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(j + 1) {
                                text.push(escaped);
                            }
                            j += 2;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            j += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric()
                        || chars[i] == '.'
                        || ((chars[i] == '+' || chars[i] == '-')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number literal '{literal}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("Unexpected character '{other}' at position {i}")),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(FilterValue),
    Field(String),
    RecordIndex,
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

/// Limit on both parser recursion and the height of the parsed tree.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

/// A parsed subexpression and the height of its tree.
type ParseResult = std::result::Result<(Expr, usize), String>;

fn grow(height: usize) -> std::result::Result<usize, String> {
    if height >= MAX_DEPTH {
        return Err("Expression nested too deeply".to_string());
    }
    Ok(height + 1)
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn parse(&mut self) -> std::result::Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let (expr, _) = self.or()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(tok) => Err(format!("Unexpected token {tok:?}")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    /// Runs `f` one nesting level deeper.
    fn nested(&mut self, f: fn(&mut Self) -> ParseResult) -> ParseResult {
        if self.nesting >= MAX_DEPTH {
            return Err("Expression nested too deeply".to_string());
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn or(&mut self) -> ParseResult {
        let (mut left, mut height) = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let (right, rh) = self.and()?;
            height = grow(height.max(rh))?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok((left, height))
    }

    fn and(&mut self) -> ParseResult {
        let (mut left, mut height) = self.comparison()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let (right, rh) = self.comparison()?;
            height = grow(height.max(rh))?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok((left, height))
    }

    fn comparison(&mut self) -> ParseResult {
        let (mut left, mut height) = self.unary()?;
        while let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let (right, rh) = self.unary()?;
            height = grow(height.max(rh))?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        Ok((left, height))
    }

    fn unary(&mut self) -> ParseResult {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                let (inner, height) = self.nested(Self::unary)?;
                Ok((Expr::Not(Box::new(inner)), grow(height)?))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                let (inner, height) = self.nested(Self::unary)?;
                Ok((Expr::Neg(Box::new(inner)), grow(height)?))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> ParseResult {
        let expr = match self.advance() {
            None => return Err("Unexpected end of expression".to_string()),
            Some(Token::Number(n)) => Expr::Literal(FilterValue::Number(n)),
            Some(Token::Str(s)) => Expr::Literal(FilterValue::String(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Expr::Literal(FilterValue::Bool(true)),
                "false" => Expr::Literal(FilterValue::Bool(false)),
                "null" => Expr::Literal(FilterValue::Null),
                "$index" => Expr::RecordIndex,
                _ => Expr::Field(name),
            },
            Some(Token::LParen) => {
                let inner = self.nested(Self::or)?;
                return match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("Missing closing parenthesis".to_string()),
                };
            }
            Some(tok) => return Err(format!("Unexpected token {tok:?}")),
        };
        Ok((expr, 1))
    }
}

impl Expr {
    fn eval(&self, record: &Record, ctx: &FilterContext) -> std::result::Result<FilterValue, String> {
        Ok(match self {
            Expr::Literal(v) => v.clone(),
            Expr::Field(name) => record
                .get(name)
                .map(FilterValue::from)
                .ok_or_else(|| format!("{name} is not defined"))?,
            Expr::RecordIndex => FilterValue::Number(ctx.record_index as f64),
            Expr::Not(inner) => FilterValue::Bool(!inner.eval(record, ctx)?.is_truthy()),
            Expr::Neg(inner) => FilterValue::Number(-to_number(&inner.eval(record, ctx)?)),
            Expr::And(a, b) => {
                let left = a.eval(record, ctx)?;
                if left.is_truthy() {
                    b.eval(record, ctx)?
                } else {
                    left
                }
            }
            Expr::Or(a, b) => {
                let left = a.eval(record, ctx)?;
                if left.is_truthy() {
                    left
                } else {
                    b.eval(record, ctx)?
                }
            }
            Expr::Compare(op, a, b) => {
                let left = a.eval(record, ctx)?;
                let right = b.eval(record, ctx)?;
                FilterValue::Bool(compare(*op, &left, &right))
            }
        })
    }
}

impl CompiledFilter for Expr {
    fn evaluate(&self, record: &Record, ctx: &FilterContext) -> std::result::Result<FilterValue, String> {
        self.eval(record, ctx)
    }
}

fn to_number(value: &FilterValue) -> f64 {
    match value {
        FilterValue::Bool(b) => f64::from(u8::from(*b)),
        FilterValue::Number(n) => *n,
        FilterValue::String(s) => parse_number(s).unwrap_or(f64::NAN),
        FilterValue::Null => 0.0,
    }
}

fn compare(op: CmpOp, left: &FilterValue, right: &FilterValue) -> bool {
    use FilterValue as V;

    let ordering = match (left, right) {
        (V::String(a), V::String(b)) => Some(a.cmp(b)),
        (V::Null, V::Null) => Some(Ordering::Equal),
        // null only equals null, but orders like zero
        (V::Null, _) | (_, V::Null) if matches!(op, CmpOp::Eq | CmpOp::Ne) => None,
        _ => to_number(left).partial_cmp(&to_number(right)),
    };
    match op {
        CmpOp::Eq => ordering == Some(Ordering::Equal),
        CmpOp::Ne => ordering != Some(Ordering::Equal),
        CmpOp::Lt => ordering == Some(Ordering::Less),
        CmpOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => ordering == Some(Ordering::Greater),
        CmpOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}
