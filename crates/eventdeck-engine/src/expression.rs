//! Boolean expressions over an event, used by custom script actions.
//!
//! The only identifier root is `event`; every other name is rejected at
//! parse time, so a script cannot reach anything but the event it was
//! handed.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or      = and ( "||" and )*
//! and     = not ( "&&" not )*
//! not     = "!" not | compare
//! compare = primary ( op primary )?
//! op      = "==" | "!=" | ">" | "<" | ">=" | "<=" | "contains" | "starts_with"
//! primary = literal | path | "(" or ")"
//! ```
//!
//! Missing fields resolve to `null`; comparing `null` with anything but
//! `null` is false, never an error.

use serde_json::Value;
use thiserror::Error;

/// Errors from expression parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Deepest allowed nesting of `!` and parentheses.
const MAX_DEPTH: usize = 64;

/// Longest allowed expression, in tokens. Also bounds `&&` / `||` chains,
/// which build left-nested trees.
const MAX_TOKENS: usize = 512;

/// A parsed expression, reusable across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(parse_err("empty expression"));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(parse_err(format!(
                "expression too long ({} tokens, limit {MAX_TOKENS})",
                tokens.len()
            )));
        }
        let (root, rest) = parse_or(&tokens, 0)?;
        if let Some(tok) = rest.first() {
            return Err(parse_err(format!("unexpected token: {tok:?}")));
        }
        Ok(Self { root })
    }

    /// Evaluate against `event` (the JSON form of an [`Event`](crate::types::Event)).
    pub fn evaluate(&self, event: &Value) -> bool {
        truthy(&eval(&self.root, event))
    }
}

fn parse_err(message: impl Into<String>) -> ExpressionError {
    ExpressionError::Parse {
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Op(CompOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    StartsWith,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            (c, _) if c.is_whitespace() => {
                i += 1;
                continue;
            }
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('=', Some('=')) => (Token::Op(CompOp::Eq), 2),
            ('!', Some('=')) => (Token::Op(CompOp::Ne), 2),
            ('>', Some('=')) => (Token::Op(CompOp::Ge), 2),
            ('<', Some('=')) => (Token::Op(CompOp::Le), 2),
            ('>', _) => (Token::Op(CompOp::Gt), 1),
            ('<', _) => (Token::Op(CompOp::Lt), 1),
            ('!', _) => (Token::Not, 1),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('"' | '\'', _) => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| parse_err("unterminated string literal"))?;
                let s: String = chars[i + 1..i + 1 + close].iter().collect();
                (Token::Str(s), close + 2)
            }
            (c, n) if c.is_ascii_digit() || (c == '-' && n.is_some_and(|d| d.is_ascii_digit())) => {
                let len = 1 + chars[i + 1..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_digit() || **ch == '.')
                    .count();
                let text: String = chars[i..i + len].iter().collect();
                let num = text
                    .parse()
                    .map_err(|_| parse_err(format!("invalid number: {text}")))?;
                (Token::Num(num), len)
            }
            (c, _) if c.is_ascii_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_' || **ch == '.')
                    .count();
                let word: String = chars[i..i + len].iter().collect();
                (word_token(&word)?, len)
            }
            (other, _) => return Err(parse_err(format!("unexpected character: {other}"))),
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

fn word_token(word: &str) -> Result<Token, ExpressionError> {
    Ok(match word {
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        "null" => Token::Null,
        "contains" => Token::Op(CompOp::Contains),
        "starts_with" => Token::Op(CompOp::StartsWith),
        _ => {
            let segments: Vec<String> = word.split('.').map(String::from).collect();
            if segments[0] != "event" {
                return Err(parse_err(format!("unknown identifier: {word}")));
            }
            if segments.iter().any(String::is_empty) {
                return Err(parse_err(format!("invalid path: {word}")));
            }
            Token::Path(segments[1..].to_vec())
        }
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Path(Vec<String>),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare(Box<Node>, CompOp, Box<Node>),
}

type ParseResult<'a> = Result<(Node, &'a [Token]), ExpressionError>;

fn descend(depth: usize) -> Result<usize, ExpressionError> {
    if depth >= MAX_DEPTH {
        return Err(parse_err("expression nested too deeply"));
    }
    Ok(depth + 1)
}

fn parse_or(tokens: &[Token], depth: usize) -> ParseResult<'_> {
    let (mut left, mut rest) = parse_and(tokens, depth)?;
    while rest.first() == Some(&Token::Or) {
        let (right, r) = parse_and(&rest[1..], depth)?;
        left = Node::Or(Box::new(left), Box::new(right));
        rest = r;
    }
    Ok((left, rest))
}

fn parse_and(tokens: &[Token], depth: usize) -> ParseResult<'_> {
    let (mut left, mut rest) = parse_not(tokens, depth)?;
    while rest.first() == Some(&Token::And) {
        let (right, r) = parse_not(&rest[1..], depth)?;
        left = Node::And(Box::new(left), Box::new(right));
        rest = r;
    }
    Ok((left, rest))
}

fn parse_not(tokens: &[Token], depth: usize) -> ParseResult<'_> {
    if tokens.first() == Some(&Token::Not) {
        let (inner, rest) = parse_not(&tokens[1..], descend(depth)?)?;
        return Ok((Node::Not(Box::new(inner)), rest));
    }
    parse_compare(tokens, depth)
}

fn parse_compare(tokens: &[Token], depth: usize) -> ParseResult<'_> {
    let (left, rest) = parse_primary(tokens, depth)?;
    match rest.first() {
        Some(Token::Op(op)) => {
            let (right, rest) = parse_primary(&rest[1..], depth)?;
            Ok((Node::Compare(Box::new(left), *op, Box::new(right)), rest))
        }
        _ => Ok((left, rest)),
    }
}

fn parse_primary(tokens: &[Token], depth: usize) -> ParseResult<'_> {
    let (first, rest) = tokens
        .split_first()
        .ok_or_else(|| parse_err("unexpected end of expression"))?;
    let node = match first {
        Token::Str(s) => Node::Literal(Value::String(s.clone())),
        Token::Num(n) => Node::Literal(serde_json::json!(n)),
        Token::Bool(b) => Node::Literal(Value::Bool(*b)),
        Token::Null => Node::Literal(Value::Null),
        Token::Path(segments) => Node::Path(segments.clone()),
        Token::LParen => {
            let (inner, rest) = parse_or(rest, descend(depth)?)?;
            return match rest.split_first() {
                Some((Token::RParen, rest)) => Ok((inner, rest)),
                _ => Err(parse_err("expected ')'")),
            };
        }
        other => return Err(parse_err(format!("expected value, got {other:?}"))),
    };
    Ok((node, rest))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval(node: &Node, event: &Value) -> Value {
    match node {
        Node::Literal(v) => v.clone(),
        Node::Path(segments) => segments
            .iter()
            .try_fold(event, |cur, seg| cur.get(seg))
            .cloned()
            .unwrap_or(Value::Null),
        Node::Not(inner) => Value::Bool(!truthy(&eval(inner, event))),
        Node::And(l, r) => Value::Bool(truthy(&eval(l, event)) && truthy(&eval(r, event))),
        Node::Or(l, r) => Value::Bool(truthy(&eval(l, event)) || truthy(&eval(r, event))),
        Node::Compare(l, op, r) => Value::Bool(compare(&eval(l, event), &eval(r, event), *op)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn compare(left: &Value, right: &Value, op: CompOp) -> bool {
    if left.is_null() || right.is_null() {
        let both = left.is_null() && right.is_null();
        return match op {
            CompOp::Eq => both,
            CompOp::Ne => !both,
            _ => false,
        };
    }

    match (left, right) {
        (Value::String(l), Value::String(r)) => match op {
            CompOp::Eq => l == r,
            CompOp::Ne => l != r,
            CompOp::Gt => l > r,
            CompOp::Lt => l < r,
            CompOp::Ge => l >= r,
            CompOp::Le => l <= r,
            CompOp::Contains => l.contains(r.as_str()),
            CompOp::StartsWith => l.starts_with(r.as_str()),
        },
        (Value::Number(l), Value::Number(r)) => {
            let (l, r) = (l.as_f64().unwrap_or(0.0), r.as_f64().unwrap_or(0.0));
            match op {
                CompOp::Eq => l == r,
                CompOp::Ne => l != r,
                CompOp::Gt => l > r,
                CompOp::Lt => l < r,
                CompOp::Ge => l >= r,
                CompOp::Le => l <= r,
                CompOp::Contains | CompOp::StartsWith => false,
            }
        }
        (Value::Bool(l), Value::Bool(r)) => match op {
            CompOp::Eq => l == r,
            CompOp::Ne => l != r,
            _ => false,
        },
        (Value::Array(items), needle) if op == CompOp::Contains => items.contains(needle),
        _ => matches!(op, CompOp::Ne),
    }
}
