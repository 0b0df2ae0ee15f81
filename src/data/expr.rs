//! Filter expression grammar.
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "|" | "||") and)*
//! and        := not (("and" | "&" | "&&") not)*
//! not        := ("not" | "~" | "!") not | comparison
//! comparison := operand (cmp_op operand)?
//! operand    := "(" expr ")" | column | literal | "-" number
//! cmp_op     := "==" | "!=" | "<" | "<=" | ">" | ">="
//! column     := identifier | "`" any text "`"
//! literal    := number | 'text' | "text" | true | false | null
//! ```
//!
//! The grammar is closed: there are no calls, attribute lookups, assignments or
//! arithmetic, so parsed text can only ever compare cells against literals.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use super::model::Value;

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Whether `left <op> right` holds given `left.cmp(right)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Literal(Value),
    Column(String),
}

/// Parse failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        SyntaxError {
            position,
            message: message.into(),
        }
    }
}

/// Parse filter text into an expression tree.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(SyntaxError::new(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some((at, token)) = parser.tokens.get(parser.pos) {
        let message = match token {
            Token::Op(_) => "chained comparisons are not supported; combine them with 'and'".to_string(),
            other => format!("unexpected {}", other.describe()),
        };
        return Err(SyntaxError::new(*at, message));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// Backtick-quoted column name.
    Quoted(String),
    Str(String),
    Number(Value),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Op(CmpOp),
    Minus,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Quoted(name) => format!("column `{name}`"),
            Token::Str(s) => format!("string '{s}'"),
            Token::Number(v) => format!("number {v}"),
            Token::True => "'true'".into(),
            Token::False => "'false'".into(),
            Token::Null => "'null'".into(),
            Token::And => "'and'".into(),
            Token::Or => "'or'".into(),
            Token::Not => "'not'".into(),
            Token::Op(op) => format!("'{}'", op.symbol()),
            Token::Minus => "'-'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
        }
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '-' => {
                chars.next();
                Token::Minus
            }
            '&' | '|' => {
                chars.next();
                if next_is(&mut chars, c) {
                    chars.next();
                }
                if c == '&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            '~' => {
                chars.next();
                Token::Not
            }
            '!' => {
                chars.next();
                if next_is(&mut chars, '=') {
                    chars.next();
                    Token::Op(CmpOp::Ne)
                } else {
                    Token::Not
                }
            }
            '=' => {
                chars.next();
                if !next_is(&mut chars, '=') {
                    return Err(SyntaxError::new(
                        pos,
                        "assignment is not supported; use '==' to compare",
                    ));
                }
                chars.next();
                Token::Op(CmpOp::Eq)
            }
            '<' | '>' => {
                chars.next();
                let or_equal = next_is(&mut chars, '=');
                if or_equal {
                    chars.next();
                }
                Token::Op(match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    (_, false) => CmpOp::Gt,
                    (_, true) => CmpOp::Ge,
                })
            }
            '\'' | '"' => Token::Str(read_string(&mut chars, input, pos)?),
            '`' => Token::Quoted(read_backticked(&mut chars, pos)?),
            c if c.is_ascii_digit() => Token::Number(read_number(&mut chars, pos, "")?),
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, d)) if d.is_ascii_digit() => {
                        Token::Number(read_number(&mut chars, pos, "0.")?)
                    }
                    _ => {
                        return Err(SyntaxError::new(pos, "attribute access is not supported"));
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = read_word(&mut chars);
                match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word),
                }
            }
            other => {
                return Err(SyntaxError::new(pos, format!("unexpected character '{other}'")));
            }
        };
        tokens.push((pos, token));
    }

    Ok(tokens)
}

fn next_is(chars: &mut Chars<'_>, expected: char) -> bool {
    matches!(chars.peek(), Some(&(_, c)) if c == expected)
}

fn read_word(chars: &mut Chars<'_>) -> String {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !(c.is_alphanumeric() || c == '_') {
            break;
        }
        word.push(c);
        chars.next();
    }
    word
}

fn read_number(chars: &mut Chars<'_>, start: usize, prefix: &str) -> Result<Value, SyntaxError> {
    let mut text = prefix.to_string();
    let mut prev = ' ';
    while let Some(&(_, c)) = chars.peek() {
        let accepted = c.is_ascii_digit()
            || c == '.'
            || c == 'e'
            || c == 'E'
            || ((c == '+' || c == '-') && (prev == 'e' || prev == 'E'));
        if !accepted {
            break;
        }
        text.push(c);
        prev = c;
        chars.next();
    }
    if let Some(&(at, c)) = chars.peek() {
        if c.is_alphabetic() || c == '_' {
            return Err(SyntaxError::new(at, format!("unexpected character '{c}' after number")));
        }
    }
    parse_number(&text, start)
}

fn parse_number(text: &str, start: usize) -> Result<Value, SyntaxError> {
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| SyntaxError::new(start, format!("invalid number '{text}'")))
}

fn read_string(chars: &mut Chars<'_>, input: &str, start: usize) -> Result<String, SyntaxError> {
    let Some((_, quote)) = chars.next() else {
        return Err(SyntaxError::new(start, "expected string"));
    };
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, c)) => out.push(c),
                None => break,
            },
            Some((_, c)) if c == quote => return Ok(out),
            Some((_, c)) => out.push(c),
            None => break,
        }
    }
    Err(SyntaxError::new(
        start,
        format!("unterminated string {}", &input[start..]),
    ))
}

fn read_backticked(chars: &mut Chars<'_>, start: usize) -> Result<String, SyntaxError> {
    chars.next();
    let mut name = String::new();
    for (_, c) in chars.by_ref() {
        if c == '`' {
            if name.is_empty() {
                return Err(SyntaxError::new(start, "empty column name"));
            }
            return Ok(name);
        }
        name.push(c);
    }
    Err(SyntaxError::new(start, "unterminated `column name`"))
}

// ---------------------------------------------------------------------------
// Recursive-descent parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// Offset reported for errors at end of input.
    end: usize,
    /// Current nesting of the tree being built.
    depth: usize,
}

/// Deepest expression tree the parser will build. Binding and evaluation
/// recurse over the tree, so this bounds their stack use too.
pub const MAX_DEPTH: usize = 256;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Go one level deeper, failing once the tree would exceed [`MAX_DEPTH`].
    fn descend(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let at = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map_or(self.end, |(at, _)| *at);
            return Err(SyntaxError::new(
                at,
                format!("expression nests more than {MAX_DEPTH} levels deep"),
            ));
        }
        Ok(())
    }

    // `and`/`or` chains build left-leaning trees, so every extra operand
    // counts as a level.
    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            self.descend()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            self.descend()?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_operand()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, SyntaxError> {
        let Some((at, token)) = self.next() else {
            return Err(SyntaxError::new(self.end, "unexpected end of expression"));
        };
        match token {
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((at, other)) => Err(SyntaxError::new(
                        at,
                        format!("expected ')', found {}", other.describe()),
                    )),
                    None => Err(SyntaxError::new(self.end, "missing ')'")),
                }
            }
            Token::Ident(name) | Token::Quoted(name) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(SyntaxError::new(at, "function calls are not supported"));
                }
                Ok(Expr::Column(name))
            }
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Number(v) => Ok(Expr::Literal(v)),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Minus => match self.next() {
                Some((_, Token::Number(Value::Integer(i)))) => Ok(Expr::Literal(
                    i.checked_neg()
                        .map(Value::Integer)
                        .unwrap_or(Value::Float(-(i as f64))),
                )),
                Some((_, Token::Number(Value::Float(f)))) => Ok(Expr::Literal(Value::Float(-f))),
                _ => Err(SyntaxError::new(at, "'-' must be followed by a number")),
            },
            other => Err(SyntaxError::new(
                at,
                format!(
                    "expected a column, literal or '(', found {}",
                    other.describe()
                ),
            )),
        }
    }
}
