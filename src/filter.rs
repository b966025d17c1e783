//! Filter expressions for selecting torrents on the command line.
//!
//! ```text
//! expr  := and ("||" and)*
//! and   := unary ("&&" unary)*
//! unary := "!" unary | "(" expr ")" | field op literal
//! op    := "==" | "!=" | "<" | "<=" | ">" | ">=" | "~"
//! ```
//!
//! `~` is a substring match on text fields. Literals are integers, quoted
//! strings or bare words; `true`/`false` compare as 1/0.

use crate::batch::Predicate;
use crate::torrent::{HashId, TorrentMeta};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Length,
    Files,
    Pieces,
    PieceLength,
    Index,
    Hash,
    Comment,
    CreatedBy,
    Announce,
    Private,
    Version,
}

impl Field {
    fn parse(s: &str) -> Option<Self> {
        let f = match s {
            "name" => Self::Name,
            "length" => Self::Length,
            "files" => Self::Files,
            "pieces" => Self::Pieces,
            "piece_length" => Self::PieceLength,
            "index" => Self::Index,
            "hash" => Self::Hash,
            "comment" => Self::Comment,
            "created_by" => Self::CreatedBy,
            "announce" => Self::Announce,
            "private" => Self::Private,
            "version" => Self::Version,
            _ => return None,
        };
        Some(f)
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Length
                | Self::Files
                | Self::Pieces
                | Self::PieceLength
                | Self::Index
                | Self::Private
                | Self::Version
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

impl Op {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Contains => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Int(i64),
    Text(String),
    Hash(HashId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp(Field, Op, Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(String),
    Op(Op),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut chars = src.char_indices().peekable();
    while let Some(&(pos, c)) = chars.peek() {
        let two = src.get(pos..pos + 2).unwrap_or("");
        let (tok, width) = match (c, two) {
            (c, _) if c.is_whitespace() => {
                chars.next();
                continue;
            }
            (_, "&&") => (Token::And, 2),
            (_, "||") => (Token::Or, 2),
            (_, "==") => (Token::Op(Op::Eq), 2),
            (_, "!=") => (Token::Op(Op::Ne), 2),
            (_, "<=") => (Token::Op(Op::Le), 2),
            (_, ">=") => (Token::Op(Op::Ge), 2),
            ('<', _) => (Token::Op(Op::Lt), 1),
            ('>', _) => (Token::Op(Op::Gt), 1),
            ('~', _) => (Token::Op(Op::Contains), 1),
            ('!', _) => (Token::Not, 1),
            ('(', _) => (Token::Open, 1),
            (')', _) => (Token::Close, 1),
            ('"', _) => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, c)) => s.push(c),
                            None => break,
                        },
                        Some((_, c)) => s.push(c),
                        None => {
                            return Err(Error::Predicate(format!(
                                "unterminated string at {pos}"
                            )))
                        }
                    }
                }
                tokens.push(Token::Str(s));
                continue;
            }
            (c, _) if is_word_char(c) => {
                let mut s = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(s));
                continue;
            }
            (c, _) => return Err(Error::Predicate(format!("unexpected {c:?} at {pos}"))),
        };
        for _ in 0..width {
            chars.next();
        }
        tokens.push(tok);
    }
    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':')
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            lhs = Expr::Or(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            lhs = Expr::And(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.unary()?))),
            Some(Token::Open) => {
                let e = self.or()?;
                match self.next() {
                    Some(Token::Close) => Ok(e),
                    t => Err(Error::Predicate(format!("expect ')', got {t:?}"))),
                }
            }
            Some(Token::Word(w)) => self.comparison(&w),
            t => Err(Error::Predicate(format!("expect field, got {t:?}"))),
        }
    }

    fn comparison(&mut self, name: &str) -> Result<Expr> {
        let field =
            Field::parse(name).ok_or_else(|| Error::Predicate(format!("unknown field {name:?}")))?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            t => return Err(Error::Predicate(format!("expect operator after {name}, got {t:?}"))),
        };
        let literal = match (self.next(), field.is_numeric()) {
            (Some(Token::Word(w)), true) => match w.as_str() {
                "true" => Literal::Int(1),
                "false" => Literal::Int(0),
                _ => Literal::Int(w.parse().map_err(|_| {
                    Error::Predicate(format!("{name} is numeric, got {w:?}"))
                })?),
            },
            (Some(Token::Word(s) | Token::Str(s)), false)
                if field == Field::Hash && matches!(op, Op::Eq | Op::Ne) =>
            {
                Literal::Hash(HashId::from_hex(&s).map_err(|e| {
                    Error::Predicate(format!("hash needs 40 hex digits, got {s:?}: {e}"))
                })?)
            }
            (Some(Token::Word(s) | Token::Str(s)), false) => Literal::Text(s),
            (t, _) => return Err(Error::Predicate(format!("expect value for {name}, got {t:?}"))),
        };
        if op == Op::Contains && field.is_numeric() {
            return Err(Error::Predicate(format!("'~' needs a text field, {name} is numeric")));
        }
        Ok(Expr::Cmp(field, op, literal))
    }
}

/// A compiled filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    pub fn compile(src: &str) -> Result<Self> {
        let mut parser = Parser {
            tokens: tokenize(src)?,
            pos: 0,
        };
        let expr = parser.or()?;
        if let Some(t) = parser.peek() {
            return Err(Error::Predicate(format!("unexpected trailing {t:?}")));
        }
        Ok(Self {
            source: src.to_owned(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl Predicate for Filter {
    fn test(&self, meta: &TorrentMeta, index: usize) -> bool {
        eval(&self.expr, meta, index)
    }
}

fn eval(expr: &Expr, meta: &TorrentMeta, index: usize) -> bool {
    match expr {
        Expr::Or(a, b) => eval(a, meta, index) || eval(b, meta, index),
        Expr::And(a, b) => eval(a, meta, index) && eval(b, meta, index),
        Expr::Not(e) => !eval(e, meta, index),
        Expr::Cmp(field, op, lit) => compare(*field, *op, lit, meta, index),
    }
}

fn compare(field: Field, op: Op, lit: &Literal, meta: &TorrentMeta, index: usize) -> bool {
    // info is validated when the record is loaded
    let Ok(info) = meta.info() else {
        return false;
    };
    match lit {
        Literal::Int(want) => {
            let got: i64 = match field {
                Field::Length => info.length as i64,
                Field::Files => info.files.len() as i64,
                Field::Pieces => info.pieces.len() as i64,
                Field::PieceLength => info.piece_length as i64,
                Field::Index => index as i64,
                Field::Private => info.private as i64,
                Field::Version => info.meta_version,
                _ => return false,
            };
            op.holds(got.cmp(want))
        }
        Literal::Hash(want) => field == Field::Hash && op.holds(meta.info_hash().cmp(want)),
        Literal::Text(want) => {
            let hash;
            let got: &str = match field {
                Field::Name => &info.name,
                Field::Comment => &meta.comment,
                Field::CreatedBy => &meta.created_by,
                Field::Announce => &meta.announce,
                Field::Hash => {
                    hash = meta.info_hash().hex();
                    &hash
                }
                _ => return false,
            };
            match op {
                Op::Contains => got.contains(want.as_str()),
                op => op.holds(got.cmp(want.as_str())),
            }
        }
    }
}
