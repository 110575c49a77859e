//! Constrained glob dialect used for table and schema routing rules.
//!
//! Pattern characters:
//!
//! - `?` matches exactly one character
//! - `*` matches zero or more characters, and may only be the last character
//! - `[abc]`, `[a-z]` match one character from the set or range
//! - `[!a-z]` matches one character outside the set or range
//!
//! Everything else is a literal. Matching is anchored on the whole identifier
//! and case-sensitive. Because `*` can only trail, a compiled pattern is a
//! fixed chain of single-character tokens plus an optional open tail, and
//! matching is a single linear pass.

mod oracle;

pub use oracle::{validate, PatternOracle, ValidationVerdict};

use std::fmt;
use thiserror::Error;

/// Errors raised while compiling a pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty patterns are not allowed")]
    Empty,

    #[error("'*' must be the last character (found at position {0})")]
    WildcardNotLast(usize),

    #[error("unterminated '[' starting at position {0}")]
    UnterminatedClass(usize),

    #[error("empty character class at position {0}")]
    EmptyClass(usize),

    #[error("invalid range '{0}-{1}' in character class")]
    InvalidRange(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

impl ClassItem {
    fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn accepts(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyOne => true,
            Token::Class { negated, items } => items.iter().any(|i| i.contains(c)) != *negated,
        }
    }
}

/// A parsed pattern, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    source: String,
    tokens: Vec<Token>,
    open_tail: bool,
}

impl CompiledPattern {
    /// Compile a pattern, enforcing the dialect's restrictions.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let chars: Vec<char> = pattern.chars().collect();
        if chars.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut tokens = Vec::with_capacity(chars.len());
        let mut open_tail = false;
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    if i + 1 != chars.len() {
                        return Err(PatternError::WildcardNotLast(i));
                    }
                    open_tail = true;
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyOne);
                    i += 1;
                }
                '[' => {
                    let (token, next) = parse_class(&chars, i)?;
                    tokens.push(token);
                    i = next;
                }
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            tokens,
            open_tail,
        })
    }

    /// Check whether the whole identifier matches.
    pub fn matches(&self, identifier: &str) -> bool {
        let mut chars = identifier.chars();
        for token in &self.tokens {
            match chars.next() {
                Some(c) if token.accepts(c) => {}
                _ => return false,
            }
        }
        self.open_tail || chars.next().is_none()
    }

    /// The pattern text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse a bracket class starting at `start` (the `[`).
///
/// Returns the token and the index just past the closing `]`.
fn parse_class(chars: &[char], start: usize) -> Result<(Token, usize), PatternError> {
    let mut i = start + 1;
    let negated = chars.get(i) == Some(&'!');
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    loop {
        let c = *chars
            .get(i)
            .ok_or(PatternError::UnterminatedClass(start))?;
        if c == ']' {
            break;
        }
        // `a-z`, unless the dash is the last member (`[a-]`).
        match (chars.get(i + 1), chars.get(i + 2)) {
            (Some('-'), Some(&hi)) if hi != ']' => {
                if c > hi {
                    return Err(PatternError::InvalidRange(c, hi));
                }
                items.push(ClassItem::Range(c, hi));
                i += 3;
            }
            _ => {
                items.push(ClassItem::Single(c));
                i += 1;
            }
        }
    }

    if items.is_empty() {
        return Err(PatternError::EmptyClass(start));
    }

    Ok((Token::Class { negated, items }, i + 1))
}
