//! LDAP-style filter expressions.
//!
//! Requirements select capabilities with the standard filter subset:
//! `(&..)`, `(|..)`, `(!..)`, `(a=v)`, `(a~=v)`, `(a>=v)`, `(a<=v)`,
//! presence `(a=*)` and substrings `(a=x*y*)`.
//!
//! Comparison is driven by the attribute's type: a `Version` attribute
//! compares the literal as a version, a `Long` as an integer, and list
//! attributes match when any element matches.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;

use crate::errors::{CapresError, CapresResult};
use crate::model::{AttrValue, Attrs};
use crate::version::Version;

/// A parsed filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal(String, String),
    Approx(String, String),
    GreaterEq(String, String),
    LessEq(String, String),
    /// Segments between `*` wildcards. The first and last may be empty.
    Substring(String, Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

impl Filter {
    pub fn parse(s: &str) -> CapresResult<Self> {
        let mut p = Parser {
            src: s,
            chars: s.chars().collect(),
            pos: 0,
        };
        p.skip_ws();
        let f = p.parse_filter()?;
        p.skip_ws();
        if p.pos != p.chars.len() {
            return Err(p.error("trailing characters after filter"));
        }
        Ok(f)
    }

    /// Evaluate against an attribute map. Attribute names match case-insensitively.
    pub fn matches(&self, attrs: &Attrs) -> bool {
        match self {
            Self::And(fs) => fs.iter().all(|f| f.matches(attrs)),
            Self::Or(fs) => fs.iter().any(|f| f.matches(attrs)),
            Self::Not(f) => !f.matches(attrs),
            Self::Present(a) => lookup(attrs, a).is_some(),
            Self::Equal(a, v) => lookup(attrs, a).is_some_and(|val| compare(val, Op::Equal, v)),
            Self::Approx(a, v) => lookup(attrs, a).is_some_and(|val| compare(val, Op::Approx, v)),
            Self::GreaterEq(a, v) => {
                lookup(attrs, a).is_some_and(|val| compare(val, Op::GreaterEq, v))
            }
            Self::LessEq(a, v) => lookup(attrs, a).is_some_and(|val| compare(val, Op::LessEq, v)),
            Self::Substring(a, segs) => lookup(attrs, a).is_some_and(|val| substring(val, segs)),
        }
    }
}

fn lookup<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a AttrValue> {
    attrs.get(key).or_else(|| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn compare(val: &AttrValue, op: Op, lit: &str) -> bool {
    match val {
        AttrValue::List(items) => items.iter().any(|item| compare(item, op, lit)),
        AttrValue::String(s) => match op {
            Op::Equal => s == lit,
            Op::Approx => normalize_approx(s) == normalize_approx(lit),
            Op::GreaterEq => s.as_str() >= lit,
            Op::LessEq => s.as_str() <= lit,
        },
        AttrValue::Long(n) => lit
            .trim()
            .parse::<i64>()
            .is_ok_and(|l| ordering_satisfies(n.cmp(&l), op)),
        AttrValue::Double(d) => lit
            .trim()
            .parse::<f64>()
            .is_ok_and(|l| d.0.partial_cmp(&l).is_some_and(|o| ordering_satisfies(o, op))),
        AttrValue::Version(v) => {
            Version::parse(lit).is_ok_and(|l| ordering_satisfies(v.cmp(&l), op))
        }
    }
}

fn ordering_satisfies(o: Ordering, op: Op) -> bool {
    match op {
        Op::Equal | Op::Approx => o == Ordering::Equal,
        Op::GreaterEq => o != Ordering::Less,
        Op::LessEq => o != Ordering::Greater,
    }
}

fn normalize_approx(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring(val: &AttrValue, segs: &[String]) -> bool {
    match val {
        AttrValue::List(items) => items.iter().any(|item| substring(item, segs)),
        AttrValue::String(s) => substring_str(s, segs),
        _ => false,
    }
}

fn substring_str(s: &str, segs: &[String]) -> bool {
    let (first, rest) = match segs.split_first() {
        Some(x) => x,
        None => return true,
    };
    let (last, middle) = match rest.split_last() {
        Some(x) => x,
        None => return s == first,
    };

    if !s.starts_with(first.as_str()) || !s.ends_with(last.as_str()) {
        return false;
    }
    let end = match s.len().checked_sub(last.len()) {
        Some(end) if end >= first.len() => end,
        _ => return false,
    };

    let mut pos = first.len();
    for seg in middle {
        match s[pos..end].find(seg.as_str()) {
            Some(i) => pos += i + seg.len(),
            None => return false,
        }
    }
    true
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, msg: &str) -> CapresError {
        CapresError::filter(format!("{msg} at offset {} in {}", self.pos, self.src))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> CapresResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn parse_filter(&mut self) -> CapresResult<Filter> {
        self.expect('(')?;
        self.skip_ws();
        let f = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_ws();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            _ => self.parse_item()?,
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(f)
    }

    fn parse_list(&mut self) -> CapresResult<Vec<Filter>> {
        let mut out = Vec::new();
        self.skip_ws();
        while self.peek() == Some('(') {
            out.push(self.parse_filter()?);
            self.skip_ws();
        }
        if out.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(out)
    }

    fn parse_item(&mut self) -> CapresResult<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '<' | '>' | '~' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos].iter().collect();
        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                Op::Equal
            }
            Some(c @ ('~' | '>' | '<')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '~' => Op::Approx,
                    '>' => Op::GreaterEq,
                    _ => Op::LessEq,
                }
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let segs = self.parse_value()?;
        Ok(match op {
            Op::Equal if segs.len() == 1 => Filter::Equal(attr, segs.into_iter().collect()),
            Op::Equal if segs.len() == 2 && segs.iter().all(String::is_empty) => {
                Filter::Present(attr)
            }
            Op::Equal => Filter::Substring(attr, segs),
            Op::Approx => Filter::Approx(attr, segs.join("*")),
            Op::GreaterEq => Filter::GreaterEq(attr, segs.join("*")),
            Op::LessEq => Filter::LessEq(attr, segs.join("*")),
        })
    }

    /// Read a value up to the closing parenthesis, split at unescaped `*`.
    fn parse_value(&mut self) -> CapresResult<Vec<String>> {
        let mut segs = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated filter value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let c = self
                        .peek()
                        .ok_or_else(|| self.error("dangling escape in value"))?;
                    if let Some(last) = segs.last_mut() {
                        last.push(c);
                    }
                    self.pos += 1;
                }
                Some('*') => {
                    segs.push(String::new());
                    self.pos += 1;
                }
                Some(c) => {
                    if let Some(last) = segs.last_mut() {
                        last.push(c);
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(segs)
    }
}

fn escape(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if matches!(c, '\\' | '(' | ')' | '*') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(fs) => write!(f, "(&{})", fs.iter().join("")),
            Self::Or(fs) => write!(f, "(|{})", fs.iter().join("")),
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Present(a) => write!(f, "({a}=*)"),
            Self::Equal(a, v) => write!(f, "({a}={})", escape(v)),
            Self::Approx(a, v) => write!(f, "({a}~={})", escape(v)),
            Self::GreaterEq(a, v) => write!(f, "({a}>={})", escape(v)),
            Self::LessEq(a, v) => write!(f, "({a}<={})", escape(v)),
            Self::Substring(a, segs) => {
                write!(f, "({a}={})", segs.iter().map(|s| escape(s)).join("*"))
            }
        }
    }
}
