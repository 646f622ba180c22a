//! Version helpers.
//!
//! This module centralizes version parsing for capability attributes and
//! run-path clauses. Versions follow the `major.minor.micro.qualifier`
//! scheme; missing numeric segments default to zero and an empty literal is
//! the empty version `0.0.0`.

use std::fmt;
use std::str::FromStr;

use crate::errors::{CapresError, CapresResult};

/// A four-part version.
///
/// Ordering compares the numeric segments numerically and the qualifier
/// lexicographically, so `1.0.0` < `1.0.0.beta` < `1.0.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    /// The empty version `0.0.0`.
    pub const EMPTY: Version = Version {
        major: 0,
        minor: 0,
        micro: 0,
        qualifier: String::new(),
    };

    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Parse a version literal (e.g. "1", "1.2.3", "1.2.3.SNAPSHOT").
    pub fn parse(s: &str) -> CapresResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::EMPTY);
        }

        let mut parts = s.splitn(4, '.');
        let major = parse_segment(parts.next(), s)?;
        let minor = parse_segment(parts.next(), s)?;
        let micro = parse_segment(parts.next(), s)?;
        let qualifier = parts.next().unwrap_or_default();

        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CapresError::version(format!(
                "invalid qualifier in version: {s}"
            )));
        }

        Ok(Self {
            major,
            minor,
            micro,
            qualifier: qualifier.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

fn parse_segment(seg: Option<&str>, whole: &str) -> CapresResult<u32> {
    match seg {
        None => Ok(0),
        Some(seg) if !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()) => seg
            .parse()
            .map_err(|_| CapresError::version(format!("version segment out of range: {whole}"))),
        Some(_) => Err(CapresError::version(format!("invalid version: {whole}"))),
    }
}

impl FromStr for Version {
    type Err = CapresError;

    fn from_str(s: &str) -> CapresResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// A version range such as `[1.0,2.0)` or the open-ended `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// The range `[v, ∞)`.
    pub fn at_least(v: Version) -> Self {
        Self {
            floor: v,
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// Parse either bracketed range syntax or a bare version (meaning "at least").
    pub fn parse(s: &str) -> CapresResult<Self> {
        let s = s.trim();
        let first = s.chars().next();
        if !matches!(first, Some('[') | Some('(')) {
            return Ok(Self::at_least(Version::parse(s)?));
        }

        let last = s.chars().last();
        let ceiling_inclusive = match last {
            Some(']') => true,
            Some(')') => false,
            _ => {
                return Err(CapresError::version(format!(
                    "version range must end with ']' or ')': {s}"
                )))
            }
        };

        let body = &s[1..s.len() - 1];
        let (lo, hi) = body
            .split_once(',')
            .ok_or_else(|| CapresError::version(format!("version range needs two bounds: {s}")))?;

        let floor = Version::parse(lo)?;
        let ceiling = Version::parse(hi)?;
        if ceiling < floor {
            return Err(CapresError::version(format!(
                "version range ceiling below floor: {s}"
            )));
        }

        Ok(Self {
            floor,
            floor_inclusive: first == Some('['),
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }

    /// True only for bracketed range syntax. Bare versions are fixed literals.
    pub fn is_version_range(s: &str) -> bool {
        let s = s.trim();
        (s.starts_with('[') || s.starts_with('(')) && Self::parse(s).is_ok()
    }

    pub fn includes(&self, v: &Version) -> bool {
        let above = if self.floor_inclusive {
            *v >= self.floor
        } else {
            *v > self.floor
        };
        let below = match &self.ceiling {
            None => true,
            Some(c) if self.ceiling_inclusive => v <= c,
            Some(c) => v < c,
        };
        above && below
    }

    /// Render the range as an LDAP filter over `attr`.
    pub fn to_filter(&self, attr: &str) -> String {
        let floor = if self.floor_inclusive {
            format!("({attr}>={})", self.floor)
        } else {
            format!("(!({attr}<={}))", self.floor)
        };
        match &self.ceiling {
            None => floor,
            Some(c) if self.ceiling_inclusive => format!("(&{floor}({attr}<={c}))"),
            Some(c) => format!("(&{floor}(!({attr}>={c})))"),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None => write!(f, "{}", self.floor),
            Some(c) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                c,
                if self.ceiling_inclusive { ']' } else { ')' }
            ),
        }
    }
}
