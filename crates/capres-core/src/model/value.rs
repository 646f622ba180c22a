//! Typed attribute values.
//!
//! Capability and requirement attributes are typed: the same literal `1.2`
//! compares differently as a string, a version or a double. Header syntax
//! carries the type after the attribute name (`version:Version=1.2`).

use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::errors::{CapresError, CapresResult};
use crate::version::Version;

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrValue {
    String(String),
    Long(i64),
    Double(OrderedFloat<f64>),
    Version(Version),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Parse `raw` according to a header type name such as `Version` or `List<Long>`.
    pub fn parse_typed(ty: &str, raw: &str) -> CapresResult<Self> {
        let ty = ty.trim();
        if let Some(inner) = ty.strip_prefix("List<").and_then(|t| t.strip_suffix('>')) {
            let items = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|item| Self::parse_scalar(inner, item))
                .collect::<CapresResult<Vec<_>>>()?;
            return Ok(Self::List(items));
        }
        if ty == "List" {
            return Self::parse_typed("List<String>", raw);
        }
        Self::parse_scalar(ty, raw)
    }

    fn parse_scalar(ty: &str, raw: &str) -> CapresResult<Self> {
        match ty.trim() {
            "String" => Ok(Self::String(raw.to_string())),
            "Long" => raw
                .trim()
                .parse()
                .map(Self::Long)
                .map_err(|_| CapresError::conversion(format!("not a Long: {raw}"))),
            "Double" => raw
                .trim()
                .parse::<f64>()
                .map(|d| Self::Double(OrderedFloat(d)))
                .map_err(|_| CapresError::conversion(format!("not a Double: {raw}"))),
            "Version" => Version::parse(raw).map(Self::Version),
            other => Err(CapresError::conversion(format!(
                "unsupported attribute type: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a version. Strings are parsed; anything else is `None`.
    pub fn as_version(&self) -> Option<Version> {
        match self {
            Self::Version(v) => Some(v.clone()),
            Self::String(s) => Version::parse(s).ok(),
            _ => None,
        }
    }

    /// Convert to a list of strings.
    ///
    /// Scalars become a one-element list; nested lists cannot be converted.
    pub fn to_string_list(&self) -> CapresResult<Vec<String>> {
        match self {
            Self::List(items) => items
                .iter()
                .map(|item| match item {
                    Self::List(_) => Err(CapresError::conversion(
                        "nested list cannot be converted to List<String>",
                    )),
                    scalar => Ok(scalar.to_string()),
                })
                .collect(),
            scalar => Ok(vec![scalar.to_string()]),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Long(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{}", d.0),
            Self::Version(v) => write!(f, "{v}"),
            Self::List(items) => write!(f, "{}", items.iter().join(",")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<f64> for AttrValue {
    fn from(d: f64) -> Self {
        Self::Double(OrderedFloat(d))
    }
}

impl From<Version> for AttrValue {
    fn from(v: Version) -> Self {
        Self::Version(v)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items.into_iter().map(Self::String).collect())
    }
}
