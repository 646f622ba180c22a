//! JAR manifest parsing.
//!
//! Only the main section is read. Lines are `Name: value`; a line starting
//! with a single space continues the previous value. Header names are
//! matched case-insensitively.
//!
//! This module works on bytes; reading the file or the JAR entry is the
//! caller's job.

use indexmap::IndexMap;

use crate::errors::{CapresError, CapresResult};

/// Conventional location of the manifest inside a JAR.
pub const JAR_MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Main-section headers of a manifest, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    headers: IndexMap<String, String>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> CapresResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CapresError::manifest(format!("manifest is not UTF-8: {e}")))?;

        let mut headers: IndexMap<String, String> = IndexMap::new();
        let mut last: Option<String> = None;

        for (lineno, line) in text.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if let Some(cont) = line.strip_prefix(' ') {
                let key = last.as_ref().ok_or_else(|| {
                    CapresError::manifest(format!("continuation without header at line {}", lineno + 1))
                })?;
                if let Some(v) = headers.get_mut(key) {
                    v.push_str(cont);
                }
                continue;
            }

            let (name, value) = line.split_once(':').ok_or_else(|| {
                CapresError::manifest(format!("missing ':' at line {}", lineno + 1))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(CapresError::manifest(format!(
                    "empty header name at line {}",
                    lineno + 1
                )));
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            headers.insert(name.to_string(), value.to_string());
            last = Some(name.to_string());
        }

        Ok(Self { headers })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
