//! Header parameter parsing.
//!
//! Manifest headers and path specifications share one syntax:
//!
//! ```text
//! header  = clause ( ',' clause )*
//! clause  = key ( ';' key )* ( ';' param )*
//! param   = name '=' value | name ':' type '=' value | name ':=' value
//! ```
//!
//! Values may be double-quoted to protect `,` and `;`. A clause with several
//! keys yields one entry per key sharing the same parameters. Keys repeated
//! within a header get a `~` appended so that every entry survives.

use indexmap::IndexMap;

use crate::errors::{CapresError, CapresResult};
use crate::model::{AttrValue, Attrs};

/// An attribute as written in the header, with its optional declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttr {
    pub ty: Option<String>,
    pub value: String,
}

/// One header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub key: String,
    pub attributes: IndexMap<String, RawAttr>,
    pub directives: IndexMap<String, String>,
}

impl Clause {
    /// Raw attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }

    /// The `version` attribute, if present.
    pub fn version(&self) -> Option<&str> {
        self.attribute("version")
    }

    /// Attributes converted according to their declared types (untyped → String).
    pub fn typed_attributes(&self) -> CapresResult<Attrs> {
        self.attributes
            .iter()
            .map(|(k, a)| {
                let v = match &a.ty {
                    Some(ty) => AttrValue::parse_typed(ty, &a.value)?,
                    None => AttrValue::String(a.value.clone()),
                };
                Ok((k.clone(), v))
            })
            .collect()
    }
}

/// An ordered list of header clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    clauses: Vec<Clause>,
}

impl Parameters {
    pub fn parse(header: &str) -> CapresResult<Self> {
        let mut clauses: Vec<Clause> = Vec::new();

        for clause_src in split_top_level(header, ',')? {
            if clause_src.trim().is_empty() {
                continue;
            }

            let mut keys = Vec::new();
            let mut attributes = IndexMap::new();
            let mut directives = IndexMap::new();

            for part in split_top_level(&clause_src, ';')? {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match find_unquoted(part, '=') {
                    None => {
                        if !attributes.is_empty() || !directives.is_empty() {
                            return Err(CapresError::manifest(format!(
                                "key after parameters in clause: {clause_src}"
                            )));
                        }
                        keys.push(part.to_string());
                    }
                    Some(eq) => {
                        let name = part[..eq].trim();
                        let value = unquote(part[eq + 1..].trim());
                        if let Some(dir) = name.strip_suffix(':') {
                            directives.insert(dir.trim().to_string(), value);
                        } else if let Some((n, ty)) = name.split_once(':') {
                            attributes.insert(
                                n.trim().to_string(),
                                RawAttr {
                                    ty: Some(ty.trim().to_string()),
                                    value,
                                },
                            );
                        } else {
                            attributes.insert(name.to_string(), RawAttr { ty: None, value });
                        }
                    }
                }
            }

            if keys.is_empty() {
                return Err(CapresError::manifest(format!(
                    "clause without key: {clause_src}"
                )));
            }

            for key in keys {
                let mut key = key;
                while clauses.iter().any(|c| c.key == key) {
                    key.push('~');
                }
                clauses.push(Clause {
                    key,
                    attributes: attributes.clone(),
                    directives: directives.clone(),
                });
            }
        }

        Ok(Self { clauses })
    }

    /// Strip the `~` markers added to repeated keys.
    pub fn remove_duplicate_marker(key: &str) -> &str {
        key.trim_end_matches('~')
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }
}

impl IntoIterator for Parameters {
    type Item = Clause;
    type IntoIter = std::vec::IntoIter<Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.into_iter()
    }
}

fn split_top_level(s: &str, sep: char) -> CapresResult<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => {
                cur.push(c);
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            '"' => {
                quoted = !quoted;
                cur.push(c);
            }
            c if c == sep && !quoted => out.push(std::mem::take(&mut cur)),
            c => cur.push(c),
        }
    }
    if quoted {
        return Err(CapresError::manifest(format!("unterminated quote in: {s}")));
    }
    out.push(cur);
    Ok(out)
}

fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == target && !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(v: &str) -> String {
    match v.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    #[test]
    fn parses_run_path() {
        let p = Parameters::parse("org.apache.felix.framework;version=latest, com.acme;version=\"[1,2)\"")
            .unwrap();
        let clauses: Vec<_> = p.iter().collect();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].key, "org.apache.felix.framework");
        assert_eq!(clauses[0].version(), Some("latest"));
        assert_eq!(clauses[1].version(), Some("[1,2)"));
    }

    #[test]
    fn directives_and_typed_attributes() {
        let p = Parameters::parse("osgi.ee;osgi.ee=JavaSE;version:List<Version>=\"1.8,11\";effective:=active")
            .unwrap();
        let c = p.iter().next().unwrap();
        assert_eq!(c.directives.get("effective").map(String::as_str), Some("active"));
        let attrs = c.typed_attributes().unwrap();
        assert_eq!(
            attrs.get("version"),
            Some(&AttrValue::List(vec![
                AttrValue::Version(Version::new(1, 8, 0)),
                AttrValue::Version(Version::new(11, 0, 0)),
            ]))
        );
    }

    #[test]
    fn duplicate_keys_are_marked() {
        let p = Parameters::parse("a;version=1,a;version=2").unwrap();
        let keys: Vec<_> = p.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "a~"]);
        assert_eq!(Parameters::remove_duplicate_marker("a~"), "a");
    }

    #[test]
    fn multiple_keys_share_parameters() {
        let p = Parameters::parse("a;b;version=1").unwrap();
        assert_eq!(p.len(), 2);
        assert!(p.iter().all(|c| c.version() == Some("1")));
    }

    #[test]
    fn empty_header() {
        assert!(Parameters::parse("").unwrap().is_empty());
        assert!(Parameters::parse(" , ").unwrap().is_empty());
    }

    #[test]
    fn unterminated_quote_is_error() {
        assert!(Parameters::parse("a;version=\"1").is_err());
    }
}
