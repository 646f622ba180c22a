//! JSON repository index.
//!
//! An index file lists resources with their capabilities and requirements:
//!
//! ```json
//! {
//!   "name": "local",
//!   "resources": [
//!     {
//!       "capabilities": [
//!         { "namespace": "osgi.identity",
//!           "attributes": { "osgi.identity": "org.example", "version:Version": "1.2.0" } }
//!       ],
//!       "requirements": [
//!         { "namespace": "osgi.wiring.package",
//!           "directives": { "filter": "(osgi.wiring.package=org.slf4j)" } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Attribute keys may carry a type as in manifest headers (`name:Type`).
//! Untyped JSON strings are `String`, integers `Long`, other numbers
//! `Double`, arrays `List`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use capres_core::model::{AttrValue, CapReqBuilder, Resource, ResourceBuilder};

use crate::repository::ResourcesRepository;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resources: Vec<IndexResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexResource {
    #[serde(default)]
    pub capabilities: Vec<IndexEntry>,
    #[serde(default)]
    pub requirements: Vec<IndexEntry>,
}

/// One capability or requirement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexEntry {
    pub namespace: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub directives: BTreeMap<String, String>,
}

impl IndexEntry {
    fn to_builder(&self) -> anyhow::Result<CapReqBuilder> {
        if self.namespace.trim().is_empty() {
            bail!("entry has an empty namespace");
        }
        let mut b = CapReqBuilder::new(self.namespace.clone());
        for (key, value) in &self.attributes {
            let (name, value) = match key.split_once(':') {
                Some((name, ty)) => (name, typed_value(ty, value)?),
                None => (key.as_str(), untyped_value(value)?),
            };
            b.set_attribute(name.trim(), value);
        }
        for (k, v) in &self.directives {
            b = b.directive(k.clone(), v.clone());
        }
        Ok(b)
    }
}

impl IndexFile {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid repository index")
    }

    pub fn to_resources(&self) -> anyhow::Result<Vec<Resource>> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, r)| r.to_resource().with_context(|| format!("resource #{i}")))
            .collect()
    }

    /// Build an in-memory repository. `fallback_name` is used when the index has no name.
    pub fn to_repository(&self, fallback_name: &str) -> anyhow::Result<ResourcesRepository> {
        let name = self.name.as_deref().unwrap_or(fallback_name);
        Ok(ResourcesRepository::new(name, self.to_resources()?))
    }
}

impl IndexResource {
    pub fn to_resource(&self) -> anyhow::Result<Resource> {
        let mut rb = ResourceBuilder::new();
        for (i, c) in self.capabilities.iter().enumerate() {
            rb.add_capability(c.to_builder().with_context(|| format!("capability #{i}"))?);
        }
        for (i, r) in self.requirements.iter().enumerate() {
            rb.add_requirement(r.to_builder().with_context(|| format!("requirement #{i}"))?);
        }
        Ok(rb.build()?)
    }
}

/// Load an index file into a repository named after the file stem unless the index names itself.
pub fn load_index(path: &Path) -> anyhow::Result<ResourcesRepository> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read index: {}", path.display()))?;
    let index = IndexFile::parse(&text).with_context(|| format!("in {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    index
        .to_repository(stem)
        .with_context(|| format!("in {}", path.display()))
}

fn typed_value(ty: &str, value: &Value) -> anyhow::Result<AttrValue> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(anyhow!("unsupported list element: {other}")),
            })
            .collect::<anyhow::Result<Vec<_>>>()?
            .join(","),
        other => bail!("unsupported value for type {ty}: {other}"),
    };
    Ok(AttrValue::parse_typed(ty, &raw)?)
}

fn untyped_value(value: &Value) -> anyhow::Result<AttrValue> {
    match value {
        Value::String(s) => Ok(AttrValue::String(s.clone())),
        Value::Bool(b) => Ok(AttrValue::String(b.to_string())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(AttrValue::Long(i)),
            None => n
                .as_f64()
                .map(AttrValue::from)
                .ok_or_else(|| anyhow!("unsupported number: {n}")),
        },
        Value::Array(items) => Ok(AttrValue::List(
            items.iter().map(untyped_value).collect::<anyhow::Result<_>>()?,
        )),
        other => bail!("unsupported attribute value: {other}"),
    }
}
