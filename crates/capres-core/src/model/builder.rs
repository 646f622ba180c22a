//! Builders for capabilities, requirements and resources.
//!
//! Resources are immutable once built. A `ResourceBuilder` collects
//! capability/requirement builders and produces the resource together with
//! back-references from every capability and requirement.

use std::sync::{Arc, Weak};

use crate::errors::{CapresError, CapresResult};
use crate::filter::Filter;
use crate::header::{Clause, Parameters};
use crate::manifest::Manifest;
use crate::model::{
    AttrValue, Attrs, CapReqData, Capability, Directives, Requirement, Resource, ResourceInner,
};
use crate::version::{Version, VersionRange};
use crate::{attr, directive, namespace, values};

/// Builder for a single capability or requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct CapReqBuilder {
    namespace: String,
    attributes: Attrs,
    directives: Directives,
}

impl CapReqBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            attributes: Attrs::new(),
            directives: Directives::new(),
        }
    }

    /// Start from an existing capability, detached from its resource.
    pub fn from_capability(cap: &Capability) -> Self {
        Self {
            namespace: cap.namespace().to_string(),
            attributes: cap.attributes().clone(),
            directives: cap.directives().clone(),
        }
    }

    /// Start from an existing requirement, detached from its resource.
    pub fn from_requirement(req: &Requirement) -> Self {
        Self {
            namespace: req.namespace().to_string(),
            attributes: req.attributes().clone(),
            directives: req.directives().clone(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attrs {
        &self.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(key.into(), value.into());
        self
    }

    pub fn filter(self, filter: impl Into<String>) -> Self {
        self.directive(directive::FILTER, filter)
    }

    /// Add header clause attributes (typed) and directives.
    pub fn clause(mut self, clause: &Clause) -> CapresResult<Self> {
        self.attributes.extend(clause.typed_attributes()?);
        self.directives.extend(
            clause
                .directives
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(self)
    }

    fn parsed_filter(&self) -> CapresResult<Option<Filter>> {
        self.directives
            .get(directive::FILTER)
            .map(|f| Filter::parse(f))
            .transpose()
    }

    fn data(self) -> CapReqData {
        CapReqData {
            namespace: self.namespace,
            attributes: self.attributes,
            directives: self.directives,
        }
    }

    /// Build a capability that belongs to no resource.
    pub fn build_capability(self) -> Capability {
        Capability::new(self.data(), Weak::new())
    }

    /// Build a requirement that belongs to no resource.
    pub fn build_requirement(self) -> CapresResult<Requirement> {
        let filter = self.parsed_filter()?;
        Ok(Requirement::new(self.data(), filter, Weak::new()))
    }

    /// Identity requirement on `bsn`, optionally restricted to a version range.
    pub fn bundle_requirement(bsn: &str, range: Option<&str>) -> CapresResult<Self> {
        let id = Filter::Equal(namespace::IDENTITY.to_string(), bsn.to_string()).to_string();
        let filter = match range.map(str::trim).filter(|r| !r.is_empty()) {
            None => id,
            Some(r) => {
                let range = VersionRange::parse(r)?;
                format!("(&{id}{})", range.to_filter(attr::VERSION))
            }
        };
        Ok(Self::new(namespace::IDENTITY).filter(filter))
    }

    /// Package capability for `name`, versioned when `version` is given.
    pub fn package_capability(name: &str, version: Option<&str>) -> CapresResult<Self> {
        let mut b = Self::new(namespace::PACKAGE).attribute(namespace::PACKAGE, name);
        if let Some(v) = version {
            b.set_attribute(attr::VERSION, Version::parse(v)?);
        }
        Ok(b)
    }
}

/// Builder for a resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceBuilder {
    capabilities: Vec<CapReqBuilder>,
    requirements: Vec<CapReqBuilder>,
}

impl ResourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_capability(&mut self, cap: CapReqBuilder) -> &mut Self {
        self.capabilities.push(cap);
        self
    }

    pub fn add_requirement(&mut self, req: CapReqBuilder) -> &mut Self {
        self.requirements.push(req);
        self
    }

    pub fn capabilities(&self) -> &[CapReqBuilder] {
        &self.capabilities
    }

    pub fn requirements(&self) -> &[CapReqBuilder] {
        &self.requirements
    }

    /// Copy the capabilities of `resource`, skipping the `ignored` namespaces.
    pub fn copy_capabilities(&mut self, ignored: &[&str], resource: &Resource) -> &mut Self {
        for cap in resource.capabilities(None) {
            if !ignored.contains(&cap.namespace()) {
                self.capabilities.push(CapReqBuilder::from_capability(cap));
            }
        }
        self
    }

    /// Derive capabilities and requirements from bundle manifest headers.
    pub fn add_manifest(&mut self, manifest: &Manifest) -> CapresResult<&mut Self> {
        let bsn_clause = match manifest.get("Bundle-SymbolicName") {
            Some(h) => Parameters::parse(h)?.into_iter().next(),
            None => None,
        };
        let bundle_version = manifest
            .get("Bundle-Version")
            .map(Version::parse)
            .transpose()?
            .unwrap_or_default();
        let fragment = manifest.get("Fragment-Host").is_some();

        if let Some(clause) = &bsn_clause {
            let bsn = clause.key.as_str();
            let kind = if fragment {
                values::TYPE_FRAGMENT
            } else {
                values::TYPE_BUNDLE
            };

            let mut identity = CapReqBuilder::new(namespace::IDENTITY)
                .attribute(namespace::IDENTITY, bsn)
                .attribute(attr::IDENTITY_TYPE, kind)
                .attribute(attr::VERSION, bundle_version.clone());
            if let Some(singleton) = clause.directives.get("singleton") {
                identity = identity.directive("singleton", singleton.clone());
            }
            self.add_capability(identity);

            if !fragment {
                for ns in [namespace::BUNDLE, namespace::HOST] {
                    self.add_capability(
                        CapReqBuilder::new(ns)
                            .clause(clause)?
                            .attribute(ns, bsn)
                            .attribute(attr::BUNDLE_VERSION, bundle_version.clone()),
                    );
                }
            }
        }

        if let Some(h) = manifest.get("Export-Package") {
            for clause in Parameters::parse(h)? {
                let name = Parameters::remove_duplicate_marker(&clause.key);
                let version = clause
                    .attribute("version")
                    .or_else(|| clause.attribute("specification-version"))
                    .map(Version::parse)
                    .transpose()?
                    .unwrap_or_default();
                let mut cap = CapReqBuilder::new(namespace::PACKAGE)
                    .clause(&clause)?
                    .attribute(namespace::PACKAGE, name)
                    .attribute(attr::VERSION, version);
                cap.attributes.remove("specification-version");
                if let Some(clause) = &bsn_clause {
                    cap = cap
                        .attribute(attr::BUNDLE_SYMBOLIC_NAME, clause.key.as_str())
                        .attribute(attr::BUNDLE_VERSION, bundle_version.clone());
                }
                self.add_capability(cap);
            }
        }

        if let Some(h) = manifest.get("Provide-Capability") {
            for clause in Parameters::parse(h)? {
                let ns = Parameters::remove_duplicate_marker(&clause.key);
                self.add_capability(CapReqBuilder::new(ns).clause(&clause)?);
            }
        }

        if let Some(h) = manifest.get("Import-Package") {
            for clause in Parameters::parse(h)? {
                let name = Parameters::remove_duplicate_marker(&clause.key);
                if name.contains('*') {
                    continue;
                }
                let filter =
                    versioned_filter(namespace::PACKAGE, name, clause.attribute("version"), attr::VERSION)?;
                let mut req = CapReqBuilder::new(namespace::PACKAGE).filter(filter);
                if let Some(res) = clause.directives.get(directive::RESOLUTION) {
                    req = req.directive(directive::RESOLUTION, res.clone());
                }
                self.add_requirement(req);
            }
        }

        if let Some(h) = manifest.get("Require-Bundle") {
            for clause in Parameters::parse(h)? {
                let name = Parameters::remove_duplicate_marker(&clause.key);
                let filter = versioned_filter(
                    namespace::BUNDLE,
                    name,
                    clause.attribute("bundle-version"),
                    attr::BUNDLE_VERSION,
                )?;
                let mut req = CapReqBuilder::new(namespace::BUNDLE).filter(filter);
                if let Some(res) = clause.directives.get(directive::RESOLUTION) {
                    req = req.directive(directive::RESOLUTION, res.clone());
                }
                self.add_requirement(req);
            }
        }

        if let Some(h) = manifest.get("Fragment-Host") {
            if let Some(clause) = Parameters::parse(h)?.into_iter().next() {
                let filter = versioned_filter(
                    namespace::HOST,
                    &clause.key,
                    clause.attribute("bundle-version"),
                    attr::BUNDLE_VERSION,
                )?;
                self.add_requirement(CapReqBuilder::new(namespace::HOST).filter(filter));
            }
        }

        if let Some(h) = manifest.get("Require-Capability") {
            for clause in Parameters::parse(h)? {
                let ns = Parameters::remove_duplicate_marker(&clause.key);
                self.add_requirement(CapReqBuilder::new(ns).clause(&clause)?);
            }
        }

        Ok(self)
    }

    /// Build the resource. Fails if any requirement carries a malformed filter.
    pub fn build(self) -> CapresResult<Resource> {
        let requirements = self
            .requirements
            .into_iter()
            .map(|b| {
                let filter = b.parsed_filter()?;
                Ok((b.data(), filter))
            })
            .collect::<CapresResult<Vec<_>>>()?;
        let capabilities: Vec<CapReqData> =
            self.capabilities.into_iter().map(CapReqBuilder::data).collect();

        let inner = Arc::new_cyclic(|weak: &Weak<ResourceInner>| ResourceInner {
            capabilities: capabilities
                .into_iter()
                .map(|data| Capability::new(data, weak.clone()))
                .collect(),
            requirements: requirements
                .into_iter()
                .map(|(data, filter)| Requirement::new(data, filter, weak.clone()))
                .collect(),
        });
        Ok(Resource::from_inner(inner))
    }
}

fn versioned_filter(
    ns: &str,
    name: &str,
    range: Option<&str>,
    version_attr: &str,
) -> CapresResult<String> {
    let base = Filter::Equal(ns.to_string(), name.to_string()).to_string();
    match range {
        None => Ok(base),
        Some(r) => {
            let range = VersionRange::parse(r)
                .map_err(|e| CapresError::manifest(format!("bad version range for {name}: {e}")))?;
            Ok(format!("(&{base}{})", range.to_filter(version_attr)))
        }
    }
}
