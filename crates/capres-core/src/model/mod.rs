//! Resources, capabilities and requirements.
//!
//! A `Resource` is a shared handle. Capabilities and requirements point back
//! at their owning resource through a weak reference: the back-reference is a
//! lookup, not ownership, so a resource and its capabilities never keep each
//! other alive. Capabilities built without a resource are *synthetic*.
//!
//! Equality:
//! - `Resource`: handle identity.
//! - `Capability` / `Requirement`: namespace, attributes, directives and the
//!   owning resource handle.
//!
//! Attribute and directive maps are `BTreeMap`s so that hashing and
//! iteration are deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use itertools::Itertools;

use crate::filter::Filter;
use crate::namespace;

pub mod builder;
pub mod value;

pub use builder::{CapReqBuilder, ResourceBuilder};
pub use value::AttrValue;

/// Attribute map.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Directive map.
pub type Directives = BTreeMap<String, String>;

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct CapReqData {
    pub(crate) namespace: String,
    pub(crate) attributes: Attrs,
    pub(crate) directives: Directives,
}

impl fmt::Display for CapReqData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        for (k, v) in &self.attributes {
            write!(f, ";{k}={v}")?;
        }
        for (k, v) in &self.directives {
            write!(f, ";{k}:={v}")?;
        }
        Ok(())
    }
}

pub(crate) struct ResourceInner {
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) requirements: Vec<Requirement>,
}

/// A deployable unit offering capabilities and declaring requirements.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub(crate) fn from_inner(inner: Arc<ResourceInner>) -> Self {
        Self { inner }
    }

    /// Capabilities, optionally restricted to one namespace.
    pub fn capabilities<'a>(
        &'a self,
        namespace: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Capability> + 'a {
        self.inner
            .capabilities
            .iter()
            .filter(move |c| namespace.map_or(true, |ns| c.namespace() == ns))
    }

    /// Requirements, optionally restricted to one namespace.
    pub fn requirements<'a>(
        &'a self,
        namespace: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Requirement> + 'a {
        self.inner
            .requirements
            .iter()
            .filter(move |r| namespace.map_or(true, |ns| r.namespace() == ns))
    }

    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable address of the handle for the lifetime of the resource.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    fn downgrade(&self) -> Weak<ResourceInner> {
        Arc::downgrade(&self.inner)
    }

    /// True if `cap` belongs to this resource.
    pub fn owns(&self, cap: &Capability) -> bool {
        Weak::ptr_eq(&cap.resource, &self.downgrade())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.capabilities(Some(namespace::IDENTITY)).next();
        match identity {
            Some(cap) => {
                let name = cap
                    .attribute(namespace::IDENTITY)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                match cap.attribute(crate::attr::VERSION) {
                    Some(v) => write!(f, "{name};version={v}"),
                    None => write!(f, "{name}"),
                }
            }
            None => write!(f, "<anonymous resource @{:x}>", self.addr()),
        }
    }
}

/// A named offer in a namespace.
#[derive(Clone)]
pub struct Capability {
    data: Arc<CapReqData>,
    resource: Weak<ResourceInner>,
}

impl Capability {
    pub(crate) fn new(data: CapReqData, resource: Weak<ResourceInner>) -> Self {
        Self {
            data: Arc::new(data),
            resource,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.data.namespace
    }

    pub fn attributes(&self) -> &Attrs {
        &self.data.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.data.directives
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.data.attributes.get(key)
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        self.data.directives.get(key).map(String::as_str)
    }

    /// The owning resource, if any and still alive.
    pub fn resource(&self) -> Option<Resource> {
        self.resource.upgrade().map(Resource::from_inner)
    }

    pub fn is_synthetic(&self) -> bool {
        self.resource.strong_count() == 0
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.resource, &other.resource) && self.data == other.data
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
        (self.resource.as_ptr() as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)?;
        if let Some(r) = self.resource() {
            write!(f, " [{r}]")?;
        }
        Ok(())
    }
}

/// A named demand in a namespace, selecting capabilities with a filter.
#[derive(Clone)]
pub struct Requirement {
    data: Arc<CapReqData>,
    filter: Option<Arc<Filter>>,
    resource: Weak<ResourceInner>,
}

impl Requirement {
    pub(crate) fn new(
        data: CapReqData,
        filter: Option<Filter>,
        resource: Weak<ResourceInner>,
    ) -> Self {
        Self {
            data: Arc::new(data),
            filter: filter.map(Arc::new),
            resource,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.data.namespace
    }

    pub fn attributes(&self) -> &Attrs {
        &self.data.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.data.directives
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        self.data.directives.get(key).map(String::as_str)
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_deref()
    }

    pub fn resource(&self) -> Option<Resource> {
        self.resource.upgrade().map(Resource::from_inner)
    }

    /// True if `cap` is in this requirement's namespace and passes its filter.
    pub fn matches(&self, cap: &Capability) -> bool {
        cap.namespace() == self.namespace()
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(cap.attributes()))
    }

    /// True when the requirement is marked `resolution:=optional`.
    pub fn is_optional(&self) -> bool {
        self.directive(crate::directive::RESOLUTION) == Some(crate::values::RESOLUTION_OPTIONAL)
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.resource, &other.resource) && self.data == other.data
    }
}

impl Eq for Requirement {}

impl Hash for Requirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
        (self.resource.as_ptr() as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

/// Format a capability list on one line, for diagnostics.
pub fn describe_capabilities<'a>(caps: impl IntoIterator<Item = &'a Capability>) -> String {
    format!("[{}]", caps.into_iter().join(", "))
}
