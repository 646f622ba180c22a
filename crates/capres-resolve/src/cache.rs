//! Provider cache keys.
//!
//! A requirement is cached by value: namespace, directives, attributes and
//! the identity of its owning resource. Two requirements from different
//! handles of the same bundle therefore share a cache entry.
//!
//! The hash is computed once, at construction, and folds the four parts with
//! the usual 31-multiplier scheme in wrapping 32-bit arithmetic. The resource
//! part hashes the (identity, version) pair so that equal keys always hash
//! equally.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use capres_core::model::{Attrs, Directives, Requirement, Resource};

use crate::identity::{identity_key, optional_identity_equals};

const PRIME: i32 = 31;

#[derive(Clone)]
pub struct CacheKey {
    namespace: String,
    directives: Directives,
    attributes: Attrs,
    resource: Option<Resource>,
    hash: i32,
}

impl CacheKey {
    pub fn new(requirement: &Requirement) -> Self {
        Self::from_parts(
            requirement.namespace().to_string(),
            requirement.directives().clone(),
            requirement.attributes().clone(),
            requirement.resource(),
        )
    }

    pub fn from_parts(
        namespace: String,
        directives: Directives,
        attributes: Attrs,
        resource: Option<Resource>,
    ) -> Self {
        let hash = compute_hash(&namespace, &directives, &attributes, resource.as_ref());
        Self {
            namespace,
            directives,
            attributes,
            resource,
            hash,
        }
    }

    pub fn hash_code(&self) -> i32 {
        self.hash
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }
}

fn compute_hash(
    namespace: &str,
    directives: &Directives,
    attributes: &Attrs,
    resource: Option<&Resource>,
) -> i32 {
    let mut result: i32 = 1;
    result = result.wrapping_mul(PRIME).wrapping_add(fold(attributes));
    result = result.wrapping_mul(PRIME).wrapping_add(fold(directives));
    result = result.wrapping_mul(PRIME).wrapping_add(fold(namespace));
    result
        .wrapping_mul(PRIME)
        .wrapping_add(resource.map_or(0, resource_hash))
}

fn resource_hash(resource: &Resource) -> i32 {
    match identity_key(resource) {
        Some(key) => fold(&key),
        None => fold(&resource.addr()),
    }
}

fn fold<T: Hash + ?Sized>(value: &T) -> i32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as i32
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.namespace == other.namespace
            && self.directives == other.directives
            && self.attributes == other.attributes
            && optional_identity_equals(self.resource.as_ref(), other.resource.as_ref())
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("namespace", &self.namespace)
            .field("directives", &self.directives)
            .field("attributes", &self.attributes)
            .field("resource", &self.resource)
            .field("hash", &self.hash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capres_core::model::{CapReqBuilder, ResourceBuilder};
    use capres_core::{attr, namespace};

    fn owner(id: &str, version: &str) -> Resource {
        let mut rb = ResourceBuilder::new();
        rb.add_capability(
            CapReqBuilder::new(namespace::IDENTITY)
                .attribute(namespace::IDENTITY, id)
                .attribute(attr::VERSION, version),
        );
        rb.add_requirement(CapReqBuilder::new(namespace::PACKAGE).filter("(osgi.wiring.package=p)"));
        rb.build().unwrap()
    }

    fn first_req(r: &Resource) -> Requirement {
        r.requirements(None).next().unwrap().clone()
    }

    #[test]
    fn identity_equal_owners_share_key() {
        let a = owner("a", "1.0");
        let b = owner("a", "1.0");
        let ka = CacheKey::new(&first_req(&a));
        let kb = CacheKey::new(&first_req(&b));
        assert_eq!(ka, kb);
        assert_eq!(ka.hash_code(), kb.hash_code());
    }

    #[test]
    fn different_versions_differ() {
        let a = owner("a", "1.0");
        let b = owner("a", "2.0");
        assert_ne!(CacheKey::new(&first_req(&a)), CacheKey::new(&first_req(&b)));
    }

    #[test]
    fn synthetic_requirement_has_no_resource() {
        let req = CapReqBuilder::new(namespace::PACKAGE)
            .filter("(osgi.wiring.package=p)")
            .build_requirement()
            .unwrap();
        let k1 = CacheKey::new(&req);
        let k2 = CacheKey::new(&req.clone());
        assert!(k1.resource().is_none());
        assert_eq!(k1, k2);

        let a = owner("a", "1.0");
        assert_ne!(k1, CacheKey::new(&first_req(&a)));
    }
}
