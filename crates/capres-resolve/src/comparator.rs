//! Capability preference order.
//!
//! Smaller sorts first and is more preferred. The cascade:
//! - present capabilities before absent ones
//! - capabilities with a resource before synthetic ones
//! - capabilities of the system resource first
//! - capabilities of already wired resources first
//! - then by capability content: higher version first, identity ascending,
//!   higher resource version first, namespace value ascending
//!
//! The order is total and deterministic for a fixed set of resources, so a
//! stable sort gives reproducible candidate lists.

use std::cmp::Ordering;

use capres_core::determinism::{compare_present, prefer_true, Step};
use capres_core::model::{Capability, Resource};
use capres_core::{attr, namespace};

use crate::identity::{capability_version, resource_identity, resource_identity_equals, resource_version};

/// Comparator bound to the state it needs from the resolve context.
pub struct CapabilityComparator<'a> {
    system: Option<&'a Resource>,
    wired: &'a dyn Fn(&Resource) -> bool,
}

impl<'a> CapabilityComparator<'a> {
    pub fn new(system: Option<&'a Resource>, wired: &'a dyn Fn(&Resource) -> bool) -> Self {
        Self { system, wired }
    }

    fn is_system(&self, r: &Resource) -> bool {
        self.system.map_or(false, |s| resource_identity_equals(r, s))
    }

    pub fn compare(&self, a: Option<&Capability>, b: Option<&Capability>) -> Ordering {
        if let Step::Final(o) = compare_present(a, b) {
            return o;
        }
        let (Some(a), Some(b)) = (a, b) else {
            return Ordering::Equal;
        };

        let (ra, rb) = (a.resource(), b.resource());
        if let Step::Final(o) = compare_present(ra.as_ref(), rb.as_ref()) {
            return o;
        }
        let (Some(ra), Some(rb)) = (ra, rb) else {
            return Ordering::Equal;
        };

        if let Step::Final(o) = prefer_true(self.is_system(&ra), self.is_system(&rb)) {
            return o;
        }
        if let Step::Final(o) = prefer_true((self.wired)(&ra), (self.wired)(&rb)) {
            return o;
        }

        compare_content(a, &ra, b, &rb)
    }

    pub fn compare_caps(&self, a: &Capability, b: &Capability) -> Ordering {
        self.compare(Some(a), Some(b))
    }

    /// Stable sort, most preferred first.
    pub fn sort(&self, caps: &mut [Capability]) {
        capres_core::determinism::stable_sort_by(caps, |a, b| self.compare_caps(a, b));
    }
}

fn version_attribute(ns: &str) -> &'static str {
    match ns {
        namespace::BUNDLE | namespace::HOST => attr::BUNDLE_VERSION,
        _ => attr::VERSION,
    }
}

fn compare_content(a: &Capability, ra: &Resource, b: &Capability, rb: &Resource) -> Ordering {
    let va = capability_version(a, version_attribute(a.namespace()));
    let vb = capability_version(b, version_attribute(b.namespace()));

    vb.cmp(&va)
        .then_with(|| resource_identity(ra).cmp(&resource_identity(rb)))
        .then_with(|| resource_version(rb).cmp(&resource_version(ra)))
        .then_with(|| {
            let na = a.attribute(a.namespace()).map(ToString::to_string);
            let nb = b.attribute(b.namespace()).map(ToString::to_string);
            na.cmp(&nb)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capres_core::model::{CapReqBuilder, ResourceBuilder};
    use capres_core::version::Version;

    fn exporter(id: &str, version: &str, pkg_version: &str) -> Resource {
        let mut rb = ResourceBuilder::new();
        rb.add_capability(
            CapReqBuilder::new(namespace::IDENTITY)
                .attribute(namespace::IDENTITY, id)
                .attribute(attr::VERSION, Version::parse(version).unwrap()),
        );
        rb.add_capability(
            CapReqBuilder::new(namespace::PACKAGE)
                .attribute(namespace::PACKAGE, "p")
                .attribute(attr::VERSION, Version::parse(pkg_version).unwrap()),
        );
        rb.build().unwrap()
    }

    fn pkg(r: &Resource) -> Capability {
        r.capabilities(Some(namespace::PACKAGE)).next().unwrap().clone()
    }

    fn never(_: &Resource) -> bool {
        false
    }

    #[test]
    fn higher_package_version_first() {
        let old = exporter("a", "1.0", "1.0");
        let new = exporter("b", "1.0", "2.0");
        let cmp = CapabilityComparator::new(None, &never);
        let mut caps = vec![pkg(&old), pkg(&new)];
        cmp.sort(&mut caps);
        assert_eq!(caps[0], pkg(&new));
    }

    #[test]
    fn system_resource_first() {
        let system = exporter("sys", "1.0", "1.0");
        let other = exporter("b", "1.0", "9.0");
        let cmp = CapabilityComparator::new(Some(&system), &never);
        let mut caps = vec![pkg(&other), pkg(&system)];
        cmp.sort(&mut caps);
        assert_eq!(caps[0], pkg(&system));
    }

    #[test]
    fn wired_resource_before_unwired() {
        let a = exporter("a", "1.0", "1.0");
        let b = exporter("b", "1.0", "2.0");
        let a_handle = a.clone();
        let wired = move |r: &Resource| r.ptr_eq(&a_handle);
        let cmp = CapabilityComparator::new(None, &wired);
        assert_eq!(cmp.compare_caps(&pkg(&a), &pkg(&b)), Ordering::Less);
        assert_eq!(cmp.compare_caps(&pkg(&b), &pkg(&b)), Ordering::Equal);
        assert_eq!(cmp.compare(None, Some(&pkg(&b))), Ordering::Greater);
    }

    #[test]
    fn synthetic_capability_sorts_last() {
        let a = exporter("a", "1.0", "1.0");
        let synthetic = CapReqBuilder::new(namespace::PACKAGE)
            .attribute(namespace::PACKAGE, "p")
            .attribute(attr::VERSION, Version::new(5, 0, 0))
            .build_capability();
        let cmp = CapabilityComparator::new(None, &never);
        assert_eq!(cmp.compare_caps(&synthetic, &pkg(&a)), Ordering::Greater);
    }

    #[test]
    fn identity_then_resource_version_break_ties() {
        let a1 = exporter("a", "1.0", "1.0");
        let a2 = exporter("a", "2.0", "1.0");
        let b1 = exporter("b", "1.0", "1.0");
        let cmp = CapabilityComparator::new(None, &never);
        let mut caps = vec![pkg(&b1), pkg(&a1), pkg(&a2)];
        cmp.sort(&mut caps);
        assert_eq!(caps, vec![pkg(&a2), pkg(&a1), pkg(&b1)]);
    }
}
