//! Resource identity helpers.
//!
//! A resource's identity is the `osgi.identity` attribute of its first
//! identity capability, together with that capability's `version`.
//! Identity-equality compares these pairs; resources without an identity are
//! only identity-equal to the very same handle.

use capres_core::model::{Capability, Resource};
use capres_core::version::Version;
use capres_core::{attr, namespace};

/// First `osgi.identity` capability of the resource.
pub fn identity_capability(resource: &Resource) -> Option<&Capability> {
    resource.capabilities(Some(namespace::IDENTITY)).next()
}

/// String value of the identity attribute.
pub fn resource_identity(resource: &Resource) -> Option<&str> {
    identity_capability(resource)?
        .attribute(namespace::IDENTITY)?
        .as_str()
}

/// Version of the identity capability.
///
/// `None` when there is no identity capability; the empty version when the
/// capability carries no usable `version` attribute.
pub fn resource_version(resource: &Resource) -> Option<Version> {
    let cap = identity_capability(resource)?;
    Some(capability_version(cap, attr::VERSION))
}

/// Version-valued attribute of a capability, empty when absent or unparsable.
pub fn capability_version(cap: &Capability, attr_name: &str) -> Version {
    cap.attribute(attr_name)
        .and_then(|v| v.as_version())
        .unwrap_or_default()
}

/// (identity, version) of a resource, if it has a string identity.
pub fn identity_key(resource: &Resource) -> Option<(&str, Version)> {
    let id = resource_identity(resource)?;
    Some((id, resource_version(resource).unwrap_or_default()))
}

pub fn resource_identity_equals(a: &Resource, b: &Resource) -> bool {
    match (identity_key(a), identity_key(b)) {
        (Some(ka), Some(kb)) => ka == kb,
        (None, None) => a.ptr_eq(b),
        _ => false,
    }
}

/// Identity-equality over optional resources. Two absent resources are equal.
pub fn optional_identity_equals(a: Option<&Resource>, b: Option<&Resource>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => resource_identity_equals(a, b),
        (None, None) => true,
        _ => false,
    }
}
