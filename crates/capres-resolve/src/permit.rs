//! Repository candidate admission.
//!
//! A repository resource may become a candidate only if:
//! - it does not export the framework package (it is not a framework
//!   implementation or an API jar standing in for one)
//! - it has exactly one identity capability with a string identity
//! - its identity does not carry the execution-environment prefix
//!
//! Violations are logged and filtered; they never fail a lookup.

use tracing::{error, trace};

use capres_core::config::PermitPolicy;
use capres_core::model::Resource;
use capres_core::namespace;

#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    policy: PermitPolicy,
}

impl PermitFilter {
    pub fn new(policy: PermitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PermitPolicy {
        &self.policy
    }

    pub fn is_permitted(&self, resource: &Resource) -> bool {
        let exports_framework = resource.capabilities(Some(namespace::PACKAGE)).any(|c| {
            c.attribute(namespace::PACKAGE).and_then(|v| v.as_str())
                == Some(self.policy.framework_package.as_str())
        });
        if exports_framework {
            trace!(%resource, "framework exporter is not a candidate");
            return false;
        }

        let mut identities = resource.capabilities(Some(namespace::IDENTITY));
        let Some(identity_cap) = identities.next() else {
            error!(%resource, "resource is missing an identity capability (osgi.identity)");
            return false;
        };
        if identities.next().is_some() {
            error!(%resource, "resource has more than one identity capability (osgi.identity)");
            return false;
        }

        let Some(identity) = identity_cap
            .attribute(namespace::IDENTITY)
            .and_then(|v| v.as_str())
        else {
            error!(%resource, "resource identity capability has no string identity");
            return false;
        };

        if identity.starts_with(&self.policy.ee_identity_prefix) {
            trace!(identity, "execution environment bundle is not a candidate");
            return false;
        }

        true
    }
}
