//! capres-core
//!
//! Core primitives for capres:
//! - Resources, capabilities and requirements with typed attributes
//! - Versions and version ranges
//! - LDAP-style filter parsing and evaluation
//! - Header parameter and manifest parsing
//! - Ordering helpers for preference cascades
//! - Resolve context configuration

pub mod config;
pub mod determinism;
pub mod errors;
pub mod filter;
pub mod header;
pub mod manifest;
pub mod model;
pub mod version;

pub use crate::errors::{CapresError, CapresResult};

/// Well-known namespaces.
pub mod namespace {
    pub const IDENTITY: &str = "osgi.identity";
    pub const CONTENT: &str = "osgi.content";
    pub const BUNDLE: &str = "osgi.wiring.bundle";
    pub const HOST: &str = "osgi.wiring.host";
    pub const PACKAGE: &str = "osgi.wiring.package";
    pub const EE: &str = "osgi.ee";
}

/// Well-known attribute names.
pub mod attr {
    pub const VERSION: &str = "version";
    pub const BUNDLE_VERSION: &str = "bundle-version";
    pub const BUNDLE_SYMBOLIC_NAME: &str = "bundle-symbolic-name";
    pub const IDENTITY_TYPE: &str = "type";
}

/// Well-known directive names.
pub mod directive {
    pub const FILTER: &str = "filter";
    pub const EFFECTIVE: &str = "effective";
    pub const RESOLUTION: &str = "resolution";
}

/// Reserved directive and attribute values.
/// These must remain stable across versions.
pub mod values {
    pub const EFFECTIVE_RESOLVE: &str = "resolve";
    pub const EFFECTIVE_ACTIVE: &str = "active";
    pub const RESOLUTION_OPTIONAL: &str = "optional";
    pub const TYPE_BUNDLE: &str = "osgi.bundle";
    pub const TYPE_FRAGMENT: &str = "osgi.fragment";
    /// Alias under which the framework is always reachable.
    pub const SYSTEM_BUNDLE_SYMBOLIC_NAME: &str = "system.bundle";
    /// Exporting this package marks a framework implementation.
    pub const FRAMEWORK_PACKAGE: &str = "org.osgi.framework";
    pub const EE_IDENTITY_PREFIX: &str = "ee.";
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::config::{validate_config, PermitPolicy, ResolveConfig};
    pub use crate::filter::Filter;
    pub use crate::header::{Clause, Parameters};
    pub use crate::manifest::Manifest;
    pub use crate::model::{
        AttrValue, Attrs, CapReqBuilder, Capability, Directives, Requirement, Resource,
        ResourceBuilder,
    };
    pub use crate::version::{Version, VersionRange};
    pub use crate::{attr, directive, namespace, values};
    pub use crate::{CapresError, CapresResult};
}
