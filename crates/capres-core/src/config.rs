//! Configuration structures for capres.
//!
//! This module defines explicit, serializable configuration objects used to
//! set up a resolve context: report verbosity, alternate `effective`
//! directive values, and the policy that keeps framework implementations and
//! execution-environment bundles out of the candidate set.
//!
//! The core crate itself does not read environment variables. All
//! configuration must be provided explicitly by the caller.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{CapresError, CapresResult};
use crate::values;

/// Resolve context configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveConfig {
    /// Debug report verbosity. 0 is silent.
    pub level: u8,

    /// Alternate `effective` directive values mapped to the namespaces they exclude.
    pub effective: BTreeMap<String, BTreeSet<String>>,

    pub permit: PermitPolicy,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            level: 0,
            effective: BTreeMap::new(),
            permit: PermitPolicy::default(),
        }
    }
}

/// Which repository resources may become candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PermitPolicy {
    /// Exporters of this package are framework implementations.
    pub framework_package: String,

    /// Identities with this prefix are execution-environment bundles.
    pub ee_identity_prefix: String,
}

impl Default for PermitPolicy {
    fn default() -> Self {
        Self {
            framework_package: values::FRAMEWORK_PACKAGE.to_string(),
            ee_identity_prefix: values::EE_IDENTITY_PREFIX.to_string(),
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &ResolveConfig) -> CapresResult<()> {
    if cfg.permit.framework_package.trim().is_empty() {
        return Err(CapresError::invalid_argument(
            "framework_package must not be empty",
        ));
    }

    for key in cfg.effective.keys() {
        if key.trim().is_empty() {
            return Err(CapresError::invalid_argument(
                "effective directive values must not be empty",
            ));
        }
        if key == values::EFFECTIVE_RESOLVE {
            return Err(CapresError::invalid_argument(
                "'resolve' is always effective and cannot be configured",
            ));
        }
    }

    Ok(())
}
