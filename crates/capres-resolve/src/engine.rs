//! The contract a resolver engine drives.
//!
//! The engine owns the search; the context answers questions about
//! candidates. Every call may trigger lazy initialization, so every call can
//! fail with a fatal initialization error.

use indexmap::IndexMap;

use capres_core::model::{Capability, Requirement, Resource};
use capres_core::CapresResult;

/// Capabilities already wired per resource.
pub type Wirings = IndexMap<Resource, Vec<Capability>>;

pub trait ResolveContext {
    /// Candidates for `requirement`, most preferred first.
    fn find_providers(&self, requirement: &Requirement) -> CapresResult<Vec<Capability>>;

    /// Resources that must be part of any resolution.
    fn mandatory_resources(&self) -> CapresResult<Vec<Resource>>;

    /// Resources that may be resolved if possible.
    fn optional_resources(&self) -> CapresResult<Vec<Resource>> {
        Ok(Vec::new())
    }

    fn wirings(&self) -> CapresResult<Wirings>;

    fn is_effective(&self, requirement: &Requirement) -> CapresResult<bool>;

    /// Insert `hosted` into `capabilities` according to repository priority.
    /// Returns the index it was inserted at.
    fn insert_hosted_capability(
        &self,
        capabilities: &mut Vec<Capability>,
        hosted: Capability,
    ) -> CapresResult<usize>;
}
