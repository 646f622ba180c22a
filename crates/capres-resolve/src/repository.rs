//! Repository contract and an in-memory repository.

use indexmap::IndexMap;

use capres_core::model::{Capability, Requirement, Resource};

use crate::capability_index::CapabilityIndex;

/// A source of candidate resources.
///
/// `find_providers` returns an entry for every requirement asked about,
/// possibly with an empty list.
///
/// Capabilities only hold weak references to their resources, so the
/// repository must own the resources it hands out for as long as the
/// context that queries it lives. A capability whose resource has already
/// been dropped is skipped by the context with a warning.
pub trait Repository: Send + Sync {
    /// Name shown in logs and reports.
    fn name(&self) -> &str;

    /// Candidate capabilities for each requirement, in repository order.
    fn find_providers(&self, requirements: &[Requirement]) -> IndexMap<Requirement, Vec<Capability>>;
}

/// Repository over a fixed list of resources.
#[derive(Debug, Clone, Default)]
pub struct ResourcesRepository {
    name: String,
    resources: Vec<Resource>,
    index: CapabilityIndex,
}

impl ResourcesRepository {
    /// Create a repository named `name` over `resources`.
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        let mut repo = Self {
            name: name.into(),
            resources: Vec::new(),
            index: CapabilityIndex::new(),
        };
        for r in resources {
            repo.add(r);
        }
        repo
    }

    /// Index and own another resource.
    pub fn add(&mut self, resource: Resource) {
        self.index.add_resource(&resource);
        self.resources.push(resource);
    }

    /// Resources in insertion order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

impl Repository for ResourcesRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_providers(&self, requirements: &[Requirement]) -> IndexMap<Requirement, Vec<Capability>> {
        requirements
            .iter()
            .map(|r| (r.clone(), self.index.matching_capabilities(r)))
            .collect()
    }
}
