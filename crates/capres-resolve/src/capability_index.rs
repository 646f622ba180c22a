//! Namespace-bucketed capability index.
//!
//! Capabilities are kept per namespace in insertion order. Matching walks the
//! requirement's bucket and evaluates its filter against each capability.

use indexmap::{IndexMap, IndexSet};

use capres_core::model::{Capability, Requirement, Resource};

#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    buckets: IndexMap<String, Vec<Capability>>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every capability of `resource`.
    pub fn add_resource(&mut self, resource: &Resource) {
        for cap in resource.capabilities(None) {
            self.add_capability(cap.clone());
        }
    }

    pub fn add_capability(&mut self, cap: Capability) {
        self.buckets
            .entry(cap.namespace().to_string())
            .or_default()
            .push(cap);
    }

    /// Append matches for `requirement` to `out`, keeping insertion order.
    pub fn append_matching_capabilities(
        &self,
        requirement: &Requirement,
        out: &mut IndexSet<Capability>,
    ) {
        if let Some(bucket) = self.buckets.get(requirement.namespace()) {
            out.extend(bucket.iter().filter(|c| requirement.matches(c)).cloned());
        }
    }

    pub fn matching_capabilities(&self, requirement: &Requirement) -> Vec<Capability> {
        let mut out = IndexSet::new();
        self.append_matching_capabilities(requirement, &mut out);
        out.into_iter().collect()
    }

    /// Total number of indexed capabilities.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.buckets.values().flatten()
    }
}
