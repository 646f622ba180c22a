//! Post-processing of repository candidates.
//!
//! After the repository candidates for a requirement are assembled and
//! sorted, every registered `ResolverHook` may drop candidates, then every
//! `ResolutionCallback` may drop or reorder them. Hooks run in registration
//! order, then callbacks in registration order. Nothing runs when there are
//! no candidates.
//!
//! The surviving candidates are sorted again (stably) before they are
//! appended, so a callback's reordering only decides between candidates the
//! preference order considers equal.

use indexmap::IndexSet;

use capres_core::model::{Capability, Requirement};

/// Removal-only view of a candidate list.
///
/// Hooks may shrink the list but cannot add to it or reorder it.
pub struct Candidates<'a> {
    inner: &'a mut Vec<Capability>,
}

impl<'a> Candidates<'a> {
    pub fn new(inner: &'a mut Vec<Capability>) -> Self {
        Self { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.inner.iter()
    }

    /// Remove `cap`. Returns false if it was not a candidate.
    pub fn remove(&mut self, cap: &Capability) -> bool {
        match self.inner.iter().position(|c| c == cap) {
            Some(i) => {
                self.inner.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Capability) -> bool,
    {
        self.inner.retain(f);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Filters candidates for a requirement.
pub trait ResolverHook: Send + Sync {
    fn filter_matches(&self, requirement: &Requirement, candidates: &mut Candidates<'_>);
}

impl<F> ResolverHook for F
where
    F: Fn(&Requirement, &mut Candidates<'_>) + Send + Sync,
{
    fn filter_matches(&self, requirement: &Requirement, candidates: &mut Candidates<'_>) {
        self(requirement, candidates)
    }
}

/// Inspects and rearranges candidates for a requirement.
///
/// `wired` holds the capabilities already selected from the system, the
/// requirement's own resource and the mandatory resources.
pub trait ResolutionCallback: Send + Sync {
    fn process_candidates(
        &self,
        requirement: &Requirement,
        wired: &IndexSet<Capability>,
        candidates: &mut Vec<Capability>,
    );
}

impl<F> ResolutionCallback for F
where
    F: Fn(&Requirement, &IndexSet<Capability>, &mut Vec<Capability>) + Send + Sync,
{
    fn process_candidates(
        &self,
        requirement: &Requirement,
        wired: &IndexSet<Capability>,
        candidates: &mut Vec<Capability>,
    ) {
        self(requirement, wired, candidates)
    }
}

/// Run hooks, then callbacks, over `candidates`.
pub fn post_process(
    hooks: &[std::sync::Arc<dyn ResolverHook>],
    callbacks: &[std::sync::Arc<dyn ResolutionCallback>],
    requirement: &Requirement,
    wired: &IndexSet<Capability>,
    candidates: &mut Vec<Capability>,
) {
    if candidates.is_empty() {
        return;
    }

    for hook in hooks {
        hook.filter_matches(requirement, &mut Candidates::new(candidates));
    }

    for callback in callbacks {
        callback.process_candidates(requirement, wired, candidates);
    }
}
