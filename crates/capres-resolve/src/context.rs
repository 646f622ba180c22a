//! Repository-backed resolve context.
//!
//! `RepositoryResolveContext` answers the engine's questions for one resolve
//! session. It is configured through `&mut self` setters and then queried
//! through `&self`; queries may come from the resolver thread while a
//! reporter inspects the context, so shared state sits behind locks.
//!
//! Provider lookup runs in two stages:
//! - stage 1: the system resource, the requirement's own resource and the
//!   mandatory (input) resource, sorted by preference
//! - stage 2: repository candidates that are not blacklisted, are permitted
//!   and are effective for the requirement, sorted by preference and
//!   post-processed by hooks and callbacks
//!
//! Stage 1 always precedes stage 2. Results are cached per `CacheKey`;
//! callers receive a copy of the cached list.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use capres_core::config::{validate_config, ResolveConfig};
use capres_core::model::{
    describe_capabilities, CapReqBuilder, Capability, Requirement, Resource, ResourceBuilder,
};
use capres_core::{directive, values, CapresError, CapresResult};

use crate::cache::CacheKey;
use crate::capability_index::CapabilityIndex;
use crate::comparator::CapabilityComparator;
use crate::engine::{ResolveContext, Wirings};
use crate::hooks::{post_process, ResolutionCallback, ResolverHook};
use crate::identity::resource_identity_equals;
use crate::permit::PermitFilter;
use crate::report::DebugReporter;
use crate::repository::{Repository, ResourcesRepository};

/// Resolve context backed by an ordered list of repositories.
pub struct RepositoryResolveContext {
    system_index: RwLock<CapabilityIndex>,
    pub(crate) repositories: Vec<Arc<dyn Repository>>,
    provider_cache: Mutex<HashMap<CacheKey, Vec<Capability>>>,
    resource_priorities: DashMap<Resource, usize>,
    optional_roots: Vec<Resource>,
    effective_set: BTreeMap<String, BTreeSet<String>>,
    resolver_hooks: Vec<Arc<dyn ResolverHook>>,
    callbacks: Vec<Arc<dyn ResolutionCallback>>,
    blacklisted_resources: RwLock<IndexSet<Resource>>,
    blacklisted_capabilities: Mutex<IndexSet<Capability>>,
    failed: Mutex<IndexSet<Requirement>>,
    input_resource: Option<Resource>,
    system_resource: Option<Resource>,
    pub(crate) framework: Option<Resource>,
    initialized: Mutex<bool>,
    reported: AtomicBool,
    level: u8,
    permit: PermitFilter,
}

impl Default for RepositoryResolveContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryResolveContext {
    /// Create an empty context with default configuration.
    pub fn new() -> Self {
        Self {
            system_index: RwLock::new(CapabilityIndex::new()),
            repositories: Vec::new(),
            provider_cache: Mutex::new(HashMap::new()),
            resource_priorities: DashMap::new(),
            optional_roots: Vec::new(),
            effective_set: BTreeMap::new(),
            resolver_hooks: Vec::new(),
            callbacks: Vec::new(),
            blacklisted_resources: RwLock::new(IndexSet::new()),
            blacklisted_capabilities: Mutex::new(IndexSet::new()),
            failed: Mutex::new(IndexSet::new()),
            input_resource: None,
            system_resource: None,
            framework: None,
            initialized: Mutex::new(false),
            reported: AtomicBool::new(false),
            level: 0,
            permit: PermitFilter::default(),
        }
    }

    /// Create a context configured from `cfg`.
    pub fn with_config(cfg: &ResolveConfig) -> CapresResult<Self> {
        let mut ctx = Self::new();
        ctx.apply_config(cfg)?;
        Ok(ctx)
    }

    /// Apply verbosity, effective directives and permit policy.
    pub fn apply_config(&mut self, cfg: &ResolveConfig) -> CapresResult<()> {
        validate_config(cfg)?;
        self.level = cfg.level;
        self.add_effective_set(cfg.effective.clone());
        self.permit = PermitFilter::new(cfg.permit.clone());
        Ok(())
    }

    /// Seed the system index from the system resource. Runs once.
    pub fn init(&self) -> CapresResult<()> {
        let mut initialized = self.initialized.lock();
        if *initialized {
            return Ok(());
        }

        let system = self
            .system_resource
            .as_ref()
            .ok_or_else(|| CapresError::init("no system resource has been set"))?;

        self.failed.lock().clear();
        self.system_index.write().add_resource(system);
        *initialized = true;
        debug!(system = %system, "resolve context initialized");
        Ok(())
    }

    /// Whether `init` has completed.
    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    fn init_and_report(&self) -> CapresResult<()> {
        self.init()?;
        if self.level > 0
            && self
                .reported
                .compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
                .is_ok()
        {
            let stdout = std::io::stdout();
            DebugReporter::new(stdout.lock(), self, self.level).report()?;
        }
        Ok(())
    }

    fn find_providers_cached(&self, requirement: &Requirement) -> Vec<Capability> {
        let key = CacheKey::new(requirement);
        if let Some(cached) = self.provider_cache.lock().get(&key) {
            trace!(%requirement, "provider cache hit");
            return cached.clone();
        }

        let computed = self.assemble_providers(requirement);
        let capabilities = self
            .provider_cache
            .lock()
            .entry(key)
            .or_insert(computed)
            .clone();
        debug!(
            %requirement,
            found = %describe_capabilities(&capabilities),
            "found providers"
        );
        capabilities
    }

    fn assemble_providers(&self, requirement: &Requirement) -> Vec<Capability> {
        let mut first_stage: IndexSet<Capability> = IndexSet::new();

        self.system_index
            .read()
            .append_matching_capabilities(requirement, &mut first_stage);

        if let Some(own) = requirement.resource() {
            append_resource_matches(requirement, &own, &mut first_stage);
        }
        for mandatory in self.mandatory() {
            append_resource_matches(requirement, &mandatory, &mut first_stage);
        }

        let mut result: Vec<Capability> = first_stage.iter().cloned().collect();
        self.sort_capabilities(&mut result);

        if !requirement.is_optional() || self.is_optional_root(requirement) {
            let mut second_stage = self.find_providers_from_repositories(requirement, &first_stage);
            second_stage.retain(|c| !result.contains(c));
            self.sort_capabilities(&mut second_stage);
            result.extend(second_stage);
        }

        result
    }

    fn find_providers_from_repositories(
        &self,
        requirement: &Requirement,
        wired: &IndexSet<Capability>,
    ) -> Vec<Capability> {
        let mut found: IndexSet<Capability> = IndexSet::new();

        for (order, repo) in self.repositories.iter().enumerate() {
            for capability in self.find_providers_in(repo.as_ref(), requirement) {
                let Some(resource) = capability.resource() else {
                    warn!(
                        %requirement,
                        capability = %capability,
                        repository = repo.name(),
                        "dropping candidate whose resource is no longer alive"
                    );
                    continue;
                };
                if !self.permit.is_permitted(&resource) || !capability_is_effective(requirement, &capability) {
                    continue;
                }
                if found.insert(capability) {
                    self.resource_priorities.entry(resource).or_insert(order);
                }
            }
        }

        let mut candidates: Vec<Capability> = found.into_iter().collect();
        self.sort_capabilities(&mut candidates);
        post_process(
            &self.resolver_hooks,
            &self.callbacks,
            requirement,
            wired,
            &mut candidates,
        );
        candidates
    }

    /// Candidates for `requirement` from one repository, minus blacklisted ones.
    ///
    /// Each dropped capability is recorded as a blacklisted capability.
    pub fn find_providers_in(&self, repo: &dyn Repository, requirement: &Requirement) -> Vec<Capability> {
        let mut providers = repo
            .find_providers(std::slice::from_ref(requirement))
            .swap_remove(requirement)
            .unwrap_or_default();
        providers.retain(|c| !self.is_blacklisted(c));
        providers
    }

    fn is_blacklisted(&self, capability: &Capability) -> bool {
        let Some(resource) = capability.resource() else {
            return false;
        };
        let contains = self.blacklisted_resources.read().contains(&resource);
        if contains {
            self.blacklisted_capabilities.lock().insert(capability.clone());
        }
        contains
    }

    fn is_optional_root(&self, requirement: &Requirement) -> bool {
        requirement
            .resource()
            .map_or(false, |r| self.optional_roots.iter().any(|root| root.ptr_eq(&r)))
    }

    fn mandatory(&self) -> Vec<Resource> {
        self.input_resource.iter().cloned().collect()
    }

    fn current_wirings(&self) -> Wirings {
        Wirings::new()
    }

    /// Preference order used for candidate lists.
    pub fn compare_capabilities(&self, a: &Capability, b: &Capability) -> Ordering {
        let wirings = self.current_wirings();
        let wired = |r: &Resource| wirings.contains_key(r);
        CapabilityComparator::new(self.system_resource.as_ref(), &wired).compare_caps(a, b)
    }

    fn sort_capabilities(&self, caps: &mut [Capability]) {
        let wirings = self.current_wirings();
        let wired = |r: &Resource| wirings.contains_key(r);
        CapabilityComparator::new(self.system_resource.as_ref(), &wired).sort(caps);
    }

    /// Blacklist every repository resource providing one of `reject`.
    ///
    /// Cached results computed before this call are not revisited.
    pub fn set_black_list(&self, reject: &[Requirement]) {
        if reject.is_empty() {
            return;
        }
        let mut blacklist = self.blacklisted_resources.write();
        for repo in &self.repositories {
            for caps in repo.find_providers(reject).into_values() {
                for cap in caps {
                    if let Some(resource) = cap.resource() {
                        debug!(%resource, repository = repo.name(), "blacklisted");
                        blacklist.insert(resource);
                    }
                }
            }
        }
    }

    /// Resources excluded from repository candidates.
    pub fn black_list(&self) -> Vec<Resource> {
        self.blacklisted_resources.read().iter().cloned().collect()
    }

    /// Capabilities dropped because their resource is blacklisted.
    pub fn blacklisted_capabilities(&self) -> Vec<Capability> {
        self.blacklisted_capabilities.lock().iter().cloned().collect()
    }

    /// Append a repository. Earlier repositories take priority.
    pub fn add_repository(&mut self, repo: Arc<dyn Repository>) {
        self.repositories.push(repo);
    }

    /// Set the resource standing for the running framework and run path.
    pub fn set_system_resource(&mut self, system: Resource) {
        self.system_resource = Some(system);
    }

    /// Set the resource whose requirements drive the resolve.
    pub fn set_input_resource(&mut self, input: Resource) {
        self.input_resource = Some(input);
    }

    /// Build the input resource from a set of requirements.
    pub fn set_input_requirements(&mut self, requirements: &[Requirement]) -> CapresResult<()> {
        let mut rb = ResourceBuilder::new();
        for r in requirements {
            rb.add_requirement(CapReqBuilder::from_requirement(r));
        }
        self.input_resource = Some(rb.build()?);
        Ok(())
    }

    /// Resources whose optional requirements may reach repositories.
    pub fn set_optional_roots(&mut self, roots: impl IntoIterator<Item = Resource>) {
        self.optional_roots.clear();
        self.optional_roots.extend(roots);
    }

    /// Register a hook that may remove repository candidates.
    pub fn add_resolver_hook(&mut self, hook: Arc<dyn ResolverHook>) {
        self.resolver_hooks.push(hook);
    }

    /// Register callbacks that may reorder repository candidates.
    pub fn add_callbacks(&mut self, callbacks: impl IntoIterator<Item = Arc<dyn ResolutionCallback>>) {
        self.callbacks.extend(callbacks);
    }

    /// Set the debug report verbosity (0 disables it).
    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    /// Treat `effective` as effective for every namespace.
    pub fn add_effective_directive(&mut self, effective: impl Into<String>) {
        self.effective_set.insert(effective.into(), BTreeSet::new());
    }

    /// Treat `effective` as effective except for `excluded` namespaces.
    pub fn add_effective_directive_excluding(
        &mut self,
        effective: impl Into<String>,
        excluded: impl IntoIterator<Item = String>,
    ) {
        self.effective_set
            .insert(effective.into(), excluded.into_iter().collect());
    }

    /// Merge a map of effective values to excluded namespaces.
    pub fn add_effective_set(&mut self, set: BTreeMap<String, BTreeSet<String>>) {
        self.effective_set.extend(set);
    }

    /// Registered repositories in priority order.
    pub fn repositories(&self) -> &[Arc<dyn Repository>] {
        &self.repositories
    }

    /// Requirements that produced no candidates since `init`.
    pub fn failed(&self) -> Vec<Requirement> {
        self.failed.lock().iter().cloned().collect()
    }

    /// Registered resolution callbacks.
    pub fn callbacks(&self) -> &[Arc<dyn ResolutionCallback>] {
        &self.callbacks
    }

    /// Registered resolver hooks.
    pub fn resolver_hooks(&self) -> &[Arc<dyn ResolverHook>] {
        &self.resolver_hooks
    }

    /// Effective values and their excluded namespaces.
    pub fn effective_set(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.effective_set
    }

    /// Resources whose optional requirements may reach repositories.
    pub fn optional_roots(&self) -> &[Resource] {
        &self.optional_roots
    }

    /// Debug report verbosity.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Framework resource set through `set_framework`.
    pub fn framework(&self) -> Option<&Resource> {
        self.framework.as_ref()
    }

    /// The input resource, if any.
    pub fn input_resource(&self) -> Option<&Resource> {
        self.input_resource.as_ref()
    }

    /// The system resource, if any.
    pub fn system_resource(&self) -> Option<&Resource> {
        self.system_resource.as_ref()
    }

    /// Whether `resource` is identity-equal to the input resource.
    pub fn is_input_resource(&self, resource: &Resource) -> bool {
        self.input_resource
            .as_ref()
            .map_or(false, |r| resource_identity_equals(resource, r))
    }

    /// Whether `resource` is identity-equal to the system resource.
    pub fn is_system_resource(&self, resource: &Resource) -> bool {
        self.system_resource
            .as_ref()
            .map_or(false, |r| resource_identity_equals(resource, r))
    }

    /// Repository index that first provided a candidate from `resource`.
    pub fn resource_priority(&self, resource: &Resource) -> Option<usize> {
        self.resource_priorities.get(resource).map(|p| *p)
    }

    /// Capabilities currently in the system index.
    pub fn system_capabilities(&self) -> Vec<Capability> {
        self.system_index.read().iter().cloned().collect()
    }

    /// Synthetic identity requirement on `bsn` within `range`.
    pub fn create_bundle_requirement(bsn: &str, range: Option<&str>) -> CapresResult<Requirement> {
        CapReqBuilder::bundle_requirement(bsn, range)?.build_requirement()
    }

    /// Alias of `create_bundle_requirement`.
    pub fn create_identity_requirement(identity: &str, range: Option<&str>) -> CapresResult<Requirement> {
        Self::create_bundle_requirement(identity, range)
    }

    /// Synthetic package capability with an optional version.
    pub fn create_package_capability(name: &str, version: Option<&str>) -> CapresResult<Capability> {
        Ok(CapReqBuilder::package_capability(name, version)?.build_capability())
    }

    /// In-memory repository over `resources`.
    pub fn create_repository(resources: Vec<Resource>) -> Arc<dyn Repository> {
        Arc::new(ResourcesRepository::new("resources", resources))
    }
}

impl ResolveContext for RepositoryResolveContext {
    fn find_providers(&self, requirement: &Requirement) -> CapresResult<Vec<Capability>> {
        self.init_and_report()?;
        let result = self.find_providers_cached(requirement);
        if result.is_empty() {
            self.failed.lock().insert(requirement.clone());
        }
        Ok(result)
    }

    fn mandatory_resources(&self) -> CapresResult<Vec<Resource>> {
        self.init_and_report()?;
        Ok(self.mandatory())
    }

    fn wirings(&self) -> CapresResult<Wirings> {
        self.init_and_report()?;
        Ok(self.current_wirings())
    }

    fn is_effective(&self, requirement: &Requirement) -> CapresResult<bool> {
        self.init_and_report()?;
        let effective = match requirement.directive(directive::EFFECTIVE) {
            None => return Ok(true),
            Some(e) if e == values::EFFECTIVE_RESOLVE => return Ok(true),
            Some(e) => e,
        };
        Ok(self
            .effective_set
            .get(effective)
            .map_or(false, |excluded| !excluded.contains(requirement.namespace())))
    }

    fn insert_hosted_capability(
        &self,
        capabilities: &mut Vec<Capability>,
        hosted: Capability,
    ) -> CapresResult<usize> {
        self.init_and_report()?;
        let priority_of = |cap: &Capability| cap.resource().and_then(|r| self.resource_priority(&r));

        let priority = priority_of(&hosted).unwrap_or(usize::MAX);
        let index = capabilities
            .iter()
            .position(|c| priority_of(c).unwrap_or(0) > priority)
            .unwrap_or(capabilities.len());
        capabilities.insert(index, hosted);
        Ok(index)
    }
}

fn append_resource_matches(requirement: &Requirement, resource: &Resource, out: &mut IndexSet<Capability>) {
    out.extend(
        resource
            .capabilities(Some(requirement.namespace()))
            .filter(|c| requirement.matches(c))
            .cloned(),
    );
}

/// A capability is effective for a requirement when it is effective at
/// resolve time, or when both declare the same `effective` value.
pub fn capability_is_effective(requirement: &Requirement, capability: &Capability) -> bool {
    match capability.directive(directive::EFFECTIVE) {
        None => true,
        Some(e) if e == values::EFFECTIVE_RESOLVE => true,
        Some(e) => requirement.directive(directive::EFFECTIVE) == Some(e),
    }
}
