//! Composition of the system resource.
//!
//! The system resource stands for everything present before resolution: the
//! framework and the run-path. It is assembled in a `ResourceBuilder` and
//! handed to the context with `set_system_resource`.
//!
//! Run-path entries are header clauses `bsn;version=...`:
//! - `latest`, `snapshot`, no version, or a bracketed range select the
//!   highest matching resource from the repositories
//! - `file` treats the key as a path to a `.mf` manifest or a JAR
//! - anything else is reported and skipped

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, error};

use capres_core::header::Parameters;
use capres_core::manifest::{Manifest, JAR_MANIFEST_PATH};
use capres_core::model::{AttrValue, CapReqBuilder, Requirement, Resource, ResourceBuilder};
use capres_core::version::VersionRange;
use capres_core::{namespace, values, CapresError, CapresResult};

use crate::context::RepositoryResolveContext;
use crate::identity::{resource_identity, resource_version};
use crate::repository::Repository;

/// Namespaces never copied from a run-path resource into the system resource.
pub const IGNORED_NAMESPACES_FOR_SYSTEM_RESOURCES: [&str; 4] = [
    namespace::IDENTITY,
    namespace::CONTENT,
    namespace::BUNDLE,
    namespace::HOST,
];

/// Copy run-path resource capabilities into the system resource.
pub fn add_system_resource(system: &mut ResourceBuilder, resource: &Resource) {
    system.copy_capabilities(&IGNORED_NAMESPACES_FOR_SYSTEM_RESOURCES, resource);
}

/// Read the manifest of a `.mf` file or a JAR. `Ok(None)` when a JAR has none.
pub fn read_manifest(path: &Path) -> CapresResult<Option<Manifest>> {
    let is_mf = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("mf"));
    if is_mf {
        let bytes = std::fs::read(path)?;
        return Manifest::parse(&bytes).map(Some);
    }

    let file = File::open(path)?;
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(a) => a,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "not a readable archive");
            return Ok(None);
        }
    };
    let mut entry = match archive.by_name(JAR_MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(CapresError::manifest(format!(
                "cannot read {JAR_MANIFEST_PATH} from {}: {e}",
                path.display()
            )))
        }
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Manifest::parse(&bytes).map(Some)
}

/// Resources from `repos` providing `requirement`, without blacklisted ones.
fn resources_for(
    ctx: &RepositoryResolveContext,
    repos: &[Arc<dyn Repository>],
    requirement: &Requirement,
) -> Vec<Resource> {
    let mut resources: IndexSet<Resource> = IndexSet::new();
    for repo in repos {
        resources.extend(
            ctx.find_providers_in(repo.as_ref(), requirement)
                .iter()
                .filter_map(|c| c.resource()),
        );
    }
    resources.into_iter().collect()
}

impl RepositoryResolveContext {
    /// Add the framework to the system resource.
    ///
    /// Every framework capability is copied. Bundle and host capabilities
    /// also answer to the `system.bundle` alias.
    pub fn set_framework(&mut self, system: &mut ResourceBuilder, framework: Resource) -> CapresResult<()> {
        for cap in framework.capabilities(None) {
            let mut builder = CapReqBuilder::from_capability(cap);
            let ns = cap.namespace();
            if ns == namespace::BUNDLE || ns == namespace::HOST {
                let mut names = cap
                    .attribute(ns)
                    .ok_or_else(|| CapresError::conversion(format!("framework {ns} capability has no name")))?
                    .to_string_list()?;
                if !names.iter().any(|n| n == values::SYSTEM_BUNDLE_SYMBOLIC_NAME) {
                    names.push(values::SYSTEM_BUNDLE_SYMBOLIC_NAME.to_string());
                    builder.set_attribute(ns, AttrValue::from(names));
                }
            }
            system.add_capability(builder);
        }
        self.framework = Some(framework);
        Ok(())
    }

    pub fn get_resources_for(&self, repos: &[Arc<dyn Repository>], requirement: &Requirement) -> Vec<Resource> {
        resources_for(self, repos, requirement)
    }

    pub fn get_resources(
        &self,
        repos: &[Arc<dyn Repository>],
        bsn: &str,
        range: Option<&str>,
    ) -> CapresResult<Vec<Resource>> {
        let requirement = Self::create_bundle_requirement(bsn, range)?;
        Ok(resources_for(self, repos, &requirement))
    }

    /// Highest version of `bsn` within `range` across all repositories.
    pub fn get_highest_resource(&self, bsn: &str, range: Option<&str>) -> CapresResult<Option<Resource>> {
        let resources = self.get_resources(&self.repositories, bsn, range)?;
        Ok(resources.into_iter().max_by(|a, b| {
            resource_identity(a)
                .cmp(&resource_identity(b))
                .then_with(|| resource_version(a).cmp(&resource_version(b)))
        }))
    }

    /// Add every resource named by `path` to the system resource.
    ///
    /// `label` names the path in diagnostics (e.g. `-runpath`).
    pub fn load_path(&self, system: &mut ResourceBuilder, path: &str, label: &str) -> CapresResult<()> {
        let params = Parameters::parse(path)?;

        for clause in params.iter() {
            let bsn = Parameters::remove_duplicate_marker(&clause.key);
            let version = match clause.version() {
                Some("latest") | Some("snapshot") | None => None,
                Some(v) => Some(v),
            };

            let resource = match version {
                Some("file") => {
                    let file = Path::new(bsn);
                    if !file.is_file() {
                        error!(label, bsn, "found file resource but file does not exist");
                        continue;
                    }
                    match read_manifest(file)? {
                        Some(manifest) => {
                            let mut rb = ResourceBuilder::new();
                            rb.add_manifest(&manifest)?;
                            rb.build()?
                        }
                        None => continue,
                    }
                }
                None => match self.get_highest_resource(bsn, None)? {
                    Some(r) => r,
                    None => {
                        error!(label, bsn, "could not find resource");
                        continue;
                    }
                },
                Some(range) if VersionRange::is_version_range(range) => {
                    match self.get_highest_resource(bsn, Some(range))? {
                        Some(r) => r,
                        None => {
                            error!(label, bsn, range, "could not find resource");
                            continue;
                        }
                    }
                }
                Some(other) => {
                    error!(label, bsn, version = other, "cannot find resource");
                    continue;
                }
            };

            debug!(label, resource = %resource, "adding to system resource");
            add_system_resource(system, &resource);
        }

        Ok(())
    }
}
