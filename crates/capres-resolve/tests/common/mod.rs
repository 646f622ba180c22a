//! Shared fixtures for capres-resolve integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use capres_core::model::{CapReqBuilder, Capability, Requirement, Resource, ResourceBuilder};
use capres_core::version::Version;
use capres_core::{attr, namespace};
use capres_resolve::{RepositoryResolveContext, ResourcesRepository};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its warnings and errors.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.contents())
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// A bundle with an identity and exported packages (`name` or `name@version`).
pub fn bundle(identity: &str, version: &str, exports: &[&str]) -> Resource {
    let mut rb = ResourceBuilder::new();
    rb.add_capability(identity_cap(identity, version));
    for export in exports {
        rb.add_capability(package_cap(export));
    }
    rb.build().unwrap()
}

pub fn identity_cap(identity: &str, version: &str) -> CapReqBuilder {
    CapReqBuilder::new(namespace::IDENTITY)
        .attribute(namespace::IDENTITY, identity)
        .attribute(attr::VERSION, Version::parse(version).unwrap())
}

pub fn package_cap(export: &str) -> CapReqBuilder {
    let (name, version) = export.split_once('@').unwrap_or((export, "0.0.0"));
    CapReqBuilder::new(namespace::PACKAGE)
        .attribute(namespace::PACKAGE, name)
        .attribute(attr::VERSION, Version::parse(version).unwrap())
}

pub fn package_req(name: &str) -> Requirement {
    package_req_builder(name).build_requirement().unwrap()
}

pub fn package_req_builder(name: &str) -> CapReqBuilder {
    CapReqBuilder::new(namespace::PACKAGE).filter(format!("(osgi.wiring.package={name})"))
}

pub fn repo(name: &str, resources: Vec<Resource>) -> Arc<ResourcesRepository> {
    Arc::new(ResourcesRepository::new(name, resources))
}

/// A context with `system` as system resource and one repository per resource list.
pub fn context(system: Resource, repos: Vec<Vec<Resource>>) -> RepositoryResolveContext {
    let mut ctx = RepositoryResolveContext::new();
    ctx.set_system_resource(system);
    for (i, resources) in repos.into_iter().enumerate() {
        ctx.add_repository(repo(&format!("repo{i}"), resources));
    }
    ctx
}

pub fn empty_system() -> Resource {
    bundle("system", "1.0.0", &[])
}

pub fn owners(caps: &[Capability]) -> Vec<Resource> {
    caps.iter().map(|c| c.resource().unwrap()).collect()
}
