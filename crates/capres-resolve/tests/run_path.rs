//! run_path.rs
//!
//! System resource composition from run-path specifications, JSON repository
//! indexes and file-based configuration.

mod common;

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use assert_matches::assert_matches;
use tempfile::TempDir;

use capres_core::config::ResolveConfig;
use capres_core::model::{CapReqBuilder, ResourceBuilder};
use capres_core::{directive, namespace, values, CapresError};
use capres_resolve::identity::{resource_identity, resource_version};
use capres_resolve::index::load_index;
use capres_resolve::system::read_manifest;
use capres_resolve::{RepositoryResolveContext, ResolveContext};

use common::*;

const RUNTIME_MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Bundle-SymbolicName: org.example.runtime\r\n\
Bundle-Version: 3.1.0\r\n\
Export-Package: org.example.runtime;version=\"3.1\"\r\n\
\r\n";

fn write_jar(dir: &TempDir, name: &str, manifest: Option<&str>) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = zip::write::FileOptions::default();
    if let Some(m) = manifest {
        zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
        zip.write_all(m.as_bytes()).unwrap();
    }
    zip.start_file("org/example/runtime/Main.class", options).unwrap();
    zip.write_all(&[0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
    zip.finish().unwrap();
    path
}

fn system_packages(system: &ResourceBuilder) -> Vec<String> {
    system
        .capabilities()
        .iter()
        .filter(|c| c.namespace() == namespace::PACKAGE)
        .map(|c| c.attributes()[namespace::PACKAGE].to_string())
        .collect()
}

#[test]
fn latest_and_range_pick_highest_matching() {
    init_tracing();
    let mut ctx = RepositoryResolveContext::new();
    ctx.add_repository(repo(
        "r",
        vec![
            bundle("lib", "1.0.0", &["lib.v1"]),
            bundle("lib", "2.5.0", &["lib.v2"]),
            bundle("other", "1.0.0", &["other"]),
        ],
    ));

    let mut system = ResourceBuilder::new();
    ctx.load_path(&mut system, "lib;version=latest", "-runpath").unwrap();
    assert_eq!(system_packages(&system), vec!["lib.v2"]);

    let mut system = ResourceBuilder::new();
    ctx.load_path(&mut system, "lib;version=\"[1,2)\",other", "-runpath").unwrap();
    assert_eq!(system_packages(&system), vec!["lib.v1", "other"]);
}

#[test]
fn unusable_clauses_are_skipped() {
    let mut ctx = RepositoryResolveContext::new();
    ctx.add_repository(repo("r", vec![bundle("lib", "1.0.0", &["lib"])]));

    let mut system = ResourceBuilder::new();
    ctx.load_path(
        &mut system,
        "missing;version=latest,lib;version=1.0.0,/no/such/file.jar;version=file,lib;version=snapshot",
        "-runpath",
    )
    .unwrap();
    assert_eq!(system_packages(&system), vec!["lib"]);
}

#[test]
fn identity_and_wiring_namespaces_stay_out_of_system() {
    let mut ctx = RepositoryResolveContext::new();
    let mut rb = ResourceBuilder::new();
    rb.add_capability(identity_cap("lib", "1.0.0"));
    rb.add_capability(CapReqBuilder::new(namespace::BUNDLE).attribute(namespace::BUNDLE, "lib"));
    rb.add_capability(CapReqBuilder::new(namespace::HOST).attribute(namespace::HOST, "lib"));
    rb.add_capability(CapReqBuilder::new(namespace::CONTENT).attribute(namespace::CONTENT, "abc"));
    rb.add_capability(CapReqBuilder::new("osgi.service").attribute("objectClass", "x.Y"));
    ctx.add_repository(repo("r", vec![rb.build().unwrap()]));

    let mut system = ResourceBuilder::new();
    ctx.load_path(&mut system, "lib", "-runpath").unwrap();
    let namespaces: Vec<&str> = system.capabilities().iter().map(|c| c.namespace()).collect();
    assert_eq!(namespaces, vec!["osgi.service"]);
}

#[test]
fn file_entries_read_manifests_and_jars() {
    let dir = TempDir::new().unwrap();
    let mf = dir.path().join("runtime.mf");
    std::fs::write(&mf, RUNTIME_MANIFEST).unwrap();
    let jar = write_jar(&dir, "runtime.jar", Some(RUNTIME_MANIFEST));
    let plain = write_jar(&dir, "plain.jar", None);

    let ctx = RepositoryResolveContext::new();
    for path in [&mf, &jar] {
        let mut system = ResourceBuilder::new();
        ctx.load_path(&mut system, &format!("{};version=file", path.display()), "-runpath")
            .unwrap();
        assert_eq!(system_packages(&system), vec!["org.example.runtime"]);
    }

    let mut system = ResourceBuilder::new();
    ctx.load_path(&mut system, &format!("{};version=file", plain.display()), "-runpath")
        .unwrap();
    assert!(system.capabilities().is_empty());
    assert!(read_manifest(&plain).unwrap().is_none());
}

#[test]
fn broken_manifest_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mf = dir.path().join("broken.mf");
    std::fs::write(&mf, "Bundle-SymbolicName org.example\n").unwrap();

    let ctx = RepositoryResolveContext::new();
    let err = ctx
        .load_path(&mut ResourceBuilder::new(), &format!("{};version=file", mf.display()), "-runpath")
        .unwrap_err();
    assert_matches!(err, CapresError::Manifest(_));
}

#[test]
fn framework_and_run_path_make_a_system_resource() {
    let mut fw = ResourceBuilder::new();
    fw.add_capability(identity_cap("org.apache.felix.framework", "7.0.5"));
    fw.add_capability(CapReqBuilder::new(namespace::BUNDLE).attribute(namespace::BUNDLE, "org.apache.felix.framework"));
    fw.add_capability(package_cap("org.osgi.framework@1.10"));
    let fw = fw.build().unwrap();

    let mut ctx = RepositoryResolveContext::new();
    ctx.add_repository(repo("r", vec![bundle("slf4j.api", "2.0.9", &["org.slf4j@2.0.9"])]));

    let mut system = ResourceBuilder::new();
    ctx.set_framework(&mut system, fw.clone()).unwrap();
    ctx.load_path(&mut system, "slf4j.api;version=latest", "-runpath").unwrap();
    ctx.set_system_resource(system.build().unwrap());

    let alias = ctx
        .find_providers(&CapReqBuilder::new(namespace::BUNDLE)
            .filter("(osgi.wiring.bundle=system.bundle)")
            .build_requirement()
            .unwrap())
        .unwrap();
    assert_eq!(alias.len(), 1);
    assert!(ctx.is_system_resource(&alias[0].resource().unwrap()));

    let slf4j = ctx.find_providers(&package_req("org.slf4j")).unwrap();
    assert_eq!(slf4j.len(), 2);
    assert!(ctx.is_system_resource(&slf4j[0].resource().unwrap()));
    assert_eq!(resource_identity(&slf4j[1].resource().unwrap()), Some("slf4j.api"));
    assert_eq!(ctx.framework(), Some(&fw));
}

#[test]
fn json_index_backs_a_context() {
    let repository = load_index(&fixtures_dir().join("local_index.json")).unwrap();
    assert_eq!(capres_resolve::Repository::name(&repository), "local");

    let cfg: ResolveConfig =
        serde_json::from_str(&std::fs::read_to_string(fixtures_dir().join("resolve_config.json")).unwrap())
            .unwrap();
    let mut ctx = RepositoryResolveContext::with_config(&cfg).unwrap();
    ctx.set_system_resource(empty_system());
    ctx.add_repository(Arc::new(repository));

    let api = ctx
        .find_providers(&CapReqBuilder::new(namespace::PACKAGE)
            .filter("(&(osgi.wiring.package=org.example.api)(version>=1.2.0))")
            .build_requirement()
            .unwrap())
        .unwrap();
    assert_eq!(api.len(), 1);
    assert_eq!(resource_version(&api[0].resource().unwrap()).unwrap().to_string(), "1.4.2");

    let highest = ctx.get_highest_resource("org.example.api", None).unwrap().unwrap();
    assert_eq!(resource_version(&highest).unwrap().to_string(), "1.4.2");

    let ee = CapReqBuilder::new(namespace::EE)
        .filter("(osgi.ee=JavaSE)")
        .build_requirement()
        .unwrap();
    assert!(ctx.find_providers(&ee).unwrap().is_empty());

    let service = |effective: Option<&str>| {
        let mut b = CapReqBuilder::new("osgi.service").filter("(objectClass=org.example.api.Greeter)");
        if let Some(e) = effective {
            b = b.directive(directive::EFFECTIVE, e);
        }
        b.build_requirement().unwrap()
    };
    assert!(ctx.find_providers(&service(None)).unwrap().is_empty());
    let active = service(Some(values::EFFECTIVE_ACTIVE));
    assert_eq!(ctx.find_providers(&active).unwrap().len(), 1);
    assert!(ctx.is_effective(&active).unwrap());
    assert!(!ctx
        .is_effective(&CapReqBuilder::new(namespace::PACKAGE)
            .directive(directive::EFFECTIVE, values::EFFECTIVE_ACTIVE)
            .build_requirement()
            .unwrap())
        .unwrap());
}
