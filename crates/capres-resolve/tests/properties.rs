//! properties.rs
//!
//! Property checks for the resolve context: caching, stage ordering and sorting,
//! priorities, admission rules, hosted insertion and identity-equality.

mod common;

use proptest::prelude::*;

use capres_core::determinism::ensure_sorted_by;
use capres_core::model::{CapReqBuilder, Capability, Resource, ResourceBuilder};
use capres_core::{attr, directive, namespace};
use capres_resolve::identity::resource_identity_equals;
use capres_resolve::{RepositoryResolveContext, ResolveContext};

use common::*;

const PACKAGES: [&str; 4] = ["a", "b", "c", "d"];

fn exports_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0..PACKAGES.len(), 0..4), 1..5)
}

fn bundles_from(exports: &[Vec<usize>], prefix: &str) -> Vec<Resource> {
    exports
        .iter()
        .enumerate()
        .map(|(i, pkgs)| {
            let names: Vec<&str> = pkgs.iter().map(|p| PACKAGES[*p]).collect();
            bundle(&format!("{prefix}{i}"), "1.0.0", &names)
        })
        .collect()
}

proptest! {
    #[test]
    fn repeated_lookups_are_equal_and_unaliased(exports in exports_strategy(), pkg in 0..PACKAGES.len()) {
        let ctx = context(empty_system(), vec![bundles_from(&exports, "r")]);
        let req = package_req(PACKAGES[pkg]);

        let mut first = ctx.find_providers(&req).unwrap();
        let second = ctx.find_providers(&req).unwrap();
        prop_assert_eq!(&first, &second);

        first.clear();
        prop_assert_eq!(ctx.find_providers(&req).unwrap(), second);
    }

    #[test]
    fn stage_one_precedes_repositories(
        system_exports in prop::collection::vec(0..PACKAGES.len(), 0..4),
        repo_exports in exports_strategy(),
        pkg in 0..PACKAGES.len(),
    ) {
        let names: Vec<&str> = system_exports.iter().map(|p| PACKAGES[*p]).collect();
        let system = bundle("system", "1.0.0", &names);
        let ctx = context(system.clone(), vec![bundles_from(&repo_exports, "r")]);

        let found = ctx.find_providers(&package_req(PACKAGES[pkg])).unwrap();
        let first_repo = found
            .iter()
            .position(|c| !c.resource().unwrap().ptr_eq(&system))
            .unwrap_or(found.len());
        prop_assert!(found[first_repo..].iter().all(|c| !c.resource().unwrap().ptr_eq(&system)));

        let preference = |a: &Capability, b: &Capability| ctx.compare_capabilities(a, b);
        prop_assert!(ensure_sorted_by(&found[..first_repo], preference).is_ok());
        prop_assert!(ensure_sorted_by(&found[first_repo..], preference).is_ok());
    }

    #[test]
    fn earliest_repository_sets_priority(repo_count in 2usize..5, first in 0usize..5) {
        let first = first % repo_count;
        let shared = bundle("shared", "1.0.0", &["a", "b"]);
        let repos: Vec<Vec<Resource>> = (0..repo_count)
            .map(|i| if i >= first { vec![shared.clone()] } else { vec![] })
            .collect();
        let ctx = context(empty_system(), repos);

        ctx.find_providers(&package_req("a")).unwrap();
        prop_assert_eq!(ctx.resource_priority(&shared), Some(first));
        ctx.find_providers(&package_req("b")).unwrap();
        prop_assert_eq!(ctx.resource_priority(&shared), Some(first));
    }

    #[test]
    fn blacklisted_resources_never_returned(exports in exports_strategy(), banned in 0usize..5, pkg in 0..PACKAGES.len()) {
        let resources = bundles_from(&exports, "r");
        let banned = banned % resources.len();
        let ctx = context(empty_system(), vec![resources.clone()]);
        ctx.set_black_list(&[
            RepositoryResolveContext::create_bundle_requirement(&format!("r{banned}"), None).unwrap(),
        ]);

        let found = ctx.find_providers(&package_req(PACKAGES[pkg])).unwrap();
        let black_list = ctx.black_list();
        prop_assert!(found.iter().all(|c| !black_list.contains(&c.resource().unwrap())));
    }

    #[test]
    fn inadmissible_resources_never_returned(kind in 0usize..4) {
        let mut rb = ResourceBuilder::new();
        match kind {
            0 => {
                rb.add_capability(identity_cap("fw", "1.0.0"));
                rb.add_capability(package_cap("org.osgi.framework"));
            }
            1 => {}
            2 => {
                rb.add_capability(identity_cap("one", "1.0.0"));
                rb.add_capability(identity_cap("two", "1.0.0"));
            }
            _ => {
                rb.add_capability(identity_cap("ee.JavaSE", "1.0.0"));
            }
        }
        rb.add_capability(package_cap("a"));
        let ctx = context(empty_system(), vec![vec![rb.build().unwrap()]]);
        prop_assert!(ctx.find_providers(&package_req("a")).unwrap().is_empty());
    }

    #[test]
    fn no_effective_directive_is_always_effective(ns in "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}") {
        let ctx = context(empty_system(), vec![]);
        let req = CapReqBuilder::new(ns.as_str()).build_requirement().unwrap();
        prop_assert!(ctx.is_effective(&req).unwrap());

        let resolve = CapReqBuilder::new(ns.as_str())
            .directive(directive::EFFECTIVE, "resolve")
            .build_requirement()
            .unwrap();
        prop_assert!(ctx.is_effective(&resolve).unwrap());
    }

    #[test]
    fn hosted_insertion_respects_priorities(
        order in prop::collection::vec(0usize..5, 0..8),
        hosted in 0usize..6,
    ) {
        // One resource per repository, so priority == repository index.
        let resources: Vec<Resource> = (0..5).map(|i| bundle(&format!("r{i}"), "1.0.0", &["p"])).collect();
        let ctx = context(empty_system(), resources.iter().map(|r| vec![r.clone()]).collect());
        ctx.find_providers(&package_req("p")).unwrap();

        let pkg = |r: &Resource| -> Capability {
            r.capabilities(Some(namespace::PACKAGE)).next().unwrap().clone()
        };
        let mut caps: Vec<Capability> = order.iter().map(|i| pkg(&resources[*i])).collect();
        let before = caps.len();

        // Index 5 stands for a resource with no recorded priority.
        let unranked = bundle("unranked", "1.0.0", &["p"]);
        let hc = if hosted < 5 { pkg(&resources[hosted]) } else { pkg(&unranked) };
        let priority = ctx.resource_priority(&hc.resource().unwrap()).unwrap_or(usize::MAX);

        let i = ctx.insert_hosted_capability(&mut caps, hc.clone()).unwrap();
        prop_assert_eq!(caps.len(), before + 1);
        prop_assert_eq!(&caps[i], &hc);
        for c in &caps[..i] {
            let p = ctx.resource_priority(&c.resource().unwrap()).unwrap_or(0);
            prop_assert!(p <= priority);
        }
    }

    #[test]
    fn identity_equality_is_an_equivalence(
        specs in prop::collection::vec((prop::option::of(0u8..2), prop::option::of(0u32..2)), 3),
    ) {
        let resources: Vec<Resource> = specs
            .iter()
            .map(|(id, version)| {
                let mut rb = ResourceBuilder::new();
                if let Some(id) = id {
                    let mut cap = CapReqBuilder::new(namespace::IDENTITY)
                        .attribute(namespace::IDENTITY, format!("id{id}"));
                    if let Some(v) = version {
                        cap = cap.attribute(attr::VERSION, format!("{v}.0.0"));
                    }
                    rb.add_capability(cap);
                }
                rb.build().unwrap()
            })
            .collect();
        let (a, b, c) = (&resources[0], &resources[1], &resources[2]);

        prop_assert!(resource_identity_equals(a, a));
        prop_assert_eq!(resource_identity_equals(a, b), resource_identity_equals(b, a));
        if resource_identity_equals(a, b) && resource_identity_equals(b, c) {
            prop_assert!(resource_identity_equals(a, c));
        }
    }
}

#[test]
fn init_is_idempotent() {
    let system = bundle("system", "1.0.0", &["a", "b", "c"]);
    let ctx = context(system, vec![]);
    for _ in 0..10 {
        ctx.init().unwrap();
    }
    ctx.find_providers(&package_req("a")).unwrap();
    assert_eq!(ctx.system_capabilities().len(), 4);
}
