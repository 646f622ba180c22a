//! capres-resolve
//!
//! A repository-backed resolve context. It sits between a resolver engine
//! and a set of repositories and decides, for every requirement the engine
//! asks about, which capabilities are candidates and in which order.
//!
//! Modules:
//! - `engine`: the contract the resolver engine drives
//! - `context`: the resolve context (provider lookup, caching, blacklist,
//!   effectiveness, hosted capability insertion)
//! - `system`: framework and run-path composition of the system resource
//! - `repository` / `index`: repositories, in-memory and JSON-backed
//! - `hooks`: candidate post-processing
//! - `report`: debug dump of a context
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod cache;
pub mod capability_index;
pub mod comparator;
pub mod context;
pub mod engine;
pub mod hooks;
pub mod identity;
pub mod index;
pub mod permit;
pub mod report;
pub mod repository;
pub mod system;

pub use crate::context::RepositoryResolveContext;
pub use crate::engine::{ResolveContext, Wirings};
pub use crate::hooks::{Candidates, ResolutionCallback, ResolverHook};
pub use crate::repository::{Repository, ResourcesRepository};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::context::RepositoryResolveContext;
    pub use crate::engine::{ResolveContext, Wirings};
    pub use crate::hooks::{Candidates, ResolutionCallback, ResolverHook};
    pub use crate::identity::{resource_identity, resource_identity_equals, resource_version};
    pub use crate::index::{load_index, IndexFile};
    pub use crate::repository::{Repository, ResourcesRepository};
    pub use crate::system::add_system_resource;
    pub use capres_core::prelude::*;
}
