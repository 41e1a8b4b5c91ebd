//! Public surface for the `portfolio-server` crate.
//!
//! Exposes the router builder, resources and storage so that external crates
//! (e.g. the conformance test suite) can spin up an in-process server without
//! spawning a subprocess.

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod resource;
pub mod response;
pub mod router;
pub mod storage;

pub use config::{ConfigError, ServerConfig};
pub use resource::{CrudResource, ResourceRegistry};
pub use router::build_router;
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
