//! # storage-adapters
//!
//! Concrete implementations of the `domains` ports.

pub mod auth;
#[cfg(feature = "catalog-http")]
pub mod catalog;
#[cfg(feature = "media-local")]
pub mod local;
pub mod memory;

pub use auth::SessionAuthProvider;
#[cfg(feature = "catalog-http")]
pub use catalog::HttpModCatalog;
#[cfg(feature = "media-local")]
pub use local::LocalObjectStore;
pub use memory::{MemoryObjectStore, MemoryRowStore};
