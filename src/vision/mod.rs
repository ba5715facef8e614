//! Remote vision collaborator: describe extracted images via an external
//! model, with an injected result cache and bounded retry.
//!
//! Nothing in the extraction pipeline depends on this module — the walk is
//! pure and local. Orchestration layers call [`VisionClient`] with the
//! [`crate::output::PageImage`]s a walk produced.

pub mod cache;
pub mod client;

pub use cache::{CachedDescription, DescriptionCache, JsonFileCache, MemoryCache};
pub use client::{RetryPolicy, VisionClient};
