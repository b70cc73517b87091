//! HTTP client for the Stackzy backend.
//!
//! This crate provides [`StackzyClient`] for the remote result cache, the
//! library catalog, the untracked-library registry and the remote config,
//! plus [`StoreClient`] for store downloads. Both implement the collaborator
//! traits from `stackzy-core` so they plug straight into the pipeline.

#![doc(html_root_url = "https://docs.rs/stackzy-client/1.2.0")]

mod client;
mod config;
mod store;
pub mod api;

pub use client::{StackzyClient, StackzyClientBuilder};
pub use config::*;
pub use stackzy_core::{Result, StackzyError};
pub use store::StoreClient;
