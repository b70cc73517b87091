//! Core types and traits for the Stackzy analysis pipeline.
//!
//! This crate provides the foundational types shared by the client, the
//! pipeline and the CLI:
//!
//! - **Types**: the analysis data model ([`AnalysisReport`], [`CachedResult`],
//!   [`PackageFingerprint`], [`AcquisitionSource`], ...)
//! - **Errors**: the run-level error taxonomy with [`StackzyError`]
//! - **Traits**: the seams to external collaborators ([`ResultCache`],
//!   [`StoreDownloader`], [`DeviceBridge`], [`UntrackedLibraryRegistry`],
//!   [`ConfigProvider`])
//!
//! # Example
//!
//! ```rust,ignore
//! use stackzy_core::{AppTarget, LibraryCatalog, Result};
//!
//! fn describe(target: &AppTarget, catalog: &LibraryCatalog) -> Result<()> {
//!     let fingerprint = target.fingerprint("1.0");
//!     println!("{} ({} libraries known)", target.package_name(), catalog.len());
//!     println!("cacheable: {}", fingerprint.is_some());
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/stackzy-core/1.2.0")]

mod error;
pub mod traits;
pub mod types;

pub use error::{Result, StackzyError};
pub use traits::*;
pub use types::*;
