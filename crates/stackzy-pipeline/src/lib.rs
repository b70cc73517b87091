//! Acquisition, decompilation and analysis of Android packages.
//!
//! This crate drives the external tools a Stackzy run depends on:
//!
//! - [`adb`]: pull installed APKs from connected devices
//! - [`resolver`]: turn an [`AcquisitionSource`](stackzy_core::AcquisitionSource)
//!   into a local binary with deduplicated progress
//! - [`decompiler`]: run `apktool` as a subprocess
//! - [`analyzer`]: match the decompiled tree against the library catalog
//! - [`assembler`] and [`syncer`]: post-processing of a finished analysis
//! - [`pipeline`]: the orchestrator tying all of the above together

#![doc(html_root_url = "https://docs.rs/stackzy-pipeline/1.2.0")]

mod error;
mod process;

pub mod adb;
pub mod analyzer;
pub mod assembler;
pub mod cancel;
pub mod decompiler;
pub mod lock;
pub mod paths;
pub mod pipeline;
pub mod resolver;
pub mod state;
pub mod syncer;

pub use adb::Adb;
pub use analyzer::{AnalyzerOptions, LibraryAnalyzer};
pub use assembler::ReportAssembler;
pub use cancel::Cancellation;
pub use decompiler::{ApkTool, Decompiler};
pub use error::{ToolError, ToolResult};
pub use pipeline::{AnalysisPipeline, Collaborators, PipelineOptions};
pub use resolver::{AcquiredBinary, ResolveEvent, ResolverOptions, SourceResolver};
pub use state::StatePublisher;
pub use syncer::{SyncOutcome, SyncProgress, SyncSummary, UntrackedLibrarySyncer};
