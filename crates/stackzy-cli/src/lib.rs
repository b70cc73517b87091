//! # stackzy-cli
//!
//! Command-line front end for the Stackzy analysis pipeline.
//!
//! ## Features
//!
//! - **Analyze**: pull an APK from a device or download it from the store,
//!   decompile it and list the libraries it ships
//! - **Result cache**: reuse reports computed for the same build
//! - **Devices**: list devices visible to `adb`
//! - **Multiple output formats**: Pretty tables, JSON, CSV, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
