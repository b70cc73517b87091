//! Find out which libraries an Android app is built with.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stackzy::pipeline::{Adb, AnalysisPipeline, ApkTool, Cancellation, Collaborators, PipelineOptions};
//! use stackzy::{AcquisitionSource, AppTarget, ConfigProvider, StackzyClient, StoreClient, StoreCredential};
//!
//! #[tokio::main]
//! async fn main() -> stackzy::Result<()> {
//!     let client = StackzyClient::builder().api_key("your-api-key").build();
//!     let config = client.analyzer_config().await?;
//!     let catalog = client.libraries().catalog().await?;
//!
//!     let deps = Collaborators {
//!         cache: Arc::new(client.clone()),
//!         device: Arc::new(Adb::new()),
//!         store: Arc::new(StoreClient::new("https://store.example.com")),
//!         decompiler: Arc::new(ApkTool::new()),
//!         catalog: Some(Arc::new(catalog)),
//!         syncer: None,
//!     };
//!
//!     let target = AppTarget::new("com.example.app")?.with_version_code(42);
//!     let source = AcquisitionSource::Store(StoreCredential::new("me@example.com", "token"));
//!     let mut pipeline = AnalysisPipeline::new(target, source, config, deps, PipelineOptions::default());
//!
//!     let report = pipeline.run(&Cancellation::new()).await?;
//!     println!("{} is a {} app", report.app_name, report.platform);
//!     for library in &report.libraries {
//!         println!("  {} ({})", library.name, library.package_name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - `rustls` and `pipeline`
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS
//! - `pipeline` - Device pull, `apktool` decompilation and library analysis

#![doc(html_root_url = "https://docs.rs/stackzy/1.2.0")]

// Re-export core types
pub use stackzy_core::*;

// Re-export client
pub use stackzy_client::{
    api, RateLimitConfig, RetryConfig, StackzyClient, StackzyClientBuilder, StoreClient,
};

// Re-export the pipeline if enabled
#[cfg(feature = "pipeline")]
pub use stackzy_pipeline as pipeline;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
