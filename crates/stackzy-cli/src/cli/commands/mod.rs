//! Command implementations.

pub mod analyze;
pub mod config;
pub mod devices;

use stackzy::pipeline::Adb;
use stackzy::StackzyClient;

use crate::config::{expand_path, Config};
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Stackzy API key
    pub api_key: Option<String>,

    /// Stackzy API base URL override
    pub api_url: Option<String>,

    /// Output format
    pub output_format: OutputFormat,

    /// Disable colors
    pub no_color: bool,

    /// Loaded configuration file
    pub config: Config,
}

impl Context {
    /// Create a Stackzy client from the resolved key and endpoint.
    pub fn client(&self) -> StackzyClient {
        let mut builder = StackzyClient::builder();
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = &self.api_url {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    /// Device bridge using the configured adb binary.
    pub fn adb(&self) -> Adb {
        self.config
            .adb_path
            .as_deref()
            .map_or_else(Adb::new, |path| Adb::with_program(expand_path(path)))
    }
}
