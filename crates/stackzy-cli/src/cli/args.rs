//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Find out which libraries an Android app is built with
///
/// The APK is pulled from a connected device or downloaded from the store,
/// decompiled with apktool and matched against the Stackzy library catalog.
#[derive(Parser, Debug)]
#[command(name = "stackzy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Stackzy API key (or set STACKZY_API_KEY env var)
    #[arg(short = 'k', long, env = "STACKZY_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Stackzy API base URL
    #[arg(long, env = "STACKZY_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "stackzy_pipeline=debug")
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse an application and list its libraries
    Analyze(AnalyzeArgs),

    /// List devices connected through adb
    Devices,

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Analyze command
// ============================================================================

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Package name of the application (e.g. com.example.app)
    pub package: String,

    /// Pull the APK from the device with this serial
    #[arg(short, long, conflicts_with = "store")]
    pub device: Option<String>,

    /// Download the APK from the store
    #[arg(short, long)]
    pub store: bool,

    /// Version code of the build, enables the result cache
    #[arg(long)]
    pub version_code: Option<u64>,

    /// Version name of the build
    #[arg(long)]
    pub version_name: Option<String>,

    /// Skip the result cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Report libraries missing from the catalog
    #[arg(long)]
    pub sync_untracked: bool,

    /// Open the decompiled sources when done
    #[arg(long)]
    pub open: bool,

    /// apktool command line (e.g. "java -jar ~/apktool.jar")
    #[arg(long)]
    pub apktool: Option<String>,

    /// Library catalog JSON file used instead of the remote catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Root directory for decompiled sources
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set (empty to unset)
        value: String,
    },

    /// Show config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_device_conflicts_with_store() {
        let parsed = Cli::try_parse_from([
            "stackzy", "analyze", "com.example.app", "--device", "emulator-5554", "--store",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "stackzy",
            "analyze",
            "com.example.app",
            "--store",
            "--version-code",
            "42",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(OutputFormat::Json));
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.store);
        assert_eq!(args.version_code, Some(42));
        assert_eq!(args.device, None);
    }
}
