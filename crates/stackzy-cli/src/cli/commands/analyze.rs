//! `stackzy analyze` - run the analysis pipeline for one application.

use anyhow::{Context as _, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use stackzy::pipeline::{
    AnalysisPipeline, ApkTool, Cancellation, Collaborators, PipelineOptions,
    UntrackedLibrarySyncer,
};
use stackzy::{
    AcquisitionSource, AnalyzerConfig, AppTarget, ConfigProvider, DeviceHandle, Library,
    LibraryCatalog, StackzyClient, StoreClient, StoreCredential,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::Context;
use crate::cli::args::AnalyzeArgs;
use crate::config::{expand_path, split_command};
use crate::output::{describe_persistence, render_report, OutputFormat};

/// Fallback store credentials, for scripted runs
const STORE_EMAIL_ENV: &str = "STACKZY_STORE_EMAIL";
const STORE_TOKEN_ENV: &str = "STACKZY_STORE_TOKEN";

pub async fn execute(ctx: Context, args: AnalyzeArgs) -> Result<()> {
    let mut target = AppTarget::new(&args.package)?;
    if let Some(code) = args.version_code {
        target = target.with_version_code(code);
    }
    if let Some(name) = &args.version_name {
        target = target.with_version_name(name);
    }

    let adb = Arc::new(ctx.adb());
    let source = resolve_source(&ctx, &args, &adb).await?;
    let client = ctx.client();

    let config = analyzer_config(&ctx, &args, &client).await;
    let catalog = load_catalog(&ctx, &args, &client).await?;
    let store = StoreClient::new(ctx.config.store_base_url.clone().unwrap_or_default());

    let syncer = (args.sync_untracked || ctx.config.sync_untracked)
        .then(|| UntrackedLibrarySyncer::new(Arc::new(client.clone())).enabled(true));

    let deps = Collaborators {
        cache: Arc::new(client.clone()),
        device: adb,
        store: Arc::new(store),
        decompiler: Arc::new(decompiler(&ctx, &args)),
        catalog,
        syncer,
    };

    let mut options = PipelineOptions::default();
    if let Some(dir) = args
        .temp_dir
        .clone()
        .or_else(|| ctx.config.temp_dir.as_deref().map(expand_path))
    {
        options = options.temp_root(dir);
    }

    let mut pipeline = AnalysisPipeline::new(target, source, config, deps, options);

    let spinner = spinner();
    let mut rx = pipeline.subscribe();
    let bar = spinner.clone();
    let watcher = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let message = rx.borrow_and_update().loading_message.clone();
            if let Some(message) = message {
                bar.set_message(message);
            }
        }
    });

    let cancel = Cancellation::new();
    let on_signal = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let result = pipeline.run(&cancel).await;
    watcher.abort();
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            signal.abort();
            return Err(e.into());
        }
    };

    println!("{}", render_report(&report, ctx.output_format)?);

    pipeline.wait_for_background().await;
    if ctx.output_format == OutputFormat::Pretty {
        if let Some(line) = describe_persistence(&pipeline.state().persistence) {
            eprintln!("{}", line.dimmed());
        }
    }

    if args.open {
        let dir = pipeline.source_directory(&cancel).await?;
        eprintln!("{} {}", "Sources:".bold(), dir.display());
        open::that(&dir).with_context(|| format!("could not open {}", dir.display()))?;
    }

    signal.abort();
    Ok(())
}

/// Pick the acquisition source before anything touches the network
async fn resolve_source(
    ctx: &Context,
    args: &AnalyzeArgs,
    adb: &stackzy::pipeline::Adb,
) -> Result<AcquisitionSource> {
    if args.store {
        let email = ctx
            .config
            .store_email
            .clone()
            .or_else(|| std::env::var(STORE_EMAIL_ENV).ok());
        let token = ctx
            .config
            .store_token
            .clone()
            .or_else(|| std::env::var(STORE_TOKEN_ENV).ok());

        let (Some(email), Some(token)) = (email, token) else {
            anyhow::bail!(
                "Store credentials required.\n\n\
                 Set them with:\n  \
                 stackzy config set store_email <EMAIL>\n  \
                 stackzy config set store_token <TOKEN>\n\n\
                 or the {STORE_EMAIL_ENV} / {STORE_TOKEN_ENV} environment variables"
            );
        };

        if ctx.config.store_base_url.is_none() {
            anyhow::bail!(
                "Store endpoint not configured.\n\n\
                 Set it with: stackzy config set store_base_url <URL>"
            );
        }

        return Ok(AcquisitionSource::Store(StoreCredential::new(email, token)));
    }

    if let Some(serial) = &args.device {
        return Ok(AcquisitionSource::Device(DeviceHandle::new(serial)));
    }

    let devices = adb.list_devices().await?;
    match devices.as_slice() {
        [device] => Ok(AcquisitionSource::Device(device.clone())),
        [] => anyhow::bail!("No device connected. Connect one or use --store."),
        many => {
            let serials = many
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            anyhow::bail!("Several devices connected ({serials}). Pick one with --device <serial>.")
        }
    }
}

/// Local overrides win; the remote config fills the rest
async fn analyzer_config(ctx: &Context, args: &AnalyzeArgs, client: &StackzyClient) -> AnalyzerConfig {
    let mut config = match &ctx.config.analyzer_version {
        Some(version) => AnalyzerConfig::new(version, true),
        None => match client.analyzer_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "remote config unavailable, result cache disabled");
                AnalyzerConfig::new("unknown", false)
            }
        },
    };

    if let Some(enabled) = ctx.config.caching_enabled {
        config.caching_enabled = enabled;
    }
    if args.no_cache {
        config.caching_enabled = false;
    }
    config
}

/// A missing remote catalog is reported by the pipeline itself
async fn load_catalog(
    ctx: &Context,
    args: &AnalyzeArgs,
    client: &StackzyClient,
) -> Result<Option<Arc<LibraryCatalog>>> {
    let local = args
        .catalog
        .clone()
        .or_else(|| ctx.config.catalog_path.as_deref().map(expand_path));

    if let Some(path) = local {
        return Ok(Some(Arc::new(read_catalog(&path)?)));
    }

    match client.libraries().catalog().await {
        Ok(catalog) => Ok(Some(Arc::new(catalog))),
        Err(e) => {
            warn!(error = %e, "could not fetch the library catalog");
            Ok(None)
        }
    }
}

fn read_catalog(path: &Path) -> Result<LibraryCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read catalog {}", path.display()))?;
    let libraries: Vec<Library> = serde_json::from_str(&content)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    Ok(LibraryCatalog::new(libraries))
}

fn decompiler(ctx: &Context, args: &AnalyzeArgs) -> ApkTool {
    args.apktool
        .as_deref()
        .or(ctx.config.apktool.as_deref())
        .and_then(split_command)
        .map_or_else(ApkTool::new, |(program, rest)| ApkTool::with_command(program, rest))
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
