//! `stackzy config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Path => show_path(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = Config::load()?;
    let masked = Config {
        api_key: config.api_key.as_deref().map(mask),
        store_token: config.store_token.as_deref().map(mask),
        ..config.clone()
    };

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&masked)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&masked)?);
        }
        _ => {
            println!("{}", "Current Configuration:".bold());
            println!();

            let unset = || "(not set)".dimmed().to_string();
            let show = |key: &str, value: Option<String>| {
                println!("  {} {}", format!("{key}:").bold(), value.unwrap_or_else(unset));
            };

            show("api_key", masked.api_key);
            show("api_base_url", masked.api_base_url);
            show("store_base_url", masked.store_base_url);
            show("store_email", masked.store_email);
            show("store_token", masked.store_token);
            show("adb_path", masked.adb_path);
            show("apktool", masked.apktool);
            show("catalog_path", masked.catalog_path);
            show("analyzer_version", masked.analyzer_version);
            show("caching_enabled", masked.caching_enabled.map(|v| v.to_string()));
            show("sync_untracked", Some(masked.sync_untracked.to_string()));
            show("temp_dir", masked.temp_dir);
            show(
                "output_format",
                Some(masked.output_format.unwrap_or_default().to_string()),
            );
        }
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    if value.trim().is_empty() {
        println!("{} {} unset.", "Success:".green().bold(), key.cyan());
    } else {
        println!("{} {} set.", "Success:".green().bold(), key.cyan());
    }

    Ok(())
}

fn show_path() -> Result<()> {
    let path = Config::path()?;
    println!("{}", path.display());
    Ok(())
}

/// Keep the first and last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
