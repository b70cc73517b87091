//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use stackzy::{AnalysisReport, PersistenceStatus};
use std::fmt::Write as _;
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// One row per library
    Csv,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, json, csv, yaml"
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

#[derive(Tabled)]
struct LibraryRow {
    #[tabled(rename = "Library")]
    name: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Category")]
    category: String,
}

/// Render a report in the given format
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
        OutputFormat::Csv => render_csv(report),
        OutputFormat::Pretty => Ok(render_pretty(report)),
    }
}

/// Libraries first, then untracked namespaces with an empty name
fn render_csv(report: &AnalysisReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["kind", "package_name", "name", "category", "website"])?;

    for library in &report.libraries {
        writer.write_record([
            "library",
            library.package_name.as_str(),
            library.name.as_str(),
            library.category.as_deref().unwrap_or(""),
            library.website.as_deref().unwrap_or(""),
        ])?;
    }
    for namespace in &report.untracked_libraries {
        writer.write_record(["untracked", namespace.as_str(), "", "", ""])?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn render_pretty(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let gradle = &report.gradle_info;
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    let _ = writeln!(out, "{} {}", report.app_name.bold(), format!("({})", report.package_name).dimmed());
    let _ = writeln!(out, "  {} {}", "Platform:".bold(), report.platform.to_string().cyan());
    let _ = writeln!(
        out,
        "  {} {} ({})",
        "Version:".bold(),
        or_dash(gradle.version_name.clone()),
        or_dash(gradle.version_code.map(|c| c.to_string()))
    );
    let _ = writeln!(
        out,
        "  {} min {} / target {}",
        "SDK:".bold(),
        or_dash(gradle.min_sdk.map(|s| s.to_string())),
        or_dash(gradle.target_sdk.map(|s| s.to_string()))
    );
    let _ = writeln!(out, "  {} {:.2} MB", "APK size:".bold(), report.apk_size_in_mb);
    let _ = writeln!(out, "  {} {}", "Store:".bold(), report.play_store_url().underline());
    if let Some(assets) = &report.assets_dir {
        let _ = writeln!(out, "  {} {}", "Assets:".bold(), assets.display());
    }
    let _ = writeln!(out);

    if report.libraries.is_empty() {
        let _ = writeln!(out, "{}", "No known libraries found.".yellow());
    } else {
        let rows: Vec<LibraryRow> = report
            .libraries
            .iter()
            .map(|lib| LibraryRow {
                name: lib.name.clone(),
                package: lib.package_name.clone(),
                category: or_dash(lib.category.clone()),
            })
            .collect();
        let _ = writeln!(out, "{} {}", "Libraries:".bold(), rows.len().to_string().cyan());
        let _ = writeln!(out, "{}", Table::new(&rows).with(Style::rounded()));
    }

    if !report.untracked_libraries.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {}",
            "Untracked:".bold(),
            report.untracked_libraries.len().to_string().cyan()
        );
        for namespace in &report.untracked_libraries {
            let _ = writeln!(out, "  {}", namespace.dimmed());
        }
    }

    if !report.permissions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {}",
            "Permissions:".bold(),
            report.permissions.len().to_string().cyan()
        );
        for permission in &report.permissions {
            let _ = writeln!(out, "  {permission}");
        }
    }

    out
}

/// One-line description of the cache write-back
#[must_use]
pub fn describe_persistence(status: &PersistenceStatus) -> Option<String> {
    match status {
        PersistenceStatus::Skipped => None,
        PersistenceStatus::Pending => Some("Saving result...".to_string()),
        PersistenceStatus::Stored => Some("Result saved to the cache.".to_string()),
        PersistenceStatus::Failed(e) => Some(format!("Could not save result: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackzy::{GradleInfo, Library, LibraryCatalog, Platform};
    use std::collections::BTreeSet;

    fn report() -> AnalysisReport {
        let mut retrofit = Library::new("Retrofit", "retrofit2");
        retrofit.category = Some("Networking".to_string());
        let catalog = LibraryCatalog::new([retrofit, Library::new("OkHttp", "okhttp3")]);

        AnalysisReport {
            app_name: "Example".to_string(),
            package_name: "com.example.app".to_string(),
            platform: Platform::NativeKotlin,
            libraries: catalog.resolve(["retrofit2", "okhttp3"]),
            untracked_libraries: BTreeSet::from(["io.acme.sdk".to_string()]),
            apk_size_in_mb: 3.0,
            assets_dir: None,
            permissions: vec!["android.permission.INTERNET".to_string()],
            gradle_info: GradleInfo {
                version_name: Some("1.2".to_string()),
                version_code: Some(12),
                ..GradleInfo::default()
            },
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_csv_rows() {
        let csv = render_report(&report(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "kind,package_name,name,category,website");
        assert_eq!(lines[1], "library,okhttp3,OkHttp,,");
        assert_eq!(lines[2], "library,retrofit2,Retrofit,Networking,");
        assert_eq!(lines[3], "untracked,io.acme.sdk,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_json_contains_libraries() {
        let json = render_report(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["package_name"], "com.example.app");
        assert_eq!(value["libraries"][1]["name"], "Retrofit");
        assert_eq!(value["untracked_libraries"][0], "io.acme.sdk");
    }

    #[test]
    fn test_pretty_mentions_everything() {
        colored::control::set_override(false);
        let text = render_report(&report(), OutputFormat::Pretty).unwrap();
        assert!(text.contains("Example (com.example.app)"));
        assert!(text.contains("Retrofit"));
        assert!(text.contains("io.acme.sdk"));
        assert!(text.contains("android.permission.INTERNET"));
        assert!(text.contains("https://play.google.com/store/apps/details?id=com.example.app"));
    }

    #[test]
    fn test_describe_persistence() {
        assert_eq!(describe_persistence(&PersistenceStatus::Skipped), None);
        assert!(describe_persistence(&PersistenceStatus::Failed("boom".into()))
            .unwrap()
            .contains("boom"));
    }
}
