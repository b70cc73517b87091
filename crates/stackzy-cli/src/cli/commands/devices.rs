//! `stackzy devices` - devices visible to adb.

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::output::OutputFormat;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Model")]
    model: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let devices = ctx.adb().list_devices().await?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&devices)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["serial", "model"])?;
            for device in &devices {
                writer.write_record([device.serial.as_str(), device.model.as_deref().unwrap_or("")])?;
            }
            writer.flush()?;
        }
        OutputFormat::Pretty => {
            if devices.is_empty() {
                println!("{}", "No devices connected.".yellow());
                println!(
                    "{}",
                    "Enable USB debugging and check `adb devices`.".dimmed()
                );
                return Ok(());
            }

            let rows: Vec<DeviceRow> = devices
                .into_iter()
                .map(|d| DeviceRow {
                    serial: d.serial,
                    model: d.model.unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            println!("{}", Table::new(&rows).with(Style::rounded()));
        }
    }

    Ok(())
}
