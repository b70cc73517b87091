//! stackzy - find out which libraries an Android app is built with.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    stackzy_cli::run().await
}
