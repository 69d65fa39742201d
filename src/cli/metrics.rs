use anyhow::{Context, Result};

use marketscout_cli::metrics;

pub async fn cmd_metrics() -> Result<()> {
    let text = metrics::render().context("Failed to encode metrics")?;
    print!("{text}");
    Ok(())
}
