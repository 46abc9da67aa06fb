//! `codewright tools`: show the merged tool catalog.

use std::path::Path;

use super::session::{CliResult, load_config, open_surface};

pub async fn run(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let (surface, mcp) = open_surface(&config).await?;
    let catalog = surface.catalog().await;
    if let Some(mcp) = mcp {
        mcp.disconnect_all().await;
    }
    let catalog = catalog?;

    println!("Tools ({})", catalog.len());
    for descriptor in catalog.descriptors() {
        println!("  {:<32} {}", descriptor.name, descriptor.origin);
    }
    for warning in catalog.warnings() {
        println!();
        println!("  Warning: {warning}");
    }
    Ok(())
}
