//! `codewright init`: write the default config file.

use std::path::Path;

use codewright_config::AppConfig;

use super::session::CliResult;

pub async fn run(config_path: Option<&Path>) -> CliResult<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);

    if path.exists() {
        println!("Config already exists at: {}", path.display());
        println!("Edit it manually or delete it and run `codewright init` again.");
        return Ok(());
    }

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Created config at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Add your API key to {} or set OPENAI_API_KEY", path.display());
    println!("  2. Run: codewright chat");
    Ok(())
}
