//! Manage the configuration file.

use std::path::PathBuf;

use handwave_common::config::{config_file_path, AppConfig};

pub fn init(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let path = AppConfig::default().save()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn show(config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn check(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);
    if !path.exists() {
        anyhow::bail!("No config file at {}", path.display());
    }

    match AppConfig::load_from(&path) {
        Ok(config) => {
            println!("[OK] {}", path.display());
            println!(
                "     crossfade {}ms, auto-revert {}ms, {} Hz feed",
                config.response.crossfade_ms,
                config.response.auto_revert_ms,
                config.feed.frame_rate_hz
            );
            Ok(())
        }
        Err(e) => {
            println!("[FAIL] {}", path.display());
            Err(anyhow::anyhow!("Invalid config: {e}"))
        }
    }
}
