//! Subcommands.

pub mod batch;
pub mod config;
pub mod map;
pub mod normalize;
pub mod submit;
pub mod validate;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;

use lotbill_core::invoice::InvoiceNormalizer;
use lotbill_core::models::config::LotbillConfig;
use lotbill_core::models::invoice::Invoice;

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lotbill")
        .join("config.json")
}

/// Resolve the config file path from `--config` or the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LotbillConfig> {
    let path = config_file(config_path);
    if path.exists() {
        LotbillConfig::from_file(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))
    } else if config_path.is_some() {
        anyhow::bail!("Config file not found: {}", path.display())
    } else {
        Ok(LotbillConfig::default())
    }
}

/// Read an extraction payload from a file, or stdin when the path is `-`.
pub fn read_input(input: &Path) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

/// Read and normalize an extraction payload.
///
/// Text that is not JSON yields an empty invoice, like any other garbage.
pub fn load_invoice(input: &Path, normalizer: &InvoiceNormalizer) -> anyhow::Result<Invoice> {
    Ok(normalizer.normalize_str(&read_input(input)?))
}

/// Write to a file, or print to stdout.
pub fn emit(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!(
                "{} Output written to {}",
                console::style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}
