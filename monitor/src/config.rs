//! Configuration file handling. The on-disk format is YAML; whatever it
//! contains is funneled through [`AppConfig::new`], so model validation in
//! the core crate stays the single gate.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use httpmon_core::AppConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    general: GeneralSection,
    database: DatabaseSection,
    vault: VaultSection,
    log: LogSection,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneralSection {
    working_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
    name_default: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VaultSection {
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogSection {
    out_path: String,
    level: String,
}

/// Load and validate the app configuration. A missing file is first
/// populated with the documented defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        deploy_default_config(path)?;
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&text)
}

fn parse_config(text: &str) -> Result<AppConfig> {
    let raw: RawConfig = serde_yaml::from_str(text).context("parsing config file")?;
    let config = AppConfig::new(
        raw.general.working_dir,
        raw.database.host,
        raw.database.port,
        raw.database.name,
        raw.database.name_default,
        raw.vault.service_name,
        raw.log.out_path,
        raw.log.level,
    )?;
    Ok(config)
}

fn default_config(working_dir: String) -> RawConfig {
    RawConfig {
        general: GeneralSection { working_dir },
        database: DatabaseSection {
            host: "localhost".to_string(),
            port: 5432,
            name: "httpmon".to_string(),
            name_default: "postgres".to_string(),
        },
        vault: VaultSection {
            service_name: "httpmon".to_string(),
        },
        log: LogSection {
            out_path: "httpmon.log".to_string(),
            level: "info".to_string(),
        },
    }
}

fn deploy_default_config(path: &Path) -> Result<()> {
    let working_dir = std::env::current_dir()
        .context("resolving working directory")?
        .display()
        .to_string();
    let text =
        serde_yaml::to_string(&default_config(working_dir)).context("rendering default config")?;
    fs::write(path, text).with_context(|| format!("writing default config {}", path.display()))
}
