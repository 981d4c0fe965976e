use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use diagnostics::*;
use warehouse::ConnectionConfig;

/// Resolve connection settings: defaults, then the optional YAML file, then
/// `SF_*` environment variables
pub fn load_connection_config(config_path: Option<&Path>) -> Result<ConnectionConfig> {
    let base = match config_path {
        Some(path) => {
            let shown = path.display().to_string();
            debug!("Loading configuration from: {shown}", shown: shown);
            ConnectionConfig::load(path)
                .with_context(|| format!("Failed to load configuration from: {}", path.display()))?
        }
        None => ConnectionConfig::default(),
    };
    let config = base.with_env();

    let placeholders = config.placeholder_fields();
    if !placeholders.is_empty() {
        let fields = placeholders.join(", ");
        warn!("Connection settings still hold placeholder values: {fields}", fields: fields);
    }
    Ok(config)
}

/// Read a script from a file, or from stdin when `source` is `-`
pub fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut sql = String::new();
        std::io::stdin()
            .read_to_string(&mut sql)
            .context("Failed to read SQL script from stdin")?;
        return Ok(sql);
    }
    std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read SQL script: {source}"))
}
