use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use diagnostics::*;
use warehouse::ConnectionConfig;

const HEADER: &str = "\
# sfrun connection settings.
# Environment variables SF_USER, SF_PASSWORD, SF_ACCOUNT, SF_WAREHOUSE,
# SF_DATABASE, SF_SCHEMA, SF_ROLE and SF_HOST override these values.
# account is the identifier before .snowflakecomputing.com, e.g. xy12345.us-east-1
";

/// Write an example configuration file; an existing file is left alone
pub fn init_command(path: &Path, out: &mut dyn Write) -> Result<()> {
    if path.exists() {
        return Err(anyhow!(
            "Configuration file already exists: {}. Delete it first if you want to create a new one.",
            path.display()
        ));
    }

    let body = ConnectionConfig::default()
        .to_yaml()
        .context("Failed to render example configuration")?;
    std::fs::write(path, format!("{HEADER}{body}"))
        .with_context(|| format!("Failed to create configuration file: {}", path.display()))?;

    let shown = path.display().to_string();
    info!("Created example configuration file: {shown}", shown: shown);
    writeln!(out, "Created example configuration file: {shown}")?;
    writeln!(out, "Edit user, password and account, then run: sfrun --config {shown} demo consolidate")?;
    Ok(())
}
