use std::io::Write;

use anyhow::Result;
use diagnostics::*;
use warehouse::ConnectionConfig;

use crate::commands::run::{RunOptions, run_command};
use crate::demos::Demo;
use crate::output::OutputFormat;

pub fn demo_command(
    config: &ConnectionConfig,
    demo: Demo,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let name = format!("{demo:?}").to_lowercase();
    info!("Running demo script {name}", name: name);

    let options = RunOptions {
        format,
        title: demo.title(),
    };
    run_command(config, demo.sql(), options, out)
}
