// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cmd::commands::{RunOptions, demo_command, dry_run, init_command, run_command};
use cmd::common::{load_connection_config, read_script};
use cmd::demos::Demo;
use cmd::output::OutputFormat;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "sfrun")]
/// Run multi-statement SQL scripts against a Snowflake warehouse
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML connection settings; SF_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in demo script and print its report
    Demo {
        #[arg(value_enum)]
        name: Demo,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Run a SQL script file, or stdin with "-"
    Run {
        script: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Heading printed above the result table
        #[arg(long)]
        title: Option<String>,

        /// Print the statements that would run, without connecting
        #[arg(long)]
        dry_run: bool,
    },
    /// Write an example configuration file
    Init {
        #[arg(default_value = "sfrun.yaml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    diagnostics::init_diagnostics();
    let cli = Cli::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Demo { name, format } => {
            let config = load_connection_config(cli.config.as_deref())?;
            demo_command(&config, name, format, &mut out)?;
        }
        Commands::Run {
            script,
            format,
            title,
            dry_run: list_only,
        } => {
            let sql = read_script(&script)?;
            if list_only {
                dry_run(&sql, &mut out)?;
            } else {
                let config = load_connection_config(cli.config.as_deref())?;
                let options = RunOptions {
                    format,
                    title: title.as_deref(),
                };
                run_command(&config, &sql, options, &mut out)?;
            }
        }
        Commands::Init { path } => {
            init_command(&path, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
